mod common;

use anyhow::Result;
use common::{draft, new_expense, parse_date, spend, test_service};
use paytogether::application::{AppError, ExpenseFilter, NewExpense, SplitService, Timeframe};
use paytogether::domain::{Category, SettlementStrategy, ValidationError};
use paytogether::storage::MemoryStore;

async fn flat() -> Result<SplitService<MemoryStore>> {
    let service = SplitService::in_memory();
    service
        .create_group(draft("Flat", &["Asha", "Ben", "Chen"]))
        .await?;
    Ok(service)
}

#[tokio::test]
async fn test_add_expense_defaults_payer_to_active_user() -> Result<()> {
    let service = flat().await?;

    let expense = service
        .add_expense(NewExpense {
            paid_by: None,
            note: Some("weekly shop".into()),
            category: Category::Utilities,
            ..new_expense("  Groceries ", 4500, "ignored", &["Asha", "Ben"])
        })
        .await?;

    assert_eq!(expense.title, "Groceries");
    assert_eq!(expense.paid_by, "Asha");
    assert_eq!(expense.category, Category::Utilities);
    assert_eq!(expense.note.as_deref(), Some("weekly shop"));
    assert!(expense.id > 0);
    Ok(())
}

#[tokio::test]
async fn test_add_expense_validation() -> Result<()> {
    let service = flat().await?;

    let cases = [
        (new_expense("", 100, "Asha", &["Ben"]), "title"),
        (new_expense("Tea", 0, "Asha", &["Ben"]), "amount"),
        (new_expense("Tea", 100, "Zed", &["Ben"]), "payer"),
        (new_expense("Tea", 100, "Asha", &[]), "sharers"),
        (new_expense("Tea", 100, "Asha", &["Ben", "Zed"]), "unknown sharer"),
        (new_expense("Tea", 100, "Asha", &["Ben", "Ben"]), "duplicate sharer"),
    ];

    for (input, label) in cases {
        let result = service.add_expense(input).await;
        assert!(
            matches!(result, Err(AppError::Validation(_))),
            "expected validation error for {label}"
        );
    }
    assert!(service.all_expenses().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_add_expense_without_group() {
    let service = SplitService::in_memory();
    let result = service
        .add_expense(new_expense("Tea", 100, "Asha", &["Asha"]))
        .await;
    assert!(matches!(result, Err(AppError::GroupNotFound)));
}

#[tokio::test]
async fn test_expenses_keep_recorded_order() -> Result<()> {
    let (service, _temp) = test_service().await?;
    service
        .create_group(draft("Flat", &["Asha", "Ben", "Chen"]))
        .await?;

    for title in ["Rent", "Power", "Pizza"] {
        spend(&service, title, 1000, "Asha", &["Asha", "Ben"]).await?;
    }

    let expenses = service.all_expenses().await?;
    let titles: Vec<_> = expenses.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(titles, vec!["Rent", "Power", "Pizza"]);
    assert!(expenses.windows(2).all(|w| w[0].id < w[1].id));
    Ok(())
}

#[tokio::test]
async fn test_list_expenses_filters() -> Result<()> {
    let service = flat().await?;
    let dated = |title: &str, paid_by: &str, category: Category, date: &str| NewExpense {
        category,
        date: parse_date(date),
        ..new_expense(title, 1000, paid_by, &["Asha", "Ben", "Chen"])
    };

    service
        .add_expense(dated("Dinner", "Asha", Category::Food, "2024-06-20"))
        .await?;
    service
        .add_expense(dated("Taxi", "Ben", Category::Transportation, "2024-05-25"))
        .await?;
    service
        .add_expense(dated("Rent", "Chen", Category::Housing, "2024-03-01"))
        .await?;
    service
        .add_expense(dated("Breakfast", "Ben", Category::Food, "2024-06-28"))
        .await?;

    let as_of = parse_date("2024-06-30");
    let titles = |expenses: Vec<paytogether::domain::Expense>| -> Vec<String> {
        expenses.into_iter().map(|e| e.title).collect()
    };

    let all = service.list_expenses(&ExpenseFilter::all(as_of)).await?;
    assert_eq!(all.len(), 4);

    let food = ExpenseFilter {
        category: Some(Category::Food),
        ..ExpenseFilter::all(as_of)
    };
    assert_eq!(
        titles(service.list_expenses(&food).await?),
        vec!["Dinner", "Breakfast"]
    );

    let by_ben = ExpenseFilter {
        search: Some("BEN".into()),
        ..ExpenseFilter::all(as_of)
    };
    assert_eq!(
        titles(service.list_expenses(&by_ben).await?),
        vec!["Taxi", "Breakfast"]
    );

    let recent = ExpenseFilter {
        timeframe: Timeframe::Last30Days,
        ..ExpenseFilter::all(as_of)
    };
    assert_eq!(
        titles(service.list_expenses(&recent).await?),
        vec!["Dinner", "Breakfast"]
    );

    let quarter = ExpenseFilter {
        timeframe: Timeframe::Last90Days,
        limit: Some(2),
        ..ExpenseFilter::all(as_of)
    };
    assert_eq!(
        titles(service.list_expenses(&quarter).await?),
        vec!["Dinner", "Taxi"]
    );
    Ok(())
}

#[tokio::test]
async fn test_even_split_across_three() -> Result<()> {
    let service = flat().await?;
    spend(&service, "Dinner", 9000, "Asha", &["Asha", "Ben", "Chen"]).await?;

    let sheet = service.balances().await?;
    let balances: Vec<_> = sheet.iter().map(|b| (b.name.as_str(), b.balance)).collect();
    assert_eq!(balances, vec![("Asha", 6000), ("Ben", -3000), ("Chen", -3000)]);

    let asha = sheet.get("Asha").unwrap();
    assert_eq!(asha.paid, 9000);
    assert_eq!(asha.owes, 3000);
    Ok(())
}

#[tokio::test]
async fn test_uneven_split_rounds_final_balances() -> Result<()> {
    let service = flat().await?;
    spend(&service, "Dinner", 10000, "Asha", &["Asha", "Ben", "Chen"]).await?;

    let sheet = service.balances().await?;
    let balances: Vec<_> = sheet.iter().map(|b| (b.name.as_str(), b.balance)).collect();
    assert_eq!(balances, vec![("Asha", 6667), ("Ben", -3333), ("Chen", -3333)]);
    assert_eq!(sheet.get("Ben").unwrap().owes, 3333);
    Ok(())
}

#[tokio::test]
async fn test_two_person_settlement() -> Result<()> {
    let service = SplitService::in_memory();
    service.create_group(draft("Pair", &["A", "B"])).await?;
    spend(&service, "Lunch", 5000, "A", &["A", "B"]).await?;

    let sheet = service.balances().await?;
    assert_eq!(sheet.get("A").unwrap().balance, 2500);
    assert_eq!(sheet.get("B").unwrap().balance, -2500);

    for strategy in [SettlementStrategy::CrossProduct, SettlementStrategy::Greedy] {
        let settlements = service.settlements(strategy).await?;
        assert_eq!(settlements.len(), 1);
        assert_eq!(settlements[0].from, "B");
        assert_eq!(settlements[0].to, "A");
        assert_eq!(settlements[0].amount, 2500);
    }
    Ok(())
}

#[tokio::test]
async fn test_balance_conservation() -> Result<()> {
    let service = flat().await?;
    spend(&service, "Rent", 100000, "Asha", &["Asha", "Ben", "Chen"]).await?;
    spend(&service, "Taxi", 1001, "Ben", &["Ben", "Chen"]).await?;
    spend(&service, "Coffee", 700, "Chen", &["Asha"]).await?;
    spend(&service, "Snacks", 1000, "Chen", &["Asha", "Ben", "Chen"]).await?;

    let total: i64 = service.all_expenses().await?.iter().map(|e| e.amount).sum();
    let sheet = service.balances().await?;

    let slack = sheet.len() as i64;
    assert_eq!(sheet.total_paid(), total);
    assert!((sheet.total_owed() - total).abs() <= slack);
    assert!(sheet.net_total().abs() <= slack);
    for balance in &sheet {
        assert_eq!(balance.balance, balance.paid - balance.owes);
    }

    // Recomputing without changes gives the same sheet
    assert_eq!(service.balances().await?, sheet);
    Ok(())
}

#[tokio::test]
async fn test_greedy_settlements_clear_all_balances() -> Result<()> {
    let service = flat().await?;
    service.add_member("Dee").await?;
    spend(&service, "Hotel", 40000, "Asha", &["Asha", "Ben", "Chen", "Dee"]).await?;
    spend(&service, "Boat", 12000, "Ben", &["Asha", "Ben", "Chen", "Dee"]).await?;
    spend(&service, "Drinks", 3000, "Chen", &["Chen", "Dee"]).await?;

    let sheet = service.balances().await?;
    let settlements = service.settlements(SettlementStrategy::Greedy).await?;

    let mut remaining: std::collections::HashMap<_, _> =
        sheet.iter().map(|b| (b.name.clone(), b.balance)).collect();
    for s in &settlements {
        *remaining.get_mut(&s.from).unwrap() += s.amount;
        *remaining.get_mut(&s.to).unwrap() -= s.amount;
    }
    assert!(remaining.values().all(|&v| v == 0));
    assert!(settlements.len() <= 3);
    Ok(())
}

#[tokio::test]
async fn test_summary() -> Result<()> {
    let service = flat().await?;
    spend(&service, "Dinner", 9000, "Asha", &["Asha", "Ben", "Chen"]).await?;
    service
        .add_expense(NewExpense {
            category: Category::Housing,
            ..new_expense("Rent", 3000, "Ben", &["Asha", "Ben", "Chen"])
        })
        .await?;

    let summary = service.summary(SettlementStrategy::CrossProduct).await?;
    assert_eq!(summary.group_name, "Flat");
    assert_eq!(summary.participant_count, 3);
    assert_eq!(summary.expense_count, 2);
    assert_eq!(summary.total_spent, 12000);
    assert_eq!(summary.member_spending[0].percentage, 75);
    assert_eq!(summary.member_spending[1].percentage, 25);
    assert_eq!(summary.categories[0].category, Category::Food);
    assert_eq!(summary.categories[1].category, Category::Housing);

    let you = summary.active_user.unwrap();
    assert_eq!(you.name, "Asha");
    assert_eq!(you.balance, 5000);
    assert!(!summary.settlements.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_validation_message_is_readable() -> Result<()> {
    let service = flat().await?;
    let err = service
        .add_expense(new_expense("Tea", 100, "Asha", &["Zed"]))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Validation(ValidationError::UnknownSharer(ref name)) if name == "Zed"
    ));
    assert!(err.to_string().contains("Zed"));
    Ok(())
}
