use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::{Balance, BalanceSheet, Category, Cents, Currency, Expense, Settlement};

/// Everything the expenses overview shows for a group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSummary {
    pub group_name: String,
    pub currency: Currency,
    pub participant_count: usize,
    pub expense_count: usize,
    pub total_spent: Cents,
    pub balances: BalanceSheet,
    pub settlements: Vec<Settlement>,
    pub member_spending: Vec<MemberSpending>,
    pub categories: Vec<CategorySummary>,
    /// Position of the active user, if they are still a participant
    pub active_user: Option<Balance>,
}

/// How much of the group's total spend one member paid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberSpending {
    pub name: String,
    pub paid: Cents,
    /// Whole-number share of the total paid, 0 when nothing was spent
    pub percentage: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub category: Category,
    pub total: Cents,
    pub count: usize,
    pub percentage: f64,
}

pub(crate) fn member_spending(sheet: &BalanceSheet) -> Vec<MemberSpending> {
    let total = sheet.total_paid();
    sheet
        .iter()
        .map(|balance| MemberSpending {
            name: balance.name.clone(),
            paid: balance.paid,
            percentage: percent_of(balance.paid, total).round() as u32,
        })
        .collect()
}

/// Totals per category, largest first. Only well-formed expenses count.
pub(crate) fn category_breakdown(expenses: &[Expense]) -> Vec<CategorySummary> {
    let mut totals: HashMap<Category, (Cents, usize)> = HashMap::new();
    for expense in expenses.iter().filter(|e| e.is_well_formed()) {
        let entry = totals.entry(expense.category).or_insert((0, 0));
        entry.0 += expense.amount;
        entry.1 += 1;
    }

    let grand_total: Cents = totals.values().map(|(total, _)| total).sum();
    let mut categories: Vec<CategorySummary> = Category::ALL
        .into_iter()
        .filter_map(|category| {
            totals.get(&category).map(|&(total, count)| CategorySummary {
                category,
                total,
                count,
                percentage: percent_of(total, grand_total),
            })
        })
        .collect();

    categories.sort_by(|a, b| b.total.cmp(&a.total));
    categories
}

fn percent_of(part: Cents, total: Cents) -> f64 {
    if total > 0 {
        part as f64 / total as f64 * 100.0
    } else {
        0.0
    }
}
