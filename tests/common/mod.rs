// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use chrono::NaiveDate;
use paytogether::application::{GroupDraft, NewExpense, SplitService};
use paytogether::domain::{Category, Cents, Currency, Expense};
use paytogether::storage::SqliteStore;
use tempfile::TempDir;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(SplitService<SqliteStore>, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = SplitService::init(db_path.to_str().unwrap()).await?;
    Ok((service, temp_dir))
}

/// Helper to parse a YYYY-MM-DD date
pub fn parse_date(date_str: &str) -> NaiveDate {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d").unwrap()
}

/// Draft for a group with the given members, in rupees
pub fn draft(name: &str, members: &[&str]) -> GroupDraft {
    GroupDraft {
        group_name: name.to_string(),
        currency: Currency::Inr,
        participants: members.iter().map(|m| m.to_string()).collect(),
        ..GroupDraft::default()
    }
}

/// Expense input dated 2024-06-01 in the food category
pub fn new_expense(title: &str, amount: Cents, paid_by: &str, paid_for: &[&str]) -> NewExpense {
    NewExpense {
        title: title.to_string(),
        amount,
        paid_by: Some(paid_by.to_string()),
        paid_for: paid_for.iter().map(|m| m.to_string()).collect(),
        category: Category::Food,
        date: parse_date("2024-06-01"),
        note: None,
    }
}

/// Record an expense, returning the stored record
pub async fn spend<S: paytogether::storage::KeyValueStore>(
    service: &SplitService<S>,
    title: &str,
    amount: Cents,
    paid_by: &str,
    paid_for: &[&str],
) -> Result<Expense> {
    Ok(service
        .add_expense(new_expense(title, amount, paid_by, paid_for))
        .await?)
}
