use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write as _};
use std::io::Write;

use crate::application::SplitService;
use crate::domain::{
    BalanceSheet, Cents, Expense, Group, Settlement, SettlementStrategy, format_cents,
};
use crate::storage::KeyValueStore;

/// Full ledger snapshot for export/import
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub group: Group,
    pub expenses: Vec<Expense>,
}

/// Exporter for converting ledger data to various formats
pub struct Exporter<'a, S> {
    service: &'a SplitService<S>,
}

impl<'a, S: KeyValueStore> Exporter<'a, S> {
    pub fn new(service: &'a SplitService<S>) -> Self {
        Self { service }
    }

    /// Export the printable group summary as plain text
    pub async fn export_summary_text<W: Write>(
        &self,
        mut writer: W,
        generated_on: NaiveDate,
    ) -> Result<usize> {
        let group = self.service.group().await?;
        let expenses = self.service.all_expenses().await?;
        let balances = self.service.balances().await?;
        let settlements = self
            .service
            .settlements(SettlementStrategy::CrossProduct)
            .await?;

        let text = render_text_summary(&group, &expenses, &balances, &settlements, generated_on);
        writer.write_all(text.as_bytes())?;
        writer.flush()?;
        Ok(expenses.len())
    }

    /// Export expenses to CSV format
    pub async fn export_expenses_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let expenses = self.service.all_expenses().await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "id", "date", "title", "category", "amount", "paid_by", "paid_for", "note",
        ])?;

        let mut count = 0;
        for expense in &expenses {
            csv_writer.write_record([
                expense.id.to_string(),
                expense.date.format("%Y-%m-%d").to_string(),
                expense.title.clone(),
                expense.category.as_str().to_string(),
                format_cents(expense.amount),
                expense.paid_by.clone(),
                expense.paid_for.join(";"),
                expense.note.clone().unwrap_or_default(),
            ])?;
            count += 1;
        }

        csv_writer.flush()?;
        Ok(count)
    }

    /// Export member balances to CSV format
    pub async fn export_balances_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let balances = self.service.balances().await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(["name", "paid", "owes", "balance"])?;

        for balance in &balances {
            csv_writer.write_record([
                balance.name.clone(),
                format_cents(balance.paid),
                format_cents(balance.owes),
                format_cents(balance.balance),
            ])?;
        }

        csv_writer.flush()?;
        Ok(balances.len())
    }

    /// Export the group and all expenses as a JSON snapshot
    pub async fn export_snapshot_json<W: Write>(&self, mut writer: W) -> Result<LedgerSnapshot> {
        let snapshot = LedgerSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            group: self.service.group().await?,
            expenses: self.service.all_expenses().await?,
        };

        let json = serde_json::to_string_pretty(&snapshot)?;
        writer.write_all(json.as_bytes())?;
        writer.flush()?;

        Ok(snapshot)
    }
}

/// Render the printable summary of a group.
pub fn render_text_summary(
    group: &Group,
    expenses: &[Expense],
    balances: &BalanceSheet,
    settlements: &[Settlement],
    generated_on: NaiveDate,
) -> String {
    let mut out = String::new();
    // Writing into a String only fails if a Display impl does
    let written = write_summary(&mut out, group, expenses, balances, settlements, generated_on);
    if let Err(err) = written {
        tracing::warn!(error = %err, "text summary truncated");
    }
    out
}

fn write_summary(
    out: &mut String,
    group: &Group,
    expenses: &[Expense],
    balances: &BalanceSheet,
    settlements: &[Settlement],
    generated_on: NaiveDate,
) -> fmt::Result {
    let currency = group.currency;
    let rule = "-".repeat(44);

    writeln!(out, "{} - Expense Summary", group.group_name)?;
    writeln!(out, "Date: {}", generated_on.format("%Y-%m-%d"))?;
    writeln!(out, "Currency: {} ({})", currency.code(), currency.symbol())?;
    if let Some(details) = &group.group_details {
        writeln!(out, "{}", details)?;
    }

    writeln!(out)?;
    writeln!(out, "Expenses")?;
    writeln!(out, "{}", rule)?;
    if expenses.is_empty() {
        writeln!(out, "No expenses recorded.")?;
    }
    for expense in expenses {
        writeln!(
            out,
            "{} - {} - {} (Paid by: {})",
            expense.date.format("%Y-%m-%d"),
            expense.title,
            currency.format(expense.amount),
            expense.paid_by
        )?;
    }

    writeln!(out)?;
    writeln!(out, "Member Summary")?;
    writeln!(out, "{}", rule)?;
    for balance in balances {
        writeln!(
            out,
            "{}: Paid {}, Give {}, Balance {}",
            balance.name,
            currency.format(balance.paid),
            currency.format(balance.owes),
            currency.format_signed(balance.balance)
        )?;
    }

    writeln!(out)?;
    writeln!(out, "Payment Summary")?;
    writeln!(out, "{}", rule)?;
    if settlements.is_empty() {
        writeln!(out, "Everyone is settled up! No payments needed.")?;
    }
    for settlement in settlements {
        writeln!(
            out,
            "{} pays {} {}",
            settlement.from,
            settlement.to,
            currency.format(settlement.amount)
        )?;
    }

    let total: Cents = expenses.iter().map(|e| e.amount).sum();
    writeln!(out)?;
    writeln!(out, "Total Group Expenses: {}", currency.format(total))
}
