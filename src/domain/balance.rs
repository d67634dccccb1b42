use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{Cents, Expense, Group};

/// Net position of one participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub name: String,
    /// Total this participant paid out
    pub paid: Cents,
    /// Total of this participant's shares, to the nearest cent
    pub owes: Cents,
    /// `paid - owes`: positive means the group owes them
    pub balance: Cents,
}

/// Balances for every participant, in group order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSheet {
    entries: Vec<Balance>,
}

impl BalanceSheet {
    pub fn get(&self, name: &str) -> Option<&Balance> {
        self.entries.iter().find(|b| b.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Balance> {
        self.entries.iter()
    }

    pub fn entries(&self) -> &[Balance] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_paid(&self) -> Cents {
        self.entries.iter().map(|b| b.paid).sum()
    }

    pub fn total_owed(&self) -> Cents {
        self.entries.iter().map(|b| b.owes).sum()
    }

    /// Sum of all net balances. Off from zero by at most a cent per
    /// participant whenever every expense only names participants of the group.
    pub fn net_total(&self) -> Cents {
        self.entries.iter().map(|b| b.balance).sum()
    }

    /// True when nobody owes or is owed anything.
    pub fn is_settled(&self) -> bool {
        self.entries.iter().all(|b| b.balance == 0)
    }
}

impl<'a> IntoIterator for &'a BalanceSheet {
    type Item = &'a Balance;
    type IntoIter = std::slice::Iter<'a, Balance>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Compute every participant's paid, owed and net amounts from scratch.
///
/// Each co-sharer owes `amount / paid_for.len()` exactly; only the final
/// balance is rounded to the cent, and `owes` is derived as `paid - balance`.
///
/// Malformed expenses (no payer, no co-sharers, non-positive amount) are
/// skipped. Names that are not participants of the group are ignored, so
/// an expense naming a removed member still counts for everyone else.
pub fn compute_balances(group: &Group, expenses: &[Expense]) -> BalanceSheet {
    let mut entries: Vec<Balance> = group
        .participants
        .iter()
        .map(|p| Balance {
            name: p.name.clone(),
            paid: 0,
            owes: 0,
            balance: 0,
        })
        .collect();

    let index: HashMap<&str, usize> = group
        .participants
        .iter()
        .enumerate()
        .map(|(i, p)| (p.name.as_str(), i))
        .collect();

    // Shares are kept unrounded until the very end
    let mut owed = vec![0.0_f64; entries.len()];

    for expense in expenses {
        if !expense.is_well_formed() {
            tracing::debug!(expense_id = expense.id, "skipping malformed expense");
            continue;
        }

        if let Some(&i) = index.get(expense.paid_by.as_str()) {
            entries[i].paid += expense.amount;
        }

        let share = expense.amount as f64 / expense.paid_for.len() as f64;
        for name in &expense.paid_for {
            if let Some(&i) = index.get(name.as_str()) {
                owed[i] += share;
            }
        }
    }

    for (entry, owed) in entries.iter_mut().zip(owed) {
        entry.balance = round_half_up(entry.paid as f64 - owed);
        entry.owes = entry.paid - entry.balance;
    }

    BalanceSheet { entries }
}

/// Round fractional cents to the nearest cent, ties toward positive infinity.
fn round_half_up(cents: f64) -> Cents {
    (cents + 0.5).floor() as Cents
}
