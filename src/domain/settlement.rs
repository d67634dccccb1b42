use serde::{Deserialize, Serialize};

use super::{BalanceSheet, Cents};

/// A suggested payment from a net debtor to a net creditor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub from: String,
    pub to: String,
    pub amount: Cents,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SettlementStrategy {
    /// Every debtor paired with every creditor against the static balances.
    /// Easy to read but not a minimal plan: amounts are not decremented as
    /// suggestions are emitted, so following all of them overpays.
    #[default]
    CrossProduct,
    /// Largest debtor settles with largest creditor until one side runs out.
    /// Emits at most `debtors + creditors - 1` payments.
    Greedy,
}

impl SettlementStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettlementStrategy::CrossProduct => "cross-product",
            SettlementStrategy::Greedy => "greedy",
        }
    }
}

/// Suggest payments that would reduce outstanding balances.
pub fn suggest_settlements(sheet: &BalanceSheet, strategy: SettlementStrategy) -> Vec<Settlement> {
    match strategy {
        SettlementStrategy::CrossProduct => cross_product(sheet),
        SettlementStrategy::Greedy => greedy(sheet),
    }
}

fn cross_product(sheet: &BalanceSheet) -> Vec<Settlement> {
    let debtors: Vec<_> = sheet.iter().filter(|b| b.balance < 0).collect();
    let creditors: Vec<_> = sheet.iter().filter(|b| b.balance > 0).collect();

    let mut settlements = Vec::new();
    for debtor in &debtors {
        for creditor in &creditors {
            let amount = debtor.balance.abs().min(creditor.balance);
            if amount > 0 {
                settlements.push(Settlement {
                    from: debtor.name.clone(),
                    to: creditor.name.clone(),
                    amount,
                });
            }
        }
    }
    settlements
}

fn greedy(sheet: &BalanceSheet) -> Vec<Settlement> {
    // (name, outstanding amount) with amounts kept positive on both sides
    let mut debtors: Vec<(&str, Cents)> = sheet
        .iter()
        .filter(|b| b.balance < 0)
        .map(|b| (b.name.as_str(), -b.balance))
        .collect();
    let mut creditors: Vec<(&str, Cents)> = sheet
        .iter()
        .filter(|b| b.balance > 0)
        .map(|b| (b.name.as_str(), b.balance))
        .collect();

    // Ascending so the largest sits at the end; stable sort keeps sheet order on ties
    debtors.sort_by_key(|&(_, amount)| amount);
    creditors.sort_by_key(|&(_, amount)| amount);

    let mut settlements = Vec::new();
    while let (Some(&(debtor, owed)), Some(&(creditor, due))) = (debtors.last(), creditors.last())
    {
        let amount = owed.min(due);
        settlements.push(Settlement {
            from: debtor.to_string(),
            to: creditor.to_string(),
            amount,
        });

        debtors.pop();
        creditors.pop();
        if owed > amount {
            insert_sorted(&mut debtors, (debtor, owed - amount));
        }
        if due > amount {
            insert_sorted(&mut creditors, (creditor, due - amount));
        }
    }
    settlements
}

fn insert_sorted<'a>(queue: &mut Vec<(&'a str, Cents)>, entry: (&'a str, Cents)) {
    let at = queue.partition_point(|&(_, amount)| amount <= entry.1);
    queue.insert(at, entry);
}
