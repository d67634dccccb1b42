use anyhow::{Context, Result};
use std::io::Read;

use super::LedgerSnapshot;
use crate::application::SplitService;
use crate::storage::KeyValueStore;

/// Result of an import operation
#[derive(Debug, Clone)]
pub struct ImportResult {
    pub group_name: String,
    pub participants: usize,
    pub expenses: usize,
    pub errors: Vec<ImportError>,
    /// False for dry runs and for snapshots that failed validation
    pub applied: bool,
}

/// Problem found while validating a snapshot
#[derive(Debug, Clone)]
pub struct ImportError {
    /// 1-based position in the expense list, `None` for the group itself
    pub expense: Option<usize>,
    pub error: String,
}

impl std::fmt::Display for ImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.expense {
            Some(position) => write!(f, "expense #{}: {}", position, self.error),
            None => write!(f, "group: {}", self.error),
        }
    }
}

/// Options for import operations
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    pub dry_run: bool,
}

/// Importer for loading a snapshot into the ledger
pub struct Importer<'a, S> {
    service: &'a SplitService<S>,
}

impl<'a, S: KeyValueStore> Importer<'a, S> {
    pub fn new(service: &'a SplitService<S>) -> Self {
        Self { service }
    }

    /// Replace the stored group and expenses with a JSON snapshot.
    ///
    /// Nothing is written unless the group and every expense validate.
    pub async fn import_snapshot_json<R: Read>(
        &self,
        reader: R,
        options: ImportOptions,
    ) -> Result<ImportResult> {
        let snapshot: LedgerSnapshot =
            serde_json::from_reader(reader).context("Failed to parse snapshot JSON")?;
        let errors = validate_snapshot(&snapshot);

        let mut result = ImportResult {
            group_name: snapshot.group.group_name.clone(),
            participants: snapshot.group.participants.len(),
            expenses: snapshot.expenses.len(),
            errors,
            applied: false,
        };

        if options.dry_run || !result.errors.is_empty() {
            tracing::info!(
                dry_run = options.dry_run,
                errors = result.errors.len(),
                "snapshot not applied"
            );
            return Ok(result);
        }

        self.service
            .replace_ledger(snapshot.group, snapshot.expenses)
            .await?;
        result.applied = true;
        Ok(result)
    }
}

/// Collect every validation problem in a snapshot.
pub fn validate_snapshot(snapshot: &LedgerSnapshot) -> Vec<ImportError> {
    if let Err(err) = snapshot.group.validate() {
        // Expenses cannot be checked against an invalid group
        return vec![ImportError {
            expense: None,
            error: err.to_string(),
        }];
    }

    snapshot
        .expenses
        .iter()
        .enumerate()
        .filter_map(|(i, expense)| {
            expense.validate(&snapshot.group).err().map(|err| ImportError {
                expense: Some(i + 1),
                error: err.to_string(),
            })
        })
        .collect()
}
