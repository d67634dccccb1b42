use anyhow::Context;
use chrono::Utc;
use thiserror::Error;

use crate::domain::{Expense, ExpenseId, Group, Participant, ValidationError};

use super::KeyValueStore;

/// Key holding the serialized [`Group`].
pub const GROUP_KEY: &str = "group-data";

/// Key holding the serialized, ordered list of [`Expense`] records.
pub const EXPENSES_KEY: &str = "expense-list";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("No group has been created yet")]
    NoGroup,

    #[error("Participant not found: {0}")]
    ParticipantNotFound(String),

    #[error("Cannot remove {name}: they have {count} associated expense(s)")]
    HasExpenses { name: String, count: usize },

    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("Storage error: {0}")]
    Backend(#[from] anyhow::Error),
}

/// The group and its expenses, persisted as two JSON blobs.
///
/// Every mutation rewrites the whole blob it touches; last write wins.
pub struct LedgerStore<S> {
    backend: S,
}

impl<S: KeyValueStore> LedgerStore<S> {
    pub fn new(backend: S) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    /// Load the group, or `None` if none has been created yet.
    pub async fn load_group(&self) -> Result<Option<Group>, StoreError> {
        let Some(raw) = self.backend.get(GROUP_KEY).await? else {
            return Ok(None);
        };
        let group = serde_json::from_str(&raw)
            .with_context(|| format!("Corrupt data under key '{}'", GROUP_KEY))?;
        Ok(Some(group))
    }

    /// Overwrite the stored group.
    pub async fn save_group(&self, group: &Group) -> Result<(), StoreError> {
        let raw = serde_json::to_string(group).context("Failed to serialize group")?;
        self.backend.set(GROUP_KEY, &raw).await?;
        tracing::debug!(group = %group.group_name, "saved group");
        Ok(())
    }

    /// Load all expenses in recorded order (empty if none).
    pub async fn load_expenses(&self) -> Result<Vec<Expense>, StoreError> {
        let Some(raw) = self.backend.get(EXPENSES_KEY).await? else {
            return Ok(Vec::new());
        };
        let expenses = serde_json::from_str(&raw)
            .with_context(|| format!("Corrupt data under key '{}'", EXPENSES_KEY))?;
        Ok(expenses)
    }

    /// Overwrite the stored expense list.
    pub async fn save_expenses(&self, expenses: &[Expense]) -> Result<(), StoreError> {
        let raw = serde_json::to_string(expenses).context("Failed to serialize expenses")?;
        self.backend.set(EXPENSES_KEY, &raw).await?;
        tracing::debug!(count = expenses.len(), "saved expenses");
        Ok(())
    }

    /// Validate an expense against the stored group, assign its id and append it.
    ///
    /// Ids are millisecond timestamps bumped past the last stored id, so they
    /// stay unique and strictly increasing within the list.
    pub async fn append_expense(&self, mut expense: Expense) -> Result<Expense, StoreError> {
        let group = self.load_group().await?.ok_or(StoreError::NoGroup)?;
        expense.validate(&group)?;

        let mut expenses = self.load_expenses().await?;
        expense.id = next_expense_id(&expenses, Utc::now().timestamp_millis());
        expenses.push(expense.clone());
        self.save_expenses(&expenses).await?;

        Ok(expense)
    }

    /// Remove a participant that no stored expense references.
    ///
    /// Refused when it would leave fewer than two participants.
    pub async fn remove_participant(&self, name: &str) -> Result<Participant, StoreError> {
        let mut group = self.load_group().await?.ok_or(StoreError::NoGroup)?;
        if !group.has_participant(name) {
            return Err(StoreError::ParticipantNotFound(name.to_string()));
        }
        if group.participants.len() <= 2 {
            return Err(ValidationError::TooFewParticipants.into());
        }

        let count = self
            .load_expenses()
            .await?
            .iter()
            .filter(|expense| expense.involves(name))
            .count();
        if count > 0 {
            return Err(StoreError::HasExpenses {
                name: name.to_string(),
                count,
            });
        }

        let removed = group
            .remove_participant(name)
            .ok_or_else(|| StoreError::ParticipantNotFound(name.to_string()))?;
        self.save_group(&group).await?;
        Ok(removed)
    }

    /// Erase the group and all expenses. There is no undo.
    pub async fn clear_all(&self) -> Result<(), StoreError> {
        self.backend.remove(GROUP_KEY).await?;
        self.backend.remove(EXPENSES_KEY).await?;
        Ok(())
    }

    /// True when both a group and an expense list have been stored.
    pub async fn is_returning_user(&self) -> Result<bool, StoreError> {
        Ok(self.backend.get(GROUP_KEY).await?.is_some()
            && self.backend.get(EXPENSES_KEY).await?.is_some())
    }
}

fn next_expense_id(expenses: &[Expense], now_millis: i64) -> ExpenseId {
    let last = expenses.iter().map(|e| e.id).max().unwrap_or(0);
    now_millis.max(last + 1)
}
