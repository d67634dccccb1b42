use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{Cents, Group, ValidationError, money};

pub type ExpenseId = i64;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[default]
    Food,
    Housing,
    Transportation,
    Entertainment,
    Utilities,
    Other,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Food,
        Category::Housing,
        Category::Transportation,
        Category::Entertainment,
        Category::Utilities,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Food => "Food",
            Category::Housing => "Housing",
            Category::Transportation => "Transportation",
            Category::Entertainment => "Entertainment",
            Category::Utilities => "Utilities",
            Category::Other => "Other",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(s.trim()))
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single payment made by one participant on behalf of some co-sharers.
/// Expenses are immutable once recorded.
///
/// Every field except `title` and `date` tolerates being absent in stored
/// data: such records load, then get skipped by the balance computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    /// Assigned by the ledger store on append
    #[serde(default)]
    pub id: ExpenseId,
    pub title: String,
    #[serde(default)]
    pub category: Category,
    pub date: NaiveDate,
    #[serde(default, with = "money::decimal")]
    pub amount: Cents,
    /// Name of the participant who paid
    #[serde(default)]
    pub paid_by: String,
    /// Names of the participants sharing the cost, payer included if they took part
    #[serde(default)]
    pub paid_for: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl Expense {
    /// Create a new expense. The id must be assigned by the ledger store.
    pub fn new<I, S>(
        title: impl Into<String>,
        amount: Cents,
        paid_by: impl Into<String>,
        paid_for: I,
        date: NaiveDate,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: 0,
            title: title.into(),
            category: Category::default(),
            date,
            amount,
            paid_by: paid_by.into(),
            paid_for: paid_for.into_iter().map(Into::into).collect(),
            note: None,
        }
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        let note = note.into();
        self.note = if note.trim().is_empty() {
            None
        } else {
            Some(note)
        };
        self
    }

    /// Whether the record can take part in balance computation.
    pub fn is_well_formed(&self) -> bool {
        !self.paid_by.is_empty() && !self.paid_for.is_empty() && self.amount > 0
    }

    /// True if `name` paid for or shares this expense.
    pub fn involves(&self, name: &str) -> bool {
        self.paid_by == name || self.paid_for.iter().any(|n| n == name)
    }

    /// Validate the expense against the group it is being recorded in.
    pub fn validate(&self, group: &Group) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::MissingTitle);
        }
        if self.amount <= 0 {
            return Err(ValidationError::InvalidAmount);
        }
        if self.paid_by.trim().is_empty() {
            return Err(ValidationError::MissingPayer);
        }
        if !group.has_participant(&self.paid_by) {
            return Err(ValidationError::UnknownPayer(self.paid_by.clone()));
        }
        if self.paid_for.is_empty() {
            return Err(ValidationError::NoSharers);
        }

        let mut seen = HashSet::new();
        for name in &self.paid_for {
            if !group.has_participant(name) {
                return Err(ValidationError::UnknownSharer(name.clone()));
            }
            if !seen.insert(name.as_str()) {
                return Err(ValidationError::DuplicateSharer(name.clone()));
            }
        }
        Ok(())
    }
}
