use chrono::{Duration, NaiveDate};

use crate::domain::{
    BalanceSheet, Category, Cents, Currency, Expense, Group, Participant, Settlement,
    SettlementStrategy, ValidationError, compute_balances, suggest_settlements,
};
use crate::storage::{KeyValueStore, LedgerStore, MemoryStore, SqliteStore};

use super::AppError;
use super::reporting::{GroupSummary, category_breakdown, member_spending};

/// Application service providing the expense-splitting use cases.
/// This is the primary interface for any client (CLI, tests, future UIs).
pub struct SplitService<S = SqliteStore> {
    store: LedgerStore<S>,
}

/// Input for creating a group
#[derive(Debug, Clone, Default)]
pub struct GroupDraft {
    pub group_name: String,
    pub currency: Currency,
    pub group_details: Option<String>,
    pub participants: Vec<String>,
    /// Defaults to the first participant
    pub active_user: Option<String>,
}

/// Changes to a group's settings; `None` leaves a field untouched
#[derive(Debug, Clone, Default)]
pub struct GroupSettings {
    pub group_name: Option<String>,
    pub currency: Option<Currency>,
    /// An empty string clears the details
    pub group_details: Option<String>,
    pub active_user: Option<String>,
}

/// Input for recording an expense
#[derive(Debug, Clone)]
pub struct NewExpense {
    pub title: String,
    pub amount: Cents,
    /// Defaults to the group's active user
    pub paid_by: Option<String>,
    pub paid_for: Vec<String>,
    pub category: Category,
    pub date: NaiveDate,
    pub note: Option<String>,
}

/// Relative date window for the expense history
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Timeframe {
    #[default]
    All,
    Last30Days,
    Last90Days,
}

impl Timeframe {
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::All => "all",
            Timeframe::Last30Days => "last30",
            Timeframe::Last90Days => "last90",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "all" => Some(Timeframe::All),
            "last30" => Some(Timeframe::Last30Days),
            "last90" => Some(Timeframe::Last90Days),
            _ => None,
        }
    }

    /// Earliest date included when looking back from `as_of`.
    pub fn since(&self, as_of: NaiveDate) -> Option<NaiveDate> {
        match self {
            Timeframe::All => None,
            Timeframe::Last30Days => Some(as_of - Duration::days(30)),
            Timeframe::Last90Days => Some(as_of - Duration::days(90)),
        }
    }
}

/// Filter for querying the expense history
#[derive(Debug, Clone)]
pub struct ExpenseFilter {
    /// Case-insensitive match on title or payer
    pub search: Option<String>,
    pub category: Option<Category>,
    pub timeframe: Timeframe,
    /// Reference date for the timeframe
    pub as_of: NaiveDate,
    pub limit: Option<usize>,
}

impl ExpenseFilter {
    pub fn all(as_of: NaiveDate) -> Self {
        Self {
            search: None,
            category: None,
            timeframe: Timeframe::All,
            as_of,
            limit: None,
        }
    }

    pub fn matches(&self, expense: &Expense) -> bool {
        if let Some(term) = &self.search {
            let term = term.to_lowercase();
            if !expense.title.to_lowercase().contains(&term)
                && !expense.paid_by.to_lowercase().contains(&term)
            {
                return false;
            }
        }
        if let Some(category) = self.category {
            if expense.category != category {
                return false;
            }
        }
        match self.timeframe.since(self.as_of) {
            Some(since) => expense.date >= since,
            None => true,
        }
    }
}

impl SplitService<SqliteStore> {
    /// Initialize a new database at the given path.
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let backend = SqliteStore::init(&db_url).await?;
        Ok(Self::new(LedgerStore::new(backend)))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let backend = SqliteStore::connect(&db_url).await?;
        Ok(Self::new(LedgerStore::new(backend)))
    }
}

impl SplitService<MemoryStore> {
    pub fn in_memory() -> Self {
        Self::new(LedgerStore::new(MemoryStore::new()))
    }
}

impl<S: KeyValueStore> SplitService<S> {
    pub fn new(store: LedgerStore<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &LedgerStore<S> {
        &self.store
    }

    // ========================
    // Group operations
    // ========================

    /// Create the group, replacing any existing one. Existing expenses are kept.
    pub async fn create_group(&self, draft: GroupDraft) -> Result<Group, AppError> {
        let mut group = Group::new(&draft.group_name, draft.currency, &draft.participants)?;
        if let Some(details) = draft.group_details {
            group = group.with_details(details);
        }
        if let Some(active_user) = draft.active_user.as_deref() {
            group = group.with_active_user(active_user)?;
        }

        self.store.save_group(&group).await?;
        if !self.store.is_returning_user().await? {
            let expenses = self.store.load_expenses().await?;
            self.store.save_expenses(&expenses).await?;
        }

        tracing::info!(
            group = %group.group_name,
            participants = group.participants.len(),
            "created group"
        );
        Ok(group)
    }

    /// Get the current group.
    pub async fn group(&self) -> Result<Group, AppError> {
        self.store.load_group().await?.ok_or(AppError::GroupNotFound)
    }

    /// Whether both a group and an expense list exist.
    pub async fn is_returning_user(&self) -> Result<bool, AppError> {
        Ok(self.store.is_returning_user().await?)
    }

    /// Edit the group's name, currency, details or active user.
    pub async fn update_settings(&self, settings: GroupSettings) -> Result<Group, AppError> {
        let mut group = self.group().await?;

        if let Some(name) = settings.group_name {
            let name = name.trim();
            if name.is_empty() {
                return Err(ValidationError::MissingGroupName.into());
            }
            group.group_name = name.to_string();
        }
        if let Some(currency) = settings.currency {
            group.currency = currency;
        }
        if let Some(details) = settings.group_details {
            group = group.with_details(details);
        }
        if let Some(active_user) = settings.active_user.as_deref() {
            group.set_active_user(active_user)?;
        }

        self.store.save_group(&group).await?;
        tracing::info!(group = %group.group_name, "updated group settings");
        Ok(group)
    }

    /// Delete the group and all of its expenses.
    pub async fn delete_group(&self) -> Result<(), AppError> {
        self.store.clear_all().await?;
        tracing::info!("deleted group and expenses");
        Ok(())
    }

    // ========================
    // Member operations
    // ========================

    /// Add a member to the group.
    pub async fn add_member(&self, name: &str) -> Result<Participant, AppError> {
        let mut group = self.group().await?;
        if group.has_participant(name.trim()) {
            return Err(AppError::ParticipantAlreadyExists(name.trim().to_string()));
        }

        let participant = group.add_participant(name)?.clone();
        self.store.save_group(&group).await?;

        tracing::info!(member = %participant.name, "added member");
        Ok(participant)
    }

    /// Remove a member who has no expenses.
    pub async fn remove_member(&self, name: &str) -> Result<Participant, AppError> {
        match self.store.remove_participant(name).await {
            Ok(participant) => {
                tracing::info!(member = %participant.name, "removed member");
                Ok(participant)
            }
            Err(err) => {
                tracing::warn!(member = name, error = %err, "member removal refused");
                Err(err.into())
            }
        }
    }

    // ========================
    // Expense operations
    // ========================

    /// Record a new expense.
    pub async fn add_expense(&self, new: NewExpense) -> Result<Expense, AppError> {
        let paid_by = match new.paid_by {
            Some(name) => name.trim().to_string(),
            None => self.group().await?.active_user,
        };

        let mut expense = Expense::new(
            new.title.trim(),
            new.amount,
            paid_by,
            new.paid_for.iter().map(|name| name.trim()),
            new.date,
        )
        .with_category(new.category);
        if let Some(note) = new.note {
            expense = expense.with_note(note);
        }

        let expense = self.store.append_expense(expense).await?;
        tracing::info!(
            expense_id = expense.id,
            amount = expense.amount,
            paid_by = %expense.paid_by,
            "recorded expense"
        );
        Ok(expense)
    }

    /// All expenses in recorded order.
    pub async fn all_expenses(&self) -> Result<Vec<Expense>, AppError> {
        Ok(self.store.load_expenses().await?)
    }

    /// Expenses matching a filter, in recorded order.
    pub async fn list_expenses(&self, filter: &ExpenseFilter) -> Result<Vec<Expense>, AppError> {
        let expenses = self.store.load_expenses().await?;
        let matching = expenses.into_iter().filter(|e| filter.matches(e));
        Ok(match filter.limit {
            Some(limit) => matching.take(limit).collect(),
            None => matching.collect(),
        })
    }

    // ========================
    // Balances
    // ========================

    /// Current balances of every member.
    pub async fn balances(&self) -> Result<BalanceSheet, AppError> {
        let group = self.group().await?;
        let expenses = self.store.load_expenses().await?;
        Ok(compute_balances(&group, &expenses))
    }

    /// Suggested payments to settle up.
    pub async fn settlements(
        &self,
        strategy: SettlementStrategy,
    ) -> Result<Vec<Settlement>, AppError> {
        let sheet = self.balances().await?;
        Ok(suggest_settlements(&sheet, strategy))
    }

    /// Totals, balances, settlements and breakdowns for the whole group.
    pub async fn summary(&self, strategy: SettlementStrategy) -> Result<GroupSummary, AppError> {
        let group = self.group().await?;
        let expenses = self.store.load_expenses().await?;
        let balances = compute_balances(&group, &expenses);

        Ok(GroupSummary {
            group_name: group.group_name.clone(),
            currency: group.currency,
            participant_count: group.participants.len(),
            expense_count: expenses.len(),
            total_spent: expenses
                .iter()
                .filter(|e| e.is_well_formed())
                .map(|e| e.amount)
                .sum(),
            settlements: suggest_settlements(&balances, strategy),
            member_spending: member_spending(&balances),
            categories: category_breakdown(&expenses),
            active_user: balances.get(&group.active_user).cloned(),
            balances,
        })
    }

    // ========================
    // Bulk replacement
    // ========================

    /// Replace the stored group and expenses wholesale, e.g. from a snapshot.
    /// Everything is validated before anything is written.
    pub async fn replace_ledger(&self, group: Group, expenses: Vec<Expense>) -> Result<(), AppError> {
        group.validate()?;
        for expense in &expenses {
            expense.validate(&group)?;
        }

        self.store.save_group(&group).await?;
        self.store.save_expenses(&expenses).await?;
        tracing::info!(
            group = %group.group_name,
            expenses = expenses.len(),
            "replaced ledger"
        );
        Ok(())
    }
}
