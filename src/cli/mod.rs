use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::sync::Once;

use crate::application::{
    ExpenseFilter, GroupDraft, GroupSettings, NewExpense, SplitService, Timeframe,
};
use crate::domain::{BalanceSheet, Category, Currency, SettlementStrategy, parse_cents};

/// PayTogether - Split Expenses Effortlessly
#[derive(Parser)]
#[command(name = "paytogether")]
#[command(about = "A local-first tool for splitting shared expenses within a group")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, env = "PAYTOGETHER_DB", default_value = "paytogether.db")]
    pub database: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Group management commands
    #[command(subcommand)]
    Group(GroupCommands),

    /// Member management commands
    #[command(subcommand)]
    Member(MemberCommands),

    /// Expense commands
    #[command(subcommand)]
    Expense(ExpenseCommands),

    /// Show what everyone paid, owes and their net balance
    Balance,

    /// Suggest payments to settle up
    Settle {
        /// Match largest debtors with largest creditors for fewer payments
        #[arg(long)]
        minimize: bool,
    },

    /// Show spending statistics for the group
    Stats,

    /// Export data to a file or stdout
    Export {
        /// What to export: summary, expenses, balances, snapshot
        export_type: String,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Replace the group and expenses with a JSON snapshot
    Import {
        /// Snapshot file to read
        file: String,

        /// Validate without writing anything
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Subcommand)]
pub enum GroupCommands {
    /// Create the group (replaces any existing group)
    Create {
        /// Group name
        name: String,

        /// Participant name (repeat for each member, at least two)
        #[arg(short, long = "member", required = true)]
        members: Vec<String>,

        /// Currency code: INR, USD, EUR, GBP, JPY
        #[arg(short, long, default_value = "INR")]
        currency: String,

        /// Free-form description
        #[arg(long)]
        details: Option<String>,

        /// Which member you are (defaults to the first)
        #[arg(long)]
        you: Option<String>,
    },

    /// Show group details
    Show,

    /// Change group settings
    Settings {
        /// New group name
        #[arg(long)]
        name: Option<String>,

        /// New currency code
        #[arg(long)]
        currency: Option<String>,

        /// New description (empty to clear)
        #[arg(long)]
        details: Option<String>,

        /// Which member you are
        #[arg(long)]
        you: Option<String>,
    },

    /// Delete the group and all expenses
    Delete {
        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
pub enum MemberCommands {
    /// Add a member
    Add {
        /// Member name
        name: String,
    },

    /// Remove a member without expenses
    Remove {
        /// Member name
        name: String,
    },

    /// List members
    List,
}

#[derive(Subcommand)]
pub enum ExpenseCommands {
    /// Record an expense
    Add {
        /// What the money was spent on
        title: String,

        /// Amount (e.g., "90.00" or "90")
        amount: String,

        /// Who paid (defaults to you)
        #[arg(long)]
        paid_by: Option<String>,

        /// Who shares the cost, comma separated (defaults to everyone)
        #[arg(long = "for", value_delimiter = ',')]
        paid_for: Vec<String>,

        /// Category: food, housing, transportation, entertainment, utilities, other
        #[arg(short, long, default_value = "food")]
        category: String,

        /// Date of the expense (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,

        /// Optional note
        #[arg(short, long)]
        note: Option<String>,
    },

    /// List expenses
    List {
        /// Search titles and payers
        #[arg(short, long)]
        search: Option<String>,

        /// Filter by category
        #[arg(short, long)]
        category: Option<String>,

        /// Timeframe: all, last30, last90
        #[arg(short, long, default_value = "all")]
        timeframe: String,

        /// Maximum number of expenses to show
        #[arg(short, long)]
        limit: Option<usize>,
    },
}

static TRACING_INIT: Once = Once::new();

/// Install the global tracing subscriber. `RUST_LOG` takes precedence.
pub fn init_tracing(verbose: bool) {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{EnvFilter, fmt};

        let default = if verbose {
            "paytogether=debug"
        } else {
            "paytogether=info"
        };
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

        fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    });
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Init => {
                let service = SplitService::init(&self.database).await?;
                println!("Database initialized: {}", self.database);
                let keys = service.store().backend().keys().await?;
                if !keys.is_empty() {
                    println!("Existing ledger kept: {}", keys.join(", "));
                }
            }

            Commands::Group(group_cmd) => {
                let service = SplitService::connect(&self.database).await?;
                run_group_command(&service, group_cmd).await?;
            }

            Commands::Member(member_cmd) => {
                let service = SplitService::connect(&self.database).await?;
                run_member_command(&service, member_cmd).await?;
            }

            Commands::Expense(expense_cmd) => {
                let service = SplitService::connect(&self.database).await?;
                run_expense_command(&service, expense_cmd).await?;
            }

            Commands::Balance => {
                let service = SplitService::connect(&self.database).await?;
                run_balance_command(&service).await?;
            }

            Commands::Settle { minimize } => {
                let service = SplitService::connect(&self.database).await?;
                let strategy = if minimize {
                    SettlementStrategy::Greedy
                } else {
                    SettlementStrategy::CrossProduct
                };
                run_settle_command(&service, strategy).await?;
            }

            Commands::Stats => {
                let service = SplitService::connect(&self.database).await?;
                run_stats_command(&service).await?;
            }

            Commands::Export {
                export_type,
                output,
            } => {
                let service = SplitService::connect(&self.database).await?;
                run_export_command(&service, &export_type, output.as_deref()).await?;
            }

            Commands::Import { file, dry_run } => {
                let service = SplitService::connect(&self.database).await?;
                run_import_command(&service, &file, dry_run).await?;
            }
        }

        Ok(())
    }
}

async fn run_group_command(service: &SplitService, cmd: GroupCommands) -> Result<()> {
    match cmd {
        GroupCommands::Create {
            name,
            members,
            currency,
            details,
            you,
        } => {
            let group = service
                .create_group(GroupDraft {
                    group_name: name,
                    currency: parse_currency(&currency)?,
                    group_details: details,
                    participants: members,
                    active_user: you,
                })
                .await?;
            println!(
                "Created group: {} ({} members, {})",
                group.group_name,
                group.participants.len(),
                group.currency
            );
        }

        GroupCommands::Show => {
            let group = service.group().await?;
            println!("Group: {}", group.group_name);
            if let Some(details) = &group.group_details {
                println!("  Details:        {}", details);
            }
            println!(
                "  Currency:       {} ({})",
                group.currency,
                group.currency.symbol()
            );
            println!("  You are:        {}", group.active_user);
            println!(
                "  Created:        {}",
                group.created_at.format("%Y-%m-%d %H:%M:%S")
            );
            println!("  Members:        {}", group.participants.len());
            for participant in &group.participants {
                println!("    - {}", participant.name);
            }
        }

        GroupCommands::Settings {
            name,
            currency,
            details,
            you,
        } => {
            let currency = currency.as_deref().map(parse_currency).transpose()?;
            let group = service
                .update_settings(GroupSettings {
                    group_name: name,
                    currency,
                    group_details: details,
                    active_user: you,
                })
                .await?;
            println!(
                "Updated group: {} ({}, you are {})",
                group.group_name, group.currency, group.active_user
            );
        }

        GroupCommands::Delete { yes } => {
            if !yes {
                anyhow::bail!(
                    "This deletes the group and all expenses permanently. Re-run with --yes to confirm"
                );
            }
            service.delete_group().await?;
            println!("Deleted group and all expenses");
        }
    }
    Ok(())
}

async fn run_member_command(service: &SplitService, cmd: MemberCommands) -> Result<()> {
    match cmd {
        MemberCommands::Add { name } => {
            let participant = service.add_member(&name).await?;
            println!("Added member: {}", participant.name);
        }

        MemberCommands::Remove { name } => {
            let participant = service.remove_member(&name).await?;
            println!("Removed member: {}", participant.name);
        }

        MemberCommands::List => {
            let group = service.group().await?;
            for participant in &group.participants {
                let marker = if participant.name == group.active_user {
                    " (you)"
                } else {
                    ""
                };
                println!("{}{}", participant.name, marker);
            }
        }
    }
    Ok(())
}

async fn run_expense_command(service: &SplitService, cmd: ExpenseCommands) -> Result<()> {
    match cmd {
        ExpenseCommands::Add {
            title,
            amount,
            paid_by,
            paid_for,
            category,
            date,
            note,
        } => {
            let amount = parse_cents(&amount).context("Invalid amount format. Use '90.00' or '90'")?;
            let category = parse_category(&category)?;
            let date = match date {
                Some(date_str) => parse_date(&date_str).with_context(|| {
                    format!("Invalid date format '{}'. Use YYYY-MM-DD", date_str)
                })?,
                None => Local::now().date_naive(),
            };

            let group = service.group().await?;
            let paid_for = if paid_for.is_empty() {
                group.participant_names().map(str::to_string).collect()
            } else {
                paid_for
            };

            let expense = service
                .add_expense(NewExpense {
                    title,
                    amount,
                    paid_by,
                    paid_for,
                    category,
                    date,
                    note,
                })
                .await?;

            println!(
                "Recorded expense: {} {} paid by {} for {} ({})",
                expense.title,
                group.currency.format(expense.amount),
                expense.paid_by,
                expense.paid_for.join(", "),
                expense.id
            );
        }

        ExpenseCommands::List {
            search,
            category,
            timeframe,
            limit,
        } => {
            let category = category.as_deref().map(parse_category).transpose()?;
            let timeframe = Timeframe::from_str(&timeframe).ok_or_else(|| {
                anyhow::anyhow!(
                    "Invalid timeframe '{}'. Valid timeframes: all, last30, last90",
                    timeframe
                )
            })?;

            let group = service.group().await?;
            let filter = ExpenseFilter {
                search,
                category,
                timeframe,
                as_of: Local::now().date_naive(),
                limit,
            };
            let expenses = service.list_expenses(&filter).await?;

            if expenses.is_empty() {
                println!("No expenses found.");
            } else {
                println!(
                    "{:<10} {:<24} {:<14} {:>12} {:<12} {}",
                    "DATE", "TITLE", "CATEGORY", "AMOUNT", "PAID BY", "FOR"
                );
                println!("{}", "-".repeat(90));
                for expense in &expenses {
                    println!(
                        "{:<10} {:<24} {:<14} {:>12} {:<12} {}",
                        expense.date.format("%Y-%m-%d"),
                        truncate(&expense.title, 24),
                        expense.category.as_str(),
                        group.currency.format(expense.amount),
                        truncate(&expense.paid_by, 12),
                        expense.paid_for.join(", ")
                    );
                }
            }
        }
    }
    Ok(())
}

async fn run_balance_command(service: &SplitService) -> Result<()> {
    let group = service.group().await?;
    let sheet = service.balances().await?;
    let currency = group.currency;

    println!("{:<20} {:>12} {:>12} {:>12}", "MEMBER", "PAID", "OWES", "BALANCE");
    println!("{}", "-".repeat(59));
    for balance in &sheet {
        println!(
            "{:<20} {:>12} {:>12} {:>12}",
            truncate(&balance.name, 20),
            currency.format(balance.paid),
            currency.format(balance.owes),
            currency.format_signed(balance.balance)
        );
    }
    println!("{}", "-".repeat(59));
    println!("{}", balance_totals(&sheet, currency));

    if sheet.is_settled() {
        println!();
        println!("Everyone is settled up!");
    }
    Ok(())
}

async fn run_settle_command(service: &SplitService, strategy: SettlementStrategy) -> Result<()> {
    let group = service.group().await?;
    let settlements = service.settlements(strategy).await?;

    if settlements.is_empty() {
        println!("Everyone is settled up! No payments needed.");
        return Ok(());
    }
    println!("{}", settle_heading(strategy));
    for settlement in &settlements {
        println!(
            "{} pays {} {}",
            settlement.from,
            settlement.to,
            group.currency.format(settlement.amount)
        );
    }
    Ok(())
}

async fn run_stats_command(service: &SplitService) -> Result<()> {
    let summary = service.summary(SettlementStrategy::CrossProduct).await?;
    let currency = summary.currency;

    println!("Group: {}", summary.group_name);
    println!("  Members:        {}", summary.participant_count);
    println!("  Expenses:       {}", summary.expense_count);
    println!("  Total spent:    {}", currency.format(summary.total_spent));
    if let Some(you) = &summary.active_user {
        println!(
            "  You ({}):  paid {}, share {}, balance {}",
            you.name,
            currency.format(you.paid),
            currency.format(you.owes),
            currency.format_signed(you.balance)
        );
    }

    println!();
    println!("{:<20} {:>12} {:>8}", "MEMBER", "PAID", "SHARE");
    println!("{}", "-".repeat(42));
    for member in &summary.member_spending {
        println!(
            "{:<20} {:>12} {:>7}%",
            truncate(&member.name, 20),
            currency.format(member.paid),
            member.percentage
        );
    }

    if !summary.categories.is_empty() {
        println!();
        println!(
            "{:<20} {:>12} {:>8} {:>8}",
            "CATEGORY", "TOTAL", "COUNT", "PERCENT"
        );
        println!("{}", "-".repeat(51));
        for cat in &summary.categories {
            println!(
                "{:<20} {:>12} {:>8} {:>7.1}%",
                cat.category.as_str(),
                currency.format(cat.total),
                cat.count,
                cat.percentage
            );
        }
    }
    Ok(())
}

async fn run_export_command(
    service: &SplitService,
    export_type: &str,
    output: Option<&str>,
) -> Result<()> {
    use crate::io::Exporter;
    use std::fs::File;
    use std::io::{Write, stdout};

    let exporter = Exporter::new(service);

    // Determine output writer
    let writer: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdout()),
    };

    match export_type {
        "summary" => {
            let count = exporter
                .export_summary_text(writer, Local::now().date_naive())
                .await?;
            if output.is_some() {
                eprintln!("Exported summary of {} expenses", count);
            }
        }
        "expenses" => {
            let count = exporter.export_expenses_csv(writer).await?;
            if output.is_some() {
                eprintln!("Exported {} expenses", count);
            }
        }
        "balances" => {
            let count = exporter.export_balances_csv(writer).await?;
            if output.is_some() {
                eprintln!("Exported {} balances", count);
            }
        }
        "snapshot" => {
            let snapshot = exporter.export_snapshot_json(writer).await?;
            if output.is_some() {
                eprintln!(
                    "Exported snapshot: {} members, {} expenses",
                    snapshot.group.participants.len(),
                    snapshot.expenses.len()
                );
            }
        }
        _ => {
            anyhow::bail!(
                "Invalid export type '{}'. Valid types: summary, expenses, balances, snapshot",
                export_type
            );
        }
    }

    Ok(())
}

async fn run_import_command(service: &SplitService, input: &str, dry_run: bool) -> Result<()> {
    use crate::io::{ImportOptions, Importer};
    use std::fs::File;

    let importer = Importer::new(service);
    let file = File::open(input).with_context(|| format!("Failed to open input file: {}", input))?;

    let result = importer
        .import_snapshot_json(file, ImportOptions { dry_run })
        .await?;

    if !result.errors.is_empty() {
        println!("Import failed, nothing was written");
        println!("\nErrors:");
        for error in result.errors.iter().take(10) {
            println!("  {}", error);
        }
        if result.errors.len() > 10 {
            println!("  ... and {} more errors", result.errors.len() - 10);
        }
        anyhow::bail!("Snapshot has {} invalid record(s)", result.errors.len());
    }

    if result.applied {
        println!("Import complete");
    } else {
        println!("Validation successful");
    }
    println!("  Group:    {}", result.group_name);
    println!("  Members:  {}", result.participants);
    println!("  Expenses: {}", result.expenses);

    Ok(())
}

fn parse_currency(code: &str) -> Result<Currency> {
    Currency::from_code(code).ok_or_else(|| {
        anyhow::anyhow!(
            "Invalid currency '{}'. Valid currencies: {}",
            code,
            Currency::ALL.map(|c| c.code()).join(", ")
        )
    })
}

fn parse_category(name: &str) -> Result<Category> {
    Category::from_str(name).ok_or_else(|| {
        anyhow::anyhow!(
            "Invalid category '{}'. Valid categories: {}",
            name,
            Category::ALL.map(|c| c.as_str()).join(", ")
        )
    })
}

fn balance_totals(sheet: &BalanceSheet, currency: Currency) -> String {
    format!(
        "{:<20} {:>12} {:>12} {:>12}",
        "TOTAL",
        currency.format(sheet.total_paid()),
        currency.format(sheet.total_owed()),
        currency.format_signed(sheet.net_total())
    )
}

fn settle_heading(strategy: SettlementStrategy) -> String {
    format!("Suggested payments ({}):", strategy.as_str())
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

fn parse_date(date_str: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d").context("Date must be in YYYY-MM-DD format")
}
