//! CLI administration tool for the affiliate engine.
//!
//! Runs the same services as the HTTP API, so every change is validated and
//! written to the activity log exactly as if it came through `/api`.
//!
//! # Usage
//!
//! ```bash
//! # List pending affiliates
//! cargo run --bin admin -- affiliate list --status pending
//!
//! # Approve or suspend an affiliate
//! cargo run --bin admin -- --operator 1 affiliate approve 42 --notes "Verified"
//! cargo run --bin admin -- --operator 1 affiliate suspend 42 --reason "Fraud"
//!
//! # Settle a pending withdrawal
//! cargo run --bin admin -- --operator 1 withdrawal process 7
//!
//! # Show program settings
//! cargo run --bin admin -- settings show
//!
//! # Check database connection
//! cargo run --bin admin -- db check
//! ```
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` (required unless `--in-memory`): PostgreSQL connection string
//! - `REFERRAL_TOKEN_SECRET` (optional): only needed for commands that issue tokens
//! - `PUBLIC_BASE_URL` (optional): base for tracking URLs
//!
//! `--in-memory` runs against an empty in-process store, which is useful for
//! trying commands without a database.

use affiliate_engine::domain::entities::{Affiliate, AffiliateStatus, Withdrawal};
use affiliate_engine::infrastructure::memory::MemoryStore;
use affiliate_engine::infrastructure::notification::LogNotifier;
use affiliate_engine::infrastructure::settlement::ManualSettlement;
use affiliate_engine::state::{AppState, EngineOptions, Repositories};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use dialoguer::{Confirm, Input};
use sqlx::PgPool;
use std::sync::Arc;

/// CLI tool for operating the affiliate program.
#[derive(Parser)]
#[command(name = "admin")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Run against an empty in-memory store instead of PostgreSQL
    #[arg(long, global = true)]
    in_memory: bool,

    /// User id recorded as the approver / processor (prompted if omitted)
    #[arg(long, global = true)]
    operator: Option<i64>,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level command groups.
#[derive(Subcommand)]
enum Commands {
    /// Manage affiliates
    Affiliate {
        #[command(subcommand)]
        action: AffiliateAction,
    },

    /// Manage withdrawals
    Withdrawal {
        #[command(subcommand)]
        action: WithdrawalAction,
    },

    /// Program settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },

    /// Database operations
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
}

#[derive(Subcommand)]
enum AffiliateAction {
    /// List affiliates, newest first
    List {
        /// Filter by status (pending, active, suspended)
        #[arg(short, long)]
        status: Option<String>,

        #[arg(short, long, default_value_t = 1)]
        page: i64,

        #[arg(long, default_value_t = 25)]
        page_size: i64,
    },

    /// Approve a pending or suspended affiliate
    Approve {
        id: i64,

        #[arg(short, long)]
        notes: Option<String>,

        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Suspend an affiliate and deactivate all of its links
    Suspend {
        id: i64,

        #[arg(short, long)]
        reason: Option<String>,

        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum WithdrawalAction {
    /// Move a pending withdrawal through settlement to completion
    Process {
        id: i64,

        #[arg(short, long)]
        notes: Option<String>,

        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Show the current program settings
    Show,
}

#[derive(Subcommand)]
enum DbAction {
    /// Check database connection
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    if let Commands::Db { action } = &cli.command {
        if cli.in_memory {
            anyhow::bail!("db commands need a database, drop --in-memory");
        }
        let pool = connect().await?;
        return handle_db_action(action, &pool).await;
    }

    let state = build_state(cli.in_memory).await?;

    match cli.command {
        Commands::Affiliate { action } => {
            handle_affiliate_action(action, &state, cli.operator).await?
        }
        Commands::Withdrawal { action } => {
            handle_withdrawal_action(action, &state, cli.operator).await?
        }
        Commands::Settings { action } => handle_settings_action(action, &state).await?,
        Commands::Db { .. } => {}
    }

    Ok(())
}

async fn connect() -> Result<PgPool> {
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

    PgPool::connect(&database_url)
        .await
        .context("Failed to connect to database")
}

async fn build_state(in_memory: bool) -> Result<AppState> {
    let repositories = if in_memory {
        println!("{}", "Using an empty in-memory store".yellow());
        Repositories::in_memory(Arc::new(MemoryStore::new()))
    } else {
        Repositories::postgres(Arc::new(connect().await?))
    };

    let options = EngineOptions {
        notifier: Arc::new(LogNotifier::new()),
        settlement: Arc::new(ManualSettlement::new()),
        referral_token_secret: std::env::var("REFERRAL_TOKEN_SECRET").unwrap_or_default(),
        public_base_url: std::env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:3000".to_string()),
        behind_proxy: false,
    };

    AppState::build(repositories, options)
        .await
        .context("Failed to initialize services")
}

fn operator_id(operator: Option<i64>) -> Result<i64> {
    match operator {
        Some(id) => Ok(id),
        None => Ok(Input::new()
            .with_prompt("Operator user id")
            .interact_text()?),
    }
}

fn confirm(prompt: &str, skip: bool) -> Result<bool> {
    if skip {
        return Ok(true);
    }
    let confirmed = Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()?;
    if !confirmed {
        println!("{}", "Cancelled".red());
    }
    Ok(confirmed)
}

async fn handle_affiliate_action(
    action: AffiliateAction,
    state: &AppState,
    operator: Option<i64>,
) -> Result<()> {
    let service = &state.affiliate_service;

    match action {
        AffiliateAction::List {
            status,
            page,
            page_size,
        } => {
            let status = status
                .as_deref()
                .map(str::parse::<AffiliateStatus>)
                .transpose()?;
            let result = service.list(status, page, page_size).await?;
            print_affiliates(&result.items, result.total);
        }
        AffiliateAction::Approve { id, notes, yes } => {
            let affiliate = service.get(id).await?;
            print_affiliate_header(&affiliate);
            if !confirm("Approve this affiliate?", yes)? {
                return Ok(());
            }

            let approved_by = operator_id(operator)?;
            let affiliate = service.approve(id, approved_by, notes).await?;
            println!(
                "{} {} is now {}",
                "Approved:".green().bold(),
                affiliate.affiliate_code.cyan(),
                status_label(affiliate.status)
            );
        }
        AffiliateAction::Suspend { id, reason, yes } => {
            let affiliate = service.get(id).await?;
            print_affiliate_header(&affiliate);

            let reason = match reason {
                Some(r) => r,
                None => Input::new().with_prompt("Reason").interact_text()?,
            };
            if !confirm("Suspend this affiliate and deactivate its links?", yes)? {
                return Ok(());
            }

            let suspended_by = operator_id(operator)?;
            let affiliate = service.suspend(id, reason, suspended_by).await?;
            println!(
                "{} {} is now {}",
                "Suspended:".yellow().bold(),
                affiliate.affiliate_code.cyan(),
                status_label(affiliate.status)
            );
        }
    }

    Ok(())
}

async fn handle_withdrawal_action(
    action: WithdrawalAction,
    state: &AppState,
    operator: Option<i64>,
) -> Result<()> {
    match action {
        WithdrawalAction::Process { id, notes, yes } => {
            let withdrawal = state.withdrawal_service.get(id).await?;
            print_withdrawal(&withdrawal);
            if !confirm("Settle this withdrawal?", yes)? {
                return Ok(());
            }

            let processed_by = operator_id(operator)?;
            let withdrawal = state
                .withdrawal_service
                .process(id, processed_by, notes)
                .await?;

            println!();
            println!("{}", "Withdrawal completed".green().bold());
            println!(
                "  Payment reference: {}",
                withdrawal
                    .payment_reference
                    .as_deref()
                    .unwrap_or("-")
                    .bright_yellow()
            );
        }
    }

    Ok(())
}

async fn handle_settings_action(action: SettingsAction, state: &AppState) -> Result<()> {
    match action {
        SettingsAction::Show => {
            let settings = state.settings_service.current().await;

            println!("{}", "Program settings".bright_blue().bold());
            println!();
            println!("  Currency:                {}", settings.currency.bright_white());
            println!(
                "  Minimum payout:          {}",
                settings.minimum_payout.to_string().bright_white()
            );
            println!(
                "  Default commission rate: {}",
                settings.default_commission_rate.to_string().bright_white()
            );
            println!("  Auto approve:            {}", settings.auto_approve);
            println!(
                "  Referral window:         {} days",
                settings.referral_window_days
            );
            println!(
                "  Commission hold:         {} days",
                settings.commission_hold_days
            );
            println!(
                "  Updated:                 {}",
                settings
                    .updated_at
                    .format("%Y-%m-%d %H:%M")
                    .to_string()
                    .bright_black()
            );
            println!();
        }
    }

    Ok(())
}

async fn handle_db_action(action: &DbAction, pool: &PgPool) -> Result<()> {
    match action {
        DbAction::Check => {
            println!("{}", "Checking database connection...".bright_blue());

            sqlx::query("SELECT 1").fetch_one(pool).await?;

            let affiliates: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM affiliates")
                .fetch_one(pool)
                .await
                .context("Schema not migrated? affiliates table is missing")?;

            println!("{}", "Database connection OK".green().bold());
            println!(
                "  Affiliates: {}",
                affiliates.to_string().bright_green().bold()
            );
        }
    }

    Ok(())
}

fn status_label(status: AffiliateStatus) -> ColoredString {
    match status {
        AffiliateStatus::Active => status.as_str().green(),
        AffiliateStatus::Pending => status.as_str().yellow(),
        AffiliateStatus::Suspended => status.as_str().red(),
    }
}

fn print_affiliate_header(affiliate: &Affiliate) {
    println!("  Affiliate: {}", affiliate.display_name.cyan());
    println!("  Code:      {}", affiliate.affiliate_code.bright_white());
    println!("  Status:    {}", status_label(affiliate.status));
    println!();
}

fn print_affiliates(affiliates: &[Affiliate], total: i64) {
    println!("{}", "Affiliates".bright_blue().bold());
    println!();

    if affiliates.is_empty() {
        println!("{}", "  No affiliates found".yellow());
        return;
    }

    println!(
        "  {:<6} {:<14} {:<24} {:<10} {:<10} {:>12}",
        "ID".bright_white().bold(),
        "Code".bright_white().bold(),
        "Name".bright_white().bold(),
        "Tier".bright_white().bold(),
        "Status".bright_white().bold(),
        "Balance".bright_white().bold()
    );
    println!("  {}", "-".repeat(82).bright_black());

    for affiliate in affiliates {
        println!(
            "  {:<6} {:<14} {:<24} {:<10} {:<10} {:>12}",
            affiliate.id.to_string().bright_black(),
            affiliate.affiliate_code.cyan(),
            affiliate.display_name,
            affiliate.tier.as_str(),
            status_label(affiliate.status),
            affiliate.available_balance.to_string()
        );
    }

    println!();
    println!("  Total: {}", total.to_string().bright_white().bold());
    println!();
}

fn print_withdrawal(withdrawal: &Withdrawal) {
    println!("  Reference: {}", withdrawal.reference.cyan());
    println!("  Affiliate: {}", withdrawal.affiliate_id);
    println!("  Method:    {}", withdrawal.method.as_str());
    println!("  Amount:    {}", withdrawal.amount.to_string().bright_white());
    println!("  Fee:       {}", withdrawal.processing_fee);
    println!("  Net:       {}", withdrawal.net_amount.to_string().bright_green());
    println!("  Status:    {}", withdrawal.status.as_str());
    println!();
}
