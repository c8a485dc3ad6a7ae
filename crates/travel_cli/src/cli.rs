//! Clap derive structures for the `travel` CLI.

use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::PathBuf;
use travel_core::{BookingStatus, BookingType};
use uuid::Uuid;

/// travel -- manage bookings in a local booking store
#[derive(Debug, Parser)]
#[command(
    name = "travel",
    version,
    about = "Create, inspect and transition travel bookings",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// SQLite booking store; in-memory when omitted
    #[arg(long, env = "TRAVEL_DB", global = true)]
    pub db: Option<PathBuf>,

    /// TOML config file
    #[arg(long, env = "TRAVEL_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Absolute directory for rolling log files; logging is off when omitted
    #[arg(long, env = "TRAVEL_LOG_DIR", global = true)]
    pub log_dir: Option<PathBuf>,

    /// trace|debug|info|warn|error
    #[arg(long, env = "TRAVEL_LOG_LEVEL", global = true)]
    pub log_level: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create a pending booking
    Create(CreateArgs),
    /// Show one booking by id
    Get { id: Uuid },
    /// Show the booking(s) carrying a flight/accommodation reference
    ByRef {
        reference_id: String,
        /// List every booking sharing the reference
        #[arg(long)]
        all: bool,
    },
    /// List bookings by owner, type or status
    List(ListArgs),
    /// Amend notes and/or booking details
    Update(UpdateArgs),
    /// Move a booking to a new status
    Status {
        id: Uuid,
        target: BookingStatus,
        /// Status the caller last observed; the write fails if it changed
        #[arg(long)]
        expected: Option<BookingStatus>,
    },
    /// Cancel a pending or confirmed booking
    Cancel { id: Uuid },
    /// Send a reminder for a confirmed booking
    Remind { id: Uuid },
    /// Convert an amount between currencies
    Convert {
        amount: Decimal,
        from: String,
        to: String,
    },
    /// Show the exchange rate between two currencies
    Rate { from: String, to: String },
    /// List supported currency codes
    Currencies,
    /// Format an amount with its currency symbol
    Format { amount: Decimal, currency: String },
}

#[derive(Debug, Args)]
pub struct CreateArgs {
    /// Owning user id
    #[arg(long)]
    pub user: String,

    #[arg(long = "type")]
    pub kind: BookingType,

    #[arg(long)]
    pub reference: String,

    #[arg(long)]
    pub price: Decimal,

    /// Defaults to the configured base currency
    #[arg(long)]
    pub currency: Option<String>,

    /// Epoch milliseconds
    #[arg(long)]
    pub check_in: Option<i64>,

    /// Epoch milliseconds
    #[arg(long)]
    pub check_out: Option<i64>,

    /// JSON object with free-form booking details
    #[arg(long)]
    pub details: Option<String>,

    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
pub struct ListFilter {
    #[arg(long)]
    pub user: Option<String>,

    #[arg(long = "type")]
    pub kind: Option<BookingType>,

    #[arg(long)]
    pub status: Option<BookingStatus>,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    #[command(flatten)]
    pub filter: ListFilter,

    #[arg(long, default_value_t = 1)]
    pub page: u32,

    /// Page size; 0 uses the configured default
    #[arg(long, default_value_t = 0)]
    pub limit: u32,
}

#[derive(Debug, Args)]
pub struct UpdateArgs {
    pub id: Uuid,

    #[arg(long)]
    pub notes: Option<String>,

    /// JSON object replacing the booking details
    #[arg(long)]
    pub details: Option<String>,
}
