//! `travel` command-line entry point.
//!
//! # Responsibility
//! - Wire config, logging and storage into a `BookingService`.
//! - Print results as pretty JSON; failures go to stderr with exit code 1.

mod cli;

use clap::Parser;
use cli::{Cli, Command, CreateArgs, ListArgs, UpdateArgs};
use serde_json::{json, Value};
use std::error::Error;
use std::process::ExitCode;
use travel_core::db::{open_db, open_db_in_memory};
use travel_core::{
    default_log_level, format_price, init_logging, BookingDetails, BookingPatch, BookingService,
    CoreConfig, CurrencyConverter, LogDispatcher, NewBooking, PageRequest,
    SqliteBookingRepository,
};

type CliResult<T> = Result<T, Box<dyn Error>>;

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(output) => {
            println!("{}", serde_json::to_string_pretty(&output).unwrap_or_default());
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> CliResult<Value> {
    if let Some(log_dir) = cli.global.log_dir.as_ref() {
        let level = cli
            .global
            .log_level
            .clone()
            .unwrap_or_else(|| default_log_level().as_str().to_string());
        init_logging(&level, log_dir)?;
    }

    let config = match cli.global.config.as_ref() {
        Some(path) => CoreConfig::load(path)?,
        None => CoreConfig::default(),
    };

    match cli.command {
        Command::Convert { amount, from, to } => {
            let converter = CurrencyConverter::from_config(&config);
            let result = converter.convert(amount, &from, &to);
            Ok(json!({
                "amount": result.amount.to_string(),
                "from": from,
                "to": to,
                "path": result.path.as_str(),
                "converted": result.is_converted(),
            }))
        }
        Command::Rate { from, to } => {
            let converter = CurrencyConverter::from_config(&config);
            let rate = converter.exchange_rate(&from, &to);
            Ok(json!({
                "from": from,
                "to": to,
                "rate": rate.map(|value| value.to_string()),
            }))
        }
        Command::Currencies => {
            let converter = CurrencyConverter::from_config(&config);
            Ok(json!({
                "base": converter.base_currency(),
                "currencies": converter.supported_currencies(),
            }))
        }
        Command::Format { amount, currency } => Ok(json!(format_price(amount, &currency))),
        booking_command => {
            let conn = match cli.global.db.as_ref() {
                Some(path) => open_db(path)?,
                None => open_db_in_memory()?,
            };
            let service = BookingService::new(SqliteBookingRepository::new(&conn))
                .with_config(config)
                .with_notifier(LogDispatcher);
            run_booking_command(&service, booking_command)
        }
    }
}

fn run_booking_command(
    service: &BookingService<SqliteBookingRepository<'_>>,
    command: Command,
) -> CliResult<Value> {
    let value = match command {
        Command::Create(args) => serde_json::to_value(create(service, args)?)?,
        Command::Get { id } => serde_json::to_value(service.find_by_id(id)?)?,
        Command::ByRef { reference_id, all } => {
            if all {
                serde_json::to_value(service.list_by_reference_id(&reference_id)?)?
            } else {
                serde_json::to_value(service.find_by_reference_id(&reference_id)?)?
            }
        }
        Command::List(args) => list(service, args)?,
        Command::Update(args) => update(service, args)?,
        Command::Status {
            id,
            target,
            expected,
        } => {
            let booking = match expected {
                Some(expected) => service.update_status_from(id, expected, target)?,
                None => service.update_status(id, target)?,
            };
            serde_json::to_value(booking)?
        }
        Command::Cancel { id } => serde_json::to_value(service.cancel(id)?)?,
        Command::Remind { id } => json!({ "sent": service.send_reminder(id)? }),
        Command::Convert { .. } | Command::Rate { .. } | Command::Currencies | Command::Format { .. } => {
            return Err("currency commands do not use the booking store".into());
        }
    };
    Ok(value)
}

fn create(
    service: &BookingService<SqliteBookingRepository<'_>>,
    args: CreateArgs,
) -> CliResult<travel_core::Booking> {
    let request = NewBooking {
        kind: args.kind,
        reference_id: args.reference,
        total_price: args.price,
        currency: args.currency,
        check_in_date: args.check_in,
        check_out_date: args.check_out,
        booking_details: args.details.as_deref().map(parse_details).transpose()?,
        notes: args.notes,
    };
    Ok(service.create(&args.user, request)?)
}

fn list(service: &BookingService<SqliteBookingRepository<'_>>, args: ListArgs) -> CliResult<Value> {
    let request = PageRequest::new(args.page, args.limit);
    let page = if let Some(user) = args.filter.user {
        service.find_by_user(&user, request)?
    } else if let Some(kind) = args.filter.kind {
        service.bookings_by_type(kind, request)?
    } else if let Some(status) = args.filter.status {
        service.bookings_by_status(status, request)?
    } else {
        return Err("one of --user, --type or --status is required".into());
    };
    Ok(serde_json::to_value(page)?)
}

fn update(
    service: &BookingService<SqliteBookingRepository<'_>>,
    args: UpdateArgs,
) -> CliResult<Value> {
    let patch = BookingPatch {
        notes: args.notes,
        booking_details: args.details.as_deref().map(parse_details).transpose()?,
    };
    Ok(serde_json::to_value(service.update(args.id, &patch)?)?)
}

fn parse_details(raw: &str) -> CliResult<BookingDetails> {
    match serde_json::from_str::<Value>(raw)? {
        Value::Object(map) => Ok(map),
        _ => Err("--details must be a JSON object".into()),
    }
}
