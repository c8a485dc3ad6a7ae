//! Currency conversion and price display.
//!
//! # Responsibility
//! - Convert amounts through a static rate table keyed on one base currency.
//! - Format prices with currency symbols for display.
//!
//! # Invariants
//! - Conversion never fails; an unknown pair returns the input amount with
//!   `ConversionPath::Unconverted` so the caller can tell.
//! - Converted amounts are rounded to 2 decimals, half-up, at conversion time.
//! - Rates are hardcoded; there is no live feed.

pub mod converter;
pub mod format;

pub use converter::{Conversion, ConversionPath, CurrencyConverter, ExchangeRate};
pub use format::{currency_symbol, format_price};
