//! Static-table currency converter.
//!
//! Lookup order for `convert(amount, from, to)`:
//! identity, direct `from/to`, inverse `to/from`, two hops through the base
//! currency, then the unconverted fallback.

use crate::config::CoreConfig;
use crate::model::booking::{normalize_currency, round_price};
use log::warn;
use rust_decimal::Decimal;
use std::collections::{BTreeSet, HashMap};
use std::time::{Duration, SystemTime};

/// Rates relative to EUR, as `(quote, units of quote per 1 EUR)` in
/// `(mantissa, scale)` form.
const EUR_RATES: &[(&str, i64, u32)] = &[
    ("EUR", 10, 1),
    ("GBP", 86, 2),
    ("USD", 110, 2),
    ("CHF", 95, 2),
    ("SEK", 115, 1),
    ("NOK", 112, 1),
    ("DKK", 744, 2),
    ("CZK", 245, 1),
    ("PLN", 43, 1),
    ("HUF", 360, 0),
    ("RON", 497, 2),
];

/// One tabulated `from/to` rate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeRate {
    pub from: String,
    pub to: String,
    /// Units of `to` per one unit of `from`.
    pub rate: Decimal,
    pub refreshed_at: SystemTime,
}

/// How a conversion result was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionPath {
    /// `from == to`; amount untouched.
    Identity,
    /// `from/to` rate found.
    Direct,
    /// Reciprocal of the `to/from` rate.
    Inverse,
    /// `from -> base -> to`.
    ViaBase,
    /// No rate path; amount returned unchanged.
    Unconverted,
}

impl ConversionPath {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::Direct => "direct",
            Self::Inverse => "inverse",
            Self::ViaBase => "via_base",
            Self::Unconverted => "unconverted",
        }
    }
}

/// Converted amount plus the path that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conversion {
    pub amount: Decimal,
    pub path: ConversionPath,
}

impl Conversion {
    /// False only for the unconverted fallback.
    pub fn is_converted(&self) -> bool {
        self.path != ConversionPath::Unconverted
    }
}

/// Converter over a pair-keyed rate table.
#[derive(Debug, Clone)]
pub struct CurrencyConverter {
    base_currency: String,
    rate_ttl: Duration,
    rates: HashMap<String, ExchangeRate>,
}

impl CurrencyConverter {
    /// Empty table pivoting on `base_currency`.
    pub fn new(base_currency: &str, rate_ttl: Duration) -> Self {
        Self {
            base_currency: normalize_currency(base_currency),
            rate_ttl,
            rates: HashMap::new(),
        }
    }

    /// Built-in EUR table, stamped at `now`.
    pub fn with_default_rates(rate_ttl: Duration, now: SystemTime) -> Self {
        let mut converter = Self::new("EUR", rate_ttl);
        for &(quote, mantissa, scale) in EUR_RATES {
            converter.set_rate("EUR", quote, Decimal::new(mantissa, scale), now);
        }
        converter
    }

    /// Built-in table with the TTL from config.
    ///
    /// When the configured base is not EUR the table stays EUR-keyed and the
    /// base is only used for two-hop pivots.
    pub fn from_config(config: &CoreConfig) -> Self {
        let mut converter = Self::with_default_rates(config.rate_ttl(), SystemTime::now());
        converter.base_currency = normalize_currency(&config.base_currency);
        converter
    }

    pub fn base_currency(&self) -> &str {
        &self.base_currency
    }

    /// Inserts or replaces the `from/to` rate.
    pub fn set_rate(&mut self, from: &str, to: &str, rate: Decimal, now: SystemTime) {
        let from = normalize_currency(from);
        let to = normalize_currency(to);
        self.rates.insert(
            pair_key(&from, &to),
            ExchangeRate {
                from,
                to,
                rate,
                refreshed_at: now,
            },
        );
    }

    /// Converts `amount` from one currency to another.
    ///
    /// Never fails. When no path exists, or the product overflows `Decimal`,
    /// the amount comes back unchanged with `ConversionPath::Unconverted` and a
    /// warning is logged.
    pub fn convert(&self, amount: Decimal, from: &str, to: &str) -> Conversion {
        let from = normalize_currency(from);
        let to = normalize_currency(to);

        if from == to {
            return Conversion {
                amount,
                path: ConversionPath::Identity,
            };
        }
        let scaled = if let Some(rate) = self.direct(&from, &to) {
            Some((amount.checked_mul(rate), ConversionPath::Direct))
        } else if let Some(rate) = self.inverse(&from, &to) {
            Some((amount.checked_mul(rate), ConversionPath::Inverse))
        } else if let (Some(to_base), Some(from_base)) = (
            self.one_hop(&from, &self.base_currency),
            self.one_hop(&self.base_currency, &to),
        ) {
            let raw = amount
                .checked_mul(to_base)
                .and_then(|value| value.checked_mul(from_base));
            Some((raw, ConversionPath::ViaBase))
        } else {
            None
        };

        match scaled {
            Some((Some(raw), path)) => return converted(raw, path),
            Some((None, path)) => warn!(
                "event=currency_convert module=currency status=overflow from={from} to={to} path={}",
                path.as_str()
            ),
            None => {
                warn!("event=currency_convert module=currency status=fallback from={from} to={to}")
            }
        }
        Conversion {
            amount,
            path: ConversionPath::Unconverted,
        }
    }

    /// Direct or reciprocal rate between two currencies, unrounded.
    ///
    /// Returns `Some(1)` for identical codes and `None` when neither `from/to`
    /// nor `to/from` is tabulated.
    pub fn exchange_rate(&self, from: &str, to: &str) -> Option<Decimal> {
        let from = normalize_currency(from);
        let to = normalize_currency(to);
        if from == to {
            return Some(Decimal::ONE);
        }
        self.one_hop(&from, &to)
    }

    /// Every currency that appears on either side of a rate, sorted.
    pub fn supported_currencies(&self) -> Vec<String> {
        self.rates
            .values()
            .flat_map(|rate| [rate.from.clone(), rate.to.clone()])
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// True when the oldest rate is older than the configured TTL.
    pub fn is_stale(&self, now: SystemTime) -> bool {
        self.rates
            .values()
            .map(|rate| rate.refreshed_at)
            .min()
            .is_some_and(|oldest| {
                now.duration_since(oldest)
                    .is_ok_and(|age| age > self.rate_ttl)
            })
    }

    /// Re-stamps every rate at `now`. Values are unchanged; there is no feed.
    pub fn refresh(&mut self, now: SystemTime) {
        for rate in self.rates.values_mut() {
            rate.refreshed_at = now;
        }
    }

    fn direct(&self, from: &str, to: &str) -> Option<Decimal> {
        self.rates.get(&pair_key(from, to)).map(|rate| rate.rate)
    }

    fn inverse(&self, from: &str, to: &str) -> Option<Decimal> {
        self.rates
            .get(&pair_key(to, from))
            .and_then(|rate| Decimal::ONE.checked_div(rate.rate))
    }

    fn one_hop(&self, from: &str, to: &str) -> Option<Decimal> {
        if from == to {
            return Some(Decimal::ONE);
        }
        self.direct(from, to).or_else(|| self.inverse(from, to))
    }
}

fn converted(raw: Decimal, path: ConversionPath) -> Conversion {
    Conversion {
        amount: round_price(raw),
        path,
    }
}

fn pair_key(from: &str, to: &str) -> String {
    format!("{from}/{to}")
}
