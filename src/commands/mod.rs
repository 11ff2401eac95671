// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod banks;
pub mod transactions;
pub mod reports;
pub mod importer;
pub mod exporter;
pub mod extractor;
pub mod inbox;
pub mod merchants;
pub mod settings;

use crate::aggregate::{Period, day_range};
use crate::models::{BankSelector, DateRange, Transaction};
use anyhow::Result;
use chrono::NaiveDate;

pub fn bank_selector(sub: &clap::ArgMatches) -> BankSelector {
    match sub.get_many::<String>("bank") {
        Some(values) => BankSelector::from_values(values),
        None => BankSelector::All,
    }
}

/// `--period all` yields `None`.
pub fn period_arg(sub: &clap::ArgMatches) -> Result<Option<Period>> {
    match sub.get_one::<String>("period").map(|s| s.trim()) {
        None | Some("all") => Ok(None),
        Some(p) => Ok(Some(p.parse()?)),
    }
}

/// Range for a period; without one, the span of `transactions` (or today's month when empty).
pub fn effective_range(
    period: Option<Period>,
    transactions: &[Transaction],
    today: NaiveDate,
) -> Result<DateRange> {
    if let Some(p) = period {
        return p.resolve(today);
    }
    let first = transactions.iter().map(|t| t.timestamp.date()).min();
    let last = transactions.iter().map(|t| t.timestamp.date()).max();
    match (first, last) {
        (Some(a), Some(b)) => Ok(day_range(a, b.max(today))),
        _ => Period::CurrentMonth.resolve(today),
    }
}
