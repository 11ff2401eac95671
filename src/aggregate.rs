// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Derives balances, income/expense totals, category shares and a monthly
//! series from a flat list of transactions.

use anyhow::{Result, anyhow, bail};
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::models::{BankSelector, DateRange, Transaction, TxKind};
use crate::utils::{month_end, month_start, parse_date, shift_month, year_month};

pub const UNCATEGORIZED: &str = "Uncategorized";

static PREVIOUS_N_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^previous-(\d+)-months?$").expect("static regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    CurrentMonth,
    PreviousMonth,
    MonthBeforePrevious,
    /// The `n` full months before the current one.
    PreviousMonths(u32),
    Custom { start: NaiveDate, end: NaiveDate },
}

impl FromStr for Period {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim().to_lowercase();
        match s.as_str() {
            "current-month" => return Ok(Period::CurrentMonth),
            "previous-month" => return Ok(Period::PreviousMonth),
            "month-before-previous" => return Ok(Period::MonthBeforePrevious),
            _ => {}
        }
        if let Some(caps) = PREVIOUS_N_RE.captures(&s) {
            let n: u32 = caps[1].parse()?;
            if n == 0 {
                bail!("Period '{}' must cover at least one month", s);
            }
            return Ok(Period::PreviousMonths(n));
        }
        if let Some((a, b)) = s.split_once("..") {
            let start = parse_date(a)?;
            let end = parse_date(b)?;
            if start > end {
                bail!("Period start {} is after end {}", start, end);
            }
            return Ok(Period::Custom { start, end });
        }
        Err(anyhow!(
            "Unknown period '{}' (current-month, previous-month, month-before-previous, previous-N-months, YYYY-MM-DD..YYYY-MM-DD)",
            s
        ))
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::CurrentMonth => f.write_str("current-month"),
            Period::PreviousMonth => f.write_str("previous-month"),
            Period::MonthBeforePrevious => f.write_str("month-before-previous"),
            Period::PreviousMonths(n) => write!(f, "previous-{}-months", n),
            Period::Custom { start, end } => write!(f, "{}..{}", start, end),
        }
    }
}

impl Period {
    /// Calendar-bounded inclusive range, evaluated against `today`.
    pub fn resolve(&self, today: NaiveDate) -> Result<DateRange> {
        let (y, m) = year_month(&today);
        let (start, end) = match *self {
            Period::CurrentMonth => (month_start(y, m)?, month_end(y, m)?),
            Period::PreviousMonth => {
                let (py, pm) = shift_month(y, m, -1);
                (month_start(py, pm)?, month_end(py, pm)?)
            }
            Period::MonthBeforePrevious => {
                let (py, pm) = shift_month(y, m, -2);
                (month_start(py, pm)?, month_end(py, pm)?)
            }
            Period::PreviousMonths(n) => {
                let n = i32::try_from(n)
                    .map_err(|_| anyhow!("Period of {} months is too long", n))?;
                let (sy, sm) = shift_month(y, m, -n);
                let (ey, em) = shift_month(y, m, -1);
                (month_start(sy, sm)?, month_end(ey, em)?)
            }
            Period::Custom { start, end } => (start, end),
        };
        Ok(day_range(start, end))
    }
}

pub fn day_range(start: NaiveDate, end: NaiveDate) -> DateRange {
    let last = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
    DateRange {
        start: start.and_time(NaiveTime::MIN),
        end: end.and_time(last),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Totals {
    pub balance: Decimal,
    pub income: Decimal,
    pub expenses: Decimal,
    pub savings: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BankBreakdown {
    pub bank: String,
    pub balance: Decimal,
    pub balance_as_of: Option<NaiveDateTime>,
    pub income: Decimal,
    pub expenses: Decimal,
    pub savings: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryBreakdown {
    pub category: String,
    pub amount: Decimal,
    pub percentage: u32,
    /// Distinct merchants and tags seen in the group.
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthBucket {
    pub year: i32,
    pub month: u32,
    pub label: String,
    pub income: Decimal,
    pub expenses: Decimal,
    pub savings: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateView {
    pub range: DateRange,
    pub totals: Totals,
    pub banks: Vec<BankBreakdown>,
    pub categories: Vec<CategoryBreakdown>,
    pub monthly: Vec<MonthBucket>,
}

/// Share of `part` in `total` as a whole percent, half away from zero; `0` when total is zero.
pub fn percentage(part: Decimal, total: Decimal) -> u32 {
    if total.is_zero() {
        return 0;
    }
    (part * Decimal::ONE_HUNDRED / total)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u32()
        .unwrap_or(0)
}

/// Zero-filled buckets for every calendar month the range touches, oldest first.
pub fn month_buckets(range: &DateRange) -> Vec<MonthBucket> {
    let (sy, sm) = year_month(&range.start.date());
    let (ey, em) = year_month(&range.end.date());
    let span = (ey * 12 + em as i32) - (sy * 12 + sm as i32);
    let mut out = Vec::new();
    for delta in 0..=span.max(-1) {
        let (y, m) = shift_month(sy, sm, delta);
        out.push(MonthBucket {
            year: y,
            month: m,
            label: format!("{}-{:02}", y, m),
            income: Decimal::ZERO,
            expenses: Decimal::ZERO,
            savings: Decimal::ZERO,
        });
    }
    out
}

#[derive(Default)]
struct BankAcc<'a> {
    snapshot: Option<&'a Transaction>,
    closing: Option<&'a Transaction>,
    income: Decimal,
    expenses: Decimal,
}

fn newer<'a>(
    current: Option<&'a Transaction>,
    candidate: &'a Transaction,
) -> Option<&'a Transaction> {
    match current {
        Some(c) if (c.timestamp, c.id) >= (candidate.timestamp, candidate.id) => Some(c),
        _ => Some(candidate),
    }
}

/// Builds the aggregate view for the selected banks over `range`.
///
/// Balances ignore `range`: each bank contributes its latest balance snapshot,
/// or the closing balance of its latest record carrying one.
pub fn aggregate(
    transactions: &[Transaction],
    selector: &BankSelector,
    range: &DateRange,
) -> AggregateView {
    let mut per_bank: BTreeMap<&str, BankAcc<'_>> = BTreeMap::new();
    if let BankSelector::Only(banks) = selector {
        for b in banks {
            per_bank.entry(b.as_str()).or_default();
        }
    }

    let mut monthly = month_buckets(range);
    let (sy, sm) = year_month(&range.start.date());
    let mut categories: BTreeMap<String, (Decimal, BTreeSet<String>)> = BTreeMap::new();
    let mut totals = Totals::default();

    for t in transactions.iter().filter(|t| selector.includes(&t.bank)) {
        let acc = per_bank.entry(t.bank.as_str()).or_default();
        if t.kind == TxKind::Balance {
            acc.snapshot = newer(acc.snapshot, t);
            continue;
        }
        if t.closing_balance.is_some() {
            acc.closing = newer(acc.closing, t);
        }
        if !range.contains(&t.timestamp) {
            continue;
        }

        let (y, m) = year_month(&t.timestamp.date());
        let idx = (y * 12 + m as i32) - (sy * 12 + sm as i32);
        let bucket = usize::try_from(idx).ok().and_then(|i| monthly.get_mut(i));

        match t.kind {
            TxKind::Credit => {
                acc.income += t.amount;
                totals.income += t.amount;
                if let Some(b) = bucket {
                    b.income += t.amount;
                }
            }
            TxKind::Debit => {
                acc.expenses += t.amount;
                totals.expenses += t.amount;
                if let Some(b) = bucket {
                    b.expenses += t.amount;
                }
                let name = t
                    .category
                    .as_deref()
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .unwrap_or(UNCATEGORIZED)
                    .to_string();
                let entry = categories.entry(name).or_default();
                entry.0 += t.amount;
                let merchant = t.merchant.as_deref().map(str::trim);
                if let Some(merchant) = merchant.filter(|s| !s.is_empty()) {
                    entry.1.insert(merchant.to_string());
                }
                entry.1.extend(t.tags.iter().cloned());
            }
            TxKind::Balance => {}
        }
    }

    let banks: Vec<BankBreakdown> = per_bank
        .into_iter()
        .map(|(bank, acc)| {
            let (balance, balance_as_of) = match (acc.snapshot, acc.closing) {
                (Some(s), _) => (s.amount, Some(s.timestamp)),
                (None, Some(c)) => (c.closing_balance.unwrap_or_default(), Some(c.timestamp)),
                (None, None) => (Decimal::ZERO, None),
            };
            BankBreakdown {
                bank: bank.to_string(),
                balance,
                balance_as_of,
                income: acc.income,
                expenses: acc.expenses,
                savings: acc.income - acc.expenses,
            }
        })
        .collect();

    totals.balance = banks.iter().map(|b| b.balance).sum();
    totals.savings = totals.income - totals.expenses;

    for b in &mut monthly {
        b.savings = b.income - b.expenses;
    }

    let mut categories: Vec<CategoryBreakdown> = categories
        .into_iter()
        .map(|(category, (amount, tags))| CategoryBreakdown {
            percentage: percentage(amount, totals.expenses),
            category,
            amount,
            tags: tags.into_iter().collect(),
        })
        .collect();
    categories.sort_by(|a, b| b.amount.cmp(&a.amount).then_with(|| a.category.cmp(&b.category)));

    AggregateView {
        range: *range,
        totals,
        banks,
        categories,
        monthly,
    }
}

/// Resolves `period` against `today` and aggregates.
pub fn summarize(
    transactions: &[Transaction],
    selector: &BankSelector,
    period: Period,
    today: NaiveDate,
) -> Result<AggregateView> {
    let range = period.resolve(today)?;
    Ok(aggregate(transactions, selector, &range))
}

/// Number of calendar months an inclusive range touches.
pub fn months_spanned(range: &DateRange) -> usize {
    let s = range.start.date();
    let e = range.end.date();
    let span = (e.year() * 12 + e.month() as i32) - (s.year() * 12 + s.month() as i32);
    usize::try_from(span + 1).unwrap_or(0)
}
