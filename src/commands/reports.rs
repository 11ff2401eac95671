// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::aggregate::{AggregateView, aggregate};
use crate::commands::{bank_selector, effective_range, period_arg};
use crate::store;
use crate::utils::{fmt_money, fmt_ts, get_currency, maybe_print_json, pretty_table};
use anyhow::Result;
use chrono::{NaiveDate, Utc};
use rusqlite::Connection;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("summary", sub)) => summary(conn, sub)?,
        Some(("banks", sub)) => banks(conn, sub)?,
        Some(("categories", sub)) => categories(conn, sub)?,
        Some(("monthly", sub)) => monthly(conn, sub)?,
        _ => {}
    }
    Ok(())
}

/// Loads the selected banks' full history (balances ignore the period) and aggregates it.
pub fn build_view(
    conn: &Connection,
    sub: &clap::ArgMatches,
    today: NaiveDate,
) -> Result<AggregateView> {
    let selector = bank_selector(sub);
    let period = period_arg(sub)?;
    let txs = store::query(conn, &selector, None)?;
    let range = effective_range(period, &txs, today)?;
    Ok(aggregate(&txs, &selector, &range))
}

fn summary(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let view = build_view(conn, sub, Utc::now().date_naive())?;
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &view)? {
        return Ok(());
    }
    let ccy = get_currency(conn)?;
    let t = &view.totals;
    let data = vec![
        vec![
            "Period".to_string(),
            format!("{} .. {}", view.range.start.date(), view.range.end.date()),
        ],
        vec!["Balance".to_string(), fmt_money(&t.balance, &ccy)],
        vec!["Income".to_string(), fmt_money(&t.income, &ccy)],
        vec!["Expenses".to_string(), fmt_money(&t.expenses, &ccy)],
        vec!["Savings".to_string(), fmt_money(&t.savings, &ccy)],
    ];
    println!("{}", pretty_table(&["Metric", "Value"], data));
    Ok(())
}

fn banks(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let view = build_view(conn, sub, Utc::now().date_naive())?;
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &view.banks)? {
        return Ok(());
    }
    let data = view
        .banks
        .iter()
        .map(|b| {
            vec![
                b.bank.clone(),
                format!("{:.2}", b.balance),
                b.balance_as_of.map(|ts| fmt_ts(&ts)).unwrap_or_default(),
                format!("{:.2}", b.income),
                format!("{:.2}", b.expenses),
                format!("{:.2}", b.savings),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(
            &["Bank", "Balance", "As of", "Income", "Expenses", "Savings"],
            data
        )
    );
    Ok(())
}

fn categories(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let view = build_view(conn, sub, Utc::now().date_naive())?;
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &view.categories)? {
        return Ok(());
    }
    let data = view
        .categories
        .iter()
        .map(|c| {
            vec![
                c.category.clone(),
                format!("{:.2}", c.amount),
                format!("{}%", c.percentage),
                c.tags.join(", "),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(&["Category", "Spent", "Share", "Merchants / Tags"], data)
    );
    Ok(())
}

fn monthly(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let view = build_view(conn, sub, Utc::now().date_naive())?;
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &view.monthly)? {
        return Ok(());
    }
    let data = view
        .monthly
        .iter()
        .map(|b| {
            vec![
                b.label.clone(),
                format!("{:.2}", b.income),
                format!("{:.2}", b.expenses),
                format!("{:.2}", b.savings),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(&["Month", "Income", "Expenses", "Savings"], data)
    );
    Ok(())
}
