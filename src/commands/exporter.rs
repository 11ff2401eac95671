// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::{bank_selector, period_arg};
use crate::models::Transaction;
use crate::store;
use crate::utils::{fmt_ts, required};
use anyhow::{Context, Result, bail};
use chrono::Utc;
use rusqlite::Connection;
use serde_json::json;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("transactions", sub)) => export_transactions(conn, sub),
        _ => Ok(()),
    }
}

fn export_transactions(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let fmt = required(sub, "format")?.trim().to_lowercase();
    let out = required(sub, "out")?.trim();

    let selector = bank_selector(sub);
    let range = match period_arg(sub)? {
        Some(p) => Some(p.resolve(Utc::now().date_naive())?),
        None => None,
    };
    // Oldest first reads naturally in a file.
    let mut txs = store::query(conn, &selector, range.as_ref())?;
    txs.reverse();

    let count = write_transactions(&txs, &fmt, out)?;
    println!("Exported {} transactions to {}", count, out);
    Ok(())
}

pub fn write_transactions(txs: &[Transaction], fmt: &str, out: &str) -> Result<usize> {
    match fmt {
        "csv" => {
            let mut wtr = csv::Writer::from_path(out).with_context(|| format!("Create {}", out))?;
            wtr.write_record([
                "timestamp",
                "bank",
                "reference_id",
                "type",
                "amount",
                "category",
                "merchant",
                "tags",
                "closing_balance",
            ])?;
            for t in txs {
                wtr.write_record([
                    fmt_ts(&t.timestamp),
                    t.bank.clone(),
                    t.reference_id.clone(),
                    t.kind.to_string(),
                    t.amount.to_string(),
                    t.category.clone().unwrap_or_default(),
                    t.merchant.clone().unwrap_or_default(),
                    t.tags.join(","),
                    t.closing_balance.map(|d| d.to_string()).unwrap_or_default(),
                ])?;
            }
            wtr.flush()?;
        }
        "json" => {
            let items: Vec<_> = txs
                .iter()
                .map(|t| {
                    json!({
                        "timestamp": fmt_ts(&t.timestamp),
                        "bank": t.bank,
                        "reference_id": t.reference_id,
                        "type": t.kind,
                        "amount": t.amount,
                        "category": t.category,
                        "merchant": t.merchant,
                        "tags": t.tags,
                        "closing_balance": t.closing_balance,
                    })
                })
                .collect();
            std::fs::write(out, serde_json::to_string_pretty(&items)?)
                .with_context(|| format!("Write {}", out))?;
        }
        other => bail!("Unknown format: {} (use csv|json)", other),
    }
    Ok(txs.len())
}
