// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::{bank_selector, period_arg};
use crate::store;
use crate::utils::{fmt_ts, maybe_print_json, pretty_table};
use anyhow::Result;
use chrono::Utc;
use rusqlite::Connection;
use serde::Serialize;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    if let Some(("list", sub)) = m.subcommand() {
        list(conn, sub)?;
    }
    Ok(())
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let data = query_rows(conn, sub)?;
    if !maybe_print_json(json_flag, jsonl_flag, &data)? {
        let rows: Vec<Vec<String>> = data
            .iter()
            .map(|r| {
                vec![
                    r.timestamp.clone(),
                    r.bank.clone(),
                    r.reference_id.clone(),
                    r.kind.clone(),
                    r.amount.clone(),
                    r.category.clone(),
                    r.merchant.clone(),
                    r.tags.clone(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["Date", "Bank", "Ref", "Type", "Amount", "Category", "Merchant", "Tags"],
                rows,
            )
        );
    }
    Ok(())
}

#[derive(Serialize)]
pub struct TransactionRow {
    pub timestamp: String,
    pub bank: String,
    pub reference_id: String,
    pub kind: String,
    pub amount: String,
    pub category: String,
    pub merchant: String,
    pub tags: String,
}

pub fn query_rows(conn: &Connection, sub: &clap::ArgMatches) -> Result<Vec<TransactionRow>> {
    let selector = bank_selector(sub);
    let range = match period_arg(sub)? {
        Some(p) => Some(p.resolve(Utc::now().date_naive())?),
        None => None,
    };
    let mut txs = store::query(conn, &selector, range.as_ref())?;
    if let Some(limit) = sub.get_one::<usize>("limit") {
        txs.truncate(*limit);
    }
    Ok(txs
        .into_iter()
        .map(|t| TransactionRow {
            timestamp: fmt_ts(&t.timestamp),
            bank: t.bank,
            reference_id: t.reference_id,
            kind: t.kind.to_string(),
            amount: format!("{:.2}", t.amount),
            category: t.category.unwrap_or_default(),
            merchant: t.merchant.unwrap_or_default(),
            tags: t.tags.join(","),
        })
        .collect())
}
