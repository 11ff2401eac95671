// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::extract::cache_category;
use crate::utils::{maybe_print_json, pretty_table, required};
use anyhow::{Result, bail};
use rusqlite::Connection;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct MerchantRow {
    pub merchant: String,
    pub category: String,
    pub source: String,
    pub updated_at: String,
}

pub fn list_rows(conn: &Connection) -> Result<Vec<MerchantRow>> {
    let mut stmt = conn.prepare(
        "SELECT merchant, category, source, updated_at FROM merchant_categories ORDER BY merchant",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok(MerchantRow {
            merchant: r.get(0)?,
            category: r.get(1)?,
            source: r.get(2)?,
            updated_at: r.get(3)?,
        })
    })?;
    let mut data = Vec::new();
    for row in rows {
        data.push(row?);
    }
    Ok(data)
}

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("list", sub)) => {
            let rows = list_rows(conn)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &rows)? {
                let data = rows
                    .into_iter()
                    .map(|r| vec![r.merchant, r.category, r.source, r.updated_at])
                    .collect();
                println!(
                    "{}",
                    pretty_table(&["Merchant", "Category", "Source", "Updated"], data)
                );
            }
        }
        Some(("set", sub)) => {
            let merchant = required(sub, "merchant")?.trim();
            let category = required(sub, "category")?.trim();
            if merchant.is_empty() || category.is_empty() {
                bail!("Merchant and category must not be empty");
            }
            cache_category(conn, merchant, category, "manual")?;
            println!("Merchant '{}' -> {}", merchant.to_lowercase(), category);
        }
        _ => {}
    }
    Ok(())
}
