// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Deduplicated transaction storage keyed by `(bank, reference_id)`.

use anyhow::{Context, Result, bail};
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::models::{Bank, BankSelector, DateRange, NewTransaction, Transaction, UpsertSummary};
use crate::utils::{fmt_ts, parse_decimal, parse_ts};

pub fn normalize_bank(bank: &str) -> Result<String> {
    let code = bank.trim().to_lowercase();
    if code.is_empty() {
        bail!("Bank code must not be empty");
    }
    if code == "all" {
        bail!("'all' is reserved and cannot be used as a bank code");
    }
    Ok(code)
}

pub fn add_bank(
    conn: &Connection,
    id: &str,
    name: &str,
    account_mask: Option<&str>,
) -> Result<String> {
    let code = normalize_bank(id)?;
    conn.execute(
        "INSERT INTO banks(id, name, account_mask) VALUES (?1, ?2, ?3)
         ON CONFLICT(id) DO UPDATE SET name=excluded.name,
             account_mask=COALESCE(excluded.account_mask, banks.account_mask)",
        params![code, name.trim(), account_mask.map(str::trim)],
    )?;
    Ok(code)
}

/// Registers the bank with a default display name unless it already exists.
fn ensure_bank(conn: &Connection, code: &str) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO banks(id, name) VALUES (?1, ?2)",
        params![code, code.to_uppercase()],
    )?;
    Ok(())
}

pub fn list_banks(conn: &Connection) -> Result<Vec<Bank>> {
    let mut stmt =
        conn.prepare("SELECT id, name, account_mask, created_at FROM banks ORDER BY id")?;
    let rows = stmt.query_map([], |r| {
        Ok(Bank {
            id: r.get(0)?,
            name: r.get(1)?,
            account_mask: r.get(2)?,
            created_at: r.get(3)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

/// Inserts new records and merges re-ingested ones in place. The batch is atomic.
pub fn upsert(
    conn: &mut Connection,
    bank: &str,
    records: &[NewTransaction],
) -> Result<UpsertSummary> {
    let code = normalize_bank(bank)?;
    let tx = conn.transaction()?;
    ensure_bank(&tx, &code)?;

    let mut summary = UpsertSummary::default();
    for rec in records {
        let reference_id = rec.reference_id.trim();
        if reference_id.is_empty() {
            bail!("Transaction reference id must not be empty (bank '{}')", code);
        }
        if rec.amount < Decimal::ZERO {
            bail!(
                "Amount must be a non-negative magnitude ({}/{}: {})",
                code,
                reference_id,
                rec.amount
            );
        }
        let tags = rec.tags.join(",");
        let closing = rec.closing_balance.map(|d| d.to_string());
        let existing: Option<i64> = tx
            .query_row(
                "SELECT id FROM transactions WHERE bank=?1 AND reference_id=?2",
                params![code, reference_id],
                |r| r.get(0),
            )
            .optional()?;
        match existing {
            Some(id) => {
                tx.execute(
                    "UPDATE transactions SET ts=?1, amount=?2, kind=?3,
                         category=COALESCE(?4, category),
                         merchant=COALESCE(?5, merchant),
                         tags=CASE WHEN ?6='' THEN tags ELSE ?6 END,
                         closing_balance=COALESCE(?7, closing_balance),
                         updated_at=datetime('now')
                     WHERE id=?8",
                    params![
                        fmt_ts(&rec.timestamp),
                        rec.amount.to_string(),
                        rec.kind.as_str(),
                        rec.category.as_deref(),
                        rec.merchant.as_deref(),
                        tags,
                        closing,
                        id
                    ],
                )?;
                debug!(bank = %code, reference_id, id, "updated transaction");
                summary.updated += 1;
            }
            None => {
                tx.execute(
                    "INSERT INTO transactions(bank, reference_id, ts, amount, kind, category, merchant, tags, closing_balance)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                    params![
                        code,
                        reference_id,
                        fmt_ts(&rec.timestamp),
                        rec.amount.to_string(),
                        rec.kind.as_str(),
                        rec.category.as_deref(),
                        rec.merchant.as_deref(),
                        tags,
                        closing
                    ],
                )?;
                debug!(bank = %code, reference_id, "inserted transaction");
                summary.inserted += 1;
            }
        }
    }
    summary.total = records.len();
    tx.commit()?;
    info!(
        bank = %code,
        inserted = summary.inserted,
        updated = summary.updated,
        "upsert complete"
    );
    Ok(summary)
}

struct RawRow {
    id: i64,
    bank: String,
    reference_id: String,
    ts: String,
    amount: String,
    kind: String,
    category: Option<String>,
    merchant: Option<String>,
    tags: String,
    closing_balance: Option<String>,
}

impl RawRow {
    fn into_transaction(self) -> Result<Transaction> {
        let amount = parse_decimal(&self.amount)
            .with_context(|| format!("Stored amount for {}/{}", self.bank, self.reference_id))?;
        let closing_balance = match self.closing_balance.as_deref() {
            Some(s) => Some(parse_decimal(s)?),
            None => None,
        };
        Ok(Transaction {
            id: self.id,
            timestamp: parse_ts(&self.ts)?,
            amount,
            kind: self.kind.parse()?,
            category: self.category,
            merchant: self.merchant,
            tags: split_tags(&self.tags),
            closing_balance,
            bank: self.bank,
            reference_id: self.reference_id,
        })
    }
}

pub fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Matching records, newest first.
pub fn query(
    conn: &Connection,
    selector: &BankSelector,
    range: Option<&DateRange>,
) -> Result<Vec<Transaction>> {
    let mut sql = String::from(
        "SELECT id, bank, reference_id, ts, amount, kind, category, merchant, tags, closing_balance
         FROM transactions WHERE 1=1",
    );
    let mut params_vec: Vec<String> = Vec::new();

    if let BankSelector::Only(banks) = selector {
        if banks.is_empty() {
            return Ok(Vec::new());
        }
        let marks = vec!["?"; banks.len()].join(",");
        sql.push_str(&format!(" AND bank IN ({})", marks));
        params_vec.extend(banks.iter().cloned());
    }
    if let Some(r) = range {
        sql.push_str(" AND ts >= ? AND ts <= ?");
        params_vec.push(fmt_ts(&r.start));
        params_vec.push(fmt_ts(&r.end));
    }
    sql.push_str(" ORDER BY ts DESC, id DESC");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(params_vec.iter()), |r| {
        Ok(RawRow {
            id: r.get(0)?,
            bank: r.get(1)?,
            reference_id: r.get(2)?,
            ts: r.get(3)?,
            amount: r.get(4)?,
            kind: r.get(5)?,
            category: r.get(6)?,
            merchant: r.get(7)?,
            tags: r.get(8)?,
            closing_balance: r.get(9)?,
        })
    })?;

    let mut data = Vec::new();
    for row in rows {
        data.push(row?.into_transaction()?);
    }
    Ok(data)
}

/// Removes a bank together with its transactions; returns how many transactions went.
pub fn delete_bank(conn: &mut Connection, bank: &str) -> Result<usize> {
    let code = normalize_bank(bank)?;
    let tx = conn.transaction()?;
    let removed = tx.execute("DELETE FROM transactions WHERE bank=?1", params![code])?;
    tx.execute("DELETE FROM banks WHERE id=?1", params![code])?;
    tx.commit()?;
    info!(bank = %code, removed, "bank deleted");
    Ok(removed)
}
