// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Queue of notification snippets. Each item is retried until it is stored or
//! reaches the attempt ceiling, after which it is left `failed`.

use anyhow::Result;
use chrono::NaiveDateTime;
use rusqlite::{Connection, params};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::classifier::MerchantClassifier;
use crate::extract::{
    DEFAULT_MERCHANT, Extraction, cached_category, extract, is_person_name, merchant_key,
    resolve_categories,
};
use crate::models::{InboxItem, InboxStatus, NewTransaction, TxKind};
use crate::store;
use crate::utils::{fmt_ts, parse_ts};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

pub fn enqueue(
    conn: &Connection,
    bank: &str,
    snippet: &str,
    received_at: NaiveDateTime,
) -> Result<i64> {
    let code = store::normalize_bank(bank)?;
    conn.execute(
        "INSERT INTO inbox(bank, snippet, received_at) VALUES (?1, ?2, ?3)",
        params![code, snippet.trim(), fmt_ts(&received_at)],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn list(conn: &Connection, status: Option<InboxStatus>) -> Result<Vec<InboxItem>> {
    let mut sql = String::from(
        "SELECT id, bank, snippet, received_at, status, attempts, last_error, reference_id FROM inbox",
    );
    let mut params_vec: Vec<String> = Vec::new();
    if let Some(s) = status {
        sql.push_str(" WHERE status=?");
        params_vec.push(s.as_str().to_string());
    }
    sql.push_str(" ORDER BY id");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(params_vec.iter()), |r| {
        Ok((
            r.get::<_, i64>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, String>(3)?,
            r.get::<_, String>(4)?,
            r.get::<_, u32>(5)?,
            r.get::<_, Option<String>>(6)?,
            r.get::<_, Option<String>>(7)?,
        ))
    })?;
    let mut out = Vec::new();
    for row in rows {
        let (id, bank, snippet, received, status, attempts, last_error, reference_id) = row?;
        out.push(InboxItem {
            id,
            bank,
            snippet,
            received_at: parse_ts(&received)?,
            status: status.parse()?,
            attempts,
            last_error,
            reference_id,
        });
    }
    Ok(out)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProcessReport {
    pub processed: usize,
    pub skipped: usize,
    /// Failed this round but still under the ceiling.
    pub retried: usize,
    pub failed: usize,
}

fn mark(
    conn: &Connection,
    id: i64,
    status: InboxStatus,
    error: Option<&str>,
    reference_id: Option<&str>,
) -> Result<()> {
    conn.execute(
        "UPDATE inbox SET status=?1, last_error=?2, reference_id=COALESCE(?3, reference_id) WHERE id=?4",
        params![status.as_str(), error, reference_id, id],
    )?;
    Ok(())
}

/// Counts a failed attempt; returns true when the item is now terminally failed.
fn record_failure(
    conn: &Connection,
    item: &InboxItem,
    max_attempts: u32,
    error: &str,
) -> Result<bool> {
    let attempts = item.attempts + 1;
    let failed = attempts >= max_attempts;
    let status = if failed {
        InboxStatus::Failed
    } else {
        InboxStatus::Pending
    };
    conn.execute(
        "UPDATE inbox SET attempts=?1, status=?2, last_error=?3 WHERE id=?4",
        params![attempts, status.as_str(), error, item.id],
    )?;
    if failed {
        warn!(id = item.id, attempts, error, "inbox item failed");
    }
    Ok(failed)
}

fn needs_classification(conn: &Connection, merchant: &str) -> Result<bool> {
    let key = merchant_key(merchant);
    if key.is_empty() || key == DEFAULT_MERCHANT || is_person_name(&key) {
        return Ok(false);
    }
    Ok(cached_category(conn, &key)?.is_none())
}

fn to_new_transaction(
    item: &InboxItem,
    ex: &Extraction,
    kind: TxKind,
    category: Option<String>,
) -> Option<NewTransaction> {
    Some(NewTransaction {
        reference_id: format!("mail-{}", item.id),
        timestamp: item.received_at,
        amount: ex.amount?,
        kind,
        category: if kind == TxKind::Balance { None } else { category },
        merchant: Some(ex.merchant.clone()).filter(|m| m != DEFAULT_MERCHANT),
        tags: Vec::new(),
        closing_balance: None,
    })
}

/// Runs every pending item through extraction, categorization and the store.
pub fn process(
    conn: &mut Connection,
    classifier: Option<&dyn MerchantClassifier>,
    max_attempts: u32,
) -> Result<ProcessReport> {
    let mut report = ProcessReport::default();
    let pending = list(conn, Some(InboxStatus::Pending))?;

    let mut ready: Vec<(InboxItem, Extraction, TxKind)> = Vec::new();
    for item in pending {
        let ex = extract(&item.snippet);
        match (ex.kind.tx_kind(), ex.amount) {
            (Some(kind), Some(_)) => ready.push((item, ex, kind)),
            (None, _) => {
                let reason = Some("unrecognized transaction type");
                mark(conn, item.id, InboxStatus::Skipped, reason, None)?;
                report.skipped += 1;
            }
            (Some(_), None) => {
                mark(conn, item.id, InboxStatus::Skipped, Some("no amount found"), None)?;
                report.skipped += 1;
            }
        }
    }

    let merchants: Vec<String> = ready
        .iter()
        .filter(|(_, _, kind)| *kind != TxKind::Balance)
        .map(|(_, ex, _)| ex.merchant.clone())
        .collect();
    let (categories, classify_error) = match resolve_categories(conn, classifier, &merchants) {
        Ok(c) => (c, None),
        Err(err) => {
            warn!(error = %err, "classification failed; using cached categories");
            (resolve_categories(conn, None, &merchants)?, Some(format!("{:#}", err)))
        }
    };

    let mut by_bank: BTreeMap<String, Vec<(InboxItem, NewTransaction)>> = BTreeMap::new();
    for (item, ex, kind) in ready {
        if let Some(err) = classify_error.as_deref() {
            if kind != TxKind::Balance && needs_classification(conn, &ex.merchant)? {
                if record_failure(conn, &item, max_attempts, err)? {
                    report.failed += 1;
                } else {
                    report.retried += 1;
                }
                continue;
            }
        }
        let category = categories.get(&merchant_key(&ex.merchant)).cloned();
        if let Some(new_tx) = to_new_transaction(&item, &ex, kind, category) {
            by_bank.entry(item.bank.clone()).or_default().push((item, new_tx));
        }
    }

    for (bank, entries) in by_bank {
        let records: Vec<NewTransaction> = entries.iter().map(|(_, t)| t.clone()).collect();
        match store::upsert(conn, &bank, &records) {
            Ok(_) => {
                for (item, t) in &entries {
                    mark(conn, item.id, InboxStatus::Processed, None, Some(&t.reference_id))?;
                    report.processed += 1;
                }
            }
            Err(err) => {
                let msg = format!("{:#}", err);
                for (item, _) in &entries {
                    if record_failure(conn, item, max_attempts, &msg)? {
                        report.failed += 1;
                    } else {
                        report.retried += 1;
                    }
                }
            }
        }
    }

    info!(
        processed = report.processed,
        skipped = report.skipped,
        retried = report.retried,
        failed = report.failed,
        "inbox processed"
    );
    Ok(report)
}
