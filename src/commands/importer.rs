// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::errors::ImportError;
use crate::models::{NewTransaction, TxKind, UpsertSummary};
use crate::store::{self, split_tags};
use crate::utils::{required, shift_month, year_month};
use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEMO_BANK: &str = "demo";

static FILENAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z][A-Za-z0-9]*)Transaction\.json$").expect("static regex"));
static DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("static regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UploadKind {
    #[serde(rename = "deposit")]
    Deposit,
    // Spelling is part of the accepted file format.
    #[serde(rename = "withdrawl")]
    Withdrawl,
}

/// One object of an upload file. Every key is required and no others are allowed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UploadRecord {
    pub date: String,
    #[serde(rename = "refId")]
    pub ref_id: String,
    #[serde(with = "json_number")]
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub kind: UploadKind,
    #[serde(rename = "closingBy", with = "json_number")]
    pub closing_by: Decimal,
    pub category: String,
    pub tags: String,
}

/// Upload amounts are JSON numbers, read from their literal text so no digits
/// are lost to a float round-trip.
mod json_number {
    use rust_decimal::Decimal;
    use serde::{Deserialize, Deserializer, Serialize, Serializer, de, ser};
    use std::str::FromStr;

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Decimal, D::Error> {
        let text = serde_json::Number::deserialize(d)?.to_string();
        Decimal::from_str(&text)
            .or_else(|_| Decimal::from_scientific(&text))
            .map_err(|e| de::Error::custom(format!("number {} is out of range: {}", text, e)))
    }

    pub fn serialize<S: Serializer>(d: &Decimal, s: S) -> Result<S::Ok, S::Error> {
        serde_json::Number::from_str(&d.to_string())
            .map_err(ser::Error::custom)?
            .serialize(s)
    }
}

impl UploadRecord {
    fn into_new_transaction(self, index: usize) -> Result<NewTransaction, ImportError> {
        if !DATE_RE.is_match(&self.date) {
            return Err(ImportError::InvalidDate {
                index,
                value: self.date,
            });
        }
        let date = match NaiveDate::parse_from_str(&self.date, "%Y-%m-%d") {
            Ok(d) => d,
            Err(_) => {
                return Err(ImportError::InvalidDate {
                    index,
                    value: self.date,
                });
            }
        };
        if self.amount < Decimal::ZERO {
            return Err(ImportError::InvalidAmount {
                index,
                value: self.amount,
            });
        }
        if self.ref_id.trim().is_empty() {
            return Err(ImportError::Schema {
                index,
                message: "refId must not be empty".to_string(),
            });
        }
        let category = Some(self.category.trim().to_string()).filter(|c| !c.is_empty());
        Ok(NewTransaction {
            reference_id: self.ref_id.trim().to_string(),
            timestamp: date.and_time(NaiveTime::MIN),
            amount: self.amount,
            kind: match self.kind {
                UploadKind::Deposit => TxKind::Credit,
                UploadKind::Withdrawl => TxKind::Debit,
            },
            category,
            merchant: None,
            tags: split_tags(&self.tags),
            closing_balance: Some(self.closing_by),
        })
    }
}

/// `hdfcTransaction.json` → `hdfc`.
pub fn bank_from_filename(file_name: &str) -> Result<String, ImportError> {
    FILENAME_RE
        .captures(file_name)
        .map(|c| c[1].to_lowercase())
        .ok_or_else(|| ImportError::FilenamePattern(file_name.to_string()))
}

/// Validates a whole upload; the first bad record rejects the file.
pub fn parse_upload(text: &str) -> Result<Vec<NewTransaction>, ImportError> {
    let value: serde_json::Value = serde_json::from_str(text).map_err(ImportError::MalformedJson)?;
    let serde_json::Value::Array(items) = value else {
        return Err(ImportError::NotAnArray);
    };
    let mut out = Vec::with_capacity(items.len());
    for (i, item) in items.into_iter().enumerate() {
        let index = i + 1;
        let rec: UploadRecord = serde_json::from_value(item).map_err(|e| ImportError::Schema {
            index,
            message: e.to_string(),
        })?;
        out.push(rec.into_new_transaction(index)?);
    }
    Ok(out)
}

pub fn import_file(
    conn: &mut Connection,
    path: &Path,
    name: Option<&str>,
    account_mask: Option<&str>,
) -> Result<(String, UpsertSummary)> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let bank = bank_from_filename(file_name)?;
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Read upload {}", path.display()))?;
    let records = parse_upload(&text)?;
    if name.is_some() || account_mask.is_some() {
        let display = name.map(str::to_string).unwrap_or_else(|| bank.to_uppercase());
        store::add_bank(conn, &bank, &display, account_mask)?;
    }
    let summary = store::upsert(conn, &bank, &records)?;
    Ok((bank, summary))
}

struct DemoLine {
    day: u32,
    kind: UploadKind,
    /// In paise.
    amount: i64,
    category: &'static str,
    tags: &'static str,
}

const DEMO_MONTH: &[DemoLine] = &[
    DemoLine { day: 1, kind: UploadKind::Deposit, amount: 8_500_000, category: "Salary", tags: "salary,employer" },
    DemoLine { day: 3, kind: UploadKind::Withdrawl, amount: 2_200_000, category: "Rent", tags: "rent,landlord" },
    DemoLine { day: 5, kind: UploadKind::Withdrawl, amount: 320_000, category: "Groceries", tags: "bigbasket" },
    DemoLine { day: 9, kind: UploadKind::Withdrawl, amount: 145_000, category: "Food & Dining", tags: "swiggy,zomato" },
    DemoLine { day: 12, kind: UploadKind::Withdrawl, amount: 250_000, category: "Fuel", tags: "indianoil" },
    DemoLine { day: 15, kind: UploadKind::Withdrawl, amount: 189_900, category: "Bills & Utilities", tags: "electricity,broadband" },
    DemoLine { day: 20, kind: UploadKind::Withdrawl, amount: 499_900, category: "Shopping", tags: "amazon" },
    DemoLine { day: 24, kind: UploadKind::Withdrawl, amount: 64_900, category: "Entertainment", tags: "netflix" },
    DemoLine { day: 27, kind: UploadKind::Deposit, amount: 31_250, category: "Interest", tags: "savings" },
];

/// Six months of sample activity ending at `today`, in upload format.
pub fn demo_records(today: NaiveDate) -> Vec<UploadRecord> {
    let (y, m) = year_month(&today);
    let mut balance = Decimal::new(120_000, 0);
    let mut out = Vec::new();
    for back in (0..6).rev() {
        let (dy, dm) = shift_month(y, m, -back);
        // Vary spending a little month to month.
        let wobble = Decimal::from(dm * 37);
        for (n, line) in DEMO_MONTH.iter().enumerate() {
            let Some(date) = NaiveDate::from_ymd_opt(dy, dm, line.day) else {
                continue;
            };
            if date > today {
                continue;
            }
            let base = Decimal::new(line.amount, 2);
            let amount = match line.kind {
                UploadKind::Withdrawl if base < Decimal::from(10_000) => base + wobble,
                _ => base,
            };
            match line.kind {
                UploadKind::Deposit => balance += amount,
                UploadKind::Withdrawl => balance -= amount,
            }
            out.push(UploadRecord {
                date: date.format("%Y-%m-%d").to_string(),
                ref_id: format!("DEMO-{}{:02}-{:02}", dy, dm, n + 1),
                amount,
                kind: line.kind,
                closing_by: balance,
                category: line.category.to_string(),
                tags: line.tags.to_string(),
            });
        }
    }
    out
}

pub fn load_demo(conn: &mut Connection, today: NaiveDate) -> Result<UpsertSummary> {
    let text = serde_json::to_string(&demo_records(today))?;
    let records = parse_upload(&text)?;
    store::add_bank(conn, DEMO_BANK, "Demo Bank", Some("XXXX0000"))?;
    store::upsert(conn, DEMO_BANK, &records)
}

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("transactions", sub)) => import_transactions(conn, sub),
        Some(("demo", _)) => {
            let summary = load_demo(conn, Utc::now().date_naive())?;
            println!(
                "Loaded demo dataset into bank '{}': {} inserted, {} updated",
                DEMO_BANK, summary.inserted, summary.updated
            );
            Ok(())
        }
        _ => Ok(()),
    }
}

fn import_transactions(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let path = required(sub, "path")?.trim();
    let name = sub.get_one::<String>("name").map(|s| s.trim()).filter(|s| !s.is_empty());
    let mask = sub.get_one::<String>("account").map(|s| s.trim()).filter(|s| !s.is_empty());
    let (bank, summary) = import_file(conn, Path::new(path), name, mask)?;
    println!(
        "Imported {} records from {} into bank '{}' ({} inserted, {} updated)",
        summary.total, path, bank, summary.inserted, summary.updated
    );
    Ok(())
}
