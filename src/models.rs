// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Result, anyhow};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Timestamp layout used for the `transactions.ts` column. Sorts lexicographically.
pub const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bank {
    pub id: String,
    pub name: String,
    pub account_mask: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxKind {
    Debit,
    Credit,
    /// Point-in-time account balance; never an income or expense.
    Balance,
}

impl TxKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxKind::Debit => "debit",
            TxKind::Credit => "credit",
            TxKind::Balance => "balance",
        }
    }
}

impl fmt::Display for TxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TxKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debit" => Ok(TxKind::Debit),
            "credit" => Ok(TxKind::Credit),
            "balance" => Ok(TxKind::Balance),
            other => Err(anyhow!("Unknown transaction kind '{}'", other)),
        }
    }
}

/// A stored transaction. `id` is the internal identity and survives upserts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub bank: String,
    pub reference_id: String,
    pub timestamp: NaiveDateTime,
    pub amount: Decimal,
    pub kind: TxKind,
    pub category: Option<String>,
    pub merchant: Option<String>,
    pub tags: Vec<String>,
    pub closing_balance: Option<Decimal>,
}

/// Incoming record before it is keyed into the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub reference_id: String,
    pub timestamp: NaiveDateTime,
    pub amount: Decimal,
    pub kind: TxKind,
    pub category: Option<String>,
    pub merchant: Option<String>,
    pub tags: Vec<String>,
    pub closing_balance: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct UpsertSummary {
    pub inserted: usize,
    pub updated: usize,
    pub total: usize,
}

/// Inclusive timestamp window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl DateRange {
    pub fn contains(&self, ts: &NaiveDateTime) -> bool {
        *ts >= self.start && *ts <= self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BankSelector {
    All,
    Only(Vec<String>),
}

impl BankSelector {
    /// Builds a selector from CLI values; an empty list or any `all` means every bank.
    pub fn from_values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut banks: Vec<String> = Vec::new();
        for v in values {
            for part in v.as_ref().split(',') {
                let code = part.trim().to_lowercase();
                if code.is_empty() {
                    continue;
                }
                if code == "all" {
                    return BankSelector::All;
                }
                if !banks.contains(&code) {
                    banks.push(code);
                }
            }
        }
        if banks.is_empty() {
            BankSelector::All
        } else {
            BankSelector::Only(banks)
        }
    }

    pub fn includes(&self, bank: &str) -> bool {
        match self {
            BankSelector::All => true,
            BankSelector::Only(banks) => banks.iter().any(|b| b == bank),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InboxStatus {
    Pending,
    Processed,
    Skipped,
    Failed,
}

impl InboxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InboxStatus::Pending => "pending",
            InboxStatus::Processed => "processed",
            InboxStatus::Skipped => "skipped",
            InboxStatus::Failed => "failed",
        }
    }
}

impl FromStr for InboxStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(InboxStatus::Pending),
            "processed" => Ok(InboxStatus::Processed),
            "skipped" => Ok(InboxStatus::Skipped),
            "failed" => Ok(InboxStatus::Failed),
            other => Err(anyhow!("Unknown inbox status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InboxItem {
    pub id: i64,
    pub bank: String,
    pub snippet: String,
    pub received_at: NaiveDateTime,
    pub status: InboxStatus,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub reference_id: Option<String>,
}
