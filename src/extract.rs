// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Best-effort parsing of bank notification snippets.
//!
//! Nothing in here fails: unrecognized text degrades to `Unknown` kinds,
//! missing amounts and the `others` merchant.

use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, warn};

use crate::classifier::{MerchantClassifier, canonical_category};
use crate::models::TxKind;

pub const DEFAULT_MERCHANT: &str = "others";
pub const DEFAULT_CATEGORY: &str = "Others";
pub const PERSON_CATEGORY: &str = "Personal Transfer";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SnippetKind {
    Debit,
    Credit,
    Balance,
    Unknown,
}

impl SnippetKind {
    pub fn tx_kind(&self) -> Option<TxKind> {
        match self {
            SnippetKind::Debit => Some(TxKind::Debit),
            SnippetKind::Credit => Some(TxKind::Credit),
            SnippetKind::Balance => Some(TxKind::Balance),
            SnippetKind::Unknown => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Extraction {
    pub kind: SnippetKind,
    pub amount: Option<Decimal>,
    pub merchant: String,
    pub is_person: bool,
}

pub fn infer_kind(snippet: &str) -> SnippetKind {
    let s = snippet.to_lowercase();
    if s.contains("debited") {
        SnippetKind::Debit
    } else if s.contains("credited") {
        SnippetKind::Credit
    } else if s.contains("available balance") || s.contains("balance") {
        SnippetKind::Balance
    } else {
        SnippetKind::Unknown
    }
}

const NUM: &str = r"(\d{1,3}(?:,\d{2,3})+(?:\.\d{1,2})?|\d+(?:\.\d{1,2})?)";

// Ordered: precise patterns first because snippets also carry dates and masked account digits.
static AMOUNT_CASCADE: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        format!(r"(?i)(?:\brs\.?|\binr|₹)\s*{NUM}"),
        // Anchored on "is", ":" or a currency mark so masked a/c digits are skipped.
        format!(r"(?i)available\s+balance.*?(?:\bis\b|:|\brs\.?|\binr\b|₹)\s*{NUM}"),
        format!(r"(?i)\bwas\b\D*?{NUM}"),
        r"\b(\d{1,3}(?:,\d{2,3})+(?:\.\d{1,2})?|\d+\.\d{1,2})\b".to_string(),
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static regex"))
    .collect()
});

static DIGIT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("static regex"));

static VPA_NAMED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bVPA\s+[\w.\-]+@[\w.\-]+\s+(?P<name>[A-Za-z][A-Za-z .&'\-]*?)\s+on\b")
        .expect("static regex")
});

static VPA_HANDLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bVPA\s+(?P<handle>[\w.\-]+)@[\w.\-]+").expect("static regex")
});

static POS_AT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\bat\s+(?P<name>[A-Za-z0-9][A-Za-z0-9 &'\-]*?)(?:\s+on\b|\s+ref\b|\s+via\b|[.,;]|$)",
    )
    .expect("static regex")
});

static WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));

const BUSINESS_TOKENS: &[&str] = &[
    "pvt", "ltd", "private", "limited", "llp", "inc", "corp", "co", "company", "store", "stores",
    "mart", "shop", "services", "service", "enterprises", "enterprise", "technologies", "tech",
    "solutions", "india", "pay", "payments", "bank", "restaurant", "cafe", "foods", "food",
    "traders", "trading", "hotel", "hospital", "pharmacy", "medical", "retail", "online",
    "industries", "agency", "travels", "motors", "fuels", "petroleum",
];

fn parse_amount(raw: &str) -> Option<Decimal> {
    raw.replace(',', "").parse::<Decimal>().ok()
}

/// First hit in the cascade wins; the longest bare digit run is the last resort.
pub fn extract_amount(snippet: &str) -> Option<Decimal> {
    for re in AMOUNT_CASCADE.iter() {
        if let Some(caps) = re.captures(snippet) {
            if let Some(d) = caps.get(1).and_then(|m| parse_amount(m.as_str())) {
                return Some(d);
            }
        }
    }
    DIGIT_RUN
        .find_iter(snippet)
        .map(|m| m.as_str())
        .reduce(|best, cur| if cur.len() > best.len() { cur } else { best })
        .and_then(parse_amount)
}

fn clean_name(raw: &str) -> String {
    WS.replace_all(raw.trim(), " ")
        .trim_matches(|c: char| c == '.' || c == '-' || c == '\'' || c.is_whitespace())
        .to_string()
}

pub fn extract_merchant(snippet: &str) -> String {
    let candidates = [
        VPA_NAMED.captures(snippet).and_then(|c| c.name("name")),
        VPA_HANDLE.captures(snippet).and_then(|c| c.name("handle")),
        POS_AT.captures(snippet).and_then(|c| c.name("name")),
    ];
    candidates
        .into_iter()
        .flatten()
        .map(|m| clean_name(m.as_str()))
        .find(|name| !name.is_empty())
        .unwrap_or_else(|| DEFAULT_MERCHANT.to_string())
}

/// Two to four alphabetic words, none of which reads like a business.
pub fn is_person_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    let words: Vec<&str> = lower.split_whitespace().collect();
    if !(2..=4).contains(&words.len()) {
        return false;
    }
    words.iter().all(|w| {
        w.chars().all(|c| c.is_ascii_alphabetic()) && !BUSINESS_TOKENS.contains(w)
    })
}

pub fn extract(snippet: &str) -> Extraction {
    let kind = infer_kind(snippet);
    let amount = extract_amount(snippet);
    let merchant = extract_merchant(snippet);
    let is_person = merchant != DEFAULT_MERCHANT && is_person_name(&merchant);
    debug!(?kind, ?amount, merchant = %merchant, is_person, "extracted snippet");
    Extraction {
        kind,
        amount,
        merchant,
        is_person,
    }
}

pub fn merchant_key(merchant: &str) -> String {
    merchant.trim().to_lowercase()
}

pub fn cached_category(conn: &Connection, merchant: &str) -> Result<Option<String>> {
    let v = conn
        .query_row(
            "SELECT category FROM merchant_categories WHERE merchant=?1",
            params![merchant_key(merchant)],
            |r| r.get(0),
        )
        .optional()?;
    Ok(v)
}

pub fn cache_category(
    conn: &Connection,
    merchant: &str,
    category: &str,
    source: &str,
) -> Result<()> {
    conn.execute(
        "INSERT INTO merchant_categories(merchant, category, source) VALUES (?1, ?2, ?3)
         ON CONFLICT(merchant) DO UPDATE SET category=excluded.category,
             source=excluded.source, updated_at=datetime('now')",
        params![merchant_key(merchant), category.trim(), source],
    )?;
    Ok(())
}

/// Category for each merchant key, consulting the cache before the classifier.
///
/// Misses go to the classifier in one batch; merchants its answer leaves out, or
/// answers with a category off the known list, are re-sent once. Anything still
/// unresolved maps to `Others` without being cached. Answers are cached as they
/// arrive, so a classifier error on the second pass keeps what the first one stored.
pub fn resolve_categories(
    conn: &Connection,
    classifier: Option<&dyn MerchantClassifier>,
    merchants: &[String],
) -> Result<HashMap<String, String>> {
    let mut out: HashMap<String, String> = HashMap::new();
    let mut misses: BTreeSet<String> = BTreeSet::new();

    for m in merchants {
        let key = merchant_key(m);
        if out.contains_key(&key) || misses.contains(&key) {
            continue;
        }
        if key.is_empty() || key == DEFAULT_MERCHANT {
            out.insert(key, DEFAULT_CATEGORY.to_string());
        } else if is_person_name(&key) {
            out.insert(key, PERSON_CATEGORY.to_string());
        } else if let Some(cat) = cached_category(conn, &key)? {
            out.insert(key, cat);
        } else {
            misses.insert(key);
        }
    }

    if let Some(classifier) = classifier {
        for pass in 1..=2 {
            if misses.is_empty() {
                break;
            }
            let batch: Vec<String> = misses.iter().cloned().collect();
            debug!(pass, count = batch.len(), "classifying merchants");
            let answer = classifier.classify(&batch)?;
            for (merchant, category) in answer {
                let key = merchant_key(&merchant);
                let Some(category) = canonical_category(&category) else {
                    debug!(merchant = %key, category = %category, "off-list category");
                    continue;
                };
                if !misses.remove(&key) {
                    continue;
                }
                cache_category(conn, &key, &category, "llm")?;
                out.insert(key, category);
            }
        }
    }

    if !misses.is_empty() {
        warn!(count = misses.len(), "merchants left uncategorized");
    }
    for key in misses {
        out.insert(key, DEFAULT_CATEGORY.to_string());
    }
    Ok(out)
}
