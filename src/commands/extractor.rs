// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::classifier::{LlmClassifier, MerchantClassifier};
use crate::extract::{DEFAULT_CATEGORY, Extraction, extract, merchant_key, resolve_categories};
use crate::utils::{maybe_print_json, pretty_table, required};
use anyhow::Result;
use rusqlite::Connection;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ExtractOutput {
    #[serde(flatten)]
    pub extraction: Extraction,
    pub category: String,
}

/// Extraction plus category; classifier trouble degrades to `Others`.
pub fn run(
    conn: &Connection,
    classifier: Option<&dyn MerchantClassifier>,
    snippet: &str,
) -> Result<ExtractOutput> {
    let extraction = extract(snippet);
    let key = merchant_key(&extraction.merchant);
    let merchants = [extraction.merchant.clone()];
    let category = match resolve_categories(conn, classifier, &merchants) {
        Ok(mut cats) => cats.remove(&key),
        Err(err) => {
            tracing::warn!(
                error = %err,
                merchant = %extraction.merchant,
                "category lookup degraded"
            );
            None
        }
    };
    Ok(ExtractOutput {
        extraction,
        category: category.unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
    })
}

pub fn handle(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let text = required(sub, "text")?;
    let llm = if sub.get_flag("no-llm") {
        None
    } else {
        LlmClassifier::from_config(conn)?
    };
    let out = run(conn, llm.as_ref().map(|c| c as &dyn MerchantClassifier), text)?;
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &out)? {
        return Ok(());
    }
    let data = vec![
        vec!["Type".to_string(), format!("{:?}", out.extraction.kind).to_lowercase()],
        vec![
            "Amount".to_string(),
            out.extraction
                .amount
                .map(|a| format!("{:.2}", a))
                .unwrap_or_else(|| "-".to_string()),
        ],
        vec!["Merchant".to_string(), out.extraction.merchant.clone()],
        vec![
            "Person".to_string(),
            if out.extraction.is_person { "yes" } else { "no" }.to_string(),
        ],
        vec!["Category".to_string(), out.category.clone()],
    ];
    println!("{}", pretty_table(&["Field", "Value"], data));
    Ok(())
}
