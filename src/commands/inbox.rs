// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::classifier::{LlmClassifier, MerchantClassifier};
use crate::inbox::{self, DEFAULT_MAX_ATTEMPTS};
use crate::models::InboxStatus;
use crate::utils::{fmt_ts, maybe_print_json, parse_date, pretty_table, required};
use anyhow::Result;
use chrono::{NaiveTime, Utc};
use rusqlite::Connection;

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let bank = required(sub, "bank")?;
            let text = required(sub, "text")?;
            let received = match sub.get_one::<String>("received") {
                Some(d) => parse_date(d)?.and_time(NaiveTime::MIN),
                None => Utc::now().naive_utc(),
            };
            let id = inbox::enqueue(conn, bank, text, received)?;
            println!("Queued snippet #{} for bank '{}'", id, bank.trim().to_lowercase());
        }
        Some(("list", sub)) => {
            let status = match sub.get_one::<String>("status") {
                Some(s) => Some(s.trim().parse::<InboxStatus>()?),
                None => None,
            };
            let items = inbox::list(conn, status)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &items)? {
                let data = items
                    .into_iter()
                    .map(|i| {
                        vec![
                            i.id.to_string(),
                            i.bank,
                            fmt_ts(&i.received_at),
                            i.status.as_str().to_string(),
                            i.attempts.to_string(),
                            i.reference_id.unwrap_or_default(),
                            i.last_error.unwrap_or_default(),
                        ]
                    })
                    .collect();
                println!(
                    "{}",
                    pretty_table(
                        &["ID", "Bank", "Received", "Status", "Attempts", "Ref", "Last error"],
                        data
                    )
                );
            }
        }
        Some(("process", sub)) => {
            let max_attempts = sub
                .get_one::<u32>("max-attempts")
                .copied()
                .unwrap_or(DEFAULT_MAX_ATTEMPTS);
            let llm = if sub.get_flag("no-llm") {
                None
            } else {
                LlmClassifier::from_config(conn)?
            };
            let report = inbox::process(
                conn,
                llm.as_ref().map(|c| c as &dyn MerchantClassifier),
                max_attempts,
            )?;
            println!(
                "Inbox: {} processed, {} skipped, {} to retry, {} failed",
                report.processed, report.skipped, report.retried, report.failed
            );
        }
        _ => {}
    }
    Ok(())
}
