// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::store;
use crate::utils::{maybe_print_json, pretty_table, required};
use anyhow::Result;
use rusqlite::Connection;

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let id = required(sub, "id")?;
            let name = required(sub, "name")?;
            let mask = sub
                .get_one::<String>("account")
                .map(|s| s.trim())
                .filter(|s| !s.is_empty());
            let code = store::add_bank(conn, id, name, mask)?;
            println!("Added bank '{}' ({})", code, name.trim());
        }
        Some(("list", sub)) => {
            let banks = store::list_banks(conn)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &banks)? {
                let data = banks
                    .into_iter()
                    .map(|b| {
                        vec![
                            b.id,
                            b.name,
                            b.account_mask.unwrap_or_default(),
                            b.created_at,
                        ]
                    })
                    .collect();
                println!(
                    "{}",
                    pretty_table(&["Code", "Name", "Account", "Created"], data)
                );
            }
        }
        Some(("rm", sub)) => {
            let id = required(sub, "id")?;
            let removed = store::delete_bank(conn, id)?;
            println!(
                "Removed bank '{}' and {} transactions",
                id.trim().to_lowercase(),
                removed
            );
        }
        _ => {}
    }
    Ok(())
}
