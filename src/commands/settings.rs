// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::config::{SETTING_KEYS, check_setting_key};
use crate::utils::{get_setting, pretty_table, required, set_setting};
use anyhow::Result;
use rusqlite::Connection;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("set", sub)) => {
            let key = required(sub, "key")?.trim();
            let value = required(sub, "value")?.trim();
            check_setting_key(key)?;
            set_setting(conn, key, value)?;
            println!("{} = {}", key, value);
        }
        Some(("get", sub)) => {
            let key = required(sub, "key")?.trim();
            check_setting_key(key)?;
            println!("{}", get_setting(conn, key)?.unwrap_or_default());
        }
        Some(("list", _)) => {
            let mut data = Vec::new();
            for key in SETTING_KEYS {
                let value = get_setting(conn, key)?.unwrap_or_default();
                data.push(vec![key.to_string(), value]);
            }
            println!("{}", pretty_table(&["Key", "Value"], data));
        }
        _ => {}
    }
    Ok(())
}
