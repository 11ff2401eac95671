// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Result, bail};
use rusqlite::Connection;

use crate::utils::get_setting;

pub const API_KEY_ENV: &str = "LEDGERLENS_LLM_API_KEY";
pub const API_URL_ENV: &str = "LEDGERLENS_LLM_API_URL";
pub const MODEL_ENV: &str = "LEDGERLENS_LLM_MODEL";
pub const LOG_ENV: &str = "LEDGERLENS_LOG";

pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Keys accepted by `config set`. The API key is environment-only.
pub const SETTING_KEYS: &[&str] = &["llm_api_url", "llm_model", "currency"];

pub fn check_setting_key(key: &str) -> Result<()> {
    if !SETTING_KEYS.contains(&key) {
        bail!(
            "Unknown setting '{}' (expected one of: {})",
            key,
            SETTING_KEYS.join(", ")
        );
    }
    Ok(())
}

#[derive(Clone)]
pub struct LlmSettings {
    pub api_url: String,
    pub api_key: String,
    pub model: String,
}

impl std::fmt::Debug for LlmSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmSettings")
            .field("api_url", &self.api_url)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .finish()
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl LlmSettings {
    /// Environment first, then the settings table, then defaults. `None` without an API key.
    pub fn resolve(conn: &Connection) -> Result<Option<Self>> {
        let Some(api_key) = env_value(API_KEY_ENV) else {
            return Ok(None);
        };
        let api_url = match env_value(API_URL_ENV) {
            Some(v) => v,
            None => {
                get_setting(conn, "llm_api_url")?.unwrap_or_else(|| DEFAULT_API_URL.to_string())
            }
        };
        let model = match env_value(MODEL_ENV) {
            Some(v) => v,
            None => get_setting(conn, "llm_model")?.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        };
        Ok(Some(LlmSettings {
            api_url,
            api_key,
            model,
        }))
    }
}
