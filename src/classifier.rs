// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Merchant → category classification through an OpenAI-compatible chat endpoint.

use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::LlmSettings;
use crate::utils::http_client;

pub const CATEGORIES: &[&str] = &[
    "Food & Dining",
    "Groceries",
    "Shopping",
    "Transport",
    "Fuel",
    "Bills & Utilities",
    "Entertainment",
    "Health",
    "Travel",
    "Education",
    "Rent",
    "Investments",
    "Personal Transfer",
    "Others",
];

pub trait MerchantClassifier {
    /// Maps each merchant to a category. Merchants may be missing from the answer.
    fn classify(&self, merchants: &[String]) -> Result<HashMap<String, String>>;
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Backoff before retrying after failed attempt number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor)
    }

    pub fn run<T, F>(&self, label: &str, mut op: F) -> Result<T>
    where
        F: FnMut(u32) -> Result<T>,
    {
        let max = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op(attempt) {
                Ok(v) => return Ok(v),
                Err(err) if attempt < max => {
                    let wait = self.delay_for(attempt);
                    warn!(label, attempt, ?wait, error = %err, "attempt failed, retrying");
                    std::thread::sleep(wait);
                    attempt += 1;
                }
                Err(err) => {
                    return Err(err.context(format!("{} failed after {} attempts", label, attempt)));
                }
            }
        }
    }
}

/// Spelling of `raw` on the known list, matched case-insensitively.
pub fn canonical_category(raw: &str) -> Option<String> {
    let raw = raw.trim();
    CATEGORIES
        .iter()
        .find(|c| c.eq_ignore_ascii_case(raw))
        .map(|c| c.to_string())
}

/// Pulls the `{ "merchant": "Category" }` object out of a model reply.
/// Entries whose category is not on the known list are dropped.
pub fn parse_classification(content: &str) -> Result<HashMap<String, String>> {
    let start = content
        .find('{')
        .ok_or_else(|| anyhow!("No JSON object in classifier reply"))?;
    let end = content
        .rfind('}')
        .filter(|e| *e > start)
        .ok_or_else(|| anyhow!("Unterminated JSON object in classifier reply"))?;
    let raw: HashMap<String, serde_json::Value> = serde_json::from_str(&content[start..=end])
        .context("Parse classifier JSON")?;
    let mut out = HashMap::new();
    for (merchant, value) in raw {
        match value.as_str().and_then(canonical_category) {
            Some(cat) => {
                out.insert(merchant, cat);
            }
            None => debug!(merchant = %merchant, reply = %value, "ignoring off-list category"),
        }
    }
    Ok(out)
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

#[derive(Debug)]
pub struct LlmClassifier {
    client: reqwest::blocking::Client,
    settings: LlmSettings,
    retry: RetryPolicy,
}

impl LlmClassifier {
    pub fn new(settings: LlmSettings) -> Result<Self> {
        Ok(LlmClassifier {
            client: http_client()?,
            settings,
            retry: RetryPolicy::default(),
        })
    }

    /// `None` when no API key is configured.
    pub fn from_config(conn: &rusqlite::Connection) -> Result<Option<Self>> {
        match LlmSettings::resolve(conn)? {
            Some(settings) => Ok(Some(Self::new(settings)?)),
            None => {
                debug!("no classifier API key configured");
                Ok(None)
            }
        }
    }

    fn prompt(merchants: &[String]) -> Result<String> {
        Ok(format!(
            "Classify each merchant from an Indian bank notification into exactly one of these categories: {}.\n\
             Reply with a single JSON object mapping every merchant name, spelled exactly as given, to its category.\n\
             Merchants: {}",
            CATEGORIES.join(", "),
            serde_json::to_string(merchants)?
        ))
    }

    fn request_once(&self, merchants: &[String]) -> Result<HashMap<String, String>> {
        let body = ChatRequest {
            model: &self.settings.model,
            temperature: 0.0,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: "You label spending categories and answer with JSON only.".to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: Self::prompt(merchants)?,
                },
            ],
        };
        let resp = self
            .client
            .post(&self.settings.api_url)
            .bearer_auth(&self.settings.api_key)
            .json(&body)
            .send()
            .context("classifier request")?;
        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().unwrap_or_default();
            bail!("classifier error: {} {}", status, txt);
        }
        let out: ChatResponse = resp.json().context("parse classifier response")?;
        let content = out
            .choices
            .into_iter()
            .find_map(|c| c.message.content)
            .ok_or_else(|| anyhow!("classifier reply had no content"))?;
        parse_classification(&content)
    }
}

impl MerchantClassifier for LlmClassifier {
    fn classify(&self, merchants: &[String]) -> Result<HashMap<String, String>> {
        if merchants.is_empty() {
            return Ok(HashMap::new());
        }
        let answer = self.retry.run("merchant classification", |attempt| {
            debug!(attempt, count = merchants.len(), "calling classifier");
            self.request_once(merchants)
        })?;
        Ok(answer)
    }
}
