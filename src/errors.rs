// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use rust_decimal::Decimal;
use thiserror::Error;

/// Rejections raised while validating an upload. Nothing is written when one occurs.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("File name '{0}' does not match <bank>Transaction.json")]
    FilenamePattern(String),

    #[error("Malformed JSON: {0}")]
    MalformedJson(#[source] serde_json::Error),

    #[error("Upload must be a JSON array of transaction objects")]
    NotAnArray,

    #[error("Record {index}: {message}")]
    Schema { index: usize, message: String },

    #[error("Record {index}: invalid date '{value}', expected YYYY-MM-DD")]
    InvalidDate { index: usize, value: String },

    #[error("Record {index}: amount must be a non-negative number, got {value}")]
    InvalidAmount { index: usize, value: Decimal },
}
