// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Result, bail};
use ledgerlens::classifier::{
    MerchantClassifier, RetryPolicy, canonical_category, parse_classification,
};
use ledgerlens::commands::extractor;
use ledgerlens::db;
use ledgerlens::extract::{
    SnippetKind, cache_category, cached_category, extract, extract_amount, extract_merchant,
    infer_kind, is_person_name, resolve_categories,
};
use rust_decimal::Decimal;
use std::cell::RefCell;
use std::collections::HashMap;
use std::time::Duration;

/// Answers from a fixed table, dropping anything in `withhold_first` on the first call.
struct FakeClassifier {
    answers: HashMap<String, String>,
    withhold_first: Vec<String>,
    calls: RefCell<Vec<Vec<String>>>,
}

impl FakeClassifier {
    fn new(pairs: &[(&str, &str)]) -> Self {
        FakeClassifier {
            answers: pairs.iter().map(|(m, c)| (m.to_string(), c.to_string())).collect(),
            withhold_first: Vec::new(),
            calls: RefCell::new(Vec::new()),
        }
    }
}

impl MerchantClassifier for FakeClassifier {
    fn classify(&self, merchants: &[String]) -> Result<HashMap<String, String>> {
        let first = self.calls.borrow().is_empty();
        self.calls.borrow_mut().push(merchants.to_vec());
        Ok(merchants
            .iter()
            .filter(|m| !(first && self.withhold_first.contains(m)))
            .filter_map(|m| self.answers.get(m).map(|c| (m.clone(), c.clone())))
            .collect())
    }
}

struct Broken;

impl MerchantClassifier for Broken {
    fn classify(&self, _merchants: &[String]) -> Result<HashMap<String, String>> {
        bail!("service unavailable")
    }
}

/// Answers the first call, then fails.
struct FlakyAfterFirst(FakeClassifier);

impl MerchantClassifier for FlakyAfterFirst {
    fn classify(&self, merchants: &[String]) -> Result<HashMap<String, String>> {
        if !self.0.calls.borrow().is_empty() {
            bail!("service unavailable");
        }
        self.0.classify(merchants)
    }
}

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

#[test]
fn kind_follows_keywords_in_order() {
    assert_eq!(infer_kind("Rs 500 debited from a/c **1234"), SnippetKind::Debit);
    assert_eq!(infer_kind("INR 500 CREDITED to your account"), SnippetKind::Credit);
    assert_eq!(infer_kind("Available Balance in a/c is Rs 100"), SnippetKind::Balance);
    // debited wins even when a balance is quoted too
    assert_eq!(
        infer_kind("Rs 20 debited. Available balance Rs 980"),
        SnippetKind::Debit
    );
    assert_eq!(infer_kind("Your OTP is 123456"), SnippetKind::Unknown);
}

#[test]
fn amount_cascade() {
    assert_eq!(
        extract_amount("Rs.1,250.50 debited from A/c XX1234 on 05-03-25"),
        Some(dec("1250.50"))
    );
    assert_eq!(extract_amount("INR 3,499.00 spent on card 4321"), Some(dec("3499.00")));
    assert_eq!(extract_amount("₹75 paid"), Some(dec("75")));
    assert_eq!(
        extract_amount("Available balance: 12,345.67 as of today"),
        Some(dec("12345.67"))
    );
    assert_eq!(
        extract_amount("Available balance in a/c XX1234 is 5,000.00 as of today"),
        Some(dec("5000.00"))
    );
    assert_eq!(
        extract_amount("Available balance for a/c ending 9876: 742.10"),
        Some(dec("742.10"))
    );
    assert_eq!(extract_amount("Your payment was 450 today"), Some(dec("450")));
    assert_eq!(extract_amount("Payment of 99.50 received"), Some(dec("99.50")));
    assert_eq!(extract_amount("ref 77 id 20250301"), Some(dec("20250301")));
    assert_eq!(extract_amount("no digits here"), None);
}

#[test]
fn merchant_patterns() {
    assert_eq!(
        extract_merchant("Rs 500 debited from a/c **1234 to VPA john.doe@okhdfc JOHN DOE on 05-03-25"),
        "JOHN DOE"
    );
    assert_eq!(
        extract_merchant("Rs 250 debited to VPA swiggy@icici ref 991"),
        "swiggy"
    );
    assert_eq!(
        extract_merchant("INR 1,299.00 spent on card 4321 at AMAZON RETAIL on 2025-03-05."),
        "AMAZON RETAIL"
    );
    assert_eq!(extract_merchant("Rs 100 debited from your account"), "others");
}

#[test]
fn person_name_heuristic() {
    assert!(is_person_name("JOHN DOE"));
    assert!(is_person_name("Priya Ramesh Kumar"));
    assert!(!is_person_name("swiggy"));
    assert!(!is_person_name("AMAZON RETAIL"));
    assert!(!is_person_name("Blue Tokai Cafe"));
    assert!(!is_person_name("R2 D2"));
    assert!(!is_person_name("one two three four five"));
}

#[test]
fn extraction_flags_people() {
    let ex = extract("Rs 500 debited to VPA john.doe@okhdfc JOHN DOE on 05-03-25");
    assert_eq!(ex.kind, SnippetKind::Debit);
    assert_eq!(ex.amount, Some(dec("500")));
    assert!(ex.is_person);

    let ex = extract("Hello there");
    assert_eq!(ex.kind, SnippetKind::Unknown);
    assert_eq!(ex.amount, None);
    assert_eq!(ex.merchant, "others");
    assert!(!ex.is_person);
}

#[test]
fn cache_hits_skip_the_classifier() {
    let conn = db::open_in_memory().unwrap();
    cache_category(&conn, "Swiggy", "Food & Dining", "manual").unwrap();
    let fake = FakeClassifier::new(&[]);

    let cats = resolve_categories(
        &conn,
        Some(&fake),
        &["SWIGGY".to_string(), "others".to_string(), "JOHN DOE".to_string()],
    )
    .unwrap();
    assert_eq!(cats["swiggy"], "Food & Dining");
    assert_eq!(cats["others"], "Others");
    assert_eq!(cats["john doe"], "Personal Transfer");
    assert!(fake.calls.borrow().is_empty());
}

#[test]
fn misses_are_classified_cached_and_retried_once() {
    let conn = db::open_in_memory().unwrap();
    let mut fake = FakeClassifier::new(&[("zomato", "Food & Dining"), ("uber", "Transport")]);
    fake.withhold_first = vec!["uber".to_string()];

    let merchants = vec!["Zomato".to_string(), "uber".to_string(), "mystery".to_string()];
    let cats = resolve_categories(&conn, Some(&fake), &merchants).unwrap();

    assert_eq!(cats["zomato"], "Food & Dining");
    assert_eq!(cats["uber"], "Transport");
    assert_eq!(cats["mystery"], "Others");

    let calls = fake.calls.borrow();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0], vec!["mystery", "uber", "zomato"]);
    assert_eq!(calls[1], vec!["mystery", "uber"]);

    assert_eq!(cached_category(&conn, "zomato").unwrap().as_deref(), Some("Food & Dining"));
    assert_eq!(cached_category(&conn, "uber").unwrap().as_deref(), Some("Transport"));
    assert_eq!(cached_category(&conn, "mystery").unwrap(), None);
}

#[test]
fn off_list_answers_are_retried_and_left_uncached() {
    let conn = db::open_in_memory().unwrap();
    let fake = FakeClassifier::new(&[("zomato", "Food and Dining"), ("ola", "transport")]);

    let cats = resolve_categories(&conn, Some(&fake), &["zomato".to_string(), "ola".to_string()])
        .unwrap();
    assert_eq!(cats["zomato"], "Others");
    assert_eq!(cats["ola"], "Transport");

    let calls = fake.calls.borrow();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1], vec!["zomato"]);
    assert_eq!(cached_category(&conn, "zomato").unwrap(), None);
    assert_eq!(cached_category(&conn, "ola").unwrap().as_deref(), Some("Transport"));
}

#[test]
fn second_pass_error_keeps_first_pass_answers() {
    let conn = db::open_in_memory().unwrap();
    let fake = FlakyAfterFirst(FakeClassifier::new(&[("uber", "Transport")]));

    let err = resolve_categories(&conn, Some(&fake), &["uber".to_string(), "mystery".to_string()]);
    assert!(err.is_err());
    assert_eq!(cached_category(&conn, "uber").unwrap().as_deref(), Some("Transport"));
    assert_eq!(cached_category(&conn, "mystery").unwrap(), None);
}

#[test]
fn without_classifier_misses_default_to_others() {
    let conn = db::open_in_memory().unwrap();
    let cats = resolve_categories(&conn, None, &["netflix".to_string()]).unwrap();
    assert_eq!(cats["netflix"], "Others");
    assert_eq!(cached_category(&conn, "netflix").unwrap(), None);
}

#[test]
fn classifier_errors_propagate() {
    let conn = db::open_in_memory().unwrap();
    let err = resolve_categories(&conn, Some(&Broken), &["netflix".to_string()]).unwrap_err();
    assert!(err.to_string().contains("service unavailable"));
}

#[test]
fn extract_command_degrades_to_others() {
    let conn = db::open_in_memory().unwrap();
    let out = extractor::run(
        &conn,
        Some(&Broken),
        "INR 1,299.00 debited at AMAZON RETAIL on 2025-03-05.",
    )
    .unwrap();
    assert_eq!(out.extraction.merchant, "AMAZON RETAIL");
    assert_eq!(out.category, "Others");

    let json = serde_json::to_value(&out).unwrap();
    assert_eq!(json["kind"], "debit");
    assert_eq!(json["category"], "Others");
}

#[test]
fn classification_reply_parsing() {
    let reply = "```json\n{\"zomato\": \"food & dining\", \"acme\": \"Widgets\", \"n\": 3}\n```";
    let parsed = parse_classification(reply).unwrap();
    assert_eq!(parsed["zomato"], "Food & Dining");
    assert!(!parsed.contains_key("acme"));
    assert!(!parsed.contains_key("n"));

    assert!(parse_classification("I cannot help with that").is_err());
    assert_eq!(canonical_category("  rent ").as_deref(), Some("Rent"));
    assert_eq!(canonical_category("Food and Dining"), None);
}

#[test]
fn retry_policy_backs_off_and_gives_up() {
    let policy = RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::from_millis(100),
    };
    assert_eq!(policy.delay_for(1), Duration::from_millis(100));
    assert_eq!(policy.delay_for(2), Duration::from_millis(200));
    assert_eq!(policy.delay_for(3), Duration::from_millis(400));

    let fast = RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::ZERO,
    };
    let mut seen = Vec::new();
    let ok = fast
        .run("flaky", |attempt| {
            seen.push(attempt);
            if attempt < 2 { bail!("boom") } else { Ok(attempt) }
        })
        .unwrap();
    assert_eq!(ok, 2);
    assert_eq!(seen, vec![1, 2]);

    let err = fast
        .run("always", |_| -> Result<()> { bail!("down") })
        .unwrap_err();
    assert!(format!("{:#}", err).contains("always failed after 3 attempts"));
}
