// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use ledgerlens::aggregate::{
    Period, UNCATEGORIZED, aggregate, day_range, months_spanned, percentage, summarize,
};
use ledgerlens::models::{BankSelector, Transaction, TxKind};
use rust_decimal::Decimal;

fn day(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn tx(
    id: i64,
    bank: &str,
    date: &str,
    amount: i64,
    kind: TxKind,
    category: Option<&str>,
) -> Transaction {
    Transaction {
        id,
        bank: bank.to_string(),
        reference_id: format!("R{}", id),
        timestamp: day(date).and_hms_opt(12, 0, 0).unwrap(),
        amount: Decimal::new(amount, 0),
        kind,
        category: category.map(str::to_string),
        merchant: None,
        tags: Vec::new(),
        closing_balance: None,
    }
}

fn dec(n: i64) -> Decimal {
    Decimal::new(n, 0)
}

#[test]
fn food_scenario_for_current_month() {
    let txs = vec![
        tx(1, "hdfc", "2025-03-02", 100, TxKind::Debit, Some("food")),
        tx(2, "hdfc", "2025-03-05", 200, TxKind::Debit, Some("food")),
        tx(3, "hdfc", "2025-03-09", 300, TxKind::Debit, Some("food")),
        tx(4, "hdfc", "2025-03-10", 1000, TxKind::Credit, Some("salary")),
    ];
    let view = summarize(&txs, &BankSelector::All, Period::CurrentMonth, day("2025-03-20")).unwrap();

    assert_eq!(view.totals.income, dec(1000));
    assert_eq!(view.totals.expenses, dec(600));
    assert_eq!(view.totals.savings, dec(400));
    assert_eq!(view.categories.len(), 1);
    assert_eq!(view.categories[0].category, "food");
    assert_eq!(view.categories[0].amount, dec(600));
    assert_eq!(view.categories[0].percentage, 100);
    assert_eq!(view.monthly.len(), 1);
    assert_eq!(view.monthly[0].savings, dec(400));
}

#[test]
fn balance_snapshots_never_count_as_income_or_expense() {
    let txs = vec![
        tx(1, "hdfc", "2025-03-02", 100, TxKind::Debit, Some("food")),
        tx(2, "hdfc", "2025-03-03", 5000, TxKind::Balance, None),
        tx(3, "hdfc", "2025-03-04", 250, TxKind::Credit, None),
    ];
    for selector in [BankSelector::All, BankSelector::Only(vec!["hdfc".into()])] {
        let view = summarize(&txs, &selector, Period::CurrentMonth, day("2025-03-20")).unwrap();
        assert_eq!(view.totals.income, dec(250));
        assert_eq!(view.totals.expenses, dec(100));
        assert_eq!(view.totals.balance, dec(5000));
        assert_eq!(view.monthly[0].income, dec(250));
        assert_eq!(view.monthly[0].expenses, dec(100));
    }
}

#[test]
fn balance_is_latest_snapshot_regardless_of_period() {
    let txs = vec![
        tx(1, "hdfc", "2025-01-31", 4000, TxKind::Balance, None),
        tx(2, "hdfc", "2025-02-28", 4500, TxKind::Balance, None),
        tx(3, "sbi", "2025-01-15", 1000, TxKind::Balance, None),
    ];
    let view = summarize(&txs, &BankSelector::All, Period::CurrentMonth, day("2025-03-20")).unwrap();
    assert_eq!(view.totals.balance, dec(5500));
    assert_eq!(view.banks.len(), 2);
    assert_eq!(view.banks[0].bank, "hdfc");
    assert_eq!(view.banks[0].balance, dec(4500));

    let only = summarize(
        &txs,
        &BankSelector::Only(vec!["hdfc".into()]),
        Period::CurrentMonth,
        day("2025-03-20"),
    )
    .unwrap();
    assert_eq!(only.totals.balance, dec(4500));
    assert_eq!(only.banks.len(), 1);
}

#[test]
fn closing_balance_stands_in_when_bank_has_no_snapshot() {
    let mut older = tx(1, "hdfc", "2025-03-01", 100, TxKind::Debit, None);
    older.closing_balance = Some(dec(900));
    let mut newer = tx(2, "hdfc", "2025-03-04", 50, TxKind::Credit, None);
    newer.closing_balance = Some(dec(950));
    let view = summarize(&[older, newer], &BankSelector::All, Period::PreviousMonth, day("2025-04-02")).unwrap();
    assert_eq!(view.totals.balance, dec(950));
    assert_eq!(view.banks[0].balance_as_of, Some(day("2025-03-04").and_hms_opt(12, 0, 0).unwrap()));
}

#[test]
fn selected_bank_without_data_appears_with_zeroes() {
    let txs = vec![tx(1, "hdfc", "2025-03-02", 100, TxKind::Debit, None)];
    let view = summarize(
        &txs,
        &BankSelector::Only(vec!["sbi".into()]),
        Period::CurrentMonth,
        day("2025-03-20"),
    )
    .unwrap();
    assert_eq!(view.banks.len(), 1);
    assert_eq!(view.banks[0].bank, "sbi");
    assert_eq!(view.totals, Default::default());
}

#[test]
fn empty_input_gives_zero_totals_and_zero_filled_months() {
    let view = summarize(&[], &BankSelector::All, Period::PreviousMonths(3), day("2025-03-20")).unwrap();
    assert_eq!(view.totals.income, Decimal::ZERO);
    assert_eq!(view.totals.expenses, Decimal::ZERO);
    assert_eq!(view.totals.savings, Decimal::ZERO);
    assert_eq!(view.totals.balance, Decimal::ZERO);
    assert!(view.categories.is_empty());
    let labels: Vec<&str> = view.monthly.iter().map(|b| b.label.as_str()).collect();
    assert_eq!(labels, vec!["2024-12", "2025-01", "2025-02"]);
    assert!(view.monthly.iter().all(|b| b.income.is_zero() && b.expenses.is_zero()));
}

#[test]
fn monthly_series_covers_every_month_and_buckets_by_calendar_month() {
    let txs = vec![
        tx(1, "hdfc", "2024-11-15", 700, TxKind::Debit, None),
        tx(2, "hdfc", "2024-11-30", 2000, TxKind::Credit, None),
        tx(3, "hdfc", "2025-02-28", 300, TxKind::Debit, None),
        // outside the window
        tx(4, "hdfc", "2025-03-01", 999, TxKind::Debit, None),
    ];
    let today = day("2025-03-20");
    let range = Period::PreviousMonths(6).resolve(today).unwrap();
    let view = aggregate(&txs, &BankSelector::All, &range);

    assert_eq!(view.monthly.len(), months_spanned(&range));
    assert_eq!(view.monthly.len(), 6);
    assert_eq!(view.monthly[0].label, "2024-09");
    assert_eq!(view.monthly[5].label, "2025-02");

    let nov = &view.monthly[2];
    assert_eq!((nov.year, nov.month), (2024, 11));
    assert_eq!(nov.income, dec(2000));
    assert_eq!(nov.expenses, dec(700));
    assert_eq!(nov.savings, dec(1300));
    assert_eq!(view.monthly[5].expenses, dec(300));
    assert_eq!(view.totals.expenses, dec(1000));
}

#[test]
fn savings_equals_income_minus_expenses_everywhere() {
    let txs = vec![
        tx(1, "hdfc", "2025-01-03", 1200, TxKind::Credit, None),
        tx(2, "hdfc", "2025-01-09", 450, TxKind::Debit, Some("rent")),
        tx(3, "sbi", "2025-02-11", 75, TxKind::Debit, Some("fuel")),
        tx(4, "sbi", "2025-02-12", 5000, TxKind::Credit, None),
        tx(5, "sbi", "2025-02-13", 6000, TxKind::Debit, Some("travel")),
    ];
    let range = day_range(day("2025-01-01"), day("2025-02-28"));
    let view = aggregate(&txs, &BankSelector::All, &range);

    assert_eq!(view.totals.savings, view.totals.income - view.totals.expenses);
    for b in &view.banks {
        assert_eq!(b.savings, b.income - b.expenses);
    }
    for m in &view.monthly {
        assert_eq!(m.savings, m.income - m.expenses);
    }
    let monthly_income: Decimal = view.monthly.iter().map(|m| m.income).sum();
    assert_eq!(monthly_income, view.totals.income);
}

#[test]
fn category_percentages_add_up_to_about_one_hundred() {
    let txs = vec![
        tx(1, "hdfc", "2025-03-02", 100, TxKind::Debit, Some("a")),
        tx(2, "hdfc", "2025-03-03", 100, TxKind::Debit, Some("b")),
        tx(3, "hdfc", "2025-03-04", 100, TxKind::Debit, Some("c")),
    ];
    let view = summarize(&txs, &BankSelector::All, Period::CurrentMonth, day("2025-03-20")).unwrap();
    let total: i64 = view.categories.iter().map(|c| i64::from(c.percentage)).sum();
    assert!((total - 100).abs() <= view.categories.len() as i64);
    assert!(view.categories.iter().all(|c| c.percentage == 33));
}

#[test]
fn zero_expenses_yield_zero_percentages() {
    let txs = vec![tx(1, "hdfc", "2025-03-02", 0, TxKind::Debit, Some("free"))];
    let view = summarize(&txs, &BankSelector::All, Period::CurrentMonth, day("2025-03-20")).unwrap();
    assert_eq!(view.categories.len(), 1);
    assert_eq!(view.categories[0].percentage, 0);
    assert_eq!(percentage(dec(10), Decimal::ZERO), 0);
}

#[test]
fn percentage_rounds_half_away_from_zero() {
    assert_eq!(percentage(dec(1), dec(8)), 13);
    assert_eq!(percentage(dec(1), dec(3)), 33);
    assert_eq!(percentage(dec(2), dec(3)), 67);
}

#[test]
fn missing_category_groups_as_uncategorized_with_merchants_and_tags() {
    let mut a = tx(1, "hdfc", "2025-03-02", 40, TxKind::Debit, None);
    a.merchant = Some("Swiggy".into());
    a.tags = vec!["dinner".into()];
    let mut b = tx(2, "hdfc", "2025-03-03", 60, TxKind::Debit, Some("  "));
    b.merchant = Some("Swiggy".into());
    let mut c = tx(3, "hdfc", "2025-03-04", 300, TxKind::Debit, Some("Rent"));
    c.tags = vec!["landlord".into()];
    let view = summarize(&[a, b, c], &BankSelector::All, Period::CurrentMonth, day("2025-03-20")).unwrap();

    assert_eq!(view.categories[0].category, "Rent");
    assert_eq!(view.categories[0].percentage, 75);
    let unc = &view.categories[1];
    assert_eq!(unc.category, UNCATEGORIZED);
    assert_eq!(unc.amount, dec(100));
    assert_eq!(unc.percentage, 25);
    assert_eq!(unc.tags, vec!["Swiggy".to_string(), "dinner".to_string()]);
}

#[test]
fn periods_resolve_to_calendar_month_boundaries() {
    let feb = Period::CurrentMonth.resolve(day("2024-02-10")).unwrap();
    assert_eq!(feb.start, day("2024-02-01").and_hms_opt(0, 0, 0).unwrap());
    assert_eq!(feb.end, day("2024-02-29").and_hms_opt(23, 59, 59).unwrap());

    let prev = Period::PreviousMonth.resolve(day("2025-01-15")).unwrap();
    assert_eq!(prev.start.date(), day("2024-12-01"));
    assert_eq!(prev.end.date(), day("2024-12-31"));

    let before = Period::MonthBeforePrevious.resolve(day("2025-01-15")).unwrap();
    assert_eq!(before.start.date(), day("2024-11-01"));
    assert_eq!(before.end.date(), day("2024-11-30"));

    let q = Period::PreviousMonths(3).resolve(day("2025-01-15")).unwrap();
    assert_eq!(q.start.date(), day("2024-10-01"));
    assert_eq!(q.end.date(), day("2024-12-31"));
    assert_eq!(months_spanned(&q), 3);
}

#[test]
fn period_parsing_accepts_known_forms() {
    assert_eq!("current-month".parse::<Period>().unwrap(), Period::CurrentMonth);
    assert_eq!("Previous-Month".parse::<Period>().unwrap(), Period::PreviousMonth);
    assert_eq!(
        "month-before-previous".parse::<Period>().unwrap(),
        Period::MonthBeforePrevious
    );
    assert_eq!("previous-6-months".parse::<Period>().unwrap(), Period::PreviousMonths(6));
    assert_eq!(
        "2025-01-10..2025-03-05".parse::<Period>().unwrap(),
        Period::Custom {
            start: day("2025-01-10"),
            end: day("2025-03-05")
        }
    );
    assert!("previous-0-months".parse::<Period>().is_err());
    assert!("2025-03-05..2025-01-10".parse::<Period>().is_err());
    assert!("fortnight".parse::<Period>().is_err());
}

#[test]
fn custom_period_spans_partial_months() {
    let range = "2025-01-10..2025-03-05"
        .parse::<Period>()
        .unwrap()
        .resolve(day("2030-01-01"))
        .unwrap();
    assert_eq!(months_spanned(&range), 3);
    let txs = vec![
        tx(1, "hdfc", "2025-01-09", 10, TxKind::Debit, None),
        tx(2, "hdfc", "2025-01-10", 20, TxKind::Debit, None),
        tx(3, "hdfc", "2025-03-05", 30, TxKind::Debit, None),
    ];
    let view = aggregate(&txs, &BankSelector::All, &range);
    assert_eq!(view.totals.expenses, dec(50));
    assert_eq!(view.monthly.len(), 3);
}
