//! Integration tests for ashare-rules

use approx::assert_relative_eq;
use ashare_rules::prelude::*;
use ashare_rules::finance::SettlementOperation;
use chrono::{NaiveDate, Utc};
use std::sync::Arc;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn engine_at(cash: Cash, start: NaiveDate) -> (RulesEngine, Arc<CalendarClock<ChinaCalendar>>) {
    let _ = env_logger::builder().is_test(true).try_init();
    let clock = Arc::new(CalendarClock::new(ChinaCalendar::new(), start));
    let account = Arc::new(AShareAccount::new(cash, "CNY"));
    let engine = RulesEngine::new(RulesConfig::default(), account, clock.clone()).unwrap();
    (engine, clock)
}

#[test]
fn test_round_trip_over_t_plus_one() {
    let d1 = date(2024, 1, 2);
    let d2 = date(2024, 1, 3);
    let d3 = date(2024, 1, 4);
    let (mut engine, clock) = engine_at(1_000_000.0, d1);
    let security = Security::from_ticker("600000");

    // Day one: buy 1000, cannot sell any of it
    let buy = Order::market("600000", OrderSide::Buy, 1000.0, Utc::now());
    assert!(engine.admit(&buy, &security, 10.0).unwrap().accepted);
    engine
        .on_fill(&security, &Fill::new("600000", OrderSide::Buy, 1000.0, 10.0, d1))
        .unwrap();

    let sell_all = Order::market("600000", OrderSide::Sell, 1000.0, Utc::now());
    let rejected = engine.admit(&sell_all, &security, 10.0).unwrap();
    assert!(!rejected.accepted);
    assert!(matches!(
        rejected.violation,
        Some(RuleViolation::InsufficientSellable { sellable, .. }) if sellable == 0.0
    ));

    // Day two: the lot has matured
    clock.advance().unwrap();
    assert_eq!(clock.current_trading_date(), d2);
    engine.begin_session().unwrap();
    assert_eq!(engine.sellable_quantity("600000"), 1000.0);

    let sell_half = Order::market("600000", OrderSide::Sell, 500.0, Utc::now());
    assert!(engine.admit(&sell_half, &security, 10.0).unwrap().accepted);
    let cash_before = engine.account().available_cash();
    let outcome = engine
        .on_fill(&security, &Fill::new("600000", OrderSide::Sell, 500.0, 10.0, d2))
        .unwrap();
    assert_eq!(engine.sellable_quantity("600000"), 500.0);
    assert_eq!(engine.account().available_cash(), cash_before);
    assert_relative_eq!(engine.unsettled_cash_total(), outcome.cash_flow, epsilon = 1e-9);

    // Day three: proceeds are credited
    clock.advance().unwrap();
    assert_eq!(clock.current_trading_date(), d3);
    let applied = engine.begin_session().unwrap();
    assert_relative_eq!(applied, outcome.cash_flow, epsilon = 1e-9);
    assert_relative_eq!(
        engine.account().available_cash(),
        cash_before + outcome.cash_flow,
        epsilon = 1e-9
    );
    assert_eq!(engine.unsettled_cash_total(), 0.0);

    let operations: Vec<_> = engine
        .ledger()
        .history()
        .into_iter()
        .map(|r| r.operation)
        .collect();
    assert_eq!(
        operations,
        vec![
            SettlementOperation::Buy,
            SettlementOperation::Deduct,
            SettlementOperation::Sell,
            SettlementOperation::CashSettled,
        ]
    );
}

#[test]
fn test_holiday_gap_settles_on_reopen() {
    // Last session before the 2024 Spring Festival closure
    let (mut engine, clock) = engine_at(0.0, date(2024, 2, 8));
    engine.on_sell_filled("000001", 2_000.0, date(2024, 2, 8)).unwrap();

    clock.advance().unwrap();
    assert_eq!(clock.current_trading_date(), date(2024, 2, 19));
    assert_eq!(engine.begin_session().unwrap(), 2_000.0);
    assert_eq!(engine.account().available_cash(), 2_000.0);
}

#[test]
fn test_price_limits_by_board() {
    let (engine, _clock) = engine_at(10_000_000.0, date(2024, 1, 2));
    let cases = [
        ("600000", 10.9, true),
        ("600000", 11.1, false),
        ("300750", 11.9, true),
        ("300750", 12.1, false),
        ("688981", 8.1, true),
    ];
    for (ticker, price, expected) in cases {
        let security = Security::from_ticker(ticker);
        let order = Order::limit(ticker, OrderSide::Buy, 100.0, price, Utc::now());
        let result = engine.admit(&order, &security, 10.0).unwrap();
        assert_eq!(result.accepted, expected, "{} at {}", ticker, price);
    }

    let st = Security::new("ST600001", Venue::Shanghai).with_name("ST Example");
    assert_eq!(st.classification(), ShareClassification::SpecialTreatment);
    let order = Order::limit("ST600001", OrderSide::Buy, 100.0, 10.6, Utc::now());
    let result = engine.admit(&order, &st, 10.0).unwrap();
    assert!(!result.accepted);
    assert!(result.reason.unwrap().contains("outside daily limit"));
}

#[test]
fn test_engine_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rules.toml");
    std::fs::write(
        &path,
        "lot_size = 100\nholidays = [\"2024-01-03\"]\n\n[fees]\nmin_commission = 1.0\n",
    )
    .unwrap();

    let config = RulesConfig::from_file(&path).unwrap();
    let clock = Arc::new(CalendarClock::new(config.calendar(), date(2024, 1, 2)));
    let account = Arc::new(AShareAccount::new(100_000.0, "CNY"));
    let engine = RulesEngine::new(config, account, clock.clone()).unwrap();

    assert_eq!(clock.advance().unwrap(), date(2024, 1, 4));
    let fee = engine
        .policy()
        .fee_model()
        .compute_fee(1_000.0, false, false)
        .unwrap();
    assert_relative_eq!(fee.commission, 1.0);
}

#[test]
fn test_ledger_persistence_round_trip() {
    let ledger = SettlementLedger::new();
    ledger.record_buy("600000", 300.0, date(2024, 1, 2)).unwrap();
    ledger.record_buy("600000", 200.0, date(2024, 1, 3)).unwrap();
    ledger.record_sell("000001", 5_000.0, date(2024, 1, 3)).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.json");
    ledger.save_json(&path).unwrap();

    let restored = Arc::new(SettlementLedger::load_json(&path, "CNY").unwrap());
    assert_eq!(restored.dump(), ledger.dump());
    assert_eq!(restored.sellable_quantity("600000", date(2024, 1, 3)), 300.0);
    assert_eq!(restored.unsettled_cash_on(date(2024, 1, 4)), 5_000.0);

    let account = AShareAccount::with_ledger(0.0, restored);
    assert_eq!(account.sellable_quantity("600000", date(2024, 1, 4)), 500.0);
}

#[test]
fn test_history_csv_export() {
    let ledger = SettlementLedger::new();
    ledger.record_buy("600000", 100.0, date(2024, 1, 2)).unwrap();
    ledger.record_sell("600000", 1_000.0, date(2024, 1, 3)).unwrap();

    let mut buffer = Vec::new();
    ledger.write_history_csv(&mut buffer).unwrap();
    let text = String::from_utf8(buffer).unwrap();
    let lines: Vec<_> = text.lines().collect();

    assert_eq!(lines.len(), 3);
    assert!(lines[0].contains("operation"));
    assert!(lines[1].contains("Buy"));
    assert!(lines[2].contains("Sell"));
}

#[test]
fn test_cash_account_has_no_t_plus_one() {
    let account = CashAccount::new(100_000.0, "CNY");
    account.adjust_position("600000", 1000.0);

    let policy = OrderAdmissionPolicy::default();
    let security = Security::from_ticker("600000");
    let ctx = AdmissionContext::for_account(&account, date(2024, 1, 2), 10.0);
    let sell = Order::market("600000", OrderSide::Sell, 1000.0, Utc::now());
    assert!(policy.admit(&sell, &security, &ctx).unwrap().accepted);
}
