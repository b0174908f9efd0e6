mod common;

use approx::assert_relative_eq;
use common::{date, generate_series, make_series, sample_config, Order, ScriptedPolicy};
use ledgersim::domain::backtest::run_backtest;
use ledgersim::domain::cost_model::{CostModel, FinancingBasis};
use ledgersim::domain::engine::{RunState, SimulationEngine};
use ledgersim::domain::error::LedgersimError;
use ledgersim::domain::ledger::OrderRejected;
use ledgersim::domain::price_series::PriceSeries;

fn two_day_x() -> PriceSeries {
    make_series(
        &["X"],
        vec![(date(2024, 1, 2), vec![100.0]), (date(2024, 1, 3), vec![110.0])],
    )
}

#[test]
fn buy_then_mark_to_market() {
    let mut policy = ScriptedPolicy::new().on(date(2024, 1, 2), vec![Order::Buy("X", 50.0)]);
    let mut engine = SimulationEngine::new(two_day_x(), 10_000.0, CostModel::new(10.0, 0.0).unwrap());

    let results = engine.run(&mut policy).unwrap().clone();

    assert_eq!(results.len(), 2);
    let day1 = &results.records()[0];
    assert_relative_eq!(day1.cash(), 4995.0, epsilon = 1e-9);
    assert_relative_eq!(day1.portfolio_value, 5000.0, epsilon = 1e-9);
    assert!(day1.rebalanced);

    let day2 = &results.records()[1];
    assert_relative_eq!(day2.portfolio_value, 5500.0, epsilon = 1e-9);
    assert_relative_eq!(day2.total_value, 10_495.0, epsilon = 1e-9);
    assert!(!day2.rebalanced);
    assert_eq!(engine.state(), RunState::Finished);
}

#[test]
fn sell_all_closes_position_net_of_fee() {
    let mut policy = ScriptedPolicy::new()
        .on(date(2024, 1, 2), vec![Order::Buy("X", 50.0)])
        .on(date(2024, 1, 3), vec![Order::SellAll("X")]);
    let mut engine = SimulationEngine::new(two_day_x(), 10_000.0, CostModel::new(10.0, 0.0).unwrap());

    engine.run(&mut policy).unwrap();

    assert_relative_eq!(engine.ledger().cash(), 10_489.5, epsilon = 1e-9);
    assert!(engine.ledger().positions().is_empty());
    let last = engine.results().last().unwrap();
    assert_relative_eq!(last.portfolio_value, 0.0);
    assert_relative_eq!(last.total_value, 10_489.5, epsilon = 1e-9);
    assert!(last.rebalanced);
    assert_relative_eq!(engine.ledger().fees_paid(), 10.5, epsilon = 1e-9);
}

#[test]
fn oversell_opens_short_and_pays_financing() {
    let mut policy = ScriptedPolicy::new()
        .on(date(2024, 1, 2), vec![Order::Buy("X", 50.0)])
        .on(date(2024, 1, 3), vec![Order::Sell("X", 150.0)]);
    let prices = make_series(
        &["X"],
        vec![(date(2024, 1, 2), vec![100.0]), (date(2024, 1, 3), vec![100.0])],
    );
    let mut engine = SimulationEngine::new(prices, 10_000.0, CostModel::new(0.0, 0.0002).unwrap());

    engine.run(&mut policy).unwrap();

    assert_relative_eq!(engine.ledger().position("X"), -100.0);
    // 10000 - 5000 + 15000 - 100 * 0.0002
    assert_relative_eq!(engine.ledger().cash(), 19_999.98, epsilon = 1e-9);
    assert_relative_eq!(engine.ledger().financing_paid(), 0.02, epsilon = 1e-12);

    let last = engine.results().last().unwrap();
    assert_relative_eq!(last.portfolio_value, -10_000.0, epsilon = 1e-9);
    assert_relative_eq!(last.total_value, 9_999.98, epsilon = 1e-9);
}

#[test]
fn notional_financing_scales_with_price() {
    let mut policy = ScriptedPolicy::new()
        .on(date(2024, 1, 2), vec![Order::Buy("X", 1.0)])
        .on(date(2024, 1, 3), vec![Order::Sell("X", 11.0)]);
    let costs = CostModel::new(0.0, 0.001)
        .unwrap()
        .with_financing_basis(FinancingBasis::Notional);
    let mut engine = SimulationEngine::new(two_day_x(), 1_000.0, costs);

    engine.run(&mut policy).unwrap();

    // -10 units at 110, one period at 0.1%
    assert_relative_eq!(engine.ledger().financing_paid(), 1.1, epsilon = 1e-9);
}

#[test]
fn rejected_orders_do_not_stop_the_run() {
    let mut policy = ScriptedPolicy::new().on(
        date(2024, 1, 2),
        vec![
            Order::Buy("X", 1_000.0),
            Order::Sell("X", 1.0),
            Order::Liquidate("X"),
            Order::Buy("Y", 1.0),
            Order::Buy("X", -5.0),
        ],
    );
    let mut engine = SimulationEngine::new(two_day_x(), 10_000.0, CostModel::new(10.0, 0.0).unwrap());

    let results = engine.run(&mut policy).unwrap();

    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| !r.rebalanced));
    assert!(results.iter().all(|r| r.total_value == 10_000.0));

    let rejections = policy.rejections();
    assert_eq!(rejections.len(), 5);
    assert!(matches!(rejections[0], OrderRejected::InsufficientCash { .. }));
    assert!(matches!(rejections[1], OrderRejected::NoPosition { .. }));
    assert!(matches!(rejections[2], OrderRejected::NothingToLiquidate { .. }));
    assert!(matches!(rejections[3], OrderRejected::NoPrice { .. }));
    assert!(matches!(rejections[4], OrderRejected::InvalidQuantity { .. }));
}

#[test]
fn accepted_order_after_rejection_still_marks_rebalanced() {
    let mut policy = ScriptedPolicy::new().on(
        date(2024, 1, 3),
        vec![Order::Buy("X", 1_000.0), Order::Buy("X", 1.0)],
    );
    let mut engine = SimulationEngine::new(two_day_x(), 10_000.0, CostModel::default());

    let results = engine.run(&mut policy).unwrap();

    assert!(!results.records()[0].rebalanced);
    assert!(results.records()[1].rebalanced);
    assert_eq!(results.rebalance_count(), 1);
}

#[test]
fn total_value_is_portfolio_plus_cash_every_period() {
    let prices = generate_series(&["A", "B"], date(2024, 1, 1), 30, 50.0, 1.5);
    let script = || {
        ScriptedPolicy::new()
            .on(date(2024, 1, 1), vec![Order::Buy("A", 20.0), Order::Buy("B", 10.0)])
            .on(date(2024, 1, 10), vec![Order::Sell("A", 30.0)])
            .on(date(2024, 1, 20), vec![Order::Liquidate("A"), Order::SellAll("B")])
    };
    let costs = CostModel::new(5.0, 0.0001).unwrap();

    let mut engine = SimulationEngine::new(prices.clone(), 10_000.0, costs.clone());
    engine.run(&mut script()).unwrap();
    let mut replay = SimulationEngine::new(prices, 10_000.0, costs);
    replay.run(&mut script()).unwrap();

    for r in engine.results() {
        assert_relative_eq!(r.total_value, r.portfolio_value + r.cash(), epsilon = 1e-9);
    }
    assert_eq!(engine.results(), replay.results());
    assert!(engine.ledger().positions().is_empty());
    assert!(engine.ledger().financing_paid() > 0.0);
    assert_eq!(engine.results().rebalance_count(), 3);
}

#[test]
fn policy_sees_every_date_in_order() {
    let prices = generate_series(&["A"], date(2024, 3, 1), 10, 20.0, 0.5);
    let expected = prices.dates().to_vec();
    let mut policy = ScriptedPolicy::new();
    let mut engine = SimulationEngine::new(prices, 1_000.0, CostModel::default());

    engine.run(&mut policy).unwrap();

    assert_eq!(policy.seen_dates, expected);
    let recorded: Vec<_> = engine.results().iter().map(|r| r.date).collect();
    assert_eq!(recorded, expected);
    assert_eq!(engine.current_date(), expected.last().copied());
}

#[test]
fn missing_price_for_held_instrument_is_fatal() {
    let prices = PriceSeries::from_rows(
        vec!["X".into(), "Y".into()],
        vec![
            (date(2024, 1, 2), vec![Some(100.0), Some(10.0)]),
            (date(2024, 1, 3), vec![None, Some(11.0)]),
            (date(2024, 1, 4), vec![Some(105.0), Some(12.0)]),
        ],
    )
    .unwrap();
    let mut policy = ScriptedPolicy::new().on(date(2024, 1, 2), vec![Order::Buy("X", 1.0)]);
    let mut engine = SimulationEngine::new(prices, 1_000.0, CostModel::default());

    let err = engine.run(&mut policy).unwrap_err();

    match err {
        LedgersimError::DataGap { date: d, instrument } => {
            assert_eq!(d, date(2024, 1, 3));
            assert_eq!(instrument, "X");
        }
        other => panic!("expected DataGap, got {other:?}"),
    }
    assert_eq!(engine.results().len(), 1);
    assert_eq!(engine.state(), RunState::Finished);
}

#[test]
fn missing_price_for_unheld_instrument_is_ignored() {
    let prices = PriceSeries::from_rows(
        vec!["X".into(), "Y".into()],
        vec![
            (date(2024, 1, 2), vec![Some(100.0), Some(10.0)]),
            (date(2024, 1, 3), vec![Some(101.0), None]),
        ],
    )
    .unwrap();
    let mut policy = ScriptedPolicy::new().on(
        date(2024, 1, 3),
        vec![Order::Buy("X", 1.0), Order::Buy("Y", 1.0)],
    );
    let mut engine = SimulationEngine::new(prices, 1_000.0, CostModel::default());

    let results = engine.run(&mut policy).unwrap();

    assert_eq!(results.len(), 2);
    assert!(matches!(
        policy.rejections().as_slice(),
        [OrderRejected::NoPrice { .. }]
    ));
}

#[test]
fn second_run_requires_reset_and_repeats_exactly() {
    let prices = generate_series(&["A"], date(2024, 1, 1), 15, 10.0, 0.25);
    let mut policy = ScriptedPolicy::new().on(date(2024, 1, 1), vec![Order::Buy("A", 7.0)]);
    let mut engine = SimulationEngine::new(prices, 500.0, CostModel::new(25.0, 0.0).unwrap());

    let first = engine.run(&mut policy).unwrap().clone();
    assert!(matches!(
        engine.run(&mut policy),
        Err(LedgersimError::ConfigurationMisuse { .. })
    ));
    assert!(matches!(
        engine.set_execution_cost_bps(1.0),
        Err(LedgersimError::ConfigurationMisuse { .. })
    ));

    engine.reset();
    assert_eq!(engine.state(), RunState::Ready);
    let second = engine.run(&mut policy).unwrap();
    assert_eq!(&first, second);
}

#[test]
fn run_backtest_reports_metrics() {
    let prices = generate_series(&["A"], date(2024, 1, 1), 20, 100.0, 1.0);
    let mut policy = ScriptedPolicy::new().on(date(2024, 1, 1), vec![Order::Buy("A", 50.0)]);
    let mut config = sample_config(&["A"]);
    config.execution_cost_bps = 0.0;

    let result = run_backtest(prices, &config, &mut policy).unwrap();

    // 50 units gain 19 each
    assert_relative_eq!(result.metrics.final_value, 10_950.0, epsilon = 1e-9);
    assert_relative_eq!(result.metrics.total_return, 0.095, epsilon = 1e-9);
    assert_eq!(result.metrics.periods, 20);
    assert_eq!(result.metrics.rebalance_count, 1);
    assert_relative_eq!(result.metrics.max_drawdown, 0.0);
    assert_relative_eq!(result.ledger.position("A"), 50.0);
}

#[test]
fn empty_series_yields_empty_results() {
    let prices = make_series(&["X"], vec![]);
    let mut policy = ScriptedPolicy::new();
    let mut engine = SimulationEngine::new(prices, 1_000.0, CostModel::default());

    let results = engine.run(&mut policy).unwrap();

    assert!(results.is_empty());
    assert!(policy.seen_dates.is_empty());
    assert_eq!(engine.current_date(), None);
}
