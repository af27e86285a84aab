//! Roll Cycle Integration Tests
//!
//! Drives the monthly and weekly rolls and the full run cycle against a
//! scripted gateway:
//! - Post-earnings monthly roll picking the first strike past the delta target
//! - Weekly roll with and without short puts to close
//! - Exhausted chains, rejected closes, and rejected opens after a close
//! - Buying back a held put that no longer has a bid
//! - Disconnect on every exit path, including connection loss mid-cycle

#![allow(clippy::expect_used, clippy::unwrap_used)]

mod support;

use std::sync::Arc;
use std::time::Duration;

use rust_decimal_macros::dec;
use tokio_util::sync::CancellationToken;

use roll_engine::application::ports::{
    ExecutionError, InMemoryArchiveStore, MarketDataError, SessionError,
};
use roll_engine::application::use_cases::CycleStep;
use roll_engine::domain::rolling::SkipReason;
use roll_engine::domain::shared::{OrderSide, Symbol};
use roll_engine::{
    ArchiveSettings, CycleSteps, EarningsCalendar, MonthlyRollUseCase, OptionPosition,
    OptionQuote, RefreshArchiveUseCase, RollEngineError, RollKind, RollSettings, RollState,
    RollStateMachine, RunCycleUseCase, WeeklyRollUseCase,
};

use support::{MockGateway, date, put};

/// MSTR chain where only the 90 strike reaches 10 delta.
fn chain(gateway: MockGateway) -> MockGateway {
    gateway.with_chain(&[
        (dec!(50), 0.01),
        (dec!(60), 0.02),
        (dec!(70), 0.03),
        (dec!(80), 0.05),
        (dec!(90), 0.12),
    ])
}

fn settings() -> RollSettings {
    let mut settings = RollSettings::new(
        Symbol::new("MSTR"),
        EarningsCalendar::new([date("2025-01-16"), date("2025-04-17")]),
        123,
    );
    settings.settle_delay = Duration::ZERO;
    settings
}

fn monthly(gateway: &Arc<MockGateway>) -> MonthlyRollUseCase<MockGateway, MockGateway> {
    MonthlyRollUseCase::new(
        Arc::clone(gateway),
        Arc::clone(gateway),
        settings(),
        CancellationToken::new(),
    )
}

fn weekly(gateway: &Arc<MockGateway>) -> WeeklyRollUseCase<MockGateway, MockGateway> {
    WeeklyRollUseCase::new(
        Arc::clone(gateway),
        Arc::clone(gateway),
        settings(),
        CancellationToken::new(),
    )
}

fn run_cycle(
    gateway: &Arc<MockGateway>,
) -> RunCycleUseCase<MockGateway, MockGateway, MockGateway, InMemoryArchiveStore> {
    RunCycleUseCase::new(
        Arc::clone(gateway),
        RefreshArchiveUseCase::new(
            Arc::clone(gateway),
            Arc::new(InMemoryArchiveStore::new()),
            ArchiveSettings::new(Symbol::new("MSTR")),
        ),
        monthly(gateway),
        weekly(gateway),
    )
}

// ============================================
// Monthly Roll
// ============================================

#[tokio::test]
async fn monthly_roll_sells_first_strike_past_target_after_assignment() {
    let gateway = Arc::new(chain(MockGateway::new()).assigned());
    let mut machine = RollStateMachine::new();

    let report = monthly(&gateway)
        .execute(date("2025-02-20"), &mut machine)
        .await
        .unwrap();

    assert_eq!(machine.state(), RollState::MonthlyExecuted);
    assert_eq!(report.final_state, RollState::MonthlyExecuted);
    assert_eq!(report.order_count(), 1);

    let calls = gateway.calls();
    assert_eq!(calls.assignment_checks, vec![date("2025-01-16")]);
    assert_eq!(calls.orders.len(), 1);

    let order = &calls.orders[0];
    assert_eq!(order.side, OrderSide::Sell);
    assert_eq!(order.quantity, 1);
    assert_eq!(order.contract.expiry(), date("2025-02-15"));
    assert_eq!(order.contract.strike(), dec!(90));
    assert_eq!(order.limit_price.amount(), dec!(1.20));

    // Probed ascending and stopped at the first strike reaching the target.
    let probed: Vec<_> = calls.subscribed.iter().map(|c| c.strike()).collect();
    assert_eq!(probed, vec![dec!(50), dec!(60), dec!(70), dec!(80), dec!(90)]);
    drop(calls);
    assert_eq!(gateway.leaked(), 0);
}

#[tokio::test]
async fn monthly_roll_skips_without_assignment() {
    let gateway = Arc::new(chain(MockGateway::new()));
    let mut machine = RollStateMachine::new();

    let report = monthly(&gateway)
        .execute(date("2025-02-20"), &mut machine)
        .await
        .unwrap();

    assert_eq!(machine.state(), RollState::Idle);
    assert_eq!(
        report.skips,
        vec![SkipReason::NotAssigned {
            date: date("2025-01-16")
        }]
    );
    assert!(gateway.calls().orders.is_empty());
    assert!(gateway.calls().subscribed.is_empty());
}

#[tokio::test]
async fn monthly_roll_skips_before_first_earnings_date() {
    let gateway = Arc::new(chain(MockGateway::new()).assigned());
    let mut machine = RollStateMachine::new();

    let report = monthly(&gateway)
        .execute(date("2025-01-02"), &mut machine)
        .await
        .unwrap();

    assert_eq!(report.skips, vec![SkipReason::NoPriorEarnings]);
    assert!(gateway.calls().assignment_checks.is_empty());
    assert_eq!(machine.state(), RollState::Idle);
}

#[tokio::test]
async fn monthly_roll_places_nothing_when_no_strike_reaches_target() {
    let gateway = Arc::new(
        MockGateway::new()
            .with_chain(&[(dec!(50), 0.01), (dec!(60), 0.02), (dec!(70), 0.04)])
            .assigned(),
    );
    let mut machine = RollStateMachine::new();

    let report = monthly(&gateway)
        .execute(date("2025-02-20"), &mut machine)
        .await
        .unwrap();

    assert_eq!(report.order_count(), 0);
    assert!(matches!(
        report.skips.as_slice(),
        [SkipReason::NoStrikeMeetsDelta { probes: 3, .. }]
    ));
    assert_eq!(machine.state(), RollState::Idle);
    assert_eq!(machine.history(), &[RollState::Idle, RollState::MonthlyDue, RollState::Idle]);
    assert_eq!(gateway.leaked(), 0);
}

// ============================================
// Weekly Roll
// ============================================

#[tokio::test]
async fn weekly_roll_opens_without_positions() {
    let gateway = Arc::new(chain(MockGateway::new()));
    let mut machine = RollStateMachine::new();

    let report = weekly(&gateway)
        .execute(date("2025-02-20"), &mut machine)
        .await
        .unwrap();

    assert_eq!(report.kind, RollKind::Weekly);
    assert_eq!(report.final_state, RollState::WeeklyExecuted);
    assert_eq!(report.closes().count(), 0);

    let calls = gateway.calls();
    assert_eq!(calls.orders.len(), 1);
    assert_eq!(calls.orders[0].side, OrderSide::Sell);
    assert_eq!(calls.orders[0].contract.expiry(), date("2025-02-27"));
    assert_eq!(calls.orders[0].contract.strike(), dec!(90));
}

#[tokio::test]
async fn weekly_roll_closes_short_puts_before_opening() {
    let held = OptionPosition::new(put("2025-02-21", dec!(250)), -2);
    let long_call = OptionPosition::new(
        roll_engine::OptionContract::new(
            Symbol::new("MSTR"),
            date("2025-02-21"),
            dec!(400),
            roll_engine::OptionRight::Call,
        ),
        1,
    );
    let gateway = Arc::new(chain(MockGateway::new()).with_positions(vec![held, long_call]));
    let mut machine = RollStateMachine::new();

    let report = weekly(&gateway)
        .execute(date("2025-02-20"), &mut machine)
        .await
        .unwrap();

    assert_eq!(report.order_count(), 2);
    let calls = gateway.calls();
    let close = &calls.orders[0];
    assert_eq!(close.side, OrderSide::Buy);
    assert_eq!(close.quantity, 2);
    assert_eq!(close.contract.strike(), dec!(250));
    assert_eq!(close.limit_price.amount(), dec!(2.20));

    let open = &calls.orders[1];
    assert_eq!(open.side, OrderSide::Sell);
    assert_eq!(open.contract.expiry(), date("2025-02-27"));
    drop(calls);
    assert_eq!(gateway.leaked(), 0);
}

#[tokio::test]
async fn weekly_roll_closes_put_with_zero_bid() {
    let held = OptionPosition::new(put("2025-02-21", dec!(250)), -1);
    let gateway = Arc::new(
        chain(MockGateway::new())
            .quoting(dec!(250), OptionQuote::new(dec!(0), dec!(0.05), Some(-0.01)))
            .with_positions(vec![held]),
    );
    let mut machine = RollStateMachine::new();

    let report = weekly(&gateway)
        .execute(date("2025-02-20"), &mut machine)
        .await
        .unwrap();

    assert_eq!(report.order_count(), 2);
    assert_eq!(report.final_state, RollState::WeeklyExecuted);
    let calls = gateway.calls();
    let close = &calls.orders[0];
    assert_eq!(close.side, OrderSide::Buy);
    assert_eq!(close.contract.strike(), dec!(250));
    assert_eq!(close.limit_price.amount(), dec!(0.02));
    assert_eq!(calls.orders[1].side, OrderSide::Sell);
    drop(calls);
    assert_eq!(gateway.leaked(), 0);
}

#[tokio::test]
async fn weekly_roll_close_buys_at_ask_when_mid_rounds_to_zero() {
    let held = OptionPosition::new(put("2025-02-21", dec!(250)), -1);
    let gateway = Arc::new(
        chain(MockGateway::new())
            .quoting(dec!(250), OptionQuote::new(dec!(0), dec!(0.01), None))
            .with_positions(vec![held]),
    );
    let mut machine = RollStateMachine::new();

    weekly(&gateway)
        .execute(date("2025-02-20"), &mut machine)
        .await
        .unwrap();

    assert_eq!(gateway.calls().orders[0].limit_price.amount(), dec!(0.01));
}

#[tokio::test]
async fn weekly_roll_close_without_offer_places_nothing() {
    let held = OptionPosition::new(put("2025-02-21", dec!(250)), -1);
    let gateway = Arc::new(
        chain(MockGateway::new())
            .quoting(dec!(250), OptionQuote::new(dec!(0), dec!(0), None))
            .with_positions(vec![held]),
    );
    let mut machine = RollStateMachine::new();

    let err = weekly(&gateway)
        .execute(date("2025-02-20"), &mut machine)
        .await
        .unwrap_err();

    assert!(matches!(err, RollEngineError::DataUnavailable { .. }), "{err:?}");
    assert!(gateway.calls().orders.is_empty());
    assert_eq!(gateway.leaked(), 0);
}

#[tokio::test]
async fn weekly_roll_close_failure_does_not_open() {
    let held = OptionPosition::new(put("2025-02-21", dec!(250)), -1);
    let gateway = Arc::new(
        chain(MockGateway::new())
            .with_positions(vec![held])
            .failing_order_at(0),
    );
    let mut machine = RollStateMachine::new();

    let err = weekly(&gateway)
        .execute(date("2025-02-20"), &mut machine)
        .await
        .unwrap_err();

    assert!(matches!(err, RollEngineError::Execution(_)), "{err:?}");
    assert!(!err.is_partial());
    assert_eq!(gateway.calls().orders.len(), 1);
    assert_eq!(machine.state(), RollState::Idle);
}

#[tokio::test]
async fn weekly_roll_open_failure_after_close_is_partial() {
    let held = OptionPosition::new(put("2025-02-21", dec!(250)), -1);
    let gateway = Arc::new(
        chain(MockGateway::new())
            .with_positions(vec![held])
            .failing_order_at(1),
    );
    let mut machine = RollStateMachine::new();

    let err = weekly(&gateway)
        .execute(date("2025-02-20"), &mut machine)
        .await
        .unwrap_err();

    match err {
        RollEngineError::PartialRollFailure { kind, closed, .. } => {
            assert_eq!(kind, RollKind::Weekly);
            assert_eq!(closed.len(), 1);
            assert_eq!(closed[0].closed.as_ref().unwrap().strike(), dec!(250));
        }
        other => panic!("expected partial roll failure, got {other:?}"),
    }
    assert_eq!(machine.state(), RollState::WeeklyExecuted);
    assert_eq!(gateway.leaked(), 0);
}

#[tokio::test]
async fn weekly_roll_skips_open_when_chain_is_empty() {
    let gateway = Arc::new(MockGateway::new());
    let mut machine = RollStateMachine::new();

    let report = weekly(&gateway)
        .execute(date("2025-02-20"), &mut machine)
        .await
        .unwrap();

    assert_eq!(report.order_count(), 0);
    assert!(matches!(
        report.skips.as_slice(),
        [SkipReason::NoStrikeMeetsDelta { probes: 0, .. }]
    ));
    assert_eq!(report.final_state, RollState::Idle);
}

// ============================================
// Run Cycle
// ============================================

#[tokio::test]
async fn run_cycle_executes_both_rolls_and_disconnects() {
    let gateway = Arc::new(chain(MockGateway::new()).assigned());

    let report = run_cycle(&gateway)
        .execute(date("2025-02-20"), CycleSteps::ROLLS_ONLY)
        .await
        .unwrap();

    assert!(report.is_clean());
    assert!(report.archive.is_none());
    assert_eq!(report.monthly.as_ref().unwrap().order_count(), 1);
    assert_eq!(report.weekly.as_ref().unwrap().final_state, RollState::WeeklyExecuted);

    let calls = gateway.calls();
    assert_eq!(calls.connects, 1);
    assert_eq!(calls.disconnects, 1);
    assert_eq!(calls.orders.len(), 2);
}

#[tokio::test]
async fn run_cycle_reports_partial_weekly_failure() {
    let held = OptionPosition::new(put("2025-02-21", dec!(250)), -1);
    let gateway = Arc::new(
        chain(MockGateway::new())
            .with_positions(vec![held])
            .failing_order_at(1),
    );

    let report = run_cycle(&gateway)
        .execute(date("2025-02-20"), CycleSteps::ROLLS_ONLY)
        .await
        .unwrap();

    assert!(report.has_partial_failure());
    assert!(!report.is_clean());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].step, CycleStep::Weekly);
    assert_eq!(gateway.calls().disconnects, 1);
}

#[tokio::test]
async fn run_cycle_disconnects_when_connect_fails() {
    let gateway = Arc::new(chain(MockGateway::new()).failing_connect(
        SessionError::ConnectionFailure {
            message: "connection refused".to_string(),
        },
    ));

    let err = run_cycle(&gateway)
        .execute(date("2025-02-20"), CycleSteps::ALL)
        .await
        .unwrap_err();

    assert!(matches!(err, RollEngineError::ConnectionFailure { .. }), "{err:?}");
    let calls = gateway.calls();
    assert_eq!(calls.disconnects, 1);
    assert!(calls.orders.is_empty());
    assert!(calls.history_requests.is_empty());
}

#[tokio::test]
async fn run_cycle_aborts_and_disconnects_when_archive_loses_connection() {
    let gateway = Arc::new(chain(MockGateway::new()).assigned().failing_contracts_with(
        MarketDataError::ConnectionFailure {
            message: "socket closed".to_string(),
        },
    ));

    let err = run_cycle(&gateway)
        .execute(date("2025-02-20"), CycleSteps::ALL)
        .await
        .unwrap_err();

    assert!(matches!(err, RollEngineError::ConnectionFailure { .. }), "{err:?}");
    let calls = gateway.calls();
    assert_eq!(calls.connects, 1);
    assert_eq!(calls.disconnects, 1);
    assert!(calls.assignment_checks.is_empty());
    assert!(calls.subscribed.is_empty());
    assert!(calls.orders.is_empty());
}

#[tokio::test]
async fn run_cycle_aborts_and_disconnects_when_weekly_loses_connection() {
    let gateway = Arc::new(chain(MockGateway::new()).assigned().failing_positions_with(
        ExecutionError::ConnectionFailure {
            message: "session expired".to_string(),
        },
    ));

    let err = run_cycle(&gateway)
        .execute(date("2025-02-20"), CycleSteps::ROLLS_ONLY)
        .await
        .unwrap_err();

    assert!(matches!(err, RollEngineError::ConnectionFailure { .. }), "{err:?}");
    let calls = gateway.calls();
    assert_eq!(calls.disconnects, 1);
    // Only the monthly open went out; the weekly never reached an order.
    assert_eq!(calls.orders.len(), 1);
    assert_eq!(calls.orders[0].side, OrderSide::Sell);
    assert_eq!(calls.orders[0].contract.expiry(), date("2025-02-15"));
    assert_eq!(calls.subscribed.len(), calls.released);
}
