use std::time::Duration;

use pad_core::error::BuildError;
use pad_core::mocks::{ScriptedBus, default_wiring};
use pad_core::{Phase, SchedulerBuilder};
use pad_hardware::SimGates;
use pad_traits::ChannelConfig;
use rstest::rstest;

fn build_with(wiring: Vec<ChannelConfig>) -> eyre::Result<()> {
    SchedulerBuilder::new(ScriptedBus::with_wiring(wiring), SimGates::new())
        .build()
        .map(|_| ())
}

fn expect_build_error(res: eyre::Result<()>) -> BuildError {
    let err = res.expect_err("build should fail");
    match err.downcast_ref::<BuildError>() {
        Some(e) => e.clone(),
        None => panic!("expected BuildError, got: {err:?}"),
    }
}

#[rstest]
#[case::missing_ch3(|w: &mut Vec<ChannelConfig>| { w.remove(2); }, BuildError::MissingChannel(3))]
#[case::duplicate_ch1(|w: &mut Vec<ChannelConfig>| { let c = w[0].clone(); w.push(c); }, BuildError::DuplicateChannel(1))]
#[case::split_clock(|w: &mut Vec<ChannelConfig>| { w[2].clock_pin = 9; }, BuildError::ClockPinMismatch(8, 9))]
#[case::zero_ready_timeout(|w: &mut Vec<ChannelConfig>| { w[1].ready_timeout = Duration::ZERO; }, BuildError::InvalidConfig("ready timeout must be > 0"))]
fn wiring_errors_are_typed(#[case] mutate: fn(&mut Vec<ChannelConfig>), #[case] expected: BuildError) {
    let mut wiring = default_wiring();
    mutate(&mut wiring);
    assert_eq!(expect_build_error(build_with(wiring)), expected);
}

#[test]
fn shared_data_pin_names_both_users() {
    let mut wiring = default_wiring();
    wiring[3].data_pin = wiring[0].data_pin;
    match expect_build_error(build_with(wiring)) {
        BuildError::ConflictingLine { pin, first, second } => {
            assert_eq!(pin, 4);
            assert_eq!(first, "ch1 data");
            assert_eq!(second, "ch4 data");
        }
        other => panic!("expected ConflictingLine, got {other:?}"),
    }
}

#[test]
fn data_pin_on_the_clock_line_is_rejected() {
    let mut wiring = default_wiring();
    wiring[0].data_pin = wiring[0].clock_pin;
    assert!(matches!(
        expect_build_error(build_with(wiring)),
        BuildError::ConflictingLine { pin: 8, .. }
    ));
}

#[test]
fn zero_period_is_rejected() {
    let res = SchedulerBuilder::new(ScriptedBus::new(), SimGates::new())
        .with_period(Duration::ZERO)
        .build()
        .map(|_| ());
    assert_eq!(
        expect_build_error(res),
        BuildError::InvalidConfig("tick period must be > 0")
    );
}

#[test]
fn ready_waits_longer_than_a_tick_are_rejected() {
    let res = SchedulerBuilder::new(ScriptedBus::new(), SimGates::new())
        .with_period(Duration::from_millis(11))
        .build()
        .map(|_| ());
    assert_eq!(
        expect_build_error(res),
        BuildError::ReadyBudget {
            total: Duration::from_millis(12),
            period: Duration::from_millis(11),
        }
    );
}

#[test]
fn one_slow_channel_is_enough_to_blow_the_budget() {
    let mut wiring = default_wiring();
    wiring[2].ready_timeout = Duration::from_millis(7);
    assert!(matches!(
        expect_build_error(build_with(wiring)),
        BuildError::ReadyBudget { .. }
    ));
}

#[test]
fn channel_order_in_wiring_does_not_matter() {
    let mut wiring = default_wiring();
    wiring.reverse();
    let sched = SchedulerBuilder::new(ScriptedBus::with_wiring(wiring), SimGates::new())
        .build()
        .expect("valid wiring");
    assert_eq!(sched.phase(), Phase::Idle);
    assert_eq!(sched.period(), Duration::from_millis(12));
}
