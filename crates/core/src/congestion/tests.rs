//! Transition tests shared by all controllers.
//!
//! Parameterized cases cover behaviour every algorithm must share; the
//! property tests drive controllers through arbitrary ack/loss sequences and
//! check the invariants after every single transition.

use proptest::prelude::*;
use rstest::rstest;

use super::*;

/// One tick of a synthetic event sequence.
#[derive(Debug, Clone, Copy)]
enum Event {
    Ack,
    Loss,
}

fn arb_events() -> impl Strategy<Value = Vec<Event>> {
    prop::collection::vec(
        prop_oneof![3 => Just(Event::Ack), 1 => Just(Event::Loss)],
        1..200,
    )
}

fn config(algorithm: CongestionControlAlgorithm, max_window: u64) -> CongestionControlConfig {
    CongestionControlConfig::new(algorithm).with_max_window(max_window)
}

/// Applies `events` with one send per tick, calling `check` with the state
/// before and after every transition.
fn replay(
    controller: &CongestionController,
    step: f64,
    events: &[Event],
    mut check: impl FnMut(Event, &ControllerState, &ControllerState),
) -> ControllerState {
    let mut state = controller.initial_state();
    let mut now = SimulationTime::ZERO;
    for event in events {
        now = now.advance(step);
        let sent = state.on_send(step);
        let next = match event {
            Event::Ack => controller.on_ack(sent),
            Event::Loss => controller.on_packet_loss(sent, now),
        };
        check(*event, &sent, &next);
        state = next;
    }
    state
}

#[rstest]
#[case::tahoe(CongestionControlAlgorithm::Tahoe)]
#[case::reno(CongestionControlAlgorithm::Reno)]
#[case::bbr(CongestionControlAlgorithm::Bbr)]
fn test_build_controller(#[case] algorithm: CongestionControlAlgorithm) {
    let controller = config(algorithm, 64).build().unwrap();
    assert_eq!(controller.algorithm(), algorithm);
    assert_eq!(controller.max_window_size(), 64);
}

#[rstest]
#[case::tahoe(CongestionControlAlgorithm::Tahoe)]
#[case::reno(CongestionControlAlgorithm::Reno)]
#[case::bbr(CongestionControlAlgorithm::Bbr)]
fn test_identical_initial_state(#[case] algorithm: CongestionControlAlgorithm) {
    let state = config(algorithm, 64).build().unwrap().initial_state();
    assert_eq!(state.window_size, INITIAL_WINDOW);
    assert_eq!(state.packets_sent, 0);
    assert_eq!(state.packets_lost, 0);
    assert_eq!(state.acknowledged_packets, 0);
    assert_eq!(state.num_delays, 0);
}

#[rstest]
#[case::tahoe(CongestionControlAlgorithm::Tahoe)]
#[case::reno(CongestionControlAlgorithm::Reno)]
#[case::bbr(CongestionControlAlgorithm::Bbr)]
fn test_zero_max_window_rejected(#[case] algorithm: CongestionControlAlgorithm) {
    assert!(matches!(
        config(algorithm, 0).build(),
        Err(ConfigError::ZeroMaxWindow)
    ));
}

#[rstest]
#[case::tahoe(CongestionControlAlgorithm::Tahoe, true)]
#[case::reno(CongestionControlAlgorithm::Reno, true)]
#[case::bbr(CongestionControlAlgorithm::Bbr, false)]
fn test_recovery_tracking_by_algorithm(
    #[case] algorithm: CongestionControlAlgorithm,
    #[case] tracks_recovery: bool,
) {
    let controller = config(algorithm, 64).build().unwrap();
    let events = [Event::Ack, Event::Loss, Event::Ack, Event::Ack, Event::Loss];
    let state = replay(&controller, 1.0, &events, |_, _, _| {});
    assert_eq!(state.packets_lost, 2);
    assert_eq!(state.average_recovery_time().is_some(), tracks_recovery);
    assert_eq!(algorithm.is_loss_based(), tracks_recovery);
    if tracks_recovery {
        assert_eq!(state.average_recovery_time(), Some(3.0));
    }
}

#[test]
fn test_algorithm_display() {
    assert_eq!(CongestionControlAlgorithm::Tahoe.to_string(), "TCP Tahoe");
    assert_eq!(CongestionControlAlgorithm::Reno.to_string(), "TCP Reno");
    assert_eq!(CongestionControlAlgorithm::Bbr.to_string(), "TCP BBR");
}

#[test]
fn test_algorithm_order() {
    let mut shuffled = vec![
        CongestionControlAlgorithm::Bbr,
        CongestionControlAlgorithm::Tahoe,
        CongestionControlAlgorithm::Reno,
    ];
    shuffled.sort();
    assert_eq!(shuffled, CongestionControlAlgorithm::ALL);
}

#[test]
fn test_config_views() {
    let config = CongestionControlConfig::new(CongestionControlAlgorithm::Bbr)
        .with_max_window(32)
        .with_initial_threshold(8)
        .with_initial_bandwidth_estimate(5.0);
    assert_eq!(
        config.as_loss_based_config(),
        LossBasedConfig {
            max_window_size: 32,
            initial_threshold: 8,
        }
    );
    assert_eq!(config.as_bbr_config().initial_bandwidth_estimate, 5.0);

    let controller = config.build().unwrap();
    assert!(matches!(controller, CongestionController::Bbr(_)));
    assert_eq!(controller.initial_state().bandwidth_estimate, 5.0);

    let tahoe = config
        .for_algorithm(CongestionControlAlgorithm::Tahoe)
        .build()
        .unwrap();
    assert!(matches!(tahoe, CongestionController::Tahoe(_)));
    assert_eq!(tahoe.initial_state().threshold, 8);
}

proptest! {
    #[test]
    fn prop_window_stays_in_bounds(
        algorithm in prop::sample::select(CongestionControlAlgorithm::ALL.to_vec()),
        max_window in 1u64..200,
        rate in prop::sample::select(vec![0.5, 1.0, 2.0, 4.0]),
        events in arb_events(),
    ) {
        let controller = config(algorithm, max_window).build().unwrap();
        replay(&controller, 1.0 / rate, &events, |_, _, next| {
            assert!(next.window_size >= 1);
            assert!(next.window_size <= max_window);
        });
    }

    #[test]
    fn prop_tahoe_loss_restarts(events in arb_events(), max_window in 1u64..128) {
        let controller = config(CongestionControlAlgorithm::Tahoe, max_window).build().unwrap();
        replay(&controller, 1.0, &events, |event, before, next| {
            if let Event::Loss = event {
                assert_eq!(next.window_size, 1);
                assert_eq!(next.threshold, (before.window_size / 2).max(1));
            }
        });
    }

    #[test]
    fn prop_reno_loss_fast_recovers(events in arb_events(), max_window in 1u64..128) {
        let controller = config(CongestionControlAlgorithm::Reno, max_window).build().unwrap();
        replay(&controller, 1.0, &events, |event, before, next| {
            if let Event::Loss = event {
                assert_eq!(next.threshold, (before.window_size / 2).max(1));
                assert_eq!(next.window_size, next.threshold);
            }
        });
    }

    #[test]
    fn prop_bbr_estimate_monotonic(
        events in arb_events(),
        max_window in 1u64..128,
        initial in 0.0f64..50.0,
        rate in prop::sample::select(vec![0.25, 1.0, 3.0]),
    ) {
        let controller = config(CongestionControlAlgorithm::Bbr, max_window)
            .with_initial_bandwidth_estimate(initial)
            .build()
            .unwrap();
        replay(&controller, 1.0 / rate, &events, |event, before, next| {
            assert!(next.bandwidth_estimate >= before.bandwidth_estimate);
            if let Event::Ack = event {
                let expected = (next.bandwidth_estimate.floor() as u64).clamp(1, max_window);
                assert_eq!(next.window_size, expected);
                assert!(next.window_size >= before.window_size);
            }
        });
    }

    #[test]
    fn prop_counters_match_events(
        algorithm in prop::sample::select(CongestionControlAlgorithm::ALL.to_vec()),
        events in arb_events(),
    ) {
        let controller = config(algorithm, 64).build().unwrap();
        let mut acked_windows = 0u64;
        let mut sent = 0u64;
        let state = replay(&controller, 1.0, &events, |event, before, next| {
            sent += before.window_size;
            match event {
                Event::Ack => acked_windows += next.window_size,
                Event::Loss => assert_eq!(next.acknowledged_packets, before.acknowledged_packets),
            }
            assert!(next.acknowledged_packets >= before.acknowledged_packets);
            assert!(next.packets_lost >= before.packets_lost);
        });
        let losses = events.iter().filter(|e| matches!(e, Event::Loss)).count() as u64;
        prop_assert_eq!(state.packets_lost, losses);
        prop_assert_eq!(state.acknowledged_packets, acked_windows);
        prop_assert_eq!(state.packets_sent, sent);
        prop_assert_eq!(state.num_delays, events.len() as u64);
    }
}
