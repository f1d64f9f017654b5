//! End-to-end runs of the reference scenarios.
//!
//! Every scenario uses rate 1, max window 64 and horizon 50, so ticks land on
//! the integer times 1..=49.

use ccsim::{
    congestion::{CongestionControlAlgorithm, CongestionControlConfig},
    flow::{Flow, TickEvent},
    simulation::{LossPolicy, SimulationTime, Termination},
};

fn reference_flow(algorithm: CongestionControlAlgorithm, loss: LossPolicy) -> Flow {
    Flow::new(
        1.0,
        CongestionControlConfig::new(algorithm).with_max_window(64),
        loss,
        Termination::default(),
    )
    .unwrap()
}

fn events(flow: &Flow) -> Vec<TickEvent> {
    flow.runner().unwrap().collect()
}

#[test]
fn test_tahoe_reference_scenario() {
    let flow = reference_flow(CongestionControlAlgorithm::Tahoe, LossPolicy::default());
    let events = events(&flow);
    assert_eq!(events.len(), 49);

    let first_loss = events.iter().position(|e| e.lost).unwrap();
    assert_eq!(events[first_loss].tick.index, 14);
    assert_eq!(events[first_loss].state.packets_sent, 220);

    let mut previous = 1;
    for (i, event) in events.iter().enumerate() {
        if event.lost {
            assert_eq!(event.state.window_size, 1);
            assert_eq!(event.state.threshold, (event.window_sent / 2).max(1));
        } else if i > 0 && !events[i - 1].lost {
            let threshold = events[i - 1].state.threshold;
            let expected = if previous < threshold {
                previous * 2
            } else {
                previous + 1
            };
            assert_eq!(event.window_sent, expected.min(64));
        }
        previous = event.window_sent;
        assert!(event.state.packets_sent % 10 != 0 || event.lost);
    }

    let losses: Vec<f64> = events
        .iter()
        .filter(|e| e.lost)
        .map(|e| e.tick.time.as_secs())
        .collect();
    assert_eq!(losses, vec![14.0, 28.0, 42.0]);
}

#[test]
fn test_reno_reference_scenario() {
    let flow = reference_flow(CongestionControlAlgorithm::Reno, LossPolicy::default());
    let events = events(&flow);
    let first_loss = events.iter().find(|e| e.lost).unwrap();
    assert_eq!(first_loss.tick.index, 14);
    assert_eq!(first_loss.window_sent, 25);
    assert_eq!(first_loss.state.threshold, 12);
    assert_eq!(first_loss.state.window_size, first_loss.state.threshold);
    assert!(first_loss.state.window_size > 1);

    for event in events.iter().filter(|e| e.lost) {
        assert_eq!(event.state.window_size, event.state.threshold);
        assert_eq!(event.state.threshold, (event.window_sent / 2).max(1));
    }
}

#[test]
fn test_bbr_reference_scenario() {
    let flow = reference_flow(CongestionControlAlgorithm::Bbr, LossPolicy::modulo_time(5.0));
    let events = events(&flow);
    assert_eq!(events[0].state.window_size, 20);
    assert_eq!(events[0].state.bandwidth_estimate, 20.0);

    let mut last_ack_window = 0;
    for event in events.iter().filter(|e| !e.lost) {
        assert!(event.state.window_size >= last_ack_window);
        last_ack_window = event.state.window_size;
    }
    let report = flow.run().unwrap();
    assert_eq!(report.state.packets_lost, 9);
    assert_eq!(report.metrics().average_recovery_time, None);
}

#[test]
fn test_loss_count_matches_policy() {
    for algorithm in CongestionControlAlgorithm::ALL {
        let flow = reference_flow(algorithm, LossPolicy::modulo_time(3.0));
        let events = events(&flow);
        let fired = events.iter().filter(|e| e.lost).count() as u64;
        let last = events.last().unwrap().state;
        assert_eq!(last.packets_lost, fired);
        assert_eq!(fired, 16);

        let acked: u64 = events
            .iter()
            .filter(|e| !e.lost)
            .map(|e| e.state.window_size)
            .sum();
        assert_eq!(last.acknowledged_packets, acked);
    }
}

#[test]
fn test_tahoe_stops_after_six_losses() {
    let flow = Flow::new(
        1.0,
        CongestionControlConfig::new(CongestionControlAlgorithm::Tahoe),
        LossPolicy::default(),
        Termination::horizon(100.0).with_max_losses(6),
    )
    .unwrap();
    let report = flow.run().unwrap();
    assert_eq!(report.state.packets_lost, 6);
    assert_eq!(report.series.len(), 84);
    assert_eq!(report.final_time, SimulationTime::from_secs(100.0));
    assert_eq!(
        report.metrics().throughput,
        report.state.acknowledged_packets as f64 / 100.0
    );
}

#[test]
fn test_seeded_random_loss_is_reproducible() {
    let flow = reference_flow(CongestionControlAlgorithm::Reno, LossPolicy::random(0.2, 7));
    let first = flow.run().unwrap();
    let second = flow.run().unwrap();
    assert_eq!(first, second);
    assert!(first.state.packets_lost > 0);
    assert!(first.state.packets_lost < 49);

    let always = reference_flow(CongestionControlAlgorithm::Reno, LossPolicy::random(1.0, 7))
        .run()
        .unwrap();
    assert_eq!(always.state.packets_lost, 49);
    assert_eq!(always.state.acknowledged_packets, 0);
}

#[test]
fn test_metrics_of_reference_runs() {
    for algorithm in CongestionControlAlgorithm::ALL {
        let report = reference_flow(algorithm, LossPolicy::default()).run().unwrap();
        let metrics = report.metrics();
        assert_eq!(metrics, report.metrics());
        assert!(metrics.utilization.is_finite() && metrics.utilization >= 0.0);
        assert!((0.0..=1.0).contains(&metrics.packet_loss_rate));
        assert_eq!(metrics.average_delay, 1.0);
        assert_eq!(metrics.delay_stability, metrics.average_delay);
        assert_eq!(
            metrics.throughput,
            report.state.acknowledged_packets as f64 / 50.0
        );
    }
}

#[test]
fn test_fractional_step_accumulates() {
    let flow = Flow::new(
        3.0,
        CongestionControlConfig::default(),
        LossPolicy::Never,
        Termination::horizon(1.0),
    )
    .unwrap();
    let report = flow.run().unwrap();
    let mut expected = 0.0;
    for sample in report.series.samples() {
        expected += 1.0 / 3.0;
        assert_eq!(sample.time.as_secs(), expected);
    }
    assert_eq!(report.final_time, SimulationTime::from_secs(1.0));
}
