//! Summary statistics of a finished run.

use serde::{Deserialize, Serialize};

use crate::flow::FlowReport;

/// Read-only summary of one run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricsRecord {
    /// Acknowledged over sent packets.
    ///
    /// Acknowledgments are credited with the post-ack window, which is larger
    /// than the window that was sent while the window grows, so this value can
    /// exceed 1.
    pub utilization: f64,
    /// Loss events over sent packets.
    pub packet_loss_rate: f64,
    pub average_delay: f64,
    /// Reported as the average delay.
    pub delay_stability: f64,
    /// Acknowledged packets per simulated time unit.
    pub throughput: f64,
    /// Mean interval between consecutive losses. `None` for controllers that
    /// do not track recovery.
    pub average_recovery_time: Option<f64>,
}

/// Reduces a finished run to a [`MetricsRecord`].
///
/// Every ratio with a zero denominator is reported as 0.
pub struct MetricsCollector;

impl MetricsCollector {
    pub fn collect(report: &FlowReport) -> MetricsRecord {
        let state = &report.state;
        let sent = state.packets_sent as f64;
        let average_delay = state.average_delay().unwrap_or(0.0);
        let average_recovery_time = report
            .algorithm
            .is_loss_based()
            .then(|| state.average_recovery_time().unwrap_or(0.0));
        MetricsRecord {
            utilization: ratio(state.acknowledged_packets as f64, sent),
            packet_loss_rate: ratio(state.packets_lost as f64, sent),
            average_delay,
            delay_stability: average_delay,
            throughput: ratio(
                state.acknowledged_packets as f64,
                report.final_time.as_secs(),
            ),
            average_recovery_time,
        }
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}
