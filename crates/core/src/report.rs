//! Console tables for runs and sweeps.

use prettytable::{Cell, Row, Table};

use crate::flow::FlowReport;
use crate::metrics::MetricsRecord;
use crate::sweep::SweepResult;

fn metrics_header(leading: &[&str]) -> Row {
    let mut cells: Vec<Cell> = leading.iter().map(|title| Cell::new(title)).collect();
    cells.extend(
        [
            "Utilization",
            "Loss rate",
            "Avg delay",
            "Delay stability",
            "Throughput",
            "Avg recovery",
        ]
        .iter()
        .map(|title| Cell::new(title)),
    );
    Row::new(cells)
}

fn metrics_cells(metrics: &MetricsRecord) -> Vec<Cell> {
    let recovery = metrics
        .average_recovery_time
        .map(|value| format!("{value:.3}"))
        .unwrap_or_else(|| "-".to_string());
    vec![
        Cell::new(&format!("{:.4}", metrics.utilization)),
        Cell::new(&format!("{:.4}", metrics.packet_loss_rate)),
        Cell::new(&format!("{:.3}", metrics.average_delay)),
        Cell::new(&format!("{:.3}", metrics.delay_stability)),
        Cell::new(&format!("{:.3}", metrics.throughput)),
        Cell::new(&recovery),
    ]
}

/// One row per finished single run.
pub fn runs_table(reports: &[FlowReport]) -> Table {
    let mut table = Table::new();
    table.add_row(metrics_header(&["Algorithm", "Ticks", "Sent", "Lost", "Acked"]));
    for report in reports {
        let state = &report.state;
        let mut cells = vec![
            Cell::new(&report.algorithm.to_string()),
            Cell::new(&report.series.len().to_string()),
            Cell::new(&state.packets_sent.to_string()),
            Cell::new(&state.packets_lost.to_string()),
            Cell::new(&state.acknowledged_packets.to_string()),
        ];
        cells.extend(metrics_cells(&report.metrics()));
        table.add_row(Row::new(cells));
    }
    table
}

/// One row per `(loss_frequency, variant)` pair, in canonical order.
pub fn sweep_table(result: &SweepResult) -> Table {
    let mut table = Table::new();
    table.add_row(metrics_header(&["Loss frequency", "Algorithm"]));
    for record in &result.records {
        let mut cells = vec![
            Cell::new(&record.loss_frequency.to_string()),
            Cell::new(&record.algorithm.to_string()),
        ];
        cells.extend(metrics_cells(&record.metrics));
        table.add_row(Row::new(cells));
    }
    table
}
