use std::net::SocketAddr;

use crate::sql::Command;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: total queries executed. Labels: command, status.
pub const QUERIES_TOTAL: &str = "hotelbook_queries_total";

/// Histogram: query latency in seconds. Labels: command.
pub const QUERY_DURATION_SECONDS: &str = "hotelbook_query_duration_seconds";

/// Counter: engine operations refused. Labels: reason.
pub const ENGINE_REJECTIONS_TOTAL: &str = "hotelbook_engine_rejections_total";

// ── USE metrics (resource utilization) ──────────────────────────

/// Gauge: active TCP connections.
pub const CONNECTIONS_ACTIVE: &str = "hotelbook_connections_active";

/// Counter: total connections accepted.
pub const CONNECTIONS_TOTAL: &str = "hotelbook_connections_total";

/// Counter: connections rejected due to limit.
pub const CONNECTIONS_REJECTED_TOTAL: &str = "hotelbook_connections_rejected_total";

/// Gauge: bookings currently held by the engine.
pub const BOOKINGS_ACTIVE: &str = "hotelbook_bookings_active";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}

/// Map a Command variant to a short label for metrics.
pub fn command_label(cmd: &Command) -> &'static str {
    match cmd {
        Command::InsertBooking { .. } => "insert_booking",
        Command::SelectBookings => "select_bookings",
        Command::UpdateBooking { .. } => "update_booking",
        Command::DeleteBooking { .. } => "delete_booking",
        Command::SelectRooms { .. } => "select_rooms",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_without_port_is_noop() {
        assert!(init(None).is_ok());
    }

    #[test]
    fn labels_are_distinct() {
        let date = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let labels = [
            command_label(&Command::InsertBooking {
                room_id: 1,
                user_name: "A".into(),
                start: date,
                end: date,
            }),
            command_label(&Command::SelectBookings),
            command_label(&Command::UpdateBooking {
                id: 1,
                start: date,
                end: date,
            }),
            command_label(&Command::DeleteBooking { id: 1 }),
            command_label(&Command::SelectRooms { id: None }),
        ];
        let unique: std::collections::HashSet<_> = labels.iter().collect();
        assert_eq!(unique.len(), labels.len());
    }
}
