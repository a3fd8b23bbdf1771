use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::{routing::get, Router};
use prometheus::{
    labels, opts, register_int_counter_vec_with_registry, register_int_gauge_vec_with_registry,
    Encoder, IntCounterVec, IntGauge, IntGaugeVec, Registry, TextEncoder,
};
use tokio::task::JoinHandle;

const NAMESPACE: &str = "gatehouse";

/// Macro to prefix a string with the namespace.
macro_rules! namespaced {
    ($name:expr) => {
        format!("{}_{}", NAMESPACE, $name)
    };
}

/// Metrics shared by every gatehouse agent, served in OpenMetrics format on a
/// dedicated port.
pub struct CoreMetrics {
    /// Metrics registry for adding new metrics and gathering reports
    registry: Registry,
    listen_port: u16,
    agent_name: String,

    api_requests: IntCounterVec,
    outbound_requests: IntCounterVec,
    db_in_flight: IntGaugeVec,
}

impl CoreMetrics {
    /// Track metrics for a particular agent name.
    ///
    /// - `for_agent` name of the agent these metrics are tracking.
    /// - `listen_port` port to start the HTTP server on; 0 disables it.
    pub fn new(for_agent: &str, listen_port: u16) -> prometheus::Result<Self> {
        let registry = Registry::new();
        let const_labels: HashMap<String, String> = labels! {
            namespaced!("baselib_version") => env!("CARGO_PKG_VERSION").into(),
            "agent".into() => for_agent.into(),
        };
        let const_labels_ref = const_labels
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect::<HashMap<_, _>>();

        let api_requests = register_int_counter_vec_with_registry!(
            opts!(
                namespaced!("api_requests_total"),
                "Number of public API requests served, by endpoint and status",
                const_labels_ref
            ),
            &["endpoint", "status"],
            registry
        )?;

        let outbound_requests = register_int_counter_vec_with_registry!(
            opts!(
                namespaced!("outbound_requests_total"),
                "Number of calls made to the sister service, by endpoint and outcome",
                const_labels_ref
            ),
            &["endpoint", "outcome"],
            registry
        )?;

        let db_in_flight = register_int_gauge_vec_with_registry!(
            opts!(
                namespaced!("db_operations_in_flight"),
                "Number of database operations currently holding a connection, by operation",
                const_labels_ref
            ),
            &["operation"],
            registry
        )?;

        Ok(Self {
            registry,
            listen_port,
            agent_name: for_agent.into(),
            api_requests,
            outbound_requests,
            db_in_flight,
        })
    }

    /// Counter of served API requests, labelled `(endpoint, status)`.
    pub fn api_requests(&self) -> &IntCounterVec {
        &self.api_requests
    }

    /// Counter of outbound sister-service calls, labelled `(endpoint, outcome)`.
    pub fn outbound_requests(&self) -> &IntCounterVec {
        &self.outbound_requests
    }

    /// Mark one database operation as in flight. The gauge drops back when
    /// the returned guard does, on every exit path.
    pub fn track_db_operation(&self, operation: &str) -> InFlightGuard {
        let gauge = self.db_in_flight.with_label_values(&[operation]);
        gauge.inc();
        InFlightGuard(gauge)
    }

    /// Gather available metrics into an encoded (plaintext, OpenMetrics
    /// format) report.
    pub fn gather(&self) -> prometheus::Result<Vec<u8>> {
        let collected_metrics = self.registry.gather();
        let mut out_buf = Vec::with_capacity(1024 * 64);
        let encoder = TextEncoder::new();
        encoder.encode(&collected_metrics, &mut out_buf)?;
        Ok(out_buf)
    }

    /// Run an HTTP server serving OpenMetrics format reports on `/metrics`.
    pub fn run_http_server(self: Arc<Self>) -> JoinHandle<()> {
        let port = self.listen_port;
        if port == 0 {
            tracing::info!("metrics server disabled");
            return tokio::spawn(async {});
        }
        tracing::info!(port, "starting prometheus server on 0.0.0.0");

        tokio::spawn(async move {
            let app = Router::new().route(
                "/metrics",
                get(move || {
                    let metrics = self.clone();
                    async move {
                        match metrics.gather() {
                            Ok(report) => (
                                StatusCode::OK,
                                [("Content-Type", "text/plain; charset=utf-8")],
                                report,
                            ),
                            Err(_) => (
                                StatusCode::INTERNAL_SERVER_ERROR,
                                [("Content-Type", "text/plain; charset=utf-8")],
                                b"Failed to encode metrics".to_vec(),
                            ),
                        }
                    }
                }),
            );

            let addr = SocketAddr::from(([0, 0, 0, 0], port));
            axum::Server::bind(&addr)
                .serve(app.into_make_service())
                .await
                .expect("Failed to start metrics server");
        })
    }
}

impl Debug for CoreMetrics {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "CoreMetrics {{ agent_name: {}, listen_port: {} }}",
            self.agent_name, self.listen_port
        )
    }
}

/// Live handle on one in-flight database operation.
pub struct InFlightGuard(IntGauge);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.dec();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_flight_gauge_follows_guard_lifetime() {
        let metrics = CoreMetrics::new("test", 0).unwrap();
        let gauge = metrics.db_in_flight.with_label_values(&["query"]);

        let outer = metrics.track_db_operation("query");
        let inner = metrics.track_db_operation("query");
        assert_eq!(gauge.get(), 2);

        drop(inner);
        assert_eq!(gauge.get(), 1);
        drop(outer);
        assert_eq!(gauge.get(), 0);
    }
}
