//! Typed HTTP client for the weighbridge.
//!
//! Bill assembly tolerates a flaky sister service, so every call resolves to
//! a three-way outcome instead of an error: a payload, a definitive "not
//! found", or "unreachable" (transport failure, timeout, non-2xx, undecodable
//! body). The aggregation code decides per call site what a skip means.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use time::PrimitiveDateTime;
use tracing::{instrument, warn};
use url::Url;

use gatehouse_base::CoreMetrics;
use gatehouse_core::api::{ItemHistory, SessionDetail, TransactionRow};
use gatehouse_core::timefmt;

/// Outcome of one weighbridge call.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched<T> {
    /// The weighbridge answered with a payload.
    Hit(T),
    /// The weighbridge definitively does not know the referenced entity.
    Missing,
    /// Transport failure, timeout or a reply that could not be used.
    Unreachable,
}

impl<T> Fetched<T> {
    /// The payload, if any.
    pub fn hit(self) -> Option<T> {
        match self {
            Fetched::Hit(payload) => Some(payload),
            _ => None,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Fetched::Hit(_) => "hit",
            Fetched::Missing => "missing",
            Fetched::Unreachable => "unreachable",
        }
    }
}

/// A `from..to` window in weighbridge time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub from: PrimitiveDateTime,
    pub to: PrimitiveDateTime,
}

impl Window {
    fn query(&self) -> Vec<(&'static str, String)> {
        vec![
            ("from", timefmt::format(self.from)),
            ("to", timefmt::format(self.to)),
        ]
    }
}

/// The one place billing knows how to reach the weighbridge.
#[derive(Clone, Debug)]
pub struct WeighClient {
    http: Client,
    base: Url,
    metrics: Arc<CoreMetrics>,
}

impl WeighClient {
    /// Build a client against `base` with a bounded per-request timeout.
    pub fn new(base: &str, timeout: Duration, metrics: Arc<CoreMetrics>) -> eyre::Result<Self> {
        let base = Url::parse(base)?;
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base,
            metrics,
        })
    }

    /// `GET /item/{id}?from&to` — a truck's sessions and last known tara.
    #[instrument(skip(self, window))]
    pub async fn item(&self, id: &str, window: &Window) -> Fetched<ItemHistory> {
        self.get_json(&format!("item/{id}"), "item", window.query())
            .await
    }

    /// `GET /session/{id}` — one session's detail.
    #[instrument(skip(self))]
    pub async fn session(&self, id: i64) -> Fetched<SessionDetail> {
        self.get_json(&format!("session/{id}"), "session", Vec::new())
            .await
    }

    /// `GET /weight?from&to&filter=in` — the produce mapping source.
    #[instrument(skip(self, window))]
    pub async fn weighings(&self, window: &Window) -> Fetched<Vec<TransactionRow>> {
        let mut query = window.query();
        query.push(("filter", "in".to_owned()));
        self.get_json("weight", "weight", query).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        endpoint: &'static str,
        query: Vec<(&'static str, String)>,
    ) -> Fetched<T> {
        let outcome = self.fetch(path, query).await;
        self.metrics
            .outbound_requests()
            .with_label_values(&[endpoint, outcome.label()])
            .inc();
        outcome
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        path: &str,
        query: Vec<(&'static str, String)>,
    ) -> Fetched<T> {
        let url = match self.base.join(path) {
            Ok(url) => url,
            Err(err) => {
                warn!(path, error = %err, "unusable weighbridge url");
                return Fetched::Unreachable;
            }
        };

        let response = match self.http.get(url).query(&query).send().await {
            Ok(response) => response,
            Err(err) => {
                warn!(path, error = %err, "weighbridge call failed");
                return Fetched::Unreachable;
            }
        };

        match response.status() {
            StatusCode::NOT_FOUND => Fetched::Missing,
            status if status.is_success() => match response.json().await {
                Ok(payload) => Fetched::Hit(payload),
                Err(err) => {
                    warn!(path, error = %err, "undecodable weighbridge reply");
                    Fetched::Unreachable
                }
            },
            status => {
                warn!(path, %status, "weighbridge replied with an error");
                Fetched::Unreachable
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use axum::http::StatusCode;
    use axum::{routing, Json, Router};
    use time::macros::datetime;

    use gatehouse_core::MaybeKg;

    use super::*;

    fn test_window() -> Window {
        Window {
            from: datetime!(2025-01-01 00:00:00),
            to: datetime!(2025-01-31 23:59:59),
        }
    }

    fn test_client(addr: SocketAddr) -> WeighClient {
        let metrics = Arc::new(CoreMetrics::new("test", 0).unwrap());
        WeighClient::new(
            &format!("http://{addr}"),
            Duration::from_secs(1),
            metrics,
        )
        .unwrap()
    }

    fn spawn_server(app: Router) -> SocketAddr {
        let server =
            axum::Server::bind(&"127.0.0.1:0".parse().unwrap()).serve(app.into_make_service());
        let addr = server.local_addr();
        tokio::spawn(server);
        addr
    }

    #[tokio::test]
    async fn hits_decode_the_payload() {
        let app = Router::new().route(
            "/item/:id",
            routing::get(|| async {
                Json(ItemHistory {
                    id: "T-1".into(),
                    tara: MaybeKg::known(9000),
                    sessions: vec![1, 4],
                })
            }),
        );
        let client = test_client(spawn_server(app));

        let fetched = client.item("T-1", &test_window()).await;
        assert_eq!(
            fetched.hit().unwrap().sessions,
            vec![1, 4],
            "payload survives the round trip"
        );
    }

    #[tokio::test]
    async fn not_found_is_a_definitive_miss() {
        let app = Router::new().route(
            "/session/:id",
            routing::get(|| async { StatusCode::NOT_FOUND }),
        );
        let client = test_client(spawn_server(app));

        assert_eq!(client.session(99).await, Fetched::Missing);
    }

    #[tokio::test]
    async fn server_errors_and_dead_peers_are_unreachable() {
        let app = Router::new().route(
            "/weight",
            routing::get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        );
        let client = test_client(spawn_server(app));
        assert_eq!(client.weighings(&test_window()).await, Fetched::Unreachable);

        // Nothing listens on this port.
        let dead = test_client("127.0.0.1:9".parse().unwrap());
        assert_eq!(dead.session(1).await, Fetched::Unreachable);
    }
}
