use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{MatchedPath, State};
use axum::http::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::Router;
use eyre::Result;
use tokio::task::JoinHandle;
use tracing::{info, info_span, instrument::Instrumented, Instrument};

use crate::metrics::CoreMetrics;

/// Serve an agent's public API: every `(path, Router)` pair is nested under
/// its path, and request counts are recorded per matched endpoint.
pub fn serve(
    port: u16,
    routes: Vec<(&'static str, Router)>,
    metrics: Arc<CoreMetrics>,
) -> Instrumented<JoinHandle<Result<()>>> {
    let span = info_span!("api_server", port);
    tokio::spawn(async move {
        let mut app = Router::new();
        for (path, router) in routes {
            app = app.nest(path, router);
        }
        let app = app.layer(middleware::from_fn_with_state(metrics, track_requests));

        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        info!(%addr, "serving agent api");
        axum::Server::bind(&addr)
            .serve(app.into_make_service())
            .await?;
        Ok(())
    })
    .instrument(span)
}

async fn track_requests<B>(
    State(metrics): State<Arc<CoreMetrics>>,
    request: Request<B>,
    next: Next<B>,
) -> Response {
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_owned())
        .unwrap_or_else(|| request.uri().path().to_owned());

    let response = next.run(request).await;

    metrics
        .api_requests()
        .with_label_values(&[&endpoint, response.status().as_str()])
        .inc();
    response
}
