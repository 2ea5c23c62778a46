//! Statistics endpoint.
//!
//! `/scatter` returns the text report, `/scatter.json` the raw snapshot
//! and `/metrics` the OpenMetrics rendering.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use shardgate_config::General;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info};

use super::{report, ScatterStatsMetrics};
use crate::frontend::Executor;

fn response(status: StatusCode, content_type: &str, body: String) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header(hyper::header::CONTENT_TYPE, content_type)
        .body(Full::new(Bytes::from(body)))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::from("Stats unavailable"))))
}

/// Serve one request.
pub async fn stats<B>(
    request: Request<B>,
    executor: Arc<Executor>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let snapshot = match executor.gather_stats() {
        Ok(snapshot) => snapshot,
        Err(err) => {
            error!("scatter stats unavailable: {}", err);
            return Ok(response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "text/plain; charset=utf-8",
                err.to_string(),
            ));
        }
    };

    let response = match request.uri().path() {
        "/scatter" | "/debug/scatter" => response(
            StatusCode::OK,
            "text/plain; charset=utf-8",
            report::render(&snapshot),
        ),

        "/scatter.json" => match serde_json::to_string(&snapshot) {
            Ok(json) => response(StatusCode::OK, "application/json", json),
            Err(err) => response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "text/plain; charset=utf-8",
                err.to_string(),
            ),
        },

        "/metrics" => {
            let metrics: Vec<_> = ScatterStatsMetrics::load(&snapshot)
                .into_iter()
                .map(|m| m.to_string())
                .collect();
            response(
                StatusCode::OK,
                "text/plain; version=0.0.4; charset=utf-8",
                metrics.join("\n"),
            )
        }

        _ => response(
            StatusCode::NOT_FOUND,
            "text/plain; charset=utf-8",
            "Not found".into(),
        ),
    };

    Ok(response)
}

/// Serve stats on an already bound listener.
pub async fn serve(listener: TcpListener, executor: Arc<Executor>) -> std::io::Result<()> {
    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let executor = executor.clone();

        tokio::task::spawn(async move {
            if let Err(err) = http1::Builder::new()
                .serve_connection(
                    io,
                    service_fn(move |request| stats(request, executor.clone())),
                )
                .await
            {
                error!("stats endpoint error: {:?}", err);
            }
        });
    }
}

pub async fn server(port: u16, executor: Arc<Executor>) -> std::io::Result<()> {
    info!("scatter stats endpoint http://0.0.0.0:{}/scatter", port);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    serve(listener, executor).await
}

/// Start the stats endpoint in the background, if a port is configured.
pub fn launch(
    general: &General,
    executor: Arc<Executor>,
) -> Option<JoinHandle<std::io::Result<()>>> {
    let port = general.stats_port?;
    Some(tokio::spawn(server(port, executor)))
}
