//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo for async handling. One task per
//! connection; the shared state rides an Arc.

use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::config::Args;
use crate::db::MongoClient;
use crate::ledger::{ActivityRecorder, AggregationService, LedgerStore};
use crate::routes::{self, cors_preflight, not_found_response, BoxBody};
use crate::types::LedgerError;

/// Shared application state
pub struct AppState {
    pub args: Args,
    /// Present when MongoDB is connected; None in dev-mode memory fallback
    pub mongo: Option<MongoClient>,
    /// Sole writer of the ledger
    pub recorder: ActivityRecorder,
    /// Read-side queries over the same ledger
    pub aggregator: AggregationService,
}

impl AppState {
    /// Wire the reward engine over the given ledger store
    pub fn new(args: Args, mongo: Option<MongoClient>, store: Arc<dyn LedgerStore>) -> Self {
        let recorder = ActivityRecorder::new(
            Arc::clone(&store),
            args.reward_rates(),
            args.daily_caps(),
            args.day_policy(),
        );
        let aggregator = AggregationService::new(store, args.daily_caps(), args.day_policy());

        Self {
            args,
            mongo,
            recorder,
            aggregator,
        }
    }
}

/// Start the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<(), LedgerError> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!("FitLedger listening on {}", state.args.listen);

    if state.args.dev_mode {
        warn!("Development mode enabled");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<BoxBody>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    info!("[{}] {} {}", addr, method, path);

    // Auth routes consume the request
    if path.starts_with("/auth") {
        if let Some(response) = routes::handle_auth_request(req, Arc::clone(&state)).await {
            return Ok(response);
        }
        return Ok(not_found_response(&path));
    }

    // CORS preflight for everything else
    if method == Method::OPTIONS {
        return Ok(cors_preflight());
    }

    if path.starts_with("/activity") {
        if let Some(response) = routes::handle_activity_request(req, Arc::clone(&state)).await {
            return Ok(response);
        }
        return Ok(not_found_response(&path));
    }

    if path.starts_with("/assets") {
        if let Some(response) = routes::handle_asset_request(req, Arc::clone(&state)).await {
            return Ok(response);
        }
        return Ok(not_found_response(&path));
    }

    if path.starts_with("/user") {
        if let Some(response) = routes::handle_user_request(req, Arc::clone(&state)).await {
            return Ok(response);
        }
        return Ok(not_found_response(&path));
    }

    let response = match (method, path.as_str()) {
        (Method::GET, "/health") | (Method::GET, "/healthz") => routes::health_check(&state),
        _ => not_found_response(&path),
    };

    Ok(response)
}
