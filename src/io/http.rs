//! Board HTTP API
//!
//! Serves the reconstructed progress of one patient as JSON. Uses hyper for
//! the HTTP server.
//!
//! Routes:
//! - `GET /health`
//! - `GET /branches` - branches and pathways to pick from
//! - `GET /progress?branch=kbj&pathway=pol&id=A001`
//! - `GET /metrics` - Prometheus text format

use crate::domain::types::ProgressRow;
use crate::infra::config::{is_valid_code, Config};
use crate::infra::metrics::Metrics;
use crate::io::event_store::{EventSource, EventStoreError, ScanQuery};
use crate::io::notification::{Banners, NotificationBoard};
use crate::io::prometheus::format_prometheus_metrics;
use crate::services::reconstruct;
use bytes::Bytes;
use http_body_util::Full;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, LazyLock};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info, warn};
use url::form_urlencoded;

/// Clock format for entry/exit times on the board
const CLOCK_FORMAT: &str = "%H:%M:%S";

static QUEUE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z][0-9]{3}$").expect("queue id pattern is valid"));

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("unknown branch '{0}'")]
    InvalidBranch(String),

    #[error("unknown pathway '{0}'")]
    InvalidPathway(String),

    #[error("invalid queue number '{0}'")]
    InvalidQueueId(String),

    #[error(transparent)]
    Store(#[from] EventStoreError),

    #[error("failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("scan lookup task failed: {0}")]
    Worker(String),
}

impl RequestError {
    pub fn status(&self) -> StatusCode {
        match self {
            RequestError::InvalidBranch(_)
            | RequestError::InvalidPathway(_)
            | RequestError::InvalidQueueId(_) => StatusCode::BAD_REQUEST,
            RequestError::Store(_) | RequestError::Encode(_) | RequestError::Worker(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn code(&self) -> &'static str {
        match self {
            RequestError::InvalidBranch(_) => "invalid_branch",
            RequestError::InvalidPathway(_) => "invalid_pathway",
            RequestError::InvalidQueueId(_) => "invalid_id",
            RequestError::Store(_) | RequestError::Encode(_) | RequestError::Worker(_) => {
                "internal"
            }
        }
    }
}

/// Upper-case a queue number and check it is one letter and three digits
pub fn sanitize_queue_id(raw: &str) -> Result<String, RequestError> {
    let id = raw.trim().to_uppercase();
    if QUEUE_ID.is_match(&id) {
        Ok(id)
    } else {
        Err(RequestError::InvalidQueueId(raw.to_string()))
    }
}

/// Decode a form-urlencoded query string into key/value pairs
fn parse_query(query: Option<&str>) -> HashMap<String, String> {
    form_urlencoded::parse(query.unwrap_or_default().as_bytes()).into_owned().collect()
}

/// Shared state for request handlers
pub struct BoardState {
    config: Config,
    store: Arc<dyn EventSource>,
    notifications: NotificationBoard,
    metrics: Arc<Metrics>,
}

impl BoardState {
    pub fn new(config: Config, store: Arc<dyn EventSource>, metrics: Arc<Metrics>) -> Self {
        let notifications = NotificationBoard::new(config.notification_file());
        Self { config, store, notifications, metrics }
    }
}

#[derive(Debug, Serialize)]
struct RowView {
    name: String,
    entry: Option<String>,
    exit: Option<String>,
    active: bool,
}

impl From<&ProgressRow> for RowView {
    fn from(row: &ProgressRow) -> Self {
        Self {
            name: row.display_name.clone(),
            entry: row.entry_time.map(|t| t.format(CLOCK_FORMAT).to_string()),
            exit: row.exit_time.map(|t| t.format(CLOCK_FORMAT).to_string()),
            active: row.active,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum ProgressView {
    Ok {
        branch: String,
        id: String,
        pathway: String,
        rows: Vec<RowView>,
        notifications: Banners,
        last_updated: String,
    },
    NoData {
        id: String,
        pathway: String,
        message: String,
    },
}

#[derive(Debug, Serialize)]
struct CodeName<'a> {
    code: &'a str,
    name: &'a str,
}

fn branches_json(config: &Config) -> String {
    let branches: Vec<CodeName<'_>> =
        config.branches().iter().map(|b| CodeName { code: &b.code, name: &b.name }).collect();
    let pathways: Vec<CodeName<'_>> = config
        .catalog()
        .pathways()
        .iter()
        .map(|p| CodeName { code: p.code(), name: p.name() })
        .collect();
    serde_json::json!({ "branches": branches, "pathways": pathways }).to_string()
}

/// Validate a progress request, fetch its scans and reconstruct the rows
async fn progress_view(
    state: &BoardState,
    branch_code: &str,
    pathway_code: &str,
    raw_id: &str,
) -> Result<ProgressView, RequestError> {
    let branch = state
        .config
        .branch(branch_code)
        .ok_or_else(|| RequestError::InvalidBranch(branch_code.to_string()))?;
    let pathway = is_valid_code(pathway_code)
        .then(|| state.config.catalog().pathway(pathway_code))
        .flatten()
        .ok_or_else(|| RequestError::InvalidPathway(pathway_code.to_string()))?;
    let id = sanitize_queue_id(raw_id)?;

    let query = ScanQuery {
        branch_id: branch.id.clone(),
        patient_id: id.clone(),
        date: state.config.query_date(),
    };
    let store = state.store.clone();
    let batch = tokio::task::spawn_blocking(move || store.scans(&query))
        .await
        .map_err(|e| RequestError::Worker(e.to_string()))??;
    state.metrics.record_scans_skipped(batch.skipped);

    let rows = reconstruct(&batch.events, pathway);
    if rows.is_empty() {
        info!(branch = %branch.code, pathway = %pathway.code(), id = %id, "progress_no_data");
        return Ok(ProgressView::NoData {
            message: format!("Data pasien {id} untuk {} tidak tersedia", pathway.name()),
            id,
            pathway: pathway.name().to_string(),
        });
    }

    let queue_letter = &id[..1];
    let notifications = state.notifications.banners(&branch.code, queue_letter);

    info!(
        branch = %branch.code,
        pathway = %pathway.code(),
        id = %id,
        rows = %rows.len(),
        "progress_served"
    );

    Ok(ProgressView::Ok {
        branch: branch.name.clone(),
        id,
        pathway: pathway.name().to_string(),
        rows: rows.iter().map(RowView::from).collect(),
        notifications,
        last_updated: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
    })
}

/// Serve a progress request as a JSON body, counting the outcome
async fn progress_body(
    state: &BoardState,
    params: &HashMap<String, String>,
) -> Result<String, RequestError> {
    let param = |key: &str| params.get(key).map(String::as_str).unwrap_or_default();
    let view = progress_view(state, param("branch"), param("pathway"), param("id")).await?;
    let body = serde_json::to_string(&view)?;

    match &view {
        ProgressView::Ok { .. } => state.metrics.record_progress_served(),
        ProgressView::NoData { .. } => state.metrics.record_no_data(),
    }
    Ok(body)
}

fn error_response(state: &BoardState, e: &RequestError) -> Response<Full<Bytes>> {
    let status = e.status();
    if status.is_server_error() {
        state.metrics.record_server_error();
        error!(error = %e, "progress_failed");
    } else {
        state.metrics.record_rejected();
        warn!(error = %e, "progress_rejected");
    }
    let body = serde_json::json!({ "error": e.code(), "message": e.to_string() });
    json_response(status, body.to_string())
}

fn json_response(status: StatusCode, body: String) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body)))
        .expect("static response should not fail")
}

/// Handle HTTP requests
async fn handle_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<BoardState>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    state.metrics.record_request();

    match (req.method(), req.uri().path()) {
        (&Method::GET, "/health") => Ok(Response::builder()
            .status(StatusCode::OK)
            .body(Full::new(Bytes::from("ok")))
            .expect("static response should not fail")),
        (&Method::GET, "/branches") => Ok(json_response(StatusCode::OK, branches_json(&state.config))),
        (&Method::GET, "/progress") => {
            let params = parse_query(req.uri().query());
            match progress_body(&state, &params).await {
                Ok(body) => Ok(json_response(StatusCode::OK, body)),
                Err(e) => Ok(error_response(&state, &e)),
            }
        }
        (&Method::GET, "/metrics") => {
            let body = format_prometheus_metrics(&state.metrics.snapshot());
            Ok(Response::builder()
                .status(StatusCode::OK)
                .header("Content-Type", "text/plain; version=0.0.4; charset=utf-8")
                .body(Full::new(Bytes::from(body)))
                .expect("static response should not fail"))
        }
        _ => Ok(Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Full::new(Bytes::from("Not Found")))
            .expect("static response should not fail")),
    }
}

/// Start the board HTTP server on the configured address
pub async fn start_board_server(
    state: Arc<BoardState>,
    shutdown: watch::Receiver<bool>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr: SocketAddr =
        format!("{}:{}", state.config.bind_address(), state.config.port()).parse()?;
    let listener = TcpListener::bind(addr).await?;

    info!(addr = %addr, "board_server_started");
    serve_board(listener, state, shutdown).await;
    Ok(())
}

/// Accept connections until the shutdown flag flips to true
pub async fn serve_board(
    listener: TcpListener,
    state: Arc<BoardState>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, _addr)) => {
                        let io = TokioIo::new(stream);
                        let state = state.clone();

                        tokio::spawn(async move {
                            let service = service_fn(move |req| {
                                let state = state.clone();
                                async move { handle_request(req, state).await }
                            });

                            if let Err(e) = http1::Builder::new()
                                .serve_connection(io, service)
                                .await
                            {
                                error!(error = %e, "board_http_error");
                            }
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "board_accept_error");
                    }
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    info!("board_server_shutdown");
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::ScanEvent;
    use crate::io::event_store::MemoryEventStore;
    use chrono::NaiveDate;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 4, 18).unwrap()
    }

    fn state_with(store: MemoryEventStore) -> BoardState {
        let config = Config::default()
            .with_fixed_date(date())
            .with_notification_file("/nonexistent/notification.json");
        BoardState::new(config, Arc::new(store), Arc::new(Metrics::new()))
    }

    fn at(h: u32, m: u32) -> chrono::NaiveDateTime {
        date().and_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_sanitize_queue_id() {
        assert_eq!(sanitize_queue_id("a001").unwrap(), "A001");
        assert_eq!(sanitize_queue_id(" B123 ").unwrap(), "B123");
        assert!(sanitize_queue_id("AA01").is_err());
        assert!(sanitize_queue_id("A0001").is_err());
        assert!(sanitize_queue_id("").is_err());
    }

    #[test]
    fn test_parse_query() {
        let params = parse_query(Some("branch=kbj&pathway=pol&id=A001&junk"));
        assert_eq!(params.get("branch").map(String::as_str), Some("kbj"));
        assert_eq!(params.get("id").map(String::as_str), Some("A001"));
        assert!(parse_query(None).is_empty());
    }

    #[test]
    fn test_parse_query_decodes_escapes() {
        let params = parse_query(Some("branch=kbj&pathway=pol&id=A%30%30%31"));
        assert_eq!(params.get("id").map(String::as_str), Some("A001"));

        let params = parse_query(Some("id=+a001&pathway=p%6Fl"));
        assert_eq!(params.get("id").map(String::as_str), Some(" a001"));
        assert_eq!(params.get("pathway").map(String::as_str), Some("pol"));
    }

    #[tokio::test]
    async fn test_progress_body_accepts_encoded_id() {
        let store =
            MemoryEventStore::new().with_scan("1", "A001", ScanEvent::enter("RM", at(8, 0)));
        let state = state_with(store);

        let queries = ["branch=kbj&pathway=pol&id=A%30%30%31", "branch=kbj&pathway=pol&id=+a001"];
        for query in queries {
            let body = progress_body(&state, &parse_query(Some(query))).await.unwrap();
            let json: serde_json::Value = serde_json::from_str(&body).unwrap();
            assert_eq!(json["status"], "ok");
            assert_eq!(json["id"], "A001");
        }
        assert_eq!(state.metrics.snapshot().progress_served, 2);
    }

    #[test]
    fn test_encode_failure_is_a_server_error() {
        let state = state_with(MemoryEventStore::new());
        let err: RequestError = serde_json::from_str::<serde_json::Value>("{").unwrap_err().into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = error_response(&state, &err);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(state.metrics.snapshot().server_errors, 1);
        assert_eq!(state.metrics.snapshot().requests_rejected, 0);
    }

    #[test]
    fn test_request_error_status() {
        assert_eq!(RequestError::InvalidBranch("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(RequestError::Worker("x".into()).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_progress_view_rows() {
        let store = MemoryEventStore::new()
            .with_scan("1", "A001", ScanEvent::enter("RM", at(8, 0)))
            .with_scan("1", "A001", ScanEvent::exit("RM", at(8, 10)))
            .with_scan("1", "A001", ScanEvent::enter("REF", at(8, 20)));
        let state = state_with(store);

        let view = progress_view(&state, "kbj", "pol", "a001").await.unwrap();
        let json = serde_json::to_value(&view).unwrap();

        assert_eq!(json["status"], "ok");
        assert_eq!(json["branch"], "Kebon Jeruk");
        assert_eq!(json["id"], "A001");
        assert_eq!(json["rows"][0]["name"], "Rekam Medik");
        assert_eq!(json["rows"][0]["entry"], "08:00:00");
        assert_eq!(json["rows"][0]["exit"], "08:10:00");
        assert_eq!(json["rows"][0]["active"], false);
        assert_eq!(json["rows"][1]["name"], "Refraksi");
        assert!(json["rows"][1]["exit"].is_null());
        assert_eq!(json["rows"][1]["active"], true);
    }

    #[tokio::test]
    async fn test_progress_view_no_data_for_pathway() {
        let store =
            MemoryEventStore::new().with_scan("1", "A001", ScanEvent::enter("RM", at(8, 0)));
        let state = state_with(store);

        let view = progress_view(&state, "kbj", "opr", "A001").await.unwrap();
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["status"], "no_data");
        assert_eq!(json["message"], "Data pasien A001 untuk Operasi tidak tersedia");
    }

    #[tokio::test]
    async fn test_progress_view_rejects_bad_input() {
        let state = state_with(MemoryEventStore::new());

        let err = progress_view(&state, "xyz", "pol", "A001").await.unwrap_err();
        assert!(matches!(err, RequestError::InvalidBranch(_)));

        let err = progress_view(&state, "kbj", "abc", "A001").await.unwrap_err();
        assert!(matches!(err, RequestError::InvalidPathway(_)));

        let err = progress_view(&state, "kbj", "pol", "1234").await.unwrap_err();
        assert!(matches!(err, RequestError::InvalidQueueId(_)));
    }

    async fn get(addr: SocketAddr, path: &str) -> (u16, String) {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let request =
            format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
        stream.write_all(request.as_bytes()).await.unwrap();

        let mut raw = String::new();
        stream.read_to_string(&mut raw).await.unwrap();
        let status = raw.split_whitespace().nth(1).unwrap().parse().unwrap();
        let body = raw.split_once("\r\n\r\n").map(|(_, b)| b.to_string()).unwrap_or_default();
        (status, body)
    }

    #[tokio::test]
    async fn test_board_server_routes() {
        let store =
            MemoryEventStore::new().with_scan("1", "A001", ScanEvent::enter("RM", at(8, 0)));
        let state = Arc::new(state_with(store));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let server = tokio::spawn(serve_board(listener, state, shutdown_rx));

        let (status, body) = get(addr, "/health").await;
        assert_eq!((status, body.as_str()), (200, "ok"));

        let (status, body) = get(addr, "/branches").await;
        assert_eq!(status, 200);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["branches"][0]["code"], "kbj");

        let (status, body) = get(addr, "/progress?branch=kbj&pathway=pol&id=A%30%30%31").await;
        assert_eq!(status, 200);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["rows"][0]["name"], "Rekam Medik");
        assert_eq!(json["rows"][0]["active"], true);

        let (status, body) = get(addr, "/progress?branch=kbj&pathway=pol&id=ZZ").await;
        assert_eq!(status, 400);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["error"], "invalid_id");

        let (status, _) = get(addr, "/nowhere").await;
        assert_eq!(status, 404);

        let (status, body) = get(addr, "/metrics").await;
        assert_eq!(status, 200);
        assert!(body.contains("flow_board_requests_total 6"));
        assert!(body.contains("flow_board_progress_served_total 1"));
        assert!(body.contains("flow_board_rejected_total 1"));

        shutdown_tx.send(true).unwrap();
        server.await.unwrap();
    }

    #[test]
    fn test_branches_json() {
        let json: serde_json::Value =
            serde_json::from_str(&branches_json(&Config::default())).unwrap();
        assert_eq!(json["branches"][0]["code"], "kbj");
        assert_eq!(json["pathways"].as_array().unwrap().len(), 2);
    }
}
