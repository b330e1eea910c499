//! Axum-based HTTP API over [`EnergyDataService`]

use crate::hub::Subscription;
use crate::service::EnergyDataService;
use crate::update::RealTimeUpdate;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<EnergyDataService>,
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("APP_VERSION"),
    }))
}

async fn status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.service.connection_status())
}

async fn realtime(State(state): State<AppState>) -> Response {
    match state.service.latest_update() {
        Some(update) => Json(update.as_ref().clone()).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

async fn historical(State(state): State<AppState>, Path(county): Path<String>) -> impl IntoResponse {
    Json(state.service.get_county_historical_data(&county).await)
}

async fn rate(State(state): State<AppState>) -> impl IntoResponse {
    let cents = state.service.residential_rate().await;
    Json(serde_json::json!({ "residential_cents_per_kwh": cents }))
}

async fn get_config_schema() -> impl IntoResponse {
    let schema = schemars::schema_for!(crate::config::Config);
    Json(serde_json::to_value(&schema).unwrap_or(serde_json::json!({"error":"schema"})))
}

enum StreamMessage {
    Update(Arc<RealTimeUpdate>),
    Connection(bool),
}

/// Unsubscribes the SSE client's hub registrations when its stream is dropped
struct SubscriptionGuard(Vec<Subscription>);

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        for sub in self.0.drain(..) {
            sub.unsubscribe();
        }
    }
}

fn to_event(msg: StreamMessage) -> Option<Event> {
    match msg {
        StreamMessage::Update(update) => serde_json::to_string(update.as_ref())
            .ok()
            .map(|payload| Event::default().event("update").data(payload)),
        StreamMessage::Connection(connected) => {
            Some(Event::default().event("connection").data(connected.to_string()))
        }
    }
}

async fn realtime_stream(State(state): State<AppState>) -> impl IntoResponse {
    let (tx, rx) = mpsc::unbounded_channel::<StreamMessage>();

    let data_tx = tx.clone();
    let data_sub = state.service.subscribe_data(move |update| {
        let _ = data_tx.send(StreamMessage::Update(update.clone()));
    });
    let conn_sub = state.service.subscribe_connection_status(move |connected| {
        let _ = tx.send(StreamMessage::Connection(*connected));
    });
    let guard = SubscriptionGuard(vec![data_sub, conn_sub]);

    let stream = UnboundedReceiverStream::new(rx).filter_map(move |msg| {
        let _guard = &guard;
        to_event(msg).map(Ok::<Event, Infallible>)
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/status", get(status))
        .route("/api/realtime", get(realtime))
        .route("/api/realtime/stream", get(realtime_stream))
        .route("/api/historical/{county}", get(historical))
        .route("/api/rate", get(rate))
        .route("/api/config/schema", get(get_config_schema))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

pub async fn serve(service: Arc<EnergyDataService>, host: &str, port: u16) -> anyhow::Result<()> {
    let router = build_router(AppState { service });

    let logger = crate::logging::get_logger("web");
    logger.info(&format!(
        "Starting web server; requested host={}, port={}",
        host, port
    ));

    let addr: SocketAddr = match host.parse::<IpAddr>() {
        Ok(ip) => SocketAddr::new(ip, port),
        Err(_) => {
            logger.warn(&format!("Invalid host '{}'; falling back to 127.0.0.1", host));
            ([127, 0, 0, 1], port).into()
        }
    };

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    logger.info(&format!(
        "Web server listening at http://{}:{} (API /api)",
        local_addr.ip(),
        local_addr.port()
    ));

    axum::serve(listener, router).await?;
    Ok(())
}
