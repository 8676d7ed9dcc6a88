//! HTTP routes of the control surface.

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;
use tunelink::{Command, now_millis};

use crate::state::AppState;
use crate::{auth, net, ws};

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/api", get(api_index))
		.route("/api/status", get(server_status))
		.route("/api/network", get(network_info))
		.route("/api/ip", get(public_ip))
		.route("/config", get(config_summary))
		.route("/status", get(player_status))
		.route("/control", get(control))
		.route("/ws", get(ws::handler))
		.with_state(state)
}

async fn api_index(State(state): State<AppState>) -> Json<Value> {
	Json(json!({
		"name": "tunelink",
		"version": env!("CARGO_PKG_VERSION"),
		"endpoints": {
			"GET /api": "this index",
			"GET /api/status": "server status",
			"GET /api/network": "advertised LAN addresses",
			"GET /api/ip": "public ip lookup",
			"GET /config": "effective configuration",
			"GET /status?token=TOKEN": "player status",
			"GET /control?action=ACTION&value=N&token=TOKEN": "player command",
			"WS /ws?token=TOKEN": "bidirectional command channel",
		},
		"commands": {
			"playback": ["play", "pause", "toggle"],
			"navigation": ["next", "previous"],
			"volume": ["volumeup", "volumedown", "volume?value=N", "mute"],
			"seek": ["seek?value=SECONDS"],
			"likes": ["like", "dislike"],
			"query": ["status"],
		},
		"authentication": {
			"method": "query parameter or Authorization: Bearer header",
			"example": format!("?token={}", state.config.auth_token),
		},
	}))
}

async fn server_status(State(state): State<AppState>) -> Json<Value> {
	Json(json!({
		"status": "running",
		"uptime_secs": state.uptime().as_secs(),
		"clients": state.ws_client_count(),
		"automation": state.controller.lifecycle().status(),
		"timestamp": now_millis(),
	}))
}

async fn network_info(State(state): State<AppState>) -> Json<net::NetworkInfo> {
	Json(net::network_info(state.config.http_port))
}

async fn public_ip(State(state): State<AppState>) -> Json<Value> {
	let ip = net::public_ip(&state.http).await;
	Json(json!({
		"ip": ip,
		"services": net::PUBLIC_IP_SERVICES,
		"timestamp": now_millis(),
	}))
}

async fn config_summary(State(state): State<AppState>) -> Json<Value> {
	let lifecycle = state.controller.lifecycle();
	let session = lifecycle.status();
	let controller = &state.config.controller;
	Json(json!({
		"server": {
			"name": "tunelink",
			"version": env!("CARGO_PKG_VERSION"),
			"bind": state.config.bind,
			"http_port": state.config.http_port,
			"ws_path": "/ws",
		},
		"security": {
			"token": state.config.auth_token,
		},
		"endpoint": {
			"host": controller.endpoint_host,
			"port": controller.endpoint_port,
			"connected": lifecycle.is_connected(),
			"reconnect_attempts": session.attempts,
			"reconnect_exhausted": session.exhausted,
		},
		"features": {
			"auto_connect": controller.auto_connect,
			"watchdog_secs": state.config.watchdog_interval.as_secs(),
			"cache_ms": controller.cache_duration.as_millis() as u64,
		},
	}))
}

#[derive(Debug, Deserialize)]
struct AuthQuery {
	token: Option<String>,
}

async fn player_status(
	State(state): State<AppState>,
	Query(query): Query<AuthQuery>,
	headers: HeaderMap,
) -> Response {
	if !auth::token_matches(&state.config.auth_token, query.token.as_deref(), &headers) {
		return auth::unauthorized(&state.config.auth_token).into_response();
	}
	Json(state.controller.query_status().await).into_response()
}

#[derive(Debug, Deserialize)]
struct ControlParams {
	action: String,
	value: Option<f64>,
	token: Option<String>,
}

async fn control(
	State(state): State<AppState>,
	Query(params): Query<ControlParams>,
	headers: HeaderMap,
) -> Response {
	if !auth::token_matches(&state.config.auth_token, params.token.as_deref(), &headers) {
		return auth::unauthorized(&state.config.auth_token).into_response();
	}

	let Some(command) = Command::parse(&params.action, params.value) else {
		return (
			StatusCode::BAD_REQUEST,
			Json(json!({ "error": "unknown action", "action": params.action })),
		)
			.into_response();
	};

	info!(target = "tl.http", action = %params.action, value = ?params.value, "control command");
	let outcome = state.controller.execute(command).await;

	Json(json!({
		"action": params.action,
		"value": params.value,
		"success": outcome.success,
		"detail": outcome.detail,
		"timestamp": now_millis(),
	}))
	.into_response()
}
