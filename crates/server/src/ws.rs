//! WebSocket command channel.
//!
//! Clients speak the same command vocabulary as `/control`, as JSON frames:
//! `{"type":"ping"}` keepalives, `{"command":"status"}` for the full player
//! snapshot, and `{"command":"volume","value":40}`-style control messages.

use std::net::SocketAddr;

use axum::extract::connect_info::ConnectInfo;
use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info, warn};
use tunelink::{Command, now_millis};

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
	token: Option<String>,
}

pub async fn handler(
	State(state): State<AppState>,
	Query(query): Query<WsQuery>,
	ConnectInfo(remote): ConnectInfo<SocketAddr>,
	ws: WebSocketUpgrade,
) -> impl IntoResponse {
	let authorized = query.token.as_deref() == Some(state.config.auth_token.as_str());
	ws.on_upgrade(move |socket| serve(socket, state, remote, authorized))
}

async fn serve(mut socket: WebSocket, state: AppState, remote: SocketAddr, authorized: bool) {
	if !authorized {
		warn!(target = "tl.ws", %remote, "rejecting client with a bad token");
		let close = CloseFrame { code: close_code::POLICY, reason: "Unauthorized".into() };
		let _ = socket.send(Message::Close(Some(close))).await;
		return;
	}

	info!(target = "tl.ws", %remote, "client connected");
	state.ws_client_connected();

	let welcome = json!({
		"type": "welcome",
		"message": "connected to the player remote",
		"server": concat!("tunelink ", env!("CARGO_PKG_VERSION")),
		"timestamp": now_millis(),
	});

	if send_json(&mut socket, &welcome).await.is_ok() {
		while let Some(frame) = socket.recv().await {
			let text = match frame {
				Ok(Message::Text(text)) => text,
				Ok(Message::Close(_)) => break,
				Ok(_) => continue,
				Err(err) => {
					debug!(target = "tl.ws", %remote, error = %err, "receive failed");
					break;
				}
			};

			let reply = match serde_json::from_str::<WsRequest>(&text) {
				Ok(request) => dispatch(&state, request).await,
				Err(_) => json!({ "error": "invalid message format" }),
			};

			if send_json(&mut socket, &reply).await.is_err() {
				break;
			}
		}
	}

	info!(target = "tl.ws", %remote, "client disconnected");
	state.ws_client_disconnected();
}

async fn send_json(socket: &mut WebSocket, value: &Value) -> Result<(), axum::Error> {
	socket.send(Message::Text(value.to_string().into())).await
}

/// One inbound frame; `type` is only used for keepalives.
#[derive(Debug, Default, Deserialize)]
pub struct WsRequest {
	#[serde(rename = "type", default)]
	pub kind: Option<String>,
	#[serde(default)]
	pub command: Option<String>,
	#[serde(default)]
	pub value: Option<f64>,
}

/// Maps one frame to its reply. Split from the socket loop so the protocol
/// is testable without an upgrade handshake.
pub async fn dispatch(state: &AppState, request: WsRequest) -> Value {
	if request.kind.as_deref() == Some("ping") {
		return json!({ "type": "pong", "timestamp": now_millis() });
	}

	let Some(name) = request.command else {
		return json!({ "error": "invalid message format" });
	};

	if name == "status" {
		let status = state.controller.query_status().await;
		let mut reply = serde_json::to_value(status).unwrap_or(Value::Null);
		if let Some(fields) = reply.as_object_mut() {
			fields.insert("command".to_string(), json!("status"));
		}
		return reply;
	}

	match Command::parse(&name, request.value) {
		Some(command) => {
			let outcome = state.controller.execute(command).await;
			let mut reply = json!({ "command": name, "success": outcome.success });
			if let Some(detail) = outcome.detail {
				reply["detail"] = json!(detail);
			}
			reply
		}
		None => json!({ "error": "unknown command", "command": name }),
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;
	use std::time::Duration;

	use serde_json::json;
	use tunelink::transport::fake::FakeEndpoint;
	use tunelink::{Controller, ControllerConfig};

	use super::*;
	use crate::config::ServerConfig;

	fn state() -> (AppState, FakeEndpoint) {
		let (connector, endpoint) = FakeEndpoint::pair();
		let controller_config = ControllerConfig { auto_connect: false, ..ControllerConfig::default() };
		let controller = Arc::new(Controller::new(controller_config.clone(), connector));
		let config = ServerConfig {
			bind: "127.0.0.1".parse().unwrap(),
			http_port: 3002,
			auth_token: "secret".to_string(),
			watchdog_interval: Duration::from_secs(300),
			controller: controller_config,
		};
		(AppState::new(controller, Arc::new(config)), endpoint)
	}

	fn frame(text: &str) -> WsRequest {
		serde_json::from_str(text).unwrap()
	}

	#[tokio::test]
	async fn ping_pongs() {
		let (state, _endpoint) = state();
		let reply = dispatch(&state, frame(r#"{"type":"ping"}"#)).await;
		assert_eq!(reply["type"], "pong");
		assert!(reply["timestamp"].as_u64().unwrap() > 0);
	}

	#[tokio::test]
	async fn status_reply_carries_the_command_name() {
		let (state, _endpoint) = state();
		assert!(state.controller.connect().await);
		let reply = dispatch(&state, frame(r#"{"command":"status"}"#)).await;
		assert_eq!(reply["command"], "status");
		assert_eq!(reply["connected"], true);
	}

	#[tokio::test]
	async fn control_commands_round_trip() {
		let (state, endpoint) = state();
		endpoint.enqueue_value(json!({ "success": true }));

		let reply = dispatch(&state, frame(r#"{"command":"volume","value":40}"#)).await;
		assert_eq!(reply["command"], "volume");
		assert_eq!(reply["success"], true);
		assert!(endpoint.evaluated()[0].ends_with("})(0.4)"));
	}

	#[tokio::test]
	async fn failures_carry_detail() {
		let (state, endpoint) = state();
		endpoint.enqueue_value(json!({ "success": false, "message": "next button not found" }));

		let reply = dispatch(&state, frame(r#"{"command":"next"}"#)).await;
		assert_eq!(reply["success"], false);
		assert_eq!(reply["detail"], "next button not found");
	}

	#[tokio::test]
	async fn unknown_commands_are_rejected() {
		let (state, _endpoint) = state();
		let reply = dispatch(&state, frame(r#"{"command":"warp"}"#)).await;
		assert_eq!(reply["error"], "unknown command");
		assert_eq!(reply["command"], "warp");
	}

	#[tokio::test]
	async fn frames_without_a_command_are_rejected() {
		let (state, _endpoint) = state();
		let reply = dispatch(&state, frame(r#"{"value":3}"#)).await;
		assert_eq!(reply["error"], "invalid message format");
	}
}
