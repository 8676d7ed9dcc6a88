//! DevTools-protocol transport.
//!
//! Connecting means: probe `/json/list` on the debug port for a page target,
//! dial its debugger WebSocket, and enable the `Page` and `Runtime` domains
//! before the session is handed out. One background task writes outbound
//! frames, another correlates replies to pending calls by id; events are not
//! consumed beyond a trace line.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, trace};

use super::{AutomationSession, BoxFuture, Connector};
use crate::error::{Error, Result};

const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, WsMessage>;
type WsSource = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;
type Pending = Arc<Mutex<HashMap<u32, oneshot::Sender<Result<Value>>>>>;

/// One entry of the `/json/list` target inventory.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DebugTarget {
	#[serde(rename = "type")]
	kind: String,
	#[serde(default)]
	title: Option<String>,
	#[serde(default)]
	web_socket_debugger_url: Option<String>,
}

/// Outbound protocol call.
#[derive(Debug, Serialize)]
struct Call<'a> {
	id: u32,
	method: &'a str,
	params: Value,
}

/// Reply to a call, correlated by id.
#[derive(Debug, Deserialize)]
struct Reply {
	id: u32,
	#[serde(default)]
	result: Option<Value>,
	#[serde(default)]
	error: Option<WireError>,
}

#[derive(Debug, Deserialize)]
struct WireError {
	#[serde(default)]
	code: i64,
	message: String,
}

/// Unsolicited event; distinguished from replies by the missing `id`.
#[derive(Debug, Deserialize)]
struct EventFrame {
	method: String,
	#[serde(default)]
	#[allow(dead_code)]
	params: Value,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Incoming {
	Reply(Reply),
	Event(EventFrame),
}

/// Connector for the live debug endpoint.
#[derive(Debug, Default)]
pub struct CdpConnector;

impl CdpConnector {
	pub fn new() -> Self {
		Self
	}

	async fn connect_inner(&self, host: &str, port: u16) -> Result<Arc<dyn AutomationSession>> {
		let ws_url = resolve_page_target(host, port).await?;
		debug!(target = "tl.transport", %ws_url, "attaching to page target");

		let (stream, _) = connect_async(&ws_url)
			.await
			.map_err(|err| Error::Transport(format!("websocket handshake failed: {err}")))?;
		let (sink, source) = stream.split();

		let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
		let (outbound, outbound_rx) = mpsc::unbounded_channel();
		let (closed_tx, closed_rx) = watch::channel(false);

		tokio::spawn(write_loop(sink, outbound_rx));
		tokio::spawn(read_loop(source, Arc::clone(&pending), closed_tx));

		let session = Arc::new(CdpSession { next_id: AtomicU32::new(1), pending, outbound, closed_rx });

		// The page and runtime domains must be live before anyone evaluates.
		session.call("Page.enable", json!({})).await?;
		session.call("Runtime.enable", json!({})).await?;

		Ok(session)
	}
}

impl Connector for CdpConnector {
	fn connect(&self, host: &str, port: u16) -> BoxFuture<'_, Result<Arc<dyn AutomationSession>>> {
		let host = host.to_string();
		Box::pin(async move { self.connect_inner(&host, port).await })
	}
}

/// Resolves the first page target advertising a debugger url.
async fn resolve_page_target(host: &str, port: u16) -> Result<String> {
	let client = reqwest::Client::builder()
		.timeout(PROBE_TIMEOUT)
		.build()
		.map_err(|err| Error::Transport(format!("failed to build probe client: {err}")))?;

	let url = format!("http://{host}:{port}/json/list");
	let response = client.get(&url).send().await.map_err(|err| {
		if err.is_connect() {
			Error::ConnectionRefused { host: host.to_string(), port }
		} else {
			Error::Transport(err.to_string())
		}
	})?;

	if !response.status().is_success() {
		return Err(Error::Transport(format!("unexpected status {} from {url}", response.status())));
	}

	let targets: Vec<DebugTarget> = response
		.json()
		.await
		.map_err(|err| Error::Transport(format!("failed to parse target inventory: {err}")))?;

	pick_page_target(targets)
}

fn pick_page_target(targets: Vec<DebugTarget>) -> Result<String> {
	targets
		.into_iter()
		.find_map(|target| {
			if target.kind != "page" {
				return None;
			}
			if let Some(url) = &target.web_socket_debugger_url {
				trace!(target = "tl.transport", title = target.title.as_deref().unwrap_or(""), "page target candidate");
				return Some(url.clone());
			}
			None
		})
		.ok_or(Error::NoTarget)
}

/// Session over one debugger WebSocket.
pub struct CdpSession {
	next_id: AtomicU32,
	pending: Pending,
	outbound: mpsc::UnboundedSender<WsMessage>,
	closed_rx: watch::Receiver<bool>,
}

impl CdpSession {
	async fn call(&self, method: &str, params: Value) -> Result<Value> {
		let id = self.next_id.fetch_add(1, Ordering::SeqCst);
		let (tx, rx) = oneshot::channel();
		self.pending.lock().insert(id, tx);

		let payload = serde_json::to_string(&Call { id, method, params })?;
		if self.outbound.send(WsMessage::Text(payload.into())).is_err() {
			self.pending.lock().remove(&id);
			return Err(Error::ChannelClosed);
		}

		rx.await.map_err(|_| Error::ChannelClosed)?
	}
}

impl AutomationSession for CdpSession {
	fn evaluate(&self, expression: String) -> BoxFuture<'_, Result<Value>> {
		Box::pin(async move {
			let reply = self
				.call(
					"Runtime.evaluate",
					json!({
						"expression": expression,
						"awaitPromise": true,
						"returnByValue": true,
					}),
				)
				.await?;
			unwrap_evaluation(reply)
		})
	}

	fn closed(&self) -> BoxFuture<'static, ()> {
		let mut closed_rx = self.closed_rx.clone();
		Box::pin(async move {
			let _ = closed_rx.wait_for(|closed| *closed).await;
		})
	}

	fn close(&self) {
		let _ = self.outbound.send(WsMessage::Close(None));
	}
}

async fn write_loop(mut sink: WsSink, mut outbound_rx: mpsc::UnboundedReceiver<WsMessage>) {
	while let Some(message) = outbound_rx.recv().await {
		if sink.send(message).await.is_err() {
			break;
		}
	}
}

async fn read_loop(mut source: WsSource, pending: Pending, closed_tx: watch::Sender<bool>) {
	while let Some(frame) = source.next().await {
		let text = match frame {
			Ok(WsMessage::Text(text)) => text,
			Ok(WsMessage::Close(_)) => break,
			Ok(_) => continue,
			Err(err) => {
				debug!(target = "tl.transport", error = %err, "transport read failed");
				break;
			}
		};

		match serde_json::from_str::<Incoming>(&text) {
			Ok(Incoming::Reply(reply)) => dispatch_reply(&pending, reply),
			Ok(Incoming::Event(event)) => {
				trace!(target = "tl.transport", method = %event.method, "endpoint event");
			}
			Err(err) => {
				debug!(target = "tl.transport", error = %err, "unparseable frame");
			}
		}
	}

	let _ = closed_tx.send(true);

	// Nothing else will answer; fail every caller still waiting.
	let mut pending = pending.lock();
	for (_, tx) in pending.drain() {
		let _ = tx.send(Err(Error::ChannelClosed));
	}
}

fn dispatch_reply(pending: &Pending, reply: Reply) {
	let Some(tx) = pending.lock().remove(&reply.id) else {
		debug!(target = "tl.transport", id = reply.id, "reply without a pending call");
		return;
	};

	let result = match reply.error {
		Some(error) => Err(Error::Protocol(format!("{} (code {})", error.message, error.code))),
		None => Ok(reply.result.unwrap_or(Value::Null)),
	};
	let _ = tx.send(result);
}

/// Pulls the plain value out of a `Runtime.evaluate` reply, surfacing a
/// thrown exception as an evaluation error.
fn unwrap_evaluation(reply: Value) -> Result<Value> {
	if let Some(details) = reply.get("exceptionDetails") {
		let description = details
			.pointer("/exception/description")
			.and_then(Value::as_str)
			.or_else(|| details.get("text").and_then(Value::as_str))
			.unwrap_or("remote evaluation threw");
		return Err(Error::Eval(description.to_string()));
	}
	Ok(reply.pointer("/result/value").cloned().unwrap_or(Value::Null))
}
