//! Network reporting: the LAN address clients should dial and the public IP
//! for anyone forwarding ports.

use std::net::IpAddr;
use std::time::Duration;

use serde::Serialize;
use tracing::debug;

const PUBLIC_IP_TIMEOUT: Duration = Duration::from_secs(3);

/// Plain-text echo services, tried in order; first non-empty answer wins.
pub const PUBLIC_IP_SERVICES: [&str; 4] = [
	"https://api.ipify.org",
	"https://api64.ipify.org",
	"https://checkip.amazonaws.com",
	"https://ifconfig.me/ip",
];

#[derive(Debug, Clone, Serialize)]
pub struct NetworkInfo {
	pub local_ip: Option<IpAddr>,
	pub http_url: Option<String>,
	pub ws_url: Option<String>,
}

/// Advertised addresses for the given listen port.
pub fn network_info(port: u16) -> NetworkInfo {
	let local_ip = detect_local_ip();
	let (http_url, ws_url) = match local_ip {
		Some(ip) => {
			let (http, ws) = advertised_urls(ip, port);
			(Some(http), Some(ws))
		}
		None => (None, None),
	};
	NetworkInfo { local_ip, http_url, ws_url }
}

pub fn advertised_urls(ip: IpAddr, port: u16) -> (String, String) {
	match ip {
		IpAddr::V4(_) => (format!("http://{ip}:{port}"), format!("ws://{ip}:{port}/ws")),
		IpAddr::V6(_) => (format!("http://[{ip}]:{port}"), format!("ws://[{ip}]:{port}/ws")),
	}
}

/// Routing-table trick: connecting a UDP socket picks the outbound
/// interface without sending a packet.
pub fn detect_local_ip() -> Option<IpAddr> {
	let socket = std::net::UdpSocket::bind(("0.0.0.0", 0)).ok()?;
	socket.connect(("8.8.8.8", 80)).ok()?;
	let ip = socket.local_addr().ok()?.ip();
	if ip.is_loopback() || ip.is_unspecified() { None } else { Some(ip) }
}

/// Resolves the public IP, or `None` when every service fails.
pub async fn public_ip(client: &reqwest::Client) -> Option<String> {
	for service in PUBLIC_IP_SERVICES {
		let response = match client.get(service).timeout(PUBLIC_IP_TIMEOUT).send().await {
			Ok(response) => response,
			Err(err) => {
				debug!(target = "tl.net", service, error = %err, "public ip lookup failed");
				continue;
			}
		};

		if !response.status().is_success() {
			debug!(target = "tl.net", service, status = %response.status(), "public ip lookup rejected");
			continue;
		}

		if let Ok(body) = response.text().await {
			let trimmed = body.trim();
			if !trimmed.is_empty() {
				return Some(trimmed.to_string());
			}
		}
	}
	None
}
