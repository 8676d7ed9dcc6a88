//! Abstract control commands, their wire names, and value clamping.

use serde::Serialize;

/// A single-shot control request.
///
/// Commands are immutable and own no resources; `status` is a query rather
/// than a command and is dispatched separately by callers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
	PlaybackToggle,
	NextTrack,
	PreviousTrack,
	Like,
	Dislike,
	MuteToggle,
	/// Absolute volume in percent; clamped to `[0, 100]`.
	SetVolume(f64),
	/// Relative volume step in percent points.
	ChangeVolume(f64),
	/// Absolute playback position in seconds; clamped to the track bounds.
	Seek(f64),
}

impl Command {
	/// Parses the wire action names accepted over HTTP and WebSocket.
	///
	/// `play`/`pause` both map to the toggle: the player exposes a single
	/// transport control, so the distinction lives in the page, not here.
	pub fn parse(action: &str, value: Option<f64>) -> Option<Self> {
		match action {
			"play" | "pause" | "toggle" => Some(Self::PlaybackToggle),
			"next" => Some(Self::NextTrack),
			"previous" | "prev" => Some(Self::PreviousTrack),
			"like" => Some(Self::Like),
			"dislike" => Some(Self::Dislike),
			"mute" => Some(Self::MuteToggle),
			"volumeup" => Some(Self::ChangeVolume(10.0)),
			"volumedown" => Some(Self::ChangeVolume(-10.0)),
			"volume" => Some(Self::SetVolume(value.unwrap_or(50.0))),
			"seek" => Some(Self::Seek(value.unwrap_or(0.0))),
			_ => None,
		}
	}
}

/// Result of an action command.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandOutcome {
	pub success: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub detail: Option<String>,
}

impl CommandOutcome {
	pub fn ok() -> Self {
		Self { success: true, detail: None }
	}

	pub fn ok_with(detail: impl Into<String>) -> Self {
		Self { success: true, detail: Some(detail.into()) }
	}

	pub fn failed(detail: impl Into<String>) -> Self {
		Self { success: false, detail: Some(detail.into()) }
	}
}

/// Clamps a volume percentage to `[0, 100]`.
pub fn clamp_percent(percent: f64) -> f64 {
	percent.clamp(0.0, 100.0)
}

/// Clamps a seek target to `[0, max]` seconds.
pub fn clamp_seek(target: f64, max: f64) -> f64 {
	target.clamp(0.0, max.max(0.0))
}
