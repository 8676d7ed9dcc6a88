//! Expression builders for the player page.
//!
//! Commands never splice raw strings into expressions: selectors and values
//! are typed on this side and serialized with `serde_json` at the last
//! moment, so anything reaching the page is a proper JS literal. Every
//! expression evaluates to a plain object with a `success` flag, mirroring
//! what the queries deserialize on the way back.

use serde_json::Value;

/// DOM hooks for the player bar, keyed off the app's stable `data-test-id`
/// attributes. Injectable so selector drift in a new player build is a
/// config change, not a code change.
#[derive(Debug, Clone)]
pub struct Selectors {
	pub play_button: String,
	pub pause_button: String,
	pub next_button: String,
	pub prev_button: String,
	pub like_button: String,
	pub dislike_button: String,
	pub mute_button: String,
	pub volume_slider: String,
	pub track_title: String,
	pub artist_name: String,
	pub cover_image: String,
	pub current_time: String,
	pub total_time: String,
	pub progress_slider: String,
	/// aria-label substring the volume button carries while muted.
	pub muted_hint: String,
}

impl Default for Selectors {
	fn default() -> Self {
		Self {
			play_button: r#"[data-test-id="PLAY_BUTTON"]"#.to_string(),
			pause_button: r#"[data-test-id="PAUSE_BUTTON"]"#.to_string(),
			next_button: r#"[data-test-id="NEXT_TRACK_BUTTON"]"#.to_string(),
			prev_button: r#"[data-test-id="PREVIOUS_TRACK_BUTTON"]"#.to_string(),
			like_button: r#"[data-test-id="LIKE_BUTTON"]"#.to_string(),
			dislike_button: r#"[data-test-id="DISLIKE_BUTTON"]"#.to_string(),
			mute_button: r#"button[data-test-id="CHANGE_VOLUME_BUTTON"]"#.to_string(),
			volume_slider: r#"input[data-test-id="CHANGE_VOLUME_SLIDER"]"#.to_string(),
			track_title: r#"[data-test-id="TRACK_TITLE"] .Meta_title__GGBnH"#.to_string(),
			artist_name: r#"[data-test-id="SEPARATED_ARTIST_TITLE"] .Meta_artistCaption__JESZi"#.to_string(),
			cover_image: "img.PlayerBarDesktopWithBackgroundProgressBar_cover__MKmEt".to_string(),
			current_time: r#"[data-test-id="TIMECODE_TIME_START"]"#.to_string(),
			total_time: r#"[data-test-id="TIMECODE_TIME_END"]"#.to_string(),
			progress_slider: r#"[data-test-id="TIMECODE_SLIDER"]"#.to_string(),
			muted_hint: "Включить звук".to_string(),
		}
	}
}

fn js_str(value: &str) -> String {
	serde_json::to_string(value).expect("strings always serialize")
}

fn js_num(value: f64) -> String {
	serde_json::to_string(&Value::from(value)).expect("finite numbers always serialize")
}

/// Clicks a single control, reporting `<control> not found` when absent.
pub fn click(selector: &str, control: &str) -> String {
	format!(
		r#"(function() {{
	try {{
		const el = document.querySelector({sel});
		if (el) {{
			el.click();
			return {{ success: true }};
		}}
		return {{ success: false, message: {missing} }};
	}} catch (err) {{
		return {{ success: false, message: 'Error: ' + err.message }};
	}}
}})()"#,
		sel = js_str(selector),
		missing = js_str(&format!("{control} not found")),
	)
}

/// Prefers the pause control, falls back to play, fails when neither exists.
pub fn toggle_playback(selectors: &Selectors) -> String {
	format!(
		r#"(function() {{
	try {{
		const pauseBtn = document.querySelector({pause});
		if (pauseBtn) {{
			pauseBtn.click();
			return {{ success: true, action: 'pause' }};
		}}
		const playBtn = document.querySelector({play});
		if (playBtn) {{
			playBtn.click();
			return {{ success: true, action: 'play' }};
		}}
		return {{ success: false, message: 'playback controls not found' }};
	}} catch (err) {{
		return {{ success: false, message: 'Error: ' + err.message }};
	}}
}})()"#,
		pause = js_str(&selectors.pause_button),
		play = js_str(&selectors.play_button),
	)
}

/// Sets a range control and dispatches the `input`/`change` pair the player
/// UI listens for; assigning `value` alone does not trigger its handlers.
pub fn set_slider(selector: &str, control: &str, value: f64) -> String {
	format!(
		r#"(function(value) {{
	try {{
		const slider = document.querySelector({sel});
		if (slider) {{
			slider.value = value;
			slider.dispatchEvent(new Event('input', {{ bubbles: true }}));
			slider.dispatchEvent(new Event('change', {{ bubbles: true }}));
			return {{ success: true }};
		}}
		return {{ success: false, message: {missing} }};
	}} catch (err) {{
		return {{ success: false, message: 'Error: ' + err.message }};
	}}
}})({value})"#,
		sel = js_str(selector),
		missing = js_str(&format!("{control} not found")),
		value = js_num(value),
	)
}

/// Reads title, artist, and cover art, upgrading the thumbnail URL to the
/// 400px variant the app also serves.
pub fn read_track_info(selectors: &Selectors) -> String {
	format!(
		r#"(function() {{
	try {{
		const titleElem = document.querySelector({title});
		const artistElem = document.querySelector({artist});
		const coverElem = document.querySelector({cover});
		if (!titleElem || !artistElem) {{
			return {{ success: false, message: 'track metadata not found' }};
		}}
		let coverUrl = coverElem ? coverElem.src : null;
		if (coverUrl && coverUrl.includes('/100x100')) {{
			coverUrl = coverUrl.replace('/100x100', '/400x400');
		}}
		return {{
			success: true,
			title: titleElem.textContent.trim(),
			artist: artistElem.textContent.trim(),
			coverUrl: coverUrl
		}};
	}} catch (err) {{
		return {{ success: false, message: 'Error: ' + err.message }};
	}}
}})()"#,
		title = js_str(&selectors.track_title),
		artist = js_str(&selectors.artist_name),
		cover = js_str(&selectors.cover_image),
	)
}

/// Reads the timecode labels and the progress slider position.
pub fn read_track_time(selectors: &Selectors) -> String {
	format!(
		r#"(function() {{
	try {{
		const currentElem = document.querySelector({current});
		const totalElem = document.querySelector({total});
		const slider = document.querySelector({slider});
		if (!currentElem || !totalElem || !slider) {{
			return {{ success: false, message: 'timecode controls not found' }};
		}}
		const progress = parseFloat(slider.value) || 0;
		const max = parseFloat(slider.max) || 100;
		return {{
			success: true,
			currentTime: currentElem.textContent.trim(),
			totalTime: totalElem.textContent.trim(),
			progress: progress,
			max: max,
			percent: max > 0 ? (progress / max) * 100 : 0
		}};
	}} catch (err) {{
		return {{ success: false, message: 'Error: ' + err.message }};
	}}
}})()"#,
		current = js_str(&selectors.current_time),
		total = js_str(&selectors.total_time),
		slider = js_str(&selectors.progress_slider),
	)
}

/// Reads the volume slider; the mute button's aria-label disambiguates an
/// actual mute from volume simply being zero.
pub fn read_volume(selectors: &Selectors) -> String {
	format!(
		r#"(function() {{
	try {{
		const slider = document.querySelector({slider});
		const muteBtn = document.querySelector({mute});
		if (!slider) {{
			return {{ success: false, message: 'volume slider not found' }};
		}}
		const volume = parseFloat(slider.value) || 0;
		let isMuted = volume === 0;
		if (muteBtn) {{
			const ariaLabel = muteBtn.getAttribute('aria-label');
			if (ariaLabel && ariaLabel.includes({hint})) {{
				isMuted = true;
			}}
		}}
		return {{
			success: true,
			volume: volume,
			percentage: Math.round(volume * 100),
			isMuted: isMuted
		}};
	}} catch (err) {{
		return {{ success: false, message: 'Error: ' + err.message }};
	}}
}})()"#,
		slider = js_str(&selectors.volume_slider),
		mute = js_str(&selectors.mute_button),
		hint = js_str(&selectors.muted_hint),
	)
}

/// Reads the progress slider's upper bound in whole seconds.
pub fn read_seek_bounds(selectors: &Selectors) -> String {
	format!(
		r#"(function() {{
	try {{
		const slider = document.querySelector({slider});
		if (!slider) {{
			return {{ success: false, message: 'progress slider not found' }};
		}}
		const max = parseFloat(slider.max) || 100;
		return {{ success: true, max: Math.round(max) }};
	}} catch (err) {{
		return {{ success: false, message: 'Error: ' + err.message }};
	}}
}})()"#,
		slider = js_str(&selectors.progress_slider),
	)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn selectors_are_embedded_as_js_literals() {
		let script = click(r#"[data-test-id="LIKE_BUTTON"]"#, "like button");
		assert!(script.contains(r#""[data-test-id=\"LIKE_BUTTON\"]""#));
		assert!(script.contains(r#""like button not found""#));
	}

	#[test]
	fn set_slider_embeds_the_value() {
		let script = set_slider("input", "volume slider", 0.65);
		assert!(script.ends_with("})(0.65)"));
		assert!(script.contains("new Event('input', { bubbles: true })"));
		assert!(script.contains("new Event('change', { bubbles: true })"));
	}

	#[test]
	fn toggle_prefers_pause_over_play() {
		let selectors = Selectors::default();
		let script = toggle_playback(&selectors);
		let pause_at = script.find("PAUSE_BUTTON").unwrap();
		let play_at = script.find("PLAY_BUTTON").unwrap();
		assert!(pause_at < play_at);
	}

	#[test]
	fn track_info_script_upgrades_cover_resolution() {
		let script = read_track_info(&Selectors::default());
		assert!(script.contains("'/100x100', '/400x400'"));
	}
}
