//! Minimal lock-step DevTools protocol client.
//!
//! The login flow is strictly sequential, so one in-flight command at a time
//! is enough: send, then read frames until the matching response id arrives,
//! buffering any events seen along the way for later waits.

use std::collections::VecDeque;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::trace;

use crate::error::{Error, Result};
use crate::session::Cookie;

const COMMAND_TIMEOUT: Duration = Duration::from_secs(15);
const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(250);

const LOAD_EVENT: &str = "Page.loadEventFired";

pub(super) struct CdpClient {
	ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
	next_id: u64,
	session_id: Option<String>,
	pending_events: VecDeque<Value>,
}

impl CdpClient {
	pub(super) async fn connect(ws_url: &str) -> Result<Self> {
		let (ws, _) = connect_async(ws_url).await.map_err(ws_error)?;
		Ok(Self { ws, next_id: 0, session_id: None, pending_events: VecDeque::new() })
	}

	/// Opens a fresh page target and attaches to it flat, enabling the page
	/// and runtime domains.
	pub(super) async fn open_page(&mut self) -> Result<()> {
		let created = self.call("Target.createTarget", json!({ "url": "about:blank" }), false).await?;
		let target_id = created
			.get("targetId")
			.and_then(Value::as_str)
			.ok_or_else(|| Error::Automation("Target.createTarget returned no targetId".into()))?
			.to_string();

		let attached = self
			.call("Target.attachToTarget", json!({ "targetId": target_id, "flatten": true }), false)
			.await?;
		let session_id = attached
			.get("sessionId")
			.and_then(Value::as_str)
			.ok_or_else(|| Error::Automation("Target.attachToTarget returned no sessionId".into()))?
			.to_string();
		self.session_id = Some(session_id);

		let _ = self.call("Page.enable", json!({}), true).await?;
		let _ = self.call("Runtime.enable", json!({}), true).await?;
		let _ = self.call("Network.enable", json!({}), true).await?;
		Ok(())
	}

	/// Navigates the page and blocks until the load event fires.
	pub(super) async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<()> {
		self.clear_load_events();
		let result = self.call("Page.navigate", json!({ "url": url }), true).await?;
		if let Some(error_text) =
			result.get("errorText").and_then(Value::as_str).filter(|t| !t.is_empty())
		{
			return Err(Error::Automation(format!("navigation to {url} failed: {error_text}")));
		}
		self.wait_for_load(timeout).await
	}

	/// Waits for the next page load event.
	pub(super) async fn wait_for_load(&mut self, timeout: Duration) -> Result<()> {
		let _ = self.wait_event(LOAD_EVENT, timeout).await?;
		Ok(())
	}

	/// Discards buffered load events so a later wait only observes
	/// navigations triggered after this point.
	pub(super) fn clear_load_events(&mut self) {
		self.pending_events
			.retain(|e| e.get("method").and_then(Value::as_str) != Some(LOAD_EVENT));
	}

	/// Polls until `selector` matches an element in the page.
	pub(super) async fn wait_for_selector(&mut self, selector: &str, timeout: Duration) -> Result<()> {
		let expression =
			format!("document.querySelector('{}') !== null", js_escape(selector));
		let deadline = Instant::now() + timeout;
		loop {
			if self.evaluate(&expression).await? == Value::Bool(true) {
				return Ok(());
			}
			if Instant::now() + SELECTOR_POLL_INTERVAL > deadline {
				return Err(Error::Timeout {
					ms: timeout.as_millis() as u64,
					condition: format!("selector {selector}"),
				});
			}
			tokio::time::sleep(SELECTOR_POLL_INTERVAL).await;
		}
	}

	/// Focuses the matching input and types `value` into it.
	pub(super) async fn fill(&mut self, selector: &str, value: &str) -> Result<()> {
		let expression = format!(
			"(() => {{ const el = document.querySelector('{sel}'); if (!el) return false; \
			 el.focus(); el.value = '{val}'; \
			 el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
			 el.dispatchEvent(new Event('change', {{ bubbles: true }})); return true; }})()",
			sel = js_escape(selector),
			val = js_escape(value),
		);
		if self.evaluate(&expression).await? != Value::Bool(true) {
			return Err(Error::Automation(format!("fill target not found: {selector}")));
		}
		Ok(())
	}

	/// Clicks the first element matching `selector`.
	pub(super) async fn click(&mut self, selector: &str) -> Result<()> {
		let expression = format!(
			"(() => {{ const el = document.querySelector('{sel}'); if (!el) return false; \
			 el.click(); return true; }})()",
			sel = js_escape(selector),
		);
		if self.evaluate(&expression).await? != Value::Bool(true) {
			return Err(Error::Automation(format!("click target not found: {selector}")));
		}
		Ok(())
	}

	/// Returns the full cookie jar visible to the attached page.
	pub(super) async fn cookies(&mut self) -> Result<Vec<Cookie>> {
		let result = self.call("Network.getCookies", json!({}), true).await?;
		let cookies = result
			.get("cookies")
			.cloned()
			.ok_or_else(|| Error::Automation("Network.getCookies returned no cookies field".into()))?;
		Ok(serde_json::from_value(cookies)?)
	}

	/// Asks the browser to shut down gracefully.
	pub(super) async fn close_browser(mut self) -> Result<()> {
		let _ = self.call("Browser.close", json!({}), false).await?;
		Ok(())
	}

	async fn evaluate(&mut self, expression: &str) -> Result<Value> {
		let result = self
			.call(
				"Runtime.evaluate",
				json!({ "expression": expression, "returnByValue": true }),
				true,
			)
			.await?;
		if let Some(details) = result.get("exceptionDetails") {
			return Err(Error::Automation(format!("page script threw: {details}")));
		}
		Ok(result.pointer("/result/value").cloned().unwrap_or(Value::Null))
	}

	async fn call(&mut self, method: &str, params: Value, in_session: bool) -> Result<Value> {
		let id = self.next_id;
		self.next_id += 1;

		let mut message = json!({ "id": id, "method": method, "params": params });
		if in_session {
			let session_id = self
				.session_id
				.as_ref()
				.ok_or_else(|| Error::Automation(format!("{method} requires an attached page")))?;
			message["sessionId"] = json!(session_id);
		}

		trace!(target = "awardscan.login", %method, id, "devtools command");
		self.ws.send(Message::Text(message.to_string())).await.map_err(ws_error)?;

		let deadline = Instant::now() + COMMAND_TIMEOUT;
		loop {
			let value = self.next_frame(deadline, method).await?;
			if value.get("id").and_then(Value::as_u64) == Some(id) {
				if let Some(error) = value.get("error") {
					return Err(Error::Automation(format!("{method} failed: {error}")));
				}
				return Ok(value.get("result").cloned().unwrap_or(Value::Null));
			}
			self.pending_events.push_back(value);
		}
	}

	async fn wait_event(&mut self, method: &str, timeout: Duration) -> Result<Value> {
		if let Some(position) = self
			.pending_events
			.iter()
			.position(|e| e.get("method").and_then(Value::as_str) == Some(method))
		{
			return Ok(self.pending_events.remove(position).unwrap_or(Value::Null));
		}

		let deadline = Instant::now() + timeout;
		loop {
			let value = self.next_frame(deadline, method).await?;
			if value.get("method").and_then(Value::as_str) == Some(method) {
				return Ok(value);
			}
			self.pending_events.push_back(value);
		}
	}

	/// Reads the next text frame, honoring `deadline`.
	async fn next_frame(&mut self, deadline: Instant, condition: &str) -> Result<Value> {
		loop {
			let remaining = deadline.saturating_duration_since(Instant::now());
			if remaining.is_zero() {
				return Err(Error::Timeout {
					ms: COMMAND_TIMEOUT.as_millis() as u64,
					condition: condition.to_string(),
				});
			}

			let frame = tokio::time::timeout(remaining, self.ws.next())
				.await
				.map_err(|_| Error::Timeout {
					ms: COMMAND_TIMEOUT.as_millis() as u64,
					condition: condition.to_string(),
				})?
				.ok_or_else(|| Error::Automation("devtools connection closed".into()))?
				.map_err(ws_error)?;

			match frame {
				Message::Text(text) => return Ok(serde_json::from_str(&text)?),
				Message::Close(_) => {
					return Err(Error::Automation("devtools connection closed".into()));
				}
				_ => continue,
			}
		}
	}
}

fn ws_error(error: tokio_tungstenite::tungstenite::Error) -> Error {
	Error::Automation(format!("devtools websocket error: {error}"))
}

/// Escapes a string for embedding in a single-quoted page script literal.
fn js_escape(input: &str) -> String {
	input.replace('\\', "\\\\").replace('\'', "\\'").replace('\n', "\\n")
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn js_escape_handles_quotes_and_backslashes() {
		assert_eq!(js_escape("a'b"), "a\\'b");
		assert_eq!(js_escape("a\\b"), "a\\\\b");
		assert_eq!(js_escape("#plain-selector"), "#plain-selector");
	}
}
