//! Expression execution against whatever session is currently available.

use serde_json::Value;
use tracing::debug;

use crate::session::SessionLifecycle;

/// Thin capability every command and query goes through.
///
/// Absence of a value is the only error signal this type produces: no
/// session and a failed evaluation both come back as `None`, with the
/// difference visible only in the logs.
#[derive(Clone)]
pub struct Executor {
	lifecycle: SessionLifecycle,
}

impl Executor {
	pub fn new(lifecycle: SessionLifecycle) -> Self {
		Self { lifecycle }
	}

	pub async fn evaluate(&self, expression: String) -> Option<Value> {
		let Some(session) = self.lifecycle.session().await else {
			debug!(target = "tl.transport", "no session available for evaluation");
			return None;
		};

		match session.evaluate(expression).await {
			Ok(value) => Some(value),
			Err(err) => {
				debug!(target = "tl.transport", error = %err, "expression evaluation failed");
				None
			}
		}
	}
}
