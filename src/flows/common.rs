//! Shared helpers for grant handlers (input guards and flow instrumentation).

// self
use crate::{
	_prelude::*,
	error::ValidationError,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

/// Returns the value of a required body field; absent and empty values are both missing.
pub fn require_param(
	value: Option<String>,
	name: &'static str,
) -> Result<String, ValidationError> {
	value.filter(|value| !value.is_empty()).ok_or(ValidationError::MissingParameter { name })
}

/// Runs `fut` inside a flow span and records its attempt and outcome.
pub async fn observe<T, Fut>(kind: FlowKind, stage: &'static str, fut: Fut) -> Result<T>
where
	Fut: Future<Output = Result<T>>,
{
	let span = FlowSpan::new(kind, stage);

	obs::record_flow_outcome(kind, FlowOutcome::Attempt);

	let result = span.instrument(fut).await;

	match &result {
		Ok(_) => obs::record_flow_outcome(kind, FlowOutcome::Success),
		Err(_) => obs::record_flow_outcome(kind, FlowOutcome::Failure),
	}

	result
}
