//! Observability helpers for broker flows.
//!
//! Every grant handler runs inside a `token_broker.flow` span carrying the `flow` (grant) and
//! `stage` (call site) fields. With the `metrics` feature enabled, the
//! `token_broker_flow_total` counter is incremented for every attempt/success/failure, labeled
//! by `flow` + `outcome`.

mod counter;
mod span;

pub use counter::*;
pub use span::*;

// crates.io
use tracing_subscriber::{EnvFilter, fmt};
// self
use crate::_prelude::*;

/// Filter applied when `RUST_LOG` is unset or invalid.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Grant flows observed by the broker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Authorization-code exchange (web and native callbacks).
	AuthorizationCode,
	/// Refresh-token grant.
	Refresh,
	/// Client-credentials grant.
	ClientCredentials,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::AuthorizationCode => "authorization_code",
			FlowKind::Refresh => "refresh",
			FlowKind::ClientCredentials => "client_credentials",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to a grant handler.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Installs the global `fmt` subscriber filtered by `RUST_LOG`.
///
/// Calling it twice is harmless; the second installation is ignored.
pub fn init_tracing() {
	let filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

	let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}
