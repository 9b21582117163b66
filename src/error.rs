//! Broker-level error types shared across flows, the token client, and the HTTP surface.

// std
use std::net::SocketAddr;
// self
use crate::{
	_prelude::*,
	crypto::{DecryptionError, EncryptionError},
};

/// Broker-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical broker error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Caller supplied a request the broker cannot act on.
	#[error(transparent)]
	Validation(#[from] ValidationError),
	/// The token endpoint failed or could not be reached.
	#[error(transparent)]
	Upstream(#[from] UpstreamError),
	/// A refresh-token envelope could not be opened.
	#[error(transparent)]
	Decryption(#[from] DecryptionError),
	/// A refresh token could not be sealed.
	#[error(transparent)]
	Encryption(#[from] EncryptionError),
	/// The HTTP server stopped with an I/O failure.
	#[error("HTTP server failed.")]
	Io(#[from] std::io::Error),
}

/// Configuration and startup failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Configuration sources could not be read or deserialized.
	#[error("Configuration could not be loaded.")]
	Load {
		/// Underlying figment failure.
		#[source]
		source: Box<figment::Error>,
	},
	/// Configuration file passed on the command line does not exist.
	#[error("Configuration file `{path}` does not exist.")]
	MissingFile {
		/// Path as supplied by the operator.
		path: String,
	},
	/// A required value is empty.
	#[error("Configuration value `{key}` must not be empty.")]
	EmptyValue {
		/// Configuration key.
		key: &'static str,
	},
	/// A configured URL does not parse.
	#[error("Configuration value `{key}` is not a valid URL.")]
	InvalidUrl {
		/// Configuration key.
		key: &'static str,
		/// Parser failure.
		#[source]
		source: url::ParseError,
	},
	/// A CORS origin cannot be used as a header value.
	#[error("CORS origin `{origin}` is not a valid header value.")]
	InvalidOrigin {
		/// Offending origin string.
		origin: String,
	},
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Listener could not bind to the configured address.
	#[error("Failed to bind to {addr}.")]
	Bind {
		/// Configured listen address.
		addr: SocketAddr,
		/// Underlying socket failure.
		#[source]
		source: std::io::Error,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}
impl From<figment::Error> for ConfigError {
	fn from(e: figment::Error) -> Self {
		Self::Load { source: Box::new(e) }
	}
}

/// Caller input the broker rejects before contacting the provider.
#[derive(Debug, ThisError)]
pub enum ValidationError {
	/// A required body field is absent or empty.
	#[error("Missing '{name}' parameter")]
	MissingParameter {
		/// Field name as it appears in the request body.
		name: &'static str,
	},
	/// A body field is present but unusable.
	#[error("Invalid '{name}' parameter")]
	InvalidParameter {
		/// Field name as it appears in the request body.
		name: &'static str,
		/// Why the value was rejected; logged, never returned to the caller.
		reason: String,
	},
	/// The request body could not be parsed.
	#[error("Invalid request body")]
	InvalidBody {
		/// Parser failure; logged, never returned to the caller.
		reason: String,
	},
	/// The request carried an `Origin` outside the configured allowlist.
	#[error("Origin not allowed")]
	OriginNotAllowed {
		/// Rejected origin.
		origin: String,
	},
}

/// Token endpoint failures. None of them are retried.
#[derive(Debug, ThisError)]
pub enum UpstreamError {
	/// Provider answered with an OAuth error body.
	#[error("Token endpoint rejected the request: {reason}.")]
	Rejected {
		/// HTTP status code, when available.
		status: Option<u16>,
		/// OAuth `error` code plus description, when supplied.
		reason: String,
	},
	/// Provider answered with a body that is not a valid token response.
	#[error("Token endpoint returned malformed JSON.")]
	Parse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Provider answered in a shape the OAuth client refused.
	#[error("Token endpoint returned an unexpected response: {message}.")]
	Unexpected {
		/// Summary of the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Authorization-code exchange succeeded without a refresh token.
	#[error("Token endpoint response is missing a refresh token.")]
	MissingRefreshToken,
	/// Token request could not be assembled.
	#[error("Token request could not be constructed.")]
	Request {
		/// Underlying construction failure.
		#[source]
		source: BoxError,
	},
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the token endpoint.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the token endpoint.")]
	Io(#[from] std::io::Error),
}
impl UpstreamError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Wraps a request-construction failure.
	pub fn request(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Request { source: Box::new(src) }
	}

	/// HTTP status reported by the token endpoint, if a response was received.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Rejected { status, .. }
			| Self::Parse { status, .. }
			| Self::Unexpected { status, .. } => *status,
			_ => None,
		}
	}

	/// Returns true when no HTTP response was received at all.
	pub fn is_transport(&self) -> bool {
		matches!(self, Self::Network { .. } | Self::Io(_) | Self::Request { .. })
	}
}
impl From<ReqwestError> for UpstreamError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

/// Renders an error and its source chain on one line for logging.
pub fn error_chain(err: &dyn StdError) -> String {
	let mut rendered = err.to_string();
	let mut source = err.source();

	while let Some(inner) = source {
		rendered.push_str(": ");
		rendered.push_str(&inner.to_string());

		source = inner.source();
	}

	rendered
}
