//! Cross-origin policy.
//!
//! With no configured origins every request origin is mirrored back. With an allowlist, only
//! listed origins get CORS headers and requests from any other origin are refused with 403.

// std
use std::time::Duration;
// crates.io
use axum::{
	extract::{Request, State},
	http::{HeaderValue, Method, header::ORIGIN},
	middleware::Next,
	response::{IntoResponse, Response},
};
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
// self
use crate::{
	_prelude::*,
	config::CorsConfig,
	error::{ConfigError, ValidationError},
};

const PREFLIGHT_MAX_AGE: Duration = Duration::from_secs(600);

/// Parsed cross-origin policy shared by the CORS layer and the origin gate.
#[derive(Clone, Debug, Default)]
pub struct CorsPolicy {
	allowed: Option<Arc<[HeaderValue]>>,
}
impl CorsPolicy {
	/// Policy that mirrors any origin. An empty allowlist or `*` selects it.
	pub fn mirror() -> Self {
		Self { allowed: None }
	}

	/// Builds the policy from configuration, rejecting origins that are not valid header values.
	pub fn from_config(config: &CorsConfig) -> Result<Self, ConfigError> {
		if config.allowed_origins.is_empty()
			|| config.allowed_origins.iter().any(|origin| origin == "*")
		{
			return Ok(Self::mirror());
		}

		let allowed = config
			.allowed_origins
			.iter()
			.map(|origin| {
				HeaderValue::from_str(origin.trim_end_matches('/'))
					.map_err(|_| ConfigError::InvalidOrigin { origin: origin.clone() })
			})
			.collect::<Result<Vec<_>, _>>()?;

		Ok(Self { allowed: Some(allowed.into()) })
	}

	/// Returns true when `origin` may call the service.
	pub fn allows(&self, origin: &HeaderValue) -> bool {
		match &self.allowed {
			Some(allowed) => allowed.iter().any(|candidate| candidate == origin),
			None => true,
		}
	}

	/// CORS response headers matching this policy.
	pub fn layer(&self) -> CorsLayer {
		let origin = match &self.allowed {
			Some(allowed) => AllowOrigin::list(allowed.iter().cloned()),
			None => AllowOrigin::mirror_request(),
		};

		CorsLayer::new()
			.allow_origin(origin)
			.allow_methods([Method::POST, Method::OPTIONS])
			.allow_headers(AllowHeaders::mirror_request())
			.max_age(PREFLIGHT_MAX_AGE)
	}
}

/// Middleware refusing requests whose `Origin` is outside the allowlist.
///
/// Requests without an `Origin` header (native apps, server-to-server) pass.
pub async fn origin_gate(
	State(policy): State<CorsPolicy>,
	request: Request,
	next: Next,
) -> Response {
	if let Some(origin) = request.headers().get(ORIGIN)
		&& !policy.allows(origin)
	{
		let origin = origin.to_str().unwrap_or("<non-ascii>").to_owned();

		return Error::from(ValidationError::OriginNotAllowed { origin }).into_response();
	}

	next.run(request).await
}
