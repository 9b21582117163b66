//! HTTP surface: routes, body extraction and the error translator.
//!
//! | Path | Handler |
//! |---|---|
//! | `POST /clientToken` | [`Broker::client_token`] |
//! | `POST /exchangeCode` | [`Broker::exchange_code`] with [`CallbackTarget::Web`] |
//! | `POST /exchangeCodeProtocol` | [`Broker::exchange_code`] with [`CallbackTarget::Protocol`] |
//! | `POST /refreshToken` | [`Broker::refresh_token`] |
//!
//! Bodies may be JSON or `application/x-www-form-urlencoded`. Every failure is logged once and
//! rendered as `{"success": false, "msg": ".."}`.

pub mod cors;

pub use cors::*;

// crates.io
use axum::{
	Json, Router,
	body::Bytes,
	extract::{Form, FromRequest, Request, State},
	http::{StatusCode, header::CONTENT_TYPE},
	middleware,
	response::{IntoResponse, Response},
	routing::post,
};
use serde::de::DeserializeOwned;
use tower_http::trace::TraceLayer;
// self
use crate::{
	_prelude::*,
	error::{ValidationError, error_chain},
	flows::{
		Broker, CallbackTarget, ClientTokenResponse, CodeExchangeRequest, CodeExchangeResponse,
		RefreshRequest, RefreshResponse,
	},
	provider::PROVIDER_NAME,
};

/// Shared handler state.
#[derive(Clone, Debug)]
pub struct AppState {
	/// Grant handlers.
	pub broker: Arc<Broker>,
}
impl AppState {
	/// Wraps `broker` for sharing across requests.
	pub fn new(broker: Broker) -> Self {
		Self { broker: Arc::new(broker) }
	}
}

/// Uniform failure body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
	/// Always `false`.
	pub success: bool,
	/// Human-readable reason.
	pub msg: String,
}

/// Request body parsed from JSON or form encoding; an empty body yields `T::default()`.
#[derive(Clone, Debug)]
pub struct GrantBody<T>(pub T);
impl<T, S> FromRequest<S> for GrantBody<T>
where
	T: DeserializeOwned + Default + Send,
	S: Send + Sync,
{
	type Rejection = Error;

	async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
		let is_form = req
			.headers()
			.get(CONTENT_TYPE)
			.and_then(|value| value.to_str().ok())
			.is_some_and(|value| value.starts_with("application/x-www-form-urlencoded"));

		if is_form {
			let Form(body) = Form::<T>::from_request(req, state)
				.await
				.map_err(|e| ValidationError::InvalidBody { reason: e.body_text() })?;

			return Ok(Self(body));
		}

		let bytes = Bytes::from_request(req, state)
			.await
			.map_err(|e| ValidationError::InvalidBody { reason: e.body_text() })?;

		if bytes.iter().all(u8::is_ascii_whitespace) {
			return Ok(Self(T::default()));
		}

		serde_json::from_slice(&bytes)
			.map(Self)
			.map_err(|e| ValidationError::InvalidBody { reason: e.to_string() }.into())
	}
}

/// Builds the router with the cross-origin gate, CORS headers and request tracing.
pub fn router(state: AppState, cors: CorsPolicy) -> Router {
	let cors_layer = cors.layer();

	Router::new()
		.route("/clientToken", post(client_token))
		.route("/exchangeCode", post(exchange_code))
		.route("/exchangeCodeProtocol", post(exchange_code_protocol))
		.route("/refreshToken", post(refresh_token))
		.layer(middleware::from_fn_with_state(cors, cors::origin_gate))
		.layer(cors_layer)
		.layer(TraceLayer::new_for_http())
		.with_state(state)
}

async fn client_token(State(state): State<AppState>) -> Result<Json<ClientTokenResponse>> {
	Ok(Json(state.broker.client_token().await?))
}

async fn exchange_code(
	State(state): State<AppState>,
	GrantBody(body): GrantBody<CodeExchangeRequest>,
) -> Result<Json<CodeExchangeResponse>> {
	Ok(Json(state.broker.exchange_code(body, CallbackTarget::Web).await?))
}

async fn exchange_code_protocol(
	State(state): State<AppState>,
	GrantBody(body): GrantBody<CodeExchangeRequest>,
) -> Result<Json<CodeExchangeResponse>> {
	Ok(Json(state.broker.exchange_code(body, CallbackTarget::Protocol).await?))
}

async fn refresh_token(
	State(state): State<AppState>,
	GrantBody(body): GrantBody<RefreshRequest>,
) -> Result<Json<RefreshResponse>> {
	Ok(Json(state.broker.refresh_token(body).await?))
}

impl IntoResponse for Error {
	fn into_response(self) -> Response {
		let status = status_code(&self);
		let msg = client_message(&self);
		let chain = error_chain(&self);

		if status.is_server_error() {
			tracing::error!(status = status.as_u16(), error = %chain, "Request failed.");
		} else {
			tracing::warn!(status = status.as_u16(), error = %chain, "Request rejected.");
		}

		(status, Json(Failure { success: false, msg })).into_response()
	}
}

fn status_code(err: &Error) -> StatusCode {
	match err {
		Error::Validation(ValidationError::OriginNotAllowed { .. }) => StatusCode::FORBIDDEN,
		Error::Validation(_) | Error::Decryption(_) => StatusCode::BAD_REQUEST,
		Error::Upstream(_) | Error::Encryption(_) | Error::Config(_) | Error::Io(_) =>
			StatusCode::INTERNAL_SERVER_ERROR,
	}
}

fn client_message(err: &Error) -> String {
	match err {
		Error::Validation(e) => e.to_string(),
		Error::Decryption(_) => "Invalid 'refresh_token' parameter".into(),
		Error::Upstream(e) => match e.status() {
			Some(status) if !(200..300).contains(&status) =>
				format!("Received invalid status code '{status}' from {PROVIDER_NAME}."),
			_ if e.is_transport() => format!("Failed to reach {PROVIDER_NAME}."),
			_ => format!("Received an invalid response from {PROVIDER_NAME}."),
		},
		Error::Encryption(_) => "Failed to secure the refresh token.".into(),
		Error::Config(_) | Error::Io(_) => "Internal server error.".into(),
	}
}
