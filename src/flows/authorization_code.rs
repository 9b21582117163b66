//! Authorization-code exchange for web and native callbacks.
//!
//! The caller has already completed the consent redirect and holds a `code`. The broker trades
//! it for tokens and seals the refresh token before it leaves the server, so the caller can
//! store it but only this service can use it.

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	error::{UpstreamError, ValidationError},
	flows::{Broker, CallbackTarget, common},
	http::TokenHttpClient,
	oauth::TransportErrorMapper,
	obs::FlowKind,
	provider::GrantRequest,
};

/// Body accepted by `/exchangeCode` and `/exchangeCodeProtocol`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CodeExchangeRequest {
	/// Authorization code returned to the redirect URI.
	#[serde(default)]
	pub code: Option<String>,
	/// Redirect URI the code was issued for; defaults to the configured callback.
	#[serde(default, rename = "callbackUrl", alias = "callback_url")]
	pub callback_url: Option<String>,
}

/// Body returned by a successful code exchange.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CodeExchangeResponse {
	/// Issued access token.
	pub access_token: TokenSecret,
	/// Lifetime in seconds, as reported by the provider.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub expires_in: Option<u64>,
	/// Sealed refresh token envelope.
	pub refresh_token: String,
	/// Token type exactly as the provider sent it.
	pub token_type: String,
	/// Always `true`.
	pub success: bool,
}

impl<C, M> Broker<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Exchanges an authorization code, falling back to the `target` callback URL.
	pub async fn exchange_code(
		&self,
		request: CodeExchangeRequest,
		target: CallbackTarget,
	) -> Result<CodeExchangeResponse> {
		common::observe(FlowKind::AuthorizationCode, target.stage(), async move {
			let code = common::require_param(request.code, "code")?;
			// Forwarded verbatim; the provider compares `redirect_uri` byte for byte.
			let redirect_uri = match request.callback_url.filter(|value| !value.is_empty()) {
				Some(raw) => {
					Url::parse(&raw).map_err(|e| ValidationError::InvalidParameter {
						name: "callbackUrl",
						reason: e.to_string(),
					})?;

					raw
				},
				None => self.callbacks.for_target(target).to_owned(),
			};
			let grant = GrantRequest::AuthorizationCode { code, redirect_uri };
			let token = self.token_client.request_token(&grant).await?;
			let refresh_token =
				token.refresh_token_secret().ok_or(UpstreamError::MissingRefreshToken)?;
			let sealed = self.cipher.seal(refresh_token.expose())?;

			tracing::debug!(callback = ?target, "Authorization code exchanged.");

			Ok(CodeExchangeResponse {
				access_token: token.access_token_secret(),
				expires_in: token.expires_in,
				refresh_token: sealed,
				token_type: token.token_type.0,
				success: true,
			})
		})
		.await
	}
}
