//! Refresh-token grant over sealed envelopes.

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	flows::{Broker, common},
	http::TokenHttpClient,
	oauth::TransportErrorMapper,
	obs::FlowKind,
	provider::GrantRequest,
};

/// Body accepted by `/refreshToken`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RefreshRequest {
	/// Envelope previously issued by a code exchange.
	#[serde(default)]
	pub refresh_token: Option<String>,
}

/// Body returned by a successful refresh. The refresh token is never echoed back.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RefreshResponse {
	/// Issued access token.
	pub access_token: TokenSecret,
	/// Lifetime in seconds, as reported by the provider.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub expires_in: Option<u64>,
	/// Always `true`.
	pub success: bool,
}

impl<C, M> Broker<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Opens the envelope and performs the `refresh_token` grant with the raw token.
	///
	/// An envelope that does not open fails before the provider is contacted.
	pub async fn refresh_token(&self, request: RefreshRequest) -> Result<RefreshResponse> {
		common::observe(FlowKind::Refresh, "refresh_token", async move {
			let envelope = common::require_param(request.refresh_token, "refresh_token")?;
			let refresh_token = self.cipher.open(&envelope)?;
			let grant = GrantRequest::RefreshToken { refresh_token };
			let token = self.token_client.request_token(&grant).await?;

			Ok(RefreshResponse {
				access_token: token.access_token_secret(),
				expires_in: token.expires_in,
				success: true,
			})
		})
		.await
	}
}
