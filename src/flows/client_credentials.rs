//! App-only tokens via the `client_credentials` grant.

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

/// Body returned by `/clientToken`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClientTokenResponse {
	/// Issued access token.
	pub access_token: TokenSecret,
	/// Lifetime in seconds, as reported by the provider.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub expires_in: Option<u64>,
}

impl<C, M> Broker<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Performs the `client_credentials` grant.
	pub async fn client_token(&self) -> Result<ClientTokenResponse> {
		common::observe(FlowKind::ClientCredentials, "client_token", async move {
			let token = self.token_client.request_token(&GrantRequest::ClientCredentials).await?;

			Ok(ClientTokenResponse {
				access_token: token.access_token_secret(),
				expires_in: token.expires_in,
			})
		})
		.await
	}
}
