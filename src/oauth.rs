//! Upstream token client built on the `oauth2` crate.
//!
//! [`TokenClient`] sends one Basic-authenticated, form-encoded POST per grant to the configured
//! token endpoint and parses the JSON answer into [`ProviderTokenResponse`]. The response type is
//! the broker's own so `token_type` and the other fields pass through exactly as the provider
//! sent them.

pub use oauth2;

// std
use std::{borrow::Cow, time::Duration as StdDuration};
// crates.io
use oauth2::{
	AccessToken, AuthorizationCode, ClientId, ClientSecret, EndpointNotSet, EndpointSet,
	HttpClientError, RedirectUrl, RefreshToken, RequestTokenError, Scope, StandardRevocableToken,
	TokenType, TokenUrl,
	basic::{
		BasicErrorResponse, BasicRequestTokenError, BasicRevocationErrorResponse,
		BasicTokenIntrospectionResponse,
	},
};
use serde::Deserializer;
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	error::UpstreamError,
	http::{ReqwestHttpClient, ResponseMetadata, ResponseMetadataSlot, TokenHttpClient},
	provider::{GrantRequest, GrantType},
};

type ConfiguredClient = oauth2::Client<
	BasicErrorResponse,
	ProviderTokenResponse,
	BasicTokenIntrospectionResponse,
	StandardRevocableToken,
	BasicRevocationErrorResponse,
	EndpointNotSet,
	EndpointNotSet,
	EndpointNotSet,
	EndpointNotSet,
	EndpointSet,
>;

/// Maps HTTP transport failures into [`UpstreamError`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport into an upstream error.
	fn map_transport_error(
		&self,
		grant: GrantType,
		metadata: Option<&ResponseMetadata>,
		error: HttpClientError<E>,
	) -> UpstreamError;
}

/// Default mapper for reqwest-backed transports.
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		grant: GrantType,
		meta: Option<&ResponseMetadata>,
		err: HttpClientError<ReqwestError>,
	) -> UpstreamError {
		let _ = grant;

		match err {
			HttpClientError::Reqwest(inner) =>
				if inner.is_builder() {
					UpstreamError::request(*inner)
				} else {
					UpstreamError::from(*inner)
				},
			HttpClientError::Http(inner) => UpstreamError::request(inner),
			HttpClientError::Io(inner) => UpstreamError::Io(inner),
			HttpClientError::Other(message) => UpstreamError::Unexpected {
				message: format!("HTTP client error: {message}"),
				status: meta_status(meta),
			},
			_ => UpstreamError::Unexpected {
				message: "HTTP client error".into(),
				status: meta_status(meta),
			},
		}
	}
}

/// `token_type` exactly as the provider spelled it (e.g. `Bearer`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderTokenType(pub String);
impl TokenType for ProviderTokenType {}
impl AsRef<str> for ProviderTokenType {
	fn as_ref(&self) -> &str {
		&self.0
	}
}

/// Successful token endpoint response.
///
/// `Serialize` is required by [`oauth2::TokenResponse`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProviderTokenResponse {
	/// Issued access token.
	pub access_token: AccessToken,
	/// Token type label.
	pub token_type: ProviderTokenType,
	/// Lifetime of the access token in seconds.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub expires_in: Option<u64>,
	/// Refresh token, when the grant issues one.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub refresh_token: Option<RefreshToken>,
	/// Granted scopes.
	#[serde(
		rename = "scope",
		default,
		deserialize_with = "deserialize_scopes",
		skip_serializing_if = "Option::is_none"
	)]
	pub scopes: Option<Vec<Scope>>,
}
impl ProviderTokenResponse {
	/// Access token wrapped for redacted handling.
	pub fn access_token_secret(&self) -> TokenSecret {
		TokenSecret::new(self.access_token.secret().as_str())
	}

	/// Refresh token wrapped for redacted handling.
	pub fn refresh_token_secret(&self) -> Option<TokenSecret> {
		self.refresh_token.as_ref().map(|token| TokenSecret::new(token.secret().as_str()))
	}
}
impl oauth2::TokenResponse for ProviderTokenResponse {
	type TokenType = ProviderTokenType;

	fn access_token(&self) -> &AccessToken {
		&self.access_token
	}

	fn token_type(&self) -> &Self::TokenType {
		&self.token_type
	}

	fn expires_in(&self) -> Option<StdDuration> {
		self.expires_in.map(StdDuration::from_secs)
	}

	fn refresh_token(&self) -> Option<&RefreshToken> {
		self.refresh_token.as_ref()
	}

	fn scopes(&self) -> Option<&Vec<Scope>> {
		self.scopes.as_ref()
	}
}

/// Client for the provider's token endpoint.
///
/// Holds the precomputed client credentials and a shared transport handle; it keeps no
/// per-request state, so one instance serves every concurrent request.
pub struct TokenClient<C = ReqwestHttpClient, M = ReqwestTransportErrorMapper>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	oauth_client: ConfiguredClient,
	token_url: Url,
	http_client: Arc<C>,
	error_mapper: Arc<M>,
}
impl<C, M> TokenClient<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a client that authenticates with HTTP Basic `client_id:client_secret`.
	pub fn new(
		token_url: Url,
		client_id: &str,
		client_secret: &TokenSecret,
		http_client: impl Into<Arc<C>>,
		error_mapper: impl Into<Arc<M>>,
	) -> Self {
		let oauth_client: ConfiguredClient =
			oauth2::Client::new(ClientId::new(client_id.to_owned()))
				.set_client_secret(ClientSecret::new(client_secret.expose().to_owned()))
				.set_token_uri(TokenUrl::from_url(token_url.clone()));

		Self {
			oauth_client,
			token_url,
			http_client: http_client.into(),
			error_mapper: error_mapper.into(),
		}
	}

	/// Token endpoint this client posts to.
	pub fn token_url(&self) -> &Url {
		&self.token_url
	}

	/// Performs a single token request. Failures are returned immediately, never retried.
	pub async fn request_token(
		&self,
		grant: &GrantRequest,
	) -> Result<ProviderTokenResponse, UpstreamError> {
		let grant_type = grant.grant_type();
		let meta = ResponseMetadataSlot::default();
		let handle = self.http_client.with_metadata(meta.clone());

		tracing::debug!(grant = %grant_type, endpoint = %self.token_url, "Requesting token.");

		let outcome = match grant {
			GrantRequest::ClientCredentials =>
				self.oauth_client.exchange_client_credentials().request_async(&handle).await,
			GrantRequest::AuthorizationCode { code, redirect_uri } => {
				let redirect_uri =
					RedirectUrl::new(redirect_uri.clone()).map_err(UpstreamError::request)?;

				self.oauth_client
					.exchange_code(AuthorizationCode::new(code.clone()))
					.set_redirect_uri(Cow::Owned(redirect_uri))
					.request_async(&handle)
					.await
			},
			GrantRequest::RefreshToken { refresh_token } => {
				let refresh_token = RefreshToken::new(refresh_token.expose().to_owned());

				self.oauth_client
					.exchange_refresh_token(&refresh_token)
					.request_async(&handle)
					.await
			},
		};

		outcome.map_err(|err| {
			map_request_error(grant_type, meta.take(), err, self.error_mapper.as_ref())
		})
	}
}
impl<C, M> Debug for TokenClient<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenClient").field("token_url", &self.token_url.as_str()).finish()
	}
}

fn map_request_error<E, M>(
	grant: GrantType,
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<E>>,
	mapper: &M,
) -> UpstreamError
where
	E: 'static + Send + Sync + StdError,
	M: ?Sized + TransportErrorMapper<E>,
{
	let meta_ref = meta.as_ref();

	match err {
		RequestTokenError::ServerResponse(response) => {
			let reason = match response.error_description() {
				Some(description) => format!("{} ({description})", response.error().as_ref()),
				None => response.error().as_ref().to_string(),
			};

			UpstreamError::Rejected { status: meta_status(meta_ref), reason }
		},
		RequestTokenError::Request(error) => mapper.map_transport_error(grant, meta_ref, error),
		RequestTokenError::Parse(source, _body) =>
			UpstreamError::Parse { source, status: meta_status(meta_ref) },
		RequestTokenError::Other(message) =>
			UpstreamError::Unexpected { message, status: meta_status(meta_ref) },
	}
}

fn meta_status(meta: Option<&ResponseMetadata>) -> Option<u16> {
	meta.and_then(|value| value.status)
}

fn deserialize_scopes<'de, D>(deserializer: D) -> Result<Option<Vec<Scope>>, D::Error>
where
	D: Deserializer<'de>,
{
	let raw = Option::<String>::deserialize(deserializer)?;

	Ok(raw.map(|value| value.split_whitespace().map(|scope| Scope::new(scope.into())).collect()))
}
