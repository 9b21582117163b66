//! Grant handlers behind the HTTP surface.
//!
//! [`Broker`] owns everything a request needs: the upstream [`TokenClient`], the refresh-token
//! [`TokenCipher`] and the default callback URLs. It holds no per-request state, so one
//! instance is shared by every request for the lifetime of the process.

pub mod authorization_code;
pub mod client_credentials;
pub mod common;
pub mod refresh;

pub use authorization_code::*;
pub use client_credentials::*;
pub use refresh::*;

// self
use crate::{
	_prelude::*,
	config::Config,
	crypto::TokenCipher,
	error::ConfigError,
	http::{ReqwestHttpClient, TokenHttpClient},
	oauth::{ReqwestTransportErrorMapper, TokenClient, TransportErrorMapper},
};

/// Which configured redirect URI an authorization-code exchange falls back to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallbackTarget {
	/// Web callback (`client_callback_url`).
	Web,
	/// Native-app protocol callback (`client_callback_protocol_url`).
	Protocol,
}
impl CallbackTarget {
	/// Stage label recorded on the flow span.
	pub const fn stage(self) -> &'static str {
		match self {
			CallbackTarget::Web => "exchange_code",
			CallbackTarget::Protocol => "exchange_code_protocol",
		}
	}
}

/// Default redirect URIs, one per [`CallbackTarget`], kept exactly as configured.
#[derive(Clone, Debug)]
pub struct CallbackUrls {
	/// Used by `/exchangeCode`.
	pub web: String,
	/// Used by `/exchangeCodeProtocol`.
	pub protocol: String,
}
impl CallbackUrls {
	/// Returns the default redirect URI for `target`.
	pub fn for_target(&self, target: CallbackTarget) -> &str {
		match target {
			CallbackTarget::Web => &self.web,
			CallbackTarget::Protocol => &self.protocol,
		}
	}
}

/// Coordinates the three grant flows against the configured token endpoint.
pub struct Broker<C = ReqwestHttpClient, M = ReqwestTransportErrorMapper>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	token_client: TokenClient<C, M>,
	cipher: TokenCipher,
	callbacks: CallbackUrls,
}
impl<C, M> Broker<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a broker that reuses the caller-provided transport + mapper pair.
	pub fn with_http_client(
		config: &Config,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Result<Self, ConfigError> {
		config.validate()?;

		let token_client = TokenClient::new(
			config.token_endpoint.clone(),
			&config.client_id,
			&config.client_secret,
			http_client,
			mapper,
		);
		let cipher = TokenCipher::new(config.encryption_secret.clone())?;
		let callbacks = CallbackUrls {
			web: config.client_callback_url.clone(),
			protocol: config.client_callback_protocol_url.clone(),
		};

		Ok(Self { token_client, cipher, callbacks })
	}
}
impl Broker {
	/// Creates a broker on the reqwest transport stack built at startup.
	pub fn from_config(
		config: &Config,
		http_client: ReqwestHttpClient,
	) -> Result<Self, ConfigError> {
		Self::with_http_client(config, http_client, ReqwestTransportErrorMapper)
	}
}
impl<C, M> Debug for Broker<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Broker")
			.field("token_client", &self.token_client)
			.field("callbacks", &self.callbacks)
			.finish()
	}
}
