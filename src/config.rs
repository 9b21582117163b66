//! Process configuration.
//!
//! Values are layered with figment: built-in defaults, then an optional TOML file, then
//! `TOKEN_BROKER_*` environment variables (nested keys separated by `__`, e.g.
//! `TOKEN_BROKER_CORS__ALLOWED_ORIGINS`). The result is validated once at startup and passed
//! explicitly to everything that needs it.

// std
use std::{
	net::SocketAddr,
	path::{Path, PathBuf},
};
// crates.io
use clap::Parser;
use figment::{
	Figment,
	providers::{Env, Format, Serialized, Toml},
};
// self
use crate::{_prelude::*, auth::TokenSecret, error::ConfigError, provider::SPOTIFY_TOKEN_URL};

/// Prefix for configuration environment variables.
pub const ENV_PREFIX: &str = "TOKEN_BROKER_";

/// Command-line arguments of the `spotify-token-broker` binary.
#[derive(Debug, Parser)]
#[command(name = "spotify-token-broker", version, about = "Spotify OAuth 2.0 token-swap service.")]
pub struct Cli {
	/// Path to a TOML configuration file.
	#[arg(short, long, env = "TOKEN_BROKER_CONFIG")]
	pub config: Option<PathBuf>,
	/// Address to listen on, overriding the configured value.
	#[arg(short, long)]
	pub listen: Option<SocketAddr>,
}
impl Cli {
	/// Loads the configuration named by these arguments and applies the overrides.
	pub fn load_config(&self) -> Result<Config> {
		let mut config = Config::load(self.config.as_deref())?;

		if let Some(listen) = self.listen {
			config.listen = listen;
		}

		Ok(config)
	}
}

/// Runtime configuration. Secrets stay redacted in `Debug` output.
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
	/// Socket address the HTTP server binds to.
	pub listen: SocketAddr,
	/// OAuth client identifier.
	pub client_id: String,
	/// OAuth client secret.
	pub client_secret: TokenSecret,
	/// Default redirect URI for `/exchangeCode`, forwarded verbatim.
	pub client_callback_url: String,
	/// Default redirect URI for `/exchangeCodeProtocol` (native apps), forwarded verbatim.
	pub client_callback_protocol_url: String,
	/// Server-side secret used to seal refresh tokens.
	#[serde(alias = "enc_secret")]
	pub encryption_secret: TokenSecret,
	/// Upstream token endpoint.
	pub token_endpoint: Url,
	/// Cross-origin policy.
	#[serde(default)]
	pub cors: CorsConfig,
}
impl Config {
	/// Listen address used when none is configured.
	pub const DEFAULT_LISTEN: &str = "0.0.0.0:8080";

	/// Loads defaults, the optional TOML file at `path`, then `TOKEN_BROKER_*` variables.
	pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
		let mut figment = Self::defaults();

		if let Some(path) = path {
			if !path.exists() {
				return Err(ConfigError::MissingFile { path: path.display().to_string() });
			}

			figment = figment.merge(Toml::file(path));
		}

		figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

		Self::from_figment(figment)
	}

	/// Figment seeded with the built-in defaults.
	pub fn defaults() -> Figment {
		Figment::from(Serialized::default("listen", Self::DEFAULT_LISTEN))
			.merge(Serialized::default("token_endpoint", SPOTIFY_TOKEN_URL))
	}

	/// Extracts and validates a configuration from an assembled figment.
	pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
		let config: Self = figment.extract()?;

		config.validate()?;

		Ok(config)
	}

	/// Rejects empty credentials and secrets and unparsable callback URLs.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.client_id.trim().is_empty() {
			return Err(ConfigError::EmptyValue { key: "client_id" });
		}
		if self.client_secret.is_blank() {
			return Err(ConfigError::EmptyValue { key: "client_secret" });
		}
		if self.encryption_secret.is_blank() {
			return Err(ConfigError::EmptyValue { key: "encryption_secret" });
		}

		for (key, value) in [
			("client_callback_url", &self.client_callback_url),
			("client_callback_protocol_url", &self.client_callback_protocol_url),
		] {
			Url::parse(value).map_err(|source| ConfigError::InvalidUrl { key, source })?;
		}

		Ok(())
	}
}

/// Cross-origin settings.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CorsConfig {
	/// Allowed origins. Empty mirrors every request origin.
	#[serde(default)]
	pub allowed_origins: Vec<String>,
}
