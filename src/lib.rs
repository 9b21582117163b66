//! Spotify OAuth 2.0 token-swap service: client credentials, authorization-code exchange, and
//! refresh grants behind a small axum surface, with refresh tokens sealed before they ever leave
//! the server.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod api;
pub mod auth;
pub mod config;
pub mod crypto;
pub mod error;
pub mod flows;
pub mod http;
pub mod oauth;
pub mod obs;
pub mod provider;
pub mod server;
#[doc(hidden)]
pub mod _preludet {
	//! Convenience re-exports and fixtures shared by the integration tests.

	pub use crate::_prelude::*;

	// self
	use crate::{
		api::{self, AppState, CorsPolicy},
		auth::TokenSecret,
		config::{Config, CorsConfig},
		flows::Broker,
		http::ReqwestHttpClient,
	};

	/// Client identifier baked into every test configuration.
	pub const TEST_CLIENT_ID: &str = "client-it";
	/// Client secret baked into every test configuration.
	pub const TEST_CLIENT_SECRET: &str = "secret-it";
	/// Encryption secret baked into every test configuration.
	pub const TEST_ENCRYPTION_SECRET: &str = "encryption-secret-it";
	/// Default web callback used by test configurations.
	pub const TEST_CALLBACK_URL: &str = "https://app.example.com/callback";
	/// Default native-app callback used by test configurations.
	pub const TEST_CALLBACK_PROTOCOL_URL: &str = "exampleapp://spotify-callback";

	/// Builds a configuration pointing at `token_endpoint` (usually an `httpmock` URL).
	pub fn test_config(token_endpoint: &str) -> Config {
		Config {
			listen: Config::DEFAULT_LISTEN.parse().expect("Default listen address should parse."),
			client_id: TEST_CLIENT_ID.into(),
			client_secret: TokenSecret::new(TEST_CLIENT_SECRET),
			client_callback_url: TEST_CALLBACK_URL.into(),
			client_callback_protocol_url: TEST_CALLBACK_PROTOCOL_URL.into(),
			encryption_secret: TokenSecret::new(TEST_ENCRYPTION_SECRET),
			token_endpoint: Url::parse(token_endpoint)
				.expect("Test token endpoint should parse successfully."),
			cors: CorsConfig::default(),
		}
	}

	/// Builds the expected `Authorization` header value for the test client credentials.
	pub fn test_basic_auth_header() -> String {
		use base64::{Engine as _, engine::general_purpose::STANDARD};

		format!("Basic {}", STANDARD.encode(format!("{TEST_CLIENT_ID}:{TEST_CLIENT_SECRET}")))
	}

	/// Constructs a [`Broker`] wired to the reqwest transport for `config`.
	pub fn build_test_broker(config: &Config) -> Broker {
		let http_client =
			ReqwestHttpClient::new().expect("Failed to build reqwest HTTP client for tests.");

		Broker::from_config(config, http_client).expect("Test broker should build successfully.")
	}

	/// Constructs the full HTTP router (CORS gate included) for `config`.
	pub fn build_test_router(config: &Config) -> axum::Router {
		let broker = build_test_broker(config);
		let cors = CorsPolicy::from_config(&config.cors)
			.expect("Test CORS policy should build successfully.");

		api::router(AppState::new(broker), cors)
	}
}

mod _prelude {
	pub use std::{
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use parking_lot::Mutex;
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use url;
#[cfg(test)] use {http_body_util as _, httpmock as _, tower as _};
