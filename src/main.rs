//! `spotify-token-broker` binary.

// std
use std::process::ExitCode;
// crates.io
use clap::Parser;
// self
use spotify_token_broker::{config::Cli, error::error_chain, obs, server};

#[tokio::main]
async fn main() -> ExitCode {
	obs::init_tracing();

	let cli = Cli::parse();
	let result = match cli.load_config() {
		Ok(config) => server::serve(config).await,
		Err(e) => Err(e),
	};

	match result {
		Ok(()) => ExitCode::SUCCESS,
		Err(e) => {
			tracing::error!(error = %error_chain(&e), "Token broker failed.");

			ExitCode::FAILURE
		},
	}
}
