//! Process entry: bind the listener and serve until a shutdown signal arrives.

// crates.io
use tokio::net::TcpListener;
// self
use crate::{
	_prelude::*,
	api::{self, AppState, CorsPolicy},
	config::Config,
	error::ConfigError,
	flows::Broker,
	http::ReqwestHttpClient,
};

/// Wires the broker from `config` and serves HTTP until Ctrl+C or SIGTERM.
pub async fn serve(config: Config) -> Result<()> {
	let http_client = ReqwestHttpClient::new()?;
	let broker = Broker::from_config(&config, http_client)?;
	let cors = CorsPolicy::from_config(&config.cors)?;
	let app = api::router(AppState::new(broker), cors);
	let listener = TcpListener::bind(config.listen)
		.await
		.map_err(|source| ConfigError::Bind { addr: config.listen, source })?;

	tracing::info!(
		listen = %config.listen,
		token_endpoint = %config.token_endpoint,
		"Token broker listening."
	);

	axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

	tracing::info!("Token broker stopped.");

	Ok(())
}

async fn shutdown_signal() {
	let ctrl_c = async {
		if let Err(e) = tokio::signal::ctrl_c().await {
			tracing::warn!(error = %e, "Ctrl+C handler unavailable.");

			std::future::pending::<()>().await;
		}
	};

	#[cfg(unix)]
	let terminate = async {
		match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
			Ok(mut signal) => {
				signal.recv().await;
			},
			Err(e) => {
				tracing::warn!(error = %e, "SIGTERM handler unavailable.");

				std::future::pending::<()>().await;
			},
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down."),
		_ = terminate => tracing::info!("Received SIGTERM, shutting down."),
	}
}
