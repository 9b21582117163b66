//! The upstream provider: its token endpoint and the grants the broker forwards to it.

pub mod grant;

pub use grant::*;

/// Display name used in client-facing error messages.
pub const PROVIDER_NAME: &str = "Spotify";
/// Well-known Spotify Accounts token endpoint.
pub const SPOTIFY_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
