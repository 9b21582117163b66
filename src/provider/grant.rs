//! Grant types and the per-request grant payload.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// OAuth 2.0 grant types forwarded to the token endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
	/// Authorization Code grant.
	AuthorizationCode,
	/// Refresh Token grant.
	RefreshToken,
	/// Client Credentials grant for app-only tokens.
	ClientCredentials,
}
impl GrantType {
	/// Returns the RFC 6749 identifier for the grant type.
	pub fn as_str(self) -> &'static str {
		match self {
			GrantType::AuthorizationCode => "authorization_code",
			GrantType::RefreshToken => "refresh_token",
			GrantType::ClientCredentials => "client_credentials",
		}
	}
}
impl Display for GrantType {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// One token request, exactly as it will be form-encoded for the provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GrantRequest {
	/// `grant_type=client_credentials`.
	ClientCredentials,
	/// `grant_type=authorization_code&redirect_uri=..&code=..`.
	AuthorizationCode {
		/// Code returned to the redirect URI.
		code: String,
		/// Redirect URI registered for the code, sent exactly as given.
		redirect_uri: String,
	},
	/// `grant_type=refresh_token&refresh_token=..` carrying the raw provider token.
	RefreshToken {
		/// Decrypted refresh token.
		refresh_token: TokenSecret,
	},
}
impl GrantRequest {
	/// Grant type carried by this request.
	pub fn grant_type(&self) -> GrantType {
		match self {
			Self::ClientCredentials => GrantType::ClientCredentials,
			Self::AuthorizationCode { .. } => GrantType::AuthorizationCode,
			Self::RefreshToken { .. } => GrantType::RefreshToken,
		}
	}
}
