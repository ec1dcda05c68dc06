//! OAuth token lifecycle: PKCE material, token-endpoint client and the
//! refresh-on-demand token provider used at publish time.

mod client;
mod pkce;
mod tokens;

pub use client::{OAuthClient, TokenResponse};
pub use pkce::{challenge_from_verifier, generate_pkce_pair, generate_state, generate_verifier};
pub use tokens::{staleness_margin, TokenProvider};

/// Lifetime of a pending PKCE state row.
pub fn state_ttl() -> chrono::Duration {
    chrono::Duration::minutes(10)
}
