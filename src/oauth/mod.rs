//! External identity provider login: the provider seam, the Google client,
//! account linking and the start/callback endpoints.

use axum::{async_trait, Router};

use crate::state::AppState;

pub mod google;
pub mod handlers;
pub mod linker;

/// Profile handed back by the identity provider after its redirect dance.
/// `email` is `None` unless the provider vouches for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderProfile {
    pub id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub photo: Option<String>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Consent page URL carrying the given `state`.
    fn authorize_url(&self, state: &str) -> String;

    /// Exchange an authorization code for the user's profile.
    async fn fetch_profile(&self, code: &str) -> anyhow::Result<ProviderProfile>;
}

pub fn router() -> Router<AppState> {
    handlers::oauth_routes()
}
