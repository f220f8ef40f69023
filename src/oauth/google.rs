use anyhow::Context;
use axum::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{IdentityProvider, ProviderProfile};
use crate::config::GoogleConfig;

const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";
const SCOPES: &str = "openid email profile";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    id: String,
    email: Option<String>,
    verified_email: Option<bool>,
    name: Option<String>,
    picture: Option<String>,
}

impl From<GoogleUserInfo> for ProviderProfile {
    fn from(u: GoogleUserInfo) -> Self {
        let verified = u.verified_email.unwrap_or(true);
        Self {
            id: u.id,
            email: u.email.filter(|e| verified && !e.is_empty()),
            display_name: u.name.filter(|n| !n.is_empty()),
            photo: u.picture.filter(|p| !p.is_empty()),
        }
    }
}

pub struct GoogleProvider {
    http: reqwest::Client,
    config: GoogleConfig,
}

impl GoogleProvider {
    pub fn new(config: GoogleConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl IdentityProvider for GoogleProvider {
    fn authorize_url(&self, state: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}",
            AUTH_URL,
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(&self.config.redirect_url),
            urlencoding::encode(SCOPES),
            urlencoding::encode(state),
        )
    }

    async fn fetch_profile(&self, code: &str) -> anyhow::Result<ProviderProfile> {
        let token: TokenResponse = self
            .http
            .post(TOKEN_URL)
            .form(&[
                ("code", code),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("redirect_uri", self.config.redirect_url.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .context("google token exchange")?
            .error_for_status()
            .context("google token exchange status")?
            .json()
            .await
            .context("decode google token response")?;

        let info: GoogleUserInfo = self
            .http
            .get(USERINFO_URL)
            .bearer_auth(&token.access_token)
            .send()
            .await
            .context("google userinfo")?
            .error_for_status()
            .context("google userinfo status")?
            .json()
            .await
            .context("decode google userinfo")?;

        debug!(google_id = %info.id, "google profile fetched");
        Ok(info.into())
    }
}
