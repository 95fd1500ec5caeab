use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use oauth2::basic::BasicClient;
use oauth2::{
  AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet,
  RedirectUrl, RefreshToken, Scope, TokenResponse, TokenUrl,
};
use serde::Serialize;

use crate::config::YoutubeOAuthConfig;
use crate::error::DashboardError;

pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Scopes requested on every consent: channel metadata, analytics, revenue.
pub const YOUTUBE_SCOPES: [&str; 3] = [
  "https://www.googleapis.com/auth/youtube.readonly",
  "https://www.googleapis.com/auth/yt-analytics.readonly",
  "https://www.googleapis.com/auth/yt-analytics-monetary.readonly",
];

pub type YoutubeOAuthClient =
  BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

#[derive(Debug, Clone, Serialize)]
pub struct OAuthTokens {
  pub access_token: String,
  pub refresh_token: Option<String>,
  pub expires_at: Option<DateTime<Utc>>,
  pub scope: Option<String>,
}

/// The two token grants the dashboard needs from Google.
#[async_trait]
pub trait TokenExchange: Send + Sync {
  async fn exchange_code(&self, code: &str) -> Result<OAuthTokens, DashboardError>;
  async fn refresh(&self, refresh_token: &str) -> Result<OAuthTokens, DashboardError>;
}

pub struct YoutubeOAuth {
  client: YoutubeOAuthClient,
  http: oauth2::reqwest::Client,
}

impl YoutubeOAuth {
  pub fn from_config(config: &YoutubeOAuthConfig) -> Result<Self, DashboardError> {
    Self::with_endpoints(config, GOOGLE_AUTH_URL, GOOGLE_TOKEN_URL)
  }

  pub fn with_endpoints(
    config: &YoutubeOAuthConfig,
    auth_url: &str,
    token_url: &str,
  ) -> Result<Self, DashboardError> {
    let auth_url =
      AuthUrl::new(auth_url.to_string()).map_err(|e| DashboardError::Config(e.to_string()))?;
    let token_url =
      TokenUrl::new(token_url.to_string()).map_err(|e| DashboardError::Config(e.to_string()))?;
    let redirect_url =
      RedirectUrl::new(config.redirect_uri()).map_err(|e| DashboardError::Config(e.to_string()))?;

    let client = BasicClient::new(ClientId::new(config.client_id.clone()))
      .set_client_secret(ClientSecret::new(config.client_secret.clone()))
      .set_auth_uri(auth_url)
      .set_token_uri(token_url)
      .set_redirect_uri(redirect_url);

    // Token endpoints must never be followed through redirects.
    let http = oauth2::reqwest::ClientBuilder::new()
      .redirect(oauth2::reqwest::redirect::Policy::none())
      .build()
      .map_err(|e| DashboardError::Config(e.to_string()))?;

    Ok(Self { client, http })
  }

  /// Returns the consent URL and the CSRF state embedded in it.
  pub fn build_consent_url(&self, scopes: &[&str], state: Option<String>) -> (String, String) {
    let mut request = self.client.authorize_url(|| {
      state
        .clone()
        .map(CsrfToken::new)
        .unwrap_or_else(CsrfToken::new_random)
    });
    for scope in scopes {
      request = request.add_scope(Scope::new(scope.to_string()));
    }

    let (url, csrf) = request
      .add_extra_param("access_type", "offline")
      .add_extra_param("prompt", "consent")
      .url();

    (url.to_string(), csrf.secret().to_string())
  }
}

fn tokens_from_response<T: TokenResponse>(token: &T) -> OAuthTokens {
  OAuthTokens {
    access_token: token.access_token().secret().to_string(),
    refresh_token: token.refresh_token().map(|t| t.secret().to_string()),
    expires_at: token
      .expires_in()
      .and_then(|d| chrono::Duration::from_std(d).ok())
      // Whole seconds: TIMESTAMPTZ would otherwise drop the nanoseconds on save.
      .map(|d| (Utc::now() + d).trunc_subsecs(0)),
    scope: token
      .scopes()
      .map(|scopes| scopes.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(" ")),
  }
}

#[async_trait]
impl TokenExchange for YoutubeOAuth {
  async fn exchange_code(&self, code: &str) -> Result<OAuthTokens, DashboardError> {
    let token = self
      .client
      .exchange_code(AuthorizationCode::new(code.to_string()))
      .request_async(&self.http)
      .await
      .map_err(|e| DashboardError::AuthExchange(e.to_string()))?;

    Ok(tokens_from_response(&token))
  }

  async fn refresh(&self, refresh_token: &str) -> Result<OAuthTokens, DashboardError> {
    let token = self
      .client
      .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
      .request_async(&self.http)
      .await
      .map_err(|e| DashboardError::AuthRefresh(e.to_string()))?;

    Ok(tokens_from_response(&token))
  }
}
