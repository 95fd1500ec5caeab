use crate::error::DashboardError;

pub const CALLBACK_PATH: &str = "/api/auth/youtube/callback";
const DEFAULT_AUTH_REDIRECT_PATH: &str = "/";

/// OAuth settings, read from the environment on every request so a redeploy
/// with rotated credentials takes effect without a cold start.
#[derive(Debug, Clone)]
pub struct YoutubeOAuthConfig {
  pub client_id: String,
  pub client_secret: String,
  pub base_url: String,
  pub auth_redirect_path: String,
}

impl YoutubeOAuthConfig {
  pub fn new(client_id: &str, client_secret: &str, base_url: &str) -> Result<Self, DashboardError> {
    if client_id.trim().is_empty() {
      return Err(DashboardError::Config("Missing YOUTUBE_CLIENT_ID".to_string()));
    }
    if client_secret.trim().is_empty() {
      return Err(DashboardError::Config("Missing YOUTUBE_CLIENT_SECRET".to_string()));
    }
    if base_url.trim().is_empty() {
      return Err(DashboardError::Config("Missing APP_BASE_URL".to_string()));
    }

    Ok(Self {
      client_id: client_id.trim().to_string(),
      client_secret: client_secret.trim().to_string(),
      base_url: base_url.trim().trim_end_matches('/').to_string(),
      auth_redirect_path: DEFAULT_AUTH_REDIRECT_PATH.to_string(),
    })
  }

  pub fn from_env() -> Result<Self, DashboardError> {
    let client_id = std::env::var("YOUTUBE_CLIENT_ID").unwrap_or_default();
    let client_secret = std::env::var("YOUTUBE_CLIENT_SECRET").unwrap_or_default();
    let base_url = std::env::var("APP_BASE_URL").unwrap_or_default();

    let mut config = Self::new(&client_id, &client_secret, &base_url)?;
    if let Some(path) = std::env::var("AUTH_REDIRECT_PATH")
      .ok()
      .map(|v| v.trim().to_string())
      .filter(|v| v.starts_with('/'))
    {
      config.auth_redirect_path = path;
    }
    Ok(config)
  }

  pub fn redirect_uri(&self) -> String {
    format!("{}{}", self.base_url, CALLBACK_PATH)
  }

  /// UI location the callback sends the browser back to, tagged with the outcome.
  pub fn auth_result_url(&self, success: bool) -> String {
    let flag = if success { "success" } else { "error" };
    format!("{}{}?auth={flag}", self.base_url, self.auth_redirect_path)
  }
}

pub fn database_url_from_env() -> Option<String> {
  std::env::var("SUPABASE_DATABASE_URL")
    .or_else(|_| std::env::var("DATABASE_URL"))
    .ok()
    .filter(|v| !v.trim().is_empty())
}
