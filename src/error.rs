use thiserror::Error;

use crate::providers::youtube_analytics::YoutubeAnalyticsError;

/// Everything that can go wrong between the token row and the YouTube APIs.
///
/// The analytics route never turns one of these into a 500; the orchestrator
/// matches on the variant to pick between a refresh and the fallback data.
#[derive(Debug, Error)]
pub enum DashboardError {
  #[error("authorization code exchange failed: {0}")]
  AuthExchange(String),

  #[error("refresh token rejected: {0}")]
  AuthRefresh(String),

  #[error("access token rejected by YouTube (status {status}): {message}")]
  UpstreamAuth { status: u16, message: String },

  #[error("YouTube request failed: {0}")]
  Upstream(String),

  #[error("token store error: {0}")]
  Persistence(String),

  #[error("configuration error: {0}")]
  Config(String),
}

impl DashboardError {
  pub fn is_upstream_auth(&self) -> bool {
    matches!(self, DashboardError::UpstreamAuth { .. })
  }
}

impl From<YoutubeAnalyticsError> for DashboardError {
  fn from(err: YoutubeAnalyticsError) -> Self {
    match err.status {
      Some(401) => DashboardError::UpstreamAuth {
        status: 401,
        message: err.message,
      },
      _ => DashboardError::Upstream(err.to_string()),
    }
  }
}

impl From<sqlx::Error> for DashboardError {
  fn from(err: sqlx::Error) -> Self {
    DashboardError::Persistence(err.to_string())
  }
}
