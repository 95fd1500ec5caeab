use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::analytics::{AnalyticsSnapshot, ReportWindow};
use crate::error::DashboardError;
use crate::fallback;
use crate::providers::youtube::TokenExchange;
use crate::providers::youtube_api::ChannelStats;
use crate::providers::youtube_source::{LiveReport, YoutubeSource};
use crate::token_store::{TokenRecord, TokenStore};

const MSG_CONNECT: &str = "YouTube is not connected. Showing sample data until the channel is authorized.";
const MSG_REAUTH: &str = "YouTube authorization expired. Reconnect the channel to see live analytics.";
const MSG_UNAVAILABLE: &str = "YouTube analytics are temporarily unavailable. Showing sample data.";

/// Wire shape of `GET /api/youtube/analytics`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardEnvelope {
  pub analytics: AnalyticsSnapshot,
  pub channel_stats: Option<ChannelStats>,
  pub is_authenticated: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub needs_re_auth: Option<bool>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub message: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
}

impl DashboardEnvelope {
  fn live(report: LiveReport) -> Self {
    Self {
      analytics: report.snapshot,
      channel_stats: report.channel_stats,
      is_authenticated: true,
      needs_re_auth: None,
      message: None,
      error: None,
    }
  }

  fn fallback(window: ReportWindow, needs_re_auth: bool, message: &str, error: Option<&DashboardError>) -> Self {
    Self {
      analytics: fallback::generate_snapshot(window),
      channel_stats: Some(fallback::generate_channel_stats()),
      is_authenticated: false,
      needs_re_auth: needs_re_auth.then_some(true),
      message: Some(message.to_string()),
      error: error.map(|e| e.to_string()),
    }
  }
}

/// Where a request stands with respect to its credentials.
#[derive(Debug)]
enum AuthState {
  NoToken {
    refresh_token: Option<String>,
  },
  Expired {
    refresh_token: String,
  },
  Refreshing {
    refresh_token: String,
  },
  HasAccessToken {
    access_token: String,
    refresh_token: Option<String>,
    refreshed: bool,
  },
}

fn non_blank(value: Option<String>) -> Option<String> {
  value.filter(|v| !v.trim().is_empty())
}

fn initial_state(record: TokenRecord, now: DateTime<Utc>) -> AuthState {
  let expired = record.is_expired(now);
  match (non_blank(record.access_token), non_blank(record.refresh_token)) {
    (Some(_), Some(refresh_token)) if expired => AuthState::Expired { refresh_token },
    // Expiry is advisory: with nothing to refresh from, try the stale token.
    (Some(access_token), refresh_token) => AuthState::HasAccessToken {
      access_token,
      refresh_token,
      refreshed: false,
    },
    (None, refresh_token) => AuthState::NoToken { refresh_token },
  }
}

/// Token lifecycle plus analytics fallback chain for one request.
///
/// A request performs at most one refresh and at most two fetches: the
/// `refreshed` flag on `HasAccessToken` is the only way back into `Refreshing`.
pub struct DashboardService<'a> {
  store: &'a dyn TokenStore,
  oauth: Option<&'a dyn TokenExchange>,
  youtube: &'a dyn YoutubeSource,
}

impl<'a> DashboardService<'a> {
  pub fn new(
    store: &'a dyn TokenStore,
    oauth: Option<&'a dyn TokenExchange>,
    youtube: &'a dyn YoutubeSource,
  ) -> Self {
    Self { store, oauth, youtube }
  }

  pub async fn load(&self, now: DateTime<Utc>) -> DashboardEnvelope {
    let window = ReportWindow::for_month(now.date_naive());

    let record = match self.store.load().await {
      Ok(record) => record.unwrap_or_default(),
      Err(err) => {
        tracing::warn!(error = %err, "token store unavailable, treating as not connected");
        TokenRecord::default()
      }
    };

    let mut state = initial_state(record, now);
    loop {
      tracing::debug!(?state, "analytics auth state");
      state = match state {
        AuthState::NoToken { refresh_token: None } => {
          return DashboardEnvelope::fallback(window, true, MSG_CONNECT, None);
        }
        AuthState::NoToken {
          refresh_token: Some(refresh_token),
        }
        | AuthState::Expired { refresh_token } => AuthState::Refreshing { refresh_token },
        AuthState::Refreshing { refresh_token } => match self.refresh(&refresh_token).await {
          Ok(access_token) => AuthState::HasAccessToken {
            access_token,
            refresh_token: Some(refresh_token),
            refreshed: true,
          },
          Err(err) => {
            tracing::warn!(error = %err, "access token refresh failed");
            return DashboardEnvelope::fallback(window, true, MSG_REAUTH, Some(&err));
          }
        },
        AuthState::HasAccessToken {
          access_token,
          refresh_token,
          refreshed,
        } => match self.youtube.fetch(&access_token, window).await {
          Ok(report) => return DashboardEnvelope::live(report),
          Err(err) if err.is_upstream_auth() => match refresh_token {
            Some(refresh_token) if !refreshed => {
              tracing::info!("access token rejected, refreshing once");
              AuthState::Refreshing { refresh_token }
            }
            _ => {
              tracing::warn!(error = %err, refreshed, "access token rejected, re-authorization required");
              return DashboardEnvelope::fallback(window, true, MSG_REAUTH, Some(&err));
            }
          },
          Err(err) => {
            tracing::warn!(error = %err, "analytics fetch failed, serving sample data");
            return DashboardEnvelope::fallback(window, false, MSG_UNAVAILABLE, Some(&err));
          }
        },
      };
    }
  }

  /// Mints a new access token and persists it. Persistence problems are logged
  /// and never fail the request.
  async fn refresh(&self, refresh_token: &str) -> Result<String, DashboardError> {
    let oauth = self
      .oauth
      .ok_or_else(|| DashboardError::Config("YouTube OAuth client is not configured".to_string()))?;

    let tokens = oauth.refresh(refresh_token).await?;
    let record = TokenRecord::from_tokens(&tokens);

    match self.store.save_refreshed(refresh_token, &record).await {
      Ok(true) => tracing::info!(expires_at = ?record.expires_at, "refreshed access token stored"),
      Ok(false) => tracing::info!("token row was rotated by a concurrent request, keeping it"),
      Err(err) => tracing::warn!(error = %err, "could not persist refreshed access token"),
    }

    Ok(tokens.access_token)
  }
}
