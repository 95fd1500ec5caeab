use async_trait::async_trait;

use crate::analytics::{build_snapshot, AnalyticsSnapshot, ReportWindow};
use crate::error::DashboardError;
use crate::providers::youtube_analytics::{fetch_period_totals_with_base_url, YOUTUBE_ANALYTICS_BASE_URL};
use crate::providers::youtube_api::{fetch_my_channel_stats_with_base_url, ChannelStats, YOUTUBE_DATA_BASE_URL};

/// What a successful authenticated fetch hands back to the route.
#[derive(Debug, Clone)]
pub struct LiveReport {
  pub snapshot: AnalyticsSnapshot,
  pub channel_stats: Option<ChannelStats>,
}

/// One authenticated read of the channel's analytics for a window.
///
/// Must return `DashboardError::UpstreamAuth` when YouTube rejects the token;
/// the orchestrator keys its single refresh-and-retry off that variant.
#[async_trait]
pub trait YoutubeSource: Send + Sync {
  async fn fetch(&self, access_token: &str, window: ReportWindow) -> Result<LiveReport, DashboardError>;
}

#[derive(Debug, Clone)]
pub struct YoutubeClient {
  analytics_base_url: String,
  data_base_url: String,
}

impl Default for YoutubeClient {
  fn default() -> Self {
    Self::with_base_urls(YOUTUBE_ANALYTICS_BASE_URL, YOUTUBE_DATA_BASE_URL)
  }
}

impl YoutubeClient {
  pub fn with_base_urls(analytics_base_url: &str, data_base_url: &str) -> Self {
    Self {
      analytics_base_url: analytics_base_url.to_string(),
      data_base_url: data_base_url.to_string(),
    }
  }
}

// A rejected token outranks any other failure: it is the one the caller can fix.
fn worse_error(a: DashboardError, b: DashboardError) -> DashboardError {
  if !a.is_upstream_auth() && b.is_upstream_auth() {
    b
  } else {
    a
  }
}

#[async_trait]
impl YoutubeSource for YoutubeClient {
  async fn fetch(&self, access_token: &str, window: ReportWindow) -> Result<LiveReport, DashboardError> {
    let periods = tokio::join!(
      fetch_period_totals_with_base_url(
        access_token,
        &self.analytics_base_url,
        window.current_start,
        window.current_end,
      ),
      fetch_period_totals_with_base_url(
        access_token,
        &self.analytics_base_url,
        window.previous_start,
        window.previous_end,
      ),
    );
    let (current, previous) = match periods {
      (Ok(current), Ok(previous)) => (current, previous),
      (Err(err), Ok(_)) | (Ok(_), Err(err)) => return Err(err.into()),
      (Err(current), Err(previous)) => return Err(worse_error(current.into(), previous.into())),
    };

    let channel_stats = match fetch_my_channel_stats_with_base_url(access_token, &self.data_base_url).await {
      Ok(stats) => Some(stats),
      Err(err) if err.is_upstream_auth() => return Err(err),
      Err(err) => {
        tracing::warn!(error = %err, "channel statistics unavailable");
        None
      }
    };

    Ok(LiveReport {
      snapshot: build_snapshot(&current, &previous, window, true),
      channel_stats,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_support::serve_routes;
  use chrono::NaiveDate;
  use hyper::StatusCode;

  #[tokio::test]
  async fn fetch_builds_authenticated_snapshot_for_both_periods() {
    let (base_url, task) = serve_routes(|path, _| {
      if path.contains("/youtube/v3/channels") {
        return (
          StatusCode::OK,
          r#"{"items":[{"id":"UC1","snippet":{"title":"Team"},"statistics":{"subscriberCount":"10","viewCount":"20","videoCount":"3"}}]}"#.to_string(),
        );
      }
      let views = if path.contains("startDate=2026-03-01") { 1_000_000 } else { 900_000 };
      if path.contains("videoThumbnailImpressions") {
        return (StatusCode::OK, r#"{"columnHeaders":[],"rows":[]}"#.to_string());
      }
      (
        StatusCode::OK,
        format!(
          r#"{{"columnHeaders":[{{"name":"views"}},{{"name":"subscribersGained"}},{{"name":"subscribersLost"}}],"rows":[[{views}, 30, 10]]}}"#
        ),
      )
    })
    .await;

    let client = YoutubeClient::with_base_urls(&base_url, &base_url);
    let window = ReportWindow::for_month(NaiveDate::from_ymd_opt(2026, 3, 14).unwrap());
    let report = client.fetch("token", window).await.unwrap();

    assert!(report.snapshot.is_authenticated);
    assert_eq!(report.snapshot.monthly_totals.views, 1_000_000);
    assert_eq!(report.snapshot.previous_totals.views, 900_000);
    assert_eq!(report.snapshot.subscriber_details.current.net(), 20);
    assert!((report.snapshot.growth_rates.views.unwrap() - 11.111).abs() < 1e-3);
    assert_eq!(report.channel_stats.map(|c| c.channel_id), Some("UC1".to_string()));

    task.abort();
  }

  #[tokio::test]
  async fn rejected_channel_lookup_is_not_swallowed() {
    let (base_url, task) = serve_routes(|path, _| {
      if path.contains("/youtube/v3/channels") {
        return (StatusCode::UNAUTHORIZED, r#"{"error":{"code":401}}"#.to_string());
      }
      (
        StatusCode::OK,
        r#"{"columnHeaders":[{"name":"views"}],"rows":[[10]]}"#.to_string(),
      )
    })
    .await;

    let client = YoutubeClient::with_base_urls(&base_url, &base_url);
    let window = ReportWindow::for_month(NaiveDate::from_ymd_opt(2026, 3, 14).unwrap());
    let err = client.fetch("stale", window).await.unwrap_err();
    assert!(err.is_upstream_auth(), "{err:?}");

    task.abort();
  }

  #[tokio::test]
  async fn failing_channel_lookup_degrades_to_no_stats() {
    let (base_url, task) = serve_routes(|path, _| {
      if path.contains("/youtube/v3/channels") {
        return (StatusCode::SERVICE_UNAVAILABLE, r#"{"error":{"code":503}}"#.to_string());
      }
      (
        StatusCode::OK,
        r#"{"columnHeaders":[{"name":"views"}],"rows":[[10]]}"#.to_string(),
      )
    })
    .await;

    let client = YoutubeClient::with_base_urls(&base_url, &base_url);
    let window = ReportWindow::for_month(NaiveDate::from_ymd_opt(2026, 3, 14).unwrap());
    let report = client.fetch("token", window).await.unwrap();
    assert!(report.channel_stats.is_none());
    assert_eq!(report.snapshot.monthly_totals.views, 10);

    task.abort();
  }

  #[tokio::test]
  async fn rejected_token_wins_over_other_period_failure() {
    // Current period: 401. Previous period: 500. Repeat to cover either finishing first.
    let (base_url, task) = serve_routes(|path, _| {
      if path.contains("startDate=2026-03-01") {
        (StatusCode::UNAUTHORIZED, r#"{"error":{"code":401}}"#.to_string())
      } else {
        (StatusCode::INTERNAL_SERVER_ERROR, r#"{"error":{"code":500}}"#.to_string())
      }
    })
    .await;

    let client = YoutubeClient::with_base_urls(&base_url, &base_url);
    let window = ReportWindow::for_month(NaiveDate::from_ymd_opt(2026, 3, 14).unwrap());
    for _ in 0..5 {
      let err = client.fetch("stale", window).await.unwrap_err();
      assert!(err.is_upstream_auth(), "{err:?}");
    }

    task.abort();
  }

  #[test]
  fn worse_error_prefers_rejected_token() {
    let auth = || DashboardError::UpstreamAuth {
      status: 401,
      message: "Invalid Credentials".to_string(),
    };
    let other = || DashboardError::Upstream("backend error".to_string());
    assert!(worse_error(other(), auth()).is_upstream_auth());
    assert!(worse_error(auth(), other()).is_upstream_auth());
    assert!(!worse_error(other(), other()).is_upstream_auth());
  }

  #[tokio::test]
  async fn rejected_token_maps_to_upstream_auth() {
    let (base_url, task) = serve_routes(|_, _| (StatusCode::UNAUTHORIZED, r#"{"error":{"code":401}}"#.to_string())).await;

    let client = YoutubeClient::with_base_urls(&base_url, &base_url);
    let window = ReportWindow::for_month(NaiveDate::from_ymd_opt(2026, 3, 14).unwrap());
    let err = client.fetch("stale", window).await.unwrap_err();
    assert!(err.is_upstream_auth(), "{err:?}");

    task.abort();
  }
}
