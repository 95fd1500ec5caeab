use bytes::Bytes;
use chrono::NaiveDate;
use http_body_util::{BodyExt, Empty};
use hyper::header::{ACCEPT, AUTHORIZATION};
use hyper::{Method, Request, StatusCode};
use serde_json::Value;

use crate::analytics::PeriodTotals;

pub const YOUTUBE_ANALYTICS_BASE_URL: &str = "https://youtubeanalytics.googleapis.com/";

const CORE_METRICS: &str =
  "views,estimatedMinutesWatched,averageViewDuration,subscribersGained,subscribersLost,estimatedRevenue";
const CORE_METRICS_NO_REVENUE: &str =
  "views,estimatedMinutesWatched,averageViewDuration,subscribersGained,subscribersLost";
const IMPRESSION_METRICS: &str = "videoThumbnailImpressions,videoThumbnailImpressionsClickRate";

#[derive(Debug)]
pub struct YoutubeAnalyticsError {
  pub status: Option<u16>,
  pub message: String,
}

impl std::fmt::Display for YoutubeAnalyticsError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    if let Some(status) = self.status {
      write!(f, "YouTube Analytics error (status {status}): {}", self.message)
    } else {
      write!(f, "YouTube Analytics error: {}", self.message)
    }
  }
}

impl std::error::Error for YoutubeAnalyticsError {}

fn is_unauthorized(err: &YoutubeAnalyticsError) -> bool {
  err.status == Some(401)
}

fn is_query_not_supported(err: &YoutubeAnalyticsError) -> bool {
  let msg = err.message.as_str();
  err.status == Some(400)
    && (msg.contains("The query is not supported")
      || msg.contains("Unknown identifier")
      || msg.contains("Unknown metric"))
}

fn is_forbidden(err: &YoutubeAnalyticsError) -> bool {
  err.status == Some(403)
}

// Channels outside the Partner Program get 403 (or an unsupported-query 400)
// for estimatedRevenue.
fn should_retry_without_revenue(err: &YoutubeAnalyticsError) -> bool {
  is_query_not_supported(err) || is_forbidden(err)
}

pub fn build_totals_url(base_url: &str, start_dt: NaiveDate, end_dt: NaiveDate, metrics: &str) -> String {
  let base = base_url.trim_end_matches('/');
  format!(
    "{base}/v2/reports?ids=channel==MINE&startDate={}&endDate={}&metrics={metrics}",
    start_dt, end_dt
  )
}

fn number_at(row: &[Value], idx: usize) -> Option<f64> {
  row
    .get(idx)
    .and_then(|v| v.as_f64().or_else(|| v.as_str().and_then(|s| s.parse().ok())))
}

/// Copies every recognised metric of a dimensionless report into `totals`.
/// Metrics absent from the report leave the existing value alone.
pub fn apply_report(json: &Value, totals: &mut PeriodTotals) {
  let headers = json
    .get("columnHeaders")
    .and_then(|v| v.as_array())
    .cloned()
    .unwrap_or_default();

  let Some(row) = json
    .get("rows")
    .and_then(|v| v.as_array())
    .and_then(|rows| rows.first())
    .and_then(|r| r.as_array())
  else {
    return;
  };

  for (i, h) in headers.iter().enumerate() {
    let name = h.get("name").and_then(|v| v.as_str()).unwrap_or("");
    let Some(value) = number_at(row, i) else {
      continue;
    };
    let count = value.max(0.0).round() as u64;
    match name {
      "views" => totals.views = count,
      "estimatedMinutesWatched" => totals.watch_time_minutes = count,
      "averageViewDuration" => totals.average_view_duration = value.max(0.0),
      "subscribersGained" => totals.subscribers_gained = count,
      "subscribersLost" => totals.subscribers_lost = count,
      "estimatedRevenue" => totals.revenue = value.max(0.0),
      "impressions" | "videoThumbnailImpressions" => totals.impressions = count,
      "videoThumbnailImpressionsClickRate" => totals.click_through_rate = value.max(0.0),
      _ => {}
    }
  }
}

async fn fetch_report_json_by_url(access_token: &str, url: &str) -> Result<Value, YoutubeAnalyticsError> {
  let connector = hyper_rustls::HttpsConnectorBuilder::new()
    .with_native_roots()
    .map_err(|e| YoutubeAnalyticsError {
      status: None,
      message: e.to_string(),
    })?
    .https_or_http()
    .enable_http1()
    .build();

  let client = hyper_util::client::legacy::Client::builder(hyper_util::rt::TokioExecutor::new()).build(connector);

  let req = Request::builder()
    .method(Method::GET)
    .uri(url)
    .header(AUTHORIZATION, format!("Bearer {}", access_token))
    .header(ACCEPT, "application/json")
    .body(Empty::<Bytes>::new())
    .map_err(|e| YoutubeAnalyticsError {
      status: None,
      message: e.to_string(),
    })?;

  let resp = client
    .request(req)
    .await
    .map_err(|e| YoutubeAnalyticsError {
      status: None,
      message: e.to_string(),
    })?;

  let status = resp.status();
  let body_bytes = resp
    .into_body()
    .collect()
    .await
    .map_err(|e| YoutubeAnalyticsError {
      status: Some(status.as_u16()),
      message: e.to_string(),
    })?
    .to_bytes();

  if status != StatusCode::OK {
    let msg = String::from_utf8_lossy(&body_bytes).to_string();
    return Err(YoutubeAnalyticsError {
      status: Some(status.as_u16()),
      message: msg,
    });
  }

  serde_json::from_slice::<Value>(&body_bytes).map_err(|e| YoutubeAnalyticsError {
    status: Some(status.as_u16()),
    message: format!("invalid json response: {e}"),
  })
}

/// Totals for one period: the core report, then the thumbnail-impressions report.
///
/// Only a 401 from either report is fatal to the caller's credentials; a
/// revenue-less channel or a missing impressions report degrades to zeros.
pub async fn fetch_period_totals_with_base_url(
  access_token: &str,
  base_url: &str,
  start_dt: NaiveDate,
  end_dt: NaiveDate,
) -> Result<PeriodTotals, YoutubeAnalyticsError> {
  let mut totals = PeriodTotals::default();

  let core_url = build_totals_url(base_url, start_dt, end_dt, CORE_METRICS);
  let core = match fetch_report_json_by_url(access_token, &core_url).await {
    Ok(json) => json,
    Err(err) if should_retry_without_revenue(&err) => {
      tracing::info!(status = ?err.status, "revenue metrics unavailable, retrying without estimatedRevenue");
      let url = build_totals_url(base_url, start_dt, end_dt, CORE_METRICS_NO_REVENUE);
      fetch_report_json_by_url(access_token, &url).await?
    }
    Err(err) => return Err(err),
  };
  apply_report(&core, &mut totals);

  let impressions_url = build_totals_url(base_url, start_dt, end_dt, IMPRESSION_METRICS);
  match fetch_report_json_by_url(access_token, &impressions_url).await {
    Ok(json) => apply_report(&json, &mut totals),
    Err(err) if is_unauthorized(&err) => return Err(err),
    Err(err) => {
      tracing::warn!(error = %err, "impressions report unavailable, reporting zero impressions");
    }
  }

  Ok(totals)
}
