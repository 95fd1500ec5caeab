use google_youtube3::api::Channel;
use serde::Serialize;

use crate::error::DashboardError;

pub const YOUTUBE_DATA_BASE_URL: &str = "https://youtube.googleapis.com/";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelStats {
  pub channel_id: String,
  pub title: String,
  pub custom_url: Option<String>,
  pub thumbnail_url: Option<String>,
  pub subscriber_count: u64,
  pub view_count: u64,
  pub video_count: u64,
  pub hidden_subscriber_count: bool,
}

pub fn channel_stats_from(channel: Channel) -> Option<ChannelStats> {
  let channel_id = channel.id?;
  let snippet = channel.snippet.unwrap_or_default();
  let statistics = channel.statistics.unwrap_or_default();

  let thumbnail_url = snippet
    .thumbnails
    .and_then(|t| t.high.or(t.medium))
    .and_then(|t| t.url);

  Some(ChannelStats {
    channel_id,
    title: snippet.title.unwrap_or_default(),
    custom_url: snippet.custom_url,
    thumbnail_url,
    subscriber_count: statistics.subscriber_count.unwrap_or(0),
    view_count: statistics.view_count.unwrap_or(0),
    video_count: statistics.video_count.unwrap_or(0),
    hidden_subscriber_count: statistics.hidden_subscriber_count.unwrap_or(false),
  })
}

/// A rejected token must surface as `UpstreamAuth` so the caller can refresh.
fn channel_list_error(err: google_youtube3::Error) -> DashboardError {
  match err {
    google_youtube3::Error::Failure(response) if response.status() == hyper::StatusCode::UNAUTHORIZED => {
      DashboardError::UpstreamAuth {
        status: 401,
        message: "channels.list rejected the access token".to_string(),
      }
    }
    google_youtube3::Error::BadRequest(value)
      if value.pointer("/error/code").and_then(|c| c.as_u64()) == Some(401) =>
    {
      DashboardError::UpstreamAuth {
        status: 401,
        message: value
          .pointer("/error/message")
          .and_then(|m| m.as_str())
          .unwrap_or("Invalid Credentials")
          .to_string(),
      }
    }
    other => DashboardError::Upstream(other.to_string()),
  }
}

pub async fn fetch_my_channel_stats_with_base_url(
  access_token: &str,
  base_url: &str,
) -> Result<ChannelStats, DashboardError> {
  let connector = hyper_rustls::HttpsConnectorBuilder::new()
    .with_native_roots()
    .map_err(|e| DashboardError::Upstream(e.to_string()))?
    .https_or_http()
    .enable_http1()
    .build();

  let client = hyper_util::client::legacy::Client::builder(hyper_util::rt::TokioExecutor::new()).build(connector);

  let mut hub = google_youtube3::YouTube::new(client, access_token.to_string());
  hub.base_url(base_url.to_string());
  hub.root_url(base_url.to_string());

  let (_, response) = hub
    .channels()
    .list(&vec!["snippet".into(), "statistics".into()])
    .mine(true)
    .doit()
    .await
    .map_err(channel_list_error)?;

  response
    .items
    .unwrap_or_default()
    .into_iter()
    .find_map(channel_stats_from)
    .ok_or_else(|| DashboardError::Upstream("No channel found for this token".to_string()))
}
