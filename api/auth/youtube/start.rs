use hyper::{Method, StatusCode};
use vercel_runtime::{run, service_fn, Error, Request, Response, ResponseBody};

use yt_dashboard_rust::config::YoutubeOAuthConfig;
use yt_dashboard_rust::error::DashboardError;
use yt_dashboard_rust::http::{json_response, method_not_allowed, redirect_response, state_cookie};
use yt_dashboard_rust::logging::init_tracing;
use yt_dashboard_rust::providers::youtube::{YoutubeOAuth, YOUTUBE_SCOPES};

fn not_configured(err: &DashboardError) -> Result<Response<ResponseBody>, Error> {
  tracing::error!(error = %err, "youtube oauth start is not configured");
  json_response(
    StatusCode::INTERNAL_SERVER_ERROR,
    serde_json::json!({"ok": false, "error": "not_configured", "message": err.to_string()}),
  )
}

async fn handle_start(
  method: &Method,
  config: Result<YoutubeOAuthConfig, DashboardError>,
) -> Result<Response<ResponseBody>, Error> {
  if method != Method::GET {
    return method_not_allowed();
  }

  let oauth = match config.and_then(|config| YoutubeOAuth::from_config(&config)) {
    Ok(oauth) => oauth,
    Err(err) => return not_configured(&err),
  };

  let (consent_url, state) = oauth.build_consent_url(&YOUTUBE_SCOPES, None);
  tracing::info!("redirecting to google consent screen");

  redirect_response(&consent_url, Some(state_cookie(&state)))
}

async fn handler(req: Request) -> Result<Response<ResponseBody>, Error> {
  handle_start(req.method(), YoutubeOAuthConfig::from_env()).await
}

#[tokio::main]
async fn main() -> Result<(), Error> {
  init_tracing();
  run(service_fn(handler)).await
}
