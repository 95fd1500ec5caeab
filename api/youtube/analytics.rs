use std::sync::Arc;

use chrono::Utc;
use hyper::{Method, StatusCode};
use vercel_runtime::{run, service_fn, Error, Request, Response, ResponseBody};

use yt_dashboard_rust::config::YoutubeOAuthConfig;
use yt_dashboard_rust::dashboard::DashboardService;
use yt_dashboard_rust::db::token_store_from_env;
use yt_dashboard_rust::error::DashboardError;
use yt_dashboard_rust::http::{json_response, method_not_allowed};
use yt_dashboard_rust::logging::init_tracing;
use yt_dashboard_rust::providers::youtube::{TokenExchange, YoutubeOAuth};
use yt_dashboard_rust::providers::youtube_source::{YoutubeClient, YoutubeSource};
use yt_dashboard_rust::token_store::TokenStore;

struct AppState {
  store: Arc<dyn TokenStore>,
  youtube: YoutubeClient,
}

async fn handle_analytics(
  method: &Method,
  store: &dyn TokenStore,
  youtube: &dyn YoutubeSource,
  oauth_config: Result<YoutubeOAuthConfig, DashboardError>,
) -> Result<Response<ResponseBody>, Error> {
  if method != Method::GET {
    return method_not_allowed();
  }

  // Without client credentials the route still serves; it just cannot refresh.
  let oauth = match oauth_config.and_then(|config| YoutubeOAuth::from_config(&config)) {
    Ok(oauth) => Some(oauth),
    Err(err) => {
      tracing::warn!(error = %err, "youtube oauth not configured, token refresh disabled");
      None
    }
  };

  let service = DashboardService::new(
    store,
    oauth.as_ref().map(|o| o as &dyn TokenExchange),
    youtube,
  );
  let envelope = service.load(Utc::now()).await;

  json_response(StatusCode::OK, serde_json::to_value(&envelope)?)
}

async fn handler(req: Request, state: &AppState) -> Result<Response<ResponseBody>, Error> {
  handle_analytics(
    req.method(),
    state.store.as_ref(),
    &state.youtube,
    YoutubeOAuthConfig::from_env(),
  )
  .await
}

#[tokio::main]
async fn main() -> Result<(), Error> {
  init_tracing();

  let state = Arc::new(AppState {
    store: token_store_from_env(),
    youtube: YoutubeClient::default(),
  });

  run(service_fn(move |req: Request| {
    let state = state.clone();
    async move { handler(req, &state).await }
  }))
  .await
}
