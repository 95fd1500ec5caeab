use std::sync::Arc;

use hyper::{HeaderMap, Method, StatusCode, Uri};
use vercel_runtime::{run, service_fn, Error, Request, Response, ResponseBody};

use yt_dashboard_rust::config::YoutubeOAuthConfig;
use yt_dashboard_rust::db::token_store_from_env;
use yt_dashboard_rust::error::DashboardError;
use yt_dashboard_rust::http::{
  clear_state_cookie, get_cookie, get_query_param, json_response, method_not_allowed, redirect_response,
  OAUTH_STATE_COOKIE,
};
use yt_dashboard_rust::logging::init_tracing;
use yt_dashboard_rust::providers::youtube::{TokenExchange, YoutubeOAuth};
use yt_dashboard_rust::token_store::{TokenRecord, TokenStore};

struct AppState {
  store: Arc<dyn TokenStore>,
}

async fn handle_callback(
  method: &Method,
  uri: &Uri,
  headers: &HeaderMap,
  oauth: Result<(&YoutubeOAuthConfig, &dyn TokenExchange), &DashboardError>,
  store: &dyn TokenStore,
) -> Result<Response<ResponseBody>, Error> {
  if method != Method::GET {
    return method_not_allowed();
  }

  let provider_error = get_query_param(uri, "error");
  let code = get_query_param(uri, "code").filter(|c| !c.trim().is_empty());
  if provider_error.is_none() && code.is_none() {
    return json_response(
      StatusCode::BAD_REQUEST,
      serde_json::json!({"ok": false, "error": "bad_request", "message": "code is required"}),
    );
  }

  let (config, exchange) = match oauth {
    Ok(pair) => pair,
    Err(err) => {
      tracing::error!(error = %err, "youtube oauth callback is not configured");
      return json_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        serde_json::json!({"ok": false, "error": "not_configured", "message": err.to_string()}),
      );
    }
  };

  let fail = || redirect_response(&config.auth_result_url(false), Some(clear_state_cookie()));

  if let Some(provider_error) = provider_error {
    tracing::warn!(provider_error = %provider_error, "google returned an authorization error");
    return fail();
  }
  let Some(code) = code else {
    return fail();
  };

  let expected_state = get_cookie(headers, OAUTH_STATE_COOKIE);
  let returned_state = get_query_param(uri, "state");
  if expected_state.is_none() || expected_state != returned_state {
    tracing::warn!(
      has_cookie = expected_state.is_some(),
      has_state = returned_state.is_some(),
      "oauth state mismatch"
    );
    return fail();
  }

  let tokens = match exchange.exchange_code(&code).await {
    Ok(tokens) => tokens,
    Err(err) => {
      tracing::error!(error = %err, "authorization code exchange failed");
      return fail();
    }
  };

  if tokens.refresh_token.is_none() {
    tracing::warn!("google did not return a refresh token; keeping any stored one");
  }

  // The browser already holds a valid grant; a storage failure only costs the
  // next request its live data.
  if let Err(err) = store.save(&TokenRecord::from_tokens(&tokens)).await {
    tracing::error!(error = %err, "could not persist youtube tokens");
  } else {
    tracing::info!(expires_at = ?tokens.expires_at, "youtube tokens stored");
  }

  redirect_response(&config.auth_result_url(true), Some(clear_state_cookie()))
}

async fn handler(req: Request, state: &AppState) -> Result<Response<ResponseBody>, Error> {
  let oauth = YoutubeOAuthConfig::from_env().and_then(|config| {
    let exchange = YoutubeOAuth::from_config(&config)?;
    Ok((config, exchange))
  });
  let oauth = oauth
    .as_ref()
    .map(|(config, exchange)| (config, exchange as &dyn TokenExchange));

  handle_callback(req.method(), req.uri(), req.headers(), oauth, state.store.as_ref()).await
}

#[tokio::main]
async fn main() -> Result<(), Error> {
  init_tracing();

  let state = Arc::new(AppState {
    store: token_store_from_env(),
  });

  run(service_fn(move |req: Request| {
    let state = state.clone();
    async move { handler(req, &state).await }
  }))
  .await
}
