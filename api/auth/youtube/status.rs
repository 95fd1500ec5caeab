use std::sync::Arc;

use chrono::{DateTime, Utc};
use hyper::{Method, StatusCode};
use vercel_runtime::{run, service_fn, Error, Request, Response, ResponseBody};

use yt_dashboard_rust::db::token_store_from_env;
use yt_dashboard_rust::http::{json_response, method_not_allowed};
use yt_dashboard_rust::logging::init_tracing;
use yt_dashboard_rust::token_store::TokenStore;

struct AppState {
  store: Arc<dyn TokenStore>,
}

fn present(value: Option<&str>) -> bool {
  value.map(|v| !v.trim().is_empty()).unwrap_or(false)
}

/// Describes the stored credential without ever echoing a token.
async fn handle_status(
  method: &Method,
  store: &dyn TokenStore,
  now: DateTime<Utc>,
) -> Result<Response<ResponseBody>, Error> {
  if method != Method::GET {
    return method_not_allowed();
  }

  let record = match store.load().await {
    Ok(record) => record.unwrap_or_default(),
    Err(err) => {
      tracing::warn!(error = %err, "token store unavailable");
      return json_response(
        StatusCode::SERVICE_UNAVAILABLE,
        serde_json::json!({"ok": false, "error": "store_unavailable", "message": err.to_string()}),
      );
    }
  };

  let has_access_token = present(record.access_token.as_deref());
  let has_refresh_token = present(record.refresh_token.as_deref());

  json_response(
    StatusCode::OK,
    serde_json::json!({
      "ok": true,
      "connected": has_access_token || has_refresh_token,
      "hasRefreshToken": has_refresh_token,
      "expiresAt": record.expires_at.map(|t| t.to_rfc3339()),
      "expired": record.is_expired(now),
    }),
  )
}

async fn handler(req: Request, state: &AppState) -> Result<Response<ResponseBody>, Error> {
  handle_status(req.method(), state.store.as_ref(), Utc::now()).await
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
