use std::sync::Arc;

use chrono::Utc;
use vercel_runtime::Error;

use yt_dashboard_rust::config::YoutubeOAuthConfig;
use yt_dashboard_rust::dashboard::DashboardService;
use yt_dashboard_rust::db::token_store_from_env;
use yt_dashboard_rust::logging::init_tracing;
use yt_dashboard_rust::providers::youtube::{TokenExchange, YoutubeOAuth};
use yt_dashboard_rust::providers::youtube_source::YoutubeClient;
use yt_dashboard_rust::token_store::{MemoryTokenStore, TokenRecord, TokenStore};

fn parse_flag_value(args: &[String], flag: &str) -> Option<String> {
  args
    .iter()
    .position(|a| a == flag)
    .and_then(|idx| args.get(idx + 1))
    .cloned()
}

/// Runs the analytics route once and prints the envelope.
///
/// `--access-token` / `--refresh-token` seed an in-memory store instead of the
/// database, which is handy for checking a token pasted from the OAuth playground.
#[tokio::main]
async fn main() -> Result<(), Error> {
  dotenvy::dotenv().ok();
  init_tracing();

  let args: Vec<String> = std::env::args().collect();
  let access_token = parse_flag_value(&args, "--access-token");
  let refresh_token = parse_flag_value(&args, "--refresh-token");

  let store: Arc<dyn TokenStore> = if access_token.is_some() || refresh_token.is_some() {
    Arc::new(MemoryTokenStore::with_record(TokenRecord {
      access_token,
      refresh_token,
      expires_at: None,
    }))
  } else {
    token_store_from_env()
  };

  let oauth = match YoutubeOAuthConfig::from_env().and_then(|config| YoutubeOAuth::from_config(&config)) {
    Ok(oauth) => Some(oauth),
    Err(err) => {
      eprintln!("OAuth refresh disabled: {err}");
      None
    }
  };

  let youtube = YoutubeClient::default();
  let service = DashboardService::new(
    store.as_ref(),
    oauth.as_ref().map(|o| o as &dyn TokenExchange),
    &youtube,
  );
  let envelope = service.load(Utc::now()).await;

  println!("{}", serde_json::to_string_pretty(&envelope)?);
  Ok(())
}
