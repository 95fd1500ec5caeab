use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs the global subscriber. `RUST_LOG` drives filtering (default `info`);
/// `LOG_FORMAT=json` switches to one JSON object per line for the platform log drain.
pub fn init_tracing() {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
  let json = std::env::var("LOG_FORMAT")
    .map(|v| v.eq_ignore_ascii_case("json"))
    .unwrap_or(false);

  // try_init: a second call (tests, warm reuse) is a no-op.
  let result = if json {
    tracing_subscriber::registry()
      .with(filter)
      .with(tracing_subscriber::fmt::layer().json().with_target(true))
      .try_init()
  } else {
    tracing_subscriber::registry()
      .with(filter)
      .with(
        tracing_subscriber::fmt::layer()
          .with_target(true)
          .with_thread_ids(false)
          .with_file(false)
          .with_line_number(false),
      )
      .try_init()
  };

  if let Err(err) = result {
    tracing::debug!(error = %err, "tracing subscriber already installed");
  }
}
