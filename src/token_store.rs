use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DashboardError;
use crate::providers::youtube::OAuthTokens;

/// The single persisted credential row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenRecord {
  pub access_token: Option<String>,
  pub refresh_token: Option<String>,
  pub expires_at: Option<DateTime<Utc>>,
}

impl TokenRecord {
  pub fn from_tokens(tokens: &OAuthTokens) -> Self {
    Self {
      access_token: Some(tokens.access_token.clone()),
      refresh_token: tokens.refresh_token.clone(),
      expires_at: tokens.expires_at.map(|t| t.trunc_subsecs(0)),
    }
  }

  pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
    self.expires_at.map(|t| t <= now).unwrap_or(false)
  }
}

/// Upsert-by-fixed-key persistence for the one token row.
#[async_trait]
pub trait TokenStore: Send + Sync {
  async fn load(&self) -> Result<Option<TokenRecord>, DashboardError>;

  /// Overwrites the row. A record without a refresh token keeps the stored one.
  async fn save(&self, record: &TokenRecord) -> Result<(), DashboardError>;

  /// Writes a refreshed record only if the stored refresh token is still
  /// `previous_refresh_token`. Returns `false` when another writer got there first.
  async fn save_refreshed(
    &self,
    previous_refresh_token: &str,
    record: &TokenRecord,
  ) -> Result<bool, DashboardError>;
}

/// Process-local store for local runs without a database.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
  row: Mutex<Option<TokenRecord>>,
}

impl MemoryTokenStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_record(record: TokenRecord) -> Self {
    Self {
      row: Mutex::new(Some(record)),
    }
  }

  fn lock(&self) -> Result<std::sync::MutexGuard<'_, Option<TokenRecord>>, DashboardError> {
    self
      .row
      .lock()
      .map_err(|_| DashboardError::Persistence("token row lock poisoned".to_string()))
  }
}

fn merge(existing: Option<&TokenRecord>, record: &TokenRecord) -> TokenRecord {
  TokenRecord {
    access_token: record.access_token.clone(),
    refresh_token: record
      .refresh_token
      .clone()
      .or_else(|| existing.and_then(|r| r.refresh_token.clone())),
    expires_at: record.expires_at,
  }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
  async fn load(&self) -> Result<Option<TokenRecord>, DashboardError> {
    Ok(self.lock()?.clone())
  }

  async fn save(&self, record: &TokenRecord) -> Result<(), DashboardError> {
    let mut row = self.lock()?;
    let merged = merge(row.as_ref(), record);
    *row = Some(merged);
    Ok(())
  }

  async fn save_refreshed(
    &self,
    previous_refresh_token: &str,
    record: &TokenRecord,
  ) -> Result<bool, DashboardError> {
    let mut row = self.lock()?;
    let current = row.as_ref().and_then(|r| r.refresh_token.as_deref());
    if current != Some(previous_refresh_token) {
      return Ok(false);
    }
    let merged = merge(row.as_ref(), record);
    *row = Some(merged);
    Ok(true)
  }
}

/// Stand-in used when no database URL is configured; every call fails, so the
/// analytics route degrades to fallback data instead of refusing to boot.
#[derive(Debug, Clone)]
pub struct UnconfiguredTokenStore {
  reason: String,
}

impl UnconfiguredTokenStore {
  pub fn new(reason: impl Into<String>) -> Self {
    Self { reason: reason.into() }
  }
}

#[async_trait]
impl TokenStore for UnconfiguredTokenStore {
  async fn load(&self) -> Result<Option<TokenRecord>, DashboardError> {
    Err(DashboardError::Persistence(self.reason.clone()))
  }

  async fn save(&self, _record: &TokenRecord) -> Result<(), DashboardError> {
    Err(DashboardError::Persistence(self.reason.clone()))
  }

  async fn save_refreshed(&self, _previous: &str, _record: &TokenRecord) -> Result<bool, DashboardError> {
    Err(DashboardError::Persistence(self.reason.clone()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  fn record(access: &str, refresh: Option<&str>) -> TokenRecord {
    TokenRecord {
      access_token: Some(access.to_string()),
      refresh_token: refresh.map(str::to_string),
      expires_at: Some(Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap()),
    }
  }

  #[tokio::test]
  async fn save_then_load_returns_same_values() {
    let store = MemoryTokenStore::new();
    assert_eq!(store.load().await.unwrap(), None);

    let saved = record("at-1", Some("rt-1"));
    store.save(&saved).await.unwrap();
    assert_eq!(store.load().await.unwrap(), Some(saved));
  }

  #[tokio::test]
  async fn save_overwrites_and_keeps_refresh_token_when_absent() {
    let store = MemoryTokenStore::with_record(record("at-1", Some("rt-1")));
    store.save(&record("at-2", None)).await.unwrap();

    let loaded = store.load().await.unwrap().unwrap();
    assert_eq!(loaded.access_token.as_deref(), Some("at-2"));
    assert_eq!(loaded.refresh_token.as_deref(), Some("rt-1"));
  }

  #[tokio::test]
  async fn save_refreshed_rejects_stale_refresh_token() {
    let store = MemoryTokenStore::with_record(record("at-1", Some("rt-2")));

    let applied = store.save_refreshed("rt-1", &record("at-x", None)).await.unwrap();
    assert!(!applied);
    assert_eq!(store.load().await.unwrap().unwrap().access_token.as_deref(), Some("at-1"));

    let applied = store.save_refreshed("rt-2", &record("at-3", None)).await.unwrap();
    assert!(applied);
    let loaded = store.load().await.unwrap().unwrap();
    assert_eq!(loaded.access_token.as_deref(), Some("at-3"));
    assert_eq!(loaded.refresh_token.as_deref(), Some("rt-2"));
  }

  #[tokio::test]
  async fn unconfigured_store_fails_with_persistence_error() {
    let store = UnconfiguredTokenStore::new("Missing DATABASE_URL");
    assert!(matches!(store.load().await, Err(DashboardError::Persistence(_))));
  }

  #[tokio::test]
  async fn record_from_tokens_keeps_whole_second_expiry() {
    let tokens = OAuthTokens {
      access_token: "at-1".to_string(),
      refresh_token: None,
      expires_at: Some(Utc.timestamp_opt(1_773_489_600, 700_367_910).unwrap()),
      scope: None,
    };
    let record = TokenRecord::from_tokens(&tokens);
    assert_eq!(record.expires_at, Some(Utc.timestamp_opt(1_773_489_600, 0).unwrap()));

    let store = MemoryTokenStore::new();
    store.save(&record).await.unwrap();
    assert_eq!(store.load().await.unwrap(), Some(record));
  }

  #[test]
  fn expiry_is_inclusive_and_absent_means_not_expired() {
    let now = Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap();
    assert!(record("a", None).is_expired(now));
    assert!(!TokenRecord::default().is_expired(now));
  }
}
