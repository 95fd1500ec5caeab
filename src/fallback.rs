use rand::Rng;

use crate::analytics::{build_snapshot, AnalyticsSnapshot, PeriodTotals, ReportWindow};
use crate::providers::youtube_api::ChannelStats;

pub const MOCK_CHANNEL_ID: &str = "mock-channel";

fn mock_period<R: Rng>(rng: &mut R) -> PeriodTotals {
  let views: u64 = rng.random_range(50_000..=500_000);
  let average_view_duration: f64 = rng.random_range(120.0..=600.0);

  PeriodTotals {
    views,
    // Watch time follows views so the numbers stay coherent with each other.
    watch_time_minutes: (views as f64 * average_view_duration / 60.0).round() as u64,
    average_view_duration: (average_view_duration * 10.0).round() / 10.0,
    subscribers_gained: rng.random_range(100..=5_000),
    subscribers_lost: rng.random_range(10..=500),
    revenue: (rng.random_range(100.0..=5_000.0_f64) * 100.0).round() / 100.0,
    impressions: rng.random_range(500_000..=5_000_000),
    click_through_rate: (rng.random_range(2.0..=12.0_f64) * 100.0).round() / 100.0,
  }
}

/// Mock analytics with the same shape as a live snapshot, re-randomized per call.
pub fn generate_snapshot_with<R: Rng>(rng: &mut R, window: ReportWindow) -> AnalyticsSnapshot {
  let current = mock_period(rng);
  let previous = mock_period(rng);
  build_snapshot(&current, &previous, window, false)
}

pub fn generate_channel_stats_with<R: Rng>(rng: &mut R) -> ChannelStats {
  ChannelStats {
    channel_id: MOCK_CHANNEL_ID.to_string(),
    title: "Demo Channel".to_string(),
    custom_url: None,
    thumbnail_url: None,
    subscriber_count: rng.random_range(10_000..=1_000_000),
    view_count: rng.random_range(1_000_000..=100_000_000),
    video_count: rng.random_range(50..=1_000),
    hidden_subscriber_count: false,
  }
}

pub fn generate_snapshot(window: ReportWindow) -> AnalyticsSnapshot {
  generate_snapshot_with(&mut rand::rng(), window)
}

pub fn generate_channel_stats() -> ChannelStats {
  generate_channel_stats_with(&mut rand::rng())
}
