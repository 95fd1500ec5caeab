use chrono::{Datelike, NaiveDate};
use serde::Serialize;

/// Current calendar month to date, and the whole month before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportWindow {
  pub current_start: NaiveDate,
  pub current_end: NaiveDate,
  pub previous_start: NaiveDate,
  pub previous_end: NaiveDate,
}

impl ReportWindow {
  pub fn for_month(today: NaiveDate) -> Self {
    let current_start = today.with_day(1).unwrap_or(today);
    let previous_end = current_start.pred_opt().unwrap_or(current_start);
    let previous_start = previous_end.with_day(1).unwrap_or(previous_end);

    Self {
      current_start,
      current_end: today,
      previous_start,
      previous_end,
    }
  }
}

/// Raw per-period totals as read off the Analytics API.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PeriodTotals {
  pub views: u64,
  pub watch_time_minutes: u64,
  pub average_view_duration: f64,
  pub subscribers_gained: u64,
  pub subscribers_lost: u64,
  pub revenue: f64,
  pub impressions: u64,
  pub click_through_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyTotals {
  pub views: u64,
  pub watch_time_minutes: u64,
  pub impressions: u64,
  pub revenue: f64,
  pub average_view_duration: f64,
  pub click_through_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrowthRates {
  pub views: Option<f64>,
  pub watch_time_minutes: Option<f64>,
  pub impressions: Option<f64>,
  pub revenue: Option<f64>,
  pub average_view_duration: Option<f64>,
  pub click_through_rate: Option<f64>,
  pub subscribers: Option<f64>,
}

/// Subscriber movement for one period. `net` is derived, never stored apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SubscriberDelta {
  gained: u64,
  lost: u64,
  net: i64,
}

impl SubscriberDelta {
  pub fn new(gained: u64, lost: u64) -> Self {
    Self {
      gained,
      lost,
      net: gained as i64 - lost as i64,
    }
  }

  pub fn gained(&self) -> u64 {
    self.gained
  }

  pub fn lost(&self) -> u64 {
    self.lost
  }

  pub fn net(&self) -> i64 {
    self.net
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SubscriberDetails {
  pub current: SubscriberDelta,
  pub previous: SubscriberDelta,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSnapshot {
  pub monthly_totals: MonthlyTotals,
  pub previous_totals: MonthlyTotals,
  pub growth_rates: GrowthRates,
  pub subscriber_details: SubscriberDetails,
  pub period: ReportWindow,
  pub is_authenticated: bool,
}

/// Percentage change from `previous` to `current`.
///
/// `None` when both are zero (growth is undefined, not zero); `100` when the
/// metric appears from nothing; `-100` for a negative value out of a zero base.
pub fn growth(current: f64, previous: f64) -> Option<f64> {
  if previous == 0.0 {
    return if current == 0.0 {
      None
    } else if current > 0.0 {
      Some(100.0)
    } else {
      Some(-100.0)
    };
  }
  Some((current - previous) / previous * 100.0)
}

fn round2(value: f64) -> f64 {
  (value * 100.0).round() / 100.0
}

fn monthly_totals(totals: &PeriodTotals) -> MonthlyTotals {
  MonthlyTotals {
    views: totals.views,
    watch_time_minutes: totals.watch_time_minutes,
    impressions: totals.impressions,
    revenue: round2(totals.revenue.max(0.0)),
    average_view_duration: totals.average_view_duration.max(0.0),
    click_through_rate: totals.click_through_rate.max(0.0),
  }
}

pub fn build_snapshot(
  current: &PeriodTotals,
  previous: &PeriodTotals,
  period: ReportWindow,
  is_authenticated: bool,
) -> AnalyticsSnapshot {
  let current_subs = SubscriberDelta::new(current.subscribers_gained, current.subscribers_lost);
  let previous_subs = SubscriberDelta::new(previous.subscribers_gained, previous.subscribers_lost);

  let growth_rates = GrowthRates {
    views: growth(current.views as f64, previous.views as f64),
    watch_time_minutes: growth(current.watch_time_minutes as f64, previous.watch_time_minutes as f64),
    impressions: growth(current.impressions as f64, previous.impressions as f64),
    revenue: growth(current.revenue, previous.revenue),
    average_view_duration: growth(current.average_view_duration, previous.average_view_duration),
    click_through_rate: growth(current.click_through_rate, previous.click_through_rate),
    subscribers: growth(current_subs.net() as f64, previous_subs.net() as f64),
  };

  AnalyticsSnapshot {
    monthly_totals: monthly_totals(current),
    previous_totals: monthly_totals(previous),
    growth_rates,
    subscriber_details: SubscriberDetails {
      current: current_subs,
      previous: previous_subs,
    },
    period,
    is_authenticated,
  }
}
