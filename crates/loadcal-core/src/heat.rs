//! Mapping a day's load against its capacity to a severity bucket.

use serde::{Deserialize, Serialize};

/// Severity of one heatmap day, from least to most loaded.
///
/// The two overload buckets are distinct so callers can tell "over by
/// ratio" from "any load with no capacity", but they share a colour and a
/// severity rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeatLevel {
  /// No load; also zero load against zero capacity.
  Idle,
  /// `0 < ratio <= 0.2`
  Light,
  /// `0.2 < ratio <= 0.4`
  Moderate,
  /// `0.4 < ratio <= 0.6`
  Elevated,
  /// `0.6 < ratio <= 0.8`
  High,
  /// `0.8 < ratio <= 1.0`
  Critical,
  /// `ratio > 1.0`
  Overloaded,
  /// Positive load with zero capacity.
  OverloadedNoCapacity,
}

impl HeatLevel {
  /// Classify `load` against `capacity` with a strict greater-than ladder,
  /// checked from the top.
  pub fn classify(load: f64, capacity: f64) -> Self {
    if capacity == 0.0 {
      return if load > 0.0 {
        Self::OverloadedNoCapacity
      } else {
        Self::Idle
      };
    }

    let ratio = load / capacity;
    if ratio > 1.0 {
      Self::Overloaded
    } else if ratio > 0.8 {
      Self::Critical
    } else if ratio > 0.6 {
      Self::High
    } else if ratio > 0.4 {
      Self::Elevated
    } else if ratio > 0.2 {
      Self::Moderate
    } else if ratio > 0.0 {
      Self::Light
    } else {
      Self::Idle
    }
  }

  /// Display colour, as a CSS hex string.
  pub fn hex(self) -> &'static str {
    match self {
      Self::Idle => "#e5e7eb",
      Self::Light => "#22c55e",
      Self::Moderate => "#a3e635",
      Self::Elevated => "#fbbf24",
      Self::High => "#f97316",
      Self::Critical => "#dc2626",
      Self::Overloaded | Self::OverloadedNoCapacity => "#8B0000",
    }
  }

  /// Visual intensity rank; higher is more severe.
  pub fn severity(self) -> u8 {
    match self {
      Self::Idle => 0,
      Self::Light => 1,
      Self::Moderate => 2,
      Self::Elevated => 3,
      Self::High => 4,
      Self::Critical => 5,
      Self::Overloaded | Self::OverloadedNoCapacity => 6,
    }
  }

  pub fn is_overloaded(self) -> bool {
    matches!(self, Self::Overloaded | Self::OverloadedNoCapacity)
  }
}
