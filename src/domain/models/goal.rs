//! Goal domain model.
//!
//! A goal is a user-defined practice target (total minutes, number of
//! sessions, number of completed exercise blocks) tracked over a date window.
//! Its `current_value` is a derived quantity: it is always recomputed from the
//! stored sessions of the owning user, never incremented in place.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};

/// Kind of measure a goal tracks. Each variant maps to exactly one
/// progress strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalType {
    /// Total practice time, summed from completed sessions.
    PracticeDuration,
    /// Number of completed sessions.
    SessionCount,
    /// Number of completed session blocks, optionally of one block type.
    BlockCount,
}

impl GoalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PracticeDuration => "practice_duration",
            Self::SessionCount => "session_count",
            Self::BlockCount => "block_count",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "practice_duration" | "duration" => Some(Self::PracticeDuration),
            "session_count" | "sessions" => Some(Self::SessionCount),
            "block_count" | "blocks" => Some(Self::BlockCount),
            _ => None,
        }
    }

    pub fn all() -> [Self; 3] {
        [Self::PracticeDuration, Self::SessionCount, Self::BlockCount]
    }
}

impl std::fmt::Display for GoalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured goal target, e.g. `{"minutes": 300}` or
/// `{"blocks_per_week": 10, "block_type": "scales"}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GoalTarget(Map<String, Value>);

impl GoalTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style integer parameter.
    pub fn with(mut self, key: impl Into<String>, value: i64) -> Self {
        self.0.insert(key.into(), Value::from(value));
        self
    }

    /// Builder-style text parameter.
    pub fn with_text(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), Value::String(value.into()));
        self
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.0.get(key).and_then(Value::as_i64)
    }

    /// Integer parameter that is present and strictly positive.
    pub fn positive(&self, key: &str) -> Option<i64> {
        self.get_i64(key).filter(|v| *v > 0)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Parse `key=value` pairs as given on the command line. Integer values
    /// are stored as numbers, anything else as text.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = &'a str>) -> DomainResult<Self> {
        let mut target = Self::new();
        for pair in pairs {
            let (key, value) = pair.split_once('=').ok_or_else(|| {
                DomainError::ValidationFailed(format!("Target parameter '{pair}' must be key=value"))
            })?;
            let key = key.trim();
            if key.is_empty() {
                return Err(DomainError::ValidationFailed(format!(
                    "Target parameter '{pair}' has an empty key"
                )));
            }
            let value = value.trim();
            target = match value.parse::<i64>() {
                Ok(n) => target.with(key, n),
                Err(_) => target.with_text(key, value),
            };
        }
        Ok(target)
    }
}

/// Inclusive time range over which progress is aggregated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl ProgressWindow {
    /// Build a window, rejecting ranges whose start lies after their end.
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> DomainResult<Self> {
        if from > to {
            return Err(DomainError::ValidationFailed(format!(
                "window start {from} is after window end {to}"
            )));
        }
        Ok(Self { from, to })
    }

    /// Window covering whole calendar days, `from` 00:00 through `to` 23:59:59.999999.
    pub fn for_dates(from: NaiveDate, to: NaiveDate) -> DomainResult<Self> {
        Self::new(start_of_day(from)?, end_of_day(to)?)
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from <= at && at <= self.to
    }

    /// Overlap of two windows, `None` when they are disjoint.
    pub fn intersect(&self, other: &ProgressWindow) -> Option<ProgressWindow> {
        let from = self.from.max(other.from);
        let to = self.to.min(other.to);
        (from <= to).then_some(ProgressWindow { from, to })
    }

    /// Number of started weeks covered by the window, at least one.
    pub fn weeks(&self) -> i64 {
        let days = (self.to.date_naive() - self.from.date_naive()).num_days() + 1;
        ((days + 6) / 7).max(1)
    }
}

/// First instant of a calendar day in UTC.
pub fn start_of_day(date: NaiveDate) -> DomainResult<DateTime<Utc>> {
    date.and_hms_opt(0, 0, 0)
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or_else(|| DomainError::ValidationFailed(format!("Invalid date: {date}")))
}

/// Last representable microsecond of a calendar day in UTC.
pub fn end_of_day(date: NaiveDate) -> DomainResult<DateTime<Utc>> {
    date.and_hms_micro_opt(23, 59, 59, 999_999)
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or_else(|| DomainError::ValidationFailed(format!("Invalid date: {date}")))
}

/// A practice goal owned by one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub goal_type: GoalType,
    pub target: GoalTarget,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub is_active: bool,
    pub current_value: i64,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Optimistic concurrency counter, bumped on every write.
    pub version: i64,
}

impl Goal {
    /// Create a new active goal starting on `start_date`.
    pub fn new(
        user_id: Uuid,
        name: impl Into<String>,
        goal_type: GoalType,
        target: GoalTarget,
        start_date: NaiveDate,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            name: name.into(),
            goal_type,
            target,
            start_date,
            end_date: None,
            is_active: true,
            current_value: 0,
            completed_at: None,
            created_at: now,
            updated_at: now,
            version: 1,
        }
    }

    pub fn with_end_date(mut self, end_date: NaiveDate) -> Self {
        self.end_date = Some(end_date);
        self
    }

    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    /// Validate the goal's invariants before it is stored.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Goal name cannot be empty".to_string());
        }
        if let Some(end) = self.end_date {
            if end < self.start_date {
                return Err(format!(
                    "Goal end date {end} is before its start date {}",
                    self.start_date
                ));
            }
        }
        if self.target.is_empty() {
            return Err("Goal target cannot be empty".to_string());
        }
        if self.current_value < 0 {
            return Err("Goal progress cannot be negative".to_string());
        }
        Ok(())
    }

    /// Default aggregation window: `[start_date, min(end_date, now)]`.
    ///
    /// Returns `Ok(None)` while the goal has not started yet, and an
    /// `InvalidGoalWindow` error when the stored dates are inconsistent.
    pub fn progress_window(&self, now: DateTime<Utc>) -> DomainResult<Option<ProgressWindow>> {
        let from = self.window_start()?;
        let to = match self.window_end()? {
            Some(end) => end.min(now),
            None => now,
        };
        if from > now {
            return Ok(None);
        }
        ProgressWindow::new(from, to)
            .map(Some)
            .map_err(|e| self.invalid_window(e))
    }

    /// Window the target is measured against: the whole goal period when an
    /// end date exists, otherwise `[start_date, now]`.
    pub fn target_window(&self, now: DateTime<Utc>) -> DomainResult<ProgressWindow> {
        let from = self.window_start()?;
        let to = match self.window_end()? {
            Some(end) => end,
            None => now.max(from),
        };
        ProgressWindow::new(from, to).map_err(|e| self.invalid_window(e))
    }

    fn window_start(&self) -> DomainResult<DateTime<Utc>> {
        start_of_day(self.start_date).map_err(|e| self.invalid_window(e))
    }

    fn window_end(&self) -> DomainResult<Option<DateTime<Utc>>> {
        let Some(end_date) = self.end_date else {
            return Ok(None);
        };
        if end_date < self.start_date {
            return Err(DomainError::InvalidGoalWindow {
                goal_id: self.id,
                reason: format!("start date {} is after end date {end_date}", self.start_date),
            });
        }
        end_of_day(end_date).map(Some).map_err(|e| self.invalid_window(e))
    }

    fn invalid_window(&self, err: DomainError) -> DomainError {
        DomainError::InvalidGoalWindow {
            goal_id: self.id,
            reason: err.to_string(),
        }
    }

    /// Percentage of `total` reached by the stored progress, capped at 100.
    pub fn percent_of(&self, total: i64) -> f64 {
        if total <= 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let ratio = self.current_value as f64 / total as f64;
        (ratio * 100.0).min(100.0)
    }

    /// Days left until the end date, if the goal has one.
    pub fn days_remaining(&self, today: NaiveDate) -> Option<i64> {
        self.end_date
            .map(|end| (end - today).num_days().max(0))
    }
}

/// Snapshot of a goal's progress toward its target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalProgress {
    pub goal_id: Uuid,
    pub current_value: i64,
    pub total_value: i64,
    pub percent: f64,
    pub is_completed: bool,
}

impl GoalProgress {
    pub fn new(goal: &Goal, total_value: i64) -> Self {
        Self {
            goal_id: goal.id,
            current_value: goal.current_value,
            total_value,
            percent: goal.percent_of(total_value),
            is_completed: goal.is_completed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn goal() -> Goal {
        Goal::new(
            Uuid::new_v4(),
            "Practice 5 hours",
            GoalType::PracticeDuration,
            GoalTarget::new().with("minutes", 300),
            date(2024, 1, 1),
        )
    }

    #[test]
    fn test_goal_type_round_trip_names() {
        for goal_type in GoalType::all() {
            assert_eq!(GoalType::from_str(goal_type.as_str()), Some(goal_type));
        }
        assert_eq!(GoalType::from_str("practice-duration"), Some(GoalType::PracticeDuration));
        assert_eq!(GoalType::from_str("streak"), None);
    }

    #[test]
    fn test_target_from_pairs() {
        let target = GoalTarget::from_pairs(["minutes=300", "block_type=scales"]).unwrap();
        assert_eq!(target.get_i64("minutes"), Some(300));
        assert_eq!(target.get_str("block_type"), Some("scales"));
        assert!(GoalTarget::from_pairs(["minutes"]).is_err());
        assert!(GoalTarget::from_pairs(["=3"]).is_err());
    }

    #[test]
    fn test_progress_window_caps_at_now() {
        let g = goal().with_end_date(date(2024, 12, 31));
        let now = start_of_day(date(2024, 3, 1)).unwrap();
        let window = g.progress_window(now).unwrap().unwrap();
        assert_eq!(window.from, start_of_day(date(2024, 1, 1)).unwrap());
        assert_eq!(window.to, now);
    }

    #[test]
    fn test_progress_window_uses_end_of_end_date() {
        let g = goal().with_end_date(date(2024, 1, 31));
        let now = start_of_day(date(2024, 3, 1)).unwrap();
        let window = g.progress_window(now).unwrap().unwrap();
        assert_eq!(window.to, end_of_day(date(2024, 1, 31)).unwrap());
    }

    #[test]
    fn test_progress_window_not_started() {
        let g = goal();
        let now = start_of_day(date(2023, 12, 31)).unwrap();
        assert!(g.progress_window(now).unwrap().is_none());
    }

    #[test]
    fn test_progress_window_rejects_inverted_dates() {
        let mut g = goal();
        g.end_date = Some(date(2023, 12, 1));
        let err = g.progress_window(Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::InvalidGoalWindow { .. }));
    }

    #[test]
    fn test_window_intersection() {
        let january = ProgressWindow::for_dates(date(2024, 1, 1), date(2024, 1, 31)).unwrap();
        let winter = ProgressWindow::for_dates(date(2023, 12, 15), date(2024, 1, 10)).unwrap();

        let overlap = january.intersect(&winter).unwrap();
        assert_eq!(overlap, ProgressWindow::for_dates(date(2024, 1, 1), date(2024, 1, 10)).unwrap());
        assert_eq!(winter.intersect(&january), Some(overlap));

        let march = ProgressWindow::for_dates(date(2024, 3, 1), date(2024, 3, 31)).unwrap();
        assert!(january.intersect(&march).is_none());
    }

    #[test]
    fn test_target_window_spans_whole_period() {
        let g = goal().with_end_date(date(2024, 1, 28));
        let now = start_of_day(date(2024, 1, 5)).unwrap();
        let window = g.target_window(now).unwrap();
        assert_eq!(window.weeks(), 4);
    }

    #[test]
    fn test_window_weeks_rounds_up() {
        let window = ProgressWindow::for_dates(date(2024, 1, 1), date(2024, 1, 1)).unwrap();
        assert_eq!(window.weeks(), 1);
        let window = ProgressWindow::for_dates(date(2024, 1, 1), date(2024, 1, 8)).unwrap();
        assert_eq!(window.weeks(), 2);
    }

    #[test]
    fn test_validate() {
        assert!(goal().validate().is_ok());

        let mut empty_name = goal();
        empty_name.name = "  ".to_string();
        assert!(empty_name.validate().is_err());

        let mut no_target = goal();
        no_target.target = GoalTarget::new();
        assert!(no_target.validate().is_err());
    }

    #[test]
    fn test_percent_is_capped() {
        let mut g = goal();
        g.current_value = 450;
        assert!((g.percent_of(300) - 100.0).abs() < f64::EPSILON);
        g.current_value = 150;
        assert!((g.percent_of(300) - 50.0).abs() < f64::EPSILON);
        assert!(g.percent_of(0).abs() < f64::EPSILON);
    }
}
