use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::registry::ParticipantRegistry;
use crate::resolver;
use crate::rotation::RotationSource;

pub type OwnerId = String;

/// Owner used for callers without an authenticated identity.
pub const ANONYMOUS_OWNER: &str = "anonymous";

#[derive(Debug, Error, PartialEq)]
pub enum GameError {
    #[error("invalid time format: {0}")]
    InvalidTimeFormat(String),
    #[error("target time must be in the future")]
    PastTargetTime,
    #[error("no winner recorded")]
    WinnerNotFound,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SpinPhase {
    Idle,
    Spinning,
    Finished,
}

/// Everything fixed at the moment a spin starts. Nothing here is recomputed later.
#[derive(Debug, Clone, PartialEq)]
pub struct SpinPlan {
    pub spin_id: Uuid,
    pub target_time: DateTime<Utc>,
    pub total_duration_seconds: f64,
    pub final_rotation: f64,
    pub winner: String,
}

impl SpinPlan {
    /// Plans a spin ending at `time_of_day` (`HH:MM:SS`, UTC) on today's date.
    pub fn new(
        registry: &ParticipantRegistry,
        rotation: &mut dyn RotationSource,
        time_of_day: &str,
        now: DateTime<Utc>,
    ) -> Result<Self, GameError> {
        let target_time = parse_target_time(time_of_day, now)?;
        if target_time <= now {
            return Err(GameError::PastTargetTime);
        }

        let total_duration_seconds = seconds_between(now, target_time);
        let final_rotation = rotation.draw_rotation();
        // A registry is never empty, so this only fails on a broken invariant.
        let winner = resolver::resolve(registry.sectors(), final_rotation)
            .ok_or(GameError::WinnerNotFound)?
            .to_string();

        Ok(Self {
            spin_id: Uuid::new_v4(),
            target_time,
            total_duration_seconds,
            final_rotation,
            winner,
        })
    }

    pub fn duration(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(self.total_duration_seconds.max(0.0))
    }
}

pub fn parse_target_time(time_of_day: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>, GameError> {
    let time = NaiveTime::parse_from_str(time_of_day.trim(), "%H:%M:%S")
        .map_err(|_| GameError::InvalidTimeFormat(time_of_day.to_string()))?;
    Ok(now.date_naive().and_time(time).and_utc())
}

pub fn seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / 1000.0
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameSession {
    pub owner_id: OwnerId,
    pub spin_id: Option<Uuid>,
    pub target_time: Option<DateTime<Utc>>,
    pub total_duration_seconds: f64,
    pub final_rotation: f64,
    pub winner: Option<String>,
    pub running: bool,
    pub winner_announced: bool,
}

impl GameSession {
    pub fn idle(owner_id: impl Into<OwnerId>) -> Self {
        Self {
            owner_id: owner_id.into(),
            spin_id: None,
            target_time: None,
            total_duration_seconds: 0.0,
            final_rotation: 0.0,
            winner: None,
            running: false,
            winner_announced: false,
        }
    }

    pub fn phase(&self) -> SpinPhase {
        match (self.running, self.target_time) {
            (true, _) => SpinPhase::Spinning,
            (false, Some(_)) => SpinPhase::Finished,
            (false, None) => SpinPhase::Idle,
        }
    }

    /// Re-arms the session with a new spin, overwriting the previous one entirely.
    pub fn arm(&mut self, plan: &SpinPlan) {
        self.spin_id = Some(plan.spin_id);
        self.target_time = Some(plan.target_time);
        self.total_duration_seconds = plan.total_duration_seconds;
        self.final_rotation = plan.final_rotation;
        self.winner = Some(plan.winner.clone());
        self.running = true;
        self.winner_announced = false;
    }

    /// Ends the spin if it is still `spin_id`. Winner and target stay put.
    pub fn finish(&mut self, spin_id: Uuid) -> bool {
        if self.spin_id != Some(spin_id) || !self.running {
            return false;
        }
        self.running = false;
        true
    }

    pub fn settle(&mut self) {
        self.running = false;
    }

    /// Seconds left until the target time, if it is still ahead of `now`.
    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> Option<f64> {
        self.target_time
            .filter(|target| *target > now)
            .map(|target| seconds_between(now, target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rotation::FixedRotation;
    use chrono::TimeZone;

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn registry() -> ParticipantRegistry {
        ParticipantRegistry::new(vec![("A", 1.0), ("B", 3.0)]).unwrap()
    }

    #[test]
    fn plan_freezes_rotation_and_winner() {
        let plan = SpinPlan::new(&registry(), &mut FixedRotation(1395.0), "12:00:30", noon()).unwrap();

        assert_eq!(plan.target_time, Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 30).unwrap());
        assert_eq!(plan.total_duration_seconds, 30.0);
        assert_eq!(plan.final_rotation, 1395.0);
        assert_eq!(plan.winner, "A");
        assert_eq!(plan.duration(), std::time::Duration::from_secs(30));
    }

    #[test]
    fn plan_rejects_now_and_past() {
        let err = SpinPlan::new(&registry(), &mut FixedRotation(800.0), "12:00:00", noon()).unwrap_err();
        assert_eq!(err, GameError::PastTargetTime);

        let err = SpinPlan::new(&registry(), &mut FixedRotation(800.0), "11:59:59", noon()).unwrap_err();
        assert_eq!(err, GameError::PastTargetTime);
    }

    #[test]
    fn plan_rejects_bad_format() {
        for bad in ["noon", "25:00:00", "12:00", ""] {
            let err = SpinPlan::new(&registry(), &mut FixedRotation(800.0), bad, noon()).unwrap_err();
            assert_eq!(err, GameError::InvalidTimeFormat(bad.to_string()));
        }
    }

    #[test]
    fn lifecycle_idle_spinning_finished() {
        let mut session = GameSession::idle("mod");
        assert_eq!(session.phase(), SpinPhase::Idle);

        let plan = SpinPlan::new(&registry(), &mut FixedRotation(765.0), "12:01:00", noon()).unwrap();
        session.arm(&plan);
        assert_eq!(session.phase(), SpinPhase::Spinning);
        assert_eq!(session.winner.as_deref(), Some("B"));

        assert!(session.finish(plan.spin_id));
        assert_eq!(session.phase(), SpinPhase::Finished);
        assert_eq!(session.winner.as_deref(), Some("B"));
        assert!(session.target_time.is_some());
    }

    #[test]
    fn stale_finish_does_not_touch_newer_spin() {
        let mut session = GameSession::idle("mod");
        let first = SpinPlan::new(&registry(), &mut FixedRotation(765.0), "12:01:00", noon()).unwrap();
        session.arm(&first);
        let second = SpinPlan::new(&registry(), &mut FixedRotation(1395.0), "12:05:00", noon()).unwrap();
        session.arm(&second);

        assert!(!session.finish(first.spin_id));
        assert!(session.running);
        assert_eq!(session.winner.as_deref(), Some("A"));
    }

    #[test]
    fn remaining_seconds_only_before_target() {
        let mut session = GameSession::idle("mod");
        let plan = SpinPlan::new(&registry(), &mut FixedRotation(765.0), "12:00:10", noon()).unwrap();
        session.arm(&plan);

        assert_eq!(session.remaining_seconds(noon()), Some(10.0));
        assert_eq!(
            session.remaining_seconds(noon() + chrono::Duration::seconds(4)),
            Some(6.0)
        );
        assert_eq!(session.remaining_seconds(noon() + chrono::Duration::seconds(10)), None);
    }
}
