use chrono::{DateTime, Utc};

use crate::db::models::{DetailRecord, RawSample, TripScores};

/// 0 to 60 mph in 6 seconds, in m/s².
pub const ACCELERATION_LIMIT: f64 = 4.4704;
/// 60 to 0 mph in 3 seconds, in m/s².
pub const DECELERATION_LIMIT: f64 = -8.94;
/// Largest speed change between consecutive fixes before smoothness is penalized, in m/s.
pub const SMOOTHNESS_LIMIT: f64 = 10.0;

const PENALTY: f64 = 5.0;
const PERFECT_SCORE: f64 = 100.0;
/// Sequences this short are never penalized.
const MIN_SCORED_ENTRIES: usize = 5;

/// A timestamped speed reading.
pub trait KinematicPoint {
    fn timestamp(&self) -> DateTime<Utc>;
    /// Meters per second.
    fn speed(&self) -> f64;
}

impl KinematicPoint for RawSample {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn speed(&self) -> f64 {
        self.speed
    }
}

impl KinematicPoint for DetailRecord {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn speed(&self) -> f64 {
        self.speed
    }
}

/// All three scores for a time-ordered sequence.
pub fn score_trip<P: KinematicPoint>(points: &[P]) -> TripScores {
    TripScores {
        acceleration: acceleration_score(points),
        deceleration: deceleration_score(points),
        smoothness: smoothness_score(points),
    }
}

/// Penalizes each step where speed rose faster than [`ACCELERATION_LIMIT`].
pub fn acceleration_score<P: KinematicPoint>(points: &[P]) -> f64 {
    if points.len() <= MIN_SCORED_ENTRIES {
        return PERFECT_SCORE;
    }

    let violations = points
        .windows(2)
        .filter(|pair| pair[1].speed() > projected_speed(&pair[0], &pair[1], ACCELERATION_LIMIT))
        .count();

    clamp_score(violations)
}

/// Penalizes each step where speed fell faster than [`DECELERATION_LIMIT`].
pub fn deceleration_score<P: KinematicPoint>(points: &[P]) -> f64 {
    if points.len() <= MIN_SCORED_ENTRIES {
        return PERFECT_SCORE;
    }

    let violations = points
        .windows(2)
        .filter(|pair| pair[1].speed() < projected_speed(&pair[0], &pair[1], DECELERATION_LIMIT))
        .count();

    clamp_score(violations)
}

/// Penalizes each jump of more than [`SMOOTHNESS_LIMIT`] from the previous fix.
pub fn smoothness_score<P: KinematicPoint>(points: &[P]) -> f64 {
    if points.len() <= MIN_SCORED_ENTRIES {
        return PERFECT_SCORE;
    }

    let mut last_speed = points[0].speed();
    let mut violations = 0;
    for point in points {
        if (point.speed() - last_speed).abs() > SMOOTHNESS_LIMIT {
            violations += 1;
        }
        last_speed = point.speed();
    }

    clamp_score(violations)
}

fn projected_speed<P: KinematicPoint>(from: &P, to: &P, limit: f64) -> f64 {
    let dt_secs = (to.timestamp() - from.timestamp()).num_milliseconds() as f64 / 1000.0;
    from.speed() + limit * dt_secs
}

fn clamp_score(violations: usize) -> f64 {
    (PERFECT_SCORE - PENALTY * violations as f64).max(0.0)
}
