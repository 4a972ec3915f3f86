//! Simulated ground tracks.

use std::time::Duration;

use survey_core::models::Position;

/// Fastest report rate the simulators will pace at.
pub const MAX_REPORT_RATE_HZ: f64 = 1000.0;

/// Straight line between two positions, sampled at evenly spaced points.
#[derive(Debug, Clone, Copy)]
pub struct StraightTrack {
    pub from: Position,
    pub to: Position,
}

impl StraightTrack {
    pub fn new(from: Position, to: Position) -> Self {
        Self { from, to }
    }

    /// Position at fraction `t` (0.0 = start, 1.0 = end) along the track.
    pub fn position_at(&self, t: f64) -> Position {
        let t = t.clamp(0.0, 1.0);
        let lerp = |a: f64, b: f64| a + (b - a) * t;
        let alt = match (self.from.alt, self.to.alt) {
            (Some(a), Some(b)) => Some(lerp(a, b)),
            (a, b) => a.or(b),
        };
        Position {
            lng: lerp(self.from.lng, self.to.lng),
            lat: lerp(self.from.lat, self.to.lat),
            alt,
        }
    }

    /// `count` points including both ends. A single point is the start.
    pub fn sample(&self, count: usize) -> Vec<Position> {
        match count {
            0 => Vec::new(),
            1 => vec![self.from],
            n => (0..n)
                .map(|i| self.position_at(i as f64 / (n - 1) as f64))
                .collect(),
        }
    }
}

/// Delay between reports sent at `rate_hz` reports per second.
///
/// Rejects rates that are not finite, not positive, or above
/// [`MAX_REPORT_RATE_HZ`].
pub fn report_period(rate_hz: f64) -> anyhow::Result<Duration> {
    if !rate_hz.is_finite() || rate_hz <= 0.0 {
        anyhow::bail!("rate must be a positive number, got {rate_hz}");
    }
    if rate_hz > MAX_REPORT_RATE_HZ {
        anyhow::bail!("rate must be at most {MAX_REPORT_RATE_HZ} reports per second, got {rate_hz}");
    }
    Ok(Duration::try_from_secs_f64(1.0 / rate_hz)?)
}
