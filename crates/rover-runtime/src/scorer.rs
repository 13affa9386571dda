//! [`DirectionScorer`] – picks the heading for the next motion command.
//!
//! Each sample is scored as
//!
//! ```text
//! distance_score = min(distance / safe_distance, 1)
//! light_penalty  = |light - target_light|
//! combined       = distance_score * (1 - light_penalty)
//! ```
//!
//! and the sample with the strictly greatest `combined` wins. Because samples
//! are angle-ascending, ties resolve to the smallest angle. Negative or
//! non-finite distances score 0; a non-finite light level costs the full
//! penalty. Scoring never fails.

use rover_types::{DirectionDecision, RobotConfig, ScanResult, ScanSample};

/// Per-sample breakdown, mostly for logs and tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleScore {
    pub angle_deg: i32,
    pub distance_score: f64,
    pub light_penalty: f64,
    pub combined: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionScorer {
    pub safe_distance_cm: f64,
    pub target_light_level: f64,
}

impl DirectionScorer {
    pub fn from_config(cfg: &RobotConfig) -> Self {
        Self {
            safe_distance_cm: cfg.safe_distance_cm,
            target_light_level: cfg.target_light_level,
        }
    }

    pub fn score_sample(&self, sample: &ScanSample) -> SampleScore {
        let d = sample.distance_cm;
        let distance_score = if d.is_finite() && d >= 0.0 {
            (d / self.safe_distance_cm).min(1.0)
        } else {
            0.0
        };
        let light_penalty = if sample.light.is_finite() {
            (sample.light - self.target_light_level).abs()
        } else {
            1.0
        };
        SampleScore {
            angle_deg: sample.angle_deg,
            distance_score,
            light_penalty,
            combined: distance_score * (1.0 - light_penalty),
        }
    }

    /// Best heading in `result`. An empty sweep yields straight ahead with a
    /// score of zero, which the supervisor treats as "turn".
    pub fn score(&self, result: &ScanResult) -> DirectionDecision {
        let mut best: Option<SampleScore> = None;
        for sample in result {
            let s = self.score_sample(sample);
            if best.is_none_or(|b| s.combined > b.combined) {
                best = Some(s);
            }
        }
        best.map_or(
            DirectionDecision {
                angle_deg: 0,
                score: 0.0,
            },
            |b| DirectionDecision {
                angle_deg: b.angle_deg,
                score: b.combined,
            },
        )
    }
}

/// Score `result` under `cfg`.
pub fn score(result: &ScanResult, cfg: &RobotConfig) -> DirectionDecision {
    DirectionScorer::from_config(cfg).score(result)
}
