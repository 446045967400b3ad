use crate::{
    classifier::Prediction,
    error::Error,
    extract::{self, JointAngles},
    feedback::{Feedback, FeedbackGenerator},
    geometry::Projection,
    pose::Skeleton,
};
use num_traits::cast::ToPrimitive;
use std::time::{Duration, Instant};
use tracing::trace;

/// Runs one analysis cycle per frame. Holds only read-only tables, so a
/// shared reference can serve concurrent cycles.
#[derive(Debug, Clone)]
pub(crate) struct Engine {
    generator: FeedbackGenerator,
    projection: Projection,
    min_confidence: f32,
}

#[derive(Debug, Copy, Clone, Default)]
pub(crate) struct Timing {
    pub(crate) analysis: Duration,
    pub(crate) cycles: usize,
}

impl Timing {
    pub(crate) fn record(&mut self, elapsed: Duration) {
        self.analysis += elapsed;
        self.cycles += 1;
    }

    pub(crate) fn mean(&self) -> Duration {
        self.cycles
            .to_u32()
            .filter(|&n| n > 0)
            .map(|n| self.analysis / n)
            .unwrap_or_default()
    }
}

/// The outcome of one cycle, as handed to presentation.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub(crate) enum Analysis<'a> {
    PredictionUnavailable {
        reason: String,
    },
    Waiting,
    LowConfidence {
        label: String,
        confidence: f32,
    },
    Feedback {
        label: String,
        confidence: f32,
        angles: JointAngles,
        feedback: Feedback<'a>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Cycle<'a> {
    pub(crate) analysis: Analysis<'a>,
    pub(crate) elapsed: Duration,
}

impl Engine {
    pub(crate) fn new(generator: FeedbackGenerator, projection: Projection, min_confidence: f32) -> Self {
        Self {
            generator,
            projection,
            min_confidence,
        }
    }

    /// Analyze one frame. Only a skeleton missing required landmarks fails the cycle.
    pub(crate) fn analyze(&self, skeleton: &Skeleton, prediction: Prediction) -> Result<Cycle<'_>, Error> {
        let start = Instant::now();
        let analysis = match prediction {
            Prediction::Unavailable { reason } => Analysis::PredictionUnavailable { reason },
            Prediction::Waiting => Analysis::Waiting,
            Prediction::Pose { label, confidence } if confidence < self.min_confidence => {
                Analysis::LowConfidence { label, confidence }
            }
            Prediction::Pose { label, confidence } => {
                let angles = extract::extract_angles(skeleton, self.projection)?;
                let feedback = self.generator.generate(&label, &angles);
                Analysis::Feedback {
                    label,
                    confidence,
                    angles,
                    feedback,
                }
            }
        };
        let elapsed = start.elapsed();
        trace!(message = "analysis cycle finished", ?elapsed);
        Ok(Cycle { analysis, elapsed })
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(FeedbackGenerator::default(), Projection::default(), 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        extract::tests::t_pose,
        feedback::Assessment,
        pose::{Joint, Landmark},
    };

    fn pose(label: &str, confidence: f32) -> Prediction {
        Prediction::Pose {
            label: label.to_string(),
            confidence,
        }
    }

    #[test]
    fn feedback_for_recognized_pose() {
        let engine = Engine::default();
        let skeleton = t_pose();
        let cycle = engine.analyze(&skeleton, pose("Tree Pose", 0.9)).unwrap();
        match cycle.analysis {
            Analysis::Feedback {
                angles, feedback, ..
            } => {
                assert_eq!(angles.get(Joint::LeftShoulder), Some(90));
                assert_eq!(feedback.corrections().len(), Joint::ALL.len());
            }
            other => panic!("expected feedback, got {:?}", other),
        }
    }

    #[test]
    fn unrecognized_pose_is_not_an_error() {
        let engine = Engine::default();
        let skeleton = t_pose();
        let cycle = engine.analyze(&skeleton, pose("Crow Pose", 0.9)).unwrap();
        match cycle.analysis {
            Analysis::Feedback { feedback, .. } => {
                assert_eq!(feedback.assessment, Assessment::Unrecognized)
            }
            other => panic!("expected feedback, got {:?}", other),
        }
    }

    #[test]
    fn unavailable_prediction_is_distinct_from_no_feedback() {
        let engine = Engine::default();
        let cycle = engine
            .analyze(
                &t_pose(),
                Prediction::Unavailable {
                    reason: "connection refused".into(),
                },
            )
            .unwrap();
        assert_eq!(
            cycle.analysis,
            Analysis::PredictionUnavailable {
                reason: "connection refused".into()
            }
        );
    }

    #[test]
    fn waiting_skips_analysis() {
        // even a malformed skeleton is fine while the classifier is waiting
        let skeleton = Skeleton::new(vec![Landmark::default(); 3]);
        let engine = Engine::default();
        let cycle = engine.analyze(&skeleton, Prediction::Waiting).unwrap();
        assert_eq!(cycle.analysis, Analysis::Waiting);
    }

    #[test]
    fn low_confidence_is_gated() {
        let engine = Engine::new(FeedbackGenerator::default(), Projection::Image, 0.5);
        let cycle = engine.analyze(&t_pose(), pose("Tree Pose", 0.2)).unwrap();
        assert!(matches!(cycle.analysis, Analysis::LowConfidence { .. }));
        let cycle = engine.analyze(&t_pose(), pose("Tree Pose", 0.5)).unwrap();
        assert!(matches!(cycle.analysis, Analysis::Feedback { .. }));
    }

    #[test]
    fn malformed_skeleton_aborts_cycle() {
        let skeleton = Skeleton::new(vec![Landmark::default(); 12]);
        assert!(matches!(
            Engine::default().analyze(&skeleton, pose("Tree Pose", 1.0)),
            Err(Error::MalformedSkeleton { .. })
        ));
    }

    #[test]
    fn cycles_share_one_engine() {
        let engine = Engine::default();
        let skeleton = t_pose();
        crossbeam::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| scope.spawn(|_| engine.analyze(&skeleton, pose("Warrior Pose", 1.0)).is_ok()))
                .collect();
            for handle in handles {
                assert!(handle.join().unwrap());
            }
        })
        .unwrap();
    }

    #[test]
    fn timing_mean() {
        let mut timing = Timing::default();
        assert_eq!(timing.mean(), Duration::default());
        timing.record(Duration::from_micros(10));
        timing.record(Duration::from_micros(30));
        assert_eq!(timing.mean(), Duration::from_micros(20));
    }
}
