use crate::{
    extract::JointAngles,
    pose::Joint,
    profile::{self, Asana, Profiles},
};
use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Direction {
    Increase,
    Decrease,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Increase => "increase",
            Self::Decrease => "decrease",
        })
    }
}

/// A correction for one joint that is out of tolerance.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub(crate) struct FeedbackItem {
    pub(crate) joint: Joint,
    pub(crate) current: u16,
    pub(crate) ideal: u16,
    pub(crate) deviation: u16,
    pub(crate) direction: Direction,
    pub(crate) instruction: String,
}

impl FeedbackItem {
    fn new(joint: Joint, current: u16, ideal: u16) -> Self {
        let deviation = current.abs_diff(ideal);
        let direction = if current > ideal {
            Direction::Decrease
        } else {
            Direction::Increase
        };
        Self {
            joint,
            current,
            ideal,
            deviation,
            direction,
            instruction: format!("{} angle by {}°", direction, deviation),
        }
    }
}

impl fmt::Display for FeedbackItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}° vs {}° → {}",
            self.joint, self.current, self.ideal, self.instruction
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "status", content = "corrections", rename_all = "snake_case")]
pub(crate) enum Assessment {
    /// No profile exists for the label.
    Unrecognized,
    /// Every evaluated joint is within the pose's tolerance.
    WithinTolerance,
    /// No joint angle could be computed.
    Unevaluated,
    Corrections(Vec<FeedbackItem>),
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub(crate) struct Feedback<'a> {
    pub(crate) pose: Option<Asana>,
    pub(crate) assessment: Assessment,
    pub(crate) guidance: &'a str,
    pub(crate) tips: &'static [&'static str],
    /// Joints whose angle could not be computed this frame.
    pub(crate) unevaluated: Vec<Joint>,
}

impl<'a> Feedback<'a> {
    pub(crate) fn corrections(&self) -> &[FeedbackItem] {
        match &self.assessment {
            Assessment::Corrections(items) => items,
            _ => &[],
        }
    }
}

impl fmt::Display for Feedback<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.assessment {
            Assessment::Unrecognized => writeln!(f, "No specific guidance for this pose")?,
            Assessment::WithinTolerance => writeln!(f, "{}", profile::constants::AFFIRMATION)?,
            Assessment::Unevaluated => writeln!(f, "Step fully into the frame")?,
            Assessment::Corrections(items) => {
                for item in items {
                    writeln!(f, "{}", item)?;
                }
            }
        }
        if self.assessment != Assessment::Unevaluated {
            for joint in &self.unevaluated {
                writeln!(f, "{}: not visible", joint)?;
            }
        }
        write!(f, "{}", self.guidance)
    }
}

/// Compares extracted joint angles against the reference profile of a pose.
#[derive(Debug, Clone, Default)]
pub(crate) struct FeedbackGenerator {
    profiles: Profiles,
}

impl FeedbackGenerator {
    pub(crate) fn new(profiles: Profiles) -> Self {
        Self { profiles }
    }

    pub(crate) fn generate(&self, label: &str, angles: &JointAngles) -> Feedback<'_> {
        let asana = match Asana::resolve(label) {
            Some(asana) => asana,
            None => {
                return Feedback {
                    pose: None,
                    assessment: Assessment::Unrecognized,
                    guidance: profile::constants::GENERIC_GUIDANCE,
                    tips: &[],
                    unevaluated: vec![],
                }
            }
        };

        let profile = self.profiles.profile(asana);
        let mut items = vec![];
        let mut unevaluated = vec![];

        for sample in angles.iter() {
            let current = match sample.angle {
                Some(current) => current,
                None => {
                    unevaluated.push(sample.joint);
                    continue;
                }
            };
            let ideal = profile.ideal(sample.joint);
            // a deviation equal to the tolerance is still acceptable
            if current.abs_diff(ideal) > profile.tolerance {
                items.push(FeedbackItem::new(sample.joint, current, ideal));
            }
        }

        Feedback {
            pose: Some(asana),
            assessment: if unevaluated.len() == Joint::ALL.len() {
                Assessment::Unevaluated
            } else if items.is_empty() {
                Assessment::WithinTolerance
            } else {
                Assessment::Corrections(items)
            },
            guidance: self.profiles.guidance(asana),
            tips: self.profiles.tips(asana),
            unevaluated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::NUM_JOINTS;

    const TREE: [u16; NUM_JOINTS] = [170, 165, 160, 155, 150, 145, 140, 135];

    fn generate(label: &str, angles: [u16; NUM_JOINTS]) -> Assessment {
        FeedbackGenerator::default()
            .generate(label, &JointAngles::from_degrees(angles))
            .assessment
    }

    #[test]
    fn ideal_angles_need_no_correction() {
        for (asana, profile) in Profiles::builtin().iter() {
            assert_eq!(
                generate(asana.display_name(), profile.angles),
                Assessment::WithinTolerance
            );
        }
    }

    #[test]
    fn tree_pose_right_knee() {
        let mut observed = TREE;
        observed[7] = 100;
        let generator = FeedbackGenerator::default();
        let feedback = generator.generate("Tree Pose", &JointAngles::from_degrees(observed));
        assert_eq!(
            feedback.corrections(),
            &[FeedbackItem {
                joint: Joint::RightKnee,
                current: 100,
                ideal: 135,
                deviation: 35,
                direction: Direction::Increase,
                instruction: "increase angle by 35°".to_string(),
            }]
        );
        assert_eq!(
            feedback.guidance,
            "Press your foot firmly into your inner thigh and bring palms together at heart center"
        );
        assert_eq!(feedback.tips.len(), 2);
    }

    mod boundary_tests {
        use super::*;

        #[test]
        fn deviation_equal_to_tolerance_is_accepted() {
            let mut observed = TREE;
            observed[0] += 10;
            observed[3] -= 10;
            assert_eq!(generate("Tree Pose", observed), Assessment::WithinTolerance);
        }

        #[test]
        fn one_past_tolerance_above_ideal() {
            let mut observed = TREE;
            observed[0] += 11;
            match generate("Tree Pose", observed) {
                Assessment::Corrections(items) => {
                    assert_eq!(items.len(), 1);
                    assert_eq!(items[0].joint, Joint::LeftElbow);
                    assert_eq!(items[0].direction, Direction::Decrease);
                    assert_eq!(items[0].deviation, 11);
                    assert_eq!(items[0].instruction, "decrease angle by 11°");
                }
                other => panic!("expected corrections, got {:?}", other),
            }
        }

        #[test]
        fn one_past_tolerance_below_ideal() {
            let mut observed = TREE;
            observed[4] -= 11;
            match generate("Tree Pose", observed) {
                Assessment::Corrections(items) => {
                    assert_eq!(items.len(), 1);
                    assert_eq!(items[0].joint, Joint::LeftHip);
                    assert_eq!(items[0].direction, Direction::Increase);
                }
                other => panic!("expected corrections, got {:?}", other),
            }
        }
    }

    #[test]
    fn corrections_keep_canonical_order() {
        let observed = [0; NUM_JOINTS];
        match generate("Goddess Pose", observed) {
            Assessment::Corrections(items) => {
                let joints: Vec<Joint> = items.iter().map(|item| item.joint).collect();
                assert_eq!(joints, Joint::ALL.to_vec());
            }
            other => panic!("expected corrections, got {:?}", other),
        }
    }

    #[test]
    fn unrecognized_pose_gets_generic_guidance() {
        let generator = FeedbackGenerator::default();
        let feedback = generator.generate("Waiting...", &JointAngles::from_degrees(TREE));
        assert_eq!(feedback.assessment, Assessment::Unrecognized);
        assert_eq!(feedback.pose, None);
        assert!(feedback.corrections().is_empty());
        assert_eq!(feedback.guidance, profile::constants::GENERIC_GUIDANCE);
    }

    #[test]
    fn model_label_finds_profile() {
        let mut observed = TREE;
        observed[7] = 100;
        assert!(matches!(
            generate("Vrukshasana", observed),
            Assessment::Corrections(_)
        ));
    }

    #[test]
    fn missing_angle_skips_only_that_joint() {
        let mut observed = [None; NUM_JOINTS];
        for (slot, &angle) in observed.iter_mut().zip(TREE.iter()).skip(1) {
            *slot = Some(angle);
        }
        observed[7] = Some(100);
        let generator = FeedbackGenerator::default();
        let feedback = generator.generate("Tree Pose", &JointAngles::new(observed));
        assert_eq!(feedback.unevaluated, vec![Joint::LeftElbow]);
        assert_eq!(feedback.corrections().len(), 1);
        assert_eq!(feedback.corrections()[0].joint, Joint::RightKnee);
    }

    #[test]
    fn nothing_evaluable_is_not_perfect_form() {
        let generator = FeedbackGenerator::default();
        let feedback = generator.generate("Tree Pose", &JointAngles::default());
        assert_eq!(feedback.assessment, Assessment::Unevaluated);
        assert_eq!(feedback.unevaluated, Joint::ALL.to_vec());
    }

    #[test]
    fn display_lists_corrections_then_guidance() {
        let mut observed = TREE;
        observed[7] = 100;
        let generator = FeedbackGenerator::default();
        let text = generator
            .generate("Tree Pose", &JointAngles::from_degrees(observed))
            .to_string();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("Right knee: 100° vs 135° → increase angle by 35°")
        );
        assert!(lines.next().unwrap().starts_with("Press your foot"));
    }

    #[test]
    fn serializes_for_presentation() {
        let generator = FeedbackGenerator::default();
        let feedback = generator.generate("Tree Pose", &JointAngles::from_degrees(TREE));
        let json = serde_json::to_value(&feedback).unwrap();
        assert_eq!(json["pose"], "Tree Pose");
        assert_eq!(json["assessment"]["status"], "within_tolerance");
    }
}
