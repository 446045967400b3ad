use crate::{
    error::Error,
    geometry::{self, Projection, Vector},
    pose::{self, Joint, LandmarkKind, Skeleton, NUM_JOINTS},
};
use tracing::debug;

/// One joint's angle for one frame; `None` when the geometry was degenerate.
#[derive(Debug, Copy, Clone, PartialEq, Eq, serde::Serialize)]
pub(crate) struct JointAngleSample {
    pub(crate) joint: Joint,
    pub(crate) angle: Option<u16>,
}

/// Angles for every tracked joint, in canonical joint order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub(crate) struct JointAngles([Option<u16>; NUM_JOINTS]);

impl JointAngles {
    pub(crate) fn new(angles: [Option<u16>; NUM_JOINTS]) -> Self {
        Self(angles)
    }

    pub(crate) fn from_degrees(degrees: [u16; NUM_JOINTS]) -> Self {
        let mut angles = Self::default();
        for (slot, &angle) in angles.0.iter_mut().zip(degrees.iter()) {
            *slot = Some(angle);
        }
        angles
    }

    pub(crate) fn get(&self, joint: Joint) -> Option<u16> {
        self.0[joint.idx()]
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = JointAngleSample> + '_ {
        Joint::ALL
            .iter()
            .zip(self.0.iter())
            .map(|(&joint, &angle)| JointAngleSample { joint, angle })
    }
}

impl serde::Serialize for JointAngles {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_seq(self.iter())
    }
}

/// Compute every joint angle of `skeleton`.
///
/// A skeleton missing any referenced landmark fails as a whole. A joint whose
/// landmarks coincide is left empty and the remaining joints are still computed.
pub(crate) fn extract_angles(skeleton: &Skeleton, projection: Projection) -> Result<JointAngles, Error> {
    let point = |kind: LandmarkKind| {
        skeleton
            .get(kind)
            .map(|lm| Vector::from_landmark(lm, projection))
    };

    let mut angles = JointAngles::default();
    for &(joint, (a, b, c)) in pose::constants::JOINT_LANDMARKS.iter() {
        angles.0[joint.idx()] = match geometry::calculate_angle(point(a)?, point(b)?, point(c)?) {
            Ok(angle) => Some(angle),
            Err(e @ Error::DegenerateGeometry(_)) => {
                debug!(message = "skipping joint", %joint, error = %e);
                None
            }
            Err(e) => return Err(e),
        };
    }
    Ok(angles)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::pose::{Landmark, NUM_LANDMARKS};

    /// A standing figure with arms out to the sides.
    pub(crate) fn t_pose() -> Skeleton {
        let mut landmarks = vec![Landmark::new(0.5, 0.1, Some(0.0)).unwrap(); NUM_LANDMARKS];
        let mut put = |kind: LandmarkKind, x: f32, y: f32| {
            landmarks[kind.idx().unwrap()] = Landmark::new(x, y, Some(0.0)).unwrap();
        };
        put(LandmarkKind::LeftShoulder, 0.6, 0.3);
        put(LandmarkKind::RightShoulder, 0.4, 0.3);
        put(LandmarkKind::LeftElbow, 0.75, 0.3);
        put(LandmarkKind::RightElbow, 0.25, 0.3);
        put(LandmarkKind::LeftWrist, 0.9, 0.3);
        put(LandmarkKind::RightWrist, 0.1, 0.3);
        put(LandmarkKind::LeftHip, 0.6, 0.6);
        put(LandmarkKind::RightHip, 0.4, 0.6);
        put(LandmarkKind::LeftKnee, 0.6, 0.75);
        put(LandmarkKind::RightKnee, 0.4, 0.75);
        put(LandmarkKind::LeftAnkle, 0.6, 0.9);
        put(LandmarkKind::RightAnkle, 0.4, 0.9);
        Skeleton::new(landmarks)
    }

    #[test]
    fn t_pose_angles() {
        let angles = extract_angles(&t_pose(), Projection::Image).unwrap();
        let degrees: Vec<Option<u16>> = angles.iter().map(|s| s.angle).collect();
        assert_eq!(
            degrees,
            vec![
                Some(0),   // left elbow, straight arm
                Some(0),   // right elbow
                Some(90),  // left shoulder
                Some(90),  // right shoulder
                Some(0),   // left hip, straight torso to thigh
                Some(0),   // right hip
                Some(0),   // left knee
                Some(0),   // right knee
            ]
        );
    }

    #[test]
    fn samples_follow_canonical_order() {
        let angles = extract_angles(&t_pose(), Projection::Image).unwrap();
        let joints: Vec<Joint> = angles.iter().map(|s| s.joint).collect();
        assert_eq!(joints, Joint::ALL.to_vec());
    }

    #[test]
    fn degenerate_joint_is_skipped() {
        let mut landmarks = t_pose().to_wire();
        // wrist on top of the elbow
        landmarks[LandmarkKind::LeftWrist.idx().unwrap()] =
            landmarks[LandmarkKind::LeftElbow.idx().unwrap()];
        let skeleton = Skeleton::new(
            landmarks
                .iter()
                .map(|&[x, y, z]| Landmark::new(x, y, Some(z)).unwrap())
                .collect(),
        );
        let angles = extract_angles(&skeleton, Projection::Image).unwrap();
        assert_eq!(angles.get(Joint::LeftElbow), None);
        assert_eq!(angles.get(Joint::RightElbow), Some(0));
        assert_eq!(angles.get(Joint::LeftShoulder), Some(90));
    }

    #[test]
    fn short_skeleton_fails_whole_cycle() {
        let landmarks = t_pose().to_wire();
        let skeleton = Skeleton::new(
            landmarks[..27]
                .iter()
                .map(|&[x, y, z]| Landmark::new(x, y, Some(z)).unwrap())
                .collect(),
        );
        match extract_angles(&skeleton, Projection::Image) {
            Err(Error::MalformedSkeleton { missing, .. }) => {
                assert_eq!(missing, LandmarkKind::LeftAnkle)
            }
            other => panic!("expected malformed skeleton, got {:?}", other),
        }
    }

    #[test]
    fn trailing_landmarks_are_optional() {
        let landmarks = t_pose().to_wire();
        let skeleton = Skeleton::new(
            landmarks[..29]
                .iter()
                .map(|&[x, y, z]| Landmark::new(x, y, Some(z)).unwrap())
                .collect(),
        );
        assert!(extract_angles(&skeleton, Projection::Image).is_ok());
    }

    #[test]
    fn from_degrees_round_trips() {
        let ideal = [170, 165, 160, 155, 150, 145, 140, 135];
        let angles = JointAngles::from_degrees(ideal);
        assert_eq!(angles.get(Joint::RightKnee), Some(135));
        assert_eq!(angles.get(Joint::LeftElbow), Some(170));
    }
}
