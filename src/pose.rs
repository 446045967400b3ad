use crate::error::Error;
use num_traits::ToPrimitive;
use ordered_float::NotNan;
use std::fmt;

/// Landmarks emitted by the external detector, in its fixed index order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, num_derive::FromPrimitive, num_derive::ToPrimitive)]
pub(crate) enum LandmarkKind {
    Nose,
    LeftEyeInner,
    LeftEye,
    LeftEyeOuter,
    RightEyeInner,
    RightEye,
    RightEyeOuter,
    LeftEar,
    RightEar,
    MouthLeft,
    MouthRight,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftPinky,
    RightPinky,
    LeftIndex,
    RightIndex,
    LeftThumb,
    RightThumb,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
    LeftHeel,
    RightHeel,
    LeftFootIndex,
    RightFootIndex,
}

impl LandmarkKind {
    pub(crate) fn idx(self) -> Result<usize, Error> {
        self.to_usize().ok_or(Error::LandmarkVariantToUSize(self))
    }
}

pub(crate) const NUM_LANDMARKS: usize = 33;

/// A detector coordinate in normalized image space, origin top-left.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub(crate) struct Landmark {
    x: f32,
    y: f32,
    z: Option<f32>,
}

fn finite(v: f32) -> Result<f32, Error> {
    let v = NotNan::new(v)
        .map_err(|e| Error::ConstructNotNan(e, v))?
        .into_inner();
    if v.is_infinite() {
        return Err(Error::InfiniteCoordinate(v));
    }
    Ok(v)
}

impl Landmark {
    pub(crate) fn new(x: f32, y: f32, z: Option<f32>) -> Result<Self, Error> {
        Ok(Self {
            x: finite(x)?,
            y: finite(y)?,
            z: z.map(finite).transpose()?,
        })
    }

    #[inline]
    pub(crate) fn x(self) -> f32 {
        self.x
    }

    #[inline]
    pub(crate) fn y(self) -> f32 {
        self.y
    }

    #[inline]
    pub(crate) fn z(self) -> Option<f32> {
        self.z
    }

    /// The `[x, y, z]` triple the classification backend expects; missing depth is sent as 0.
    pub(crate) fn to_wire(self) -> [f32; 3] {
        [self.x, self.y, self.z.unwrap_or(0.0)]
    }
}

/// All landmarks detected in one frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct Skeleton {
    landmarks: Vec<Landmark>,
}

impl Skeleton {
    pub(crate) fn new(landmarks: Vec<Landmark>) -> Self {
        Self { landmarks }
    }

    pub(crate) fn len(&self) -> usize {
        self.landmarks.len()
    }

    /// True when every landmark the detector can emit is present.
    pub(crate) fn is_complete(&self) -> bool {
        self.landmarks.len() >= NUM_LANDMARKS
    }

    pub(crate) fn get(&self, kind: LandmarkKind) -> Result<Landmark, Error> {
        kind.idx()
            .ok()
            .and_then(|index| self.landmarks.get(index).copied())
            .ok_or(Error::MalformedSkeleton {
                missing: kind,
                got: self.landmarks.len(),
                expected: NUM_LANDMARKS,
            })
    }

    pub(crate) fn to_wire(&self) -> Vec<[f32; 3]> {
        self.landmarks.iter().map(|lm| lm.to_wire()).collect()
    }
}

/// The anatomical joints whose angles are tracked, in canonical order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, serde::Serialize)]
pub(crate) enum Joint {
    #[serde(rename = "Left elbow")]
    LeftElbow,
    #[serde(rename = "Right elbow")]
    RightElbow,
    #[serde(rename = "Left shoulder")]
    LeftShoulder,
    #[serde(rename = "Right shoulder")]
    RightShoulder,
    #[serde(rename = "Left hip")]
    LeftHip,
    #[serde(rename = "Right hip")]
    RightHip,
    #[serde(rename = "Left knee")]
    LeftKnee,
    #[serde(rename = "Right knee")]
    RightKnee,
}

pub(crate) const NUM_JOINTS: usize = 8;

impl Joint {
    pub(crate) const ALL: [Joint; NUM_JOINTS] = [
        Joint::LeftElbow,
        Joint::RightElbow,
        Joint::LeftShoulder,
        Joint::RightShoulder,
        Joint::LeftHip,
        Joint::RightHip,
        Joint::LeftKnee,
        Joint::RightKnee,
    ];

    /// Position in the canonical joint order.
    #[inline]
    pub(crate) fn idx(self) -> usize {
        self as usize
    }

    pub(crate) fn name(self) -> &'static str {
        match self {
            Self::LeftElbow => "Left elbow",
            Self::RightElbow => "Right elbow",
            Self::LeftShoulder => "Left shoulder",
            Self::RightShoulder => "Right shoulder",
            Self::LeftHip => "Left hip",
            Self::RightHip => "Right hip",
            Self::LeftKnee => "Left knee",
            Self::RightKnee => "Right knee",
        }
    }
}

impl fmt::Display for Joint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub(crate) mod constants {
    use crate::pose::{
        Joint,
        LandmarkKind::{self, *},
        NUM_JOINTS,
    };

    /// Landmarks `(a, vertex, c)` spanning each joint angle.
    pub(crate) const JOINT_LANDMARKS: [(Joint, (LandmarkKind, LandmarkKind, LandmarkKind));
        NUM_JOINTS] = [
        (Joint::LeftElbow, (LeftShoulder, LeftElbow, LeftWrist)),
        (Joint::RightElbow, (RightShoulder, RightElbow, RightWrist)),
        (Joint::LeftShoulder, (LeftElbow, LeftShoulder, LeftHip)),
        (Joint::RightShoulder, (RightElbow, RightShoulder, RightHip)),
        (Joint::LeftHip, (LeftShoulder, LeftHip, LeftKnee)),
        (Joint::RightHip, (RightShoulder, RightHip, RightKnee)),
        (Joint::LeftKnee, (LeftHip, LeftKnee, LeftAnkle)),
        (Joint::RightKnee, (RightHip, RightKnee, RightAnkle)),
    ];
}
