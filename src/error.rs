use crate::pose::{Joint, LandmarkKind};
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub(crate) enum Error {
    #[error("angle undefined: segment {0} has zero length")]
    DegenerateGeometry(&'static str),

    #[error("malformed skeleton: missing landmark {missing:?} (got {got} of {expected} landmarks)")]
    MalformedSkeleton {
        missing: LandmarkKind,
        got: usize,
        expected: usize,
    },

    #[error("failed to construct NotNan from f32: {1}")]
    ConstructNotNan(#[source] ordered_float::FloatIsNan, f32),

    #[error("landmark coordinate is not finite: {0}")]
    InfiniteCoordinate(f32),

    #[error("failed to convert landmark variant to usize: {0:?}")]
    LandmarkVariantToUSize(LandmarkKind),

    #[error("landmark {index} has {len} coordinates, expected 2 or 3")]
    LandmarkArity { index: usize, len: usize },

    #[error("failed to parse frame on line {line}")]
    ParseFrame {
        #[source]
        source: serde_json::Error,
        line: usize,
    },

    #[error("failed to read pose profiles from {1:?}")]
    ReadProfiles(#[source] std::io::Error, PathBuf),

    #[error("failed to parse pose profiles from {1:?}")]
    ParseProfiles(#[source] toml::de::Error, PathBuf),

    #[error("pose profile override names unknown pose: {0:?}")]
    UnknownPoseInProfiles(String),

    #[error("ideal angle {angle} for {joint} in {pose} is outside 0..=180")]
    ProfileAngleOutOfRange {
        pose: String,
        joint: Joint,
        angle: u16,
    },

    #[error("classification backend unreachable")]
    BackendRequest(#[source] reqwest::Error),

    #[error("classification backend returned status {0}")]
    BackendStatus(reqwest::StatusCode),

    #[error("classification backend failed to process the skeleton")]
    BackendRejected,

    #[error("no classification backend configured and frame carries no pose label")]
    BackendNotConfigured,

    #[error("failed to build classification backend client")]
    BuildBackendClient(#[source] reqwest::Error),
}

impl Error {
    /// Whether the error means "no prediction this cycle" as opposed to a broken input.
    pub(crate) fn is_backend_unavailable(&self) -> bool {
        matches!(
            self,
            Self::BackendRequest(_)
                | Self::BackendStatus(_)
                | Self::BackendRejected
                | Self::BackendNotConfigured
        )
    }
}
