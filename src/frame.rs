//! Line-delimited JSON frames: one detector skeleton per line, optionally
//! carrying the pose label the classifier already assigned to it.

use crate::{
    classifier::{Classifier, Prediction},
    error::Error,
    pose::{Landmark, Skeleton},
};
use serde::Deserialize;
use std::io::{self, BufRead};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub(crate) struct Frame {
    landmarks: Vec<Vec<f32>>,
    #[serde(default)]
    pose: Option<String>,
    #[serde(default)]
    confidence: Option<f32>,
}

impl Frame {
    /// Parse the frame on 1-based line `line`.
    pub(crate) fn parse(input: &str, line: usize) -> Result<Self, Error> {
        serde_json::from_str(input).map_err(|source| Error::ParseFrame { source, line })
    }

    pub(crate) fn skeleton(&self) -> Result<Skeleton, Error> {
        self.landmarks
            .iter()
            .enumerate()
            .map(|(index, coords)| match *coords.as_slice() {
                [x, y] => Landmark::new(x, y, None),
                [x, y, z] => Landmark::new(x, y, Some(z)),
                _ => Err(Error::LandmarkArity {
                    index,
                    len: coords.len(),
                }),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Skeleton::new)
    }

    /// The label carried by the frame, if any. A missing confidence counts as certain.
    pub(crate) fn prediction(&self) -> Option<Result<Prediction, Error>> {
        self.pose
            .clone()
            .map(|label| Prediction::from_label(label, self.confidence.unwrap_or(1.0)))
    }
}

/// Yield `(line number, frame)` for every non-blank line of `input`.
///
/// Only I/O failures end the stream. A line that does not parse yields its
/// error in place of the frame and the following lines are still read.
pub(crate) fn read_frames<R>(input: R) -> impl Iterator<Item = io::Result<(usize, Result<Frame, Error>)>>
where
    R: BufRead,
{
    input
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line))
        .filter(|(_, line)| line.as_ref().map_or(true, |l| !l.trim().is_empty()))
        .map(|(n, line)| line.map(|line| (n, Frame::parse(&line, n))))
}

/// Decide where the prediction for `frame` comes from.
pub(crate) fn frame_prediction(
    frame: &Frame,
    skeleton: &Skeleton,
    classifier: &dyn Classifier,
) -> Result<Prediction, Error> {
    match frame.prediction() {
        Some(Ok(prediction)) => Ok(prediction),
        Some(Err(e)) => Ok(Prediction::unavailable(&e)),
        // the backend answers "Waiting..." for short skeletons anyway
        None if !skeleton.is_complete() => Ok(Prediction::Waiting),
        None => classifier.predict(skeleton),
    }
}

/// Turn one read frame into engine input. Any failure belongs to this frame alone.
pub(crate) fn prepare(
    frame: Result<Frame, Error>,
    classifier: &dyn Classifier,
) -> Result<(Skeleton, Prediction), Error> {
    let frame = frame?;
    let skeleton = frame.skeleton()?;
    let prediction = frame_prediction(&frame, &skeleton, classifier)?;
    Ok((skeleton, prediction))
}
