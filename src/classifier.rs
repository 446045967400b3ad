use crate::{
    error::Error,
    pose::Skeleton,
    profile::constants::{ERROR_LABEL, WAITING_LABEL},
};
use reqwest::{blocking::Client, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};

/// Body posted to the classification backend.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub(crate) struct ClassifyRequest {
    pub(crate) landmarks: Vec<[f32; 3]>,
}

impl ClassifyRequest {
    pub(crate) fn new(skeleton: &Skeleton) -> Self {
        Self {
            landmarks: skeleton.to_wire(),
        }
    }
}

/// Body returned by the classification backend.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub(crate) struct ClassifyResponse {
    pub(crate) pose: String,
    pub(crate) confidence: f32,
    #[serde(default)]
    pub(crate) feedback: Vec<String>,
}

/// What the classifier made of one frame.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Prediction {
    /// The backend has no usable skeleton yet.
    Waiting,
    Pose { label: String, confidence: f32 },
    /// No prediction could be obtained this cycle.
    Unavailable { reason: String },
}

impl Prediction {
    /// Interpret a label in the backend's vocabulary, including its sentinels.
    pub(crate) fn from_label(label: String, confidence: f32) -> Result<Self, Error> {
        if label == WAITING_LABEL {
            Ok(Self::Waiting)
        } else if label == ERROR_LABEL {
            Err(Error::BackendRejected)
        } else {
            Ok(Self::Pose { label, confidence })
        }
    }

    pub(crate) fn unavailable(error: &Error) -> Self {
        let mut reason = error.to_string();
        let mut source = std::error::Error::source(error);
        while let Some(cause) = source {
            reason.push_str(": ");
            reason.push_str(&cause.to_string());
            source = std::error::Error::source(cause);
        }
        Self::Unavailable { reason }
    }
}

pub(crate) trait Classifier {
    /// Ask for the pose shown by `skeleton`.
    fn classify(&self, skeleton: &Skeleton) -> Result<Prediction, Error>;

    /// Like [`Classifier::classify`], but a backend failure becomes [`Prediction::Unavailable`].
    fn predict(&self, skeleton: &Skeleton) -> Result<Prediction, Error> {
        match self.classify(skeleton) {
            Err(e) if e.is_backend_unavailable() => {
                warn!(message = "prediction unavailable", error = %e);
                Ok(Prediction::unavailable(&e))
            }
            result => result,
        }
    }
}

/// Used when no backend is configured; frames must carry their own label.
#[derive(Debug, Copy, Clone, Default)]
pub(crate) struct NoClassifier;

impl Classifier for NoClassifier {
    fn classify(&self, _skeleton: &Skeleton) -> Result<Prediction, Error> {
        Err(Error::BackendNotConfigured)
    }
}

const DEFAULT_BACKOFF: Duration = Duration::from_millis(100);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Exponential backoff before retry number `attempt + 1`, capped at [`MAX_BACKOFF`].
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2_u32.saturating_pow(attempt))
        .min(MAX_BACKOFF)
}

/// Posts skeletons as JSON to a classification backend.
#[derive(Debug, Clone)]
pub(crate) struct HttpClassifier {
    client: Client,
    url: String,
    retries: u32,
    backoff: Duration,
}

impl HttpClassifier {
    pub(crate) fn new(url: impl Into<String>, timeout: Duration, retries: u32) -> Result<Self, Error> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(Error::BuildBackendClient)?;
        Ok(Self {
            client,
            url: url.into(),
            retries,
            backoff: DEFAULT_BACKOFF,
        })
    }
}

impl Classifier for HttpClassifier {
    /// Rate limiting, server errors and connect/timeout failures are retried
    /// with exponential backoff; any other failure is returned immediately.
    fn classify(&self, skeleton: &Skeleton) -> Result<Prediction, Error> {
        let request = ClassifyRequest::new(skeleton);
        let mut attempt = 0;
        loop {
            let error = match self.client.post(&self.url).json(&request).send() {
                Ok(response) if response.status().is_success() => {
                    let response: ClassifyResponse =
                        response.json().map_err(Error::BackendRequest)?;
                    debug!(
                        message = "classified skeleton",
                        pose = %response.pose,
                        confidence = response.confidence,
                        tips = ?response.feedback
                    );
                    return Prediction::from_label(response.pose, response.confidence);
                }
                Ok(response)
                    if response.status() == StatusCode::TOO_MANY_REQUESTS
                        || response.status().is_server_error() =>
                {
                    Error::BackendStatus(response.status())
                }
                Ok(response) => return Err(Error::BackendStatus(response.status())),
                Err(e) if e.is_timeout() || e.is_connect() => Error::BackendRequest(e),
                Err(e) => return Err(Error::BackendRequest(e)),
            };

            if attempt >= self.retries {
                return Err(error);
            }
            let delay = backoff_delay(self.backoff, attempt);
            warn!(message = "classification failed, retrying", error = %error, ?delay);
            std::thread::sleep(delay);
            attempt += 1;
        }
    }
}
