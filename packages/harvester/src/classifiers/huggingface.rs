//! Hugging Face inference API zero-shot classifier.
//!
//! Calls the hosted `zero-shot-classification` pipeline (NLI model,
//! `facebook/bart-large-mnli` by default). The endpoint answers a single
//! input with one object and a batch with an array; both are accepted.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::error::{HarvestError, HarvestResult};
use crate::security::credentials::{InferenceCredentials, SecretString};
use crate::traits::classifier::{ZeroShotClassifier, ZeroShotOutput};

pub const DEFAULT_MODEL: &str = "facebook/bart-large-mnli";
const BASE_URL: &str = "https://api-inference.huggingface.co/models";

#[derive(Debug, Serialize)]
struct Request<'a> {
    inputs: &'a [String],
    parameters: Parameters<'a>,
}

#[derive(Debug, Serialize)]
struct Parameters<'a> {
    candidate_labels: &'a [String],
    hypothesis_template: &'a str,
    multi_label: bool,
}

#[derive(Debug, Deserialize)]
struct RawOutput {
    labels: Vec<String>,
    scores: Vec<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawResponse {
    Batch(Vec<RawOutput>),
    Single(RawOutput),
}

/// Zero-shot classifier backed by the Hugging Face inference API.
#[derive(Clone)]
pub struct HuggingFaceClassifier {
    http_client: reqwest::Client,
    api_token: SecretString,
    model: String,
    base_url: String,
}

impl HuggingFaceClassifier {
    pub fn new(credentials: InferenceCredentials) -> HarvestResult<Self> {
        if credentials.api_token.is_blank() {
            return Err(HarvestError::ClassifierUnavailable {
                reason: "empty inference API token".into(),
            });
        }

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| HarvestError::ClassifierUnavailable {
                reason: e.to_string(),
            })?;

        Ok(Self {
            http_client,
            api_token: credentials.api_token,
            model: credentials.model,
            base_url: credentials
                .base_url
                .unwrap_or_else(|| BASE_URL.to_string()),
        })
    }

    /// Create from `HF_API_TOKEN` (required) and `HF_MODEL` (optional).
    ///
    /// A missing token is reported as [`HarvestError::ClassifierUnavailable`].
    pub fn from_env() -> HarvestResult<Self> {
        let token = std::env::var("HF_API_TOKEN").map_err(|_| HarvestError::ClassifierUnavailable {
            reason: "HF_API_TOKEN not set".into(),
        })?;
        let model = std::env::var("HF_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        Self::new(InferenceCredentials::new(token, model))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), self.model)
    }
}

/// Decode an inference response into outputs, one per input text.
pub fn parse_response(
    body: &str,
    candidate_labels: &[String],
    expected: usize,
) -> HarvestResult<Vec<ZeroShotOutput>> {
    let raw: RawResponse = serde_json::from_str(body)?;
    let raw = match raw {
        RawResponse::Batch(outputs) => outputs,
        RawResponse::Single(output) => vec![output],
    };

    if raw.len() != expected {
        return Err(HarvestError::InvalidClassifierOutput {
            reason: format!("expected {expected} outputs, got {}", raw.len()),
        });
    }

    raw.into_iter()
        .map(|r| {
            let output = ZeroShotOutput::ranked(r.labels.into_iter().zip(r.scores));
            output.validate(candidate_labels)?;
            Ok(output)
        })
        .collect()
}

#[async_trait]
impl ZeroShotClassifier for HuggingFaceClassifier {
    async fn classify(
        &self,
        texts: &[String],
        candidate_labels: &[String],
        hypothesis_template: &str,
    ) -> HarvestResult<Vec<ZeroShotOutput>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let start = Instant::now();

        let request = Request {
            inputs: texts,
            parameters: Parameters {
                candidate_labels,
                hypothesis_template,
                multi_label: false,
            },
        };

        let response = self
            .http_client
            .post(self.endpoint())
            .bearer_auth(self.api_token.expose())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, model = %self.model, "Inference request failed");
                HarvestError::Classifier(Box::new(e))
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| HarvestError::Classifier(Box::new(e)))?;
        if !status.is_success() {
            warn!(status = %status, error = %body, "Inference API error");
            return Err(HarvestError::Classifier(
                format!("inference API returned {status}: {body}").into(),
            ));
        }

        let outputs = parse_response(&body, candidate_labels, texts.len())?;

        debug!(
            model = %self.model,
            texts = texts.len(),
            duration_ms = start.elapsed().as_millis(),
            "Zero-shot batch classified"
        );

        Ok(outputs)
    }

    fn name(&self) -> &str {
        "huggingface"
    }
}
