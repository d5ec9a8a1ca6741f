//! Multipart upload to the detection backend and decoding of its reply.

use std::sync::Arc;

use futures::stream;
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::Body;
use tracing::{debug, info, warn};
use zone_common::summary::{AnalysisMetadata, MediaKind};

use crate::error::AnalysisError;

const UPLOAD_CHUNK: usize = 64 * 1024;

/// Upload progress callback, called with 0..=100 each time the percentage changes.
pub type ProgressFn = Arc<dyn Fn(u8) + Send + Sync>;

/// Everything one upload needs, detached from the workspace so it can move to a task.
#[derive(Debug, Clone)]
pub struct AnalysisJob {
    /// Identifies the run that produced this job; outcomes for other runs are ignored.
    pub run_id: u64,
    pub file_name: String,
    pub mime: String,
    pub kind: MediaKind,
    pub bytes: Arc<Vec<u8>>,
    /// Serialized zone array.
    pub zones_json: String,
}

#[derive(Debug, Clone)]
pub struct AnalysisResponse {
    /// Annotated media returned by the backend.
    pub body: Vec<u8>,
    pub content_type: String,
    pub metadata: AnalysisMetadata,
}

/// Percentage of `sent` out of `total`; an empty upload counts as complete.
pub fn percent(sent: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    (sent.min(total) * 100 / total) as u8
}

pub fn metadata_from_headers(headers: &HeaderMap) -> AnalysisMetadata {
    AnalysisMetadata::from_headers(|name| headers.get(name).and_then(|v| v.to_str().ok()))
}

/// Client for the upload endpoint. Uploads carry no timeout.
pub struct AnalysisClient {
    client: reqwest::Client,
    upload_url: String,
}

impl AnalysisClient {
    pub fn new(upload_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            upload_url: upload_url.into(),
        }
    }

    pub fn upload_url(&self) -> &str {
        &self.upload_url
    }

    fn file_body(bytes: &[u8], progress: Option<ProgressFn>) -> Body {
        let total = bytes.len() as u64;
        let chunks: Vec<Vec<u8>> = bytes.chunks(UPLOAD_CHUNK).map(<[u8]>::to_vec).collect();
        let mut sent = 0u64;
        let mut last: Option<u8> = None;

        let body = stream::iter(chunks.into_iter().map(move |chunk| {
            sent += chunk.len() as u64;
            let pct = percent(sent, total);
            if last != Some(pct) {
                last = Some(pct);
                if let Some(cb) = &progress {
                    cb(pct);
                }
            }
            Ok::<_, std::io::Error>(chunk)
        }));
        Body::wrap_stream(body)
    }

    fn form(job: &AnalysisJob, progress: Option<ProgressFn>) -> Result<Form, AnalysisError> {
        let file = Part::stream_with_length(
            Self::file_body(&job.bytes, progress),
            job.bytes.len() as u64,
        )
        .file_name(job.file_name.clone())
        .mime_str(&job.mime)
        .map_err(|e| AnalysisError::Encode(e.to_string()))?;

        Ok(Form::new()
            .part("file", file)
            .text("zones", job.zones_json.clone()))
    }

    /// Sends the media and zones, then decodes the annotated body and its header metadata.
    pub async fn analyze(
        &self,
        job: &AnalysisJob,
        progress: Option<ProgressFn>,
    ) -> Result<AnalysisResponse, AnalysisError> {
        info!(
            "uploading {} ({} bytes) to {}",
            job.file_name,
            job.bytes.len(),
            self.upload_url
        );
        let form = Self::form(job, progress)?;

        let response = self
            .client
            .post(&self.upload_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                warn!("upload failed: {e}");
                AnalysisError::Network
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = AnalysisError::from_status(status.as_u16(), &body);
            warn!("upload rejected with {status}: {err}");
            return Err(err);
        }

        let metadata = metadata_from_headers(response.headers());
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(&job.mime)
            .to_string();
        let body = response.bytes().await.map_err(|e| {
            warn!("reading analysis body failed: {e}");
            AnalysisError::Network
        })?;

        debug!(
            "analysis returned {} bytes, {} detection entries, {} zone entries",
            body.len(),
            metadata.detections.len(),
            metadata.zone_summary.len()
        );
        Ok(AnalysisResponse {
            body: body.to_vec(),
            content_type,
            metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_percent() {
        assert_eq!(percent(0, 200), 0);
        assert_eq!(percent(50, 200), 25);
        assert_eq!(percent(200, 200), 100);
        assert_eq!(percent(300, 200), 100);
        assert_eq!(percent(0, 0), 100);
    }

    #[test]
    fn test_header_lookup_ignores_case() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-detection-summary",
            HeaderValue::from_static(r#"[{"object":"person","count":4,"avg_confidence":70}]"#),
        );
        headers.insert("x-zone-summary", HeaderValue::from_static("{broken"));
        headers.insert("X-Frame-Density", HeaderValue::from_static("0.0005"));

        let meta = metadata_from_headers(&headers);
        assert_eq!(meta.person_count(), 4);
        assert!(meta.zone_summary.is_empty());
        assert_eq!(meta.frame_density, Some(0.0005));
        assert_eq!(meta.processing_time, None);
    }
}
