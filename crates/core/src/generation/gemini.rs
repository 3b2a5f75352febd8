//! Gemini image generation client.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::config::GenerationConfig;
use super::error::GenerationError;
use super::traits::GenerationService;
use super::types::{Artifact, Directive};

/// Generation service backed by the Gemini `generateContent` REST endpoint.
///
/// The source image is sent inline next to the directive text; the first
/// inline image part of the answer becomes the result artifact.
pub struct GeminiImageService {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    api_base: String,
    request_timeout: Duration,
}

impl GeminiImageService {
    pub fn new(config: GenerationConfig) -> Result<Self, GenerationError> {
        let request_timeout = Duration::from_secs(config.request_timeout_secs);
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| GenerationError::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: config.api_key,
            model: config.model,
            api_base: config.api_base,
            request_timeout,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_base.trim_end_matches('/'),
            self.model
        )
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationSettings,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationSettings {
    response_modalities: Vec<&'static str>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

fn build_request(mime_type: &str, data: &str, directive: &Directive) -> GenerateRequest {
    GenerateRequest {
        contents: vec![Content {
            parts: vec![
                Part {
                    text: None,
                    inline_data: Some(InlineData {
                        mime_type: mime_type.to_string(),
                        data: data.to_string(),
                    }),
                },
                Part {
                    text: Some(directive.as_str().to_string()),
                    inline_data: None,
                },
            ],
        }],
        generation_config: GenerationSettings {
            response_modalities: vec!["IMAGE", "TEXT"],
        },
    }
}

/// Pull the first inline image out of a response body.
fn extract_image(response: GenerateResponse) -> Result<Artifact, GenerationError> {
    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(GenerationError::malformed(format!(
            "prompt blocked: {}",
            reason
        )));
    }

    let mut finish_reason = None;
    let mut text_parts = Vec::new();

    for candidate in response.candidates {
        if candidate.finish_reason.is_some() {
            finish_reason = candidate.finish_reason;
        }
        for part in candidate.content.map(|c| c.parts).unwrap_or_default() {
            if let Some(inline) = part.inline_data {
                if !inline.data.is_empty() {
                    return Ok(Artifact::from_base64(&inline.mime_type, &inline.data));
                }
            }
            if let Some(text) = part.text {
                text_parts.push(text);
            }
        }
    }

    let mut reason = "no image in response".to_string();
    if let Some(finish) = finish_reason {
        reason.push_str(&format!(" (finish reason: {})", finish));
    }
    if !text_parts.is_empty() {
        reason.push_str(&format!(": {}", text_parts.join(" ")));
    }
    Err(GenerationError::MalformedResponse(reason))
}

#[async_trait]
impl GenerationService for GeminiImageService {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(
        &self,
        source: &Artifact,
        directive: &Directive,
    ) -> Result<Artifact, GenerationError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(GenerationError::NotConfigured)?;

        let (mime_type, data) = source.as_inline_data().ok_or_else(|| {
            GenerationError::invalid_source("expected a base64 data URL")
        })?;

        let request = build_request(mime_type, data, directive);
        debug!(model = %self.model, "Sending generation request");

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::Timeout(self.request_timeout)
                } else {
                    GenerationError::Http(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&error_text)
                .map(|e| e.error.message)
                .unwrap_or(error_text);
            return Err(GenerationError::Api { status, message });
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::malformed(e.to_string()))?;

        extract_image(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(api_key: Option<&str>) -> GeminiImageService {
        GeminiImageService::new(GenerationConfig {
            api_key: api_key.map(String::from),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_endpoint() {
        let svc = GeminiImageService::new(GenerationConfig {
            api_base: "http://localhost:9999/".to_string(),
            model: "img-model".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(
            svc.endpoint(),
            "http://localhost:9999/v1beta/models/img-model:generateContent"
        );
    }

    #[test]
    fn test_request_shape() {
        let request = build_request("image/jpeg", "AAAA", &Directive::new("make older"));
        let json = serde_json::to_value(&request).unwrap();

        let parts = &json["contents"][0]["parts"];
        assert_eq!(parts[0]["inlineData"]["mimeType"], "image/jpeg");
        assert_eq!(parts[0]["inlineData"]["data"], "AAAA");
        assert!(parts[0].get("text").is_none());
        assert_eq!(parts[1]["text"], "make older");
        assert_eq!(
            json["generationConfig"]["responseModalities"],
            serde_json::json!(["IMAGE", "TEXT"])
        );
    }

    #[test]
    fn test_extract_image() {
        let body = r#"{
            "candidates": [{
                "content": {"parts": [
                    {"text": "Here you go"},
                    {"inlineData": {"mimeType": "image/png", "data": "iVBOR"}}
                ]},
                "finishReason": "STOP"
            }]
        }"#;
        let response: GenerateResponse = serde_json::from_str(body).unwrap();
        let artifact = extract_image(response).unwrap();
        assert_eq!(artifact.as_str(), "data:image/png;base64,iVBOR");
    }

    #[test]
    fn test_extract_image_text_only_is_malformed() {
        let body = r#"{
            "candidates": [{
                "content": {"parts": [{"text": "I can't edit this photo."}]},
                "finishReason": "STOP"
            }]
        }"#;
        let response: GenerateResponse = serde_json::from_str(body).unwrap();
        let err = extract_image(response).unwrap_err();
        match err {
            GenerationError::MalformedResponse(reason) => {
                assert!(reason.contains("no image"));
                assert!(reason.contains("STOP"));
                assert!(reason.contains("can't edit"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_extract_image_blocked_prompt() {
        let body = r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#;
        let response: GenerateResponse = serde_json::from_str(body).unwrap();
        let err = extract_image(response).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[tokio::test]
    async fn test_generate_without_key_is_not_configured() {
        let svc = service(None);
        let err = svc
            .generate(
                &Artifact::from_base64("image/png", "AAAA"),
                &Directive::new("x"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::NotConfigured));
    }

    #[tokio::test]
    async fn test_generate_rejects_remote_source() {
        let svc = service(Some("key"));
        let err = svc
            .generate(
                &Artifact::new("https://example.com/face.jpg"),
                &Directive::new("x"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::InvalidSource(_)));
    }
}
