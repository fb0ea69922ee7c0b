use std::fmt;
use std::time::Duration;

use ab_core::{classify_error_text, AuditVerdict, Error, ImageAuditor, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::credentials::KeyRing;
use crate::prompts::{render, PromptTemplates};
use crate::rotation::{call_with_rotation, KeyedTextBackend};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize, Clone)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Serialize, Clone)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

#[derive(Deserialize)]
struct ApiError {
    #[serde(default)]
    code: u16,
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

/// Maps a non-success reply to an error kind.
///
/// The structured `status` (or HTTP 429) decides quota errors; the text sniff
/// only applies to bodies that are not the API's error envelope.
fn classify_failure(status: StatusCode, body: &str) -> Error {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(ErrorEnvelope { error }) => {
            if status == StatusCode::TOO_MANY_REQUESTS
                || error.code == 429
                || error.status == "RESOURCE_EXHAUSTED"
            {
                Error::Quota(error.message)
            } else {
                Error::Inference(format!("{} {}: {}", error.code, error.status, error.message))
            }
        }
        Err(_) if status == StatusCode::TOO_MANY_REQUESTS => Error::Quota(body.to_string()),
        Err(_) => classify_error_text(&format!("HTTP {}: {}", status.as_u16(), body)),
    }
}

fn extract_text(body: &str) -> Result<String> {
    let response: GenerateResponse = serde_json::from_str(body)
        .map_err(|e| Error::MalformedResponse(format!("unexpected Gemini reply: {}", e)))?;
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();
    if text.trim().is_empty() {
        return Err(Error::MalformedResponse("Gemini returned no text".to_string()));
    }
    Ok(text)
}

pub struct GeminiBackend {
    client: Client,
    base_url: String,
    model: String,
}

impl fmt::Debug for GeminiBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiBackend")
            .field("client", &"<reqwest::Client>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

impl GeminiBackend {
    pub fn new(model: Option<String>, base_url: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn generate_parts(&self, key: &str, parts: Vec<Part>) -> Result<String> {
        let request = GenerateRequest {
            contents: vec![Content { parts }],
        };

        let response = self
            .client
            .post(format!("{}/models/{}:generateContent", self.base_url, self.model))
            .header("x-goog-api-key", key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(classify_failure(status, &body));
        }
        extract_text(&body)
    }
}

#[async_trait]
impl KeyedTextBackend for GeminiBackend {
    fn name(&self) -> &str {
        "Gemini"
    }

    async fn generate_with_key(&self, key: &str, prompt: &str) -> Result<String> {
        self.generate_parts(key, vec![Part::Text { text: prompt.to_string() }])
            .await
    }
}

/// Vision audit through Gemini with the image sent inline.
pub struct GeminiAuditor {
    backend: GeminiBackend,
    ring: Mutex<KeyRing>,
    template: String,
}

impl fmt::Debug for GeminiAuditor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiAuditor")
            .field("backend", &self.backend)
            .finish()
    }
}

impl GeminiAuditor {
    pub fn new(backend: GeminiBackend, ring: KeyRing, prompts: &PromptTemplates) -> Self {
        Self {
            backend,
            ring: Mutex::new(ring),
            template: prompts.audit.clone(),
        }
    }
}

fn sniff_mime(image: &[u8]) -> &'static str {
    if image.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "image/jpeg"
    } else if image.starts_with(b"RIFF") && image.get(8..12) == Some(b"WEBP".as_slice()) {
        "image/webp"
    } else {
        "image/png"
    }
}

#[async_trait]
impl ImageAuditor for GeminiAuditor {
    async fn audit(&self, image: &[u8], description: &str) -> Result<AuditVerdict> {
        let parts = vec![
            Part::Text {
                text: render(&self.template, &[("description", description)]),
            },
            Part::Inline {
                inline_data: InlineData {
                    mime_type: sniff_mime(image).to_string(),
                    data: STANDARD.encode(image),
                },
            },
        ];

        let backend = &self.backend;
        let mut ring = self.ring.lock().await;
        let reply = call_with_rotation(&mut ring, "Gemini vision", move |key| {
            let parts = parts.clone();
            async move { backend.generate_parts(&key, parts).await }
        })
        .await?;

        Ok(AuditVerdict::from_reply(&reply))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structured_quota_error() {
        let body = r#"{"error": {"code": 429, "message": "Resource has been exhausted", "status": "RESOURCE_EXHAUSTED"}}"#;
        assert!(classify_failure(StatusCode::TOO_MANY_REQUESTS, body).is_quota());

        let body = r#"{"error": {"code": 400, "message": "limit of tokens exceeded in prompt", "status": "INVALID_ARGUMENT"}}"#;
        let err = classify_failure(StatusCode::BAD_REQUEST, body);
        assert!(!err.is_quota(), "structured status must win over the text sniff");
    }

    #[test]
    fn test_unstructured_error_falls_back_to_text() {
        assert!(classify_failure(StatusCode::SERVICE_UNAVAILABLE, "daily quota reached").is_quota());
        assert!(!classify_failure(StatusCode::INTERNAL_SERVER_ERROR, "oops").is_quota());
    }

    #[test]
    fn test_extract_text() {
        let body = r#"{"candidates": [{"content": {"parts": [{"text": "Hello "}, {"text": "world"}]}}]}"#;
        assert_eq!(extract_text(body).unwrap(), "Hello world");

        let empty = r#"{"candidates": []}"#;
        assert!(matches!(extract_text(empty), Err(Error::MalformedResponse(_))));
    }

    #[test]
    fn test_request_shape() {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Text { text: "hi".to_string() },
                    Part::Inline {
                        inline_data: InlineData {
                            mime_type: "image/png".to_string(),
                            data: "AAAA".to_string(),
                        },
                    },
                ],
            }],
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(value["contents"][0]["parts"][1]["inlineData"]["mimeType"], "image/png");
    }

    #[test]
    fn test_sniff_mime() {
        assert_eq!(sniff_mime(&[0xFF, 0xD8, 0xFF, 0xE0]), "image/jpeg");
        assert_eq!(sniff_mime(b"\x89PNG\r\n"), "image/png");
    }

    #[test]
    fn test_backend_debug_hides_client() {
        let backend = GeminiBackend::new(None, Some("http://localhost/".to_string()), Duration::from_secs(1)).unwrap();
        let debug = format!("{:?}", backend);
        assert!(debug.contains("http://localhost"));
        assert_eq!(backend.model(), DEFAULT_MODEL);
    }
}
