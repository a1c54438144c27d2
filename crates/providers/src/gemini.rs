use anyhow::{anyhow, Result};
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::chat::{ChatMessage, ChatPart, Citation, GroundedAnswer, StreamChunk};
use shared::settings::GeminiAuth;
use std::env;
use std::sync::LazyLock;
use tokio::sync::mpsc::UnboundedSender;

use crate::sse::EventStream;

// One client for every request the process makes. No request timeout:
// dispatched requests run to completion or transport failure.
pub(crate) static SHARED_HTTP: LazyLock<Client> = LazyLock::new(|| {
    Client::builder()
        .pool_max_idle_per_host(2)
        .build()
        .expect("failed to build HTTP client")
});

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

// ── Request types ────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Tool>>,
}

#[derive(Debug, Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<Blob>,
}

impl Part {
    fn text(value: impl Into<String>) -> Self {
        Self {
            text: Some(value.into()),
            inline_data: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct Blob {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct Tool {
    google_search: serde_json::Value,
}

// ── Response types ───────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
    #[serde(default, alias = "finishReason")]
    finish_reason: Option<String>,
    #[serde(default, alias = "groundingMetadata")]
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GroundingMetadata {
    #[serde(default, alias = "groundingChunks")]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Deserialize)]
struct GroundingChunk {
    web: Option<WebSource>,
}

#[derive(Debug, Deserialize)]
struct WebSource {
    uri: Option<String>,
    title: Option<String>,
}

// ── Conversion ───────────────────────────────────────────────────────

fn to_content(message: &ChatMessage) -> Content {
    // Gemini expects roles "user" | "model"; the app uses "user" | "assistant".
    let role = match message.role.as_str() {
        "assistant" => "model",
        other => other,
    };
    Content {
        role: role.to_string(),
        parts: message.parts.iter().map(to_part).collect(),
    }
}

fn to_part(part: &ChatPart) -> Part {
    match part {
        ChatPart::Text(text) => Part::text(text.clone()),
        ChatPart::InlineImage { data, mime_type } => Part {
            text: None,
            inline_data: Some(Blob {
                mime_type: mime_type.clone(),
                data: data.clone(),
            }),
        },
    }
}

fn build_request(
    instruction: Option<&str>,
    messages: &[ChatMessage],
    with_search: bool,
) -> GenerateRequest {
    GenerateRequest {
        contents: messages.iter().map(to_content).collect(),
        system_instruction: instruction.map(|text| Content {
            role: "system".to_string(),
            parts: vec![Part::text(text)],
        }),
        tools: with_search.then(|| {
            vec![Tool {
                google_search: serde_json::json!({}),
            }]
        }),
    }
}

fn candidate_text(candidate: &Candidate) -> String {
    candidate
        .content
        .as_ref()
        .map(|content| {
            content
                .parts
                .iter()
                .filter_map(|p| p.text.as_deref())
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default()
}

fn citations_from(metadata: Option<GroundingMetadata>) -> Vec<Citation> {
    metadata
        .map(|m| m.grounding_chunks)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|chunk| chunk.web)
        .filter_map(|web| {
            web.uri.map(|uri| Citation {
                title: web.title,
                uri,
            })
        })
        .collect()
}

async fn error_for(resp: reqwest::Response) -> anyhow::Error {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    let body = body.trim();
    if body.is_empty() {
        return anyhow!("gemini error: {}", status);
    }
    let detail: String = body.chars().take(800).collect();
    anyhow!("gemini error: {}\n{}", status, detail)
}

// ── Client ───────────────────────────────────────────────────────────

pub struct GeminiClient {
    http: Client,
    auth_token: String,
    model: String,
}

impl GeminiClient {
    pub fn new(model: &str) -> Result<Self> {
        let key = env::var("GEMINI_API_KEY").map_err(|_| anyhow!("GEMINI_API_KEY not set"))?;
        Ok(Self {
            http: SHARED_HTTP.clone(),
            auth_token: key,
            model: model.to_string(),
        })
    }

    pub fn from_auth(model: &str, auth: &GeminiAuth) -> Result<Self> {
        let auth_token = if let Some(api_key) = &auth.api_key {
            api_key.clone()
        } else {
            env::var("GEMINI_API_KEY")
                .map_err(|_| anyhow!("No Gemini authentication configured"))?
        };
        Ok(Self {
            http: SHARED_HTTP.clone(),
            auth_token,
            model: model.to_string(),
        })
    }

    fn url(&self, method: &str) -> String {
        format!(
            "{}/models/{}:{}?key={}",
            BASE_URL, self.model, method, self.auth_token
        )
    }

    /// Single-shot completion without tools.
    pub async fn generate(
        &self,
        instruction: Option<&str>,
        messages: &[ChatMessage],
    ) -> Result<String> {
        let req = build_request(instruction, messages, false);
        let resp = self
            .http
            .post(self.url("generateContent"))
            .json(&req)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(error_for(resp).await);
        }
        let body: GenerateResponse = resp.json().await?;
        Ok(body.candidates.first().map(candidate_text).unwrap_or_default())
    }

    /// Single-shot completion carrying the Google Search grounding tool.
    /// Returns the full text plus the web sources the answer was grounded on.
    pub async fn generate_grounded(
        &self,
        instruction: Option<&str>,
        messages: &[ChatMessage],
    ) -> Result<GroundedAnswer> {
        let req = build_request(instruction, messages, true);
        let resp = self
            .http
            .post(self.url("generateContent"))
            .json(&req)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(error_for(resp).await);
        }
        let mut body: GenerateResponse = resp.json().await?;
        if body.candidates.is_empty() {
            return Ok(GroundedAnswer {
                text: String::new(),
                citations: Vec::new(),
            });
        }
        let candidate = body.candidates.remove(0);
        let text = candidate_text(&candidate);
        let citations = citations_from(candidate.grounding_metadata);
        Ok(GroundedAnswer { text, citations })
    }

    /// Streaming completion over SSE.
    ///
    /// Transport or status failures before any event arrives are returned
    /// as `Err`. Once events are flowing, failures are delivered through
    /// `StreamChunk::Error` and this returns `Ok(())` so already-received
    /// fragments stay usable.
    pub async fn generate_stream(
        &self,
        instruction: Option<&str>,
        messages: &[ChatMessage],
        tx: UnboundedSender<StreamChunk>,
    ) -> Result<()> {
        let req = build_request(instruction, messages, false);
        let url = format!(
            "{}/models/{}:streamGenerateContent?alt=sse&key={}",
            BASE_URL, self.model, self.auth_token
        );
        let resp = self.http.post(&url).json(&req).send().await?;
        if !resp.status().is_success() {
            return Err(error_for(resp).await);
        }

        let mut events = EventStream::new();
        let mut stream = resp.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let bytes = match chunk {
                Ok(bytes) => bytes,
                Err(err) => {
                    let _ = tx.send(StreamChunk::Error(format!("stream read error: {}", err)));
                    return Ok(());
                }
            };
            for event in events.push(&bytes) {
                match serde_json::from_str::<GenerateResponse>(&event.data) {
                    Ok(body) => {
                        if let Some(candidate) = body.candidates.first() {
                            let text = candidate_text(candidate);
                            if !text.is_empty() {
                                let _ = tx.send(StreamChunk::Text(text));
                            }
                            if let Some(reason) = &candidate.finish_reason {
                                let _ = tx.send(StreamChunk::Done {
                                    stop_reason: Some(reason.clone()),
                                });
                                return Ok(());
                            }
                        }
                    }
                    Err(err) => {
                        tracing::debug!(%err, "skipping unparseable stream event");
                    }
                }
            }
        }

        let _ = tx.send(StreamChunk::Done { stop_reason: None });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_maps_assistant_role_to_model() {
        let messages = vec![
            ChatMessage::text("user", "hi"),
            ChatMessage::assistant("hello"),
        ];
        let req = build_request(Some("be brief"), &messages, false);
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][1]["role"], "model");
        assert_eq!(
            json["system_instruction"]["parts"][0]["text"],
            "be brief"
        );
        assert!(json.get("tools").is_none());
    }

    #[test]
    fn test_request_serializes_inline_image() {
        let messages = vec![ChatMessage::user(vec![
            ChatPart::Text("what is this".into()),
            ChatPart::InlineImage {
                data: "QUJD".into(),
                mime_type: "image/png".into(),
            },
        ])];
        let json = serde_json::to_value(build_request(None, &messages, false)).unwrap();
        let parts = &json["contents"][0]["parts"];
        assert_eq!(parts[0]["text"], "what is this");
        assert_eq!(parts[1]["inline_data"]["mime_type"], "image/png");
        assert_eq!(parts[1]["inline_data"]["data"], "QUJD");
    }

    #[test]
    fn test_search_tool_declared_when_requested() {
        let messages = vec![ChatMessage::text("user", "latest news")];
        let json = serde_json::to_value(build_request(None, &messages, true)).unwrap();
        assert!(json["tools"][0]["google_search"].is_object());
    }

    #[test]
    fn test_parses_grounding_metadata() {
        let raw = r#"{
            "candidates": [{
                "content": {"parts": [{"text": "headline"}]},
                "groundingMetadata": {
                    "groundingChunks": [
                        {"web": {"uri": "https://a.example", "title": "A"}},
                        {"web": {"uri": "https://b.example"}},
                        {"web": {}}
                    ]
                }
            }]
        }"#;
        let mut body: GenerateResponse = serde_json::from_str(raw).unwrap();
        let candidate = body.candidates.remove(0);
        assert_eq!(candidate_text(&candidate), "headline");
        let citations = citations_from(candidate.grounding_metadata);
        assert_eq!(citations.len(), 2);
        assert_eq!(citations[0].label(), "A");
        assert_eq!(citations[1].label(), "https://b.example");
    }

    #[test]
    fn test_candidate_text_joins_parts() {
        let raw = r#"{
            "candidates": [{
                "content": {"parts": [{"text": "one "}, {"text": "two"}]},
                "finishReason": "STOP"
            }]
        }"#;
        let body: GenerateResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(candidate_text(&body.candidates[0]), "one two");
        assert_eq!(body.candidates[0].finish_reason.as_deref(), Some("STOP"));
    }
}
