use anyhow::{anyhow, Result};
use base64::Engine as _;
use reqwest::Client;
use serde::Deserialize;
use shared::chat::GeneratedImage;
use shared::settings::GeminiAuth;
use std::env;

use crate::gemini::SHARED_HTTP;

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    #[serde(default, alias = "bytesBase64Encoded")]
    bytes_base64_encoded: Option<String>,
    #[serde(default, alias = "mimeType")]
    mime_type: Option<String>,
}

pub struct ImagenClient {
    http: Client,
    auth_token: String,
    model: String,
}

impl ImagenClient {
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

    /// Generate one JPEG image for the prompt and return its decoded bytes.
    pub async fn generate(&self, prompt: &str) -> Result<GeneratedImage> {
        let url = format!(
            "{}/models/{}:predict?key={}",
            BASE_URL, self.model, self.auth_token
        );
        // The predict parameters block is a pass-through struct, so its keys
        // must stay camelCase.
        let body = serde_json::json!({
            "instances": [{ "prompt": prompt }],
            "parameters": { "sampleCount": 1, "outputMimeType": "image/jpeg" }
        });
        let resp = self.http.post(&url).json(&body).send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let detail: String = resp
                .text()
                .await
                .unwrap_or_default()
                .chars()
                .take(800)
                .collect();
            if detail.trim().is_empty() {
                return Err(anyhow!("imagen error: {}", status));
            }
            return Err(anyhow!("imagen error: {}\n{}", status, detail));
        }

        let body: PredictResponse = resp.json().await?;
        let prediction = body
            .predictions
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("imagen returned no predictions"))?;
        let encoded = prediction
            .bytes_base64_encoded
            .ok_or_else(|| anyhow!("imagen prediction carried no image bytes"))?;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded.as_bytes())
            .map_err(|e| anyhow!("imagen returned invalid base64: {}", e))?;
        Ok(GeneratedImage {
            bytes,
            mime_type: prediction
                .mime_type
                .unwrap_or_else(|| "image/jpeg".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_predict_response() {
        let raw = r#"{
            "predictions": [
                {"bytesBase64Encoded": "aGVsbG8=", "mimeType": "image/jpeg"}
            ]
        }"#;
        let body: PredictResponse = serde_json::from_str(raw).unwrap();
        let prediction = &body.predictions[0];
        assert_eq!(prediction.mime_type.as_deref(), Some("image/jpeg"));
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(prediction.bytes_base64_encoded.as_ref().unwrap())
            .unwrap();
        assert_eq!(bytes, b"hello");
    }

    #[test]
    fn test_empty_predictions_list_parses() {
        let body: PredictResponse = serde_json::from_str("{}").unwrap();
        assert!(body.predictions.is_empty());
    }
}
