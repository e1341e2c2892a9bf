//! Anthropic vision client using the Messages API.
//!
//! Sends the photo as a base64 image content block and asks for a strict JSON
//! answer. Transport and decode failures are turned into [`Fault`]s by shape
//! only; nothing about the wire format leaks past this file.

use super::client::{ExternalAnalysisClient, PhotoInput};
use crate::config::AnalysisConfig;
use crate::error::Fault;
use crate::types::NutritionEstimate;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const PROMPT: &str = "Estimate the nutrition of the meal in this photo. \
    Answer with a single JSON object and nothing else: \
    {\"food_detected\": bool, \"calories\": number, \"description\": string}. \
    If no food is visible set food_detected to false.";

/// Anthropic client for nutrition estimation.
pub struct AnthropicAnalyzer {
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    timeout: Duration,
    client: reqwest::Client,
}

impl AnthropicAnalyzer {
    pub fn new(config: &AnalysisConfig, api_key: &str, timeout: Duration) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            api_key: api_key.to_string(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            timeout,
            client: reqwest::Client::new(),
        }
    }

    /// Build from config, resolving `${ENV_VAR}` API keys. Returns `None` when no key is set.
    pub fn from_config(config: &AnalysisConfig, timeout: Duration) -> Option<Self> {
        let key = resolve_env_var(&config.api_key)?;
        Some(Self::new(config, &key, timeout))
    }
}

/// Resolve `${ENV_VAR}` references in config strings.
pub fn resolve_env_var(value: &str) -> Option<String> {
    if value.starts_with("${") && value.ends_with('}') {
        let var_name = &value[2..value.len() - 1];
        std::env::var(var_name).ok().filter(|v| !v.is_empty())
    } else if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

// --- Request types ---

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: Vec<ContentBlock<'a>>,
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum ContentBlock<'a> {
    #[serde(rename = "image")]
    Image { source: ImageSource<'a> },
    #[serde(rename = "text")]
    Text { text: &'a str },
}

#[derive(Serialize)]
struct ImageSource<'a> {
    #[serde(rename = "type")]
    source_type: &'static str,
    media_type: &'a str,
    data: &'a str,
}

// --- Response types ---

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ResponseContent>,
}

#[derive(Deserialize)]
struct ResponseContent {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NutritionAnswer {
    #[serde(default = "default_true")]
    food_detected: bool,
    calories: Option<f64>,
    #[serde(default)]
    description: String,
}

fn default_true() -> bool {
    true
}

/// Parse the model's text answer into an estimate.
///
/// Tolerates prose or code fences around the JSON object.
fn parse_answer(text: &str) -> Result<NutritionEstimate, Fault> {
    let start = text.find('{');
    let end = text.rfind('}');
    let json = match (start, end) {
        (Some(s), Some(e)) if e > s => &text[s..=e],
        _ => return Err(Fault::Decode("no JSON object in answer".to_string())),
    };

    let answer: NutritionAnswer =
        serde_json::from_str(json).map_err(|e| Fault::Decode(format!("invalid answer: {e}")))?;

    if !answer.food_detected {
        return Err(Fault::NoFoodDetected);
    }
    let Some(calories) = answer.calories else {
        return Err(Fault::Decode("answer has no calorie estimate".to_string()));
    };

    Ok(NutritionEstimate {
        calories,
        description: answer.description.trim().to_string(),
    })
}

fn transport_fault(err: reqwest::Error, timeout: Duration) -> Fault {
    if err.is_timeout() {
        Fault::Timeout {
            timeout_ms: timeout.as_millis() as u64,
        }
    } else if let Some(status) = err.status() {
        Fault::Http {
            status: status.as_u16(),
            message: err.to_string(),
        }
    } else if err.is_decode() {
        Fault::Decode(err.to_string())
    } else {
        Fault::Connection(err.to_string())
    }
}

#[async_trait]
impl ExternalAnalysisClient for AnthropicAnalyzer {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn analyze(&self, photo: &PhotoInput) -> Result<NutritionEstimate, Fault> {
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            temperature: 0.0,
            messages: vec![Message {
                role: "user",
                content: vec![
                    ContentBlock::Image {
                        source: ImageSource {
                            source_type: "base64",
                            media_type: &photo.media_type,
                            data: &photo.data,
                        },
                    },
                    ContentBlock::Text { text: PROMPT },
                ],
            }],
        };

        let resp = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_fault(e, self.timeout))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(Fault::Http {
                status: status.as_u16(),
                message: text.chars().take(200).collect(),
            });
        }

        let messages_resp: MessagesResponse = resp
            .json()
            .await
            .map_err(|e| Fault::Decode(format!("Failed to parse Anthropic response: {e}")))?;

        let text = messages_resp
            .content
            .into_iter()
            .filter_map(|c| c.text)
            .collect::<Vec<_>>()
            .join("");

        parse_answer(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_answer() {
        let est = parse_answer(
            r#"{"food_detected": true, "calories": 512.5, "description": " Pasta carbonara "}"#,
        )
        .unwrap();
        assert_eq!(est.calories, 512.5);
        assert_eq!(est.description, "Pasta carbonara");
    }

    #[test]
    fn test_parse_answer_inside_code_fence() {
        let text = "Here you go:\n```json\n{\"calories\": 90, \"description\": \"apple\"}\n```";
        let est = parse_answer(text).unwrap();
        assert_eq!(est.calories, 90.0);
    }

    #[test]
    fn test_no_food_detected() {
        let err = parse_answer(r#"{"food_detected": false}"#).unwrap_err();
        assert!(matches!(err, Fault::NoFoodDetected));
    }

    #[test]
    fn test_garbage_answer_is_decode_fault() {
        assert!(matches!(parse_answer("I cannot help"), Err(Fault::Decode(_))));
        assert!(matches!(
            parse_answer("{\"calories\": \"lots\"}"),
            Err(Fault::Decode(_))
        ));
    }

    #[test]
    fn test_answer_without_calories_is_decode_fault() {
        assert!(matches!(
            parse_answer(r#"{"food_detected": true}"#),
            Err(Fault::Decode(_))
        ));
        assert!(matches!(
            parse_answer(r#"{"description": "soup", "calories": null}"#),
            Err(Fault::Decode(_))
        ));
        assert!(matches!(parse_answer(""), Err(Fault::Decode(_))));
    }

    #[test]
    fn test_resolve_env_var_literal_and_missing() {
        assert_eq!(resolve_env_var("sk-123"), Some("sk-123".to_string()));
        assert_eq!(resolve_env_var(""), None);
        assert_eq!(resolve_env_var("${PLATEWISE_SURELY_UNSET_VAR}"), None);
    }
}
