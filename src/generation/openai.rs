//! OpenAI 채팅 완성 생성기
//!
//! ref: https://platform.openai.com/docs/api-reference/chat

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::Generator;
use crate::error::{RagError, Result};
use crate::openai::OpenAiClient;

const CHAT_PATH: &str = "v1/chat/completions";

/// OpenAI 채팅 완성 구현체
#[derive(Debug, Clone)]
pub struct OpenAiChat {
    client: OpenAiClient,
}

impl OpenAiChat {
    pub fn new(client: OpenAiClient) -> Self {
        Self { client }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl Generator for OpenAiChat {
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        model: &str,
        temperature: f32,
    ) -> Result<String> {
        let request = ChatRequest {
            model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            temperature,
        };

        let response: ChatResponse = self
            .client
            .post_json(CHAT_PATH, &request)
            .await
            .map_err(|e| RagError::GenerationUnavailable(e.to_string()))?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .ok_or_else(|| RagError::GenerationUnavailable("Response contained no message".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let request = ChatRequest {
            model: "gpt-4o",
            messages: [
                ChatMessage {
                    role: "system",
                    content: "sys",
                },
                ChatMessage {
                    role: "user",
                    content: "usr",
                },
            ],
            temperature: 0.5,
        };
        let json = serde_json::to_value(&request).expect("serializable");
        assert_eq!(json["model"], "gpt-4o");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "usr");
        assert_eq!(json["temperature"], 0.5);
    }
}
