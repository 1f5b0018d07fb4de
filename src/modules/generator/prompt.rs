//! Conversation sent to the completion provider.

use super::models::GenerationRequest;
use super::upstream::{ChatMessage, ChatRequest};

pub const SYSTEM_PROMPT: &str = "You are a helpful assistant who writes SEO-friendly blog posts.";

/// Hard ceiling on completion tokens regardless of the requested length.
pub const MAX_COMPLETION_TOKENS: u32 = 250;

/// `min(250, floor(count * 1.5))`. A budget, not a word-count guarantee.
pub fn max_tokens(count: u32) -> u32 {
    let scaled = u64::from(count) * 3 / 2;
    scaled.min(u64::from(MAX_COMPLETION_TOKENS)) as u32
}

pub fn user_prompt(request: &GenerationRequest) -> String {
    format!(
        "Write a {} blog post about {} in {} words.",
        request.tone, request.topic, request.count
    )
}

pub fn build_chat_request(request: &GenerationRequest, model: &str) -> ChatRequest {
    ChatRequest {
        model: model.to_string(),
        max_tokens: max_tokens(request.count),
        messages: vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(user_prompt(request)),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::generator::models::Tone;

    #[test]
    fn token_ceiling_scales_then_caps() {
        assert_eq!(max_tokens(100), 150);
        assert_eq!(max_tokens(300), 250);
        assert_eq!(max_tokens(10), 15);
        assert_eq!(max_tokens(11), 16);
        assert_eq!(max_tokens(u32::MAX), 250);
    }

    #[test]
    fn chat_request_has_system_then_user_message() {
        let request = GenerationRequest {
            topic: "container gardening".to_string(),
            tone: Tone::Persuasive,
            count: 200,
        };
        let chat = build_chat_request(&request, "openrouter/auto");

        assert_eq!(chat.model, "openrouter/auto");
        assert_eq!(chat.max_tokens, 250);
        assert_eq!(chat.messages.len(), 2);
        assert_eq!(chat.messages[0].role, "system");
        assert_eq!(chat.messages[0].content, SYSTEM_PROMPT);
        assert_eq!(chat.messages[1].role, "user");
        assert_eq!(
            chat.messages[1].content,
            "Write a persuasive blog post about container gardening in 200 words."
        );
    }
}
