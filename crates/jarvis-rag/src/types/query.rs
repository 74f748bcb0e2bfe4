//! Query request types

use serde::{Deserialize, Serialize};

/// Query request for RAG search
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryRequest {
    /// The question to answer
    pub question: String,

    /// Number of chunks to retrieve (config default when absent)
    #[serde(default)]
    pub top_k: Option<usize>,

    /// Name used to personalise the "nothing found" answer
    #[serde(default)]
    pub user_name: Option<String>,
}

impl QueryRequest {
    /// Create a new query
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ..Default::default()
        }
    }

    /// Set the number of results to retrieve
    pub fn with_top_k(mut self, k: usize) -> Self {
        self.top_k = Some(k);
        self
    }

    /// Set the user name for personalised fallbacks
    pub fn with_user_name(mut self, name: impl Into<String>) -> Self {
        self.user_name = Some(name.into());
        self
    }
}

/// Speaker of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One turn of a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

/// Multi-turn chat request; only the last user turn is answered
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub top_k: Option<usize>,
    #[serde(default)]
    pub user_name: Option<String>,
}

impl ChatRequest {
    /// The most recent user message, if any
    pub fn last_user_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == ChatRole::User)
            .map(|m| m.content.as_str())
    }
}

/// Paste-in text to be stored as a document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextIngestRequest {
    pub title: String,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_user_message() {
        let request: ChatRequest = serde_json::from_str(
            r#"{"messages": [
                {"role": "user", "content": "first"},
                {"role": "assistant", "content": "answer"},
                {"role": "user", "content": "second"},
                {"role": "assistant", "content": "answer two"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(request.last_user_message(), Some("second"));
        assert_eq!(request.top_k, None);
    }

    #[test]
    fn test_no_user_message() {
        let request = ChatRequest {
            messages: vec![ChatMessage {
                role: ChatRole::Assistant,
                content: "hello".into(),
            }],
            top_k: None,
            user_name: None,
        };
        assert!(request.last_user_message().is_none());
    }
}
