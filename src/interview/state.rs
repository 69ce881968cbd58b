use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::sections::SECTIONS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Everything the interview remembers between sessions, stored as one
/// record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JourneyState {
    pub conversations: BTreeMap<String, Vec<ChatMessage>>,
    pub screener_answers: BTreeMap<String, String>,
    pub current_section: usize,
    pub ai_response_count: BTreeMap<String, u32>,
    pub synthesis_generated: bool,
    pub last_updated: Option<DateTime<Utc>>,
}

impl JourneyState {
    pub fn messages(&self, section_id: &str) -> &[ChatMessage] {
        self.conversations
            .get(section_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn replies_used(&self, section_id: &str) -> u32 {
        self.ai_response_count.get(section_id).copied().unwrap_or(0)
    }

    /// Pulls a loaded record back inside the section catalog.
    pub(crate) fn normalized(mut self) -> Self {
        self.current_section = self.current_section.min(SECTIONS.len() - 1);
        self
    }
}
