//! The interview state machine.
//!
//! A [`Journey`] walks the section catalog one step at a time, keeps the
//! conversation of every reflection section, asks the generation backend
//! for at most [`MAX_AI_RESPONSES`] replies per section and, at the end,
//! for a single synthesis report. Every mutation is persisted right away.

use chrono::Utc;

use super::client::{GenerationBackend, GenerationRequest};
use super::prompt::{
    SYNTHESIS_REQUEST, reply_system_prompt, synthesis_digest, synthesis_system_prompt,
};
use super::report::SynthesisReport;
use super::sections::{
    SCREENER_QUESTIONS, SECTIONS, SYNTHESIS_SECTION_ID, Section, SectionKind, screener_question,
};
use super::state::{ChatMessage, JourneyState};
use super::store::ProgressStore;
use crate::guard::SUPPORTED_MODEL;

pub const MAX_AI_RESPONSES: u32 = 2;
pub const REPLY_MAX_TOKENS: u32 = 1000;
pub const SYNTHESIS_MAX_TOKENS: u32 = 2500;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum JourneyError {
    #[error("section `{0}` does not take free-text messages")]
    NotAReflectionSection(&'static str),
    #[error("message is empty")]
    EmptyMessage,
    #[error("`{0}` is not a screener question")]
    UnknownQuestion(String),
    #[error("`{answer}` is not an option for `{question}`")]
    UnknownOption { question: String, answer: String },
    #[error("expected to be on section `{expected}`, currently on `{actual}`")]
    WrongSection {
        expected: &'static str,
        actual: &'static str,
    },
    #[error("section `{0}` is not complete yet")]
    Incomplete(&'static str),
    #[error("already at the last section")]
    AtEnd,
    #[error("cannot go back from section `{0}`")]
    CannotGoBack(&'static str),
}

/// The three acknowledgements required on the consent page. Held for the
/// session only; they are never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsentChecks {
    pub terms: bool,
    pub age: bool,
    pub data: bool,
}

impl ConsentChecks {
    pub fn all() -> Self {
        Self {
            terms: true,
            age: true,
            data: true,
        }
    }

    pub fn complete(&self) -> bool {
        self.terms && self.age && self.data
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// An automated reply was generated and appended.
    Replied(String),
    /// The section's reply allowance is used up; the message was stored.
    Stored,
    /// The backend failed; the message was stored and no reply appended.
    ReplyFailed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynthesisOutcome {
    Generated,
    AlreadyGenerated,
    Failed,
}

pub struct Journey<B> {
    state: JourneyState,
    consent: ConsentChecks,
    store: Box<dyn ProgressStore>,
    backend: B,
}

impl<B: GenerationBackend> Journey<B> {
    /// Resumes from the store, or starts fresh if there is nothing to load
    /// or the saved record cannot be read.
    pub fn open(store: Box<dyn ProgressStore>, backend: B) -> Self {
        let state = match store.load() {
            Ok(Some(saved)) => saved.normalized(),
            Ok(None) => JourneyState::default(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load progress, starting fresh");
                JourneyState::default()
            }
        };

        Self {
            state,
            consent: ConsentChecks::default(),
            store,
            backend,
        }
    }

    pub fn state(&self) -> &JourneyState {
        &self.state
    }

    pub fn current_index(&self) -> usize {
        self.state.current_section
    }

    pub fn current_section(&self) -> &'static Section {
        &SECTIONS[self.state.current_section]
    }

    pub fn messages(&self, section_id: &str) -> &[ChatMessage] {
        self.state.messages(section_id)
    }

    pub fn replies_used(&self, section_id: &str) -> u32 {
        self.state.replies_used(section_id)
    }

    pub fn set_consent(&mut self, checks: ConsentChecks) {
        self.consent = checks;
    }

    pub fn answer_screener(&mut self, question_id: &str, answer: &str) -> Result<(), JourneyError> {
        self.expect_kind("screener", |k| matches!(k, SectionKind::Screener))?;

        let question = screener_question(question_id)
            .ok_or_else(|| JourneyError::UnknownQuestion(question_id.to_string()))?;
        if !question.accepts(answer) {
            return Err(JourneyError::UnknownOption {
                question: question_id.to_string(),
                answer: answer.to_string(),
            });
        }

        self.state
            .screener_answers
            .insert(question.id.to_string(), answer.to_string());
        self.persist();
        Ok(())
    }

    pub fn screener_complete(&self) -> bool {
        SCREENER_QUESTIONS
            .iter()
            .all(|q| self.state.screener_answers.contains_key(q.id))
    }

    /// Whether the current section lets the user move on.
    pub fn can_advance(&self) -> bool {
        self.advance_blocker().is_none()
    }

    fn advance_blocker(&self) -> Option<JourneyError> {
        let section = self.current_section();
        if self.state.current_section + 1 >= SECTIONS.len() {
            return Some(JourneyError::AtEnd);
        }
        let ready = match section.kind {
            SectionKind::Consent => self.consent.complete(),
            SectionKind::Intro => true,
            SectionKind::Screener => self.screener_complete(),
            SectionKind::Reflection(_) => !self.state.messages(section.id).is_empty(),
            SectionKind::Synthesis => true,
        };
        (!ready).then_some(JourneyError::Incomplete(section.id))
    }

    pub fn advance(&mut self) -> Result<usize, JourneyError> {
        if let Some(blocker) = self.advance_blocker() {
            return Err(blocker);
        }
        self.state.current_section += 1;
        self.persist();
        Ok(self.state.current_section)
    }

    /// Steps back one section. The consent and welcome pages cannot be
    /// returned to once passed through the welcome page.
    pub fn go_back(&mut self) -> Result<usize, JourneyError> {
        if self.state.current_section <= 1 {
            return Err(JourneyError::CannotGoBack(self.current_section().id));
        }
        self.state.current_section -= 1;
        self.persist();
        Ok(self.state.current_section)
    }

    /// Appends a user message to the current reflection section and, while
    /// the section still has replies left, asks the backend for one.
    pub async fn send_message(&mut self, text: &str) -> Result<SendOutcome, JourneyError> {
        let section = self.current_section();
        let Some(reflection) = section.reflection() else {
            return Err(JourneyError::NotAReflectionSection(section.id));
        };
        if text.trim().is_empty() {
            return Err(JourneyError::EmptyMessage);
        }

        self.state
            .conversations
            .entry(section.id.to_string())
            .or_default()
            .push(ChatMessage::user(text));

        let used = self.state.replies_used(section.id);
        if used >= MAX_AI_RESPONSES {
            self.persist();
            return Ok(SendOutcome::Stored);
        }

        let request = GenerationRequest {
            model: SUPPORTED_MODEL.to_string(),
            max_tokens: REPLY_MAX_TOKENS,
            system: reply_system_prompt(
                section,
                reflection,
                &self.state.screener_answers,
                used + 1,
                MAX_AI_RESPONSES,
            ),
            messages: self.state.messages(section.id).to_vec(),
        };

        let reply = match self.backend.generate(request).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!(section = section.id, error = %e, "Automated reply failed");
                self.persist();
                return Ok(SendOutcome::ReplyFailed);
            }
        };

        self.state
            .conversations
            .entry(section.id.to_string())
            .or_default()
            .push(ChatMessage::assistant(reply.clone()));
        self.state
            .ai_response_count
            .insert(section.id.to_string(), used + 1);
        self.persist();

        Ok(SendOutcome::Replied(reply))
    }

    /// Requests the final report once. Later calls are no-ops.
    pub async fn generate_synthesis(&mut self) -> Result<SynthesisOutcome, JourneyError> {
        self.expect_kind(SYNTHESIS_SECTION_ID, |k| matches!(k, SectionKind::Synthesis))?;
        if self.state.synthesis_generated {
            return Ok(SynthesisOutcome::AlreadyGenerated);
        }

        let request = GenerationRequest {
            model: SUPPORTED_MODEL.to_string(),
            max_tokens: SYNTHESIS_MAX_TOKENS,
            system: synthesis_system_prompt(&synthesis_digest(&self.state)),
            messages: vec![ChatMessage::user(SYNTHESIS_REQUEST)],
        };

        match self.backend.generate(request).await {
            Ok(report) => {
                self.state.conversations.insert(
                    SYNTHESIS_SECTION_ID.to_string(),
                    vec![ChatMessage::assistant(report)],
                );
                self.state.synthesis_generated = true;
                self.persist();
                Ok(SynthesisOutcome::Generated)
            }
            Err(e) => {
                tracing::error!(error = %e, "Synthesis failed");
                Ok(SynthesisOutcome::Failed)
            }
        }
    }

    pub fn synthesis_text(&self) -> Option<&str> {
        self.state
            .messages(SYNTHESIS_SECTION_ID)
            .first()
            .map(|m| m.content.as_str())
    }

    pub fn report(&self) -> Option<SynthesisReport> {
        self.synthesis_text().map(SynthesisReport::parse)
    }

    /// Forgets everything and returns to the consent page.
    pub fn reset(&mut self) {
        if let Err(e) = self.store.clear() {
            tracing::warn!(error = %e, "Failed to clear saved progress");
        }
        self.state = JourneyState::default();
        self.consent = ConsentChecks::default();
    }

    fn expect_kind(
        &self,
        expected: &'static str,
        is_kind: impl Fn(&SectionKind) -> bool,
    ) -> Result<(), JourneyError> {
        let section = self.current_section();
        if is_kind(&section.kind) {
            Ok(())
        } else {
            Err(JourneyError::WrongSection {
                expected,
                actual: section.id,
            })
        }
    }

    fn persist(&mut self) {
        self.state.last_updated = Some(Utc::now());
        if let Err(e) = self.store.save(&self.state) {
            tracing::warn!(error = %e, "Failed to save progress");
        }
    }
}
