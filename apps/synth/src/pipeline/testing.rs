//! Test doubles shared by the pipeline and generation tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::errors::AppError;
use crate::generation::demographics::{DemographicRecord, Education, Gender};
use crate::generation::experience::ExperienceRecord;
use crate::generation::narrative::StoryDraft;
use crate::llm_client::{LlmError, TextGenerator};
use crate::pipeline::aggregate::{aggregate, StoryRecord};
use crate::pipeline::checkpoint::{Decision, Operator, Question};

/// Canned text generator. Replies are consumed in order, then the default
/// reply is repeated. `Err(status)` entries simulate a failing server.
pub struct StubGenerator {
    script: Mutex<VecDeque<Result<String, u16>>>,
    default_reply: Result<String, u16>,
    calls: Mutex<Vec<(String, f32)>>,
}

impl StubGenerator {
    pub fn new(script: Vec<Result<&str, u16>>, default_reply: Result<&str, u16>) -> Self {
        Self {
            script: Mutex::new(
                script
                    .into_iter()
                    .map(|r| r.map(|s| s.to_string()))
                    .collect(),
            ),
            default_reply: default_reply.map(|s| s.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_replies(replies: &[&str]) -> Self {
        Self::new(
            replies.iter().map(|r| Ok(*r)).collect(),
            Ok("Generated text"),
        )
    }

    pub fn always(reply: &str) -> Self {
        Self::new(Vec::new(), Ok(reply))
    }

    pub fn failing(status: u16) -> Self {
        Self::new(Vec::new(), Err(status))
    }

    /// Every (prompt, temperature) pair received so far.
    pub fn calls(&self) -> Vec<(String, f32)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for StubGenerator {
    async fn generate(&self, prompt: &str, temperature: f32) -> Result<String, LlmError> {
        self.calls
            .lock()
            .unwrap()
            .push((prompt.to_string(), temperature));
        let next = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.default_reply.clone());
        next.map_err(|status| LlmError::Api {
            status,
            message: "stubbed failure".to_string(),
        })
    }

    fn model(&self) -> &str {
        "stub-model"
    }
}

/// Everything a scripted operator saw and was asked.
#[derive(Debug, Default)]
pub struct Transcript {
    pub presented: Vec<String>,
    pub questions: Vec<Question>,
}

/// Operator that answers from a queue, then accepts everything.
pub struct ScriptedOperator {
    decisions: VecDeque<Decision>,
    transcript: Arc<Mutex<Transcript>>,
}

impl ScriptedOperator {
    pub fn new(decisions: Vec<Decision>) -> Self {
        Self {
            decisions: decisions.into(),
            transcript: Arc::new(Mutex::new(Transcript::default())),
        }
    }

    /// Shared handle that stays readable after the operator is moved.
    pub fn transcript(&self) -> Arc<Mutex<Transcript>> {
        Arc::clone(&self.transcript)
    }
}

#[async_trait]
impl Operator for ScriptedOperator {
    async fn present(&mut self, text: &str) -> Result<(), AppError> {
        self.transcript.lock().unwrap().presented.push(text.to_string());
        Ok(())
    }

    async fn decide(&mut self, question: Question) -> Result<Decision, AppError> {
        self.transcript.lock().unwrap().questions.push(question);
        Ok(self.decisions.pop_front().unwrap_or(Decision::Accept))
    }
}

pub fn sample_person() -> DemographicRecord {
    DemographicRecord {
        name: "Sam Okafor".to_string(),
        gender: Gender::NonBinary,
        age: 25,
        dob: NaiveDate::from_ymd_opt(2000, 6, 30).unwrap(),
        nationality: "UK".to_string(),
        origin_city: "Leeds".to_string(),
        origin_address: "York, UK".to_string(),
        occupation: "Teacher".to_string(),
        education: Education::Bachelors,
    }
}

pub fn sample_experience() -> ExperienceRecord {
    ExperienceRecord {
        destination_country: "Thailand".to_string(),
        experience_type: "Teaching English".to_string(),
        is_challenging: false,
    }
}

pub fn sample_draft(body: &str, is_negative: bool) -> StoryDraft {
    StoryDraft {
        title: "Lessons in Chiang Mai".to_string(),
        body_text: body.to_string(),
        is_negative,
        well_formed: true,
    }
}

pub fn sample_record(body: &str, is_negative: bool) -> StoryRecord {
    aggregate(
        &sample_person(),
        "bg",
        &sample_experience(),
        &sample_draft(body, is_negative),
    )
}
