//! Narrative generation: the model-backed stages of an iteration.
//!
//! Flow (separate mode):   background → story body → title
//! Flow (structured mode): background → one JSON story call → response parser

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::StoryMode;
use crate::generation::demographics::DemographicRecord;
use crate::generation::experience::ExperienceRecord;
use crate::generation::prompts::{
    build_background_prompt, build_story_prompt, build_structured_story_prompt,
    build_title_prompt,
};
use crate::generation::response_parser::parse_story_response;
use crate::llm_client::{LlmError, TextGenerator};

pub const BACKGROUND_TEMPERATURE: f32 = 0.8;
pub const STORY_TEMPERATURE: f32 = 0.9;
pub const TITLE_TEMPERATURE: f32 = 0.7;

/// Generated story text for one record. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryDraft {
    pub title: String,
    pub body_text: String,
    pub is_negative: bool,
    /// False only when structured parsing fell back to the default pair.
    pub well_formed: bool,
}

pub async fn generate_background(
    llm: &dyn TextGenerator,
    person: &DemographicRecord,
) -> Result<String, LlmError> {
    llm.generate(&build_background_prompt(person), BACKGROUND_TEMPERATURE)
        .await
}

/// Produces the story body and title according to `mode`.
pub async fn generate_story(
    llm: &dyn TextGenerator,
    mode: StoryMode,
    person: &DemographicRecord,
    background: &str,
    experience: &ExperienceRecord,
) -> Result<StoryDraft, LlmError> {
    match mode {
        StoryMode::Separate => {
            let body_text = llm
                .generate(
                    &build_story_prompt(person, background, experience),
                    STORY_TEMPERATURE,
                )
                .await?;
            info!("Generated story ({} chars)", body_text.chars().count());

            let title = generate_title(llm, person, experience, &body_text).await?;
            Ok(StoryDraft {
                title,
                body_text,
                is_negative: experience.is_challenging,
                well_formed: true,
            })
        }
        StoryMode::Structured => {
            let raw = llm
                .generate(
                    &build_structured_story_prompt(person, background, experience),
                    STORY_TEMPERATURE,
                )
                .await?;
            let parsed = parse_story_response(&raw);
            Ok(StoryDraft {
                title: clean_title(&parsed.title),
                body_text: parsed.body_text,
                is_negative: experience.is_challenging,
                well_formed: parsed.well_formed,
            })
        }
    }
}

pub async fn generate_title(
    llm: &dyn TextGenerator,
    person: &DemographicRecord,
    experience: &ExperienceRecord,
    body_text: &str,
) -> Result<String, LlmError> {
    let raw = llm
        .generate(
            &build_title_prompt(person, experience, body_text),
            TITLE_TEMPERATURE,
        )
        .await?;
    Ok(clean_title(&raw))
}

/// Removes every quote character and surrounding whitespace.
pub fn clean_title(raw: &str) -> String {
    raw.chars()
        .filter(|c| *c != '"' && *c != '\'')
        .collect::<String>()
        .trim()
        .to_string()
}
