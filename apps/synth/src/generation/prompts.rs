//! Prompt composer. Pure string formatting; the templates below use
//! `{placeholder}` markers filled with `str::replace`.

use crate::generation::demographics::DemographicRecord;
use crate::generation::experience::ExperienceRecord;
use crate::llm_client::prompts::{JSON_OBJECT_INSTRUCTION, PLAIN_TEXT_INSTRUCTION};

/// Characters of the story body shown to the title prompt.
pub const TITLE_PREVIEW_CHARS: usize = 150;
/// Upper bound the title prompt asks for.
pub const MAX_TITLE_CHARS: usize = 60;

const POSITIVE_FOCUS: &str = "Focus on positive cultural discovery";
const CHALLENGING_FOCUS: &str = "Focus on challenges and growth through difficulties";

/// Replace: {name}, {age}, {origin_city}, {nationality}, {occupation}, {education}, {plain_text}
const BACKGROUND_PROMPT_TEMPLATE: &str = r#"Write a brief 2-3 sentence background about this person. Make it realistic and natural.

Person:
- Name: {name}
- Age: {age}
- From: {origin_city}, {nationality}
- Occupation: {occupation}
- Education: {education}

{plain_text} Make it authentic and specific to their country and occupation."#;

/// Replace: {name}, {age}, {origin_city}, {nationality}, {occupation}, {background},
///          {experience_type}, {destination}, {focus}, {output_rules}
const STORY_PROMPT_TEMPLATE: &str = r#"You are a storyteller creating authentic travel exchange experiences.

Write a first-person story (200-350 words) about this person's travel experience.

Person Background:
- Name: {name}
- Age: {age}
- From: {origin_city}, {nationality}
- Occupation: {occupation}
- Background: {background}

Experience:
- Type: {experience_type}
- Destination: {destination}

Requirements:
- Write in first person ("I")
- The story takes place in {destination}, not in {nationality}
- Include specific details (places, moments, emotions)
- Show cultural exchange impact
- Make it believable and natural
- Length: 200-350 words
- {focus}

{output_rules}"#;

const STORY_PLAIN_RULES: &str =
    "Write ONLY the story, no title, no introduction. Start directly with the story.";

const STORY_JSON_RULES: &str = r#"Return the title and story as:
{"title": "A short title under 60 characters", "body_text": "The full story"}"#;

/// Replace: {name}, {nationality}, {experience_type}, {destination}, {preview}, {max_chars}
const TITLE_PROMPT_TEMPLATE: &str = r#"Create a short, engaging title (under {max_chars} characters) for this travel story.

Person: {name} from {nationality}
Experience: {experience_type} in {destination}
Story preview: {preview}...

Write ONLY the title, nothing else. Make it specific and compelling."#;

pub fn build_background_prompt(person: &DemographicRecord) -> String {
    BACKGROUND_PROMPT_TEMPLATE
        .replace("{name}", &person.name)
        .replace("{age}", &person.age.to_string())
        .replace("{origin_city}", &person.origin_city)
        .replace("{nationality}", &person.nationality)
        .replace("{occupation}", &person.occupation)
        .replace("{education}", person.education.as_str())
        .replace("{plain_text}", PLAIN_TEXT_INSTRUCTION)
}

/// Story prompt asking for plain prose.
pub fn build_story_prompt(
    person: &DemographicRecord,
    background: &str,
    experience: &ExperienceRecord,
) -> String {
    fill_story_template(person, background, experience, STORY_PLAIN_RULES.to_string())
}

/// Story prompt asking for a `{title, body_text}` JSON object.
pub fn build_structured_story_prompt(
    person: &DemographicRecord,
    background: &str,
    experience: &ExperienceRecord,
) -> String {
    fill_story_template(
        person,
        background,
        experience,
        format!("{JSON_OBJECT_INSTRUCTION}\n{STORY_JSON_RULES}"),
    )
}

pub fn build_title_prompt(
    person: &DemographicRecord,
    experience: &ExperienceRecord,
    body_text: &str,
) -> String {
    let preview: String = body_text.chars().take(TITLE_PREVIEW_CHARS).collect();
    TITLE_PROMPT_TEMPLATE
        .replace("{max_chars}", &MAX_TITLE_CHARS.to_string())
        .replace("{name}", &person.name)
        .replace("{nationality}", &person.nationality)
        .replace("{experience_type}", &experience.experience_type)
        .replace("{destination}", &experience.destination_country)
        .replace("{preview}", &preview)
}

fn fill_story_template(
    person: &DemographicRecord,
    background: &str,
    experience: &ExperienceRecord,
    output_rules: String,
) -> String {
    let focus = if experience.is_challenging {
        CHALLENGING_FOCUS
    } else {
        POSITIVE_FOCUS
    };

    // Free-text fields go last so a stray "{...}" in generated text is never re-substituted.
    STORY_PROMPT_TEMPLATE
        .replace("{output_rules}", &output_rules)
        .replace("{focus}", focus)
        .replace("{age}", &person.age.to_string())
        .replace("{experience_type}", &experience.experience_type)
        .replace("{destination}", &experience.destination_country)
        .replace("{nationality}", &person.nationality)
        .replace("{origin_city}", &person.origin_city)
        .replace("{occupation}", &person.occupation)
        .replace("{name}", &person.name)
        .replace("{background}", background)
}
