use anyhow::{anyhow, Context, Result};
use chrono::Datelike;

use crate::errors::AppError;

const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434/api/generate";
const DEFAULT_OLLAMA_MODEL: &str = "llama3.2";
const DEFAULT_OUTPUT: &str = "generated_stories.json";
const DEFAULT_ITERATIONS: u32 = 30;
const DEFAULT_PROGRESS_INTERVAL: u32 = 5;

const NATIONALITIES: &[&str] = &[
    "UK",
    "US",
    "France",
    "Germany",
    "Spain",
    "Japan",
    "Brazil",
    "India",
    "China",
    "Canada",
    "Australia",
    "Italy",
    "Netherlands",
    "Mexico",
];

const DESTINATIONS: &[&str] = &[
    "France",
    "US",
    "UK",
    "Spain",
    "Japan",
    "Australia",
    "Brazil",
    "Thailand",
    "Germany",
    "Italy",
    "Canada",
    "China",
    "India",
    "Mexico",
    "Netherlands",
    "South Africa",
    "New Zealand",
    "Argentina",
    "Kenya",
    "Indonesia",
];

const EXPERIENCE_TYPES: &[&str] = &[
    "Volunteering",
    "Study Abroad",
    "Backpacking",
    "Cultural Exchange",
    "Work & Travel",
    "Au Pair",
    "Teaching English",
    "Gap Year",
    "Internship",
];

const LOCALE_MAP: &[(&str, &str)] = &[
    ("UK", "en_GB"),
    ("US", "en_US"),
    ("France", "fr"),
    ("Germany", "de"),
    ("Spain", "es"),
    ("Japan", "ja"),
    ("Brazil", "pt_BR"),
    ("India", "en_IN"),
    ("China", "zh_CN"),
    ("Canada", "en_CA"),
    ("Australia", "en_AU"),
    ("Italy", "it"),
    ("Netherlands", "nl"),
    ("Mexico", "es_MX"),
];

/// Locale used when a nationality has no entry in the locale map.
pub const FALLBACK_LOCALE: &str = "en";

/// The enumerated value pools fields are sampled from.
/// Genders and education levels are closed enums in `generation::demographics`.
#[derive(Debug, Clone)]
pub struct ValuePools {
    pub nationalities: Vec<String>,
    pub destinations: Vec<String>,
    pub experience_types: Vec<String>,
    pub locales: Vec<(String, String)>,
}

impl Default for ValuePools {
    fn default() -> Self {
        let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();
        Self {
            nationalities: owned(NATIONALITIES),
            destinations: owned(DESTINATIONS),
            experience_types: owned(EXPERIENCE_TYPES),
            locales: LOCALE_MAP
                .iter()
                .map(|(n, l)| (n.to_string(), l.to_string()))
                .collect(),
        }
    }
}

impl ValuePools {
    /// Faker locale for a nationality, `en` when unmapped.
    pub fn locale_for(&self, nationality: &str) -> &str {
        self.locales
            .iter()
            .find(|(n, _)| n == nationality)
            .map(|(_, l)| l.as_str())
            .unwrap_or(FALLBACK_LOCALE)
    }

    /// Rejects pools that would leave a generator with nothing to choose from.
    pub fn validate(&self) -> Result<()> {
        if self.nationalities.is_empty() {
            return Err(anyhow!("nationality pool is empty"));
        }
        if self.experience_types.is_empty() {
            return Err(anyhow!("experience type pool is empty"));
        }
        for nationality in &self.nationalities {
            if !self.destinations.iter().any(|d| d != nationality) {
                return Err(anyhow!(
                    "no destination available for nationality '{nationality}'"
                ));
            }
        }
        Ok(())
    }
}

/// Which checkpoints block for operator input.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ReviewSettings {
    pub review_user: bool,
    pub review_experience: bool,
    pub review_story: bool,
    /// Progress checkpoint every N accepted records; 0 disables it.
    pub progress_interval: u32,
}

/// How the story body and title are obtained from the model.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum StoryMode {
    /// One call for the body, a second for the title.
    #[default]
    Separate,
    /// One call returning `{ "title", "body_text" }`, read by the response parser.
    Structured,
}

impl std::str::FromStr for StoryMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "separate" => Ok(StoryMode::Separate),
            "structured" => Ok(StoryMode::Structured),
            other => Err(anyhow!("unknown story mode '{other}' (expected separate|structured)")),
        }
    }
}

/// Inference endpoint settings.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub url: String,
    pub model: String,
    pub timeout_secs: Option<u64>,
}

/// Run configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub iterations: u32,
    pub review: ReviewSettings,
    pub output_path: String,
    pub headless: bool,
    pub story_mode: StoryMode,
    pub reference_year: i32,
    pub seed: Option<u64>,
    pub llm: LlmSettings,
    pub pools: ValuePools,
    pub rust_log: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            review: ReviewSettings {
                progress_interval: DEFAULT_PROGRESS_INTERVAL,
                ..ReviewSettings::default()
            },
            output_path: DEFAULT_OUTPUT.to_string(),
            headless: false,
            story_mode: StoryMode::Separate,
            reference_year: chrono::Utc::now().year(),
            seed: None,
            llm: LlmSettings {
                url: DEFAULT_OLLAMA_URL.to_string(),
                model: DEFAULT_OLLAMA_MODEL.to_string(),
                timeout_secs: None,
            },
            pools: ValuePools::default(),
            rust_log: "info".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
            .map_err(|e| AppError::Config(format!("{e:#}")))
    }

    /// Builds a config from any key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let config = Config {
            iterations: parse_or(&lookup, "SYNTH_ITERATIONS", defaults.iterations)?,
            review: ReviewSettings {
                review_user: parse_bool_or(&lookup, "SYNTH_REVIEW_USER", false)?,
                review_experience: parse_bool_or(&lookup, "SYNTH_REVIEW_EXPERIENCE", false)?,
                review_story: parse_bool_or(&lookup, "SYNTH_REVIEW_STORY", false)?,
                progress_interval: parse_or(
                    &lookup,
                    "SYNTH_PROGRESS_INTERVAL",
                    defaults.review.progress_interval,
                )?,
            },
            output_path: lookup("SYNTH_OUTPUT").unwrap_or(defaults.output_path),
            headless: parse_bool_or(&lookup, "SYNTH_HEADLESS", false)?,
            story_mode: parse_or(&lookup, "SYNTH_STORY_MODE", defaults.story_mode)?,
            reference_year: parse_or(&lookup, "SYNTH_REFERENCE_YEAR", defaults.reference_year)?,
            seed: lookup("SYNTH_SEED")
                .map(|v| v.parse::<u64>())
                .transpose()
                .context("SYNTH_SEED must be an unsigned integer")?,
            llm: LlmSettings {
                url: lookup("OLLAMA_URL").unwrap_or(defaults.llm.url),
                model: lookup("OLLAMA_MODEL").unwrap_or(defaults.llm.model),
                timeout_secs: lookup("OLLAMA_TIMEOUT_SECS")
                    .map(|v| v.parse::<u64>())
                    .transpose()
                    .context("OLLAMA_TIMEOUT_SECS must be a number of seconds")?,
            },
            pools: ValuePools {
                nationalities: list_or(&lookup, "SYNTH_NATIONALITIES", defaults.pools.nationalities),
                destinations: list_or(&lookup, "SYNTH_DESTINATIONS", defaults.pools.destinations),
                experience_types: list_or(
                    &lookup,
                    "SYNTH_EXPERIENCE_TYPES",
                    defaults.pools.experience_types,
                ),
                locales: defaults.pools.locales,
            },
            rust_log: lookup("RUST_LOG").unwrap_or(defaults.rust_log),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.iterations == 0 {
            return Err(anyhow!("SYNTH_ITERATIONS must be at least 1"));
        }
        if !(1900..=9999).contains(&self.reference_year) {
            return Err(anyhow!(
                "SYNTH_REFERENCE_YEAR must be between 1900 and 9999, got {}",
                self.reference_year
            ));
        }
        self.pools.validate()
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow!("{key} has invalid value '{raw}': {e}")),
        None => Ok(default),
    }
}

fn parse_bool_or<F>(lookup: &F, key: &str, default: bool) -> Result<bool>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Err(anyhow!("{key} must be a boolean, got '{raw}'")),
        },
        None => Ok(default),
    }
}

/// Comma-separated list; blank entries are dropped, so an empty value
/// yields an empty pool and fails validation.
fn list_or<F>(lookup: &F, key: &str, default: Vec<String>) -> Vec<String>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect(),
        None => default,
    }
}
