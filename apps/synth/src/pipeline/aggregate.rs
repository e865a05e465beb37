//! Aggregator / persister.
//!
//! Folds one person, one experience and one story draft into the output
//! schema, then rewrites the whole result file. Only complete records are
//! ever appended.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::generation::demographics::{DemographicRecord, Education, Gender};
use crate::generation::experience::ExperienceRecord;
use crate::generation::narrative::StoryDraft;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserEntry {
    pub user_id: Uuid,
    pub name: String,
    pub gender: Gender,
    pub age: i32,
    #[serde(rename = "DOB")]
    pub dob: NaiveDate,
    pub origin_address: String,
    pub nationality: String,
    pub occupation: String,
    pub education: Education,
    pub background: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperienceEntry {
    pub experience_id: Uuid,
    pub destination_country: String,
    pub experience_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryEntry {
    pub story_id: Uuid,
    pub title: String,
    pub body_text: String,
    pub is_negative: bool,
}

/// The unit of output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryRecord {
    pub user: UserEntry,
    pub experience: ExperienceEntry,
    pub story: StoryEntry,
}

/// Builds a record with three fresh v4 identifiers.
pub fn aggregate(
    person: &DemographicRecord,
    background: &str,
    experience: &ExperienceRecord,
    story: &StoryDraft,
) -> StoryRecord {
    StoryRecord {
        user: UserEntry {
            user_id: Uuid::new_v4(),
            name: person.name.clone(),
            gender: person.gender,
            age: person.age,
            dob: person.dob,
            origin_address: person.origin_address.clone(),
            nationality: person.nationality.clone(),
            occupation: person.occupation.clone(),
            education: person.education,
            background: background.to_string(),
        },
        experience: ExperienceEntry {
            experience_id: Uuid::new_v4(),
            destination_country: experience.destination_country.clone(),
            experience_type: experience.experience_type.clone(),
        },
        story: StoryEntry {
            story_id: Uuid::new_v4(),
            title: story.title.clone(),
            body_text: story.body_text.clone(),
            is_negative: story.is_negative,
        },
    }
}

/// Append-only in-memory result list mirrored to one JSON file.
#[derive(Debug)]
pub struct ResultStore {
    path: PathBuf,
    records: Vec<StoryRecord>,
}

impl ResultStore {
    /// Creating the store does not touch the file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            records: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records(&self) -> &[StoryRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Appends and rewrites the full file.
    pub fn append(&mut self, record: StoryRecord) -> Result<(), AppError> {
        self.records.push(record);
        self.persist()?;
        info!("Saved progress ({} stories)", self.records.len());
        Ok(())
    }

    /// Serializes every record as a pretty-printed array and replaces the file
    /// via a temporary sibling plus rename.
    pub fn persist(&self) -> Result<(), AppError> {
        let json = serde_json::to_string_pretty(&self.records)?;

        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.flush()?;
        tmp.persist(&self.path).map_err(|e| AppError::Io(e.error))?;
        Ok(())
    }
}
