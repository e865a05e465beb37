//! Checkpoint controller: human review gates between pipeline stages.
//!
//! The pipeline never touches stdin/stdout directly. It hands rendered
//! checkpoints to an `Operator` and gets back a `Decision`, so the same loop
//! runs interactively (`ConsoleOperator`) or unattended (`HeadlessOperator`).

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Lines, Stdin, Stdout,
};
use tracing::{debug, info};

use crate::config::ReviewSettings;
use crate::errors::AppError;
use crate::generation::demographics::DemographicRecord;
use crate::generation::experience::ExperienceRecord;
use crate::generation::narrative::StoryDraft;
use crate::pipeline::stats::{banner, Stats};

/// Characters of the story body shown at the story checkpoint.
const STORY_PREVIEW_CHARS: usize = 300;

/// What the operator is being asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Question {
    StartRun,
    AcceptUser,
    AcceptExperience,
    AcceptStory,
    Continue,
    RetryIteration,
    ResumeAfterPause,
}

impl Question {
    pub fn prompt(&self) -> &'static str {
        match self {
            Question::StartRun => "Start generation? (y/n): ",
            Question::AcceptUser => "Accept this user? (y/n/regenerate): ",
            Question::AcceptExperience => "Accept this experience? (y/n): ",
            Question::AcceptStory => "Accept this story? (y/n/regenerate): ",
            Question::Continue => "Continue? (y/n/pause/stats): ",
            Question::RetryIteration => "Retry this iteration? (y/n): ",
            Question::ResumeAfterPause => "Press Enter to continue...",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accept,
    Reject,
    Regenerate,
    Pause,
    ShowStats,
}

impl Decision {
    /// Maps a raw answer to a decision.
    ///
    /// Start and retry need an explicit yes. Review gates are permissive:
    /// anything that is not a rejection is an accept.
    pub fn parse(question: Question, answer: &str) -> Decision {
        let answer = answer.trim().to_ascii_lowercase();
        match question {
            Question::StartRun | Question::RetryIteration => match answer.as_str() {
                "y" | "yes" => Decision::Accept,
                _ => Decision::Reject,
            },
            Question::AcceptUser | Question::AcceptExperience | Question::AcceptStory => {
                match answer.as_str() {
                    "n" | "no" => Decision::Reject,
                    "r" | "regenerate" => Decision::Regenerate,
                    _ => Decision::Accept,
                }
            }
            Question::Continue => match answer.as_str() {
                "n" | "no" => Decision::Reject,
                "pause" => Decision::Pause,
                "stats" => Decision::ShowStats,
                _ => Decision::Accept,
            },
            Question::ResumeAfterPause => Decision::Accept,
        }
    }

    /// True for the answers that discard the current iteration.
    pub fn discards(&self) -> bool {
        matches!(self, Decision::Reject | Decision::Regenerate)
    }
}

/// The human (or stand-in) on the other side of the checkpoints.
#[async_trait]
pub trait Operator: Send {
    /// Shows text to the operator.
    async fn present(&mut self, text: &str) -> Result<(), AppError>;

    /// Blocks until the operator answers `question`.
    async fn decide(&mut self, question: Question) -> Result<Decision, AppError>;
}

/// Interactive operator. Reads answers line by line from `R` and writes
/// checkpoints and prompts to `W`; defaults to standard input/output.
pub struct ConsoleOperator<R = BufReader<Stdin>, W = Stdout> {
    lines: Lines<R>,
    out: W,
}

impl ConsoleOperator {
    pub fn new() -> Self {
        Self::with_io(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl Default for ConsoleOperator {
    fn default() -> Self {
        Self::new()
    }
}

impl<R, W> ConsoleOperator<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn with_io(reader: R, out: W) -> Self {
        Self {
            lines: reader.lines(),
            out,
        }
    }

    #[cfg(test)]
    fn into_output(self) -> W {
        self.out
    }
}

#[async_trait]
impl<R, W> Operator for ConsoleOperator<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn present(&mut self, text: &str) -> Result<(), AppError> {
        self.out.write_all(text.as_bytes()).await?;
        self.out.write_all(b"\n").await?;
        self.out.flush().await?;
        Ok(())
    }

    async fn decide(&mut self, question: Question) -> Result<Decision, AppError> {
        self.out.write_all(b"\n").await?;
        self.out.write_all(question.prompt().as_bytes()).await?;
        self.out.flush().await?;

        // EOF reads as an empty answer.
        let answer = self.lines.next_line().await?.unwrap_or_default();
        Ok(Decision::parse(question, &answer))
    }
}

/// Unattended operator: accepts every gate, declines fault retries.
#[derive(Debug, Default)]
pub struct HeadlessOperator;

#[async_trait]
impl Operator for HeadlessOperator {
    async fn present(&mut self, text: &str) -> Result<(), AppError> {
        debug!("{text}");
        Ok(())
    }

    async fn decide(&mut self, question: Question) -> Result<Decision, AppError> {
        let decision = match question {
            Question::RetryIteration => Decision::Reject,
            _ => Decision::Accept,
        };
        info!("Headless answer to {:?}: {:?}", question, decision);
        Ok(decision)
    }
}

/// A rendered review gate.
#[derive(Debug)]
pub enum Checkpoint<'a> {
    User {
        iteration: u32,
        person: &'a DemographicRecord,
        background: &'a str,
    },
    Experience {
        iteration: u32,
        experience: &'a ExperienceRecord,
    },
    Story {
        iteration: u32,
        story: &'a StoryDraft,
    },
    Progress {
        completed: usize,
        total: u32,
        success_rate: u32,
        estimated_remaining: Option<Duration>,
    },
}

impl Checkpoint<'_> {
    pub fn question(&self) -> Question {
        match self {
            Checkpoint::User { .. } => Question::AcceptUser,
            Checkpoint::Experience { .. } => Question::AcceptExperience,
            Checkpoint::Story { .. } => Question::AcceptStory,
            Checkpoint::Progress { .. } => Question::Continue,
        }
    }

    pub fn render(&self) -> String {
        match self {
            Checkpoint::User {
                iteration,
                person,
                background,
            } => format!(
                "{}\n\nDemographics:\n   Name: {}\n   Age: {} ({})\n   From: {}, {}\n   Occupation: {}\n   Education: {}\n\nBackground Story:\n   {}",
                banner(&format!("CHECKPOINT 1: Review User #{iteration}")),
                person.name,
                person.age,
                person.gender.as_str(),
                person.origin_city,
                person.nationality,
                person.occupation,
                person.education.as_str(),
                background
            ),
            Checkpoint::Experience {
                iteration,
                experience,
            } => format!(
                "{}\n\nExperience Details:\n   Type: {}\n   Destination: {}\n   Tone: {}",
                banner(&format!("CHECKPOINT 2: Review Experience #{iteration}")),
                experience.experience_type,
                experience.destination_country,
                if experience.is_challenging {
                    "Challenging/Growth"
                } else {
                    "Positive/Discovery"
                }
            ),
            Checkpoint::Story { iteration, story } => format!(
                "{}\n\nTitle: {}\nLength: {} characters\nSentiment: {}{}\n\nStory Preview (first {} chars):\n   {}...",
                banner(&format!("CHECKPOINT 3: Review Story #{iteration}")),
                story.title,
                story.body_text.chars().count(),
                if story.is_negative { "Challenging" } else { "Positive" },
                if story.well_formed { "" } else { "\nWarning: model output was not valid JSON, fallback text used" },
                STORY_PREVIEW_CHARS,
                story.body_text.chars().take(STORY_PREVIEW_CHARS).collect::<String>()
            ),
            Checkpoint::Progress {
                completed,
                total,
                success_rate,
                estimated_remaining,
            } => format!(
                "{}\n\nProgress:\n   Completed: {}/{}\n   Success rate: {}%\n   Estimated remaining: {}",
                banner("CHECKPOINT 4: Progress Review"),
                completed,
                total,
                success_rate,
                estimated_remaining
                    .map(format_duration)
                    .unwrap_or_else(|| "unknown".to_string())
            ),
        }
    }
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs >= 60 {
        format!("~{} min {} s", secs / 60, secs % 60)
    } else {
        format!("~{secs} s")
    }
}

/// Decides which gates block for input and runs the progress sub-dialogue.
#[derive(Debug, Clone, Copy)]
pub struct CheckpointController {
    review: ReviewSettings,
}

impl CheckpointController {
    pub fn new(review: ReviewSettings) -> Self {
        Self { review }
    }

    fn blocks(&self, question: Question) -> bool {
        match question {
            Question::AcceptUser => self.review.review_user,
            Question::AcceptExperience => self.review.review_experience,
            Question::AcceptStory => self.review.review_story,
            Question::Continue => self.review.progress_interval > 0,
            _ => true,
        }
    }

    /// Presents a content checkpoint; returns `Accept` without asking when
    /// that gate's review flag is off.
    pub async fn review(
        &self,
        operator: &mut dyn Operator,
        checkpoint: &Checkpoint<'_>,
    ) -> Result<Decision, AppError> {
        operator.present(&checkpoint.render()).await?;

        let question = checkpoint.question();
        if !self.blocks(question) {
            return Ok(Decision::Accept);
        }
        operator.decide(question).await
    }

    /// Whether a progress checkpoint is due after `accepted` records with
    /// `slots_used` of `total` consumed.
    pub fn progress_due(&self, accepted: usize, slots_used: u32, total: u32) -> bool {
        let interval = self.review.progress_interval as usize;
        interval > 0 && accepted > 0 && accepted % interval == 0 && slots_used < total
    }

    /// Runs the progress dialogue. `pause` and `stats` loop back to the
    /// question; returns false only when the operator declines to continue.
    pub async fn review_progress(
        &self,
        operator: &mut dyn Operator,
        checkpoint: &Checkpoint<'_>,
        stats: &Stats,
    ) -> Result<bool, AppError> {
        operator.present(&checkpoint.render()).await?;
        if !self.blocks(Question::Continue) {
            return Ok(true);
        }

        loop {
            match operator.decide(Question::Continue).await? {
                Decision::Reject => return Ok(false),
                Decision::Pause => {
                    operator.present("Paused.").await?;
                    operator.decide(Question::ResumeAfterPause).await?;
                }
                Decision::ShowStats => {
                    operator.present(&stats.render()).await?;
                }
                Decision::Accept | Decision::Regenerate => return Ok(true),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::demographics::{Education, Gender};
    use crate::pipeline::testing::ScriptedOperator;
    use chrono::NaiveDate;

    fn person() -> DemographicRecord {
        DemographicRecord {
            name: "Priya Nair".to_string(),
            gender: Gender::Female,
            age: 29,
            dob: NaiveDate::from_ymd_opt(1996, 8, 14).unwrap(),
            nationality: "India".to_string(),
            origin_city: "Kochi".to_string(),
            origin_address: "Pune, India".to_string(),
            occupation: "Architect".to_string(),
            education: Education::Masters,
        }
    }

    fn settings(review_user: bool, interval: u32) -> ReviewSettings {
        ReviewSettings {
            review_user,
            review_experience: false,
            review_story: false,
            progress_interval: interval,
        }
    }

    #[test]
    fn test_review_answers_are_permissive() {
        assert_eq!(Decision::parse(Question::AcceptUser, "n"), Decision::Reject);
        assert_eq!(Decision::parse(Question::AcceptUser, " N "), Decision::Reject);
        assert_eq!(Decision::parse(Question::AcceptStory, "regenerate"), Decision::Regenerate);
        assert_eq!(Decision::parse(Question::AcceptStory, ""), Decision::Accept);
        assert_eq!(Decision::parse(Question::AcceptExperience, "maybe"), Decision::Accept);
    }

    #[test]
    fn test_start_and_retry_need_explicit_yes() {
        assert_eq!(Decision::parse(Question::StartRun, "y"), Decision::Accept);
        assert_eq!(Decision::parse(Question::StartRun, "YES"), Decision::Accept);
        assert_eq!(Decision::parse(Question::StartRun, ""), Decision::Reject);
        assert_eq!(Decision::parse(Question::RetryIteration, "sure"), Decision::Reject);
    }

    #[test]
    fn test_continue_sub_commands() {
        assert_eq!(Decision::parse(Question::Continue, "pause"), Decision::Pause);
        assert_eq!(Decision::parse(Question::Continue, "Stats"), Decision::ShowStats);
        assert_eq!(Decision::parse(Question::Continue, "n"), Decision::Reject);
        assert_eq!(Decision::parse(Question::Continue, "y"), Decision::Accept);
    }

    #[tokio::test]
    async fn test_disabled_review_presents_without_asking() {
        let mut operator = ScriptedOperator::new(vec![Decision::Reject]);
        let transcript = operator.transcript();
        let controller = CheckpointController::new(settings(false, 0));
        let p = person();

        let decision = controller
            .review(
                &mut operator,
                &Checkpoint::User {
                    iteration: 1,
                    person: &p,
                    background: "Priya designs schools.",
                },
            )
            .await
            .unwrap();

        assert_eq!(decision, Decision::Accept);
        let t = transcript.lock().unwrap();
        assert!(t.questions.is_empty());
        assert!(t.presented[0].contains("CHECKPOINT 1: Review User #1"));
        assert!(t.presented[0].contains("Priya designs schools."));
    }

    #[tokio::test]
    async fn test_enabled_review_returns_operator_decision() {
        let mut operator = ScriptedOperator::new(vec![Decision::Reject]);
        let controller = CheckpointController::new(settings(true, 0));
        let p = person();
        let decision = controller
            .review(
                &mut operator,
                &Checkpoint::User {
                    iteration: 2,
                    person: &p,
                    background: "bg",
                },
            )
            .await
            .unwrap();
        assert_eq!(decision, Decision::Reject);
    }

    #[tokio::test]
    async fn test_progress_pause_and_stats_then_continue() {
        let mut operator = ScriptedOperator::new(vec![
            Decision::Pause,
            Decision::Accept, // enter after pause
            Decision::ShowStats,
            Decision::Accept,
        ]);
        let transcript = operator.transcript();
        let controller = CheckpointController::new(settings(false, 1));
        let checkpoint = Checkpoint::Progress {
            completed: 1,
            total: 3,
            success_rate: 100,
            estimated_remaining: Some(Duration::from_secs(150)),
        };

        let keep_going = controller
            .review_progress(&mut operator, &checkpoint, &Stats::default())
            .await
            .unwrap();

        assert!(keep_going);
        let t = transcript.lock().unwrap();
        assert_eq!(
            t.questions,
            vec![
                Question::Continue,
                Question::ResumeAfterPause,
                Question::Continue,
                Question::Continue
            ]
        );
        assert!(t.presented[0].contains("Completed: 1/3"));
        assert!(t.presented[0].contains("~2 min 30 s"));
        assert!(t.presented.iter().any(|p| p.contains("Current Statistics")));
    }

    #[tokio::test]
    async fn test_progress_reject_stops() {
        let mut operator = ScriptedOperator::new(vec![Decision::Reject]);
        let controller = CheckpointController::new(settings(false, 1));
        let checkpoint = Checkpoint::Progress {
            completed: 1,
            total: 3,
            success_rate: 100,
            estimated_remaining: None,
        };
        let keep_going = controller
            .review_progress(&mut operator, &checkpoint, &Stats::default())
            .await
            .unwrap();
        assert!(!keep_going);
    }

    #[test]
    fn test_progress_due_rules() {
        let controller = CheckpointController::new(settings(false, 5));
        assert!(controller.progress_due(5, 5, 30));
        assert!(!controller.progress_due(4, 4, 30));
        assert!(!controller.progress_due(30, 30, 30), "never after the last slot");
        assert!(!CheckpointController::new(settings(false, 0)).progress_due(5, 5, 30));
    }

    #[test]
    fn test_story_render_truncates_preview_and_flags_fallback() {
        let story = StoryDraft {
            title: "Default Title".to_string(),
            body_text: "x".repeat(400),
            is_negative: false,
            well_formed: false,
        };
        let text = Checkpoint::Story {
            iteration: 3,
            story: &story,
        }
        .render();
        assert!(text.contains("Length: 400 characters"));
        assert!(text.contains(&"x".repeat(300)));
        assert!(!text.contains(&"x".repeat(301)));
        assert!(text.contains("fallback text used"));
    }

    #[tokio::test]
    async fn test_console_writes_prompt_and_parses_answer() {
        let mut op = ConsoleOperator::with_io(&b"n\n"[..], Vec::new());
        let decision = op.decide(Question::AcceptUser).await.unwrap();
        assert_eq!(decision, Decision::Reject);

        let written = String::from_utf8(op.into_output()).unwrap();
        assert_eq!(written, "\nAccept this user? (y/n/regenerate): ");
    }

    #[tokio::test]
    async fn test_console_eof_reads_as_empty_answer() {
        let mut op = ConsoleOperator::with_io(&b""[..], Vec::new());
        assert_eq!(op.decide(Question::StartRun).await.unwrap(), Decision::Reject);
        assert_eq!(op.decide(Question::AcceptStory).await.unwrap(), Decision::Accept);
        assert_eq!(op.decide(Question::RetryIteration).await.unwrap(), Decision::Reject);
    }

    #[tokio::test]
    async fn test_console_progress_dialogue_with_pause_and_stats() {
        let mut op = ConsoleOperator::with_io(&b"pause\n\nstats\ny\n"[..], Vec::new());
        let controller = CheckpointController::new(settings(false, 1));
        let checkpoint = Checkpoint::Progress {
            completed: 2,
            total: 4,
            success_rate: 100,
            estimated_remaining: None,
        };

        let keep_going = controller
            .review_progress(&mut op, &checkpoint, &Stats::default())
            .await
            .unwrap();
        assert!(keep_going);

        let written = String::from_utf8(op.into_output()).unwrap();
        assert_eq!(written.matches(Question::Continue.prompt()).count(), 3);
        assert!(written.contains("Paused."));
        assert!(written.contains(Question::ResumeAfterPause.prompt()));
        assert!(written.contains("Current Statistics"));
    }

    #[tokio::test]
    async fn test_headless_declines_retry_accepts_rest() {
        let mut op = HeadlessOperator;
        assert_eq!(op.decide(Question::StartRun).await.unwrap(), Decision::Accept);
        assert_eq!(op.decide(Question::Continue).await.unwrap(), Decision::Accept);
        assert_eq!(
            op.decide(Question::RetryIteration).await.unwrap(),
            Decision::Reject
        );
    }
}
