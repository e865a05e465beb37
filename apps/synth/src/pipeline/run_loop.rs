//! Run loop: orchestrates the full generation pipeline.
//!
//! States: connectivity check → operator start confirmation → iterating → completed.
//!
//! Per iteration:
//!   demographics → background (model) → review user →
//!   experience → review experience →
//!   story + title (model) → review story →
//!   aggregate → persist → progress checkpoint (every K accepted)
//!
//! Counter policy: a slot is consumed by an accepted record or by a failed
//! iteration the operator declined to retry. Rejections and retries never
//! consume one.

use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::errors::{AppError, EXIT_OK, EXIT_UNREACHABLE};
use crate::generation::demographics::{generate_demographics, pick_nationality};
use crate::generation::experience::generate_experience;
use crate::generation::narrative::{generate_background, generate_story};
use crate::llm_client::prompts::CONNECTIVITY_PROBE;
use crate::llm_client::TextGenerator;
use crate::pipeline::aggregate::{aggregate, ResultStore, StoryRecord};
use crate::pipeline::checkpoint::{Checkpoint, CheckpointController, Decision, Operator, Question};
use crate::pipeline::stats::{banner, estimate_remaining, RunCounters, Stats};

const PROBE_TEMPERATURE: f32 = 0.5;

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// All slots consumed.
    Completed { records: usize },
    /// Operator declined a progress checkpoint.
    Stopped { records: usize },
    /// Operator declined to start.
    Cancelled,
    /// Startup connectivity check failed; nothing was generated.
    Unreachable,
}

impl RunOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::Unreachable => EXIT_UNREACHABLE,
            _ => EXIT_OK,
        }
    }
}

/// The stage whose checkpoint discarded an iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    User,
    Experience,
    Story,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::User => write!(f, "User"),
            Stage::Experience => write!(f, "Experience"),
            Stage::Story => write!(f, "Story"),
        }
    }
}

#[derive(Debug)]
enum IterationOutcome {
    Accepted {
        record: StoryRecord,
        well_formed: bool,
    },
    Rejected(Stage),
}

/// Everything accumulated over a run, threaded through each stage.
#[derive(Debug)]
pub struct RunState {
    pub store: ResultStore,
    pub slots_used: u32,
    pub counters: RunCounters,
    started: Instant,
}

impl RunState {
    pub fn new(store: ResultStore) -> Self {
        Self {
            store,
            slots_used: 0,
            counters: RunCounters::default(),
            started: Instant::now(),
        }
    }

    pub fn stats(&self) -> Stats {
        Stats::collect(self.store.records(), self.counters)
    }

    fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

pub struct Pipeline {
    config: Config,
    llm: Arc<dyn TextGenerator>,
    operator: Box<dyn Operator>,
    checkpoints: CheckpointController,
    rng: StdRng,
}

impl Pipeline {
    pub fn new(config: Config, llm: Arc<dyn TextGenerator>, operator: Box<dyn Operator>) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            checkpoints: CheckpointController::new(config.review),
            config,
            llm,
            operator,
            rng,
        }
    }

    /// Runs to completion. Only fatal errors (I/O, serialization, operator
    /// console failure) are returned as `Err`.
    pub async fn run(&mut self) -> Result<RunOutcome, AppError> {
        self.present_configuration().await?;

        if !self.check_connectivity().await? {
            return Ok(RunOutcome::Unreachable);
        }

        if self.operator.decide(Question::StartRun).await? != Decision::Accept {
            self.operator.present("Cancelled").await?;
            return Ok(RunOutcome::Cancelled);
        }

        let mut state = RunState::new(ResultStore::new(&self.config.output_path));
        let stopped = self.iterate(&mut state).await?;
        self.finish(&state).await?;

        let records = state.store.len();
        Ok(if stopped {
            RunOutcome::Stopped { records }
        } else {
            RunOutcome::Completed { records }
        })
    }

    async fn present_configuration(&mut self) -> Result<(), AppError> {
        let review = self.config.review;
        let text = format!(
            "{}\n\nConfiguration:\n   Total stories: {}\n   Model: {}\n   Story mode: {:?}\n   Review every user: {}\n   Review every experience: {}\n   Review every story: {}\n   Progress check: every {} stories\n   Output: {}",
            banner("STORY SYNTHESISER"),
            self.config.iterations,
            self.llm.model(),
            self.config.story_mode,
            review.review_user,
            review.review_experience,
            review.review_story,
            review.progress_interval,
            self.config.output_path,
        );
        self.operator.present(&text).await
    }

    async fn check_connectivity(&mut self) -> Result<bool, AppError> {
        info!("Testing inference server connection...");
        match self.llm.generate(CONNECTIVITY_PROBE, PROBE_TEMPERATURE).await {
            Ok(_) => {
                info!("Inference server connected");
                Ok(true)
            }
            Err(e) => {
                error!(
                    "Cannot connect to inference server (status {:?}): {e}",
                    e.status()
                );
                self.operator
                    .present(&format!(
                        "Cannot connect to the inference server at {}.\n   Make sure it is running (ollama serve)\n   and the model is pulled (ollama pull {}).",
                        self.config.llm.url,
                        self.llm.model()
                    ))
                    .await?;
                Ok(false)
            }
        }
    }

    /// Returns true when the operator stopped the run early.
    async fn iterate(&mut self, state: &mut RunState) -> Result<bool, AppError> {
        let total = self.config.iterations;

        while state.slots_used < total {
            let iteration = state.slots_used + 1;
            state.counters.attempts += 1;
            info!("Iteration {iteration}/{total} (attempt {})", state.counters.attempts);

            match self.run_iteration(iteration).await {
                Ok(IterationOutcome::Accepted {
                    record,
                    well_formed,
                }) => {
                    if !well_formed {
                        state.counters.fallbacks += 1;
                    }
                    state.store.append(record)?;
                    state.slots_used += 1;

                    if self
                        .checkpoints
                        .progress_due(state.store.len(), state.slots_used, total)
                        && !self.review_progress(state).await?
                    {
                        info!("Operator stopped the run after {} stories", state.store.len());
                        return Ok(true);
                    }
                }
                Ok(IterationOutcome::Rejected(stage)) => {
                    state.counters.rejected += 1;
                    self.operator
                        .present(&format!("{stage} rejected, regenerating..."))
                        .await?;
                }
                Err(e) if e.is_retryable() => {
                    error!("Error in iteration {iteration}: {e}");
                    self.operator
                        .present(&format!("Error in iteration {iteration}: {e}"))
                        .await?;
                    if self.operator.decide(Question::RetryIteration).await? == Decision::Accept {
                        state.counters.retried += 1;
                    } else {
                        warn!("Iteration {iteration} abandoned");
                        state.counters.abandoned += 1;
                        state.slots_used += 1;
                    }
                }
                Err(e) => return Err(e),
            }
        }

        Ok(false)
    }

    async fn run_iteration(&mut self, iteration: u32) -> Result<IterationOutcome, AppError> {
        let pools = &self.config.pools;

        let nationality = pick_nationality(&mut self.rng, pools);
        let person = generate_demographics(
            &mut self.rng,
            pools,
            &nationality,
            self.config.reference_year,
        );
        info!("Generated user: {}", person.name);

        let background = generate_background(self.llm.as_ref(), &person).await?;
        info!("Generated background");

        let decision = self
            .checkpoints
            .review(
                self.operator.as_mut(),
                &Checkpoint::User {
                    iteration,
                    person: &person,
                    background: &background,
                },
            )
            .await?;
        if decision.discards() {
            return Ok(IterationOutcome::Rejected(Stage::User));
        }

        let experience = generate_experience(&mut self.rng, pools, &person.nationality);
        info!(
            "Experience: {} in {}",
            experience.experience_type, experience.destination_country
        );

        let decision = self
            .checkpoints
            .review(
                self.operator.as_mut(),
                &Checkpoint::Experience {
                    iteration,
                    experience: &experience,
                },
            )
            .await?;
        if decision.discards() {
            return Ok(IterationOutcome::Rejected(Stage::Experience));
        }

        let story = generate_story(
            self.llm.as_ref(),
            self.config.story_mode,
            &person,
            &background,
            &experience,
        )
        .await?;
        info!("Generated title: {:?}", story.title);

        let decision = self
            .checkpoints
            .review(
                self.operator.as_mut(),
                &Checkpoint::Story {
                    iteration,
                    story: &story,
                },
            )
            .await?;
        if decision.discards() {
            return Ok(IterationOutcome::Rejected(Stage::Story));
        }

        Ok(IterationOutcome::Accepted {
            record: aggregate(&person, &background, &experience, &story),
            well_formed: story.well_formed,
        })
    }

    async fn review_progress(&mut self, state: &RunState) -> Result<bool, AppError> {
        let stats = state.stats();
        let remaining = self.config.iterations - state.slots_used;
        let checkpoint = Checkpoint::Progress {
            completed: state.store.len(),
            total: self.config.iterations,
            success_rate: stats.success_rate(),
            estimated_remaining: estimate_remaining(state.elapsed(), state.store.len(), remaining),
        };
        self.checkpoints
            .review_progress(self.operator.as_mut(), &checkpoint, &stats)
            .await
    }

    async fn finish(&mut self, state: &RunState) -> Result<(), AppError> {
        if state.store.is_empty() {
            warn!("No stories were accepted; writing an empty result set");
        }
        state.store.persist()?;

        let text = format!(
            "{}\n{}\n\nOutput: {}\n\nDone! Generated {} complete stories.",
            banner("GENERATION COMPLETE"),
            state.stats().render(),
            state.store.path().display(),
            state.store.len()
        );
        self.operator.present(&text).await
    }
}
