use std::time::Duration;

use crate::pipeline::aggregate::StoryRecord;

const BANNER_WIDTH: usize = 70;

/// `====` line, title, `====` line.
pub fn banner(title: &str) -> String {
    let rule = "=".repeat(BANNER_WIDTH);
    format!("\n{rule}\n{title}\n{rule}")
}

/// Per-run bookkeeping that does not live in the records themselves.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunCounters {
    /// Iterations started, including rejected and failed ones.
    pub attempts: u32,
    pub rejected: u32,
    pub retried: u32,
    pub abandoned: u32,
    /// Accepted stories whose structured output fell back to the default pair.
    pub fallbacks: u32,
}

/// Aggregate statistics over completed records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stats {
    pub total: usize,
    pub positive: usize,
    pub challenging: usize,
    pub avg_length: usize,
    pub counters: RunCounters,
}

impl Stats {
    pub fn collect(records: &[StoryRecord], counters: RunCounters) -> Self {
        let total = records.len();
        let challenging = records.iter().filter(|r| r.story.is_negative).count();
        let total_length: usize = records
            .iter()
            .map(|r| r.story.body_text.chars().count())
            .sum();

        Self {
            total,
            positive: total - challenging,
            challenging,
            avg_length: if total == 0 {
                0
            } else {
                (total_length as f64 / total as f64).round() as usize
            },
            counters,
        }
    }

    /// Accepted records as a share of attempted iterations.
    pub fn success_rate(&self) -> u32 {
        percent(self.total, self.counters.attempts as usize)
    }

    pub fn render(&self) -> String {
        format!(
            "\nCurrent Statistics:\n   Total stories: {}\n   Positive: {} ({}%)\n   Challenging: {} ({}%)\n   Avg length: {} characters\n   Fallback stories: {}\n   Rejected iterations: {}\n   Abandoned iterations: {}",
            self.total,
            self.positive,
            percent(self.positive, self.total),
            self.challenging,
            percent(self.challenging, self.total),
            self.avg_length,
            self.counters.fallbacks,
            self.counters.rejected,
            self.counters.abandoned,
        )
    }
}

/// Mean wall time per accepted record times the slots still open.
pub fn estimate_remaining(elapsed: Duration, accepted: usize, remaining: u32) -> Option<Duration> {
    if accepted == 0 {
        return None;
    }
    Some(elapsed / accepted as u32 * remaining)
}

fn percent(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    (part as f64 * 100.0 / whole as f64).round() as u32
}
