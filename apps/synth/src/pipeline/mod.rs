// Run orchestration: checkpoints, aggregation/persistence, statistics and the run loop.

pub mod aggregate;
pub mod checkpoint;
pub mod run_loop;
pub mod stats;

#[cfg(test)]
pub(crate) mod testing;
