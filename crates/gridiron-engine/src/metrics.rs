//! Per-tick performance metrics for the engine.
//!
//! [`TickMetrics`] captures timing and counter data for a single tick
//! plus cumulative machine-lifetime counters. The engine populates the
//! per-tick fields after each `tick()`; cumulative fields carry across
//! ticks and reset on `start()`.

/// Timing and counter metrics for the state machine.
///
/// All durations are in microseconds.
#[derive(Clone, Debug, Default)]
pub struct TickMetrics {
    /// Wall-clock time for the entire tick.
    pub total_us: u64,
    /// Time spent building the world snapshot.
    pub snapshot_build_us: u64,
    /// Time spent in the state's `run` callback.
    pub run_us: u64,
    /// Time spent executing effects and flushing the mutation buffer.
    pub flush_us: u64,
    /// Adapter writes performed by the last flush.
    pub mutation_writes: u32,
    /// Patches skipped by write elision in the last flush.
    pub mutations_elided: u32,
    /// Effect closures executed in the last flush.
    pub effects_run: u32,
    /// Cumulative hard state swaps performed.
    pub transitions_applied: u64,
    /// Cumulative same-state soft refreshes performed.
    pub soft_refreshes: u64,
    /// Cumulative ticks skipped while frozen pending resume.
    pub frozen_ticks: u64,
    /// Cumulative pause events.
    pub pauses: u64,
    /// Cumulative resume events.
    pub resumes: u64,
}
