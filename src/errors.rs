use thiserror::Error;

/// Errors surfaced by the engine.
///
/// Structural mutation rejections (a connection that already exists, or one
/// that would close a cycle in feed-forward mode) are handled locally by the
/// mutation operators with bounded retries and never reach this type.
#[derive(Debug, Error)]
pub enum NeatError {
    /// Invalid configuration, unknown activation/aggregation name, or a
    /// genome/input that does not fit the configured network shape.
    /// Fatal at construction time.
    #[error("configuration error: {0}")]
    Config(String),

    /// A feed-forward network was requested for a genome whose enabled
    /// connection subgraph contains a cycle.
    #[error("feed-forward network rejected: enabled connection graph contains a cycle")]
    CycleRejected,

    /// Every species was removed. Terminal unless the population is
    /// configured to reset from scratch on extinction.
    #[error("complete extinction: no species left to reproduce")]
    CompleteExtinction,

    /// The external fitness evaluator failed for at least one genome.
    /// Fitness comparison requires a complete cohort, so the whole
    /// generation is aborted.
    #[error("fitness evaluation failed: {0}")]
    Evaluation(String),
}
