use crate::error::AnalyticsError;

/// A self-contained analytics computation over an input snapshot.
///
/// Jobs consume **snapshots** (source text, record sets) via their `Input`
/// type. This crate stays storage-agnostic: inputs are provided by callers
/// (infra/pipeline), and outputs are returned for the caller to persist.
pub trait AnalyticsJob: Send + Sync + 'static {
    type Input: Send + Sync + 'static;
    type Output: Send + 'static;

    /// Stable job name, used as a log field by runners.
    fn name(&self) -> &'static str;

    /// The input snapshot the job will run on.
    fn input(&self) -> &Self::Input;

    /// Execute the computation.
    ///
    /// Must be deterministic for a given input and must not touch any store.
    fn run(&self) -> Result<Self::Output, AnalyticsError>;
}
