//! Runtime tuning knobs.

/// Default number of pure task instructions a process may run before it is
/// sent to the back of the run queue.
pub const DEFAULT_STEP_BUDGET: usize = 1024;

/// Scheduler configuration.
///
/// ```rust
/// use oxide_vdom::SchedulerConfig;
///
/// let config = SchedulerConfig::default().with_step_budget(64);
/// assert_eq!(config.step_budget, 64);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Instructions a process may execute per slice. A value of `0` is
    /// treated as `1`.
    pub step_budget: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            step_budget: DEFAULT_STEP_BUDGET,
        }
    }
}

impl SchedulerConfig {
    /// Set the per-slice instruction budget.
    pub fn with_step_budget(mut self, step_budget: usize) -> Self {
        self.step_budget = step_budget;
        self
    }

    pub(crate) fn budget(&self) -> usize {
        self.step_budget.max(1)
    }
}
