//! Run options

/// What the runner does after a script fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Halt; every later script is reported as skipped
    #[default]
    StopOnFirstFailure,
    /// Attempt every remaining script and report all failures
    ContinueOnFailure,
}

/// Options for one runner invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunOptions {
    pub policy: FailurePolicy,
    /// Report what would be applied without touching the database
    pub dry_run: bool,
}

impl RunOptions {
    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}
