use std::fmt;

// ---------------------------------------------------------------------------
// Stage – where a pipeline run is
// ---------------------------------------------------------------------------

/// Stages of one pipeline run. Runs move strictly forward through the
/// working stages; `Failed` is reachable from any non-terminal stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Idle,
    Ingesting,
    Cleaning,
    FeaturePreparing,
    Training,
    Predicting,
    Exporting,
    Done,
    Failed,
}

impl Stage {
    /// The stage that follows on success, if any.
    pub fn next(self) -> Option<Stage> {
        use Stage::*;
        match self {
            Idle => Some(Ingesting),
            Ingesting => Some(Cleaning),
            Cleaning => Some(FeaturePreparing),
            FeaturePreparing => Some(Training),
            Training => Some(Predicting),
            Predicting => Some(Exporting),
            Exporting => Some(Done),
            Done | Failed => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Done | Stage::Failed)
    }

    pub fn name(self) -> &'static str {
        match self {
            Stage::Idle => "idle",
            Stage::Ingesting => "ingesting",
            Stage::Cleaning => "cleaning",
            Stage::FeaturePreparing => "feature preparation",
            Stage::Training => "training",
            Stage::Predicting => "predicting",
            Stage::Exporting => "exporting",
            Stage::Done => "done",
            Stage::Failed => "failed",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// RunState – the run's position, independent of the work itself
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunState {
    current: Stage,
    failed_in: Option<Stage>,
}

impl Default for RunState {
    fn default() -> Self {
        Self {
            current: Stage::Idle,
            failed_in: None,
        }
    }
}

impl RunState {
    pub fn current(&self) -> Stage {
        self.current
    }

    /// The stage a failed run was in when it failed.
    pub fn failed_in(&self) -> Option<Stage> {
        self.failed_in
    }

    /// Move to the successor stage. Returns the `(from, to)` transition, or
    /// `None` when already terminal.
    pub fn advance(&mut self) -> Option<(Stage, Stage)> {
        let from = self.current;
        let to = from.next()?;
        self.current = to;
        Some((from, to))
    }

    /// Move to `Failed`, remembering where. No-op on a terminal stage.
    pub fn fail(&mut self) -> Option<(Stage, Stage)> {
        let from = self.current;
        if from.is_terminal() {
            return None;
        }
        self.failed_in = Some(from);
        self.current = Stage::Failed;
        Some((from, Stage::Failed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_walks_the_linear_order() {
        let mut state = RunState::default();
        let mut seen = vec![state.current()];
        while let Some((_, to)) = state.advance() {
            seen.push(to);
        }
        assert_eq!(
            seen,
            vec![
                Stage::Idle,
                Stage::Ingesting,
                Stage::Cleaning,
                Stage::FeaturePreparing,
                Stage::Training,
                Stage::Predicting,
                Stage::Exporting,
                Stage::Done,
            ]
        );
        assert_eq!(state.fail(), None);
    }

    #[test]
    fn fail_records_origin_and_is_terminal() {
        let mut state = RunState::default();
        state.advance();
        state.advance();
        assert_eq!(state.fail(), Some((Stage::Cleaning, Stage::Failed)));
        assert_eq!(state.failed_in(), Some(Stage::Cleaning));
        assert_eq!(state.advance(), None);
        assert_eq!(state.fail(), None);
    }
}
