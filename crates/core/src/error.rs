use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Query,
    Persist,
    Notify,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Query => "query",
            Stage::Persist => "persist",
            Stage::Notify => "notify",
        }
    }
}

/// A failed pipeline stage. Query and persist failures abort the run; notify failures are
/// recorded on the run instead of being returned.
#[derive(Debug, Clone)]
pub struct StageError {
    pub stage: Stage,
    pub detail: String,
}

impl StageError {
    pub fn new(stage: Stage, err: &anyhow::Error) -> Self {
        Self {
            stage,
            detail: format!("{err:#}"),
        }
    }
}

impl fmt::Display for StageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cost report failed (stage={}): {}",
            self.stage.as_str(),
            self.detail
        )
    }
}

impl std::error::Error for StageError {}
