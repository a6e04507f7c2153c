use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Optimization level of the host pipeline. Only O0 versus "anything above"
/// matters for pass scheduling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum OptimizationLevel {
    #[default]
    O0,
    O1,
    O2,
    O3,
}

impl OptimizationLevel {
    pub fn is_disabled(self) -> bool {
        self == OptimizationLevel::O0
    }
}

impl FromStr for OptimizationLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim_start_matches(['O', 'o']) {
            "0" => Ok(OptimizationLevel::O0),
            "1" => Ok(OptimizationLevel::O1),
            "2" => Ok(OptimizationLevel::O2),
            "3" => Ok(OptimizationLevel::O3),
            other => Err(format!("invalid optimization level '{}', expected 0-3", other)),
        }
    }
}

impl fmt::Display for OptimizationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self {
            OptimizationLevel::O0 => 0,
            OptimizationLevel::O1 => 1,
            OptimizationLevel::O2 => 2,
            OptimizationLevel::O3 => 3,
        };
        write!(f, "O{}", level)
    }
}

#[derive(Debug, Clone, Default)]
pub struct DebugOptions {
    pub verbose: bool,
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub opt_level: OptimizationLevel,
    /// Re-verify the module after every pass instead of only at the end.
    pub verify_each: bool,
    pub debug: DebugOptions,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            opt_level: OptimizationLevel::O0,
            verify_each: true,
            debug: DebugOptions::default(),
        }
    }
}

impl PipelineOptions {
    pub fn with_opt_level(mut self, opt_level: OptimizationLevel) -> Self {
        self.opt_level = opt_level;
        self
    }

    pub fn with_verify_each(mut self, verify_each: bool) -> Self {
        self.verify_each = verify_each;
        self
    }
}
