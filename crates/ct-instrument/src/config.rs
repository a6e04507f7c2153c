use serde::{Deserialize, Serialize};

use crate::PASS_NAME;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstrumentConfig {
    /// Symbol of the hook every instrumented cast calls.
    pub hook_name: String,
}

impl Default for InstrumentConfig {
    fn default() -> Self {
        Self {
            hook_name: PASS_NAME.to_string(),
        }
    }
}

impl InstrumentConfig {
    pub fn with_hook_name(mut self, hook_name: impl Into<String>) -> Self {
        self.hook_name = hook_name.into();
        self
    }
}
