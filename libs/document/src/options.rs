use calcmark_engine::{CollisionPolicy, EvalOptions};
use calcmark_units::DEFAULT_SHADOWABLE;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Options for one document pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessOptions {
    /// Significant digits in rendered results.
    pub precision: u32,
    /// Per-expression evaluation budget; 0 disables it.
    pub timeout_ms: u64,
    /// Maximum parser/evaluator nesting.
    pub max_depth: usize,
    /// Built-in unit names that may also be used as symbol names.
    pub shadowable_units: Vec<String>,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            precision: 6,
            timeout_ms: 2000,
            max_depth: calcmark_engine::MAX_RECURSION_DEPTH,
            shadowable_units: DEFAULT_SHADOWABLE.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ProcessOptions {
    pub fn eval_options(&self) -> EvalOptions {
        EvalOptions {
            timeout: (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms)),
            max_depth: self.max_depth,
        }
    }

    pub fn collision_policy(&self) -> CollisionPolicy {
        CollisionPolicy::new(&self.shadowable_units)
    }
}
