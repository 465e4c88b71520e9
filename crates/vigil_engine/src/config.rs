//! Engine configuration.

use serde::{Deserialize, Serialize};

/// Knobs for the k-induction step engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindConfig {
    /// Stop (with the remaining properties pending) once `k` exceeds this.
    pub max_k: Option<u64>,
    /// Apply path compression to step counterexamples.
    pub path_compression: bool,
    /// Idle sleep between confirmation polls, in milliseconds.
    pub confirm_sleep_ms: u64,
    /// Give up confirming after this many polls.
    pub max_confirm_polls: Option<u64>,
}

impl Default for KindConfig {
    fn default() -> Self {
        KindConfig {
            max_k: None,
            path_compression: true,
            confirm_sleep_ms: 10,
            max_confirm_polls: None,
        }
    }
}

/// Knobs for the IC3IA engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ic3Config {
    /// Abort with an error once the frame sequence exceeds this length.
    pub max_frames: Option<usize>,
    /// Generalize blocking clauses by literal dropping.
    pub generalize: bool,
}

impl Default for Ic3Config {
    fn default() -> Self {
        Ic3Config {
            max_frames: None,
            generalize: true,
        }
    }
}
