use std::str::FromStr;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Throughput policy applied to a single dispatch call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchPolicy {
    /// One message at a time with a jittered pause between attempts.
    /// Stops early once `failure_threshold` consecutive sends have failed.
    Sequential {
        delay: Duration,
        jitter: Duration,
        failure_threshold: u32,
    },
    /// Groups of `batch_size` sent concurrently, with a fixed pause between
    /// groups. Never stops early.
    Batched { batch_size: usize, delay: Duration },
}

impl DispatchPolicy {
    pub fn kind(&self) -> DispatchPolicyKind {
        match self {
            Self::Sequential { .. } => DispatchPolicyKind::Sequential,
            Self::Batched { .. } => DispatchPolicyKind::Batched,
        }
    }
}

pub(crate) fn jittered(base: Duration, jitter: Duration) -> Duration {
    let jitter_ms = jitter.as_millis() as u64;
    if jitter_ms == 0 {
        return base;
    }
    base + Duration::from_millis(rand::thread_rng().gen_range(0..jitter_ms))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchPolicyKind {
    Sequential,
    Batched,
}

impl FromStr for DispatchPolicyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sequential" => Ok(Self::Sequential),
            "batched" | "batch" => Ok(Self::Batched),
            other => Err(format!("unknown dispatch policy: {other}")),
        }
    }
}
