use crate::domain::ports::RemainingTime;
use std::time::{Duration, Instant};

/// Remaining time derived from the Lambda context deadline
/// (milliseconds since the Unix epoch).
#[derive(Debug, Clone, Copy)]
pub struct LambdaDeadline {
    deadline_ms: u64,
}

impl LambdaDeadline {
    pub fn new(deadline_ms: u64) -> Self {
        Self { deadline_ms }
    }

    fn remaining_at(&self, now_ms: i64) -> u64 {
        let now_ms = u64::try_from(now_ms).unwrap_or(0);
        self.deadline_ms.saturating_sub(now_ms)
    }
}

impl RemainingTime for LambdaDeadline {
    fn remaining_millis(&self) -> u64 {
        self.remaining_at(chrono::Utc::now().timestamp_millis())
    }
}

/// Fixed budget counted down on the monotonic clock; simulates the
/// function timeout for local runs.
#[derive(Debug, Clone, Copy)]
pub struct InvocationBudget {
    started: Instant,
    budget: Duration,
}

impl InvocationBudget {
    pub fn start(budget: Duration) -> Self {
        Self {
            started: Instant::now(),
            budget,
        }
    }
}

impl RemainingTime for InvocationBudget {
    fn remaining_millis(&self) -> u64 {
        let left = self.budget.saturating_sub(self.started.elapsed());
        u64::try_from(left.as_millis()).unwrap_or(u64::MAX)
    }
}
