//! Token usage accounting.
//!
//! One [`UsageRecord`] per completed exchange plus a cumulative counter
//! spanning the process lifetime. A terminal frame without a usage block is
//! a normal, handled case: the answer is still delivered and the cumulative
//! counter is simply left unchanged.

use log::warn;

use crate::protocol::UsageCounters;

/// Token counts attached to one completed exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageRecord {
    pub total_tokens: u64,
    pub completion_tokens: u64,
    pub prompt_tokens: u64,
}

impl From<UsageCounters> for UsageRecord {
    fn from(counters: UsageCounters) -> Self {
        Self {
            total_tokens: counters.total_tokens,
            completion_tokens: counters.completion_tokens,
            prompt_tokens: counters.prompt_tokens,
        }
    }
}

#[derive(Debug, Default)]
pub struct UsageAccountant {
    last: Option<UsageRecord>,
    cumulative_tokens: u64,
    diagnostic: Option<String>,
}

impl UsageAccountant {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the usage of a completed exchange and bump the cumulative
    /// counter.
    pub fn record(&mut self, usage: UsageRecord) {
        self.cumulative_tokens += usage.total_tokens;
        self.last = Some(usage);
        self.diagnostic = None;
    }

    /// The terminal frame carried no usage block. Non-fatal: the exchange
    /// keeps its answer, the cumulative counter stays put.
    pub fn record_missing(&mut self) {
        warn!("Terminal frame carried no usage block, token accounting skipped for this exchange");
        self.last = None;
        self.diagnostic =
            Some("Token accounting unavailable for this exchange: usage block missing".to_string());
    }

    /// Usage of the most recent completed exchange, if the service
    /// reported one.
    pub fn last(&self) -> Option<&UsageRecord> {
        self.last.as_ref()
    }

    /// Total tokens billed across all exchanges so far. Never reset
    /// automatically.
    pub fn cumulative_tokens(&self) -> u64 {
        self.cumulative_tokens
    }

    pub fn diagnostic(&self) -> Option<&str> {
        self.diagnostic.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(total: u64) -> UsageRecord {
        UsageRecord {
            total_tokens: total,
            completion_tokens: total / 2,
            prompt_tokens: total - total / 2,
        }
    }

    #[test]
    fn accumulates_across_exchanges() {
        let mut accountant = UsageAccountant::new();
        accountant.record(record(100));
        accountant.record(record(150));

        assert_eq!(accountant.cumulative_tokens(), 250);
        assert_eq!(accountant.last().unwrap().total_tokens, 150);
    }

    #[test]
    fn missing_usage_leaves_cumulative_unchanged() {
        let mut accountant = UsageAccountant::new();
        accountant.record(record(100));
        accountant.record_missing();

        assert_eq!(accountant.cumulative_tokens(), 100);
        assert!(accountant.last().is_none());
        assert!(accountant.diagnostic().is_some());
    }

    #[test]
    fn next_record_clears_the_diagnostic() {
        let mut accountant = UsageAccountant::new();
        accountant.record_missing();
        accountant.record(record(10));

        assert!(accountant.diagnostic().is_none());
        assert_eq!(accountant.cumulative_tokens(), 10);
    }
}
