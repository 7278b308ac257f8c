use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::{self, Display};

/// Why a worker landed in the `others` bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unexpected {
    Status(u16),
    Error(String),
    Panicked(String),
    TimedOut,
}

impl Display for Unexpected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unexpected::Status(status) => write!(f, "unexpected response: {status}"),
            Unexpected::Error(message) => write!(f, "call error: {message}"),
            Unexpected::Panicked(message) => write!(f, "worker panicked: {message}"),
            Unexpected::TimedOut => write!(f, "worker did not finish before the load deadline"),
        }
    }
}

/// Classified result of one worker's single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOutcome {
    Success(u16),
    ExpectedFailure(u16),
    Unexpected(Unexpected),
}

impl RequestOutcome {
    pub fn classify(status: u16, expected_success: u16, expected_failure: u16) -> Self {
        if status == expected_success {
            RequestOutcome::Success(status)
        } else if status == expected_failure {
            RequestOutcome::ExpectedFailure(status)
        } else {
            RequestOutcome::Unexpected(Unexpected::Status(status))
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            RequestOutcome::Success(status)
            | RequestOutcome::ExpectedFailure(status)
            | RequestOutcome::Unexpected(Unexpected::Status(status)) => Some(*status),
            RequestOutcome::Unexpected(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadResult {
    pub successes: u64,
    pub failures: u64,
    pub others: u64,
}

impl LoadResult {
    pub fn record(&mut self, outcome: &RequestOutcome) {
        match outcome {
            RequestOutcome::Success(_) => self.successes += 1,
            RequestOutcome::ExpectedFailure(_) => self.failures += 1,
            RequestOutcome::Unexpected(_) => self.others += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.successes + self.failures + self.others
    }

    pub fn as_tuple(&self) -> (u64, u64, u64) {
        (self.successes, self.failures, self.others)
    }
}

impl Display for LoadResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} successful | {} failed | {} other",
            self.successes, self.failures, self.others
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LatencySummary {
    pub samples: u64,
    pub min_ms: f64,
    pub avg_ms: f64,
    pub max_ms: f64,
    pub p50_ms: f64,
    pub p90_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadReport {
    pub workers: u64,
    pub result: LoadResult,
    pub status_counts: BTreeMap<u16, u64>,
    pub latency: LatencySummary,
    pub elapsed_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_prefers_success_code() {
        assert_eq!(RequestOutcome::classify(200, 200, 503), RequestOutcome::Success(200));
        assert_eq!(
            RequestOutcome::classify(503, 200, 503),
            RequestOutcome::ExpectedFailure(503)
        );
        assert_eq!(
            RequestOutcome::classify(500, 200, 503),
            RequestOutcome::Unexpected(Unexpected::Status(500))
        );
    }

    #[test]
    fn record_keeps_total_in_step() {
        let mut result = LoadResult::default();
        for outcome in [
            RequestOutcome::Success(200),
            RequestOutcome::ExpectedFailure(503),
            RequestOutcome::Unexpected(Unexpected::TimedOut),
            RequestOutcome::Unexpected(Unexpected::Error("reset".into())),
        ] {
            result.record(&outcome);
        }
        assert_eq!(result.as_tuple(), (1, 1, 2));
        assert_eq!(result.total(), 4);
        assert_eq!(result.to_string(), "1 successful | 1 failed | 2 other");
    }
}
