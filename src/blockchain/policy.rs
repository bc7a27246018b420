use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use log::{info, warn};
use thiserror::Error;
use tokio::task::JoinHandle;

use super::chain::Ledger;

/// Errors that can occur while parsing a seal policy
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("Unknown seal policy: {0} (expected immediate, threshold:N or interval:SECS)")]
    UnknownPolicy(String),

    #[error("Invalid seal policy parameter: {0}")]
    InvalidParameter(String),
}

/// Decides when pending votes get sealed into a block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SealPolicy {
    /// Seal after every submitted vote
    #[default]
    Immediate,

    /// Seal once at least this many votes are pending
    Threshold(usize),

    /// Seal on a background timer; vote submission never seals
    Interval(Duration),
}

impl SealPolicy {
    /// Whether a submission that left `pending` votes in the pool should seal
    pub fn seals_after_vote(&self, pending: usize) -> bool {
        match self {
            SealPolicy::Immediate => true,
            SealPolicy::Threshold(threshold) => pending >= *threshold,
            SealPolicy::Interval(_) => false,
        }
    }
}

impl fmt::Display for SealPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SealPolicy::Immediate => write!(f, "immediate"),
            SealPolicy::Threshold(threshold) => write!(f, "threshold:{}", threshold),
            SealPolicy::Interval(period) => write!(f, "interval:{}", period.as_secs()),
        }
    }
}

impl FromStr for SealPolicy {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (kind, parameter) = match s.split_once(':') {
            Some((kind, parameter)) => (kind, Some(parameter)),
            None => (s, None),
        };

        match (kind.to_ascii_lowercase().as_str(), parameter) {
            ("immediate", None) => Ok(SealPolicy::Immediate),
            ("threshold", Some(raw)) => match raw.parse::<usize>() {
                Ok(threshold) if threshold > 0 => Ok(SealPolicy::Threshold(threshold)),
                _ => Err(PolicyError::InvalidParameter(format!(
                    "threshold must be a positive integer, got {:?}",
                    raw
                ))),
            },
            ("interval", Some(raw)) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Ok(SealPolicy::Interval(Duration::from_secs(secs))),
                _ => Err(PolicyError::InvalidParameter(format!(
                    "interval must be a positive number of seconds, got {:?}",
                    raw
                ))),
            },
            _ => Err(PolicyError::UnknownPolicy(s.to_string())),
        }
    }
}

/// Spawns the background task behind [`SealPolicy::Interval`]
///
/// Every `period` the task seals whatever is pending. Ticks that find an
/// empty pool are skipped so that the chain does not fill with empty blocks.
pub fn spawn_interval_sealer(ledger: Ledger, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;

            if ledger.pending_count() == 0 {
                continue;
            }

            match ledger.seal_current_block().await {
                Ok(block) => info!(
                    "Interval sealer sealed block {} with {} votes",
                    block.index,
                    block.votes.len()
                ),
                Err(err) => warn!("Interval sealer failed to seal block: {}", err),
            }
        }
    })
}
