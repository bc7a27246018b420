use clap::Parser;

use crate::blockchain::chain::{GENESIS_PREVIOUS_HASH, GENESIS_PROOF};
use crate::blockchain::pow::{DEFAULT_DIFFICULTY, MAX_DIFFICULTY};
use crate::blockchain::{LedgerConfig, SealPolicy};

/// Command line and environment configuration
#[derive(Debug, Parser)]
#[command(name = "vote-ledger", version, about = "Blockchain-backed voting ledger")]
pub struct Cli {
    /// Address the HTTP server binds to (host:port)
    #[arg(long, env = "VOTE_LEDGER_BIND", default_value = "0.0.0.0:5000")]
    pub bind: String,

    /// Leading zero hex digits required of a proof hash
    #[arg(
        long,
        env = "VOTE_LEDGER_DIFFICULTY",
        default_value_t = DEFAULT_DIFFICULTY,
        value_parser = clap::value_parser!(u8).range(1..=MAX_DIFFICULTY as i64)
    )]
    pub difficulty: u8,

    /// Proof recorded in the genesis block
    #[arg(long, env = "VOTE_LEDGER_GENESIS_PROOF", default_value_t = GENESIS_PROOF)]
    pub genesis_proof: u64,

    /// Previous-hash sentinel recorded in the genesis block
    #[arg(long, env = "VOTE_LEDGER_GENESIS_PREVIOUS_HASH", default_value = GENESIS_PREVIOUS_HASH)]
    pub genesis_previous_hash: String,

    /// When to seal votes: immediate, threshold:N or interval:SECS
    #[arg(long, env = "VOTE_LEDGER_SEAL_POLICY", default_value = "immediate")]
    pub seal_policy: SealPolicy,
}

impl Cli {
    pub fn ledger_config(&self) -> LedgerConfig {
        LedgerConfig {
            difficulty: self.difficulty,
            genesis_proof: self.genesis_proof,
            genesis_previous_hash: self.genesis_previous_hash.clone(),
            seal_policy: self.seal_policy,
        }
    }
}
