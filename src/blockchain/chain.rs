use std::sync::Arc;

use log::{debug, error, info, warn};
use parking_lot::Mutex;
use thiserror::Error;

use super::block::{Block, Vote};
use super::policy::SealPolicy;
use super::pow::{ProofOfWork, DEFAULT_DIFFICULTY};

/// Proof recorded in the genesis block
pub const GENESIS_PROOF: u64 = 100;

/// Previous-hash sentinel recorded in the genesis block
pub const GENESIS_PREVIOUS_HASH: &str = "1";

/// Errors that can occur during ledger operations
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Encoding error: {0}")]
    EncodingError(#[from] serde_json::Error),

    #[error("Proof search worker failed: {0}")]
    WorkerError(String),

    #[error("Chain tip moved while sealing: expected {expected} blocks, found {found}")]
    StaleTip { expected: u64, found: u64 },

    #[error("Invalid genesis block: {0}")]
    InvalidGenesis(String),

    #[error("Block at position {position} has index {found}, expected {expected}")]
    IndexMismatch {
        position: usize,
        expected: u64,
        found: u64,
    },

    #[error("Block {index} does not link to the hash of its predecessor")]
    BrokenLink { index: u64 },

    #[error("Block {index} carries an invalid proof of work")]
    InvalidProof { index: u64 },
}

/// Tunables fixed at ledger creation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Leading zero hex digits required of a proof hash
    pub difficulty: u8,

    /// Proof recorded in the genesis block
    pub genesis_proof: u64,

    /// Previous-hash sentinel recorded in the genesis block
    pub genesis_previous_hash: String,

    /// When submitted votes get sealed
    pub seal_policy: SealPolicy,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig {
            difficulty: DEFAULT_DIFFICULTY,
            genesis_proof: GENESIS_PROOF,
            genesis_previous_hash: GENESIS_PREVIOUS_HASH.to_string(),
            seal_policy: SealPolicy::default(),
        }
    }
}

/// Outcome of casting a vote through the ledger's seal policy
#[derive(Debug, Clone)]
pub struct VoteReceipt {
    /// Advisory index of the block that was forming when the vote arrived
    pub block_index: u64,

    /// The block sealed as a consequence of this vote, if the policy sealed
    pub sealed_block: Option<Block>,
}

/// Chain and pending pool, guarded together so that capturing the pool
/// and appending a block is one step to every other caller.
#[derive(Debug)]
struct LedgerState {
    chain: Vec<Block>,
    pending_votes: Vec<Vote>,
}

impl LedgerState {
    fn last_block(&self) -> &Block {
        // Genesis is pushed at construction and blocks are never removed.
        &self.chain[self.chain.len() - 1]
    }

    fn append_block(&mut self, votes: Vec<Vote>, proof: u64, previous_hash: String) -> Block {
        let block = Block::new(self.chain.len() as u64 + 1, votes, proof, previous_hash);
        self.chain.push(block.clone());
        block
    }
}

/// The voting ledger
///
/// Cloning is cheap and every clone shares the same chain.
#[derive(Debug, Clone)]
pub struct Ledger {
    /// Sealed blocks and votes awaiting the next block
    state: Arc<Mutex<LedgerState>>,

    /// Held for the whole of a seal so that only one is ever in flight
    seal_lock: Arc<tokio::sync::Mutex<()>>,

    /// Proof-of-work rules
    pow: ProofOfWork,

    /// When submitted votes get sealed
    seal_policy: SealPolicy,

    /// Sentinel the genesis block links to
    genesis_previous_hash: String,
}

impl Default for Ledger {
    fn default() -> Self {
        Ledger::new(LedgerConfig::default())
    }
}

impl Ledger {
    /// Creates a new ledger holding only the genesis block
    ///
    /// # Arguments
    ///
    /// * `config` - Difficulty, genesis constants and seal policy
    ///
    /// # Returns
    ///
    /// A new Ledger instance
    pub fn new(config: LedgerConfig) -> Self {
        let mut state = LedgerState {
            chain: Vec::new(),
            pending_votes: Vec::new(),
        };
        let genesis = state.append_block(
            Vec::new(),
            config.genesis_proof,
            config.genesis_previous_hash.clone(),
        );

        info!(
            "Created ledger with genesis block (proof {}, difficulty {}, seal policy {})",
            genesis.proof, config.difficulty, config.seal_policy
        );

        Ledger {
            state: Arc::new(Mutex::new(state)),
            seal_lock: Arc::new(tokio::sync::Mutex::new(())),
            pow: ProofOfWork::new(config.difficulty),
            seal_policy: config.seal_policy,
            genesis_previous_hash: config.genesis_previous_hash,
        }
    }

    /// Gets the proof-of-work rules blocks are sealed under
    pub fn proof_of_work(&self) -> ProofOfWork {
        self.pow
    }

    /// Gets the policy deciding when cast votes are sealed
    pub fn seal_policy(&self) -> SealPolicy {
        self.seal_policy
    }

    /// Gets the last block in the chain
    pub fn last_block(&self) -> Block {
        self.state.lock().last_block().clone()
    }

    /// Adds a vote to the pending pool
    ///
    /// Field contents are not validated; empty strings are accepted.
    ///
    /// # Returns
    ///
    /// The index of the block currently forming. This is advisory: a seal
    /// already in progress, or other votes arriving first, can place the
    /// vote in a later block.
    pub fn add_vote(
        &self,
        voter_id: impl Into<String>,
        voter_name: impl Into<String>,
        candidate: impl Into<String>,
    ) -> u64 {
        let vote = Vote::new(voter_id, voter_name, candidate);

        let mut state = self.state.lock();
        state.pending_votes.push(vote);
        let next_index = state.last_block().index + 1;

        debug!(
            "Accepted vote for block {} ({} pending)",
            next_index,
            state.pending_votes.len()
        );

        next_index
    }

    /// Captures the pending pool into a new block and appends it
    ///
    /// The caller supplies an already computed proof and previous hash; no
    /// checks are made against them. [`Ledger::seal_current_block`] is the
    /// path that derives both.
    ///
    /// # Arguments
    ///
    /// * `proof` - The proof of work for the new block
    /// * `previous_hash` - The content hash of the current last block
    ///
    /// # Returns
    ///
    /// The newly appended block
    pub fn create_block(&self, proof: u64, previous_hash: String) -> Block {
        let mut state = self.state.lock();
        let votes = std::mem::take(&mut state.pending_votes);
        state.append_block(votes, proof, previous_hash)
    }

    /// Seals the pending pool into a new block
    ///
    /// The pool is frozen when the proof search starts: the votes pending at
    /// that moment go into the block, votes that arrive while the search
    /// runs stay pending for the following one. Frozen votes remain visible
    /// in the pool until the block is appended, and dropping the returned
    /// future before then leaves the pool untouched. The search itself runs
    /// on a blocking worker so the caller's executor keeps serving requests.
    /// Concurrent calls are serialized.
    pub async fn seal_current_block(&self) -> Result<Block, LedgerError> {
        let _sealing = self.seal_lock.lock().await;

        let (last_block, frozen) = {
            let state = self.state.lock();
            (state.last_block().clone(), state.pending_votes.len())
        };
        let previous_hash = last_block.content_hash()?;

        debug!(
            "Sealing block {} with {} votes",
            last_block.index + 1,
            frozen
        );

        let pow = self.pow;
        let last_proof = last_block.proof;
        let proof = match tokio::task::spawn_blocking(move || pow.find_proof(last_proof)).await {
            Ok(proof) => proof,
            Err(err) => {
                warn!("Proof search for block {} failed: {}", last_block.index + 1, err);
                return Err(LedgerError::WorkerError(err.to_string()));
            }
        };

        let mut state = self.state.lock();
        let found = state.last_block().index;
        if found != last_block.index {
            return Err(LedgerError::StaleTip {
                expected: last_block.index,
                found,
            });
        }

        let frozen = frozen.min(state.pending_votes.len());
        let votes: Vec<Vote> = state.pending_votes.drain(..frozen).collect();
        let block = state.append_block(votes, proof, previous_hash);
        info!(
            "Sealed block {} with {} votes (proof {})",
            block.index,
            block.votes.len(),
            block.proof
        );

        Ok(block)
    }

    /// Adds a vote and applies the seal policy
    ///
    /// # Returns
    ///
    /// The advisory block index and, when the policy sealed, the new block
    pub async fn cast_vote(
        &self,
        voter_id: impl Into<String>,
        voter_name: impl Into<String>,
        candidate: impl Into<String>,
    ) -> Result<VoteReceipt, LedgerError> {
        let block_index = self.add_vote(voter_id, voter_name, candidate);

        let sealed_block = if self.seal_policy.seals_after_vote(self.pending_count()) {
            Some(self.seal_current_block().await?)
        } else {
            None
        };

        Ok(VoteReceipt {
            block_index,
            sealed_block,
        })
    }

    /// Gets the entire chain
    ///
    /// # Returns
    ///
    /// A snapshot of every sealed block
    pub fn get_chain(&self) -> Vec<Block> {
        self.state.lock().chain.clone()
    }

    /// Gets all votes waiting for the next block
    pub fn get_pending_votes(&self) -> Vec<Vote> {
        self.state.lock().pending_votes.clone()
    }

    /// Gets the number of votes waiting for the next block
    pub fn pending_count(&self) -> usize {
        self.state.lock().pending_votes.len()
    }

    /// Walks the chain checking the genesis block, index continuity,
    /// hash linkage and proof validity
    ///
    /// # Returns
    ///
    /// The first violation found, if any
    pub fn verify_chain(&self) -> Result<(), LedgerError> {
        let chain = self.get_chain();

        let result = verify_blocks(&chain, self.pow, &self.genesis_previous_hash);
        if let Err(err) = &result {
            error!("Ledger integrity violation: {}", err);
        }

        result
    }

    /// Validates the chain
    ///
    /// # Returns
    ///
    /// true if the chain is intact, false otherwise
    pub fn is_valid(&self) -> bool {
        self.verify_chain().is_ok()
    }
}

/// Checks a sequence of blocks for the ledger invariants
pub fn verify_blocks(
    chain: &[Block],
    pow: ProofOfWork,
    genesis_previous_hash: &str,
) -> Result<(), LedgerError> {
    let genesis = chain
        .first()
        .ok_or_else(|| LedgerError::InvalidGenesis("chain is empty".to_string()))?;

    if genesis.index != 1 {
        return Err(LedgerError::InvalidGenesis(format!(
            "index is {}, expected 1",
            genesis.index
        )));
    }

    if genesis.previous_hash != genesis_previous_hash {
        return Err(LedgerError::InvalidGenesis(format!(
            "previous hash is {:?}, expected {:?}",
            genesis.previous_hash, genesis_previous_hash
        )));
    }

    for (position, pair) in chain.windows(2).enumerate() {
        let (previous_block, current_block) = (&pair[0], &pair[1]);
        let position = position + 1;

        if current_block.index != position as u64 + 1 {
            return Err(LedgerError::IndexMismatch {
                position,
                expected: position as u64 + 1,
                found: current_block.index,
            });
        }

        if current_block.previous_hash != previous_block.content_hash()? {
            return Err(LedgerError::BrokenLink {
                index: current_block.index,
            });
        }

        if !pow.is_valid_proof(previous_block.proof, current_block.proof) {
            return Err(LedgerError::InvalidProof {
                index: current_block.index,
            });
        }
    }

    Ok(())
}
