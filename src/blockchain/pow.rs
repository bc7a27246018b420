use sha2::{Digest, Sha256};

/// Leading zero hex digits a proof hash must carry by default
pub const DEFAULT_DIFFICULTY: u8 = 4;

/// Largest meaningful difficulty: every hex digit of a SHA-256 digest
pub const MAX_DIFFICULTY: u8 = 64;

/// Proof-of-work rules for sealing blocks
///
/// A proof is acceptable when SHA-256 over the decimal rendering of the
/// previous proof followed by the candidate (no separator) starts with
/// `difficulty` zero hex digits. Holds no state beyond the difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProofOfWork {
    difficulty: u8,
}

impl Default for ProofOfWork {
    fn default() -> Self {
        ProofOfWork::new(DEFAULT_DIFFICULTY)
    }
}

impl ProofOfWork {
    /// Creates proof-of-work rules, capping the difficulty at [`MAX_DIFFICULTY`]
    pub fn new(difficulty: u8) -> Self {
        ProofOfWork {
            difficulty: difficulty.min(MAX_DIFFICULTY),
        }
    }

    pub fn difficulty(&self) -> u8 {
        self.difficulty
    }

    /// Checks whether `proof` is acceptable after `last_proof`
    ///
    /// # Arguments
    ///
    /// * `last_proof` - The proof of the previous block
    /// * `proof` - The candidate proof
    ///
    /// # Returns
    ///
    /// true if the guess hash has the required run of leading zero hex digits
    pub fn is_valid_proof(&self, last_proof: u64, proof: u64) -> bool {
        let guess = format!("{}{}", last_proof, proof);
        let digest = Sha256::digest(guess.as_bytes());

        has_leading_zero_digits(&digest, self.difficulty as usize)
    }

    /// Searches for the first acceptable proof after `last_proof`
    ///
    /// Candidates are tried in ascending order from 0. This is CPU bound and
    /// has no upper limit, so callers on an async executor must move it to a
    /// blocking worker.
    pub fn find_proof(&self, last_proof: u64) -> u64 {
        let mut proof = 0;

        while !self.is_valid_proof(last_proof, proof) {
            proof += 1;
        }

        proof
    }
}

/// Counts zero nibbles instead of hex-encoding the digest.
fn has_leading_zero_digits(digest: &[u8], digits: usize) -> bool {
    let whole_bytes = digits / 2;

    digest[..whole_bytes].iter().all(|byte| *byte == 0)
        && (digits % 2 == 0 || digest[whole_bytes] >> 4 == 0)
}
