// Blockchain module
//
// This module contains the core voting ledger implementation including:
// - Vote and block structures with canonical content hashing
// - The ledger (chain plus pending-vote pool)
// - Proof of work algorithm
// - Seal policies

pub mod block;
pub mod chain;
pub mod policy;
pub mod pow;

// Re-export main components for easier access
pub use block::{Block, Vote};
pub use chain::{Ledger, LedgerConfig};
pub use policy::SealPolicy;
