use actix_web::{web, HttpResponse, Responder};
use log::error;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::blockchain::{Block, Ledger, Vote};

/// Data structure for the ledger state
pub type LedgerData = web::Data<Ledger>;

/// Response for the chain endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ChainResponse {
    /// The length of the chain
    pub length: usize,

    /// The blocks in the chain
    pub chain: Vec<Block>,

    /// Whether the chain is valid
    pub is_valid: bool,

    /// Leading zero hex digits each proof must produce
    pub difficulty: u8,
}

/// Request for the vote endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct VoteRequest {
    /// The voter's identifier
    pub voter_id: String,

    /// The voter's display name
    pub voter_name: String,

    /// The chosen candidate
    pub candidate: String,
}

impl VoteRequest {
    /// Names of the fields that are missing or blank
    pub fn blank_fields(&self) -> Vec<&'static str> {
        [
            ("voter_id", &self.voter_id),
            ("voter_name", &self.voter_name),
            ("candidate", &self.candidate),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

/// Response for the vote endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct VoteResponse {
    /// The message
    pub message: String,

    /// The index of the block that was forming when the vote arrived (advisory)
    pub block_index: u64,

    /// The block sealed because of this vote, if the seal policy sealed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sealed_block: Option<Block>,
}

/// Response for the seal endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct SealResponse {
    /// The message
    pub message: String,

    /// The newly sealed block
    pub block: Block,

    /// Content hash of the newly sealed block
    pub hash: String,
}

/// Get the full chain
///
/// Returns every sealed block and the chain's validity status
#[utoipa::path(
    get,
    path = "/api/v1/chain",
    responses(
        (status = 200, description = "Chain retrieved successfully", body = ChainResponse)
    )
)]
pub async fn get_chain(ledger: LedgerData) -> impl Responder {
    let chain = ledger.get_chain();
    let is_valid = ledger.is_valid();

    let response = ChainResponse {
        length: chain.len(),
        chain,
        is_valid,
        difficulty: ledger.proof_of_work().difficulty(),
    };

    HttpResponse::Ok().json(response)
}

/// Get all pending votes
///
/// Returns all votes waiting to be sealed into a block
#[utoipa::path(
    get,
    path = "/api/v1/votes/pending",
    responses(
        (status = 200, description = "Pending votes retrieved successfully", body = Vec<Vote>)
    )
)]
pub async fn get_pending_votes(ledger: LedgerData) -> impl Responder {
    let votes: Vec<Vote> = ledger.get_pending_votes();
    HttpResponse::Ok().json(votes)
}

/// Cast a vote
///
/// Adds the vote to the pending pool and applies the seal policy
#[utoipa::path(
    post,
    path = "/api/v1/votes/new",
    request_body = VoteRequest,
    responses(
        (status = 201, description = "Vote recorded", body = VoteResponse),
        (status = 400, description = "Missing or blank vote fields"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn new_vote(ledger: LedgerData, vote_req: web::Json<VoteRequest>) -> impl Responder {
    let blank = vote_req.blank_fields();
    if !blank.is_empty() {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "error": format!("Missing required fields: {}", blank.join(", "))
        }));
    }

    let vote_req = vote_req.into_inner();
    match ledger
        .cast_vote(vote_req.voter_id, vote_req.voter_name, vote_req.candidate)
        .await
    {
        Ok(receipt) => {
            let message = match &receipt.sealed_block {
                Some(block) => format!("Vote sealed into Block {}", block.index),
                None => "Vote will be added to Block".to_string(),
            };

            HttpResponse::Created().json(VoteResponse {
                message,
                block_index: receipt.block_index,
                sealed_block: receipt.sealed_block,
            })
        }
        Err(err) => {
            error!("Failed to record vote: {}", err);
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": format!("Failed to record vote: {}", err)
            }))
        }
    }
}

/// Seal the current block
///
/// Runs the proof-of-work search and seals all pending votes into a new block
#[utoipa::path(
    post,
    path = "/api/v1/seal",
    responses(
        (status = 200, description = "Block sealed successfully", body = SealResponse),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn seal_block(ledger: LedgerData) -> impl Responder {
    let sealed = ledger.seal_current_block().await.and_then(|block| {
        let hash = block.content_hash()?;
        Ok((block, hash))
    });

    match sealed {
        Ok((block, hash)) => HttpResponse::Ok().json(SealResponse {
            message: "New Block Sealed".to_string(),
            block,
            hash,
        }),
        Err(err) => {
            error!("Failed to seal block: {}", err);
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": format!("Failed to seal block: {}", err)
            }))
        }
    }
}

/// Check if the chain is valid
///
/// Walks the whole chain verifying hash links and proofs
#[utoipa::path(
    get,
    path = "/api/v1/validate",
    responses(
        (status = 200, description = "Chain validation status", body = bool)
    )
)]
pub async fn validate_chain(ledger: LedgerData) -> impl Responder {
    let is_valid = ledger.is_valid();
    HttpResponse::Ok().json(is_valid)
}
