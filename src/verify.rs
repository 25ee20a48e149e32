//! Certificate verification: bind re-derived hashes to a committed block.
//!
//! A verification run answers four questions in order: is the certificate
//! in the ledger at all, is the chain around it intact, and do the data
//! and image hashes the verifier re-derived match what the block commits
//! to. Each outcome is a normal value the caller turns into a user-facing
//! response; "not found" and "found but invalid" are deliberately distinct.

use serde::Serialize;

use crate::block::BlockData;
use crate::ledger::{BlockFault, ChainIntegrity, Ledger};

/// Result of verifying a certificate against the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    /// Block found, chain intact, both hashes match.
    Verified { block_index: u64, block_hash: String },
    /// No block carries this certificate id.
    NotFound,
    /// The chain failed integrity validation; nothing it contains can be
    /// trusted until the break is resolved.
    ChainBroken { index: u64, fault: BlockFault },
    /// Chain intact, but the re-derived hashes disagree with the block.
    Mismatch {
        data_hash_matches: bool,
        image_hash_matches: bool,
    },
}

/// Run the full verification protocol for one certificate.
///
/// `data_hash` and `image_hash` are the hashes the verifier re-derived
/// from the certificate record and artifact it holds, not values read
/// back from the ledger.
pub fn verify_certificate(
    ledger: &Ledger,
    certificate_id: &str,
    data_hash: &str,
    image_hash: &str,
) -> Verdict {
    let Some(block) = ledger.find_by_certificate_id(certificate_id) else {
        return Verdict::NotFound;
    };

    if let ChainIntegrity::Broken { index, fault } = ledger.validate() {
        return Verdict::ChainBroken { index, fault };
    }

    let BlockData::Certificate(ref payload) = block.data else {
        // Unreachable for blocks found by certificate id.
        return Verdict::NotFound;
    };

    let data_hash_matches = payload.data_hash == data_hash;
    let image_hash_matches = payload.image_hash == image_hash;
    if data_hash_matches && image_hash_matches {
        Verdict::Verified {
            block_index: block.index,
            block_hash: block.hash.clone(),
        }
    } else {
        Verdict::Mismatch {
            data_hash_matches,
            image_hash_matches,
        }
    }
}
