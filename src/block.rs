//! Block: one immutable, hash-linked record in the certificate ledger.

use serde::{Deserialize, Serialize};

use crate::hashing::hash_concat;

/// `previous_hash` sentinel carried by the genesis block.
pub const GENESIS_PREVIOUS_HASH: &str = "0";

/// Proof-of-authority difficulty. Pinned at zero: a single trusted issuer
/// appends blocks, so sealing never searches over nonce values. The nonce
/// stays in the hash input so the block format would survive a nonzero
/// difficulty.
pub const DIFFICULTY: u32 = 0;

/// Identifying data a certificate block commits to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificatePayload {
    /// Externally unique certificate identifier (uniqueness is enforced by
    /// the issuing workflow's database, not the ledger).
    pub certificate_id: String,
    /// SHA-256 hex of the certificate's structured data.
    pub data_hash: String,
    /// SHA-256 hex of the certificate's image/file bytes.
    pub image_hash: String,
    /// Issuing organization's identifying address.
    pub issuer_address: String,
    /// Unix seconds at which the certificate was issued.
    pub issued_at: i64,
}

/// Payload of a block: the fixed genesis sentinel or a certificate record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockData {
    Genesis,
    Certificate(CertificatePayload),
}

impl BlockData {
    /// Certificate id carried by this payload, if any.
    pub fn certificate_id(&self) -> Option<&str> {
        match self {
            BlockData::Genesis => None,
            BlockData::Certificate(p) => Some(&p.certificate_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// 0-indexed position in the chain; 0 is genesis.
    pub index: u64,
    /// Unix seconds captured at construction.
    pub timestamp: i64,
    pub data: BlockData,
    /// Hash of the preceding block (`"0"` for genesis).
    pub previous_hash: String,
    /// SHA-256 hex over (index, previous_hash, timestamp, data, nonce).
    pub hash: String,
    pub nonce: u64,
}

impl Block {
    /// Build a block and seal it immediately. Construction never validates
    /// against neighboring blocks; sequencing is the ledger's job.
    pub fn new(index: u64, timestamp: i64, data: BlockData, previous_hash: String) -> Self {
        let mut block = Block {
            index,
            timestamp,
            data,
            previous_hash,
            hash: String::new(),
            nonce: 0,
        };
        block.seal();
        block
    }

    /// Re-derive the hash from the block's current fields.
    ///
    /// Input layout (bytes, in order):
    ///   1. index as 8-byte little-endian
    ///   2. previous_hash as UTF-8 bytes
    ///   3. timestamp as 8-byte little-endian
    ///   4. canonical JSON of data (serde_json, field order is stable)
    ///   5. nonce as 8-byte little-endian
    pub fn compute_hash(&self) -> String {
        let data_json =
            serde_json::to_vec(&self.data).expect("block data must always serialize to JSON");
        hash_concat(&[
            &self.index.to_le_bytes(),
            self.previous_hash.as_bytes(),
            &self.timestamp.to_le_bytes(),
            &data_json,
            &self.nonce.to_le_bytes(),
        ])
    }

    /// Finalize the block hash. With difficulty pinned at 0 this is a
    /// single hash computation; there is no nonce search.
    pub fn seal(&mut self) {
        self.hash = self.compute_hash();
    }

    /// True when the stored hash matches a fresh recomputation.
    pub fn is_intact(&self) -> bool {
        self.hash == self.compute_hash()
    }
}
