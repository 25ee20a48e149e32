//! The ledger: an ordered, append-only sequence of hash-linked blocks.
//!
//! One instance is constructed by the composition root and shared behind a
//! `Mutex`; `append` must run under that lock from read-last to push so two
//! concurrent issuances can never claim the same index.

use std::collections::HashMap;

use serde::Serialize;
use time::OffsetDateTime;

use crate::block::{Block, BlockData, CertificatePayload, GENESIS_PREVIOUS_HASH};
use crate::error::{LedgerError, Result};

/// Which integrity check failed for a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockFault {
    /// Stored hash does not match a fresh recomputation.
    HashMismatch,
    /// `previous_hash` does not match the predecessor's hash.
    LinkMismatch,
}

/// Outcome of a full-chain validation walk.
///
/// Tampering is a normal, expected outcome, not an error: a broken chain
/// carries the first failing index for diagnostics and nothing more.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChainIntegrity {
    Valid,
    Broken { index: u64, fault: BlockFault },
}

impl ChainIntegrity {
    pub fn is_valid(&self) -> bool {
        matches!(self, ChainIntegrity::Valid)
    }
}

/// Read-only aggregate view over the ledger.
#[derive(Debug, Clone, Serialize)]
pub struct LedgerStats {
    pub total_blocks: u64,
    /// Block count excluding genesis.
    pub total_certificates: u64,
    pub is_valid: bool,
    pub latest_block: Block,
}

/// Genesis-anchored block sequence with an auxiliary certificate-id index.
///
/// `blocks` is public so callers can read the raw chain; `append` is the
/// only supported mutation. Mutating blocks in place is exactly what
/// `validate` exists to detect.
#[derive(Debug)]
pub struct Ledger {
    pub blocks: Vec<Block>,
    /// certificate_id → position in `blocks`, maintained on append.
    /// First insert wins, matching first-match-wins lookup semantics.
    index_by_certificate: HashMap<String, usize>,
}

impl Ledger {
    /// Fresh ledger holding only the genesis block.
    pub fn new() -> Self {
        let genesis = Block::new(
            0,
            OffsetDateTime::now_utc().unix_timestamp(),
            BlockData::Genesis,
            GENESIS_PREVIOUS_HASH.to_string(),
        );
        Ledger {
            blocks: vec![genesis],
            index_by_certificate: HashMap::new(),
        }
    }

    /// Rebuild a ledger from previously persisted blocks.
    ///
    /// Rejects chains that are structurally unsound (missing or malformed
    /// genesis, index gaps) or fail integrity validation.
    pub fn from_blocks(blocks: Vec<Block>) -> Result<Self> {
        let genesis = blocks
            .first()
            .ok_or_else(|| LedgerError::Corruption("no genesis block".into()))?;
        if genesis.index != 0 || genesis.previous_hash != GENESIS_PREVIOUS_HASH {
            return Err(LedgerError::Corruption(
                "first block is not a well-formed genesis".into(),
            ));
        }
        for (i, b) in blocks.iter().enumerate() {
            if b.index != i as u64 {
                return Err(LedgerError::Corruption(format!(
                    "index gap: expected {i}, found {}",
                    b.index
                )));
            }
        }

        let mut index_by_certificate = HashMap::new();
        for (i, b) in blocks.iter().enumerate() {
            if let Some(id) = b.data.certificate_id() {
                index_by_certificate.entry(id.to_string()).or_insert(i);
            }
        }

        let ledger = Ledger {
            blocks,
            index_by_certificate,
        };
        if let ChainIntegrity::Broken { index, .. } = ledger.validate() {
            return Err(LedgerError::Corruption(format!(
                "integrity check failed at block {index}"
            )));
        }
        Ok(ledger)
    }

    /// Append a certificate payload as the next block and return it.
    ///
    /// Reads the last block and pushes the successor in one synchronous
    /// sequence; callers on a multi-threaded runtime hold the ledger lock
    /// across the whole call.
    pub fn append(&mut self, payload: CertificatePayload) -> Block {
        self.append_at(payload, OffsetDateTime::now_utc().unix_timestamp())
    }

    /// `append` with an explicit block timestamp (for deterministic tests).
    pub fn append_at(&mut self, payload: CertificatePayload, timestamp: i64) -> Block {
        let certificate_id = payload.certificate_id.clone();
        let last = self.blocks.last().expect("ledger always holds genesis");
        let block = Block::new(
            last.index + 1,
            timestamp,
            BlockData::Certificate(payload),
            last.hash.clone(),
        );
        self.index_by_certificate
            .entry(certificate_id)
            .or_insert(self.blocks.len());
        self.blocks.push(block.clone());
        block
    }

    /// Look up the first block whose payload carries `certificate_id`.
    pub fn find_by_certificate_id(&self, certificate_id: &str) -> Option<&Block> {
        self.index_by_certificate
            .get(certificate_id)
            .map(|&i| &self.blocks[i])
    }

    /// Walk the whole chain, recomputing every block hash and checking
    /// every `previous_hash` link. Stops at the first failure.
    ///
    /// O(n) hash recomputations; each recomputation is what proves the
    /// block was not tampered with, so there is no shortcut.
    pub fn validate(&self) -> ChainIntegrity {
        let genesis = &self.blocks[0];
        if genesis.previous_hash != GENESIS_PREVIOUS_HASH {
            return ChainIntegrity::Broken {
                index: 0,
                fault: BlockFault::LinkMismatch,
            };
        }
        if !genesis.is_intact() {
            return ChainIntegrity::Broken {
                index: 0,
                fault: BlockFault::HashMismatch,
            };
        }

        for i in 1..self.blocks.len() {
            let block = &self.blocks[i];
            if !block.is_intact() {
                return ChainIntegrity::Broken {
                    index: block.index,
                    fault: BlockFault::HashMismatch,
                };
            }
            if block.previous_hash != self.blocks[i - 1].hash {
                return ChainIntegrity::Broken {
                    index: block.index,
                    fault: BlockFault::LinkMismatch,
                };
            }
        }
        ChainIntegrity::Valid
    }

    /// Aggregate view: counts, validity, latest block.
    pub fn stats(&self) -> LedgerStats {
        let latest = self.blocks.last().expect("ledger always holds genesis");
        LedgerStats {
            total_blocks: self.blocks.len() as u64,
            total_certificates: self.blocks.len() as u64 - 1,
            is_valid: self.validate().is_valid(),
            latest_block: latest.clone(),
        }
    }

    /// Number of blocks, genesis included. Never less than 1.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}
