//! Disk persistence for blocks (JSON per file) with validated replay.
//!
//! Durability is an explicit upgrade over the original in-memory-only
//! ledger: every appended block lands in `block_<index>.json`, and startup
//! replays the files through full structural and integrity validation so a
//! tampered or truncated on-disk chain is a startup error rather than a
//! silently shortened ledger.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::block::Block;
use crate::error::{LedgerError, Result};
use crate::ledger::Ledger;

/// Ensure that the given directory exists (create recursively if needed).
pub fn ensure_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

/// Compute the JSON filename for a block index.
pub fn block_path(dir: &Path, index: u64) -> PathBuf {
    dir.join(format!("block_{index}.json"))
}

/// Write a block to disk as `block_<index>.json` (pretty-printed).
pub fn save_block(dir: &Path, block: &Block) -> Result<()> {
    ensure_dir(dir)?;
    let p = block_path(dir, block.index);
    let mut f = File::create(&p)?;
    let json = serde_json::to_string_pretty(block).expect("block json");
    f.write_all(json.as_bytes())?;
    debug!(index = block.index, path = %p.display(), "block persisted");
    Ok(())
}

/// Load all `*.json` block files from the directory, sorted by index.
///
/// A file that fails to parse is corruption, not something to skip: a
/// skipped block would surface later as an index gap at best and a
/// silently shortened chain at worst.
pub fn load_blocks(dir: &Path) -> Result<Vec<Block>> {
    ensure_dir(dir)?;
    let mut out = vec![];
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let p = entry.path();
        if p.extension().and_then(|s| s.to_str()) != Some("json") {
            continue;
        }
        let mut f = File::open(&p)?;
        let mut buf = String::new();
        f.read_to_string(&mut buf)?;
        let block = serde_json::from_str::<Block>(&buf).map_err(|e| {
            LedgerError::Corruption(format!("unreadable block file {}: {e}", p.display()))
        })?;
        out.push(block);
    }
    out.sort_by_key(|b| b.index);
    Ok(out)
}

/// Replay the on-disk chain into a ledger, or start a fresh one.
///
/// An empty directory yields a genesis-only ledger whose genesis block is
/// written out immediately, so every later load sees a complete chain.
pub fn load_ledger(dir: &Path) -> Result<Ledger> {
    let blocks = load_blocks(dir)?;
    if blocks.is_empty() {
        let ledger = Ledger::new();
        save_block(dir, &ledger.blocks[0])?;
        info!(path = %dir.display(), "initialized fresh ledger");
        return Ok(ledger);
    }
    let ledger = Ledger::from_blocks(blocks)?;
    info!(
        path = %dir.display(),
        blocks = ledger.len(),
        "replayed ledger from disk"
    );
    Ok(ledger)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::CertificatePayload;

    fn payload(id: &str) -> CertificatePayload {
        CertificatePayload {
            certificate_id: id.into(),
            data_hash: "abc".into(),
            image_hash: "def".into(),
            issuer_address: "0x1111".into(),
            issued_at: 1_700_000_000,
        }
    }

    #[test]
    fn fresh_directory_initializes_genesis() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = load_ledger(dir.path()).unwrap();
        assert_eq!(ledger.len(), 1);
        assert!(block_path(dir.path(), 0).exists());

        // A second load replays the same genesis instead of re-creating it.
        let reloaded = load_ledger(dir.path()).unwrap();
        assert_eq!(reloaded.blocks, ledger.blocks);
    }

    #[test]
    fn round_trip_preserves_chain() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = load_ledger(dir.path()).unwrap();
        for i in 0..3 {
            let block = ledger.append(payload(&format!("CERT-{i}")));
            save_block(dir.path(), &block).unwrap();
        }

        let reloaded = load_ledger(dir.path()).unwrap();
        assert_eq!(reloaded.blocks, ledger.blocks);
        assert!(reloaded.validate().is_valid());
        assert!(reloaded.find_by_certificate_id("CERT-2").is_some());
    }

    #[test]
    fn tampered_file_rejected_on_replay() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = load_ledger(dir.path()).unwrap();
        let block = ledger.append(payload("CERT-1"));
        save_block(dir.path(), &block).unwrap();

        // Rewrite the block with a doctored payload, keeping its hash.
        let mut tampered = block.clone();
        if let crate::block::BlockData::Certificate(ref mut p) = tampered.data {
            p.data_hash = "tampered".into();
        }
        let json = serde_json::to_string_pretty(&tampered).unwrap();
        fs::write(block_path(dir.path(), 1), json).unwrap();

        assert!(matches!(
            load_ledger(dir.path()),
            Err(LedgerError::Corruption(_))
        ));
    }

    #[test]
    fn malformed_file_is_corruption() {
        let dir = tempfile::tempdir().unwrap();
        load_ledger(dir.path()).unwrap();
        fs::write(block_path(dir.path(), 1), "not json").unwrap();

        assert!(matches!(
            load_ledger(dir.path()),
            Err(LedgerError::Corruption(_))
        ));
    }

    #[test]
    fn non_json_files_ignored() {
        let dir = tempfile::tempdir().unwrap();
        load_ledger(dir.path()).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignore me").unwrap();

        assert!(load_ledger(dir.path()).is_ok());
    }
}
