//! HTTP routes for issuing and verifying ledger-backed certificates.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{error, info};

use certledger::hashing::sha256_hex;
use certledger::{storage, verify, Block, CertificatePayload, ChainIntegrity, LedgerStats, Verdict};

use crate::AppState;

/// Accept either raw content (`data`, `image`) or pre-computed hashes
/// (`data_hash`, `image_hash`). Raw data is hashed server-side.
#[derive(Deserialize)]
pub struct IssueRequest {
    pub certificate_id: String,
    /// Structured certificate data; hashed as canonical JSON.
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub data_hash: Option<String>,
    /// Certificate artifact content (e.g. base64); hashed as bytes.
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub image_hash: Option<String>,
    pub issuer_address: String,
    /// Issuance time (unix seconds); server fills when absent.
    #[serde(default)]
    pub issued_at: Option<i64>,
}

/// Pick the pre-computed hash when given, otherwise hash the raw bytes.
fn resolve_hash(
    prehashed: Option<String>,
    raw: Option<Vec<u8>>,
    field: &str,
) -> Result<String, (StatusCode, String)> {
    match (prehashed, raw) {
        (Some(h), _) if !h.trim().is_empty() => Ok(h),
        (_, Some(bytes)) if !bytes.is_empty() => Ok(sha256_hex(&bytes)),
        _ => Err((
            StatusCode::BAD_REQUEST,
            format!("must provide {field} or {field}_hash"),
        )),
    }
}

fn canonical_json_bytes(value: &serde_json::Value) -> Vec<u8> {
    serde_json::to_vec(value).expect("JSON value must serialize")
}

/// POST /certificates
pub async fn issue_certificate(
    State(state): State<AppState>,
    Json(req): Json<IssueRequest>,
) -> Result<Json<Block>, (StatusCode, String)> {
    let data_hash = resolve_hash(
        req.data_hash,
        req.data.as_ref().map(canonical_json_bytes),
        "data",
    )?;
    let image_hash = resolve_hash(req.image_hash, req.image.map(String::into_bytes), "image")?;

    let issued_at = req
        .issued_at
        .unwrap_or_else(|| OffsetDateTime::now_utc().unix_timestamp());

    let payload = CertificatePayload {
        certificate_id: req.certificate_id,
        data_hash,
        image_hash,
        issuer_address: req.issuer_address,
        issued_at,
    };

    // Append under the lock; the read-last/construct/push sequence must not
    // interleave with another issuance.
    let block = state.ledger.lock().unwrap().append(payload);

    if let Some(dir) = &state.data_dir {
        if let Err(e) = storage::save_block(dir, &block) {
            error!(index = block.index, %e, "failed to persist block");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, "persist failed".into()));
        }
    }

    info!(
        index = block.index,
        certificate_id = block.data.certificate_id().unwrap_or_default(),
        "certificate committed"
    );
    Ok(Json(block))
}

#[derive(Serialize)]
pub struct CertificateResponse {
    pub block: Block,
    /// Chain integrity at read time; a found block in a broken chain must
    /// not be presented as trustworthy.
    pub chain: ChainIntegrity,
}

/// GET /certificates/:id
pub async fn get_certificate(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CertificateResponse>, (StatusCode, String)> {
    let guard = state.ledger.lock().unwrap();
    let block = guard
        .find_by_certificate_id(&id)
        .cloned()
        .ok_or((StatusCode::NOT_FOUND, "certificate not found".into()))?;
    let chain = guard.validate();
    Ok(Json(CertificateResponse { block, chain }))
}

/// Same raw-or-prehashed shape as issuance: the verifier submits what it
/// holds and the server re-derives the hashes to compare.
#[derive(Deserialize)]
pub struct VerifyRequest {
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub data_hash: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub image_hash: Option<String>,
}

/// POST /certificates/:id/verify
///
/// Every verdict — including "not found" and "chain broken" — is a 200
/// domain result, not a server failure.
pub async fn verify_certificate(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<VerifyRequest>,
) -> Result<Json<Verdict>, (StatusCode, String)> {
    let data_hash = resolve_hash(
        req.data_hash,
        req.data.as_ref().map(canonical_json_bytes),
        "data",
    )?;
    let image_hash = resolve_hash(req.image_hash, req.image.map(String::into_bytes), "image")?;

    let guard = state.ledger.lock().unwrap();
    let verdict = verify::verify_certificate(&guard, &id, &data_hash, &image_hash);
    info!(certificate_id = %id, ?verdict, "verification run");
    Ok(Json(verdict))
}

/// GET /chain
pub async fn list_chain(State(state): State<AppState>) -> Json<Vec<Block>> {
    let guard = state.ledger.lock().unwrap();
    Json(guard.blocks.clone())
}

/// GET /chain/validate
pub async fn validate_chain(State(state): State<AppState>) -> Json<ChainIntegrity> {
    let guard = state.ledger.lock().unwrap();
    Json(guard.validate())
}

/// GET /chain/stats
pub async fn chain_stats(State(state): State<AppState>) -> Json<LedgerStats> {
    let guard = state.ledger.lock().unwrap();
    Json(guard.stats())
}

/// GET /health
#[derive(Serialize)]
pub struct Health {
    pub status: &'static str,
}
pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

/// GET /version
#[derive(Serialize)]
pub struct Version {
    pub version: &'static str,
    pub git_sha: Option<&'static str>,
}
pub async fn version() -> Json<Version> {
    Json(Version {
        version: env!("CARGO_PKG_VERSION"),
        git_sha: option_env!("GIT_SHA"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_prefers_prehashed() {
        let h = resolve_hash(Some("abc123".into()), Some(b"raw".to_vec()), "data").unwrap();
        assert_eq!(h, "abc123");
    }

    #[test]
    fn resolve_hashes_raw_bytes() {
        let h = resolve_hash(None, Some(b"raw".to_vec()), "data").unwrap();
        assert_eq!(h, sha256_hex(b"raw"));
    }

    #[test]
    fn resolve_rejects_missing_input() {
        assert!(resolve_hash(None, None, "data").is_err());
        // Blank prehashed field does not count as provided.
        assert!(resolve_hash(Some("  ".into()), None, "image").is_err());
    }

    #[test]
    fn canonical_json_is_key_order_independent() {
        let a: serde_json::Value = serde_json::from_str(r#"{"name":"Ada","course":"CS"}"#).unwrap();
        let b: serde_json::Value = serde_json::from_str(r#"{"course":"CS","name":"Ada"}"#).unwrap();
        assert_eq!(canonical_json_bytes(&a), canonical_json_bytes(&b));
    }

    #[test]
    fn issue_request_accepts_minimal_body() {
        let req: IssueRequest = serde_json::from_str(
            r#"{
                "certificate_id": "CERT-2024-001",
                "data_hash": "abc",
                "image_hash": "def",
                "issuer_address": "0x1111"
            }"#,
        )
        .unwrap();
        assert!(req.data.is_none());
        assert!(req.issued_at.is_none());
    }
}
