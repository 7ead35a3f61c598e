//! Helm release records
//!
//! Helm's `secret` storage driver keeps each revision of a release in a
//! Secret named `sh.helm.release.v1.<release>.v<revision>`, labelled with
//! `owner=helm` and `name=<release>`. The `release` key holds base64 text
//! of a gzip-compressed JSON document.

use std::io::Read;

use anyhow::Context;
use base64::Engine;
use k8s_openapi::api::core::v1::Secret;
use serde::Serialize;

use super::gateway::Cluster;
use crate::error::{Error, Result};

/// The fields of a release swctl reports on
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseSummary {
    pub name: String,
    pub namespace: String,
    pub revision: i64,
    pub status: String,
    pub chart: String,
    pub chart_version: String,
    pub app_version: String,
}

/// Name of the storage secret for a release revision
pub fn secret_name(release: &str, revision: i64) -> String {
    format!("sh.helm.release.v1.{}.v{}", release, revision)
}

/// Decode the `release` payload of a storage secret
pub fn decode_release(payload: &[u8]) -> Result<ReleaseSummary> {
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(payload)
        .context("Failed to decode base64 release data")?;

    // gzip magic bytes
    let is_gzipped =
        decoded.len() >= 3 && decoded[0] == 0x1f && decoded[1] == 0x8b && decoded[2] == 0x08;

    let json = if is_gzipped {
        let mut decoder = flate2::read::GzDecoder::new(&decoded[..]);
        let mut buf = Vec::new();
        decoder
            .read_to_end(&mut buf)
            .context("Failed to decompress gzip release data")?;
        buf
    } else {
        decoded
    };

    let release: serde_json::Value =
        serde_json::from_slice(&json).context("Failed to parse release JSON")?;

    let text = |pointer: &str| {
        release
            .pointer(pointer)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    };

    Ok(ReleaseSummary {
        name: text("/name"),
        namespace: text("/namespace"),
        revision: release
            .get("version")
            .and_then(|v| v.as_i64())
            .unwrap_or_default(),
        status: text("/info/status"),
        chart: text("/chart/metadata/name"),
        chart_version: text("/chart/metadata/version"),
        app_version: text("/chart/metadata/appVersion"),
    })
}

fn revision_of(secret: &Secret) -> i64 {
    secret
        .metadata
        .labels
        .as_ref()
        .and_then(|labels| labels.get("version"))
        .and_then(|v| v.parse().ok())
        .unwrap_or_default()
}

/// Find and decode the latest revision of a release
pub async fn latest_release(
    cluster: &dyn Cluster,
    namespace: &str,
    release: &str,
) -> Result<ReleaseSummary> {
    let selector = format!("owner=helm,name={}", release);
    let secrets = cluster.list_secrets(namespace, &selector).await?;
    let latest = secrets
        .iter()
        .max_by_key(|secret| revision_of(secret))
        .ok_or_else(|| Error::not_found("helm release", release))?;

    tracing::debug!(
        "Latest release secret: {}",
        latest.metadata.name.as_deref().unwrap_or_default()
    );

    let payload = latest
        .data
        .as_ref()
        .and_then(|data| data.get("release"))
        .ok_or_else(|| Error::Other(anyhow::anyhow!("Secret missing 'release' key")))?;
    decode_release(&payload.0)
}
