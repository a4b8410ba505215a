use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use crate::error::Result;

/// Minimum quality a token needs from every source to be admitted
pub const DEFAULT_CERT_QOS: u32 = 2;

/// Parse an allow-list of `{"token": {"source": qos, ...}, ...}`.
///
/// A token is admitted when its lowest qos reaches `min_qos`; tokens
/// without any source are ignored.
pub fn parse_certs(text: &str, min_qos: u32) -> Result<HashSet<String>> {
    let raw: BTreeMap<String, BTreeMap<String, u32>> = serde_json::from_str(text)?;
    Ok(raw
        .into_iter()
        .filter(|(_, sources)| {
            sources
                .values()
                .min()
                .is_some_and(|&lowest| lowest >= min_qos)
        })
        .map(|(token, _)| token)
        .collect())
}

pub fn load_certs(path: &Path, min_qos: u32) -> Result<HashSet<String>> {
    let certs = parse_certs(&fs::read_to_string(path)?, min_qos)?;
    log::info!("Loaded {} certified tokens from {}", certs.len(), path.display());
    Ok(certs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_tokens_by_lowest_qos() {
        let text = r#"{
            "ransomtest": {"analyst": 3, "vendor": 2},
            "gandcrab": {"analyst": 3, "vendor": 1},
            "orphan": {}
        }"#;
        let certs = parse_certs(text, 2).unwrap();
        assert!(certs.contains("ransomtest"));
        assert!(!certs.contains("gandcrab"));
        assert!(!certs.contains("orphan"));

        let strict = parse_certs(text, 3).unwrap();
        assert!(strict.is_empty());
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(parse_certs("[1, 2]", 2).is_err());
    }
}
