//! Artefact-level normalisation applied once, at `record` time
//!

use pr_core::{Artefact, ArtefactType};

/// Lowercase/trim domain-shaped values, and turn a certificate's `value`
/// into deterministic JSON over its normalised metadata.
pub fn normalize(artefact: &mut Artefact) {
    match artefact.kind {
        ArtefactType::Domain | ArtefactType::Dns => {
            artefact.value = artefact.value.trim().to_lowercase();
        }
        ArtefactType::Certificate => {
            normalize_certificate_metadata(artefact);
            artefact.value = serde_json_canonicalizer::to_string(&artefact.metadata)
                .unwrap_or_else(|_| artefact.value.clone());
        }
        _ => {
            artefact.value = artefact.value.trim().to_string();
        }
    }
}

/// Normalise the fields a certificate's canonical-JSON encoding is built
/// from: lowercased domain fields, sorted SANs, trimmed issuer/subject/
/// serial, lowercased fingerprints.
fn normalize_certificate_metadata(artefact: &mut Artefact) {
    for key in ["sha256", "sha1"] {
        if let Some(serde_json::Value::String(s)) = artefact.metadata.get_mut(key) {
            *s = s.to_lowercase();
        }
    }
    for key in ["serial", "issuer", "subject"] {
        if let Some(serde_json::Value::String(s)) = artefact.metadata.get_mut(key) {
            *s = s.trim().to_string();
        }
    }
    if let Some(serde_json::Value::String(cn)) = artefact.metadata.get_mut("cn") {
        *cn = cn.to_lowercase();
    }
    if let Some(serde_json::Value::Array(names)) = artefact.metadata.get_mut("names") {
        let mut sans: Vec<String> = names.iter().filter_map(|v| v.as_str().map(str::to_lowercase)).collect();
        sans.sort();
        sans.dedup();
        *names = sans.into_iter().map(serde_json::Value::String).collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn domain_value_lowercased_and_trimmed() {
        let mut a = Artefact::new(ArtefactType::Domain, " Example.COM ", "subfinder");
        normalize(&mut a);
        assert_eq!(a.value, "example.com");
    }

    #[test]
    fn certificate_value_becomes_canonical_json() {
        let mut meta = BTreeMap::new();
        meta.insert("cn".to_string(), serde_json::json!("Example.COM"));
        meta.insert("names".to_string(), serde_json::json!(["B.example.com", "a.example.com"]));
        let mut a = Artefact::new(ArtefactType::Certificate, "raw-line", "crtsh");
        a.metadata = meta;
        normalize(&mut a);
        assert_eq!(a.metadata.get("cn").unwrap().as_str().unwrap(), "example.com");
        let names = a.metadata.get("names").unwrap().as_array().unwrap();
        let names: Vec<&str> = names.iter().map(|v| v.as_str().unwrap()).collect();
        assert_eq!(names, vec!["a.example.com", "b.example.com"]);
        assert!(a.value.starts_with('{'));
    }
}
