//! The canonical data model: artefact types, the artefact record itself, and
//! the deterministic key derivation that the store and dedupe keyspaces rely
//! on. See for the authoritative field-by-field description.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// The primary category of a discovered artefact.
///
/// Serialises to the lowercase, hyphenated spelling used throughout the
/// on-disk manifest and the output directory layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtefactType {
    Domain,
    Route,
    Js,
    Html,
    Image,
    Maps,
    Json,
    Api,
    Wasm,
    Svg,
    Crawl,
    MetaRoute,
    Css,
    Font,
    Video,
    Doc,
    Archive,
    Meta,
    Rdap,
    Certificate,
    Dns,
}

impl ArtefactType {
    /// The on-disk subdirectory this type materialises into, relative to
    /// `<outdir>/<target>/`.
    #[must_use]
    pub const fn subdir(self) -> &'static str {
        match self {
            Self::Domain => "domains",
            Self::Route | Self::MetaRoute => "routes",
            Self::Js => "routes/js",
            Self::Html => "routes/html",
            Self::Image => "routes/images",
            Self::Maps => "routes/maps",
            Self::Json => "routes/json",
            Self::Api => "routes/api",
            Self::Wasm => "routes/wasm",
            Self::Svg => "routes/svg",
            Self::Crawl => "routes/crawl",
            Self::Css => "routes/css",
            Self::Font => "routes/fonts",
            Self::Video => "routes/video",
            Self::Doc => "routes/docs",
            Self::Archive => "routes/archives",
            Self::Meta => ".",
            Self::Rdap => "rdap",
            Self::Certificate => "certs",
        }
    }

    /// The filename stem written under `subdir`, e.g. `domains.passive`.
    #[must_use]
    pub const fn file_stem(self) -> &'static str {
        match self {
            Self::Domain => "domains",
            Self::Route | Self::MetaRoute => "routes",
            Self::Js => "js",
            Self::Html => "html",
            Self::Image => "images",
            Self::Maps => "maps",
            Self::Json => "json",
            Self::Api => "api",
            Self::Wasm => "wasm",
            Self::Svg => "svg",
            Self::Crawl => "crawl",
            Self::Css => "css",
            Self::Font => "fonts",
            Self::Video => "video",
            Self::Doc => "docs",
            Self::Archive => "archives",
            Self::Meta => "meta",
            Self::Rdap => "rdap",
            Self::Certificate => "certs",
        }
    }

    /// Whether this type participates in the `.passive`/`.active` split at
    /// all (`rdap` is passive-only per the orchestrator's stage table).
    #[must_use]
    pub const fn has_active_variant(self) -> bool {
        !matches!(self, Self::Rdap)
    }
}

impl fmt::Display for ArtefactType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = serde_json::to_value(self)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default();
        f.write_str(&s)
    }
}

/// The canonical record the store maintains for one discovered thing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artefact {
    #[serde(rename = "type")]
    pub kind: ArtefactType,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub types: BTreeSet<ArtefactType>,
    pub value: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default = "default_true")]
    pub up: bool,
    pub tool: String,
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default = "default_occurrences")]
    pub occurrences: u64,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

const fn default_true() -> bool {
    true
}

const fn default_occurrences() -> u64 {
    1
}

impl Artefact {
    /// Construct a fresh artefact as it is first sighted by `tool`.
    #[must_use]
    pub fn new(kind: ArtefactType, value: impl Into<String>, tool: impl Into<String>) -> Self {
        let now = Utc::now();
        let tool = tool.into();
        Self {
            kind,
            types: BTreeSet::new(),
            value: value.into(),
            active: false,
            up: true,
            tool: tool.clone(),
            tools: vec![tool],
            occurrences: 1,
            metadata: BTreeMap::new(),
            first_seen: now,
            last_seen: now,
        }
    }

    #[must_use]
    pub fn active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    #[must_use]
    pub fn up(mut self, up: bool) -> Self {
        self.up = up;
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_types(mut self, types: impl IntoIterator<Item = ArtefactType>) -> Self {
        self.types.extend(types);
        self
    }

    /// Deterministic key for this artefact, used by the store to decide
    /// insert-vs-merge and by dedupe keyspaces for membership tests. Each
    /// artefact type has its own canonicalisation rule (see
    /// [`ArtefactKey::compute`] for the certificate case's fallback chain).
    #[must_use]
    pub fn key(&self) -> ArtefactKey {
        ArtefactKey::compute(self.kind, &self.value, self.active, &self.metadata)
    }

    /// Merge `incoming` into `self` in place, following the rules in
    /// metadata union (arrays union-sorted, scalars last-wins),
    /// `types` union, `up = up AND incoming.up`, `occurrences++`, `tools`
    /// gains the incoming tool while preserving first-seen as primary.
    pub fn merge(&mut self, incoming: &Artefact) {
        for (k, v) in &incoming.metadata {
            match (self.metadata.get(k), v) {
                (Some(serde_json::Value::Array(existing)), serde_json::Value::Array(new)) => {
                    let mut merged: Vec<String> = existing
                    .iter()
                    .chain(new.iter())
                    .filter_map(|x| x.as_str().map(str::to_string))
                    .collect();
                    merged.sort();
                    merged.dedup();
                    self.metadata.insert(
                        k.clone(),
                        serde_json::Value::Array(merged.into_iter().map(serde_json::Value::String).collect()),
                    );
                }
                _ => {
                    self.metadata.insert(k.clone(), v.clone());
                }
            }
        }
        self.types.extend(incoming.types.iter().copied());
        self.up = self.up && incoming.up;
        self.occurrences += 1;
        if !self.tools.contains(&incoming.tool) {
            self.tools.push(incoming.tool.clone());
        }
        self.last_seen = incoming.last_seen;
    }
}

/// Deterministic identity for an artefact: `(type, value, active)` plus
/// type-specific canonicalisation of `value`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArtefactKey(pub String);

impl ArtefactKey {
    #[must_use]
    pub fn compute(
        kind: ArtefactType,
        value: &str,
        active: bool,
        metadata: &BTreeMap<String, serde_json::Value>,
    ) -> Self {
        let canonical = match kind {
            ArtefactType::Certificate => Self::cert_key(value, metadata),
            ArtefactType::Domain | ArtefactType::Dns => value.to_lowercase(),
            ArtefactType::Route
            | ArtefactType::MetaRoute
            | ArtefactType::Js
            | ArtefactType::Html
            | ArtefactType::Image
            | ArtefactType::Maps
            | ArtefactType::Json
            | ArtefactType::Api
            | ArtefactType::Wasm
            | ArtefactType::Svg
            | ArtefactType::Crawl
            | ArtefactType::Css
            | ArtefactType::Font
            | ArtefactType::Video
            | ArtefactType::Doc
            | ArtefactType::Archive => Self::fold_trailing_slash(value),
            _ => value.to_string(),
        };
        let active_tag = if active { "active" } else { "passive" };
        Self(format!("{kind}:{canonical}:{active_tag}"))
    }

    fn fold_trailing_slash(value: &str) -> String {
        if value.len() > 1 && value.ends_with('/') {
            value.trim_end_matches('/').to_string()
        } else {
            value.to_string()
        }
    }

    /// Certificate dedup key priority: sha256 → sha1 → `serial|issuer` →
    /// `cn:<cn>` → `dns:<joined SANs>`
    fn cert_key(value: &str, metadata: &BTreeMap<String, serde_json::Value>) -> String {
        if let Some(s) = metadata.get("sha256").and_then(|v| v.as_str()) {
            return s.to_lowercase();
        }
        if let Some(s) = metadata.get("sha1").and_then(|v| v.as_str()) {
            return s.to_lowercase();
        }
        if let (Some(serial), Some(issuer)) = (
            metadata.get("serial").and_then(|v| v.as_str()),
            metadata.get("issuer").and_then(|v| v.as_str()),
        ) {
            return format!("{}|{}", serial.trim(), issuer.trim());
        }
        if let Some(cn) = metadata.get("cn").and_then(|v| v.as_str()) {
            return format!("cn:{}", cn.to_lowercase());
        }
        if let Some(names) = metadata.get("names").and_then(|v| v.as_array()) {
            let mut sans: Vec<String> = names
            .iter()
            .filter_map(|x| x.as_str().map(str::to_lowercase))
            .collect();
            sans.sort();
            return format!("dns:{}", sans.join(","));
        }
        // Fall back to a content hash of the raw value so we never silently
        // collapse two different certificates that carry no known metadata.
        let mut hasher = Sha256::new();
        hasher.update(value.as_bytes());
        format!("sha256:{}", hex::encode(hasher.finalize()))
    }
}

impl fmt::Display for ArtefactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_key_lowercases() {
        let k = ArtefactKey::compute(ArtefactType::Domain, "Example.COM", false, &BTreeMap::new());
        assert_eq!(k.0, "domain:example.com:passive");
    }

    #[test]
    fn route_key_folds_trailing_slash() {
        let a = ArtefactKey::compute(ArtefactType::Route, "https://a.example.com/", false, &BTreeMap::new());
        let b = ArtefactKey::compute(ArtefactType::Route, "https://a.example.com", false, &BTreeMap::new());
        assert_eq!(a, b);
    }

    #[test]
    fn route_key_keeps_root_slash() {
        let k = ArtefactKey::compute(ArtefactType::Route, "/", false, &BTreeMap::new());
        assert_eq!(k.0, "route:/:passive");
    }

    #[test]
    fn cert_key_prefers_sha256() {
        let mut meta = BTreeMap::new();
        meta.insert("sha256".to_string(), serde_json::json!("ABCDEF"));
        meta.insert("serial".to_string(), serde_json::json!("123"));
        let k = ArtefactKey::compute(ArtefactType::Certificate, "raw", false, &meta);
        assert_eq!(k.0, "certificate:abcdef:passive");
    }

    #[test]
    fn cert_key_falls_back_to_serial_issuer() {
        let mut meta = BTreeMap::new();
        meta.insert("serial".to_string(), serde_json::json!(" 42 "));
        meta.insert("issuer".to_string(), serde_json::json!(" CA Corp "));
        let k = ArtefactKey::compute(ArtefactType::Certificate, "raw", false, &meta);
        assert_eq!(k.0, "certificate:42|CA Corp:passive");
    }

    #[test]
    fn active_and_passive_keys_differ() {
        let a = ArtefactKey::compute(ArtefactType::Domain, "a.example.com", true, &BTreeMap::new());
        let p = ArtefactKey::compute(ArtefactType::Domain, "a.example.com", false, &BTreeMap::new());
        assert_ne!(a, p);
    }

    #[test]
    fn merge_unions_metadata_arrays_and_sorts() {
        let mut a = Artefact::new(ArtefactType::Certificate, "raw", "crtsh")
        .with_metadata("names", serde_json::json!(["b.example.com", "a.example.com"]));
        let b = Artefact::new(ArtefactType::Certificate, "raw", "censys")
        .with_metadata("names", serde_json::json!(["c.example.com", "a.example.com"]));
        a.merge(&b);
        let names = a.metadata.get("names").unwrap().as_array().unwrap();
        let names: Vec<&str> = names.iter().map(|v| v.as_str().unwrap()).collect();
        assert_eq!(names, vec!["a.example.com", "b.example.com", "c.example.com"]);
        assert_eq!(a.occurrences, 2);
        assert_eq!(a.tools, vec!["crtsh".to_string(), "censys".to_string()]);
    }

    #[test]
    fn merge_up_is_logical_and() {
        let mut a = Artefact::new(ArtefactType::Domain, "a.example.com", "httpx");
        let mut b = Artefact::new(ArtefactType::Domain, "a.example.com", "dnsx");
        b.up = false;
        a.merge(&b);
        assert!(!a.up);
    }
}
