//! Line classifier
//!
//! Turns one raw line from a tool adapter into zero or more [`Emission`]s,
//! candidate artefacts the sink still has to run through scope and dedupe
//! before recording. This module never touches scope or dedupe state; it is
//! a pure function of the line text.

mod extension;

use std::collections::BTreeMap;

use pr_core::ArtefactType;

pub use extension::classify_route;

/// One candidate artefact a classified line produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Emission {
    pub kind: ArtefactType,
    pub value: String,
    pub active: bool,
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Emission {
    fn new(kind: ArtefactType, value: impl Into<String>, active: bool) -> Self {
        Self {
            kind,
            value: value.into(),
            active,
            metadata: BTreeMap::new(),
        }
    }

    fn with_metadata(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

/// The result of classifying one line: which tool it was tagged with (if
/// any) and the artefacts it produced. An input line that discards to
/// nothing (unknown category) yields an empty `emissions` list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClassifiedLine {
    pub tool: Option<String>,
    pub emissions: Vec<Emission>,
}

/// Classify one raw pipeline line per the classifier's dispatch precedence:
/// strip the tool tag, then the `active:` marker, then a known category
/// tag; otherwise sniff a route/domain shape, falling back to discard.
#[must_use]
pub fn classify(line: &str) -> ClassifiedLine {
    let (tool, rest) = strip_tool_tag(line);
    let (active, rest) = strip_active_prefix(rest);

    if let Some(rest) = rest.strip_prefix("meta:") {
        return ClassifiedLine {
            tool,
            emissions: vec![Emission::new(ArtefactType::Meta, rest.trim(), active)],
        };
    }
    if let Some(rest) = rest.strip_prefix("js:") {
        return ClassifiedLine {
            tool,
            emissions: vec![Emission::new(ArtefactType::Js, rest.trim(), active)],
        };
    }
    if let Some(rest) = rest.strip_prefix("html:") {
        return ClassifiedLine {
            tool,
            emissions: vec![Emission::new(ArtefactType::Html, rest.trim(), active)],
        };
    }
    if let Some(rest) = rest.strip_prefix("image:") {
        return ClassifiedLine {
            tool,
            emissions: vec![Emission::new(ArtefactType::Image, rest.trim(), active)],
        };
    }
    if let Some(rest) = rest.strip_prefix("cert:") {
        return ClassifiedLine {
            tool,
            emissions: vec![classify_certificate(rest.trim(), active)],
        };
    }
    if let Some(rest) = rest.strip_prefix("dns:") {
        return ClassifiedLine {
            tool,
            emissions: vec![Emission::new(ArtefactType::Dns, rest.trim(), active)],
        };
    }
    // `rdap` has no dedicated single-char tag collision with the others
    // above; it carries its own on-disk file (`rdap/rdap.passive`) and no
    // producer besides the RDAP adapter reaches it.
    if let Some(rest) = rest.strip_prefix("rdap:") {
        return ClassifiedLine {
            tool,
            emissions: vec![classify_rdap(rest.trim(), active)],
        };
    }
    if let Some(rest) = rest.strip_prefix("keyFinding:") {
        return ClassifiedLine {
            tool,
            emissions: vec![Emission::new(ArtefactType::Meta, "", active).with_metadata("finding", rest.trim())],
        };
    }

    let trimmed = rest.trim();
    if trimmed.is_empty() {
        return ClassifiedLine { tool, emissions: vec![] };
    }

    // A bare JSON object is tried first (the httpx `-json` shape) so a URL
    // embedded inside a JSON string value never gets misrouted by the plain
    // `://` route check below; if it doesn't parse as usable httpx JSON, the
    // legacy bracketed-text route parser is attempted on the same line.
    if trimmed.starts_with('{') {
        if let Some(emissions) = classify_httpx_json(trimmed, active) {
            return ClassifiedLine { tool, emissions };
        }
    }

    if trimmed.contains("://") || trimmed.starts_with("//") {
        return ClassifiedLine {
            tool,
            emissions: classify_route_line(trimmed, active),
        };
    }

    if looks_like_host(trimmed) {
        return ClassifiedLine {
            tool,
            emissions: vec![Emission::new(ArtefactType::Domain, trimmed.to_lowercase(), active)],
        };
    }

    ClassifiedLine { tool, emissions: vec![] }
}

fn strip_tool_tag(line: &str) -> (Option<String>, &str) {
    if let Some(rest) = line.strip_prefix("tool(") {
        if let Some(end) = rest.find(')') {
            let name = rest[..end].to_string();
            let after = &rest[end + 1..];
            if let Some(after) = after.strip_prefix(':') {
                return (Some(name), after.trim_start());
            }
            return (Some(name), after);
        }
    }
    (None, line)
}

fn strip_active_prefix(line: &str) -> (bool, &str) {
    match line.strip_prefix("active:") {
        Some(rest) => (true, rest.trim_start()),
        None => (false, line),
    }
}

fn classify_certificate(payload: &str, active: bool) -> Emission {
    let mut emission = Emission::new(ArtefactType::Certificate, payload, active);
    match serde_json::from_str::<serde_json::Value>(payload) {
        Ok(serde_json::Value::Object(map)) => {
            for (k, v) in map {
                emission.metadata.insert(k, v);
            }
        }
        _ => {
            emission = emission.with_metadata("raw", payload);
        }
    }
    emission
}

fn classify_rdap(payload: &str, active: bool) -> Emission {
    let mut emission = Emission::new(ArtefactType::Rdap, payload, active);
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(payload) {
        for (k, v) in map {
            emission.metadata.insert(k, v);
        }
    } else {
        emission = emission.with_metadata("raw", payload);
    }
    emission
}

fn looks_like_host(s: &str) -> bool {
    if s.contains(char::is_whitespace) || s.contains('/') {
        return false;
    }
    if s.parse::<std::net::IpAddr>().is_ok() {
        return true;
    }
    if s.starts_with('[') && s.contains(']') {
        return true;
    }
    // Bare hostname: at least one label separator and no scheme marker.
    s.contains('.') && !s.contains(':') || s.matches(':').count() > 1
}

/// Parsed status/title/content-type, regardless of whether it came from a
/// bracketed text suffix or an httpx JSON object.
struct ActiveMeta {
    status: Option<u16>,
    title: Option<String>,
    content_type: Option<String>,
}

fn parse_active_metadata(suffix: &str) -> ActiveMeta {
    let mut rest = suffix.trim();
    let mut brackets = Vec::new();
    while let Some(after_open) = rest.strip_prefix('[') {
        match after_open.find(']') {
            Some(end) => {
                brackets.push(after_open[..end].to_string());
                rest = after_open[end + 1..].trim_start();
            }
            None => break,
        }
    }
    let status = brackets.first().and_then(|s| s.parse::<u16>().ok());
    let title = brackets.get(1).cloned();
    let content_type = if rest.is_empty() { None } else { Some(rest.to_string()) };
    ActiveMeta {
        status,
        title,
        content_type,
    }
}

/// Shared tail of both the legacy text-meta route path and the httpx JSON
/// path: given a parsed URL and its status/title/content-type, build the
/// route (+ optional secondary html) and domain emissions.
///
/// Status `0`/`4xx`/`5xx` is not forwarded as active (kept passive); `404`
/// additionally drops the route/html emissions entirely. The host is still
/// emitted as a `domain` artefact even when the route itself is suppressed
/// by its status code; this holds for every route source, not just httpx.
fn route_and_domain_emissions(parsed: &url::Url, route_value: String, meta: &ActiveMeta, line_active: bool) -> Vec<Emission> {
    let Some(host) = parsed.host_str() else {
        return vec![];
    };

    let mut emissions = Vec::new();
    let mut domain_active = false;

    if meta.status != Some(404) {
        let rejected_status = matches!(meta.status, Some(code) if code == 0 || (400..600).contains(&code));
        let forwarded_active = line_active && !rejected_status;
        domain_active = forwarded_active;

        let path_and_query = format!(
            "{}{}",
            parsed.path(),
            parsed.query().map(|q| format!("?{q}")).unwrap_or_default()
        );
        let secondary = classify_route(&path_and_query);

        let mut route_emission = Emission::new(secondary, route_value.clone(), forwarded_active);
        if let Some(status) = meta.status {
            route_emission = route_emission.with_metadata("status", i64::from(status));
        }
        if let Some(title) = &meta.title {
            route_emission = route_emission.with_metadata("title", title.clone());
        }
        if let Some(ct) = &meta.content_type {
            route_emission = route_emission.with_metadata("content_type", ct.clone());
        }
        emissions.push(route_emission);

        let status_allows_html = meta.status.is_none() || matches!(meta.status, Some(code) if (200..400).contains(&code));
        let looks_html = meta.content_type.as_deref().map(|ct| ct.contains("html")).unwrap_or(false);
        if looks_html && status_allows_html {
            let mut html_emission = Emission::new(ArtefactType::Html, route_value, forwarded_active);
            if let Some(status) = meta.status {
                html_emission = html_emission.with_metadata("status", i64::from(status));
            }
            emissions.push(html_emission);
        }
    }

    emissions.push(Emission::new(ArtefactType::Domain, host.to_lowercase(), domain_active));
    emissions
}

fn classify_route_line(line: &str, line_active: bool) -> Vec<Emission> {
    let (payload, meta_suffix) = pr_normalize::split_trailing_metadata(line);
    let meta = parse_active_metadata(meta_suffix);

    let with_scheme = if payload.starts_with("//") {
        format!("https:{payload}")
    } else {
        payload.to_string()
    };
    let Ok(parsed) = url::Url::parse(&with_scheme) else {
        return vec![];
    };
    if parsed.host_str().is_none() {
        return vec![];
    }

    let route_value = pr_normalize::canonicalize_route(payload).unwrap_or_else(|| payload.to_string());
    route_and_domain_emissions(&parsed, route_value, &meta, line_active)
}

/// `httpx -json`-shaped input, e.g.
/// `{"url":"https://a.example.com/","status_code":200,"content_type":"text/html","title":"Home"}`.
/// Returns `None` (letting the caller fall back to the legacy text parser)
/// on anything that doesn't parse as an object with a usable `url` field.
fn classify_httpx_json(payload: &str, line_active: bool) -> Option<Vec<Emission>> {
    let value: serde_json::Value = serde_json::from_str(payload).ok()?;
    let obj = value.as_object()?;
    let url_str = obj.get("url").and_then(|v| v.as_str())?;

    let with_scheme = if url_str.starts_with("//") {
        format!("https:{url_str}")
    } else {
        url_str.to_string()
    };
    let parsed = url::Url::parse(&with_scheme).ok()?;
    if parsed.host_str().is_none() {
        return None;
    }

    let status = obj
        .get("status_code")
        .and_then(serde_json::Value::as_u64)
        .and_then(|n| u16::try_from(n).ok());
    let title = obj.get("title").and_then(|v| v.as_str()).map(str::to_string);
    let content_type = obj.get("content_type").and_then(|v| v.as_str()).map(str::to_string);
    let meta = ActiveMeta {
        status,
        title,
        content_type,
    };

    let route_value = pr_normalize::canonicalize_route(url_str).unwrap_or_else(|| url_str.to_string());
    Some(route_and_domain_emissions(&parsed, route_value, &meta, line_active))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tool_and_active_tags() {
        let c = classify("tool(httpx):active:https://a.example.com/ [200] [Home] text/html");
        assert_eq!(c.tool.as_deref(), Some("httpx"));
        assert!(c.emissions.iter().any(|e| e.active));
    }

    #[test]
    fn category_tag_meta() {
        let c = classify("meta: dedupe reutilizado desde cache");
        assert_eq!(c.emissions.len(), 1);
        assert_eq!(c.emissions[0].kind, ArtefactType::Meta);
    }

    #[test]
    fn route_emits_secondary_and_domain() {
        let c = classify("https://a.example.com/app.js");
        assert!(c.emissions.iter().any(|e| e.kind == ArtefactType::Js));
        assert!(c
            .emissions
            .iter()
            .any(|e| e.kind == ArtefactType::Domain && e.value == "a.example.com"));
    }

    #[test]
    fn status_404_is_fully_suppressed_except_domain() {
        let c = classify("active:https://a.example.com/missing [404] [Not Found] text/html");
        assert_eq!(c.emissions.len(), 1);
        assert_eq!(c.emissions[0].kind, ArtefactType::Domain);
        assert!(!c.emissions[0].active);
    }

    #[test]
    fn status_5xx_kept_passive_only() {
        let c = classify("active:https://a.example.com/broken [500] [Error] text/html");
        let route = c.emissions.iter().find(|e| e.kind == ArtefactType::MetaRoute).unwrap();
        assert!(!route.active);
    }

    #[test]
    fn html_emitted_only_for_2xx_3xx_or_absent_status() {
        let ok = classify("active:https://a.example.com/ [200] [Home] text/html");
        assert!(ok.emissions.iter().any(|e| e.kind == ArtefactType::Html));

        let err = classify("active:https://a.example.com/ [500] [Err] text/html");
        assert!(!err.emissions.iter().any(|e| e.kind == ArtefactType::Html));
    }

    #[test]
    fn bare_host_emits_domain() {
        let c = classify("a.example.com");
        assert_eq!(c.emissions.len(), 1);
        assert_eq!(c.emissions[0].kind, ArtefactType::Domain);
    }

    #[test]
    fn unknown_line_discards() {
        let c = classify(" ");
        assert!(c.emissions.is_empty());
    }

    #[test]
    fn cert_tag_parses_json_metadata() {
        let c = classify(r#"cert: {"sha256":"abc","cn":"example.com"}"#);
        assert_eq!(c.emissions[0].kind, ArtefactType::Certificate);
        assert_eq!(c.emissions[0].metadata.get("sha256").unwrap(), "abc");
    }

    #[test]
    fn rdap_tag_parses_json_metadata() {
        let c = classify(r#"rdap: {"handle":"EXAMPLE-COM","status":["active"]}"#);
        assert_eq!(c.emissions[0].kind, ArtefactType::Rdap);
        assert_eq!(c.emissions[0].metadata.get("handle").unwrap(), "EXAMPLE-COM");
    }

    #[test]
    fn key_finding_tag_maps_to_meta_with_finding_field() {
        let c = classify("keyFinding: exposed.git directory");
        assert_eq!(c.emissions[0].kind, ArtefactType::Meta);
        assert_eq!(
            c.emissions[0].metadata.get("finding").unwrap(),
            "exposed.git directory"
        );
    }

    #[test]
    fn httpx_json_404_suppresses_route_but_keeps_domain() {
        let c = classify(r#"active:{"url":"https://a.example.com/","status_code":404}"#);
        assert_eq!(c.emissions.len(), 1);
        assert_eq!(c.emissions[0].kind, ArtefactType::Domain);
        assert_eq!(c.emissions[0].value, "a.example.com");
        assert!(!c.emissions[0].active);
    }

    #[test]
    fn httpx_json_200_html_emits_route_html_and_domain() {
        let c = classify(
            r#"active:{"url":"https://b.example.com/","status_code":200,"content_type":"text/html"}"#,
        );
        assert!(c.emissions.iter().any(|e| e.kind == ArtefactType::Html && e.active));
        assert!(c
            .emissions
            .iter()
            .any(|e| e.kind == ArtefactType::Domain && e.value == "b.example.com" && e.active));
        assert!(c.emissions.iter().any(|e| e.active));
    }

    #[test]
    fn httpx_json_embedded_scheme_does_not_confuse_route_detection() {
        // The raw line contains `://` only inside the JSON string value;
        // without the JSON-first check this would mis-tokenise.
        let c = classify(r#"{"url":"https://c.example.com/x","status_code":200}"#);
        assert!(c.emissions.iter().any(|e| e.kind == ArtefactType::MetaRoute));
    }

    #[test]
    fn malformed_json_falls_back_to_legacy_route_parser() {
        // Starts with `{` but isn't valid JSON; `classify_httpx_json`
        // returns `None` and the line still reaches the route/domain path.
        let c = classify("{not json}");
        assert!(c.emissions.is_empty());
    }
}
