//! Extension/path-based secondary categorisation for route artefacts
//!

use pr_core::ArtefactType;

/// Classify a route's path+query into its secondary category, or
/// `ArtefactType::MetaRoute` if nothing more specific applies.
#[must_use]
pub fn classify_route(path_and_query: &str) -> ArtefactType {
    let path = path_and_query.split(['?', '#']).next().unwrap_or(path_and_query);
    let lower = path.to_lowercase();

    if lower.ends_with("robots.txt") || lower.ends_with("sitemap.xml") {
        return ArtefactType::Crawl;
    }
    if lower.ends_with(".js.map") {
        return ArtefactType::Maps;
    }
    if lower.ends_with(".json") || lower.ends_with(".jsonld") {
        return ArtefactType::Json;
    }
    let file_name = lower.rsplit('/').next().unwrap_or(&lower);
    if file_name.starts_with("swagger.") || file_name.starts_with("openapi.") || lower.contains("/api/") {
        return ArtefactType::Api;
    }
    if lower.ends_with(".js") {
        return ArtefactType::Js;
    }
    if lower.ends_with(".wasm") {
        return ArtefactType::Wasm;
    }
    if lower.ends_with(".svg") {
        return ArtefactType::Svg;
    }
    if lower.ends_with(".css") {
        return ArtefactType::Css;
    }
    if ends_with_any(&lower, &[".woff", ".woff2", ".ttf", ".otf", ".eot"]) {
        return ArtefactType::Font;
    }
    if ends_with_any(&lower, &[".mp4", ".webm", ".mov", ".avi", ".mkv"]) {
        return ArtefactType::Video;
    }
    if ends_with_any(
        &lower,
        &[".png", ".jpg", ".jpeg", ".gif", ".bmp", ".ico", ".webp", ".avif"],
    ) {
        return ArtefactType::Image;
    }
    if ends_with_any(&lower, &[".zip", ".tar", ".gz", ".tar.gz", ".rar", ".7z", ".tgz"]) {
        return ArtefactType::Archive;
    }
    if ends_with_any(
        &lower,
        &[".pdf", ".doc", ".docx", ".xls", ".xlsx", ".ppt", ".pptx", ".csv"],
    ) {
        return ArtefactType::Doc;
    }

    ArtefactType::MetaRoute
}

fn ends_with_any(s: &str, suffixes: &[&str]) -> bool {
    suffixes.iter().any(|suf| s.ends_with(suf))
}
