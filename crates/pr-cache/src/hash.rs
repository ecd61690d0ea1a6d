//! Run-hash computation (Run hash).
//!
//! A SHA-256 over a versioned canonical encoding of the fields that define
//! "the same run" for cache-reuse and checkpoint-discriminator purposes.
//! Stable under whitespace/case differences in `target` and the requested
//! tool set, and under reordering of the requested tool set
//! ; `ordered_tools` (the orchestrator's declared execution
    //! order for the selected stages) is taken as given since it is derived,
//! not user-authored.

use pr_config::Config;
use pr_core::hashing::sha256_hex;

const RUN_HASH_VERSION: &str = "v1";

fn normalize_tool(tool: &str) -> String {
    tool.trim().to_lowercase()
}

#[must_use]
pub fn run_hash(cfg: &Config, ordered_tools: &[String]) -> String {
    let mut sorted_requested: Vec<String> = cfg.tools.iter().map(|t| normalize_tool(t)).collect();
    sorted_requested.sort();

    let ordered: Vec<String> = ordered_tools.iter().map(|t| normalize_tool(t)).collect();

    let mut sorted_creds: Vec<String> = cfg.credentials.keys().cloned().collect();
    sorted_creds.sort();

    let encoded = format!(
        "{version}|target={target}|out_dir={out_dir}|active={active}|workers={workers}|timeout_s={timeout_s}|requested={requested}|ordered={ordered}|proxy={proxy}|credentials={credentials}",
        version = RUN_HASH_VERSION,
        target = cfg.target.trim().to_lowercase(),
        out_dir = cfg.out_dir,
        active = cfg.active,
        workers = cfg.workers,
        timeout_s = cfg.timeout_s,
        requested = sorted_requested.join(","),
        ordered = ordered.join(","),
        proxy = cfg.proxy.as_deref().unwrap_or(""),
        credentials = sorted_creds.join(","),
    );

    sha256_hex(encoded.as_bytes())
}
