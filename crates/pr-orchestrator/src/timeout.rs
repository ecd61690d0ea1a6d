//! Adaptive per-stage timeout computation and the
//! `ORCHESTRATOR_GROUP_CONCURRENCY` override parser.

use std::collections::BTreeMap;

use pr_config::Config;

const MIN_TIMEOUT_S: u64 = 30;
const MAX_TIMEOUT_S: u64 = 1200;

/// `T = cfg.tool_timeouts[name]` if set, else `base + dynamic(name, state)`
/// where `base = max(cfg.timeout_s, 120)`. Always clamped to `[30, 1200]`,
/// including an explicit per-tool override.
#[must_use]
pub fn compute(cfg: &Config, stage: &str, deduped_domain_count: usize) -> u64 {
    if let Some(&explicit) = cfg.tool_timeouts.get(stage) {
        return explicit.clamp(MIN_TIMEOUT_S, MAX_TIMEOUT_S);
    }

    let base = cfg.timeout_s.max(120);
    let domains = deduped_domain_count as u64;
    let workers = cfg.workers.max(1) as u64;

    let dynamic = match stage {
        "waybackurls" => (domains / 20).min(600),
        "gau" => (domains / 15).min(600),
        "httpx" => (domains / (workers * 2)).min(900),
        "linkfinderevo" => 300,
        _ => 0,
    };

    (base + dynamic).clamp(MIN_TIMEOUT_S, MAX_TIMEOUT_S)
}

/// Parse `ORCHESTRATOR_GROUP_CONCURRENCY="group=N,other=M"` into a
/// group-name → cap table. Malformed pairs (no `=`, non-numeric value) are
/// silently skipped rather than failing the whole parse.
#[must_use]
pub fn parse_group_concurrency_env(raw: &str) -> BTreeMap<String, usize> {
    raw.split(',')
        .filter_map(|pair| {
            let (name, count) = pair.split_once('=')?;
            let count: usize = count.trim().parse().ok()?;
            Some((name.trim().to_string(), count.max(1)))
        })
        .collect()
}

/// Resolve the concurrency cap for a phase: the env override for `group`
/// (read from `ORCHESTRATOR_GROUP_CONCURRENCY` if set) if present, else the
/// phase's own stage count.
#[must_use]
pub fn group_concurrency(group: Option<&str>, stage_count: usize, overrides: &BTreeMap<String, usize>) -> usize {
    group
        .and_then(|g| overrides.get(g).copied())
        .unwrap_or(stage_count)
        .max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> Config {
        Config::new("example.com", ".")
    }

    #[test]
    fn explicit_override_wins_over_dynamic_formula() {
        let mut c = cfg();
        c.tool_timeouts.insert("httpx".to_string(), 999);
        assert_eq!(compute(&c, "httpx", 10_000), 999);
    }

    #[test]
    fn explicit_override_is_still_clamped() {
        let mut c = cfg();
        c.tool_timeouts.insert("httpx".to_string(), 5);
        assert_eq!(compute(&c, "httpx", 0), MIN_TIMEOUT_S);
        c.tool_timeouts.insert("httpx".to_string(), 99_999);
        assert_eq!(compute(&c, "httpx", 0), MAX_TIMEOUT_S);
    }

    #[test]
    fn waybackurls_scales_with_domain_count() {
        let c = cfg();
        assert_eq!(compute(&c, "waybackurls", 1_000), 120 + 50);
    }

    #[test]
    fn waybackurls_dynamic_component_caps_at_600() {
        let c = cfg();
        assert_eq!(compute(&c, "waybackurls", 1_000_000), MAX_TIMEOUT_S);
    }

    #[test]
    fn gau_uses_its_own_divisor() {
        let c = cfg();
        assert_eq!(compute(&c, "gau", 1_000), 120 + (1000 / 15));
    }

    #[test]
    fn httpx_scales_with_worker_count() {
        let mut c = cfg();
        c.workers = 2;
        assert_eq!(compute(&c, "httpx", 400), 120 + (400 / 4));
    }

    #[test]
    fn linkfinderevo_gets_flat_bonus() {
        let c = cfg();
        assert_eq!(compute(&c, "linkfinderevo", 0), 120 + 300);
    }

    #[test]
    fn stages_outside_the_formula_table_get_base_only() {
        let c = cfg();
        assert_eq!(compute(&c, "rdap", 5_000), 120);
    }

    #[test]
    fn base_below_120_is_raised_to_120() {
        let mut c = cfg();
        c.timeout_s = 10;
        assert_eq!(compute(&c, "rdap", 0), 120);
    }

    #[test]
    fn every_stage_timeout_lands_in_clamp_range() {
        let c = cfg();
        for stage in crate::stages::PIPELINE {
            let t = compute(&c, stage.name, 50_000);
            assert!((MIN_TIMEOUT_S..=MAX_TIMEOUT_S).contains(&t), "{}: {t}", stage.name);
        }
    }

    #[test]
    fn group_concurrency_env_parses_multiple_pairs() {
        let overrides = parse_group_concurrency_env("subdomain-sources=2,cert-sources=1");
        assert_eq!(overrides.get("subdomain-sources"), Some(&2));
        assert_eq!(overrides.get("cert-sources"), Some(&1));
    }

    #[test]
    fn group_concurrency_env_skips_malformed_pairs() {
        let overrides = parse_group_concurrency_env("nocommaequalshere,valid=3,bogus=abc");
        assert_eq!(overrides.len(), 1);
        assert_eq!(overrides.get("valid"), Some(&3));
    }

    #[test]
    fn group_concurrency_defaults_to_stage_count_without_override() {
        let overrides = BTreeMap::new();
        assert_eq!(group_concurrency(Some("subdomain-sources"), 4, &overrides), 4);
    }

    #[test]
    fn group_concurrency_override_takes_precedence() {
        let mut overrides = BTreeMap::new();
        overrides.insert("subdomain-sources".to_string(), 1);
        assert_eq!(group_concurrency(Some("subdomain-sources"), 4, &overrides), 1);
    }
}
