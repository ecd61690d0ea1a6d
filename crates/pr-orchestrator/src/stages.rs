//! The declared pipeline: stage order, groups, and tool selection.
//!
//! `PIPELINE` is the single source of truth for execution order. Grouping
//! stages into concurrent phases, computing preconditions, and deriving
//! timeouts all read from this table rather than duplicating stage names
//! elsewhere.

use std::collections::HashSet;

/// One row of the declared pipeline table.
#[derive(Debug, Clone, Copy)]
pub struct StageDef {
    pub name: &'static str,
    /// Consecutive stages sharing a group execute concurrently as one phase.
    pub group: Option<&'static str>,
    pub active_only: bool,
    /// Whether a successful run of this stage should mark `domains_dirty`,
    /// invalidating a would-be `dedupe` cache reuse.
    pub produces_domains: bool,
}

pub const PIPELINE: &[StageDef] = &[
    StageDef {
        name: "amass",
        group: Some("subdomain-sources"),
        active_only: false,
        produces_domains: true,
    },
    StageDef {
        name: "subfinder",
        group: Some("subdomain-sources"),
        active_only: false,
        produces_domains: true,
    },
    StageDef {
        name: "assetfinder",
        group: Some("subdomain-sources"),
        active_only: false,
        produces_domains: true,
    },
    StageDef {
        name: "rdap",
        group: Some("subdomain-sources"),
        active_only: false,
        produces_domains: false,
    },
    StageDef {
        name: "crtsh",
        group: Some("cert-sources"),
        active_only: false,
        produces_domains: true,
    },
    StageDef {
        name: "censys",
        group: Some("cert-sources"),
        active_only: false,
        produces_domains: true,
    },
    StageDef {
        name: "dedupe",
        group: None,
        active_only: false,
        produces_domains: false,
    },
    StageDef {
        name: "dnsx",
        group: None,
        active_only: true,
        produces_domains: false,
    },
    StageDef {
        name: "waybackurls",
        group: Some("archive-sources"),
        active_only: false,
        produces_domains: false,
    },
    StageDef {
        name: "gau",
        group: Some("archive-sources"),
        active_only: false,
        produces_domains: false,
    },
    StageDef {
        name: "httpx",
        group: None,
        active_only: true,
        produces_domains: false,
    },
    StageDef {
        name: "subjs",
        group: None,
        active_only: true,
        produces_domains: false,
    },
    StageDef {
        name: "linkfinderevo",
        group: None,
        active_only: true,
        produces_domains: false,
    },
];

/// Stages the scope-mode short-circuit skips when subdomain enumeration
/// isn't wanted.
pub const SCOPE_DOMAIN_SKIP: &[&str] = &["amass", "subfinder", "assetfinder", "rdap"];

#[must_use]
pub fn lookup(name: &str) -> Option<&'static StageDef> {
    PIPELINE.iter().find(|s| s.name == name)
}

/// The outcome of resolving a user-requested tool list against the declared
/// pipeline: the known stages in declared execution order, and every
/// unrecognised name, deduplicated and in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub ordered: Vec<String>,
    pub unknown: Vec<String>,
}

/// Lowercase/trim `requested`, force-add `dedupe` if `waybackurls` or `gau`
/// was asked for, then split into known stages (declared order) and unknown
/// names (first-seen order, passed through to run last).
#[must_use]
pub fn select(requested: &[String]) -> Selection {
    let mut wanted: Vec<String> = requested
        .iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();

    let wants_archive = wanted.iter().any(|t| t == "waybackurls" || t == "gau");
    if wants_archive && !wanted.iter().any(|t| t == "dedupe") {
        wanted.push("dedupe".to_string());
    }

    let wanted_set: HashSet<&str> = wanted.iter().map(String::as_str).collect();
    let ordered: Vec<String> = PIPELINE
        .iter()
        .map(|s| s.name)
        .filter(|name| wanted_set.contains(name))
        .map(str::to_string)
        .collect();

    let mut seen = HashSet::new();
    let unknown: Vec<String> = wanted
        .into_iter()
        .filter(|t| lookup(t).is_none() && seen.insert(t.clone()))
        .collect();

    Selection { ordered, unknown }
}

/// A contiguous run of stages from the selection that execute as one phase:
/// either a single ungrouped stage, or every consecutive stage sharing the
/// same declared group.
#[derive(Debug, Clone)]
pub struct Phase {
    pub group: Option<&'static str>,
    pub stages: Vec<&'static StageDef>,
}

/// Partition `ordered` (already filtered to known stage names, in declared
/// order) into phases. Grouping only merges stages that are *consecutive* in
/// the selection and share a group name, matching "group execution" in the
/// pipeline driver's contract.
#[must_use]
pub fn build_phases(ordered: &[String]) -> Vec<Phase> {
    let mut phases: Vec<Phase> = Vec::new();
    for name in ordered {
        let Some(def) = lookup(name) else { continue };
        match phases.last_mut() {
            Some(phase) if phase.group.is_some() && phase.group == def.group => {
                phase.stages.push(def);
            }
            _ => phases.push(Phase {
                group: def.group,
                stages: vec![def],
            }),
        }
    }
    phases
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_preserves_declared_order_regardless_of_request_order() {
        let selection = select(&["crtsh".into(), "amass".into(), "dedupe".into()]);
        assert_eq!(selection.ordered, vec!["amass", "crtsh", "dedupe"]);
    }

    #[test]
    fn waybackurls_force_adds_dedupe() {
        let selection = select(&["waybackurls".into()]);
        assert!(selection.ordered.contains(&"dedupe".to_string()));
    }

    #[test]
    fn gau_force_adds_dedupe() {
        let selection = select(&["gau".into()]);
        assert!(selection.ordered.contains(&"dedupe".to_string()));
    }

    #[test]
    fn dedupe_not_duplicated_when_already_requested() {
        let selection = select(&["gau".into(), "dedupe".into()]);
        assert_eq!(selection.ordered.iter().filter(|s| *s == "dedupe").count(), 1);
    }

    #[test]
    fn unknown_names_are_collected_and_deduplicated() {
        let selection = select(&["foo".into(), "crtsh".into(), "foo".into(), "bar".into()]);
        assert_eq!(selection.unknown, vec!["foo".to_string(), "bar".to_string()]);
        assert_eq!(selection.ordered, vec!["crtsh".to_string()]);
    }

    #[test]
    fn whitespace_and_case_are_normalised() {
        let selection = select(&[" CrtSh ".into(), "  ".into()]);
        assert_eq!(selection.ordered, vec!["crtsh".to_string()]);
    }

    #[test]
    fn consecutive_grouped_stages_form_one_phase() {
        let selection = select(&["amass".into(), "subfinder".into(), "rdap".into()]);
        let phases = build_phases(&selection.ordered);
        assert_eq!(phases.len(), 1);
        assert_eq!(phases[0].stages.len(), 3);
    }

    #[test]
    fn non_consecutive_same_group_members_still_split_by_intervening_ungrouped_stage() {
        // amass (subdomain-sources), dedupe (ungrouped), crtsh (cert-sources):
        // the declared order never interleaves two different groups without
        // an ungrouped stage between them, but this still exercises the
        // boundary logic stage-by-stage.
        let selection = select(&["amass".into(), "dedupe".into(), "crtsh".into()]);
        let phases = build_phases(&selection.ordered);
        assert_eq!(phases.len(), 3);
    }

    #[test]
    fn ungrouped_stage_is_its_own_singleton_phase() {
        let selection = select(&["dedupe".into(), "dnsx".into()]);
        let phases = build_phases(&selection.ordered);
        assert_eq!(phases.len(), 2);
        assert_eq!(phases[0].stages.len(), 1);
        assert_eq!(phases[1].stages.len(), 1);
    }
}
