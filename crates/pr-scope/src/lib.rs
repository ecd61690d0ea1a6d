//! Target scope decisions.
//!
//! A [`TargetScope`] is built once from the user-supplied target and then
//! consulted on the hot path for every candidate domain/route a tool adapter
//! produces. Decisions are O(1) excluding the cost of parsing the candidate
//! itself.

use pr_normalize::extract_host;

/// No public-suffix list is vendored anywhere in this workspace's dependency
/// stack, so the registrable-parent heuristic below is a plain "last two
/// labels" rule. It over-admits second-level public suffixes (`co.uk`,
/// `github.io`) by treating them as a single registrable label, which is a
/// known limitation rather than a bug: a real deployment would swap this
/// module out for a `publicsuffix`-backed implementation without touching
/// any caller.
fn registrable_parent(hostname: &str) -> String {
    let labels: Vec<&str> = hostname.split('.').collect();
    if labels.len() <= 2 {
        return hostname.to_string();
    }
    labels[labels.len() - 2..].join(".")
}

fn looks_like_ip(s: &str) -> bool {
    s.parse::<std::net::IpAddr>().is_ok()
}

/// The scope a reconnaissance run is bounded to.
///
/// `TargetScope::default()` (equivalently `TargetScope::none()`) is the nil
/// scope: it accepts everything, used by tests that don't care about
/// scoping.
#[derive(Debug, Clone, Default)]
pub struct TargetScope {
    inner: Option<ScopeInner>,
}

#[derive(Debug, Clone)]
struct ScopeInner {
    hostname: String,
    registrable: String,
    ip: Option<String>,
}

impl TargetScope {
    /// Build a scope from a raw target string. The target may be a bare
    /// hostname or an IP literal.
    #[must_use]
    pub fn new(target: &str) -> Self {
        let target = target.trim().to_lowercase();
        if target.is_empty() {
            return Self::none();
        }
        if looks_like_ip(&target) {
            return Self {
                inner: Some(ScopeInner {
                    hostname: target.clone(),
                    registrable: target.clone(),
                    ip: Some(target),
                }),
            };
        }
        let registrable = registrable_parent(&target);
        Self {
            inner: Some(ScopeInner {
                hostname: target,
                registrable,
                ip: None,
            }),
        }
    }

    /// The nil scope: admits every candidate. Used in tests and whenever a
    /// caller deliberately wants to run unscoped.
    #[must_use]
    pub fn none() -> Self {
        Self { inner: None }
    }

    #[must_use]
    pub fn hostname(&self) -> Option<&str> {
        self.inner.as_ref().map(|i| i.hostname.as_str())
    }

    #[must_use]
    pub fn registrable(&self) -> Option<&str> {
        self.inner.as_ref().map(|i| i.registrable.as_str())
    }

    /// a candidate domain is in-scope iff, once normalised, it
    /// equals the target hostname, equals the registrable parent, or is a
    /// strict suffix of it (`"."+registrable`). An IP-valued target admits
    /// only an exact match on that IP.
    #[must_use]
    pub fn allows_domain(&self, candidate: &str) -> bool {
        let Some(inner) = &self.inner else {
            return true;
        };
        let candidate = candidate.trim().to_lowercase();
        if candidate.is_empty() {
            return false;
        }
        if let Some(ip) = &inner.ip {
            return &candidate == ip;
        }
        candidate == inner.hostname
        || candidate == inner.registrable
        || candidate.ends_with(&format!(".{}", inner.registrable))
    }

    /// relative/fragment-only routes (leading `/`, `.`, `#`,
    /// `?`) are accepted unconditionally. Protocol-relative (`//host/...`)
    /// and full URLs delegate to [`TargetScope::allows_domain`] on the
    /// parsed host. A bare string with no scheme marker is treated as a
    /// domain candidate.
    #[must_use]
    pub fn allows_route(&self, candidate: &str) -> bool {
        let candidate = candidate.trim();
        if candidate.is_empty() {
            return false;
        }
        if starts_with_relative_marker(candidate) {
            return true;
        }
        if candidate.contains("://") || candidate.starts_with("//") {
            return match extract_host(candidate) {
                Some(host) => self.allows_domain(&host),
                None => false,
            };
        }
        self.allows_domain(candidate)
    }
}

fn starts_with_relative_marker(s: &str) -> bool {
    matches!(s.chars().next(), Some('/' | '.' | '#' | '?')) && !s.starts_with("//")
}
