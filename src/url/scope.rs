use crate::config::ScopePolicy;
use crate::url::domain::{extract_host, host_and_port, registrable_domain};
use url::Url;

/// Decides whether `candidate` may be crawled from `seed` under `policy`
///
/// Pure function: no state, safe to call from anywhere. Both URLs are expected to be
/// normalized. URLs without a host (local files) are never in scope.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use webdown::config::ScopePolicy;
/// use webdown::url::in_scope;
///
/// let seed = Url::parse("https://example.com/docs/").unwrap();
/// let blog = Url::parse("https://blog.example.com/").unwrap();
///
/// assert!(in_scope(&blog, &seed, &ScopePolicy::SameDomain));
/// assert!(!in_scope(&blog, &seed, &ScopePolicy::SameSubdomain));
/// ```
pub fn in_scope(candidate: &Url, seed: &Url, policy: &ScopePolicy) -> bool {
    match policy {
        ScopePolicy::SameDomain => match (extract_host(candidate), extract_host(seed)) {
            (Some(c), Some(s)) => registrable_domain(&c) == registrable_domain(&s),
            _ => false,
        },
        ScopePolicy::SameSubdomain => same_host(candidate, seed),
        ScopePolicy::PathPrefix(prefix) => {
            same_host(candidate, seed) && candidate.path().starts_with(prefix.as_str())
        }
    }
}

fn same_host(candidate: &Url, seed: &Url) -> bool {
    match (host_and_port(candidate), host_and_port(seed)) {
        (Some(c), Some(s)) => c == s,
        _ => false,
    }
}
