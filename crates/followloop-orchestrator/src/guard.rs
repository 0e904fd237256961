//! Page URL checks applied before anything is injected or relayed.

use url::Url;

use followloop_agent::machine::is_allowed_host;

use crate::error::{OrchestratorError, OrchestratorResult};

const SYSTEM_SCHEMES: [&str; 5] = ["chrome", "edge", "about", "chrome-extension", "devtools"];

/// Reject browser-internal pages and pages outside `allowed_hosts`.
pub fn check_page_url(url: &str, allowed_hosts: &[String]) -> OrchestratorResult<()> {
    let parsed = Url::parse(url).map_err(|_| OrchestratorError::WrongSite)?;
    if SYSTEM_SCHEMES.contains(&parsed.scheme()) {
        return Err(OrchestratorError::SystemPage);
    }
    match parsed.host_str() {
        Some(host) if is_allowed_host(host, allowed_hosts) => Ok(()),
        _ => Err(OrchestratorError::WrongSite),
    }
}

/// Single-segment profile path, e.g. `/alice`.
pub fn is_profile_path(path: &str) -> bool {
    let Some(name) = path.strip_prefix('/') else {
        return false;
    };
    let name = name.strip_suffix('/').unwrap_or(name);
    (1..=15).contains(&name.len()) && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hosts() -> Vec<String> {
        vec!["x.com".to_string(), "twitter.com".to_string()]
    }

    #[test]
    fn test_system_pages_rejected() {
        let err = check_page_url("chrome://extensions", &hosts()).unwrap_err();
        assert_eq!(err.to_string(), "Cannot run on browser system pages");
        assert!(matches!(
            check_page_url("about:blank", &hosts()),
            Err(OrchestratorError::SystemPage)
        ));
    }

    #[test]
    fn test_other_sites_rejected() {
        let err = check_page_url("https://example.com/alice", &hosts()).unwrap_err();
        assert_eq!(err.to_string(), "Please navigate to Twitter/X first");
        assert!(matches!(check_page_url("not a url", &hosts()), Err(OrchestratorError::WrongSite)));
    }

    #[test]
    fn test_allowed_hosts_pass() {
        assert!(check_page_url("https://x.com/alice", &hosts()).is_ok());
        assert!(check_page_url("https://mobile.twitter.com/home", &hosts()).is_ok());
    }

    #[test]
    fn test_profile_path() {
        assert!(is_profile_path("/alice"));
        assert!(is_profile_path("/alice_99/"));
        assert!(!is_profile_path("/alice/followers"));
        assert!(!is_profile_path("/"));
        assert!(!is_profile_path("/this_name_is_too_long"));
    }
}
