//! Page automation seam.
//!
//! A [`PageDriver`] exposes the handful of one-shot probes and clicks the
//! agent needs. Polling, pacing and verification are the caller's job.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::PageError;

/// Follow relationship as shown on a profile page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowState {
    Following,
    NotFollowing,
    /// Neither indicator is visible yet.
    Unknown,
}

/// Snapshot of the follow controls on the current profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowProbe {
    pub state: FollowState,
    /// The profile shows a "Follows you" indicator.
    pub follows_you: bool,
}

impl FollowProbe {
    pub fn new(state: FollowState) -> Self {
        Self {
            state,
            follows_you: false,
        }
    }
}

/// Clickable controls the agent interacts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageControl {
    /// The "Follow" button of a profile.
    Follow,
    /// The "Following" button, which opens the unfollow confirmation.
    Following,
    /// The confirm button of the unfollow sheet.
    ConfirmUnfollow,
}

impl std::fmt::Display for PageControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PageControl::Follow => write!(f, "follow button"),
            PageControl::Following => write!(f, "following button"),
            PageControl::ConfirmUnfollow => write!(f, "unfollow confirmation"),
        }
    }
}

/// Profile list pages that support extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExtractionPage {
    Followers,
    Following,
    VerifiedFollowers,
    ListMembers,
    CommunityMembers,
}

impl ExtractionPage {
    /// Classify a URL path.
    pub fn from_path(path: &str) -> Option<Self> {
        let path = path.trim_end_matches('/');
        if path.contains("/i/lists/") && path.ends_with("/members") {
            Some(ExtractionPage::ListMembers)
        } else if path.contains("/i/communities/") && path.ends_with("/members") {
            Some(ExtractionPage::CommunityMembers)
        } else if path.ends_with("/verified_followers") {
            Some(ExtractionPage::VerifiedFollowers)
        } else if path.ends_with("/followers") {
            Some(ExtractionPage::Followers)
        } else if path.ends_with("/following") {
            Some(ExtractionPage::Following)
        } else {
            None
        }
    }

    /// Label reported back to the caller.
    pub fn label(&self) -> &'static str {
        match self {
            ExtractionPage::Followers => "Followers",
            ExtractionPage::Following => "Following",
            ExtractionPage::VerifiedFollowers => "Verified Followers",
            ExtractionPage::ListMembers => "List Members",
            ExtractionPage::CommunityMembers => "Community Members",
        }
    }

    /// List members render inside a modal with its own scroll container.
    pub fn scrolls_modal(&self) -> bool {
        matches!(self, ExtractionPage::ListMembers)
    }
}

/// Progress reported after one scroll step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScrollProgress {
    /// Profile cells currently rendered.
    pub loaded: usize,
    pub at_bottom: bool,
}

/// Profile scraped from a list page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDraft {
    pub username: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub profile_url: Option<String>,
}

/// Automation surface of one browser page.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Current location.
    async fn current_url(&self) -> Result<String, PageError>;

    /// Identity of the loaded document; changes on every navigation.
    async fn document_id(&self) -> Result<String, PageError>;

    /// Navigate and wait for the new document to load.
    async fn navigate(&self, url: &str) -> Result<(), PageError>;

    /// One-shot read of the follow controls.
    async fn probe_follow_state(&self) -> Result<FollowProbe, PageError>;

    /// Whether `control` is present and clickable.
    async fn has_control(&self, control: PageControl) -> Result<bool, PageError>;

    /// Bring `control` into view and click it. `Ok(false)` when absent.
    async fn click(&self, control: PageControl) -> Result<bool, PageError>;

    /// Scroll the list of `page` one step.
    async fn scroll_step(&self, page: ExtractionPage) -> Result<ScrollProgress, PageError>;

    /// Scrape the profiles currently rendered on `page`.
    async fn collect_profiles(&self, page: ExtractionPage) -> Result<Vec<ProfileDraft>, PageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extraction_page_detection() {
        assert_eq!(ExtractionPage::from_path("/alice/followers"), Some(ExtractionPage::Followers));
        assert_eq!(ExtractionPage::from_path("/alice/following/"), Some(ExtractionPage::Following));
        assert_eq!(
            ExtractionPage::from_path("/alice/verified_followers"),
            Some(ExtractionPage::VerifiedFollowers)
        );
        assert_eq!(
            ExtractionPage::from_path("/i/lists/123/members"),
            Some(ExtractionPage::ListMembers)
        );
        assert_eq!(
            ExtractionPage::from_path("/i/communities/42/members"),
            Some(ExtractionPage::CommunityMembers)
        );
        assert_eq!(ExtractionPage::from_path("/alice"), None);
        assert_eq!(ExtractionPage::from_path("/home"), None);
    }

    #[test]
    fn test_modal_scrolling() {
        assert!(ExtractionPage::ListMembers.scrolls_modal());
        assert!(!ExtractionPage::Followers.scrolls_modal());
    }
}
