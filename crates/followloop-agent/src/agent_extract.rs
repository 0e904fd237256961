//! Profile extraction from follower, following and member lists.

use std::collections::HashSet;

use chrono::Utc;
use tokio::time::sleep;
use tracing::{debug, info};
use url::Url;

use followloop_protocols::{
    ExtractOptions, ExtractSummary, ExtractionPage, ProfileDraft, UserRecord, is_valid_username,
};

use crate::agent::FollowAgent;
use crate::error::{AgentError, AgentResult};

impl FollowAgent {
    /// Scroll the current list page, collect every profile and enqueue the new ones.
    pub async fn extract(&self, options: ExtractOptions) -> AgentResult<ExtractSummary> {
        let url = self.page.current_url().await?;
        let page_type = Url::parse(&url)
            .ok()
            .and_then(|u| ExtractionPage::from_path(u.path()))
            .ok_or_else(|| AgentError::UnsupportedPage(url.clone()))?;
        info!("Extracting {} from {}", page_type.label(), url);

        let mut seen = HashSet::new();
        let mut profiles: Vec<ProfileDraft> = Vec::new();
        let mut stalls = 0;

        for scroll in 0..options.max_scrolls {
            let added = collect_new(&mut seen, &mut profiles, self.page.collect_profiles(page_type).await?);
            let progress = self.page.scroll_step(page_type).await?;
            sleep(self.config.extraction_scroll()).await;

            if added == 0 {
                stalls += 1;
            } else {
                stalls = 0;
            }
            debug!(
                "Scroll {}: {} profiles ({} rendered), {} stalls",
                scroll + 1,
                profiles.len(),
                progress.loaded,
                stalls
            );
            if stalls >= self.config.extraction_stall_limit {
                debug!("No new profiles after {} scrolls, stopping", stalls);
                break;
            }
        }
        collect_new(&mut seen, &mut profiles, self.page.collect_profiles(page_type).await?);

        let now = Utc::now();
        let found = profiles.len();
        let records: Vec<UserRecord> = profiles
            .into_iter()
            .map(|draft| {
                let profile_url = draft
                    .profile_url
                    .unwrap_or_else(|| self.browser.profile_url(&draft.username));
                let mut record = UserRecord::new(draft.username)
                    .with_profile_url(profile_url)
                    .extracted(now);
                record.display_name = draft.display_name;
                record
            })
            .collect();

        let added_to_queue = self.queue.enqueue_if_new(records).await?;
        let total_in_queue = self.queue.list().await?.len();
        info!(
            "Extraction found {} profiles, {} new, queue now {}",
            found, added_to_queue, total_in_queue
        );

        Ok(ExtractSummary {
            found,
            added_to_queue,
            total_in_queue,
            page_type: page_type.label().to_string(),
        })
    }
}

/// Append valid, unseen profiles. Returns how many were added.
fn collect_new(seen: &mut HashSet<String>, profiles: &mut Vec<ProfileDraft>, batch: Vec<ProfileDraft>) -> usize {
    let before = profiles.len();
    for draft in batch {
        if is_valid_username(&draft.username) && seen.insert(draft.username.to_ascii_lowercase()) {
            profiles.push(draft);
        }
    }
    profiles.len() - before
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(name: &str) -> ProfileDraft {
        ProfileDraft {
            username: name.to_string(),
            display_name: None,
            profile_url: None,
        }
    }

    #[test]
    fn test_collect_new_dedupes_and_validates() {
        let mut seen = HashSet::new();
        let mut profiles = Vec::new();
        let added = collect_new(
            &mut seen,
            &mut profiles,
            vec![draft("alice"), draft("Alice"), draft("not valid!"), draft("bob")],
        );
        assert_eq!(added, 2);
        assert_eq!(collect_new(&mut seen, &mut profiles, vec![draft("bob")]), 0);
        assert_eq!(profiles.len(), 2);
    }
}
