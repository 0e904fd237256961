//! In-page expressions evaluated through `Runtime.evaluate`, and parsing of
//! their results.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use followloop_protocols::{ExtractionPage, FollowProbe, FollowState, PageControl, PageError, ScrollProgress};

pub const FOLLOW_BUTTON: &str = r#"button[data-testid$="-follow"], button[data-testid="user-follow-button"]"#;
pub const FOLLOWING_BUTTON: &str = r#"button[data-testid*="unfollow"]"#;
pub const CONFIRM_BUTTON: &str = r#"button[data-testid="confirmationSheetConfirm"]"#;
pub const FOLLOWS_YOU: &str = r#"[data-testid="userFollowIndicator"]"#;
pub const USER_CELL: &str = r#"[data-testid="UserCell"]"#;
pub const LIST_MODAL: &str = r#"[aria-label="Timeline: List members"]"#;

pub const DOCUMENT_ID: &str = "String(performance.timeOrigin)";
pub const CURRENT_URL: &str = "window.location.href";

pub fn selector(control: PageControl) -> &'static str {
    match control {
        PageControl::Follow => FOLLOW_BUTTON,
        PageControl::Following => FOLLOWING_BUTTON,
        PageControl::ConfirmUnfollow => CONFIRM_BUTTON,
    }
}

/// JSON-quote `s` for embedding in an expression.
fn js_str(s: &str) -> String {
    Value::from(s).to_string()
}

pub fn probe_follow_state() -> String {
    format!(
        r#"(() => {{
  let state = 'unknown';
  if (document.querySelector({following})) {{
    state = 'following';
  }} else if (document.querySelector({follow})) {{
    state = 'not_following';
  }} else {{
    for (const span of document.querySelectorAll('div[data-testid="primaryColumn"] button span')) {{
      if ((span.textContent || '').trim().toLowerCase() === 'following') {{
        state = 'following';
        break;
      }}
    }}
  }}
  return {{ state, followsYou: !!document.querySelector({follows_you}) }};
}})()"#,
        following = js_str(FOLLOWING_BUTTON),
        follow = js_str(FOLLOW_BUTTON),
        follows_you = js_str(FOLLOWS_YOU),
    )
}

pub fn has_control(control: PageControl) -> String {
    format!("!!document.querySelector({})", js_str(selector(control)))
}

pub fn click(control: PageControl) -> String {
    format!(
        r#"(() => {{
  const el = document.querySelector({sel});
  if (!el) return false;
  el.scrollIntoView({{ block: 'center' }});
  el.click();
  return true;
}})()"#,
        sel = js_str(selector(control)),
    )
}

/// Scroll the list (or the list-members modal) one screen towards the end.
pub fn scroll_step(page: ExtractionPage) -> String {
    format!(
        r#"(() => {{
  let box = null;
  if ({modal}) {{
    box = document.querySelector({list_modal});
    while (box && box.scrollHeight <= box.clientHeight) box = box.parentElement;
  }}
  if (box) {{
    box.scrollTop = box.scrollHeight;
  }} else {{
    window.scrollTo(0, document.body.scrollHeight);
    box = document.scrollingElement;
  }}
  const atBottom = !box || box.scrollTop + box.clientHeight >= box.scrollHeight - 2;
  return {{ loaded: document.querySelectorAll({cell}).length, atBottom }};
}})()"#,
        modal = page.scrolls_modal(),
        list_modal = js_str(LIST_MODAL),
        cell = js_str(USER_CELL),
    )
}

pub fn collect_profiles() -> String {
    format!(
        r#"Array.from(document.querySelectorAll({cell})).map((cell) => {{
  const link = cell.querySelector('a[role="link"][href^="/"]');
  if (!link) return null;
  const username = (link.getAttribute('href') || '').split('/')[1] || '';
  const name = cell.querySelector('div[data-testid*="UserName"] span span, a[role="link"] span span');
  return {{
    username,
    displayName: name ? name.textContent.trim() || null : null,
    profileUrl: link.href,
  }};
}}).filter(Boolean)"#,
        cell = js_str(USER_CELL),
    )
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawProbe {
    state: FollowState,
    #[serde(default)]
    follows_you: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawScroll {
    loaded: usize,
    at_bottom: bool,
}

pub fn parse<T: DeserializeOwned>(value: Value) -> Result<T, PageError> {
    serde_json::from_value(value).map_err(|e| PageError::InvalidResponse(e.to_string()))
}

pub fn parse_probe(value: Value) -> Result<FollowProbe, PageError> {
    let raw: RawProbe = parse(value)?;
    Ok(FollowProbe {
        state: raw.state,
        follows_you: raw.follows_you,
    })
}

pub fn parse_scroll(value: Value) -> Result<ScrollProgress, PageError> {
    let raw: RawScroll = parse(value)?;
    Ok(ScrollProgress {
        loaded: raw.loaded,
        at_bottom: raw.at_bottom,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use followloop_protocols::ProfileDraft;
    use serde_json::json;

    #[test]
    fn test_expressions_embed_quoted_selectors() {
        let expr = click(PageControl::ConfirmUnfollow);
        assert!(expr.contains(r#""button[data-testid=\"confirmationSheetConfirm\"]""#));
        assert_eq!(
            has_control(PageControl::Following),
            r#"!!document.querySelector("button[data-testid*=\"unfollow\"]")"#
        );
    }

    #[test]
    fn test_scroll_targets_modal_only_for_lists() {
        assert!(scroll_step(ExtractionPage::ListMembers).contains("if (true)"));
        assert!(scroll_step(ExtractionPage::Followers).contains("if (false)"));
    }

    #[test]
    fn test_parse_probe() {
        let probe = parse_probe(json!({"state": "not_following", "followsYou": true})).unwrap();
        assert_eq!(probe.state, FollowState::NotFollowing);
        assert!(probe.follows_you);

        assert_eq!(parse_probe(json!({"state": "unknown"})).unwrap().state, FollowState::Unknown);
        assert!(matches!(parse_probe(Value::Null), Err(PageError::InvalidResponse(_))));
    }

    #[test]
    fn test_parse_scroll_and_profiles() {
        let progress = parse_scroll(json!({"loaded": 40, "atBottom": false})).unwrap();
        assert_eq!(progress.loaded, 40);
        assert!(!progress.at_bottom);

        let profiles: Vec<ProfileDraft> = parse(json!([
            {"username": "alice", "displayName": "Alice", "profileUrl": "https://x.com/alice"},
            {"username": "bob", "displayName": null, "profileUrl": "https://x.com/bob"}
        ]))
        .unwrap();
        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[1].display_name, None);
    }
}
