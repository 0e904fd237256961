//! Commands that only touch the store.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::{MissedTickBehavior, interval};
use tracing::info;

use followloop_config::{BrowserConfig, SettingsValidator};
use followloop_protocols::{RunState, UserRecord};
use followloop_queue::QueueMetrics;

use crate::app::{App, CliResult};
use crate::cli::{QueueAction, SettingsAction};

/// Persist the stop. A hosted agent notices at its next check.
pub(crate) async fn stop(app: &App) -> CliResult {
    let state = app.store.update_run_state(RunState::stop).await?;
    info!("Stop requested");
    println!("Agent stopped successfully");
    print_state(&state, Utc::now());
    Ok(())
}

pub(crate) async fn status(app: &App, watch: Option<u64>) -> CliResult {
    let Some(secs) = watch else {
        print_state(&app.store.run_state().await?, Utc::now());
        return Ok(());
    };

    let mut ticker = interval(Duration::from_secs(secs.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => return Ok(()),
            _ = ticker.tick() => {
                println!("--- {} ---", Utc::now().format("%H:%M:%S"));
                print_state(&app.store.run_state().await?, Utc::now());
            }
        }
    }
}

pub(crate) async fn queue(app: &App, action: QueueAction) -> CliResult {
    let queue = app.queue();
    match action {
        QueueAction::List => {
            let records = queue.list().await?;
            if records.is_empty() {
                println!("Queue is empty");
            }
            for record in &records {
                println!("{}", describe(record));
            }
        }
        QueueAction::Add { usernames } => {
            let records = parse_usernames(&usernames, &app.config.browser)?;
            let added = queue.enqueue_if_new(records).await?;
            println!("Added {} of {} to the queue", added, usernames.len());
        }
        QueueAction::Remove { username } => {
            if queue.remove(normalize(&username)).await? {
                println!("Removed @{}", normalize(&username));
            } else {
                println!("@{} is not queued", normalize(&username));
            }
        }
        QueueAction::Clear => {
            let removed = queue.clear().await?;
            println!("Removed {} queued accounts", removed);
        }
    }
    Ok(())
}

pub(crate) async fn history(app: &App, active: bool) -> CliResult {
    let history = app.queue().history().await?;
    let shown: Vec<&UserRecord> = history
        .iter()
        .filter(|r| !active || r.is_active_follow())
        .collect();
    if shown.is_empty() {
        println!("No history");
    }
    for record in shown {
        println!("{}", describe(record));
    }
    Ok(())
}

pub(crate) async fn settings(app: &App, action: SettingsAction) -> CliResult {
    let settings = match action {
        SettingsAction::Show => app.store.settings().await?,
        SettingsAction::Set { key, value } => {
            let mut updated = SettingsValidator::apply(&app.store.settings().await?, &key, &value)?;
            updated.last_updated = Some(Utc::now());
            app.store.save_settings(&updated).await?;
            info!("Setting {} changed to {}", key, value);
            updated
        }
        SettingsAction::Reset => {
            let mut defaults = app.config.defaults.clone();
            defaults.last_updated = Some(Utc::now());
            app.store.save_settings(&defaults).await?;
            defaults
        }
    };
    println!("{}", serde_json::to_string_pretty(&settings)?);
    Ok(())
}

pub(crate) async fn metrics(app: &App) -> CliResult {
    let snapshot = app.store.snapshot().await?;
    let metrics = QueueMetrics::compute(&snapshot.queue, &snapshot.history, Utc::now());
    println!("Last 24h:  +{} / -{} (net {})", metrics.follows_24h, metrics.unfollows_24h, metrics.net_24h);
    println!("Lifetime:  {} follows, {} unfollows", metrics.total_follows, metrics.total_unfollows);
    println!("Active:    {}", metrics.active_follows);
    println!("Queued:    {}", metrics.queued);
    Ok(())
}

pub(crate) async fn errors(app: &App) -> CliResult {
    let state = app.store.run_state().await?;
    if state.errors.is_empty() {
        println!("No errors logged");
    }
    for entry in state.errors.iter().rev() {
        println!("{} [{}] {}", entry.time.format("%Y-%m-%d %H:%M:%S"), entry.context, entry.message);
    }
    Ok(())
}

pub(crate) async fn init(app: &App) -> CliResult {
    app.store.initialize(&app.config.defaults).await?;
    println!("Store initialized at {}", app.config.storage.resolved_path().display());
    Ok(())
}

fn normalize(username: &str) -> &str {
    username.trim().trim_start_matches('@')
}

/// Validate handles and build queue records for them.
fn parse_usernames(usernames: &[String], browser: &BrowserConfig) -> CliResult<Vec<UserRecord>> {
    usernames
        .iter()
        .map(|raw| {
            let username = normalize(raw);
            SettingsValidator::validate_username(username)?;
            Ok(UserRecord::new(username).with_profile_url(browser.profile_url(username)))
        })
        .collect()
}

fn describe(record: &UserRecord) -> String {
    let mut line = format!("@{}", record.username);
    if let Some(name) = &record.display_name {
        line.push_str(&format!(" ({})", name));
    }
    if let Some(at) = record.followed_at {
        line.push_str(&format!("  followed {}", at.format("%Y-%m-%d %H:%M")));
    }
    if let Some(at) = record.unfollowed_at {
        line.push_str(&format!("  unfollowed {}", at.format("%Y-%m-%d %H:%M")));
    }
    line
}

fn print_state(state: &RunState, now: DateTime<Utc>) {
    println!("{}", state_summary(state, now));
}

fn state_summary(state: &RunState, now: DateTime<Utc>) -> String {
    let mut lines = vec![format!(
        "Running:   {}",
        if state.is_running { "yes" } else { "no" }
    )];
    if let Some(user) = &state.current_user {
        lines.push(format!("Current:   @{}", user));
    }
    let hour = state.current_hour(now);
    lines.push(format!("Today:     {} follows", state.follows_today(now)));
    lines.push(format!(
        "This hour: {} follows, {} unfollows",
        hour.follow_count, hour.unfollow_count
    ));
    lines.push(format!(
        "Session:   {} actions, {} consecutive errors",
        state.session_action_count, state.consecutive_errors
    ));
    if let Some(last) = state.last_error() {
        lines.push(format!("Last error: {}", last.message));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_usernames() {
        let browser = BrowserConfig::default();
        let records = parse_usernames(&["@alice".to_string(), " bob ".to_string()], &browser).unwrap();
        assert_eq!(records[0].username, "alice");
        assert_eq!(records[1].profile_url.as_deref(), Some("https://x.com/bob"));

        assert!(parse_usernames(&["not valid!".to_string()], &browser).is_err());
    }

    #[test]
    fn test_state_summary() {
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap();
        let mut state = RunState::default();
        state.begin(now, "tab-1", Some("alice".to_string()));
        state.record_follow(now);

        let summary = state_summary(&state, now);
        assert!(summary.contains("Running:   yes"));
        assert!(summary.contains("Current:   @alice"));
        assert!(summary.contains("Today:     1 follows"));
    }

    #[test]
    fn test_describe_record() {
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap();
        let mut record = UserRecord::new("alice").with_display_name("Alice");
        record.mark_followed(now);
        assert_eq!(describe(&record), "@alice (Alice)  followed 2026-03-02 12:00");
    }
}
