//! Commands that attach to a browser tab.

use std::time::Duration;

use tracing::info;

use followloop_protocols::{AgentCommand, ExtractOptions};

use crate::app::{App, CliResult};

/// Host the agent on a tab until Ctrl-C, optionally starting a run first.
pub(crate) async fn run(app: &App, page: Option<&str>, start: bool) -> CliResult {
    let attached = app.attach(page).await?;
    let orchestrator = &attached.orchestrator;

    if start {
        let response = orchestrator
            .request(&attached.page, AgentCommand::StartFollowAgent)
            .await?;
        println!("{}", response.message.as_deref().unwrap_or("Agent started"));
    }

    info!("Hosting agent on tab {} (Ctrl-C to detach)", attached.page);
    orchestrator
        .watch_page(&attached.page, async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}

pub(crate) async fn extract(app: &App, page: Option<&str>, max_scrolls: u32) -> CliResult {
    let attached = app.attach(page).await?;
    let response = attached
        .orchestrator
        .request(
            &attached.page,
            AgentCommand::ExtractUsernames {
                options: ExtractOptions { max_scrolls },
            },
        )
        .await?;

    match response.extraction {
        Some(summary) => println!(
            "{}: found {}, added {}, queue now {}",
            summary.page_type, summary.found, summary.added_to_queue, summary.total_in_queue
        ),
        None => println!("{}", response.message.as_deref().unwrap_or("Extraction finished")),
    }
    Ok(())
}

pub(crate) async fn test(app: &App, page: Option<&str>, target: &str, wait_secs: u64) -> CliResult {
    let attached = app.attach(page).await?;
    let report = attached
        .orchestrator
        .run_scripted_test(&attached.page, target, Duration::from_secs(wait_secs))
        .await?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    println!("{}", if report.passed() { "PASSED" } else { "FAILED" });
    Ok(())
}

pub(crate) async fn diagnose(app: &App, page: Option<&str>) -> CliResult {
    let attached = app.attach(page).await?;
    let diagnosis = attached.orchestrator.diagnose(&attached.page).await?;
    println!("{}", serde_json::to_string_pretty(&diagnosis)?);
    if !diagnosis.on_site {
        println!("Please navigate to Twitter/X first");
    }
    Ok(())
}
