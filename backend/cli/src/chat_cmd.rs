//! `solarops-chat chat`: interactive session against one site.

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use solarops_assistant::{
    AssistantController, AssistantHandle, ControllerSettings, HttpCredentialProvider,
    ReconnectBackoff, WsConnector,
};
use solarops_config::AssistantConfig;
use solarops_core::SiteId;

use crate::repl::{self, ReplInput, HELP};
use crate::terminal_output::{note_info, note_warn, supports_color, SnapshotRenderer};

pub async fn run(config: AssistantConfig, site_id: SiteId) -> Result<()> {
    let provider = HttpCredentialProvider::new(config.api_base_url(), config.request_timeout())
        .context("Failed to build HTTP client")?
        .with_api_token(config.api_token.clone());
    let connector = WsConnector::new(ReconnectBackoff::from(&config.reconnect()));
    let settings = ControllerSettings::from_config(&config)?;

    let (handle, mut navigations, task) =
        AssistantController::spawn(site_id, provider, connector, settings);
    info!(%site_id, "Chat client started");

    let mut current_path = format!("/sites/{site_id}");
    note_info(&format!("Site {site_id} at {current_path}. Commands: {HELP}"));

    let mut snapshots = handle.subscribe();
    let mut renderer = SnapshotRenderer::new(supports_color());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    handle.open_chat().await?;

    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                for line in renderer.render(&snapshot) {
                    println!("{line}");
                }
            }
            Some(path) = navigations.recv() => {
                current_path = path;
                note_info(&format!("Now at {current_path}"));
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                if !handle_line(&handle, &line, &current_path).await? {
                    break;
                }
            }
        }
    }

    let _ = handle.shutdown().await;
    let _ = task.await;
    Ok(())
}

/// Returns `false` when the user asked to quit.
async fn handle_line(handle: &AssistantHandle, line: &str, current_path: &str) -> Result<bool> {
    match repl::parse_line(line) {
        ReplInput::Blank => {}
        ReplInput::Open => handle.open_chat().await?,
        ReplInput::Collapse => handle.collapse_chat().await?,
        ReplInput::Reset => handle.request_reset().await?,
        ReplInput::Close => handle.request_close().await?,
        ReplInput::Goto(target) => {
            let to = repl::resolve_path(current_path, &target);
            handle.navigate(current_path, to).await?;
        }
        ReplInput::Yes => handle.confirm().await?,
        ReplInput::No => handle.cancel().await?,
        ReplInput::Quit => return Ok(false),
        ReplInput::Text(text) => {
            let snapshot = handle.snapshot();
            if !snapshot.can_submit {
                note_warn(&format!(
                    "The assistant is not ready ({}, {}); try again shortly.",
                    snapshot.readiness, snapshot.status
                ));
            } else {
                handle.set_draft(text.clone()).await?;
                handle.submit(text).await?;
            }
        }
        ReplInput::Unknown(raw) => note_warn(&format!("Unknown command {raw}. {HELP}")),
    }
    Ok(true)
}
