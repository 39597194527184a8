//! `solarops-chat config`: show the effective configuration with secrets masked.

use std::path::Path;

use anyhow::Result;

pub async fn run(path: &Path) -> Result<()> {
    let config = solarops_config::load_and_prepare(path).await?;
    println!("# {}", path.display());
    println!("{}", serde_json::to_string_pretty(&solarops_config::redact(&config))?);
    Ok(())
}
