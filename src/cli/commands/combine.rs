//! `combine`: one engine run

use super::cancel_on_ctrl_c;
use crate::config::EngineConfig;
use crate::engine::{CombineRequest, Engine};
use anyhow::{Context, Result};

pub async fn run_combine(
    config: EngineConfig,
    location: String,
    date: String,
    classes: Vec<String>,
    json: bool,
) -> Result<()> {
    let engine = Engine::new(config)?;
    let request = CombineRequest::new(location, date).with_classes(classes);
    let cancel = cancel_on_ctrl_c();

    let report = engine.combine(&request, &cancel).await?;

    if json {
        let body = serde_json::to_string_pretty(&report).context("Failed to encode run report")?;
        println!("{}", body);
    } else {
        println!("{}", report);
    }
    Ok(())
}
