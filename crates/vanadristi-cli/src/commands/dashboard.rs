//! Dashboard command, one-shot or live.

use anyhow::{Context, Result};
use serde_json::{Value, json};
use time::OffsetDateTime;
use time::macros::format_description;
use tracing::debug;
use vanadristi_core::queries::{GetLatestAnalysis, GetPlants};
use vanadristi_core::{Dashboard, Query};

use super::CommandContext;
use crate::cli::OutputFormat;
use crate::format::format_dashboard_text;
use crate::util::{with_spinner, write_output};

pub async fn cmd_dashboard(
    ctx: &CommandContext<'_>,
    watch: bool,
    interval: Option<u64>,
) -> Result<()> {
    if watch {
        return watch_dashboard(ctx, interval).await;
    }

    let dashboard = with_spinner("Loading dashboard...", ctx.quiet, Dashboard::load(ctx.client))
        .await
        .context("Failed to load the dashboard")?;
    ctx.render(&dashboard_json(&dashboard), || {
        format_dashboard_text(&dashboard, ctx.opts)
    })
}

/// Redraw whenever either panel settles, until Ctrl+C.
async fn watch_dashboard(ctx: &CommandContext<'_>, interval: Option<u64>) -> Result<()> {
    let interval = ctx.config.refetch_interval(interval);
    let mut plants = ctx.client.observe(GetPlants.with_refetch_interval(interval));
    let mut analysis = ctx
        .client
        .observe(GetLatestAnalysis.with_refetch_interval(interval));

    if !ctx.quiet {
        eprintln!(
            "Refreshing every {}s | Press Ctrl+C to stop",
            interval.as_secs()
        );
    }

    let mut last: Option<Dashboard> = None;
    loop {
        let (plants_state, analysis_state) = (plants.state(), analysis.state());
        if !plants_state.is_loading() && !analysis_state.is_loading() {
            let dashboard = Dashboard::from_states(plants_state, analysis_state);
            if last.as_ref() != Some(&dashboard) {
                let content = match ctx.format {
                    OutputFormat::Json => {
                        let mut value = dashboard_json(&dashboard);
                        value["updated_at"] = json!(updated_at());
                        format!("{}\n", serde_json::to_string(&value)?)
                    }
                    OutputFormat::Text => format!(
                        "{}Updated {}\n\n",
                        format_dashboard_text(&dashboard, ctx.opts),
                        updated_at()
                    ),
                };
                write_output(ctx.output, &content)?;
                last = Some(dashboard);
            }
        }

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                eprintln!("\nShutting down...");
                return Ok(());
            }
            alive = plants.changed() => if !alive {
                debug!("Plants observer ended");
                return Ok(());
            },
            alive = analysis.changed() => if !alive {
                debug!("Analysis observer ended");
                return Ok(());
            },
        }
    }
}

fn updated_at() -> String {
    let format = format_description!("[hour]:[minute]:[second] UTC");
    OffsetDateTime::now_utc().format(&format).unwrap_or_default()
}

fn dashboard_json(dashboard: &Dashboard) -> Value {
    json!({
        "plant_count": dashboard.plant_count(),
        "plants": dashboard.plants.items(),
        "latest_analysis": dashboard.latest_analysis.value(),
        "diagnosis": dashboard.diagnosis().map(|kind| kind.to_string()),
    })
}
