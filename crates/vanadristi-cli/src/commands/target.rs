//! Observation target commands.

use anyhow::{Context, Result};
use serde_json::json;
use tracing::debug;
use vanadristi_core::TargetSelection;
use vanadristi_core::queries::{GetObservationTarget, GetPlant};

use super::CommandContext;
use crate::cli::TargetAction;
use crate::format::format_target_text;
use crate::util::{select_plant, with_spinner};

pub async fn cmd_target(ctx: &CommandContext<'_>, action: TargetAction) -> Result<()> {
    match action {
        TargetAction::Show => {
            let target = with_spinner(
                "Loading observation target...",
                ctx.quiet,
                ctx.client.fetch(&GetObservationTarget),
            )
            .await
            .context("Failed to load the observation target")?;

            let id = (*target).as_ref().map(|t| t.id.clone());
            // The name is a nicety; the target may point at a deleted plant.
            let plant = match &id {
                Some(id) => match ctx.client.fetch(&GetPlant::new(id)).await {
                    Ok(plant) => Some(plant),
                    Err(e) => {
                        debug!("Target plant lookup failed: {}", e);
                        None
                    }
                },
                None => None,
            };

            ctx.render(&*target, || {
                format_target_text(plant.as_deref(), id.as_deref(), ctx.opts)
            })
        }
        TargetAction::Set { id } => {
            let id = match id {
                Some(id) => id,
                None => select_plant(ctx.client, "Which plant should the sensors observe?").await?,
            };

            let mut selection = TargetSelection::load(ctx.client)
                .await
                .context("Failed to load the observation target")?;
            selection.select(id.clone());
            with_spinner("Saving...", ctx.quiet, selection.save(ctx.client))
                .await
                .with_context(|| format!("Failed to observe plant {}", id))?;

            ctx.report(
                &json!({ "plant_id": id }),
                &format!("Sensors now observe plant {}", id),
            )
        }
        TargetAction::Clear => {
            let mut selection = TargetSelection::default();
            with_spinner("Clearing...", ctx.quiet, selection.remove(ctx.client))
                .await
                .context("Failed to clear the observation target")?;
            ctx.report(&json!({ "plant_id": null }), "No plant is observed now")
        }
    }
}
