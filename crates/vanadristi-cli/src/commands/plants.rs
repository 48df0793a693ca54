//! Plant collection commands.

use anyhow::{Context, Result, bail};
use serde_json::json;
use tracing::debug;
use vanadristi_core::Error;
use vanadristi_core::mutations::{CreatePlant, DeletePlant, UpdatePlant, UpdatePlantInput};
use vanadristi_core::queries::{GetLatestSensorData, GetPlant, GetPlants};
use vanadristi_types::{NewPlant, PlantUpdate, SensorData};

use super::CommandContext;
use crate::cli::PlantsAction;
use crate::format::{format_plant_detail_text, format_plants_text};
use crate::util::{confirm, with_spinner};

pub async fn cmd_plants(ctx: &CommandContext<'_>, action: PlantsAction) -> Result<()> {
    match action {
        PlantsAction::List => {
            let plants = with_spinner("Loading plants...", ctx.quiet, ctx.client.fetch(&GetPlants))
                .await
                .context("Failed to list plants")?;
            ctx.render(&*plants, || format_plants_text(&plants, ctx.opts))
        }
        PlantsAction::Show { id } => show_plant(ctx, &id).await,
        PlantsAction::Add {
            name,
            species,
            location,
        } => {
            let input = NewPlant {
                name,
                species,
                location,
            };
            let plant = with_spinner(
                "Adding plant...",
                ctx.quiet,
                ctx.client.mutate(&CreatePlant, &input),
            )
            .await
            .context("Failed to add plant")?;
            ctx.report(&plant, &format!("Added {} ({})", plant.name, plant.id))
        }
        PlantsAction::Update {
            id,
            name,
            species,
            location,
        } => {
            let update = PlantUpdate {
                name,
                species,
                location,
            };
            if update.is_empty() {
                bail!("Nothing to update. Pass --name, --species or --location.");
            }
            let input = UpdatePlantInput { id, update };
            let plant = with_spinner(
                "Saving plant...",
                ctx.quiet,
                ctx.client.mutate(&UpdatePlant, &input),
            )
            .await
            .with_context(|| format!("Failed to update plant {}", input.id))?;
            ctx.report(&plant, &format!("Updated {} ({})", plant.name, plant.id))
        }
        PlantsAction::Delete { id, yes } => {
            if !confirm(&format!("Delete plant {}? This cannot be undone", id), yes)? {
                eprintln!("Cancelled.");
                return Ok(());
            }
            with_spinner(
                "Deleting plant...",
                ctx.quiet,
                ctx.client.mutate(&DeletePlant, &id),
            )
            .await
            .with_context(|| format!("Failed to delete plant {}", id))?;
            ctx.report(&json!({ "deleted": id }), &format!("Deleted plant {}", id))
        }
    }
}

/// Plant record plus its latest reading.
async fn show_plant(ctx: &CommandContext<'_>, id: &str) -> Result<()> {
    let (plant_query, reading_query) = (GetPlant::new(id), GetLatestSensorData::new(id));
    let (plant, reading) = with_spinner("Loading plant...", ctx.quiet, async {
        futures::join!(
            ctx.client.fetch(&plant_query),
            ctx.client.fetch(&reading_query),
        )
    })
    .await;

    let plant = plant.with_context(|| format!("Failed to load plant {}", id))?;
    let reading = optional_reading(reading)?;

    ctx.render(&json!({ "plant": &*plant, "sensor": &reading }), || {
        format_plant_detail_text(&plant, reading.as_ref(), ctx.opts)
    })
}

/// A 404 means the plant has no reading yet.
pub(super) fn optional_reading(
    reading: Result<std::sync::Arc<SensorData>, Error>,
) -> Result<Option<SensorData>> {
    match reading {
        Ok(data) => Ok(Some((*data).clone())),
        Err(e) if e.is_not_found() => {
            debug!("No sensor data: {}", e);
            Ok(None)
        }
        Err(e) => Err(e).context("Failed to load sensor data"),
    }
}
