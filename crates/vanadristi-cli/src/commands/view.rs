//! Open a screen by its route path, e.g. `/plant/abc123`.

use anyhow::{Context, Result};
use serde_json::json;
use vanadristi_core::queries::{
    GetLatestSensorData, GetObservationTarget, GetPlant, GetPlants, GetSensorTrends,
};
use vanadristi_types::Route;

use super::CommandContext;
use super::dashboard::cmd_dashboard;
use super::identify::cmd_identifications;
use super::plants::optional_reading;
use crate::format::{
    format_plant_detail_text, format_plants_text, format_target_text, format_trends_text,
};
use crate::util::with_spinner;

pub async fn cmd_view(ctx: &CommandContext<'_>, route: &str) -> Result<()> {
    let route = Route::parse(route).with_context(|| format!("Cannot open '{}'", route))?;

    match route {
        Route::Dashboard => cmd_dashboard(ctx, false, None).await,
        Route::PlantDetail(id) => {
            let (plant_query, reading_query, trends_query) = (
                GetPlant::new(&id),
                GetLatestSensorData::new(&id),
                GetSensorTrends::new(&id),
            );
            let (plant, reading, trends) = with_spinner("Loading plant...", ctx.quiet, async {
                futures::join!(
                    ctx.client.fetch(&plant_query),
                    ctx.client.fetch(&reading_query),
                    ctx.client.fetch(&trends_query),
                )
            })
            .await;
            let plant = plant.with_context(|| format!("Failed to load plant {}", id))?;
            let reading = optional_reading(reading)?;
            let trends = trends.with_context(|| format!("Failed to load trends for plant {}", id))?;

            ctx.render(
                &json!({ "plant": &*plant, "sensor": &reading, "trends": &*trends }),
                || {
                    format!(
                        "{}\n{}",
                        format_plant_detail_text(&plant, reading.as_ref(), ctx.opts),
                        format_trends_text(&trends, ctx.opts)
                    )
                },
            )
        }
        Route::ManagePlants => {
            let (plants, target) = with_spinner("Loading plants...", ctx.quiet, async {
                futures::join!(
                    ctx.client.fetch(&GetPlants),
                    ctx.client.fetch(&GetObservationTarget)
                )
            })
            .await;
            let plants = plants.context("Failed to list plants")?;
            let target = target.context("Failed to load the observation target")?;

            let target_id = (*target).as_ref().map(|t| t.id.as_str());
            let observed = target_id.and_then(|id| plants.iter().find(|p| p.id == id));
            ctx.render(
                &json!({ "plants": &*plants, "observation_target": target_id }),
                || {
                    format!(
                        "{}\n{}",
                        format_plants_text(&plants, ctx.opts),
                        format_target_text(observed, target_id, ctx.opts)
                    )
                },
            )
        }
        Route::Identify => ctx.render(&json!({ "route": Route::Identify.path() }), || {
            "Identify a plant with 'vanadristi identify <FILE>'.\n".to_string()
        }),
        Route::Identifications => cmd_identifications(ctx).await,
    }
}
