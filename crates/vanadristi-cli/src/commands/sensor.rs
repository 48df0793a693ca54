//! Sensor commands.

use anyhow::{Context, Result};
use vanadristi_core::queries::{GetLatestSensorData, GetSensorTrends};

use super::CommandContext;
use super::plants::optional_reading;
use crate::cli::SensorAction;
use crate::format::{format_sensor_text, format_trends_text};
use crate::util::{require_plant, with_spinner};

pub async fn cmd_sensor(ctx: &CommandContext<'_>, action: SensorAction) -> Result<()> {
    match action {
        SensorAction::Latest { plant } => {
            let id = require_plant(plant.plant, ctx.config, ctx.client, ctx.quiet).await?;
            let reading = with_spinner(
                "Reading sensors...",
                ctx.quiet,
                ctx.client.fetch(&GetLatestSensorData::new(&id)),
            )
            .await;
            let reading = optional_reading(reading)?;

            ctx.render(&reading, || match &reading {
                Some(data) => format_sensor_text(data, ctx.opts),
                None => format!("No sensor data for plant {} yet.\n", id),
            })
        }
        SensorAction::Trends { plant } => {
            let id = require_plant(plant.plant, ctx.config, ctx.client, ctx.quiet).await?;
            let trends = with_spinner(
                "Loading trends...",
                ctx.quiet,
                ctx.client.fetch(&GetSensorTrends::new(&id)),
            )
            .await
            .with_context(|| format!("Failed to load trends for plant {}", id))?;
            ctx.render(&*trends, || format_trends_text(&trends, ctx.opts))
        }
    }
}
