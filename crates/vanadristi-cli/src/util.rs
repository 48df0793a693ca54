//! Utility functions for CLI operations.

use std::future::Future;
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use dialoguer::{Confirm, Select, theme::ColorfulTheme};
use vanadristi_core::QueryClient;
use vanadristi_core::queries::{GetObservationTarget, GetPlants};

use crate::config::Config;
use crate::style;

/// Where a plant id came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlantSource {
    /// `--plant` or `VANADRISTI_PLANT`
    Explicit,
    /// `default_plant` in the config file
    Default,
}

/// Resolve the plant from the argument or the config, without the network.
pub fn resolve_plant_local(plant: Option<String>, config: &Config) -> Option<(String, PlantSource)> {
    plant
        .filter(|p| !p.trim().is_empty())
        .map(|p| (p, PlantSource::Explicit))
        .or_else(|| {
            config
                .default_plant
                .clone()
                .map(|p| (p, PlantSource::Default))
        })
}

/// Resolve the plant, falling back to the observation target.
pub async fn require_plant(
    plant: Option<String>,
    config: &Config,
    client: &QueryClient,
    quiet: bool,
) -> Result<String> {
    if let Some((id, source)) = resolve_plant_local(plant, config) {
        if source == PlantSource::Default && !quiet {
            eprintln!("Using default plant: {}", id);
        }
        return Ok(id);
    }

    let target = client
        .fetch(&GetObservationTarget)
        .await
        .context("Failed to look up the observation target")?;
    match (*target).as_ref() {
        Some(target) => {
            if !quiet {
                eprintln!("Using observed plant: {}", target.id);
            }
            Ok(target.id.clone())
        }
        None => bail!(
            "No plant specified. Use --plant <ID>, set VANADRISTI_PLANT, or run \
             'vanadristi config set default-plant <ID>'.\n\
             Run 'vanadristi plants list' to see plant ids."
        ),
    }
}

/// Pick a plant interactively.
pub async fn select_plant(client: &QueryClient, prompt: &str) -> Result<String> {
    if !io::stdin().is_terminal() || !io::stderr().is_terminal() {
        bail!("No plant specified. Pass a plant id.");
    }

    let plants = client.fetch(&GetPlants).await.context("Failed to list plants")?;
    if plants.is_empty() {
        bail!("No plants yet. Add one with 'vanadristi plants add <NAME>'.");
    }

    let items: Vec<String> = plants
        .iter()
        .map(|p| match &p.species {
            Some(species) => format!("{} ({}) [{}]", p.name, species, p.id),
            None => format!("{} [{}]", p.name, p.id),
        })
        .collect();

    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .items(&items)
        .default(0)
        .interact()
        .context("Failed to get user selection")?;

    Ok(plants[selection].id.clone())
}

/// Ask before a destructive action. `yes` skips the prompt.
pub fn confirm(prompt: &str, yes: bool) -> Result<bool> {
    if yes {
        return Ok(true);
    }
    if !io::stdin().is_terminal() {
        bail!("Refusing to continue without confirmation. Pass --yes to skip the prompt.");
    }
    Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(false)
        .interact()
        .context("Failed to read confirmation")
}

/// Await `fut` behind a spinner on a terminal.
pub async fn with_spinner<F, T>(message: &str, quiet: bool, fut: F) -> T
where
    F: Future<Output = T>,
{
    let spinner = style::request_spinner(message, quiet);
    let result = fut.await;
    style::finish_spinner(spinner);
    result
}

/// Write output to file or stdout
pub fn write_output(output: Option<&PathBuf>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write to {}", path.display()))?;
        }
        None => {
            print!("{}", content);
            io::stdout().flush()?;
        }
    }
    Ok(())
}
