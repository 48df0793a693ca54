//! Plant identification commands.

use std::path::Path;

use anyhow::{Context, Result, bail};
use vanadristi_core::IdentificationWorkflow;
use vanadristi_core::queries::GetIdentifications;

use super::CommandContext;
use crate::format::{format_identification_text, format_identifications_text};
use crate::util::with_spinner;

pub async fn cmd_identify(ctx: &CommandContext<'_>, file: &Path) -> Result<()> {
    if !file.is_file() {
        bail!("No image at {}", file.display());
    }

    let mut workflow = IdentificationWorkflow::new(ctx.client);
    let result = with_spinner(
        "Identifying plant...",
        ctx.quiet,
        workflow.select_file(file),
    )
    .await
    .with_context(|| format!("Failed to identify {}", file.display()))?;

    ctx.render(&*result, || format_identification_text(&result, ctx.opts))
}

pub async fn cmd_identifications(ctx: &CommandContext<'_>) -> Result<()> {
    let results = with_spinner(
        "Loading identifications...",
        ctx.quiet,
        ctx.client.fetch(&GetIdentifications),
    )
    .await
    .context("Failed to list identifications")?;
    ctx.render(&*results, || format_identifications_text(&results, ctx.opts))
}
