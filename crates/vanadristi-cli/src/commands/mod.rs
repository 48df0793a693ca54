//! Command implementations for the CLI.

mod ai;
mod config;
mod dashboard;
mod identify;
mod plants;
mod sensor;
mod target;
mod view;

use std::path::PathBuf;

use anyhow::Result;
use serde::Serialize;
use vanadristi_core::QueryClient;

use crate::cli::OutputFormat;
use crate::config::Config;
use crate::format::FormatOptions;
use crate::util::write_output;

pub use ai::cmd_ai;
pub use config::cmd_config;
pub use dashboard::cmd_dashboard;
pub use identify::{cmd_identifications, cmd_identify};
pub use plants::cmd_plants;
pub use sensor::cmd_sensor;
pub use target::cmd_target;
pub use view::cmd_view;

/// What every server-facing command needs.
pub struct CommandContext<'a> {
    pub client: &'a QueryClient,
    pub config: &'a Config,
    pub format: OutputFormat,
    pub output: Option<&'a PathBuf>,
    pub quiet: bool,
    pub opts: &'a FormatOptions,
}

impl CommandContext<'_> {
    /// Write `value` as JSON, or the text `render` produces.
    pub fn render<T, F>(&self, value: &T, render: F) -> Result<()>
    where
        T: Serialize + ?Sized,
        F: FnOnce() -> String,
    {
        let content = match self.format {
            OutputFormat::Json => self.opts.as_json(value)?,
            OutputFormat::Text => render(),
        };
        write_output(self.output, &content)
    }

    /// Status line for text output; JSON output gets `value` instead.
    pub fn report<T: Serialize + ?Sized>(&self, value: &T, message: &str) -> Result<()> {
        let no_color = self.opts.no_color;
        self.render(value, || {
            format!("{}\n", crate::style::format_success(message, no_color))
        })
    }
}
