//! Config command. Runs without a server connection.

use anyhow::{Result, bail};
use clap::ValueEnum;
use tabled::builder::Builder;

use crate::cli::{ConfigAction, ConfigKey, OutputFormat};
use crate::config::Config;
use crate::format::FormatOptions;
use crate::style;

pub fn cmd_config(action: ConfigAction, format: OutputFormat, opts: &FormatOptions) -> Result<()> {
    let path = Config::path();

    match action {
        ConfigAction::Show => {
            let config = Config::load_from(&path)?;
            match format {
                OutputFormat::Json => print!("{}", opts.as_json(&config)?),
                OutputFormat::Text => print!("{}", format_config_text(&config, opts)),
            }
        }
        ConfigAction::Get { key } => {
            let config = Config::load_from(&path)?;
            match config.get(key) {
                Some(value) => println!("{}", value),
                None => bail!("{} is not set", key_name(key)),
            }
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load_from(&path)?;
            config.set(key, &value)?;
            config.save_to(&path)?;
            let stored = config.get(key).unwrap_or(value);
            println!(
                "{}",
                style::format_success(
                    &format!("Set {} = {}", key_name(key), stored),
                    opts.no_color
                )
            );
        }
        ConfigAction::Unset { key } => {
            let mut config = Config::load_from(&path)?;
            config.unset(key);
            config.save_to(&path)?;
            println!(
                "{}",
                style::format_success(&format!("Unset {}", key_name(key)), opts.no_color)
            );
        }
        ConfigAction::Path => println!("{}", path.display()),
        ConfigAction::Init { force } => {
            if path.exists() && !force {
                bail!(
                    "Config already exists at {}. Use --force to overwrite it.",
                    path.display()
                );
            }
            Config::with_defaults().save_to(&path)?;
            println!(
                "{}",
                style::format_success(
                    &format!("Wrote {}", path.display()),
                    opts.no_color
                )
            );
        }
    }
    Ok(())
}

/// The key as typed on the command line, e.g. `base-url`.
fn key_name(key: ConfigKey) -> String {
    key.to_possible_value()
        .map(|v| v.get_name().to_string())
        .unwrap_or_else(|| format!("{:?}", key))
}

fn format_config_text(config: &Config, opts: &FormatOptions) -> String {
    let mut builder = Builder::default();
    builder.push_record(["Key", "Value"]);
    for key in ConfigKey::value_variants() {
        let value = config.get(*key).unwrap_or_else(|| "(default)".to_string());
        builder.push_record([key_name(*key), value]);
    }
    let mut table = builder.build();
    style::apply_table_style(&mut table, opts.style);
    format!("{}\n{}\n", style::format_title("Configuration", opts.no_color), table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::StyleMode;

    #[test]
    fn test_key_name_is_kebab_case() {
        assert_eq!(key_name(ConfigKey::BaseUrl), "base-url");
        assert_eq!(key_name(ConfigKey::DefaultPlant), "default-plant");
    }

    #[test]
    fn test_config_text_lists_every_key() {
        let mut config = Config::default();
        config.set(ConfigKey::DefaultPlant, "p1").unwrap();
        let opts = FormatOptions::new(true, StyleMode::Plain);
        let text = format_config_text(&config, &opts);
        assert!(text.contains("default-plant"));
        assert!(text.contains("p1"));
        assert!(text.contains("refetch-interval"));
        assert!(text.contains("(default)"));
    }
}
