//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::builder::FalseyValueParser;
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::MAX_REFETCH_INTERVAL_SECS;

/// Output format for commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Visual styling mode for output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum StyleMode {
    /// Standard styling with colors
    Minimal,
    /// Tables, icons and full formatting (default)
    #[default]
    Rich,
    /// Plain text with no decorations (for scripting)
    Plain,
}

/// Which plant a command is about.
#[derive(Debug, Clone, Args)]
pub struct PlantArgs {
    /// Plant id; defaults to the configured plant, then the observation target
    #[arg(short, long, env = "VANADRISTI_PLANT")]
    pub plant: Option<String>,
}

#[derive(Parser)]
#[command(name = "vanadristi")]
#[command(author, version, about = "CLI for the VanaDristi plant-monitoring service", long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// API base URL (overrides config)
    #[arg(long, global = true, env = "VANADRISTI_API_URL")]
    pub base_url: Option<String>,

    /// Output as JSON (shorthand for --format json)
    #[arg(long, global = true)]
    pub json: bool,

    /// Output compact JSON (no pretty-printing)
    #[arg(long, global = true)]
    pub compact: bool,

    /// Disable colored output (any non-empty NO_COLOR also disables it)
    #[arg(
        long,
        global = true,
        env = "NO_COLOR",
        value_parser = FalseyValueParser::new()
    )]
    pub no_color: bool,

    /// Visual styling mode (minimal, rich, plain)
    #[arg(
        long,
        global = true,
        value_enum,
        default_value = "rich",
        env = "VANADRISTI_STYLE"
    )]
    pub style: StyleMode,

    /// Write output to file instead of stdout
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage the plant collection
    Plants {
        #[command(subcommand)]
        action: PlantsAction,
    },

    /// Show or change the plant the sensors observe
    Target {
        #[command(subcommand)]
        action: TargetAction,
    },

    /// Sensor readings for a plant
    Sensor {
        #[command(subcommand)]
        action: SensorAction,
    },

    /// AI health analysis and chat
    Ai {
        #[command(subcommand)]
        action: AiAction,
    },

    /// Identify a plant from a photo
    Identify {
        /// Image file (JPEG, PNG, WebP, ...)
        file: PathBuf,
    },

    /// List past identifications
    Identifications,

    /// Collection overview: plant count, latest reading and diagnosis
    Dashboard {
        /// Keep refreshing until interrupted
        #[arg(short, long)]
        watch: bool,

        /// Refresh interval in seconds (defaults to config, then 60)
        #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..=MAX_REFETCH_INTERVAL_SECS))]
        interval: Option<u64>,
    },

    /// Render the view behind an app route (e.g. /plant/p1)
    View {
        /// Route path
        route: String,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum PlantsAction {
    /// List all plants
    #[command(alias = "ls")]
    List,

    /// Show one plant with its latest reading
    Show {
        /// Plant id
        id: String,
    },

    /// Add a plant
    Add {
        /// Display name
        name: String,

        /// Species
        #[arg(short, long)]
        species: Option<String>,

        /// Where the plant lives
        #[arg(short, long)]
        location: Option<String>,
    },

    /// Change a plant's fields
    Update {
        /// Plant id
        id: String,

        /// New name
        #[arg(short, long)]
        name: Option<String>,

        /// New species
        #[arg(short, long)]
        species: Option<String>,

        /// New location
        #[arg(short, long)]
        location: Option<String>,
    },

    /// Delete a plant
    #[command(alias = "rm")]
    Delete {
        /// Plant id
        id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum TargetAction {
    /// Show the current observation target
    Show,

    /// Observe a plant; without an id, pick one interactively
    Set {
        /// Plant id
        id: Option<String>,
    },

    /// Stop observing any plant
    Clear,
}

#[derive(Debug, Clone, Subcommand)]
pub enum SensorAction {
    /// Latest reading
    Latest {
        #[command(flatten)]
        plant: PlantArgs,
    },

    /// Daily averages
    Trends {
        #[command(flatten)]
        plant: PlantArgs,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum AiAction {
    /// Run a health analysis
    Analyze {
        #[command(flatten)]
        plant: PlantArgs,
    },

    /// Ask the assistant; without a question, start an interactive session
    Chat {
        #[command(flatten)]
        plant: PlantArgs,

        /// Question to ask
        question: Option<String>,
    },

    /// Most recent analysis across the collection
    Latest,
}

/// Configuration keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConfigKey {
    /// API base URL
    BaseUrl,
    /// Request timeout in seconds
    Timeout,
    /// Seconds a cached response stays fresh
    StaleTime,
    /// Dashboard refresh interval in seconds
    RefetchInterval,
    /// Default output format
    Format,
    /// Disable colored output
    NoColor,
    /// Default plant id
    DefaultPlant,
}

/// Configuration subcommands
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Get a configuration value
    Get {
        /// Configuration key
        #[arg(value_enum)]
        key: ConfigKey,
    },

    /// Set a configuration value
    Set {
        /// Configuration key
        #[arg(value_enum)]
        key: ConfigKey,
        /// Configuration value
        value: String,
    },

    /// Unset (remove) a configuration value
    Unset {
        /// Configuration key to remove
        #[arg(value_enum)]
        key: ConfigKey,
    },

    /// Show configuration file path
    Path,

    /// Write a configuration file with the defaults
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_json_flag_is_global() {
        let cli = Cli::try_parse_from(["vanadristi", "plants", "list", "--json"]).unwrap();
        assert!(cli.json);
        assert!(matches!(
            cli.command,
            Commands::Plants {
                action: PlantsAction::List
            }
        ));
    }

    #[test]
    fn test_plant_add_options() {
        let cli = Cli::try_parse_from([
            "vanadristi",
            "plants",
            "add",
            "Tulsi",
            "--species",
            "Ocimum tenuiflorum",
        ])
        .unwrap();
        match cli.command {
            Commands::Plants {
                action:
                    PlantsAction::Add {
                        name,
                        species,
                        location,
                    },
            } => {
                assert_eq!(name, "Tulsi");
                assert_eq!(species.as_deref(), Some("Ocimum tenuiflorum"));
                assert!(location.is_none());
            }
            _ => panic!("expected plants add"),
        }
    }

    #[test]
    fn test_config_key_names() {
        let cli = Cli::try_parse_from(["vanadristi", "config", "set", "default-plant", "p1"])
            .unwrap();
        match cli.command {
            Commands::Config {
                action: ConfigAction::Set { key, value },
            } => {
                assert_eq!(key, ConfigKey::DefaultPlant);
                assert_eq!(value, "p1");
            }
            _ => panic!("expected config set"),
        }
    }

    #[test]
    fn test_dashboard_interval_range() {
        let cli =
            Cli::try_parse_from(["vanadristi", "dashboard", "--watch", "--interval", "30"])
                .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Dashboard {
                watch: true,
                interval: Some(30)
            }
        ));

        for interval in ["0", "86401", "18446744073709551615"] {
            assert!(
                Cli::try_parse_from(["vanadristi", "dashboard", "--interval", interval]).is_err(),
                "--interval {} should be rejected",
                interval
            );
        }
    }

    #[test]
    fn test_no_color_flag_takes_no_value() {
        let cli = Cli::try_parse_from(["vanadristi", "--no-color", "plants", "list"]).unwrap();
        assert!(cli.no_color);
    }

    #[test]
    fn test_identify_requires_file() {
        assert!(Cli::try_parse_from(["vanadristi", "identify"]).is_err());
    }
}
