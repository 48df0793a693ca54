//! Command-line client for the VanaDristi plant-monitoring service.
//!
//! VanaDristi keeps a collection of plants, reads sensors attached to one
//! "observed" plant, asks an AI model for health analyses, and identifies
//! plants from photos. This crate drives all of that from a terminal.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `plants` | List, show, add, update and delete plants |
//! | `target` | Show, set or clear the plant the sensors observe |
//! | `sensor` | Latest reading and daily trends for a plant |
//! | `ai` | Health analysis, latest alert and chat |
//! | `identify` | Identify a plant from an image file |
//! | `identifications` | List past identifications |
//! | `dashboard` | Plant count and the latest health alert, optionally live |
//! | `view` | Open a screen by path, e.g. `/plant/<id>` |
//! | `config` | Manage CLI configuration |
//! | `completions` | Generate shell completions |
//!
//! # Output Formats
//!
//! - **Text** (default): tables and colored status
//! - **JSON**: `--json`, with `--compact` for one line per document
//!
//! `--style` picks `rich` (default), `minimal` or `plain` text.
//!
//! # Configuration
//!
//! Settings live in `~/.config/vanadristi/config.toml` (or the platform
//! equivalent):
//!
//! - `base_url`: API base URL
//! - `timeout`: request timeout in seconds
//! - `stale_time`: seconds a cached response stays fresh
//! - `refetch_interval`: dashboard refresh interval in seconds
//! - `format`: default output format
//! - `no_color`: disable colored output
//! - `default_plant`: plant used when a command needs one
//!
//! # Environment Variables
//!
//! - `VANADRISTI_API_URL`: API base URL (overridden by `--base-url`)
//! - `VANADRISTI_PLANT`: plant id (overridden by `--plant`)
//! - `VANADRISTI_STYLE`: output style
//! - `VANADRISTI_CONFIG`: config file path
//! - `NO_COLOR`: disable colored output when set
//!
//! # Examples
//!
//! ```bash
//! vanadristi plants add "Monstera" --species "Monstera deliciosa" --location "Living room"
//! vanadristi target set 64f1c2
//! vanadristi sensor latest
//! vanadristi ai analyze --plant 64f1c2
//! vanadristi identify leaf.jpg
//! vanadristi dashboard --watch --interval 30
//! ```

// The binary lives in main.rs; re-export the libraries it is built on.
pub use vanadristi_core;
pub use vanadristi_types;
