//! Clap derive structures for the `esplink` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// esplink -- control panel for ESPHome sensor devices
#[derive(Debug, Parser)]
#[command(
    name = "esplink",
    version,
    about = "Manage ESPHome sensor devices and their object links",
    long_about = "Operator CLI for an ESPHome device panel.\n\n\
        Lists and edits managed devices, shows live sensor state, and maps\n\
        sensor channels onto properties of external objects.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Backend profile to use
    #[arg(long, short = 'p', env = "ESPLINK_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Backend URL (overrides profile)
    #[arg(long, short = 'u', env = "ESPLINK_URL", global = true)]
    pub url: Option<String>,

    /// API key sent as X-API-KEY
    #[arg(long, env = "ESPLINK_API_KEY", global = true, hide_env = true)]
    pub api_key: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "ESPLINK_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "ESPLINK_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "ESPLINK_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage devices known to the panel
    #[command(alias = "dev", alias = "d")]
    Devices(DevicesArgs),

    /// Inspect sensors and their current state
    #[command(alias = "s")]
    Sensors(SensorsArgs),

    /// Show and edit channel-to-object links
    #[command(alias = "l")]
    Links(LinksArgs),

    /// Browse linkable objects
    #[command(alias = "obj")]
    Objects(ObjectsArgs),

    /// Stream live sensor changes until interrupted
    Watch(WatchArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Devices ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DevicesArgs {
    #[command(subcommand)]
    pub command: DevicesCommand,
}

#[derive(Debug, Subcommand)]
pub enum DevicesCommand {
    /// List devices
    #[command(alias = "ls")]
    List,

    /// Show device details and sensors
    Get {
        /// Device name
        device: String,
    },

    /// Add a device
    Create {
        /// Device name (must match the node name)
        #[arg(long)]
        name: String,

        /// Hostname or IP address
        #[arg(long)]
        host: String,

        /// Native API port
        #[arg(long, default_value_t = esplink_core::model::device::DEFAULT_PORT)]
        port: u16,

        /// API password, if the node requires one
        #[arg(long)]
        password: Option<String>,
    },

    /// Change a device's connection settings
    Update {
        /// Device name
        device: String,

        /// New device name
        #[arg(long)]
        name: Option<String>,

        /// New hostname or IP address
        #[arg(long)]
        host: Option<String>,

        /// New native API port
        #[arg(long)]
        port: Option<u16>,

        /// New API password (empty string clears it)
        #[arg(long)]
        password: Option<String>,
    },

    /// Delete a device and its sensors
    #[command(alias = "rm")]
    Delete {
        /// Device name
        device: String,
    },

    /// Ask the panel to reconnect to a device
    Reconnect {
        /// Device name
        device: String,
    },
}

// ── Sensors ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SensorsArgs {
    #[command(subcommand)]
    pub command: SensorsCommand,
}

#[derive(Debug, Subcommand)]
pub enum SensorsCommand {
    /// List a device's sensors
    #[command(alias = "ls")]
    List {
        /// Device name
        device: String,
    },

    /// Show one sensor's channels, values and links
    Get {
        /// Device name
        device: String,

        /// Sensor name
        sensor: String,
    },
}

// ── Links ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct LinksArgs {
    #[command(subcommand)]
    pub command: LinksCommand,
}

#[derive(Debug, Subcommand)]
pub enum LinksCommand {
    /// Show each channel of a sensor and its link target
    Show {
        /// Device name
        device: String,

        /// Sensor name
        sensor: String,
    },

    /// Link channels to object properties
    Set {
        /// Device name
        device: String,

        /// Sensor name
        sensor: String,

        /// Assignments of the form CHANNEL=OBJECT.PROPERTY
        #[arg(required = true, value_name = "CHANNEL=OBJECT.PROPERTY")]
        links: Vec<String>,
    },

    /// Unlink channels (all channels when none are given)
    Clear {
        /// Device name
        device: String,

        /// Sensor name
        sensor: String,

        /// Channels to unlink
        channels: Vec<String>,
    },
}

// ── Objects ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ObjectsArgs {
    #[command(subcommand)]
    pub command: ObjectsCommand,
}

#[derive(Debug, Subcommand)]
pub enum ObjectsCommand {
    /// List linkable objects
    #[command(alias = "ls")]
    List,

    /// Show one object's properties
    Get {
        /// Object id
        object: String,
    },
}

// ── Watch ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Only show changes for this device
    pub device: Option<String>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create or extend the config file with guided setup
    Init,

    /// Display current configuration (secrets masked)
    Show,

    /// Print the config file path
    Path,

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
