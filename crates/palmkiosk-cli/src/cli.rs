use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "palmkiosk",
    about = "Enroll, recognize and manage palm biometric users",
    version
)]
pub struct Cli {
    /// Emit structured JSON to stdout instead of human-readable output
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase verbosity (may be used multiple times)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(flatten)]
    pub store: StoreArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Overrides for the storage locations resolved from the config file.
#[derive(Debug, Clone, Default, Args)]
pub struct StoreArgs {
    /// Registry file (defaults to config registry_path)
    #[arg(long, global = true)]
    pub registry: Option<PathBuf>,

    /// Directory holding palm images (defaults to config image_dir)
    #[arg(long, global = true)]
    pub image_dir: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Enroll a user from a directory of captured palm frames
    Enroll(EnrollArgs),
    /// Identify the enrolled user closest to a probe image
    Recognize(RecognizeArgs),
    /// Inspect and manage registered users
    #[command(subcommand)]
    Users(UsersCommands),
    /// Configuration helpers
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Debug, Clone, Args)]
pub struct EnrollArgs {
    /// Display name of the user
    #[arg(long)]
    pub name: String,

    /// 18-character national id
    #[arg(long)]
    pub id: String,

    /// Replace an existing registration with the same id
    #[arg(long)]
    pub force: bool,

    /// Directory of PNG frames, consumed in file-name order
    #[arg(long)]
    pub frames: PathBuf,
}

#[derive(Debug, Clone, Args)]
pub struct RecognizeArgs {
    /// Probe image to identify
    #[arg(long)]
    pub probe: PathBuf,

    /// Override the configured similarity threshold (0.0 - 1.0)
    #[arg(long, value_parser = parse_threshold)]
    pub threshold: Option<f64>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum UsersCommands {
    /// List every registered user in enrollment order
    List,
    /// Case-insensitive substring search over ids and names
    Search(UserSearchArgs),
    /// Remove a user together with their images
    Delete(UserIdArgs),
    /// List the stored images of a user
    Images(UserIdArgs),
}

#[derive(Debug, Clone, Args)]
pub struct UserSearchArgs {
    /// Text to look for; empty matches everyone
    #[arg(default_value = "")]
    pub query: String,
}

#[derive(Debug, Clone, Args)]
pub struct UserIdArgs {
    pub id: String,
}

#[derive(Debug, Clone, Copy, Subcommand)]
pub enum ConfigCommands {
    /// Print the resolved configuration and where it came from
    Show,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

impl From<bool> for OutputMode {
    fn from(json: bool) -> Self {
        if json {
            OutputMode::Json
        } else {
            OutputMode::Human
        }
    }
}

impl Cli {
    pub fn output_mode(&self) -> OutputMode {
        OutputMode::from(self.json)
    }
}

fn parse_threshold(value: &str) -> Result<f64, String> {
    let threshold: f64 = value
        .parse()
        .map_err(|_| format!("'{value}' is not a number"))?;
    if (0.0..=1.0).contains(&threshold) {
        Ok(threshold)
    } else {
        Err(format!("threshold must be between 0.0 and 1.0, got {threshold}"))
    }
}
