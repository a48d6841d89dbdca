use anyhow::Context;
use clap::{Parser, Subcommand};
use gravity_ocr_prep::{debug, Pipeline, ProfileStore, RasterImage};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;

#[derive(Parser, Debug)]
#[command(name = "gravity-ocr-prep")]
#[command(about = "Preprocess tribe-log captures for OCR and manage tuning profiles")]
#[command(version)]
pub struct Args {
    /// Profile document location (defaults to the user config directory)
    #[arg(long, env = "GRAVITY_PROFILES_PATH", global = true)]
    pub profiles_path: Option<PathBuf>,

    /// Discard edited profiles and reseed from the built-in defaults
    #[arg(long, global = true)]
    pub reset_profiles: bool,

    /// Profile to activate before running the command
    #[arg(long, global = true)]
    pub profile: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info", global = true)]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a capture through the active profile and write the binary PNG
    Process {
        /// Capture to read (any format the image crate decodes)
        #[arg(long)]
        input: PathBuf,

        /// Where to write the binary PNG
        #[arg(long)]
        output: PathBuf,

        /// Also export intermediates into this directory
        #[arg(long)]
        debug_dir: Option<PathBuf>,

        /// Print step timings as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// Inspect or edit profiles
    Profiles {
        #[command(subcommand)]
        action: ProfilesCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum ProfilesCommand {
    /// List profile names, marking the active one
    List,
    /// Print every knob of a profile (the active one by default)
    Show { name: Option<String> },
    /// Make a profile active
    Use { name: String },
    /// Change knobs: `profiles set HDR ADAPTIVE_WIN=41 MORPH=false`
    Set {
        name: String,
        #[arg(required = true)]
        assignments: Vec<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Logs go to stderr; stdout carries command output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = config::Config::from(&args);
    tracing::debug!("Profiles at {}", config.profiles_path.display());

    let store = ProfileStore::new(&config.profiles_path);
    store
        .initialize(&config.init)
        .with_context(|| format!("loading profiles from {}", config.profiles_path.display()))?;

    match args.command {
        Command::Process {
            input,
            output,
            debug_dir,
            json,
        } => process(&store, &input, &output, debug_dir.as_deref(), json),
        Command::Profiles { action } => profiles(&store, action),
    }
}

fn process(
    store: &ProfileStore,
    input: &Path,
    output: &Path,
    debug_dir: Option<&Path>,
    json: bool,
) -> anyhow::Result<()> {
    let capture = image::open(input)
        .with_context(|| format!("reading {}", input.display()))?
        .to_rgb8();
    let raster = RasterImage::from_rgb_image(capture)?;

    let result = Pipeline::new()
        .with_intermediates(debug_dir.is_some())
        .process(&raster, &store.current())?;

    debug::export_raster(&result.image, output)
        .with_context(|| format!("writing {}", output.display()))?;

    if let Some(dir) = debug_dir {
        let stem = output
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("capture");
        debug::export_result(&result, dir, stem)?;
    }

    tracing::info!(
        "Wrote {}x{} binary image to {} in {}ms",
        result.width,
        result.height,
        output.display(),
        result.total_time_ms
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    }
    Ok(())
}

fn profiles(store: &ProfileStore, action: ProfilesCommand) -> anyhow::Result<()> {
    match action {
        ProfilesCommand::List => {
            let active = store.active_name();
            for name in store.all().keys() {
                let marker = if *name == active { "*" } else { " " };
                println!("{} {}", marker, name);
            }
        }
        ProfilesCommand::Show { name } => {
            let name = name.unwrap_or_else(|| store.active_name());
            for (key, value) in store.get(&name).knobs() {
                println!("{} = {}", key, value);
            }
        }
        ProfilesCommand::Use { name } => {
            let active = store.switch(&name)?;
            if active != name {
                tracing::warn!("Unknown profile '{}', using {}", name, active);
            }
            println!("{}", active);
        }
        ProfilesCommand::Set { name, assignments } => {
            let mut profile = store.get(&name);
            for assignment in &assignments {
                let (key, value) = assignment
                    .split_once('=')
                    .with_context(|| format!("expected KEY=VALUE, got '{}'", assignment))?;
                profile.set_knob(key.trim(), value)?;
            }
            store.update(&name, profile)?;
            println!("Updated {}", name);
        }
    }
    Ok(())
}
