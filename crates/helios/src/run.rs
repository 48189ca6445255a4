use anyhow::{Context, Result};
use sceneconfig::ViewerConfig;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::window::{run_viewer, ViewerOptions};

pub fn run(cli: Cli) -> Result<()> {
    let config = resolve_config(&cli)?;

    if cli.print_config {
        print!("{}", config.to_toml_string()?);
        return Ok(());
    }

    tracing::info!(
        config = %cli.config.display(),
        scene = %config.scene_path().display(),
        width = config.resolution.width,
        height = config.resolution.height,
        reload_interval = %humantime::format_duration(config.scene_reload_interval()),
        "starting helios"
    );

    run_viewer(ViewerOptions {
        config,
        watch: !cli.no_watch,
        gl_debug: cli.gl_debug,
    })
}

/// Loads the configuration file and applies command line overrides on top.
pub fn resolve_config(cli: &Cli) -> Result<ViewerConfig> {
    let mut config = ViewerConfig::load_or_default(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config.display()))?;

    if let Some(folder) = &cli.assets {
        config.assets.folder = folder.clone();
    }
    if let Some(scene) = &cli.scene {
        config.assets.raymarch_program.scene_file = scene.clone();
    }
    if let Some((width, height)) = cli.size {
        config.resolution.width = width;
        config.resolution.height = height;
    }
    if cli.fullscreen {
        config.fullscreen = true;
    }
    if let Some(interval) = cli.reload_interval {
        config.assets.raymarch_program.scene_reload_interval = interval;
    }

    config.validate().context("invalid configuration")?;
    Ok(config)
}

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
