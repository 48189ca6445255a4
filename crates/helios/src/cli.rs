use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "helios",
    author,
    version,
    about = "Real-time raymarch viewer with a hot-reloaded GLSL scene"
)]
pub struct Cli {
    /// Configuration file (TOML, or JSON by extension).
    #[arg(long, value_name = "FILE", default_value = "resources/config.toml")]
    pub config: PathBuf,

    /// Override the folder the shader sources are read from.
    #[arg(long, value_name = "DIR")]
    pub assets: Option<PathBuf>,

    /// Override the scene file, relative to the assets folder.
    #[arg(long, value_name = "FILE")]
    pub scene: Option<PathBuf>,

    /// Override the window and render resolution (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size)]
    pub size: Option<(u32, u32)>,

    /// Open a borderless fullscreen window.
    #[arg(long)]
    pub fullscreen: bool,

    /// How often the scene file is checked for changes (e.g. `250ms`, `1s`).
    #[arg(long, value_name = "DURATION", value_parser = parse_interval)]
    pub reload_interval: Option<Duration>,

    /// Compile the scene once and never watch it for changes.
    #[arg(long)]
    pub no_watch: bool,

    /// Enable synchronous GL debug output in the log.
    #[arg(long, env = "HELIOS_GL_DEBUG")]
    pub gl_debug: bool,

    /// Print the resolved configuration as TOML and exit.
    #[arg(long)]
    pub print_config: bool,
}

pub fn parse() -> Cli {
    Cli::parse()
}

fn parse_size(value: &str) -> Result<(u32, u32), String> {
    let (width, height) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got `{value}`"))?;
    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| format!("invalid width `{width}`"))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| format!("invalid height `{height}`"))?;
    if width == 0 || height == 0 {
        return Err("width and height must be non-zero".into());
    }
    Ok((width, height))
}

fn parse_interval(value: &str) -> Result<Duration, String> {
    let interval = humantime::parse_duration(value).map_err(|err| err.to_string())?;
    if interval.is_zero() {
        return Err("reload interval must be greater than zero".into());
    }
    Ok(interval)
}
