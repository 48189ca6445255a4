mod cli;
mod context;
mod gui;
mod locations;
mod open;
mod params;
mod raymarch;
mod run;
mod window;

use anyhow::Result;

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();
    run::run(cli)
}
