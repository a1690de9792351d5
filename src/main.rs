mod cli;
mod config;
mod inspector;
mod profile;
mod update;

use anyhow::Result;

fn main() -> Result<()> {
    cli::run()
}
