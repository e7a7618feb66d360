//! lastsave - back up game saves as they change, restore them on a hotkey

use anyhow::Result;
use clap::Parser;
use cli_lib::{app, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    app::run(cli).await
}
