use std::io;
use std::path::PathBuf;
use std::process;

use anyhow::Result;
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

mod input;
mod menu;
mod money;
mod receipt;
mod session;
mod tally;

use menu::Menu;
use session::Session;

#[derive(Parser)]
#[clap(version = "0.1.0", about = "Meal billing console for a small restaurant")]
struct Opts {
    /// Menu file with `code,name,price` rows; seeded with the default menu if missing
    #[clap(long, value_name = "FILE")]
    menu: Option<PathBuf>,
    /// Directory receipts are written to
    #[clap(long, value_name = "DIR", default_value = ".")]
    receipts: PathBuf,
}

fn run() -> Result<()> {
    let opts: Opts = Opts::parse();

    let menu = match &opts.menu {
        Some(path) => Menu::load_or_seed(path)?,
        None => Menu::default_menu(),
    };
    let mut session = Session::new(menu, opts.receipts);

    let stdin = io::stdin();
    session.run(stdin.lock(), io::stdout())?;

    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    if let Err(e) = run() {
        error!(error = e.to_string(), "Something went wrong");
        process::exit(1);
    }
}
