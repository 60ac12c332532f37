mod app;
mod board;
mod cli;
mod config;
mod diagnostics;
mod error;
mod logging;
mod store;
mod task;
mod ui;
mod view;

use crate::{app::App, cli::Cli, config::Config, store::SqliteStore};
use clap::Parser;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{io, time::Duration};
use tracing::{error, info};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().or_else(Config::default_path);
    let mut config = match &config_path {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(db) = cli.db {
        config.database_path = db;
    }
    if let Some(log_file) = cli.log_file {
        config.log_file = log_file;
    }

    logging::init(&config.log_file, &config.log_level);
    let store = SqliteStore::new(&config.database_path);
    info!(database = %store.path().display(), "starting");

    match cli.command {
        Some(command) => cli::run(
            command,
            &store,
            &config,
            config_path.as_deref(),
            &mut io::stdout(),
        ),
        None => run_tui(store, &config),
    }
}

fn run_tui(store: SqliteStore, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let mut app = App::new(
        store,
        config.default_filter,
        Duration::from_millis(config.swipe_reset_ms),
    );

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = ui::run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = &result {
        error!(error = %err, "ui loop failed");
    }
    result?;
    Ok(())
}
