use anyhow::Result;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::sync::Arc;
use tracing::{error, info};

use panel_shell::api::PanelClient;
use panel_shell::app::App;
use panel_shell::config::{self, Config};
use panel_shell::logging;
use panel_shell::ui::run_app;

#[tokio::main]
async fn main() -> Result<()> {
    let matches = config::command().get_matches();
    let config = Config::from_matches(&matches)?;

    logging::init(&config.log_file)?;
    info!(
        panel = %config.panel_url,
        server = %config.server_uuid,
        dry_run = config.dry_run,
        "starting panel-shell"
    );

    run_tui_app(config).await?;

    Ok(())
}

async fn run_tui_app(config: Config) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Create app and run it
    let client = Arc::new(PanelClient::new(&config.panel_url, &config.api_key));
    let app = App::new(client, config.server_uuid, config.shell, config.dry_run);
    let res = run_app(&mut terminal, app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        error!("ui loop failed: {err:#}");
        println!("{err:?}");
    }

    Ok(())
}
