mod app;
mod cache;
mod config;
mod cursor;
mod diff;
mod domain;
mod git;
mod handlers;
mod highlight;
mod ignore;
mod minimap;
mod render;
mod terminal;
mod ui;
mod worker;

use crate::app::{App, BackendEvent, BackendTask};
use crate::config::AppConfig;
use crate::git::{GitClient, ShellGitClient};
use crate::handlers::{handle_backend_event, handle_key_event, handle_mouse_event, send_task};
use crate::terminal::{restore_terminal, setup_terminal};
use crate::worker::worker_loop;
use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyEventKind};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> Result<()> {
    let config = match AppConfig::load_or_default() {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("failed to load config, using defaults: {err:#}");
            AppConfig::default()
        }
    };

    let cwd = std::env::current_dir().context("failed to resolve working directory")?;
    let client = ShellGitClient::discover(cwd)?;

    setup_terminal()?;
    let mut terminal =
        Terminal::new(CrosstermBackend::new(io::stdout())).context("failed to create terminal")?;

    let run_result = run_app(&mut terminal, config, client).await;

    restore_terminal(&mut terminal)?;
    if let Err(err) = run_result {
        eprintln!("{err:#}");
        std::process::exit(1);
    }

    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    config: AppConfig,
    client: ShellGitClient,
) -> Result<()> {
    let repo_root = client.repo_root().to_path_buf();
    let mut app = App::new(config, repo_root.clone());
    let client: Arc<dyn GitClient> = Arc::new(client);

    let (task_tx, task_rx) = mpsc::unbounded_channel::<BackendTask>();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<BackendEvent>();

    tokio::spawn(worker_loop(client, task_rx, event_tx));

    match ignore::read_ignore_file(&repo_root) {
        Ok(source) => app.set_ignore_source(&source),
        Err(err) => app.log(format!("gitignore unavailable: {err:#}")),
    }

    send_task(&mut app, &task_tx, BackendTask::RefreshStatus)?;
    send_task(
        &mut app,
        &task_tx,
        BackendTask::LoadTree {
            path: repo_root.clone(),
        },
    )?;
    send_task(&mut app, &task_tx, BackendTask::LoadLog)?;
    send_task(&mut app, &task_tx, BackendTask::LoadBranches)?;

    while !app.should_quit {
        while let Ok(event) = event_rx.try_recv() {
            handle_backend_event(&mut app, &task_tx, event)?;
        }

        terminal.draw(|frame| ui::draw(frame, &mut app))?;

        if event::poll(Duration::from_millis(100)).context("event poll failed")? {
            match event::read().context("event read failed")? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    handle_key_event(&mut app, key, &task_tx)?;
                }
                Event::Mouse(mouse) => {
                    handle_mouse_event(&mut app, mouse, &task_tx)?;
                }
                _ => {}
            }
        }
    }

    if let Err(err) = app.config.save() {
        eprintln!("failed to save config: {err:#}");
    }

    Ok(())
}
