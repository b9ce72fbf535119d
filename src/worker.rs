use crate::app::{BackendEvent, BackendTask};
use crate::git::GitClient;
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

/// Drains backend tasks one at a time, running each git call on the
/// blocking pool and reporting back as events. Exits when either channel
/// closes.
pub(crate) async fn worker_loop(
    client: Arc<dyn GitClient>,
    mut task_rx: UnboundedReceiver<BackendTask>,
    event_tx: UnboundedSender<BackendEvent>,
) {
    while let Some(task) = task_rx.recv().await {
        let event = run_task(&client, task).await;
        if event_tx.send(event).is_err() {
            break;
        }
    }
}

async fn run_task(client: &Arc<dyn GitClient>, task: BackendTask) -> BackendEvent {
    match task {
        BackendTask::RefreshStatus => {
            let c = client.clone();
            let result = tokio::task::spawn_blocking(move || c.status()).await;
            match result {
                Ok(Ok(status)) => BackendEvent::StatusRefreshed { status },
                other => error_event("status", other),
            }
        }
        BackendTask::LoadTree { path } => {
            let c = client.clone();
            let dir = path.clone();
            let result = tokio::task::spawn_blocking(move || c.list_directory(&dir)).await;
            match result {
                Ok(Ok(entries)) => BackendEvent::TreeLoaded { path, entries },
                other => error_event("tree", other),
            }
        }
        BackendTask::LoadFile { path } => {
            let c = client.clone();
            let target = path.clone();
            let result = tokio::task::spawn_blocking(move || c.read_file(&target)).await;
            match result {
                Ok(Ok(content)) => BackendEvent::FileLoaded { path, content },
                other => error_event("file", other),
            }
        }
        BackendTask::LoadDiff { path } => {
            let c = client.clone();
            let target = path.clone();
            let result = tokio::task::spawn_blocking(move || c.file_diff(&target)).await;
            match result {
                Ok(Ok(diff)) => BackendEvent::DiffLoaded { path, diff },
                other => error_event("diff", other),
            }
        }
        BackendTask::LoadBlame { path } => {
            let c = client.clone();
            let target = path.clone();
            let result = tokio::task::spawn_blocking(move || c.blame(&target)).await;
            match result {
                Ok(Ok(lines)) => BackendEvent::BlameLoaded { path, lines },
                other => error_event("blame", other),
            }
        }
        BackendTask::LoadLog => {
            let c = client.clone();
            let result = tokio::task::spawn_blocking(move || c.log()).await;
            match result {
                Ok(Ok(commits)) => BackendEvent::LogLoaded { commits },
                other => error_event("log", other),
            }
        }
        BackendTask::LoadBranches => {
            let c1 = client.clone();
            let branches = tokio::task::spawn_blocking(move || c1.branches()).await;
            let c2 = client.clone();
            let current = tokio::task::spawn_blocking(move || c2.current_branch()).await;
            match (branches, current) {
                (Ok(Ok(branches)), Ok(Ok(current))) => {
                    BackendEvent::BranchesLoaded { branches, current }
                }
                (b, c) => BackendEvent::Error {
                    context: "branches".to_string(),
                    message: format!(
                        "branches failed: list={}, current={}",
                        flatten_error(b),
                        flatten_error(c)
                    ),
                },
            }
        }
        BackendTask::Checkout { branch } => {
            let c = client.clone();
            let name = branch.clone();
            let result = tokio::task::spawn_blocking(move || c.checkout(&name)).await;
            match result {
                Ok(Ok(())) => BackendEvent::CheckedOut { branch },
                other => error_event("checkout", other),
            }
        }
        BackendTask::LoadFolderSize { path } => {
            let c = client.clone();
            let target = path.clone();
            let result = tokio::task::spawn_blocking(move || c.folder_size(&target)).await;
            match result {
                Ok(Ok(size)) => BackendEvent::FolderSizeLoaded { path, size },
                other => error_event("size", other),
            }
        }
    }
}

fn error_event<T>(
    context: &str,
    result: std::result::Result<anyhow::Result<T>, tokio::task::JoinError>,
) -> BackendEvent {
    BackendEvent::Error {
        context: context.to_string(),
        message: format!("{context} failed: {}", flatten_error(result)),
    }
}

fn flatten_error<T>(res: std::result::Result<anyhow::Result<T>, tokio::task::JoinError>) -> String {
    match res {
        Ok(Ok(_)) => "ok".to_string(),
        Ok(Err(err)) => format!("{err:#}"),
        Err(err) => format!("join error: {err}"),
    }
}
