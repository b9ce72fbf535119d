use crate::app::{App, BackendEvent, BackendTask, ModalState, PaneFocus, ViewTab, ViewerMode};
use crate::cursor::{CursorKey, MonospaceMetrics};
use crate::ui;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Position;
use tokio::sync::mpsc::UnboundedSender;

pub(crate) fn send_task(
    app: &mut App,
    task_tx: &UnboundedSender<BackendTask>,
    task: BackendTask,
) -> Result<()> {
    if !app.begin_task(task.dedup_key()) {
        return Ok(());
    }
    app.busy = true;
    task_tx
        .send(task)
        .map_err(|err| anyhow::anyhow!("failed to dispatch task: {err}"))
}

/// Reconstructs the dedup key a successful event settles. Error events carry
/// only a context and are handled separately.
fn event_finish_key(event: &BackendEvent) -> Option<String> {
    match event {
        BackendEvent::StatusRefreshed { .. } => Some("status".to_string()),
        BackendEvent::TreeLoaded { path, .. } => Some(format!("tree:{}", path.display())),
        BackendEvent::FileLoaded { path, .. } => Some(format!("file:{}", path.display())),
        BackendEvent::DiffLoaded { path, .. } => Some(format!("diff:{}", path.display())),
        BackendEvent::BlameLoaded { path, .. } => Some(format!("blame:{}", path.display())),
        BackendEvent::LogLoaded { .. } => Some("log".to_string()),
        BackendEvent::BranchesLoaded { .. } => Some("branches".to_string()),
        BackendEvent::CheckedOut { branch } => Some(format!("checkout:{branch}")),
        BackendEvent::FolderSizeLoaded { path, .. } => Some(format!("size:{}", path.display())),
        BackendEvent::Error { .. } => None,
    }
}

pub(crate) fn handle_backend_event(
    app: &mut App,
    task_tx: &UnboundedSender<BackendTask>,
    event: BackendEvent,
) -> Result<()> {
    if let Some(key) = event_finish_key(&event) {
        app.finish_task(&key);
    }

    match event {
        BackendEvent::StatusRefreshed { status } => {
            app.status = status;
            app.rebuild_visible_entries();
            app.sync_selection_bounds();
        }
        BackendEvent::TreeLoaded { path, entries } => {
            app.set_children(path, entries);
        }
        BackendEvent::FileLoaded { path, content } => {
            app.set_viewer_source(&path, content);
        }
        BackendEvent::DiffLoaded { path, diff } => {
            app.set_viewer_diff(&path, &diff);
        }
        BackendEvent::BlameLoaded { path, lines } => {
            app.set_viewer_blame(&path, lines);
        }
        BackendEvent::LogLoaded { commits } => {
            app.commits = commits;
            app.sync_selection_bounds();
        }
        BackendEvent::BranchesLoaded { branches, current } => {
            app.branches = branches;
            app.current_branch = current;
            // reopen so the highlight lands on the fresh current branch
            if matches!(app.modal, ModalState::BranchPicker { .. }) {
                app.open_branch_picker();
            }
        }
        BackendEvent::CheckedOut { branch } => {
            app.log(format!("checked out {branch}"));
            app.current_branch = branch;
            app.folder_sizes.clear();
            app.clear_viewer();
            app.reset_tree();
            send_task(app, task_tx, BackendTask::RefreshStatus)?;
            send_task(app, task_tx, BackendTask::LoadLog)?;
            send_task(app, task_tx, BackendTask::LoadBranches)?;
            send_task(
                app,
                task_tx,
                BackendTask::LoadTree {
                    path: app.repo_root.clone(),
                },
            )?;
        }
        BackendEvent::FolderSizeLoaded { path, size } => {
            app.folder_sizes.insert(path.clone(), size);
            app.log(format!(
                "size {}: {}",
                app.relative_key(&path),
                human_size(size)
            ));
        }
        BackendEvent::Error { context, message } => {
            app.fail_tasks(&context);
            app.log(format!("error[{context}]: {message}"));
        }
    }

    Ok(())
}

pub(crate) fn handle_key_event(
    app: &mut App,
    key: KeyEvent,
    task_tx: &UnboundedSender<BackendTask>,
) -> Result<()> {
    if key.modifiers == KeyModifiers::CONTROL && key.code == KeyCode::Char('c') {
        app.should_quit = true;
        return Ok(());
    }

    match app.modal.clone() {
        ModalState::None => handle_key_without_modal(app, key, task_tx),
        ModalState::Help => handle_help_key(app, key),
        ModalState::BranchPicker { .. } => handle_branch_picker_key(app, key, task_tx),
    }
}

fn handle_key_without_modal(
    app: &mut App,
    key: KeyEvent,
    task_tx: &UnboundedSender<BackendTask>,
) -> Result<()> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let code = normalize_key(key.code, app.config.keymap == "vim");
    let mut selection_changed = false;

    match code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('?') => app.open_help(),
        KeyCode::Tab => app.focus = app.focus.next(),
        KeyCode::Char('1') => {
            app.switch_view(ViewTab::Files);
            selection_changed = true;
        }
        KeyCode::Char('2') => {
            app.switch_view(ViewTab::Commits);
            selection_changed = true;
        }
        KeyCode::Char('3') => {
            app.switch_view(ViewTab::Changes);
            selection_changed = true;
        }
        KeyCode::Char('r') => {
            send_task(app, task_tx, BackendTask::RefreshStatus)?;
            send_task(app, task_tx, BackendTask::LoadLog)?;
        }
        KeyCode::Char('b') => {
            app.open_branch_picker();
            send_task(app, task_tx, BackendTask::LoadBranches)?;
        }
        KeyCode::Char('i') => {
            app.config.show_ignored_files = !app.config.show_ignored_files;
            app.rebuild_visible_entries();
            app.log(format!(
                "ignored files {}",
                if app.config.show_ignored_files {
                    "shown"
                } else {
                    "hidden"
                }
            ));
        }
        KeyCode::Char('g') => {
            if app.viewer.show_blame {
                app.viewer.show_blame = false;
            } else if app.viewer.mode == Some(ViewerMode::Source)
                && let Some(path) = app.viewer.path.clone()
            {
                send_task(app, task_tx, BackendTask::LoadBlame { path })?;
            }
        }
        KeyCode::Char('s') => {
            if let Some(entry) = app.selected_entry().cloned()
                && entry.is_dir
            {
                if let Some(size) = app.folder_sizes.get(&entry.path).copied() {
                    app.log(format!(
                        "size {}: {} (cached)",
                        app.relative_key(&entry.path),
                        human_size(size)
                    ));
                } else {
                    send_task(app, task_tx, BackendTask::LoadFolderSize { path: entry.path })?;
                }
            }
        }
        KeyCode::Char('d') => {
            let target = match app.view {
                ViewTab::Files => app
                    .selected_entry()
                    .filter(|entry| !entry.is_dir)
                    .map(|entry| entry.path.clone()),
                ViewTab::Changes => app.selected_changed_file(),
                ViewTab::Commits => None,
            };
            if let Some(path) = target {
                send_task(app, task_tx, BackendTask::LoadDiff { path })?;
            }
        }
        KeyCode::Down => match app.focus {
            PaneFocus::Tree => {
                app.select_next();
                selection_changed = true;
            }
            PaneFocus::Viewer => viewer_key(app, CursorKey::Down, ctrl),
            PaneFocus::Log => {
                app.scroll_log_down(1);
            }
        },
        KeyCode::Up => match app.focus {
            PaneFocus::Tree => {
                app.select_prev();
                selection_changed = true;
            }
            PaneFocus::Viewer => viewer_key(app, CursorKey::Up, ctrl),
            PaneFocus::Log => {
                app.scroll_log_up(1);
            }
        },
        KeyCode::PageDown => match app.focus {
            PaneFocus::Viewer => viewer_key(app, CursorKey::PageDown, ctrl),
            PaneFocus::Log => {
                app.scroll_log_down(20);
            }
            PaneFocus::Tree => {}
        },
        KeyCode::PageUp => match app.focus {
            PaneFocus::Viewer => viewer_key(app, CursorKey::PageUp, ctrl),
            PaneFocus::Log => {
                app.scroll_log_up(20);
            }
            PaneFocus::Tree => {}
        },
        KeyCode::Home => {
            if app.focus == PaneFocus::Viewer {
                viewer_key(app, CursorKey::Home, ctrl);
            }
        }
        KeyCode::End => {
            if app.focus == PaneFocus::Viewer {
                viewer_key(app, CursorKey::End, ctrl);
            }
        }
        KeyCode::Enter => {
            if app.focus == PaneFocus::Tree {
                open_selected(app, task_tx)?;
            }
        }
        KeyCode::Right => match app.focus {
            PaneFocus::Tree => open_selected(app, task_tx)?,
            PaneFocus::Viewer => viewer_key(app, CursorKey::Right, ctrl),
            PaneFocus::Log => {}
        },
        KeyCode::Left => match app.focus {
            PaneFocus::Tree => {
                if app.view == ViewTab::Files && app.collapse_selected_directory_or_parent() {
                    selection_changed = true;
                }
            }
            PaneFocus::Viewer => viewer_key(app, CursorKey::Left, ctrl),
            PaneFocus::Log => {}
        },
        _ => {}
    }

    if selection_changed {
        maybe_enqueue_auto_view(app, task_tx)?;
    }

    Ok(())
}

fn handle_help_key(app: &mut App, key: KeyEvent) -> Result<()> {
    match key.code {
        KeyCode::Esc | KeyCode::Enter | KeyCode::Char('?') | KeyCode::Char('q') => {
            app.close_modal();
        }
        _ => {}
    }
    Ok(())
}

fn handle_branch_picker_key(
    app: &mut App,
    key: KeyEvent,
    task_tx: &UnboundedSender<BackendTask>,
) -> Result<()> {
    let mut checkout_branch: Option<String> = None;
    let vim = app.config.keymap == "vim";

    {
        let ModalState::BranchPicker { selected } = &mut app.modal else {
            return Ok(());
        };

        match normalize_key(key.code, vim) {
            KeyCode::Esc => {
                app.close_modal();
                return Ok(());
            }
            KeyCode::Down => {
                if !app.branches.is_empty() {
                    *selected = (*selected + 1) % app.branches.len();
                }
            }
            KeyCode::Up => {
                if !app.branches.is_empty() {
                    if *selected == 0 {
                        *selected = app.branches.len() - 1;
                    } else {
                        *selected -= 1;
                    }
                }
            }
            KeyCode::Enter => {
                checkout_branch = app.branches.get(*selected).cloned();
            }
            _ => {}
        }
    }

    if let Some(branch) = checkout_branch {
        app.close_modal();
        if branch == app.current_branch {
            app.log(format!("already on {branch}"));
        } else {
            send_task(app, task_tx, BackendTask::Checkout { branch })?;
        }
    }

    Ok(())
}

pub(crate) fn handle_mouse_event(
    app: &mut App,
    mouse: MouseEvent,
    task_tx: &UnboundedSender<BackendTask>,
) -> Result<()> {
    let position = Position {
        x: mouse.column,
        y: mouse.row,
    };

    match mouse.kind {
        MouseEventKind::ScrollDown => {
            if app.layout.tree.contains(position) {
                app.select_next();
                maybe_enqueue_auto_view(app, task_tx)?;
            } else if app.layout.viewer.contains(position)
                || app.layout.minimap.contains(position)
            {
                let rows = viewer_rows(app);
                app.scroll_viewer_down(3, rows);
            } else if app.layout.log.contains(position) {
                app.scroll_log_down(3);
            }
        }
        MouseEventKind::ScrollUp => {
            if app.layout.tree.contains(position) {
                app.select_prev();
                maybe_enqueue_auto_view(app, task_tx)?;
            } else if app.layout.viewer.contains(position)
                || app.layout.minimap.contains(position)
            {
                app.scroll_viewer_up(3);
            } else if app.layout.log.contains(position) {
                app.scroll_log_up(3);
            }
        }
        MouseEventKind::Down(MouseButton::Left) => {
            if app.layout.minimap.contains(position) {
                minimap_press(app, mouse.row);
            } else if app.layout.viewer.contains(position) {
                app.focus = PaneFocus::Viewer;
                viewer_click(app, position);
            } else if app.layout.tree.contains(position) {
                app.focus = PaneFocus::Tree;
                tree_click(app, position, task_tx)?;
            } else if app.layout.log.contains(position) {
                app.focus = PaneFocus::Log;
            }
        }
        MouseEventKind::Drag(MouseButton::Left) => {
            if let Some(session) = app.drag {
                let rows = viewer_rows(app);
                let viewport = app.minimap_viewport(rows);
                let mapper = app.minimap_mapper();
                let y = minimap_y(app, mouse.row, &viewport);
                let target = mapper.scroll_for_drag(session, y, viewport);
                app.set_viewer_scroll(target, rows);
            }
        }
        MouseEventKind::Up(MouseButton::Left) => {
            app.drag = None;
        }
        _ => {}
    }

    Ok(())
}

/// Pressing inside the indicator starts a drag in place; pressing elsewhere
/// centers the viewport on the pressed point first.
fn minimap_press(app: &mut App, row: u16) {
    let rows = viewer_rows(app);
    let viewport = app.minimap_viewport(rows);
    let mapper = app.minimap_mapper();
    let geometry = mapper.geometry(viewport);
    let y = minimap_y(app, row, &viewport);

    if y < geometry.indicator_top || y >= geometry.indicator_top + geometry.indicator_height {
        let target = mapper.scroll_for_click(y, viewport);
        app.set_viewer_scroll(target, rows);
    }

    let viewport = app.minimap_viewport(rows);
    app.drag = Some(mapper.begin_drag(y, viewport));
}

/// Maps a terminal row inside the minimap strip into the mapper's content
/// coordinate space, sampling the cell's vertical center.
fn minimap_y(app: &App, row: u16, viewport: &crate::minimap::ViewportMetrics) -> f64 {
    let strip_rows = f64::from(app.layout.minimap.height.max(1));
    let offset = f64::from(row.saturating_sub(app.layout.minimap.y));
    let geometry = app.minimap_mapper().geometry(*viewport);
    (offset + 0.5) / strip_rows * geometry.content_height
}

fn viewer_click(app: &mut App, position: Position) {
    if app.viewer.mode != Some(ViewerMode::Source) {
        return;
    }

    let inner_x = app.layout.viewer.x + 1;
    let inner_y = app.layout.viewer.y + 1;
    let line = app.viewer.scroll_top + usize::from(position.y.saturating_sub(inner_y));
    let text_offset = ui::viewer_text_offset(app);
    let column = position.x.saturating_sub(inner_x).saturating_sub(text_offset);

    if let Some(cursor) = app.viewer.cursor.as_mut() {
        cursor.handle_click(line, f64::from(column), &MonospaceMetrics { char_width: 1.0 });
    }
}

fn tree_click(
    app: &mut App,
    position: Position,
    task_tx: &UnboundedSender<BackendTask>,
) -> Result<()> {
    let inner_y = app.layout.tree.y + 1;
    let index = app.tree_scroll() + usize::from(position.y.saturating_sub(inner_y));
    if index >= app.current_len() {
        return Ok(());
    }

    match app.view {
        ViewTab::Files | ViewTab::Changes => app.selected_index = index,
        ViewTab::Commits => app.commit_selected = index,
    }
    open_selected(app, task_tx)
}

fn open_selected(app: &mut App, task_tx: &UnboundedSender<BackendTask>) -> Result<()> {
    match app.view {
        ViewTab::Files => {
            let Some(entry) = app.selected_entry().cloned() else {
                return Ok(());
            };
            if entry.is_dir {
                if let Some(pending) = app.expand_selected_directory() {
                    send_task(app, task_tx, BackendTask::LoadTree { path: pending })?;
                }
            } else {
                send_task(app, task_tx, BackendTask::LoadFile { path: entry.path })?;
            }
        }
        ViewTab::Changes => {
            if let Some(path) = app.selected_changed_file() {
                send_task(app, task_tx, BackendTask::LoadDiff { path })?;
            }
        }
        ViewTab::Commits => {
            if let Some(commit) = app.selected_commit() {
                app.log(format!("{} {}", commit.short_hash(), commit.message));
            }
        }
    }
    Ok(())
}

/// Loads the pane content the new selection implies: file content in the
/// files view, a diff in the changes view. Skips requests the viewer
/// already shows.
fn maybe_enqueue_auto_view(app: &mut App, task_tx: &UnboundedSender<BackendTask>) -> Result<()> {
    match app.view {
        ViewTab::Files => {
            let Some(entry) = app.selected_entry().cloned() else {
                return Ok(());
            };
            if entry.is_dir {
                return Ok(());
            }
            if app.viewer.mode == Some(ViewerMode::Source)
                && app.viewer.path.as_deref() == Some(entry.path.as_path())
            {
                return Ok(());
            }
            send_task(app, task_tx, BackendTask::LoadFile { path: entry.path })
        }
        ViewTab::Changes => {
            let Some(path) = app.selected_changed_file() else {
                return Ok(());
            };
            if app.viewer.mode == Some(ViewerMode::Diff)
                && app.viewer.path.as_deref() == Some(path.as_path())
            {
                return Ok(());
            }
            send_task(app, task_tx, BackendTask::LoadDiff { path })
        }
        ViewTab::Commits => Ok(()),
    }
}

fn viewer_key(app: &mut App, key: CursorKey, ctrl: bool) {
    let rows = viewer_rows(app);
    match app.viewer.mode {
        Some(ViewerMode::Source) => {
            if let Some(cursor) = app.viewer.cursor.as_mut() {
                cursor.handle_key(key, ctrl);
            }
            app.follow_cursor(rows);
        }
        Some(ViewerMode::Diff) => match key {
            CursorKey::Up => {
                app.scroll_viewer_up(1);
            }
            CursorKey::Down => {
                app.scroll_viewer_down(1, rows);
            }
            CursorKey::PageUp => {
                app.scroll_viewer_up(20);
            }
            CursorKey::PageDown => {
                app.scroll_viewer_down(20, rows);
            }
            CursorKey::Home if ctrl => app.viewer.scroll_top = 0,
            CursorKey::End if ctrl => {
                app.viewer.scroll_top = app.viewer_max_scroll(rows);
            }
            _ => {}
        },
        None => {}
    }
}

fn normalize_key(code: KeyCode, vim: bool) -> KeyCode {
    if !vim {
        return code;
    }
    match code {
        KeyCode::Char('j') => KeyCode::Down,
        KeyCode::Char('k') => KeyCode::Up,
        KeyCode::Char('h') => KeyCode::Left,
        KeyCode::Char('l') => KeyCode::Right,
        other => other,
    }
}

fn viewer_rows(app: &App) -> usize {
    usize::from(app.layout.viewer.height.saturating_sub(2)).max(1)
}

fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::domain::{FileEntry, FileStatus};
    use ratatui::layout::Rect;
    use std::path::{Path, PathBuf};
    use tokio::sync::mpsc;

    fn app_with_tree() -> App {
        let mut app = App::new(AppConfig::default(), PathBuf::from("/repo"));
        app.set_children(
            PathBuf::from("/repo"),
            vec![
                FileEntry {
                    name: "src".to_string(),
                    path: PathBuf::from("/repo/src"),
                    is_dir: true,
                },
                FileEntry {
                    name: "main.rs".to_string(),
                    path: PathBuf::from("/repo/main.rs"),
                    is_dir: false,
                },
            ],
        );
        app
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn question_key_opens_help_modal() {
        let mut app = app_with_tree();
        let (task_tx, _task_rx) = mpsc::unbounded_channel::<BackendTask>();

        handle_key_without_modal(&mut app, key(KeyCode::Char('?')), &task_tx)
            .expect("handle key");
        assert!(matches!(app.modal, ModalState::Help));

        handle_help_key(&mut app, key(KeyCode::Esc)).expect("handle help key");
        assert!(matches!(app.modal, ModalState::None));
    }

    #[test]
    fn enter_on_unloaded_directory_requests_its_children() {
        let mut app = app_with_tree();
        let (task_tx, mut task_rx) = mpsc::unbounded_channel::<BackendTask>();

        handle_key_without_modal(&mut app, key(KeyCode::Enter), &task_tx).expect("handle key");

        let task = task_rx.try_recv().expect("tree task");
        assert!(matches!(
            task,
            BackendTask::LoadTree { path } if path == Path::new("/repo/src")
        ));
    }

    #[test]
    fn enter_on_file_requests_its_content() {
        let mut app = app_with_tree();
        app.selected_index = 1;
        let (task_tx, mut task_rx) = mpsc::unbounded_channel::<BackendTask>();

        handle_key_without_modal(&mut app, key(KeyCode::Enter), &task_tx).expect("handle key");

        let task = task_rx.try_recv().expect("file task");
        assert!(matches!(
            task,
            BackendTask::LoadFile { path } if path == Path::new("/repo/main.rs")
        ));
    }

    #[test]
    fn moving_selection_auto_loads_the_selected_file() {
        let mut app = app_with_tree();
        let (task_tx, mut task_rx) = mpsc::unbounded_channel::<BackendTask>();

        // src -> main.rs
        handle_key_without_modal(&mut app, key(KeyCode::Down), &task_tx).expect("handle key");

        let task = task_rx.try_recv().expect("auto file task");
        assert!(matches!(
            task,
            BackendTask::LoadFile { path } if path == Path::new("/repo/main.rs")
        ));
    }

    #[test]
    fn switching_to_changes_view_enqueues_auto_diff() {
        let mut app = app_with_tree();
        app.status.insert("a.rs".to_string(), FileStatus::Modified);
        let (task_tx, mut task_rx) = mpsc::unbounded_channel::<BackendTask>();

        handle_key_without_modal(&mut app, key(KeyCode::Char('3')), &task_tx)
            .expect("handle key");

        let task = task_rx.try_recv().expect("diff task");
        assert!(matches!(
            task,
            BackendTask::LoadDiff { path } if path == Path::new("/repo/a.rs")
        ));
    }

    #[test]
    fn duplicate_requests_are_coalesced() {
        let mut app = app_with_tree();
        let (task_tx, mut task_rx) = mpsc::unbounded_channel::<BackendTask>();

        send_task(&mut app, &task_tx, BackendTask::RefreshStatus).expect("send");
        send_task(&mut app, &task_tx, BackendTask::RefreshStatus).expect("send");

        assert!(task_rx.try_recv().is_ok());
        assert!(task_rx.try_recv().is_err());
    }

    #[test]
    fn status_event_settles_its_inflight_key() {
        let mut app = app_with_tree();
        let (task_tx, _task_rx) = mpsc::unbounded_channel::<BackendTask>();
        send_task(&mut app, &task_tx, BackendTask::RefreshStatus).expect("send");
        assert!(app.busy);

        handle_backend_event(
            &mut app,
            &task_tx,
            BackendEvent::StatusRefreshed {
                status: std::collections::HashMap::new(),
            },
        )
        .expect("handle event");

        assert!(!app.busy);
        assert!(!app.has_pending_tasks());
    }

    #[test]
    fn error_event_clears_matching_inflight_keys_and_logs() {
        let mut app = app_with_tree();
        let (task_tx, _task_rx) = mpsc::unbounded_channel::<BackendTask>();
        send_task(
            &mut app,
            &task_tx,
            BackendTask::LoadDiff {
                path: PathBuf::from("/repo/a.rs"),
            },
        )
        .expect("send");

        handle_backend_event(
            &mut app,
            &task_tx,
            BackendEvent::Error {
                context: "diff".to_string(),
                message: "boom".to_string(),
            },
        )
        .expect("handle event");

        assert!(!app.has_pending_tasks());
        assert!(app.logs.iter().any(|line| line.contains("error[diff]")));
    }

    #[test]
    fn checkout_event_reloads_status_log_branches_and_tree() {
        let mut app = app_with_tree();
        let (task_tx, mut task_rx) = mpsc::unbounded_channel::<BackendTask>();

        handle_backend_event(
            &mut app,
            &task_tx,
            BackendEvent::CheckedOut {
                branch: "develop".to_string(),
            },
        )
        .expect("handle event");

        assert_eq!(app.current_branch, "develop");
        let mut kinds = Vec::new();
        while let Ok(task) = task_rx.try_recv() {
            kinds.push(task.dedup_key());
        }
        assert!(kinds.contains(&"status".to_string()));
        assert!(kinds.contains(&"log".to_string()));
        assert!(kinds.contains(&"branches".to_string()));
        assert!(kinds.contains(&"tree:/repo".to_string()));
    }

    #[test]
    fn branch_picker_enter_sends_checkout() {
        let mut app = app_with_tree();
        app.branches = vec!["develop".to_string(), "main".to_string()];
        app.current_branch = "main".to_string();
        app.open_branch_picker();
        let (task_tx, mut task_rx) = mpsc::unbounded_channel::<BackendTask>();

        handle_branch_picker_key(&mut app, key(KeyCode::Up), &task_tx).expect("handle key");
        handle_branch_picker_key(&mut app, key(KeyCode::Enter), &task_tx).expect("handle key");

        assert!(matches!(app.modal, ModalState::None));
        let task = task_rx.try_recv().expect("checkout task");
        assert!(matches!(
            task,
            BackendTask::Checkout { branch } if branch == "develop"
        ));
    }

    #[test]
    fn blame_key_requests_blame_then_toggles_it_off() {
        let mut app = app_with_tree();
        app.set_viewer_source(Path::new("/repo/main.rs"), "fn main() {}".to_string());
        let (task_tx, mut task_rx) = mpsc::unbounded_channel::<BackendTask>();

        handle_key_without_modal(&mut app, key(KeyCode::Char('g')), &task_tx)
            .expect("handle key");
        let task = task_rx.try_recv().expect("blame task");
        assert!(matches!(task, BackendTask::LoadBlame { .. }));

        app.viewer.show_blame = true;
        handle_key_without_modal(&mut app, key(KeyCode::Char('g')), &task_tx)
            .expect("handle key");
        assert!(!app.viewer.show_blame);
    }

    #[test]
    fn minimap_click_scrolls_the_viewer() {
        let mut app = app_with_tree();
        let content = (0..200).map(|i| i.to_string()).collect::<Vec<_>>().join("\n");
        app.set_viewer_source(Path::new("/repo/big.txt"), content);
        app.layout.viewer = Rect::new(30, 0, 58, 22);
        app.layout.minimap = Rect::new(88, 0, 2, 22);
        let (task_tx, _task_rx) = mpsc::unbounded_channel::<BackendTask>();

        let press = MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column: 88,
            row: 20,
            modifiers: KeyModifiers::NONE,
        };
        handle_mouse_event(&mut app, press, &task_tx).expect("handle mouse");

        assert!(app.viewer.scroll_top > 0);
        assert!(app.drag.is_some());

        let release = MouseEvent {
            kind: MouseEventKind::Up(MouseButton::Left),
            column: 88,
            row: 20,
            modifiers: KeyModifiers::NONE,
        };
        handle_mouse_event(&mut app, release, &task_tx).expect("handle mouse");
        assert!(app.drag.is_none());
    }

    #[test]
    fn viewer_click_moves_the_cursor_past_the_gutter() {
        let mut app = app_with_tree();
        app.set_viewer_source(Path::new("/repo/main.rs"), "fn main() {}\nlet x = 1;".to_string());
        app.layout.viewer = Rect::new(30, 0, 58, 22);
        let (task_tx, _task_rx) = mpsc::unbounded_channel::<BackendTask>();

        let gutter = ui::viewer_text_offset(&app);
        let press = MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column: 31 + gutter + 3,
            row: 2,
            modifiers: KeyModifiers::NONE,
        };
        handle_mouse_event(&mut app, press, &task_tx).expect("handle mouse");

        assert_eq!(app.focus, PaneFocus::Viewer);
        let cursor = app.viewer.cursor.as_ref().expect("cursor");
        assert_eq!(cursor.position().line, 1);
        assert_eq!(cursor.position().column, 3);
    }

    #[test]
    fn wheel_in_viewer_scrolls_three_lines() {
        let mut app = app_with_tree();
        let content = (0..100).map(|i| i.to_string()).collect::<Vec<_>>().join("\n");
        app.set_viewer_source(Path::new("/repo/big.txt"), content);
        app.layout.viewer = Rect::new(30, 0, 58, 22);
        let (task_tx, _task_rx) = mpsc::unbounded_channel::<BackendTask>();

        let wheel = MouseEvent {
            kind: MouseEventKind::ScrollDown,
            column: 40,
            row: 5,
            modifiers: KeyModifiers::NONE,
        };
        handle_mouse_event(&mut app, wheel, &task_tx).expect("handle mouse");
        assert_eq!(app.viewer.scroll_top, 3);
    }

    #[test]
    fn human_size_picks_sensible_units() {
        assert_eq!(human_size(512), "512 B");
        assert_eq!(human_size(2048), "2.0 KiB");
        assert_eq!(human_size(5 * 1024 * 1024), "5.0 MiB");
    }
}
