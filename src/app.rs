use crate::cache::TtlCache;
use crate::config::AppConfig;
use crate::cursor::CursorModel;
use crate::domain::{BlameLine, Commit, DiffLine, DiffText, FileEntry, FileStatus};
use crate::highlight::RegexHighlighter;
use crate::ignore::IgnoreMatcher;
use crate::minimap::{DragSession, MinimapMapper, ViewportMetrics};
use crate::render::{self, TokenRow};
use ratatui::layout::Rect;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

const MAX_LOG_LINES: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaneFocus {
    Tree,
    Viewer,
    Log,
}

impl PaneFocus {
    pub fn next(self) -> Self {
        match self {
            Self::Tree => Self::Viewer,
            Self::Viewer => Self::Log,
            Self::Log => Self::Tree,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewTab {
    Files,
    Commits,
    Changes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModalState {
    None,
    Help,
    BranchPicker { selected: usize },
}

#[derive(Debug, Clone)]
pub enum BackendTask {
    RefreshStatus,
    LoadTree { path: PathBuf },
    LoadFile { path: PathBuf },
    LoadDiff { path: PathBuf },
    LoadBlame { path: PathBuf },
    LoadLog,
    LoadBranches,
    Checkout { branch: String },
    LoadFolderSize { path: PathBuf },
}

impl BackendTask {
    /// Stable key used to collapse duplicate in-flight requests.
    pub fn dedup_key(&self) -> String {
        match self {
            Self::RefreshStatus => "status".to_string(),
            Self::LoadTree { path } => format!("tree:{}", path.display()),
            Self::LoadFile { path } => format!("file:{}", path.display()),
            Self::LoadDiff { path } => format!("diff:{}", path.display()),
            Self::LoadBlame { path } => format!("blame:{}", path.display()),
            Self::LoadLog => "log".to_string(),
            Self::LoadBranches => "branches".to_string(),
            Self::Checkout { branch } => format!("checkout:{branch}"),
            Self::LoadFolderSize { path } => format!("size:{}", path.display()),
        }
    }
}

#[derive(Debug, Clone)]
pub enum BackendEvent {
    StatusRefreshed {
        status: HashMap<String, FileStatus>,
    },
    TreeLoaded {
        path: PathBuf,
        entries: Vec<FileEntry>,
    },
    FileLoaded {
        path: PathBuf,
        content: String,
    },
    DiffLoaded {
        path: PathBuf,
        diff: DiffText,
    },
    BlameLoaded {
        path: PathBuf,
        lines: Vec<BlameLine>,
    },
    LogLoaded {
        commits: Vec<Commit>,
    },
    BranchesLoaded {
        branches: Vec<String>,
        current: String,
    },
    CheckedOut {
        branch: String,
    },
    FolderSizeLoaded {
        path: PathBuf,
        size: u64,
    },
    Error {
        context: String,
        message: String,
    },
}

/// Pane rectangles from the last draw, kept for mouse routing.
#[derive(Debug, Clone, Copy, Default)]
pub struct LayoutAreas {
    pub tree: Rect,
    pub viewer: Rect,
    pub minimap: Rect,
    pub log: Rect,
}

#[derive(Debug, Clone)]
pub struct VisibleEntry {
    pub path: PathBuf,
    pub name: String,
    pub depth: usize,
    pub is_dir: bool,
    pub ignored: bool,
}

/// What the viewer pane currently shows for the selected file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerMode {
    Source,
    Diff,
}

#[derive(Default)]
pub struct ViewerState {
    pub path: Option<PathBuf>,
    pub mode: Option<ViewerMode>,
    pub cursor: Option<CursorModel>,
    pub rows: Vec<TokenRow>,
    pub diff_rows: Vec<(DiffLine, TokenRow)>,
    pub blame: Vec<BlameLine>,
    pub show_blame: bool,
    pub scroll_top: usize,
}

impl ViewerState {
    pub fn line_count(&self) -> usize {
        match self.mode {
            Some(ViewerMode::Source) => self.cursor.as_ref().map_or(0, CursorModel::line_count),
            Some(ViewerMode::Diff) => self.diff_rows.len(),
            None => 0,
        }
    }
}

pub struct App {
    pub config: AppConfig,
    pub repo_root: PathBuf,
    pub focus: PaneFocus,
    pub view: ViewTab,
    pub modal: ModalState,

    pub status: HashMap<String, FileStatus>,
    pub ignore: IgnoreMatcher,

    pub selected_index: usize,
    tree_scroll: usize,
    children: BTreeMap<PathBuf, Vec<FileEntry>>,
    expanded_dirs: BTreeSet<PathBuf>,
    visible_entries: Vec<VisibleEntry>,

    pub viewer: ViewerState,
    pub drag: Option<DragSession>,
    pub layout: LayoutAreas,

    pub commits: Vec<Commit>,
    pub commit_selected: usize,

    pub branches: Vec<String>,
    pub current_branch: String,

    pub folder_sizes: TtlCache<PathBuf, u64>,
    in_flight: HashSet<String>,

    pub logs: Vec<String>,
    pub log_tail_offset: usize,

    pub busy: bool,
    pub should_quit: bool,
}

impl App {
    pub fn new(config: AppConfig, repo_root: PathBuf) -> Self {
        let ttl = Duration::from_secs(config.folder_size_ttl_secs);
        Self {
            config,
            repo_root,
            focus: PaneFocus::Tree,
            view: ViewTab::Files,
            modal: ModalState::None,
            status: HashMap::new(),
            ignore: IgnoreMatcher::default(),
            selected_index: 0,
            tree_scroll: 0,
            children: BTreeMap::new(),
            expanded_dirs: BTreeSet::new(),
            visible_entries: Vec::new(),
            viewer: ViewerState::default(),
            drag: None,
            layout: LayoutAreas::default(),
            commits: Vec::new(),
            commit_selected: 0,
            branches: Vec::new(),
            current_branch: String::new(),
            folder_sizes: TtlCache::new(ttl),
            in_flight: HashSet::new(),
            logs: Vec::new(),
            log_tail_offset: 0,
            busy: false,
            should_quit: false,
        }
    }

    pub fn switch_view(&mut self, view: ViewTab) {
        self.view = view;
        self.selected_index = 0;
        self.tree_scroll = 0;
    }

    // --- in-flight bookkeeping ---------------------------------------------

    /// Marks a task key as pending. Returns false when the same request is
    /// already on the wire, so the caller skips enqueueing it again.
    pub fn begin_task(&mut self, key: String) -> bool {
        self.in_flight.insert(key)
    }

    pub fn finish_task(&mut self, key: &str) {
        self.in_flight.remove(key);
        self.busy = !self.in_flight.is_empty();
    }

    /// Error events carry only their context, so drop every pending key of
    /// that context rather than leaving it stuck in flight.
    pub fn fail_tasks(&mut self, context: &str) {
        let prefix = format!("{context}:");
        self.in_flight
            .retain(|key| key != context && !key.starts_with(&prefix));
        self.busy = !self.in_flight.is_empty();
    }

    pub fn has_pending_tasks(&self) -> bool {
        !self.in_flight.is_empty()
    }

    // --- gitignore / status annotation -------------------------------------

    pub fn set_ignore_source(&mut self, source: &str) {
        self.ignore = IgnoreMatcher::compile(source);
        self.rebuild_visible_entries();
    }

    /// Repo-relative key with forward slashes, the shape status and ignore
    /// lookups share.
    pub fn relative_key(&self, path: &Path) -> String {
        path.strip_prefix(&self.repo_root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }

    pub fn status_for(&self, path: &Path) -> Option<FileStatus> {
        self.status.get(&self.relative_key(path)).copied()
    }

    pub fn is_ignored(&self, path: &Path) -> bool {
        self.ignore
            .is_ignored(&path.to_string_lossy(), &self.repo_root.to_string_lossy())
    }

    // --- file tree ----------------------------------------------------------

    pub fn set_children(&mut self, dir: PathBuf, entries: Vec<FileEntry>) {
        self.children.insert(dir, entries);
        self.rebuild_visible_entries();
    }

    pub fn children_loaded(&self, dir: &Path) -> bool {
        self.children.contains_key(dir)
    }

    pub fn visible_entries(&self) -> &[VisibleEntry] {
        &self.visible_entries
    }

    pub fn selected_entry(&self) -> Option<&VisibleEntry> {
        self.visible_entries.get(self.selected_index)
    }

    pub fn selected_path(&self) -> Option<PathBuf> {
        self.selected_entry().map(|entry| entry.path.clone())
    }

    pub fn is_expanded(&self, path: &Path) -> bool {
        self.expanded_dirs.contains(path)
    }

    /// Expands the selected directory. Returns the directory path when its
    /// children still need loading.
    pub fn expand_selected_directory(&mut self) -> Option<PathBuf> {
        let entry = self.selected_entry().cloned()?;
        if !entry.is_dir {
            return None;
        }

        let path = entry.path;
        if self.expanded_dirs.insert(path.clone()) {
            self.rebuild_visible_entries_with_selection(Some(path.clone()));
        }
        (!self.children_loaded(&path)).then_some(path)
    }

    pub fn collapse_selected_directory_or_parent(&mut self) -> bool {
        let Some(selected_path) = self.selected_path() else {
            return false;
        };

        let mut current: Option<&Path> = Some(selected_path.as_path());
        while let Some(path) = current {
            let candidate = path.to_path_buf();
            if self.expanded_dirs.contains(&candidate) {
                self.collapse_tree(&candidate);
                self.rebuild_visible_entries_with_selection(Some(candidate));
                return true;
            }
            current = path.parent();
        }

        false
    }

    fn collapse_tree(&mut self, dir: &Path) {
        let targets: Vec<PathBuf> = self
            .expanded_dirs
            .iter()
            .filter(|p| p.starts_with(dir))
            .cloned()
            .collect();
        for target in targets {
            self.expanded_dirs.remove(&target);
        }
    }

    pub fn rebuild_visible_entries(&mut self) {
        let selected = self.selected_path();
        self.rebuild_visible_entries_with_selection(selected);
    }

    fn rebuild_visible_entries_with_selection(&mut self, preferred: Option<PathBuf>) {
        let previous = preferred.or_else(|| self.selected_path());
        let mut entries = Vec::new();
        let root = self.repo_root.clone();
        self.push_children_recursive(&root, 0, &mut entries);
        self.visible_entries = entries;

        if let Some(target) = previous
            && let Some(idx) = self.visible_entries.iter().position(|e| e.path == target)
        {
            self.selected_index = idx;
            return;
        }

        self.sync_selection_bounds();
    }

    fn push_children_recursive(&self, dir: &Path, depth: usize, out: &mut Vec<VisibleEntry>) {
        let Some(children) = self.children.get(dir) else {
            return;
        };

        for child in children {
            let ignored = self.is_ignored(&child.path);
            if ignored && !self.config.show_ignored_files {
                continue;
            }

            out.push(VisibleEntry {
                path: child.path.clone(),
                name: child.name.clone(),
                depth,
                is_dir: child.is_dir,
                ignored,
            });

            if child.is_dir && self.expanded_dirs.contains(&child.path) {
                self.push_children_recursive(&child.path, depth + 1, out);
            }
        }
    }

    /// Drops every loaded directory listing, e.g. after a branch switch
    /// invalidates the working tree.
    pub fn reset_tree(&mut self) {
        self.children.clear();
        self.expanded_dirs.clear();
        self.visible_entries.clear();
        self.selected_index = 0;
        self.tree_scroll = 0;
    }

    pub fn current_items(&self) -> Vec<String> {
        self.visible_entries
            .iter()
            .map(|entry| self.format_visible_entry(entry))
            .collect()
    }

    fn format_visible_entry(&self, entry: &VisibleEntry) -> String {
        let mut label = String::new();

        let badge = self
            .status_for(&entry.path)
            .map(FileStatus::badge)
            .unwrap_or(' ');
        label.push(badge);
        label.push(' ');

        label.push_str(&"  ".repeat(entry.depth));

        let marker = if entry.is_dir {
            if self.expanded_dirs.contains(&entry.path) {
                "[-]"
            } else {
                "[+]"
            }
        } else {
            "   "
        };
        label.push_str(marker);
        label.push(' ');
        label.push_str(&entry.name);
        if entry.is_dir {
            label.push('/');
        }

        label
    }

    // --- selection / scrolling ----------------------------------------------

    pub fn current_len(&self) -> usize {
        match self.view {
            ViewTab::Files => self.visible_entries.len(),
            ViewTab::Commits => self.commits.len(),
            ViewTab::Changes => self.changed_files().len(),
        }
    }

    pub fn select_next(&mut self) {
        let len = self.current_len();
        if len == 0 {
            self.set_selected(0);
            return;
        }
        self.set_selected((self.current_selected() + 1) % len);
    }

    pub fn select_prev(&mut self) {
        let len = self.current_len();
        if len == 0 {
            self.set_selected(0);
            return;
        }
        let current = self.current_selected();
        self.set_selected(if current == 0 { len - 1 } else { current - 1 });
    }

    fn current_selected(&self) -> usize {
        match self.view {
            ViewTab::Files | ViewTab::Changes => self.selected_index,
            ViewTab::Commits => self.commit_selected,
        }
    }

    fn set_selected(&mut self, index: usize) {
        match self.view {
            ViewTab::Files | ViewTab::Changes => self.selected_index = index,
            ViewTab::Commits => self.commit_selected = index,
        }
    }

    pub fn sync_selection_bounds(&mut self) {
        let len = self.current_len();
        if len == 0 {
            self.set_selected(0);
            self.tree_scroll = 0;
        } else if self.current_selected() >= len {
            self.set_selected(len - 1);
        }
    }

    pub fn tree_scroll(&self) -> usize {
        self.tree_scroll
    }

    pub fn sync_tree_scroll(&mut self, viewport_rows: usize) {
        let len = self.current_len();
        if len == 0 {
            self.tree_scroll = 0;
            return;
        }

        let rows = viewport_rows.max(1);
        let selected = self.current_selected();
        if selected < self.tree_scroll {
            self.tree_scroll = selected;
        } else if selected >= self.tree_scroll + rows {
            self.tree_scroll = selected + 1 - rows;
        }

        let max_offset = len.saturating_sub(rows);
        if self.tree_scroll > max_offset {
            self.tree_scroll = max_offset;
        }
    }

    // --- changes view -------------------------------------------------------

    /// Status map flattened to a stable list for the changes pane.
    pub fn changed_files(&self) -> Vec<(String, FileStatus)> {
        let mut files: Vec<(String, FileStatus)> = self
            .status
            .iter()
            .map(|(path, status)| (path.clone(), *status))
            .collect();
        files.sort_by(|a, b| a.0.cmp(&b.0));
        files
    }

    pub fn selected_changed_file(&self) -> Option<PathBuf> {
        let files = self.changed_files();
        files
            .get(self.selected_index)
            .map(|(path, _)| self.repo_root.join(path))
    }

    pub fn selected_commit(&self) -> Option<&Commit> {
        self.commits.get(self.commit_selected)
    }

    // --- viewer -------------------------------------------------------------

    pub fn set_viewer_source(&mut self, path: &Path, content: String) {
        let rows = match render::language_for_path(&path.to_string_lossy())
            .and_then(RegexHighlighter::for_language)
        {
            Some(highlighter) => render::highlighted_rows(&content, &highlighter),
            None => render::plain_token_rows(&content),
        };

        self.viewer.path = Some(path.to_path_buf());
        self.viewer.mode = Some(ViewerMode::Source);
        self.viewer.cursor = Some(CursorModel::new(&content, false));
        self.viewer.rows = rows;
        self.viewer.diff_rows.clear();
        self.viewer.blame.clear();
        self.viewer.show_blame = false;
        self.viewer.scroll_top = 0;
    }

    pub fn set_viewer_diff(&mut self, path: &Path, diff: &DiffText) {
        let lines = crate::diff::parse_diff(&diff.text);
        let content: String = lines
            .iter()
            .map(|line| line.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        let rows = match render::language_for_path(&path.to_string_lossy())
            .and_then(RegexHighlighter::for_language)
        {
            Some(highlighter) => render::highlighted_rows(&content, &highlighter),
            None => render::plain_token_rows(&content),
        };

        self.viewer.path = Some(path.to_path_buf());
        self.viewer.mode = Some(ViewerMode::Diff);
        self.viewer.cursor = None;
        self.viewer.rows.clear();
        self.viewer.diff_rows = render::attach_rows(lines, rows);
        self.viewer.blame.clear();
        self.viewer.show_blame = false;
        self.viewer.scroll_top = 0;
    }

    pub fn set_viewer_blame(&mut self, path: &Path, lines: Vec<BlameLine>) {
        if self.viewer.path.as_deref() == Some(path) {
            self.viewer.blame = lines;
            self.viewer.show_blame = true;
        }
    }

    pub fn clear_viewer(&mut self) {
        self.viewer = ViewerState::default();
        self.drag = None;
    }

    pub fn scroll_viewer_up(&mut self, lines: usize) -> bool {
        if self.viewer.scroll_top == 0 {
            return false;
        }
        self.viewer.scroll_top = self.viewer.scroll_top.saturating_sub(lines);
        true
    }

    pub fn scroll_viewer_down(&mut self, lines: usize, viewport_rows: usize) -> bool {
        let max = self.viewer_max_scroll(viewport_rows);
        if self.viewer.scroll_top >= max {
            return false;
        }
        self.viewer.scroll_top = (self.viewer.scroll_top + lines).min(max);
        true
    }

    pub fn viewer_max_scroll(&self, viewport_rows: usize) -> usize {
        self.viewer
            .line_count()
            .saturating_sub(viewport_rows.max(1))
    }

    /// Mapper for the current viewer buffer.
    pub fn minimap_mapper(&self) -> MinimapMapper {
        MinimapMapper::new(self.viewer.line_count())
    }

    /// Viewport measurements in row units; the mapper only cares that all
    /// three share a unit.
    pub fn minimap_viewport(&self, viewer_rows: usize) -> ViewportMetrics {
        ViewportMetrics {
            scroll_top: self.viewer.scroll_top as f64,
            viewport_height: viewer_rows.max(1) as f64,
            total_height: self.viewer.line_count() as f64,
        }
    }

    /// Applies a minimap-derived scroll target, rounding back to rows.
    pub fn set_viewer_scroll(&mut self, target: f64, viewer_rows: usize) {
        let max = self.viewer_max_scroll(viewer_rows);
        self.viewer.scroll_top = (target.round().max(0.0) as usize).min(max);
    }

    /// Keeps the caret visible after cursor motion.
    pub fn follow_cursor(&mut self, viewport_rows: usize) {
        let Some(cursor) = self.viewer.cursor.as_ref() else {
            return;
        };
        let line = cursor.position().line;
        let rows = viewport_rows.max(1);
        if line < self.viewer.scroll_top {
            self.viewer.scroll_top = line;
        } else if line >= self.viewer.scroll_top + rows {
            self.viewer.scroll_top = line + 1 - rows;
        }
    }

    // --- log ----------------------------------------------------------------

    pub fn log(&mut self, line: String) {
        self.logs.push(line);
        if self.log_tail_offset > 0 {
            self.log_tail_offset = self.log_tail_offset.saturating_add(1);
        }
        if self.logs.len() > MAX_LOG_LINES {
            let to_trim = self.logs.len() - MAX_LOG_LINES;
            self.logs.drain(0..to_trim);
            self.log_tail_offset = self.log_tail_offset.min(self.logs.len());
        }
    }

    pub fn scroll_log_up(&mut self, lines: usize) -> bool {
        let before = self.log_tail_offset;
        self.log_tail_offset = self.log_tail_offset.saturating_add(lines);
        self.log_tail_offset != before
    }

    pub fn scroll_log_down(&mut self, lines: usize) -> bool {
        let before = self.log_tail_offset;
        self.log_tail_offset = self.log_tail_offset.saturating_sub(lines);
        self.log_tail_offset != before
    }

    // --- modals -------------------------------------------------------------

    pub fn open_help(&mut self) {
        self.modal = ModalState::Help;
    }

    pub fn open_branch_picker(&mut self) {
        let selected = self
            .branches
            .iter()
            .position(|b| b == &self.current_branch)
            .unwrap_or(0);
        self.modal = ModalState::BranchPicker { selected };
    }

    pub fn close_modal(&mut self) {
        self.modal = ModalState::None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn entry(path: &str, is_dir: bool) -> FileEntry {
        FileEntry {
            name: Path::new(path)
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
            path: PathBuf::from(path),
            is_dir,
        }
    }

    fn app_with_root_children() -> App {
        let mut app = App::new(AppConfig::default(), PathBuf::from("/repo"));
        app.set_children(
            PathBuf::from("/repo"),
            vec![
                entry("/repo/src", true),
                entry("/repo/Cargo.toml", false),
                entry("/repo/target", true),
            ],
        );
        app
    }

    #[test]
    fn tree_flattens_loaded_children_in_order() {
        let app = app_with_root_children();
        let items = app.current_items();
        assert_eq!(items.len(), 3);
        assert!(items[0].contains("src/"));
        assert!(items[1].contains("Cargo.toml"));
    }

    #[test]
    fn expanding_unloaded_directory_reports_missing_children() {
        let mut app = app_with_root_children();
        let pending = app.expand_selected_directory();
        assert_eq!(pending, Some(PathBuf::from("/repo/src")));

        app.set_children(
            PathBuf::from("/repo/src"),
            vec![entry("/repo/src/main.rs", false)],
        );
        let items = app.current_items();
        assert!(items.iter().any(|line| line.contains("main.rs")));

        // already loaded now, nothing further to fetch
        assert_eq!(app.expand_selected_directory(), None);
    }

    #[test]
    fn collapse_walks_up_to_the_nearest_expanded_ancestor() {
        let mut app = app_with_root_children();
        app.expand_selected_directory();
        app.set_children(
            PathBuf::from("/repo/src"),
            vec![entry("/repo/src/main.rs", false)],
        );
        app.select_next();
        assert_eq!(app.selected_path(), Some(PathBuf::from("/repo/src/main.rs")));

        assert!(app.collapse_selected_directory_or_parent());
        assert_eq!(app.selected_path(), Some(PathBuf::from("/repo/src")));
        assert!(!app.is_expanded(Path::new("/repo/src")));
    }

    #[test]
    fn ignored_entries_are_hidden_unless_configured() {
        let mut app = app_with_root_children();
        app.set_ignore_source("/target\n");
        let items = app.current_items();
        assert!(!items.iter().any(|line| line.contains("target/")));

        app.config.show_ignored_files = true;
        app.rebuild_visible_entries();
        let items = app.current_items();
        assert!(items.iter().any(|line| line.contains("target/")));
        let target = app
            .visible_entries()
            .iter()
            .find(|e| e.name == "target")
            .expect("target entry");
        assert!(target.ignored);
    }

    #[test]
    fn git_directory_never_shows_even_without_patterns() {
        let mut app = App::new(AppConfig::default(), PathBuf::from("/repo"));
        app.set_children(
            PathBuf::from("/repo"),
            vec![entry("/repo/.git", true), entry("/repo/src", true)],
        );
        let items = app.current_items();
        assert!(!items.iter().any(|line| line.contains(".git/")));
    }

    #[test]
    fn status_badges_annotate_tree_items() {
        let mut app = app_with_root_children();
        app.status
            .insert("Cargo.toml".to_string(), FileStatus::Modified);
        app.rebuild_visible_entries();
        let items = app.current_items();
        let cargo = items
            .iter()
            .find(|line| line.contains("Cargo.toml"))
            .expect("cargo line");
        assert!(cargo.starts_with('M'));
    }

    #[test]
    fn selection_wraps_and_stays_bounded() {
        let mut app = app_with_root_children();
        app.select_prev();
        assert_eq!(app.selected_index, 2);
        app.select_next();
        assert_eq!(app.selected_index, 0);

        app.selected_index = 10;
        app.sync_selection_bounds();
        assert_eq!(app.selected_index, 2);
    }

    #[test]
    fn tree_scroll_moves_only_at_view_edges() {
        let mut app = App::new(AppConfig::default(), PathBuf::from("/repo"));
        let children: Vec<FileEntry> = (0..20)
            .map(|i| entry(&format!("/repo/file-{i:02}"), false))
            .collect();
        app.set_children(PathBuf::from("/repo"), children);

        app.selected_index = 10;
        app.sync_tree_scroll(5);
        assert_eq!(app.tree_scroll(), 6);

        app.selected_index = 9;
        app.sync_tree_scroll(5);
        assert_eq!(app.tree_scroll(), 6);

        app.selected_index = 5;
        app.sync_tree_scroll(5);
        assert_eq!(app.tree_scroll(), 5);
    }

    #[test]
    fn in_flight_keys_dedupe_requests() {
        let mut app = App::new(AppConfig::default(), PathBuf::from("/repo"));
        let task = BackendTask::LoadDiff {
            path: PathBuf::from("/repo/a.rs"),
        };
        assert!(app.begin_task(task.dedup_key()));
        assert!(!app.begin_task(task.dedup_key()));
        app.finish_task(&task.dedup_key());
        assert!(app.begin_task(task.dedup_key()));
    }

    #[test]
    fn viewer_source_builds_cursor_and_rows() {
        let mut app = App::new(AppConfig::default(), PathBuf::from("/repo"));
        app.set_viewer_source(Path::new("/repo/main.rs"), "fn main() {}\n".to_string());

        assert_eq!(app.viewer.mode, Some(ViewerMode::Source));
        let cursor = app.viewer.cursor.as_ref().expect("cursor");
        assert_eq!(cursor.line_count(), 2);
        assert_eq!(app.viewer.rows.len(), 2);
    }

    #[test]
    fn viewer_diff_pairs_lines_with_rows() {
        let mut app = App::new(AppConfig::default(), PathBuf::from("/repo"));
        let diff = DiffText {
            text: "@@ -1,1 +1,2 @@\n fn main() {}\n+// new\n".to_string(),
        };
        app.set_viewer_diff(Path::new("/repo/main.rs"), &diff);

        assert_eq!(app.viewer.mode, Some(ViewerMode::Diff));
        assert_eq!(app.viewer.diff_rows.len(), 2);
        assert!(app.viewer.cursor.is_none());
    }

    #[test]
    fn blame_only_attaches_to_the_current_file() {
        let mut app = App::new(AppConfig::default(), PathBuf::from("/repo"));
        app.set_viewer_source(Path::new("/repo/a.rs"), "x".to_string());

        let line = BlameLine {
            author: "Alice".to_string(),
            author_email: String::new(),
            timestamp: 0,
            line_number: 1,
            commit_hash: "abc".to_string(),
            commit_message: String::new(),
        };
        app.set_viewer_blame(Path::new("/repo/other.rs"), vec![line.clone()]);
        assert!(!app.viewer.show_blame);

        app.set_viewer_blame(Path::new("/repo/a.rs"), vec![line]);
        assert!(app.viewer.show_blame);
    }

    #[test]
    fn viewer_scroll_is_clamped_and_follows_cursor() {
        let mut app = App::new(AppConfig::default(), PathBuf::from("/repo"));
        let content = (0..40).map(|i| i.to_string()).collect::<Vec<_>>().join("\n");
        app.set_viewer_source(Path::new("/repo/a.txt"), content);

        assert!(app.scroll_viewer_down(100, 10));
        assert_eq!(app.viewer.scroll_top, 30);
        assert!(!app.scroll_viewer_down(1, 10));
        assert!(app.scroll_viewer_up(100));
        assert_eq!(app.viewer.scroll_top, 0);

        if let Some(cursor) = app.viewer.cursor.as_mut() {
            cursor.set_position(crate::domain::CursorPosition { line: 25, column: 0 });
        }
        app.follow_cursor(10);
        assert_eq!(app.viewer.scroll_top, 16);
    }

    #[test]
    fn changed_files_are_sorted_and_resolve_absolute_paths() {
        let mut app = App::new(AppConfig::default(), PathBuf::from("/repo"));
        app.status.insert("b.rs".to_string(), FileStatus::Modified);
        app.status.insert("a.rs".to_string(), FileStatus::Untracked);
        app.switch_view(ViewTab::Changes);

        let files = app.changed_files();
        assert_eq!(files[0].0, "a.rs");
        assert_eq!(app.selected_changed_file(), Some(PathBuf::from("/repo/a.rs")));
    }

    #[test]
    fn log_preserves_manual_scroll_position_when_new_entries_arrive() {
        let mut app = App::new(AppConfig::default(), PathBuf::from("/repo"));
        app.scroll_log_up(4);
        app.log("line-1".to_string());
        app.log("line-2".to_string());
        assert_eq!(app.log_tail_offset, 6);
    }

    #[test]
    fn log_trimming_keeps_scroll_offset_within_the_buffer() {
        let mut app = App::new(AppConfig::default(), PathBuf::from("/repo"));
        for i in 0..500 {
            app.log(format!("line-{i}"));
        }
        app.scroll_log_up(500);

        for i in 0..10 {
            app.log(format!("extra-{i}"));
        }

        assert_eq!(app.logs.len(), 500);
        assert!(app.log_tail_offset <= app.logs.len());
    }

    #[test]
    fn branch_picker_starts_on_the_current_branch() {
        let mut app = App::new(AppConfig::default(), PathBuf::from("/repo"));
        app.branches = vec!["develop".to_string(), "main".to_string()];
        app.current_branch = "main".to_string();
        app.open_branch_picker();
        assert_eq!(app.modal, ModalState::BranchPicker { selected: 1 });
    }
}
