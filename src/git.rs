use crate::domain::{BlameLine, CommandResult, Commit, DiffText, FileEntry, FileStatus};
use anyhow::{Context, Result, bail};
use std::collections::HashMap;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Instant;
use thiserror::Error;

/// Field and record separators for `git log` output. Unit separators keep
/// the parse trivial and immune to quotes or braces in commit subjects.
const LOG_FIELD_SEP: char = '\u{1f}';
const LOG_RECORD_SEP: char = '\u{1e}';

const VIEWER_MAX_BYTES: usize = 64 * 1024;
const BINARY_SAMPLE_BYTES: usize = 4096;

#[derive(Debug, Error)]
pub enum GitError {
    #[error("not a git repository: {}", .0.display())]
    NotARepository(PathBuf),
    #[error("git {command} failed: {stderr}")]
    CommandFailed { command: String, stderr: String },
}

pub trait GitClient: Send + Sync {
    fn status(&self) -> Result<HashMap<String, FileStatus>>;
    fn file_diff(&self, path: &Path) -> Result<DiffText>;
    fn blame(&self, path: &Path) -> Result<Vec<BlameLine>>;
    fn log(&self) -> Result<Vec<Commit>>;
    fn branches(&self) -> Result<Vec<String>>;
    fn current_branch(&self) -> Result<String>;
    fn checkout(&self, branch: &str) -> Result<()>;
    fn read_file(&self, path: &Path) -> Result<String>;
    fn list_directory(&self, path: &Path) -> Result<Vec<FileEntry>>;
    fn folder_size(&self, path: &Path) -> Result<u64>;
}

#[derive(Debug, Clone)]
pub struct ShellGitClient {
    binary: String,
    repo_root: PathBuf,
}

impl ShellGitClient {
    /// Binds a client to a repository root, refusing directories without a
    /// `.git` so every later command has a sane working directory.
    pub fn discover(repo_root: impl Into<PathBuf>) -> Result<Self> {
        let repo_root = repo_root.into();
        if !repo_root.join(".git").is_dir() {
            return Err(GitError::NotARepository(repo_root).into());
        }
        Ok(Self {
            binary: "git".to_string(),
            repo_root,
        })
    }

    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    fn run_raw<I, S>(&self, args: I) -> Result<CommandResult>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<OsString> = args
            .into_iter()
            .map(|arg| arg.as_ref().to_os_string())
            .collect();
        let mut cmd = Command::new(&self.binary);
        cmd.current_dir(&self.repo_root);
        cmd.args(&args);

        let started = Instant::now();
        let output = cmd
            .output()
            .with_context(|| format!("failed to execute {} {:?}", self.binary, args))?;
        let duration_ms = started.elapsed().as_millis() as u64;

        Ok(CommandResult {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            duration_ms,
        })
    }

    fn run_checked<I, S>(&self, command: &str, args: I) -> Result<CommandResult>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let result = self.run_raw(args)?;
        if result.exit_code != 0 {
            return Err(GitError::CommandFailed {
                command: command.to_string(),
                stderr: result.stderr.trim().to_string(),
            }
            .into());
        }
        Ok(result)
    }

    /// Git wants paths relative to the repository root; absolute paths from
    /// the tree pane are rebased, anything else passes through.
    fn relative<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.repo_root).unwrap_or(path)
    }
}

impl GitClient for ShellGitClient {
    fn status(&self) -> Result<HashMap<String, FileStatus>> {
        let result =
            self.run_checked("status", ["status", "--porcelain", "--untracked-files=all"])?;
        Ok(parse_status_output(&result.stdout))
    }

    fn file_diff(&self, path: &Path) -> Result<DiffText> {
        // Full-file context keeps the parsed line numbers exact without
        // hunk-header arithmetic.
        let relative = self.relative(path);
        let mut args: Vec<OsString> = ["--no-pager", "diff", "--no-color", "-U999999", "--"]
            .iter()
            .map(OsString::from)
            .collect();
        args.push(relative.as_os_str().to_os_string());

        let result = self.run_checked("diff", &args)?;
        Ok(DiffText {
            text: result.stdout,
        })
    }

    fn blame(&self, path: &Path) -> Result<Vec<BlameLine>> {
        let relative = self.relative(path);
        let mut args: Vec<OsString> = ["blame", "-w", "-M", "-C", "--line-porcelain", "--"]
            .iter()
            .map(OsString::from)
            .collect();
        args.push(relative.as_os_str().to_os_string());

        let result = self.run_checked("blame", &args)?;
        Ok(parse_blame_output(&result.stdout))
    }

    fn log(&self) -> Result<Vec<Commit>> {
        let format = format!(
            "--pretty=format:%H{LOG_FIELD_SEP}%an{LOG_FIELD_SEP}%ae{LOG_FIELD_SEP}%ad{LOG_FIELD_SEP}%s{LOG_RECORD_SEP}"
        );
        let result = self.run_checked(
            "log",
            ["--no-pager", "log", format.as_str(), "--date=iso"],
        )?;
        Ok(parse_log_output(&result.stdout))
    }

    fn branches(&self) -> Result<Vec<String>> {
        let result = self.run_checked("branch", ["branch", "-a"])?;
        Ok(parse_branch_output(&result.stdout))
    }

    fn current_branch(&self) -> Result<String> {
        let result = self.run_checked("branch", ["branch", "--show-current"])?;
        Ok(result.stdout.trim().to_string())
    }

    fn checkout(&self, branch: &str) -> Result<()> {
        self.run_checked("checkout", ["checkout", branch])?;
        Ok(())
    }

    fn read_file(&self, path: &Path) -> Result<String> {
        let metadata = std::fs::symlink_metadata(path)
            .with_context(|| format!("failed to stat: {}", path.display()))?;
        if metadata.file_type().is_dir() {
            bail!("{} is a directory", path.display());
        }

        let bytes =
            std::fs::read(path).with_context(|| format!("failed to read: {}", path.display()))?;
        let sample_len = bytes.len().min(BINARY_SAMPLE_BYTES);
        if bytes[..sample_len].contains(&0) {
            return Ok("Cannot view binary file.".to_string());
        }

        let limit = bytes.len().min(VIEWER_MAX_BYTES);
        let mut text = String::from_utf8_lossy(&bytes[..limit]).to_string();
        if bytes.len() > VIEWER_MAX_BYTES {
            text.push_str(&format!(
                "\n\n--- truncated at {} bytes (file size: {} bytes) ---",
                VIEWER_MAX_BYTES,
                bytes.len()
            ));
        }
        Ok(text)
    }

    fn list_directory(&self, path: &Path) -> Result<Vec<FileEntry>> {
        let read_dir = std::fs::read_dir(path)
            .with_context(|| format!("failed to read directory: {}", path.display()))?;

        let mut entries = Vec::new();
        for entry in read_dir {
            let entry =
                entry.with_context(|| format!("failed to read child in {}", path.display()))?;
            let entry_path = entry.path();
            let name = entry_path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let is_dir = entry_path.is_dir();
            entries.push(FileEntry {
                name,
                path: entry_path,
                is_dir,
            });
        }

        sort_entries(&mut entries);
        Ok(entries)
    }

    fn folder_size(&self, path: &Path) -> Result<u64> {
        if !path.exists() {
            return Ok(0);
        }

        #[cfg(not(target_os = "windows"))]
        {
            let output = Command::new("du")
                .arg("-sb")
                .arg(path)
                .output()
                .context("failed to execute du")?;
            if !output.status.success() {
                bail!(
                    "du failed: {}",
                    String::from_utf8_lossy(&output.stderr).trim()
                );
            }
            let stdout = String::from_utf8_lossy(&output.stdout);
            let size = stdout
                .split_whitespace()
                .next()
                .unwrap_or("0")
                .parse::<u64>()
                .context("failed to parse du output")?;
            Ok(size)
        }

        #[cfg(target_os = "windows")]
        {
            let script = format!(
                "(Get-ChildItem -Path '{}' -Recurse -ErrorAction SilentlyContinue | Measure-Object -Property Length -Sum).Sum",
                path.to_string_lossy().replace('/', "\\")
            );
            let output = Command::new("powershell")
                .args(["-Command", &script])
                .output()
                .context("failed to execute powershell")?;
            if !output.status.success() {
                bail!(
                    "powershell failed: {}",
                    String::from_utf8_lossy(&output.stderr).trim()
                );
            }
            let stdout = String::from_utf8_lossy(&output.stdout);
            let trimmed = stdout.trim();
            if trimmed.is_empty() {
                return Ok(0);
            }
            trimmed.parse::<u64>().context("failed to parse size")
        }
    }
}

/// Directories first, then names; what a file manager shows.
pub fn sort_entries(entries: &mut [FileEntry]) {
    entries.sort_by(|a, b| match (a.is_dir, b.is_dir) {
        (true, false) => std::cmp::Ordering::Less,
        (false, true) => std::cmp::Ordering::Greater,
        _ => a.name.cmp(&b.name),
    });
}

/// Parses `git status --porcelain` into root-relative path → status.
/// Renames keep only the destination path; backslashes are normalized so
/// keys line up with the ignore matcher.
pub fn parse_status_output(output: &str) -> HashMap<String, FileStatus> {
    let mut map = HashMap::new();

    for line in output.lines() {
        if line.len() < 4 {
            continue;
        }
        let code = &line[0..2];
        let path = line[3..].trim();
        if path.is_empty() {
            continue;
        }

        let path = match path.split_once(" -> ") {
            Some((_, destination)) => destination,
            None => path,
        };

        map.insert(path.replace('\\', "/"), FileStatus::from_porcelain(code));
    }

    map
}

/// Parses `git blame --line-porcelain`. A block header is a line whose
/// first word is all hex digits followed by at least two line numbers;
/// subsequent `author*`/`summary` lines fill in the open block.
pub fn parse_blame_output(output: &str) -> Vec<BlameLine> {
    let mut blame_lines = Vec::new();
    let mut current: Option<BlameLine> = None;
    let mut line_number = 1;

    for line in output.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let is_block_header = parts.len() >= 3
            && !parts[0].is_empty()
            && parts[0].chars().all(|c| c.is_ascii_hexdigit());

        if is_block_header {
            if let Some(done) = current.take() {
                blame_lines.push(done);
            }
            current = Some(BlameLine {
                author: String::new(),
                author_email: String::new(),
                timestamp: 0,
                line_number,
                commit_hash: parts[0].to_string(),
                commit_message: String::new(),
            });
            line_number += 1;
            continue;
        }

        let Some(block) = current.as_mut() else {
            continue;
        };

        if let Some(author) = line.strip_prefix("author ") {
            block.author = author.to_string();
        } else if let Some(mail) = line.strip_prefix("author-mail ") {
            block.author_email = mail
                .trim_start_matches('<')
                .trim_end_matches('>')
                .to_string();
        } else if let Some(time) = line.strip_prefix("author-time ")
            && let Ok(timestamp) = time.parse::<i64>()
        {
            block.timestamp = timestamp;
        } else if let Some(summary) = line.strip_prefix("summary ") {
            block.commit_message = summary.to_string();
        }
    }

    if let Some(done) = current {
        blame_lines.push(done);
    }

    blame_lines
}

/// Parses separator-delimited `git log` records. Records with the wrong
/// field count are dropped rather than failing the whole log.
pub fn parse_log_output(output: &str) -> Vec<Commit> {
    output
        .split(LOG_RECORD_SEP)
        .filter_map(|record| {
            let fields: Vec<&str> = record.trim_matches(['\n', ' ']).split(LOG_FIELD_SEP).collect();
            let [hash, author, email, date, message] = fields.as_slice() else {
                return None;
            };
            if hash.is_empty() {
                return None;
            }
            Some(Commit {
                hash: hash.to_string(),
                author: author.to_string(),
                email: email.to_string(),
                date: date.to_string(),
                message: message.to_string(),
            })
        })
        .collect()
}

/// Flattens `git branch -a` to unique local-style names, with the current
/// branch marker and `remotes/<origin>/` prefixes removed.
pub fn parse_branch_output(output: &str) -> Vec<String> {
    let mut branches: Vec<String> = Vec::new();

    for line in output.lines() {
        let branch = line.trim();
        if branch.is_empty() || branch.contains("->") {
            continue;
        }

        let name = if let Some(current) = branch.strip_prefix("* ") {
            current.trim().to_string()
        } else if let Some(remote) = branch.strip_prefix("remotes/") {
            let parts: Vec<&str> = remote.split('/').collect();
            if parts.len() >= 2 {
                parts[1..].join("/")
            } else {
                remote.to_string()
            }
        } else {
            branch.to_string()
        };

        if !name.is_empty() && !branches.contains(&name) {
            branches.push(name);
        }
    }

    branches.sort();
    branches
}
