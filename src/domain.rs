use std::fmt;
use std::path::PathBuf;

/// Classification of one line of a unified diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffLineKind {
    Added,
    Removed,
    Context,
}

/// One parsed diff line with per-side numbering.
///
/// `Added` lines carry only `new_line_number`, `Removed` lines only
/// `old_line_number`, `Context` lines both. Numbers are strictly increasing
/// per side across a parsed sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffLine {
    pub kind: DiffLineKind,
    pub content: String,
    pub old_line_number: Option<u32>,
    pub new_line_number: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffText {
    pub text: String,
}

/// Logical caret position inside a line buffer. Both fields are zero-based;
/// `column` may equal the line length (caret after the last character).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CursorPosition {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    Modified,
    Added,
    Deleted,
    Renamed,
    Copied,
    Unmerged,
    Untracked,
    Unknown,
}

impl FileStatus {
    pub fn from_porcelain(code: &str) -> Self {
        match code {
            " M" | "M " | "MM" => Self::Modified,
            "A " | "AM" | "AD" => Self::Added,
            "D " | " D" => Self::Deleted,
            "R " => Self::Renamed,
            "C " => Self::Copied,
            "U " | "UU" => Self::Unmerged,
            "??" => Self::Untracked,
            _ => Self::Unknown,
        }
    }

    pub fn badge(self) -> char {
        match self {
            Self::Modified => 'M',
            Self::Added => 'A',
            Self::Deleted => 'D',
            Self::Renamed => 'R',
            Self::Copied => 'C',
            Self::Unmerged => 'U',
            Self::Untracked => '?',
            Self::Unknown => ' ',
        }
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Modified => "modified",
            Self::Added => "added",
            Self::Deleted => "deleted",
            Self::Renamed => "renamed",
            Self::Copied => "copied",
            Self::Unmerged => "unmerged",
            Self::Untracked => "untracked",
            Self::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

/// One entry from a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub name: String,
    pub path: PathBuf,
    pub is_dir: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub hash: String,
    pub author: String,
    pub email: String,
    pub date: String,
    pub message: String,
}

impl Commit {
    pub fn short_hash(&self) -> &str {
        let end = self.hash.len().min(8);
        &self.hash[..end]
    }
}

/// One line of `git blame --line-porcelain` output, flattened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlameLine {
    pub author: String,
    pub author_email: String,
    pub timestamp: i64,
    pub line_number: usize,
    pub commit_hash: String,
    pub commit_message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn porcelain_codes_map_to_statuses() {
        assert_eq!(FileStatus::from_porcelain(" M"), FileStatus::Modified);
        assert_eq!(FileStatus::from_porcelain("??"), FileStatus::Untracked);
        assert_eq!(FileStatus::from_porcelain("A "), FileStatus::Added);
        assert_eq!(FileStatus::from_porcelain("ZZ"), FileStatus::Unknown);
    }

    #[test]
    fn short_hash_truncates_but_tolerates_short_input() {
        let commit = Commit {
            hash: "0123456789abcdef".to_string(),
            author: String::new(),
            email: String::new(),
            date: String::new(),
            message: String::new(),
        };
        assert_eq!(commit.short_hash(), "01234567");

        let short = Commit {
            hash: "abc".to_string(),
            ..commit
        };
        assert_eq!(short.short_hash(), "abc");
    }
}
