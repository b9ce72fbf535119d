use crate::domain::DiffLine;
use crate::highlight::{Highlighter, Token};

/// One rendered line as a sequence of classified spans.
pub type TokenRow = Vec<Token>;

/// Maps a file name to a highlighter language identifier by extension.
pub fn language_for_path(path: &str) -> Option<&'static str> {
    let ext = path.rsplit('.').next()?.to_lowercase();
    let language = match ext.as_str() {
        "js" | "mjs" | "cjs" => "javascript",
        "jsx" => "jsx",
        "ts" => "typescript",
        "tsx" => "tsx",
        "py" => "python",
        "rs" => "rust",
        "json" => "json",
        "css" => "css",
        "html" => "html",
        "md" => "markdown",
        "yml" | "yaml" => "yaml",
        "xml" => "xml",
        "toml" => "toml",
        "sh" | "bash" | "zsh" => "bash",
        _ => return None,
    };
    Some(language)
}

/// Last path component, tolerating both separators.
pub fn file_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// Fallback tokenization: one plain token per line, no classification.
/// Empty input yields no rows at all, not one empty row.
pub fn plain_token_rows(text: &str) -> Vec<TokenRow> {
    if text.is_empty() {
        return Vec::new();
    }
    text.split('\n')
        .map(|line| vec![Token::plain(line)])
        .collect()
}

/// Runs a highlighter over every line of a buffer.
pub fn highlighted_rows(text: &str, highlighter: &dyn Highlighter) -> Vec<TokenRow> {
    if text.is_empty() {
        return Vec::new();
    }
    text.split('\n')
        .map(|line| highlighter.highlight_line(line))
        .collect()
}

/// Pairs parsed diff lines with token rows positionally. A diff line with
/// no matching row (highlighting raced the diff, or lengths diverged) gets
/// a plain token of its own content so rendering never loses text.
pub fn attach_rows(lines: Vec<DiffLine>, mut rows: Vec<TokenRow>) -> Vec<(DiffLine, TokenRow)> {
    rows.resize(lines.len().max(rows.len()), TokenRow::new());
    lines
        .into_iter()
        .zip(rows)
        .map(|(line, row)| {
            if row.is_empty() && !line.content.is_empty() {
                let fallback = vec![Token::plain(line.content.clone())];
                (line, fallback)
            } else {
                (line, row)
            }
        })
        .collect()
}

/// Human-readable age of a unix timestamp relative to `now`.
pub fn time_ago(timestamp: i64, now: i64) -> String {
    let seconds = (now - timestamp).max(0);
    let minutes = seconds / 60;
    let hours = minutes / 60;
    let days = hours / 24;
    let months = days / 30;
    let years = days / 365;

    let plural = |n: i64, unit: &str| {
        if n == 1 {
            format!("{n} {unit} ago")
        } else {
            format!("{n} {unit}s ago")
        }
    };

    if seconds < 60 {
        "just now".to_string()
    } else if minutes < 60 {
        plural(minutes, "minute")
    } else if hours < 24 {
        plural(hours, "hour")
    } else if days < 30 {
        plural(days, "day")
    } else if months < 12 {
        plural(months, "month")
    } else {
        plural(years, "year")
    }
}
