use crate::domain::{DiffLine, DiffLineKind};

/// File headers emitted by `git diff` that carry no content lines.
fn is_header_line(line: &str) -> bool {
    line.starts_with("diff --git")
        || line.starts_with("index ")
        || line.starts_with("--- ")
        || line.starts_with("+++ ")
}

/// Parses unified-diff body text into classified lines with per-side
/// numbering.
///
/// Both counters start at 0 and advance purely by observed line kind; hunk
/// headers are skipped without seeding them. Diffs are always requested with
/// full-file context (`-U999999`), so the first content line is line 1 on
/// both sides and the counters stay correct. Lines without a recognized
/// prefix degrade to context lines instead of failing; the function is total
/// over any input.
pub fn parse_diff(diff: &str) -> Vec<DiffLine> {
    let mut parsed = Vec::new();
    let mut old_line_number: u32 = 0;
    let mut new_line_number: u32 = 0;

    for line in diff.lines() {
        if is_header_line(line) || line.starts_with("@@") {
            continue;
        }

        // +++/--- markers never count as content, spaced or not.
        if !line.starts_with("+++")
            && let Some(content) = line.strip_prefix('+')
        {
            new_line_number += 1;
            parsed.push(DiffLine {
                kind: DiffLineKind::Added,
                content: content.to_string(),
                old_line_number: None,
                new_line_number: Some(new_line_number),
            });
        } else if !line.starts_with("---")
            && let Some(content) = line.strip_prefix('-')
        {
            old_line_number += 1;
            parsed.push(DiffLine {
                kind: DiffLineKind::Removed,
                content: content.to_string(),
                old_line_number: Some(old_line_number),
                new_line_number: None,
            });
        } else {
            // Context if space-prefixed, but also the lenient fallback for
            // anything unrecognized (including empty lines).
            old_line_number += 1;
            new_line_number += 1;
            let content = line.strip_prefix(' ').unwrap_or(line);
            parsed.push(DiffLine {
                kind: DiffLineKind::Context,
                content: content.to_string(),
                old_line_number: Some(old_line_number),
                new_line_number: Some(new_line_number),
            });
        }
    }

    parsed
}
