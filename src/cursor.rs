use crate::domain::CursorPosition;

/// Navigation and edit keys understood by the cursor model, already
/// decoupled from any input backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorKey {
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    Char(char),
    Backspace,
    Enter,
    Delete,
}

/// Lines jumped by PageUp/PageDown.
const PAGE_STEP: usize = 10;

/// Maps a horizontal pixel offset within a rendered line to a column.
///
/// The viewer itself only knows logical columns; how wide a character is
/// belongs to whatever rendered it, so hit-testing goes through this seam.
pub trait PixelToPosition {
    fn column_at(&self, x: f64) -> usize;
}

/// Fixed-advance font metrics. The default width approximates a 14 px
/// monospace face; terminal cells use a width of 1.
#[derive(Debug, Clone, Copy)]
pub struct MonospaceMetrics {
    pub char_width: f64,
}

impl Default for MonospaceMetrics {
    fn default() -> Self {
        Self { char_width: 8.4 }
    }
}

impl PixelToPosition for MonospaceMetrics {
    fn column_at(&self, x: f64) -> usize {
        if self.char_width <= 0.0 {
            return 0;
        }
        (x / self.char_width).round().max(0.0) as usize
    }
}

/// A caret over a line buffer. Read-only unless `editable` is set; every
/// mutation of `position` passes through the clamp in [`Self::set_position`],
/// so the position is always valid for the current buffer.
///
/// Columns are counted in characters, not bytes, so multibyte content
/// navigates one glyph at a time.
#[derive(Debug, Clone)]
pub struct CursorModel {
    lines: Vec<String>,
    position: CursorPosition,
    editable: bool,
}

impl CursorModel {
    pub fn new(content: &str, editable: bool) -> Self {
        Self {
            // split, not lines(): empty content is one empty line and a
            // trailing newline is a real final empty line the caret can sit on
            lines: content.split('\n').map(str::to_string).collect(),
            position: CursorPosition::default(),
            editable,
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn position(&self) -> CursorPosition {
        self.position
    }

    pub fn content(&self) -> String {
        self.lines.join("\n")
    }

    fn line_len(&self, line: usize) -> usize {
        self.lines.get(line).map_or(0, |l| l.chars().count())
    }

    /// Clamps the requested position into the buffer and stores it. Returns
    /// the effective position.
    pub fn set_position(&mut self, requested: CursorPosition) -> CursorPosition {
        let line = requested.line.min(self.lines.len().saturating_sub(1));
        let column = requested.column.min(self.line_len(line));
        self.position = CursorPosition { line, column };
        self.position
    }

    /// Applies one key. Returns `true` when the buffer content changed,
    /// which only happens for edit keys on an editable model.
    pub fn handle_key(&mut self, key: CursorKey, ctrl: bool) -> bool {
        let CursorPosition { line, column } = self.position;
        let current_len = self.line_len(line);

        match key {
            CursorKey::Up => {
                if line > 0 {
                    self.set_position(CursorPosition {
                        line: line - 1,
                        column,
                    });
                }
            }
            CursorKey::Down => {
                if line + 1 < self.lines.len() {
                    self.set_position(CursorPosition {
                        line: line + 1,
                        column,
                    });
                }
            }
            CursorKey::Left => {
                if column > 0 {
                    self.set_position(CursorPosition {
                        line,
                        column: column - 1,
                    });
                } else if line > 0 {
                    let column = self.line_len(line - 1);
                    self.set_position(CursorPosition {
                        line: line - 1,
                        column,
                    });
                }
            }
            CursorKey::Right => {
                if column < current_len {
                    self.set_position(CursorPosition {
                        line,
                        column: column + 1,
                    });
                } else if line + 1 < self.lines.len() {
                    self.set_position(CursorPosition {
                        line: line + 1,
                        column: 0,
                    });
                }
            }
            CursorKey::Home => {
                if ctrl {
                    self.set_position(CursorPosition { line: 0, column: 0 });
                } else {
                    self.set_position(CursorPosition { line, column: 0 });
                }
            }
            CursorKey::End => {
                if ctrl {
                    let last = self.lines.len().saturating_sub(1);
                    let column = self.line_len(last);
                    self.set_position(CursorPosition { line: last, column });
                } else {
                    self.set_position(CursorPosition {
                        line,
                        column: current_len,
                    });
                }
            }
            CursorKey::PageUp => {
                self.set_position(CursorPosition {
                    line: line.saturating_sub(PAGE_STEP),
                    column,
                });
            }
            CursorKey::PageDown => {
                self.set_position(CursorPosition {
                    line: line + PAGE_STEP,
                    column,
                });
            }
            CursorKey::Char(ch) => {
                if self.editable && !ctrl {
                    self.insert_char(line, column, ch);
                    self.set_position(CursorPosition {
                        line,
                        column: column + 1,
                    });
                    return true;
                }
            }
            CursorKey::Backspace => {
                if self.editable {
                    if column > 0 {
                        self.remove_char(line, column - 1);
                        self.set_position(CursorPosition {
                            line,
                            column: column - 1,
                        });
                        return true;
                    } else if line > 0 {
                        let column = self.line_len(line - 1);
                        let tail = self.lines.remove(line);
                        self.lines[line - 1].push_str(&tail);
                        self.set_position(CursorPosition {
                            line: line - 1,
                            column,
                        });
                        return true;
                    }
                }
            }
            CursorKey::Enter => {
                if self.editable {
                    let split_at = byte_index(&self.lines[line], column);
                    let tail = self.lines[line].split_off(split_at);
                    self.lines.insert(line + 1, tail);
                    self.set_position(CursorPosition {
                        line: line + 1,
                        column: 0,
                    });
                    return true;
                }
            }
            CursorKey::Delete => {
                if self.editable {
                    if column < current_len {
                        self.remove_char(line, column);
                        return true;
                    } else if line + 1 < self.lines.len() {
                        let tail = self.lines.remove(line + 1);
                        self.lines[line].push_str(&tail);
                        return true;
                    }
                }
            }
        }

        false
    }

    /// Hit-tests a click at a rendered line and horizontal offset. The line
    /// comes from which row was hit; the column is estimated through the
    /// metrics seam and clamped like any other position.
    pub fn handle_click(&mut self, line: usize, x: f64, metrics: &dyn PixelToPosition) -> CursorPosition {
        self.set_position(CursorPosition {
            line,
            column: metrics.column_at(x),
        })
    }

    fn insert_char(&mut self, line: usize, column: usize, ch: char) {
        let at = byte_index(&self.lines[line], column);
        self.lines[line].insert(at, ch);
    }

    fn remove_char(&mut self, line: usize, column: usize) {
        let at = byte_index(&self.lines[line], column);
        self.lines[line].remove(at);
    }
}

fn byte_index(line: &str, column: usize) -> usize {
    line.char_indices()
        .nth(column)
        .map_or(line.len(), |(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn pos(line: usize, column: usize) -> CursorPosition {
        CursorPosition { line, column }
    }

    #[test]
    fn set_position_clamps_line_then_column() {
        let mut cursor = CursorModel::new("short\nlonger line\nab", false);
        assert_eq!(cursor.set_position(pos(99, 99)), pos(2, 2));
        assert_eq!(cursor.set_position(pos(1, 99)), pos(1, 11));
        assert_eq!(cursor.set_position(pos(0, 3)), pos(0, 3));
    }

    #[test]
    fn vertical_moves_clamp_column_to_target_line() {
        let mut cursor = CursorModel::new("longer line\nab\nlonger again", false);
        cursor.set_position(pos(0, 8));
        cursor.handle_key(CursorKey::Down, false);
        assert_eq!(cursor.position(), pos(1, 2));
        // the clamp is not sticky: the shorter column carries forward
        cursor.handle_key(CursorKey::Down, false);
        assert_eq!(cursor.position(), pos(2, 2));
    }

    #[test]
    fn horizontal_moves_wrap_across_line_boundaries() {
        let mut cursor = CursorModel::new("ab\ncd", false);
        cursor.set_position(pos(1, 0));
        cursor.handle_key(CursorKey::Left, false);
        assert_eq!(cursor.position(), pos(0, 2));
        cursor.handle_key(CursorKey::Right, false);
        assert_eq!(cursor.position(), pos(1, 0));
    }

    #[test]
    fn arrows_are_inert_at_buffer_edges() {
        let mut cursor = CursorModel::new("ab", false);
        cursor.handle_key(CursorKey::Up, false);
        cursor.handle_key(CursorKey::Left, false);
        assert_eq!(cursor.position(), pos(0, 0));
        cursor.set_position(pos(0, 2));
        cursor.handle_key(CursorKey::Down, false);
        cursor.handle_key(CursorKey::Right, false);
        assert_eq!(cursor.position(), pos(0, 2));
    }

    #[test]
    fn home_and_end_target_line_or_document_with_ctrl() {
        let mut cursor = CursorModel::new("first\nmiddle\nlast line", false);
        cursor.set_position(pos(1, 3));
        cursor.handle_key(CursorKey::End, false);
        assert_eq!(cursor.position(), pos(1, 6));
        cursor.handle_key(CursorKey::Home, false);
        assert_eq!(cursor.position(), pos(1, 0));
        cursor.handle_key(CursorKey::End, true);
        assert_eq!(cursor.position(), pos(2, 9));
        cursor.handle_key(CursorKey::Home, true);
        assert_eq!(cursor.position(), pos(0, 0));
    }

    #[test]
    fn page_keys_move_ten_lines_and_saturate() {
        let content = (0..30).map(|i| i.to_string()).collect::<Vec<_>>().join("\n");
        let mut cursor = CursorModel::new(&content, false);
        cursor.set_position(pos(4, 1));
        cursor.handle_key(CursorKey::PageUp, false);
        assert_eq!(cursor.position(), pos(0, 1));
        cursor.handle_key(CursorKey::PageDown, false);
        assert_eq!(cursor.position().line, 10);
        cursor.set_position(pos(25, 0));
        cursor.handle_key(CursorKey::PageDown, false);
        assert_eq!(cursor.position().line, 29);
    }

    #[test]
    fn edits_are_ignored_when_read_only() {
        let mut cursor = CursorModel::new("abc", false);
        assert!(!cursor.handle_key(CursorKey::Char('x'), false));
        assert!(!cursor.handle_key(CursorKey::Backspace, false));
        assert!(!cursor.handle_key(CursorKey::Enter, false));
        assert_eq!(cursor.content(), "abc");
    }

    #[test]
    fn insert_backspace_and_enter_edit_the_buffer() {
        let mut cursor = CursorModel::new("ab", true);
        cursor.set_position(pos(0, 1));
        assert!(cursor.handle_key(CursorKey::Char('x'), false));
        assert_eq!(cursor.content(), "axb");
        assert_eq!(cursor.position(), pos(0, 2));

        assert!(cursor.handle_key(CursorKey::Enter, false));
        assert_eq!(cursor.content(), "ax\nb");
        assert_eq!(cursor.position(), pos(1, 0));

        assert!(cursor.handle_key(CursorKey::Backspace, false));
        assert_eq!(cursor.content(), "axb");
        assert_eq!(cursor.position(), pos(0, 2));
    }

    #[test]
    fn delete_removes_forward_and_joins_lines() {
        let mut cursor = CursorModel::new("abc\ndef", true);
        cursor.set_position(pos(0, 1));
        assert!(cursor.handle_key(CursorKey::Delete, false));
        assert_eq!(cursor.content(), "ac\ndef");
        cursor.handle_key(CursorKey::End, false);
        assert!(cursor.handle_key(CursorKey::Delete, false));
        assert_eq!(cursor.content(), "acdef");
        assert_eq!(cursor.position(), pos(0, 2));
    }

    #[test]
    fn multibyte_content_navigates_by_character() {
        let mut cursor = CursorModel::new("héllo", true);
        cursor.handle_key(CursorKey::Right, false);
        cursor.handle_key(CursorKey::Right, false);
        assert_eq!(cursor.position(), pos(0, 2));
        assert!(cursor.handle_key(CursorKey::Backspace, false));
        assert_eq!(cursor.content(), "hllo");
    }

    #[test]
    fn click_estimates_column_from_pixel_offset() {
        let mut cursor = CursorModel::new("0123456789", false);
        let metrics = MonospaceMetrics::default();
        // 42 / 8.4 = 5
        assert_eq!(cursor.handle_click(0, 42.0, &metrics), pos(0, 5));
        // far right of a short line clamps to its length
        assert_eq!(cursor.handle_click(0, 500.0, &metrics), pos(0, 10));
    }

    #[test]
    fn empty_content_is_one_empty_line() {
        let mut cursor = CursorModel::new("", false);
        assert_eq!(cursor.line_count(), 1);
        assert_eq!(cursor.set_position(pos(5, 5)), pos(0, 0));
    }

    proptest! {
        #[test]
        fn position_is_always_within_buffer(
            content in "[a-z \n]{0,200}",
            keys in proptest::collection::vec(0u8..8, 0..64),
        ) {
            let mut cursor = CursorModel::new(&content, false);
            for key in keys {
                let key = match key {
                    0 => CursorKey::Up,
                    1 => CursorKey::Down,
                    2 => CursorKey::Left,
                    3 => CursorKey::Right,
                    4 => CursorKey::Home,
                    5 => CursorKey::End,
                    6 => CursorKey::PageUp,
                    _ => CursorKey::PageDown,
                };
                cursor.handle_key(key, false);
                let p = cursor.position();
                prop_assert!(p.line < cursor.line_count());
                prop_assert!(p.column <= cursor.lines()[p.line].chars().count());
            }
        }
    }
}
