//! Line-level helpers shared by the parsers and the text-surgery service.

/// A single line of a document with its byte span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line<'a> {
    /// 0-based line number.
    pub number: usize,
    /// Byte offset of the first character.
    pub start: usize,
    /// Byte offset just past the last character (before `\n`).
    pub end: usize,
    /// Byte offset of the next line (past the `\n`, or `end` on the last line).
    pub next: usize,
    /// Line text without the newline.
    pub text: &'a str,
}

impl<'a> Line<'a> {
    /// The text with trailing whitespace (including `\r`) removed.
    pub fn trimmed_end(&self) -> &'a str {
        self.text.trim_end()
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Iterate the lines of `text` starting at byte offset `from`, numbering from `first_line`.
pub fn lines_from(text: &str, from: usize, first_line: usize) -> impl Iterator<Item = Line<'_>> {
    let mut pos = from.min(text.len());
    let mut number = first_line;
    let mut done = pos >= text.len();
    std::iter::from_fn(move || {
        if done {
            return None;
        }
        let rest = &text[pos..];
        let (end, next) = match rest.find('\n') {
            Some(i) => (pos + i, pos + i + 1),
            None => {
                done = true;
                (text.len(), text.len())
            }
        };
        let line = Line {
            number,
            start: pos,
            end,
            next,
            text: &text[pos..end],
        };
        number += 1;
        pos = next;
        if pos >= text.len() {
            done = true;
        }
        Some(line)
    })
}

/// Iterate all lines of `text`.
pub fn lines(text: &str) -> impl Iterator<Item = Line<'_>> {
    lines_from(text, 0, 0)
}

/// Number of `\n` characters in `text`.
pub fn count_newlines(text: &str) -> usize {
    text.bytes().filter(|&b| b == b'\n').count()
}

/// Tracks fenced code blocks (```/~~~) while scanning lines.
#[derive(Debug, Default, Clone)]
pub struct FenceTracker {
    open: Option<(char, usize)>,
}

impl FenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next line. Returns true when the line is part of a fenced
    /// code block, delimiters included.
    pub fn update(&mut self, line: &str) -> bool {
        let indent = line.len() - line.trim_start_matches(' ').len();
        let body = line.trim_start_matches(' ');
        if indent > 3 {
            return self.open.is_some();
        }
        let fence = fence_run(body);
        match (self.open, fence) {
            (None, Some((ch, len))) => {
                self.open = Some((ch, len));
                true
            }
            (Some((open_ch, open_len)), Some((ch, len)))
                if ch == open_ch && len >= open_len && body[len..].trim().is_empty() =>
            {
                self.open = None;
                true
            }
            (Some(_), _) => true,
            (None, None) => false,
        }
    }

    pub fn in_fence(&self) -> bool {
        self.open.is_some()
    }
}

/// Length and character of a leading code-fence run of 3 or more.
fn fence_run(body: &str) -> Option<(char, usize)> {
    let ch = body.chars().next()?;
    if ch != '`' && ch != '~' {
        return None;
    }
    let len = body.chars().take_while(|&c| c == ch).count();
    (len >= 3).then_some((ch, len))
}

/// Maps byte offsets to line numbers, advancing incrementally.
///
/// Offsets are expected in non-decreasing order; an earlier offset restarts
/// the count from the beginning.
#[derive(Debug, Clone)]
pub struct LineCounter<'a> {
    text: &'a str,
    pos: usize,
    line: usize,
}

impl<'a> LineCounter<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            pos: 0,
            line: 0,
        }
    }

    /// Line number (relative to the text) containing byte `offset`.
    pub fn line_at(&mut self, offset: usize) -> usize {
        let offset = offset.min(self.text.len());
        if offset < self.pos {
            self.pos = 0;
            self.line = 0;
        }
        self.line += count_newlines(&self.text[self.pos..offset]);
        self.pos = offset;
        self.line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_spans() {
        let text = "a\nbc\n\nd";
        let all: Vec<Line> = lines(text).collect();
        assert_eq!(all.len(), 4);
        assert_eq!(all[1].text, "bc");
        assert_eq!(all[1].start, 2);
        assert_eq!(all[1].next, 5);
        assert_eq!(all[2].text, "");
        assert_eq!(all[3].number, 3);
        assert_eq!(all[3].end, text.len());
    }

    #[test]
    fn test_lines_trailing_newline_has_no_phantom_line() {
        let all: Vec<Line> = lines("a\nb\n").collect();
        assert_eq!(all.len(), 2);
        assert!(lines("").next().is_none());
    }

    #[test]
    fn test_fence_tracker() {
        let mut fences = FenceTracker::new();
        assert!(!fences.update("text"));
        assert!(fences.update("```rust"));
        assert!(fences.update("---"));
        assert!(fences.update("```"));
        assert!(!fences.update("---"));
        assert!(fences.update("~~~~"));
        assert!(fences.update("~~~"));
        assert!(fences.in_fence());
        assert!(fences.update("~~~~"));
        assert!(!fences.in_fence());
    }

    #[test]
    fn test_line_counter_is_incremental() {
        let text = "a\nb\nc\nd";
        let mut counter = LineCounter::new(text);
        assert_eq!(counter.line_at(0), 0);
        assert_eq!(counter.line_at(2), 1);
        assert_eq!(counter.line_at(6), 3);
        assert_eq!(counter.line_at(4), 2);
    }
}
