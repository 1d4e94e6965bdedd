use crate::Span;

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub message: String,
    pub span: Span,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}

/// Maps byte offsets to line/column positions and renders diagnostics.
pub struct SourceMap<'a> {
    source: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> SourceMap<'a> {
    pub fn new(source: &'a str) -> Self {
        let mut line_starts = vec![0];
        for (i, ch) in source.char_indices() {
            if ch == '\n' {
                line_starts.push(i + 1);
            }
        }
        Self {
            source,
            line_starts,
        }
    }

    /// Returns (1-indexed line, 1-indexed column).
    pub fn line_col(&self, byte_offset: usize) -> (usize, usize) {
        let line = self
            .line_starts
            .partition_point(|&start| start <= byte_offset)
            .saturating_sub(1);
        let col = byte_offset - self.line_starts[line];
        (line + 1, col + 1)
    }

    /// Render a diagnostic in rustc-style format with a caret underline.
    pub fn render(&self, diag: &Diagnostic) -> String {
        if diag.span.is_dummy() {
            return format!("error: {}", diag.message);
        }

        let (line, col) = self.line_col(diag.span.start);
        let line_text_start = self.line_starts[line - 1];
        let line_text_end = self
            .line_starts
            .get(line)
            .copied()
            .unwrap_or(self.source.len());
        let line_text = self.source[line_text_start..line_text_end]
            .trim_end_matches('\n')
            .trim_end_matches('\r');

        let caret_len = (diag.span.end - diag.span.start).max(1);
        let pad = " ".repeat(line.to_string().len());

        format!(
            "error: {msg}\n\
             {pad} --> line {line}:{col}\n\
             {pad} |\n\
             {line} | {text}\n\
             {pad} | {spaces}{carets}",
            msg = diag.message,
            pad = pad,
            line = line,
            col = col,
            text = line_text,
            spaces = " ".repeat(col - 1),
            carets = "^".repeat(caret_len),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_col_first_line() {
        let map = SourceMap::new("abc\ndef");
        assert_eq!(map.line_col(0), (1, 1));
        assert_eq!(map.line_col(2), (1, 3));
    }

    #[test]
    fn line_col_second_line() {
        let map = SourceMap::new("abc\ndef");
        assert_eq!(map.line_col(4), (2, 1));
        assert_eq!(map.line_col(6), (2, 3));
    }

    #[test]
    fn render_points_at_offending_token() {
        let source = "connect(\"Gateway\"\n";
        let map = SourceMap::new(source);
        let diag = Diagnostic::error("expected ')'", Span::new(17, 18));
        let rendered = map.render(&diag);
        assert!(rendered.contains("error: expected ')'"));
        assert!(rendered.contains("line 1:18"));
        assert!(rendered.contains('^'));
    }

    #[test]
    fn render_dummy_span_is_bare_message() {
        let map = SourceMap::new("x = 1");
        let diag = Diagnostic::error("something failed", Span::dummy());
        assert_eq!(map.render(&diag), "error: something failed");
    }
}
