/// Plain-text tool payload: one `A:` answer line, `R:` hit lines and `N:` notes.
pub(crate) struct ContextDocBuilder {
    out: String,
}

impl ContextDocBuilder {
    const QUOTE_PREFIX: &'static str = " ";

    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            out: String::from("[CONTENT]\n"),
        }
    }

    #[must_use]
    pub(crate) fn finish(self) -> String {
        self.out
    }

    pub(crate) fn push_line(&mut self, line: &str) {
        self.out.push_str(line);
        self.out.push('\n');
    }

    pub(crate) fn push_blank(&mut self) {
        if !self.out.ends_with('\n') {
            self.out.push('\n');
        }
        self.out.push('\n');
    }

    pub(crate) fn push_answer(&mut self, text: &str) {
        self.push_line(&format!("A: {text}"));
    }

    pub(crate) fn push_note(&mut self, text: &str) {
        self.push_line(&format!("N: {text}"));
    }

    pub(crate) fn push_ref(&mut self, path: &str, score: f32, label: Option<&str>) {
        match label {
            Some(label) if !label.trim().is_empty() => {
                self.push_line(&format!("R: {path} {score:.3} {label}"));
            }
            _ => self.push_line(&format!("R: {path} {score:.3}")),
        }
    }

    /// Push an indented snippet, quoting lines that would read as envelope markers.
    pub(crate) fn push_snippet(&mut self, snippet: &str, max_lines: usize) {
        for line in snippet.lines().filter(|l| !l.trim().is_empty()).take(max_lines) {
            let trimmed = line.trim_start();
            if ["[CONTENT]", "A:", "N:", "R:"]
                .iter()
                .any(|marker| trimmed.starts_with(marker))
            {
                self.out.push_str(Self::QUOTE_PREFIX);
            }
            self.out.push_str("  ");
            self.out.push_str(line.trim_end());
            self.out.push('\n');
        }
    }
}
