//! Position-annotated diagnostic text
//!
//! ```text
//! hello.mirah:2: Cannot find class Foo
//!   puts Foo.bar
//!        ^^^
//! ```

use std::fs;
use std::io::{self, Write};

use crate::diagnostic::{Diagnostic, Position};

pub struct Reporter<W: Write> {
    out: W,
    verbose: bool,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W, verbose: bool) -> Self {
        Self { out, verbose }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Write `message`, echoing the source under `position` when the file is on disk
    pub fn report(&mut self, message: &str, position: Option<&Position>) -> io::Result<()> {
        let source = position.and_then(|position| fs::read_to_string(&position.file).ok());
        self.out
            .write_all(render(message, position, source.as_deref()).as_bytes())
    }

    pub fn report_diagnostic(&mut self, diagnostic: &Diagnostic) -> io::Result<()> {
        self.report(diagnostic.message(), diagnostic.position())?;
        if self.verbose {
            if let Some(detail) = diagnostic.detail() {
                for line in detail.lines() {
                    writeln!(self.out, "    {line}")?;
                }
            }
        }
        Ok(())
    }

    /// Free-form text, e.g. verbose dumps
    pub fn note(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.out, "{text}")
    }
}

/// Render a diagnostic. `source` is the text of `position.file`, when readable.
pub fn render(message: &str, position: Option<&Position>, source: Option<&str>) -> String {
    let Some(position) = position else {
        return format!("{message}\n");
    };

    let mut out = format!("{}:{}: {}\n", position.file, position.start_line, message);
    let Some(source) = source else {
        return out;
    };

    let lines: Vec<&str> = source.lines().collect();
    // 0-based from here on
    let first = position.start_line.saturating_sub(1);
    let last = position.end_line.saturating_sub(1).max(first);
    let end_col = position.end_col.saturating_sub(1);

    for row in first..=last {
        let Some(text) = lines.get(row) else {
            break;
        };
        let col = if row == first {
            position.start_col.saturating_sub(1)
        } else {
            0
        };
        let carets = if row == last {
            end_col.saturating_sub(col).max(1)
        } else {
            text.chars().count().saturating_sub(col).max(1)
        };

        out.push_str(text);
        out.push('\n');
        out.push_str(&" ".repeat(col));
        out.push_str(&"^".repeat(carets));
        out.push('\n');
    }
    out
}
