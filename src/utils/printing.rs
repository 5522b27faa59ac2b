//! Terminal rendering of model output as markdown.

use std::io;
use std::io::{stdout, Write};
use termimad::crossterm::{cursor, ExecutableCommand};
use termimad::crossterm::terminal::Clear;
use termimad::crossterm::terminal::ClearType::FromCursorDown;
use termimad::{FmtLine, FmtText, MadSkin};

struct RenderedMarkdown {
    text: String,
    line_width: Vec<usize>,
}

impl From<FmtText<'_, '_>> for RenderedMarkdown {
    fn from(fmt_text: FmtText<'_, '_>) -> Self {
        let text = format!("{}", fmt_text);
        let line_width = fmt_text.lines.iter().map(FmtLine::visible_length).collect();
        Self {
            text,
            line_width,
        }
    }
}

/// Render markdown once, for finished answers.
pub fn print_markdown(markdown: &str) {
    MadSkin::default().print_text(markdown);
}

/// Print a titled block, e.g. an intermediate result of a chain.
pub fn print_section(title: &str, body: &str) {
    print_markdown(&format!("## {}\n\n{}\n", title, body));
}

/// Redraws markdown in place from a fixed cursor anchor.
#[derive(Default)]
pub struct AnchoredMarkdownPrinter {
    pub skin: MadSkin,
    pub wrap_width: Option<usize>,
    cursor_anchor: Option<(u16, u16)>,
    hide_cursor: bool,
}

impl AnchoredMarkdownPrinter {
    pub fn activated(&self) -> bool {
        self.cursor_anchor.is_some()
    }

    pub fn activate(&mut self, hide_cursor: bool) -> io::Result<()> {
        if self.activated() {
            return Ok(());
        }
        self.cursor_anchor = Some(cursor::position()?);
        if hide_cursor {
            stdout().execute(cursor::Hide)?;
        }
        self.hide_cursor = hide_cursor;
        Ok(())
    }

    pub fn deactivate(&mut self) -> io::Result<()> {
        if self.cursor_anchor.take().is_some() && self.hide_cursor {
            stdout().execute(cursor::Show)?;
        }
        Ok(())
    }

    pub fn print(&mut self, partial_markdown: &str) -> io::Result<()> {
        let rendered_markdown = FmtText::from(&self.skin, partial_markdown, self.wrap_width).into();
        self.print_rendered(&rendered_markdown)
    }

    fn print_rendered(&mut self, rendered_markdown: &RenderedMarkdown) -> io::Result<()> {
        let Some((column, row)) = self.cursor_anchor else {
            return Err(io::Error::new(io::ErrorKind::Other, "printer must be activated before printing"));
        };
        stdout()
            .execute(cursor::MoveTo(column, row))?
            .execute(Clear(FromCursorDown))?;
        let rows = rendered_markdown.line_width.len() as u16;
        let columns = rendered_markdown.line_width.last().copied().unwrap_or(0) as u16;
        print!("{}", rendered_markdown.text);
        stdout().flush()?;
        // the cursor position is relative to the terminal, not the scrollback, so the anchor drifts once output scrolls
        let (column, row) = cursor::position()?;
        self.cursor_anchor = Some((column.saturating_sub(columns), row.saturating_sub(rows)));
        Ok(())
    }
}

impl Drop for AnchoredMarkdownPrinter {
    fn drop(&mut self) {
        let _ = self.deactivate();
    }
}

/// Accumulates streamed chunks and re-renders the whole answer after each one.
#[derive(Default)]
pub struct IncrementalMarkdownPrinter {
    pub anchored_printer: AnchoredMarkdownPrinter,
    buffer: String,
}

impl IncrementalMarkdownPrinter {
    pub fn activate(&mut self, hide_cursor: bool) -> io::Result<()> {
        self.anchored_printer.activate(hide_cursor)
    }

    pub fn deactivate(&mut self) -> io::Result<()> {
        self.anchored_printer.deactivate()
    }

    /// Everything pushed so far.
    pub fn text(&self) -> &str {
        &self.buffer
    }

    pub fn push_and_print(&mut self, chunk: &str) -> io::Result<()> {
        self.buffer.push_str(chunk);
        let printer = &self.anchored_printer;
        let rendered: RenderedMarkdown = FmtText::from(&printer.skin, &self.buffer, printer.wrap_width).into();
        self.anchored_printer.print_rendered(&rendered)
    }
}
