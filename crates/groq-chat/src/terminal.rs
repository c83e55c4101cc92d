//! Streaming responses into the terminal.

use std::io::{self, Stdout, Write};
use std::time::Duration;

use groq_chat_core::render::{Frame, IN_PROGRESS_MARKER, RenderTarget};
use groq_chat_core::transcript::Role;
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;

/// Leading bar of assistant lines.
pub const BAR_CHAR: &str = "▎";

const ERASE_MARKER: &str = "\u{8} \u{8}";

/// Returns the label of `role` the way the shell shows it.
pub fn role_prefix(role: Role) -> String {
    match role {
        Role::User => format!("{}: ", role.label().bright_green().bold()),
        Role::Assistant => format!(
            "{}{}: ",
            BAR_CHAR.bright_cyan(),
            role.label().bright_cyan().bold()
        ),
    }
}

/// Writes a streamed response to a terminal.
///
/// A spinner stands in for the response until the first fragment arrives.
/// Text is appended in place, followed by the in-progress marker, which is
/// erased again before the next fragment.
pub struct TerminalTarget<W: Write> {
    out: W,
    spinner: Option<Spinner>,
    printed: usize,
    started: bool,
    marker_shown: bool,
}

impl TerminalTarget<Stdout> {
    /// Creates a target writing to stdout.
    #[inline]
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> TerminalTarget<W> {
    /// Creates a target writing to `out`.
    pub fn new(out: W) -> Self {
        Self {
            out,
            spinner: None,
            printed: 0,
            started: false,
            marker_shown: false,
        }
    }

    /// Stops displaying the current response, e.g. after it failed or was
    /// cancelled. The text shown so far stays on screen.
    pub fn abort(&mut self) {
        self.clear_spinner();
        if !self.started {
            return;
        }
        let result = self
            .erase_marker()
            .and_then(|_| writeln!(self.out))
            .and_then(|_| self.out.flush());
        if let Err(err) = result {
            warn!("cannot write to the terminal: {err}");
        }
        self.started = false;
    }

    /// Returns the underlying writer.
    pub fn into_inner(mut self) -> W {
        self.clear_spinner();
        self.out
    }

    fn start_spinner(&mut self) {
        let template = ProgressStyle::with_template("{spinner} {wide_msg}");
        let style = match template {
            Ok(style) => style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
            Err(err) => {
                warn!("invalid spinner template: {err}");
                return;
            }
        };
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(style);
        spinner.set_message("🤔 Thinking...");
        spinner.enable_steady_tick(Duration::from_millis(100));
        self.spinner = Some(Spinner(spinner));
    }

    fn clear_spinner(&mut self) {
        self.spinner = None;
    }

    fn erase_marker(&mut self) -> io::Result<()> {
        if self.marker_shown {
            self.out.write_all(ERASE_MARKER.as_bytes())?;
            self.marker_shown = false;
        }
        Ok(())
    }

    fn write_text(
        &mut self,
        text: &str,
        in_progress: bool,
    ) -> io::Result<()> {
        // Finish the spinner before printing anything else.
        self.clear_spinner();
        if !self.started {
            write!(self.out, "{}", role_prefix(Role::Assistant))?;
            self.started = true;
            self.printed = 0;
        }
        self.erase_marker()?;

        // Frames only ever extend the previous one.
        let new_text = text.get(self.printed..).unwrap_or(text);
        write!(self.out, "{}", new_text.bright_white())?;
        self.printed = text.len();

        if in_progress {
            self.out.write_all(IN_PROGRESS_MARKER.as_bytes())?;
            self.marker_shown = true;
        } else {
            writeln!(self.out)?;
            self.started = false;
        }
        self.out.flush()
    }
}

impl<W: Write> RenderTarget for TerminalTarget<W> {
    fn show(&mut self, frame: Frame<'_>) {
        let result = match frame {
            Frame::Thinking => {
                self.start_spinner();
                Ok(())
            }
            Frame::Partial(text) => self.write_text(text, true),
            Frame::Final(text) => self.write_text(text, false),
        };
        if let Err(err) = result {
            warn!("cannot write to the terminal: {err}");
        }
    }
}

/// Clears the spinner line when dropped.
struct Spinner(ProgressBar);

impl Drop for Spinner {
    fn drop(&mut self) {
        self.0.finish_and_clear();
    }
}
