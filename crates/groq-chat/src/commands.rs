//! Shell commands.
//!
//! Lines starting with `/` are commands, everything else is a message for
//! the model.

use std::fmt::{self, Display};
use std::path::PathBuf;

use groq_chat_core::Error;
use groq_chat_core::config::{GenerationConfig, ModelChoice};
use groq_chat_core::transcript::EXPORT_FILE_NAME;

/// A parsed shell command.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Resets the conversation to the greeting.
    Clear,
    /// Writes the exported transcript to the given path, or to
    /// [`EXPORT_FILE_NAME`].
    Export(Option<PathBuf>),
    /// Switches the model.
    Model(ModelChoice),
    /// Sets the sampling temperature.
    Temperature(f32),
    /// Sets the response length cap.
    MaxTokens(u32),
    /// Shows the current generation parameters.
    Settings,
    /// Lists the commands.
    Help,
    /// Leaves the shell.
    Quit,
}

/// A line that looks like a command but isn't a valid one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommandError {
    /// No such command.
    Unknown(String),
    /// The command requires an argument.
    MissingArgument(&'static str),
    /// The argument can't be used.
    InvalidArgument {
        /// The command name.
        command: &'static str,
        /// Why the argument was refused.
        reason: String,
    },
}

impl Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Unknown(name) => {
                write!(f, "unknown command `/{name}`, try /help")
            }
            CommandError::MissingArgument(command) => {
                write!(f, "/{command} needs a value")
            }
            CommandError::InvalidArgument { command, reason } => {
                write!(f, "/{command}: {reason}")
            }
        }
    }
}

impl std::error::Error for CommandError {}

impl Command {
    /// Parses `line` as a command.
    ///
    /// Returns `None` if the line is not a command at all.
    pub fn parse(line: &str) -> Option<Result<Self, CommandError>> {
        let line = line.trim();
        let rest = line.strip_prefix('/')?;
        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, Some(arg.trim())),
            None => (rest, None),
        };
        let arg = arg.filter(|arg| !arg.is_empty());

        let command = match name {
            "clear" | "reset" => Ok(Command::Clear),
            "export" => Ok(Command::Export(arg.map(PathBuf::from))),
            "model" => required("model", arg).and_then(|arg| {
                arg.parse().map(Command::Model).map_err(|err: Error| {
                    CommandError::InvalidArgument {
                        command: "model",
                        reason: err.reason().into_owned(),
                    }
                })
            }),
            "temperature" => required("temperature", arg)
                .and_then(|arg| number("temperature", arg))
                .map(Command::Temperature),
            "max-tokens" => required("max-tokens", arg)
                .and_then(|arg| number("max-tokens", arg))
                .map(Command::MaxTokens),
            "settings" => Ok(Command::Settings),
            "help" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            name => Err(CommandError::Unknown(name.to_owned())),
        };
        Some(command)
    }

    /// Applies a parameter change to `config`.
    ///
    /// Returns `None` for commands that don't change parameters. Values
    /// outside the accepted ranges are refused and `config` is kept.
    pub fn apply_to(
        &self,
        config: GenerationConfig,
    ) -> Option<Result<GenerationConfig, Error>> {
        match self {
            Command::Model(model) => Some(Ok(config.with_model(*model))),
            Command::Temperature(temperature) => {
                Some(config.with_temperature(*temperature))
            }
            Command::MaxTokens(max_tokens) => {
                Some(config.with_max_tokens(*max_tokens))
            }
            _ => None,
        }
    }
}

fn required<'a>(
    command: &'static str,
    arg: Option<&'a str>,
) -> Result<&'a str, CommandError> {
    arg.ok_or(CommandError::MissingArgument(command))
}

fn number<T: std::str::FromStr>(
    command: &'static str,
    arg: &str,
) -> Result<T, CommandError> {
    arg.parse().map_err(|_| CommandError::InvalidArgument {
        command,
        reason: format!("`{arg}` is not a number"),
    })
}

/// Greeting shown under the title at startup.
pub const WELCOME: &str = "Welcome to your personal AI assistant! \
    I can help with coding, writing, analysis, and much more.";

/// Suggestions shown at startup.
pub const TIPS: [&str; 5] = [
    "Ask coding questions",
    "Request explanations",
    "Get creative ideas!",
    "Analyze problems",
    "Learn new concepts",
];

/// Returns the welcome paragraph followed by the tips list.
pub fn welcome_text() -> String {
    let mut lines =
        vec![WELCOME.to_owned(), String::new(), "💡 Tips".to_owned()];
    lines.extend(TIPS.iter().map(|tip| format!("  - {tip}")));
    lines.join("\n")
}

/// Returns the command overview.
///
/// `/export` is only listed once there is something besides the greeting
/// to export.
pub fn help_text(can_export: bool) -> String {
    let models: Vec<_> = ModelChoice::ALL
        .iter()
        .map(|model| format!("{} {}", model.id(), model.label()))
        .collect();
    let mut lines = vec![
        "/clear               start over".to_owned(),
        format!("/model <option>      one of: {}", models.join(", ")),
        "/temperature <0-1>   sampling temperature".to_owned(),
        "/max-tokens <n>      response length cap, 100 to 2000".to_owned(),
        "/settings            show the current settings".to_owned(),
        "/help                show this help".to_owned(),
        "/quit                leave".to_owned(),
    ];
    if can_export {
        let export = format!(
            "/export [path]       save the chat, defaults to {EXPORT_FILE_NAME}"
        );
        lines.insert(1, export);
    }
    lines.join("\n")
}
