//! A terminal chat with Groq-hosted models.

#[macro_use]
extern crate tracing;

use std::io::Write as _;
use std::ops::ControlFlow;
use std::path::PathBuf;

use groq_chat::commands::{Command, help_text, welcome_text};
use groq_chat::connect::connect;
use groq_chat::core::credentials::CredentialSource;
use groq_chat::core::render::render;
use groq_chat::core::transcript::{
    EXPORT_FILE_NAME, EXPORT_MIME_TYPE, Role, SEEDED_GREETING,
};
use groq_chat::core::{
    Error, FALLBACK_TEXT, Rejected, Session, TurnOutcome,
};
use groq_chat::settings::{Settings, describe};
use groq_chat::terminal::{TerminalTarget, role_prefix};
use owo_colors::OwoColorize;
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tokio::select;
use tokio::signal;
use tokio::sync::mpsc;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let (settings, warnings) = Settings::from_env();
    let connection = connect(&settings);
    let source = connection.as_ref().ok().map(|(_, source)| *source);

    // Errors are printed between turns, never into a streaming response.
    let (error_tx, mut error_rx) = mpsc::unbounded_channel();
    let mut session = Session::builder()
        .with_completion_client(connection.map(|(client, _)| client))
        .with_config(settings.generation)
        .on_transcript_changed(|transcript| {
            trace!("transcript now holds {} messages", transcript.len());
        })
        .on_error(move |err| {
            error_tx.send(err.clone()).ok();
        })
        .build();

    print_banner(source, &session);
    for warning in &warnings {
        print_notice(warning);
    }
    print_errors(&mut error_rx);

    let mut lines = BufReader::new(io::stdin()).lines();
    loop {
        print!("{}", role_prefix(Role::User));
        std::io::stdout().flush().ok();

        // Once Ctrl-C is intercepted for cancellation, it no longer ends the
        // process on its own.
        let line = select! {
            line = lines.next_line() => line,
            _ = signal::ctrl_c() => {
                println!();
                break;
            }
        };
        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                error!("error reading input: {err}");
                break;
            }
        };

        if let Some(command) = Command::parse(&line) {
            match command {
                Ok(command) => {
                    if run_command(&mut session, command).is_break() {
                        break;
                    }
                }
                Err(err) => print_notice(&err),
            }
            continue;
        }

        let mut turn = match session.submit(&line) {
            Ok(turn) => turn,
            Err(Rejected::EmptyInput) => continue,
            Err(rejected) => {
                print_notice(&rejected);
                if let Some(err) = session.configuration_error() {
                    print_error(err);
                }
                continue;
            }
        };

        let mut target = TerminalTarget::stdout();
        let result = select! {
            result = render(&mut turn.fragments, &mut target) => Some(result),
            _ = signal::ctrl_c() => None,
        };
        match result {
            Some(result) => {
                if let Some(TurnOutcome::Failed(_)) =
                    session.finish(turn.id(), result)
                {
                    target.abort();
                    let prefix = role_prefix(Role::Assistant);
                    println!("{prefix}{FALLBACK_TEXT}");
                }
            }
            None => {
                target.abort();
                drop(turn);
                session.cancel();
                print_notice(&"response cancelled");
            }
        }
        print_errors(&mut error_rx);
    }
}

fn run_command(session: &mut Session, command: Command) -> ControlFlow<()> {
    if let Some(result) = command.apply_to(*session.config()) {
        match result {
            Ok(config) => {
                session.set_config(config);
                print_notice(&describe(&config));
            }
            Err(err) => print_error(&err),
        }
        return ControlFlow::Continue(());
    }

    match command {
        Command::Clear => match session.reset() {
            Ok(()) => {
                let prefix = role_prefix(Role::Assistant);
                println!("{prefix}{SEEDED_GREETING}");
            }
            Err(rejected) => print_notice(&rejected),
        },
        Command::Export(path) => {
            if session.transcript().len() <= 1 {
                print_notice(&"nothing to export yet");
            } else {
                let path =
                    path.unwrap_or_else(|| PathBuf::from(EXPORT_FILE_NAME));
                match std::fs::write(&path, session.export()) {
                    Ok(()) => print_notice(&format!(
                        "saved {} messages to {} ({EXPORT_MIME_TYPE})",
                        session.transcript().len(),
                        path.display()
                    )),
                    Err(err) => print_notice(&format!(
                        "cannot write {}: {err}",
                        path.display()
                    )),
                }
            }
        }
        Command::Settings => print_notice(&describe(session.config())),
        Command::Help => {
            println!("{}", help_text(session.transcript().len() > 1));
        }
        Command::Quit => return ControlFlow::Break(()),
        Command::Model(_)
        | Command::Temperature(_)
        | Command::MaxTokens(_) => {}
    }
    ControlFlow::Continue(())
}

fn print_banner(source: Option<CredentialSource>, session: &Session) {
    println!("{}", "🤖 AI Chat Assistant".bright_white().bold());
    println!("{}", welcome_text());
    println!(
        "{}",
        "Powered by Groq. Type a message, or /help for commands.".dimmed()
    );
    if let Some(source) = source {
        println!("{}", format!("✅ API key loaded from {source}").green());
    }
    print_notice(&describe(session.config()));
    println!();
    for message in session.transcript().all() {
        println!("{}{}", role_prefix(message.role()), message.content());
    }
}

fn print_errors(error_rx: &mut mpsc::UnboundedReceiver<Error>) {
    while let Ok(err) = error_rx.try_recv() {
        print_error(&err);
    }
}

fn print_error(err: &Error) {
    eprintln!("{} {}", "❌".red(), err.to_string().red());
}

fn print_notice(notice: &dyn std::fmt::Display) {
    println!("{}", notice.to_string().dimmed());
}
