//! The interactive shell: line loop, tokenizer and builtins.
//!
//! A [`Shell`] owns the database, the response formatter and the debug flag;
//! it is both the handler application state and the [`OutputDevice`] that
//! routes response channels to stdout and stderr. The compiled command
//! registry lives outside the shell so dispatch can borrow both.

use std::io::{self, BufRead, Write};

use cmdforge_core::{CommandRegistry, Outcome, Prototype, Result as MetaResult, RunError};
use cmdforge_render::{Channel, OutputDevice, Response, ResponseFormatter, TemplateArgs};
use cmdforge_sqlite::Database;

use crate::base::{base_prototype, table_contexts};

pub struct Shell {
    pub database: Database,
    pub formatter: ResponseFormatter,
    pub debug: bool,
}

impl Shell {
    pub fn new(database: Database, debug: bool) -> Shell {
        Shell {
            database,
            formatter: ResponseFormatter::new(),
            debug,
        }
    }
}

impl OutputDevice for Shell {
    fn emit(&mut self, channel: Channel, text: &str) {
        match channel {
            Channel::Output | Channel::Paged => println!("{text}"),
            Channel::Error => eprintln!("{text}"),
        }
    }
}

/// Compiles the CRUD prototype against the database's tables.
pub fn build_registry(database: &Database) -> MetaResult<CommandRegistry<Shell>> {
    let contexts = table_contexts(database);
    let mut registry = CommandRegistry::new();
    let mut prototype: Prototype<Shell> = base_prototype();
    prototype.apply_to(&mut registry, &contexts)?;
    Ok(registry)
}

/// Splits a command line into tokens, honoring single and double quotes and
/// backslash escapes.
pub fn tokenize(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut pending = false;

    for ch in line.chars() {
        if escaped {
            current.push(ch);
            escaped = false;
            continue;
        }
        match ch {
            '\\' => {
                escaped = true;
                pending = true;
            }
            c if quote == Some(c) => quote = None,
            '\'' | '"' if quote.is_none() => {
                quote = Some(ch);
                pending = true;
            }
            c if c.is_whitespace() && quote.is_none() => {
                if pending {
                    tokens.push(std::mem::take(&mut current));
                    pending = false;
                }
            }
            c => {
                current.push(c);
                pending = true;
            }
        }
    }
    if pending {
        tokens.push(current);
    }
    tokens
}

/// What a processed line means for the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineResult {
    Continue,
    Exit,
}

fn show_catalog(registry: &CommandRegistry<Shell>, shell: &mut Shell) {
    let mut listing = String::new();
    for (category, commands) in registry.catalog() {
        listing.push_str(&category);
        listing.push_str(":\n");
        for (name, description) in commands {
            listing.push_str(&format!("  {name:<12} {description}\n"));
        }
    }
    listing.push_str("Shell:\n  help         show this listing, or one command's help\n  exit         leave the shell\n");
    shell.emit(Channel::Paged, listing.trim_end());
}

fn show_help(registry: &CommandRegistry<Shell>, shell: &mut Shell, name: &str) {
    match registry.help(name) {
        Some(text) => shell.emit(Channel::Paged, text.trim_end()),
        None => report_error(shell, &RunError::UnknownCommand {
            name: name.to_string(),
        }),
    }
}

fn report_error(shell: &mut Shell, error: &RunError) {
    let response = match error {
        // Usage errors carry clap's own rendering; pass it through.
        RunError::Usage { message } => Response::new()
            .on(Channel::Error)
            .push(message.trim_end().to_string()),
        RunError::UnknownCommand { .. } => Response::new().on(Channel::Error).message(
            &shell.formatter,
            "error",
            &TemplateArgs::new().with("reason", error.to_string()),
        ),
        RunError::Handler(inner) => Response::new().on(Channel::Error).message(
            &shell.formatter,
            "exception",
            &TemplateArgs::new()
                .with("type", "CommandError")
                .with("message", inner.to_string()),
        ),
    };
    response.send(shell);
}

/// Runs one command line: builtins first, then registry dispatch.
pub fn run_line(
    registry: &CommandRegistry<Shell>,
    shell: &mut Shell,
    line: &str,
) -> LineResult {
    let tokens = tokenize(line);
    let Some((name, rest)) = tokens.split_first() else {
        return LineResult::Continue;
    };

    match name.as_str() {
        "exit" | "quit" => return LineResult::Exit,
        "help" => {
            match rest.first() {
                Some(command) => show_help(registry, shell, command),
                None => show_catalog(registry, shell),
            }
            return LineResult::Continue;
        }
        _ => {}
    }

    match registry.dispatch(shell, &tokens) {
        Ok(Outcome::Done) => {}
        Ok(Outcome::Help(text)) => shell.emit(Channel::Paged, text.trim_end()),
        Err(error) => report_error(shell, &error),
    }
    LineResult::Continue
}

/// The interactive loop. Ends on EOF or an exit builtin.
pub fn repl(
    registry: &CommandRegistry<Shell>,
    shell: &mut Shell,
    prompt: &str,
) -> io::Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        write!(stdout, "{prompt} ")?;
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        if run_line(registry, shell, line.trim()) == LineResult::Exit {
            break;
        }
    }
    Ok(())
}
