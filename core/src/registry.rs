//! Command compilation and dispatch.
//!
//! A [`Prototype`] collects named command descriptors with their handlers;
//! `apply_to` expands each descriptor exactly once against the application's
//! contexts and installs the results into a [`CommandRegistry`]. A
//! context-dependent descriptor expands into one hidden command per context
//! (named `<command>_<context>`) plus a visible placeholder that forwards the
//! remaining tokens to the selected one.

use std::rc::Rc;

use indexmap::IndexMap;

use crate::argspec::{ArgSpec, CommandArgs};
use crate::command::CommandDescriptor;
use crate::context::{ContextHandle, ContextRegistry};
use crate::error::{MetaError, Result, RunError};

/// Errors a handler may surface to the dispatcher.
pub type HandlerError = Box<dyn std::error::Error>;

/// A command handler: receives the application, the bound context (if the
/// command was expanded from a context dependency) and the parsed arguments.
pub type Handler<A> =
    Rc<dyn Fn(&mut A, Option<&ContextHandle>, &CommandArgs) -> std::result::Result<(), HandlerError>>;

/// What a compiled command does when invoked.
pub enum CommandKind {
    Plain,
    /// Expanded from a context dependency, bound to one context.
    ContextBound { context: ContextHandle },
    /// Placeholder that selects a context-bound sibling and forwards to it.
    Dispatch {
        choice_arg: String,
        choices: Vec<String>,
        default: Option<String>,
    },
}

/// One installed, parseable command.
pub struct CompiledCommand<A> {
    pub name: String,
    pub description: String,
    pub category: String,
    pub hidden: bool,
    pub accepts_unknown: bool,
    pub kind: CommandKind,
    parser: clap::Command,
    specs: Vec<ArgSpec>,
    handler: Handler<A>,
}

/// Result of a successful dispatch.
#[derive(Debug)]
pub enum Outcome {
    Done,
    /// The invocation asked for help; the rendered text is returned for the
    /// host to route to its output channel.
    Help(String),
}

/// Named collection of command descriptors awaiting compilation.
pub struct Prototype<A> {
    name: String,
    category: Option<String>,
    entries: Vec<(String, CommandDescriptor, Handler<A>)>,
    consumed: bool,
}

impl<A> Prototype<A> {
    pub fn new(name: &str) -> Prototype<A> {
        Prototype {
            name: name.to_string(),
            category: None,
            entries: Vec::new(),
            consumed: false,
        }
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.category = Some(category.to_string());
        self
    }

    pub fn command(
        &mut self,
        name: &str,
        descriptor: CommandDescriptor,
        handler: impl Fn(&mut A, Option<&ContextHandle>, &CommandArgs) -> std::result::Result<(), HandlerError>
        + 'static,
    ) -> &mut Self {
        self.entries
            .push((name.to_string(), descriptor, Rc::new(handler)));
        self
    }

    /// Category for a command: its own, else the prototype's, else derived
    /// from the prototype name.
    fn category_for(&self, descriptor: &CommandDescriptor) -> String {
        descriptor
            .category
            .clone()
            .or_else(|| self.category.clone())
            .unwrap_or_else(|| format!("{} Commands", self.name))
    }

    /// Compiles every descriptor and installs the results.
    ///
    /// Descriptors expand exactly once; a second call is a definition-time
    /// error, as is any generated-name collision.
    pub fn apply_to(
        &mut self,
        registry: &mut CommandRegistry<A>,
        contexts: &ContextRegistry,
    ) -> Result<()> {
        if self.consumed {
            return Err(MetaError::AlreadyCompiled {
                name: self.name.clone(),
            });
        }
        self.consumed = true;

        for (name, descriptor, handler) in &self.entries {
            let category = self.category_for(descriptor);
            let matched = descriptor.contexts(contexts);
            if matched.is_empty() {
                let (parser, specs) = descriptor.build_parser(name, None)?;
                registry.install(CompiledCommand {
                    name: name.clone(),
                    description: descriptor.description.clone(),
                    category: category.clone(),
                    hidden: false,
                    accepts_unknown: descriptor.accepts_unknown,
                    kind: CommandKind::Plain,
                    parser,
                    specs,
                    handler: handler.clone(),
                })?;
                continue;
            }

            let mut choices = Vec::with_capacity(matched.len());
            for (context_name, context) in &matched {
                let full_name = format!("{name}_{context_name}");
                let (parser, specs) = descriptor.build_parser(&full_name, Some(context.as_ref()))?;
                registry.install(CompiledCommand {
                    name: full_name,
                    description: descriptor.description.clone(),
                    category: category.clone(),
                    hidden: true,
                    accepts_unknown: descriptor.accepts_unknown,
                    kind: CommandKind::ContextBound {
                        context: context.clone(),
                    },
                    parser,
                    specs,
                    handler: handler.clone(),
                })?;
                choices.push(context_name.clone());
            }
            registry.install(placeholder(name, descriptor, category, handler.clone(), choices))?;
        }
        tracing::debug!(prototype = %self.name, commands = self.entries.len(), "prototype applied");
        Ok(())
    }
}

/// Builds the visible placeholder for a context-dependent command. Its parser
/// exists only to render help; invocation never goes through it.
fn placeholder<A>(
    name: &str,
    descriptor: &CommandDescriptor,
    category: String,
    handler: Handler<A>,
    choices: Vec<String>,
) -> CompiledCommand<A> {
    let choice_arg = descriptor
        .dependency
        .as_ref()
        .map(|dependency| dependency.kind.clone())
        .unwrap_or_else(|| "context".to_string());
    // Only a declared default lets the selector be omitted; one that matches
    // no context is dropped.
    let default = descriptor
        .dependency
        .as_ref()
        .and_then(|dependency| dependency.default_context.clone())
        .filter(|name| choices.contains(name));
    let listing = choices
        .iter()
        .map(|choice| format!("[{name} {choice}]"))
        .collect::<Vec<_>>()
        .join(", ");
    let epilog = format!("{}\nSee following commands: {listing}", "=".repeat(80));

    let parser = clap::Command::new(name.to_string())
        .no_binary_name(true)
        .disable_help_flag(true)
        .disable_version_flag(true)
        .about(descriptor.description.clone())
        .after_help(epilog)
        .arg(
            clap::Arg::new(choice_arg.clone())
                .value_name(choice_arg.to_uppercase())
                .value_parser(clap::builder::PossibleValuesParser::new(choices.clone()))
                .required(default.is_none())
                .help(format!("the {choice_arg} to run the command against")),
        )
        .arg(
            clap::Arg::new("rest")
                .num_args(0..)
                .trailing_var_arg(true)
                .allow_hyphen_values(true)
                .hide(true),
        );

    CompiledCommand {
        name: name.to_string(),
        description: descriptor.description.clone(),
        category,
        hidden: false,
        accepts_unknown: true,
        kind: CommandKind::Dispatch {
            choice_arg,
            default,
            choices,
        },
        parser,
        specs: Vec::new(),
        handler,
    }
}

/// All compiled commands of one application, keyed by name.
pub struct CommandRegistry<A> {
    commands: IndexMap<String, CompiledCommand<A>>,
}

impl<A> Default for CommandRegistry<A> {
    fn default() -> Self {
        CommandRegistry {
            commands: IndexMap::new(),
        }
    }
}

impl<A> CommandRegistry<A> {
    pub fn new() -> CommandRegistry<A> {
        CommandRegistry::default()
    }

    pub fn install(&mut self, command: CompiledCommand<A>) -> Result<()> {
        if self.commands.contains_key(&command.name) {
            return Err(MetaError::DuplicateCommand {
                name: command.name.clone(),
            });
        }
        tracing::debug!(command = %command.name, hidden = command.hidden, "command installed");
        self.commands.insert(command.name.clone(), command);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&CompiledCommand<A>> {
        self.commands.get(name)
    }

    /// Visible commands grouped by category, in installation order.
    pub fn catalog(&self) -> IndexMap<String, Vec<(&str, &str)>> {
        let mut catalog: IndexMap<String, Vec<(&str, &str)>> = IndexMap::new();
        for command in self.commands.values().filter(|command| !command.hidden) {
            catalog
                .entry(command.category.clone())
                .or_default()
                .push((command.name.as_str(), command.description.as_str()));
        }
        catalog
    }

    /// Rendered help for one command, or `None` if unknown.
    pub fn help(&self, name: &str) -> Option<String> {
        self.commands
            .get(name)
            .map(|command| command.parser.clone().render_help().to_string())
    }

    /// Runs the first token as a command name with the rest as its arguments.
    pub fn dispatch(&self, app: &mut A, tokens: &[String]) -> std::result::Result<Outcome, RunError> {
        let Some((name, rest)) = tokens.split_first() else {
            return Ok(Outcome::Done);
        };
        self.execute(app, name, rest)
    }

    /// Parses `tokens` with the named command and invokes its handler.
    pub fn execute(
        &self,
        app: &mut A,
        name: &str,
        tokens: &[String],
    ) -> std::result::Result<Outcome, RunError> {
        let Some(command) = self.commands.get(name) else {
            return Err(RunError::UnknownCommand {
                name: name.to_string(),
            });
        };

        if let CommandKind::Dispatch {
            choices, default, ..
        } = &command.kind
        {
            return self.forward(app, command, choices, default.as_deref(), tokens);
        }

        let (kept, unknown) = if command.accepts_unknown {
            divert_unknown(tokens, &command.specs)
        } else {
            (tokens.to_vec(), Vec::new())
        };

        let matches = match command.parser.clone().try_get_matches_from(&kept) {
            Ok(matches) => matches,
            Err(error) => {
                return match error.kind() {
                    clap::error::ErrorKind::DisplayHelp => Ok(Outcome::Help(error.to_string())),
                    _ => Err(RunError::Usage {
                        message: error.to_string(),
                    }),
                };
            }
        };
        let args = CommandArgs::new(matches, command.specs.clone(), unknown);

        let context = match &command.kind {
            CommandKind::ContextBound { context } => Some(context),
            _ => None,
        };
        (command.handler)(app, context, &args)?;
        Ok(Outcome::Done)
    }

    /// Placeholder invocation: the first token selects the context, the rest
    /// is forwarded verbatim to the hidden `<name>_<context>` command.
    fn forward(
        &self,
        app: &mut A,
        command: &CompiledCommand<A>,
        choices: &[String],
        default: Option<&str>,
        tokens: &[String],
    ) -> std::result::Result<Outcome, RunError> {
        if tokens.first().map(String::as_str) == Some("-h")
            || tokens.first().map(String::as_str) == Some("--help")
        {
            return Ok(Outcome::Help(
                command.parser.clone().render_help().to_string(),
            ));
        }
        match tokens.first() {
            Some(first) if choices.iter().any(|choice| choice == first) => {
                self.execute(app, &format!("{}_{first}", command.name), &tokens[1..])
            }
            _ => match default {
                Some(default) => {
                    self.execute(app, &format!("{}_{default}", command.name), tokens)
                }
                None => Err(RunError::Usage {
                    message: format!(
                        "command [{}] needs one of: {}",
                        command.name,
                        choices.join(", ")
                    ),
                }),
            },
        }
    }
}

/// Splits the token list into parseable tokens and flag-like tokens that
/// match no declared flag. Negative numbers stay parseable.
fn divert_unknown(tokens: &[String], specs: &[ArgSpec]) -> (Vec<String>, Vec<String>) {
    let mut kept = Vec::with_capacity(tokens.len());
    let mut unknown = Vec::new();
    for token in tokens {
        let looks_like_flag = token.starts_with('-')
            && token
                .chars()
                .nth(1)
                .is_some_and(|c| !c.is_ascii_digit() && c != '.');
        let flag_part = token.split('=').next().unwrap_or(token);
        let declared = specs
            .iter()
            .any(|spec| spec.flags.iter().any(|flag| flag == flag_part))
            || flag_part == "-h"
            || flag_part == "--help";
        if looks_like_flag && !declared {
            unknown.push(token.clone());
        } else {
            kept.push(token.clone());
        }
    }
    (kept, unknown)
}
