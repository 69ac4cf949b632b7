//! Builds concrete argument specifications from field descriptors.
//!
//! An [`ArgSpec`] is the bridge between a normalized [`FieldDescriptor`] and
//! one registered `clap` argument, and it keeps enough type information to
//! convert the parsed text back into typed [`Value`]s afterwards.
//!
//! # Boolean flag spelling
//!
//! Boolean fields always render as a no-argument toggle, and the *spelling
//! depends on the declared default*: a truthy default produces a negated
//! `--no-<name>` flag that flips the value to false, while a falsy (or
//! absent) default produces a plain `--<name>` flag that flips it to true.
//! Invoking the flag always toggles to the opposite of the default. This is
//! easy to misread when declaring fields; it is intentional and covered by
//! tests.

use clap::{Arg, ArgAction, ArgMatches};
use indexmap::IndexMap;

use crate::dtype::{DType, FieldConverter, field_converter};
use crate::error::{MetaError, Result};
use crate::field::{Accumulate, Arity, FieldDescriptor, FieldSpec};
use crate::value::{Record, Value};

/// How the generated argument consumes input.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgKind {
    /// No-argument toggle that stores the opposite of the default.
    Toggle { store: bool },
    /// Takes one or more text values.
    Valued,
}

/// Concrete specification for one parseable argument.
#[derive(Debug, Clone)]
pub struct ArgSpec {
    /// Destination name in the parsed record.
    pub dest: String,
    /// Rendered option strings (`-x`, `--xxx`); empty means positional.
    pub flags: Vec<String>,
    pub kind: ArgKind,
    pub help: String,
    pub nargs: Option<Arity>,
    pub choices: Option<Vec<String>>,
    pub default: Option<Value>,
    pub required: bool,
    pub metavar: Option<String>,
    pub action: Accumulate,
    pub dtype: DType,
    pub proc: Option<String>,
}

/// Strips non-alphanumeric characters down to hyphens.
fn sanitize_flag(flag: &str) -> String {
    let sanitized: String = flag
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    sanitized.trim_matches('-').to_string()
}

/// Renders declared aliases plus the field name as option strings.
fn render_flags(name: &str, aliases: &[String]) -> Vec<String> {
    aliases
        .iter()
        .map(String::as_str)
        .chain(std::iter::once(name))
        .map(sanitize_flag)
        .filter(|flag| !flag.is_empty())
        .map(|flag| {
            if flag.chars().count() == 1 {
                format!("-{flag}")
            } else {
                format!("--{flag}")
            }
        })
        .collect()
}

/// Assembles help text: `[dtype] [not null] [=: default] comment`.
fn render_help(
    dtype: Option<DType>,
    required: bool,
    default: Option<&Value>,
    comment: Option<&str>,
) -> String {
    let mut parts = Vec::new();
    if let Some(dtype) = dtype {
        parts.push(format!("[{}]", dtype.name()));
    }
    if required {
        parts.push("[not null]".to_string());
    }
    if let Some(default) = default {
        parts.push(format!("[=: {default}]"));
    }
    if let Some(comment) = comment {
        parts.push(comment.to_string());
    }
    parts.join(" ")
}

impl ArgSpec {
    /// Builds the argument specification for a normalized field.
    pub fn from_field(field: &FieldDescriptor) -> ArgSpec {
        if field.dtype == DType::Bool {
            return ArgSpec::for_bool(field);
        }

        let flags = match &field.flags {
            Some(aliases) if aliases.is_empty() => Vec::new(),
            Some(aliases) => render_flags(&field.name, aliases),
            None => render_flags(&field.name, &[]),
        };
        let is_positional = flags.is_empty();

        let mut nargs = field.nargs;
        if is_positional && nargs.is_none() && field.default_value.is_some() {
            // A positional with a default becomes optional.
            nargs = Some(Arity::Optional);
        }
        if nargs.is_none() && matches!(field.dtype, DType::Array | DType::Json) {
            nargs = Some(Arity::ZeroOrMore);
        }

        let help = render_help(
            Some(field.dtype),
            !is_positional && field.required,
            field.default_value.as_ref(),
            field.comment.as_deref(),
        );

        ArgSpec {
            dest: field.name.clone(),
            flags,
            kind: ArgKind::Valued,
            help,
            nargs,
            choices: field
                .choices
                .as_ref()
                .map(|items| items.iter().map(Value::to_string).collect()),
            default: field.default_value.clone(),
            required: !is_positional && field.required,
            metavar: field.metavar.as_ref().map(|m| m.to_uppercase()),
            action: field.action.unwrap_or_default(),
            dtype: field.dtype,
            proc: field.proc.clone(),
        }
    }

    /// Builds an argument directly from a raw specification.
    ///
    /// Unlike [`ArgSpec::from_field`], this requires an explicit `dtype`:
    /// a missing one is a definition-time configuration error.
    pub fn from_metadata(name: &str, spec: &FieldSpec) -> Result<ArgSpec> {
        if spec.dtype.is_none() {
            return Err(MetaError::MissingDtype {
                field: name.to_string(),
            });
        }
        Ok(ArgSpec::from_field(&FieldDescriptor::from_spec(
            name,
            spec.clone(),
        )))
    }

    /// Boolean special case: a single toggle flag whose spelling depends on
    /// the declared default (see module docs).
    fn for_bool(field: &FieldDescriptor) -> ArgSpec {
        let default_truthy = field
            .default_value
            .as_ref()
            .is_some_and(Value::is_truthy);
        let flag = if default_truthy {
            format!("--no-{}", field.name)
        } else {
            format!("--{}", field.name)
        };
        ArgSpec {
            dest: field.name.clone(),
            flags: vec![flag],
            kind: ArgKind::Toggle {
                store: !default_truthy,
            },
            help: render_help(
                Some(DType::Bool),
                false,
                field.default_value.as_ref(),
                field.comment.as_deref(),
            ),
            nargs: None,
            choices: None,
            default: field.default_value.clone(),
            required: false,
            metavar: None,
            action: Accumulate::Store,
            dtype: DType::Bool,
            proc: None,
        }
    }

    pub fn is_positional(&self) -> bool {
        self.flags.is_empty()
    }

    /// Converts the specification into a `clap` argument.
    pub fn to_clap(&self) -> Arg {
        let mut arg = Arg::new(self.dest.clone()).help(self.help.clone());

        if let ArgKind::Toggle { store } = self.kind {
            let long = self.flags[0].trim_start_matches('-').to_string();
            return arg
                .long(long)
                .action(if store {
                    ArgAction::SetTrue
                } else {
                    ArgAction::SetFalse
                });
        }

        let mut long_set = false;
        let mut short_set = false;
        for flag in &self.flags {
            let trimmed = flag.trim_start_matches('-');
            let mut chars = trimmed.chars();
            match (chars.next(), chars.next()) {
                (Some(short), None) => {
                    if short_set {
                        arg = arg.short_alias(short);
                    } else {
                        arg = arg.short(short);
                        short_set = true;
                    }
                }
                _ if long_set => arg = arg.visible_alias(trimmed.to_string()),
                _ => {
                    arg = arg.long(trimmed.to_string());
                    long_set = true;
                }
            }
        }

        arg = match self.action {
            Accumulate::Append => arg.action(ArgAction::Append),
            Accumulate::Count => arg.action(ArgAction::Count),
            Accumulate::Store => arg.action(ArgAction::Set),
        };

        if let Some(nargs) = self.nargs {
            arg = match nargs {
                Arity::Optional => arg.num_args(0..=1),
                Arity::ZeroOrMore => arg.num_args(0..),
                Arity::OneOrMore => arg.num_args(1..),
                Arity::Exactly(n) => arg.num_args(n),
            };
        }
        if let Some(choices) = &self.choices {
            arg = arg.value_parser(clap::builder::PossibleValuesParser::new(
                choices.iter().map(String::from).collect::<Vec<_>>(),
            ));
        }
        if let Some(metavar) = &self.metavar {
            arg = arg.value_name(metavar.clone());
        }
        // Numeric arguments must accept values like `-8`.
        if matches!(self.dtype, DType::Int | DType::Float) {
            arg = arg.allow_negative_numbers(true);
        }

        if self.is_positional() {
            let optional = matches!(self.nargs, Some(Arity::Optional | Arity::ZeroOrMore));
            arg = arg.required(!optional);
        } else {
            arg = arg.required(self.required);
        }
        arg
    }

    /// Whether parsed occurrences should collect into an array.
    fn collects_many(&self) -> bool {
        matches!(
            self.nargs,
            Some(Arity::ZeroOrMore | Arity::OneOrMore) | Some(Arity::Exactly(_))
        ) || self.action == Accumulate::Append
    }

    /// Extracts this argument's typed value from parsed matches.
    ///
    /// Cast failures are swallowed (the field is omitted); declared defaults
    /// fill in for absent arguments.
    pub fn extract(&self, matches: &ArgMatches) -> Option<Value> {
        match self.kind {
            ArgKind::Toggle { .. } => Some(Value::Bool(matches.get_flag(&self.dest))),
            ArgKind::Valued => {
                if self.action == Accumulate::Count {
                    let count = matches.get_count(&self.dest);
                    return Some(Value::Int(i64::from(count)));
                }
                let raw: Vec<String> = match matches.get_many::<String>(&self.dest) {
                    Some(values) => values.cloned().collect(),
                    None => return self.default.clone(),
                };
                if raw.is_empty() {
                    return self.default.clone();
                }
                let converter = field_converter(self.dtype, self.proc.as_deref());
                self.convert_tokens(&raw, converter)
            }
        }
    }

    fn convert_tokens(&self, tokens: &[String], converter: FieldConverter) -> Option<Value> {
        let mut converted = Vec::with_capacity(tokens.len());
        for token in tokens {
            match converter.convert(token) {
                Ok(value) => converted.push(value),
                Err(error) => {
                    tracing::debug!(field = %self.dest, %error, "cast failed, omitting field");
                    return None;
                }
            }
        }

        if let FieldConverter::KeyValue(_) = converter {
            let mut object = IndexMap::new();
            for pair in converted {
                let Value::Array(items) = pair else { continue };
                let mut items = items.into_iter();
                match (items.next(), items.next()) {
                    (Some(Value::Str(key)), Some(value)) => {
                        object.insert(key, value);
                    }
                    _ => {
                        tracing::debug!(field = %self.dest, "key=value pair without key, skipped");
                    }
                }
            }
            return Some(Value::Object(object));
        }

        if self.collects_many() {
            Some(Value::Array(converted))
        } else {
            converted.into_iter().next_back()
        }
    }
}

/// Parsed arguments for one command invocation: typed access over the raw
/// `clap` matches plus any diverted unknown tokens.
#[derive(Debug)]
pub struct CommandArgs {
    matches: ArgMatches,
    specs: Vec<ArgSpec>,
    /// Flag-like tokens that matched no declared flag (only populated for
    /// commands that accept unknown arguments).
    pub unknown: Vec<String>,
}

impl CommandArgs {
    pub fn new(matches: ArgMatches, specs: Vec<ArgSpec>, unknown: Vec<String>) -> CommandArgs {
        CommandArgs {
            matches,
            specs,
            unknown,
        }
    }

    /// All provided (or defaulted) arguments as a typed record.
    pub fn record(&self) -> Record {
        let mut record = Record::new();
        for spec in &self.specs {
            if let Some(value) = spec.extract(&self.matches) {
                record.insert(spec.dest.clone(), value);
            }
        }
        record
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.specs
            .iter()
            .find(|spec| spec.dest == name)
            .and_then(|spec| spec.extract(&self.matches))
    }

    pub fn get_bool(&self, name: &str) -> bool {
        matches!(self.get(name), Some(value) if value.is_truthy())
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(|value| value.as_int())
    }

    pub fn get_str(&self, name: &str) -> Option<String> {
        self.get(name).map(|value| value.to_string())
    }

    pub fn get_array(&self, name: &str) -> Vec<Value> {
        match self.get(name) {
            Some(Value::Array(items)) => items,
            Some(other) => vec![other],
            None => Vec::new(),
        }
    }
}
