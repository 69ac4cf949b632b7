//! The bracket template engine.
//!
//! A template is a sequence of *style scopes*, each holding conditional
//! *fragments*:
//!
//! ```text
//! /G[SUCCESS][ on {action}][ saved|quiet]
//! ```
//!
//! Text before a `[` is a style segment for the scope that follows; text
//! between `[` and `]` is a fragment. A fragment renders only when all of
//! its dependencies are present in the arguments: every `{placeholder}` it
//! interpolates, plus any comma-separated names after a trailing `|`. A
//! scope whose fragments all stay silent contributes nothing, styling
//! included. Text before a `[` that does not parse as a style is kept as an
//! ordinary fragment of the current scope. `\` escapes the next character
//! (`\[`, `\]`, `\{`, `\}` render literally).
//!
//! Rendering is pure: the same template and arguments always produce the
//! same text.

use cmdforge_core::{Record, Value};

use crate::style::Style;

/// One interpolation piece of a fragment.
#[derive(Debug, Clone, PartialEq)]
enum Piece {
    Literal(String),
    Placeholder(String),
}

/// A conditional fragment: pieces plus the names it depends on.
#[derive(Debug, Clone)]
struct Fragment {
    pieces: Vec<Piece>,
    deps: Vec<String>,
}

impl Fragment {
    fn qualifies(&self, args: &TemplateArgs) -> bool {
        self.deps.iter().all(|dep| args.contains(dep))
    }

    fn render(&self, args: &TemplateArgs) -> String {
        let mut text = String::new();
        for piece in &self.pieces {
            match piece {
                Piece::Literal(literal) => text.push_str(literal),
                Piece::Placeholder(name) => {
                    if let Some(value) = args.get(name) {
                        text.push_str(&value.to_string());
                    }
                }
            }
        }
        text
    }
}

/// A styled group of fragments.
#[derive(Debug, Clone)]
struct StyleScope {
    style: Option<Style>,
    fragments: Vec<Fragment>,
}

/// A parsed template, ready to render any number of argument sets.
#[derive(Debug, Clone)]
pub struct Template {
    raw: String,
    scopes: Vec<StyleScope>,
}

impl Template {
    pub fn new(template: &str) -> Template {
        Template {
            raw: template.to_string(),
            scopes: parse(template),
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn render(&self, args: &TemplateArgs) -> String {
        let mut result = String::new();
        for scope in &self.scopes {
            let mut joined = String::new();
            for fragment in scope.fragments.iter().filter(|f| f.qualifies(args)) {
                joined.push_str(&fragment.render(args));
            }
            if joined.is_empty() {
                continue;
            }
            match &scope.style {
                Some(style) => result.push_str(&style.apply(&joined)),
                None => result.push_str(&joined),
            }
        }
        result
    }
}

/// Arguments for one render: positional values addressable as `{0}`, `{1}`,
/// ... plus named values.
#[derive(Debug, Clone, Default)]
pub struct TemplateArgs {
    values: Record,
    positional: usize,
}

impl TemplateArgs {
    pub fn new() -> TemplateArgs {
        TemplateArgs::default()
    }

    /// Appends the next positional value.
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.values
            .insert(self.positional.to_string(), value.into());
        self.positional += 1;
        self
    }

    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.values.insert(name.to_string(), value.into());
        self
    }

    /// Merges a whole record of named values.
    pub fn with_record(mut self, record: &Record) -> Self {
        for (name, value) in record {
            self.values.insert(name.clone(), value.clone());
        }
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn values(&self) -> &Record {
        &self.values
    }
}

/// Splits the source at unescaped bracket runs and folds the parts into
/// scopes. Only the first bracket of a run decides: `][` closes a fragment
/// without opening a new scope.
fn parse(template: &str) -> Vec<StyleScope> {
    let source: Vec<char> = template.chars().chain(std::iter::once(']')).collect();
    let mut scopes = vec![StyleScope {
        style: None,
        fragments: Vec::new(),
    }];
    let mut base: Option<Style> = None;
    let mut pending = String::new();

    let mut i = 0;
    while i < source.len() {
        match source[i] {
            '\\' => {
                pending.push('\\');
                if let Some(&escaped) = source.get(i + 1) {
                    pending.push(escaped);
                    i += 2;
                } else {
                    i += 1;
                }
            }
            first @ ('[' | ']') => {
                while i < source.len() && matches!(source[i], '[' | ']') {
                    i += 1;
                }
                if first == '[' {
                    match Style::parse(&pending, base.as_ref()) {
                        Some(style) => {
                            base = Some(style.clone());
                            scopes.push(StyleScope {
                                style: Some(style),
                                fragments: Vec::new(),
                            });
                        }
                        // Not a style: keep the text as a fragment instead of
                        // dropping it.
                        None => push_fragment(&mut scopes, &pending),
                    }
                } else {
                    push_fragment(&mut scopes, &pending);
                }
                pending.clear();
            }
            c => {
                pending.push(c);
                i += 1;
            }
        }
    }
    scopes
}

fn push_fragment(scopes: &mut [StyleScope], text: &str) {
    if let Some(fragment) = parse_fragment(text) {
        if let Some(scope) = scopes.last_mut() {
            scope.fragments.push(fragment);
        }
    }
}

/// Parses a fragment body: optional `|dep,dep` suffix at the last `|`, then
/// literal/placeholder pieces with `\` escapes.
fn parse_fragment(text: &str) -> Option<Fragment> {
    if text.is_empty() {
        return None;
    }

    let mut deps = Vec::new();
    let body = match text.rfind('|') {
        Some(at) if at > 0 => {
            let suffix = &text[at + 1..];
            let is_dep_list = !suffix.is_empty()
                && suffix
                    .chars()
                    .all(|c| c.is_alphanumeric() || c == '_' || c == ',');
            if is_dep_list {
                deps.extend(
                    suffix
                        .split(',')
                        .filter(|dep| !dep.is_empty())
                        .map(str::to_string),
                );
                &text[..at]
            } else {
                text
            }
        }
        _ => text,
    };

    let source: Vec<char> = body.chars().collect();
    let mut pieces = Vec::new();
    let mut literal = String::new();
    let mut i = 0;
    while i < source.len() {
        match source[i] {
            '\\' => {
                if let Some(&escaped) = source.get(i + 1) {
                    literal.push(escaped);
                    i += 2;
                } else {
                    i += 1;
                }
            }
            '{' => match scan_placeholder(&source, i) {
                Some((name, next)) => {
                    if !literal.is_empty() {
                        pieces.push(Piece::Literal(std::mem::take(&mut literal)));
                    }
                    deps.push(name.clone());
                    pieces.push(Piece::Placeholder(name));
                    i = next;
                }
                None => {
                    literal.push('{');
                    i += 1;
                }
            },
            c => {
                literal.push(c);
                i += 1;
            }
        }
    }
    if !literal.is_empty() {
        pieces.push(Piece::Literal(literal));
    }
    if pieces.is_empty() {
        return None;
    }
    Some(Fragment { pieces, deps })
}

/// Reads `{name}` starting at the `{`; returns the name and the index after
/// the closing brace.
fn scan_placeholder(source: &[char], start: usize) -> Option<(String, usize)> {
    let mut name = String::new();
    let mut i = start + 1;
    while i < source.len() {
        let c = source[i];
        if c == '}' {
            return (!name.is_empty()).then_some((name, i + 1));
        }
        if !c.is_alphanumeric() && c != '_' {
            return None;
        }
        name.push(c);
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain() {
        colored::control::set_override(false);
    }

    fn render(template: &str, args: TemplateArgs) -> String {
        Template::new(template).render(&args)
    }

    #[test]
    fn test_unconditional_fragment_always_shows() {
        plain();
        assert_eq!(render("[SUCCESS]", TemplateArgs::new()), "SUCCESS");
    }

    #[test]
    fn test_placeholder_fragments_depend_on_their_arguments() {
        plain();
        let template = "/G[SUCCESS][ on {action}][ {what}]";
        assert_eq!(render(template, TemplateArgs::new()), "SUCCESS");
        assert_eq!(
            render(template, TemplateArgs::new().with("action", "create")),
            "SUCCESS on create"
        );
        assert_eq!(
            render(
                template,
                TemplateArgs::new().with("action", "create").with("what", "1 person")
            ),
            "SUCCESS on create 1 person"
        );
    }

    #[test]
    fn test_suffix_dependencies_gate_without_interpolating() {
        plain();
        let template = "[NOT |negative][FOUND]";
        assert_eq!(render(template, TemplateArgs::new()), "FOUND");
        assert_eq!(
            render(template, TemplateArgs::new().with("negative", true)),
            "NOT FOUND"
        );
    }

    #[test]
    fn test_positional_arguments() {
        plain();
        assert_eq!(
            render("[{0}: {1}]", TemplateArgs::new().arg("count").arg(3i64)),
            "count: 3"
        );
    }

    #[test]
    fn test_silent_scope_contributes_nothing() {
        plain();
        // The padded scope must not emit its padding when its only fragment
        // is missing an argument.
        let template = "[a]10=[{middle}]@[b]";
        assert_eq!(render(template, TemplateArgs::new()), "ab");
        assert_eq!(
            render(template, TemplateArgs::new().with("middle", "x")),
            format!("a{:^10}b", "x")
        );
    }

    #[test]
    fn test_escaped_brackets_and_braces_are_literal() {
        plain();
        assert_eq!(
            render(
                "[ The argument][ \\[{argument}\\]]",
                TemplateArgs::new().with("argument", "size")
            ),
            " The argument [size]"
        );
        assert_eq!(render("[a \\{b\\} c]", TemplateArgs::new()), "a {b} c");
    }

    #[test]
    fn test_failed_style_text_is_kept_as_fragment() {
        plain();
        assert_eq!(
            render("Hello [world]", TemplateArgs::new()),
            "Hello world"
        );
    }

    #[test]
    fn test_consecutive_brackets_stay_in_scope() {
        plain();
        // `][` closes a fragment without starting a new scope, so the upper
        // transform still applies to the second fragment.
        let template = "+[ok][ fine]";
        assert_eq!(render(template, TemplateArgs::new()), "OK FINE");
    }

    #[test]
    fn test_rendering_is_idempotent() {
        plain();
        let template = Template::new("/G[SUCCESS][ on {action}]");
        let args = TemplateArgs::new().with("action", "update");
        let first = template.render(&args);
        let second = template.render(&args);
        assert_eq!(first, second);
    }
}
