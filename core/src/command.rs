//! Command metadata: the prototype description that expands into one or
//! more concrete, parseable commands.
//!
//! A [`CommandDescriptor`] holds everything declared about a command:
//! description, epilog, its ordered argument set, an optional category, and
//! an optional [`ContextDependency`]. Expansion (performed once by the
//! prototype host) produces either a single plain command or one hidden
//! command per matching context plus a dispatching placeholder.

use std::rc::Rc;

use indexmap::IndexMap;

use crate::argspec::ArgSpec;
use crate::context::{Context, ContextHandle, ContextRegistry};
use crate::error::{MetaError, Result};
use crate::field::{FieldDecl, FieldDescriptor, FieldSpec};

/// Hook producing extra per-context arguments.
pub type ArgumentsFor = Rc<dyn Fn(&dyn Context) -> Result<IndexMap<String, FieldDecl>>>;

/// Hook rewriting descriptive text for a context, applied to the command
/// description, epilog, and every argument comment. It is never applied to
/// argument names, flags, or default values.
pub type TextParser = Rc<dyn Fn(&dyn Context, &str) -> String>;

/// Declares that a command is specialized per context.
#[derive(Clone)]
pub struct ContextDependency {
    /// Context-kind tag the command depends on (e.g. `"table"`).
    pub kind: String,
    /// Optional allow-list of context names; `None` means all of the kind.
    pub names: Option<Vec<String>>,
    /// Context the placeholder runs against when no selector is given.
    /// Without one the selector is required and its absence is a usage error.
    pub default_context: Option<String>,
    pub arguments_for: Option<ArgumentsFor>,
    pub text_parser: Option<TextParser>,
}

impl ContextDependency {
    pub fn on(kind: &str) -> ContextDependency {
        ContextDependency {
            kind: kind.to_string(),
            names: None,
            default_context: None,
            arguments_for: None,
            text_parser: None,
        }
    }

    pub fn with_names(mut self, names: &[&str]) -> Self {
        self.names = Some(names.iter().map(|name| name.to_string()).collect());
        self
    }

    pub fn with_default_context(mut self, name: &str) -> Self {
        self.default_context = Some(name.to_string());
        self
    }

    pub fn with_arguments_for(
        mut self,
        hook: impl Fn(&dyn Context) -> Result<IndexMap<String, FieldDecl>> + 'static,
    ) -> Self {
        self.arguments_for = Some(Rc::new(hook));
        self
    }

    pub fn with_text_parser(mut self, hook: impl Fn(&dyn Context, &str) -> String + 'static) -> Self {
        self.text_parser = Some(Rc::new(hook));
        self
    }
}

/// One command prototype's metadata.
#[derive(Clone, Default)]
pub struct CommandDescriptor {
    pub description: String,
    pub epilog: String,
    pub arguments: IndexMap<String, FieldDecl>,
    pub category: Option<String>,
    pub accepts_unknown: bool,
    pub dependency: Option<ContextDependency>,
}

/// Fully resolved parser inputs for one concrete command.
#[derive(Debug)]
pub struct ParserAttributes {
    pub description: String,
    pub epilog: String,
    pub fields: Vec<FieldDescriptor>,
}

impl CommandDescriptor {
    pub fn new(description: &str) -> CommandDescriptor {
        CommandDescriptor {
            description: description.to_string(),
            ..CommandDescriptor::default()
        }
    }

    pub fn with_epilog(mut self, epilog: &str) -> Self {
        self.epilog = epilog.to_string();
        self
    }

    pub fn with_argument(mut self, name: &str, decl: impl Into<FieldDecl>) -> Self {
        self.arguments.insert(name.to_string(), decl.into());
        self
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.category = Some(category.to_string());
        self
    }

    /// Lets the command receive tokens its parser does not know about.
    pub fn accepting_unknown(mut self) -> Self {
        self.accepts_unknown = true;
        self
    }

    pub fn with_dependency(mut self, dependency: ContextDependency) -> Self {
        self.dependency = Some(dependency);
        self
    }

    /// Contexts this command depends on, in store order.
    pub fn contexts(&self, registry: &ContextRegistry) -> Vec<(String, ContextHandle)> {
        match &self.dependency {
            Some(dependency) => registry.select(&dependency.kind, dependency.names.as_deref()),
            None => Vec::new(),
        }
    }

    /// Resolves the argument set for an optional context.
    ///
    /// Context-supplied arguments are merged *underneath* the statically
    /// declared ones: on a name collision the static declaration always
    /// wins, including for help text. Context text parameterization is
    /// applied to the description, the epilog, and every argument comment.
    pub fn parser_attributes(
        &self,
        name: &str,
        context: Option<&dyn Context>,
    ) -> Result<ParserAttributes> {
        let mut merged: IndexMap<String, FieldSpec> = IndexMap::new();

        if let (Some(context), Some(dependency)) = (context, &self.dependency) {
            if let Some(arguments_for) = &dependency.arguments_for {
                let extension =
                    arguments_for(context).map_err(|error| MetaError::ContextArguments {
                        context: context.identifier().to_string(),
                        message: error.to_string(),
                    })?;
                for (argument, decl) in &extension {
                    merged.insert(argument.clone(), decl.resolve()?);
                }
            }
        }
        // Static declarations override dynamic ones on collision.
        for (argument, decl) in &self.arguments {
            merged.insert(argument.clone(), decl.resolve()?);
        }

        let mut description = self.description.clone();
        let mut epilog = self.epilog.clone();
        if let (Some(context), Some(dependency)) = (context, &self.dependency) {
            if let Some(text_parser) = &dependency.text_parser {
                description = text_parser(context, &description);
                epilog = text_parser(context, &epilog);
                for spec in merged.values_mut() {
                    if let Some(comment) = &spec.comment {
                        spec.comment = Some(text_parser(context, comment));
                    }
                }
            }
        }

        tracing::debug!(command = name, arguments = merged.len(), "resolved parser attributes");
        let fields = merged
            .into_iter()
            .map(|(argument, spec)| FieldDescriptor::from_spec(&argument, spec))
            .collect();
        Ok(ParserAttributes {
            description,
            epilog,
            fields,
        })
    }

    /// Builds the concrete argument parser for this command in an optional
    /// context.
    pub fn build_parser(
        &self,
        name: &str,
        context: Option<&dyn Context>,
    ) -> Result<(clap::Command, Vec<ArgSpec>)> {
        let attributes = self.parser_attributes(name, context)?;
        let specs: Vec<ArgSpec> = attributes.fields.iter().map(ArgSpec::from_field).collect();

        let mut parser = clap::Command::new(name.to_string())
            .no_binary_name(true)
            .disable_version_flag(true)
            .about(attributes.description);
        if !attributes.epilog.is_empty() {
            parser = parser.after_help(attributes.epilog);
        }
        for spec in &specs {
            parser = parser.arg(spec.to_clap());
        }
        Ok((parser, specs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextStore;
    use crate::value::Value;
    use std::any::Any;
    use std::sync::Arc;

    struct Topic {
        name: String,
    }

    impl Context for Topic {
        fn identifier(&self) -> &str {
            &self.name
        }

        fn kind(&self) -> &str {
            "topic"
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn topic_registry() -> ContextRegistry {
        let mut store = ContextStore::new("topic");
        store.insert(Arc::new(Topic { name: "news".into() }));
        store.insert(Arc::new(Topic { name: "sport".into() }));
        let mut registry = ContextRegistry::new();
        registry.add_store(store);
        registry
    }

    #[test]
    fn test_static_arguments_win_on_collision() {
        let descriptor = CommandDescriptor::new("demo")
            .with_argument("size", "s (int = 20): static comment")
            .with_dependency(ContextDependency::on("topic").with_arguments_for(|_| {
                let mut extra = IndexMap::new();
                extra.insert(
                    "size".to_string(),
                    FieldDecl::from("s (int = 99): dynamic comment"),
                );
                extra.insert("extra".to_string(), FieldDecl::from("e (str): extra"));
                Ok(extra)
            }));

        let registry = topic_registry();
        let (name, context) = descriptor.contexts(&registry).into_iter().next().unwrap();
        assert_eq!(name, "news");

        let attributes = descriptor
            .parser_attributes("demo", Some(context.as_ref()))
            .unwrap();
        let size = attributes
            .fields
            .iter()
            .find(|field| field.name == "size")
            .unwrap();
        assert_eq!(size.default_value, Some(Value::Int(20)));
        assert_eq!(size.comment.as_deref(), Some("static comment"));
        assert!(attributes.fields.iter().any(|field| field.name == "extra"));
    }

    #[test]
    fn test_text_parser_touches_text_but_not_defaults() {
        let descriptor = CommandDescriptor::new("create new record")
            .with_argument("name", "n (str = record): the record name")
            .with_dependency(
                ContextDependency::on("topic").with_text_parser(|context, text| {
                    text.replace("record", context.identifier())
                }),
            );

        let registry = topic_registry();
        let (_, context) = descriptor.contexts(&registry).into_iter().next().unwrap();
        let attributes = descriptor
            .parser_attributes("create", Some(context.as_ref()))
            .unwrap();

        assert_eq!(attributes.description, "create new news");
        let name = &attributes.fields[0];
        assert_eq!(name.comment.as_deref(), Some("the news name"));
        // Defaults are never parameterized.
        assert_eq!(name.default_value, Some(Value::Str("record".into())));
    }

    #[test]
    fn test_failing_extension_hook_is_fatal_and_names_context() {
        let descriptor = CommandDescriptor::new("demo").with_dependency(
            ContextDependency::on("topic").with_arguments_for(|context| {
                Err(MetaError::ContextArguments {
                    context: context.identifier().to_string(),
                    message: "broken hook".into(),
                })
            }),
        );

        let registry = topic_registry();
        let (_, context) = descriptor.contexts(&registry).into_iter().next().unwrap();
        let error = descriptor
            .parser_attributes("demo", Some(context.as_ref()))
            .unwrap_err();
        let message = error.to_string();
        assert!(message.contains("news"));
    }

    #[test]
    fn test_no_dependency_yields_no_contexts() {
        let descriptor = CommandDescriptor::new("plain");
        assert!(descriptor.contexts(&topic_registry()).is_empty());
    }
}
