//! Built-in message templates.
//!
//! The shared `action` tail renders whichever of `action`, `what`, `scope`,
//! `argument`, `value`, `reason` and `result` the caller supplies, so one
//! template covers everything from `SUCCESS on create 1 person` to a bare
//! `ERROR`.

use indexmap::IndexMap;

use crate::template::Template;

const ACTION: &str = "[ on {action}][ {what}][ within {scope}][ with {argument}][ = {value}][ because {reason}][: |result]^[{result}]";
const ARGUMENT: &str =
    "[ The argument][ \\[{argument}\\]][ is {status}][ because {reason}][. {result}][. {recommend}]";
const FOUND: &str = "/b[NOT |negative][FOUND][ {count}][/{total}][ {what}][ with {field}][: {items}]";
const EXCEPTION: &str = "/*R[ERROR][ \\[{type}\\]][: |message]*Y['{message}']/*R[ on executing:\n|command]@C[{command}]@R[\n with |argument]@Y[{argument}]";

/// The default template set, keyed by the names the formatter looks up.
pub fn default_templates() -> IndexMap<String, Template> {
    let mut templates = IndexMap::new();
    let mut add = |name: &str, source: String| {
        templates.insert(name.to_string(), Template::new(&source));
    };
    add("success", format!("/G[SUCCESS]{ACTION}"));
    add("error", format!("/*R[ERROR]{ACTION}"));
    add("argument_warning", format!("/Y[WARNING]{ARGUMENT}"));
    add("found_info", FOUND.to_string());
    add("exception", EXCEPTION.to_string());
    add("info", "/b[{0}]".to_string());
    add("custom", "[{0}]".to_string());
    templates
}
