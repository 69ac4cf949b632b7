//! Response accumulation and the formatter that feeds it.
//!
//! Handlers build a [`Response`]: an ordered list of (channel, text) pairs.
//! The host flushes it through its [`OutputDevice`], so rendering stays
//! testable without a terminal.

use std::path::Path;

use cmdforge_core::Record;
use indexmap::IndexMap;

use crate::error::Result;
use crate::file::{FileOptions, FormatRegistry, WriteFn};
use crate::messages::default_templates;
use crate::tabling::{TableStyle, render_table};
use crate::template::{Template, TemplateArgs};

/// Where a piece of response text should go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Channel {
    #[default]
    Output,
    Error,
    Paged,
}

/// Sink for rendered response text.
pub trait OutputDevice {
    fn emit(&mut self, channel: Channel, text: &str);
}

/// Renders messages, tables and file exports from one template/writer set.
pub struct ResponseFormatter {
    templates: IndexMap<String, Template>,
    formats: FormatRegistry,
}

impl Default for ResponseFormatter {
    fn default() -> Self {
        ResponseFormatter {
            templates: default_templates(),
            formats: FormatRegistry::new(),
        }
    }
}

impl ResponseFormatter {
    pub fn new() -> ResponseFormatter {
        ResponseFormatter::default()
    }

    /// Adds or replaces a named template.
    pub fn register_template(&mut self, name: &str, template: Template) {
        self.templates.insert(name.to_string(), template);
    }

    pub fn register_format(&mut self, name: &str, writer: WriteFn) {
        self.formats.register(name, writer);
    }

    pub fn supported_formats(&self) -> Vec<&str> {
        self.formats.supported()
    }

    /// Renders a named template. An unknown name degrades to the argument
    /// values joined with spaces, so a message always comes out.
    pub fn message(&self, name: &str, args: &TemplateArgs) -> String {
        match self.templates.get(name) {
            Some(template) => template.render(args),
            None => {
                tracing::debug!(template = name, "unknown template, joining arguments");
                args.values()
                    .values()
                    .map(|value| value.to_string())
                    .collect::<Vec<_>>()
                    .join(" ")
            }
        }
    }

    pub fn table(
        &self,
        records: &[Record],
        style: TableStyle,
        widths: &[usize],
        headers: Option<Vec<String>>,
    ) -> String {
        render_table(records, style, widths, headers)
    }

    /// Exports records in the named format; returns the rendered text when
    /// no path is given.
    pub fn export(
        &self,
        format: &str,
        records: &[Record],
        path: Option<&Path>,
        append: bool,
        options: &FileOptions,
    ) -> Result<Option<String>> {
        self.formats.export(format, records, path, append, options)
    }
}

/// An accumulating, chainable response.
#[derive(Debug, Clone, Default)]
pub struct Response {
    channel: Channel,
    parts: Vec<(Channel, String)>,
}

impl Response {
    pub fn new() -> Response {
        Response::default()
    }

    /// Switches the channel for subsequently pushed parts.
    pub fn on(mut self, channel: Channel) -> Self {
        self.channel = channel;
        self
    }

    /// Appends text to the current channel; empty text is dropped.
    pub fn push(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        if !text.is_empty() {
            self.parts.push((self.channel, text));
        }
        self
    }

    /// Formats a named template and appends the result.
    pub fn message(self, formatter: &ResponseFormatter, name: &str, args: &TemplateArgs) -> Self {
        let text = formatter.message(name, args);
        self.push(text)
    }

    /// Renders a table and appends it.
    pub fn table(
        self,
        formatter: &ResponseFormatter,
        records: &[Record],
        style: TableStyle,
        widths: &[usize],
        headers: Option<Vec<String>>,
    ) -> Self {
        let text = formatter.table(records, style, widths, headers);
        self.push(text)
    }

    /// Appends another response's parts after this one's.
    pub fn concat(mut self, other: Response) -> Self {
        self.parts.extend(other.parts);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn parts(&self) -> &[(Channel, String)] {
        &self.parts
    }

    /// Flushes every part, in order, to the device.
    pub fn send(&self, device: &mut dyn OutputDevice) {
        for (channel, text) in &self.parts {
            device.emit(*channel, text);
        }
    }
}
