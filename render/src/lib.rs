//! Text rendering for cmdforge shells: bracket templates, ANSI styles,
//! response channels, table rendering, and file export.
//!
//! The centerpiece is the bracket template grammar:
//!
//! ```
//! use cmdforge_render::{Template, TemplateArgs};
//!
//! colored::control::set_override(false);
//! let template = Template::new("/G[SUCCESS][ on {action}][ {what}]");
//! let text = template.render(
//!     &TemplateArgs::new().with("action", "create").with("what", "1 person"),
//! );
//! assert_eq!(text, "SUCCESS on create 1 person");
//! ```
//!
//! Fragments render only when their arguments are present, so the same
//! template degrades gracefully from a detailed message to a bare label.

mod error;
mod file;
mod messages;
mod response;
mod style;
mod tabling;
mod template;

pub use error::{RenderError, Result};
pub use file::{FileOptions, FormatRegistry, WriteFn};
pub use messages::default_templates;
pub use response::{Channel, OutputDevice, Response, ResponseFormatter};
pub use style::{Alignment, Style, Transform, terminal_width};
pub use tabling::{TableStyle, render_table};
pub use template::{Template, TemplateArgs};
