pub mod config;
pub mod directive;
pub mod filesystem;
pub mod form;
pub mod host;
pub mod ids;
pub mod namespaces;
pub mod nspath;
pub mod options;
pub mod runtime;
pub mod templates;

pub use directive::{ParsedDirective, find_directives, parse_directive};
pub use form::{Rendered, render_directive, render_page};
pub use host::{Host, RenderContext};
pub use options::Options;
