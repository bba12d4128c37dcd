//! Compiles markdown into an ordered batch of positional edit requests for
//! a document service addressed by absolute character offsets.
//!
//! The compiler is a two-phase, single-pass translator: an eager insertion
//! pass walks the tokenizer's event stream, emitting one insert request per
//! realized piece of text and advancing a running cursor by exactly the
//! inserted UTF-16 length, while recording every span (formatted text,
//! headings, list items, code blocks, rules) whose styling cannot be
//! decided mid-stream; a deferred finalization pass then turns those
//! records into style/structure requests. Insertions come first in the
//! output — the service applies them in order against its live document —
//! followed by the style requests addressing the post-insertion offsets.
//!
//! One compilation call owns all of its state; concurrent calls need no
//! synchronization.
//!
//! ```
//! use quill_markdown::{markdown_to_requests, ConvertOptions};
//!
//! let requests = markdown_to_requests("# Title\n\nHello **world**.", &ConvertOptions::default())?;
//! assert!(!requests.is_empty());
//! # Ok::<(), quill_markdown::ConvertError>(())
//! ```

mod compiler;
mod error;
mod finalize;
mod state;
#[cfg(test)]
mod tests;

pub use compiler::{ConvertOptions, compile_events};
pub use error::ConvertError;

use pulldown_cmark::{Options, Parser};
use quill_api::Request;

/// Tokenizer options the compiler understands.
pub fn default_md_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options
}

/// Parse `markdown` and compile it into the request batch. Empty or
/// whitespace-only input yields an empty batch.
pub fn markdown_to_requests(
    markdown: &str,
    options: &ConvertOptions,
) -> Result<Vec<Request>, ConvertError> {
    let parser = Parser::new_ext(markdown, default_md_options());
    compile_events(parser, options)
}
