//! Error type for the markdown compiler.

use miette::Diagnostic;

/// Failure while compiling a token stream into an edit batch. Compilation
/// is pure and deterministic, so there is nothing to retry here; resilience
/// belongs to whatever executes the batch.
#[derive(Debug, thiserror::Error, Diagnostic)]
#[non_exhaustive]
pub enum ConvertError {
    /// The token stream opened a list item with no list open. The whole
    /// compilation aborts; no partial batch is returned.
    #[error("list item outside of an active list")]
    #[diagnostic(
        code(quill::markdown::stray_list_item),
        help("the token stream is structurally inconsistent; item tokens must be nested in a list")
    )]
    StrayListItem,
}
