//! State for one compilation run, grouped by concern.
//!
//! Everything here is created by a single `Compiler` pass and consumed once
//! by finalization; nothing survives a compilation call.

use quill_api::BulletPreset;
use smol_str::SmolStr;

/// One active inline attribute on the formatting stack.
///
/// The stack is ordered oldest-first but is not strictly LIFO: overlapping
/// spans may close an attribute that is not on top (a link ending while bold
/// is still open), so removal scans for the most recent entry of a kind.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum InlineFormat {
    Bold,
    Italic,
    Strikethrough,
    Code,
    Link(String),
}

impl InlineFormat {
    pub(crate) fn same_kind(&self, other: &InlineFormat) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

/// The formatting stack flattened into one snapshot, taken at insertion
/// time. Later stack entries win for the same attribute.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct TextFormat {
    pub bold: bool,
    pub italic: bool,
    pub strikethrough: bool,
    pub code: bool,
    pub link: Option<String>,
}

impl TextFormat {
    pub(crate) fn from_stack(stack: &[InlineFormat]) -> Self {
        let mut format = Self::default();
        for entry in stack {
            match entry {
                InlineFormat::Bold => format.bold = true,
                InlineFormat::Italic => format.italic = true,
                InlineFormat::Strikethrough => format.strikethrough = true,
                InlineFormat::Code => format.code = true,
                InlineFormat::Link(url) => format.link = Some(url.clone()),
            }
        }
        format
    }

    /// A span only earns a style request if something is actually set.
    pub(crate) fn is_plain(&self) -> bool {
        !(self.bold || self.italic || self.strikethrough || self.code) && self.link.is_none()
    }
}

/// A contiguous inserted span carrying at least one inline attribute.
#[derive(Debug, Clone)]
pub(crate) struct FormattedRange {
    pub start: i64,
    pub end: i64,
    pub format: TextFormat,
}

/// A heading block's span and the named style it maps to.
#[derive(Debug, Clone)]
pub(crate) struct ParagraphRange {
    pub start: i64,
    pub end: i64,
    pub style: quill_api::NamedStyleType,
}

/// A paragraph span that receives the fixed below-paragraph spacing.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SpacingSpan {
    pub start: i64,
    pub end: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ItemKind {
    Bullet,
    Numbered,
    Checkbox,
}

impl ItemKind {
    pub(crate) fn preset(self) -> BulletPreset {
        match self {
            ItemKind::Bullet => BulletPreset::BulletDiscCircleSquare,
            ItemKind::Numbered => BulletPreset::NumberedDecimalAlphaRoman,
            ItemKind::Checkbox => BulletPreset::BulletCheckbox,
        }
    }
}

/// A list item whose end offset is unknown until its closing token (or an
/// enclosing paragraph close) arrives. `kind` upgrades in place to
/// [`ItemKind::Checkbox`] when the item's first text carries a task marker.
#[derive(Debug, Clone)]
pub(crate) struct PendingListItem {
    pub start: i64,
    pub end: Option<i64>,
    pub nesting: usize,
    pub kind: ItemKind,
    pub saw_text: bool,
}

impl PendingListItem {
    /// An item qualifies for bullet creation only once it covers real
    /// content.
    pub(crate) fn span(&self) -> Option<(i64, i64)> {
        match self.end {
            Some(end) if end > self.start => Some((self.start, end)),
            _ => None,
        }
    }
}

/// The structural table encoding of one code block; the service has no
/// native code-block element.
#[derive(Debug, Clone)]
pub(crate) struct CodeBlockRange {
    /// Table element start, already corrected for the auto-inserted leading
    /// newline.
    pub table_start: i64,
    pub text_start: i64,
    pub text_end: i64,
    pub language: Option<SmolStr>,
}

/// The one-newline empty paragraph standing in for a horizontal rule.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RuleRange {
    pub start: i64,
    pub end: i64,
}

/// List nesting state.
#[derive(Debug, Clone, Default)]
pub(crate) struct ListContext {
    pub stack: Vec<ListLevel>,
    /// Indices into the pending-item buffer, one per currently-open item.
    pub open_items: Vec<usize>,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct ListLevel {
    pub ordered: bool,
    /// Stack depth at the time this list opened; the outermost list is 0.
    pub nesting: usize,
}

impl ListContext {
    pub(crate) fn in_list(&self) -> bool {
        !self.stack.is_empty()
    }
}

/// Code block buffering state.
#[derive(Debug, Clone, Default)]
pub(crate) struct CodeBlockContext {
    /// (language, content) being buffered
    buffer: Option<(Option<SmolStr>, String)>,
}

impl CodeBlockContext {
    pub(crate) fn is_active(&self) -> bool {
        self.buffer.is_some()
    }

    pub(crate) fn begin(&mut self, language: Option<SmolStr>) {
        self.buffer = Some((language, String::new()));
    }

    pub(crate) fn push_text(&mut self, text: &str) {
        if let Some((_, buffer)) = self.buffer.as_mut() {
            buffer.push_str(text);
        }
    }

    pub(crate) fn take(&mut self) -> (Option<SmolStr>, String) {
        self.buffer.take().unwrap_or_default()
    }
}

/// Every range record accumulated during the pass, consumed by the
/// finalizer.
#[derive(Debug, Clone, Default)]
pub(crate) struct PendingRanges {
    pub formatted: Vec<FormattedRange>,
    pub paragraphs: Vec<ParagraphRange>,
    pub spacing: Vec<SpacingSpan>,
    pub items: Vec<PendingListItem>,
    pub code_blocks: Vec<CodeBlockRange>,
    pub rules: Vec<RuleRange>,
}
