//! The token processor: a single forward pass over the markdown event
//! stream that emits insert requests eagerly and records every range whose
//! styling has to wait for finalization.

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Tag, TagEnd};
use quill_api::{InsertTableRequest, InsertTextRequest, Location, NamedStyleType, Request};
use smol_str::SmolStr;

use crate::error::ConvertError;
use crate::finalize;
use crate::state::{
    CodeBlockContext, CodeBlockRange, FormattedRange, InlineFormat, ItemKind, ListContext,
    ListLevel, ParagraphRange, PendingListItem, PendingRanges, RuleRange, SpacingSpan, TextFormat,
};

/// Offset from the table-insertion point to the text-entry point of the
/// first cell. Derived empirically against the service's element layout;
/// any port to another host format has to re-derive its own value.
pub(crate) const CELL_TEXT_OFFSET: i64 = 4;

/// Total footprint of an empty 1x1 table, including the newline the service
/// auto-inserts in front of it. Empirical, same caveat as above.
pub(crate) const EMPTY_TABLE_FOOTPRINT: i64 = 6;

const NEWLINE: &str = "\n";
const INDENT: &str = "\t";

/// Caller-facing knobs for one compilation.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// First free offset in the target document. Bodies start at 1.
    pub start_index: i64,
    /// Secondary-surface (tab) identifier, propagated verbatim onto every
    /// emitted location and range.
    pub tab_id: Option<SmolStr>,
    /// Style the first level-1 heading as the document title instead of
    /// a heading. Applies at most once.
    pub promote_first_heading: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            start_index: 1,
            tab_id: None,
            promote_first_heading: false,
        }
    }
}

/// Compile a markdown token stream into the ordered request batch:
/// insertions first (emission order), then style/structure requests.
pub fn compile_events<'a, I>(
    events: I,
    options: &ConvertOptions,
) -> Result<Vec<Request>, ConvertError>
where
    I: Iterator<Item = Event<'a>>,
{
    Compiler::new(events, options).run()
}

pub(crate) struct Compiler<'a, I: Iterator<Item = Event<'a>>> {
    events: I,

    // === Cursor ===
    index: i64,
    end_newline: bool,

    // === Options ===
    tab_id: Option<SmolStr>,
    promote_first_heading: bool,
    title_taken: bool,

    // === Output ===
    insert_requests: Vec<Request>,

    // === Open-construct state ===
    formatting: Vec<InlineFormat>,
    lists: ListContext,
    code_block: CodeBlockContext,
    current_heading: Option<(u8, i64)>,
    para_start: Option<i64>,

    // === Deferred styling ===
    pending: PendingRanges,

    _phantom: std::marker::PhantomData<&'a ()>,
}

impl<'a, I: Iterator<Item = Event<'a>>> Compiler<'a, I> {
    pub(crate) fn new(events: I, options: &ConvertOptions) -> Self {
        Self {
            events,
            index: options.start_index,
            end_newline: true,
            tab_id: options.tab_id.clone(),
            promote_first_heading: options.promote_first_heading,
            title_taken: false,
            insert_requests: Vec::new(),
            formatting: Vec::new(),
            lists: ListContext::default(),
            code_block: CodeBlockContext::default(),
            current_heading: None,
            para_start: None,
            pending: PendingRanges::default(),
            _phantom: std::marker::PhantomData,
        }
    }

    pub(crate) fn run(mut self) -> Result<Vec<Request>, ConvertError> {
        while let Some(event) = self.events.next() {
            self.process_event(event)?;
        }

        let style_requests = finalize::finalize(&self.pending, &self.tab_id);
        tracing::debug!(
            final_index = self.index,
            inserts = self.insert_requests.len(),
            styles = style_requests.len(),
            "compiled markdown batch"
        );

        let mut requests = self.insert_requests;
        requests.extend(style_requests);
        Ok(requests)
    }

    fn process_event(&mut self, event: Event<'a>) -> Result<(), ConvertError> {
        match event {
            Event::Start(tag) => self.start_tag(tag)?,
            Event::End(tag) => self.end_tag(tag),
            Event::Text(text) => {
                if self.code_block.is_active() {
                    self.code_block.push_text(&text);
                } else {
                    self.handle_text(&text);
                }
            }
            Event::Code(code) => {
                self.formatting.push(InlineFormat::Code);
                self.handle_text(&code);
                self.formatting.pop();
            }
            Event::TaskListMarker(_) => {
                // The tokenizer's tasklist extension surfaces the marker as
                // its own token; nothing is inserted for it.
                if let Some(&idx) = self.lists.open_items.last() {
                    let item = &mut self.pending.items[idx];
                    item.kind = ItemKind::Checkbox;
                    item.saw_text = true;
                }
            }
            Event::SoftBreak => self.insert_text(" "),
            Event::HardBreak => self.insert_text(NEWLINE),
            Event::Rule => {
                if !self.end_newline {
                    self.insert_text(NEWLINE);
                }
                let start = self.index;
                self.insert_text(NEWLINE);
                self.pending.rules.push(RuleRange {
                    start,
                    end: self.index,
                });
            }
            // Raw HTML has no representation in the target format.
            Event::Html(_) | Event::InlineHtml(_) => {}
            _ => {}
        }
        Ok(())
    }

    fn start_tag(&mut self, tag: Tag<'a>) -> Result<(), ConvertError> {
        match tag {
            Tag::Paragraph => {
                // Paragraphs inside list items are not independent blocks.
                if !self.lists.in_list() {
                    self.para_start = Some(self.index);
                }
            }
            Tag::Heading { level, .. } => {
                self.current_heading = Some((heading_level_to_u8(level), self.index));
            }
            Tag::CodeBlock(kind) => {
                let language = match kind {
                    CodeBlockKind::Fenced(info) => {
                        let lang = info.split(' ').next().unwrap_or("");
                        if lang.is_empty() {
                            None
                        } else {
                            Some(SmolStr::new(lang))
                        }
                    }
                    CodeBlockKind::Indented => None,
                };
                self.code_block.begin(language);
            }
            Tag::List(first_number) => {
                self.lists.stack.push(ListLevel {
                    ordered: first_number.is_some(),
                    nesting: self.lists.stack.len(),
                });
            }
            Tag::Item => {
                let Some(level) = self.lists.stack.last().copied() else {
                    tracing::debug!("item token arrived with no open list");
                    return Err(ConvertError::StrayListItem);
                };
                if level.nesting > 0 {
                    self.insert_text(&INDENT.repeat(level.nesting));
                }
                let kind = if level.ordered {
                    ItemKind::Numbered
                } else {
                    ItemKind::Bullet
                };
                self.pending.items.push(PendingListItem {
                    start: self.index,
                    end: None,
                    nesting: level.nesting,
                    kind,
                    saw_text: false,
                });
                self.lists.open_items.push(self.pending.items.len() - 1);
            }
            Tag::Strong => self.formatting.push(InlineFormat::Bold),
            Tag::Emphasis => self.formatting.push(InlineFormat::Italic),
            Tag::Strikethrough => self.formatting.push(InlineFormat::Strikethrough),
            Tag::Link { dest_url, .. } => {
                self.formatting.push(InlineFormat::Link(dest_url.into_string()));
            }
            // Tables, blockquotes, images and anything else outside the
            // supported set are skipped structurally: consume to the
            // matching end tag, insert nothing, change no state.
            other => {
                tracing::trace!(tag = ?other, "skipping unsupported block");
                self.consume_until_end();
            }
        }
        Ok(())
    }

    fn end_tag(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => self.close_paragraph(),
            TagEnd::Heading(_) => {
                if let Some((level, start)) = self.current_heading.take() {
                    let style = if self.promote_first_heading && level == 1 && !self.title_taken {
                        self.title_taken = true;
                        NamedStyleType::Title
                    } else {
                        NamedStyleType::heading(level)
                    };
                    self.pending.paragraphs.push(ParagraphRange {
                        start,
                        end: self.index,
                        style,
                    });
                    self.insert_text(NEWLINE);
                }
            }
            TagEnd::CodeBlock => self.close_code_block(),
            TagEnd::List(_) => {
                self.lists.stack.pop();
                if self.lists.stack.is_empty() {
                    // Trailing visual gap after the whole list: the last
                    // item that actually covers content gets the spacing.
                    if let Some((start, end)) =
                        self.pending.items.iter().rev().find_map(|item| item.span())
                    {
                        self.pending.spacing.push(SpacingSpan { start, end });
                    }
                }
            }
            TagEnd::Item => {
                if let Some(idx) = self.lists.open_items.pop() {
                    let item = &mut self.pending.items[idx];
                    if item.end.is_none() {
                        item.end = Some(self.index);
                    }
                    tracing::trace!(start = item.start, nesting = item.nesting, "closed list item");
                }
                if !self.end_newline {
                    self.insert_text(NEWLINE);
                }
            }
            TagEnd::Strong => self.remove_format(&InlineFormat::Bold),
            TagEnd::Emphasis => self.remove_format(&InlineFormat::Italic),
            TagEnd::Strikethrough => self.remove_format(&InlineFormat::Strikethrough),
            TagEnd::Link => self.remove_format(&InlineFormat::Link(String::new())),
            _ => {}
        }
    }

    /// Close the most recent stack entry of `kind`'s variant, wherever it
    /// sits. Overlapping spans may close out of push order, and closing a
    /// link must not disturb a bold entry pushed after it.
    fn remove_format(&mut self, kind: &InlineFormat) {
        if let Some(pos) = self.formatting.iter().rposition(|f| f.same_kind(kind)) {
            self.formatting.remove(pos);
        }
    }

    fn close_paragraph(&mut self) {
        if !self.end_newline {
            self.insert_text(NEWLINE);
        }
        if let Some(&idx) = self.lists.open_items.last() {
            // The paragraph belongs to an open list item: its content ends
            // just before the break we guaranteed above.
            self.pending.items[idx].end = Some(self.index - 1);
        } else if let Some(start) = self.para_start.take() {
            let end = self.index;
            if end > start {
                self.pending.spacing.push(SpacingSpan { start, end });
            }
        }
    }

    /// Encode the buffered code block as a minimal 1x1 table, the closest
    /// structure the target format offers for a monospace region.
    fn close_code_block(&mut self) {
        let (language, content) = self.code_block.take();
        let code = content.strip_suffix('\n').unwrap_or(&content);

        if !self.end_newline {
            self.insert_text(NEWLINE);
        }
        let table_at = self.index;
        self.insert_requests
            .push(Request::InsertTable(InsertTableRequest {
                rows: 1,
                columns: 1,
                location: self.location(table_at),
            }));

        let code_len = utf16_len(code);
        if code_len > 0 {
            // The cell's text entry point is a fixed distance from the
            // insertion point; this request does not move the cursor.
            self.insert_requests
                .push(Request::InsertText(InsertTextRequest {
                    text: code.to_owned(),
                    location: self.location(table_at + CELL_TEXT_OFFSET),
                }));
        }

        self.index = table_at + EMPTY_TABLE_FOOTPRINT + code_len;
        self.end_newline = false;
        self.insert_text(NEWLINE);

        self.pending.code_blocks.push(CodeBlockRange {
            table_start: table_at + 1,
            text_start: table_at + CELL_TEXT_OFFSET,
            text_end: table_at + CELL_TEXT_OFFSET + code_len,
            language,
        });
    }

    fn handle_text(&mut self, text: &str) {
        let text = self.strip_marker_if_first(text);
        if text.is_empty() {
            return;
        }
        let start = self.index;
        self.insert_text(text);
        let format = TextFormat::from_stack(&self.formatting);
        if !format.is_plain() {
            self.pending.formatted.push(FormattedRange {
                start,
                end: self.index,
                format,
            });
        }
    }

    /// The first text of an open list item may carry a task marker; strip
    /// it and upgrade the item in place. Fallback for event streams whose
    /// tokenizer does not surface markers as their own tokens.
    fn strip_marker_if_first<'t>(&mut self, text: &'t str) -> &'t str {
        if let Some(&idx) = self.lists.open_items.last() {
            let item = &mut self.pending.items[idx];
            if !item.saw_text {
                item.saw_text = true;
                if let Some(rest) = strip_task_marker(text) {
                    item.kind = ItemKind::Checkbox;
                    return rest;
                }
            }
        }
        text
    }

    /// Insert literal text at the cursor and advance it by the text's
    /// UTF-16 length. Every content insertion goes through here; nothing
    /// else moves the cursor except the table encoding.
    fn insert_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.insert_requests
            .push(Request::InsertText(InsertTextRequest {
                text: text.to_owned(),
                location: self.location(self.index),
            }));
        self.end_newline = text.ends_with('\n');
        self.index += utf16_len(text);
    }

    fn location(&self, index: i64) -> Location {
        Location {
            index,
            tab_id: self.tab_id.clone(),
        }
    }

    /// Consume events until the matching end tag without writing.
    fn consume_until_end(&mut self) {
        let mut nest = 0;
        while let Some(event) = self.events.next() {
            match event {
                Event::Start(_) => nest += 1,
                Event::End(_) => {
                    if nest == 0 {
                        break;
                    }
                    nest -= 1;
                }
                _ => {}
            }
        }
    }
}

fn heading_level_to_u8(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn strip_task_marker(text: &str) -> Option<&str> {
    for marker in ["[ ] ", "[x] ", "[X] "] {
        if let Some(rest) = text.strip_prefix(marker) {
            return Some(rest);
        }
    }
    for marker in ["[ ]", "[x]", "[X]"] {
        if text == marker {
            return Some("");
        }
    }
    None
}

/// UTF-16 length of a text slice, the unit the service counts offsets in
/// (fast path for ASCII).
pub(crate) fn utf16_len(text: &str) -> i64 {
    let byte_len = text.len();
    let char_len = text.chars().count();

    if byte_len == char_len {
        char_len as i64
    } else {
        text.encode_utf16().count() as i64
    }
}
