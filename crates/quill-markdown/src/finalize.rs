//! The range finalizer: converts every range accumulated during the pass
//! into style/structure requests. Runs once, after the stream is fully
//! consumed, because a range's true extent is only known once its closing
//! token (or a later sibling's) has been seen.

use quill_api::{
    CreateParagraphBulletsRequest, DashStyle, Dimension, Link, Location, OptionalColor,
    ParagraphBorder, ParagraphStyle, Range, Request, TableCellBorder, TableCellLocation,
    TableCellStyle, TableRange, TextStyle, UpdateParagraphStyleRequest, UpdateTableCellStyleRequest,
    UpdateTextStyleRequest, WeightedFontFamily,
};
use smol_str::SmolStr;

use crate::state::{ItemKind, PendingListItem, PendingRanges};

// Presentation constants, tuned against the service's defaults. The spacing
// compensates for the host's zero default inter-paragraph gap.
const SPACE_BELOW_PT: f64 = 12.0;
const CODE_FONT: &str = "Courier New";
const CODE_FONT_SIZE_PT: f64 = 10.0;
const INLINE_CODE_BACKGROUND_GRAY: f32 = 0.95;
const CELL_BACKGROUND_GRAY: f32 = 0.97;
const CELL_PADDING_PT: f64 = 6.0;
const CELL_BORDER_GRAY: f32 = 0.8;
const BORDER_WIDTH_PT: f64 = 1.0;
const RULE_BORDER_GRAY: f32 = 0.6;
const RULE_BORDER_PADDING_PT: f64 = 1.0;

const CELL_STYLE_FIELDS: &str = "backgroundColor,paddingLeft,paddingRight,paddingTop,\
                                 paddingBottom,borderLeft,borderRight,borderTop,borderBottom";

pub(crate) fn finalize(pending: &PendingRanges, tab_id: &Option<SmolStr>) -> Vec<Request> {
    let mut requests = Vec::new();
    let range = |start: i64, end: i64| Range {
        start_index: start,
        end_index: end,
        tab_id: tab_id.clone(),
    };

    // Character attributes, one request per formatted span, plus a separate
    // link request where one applies.
    for span in &pending.formatted {
        if span.end <= span.start {
            continue;
        }
        let mut style = TextStyle::default();
        let mut fields: Vec<&str> = Vec::new();
        if span.format.bold {
            style.bold = Some(true);
            fields.push("bold");
        }
        if span.format.italic {
            style.italic = Some(true);
            fields.push("italic");
        }
        if span.format.strikethrough {
            style.strikethrough = Some(true);
            fields.push("strikethrough");
        }
        if span.format.code {
            style.weighted_font_family = Some(WeightedFontFamily::new(CODE_FONT));
            style.background_color = Some(OptionalColor::gray(INLINE_CODE_BACKGROUND_GRAY));
            fields.push("weightedFontFamily");
            fields.push("backgroundColor");
        }
        if !fields.is_empty() {
            requests.push(Request::UpdateTextStyle(UpdateTextStyleRequest {
                range: range(span.start, span.end),
                text_style: style,
                fields: fields.join(","),
            }));
        }
        if let Some(url) = &span.format.link {
            requests.push(Request::UpdateTextStyle(UpdateTextStyleRequest {
                range: range(span.start, span.end),
                text_style: TextStyle {
                    link: Some(Link { url: url.clone() }),
                    underline: Some(true),
                    // The service's stock link blue.
                    foreground_color: Some(OptionalColor::rgb(0.06, 0.33, 0.8)),
                    ..Default::default()
                },
                fields: "link,underline,foregroundColor".into(),
            }));
        }
    }

    // Named styles for heading spans.
    for paragraph in &pending.paragraphs {
        if paragraph.end <= paragraph.start {
            continue;
        }
        requests.push(Request::UpdateParagraphStyle(UpdateParagraphStyleRequest {
            range: range(paragraph.start, paragraph.end),
            paragraph_style: ParagraphStyle {
                named_style_type: Some(paragraph.style),
                ..Default::default()
            },
            fields: "namedStyleType".into(),
        }));
    }

    // Below-paragraph spacing for body paragraphs and list tails.
    for span in &pending.spacing {
        requests.push(Request::UpdateParagraphStyle(UpdateParagraphStyleRequest {
            range: range(span.start, span.end),
            paragraph_style: ParagraphStyle {
                space_below: Some(Dimension::pt(SPACE_BELOW_PT)),
                ..Default::default()
            },
            fields: "spaceBelow".into(),
        }));
    }

    // Code block containers: monospace content plus cell decoration.
    for block in &pending.code_blocks {
        tracing::trace!(language = ?block.language, "styling code block container");
        if block.text_end > block.text_start {
            requests.push(Request::UpdateTextStyle(UpdateTextStyleRequest {
                range: range(block.text_start, block.text_end),
                text_style: TextStyle {
                    weighted_font_family: Some(WeightedFontFamily::new(CODE_FONT)),
                    font_size: Some(Dimension::pt(CODE_FONT_SIZE_PT)),
                    ..Default::default()
                },
                fields: "weightedFontFamily,fontSize".into(),
            }));
        }
        let border = TableCellBorder {
            color: OptionalColor::gray(CELL_BORDER_GRAY),
            width: Dimension::pt(BORDER_WIDTH_PT),
            dash_style: DashStyle::Solid,
        };
        requests.push(Request::UpdateTableCellStyle(UpdateTableCellStyleRequest {
            table_cell_style: TableCellStyle {
                background_color: Some(OptionalColor::gray(CELL_BACKGROUND_GRAY)),
                padding_left: Some(Dimension::pt(CELL_PADDING_PT)),
                padding_right: Some(Dimension::pt(CELL_PADDING_PT)),
                padding_top: Some(Dimension::pt(CELL_PADDING_PT)),
                padding_bottom: Some(Dimension::pt(CELL_PADDING_PT)),
                border_left: Some(border.clone()),
                border_right: Some(border.clone()),
                border_top: Some(border.clone()),
                border_bottom: Some(border),
            },
            table_range: TableRange {
                table_cell_location: TableCellLocation {
                    table_start_location: Location {
                        index: block.table_start,
                        tab_id: tab_id.clone(),
                    },
                    row_index: 0,
                    column_index: 0,
                },
                row_span: 1,
                column_span: 1,
            },
            fields: CELL_STYLE_FIELDS.into(),
        }));
    }

    // Horizontal rules: an empty paragraph with a bottom border.
    for rule in &pending.rules {
        requests.push(Request::UpdateParagraphStyle(UpdateParagraphStyleRequest {
            range: range(rule.start, rule.end),
            paragraph_style: ParagraphStyle {
                border_bottom: Some(ParagraphBorder {
                    color: OptionalColor::gray(RULE_BORDER_GRAY),
                    width: Dimension::pt(BORDER_WIDTH_PT),
                    padding: Dimension::pt(RULE_BORDER_PADDING_PT),
                    dash_style: DashStyle::Solid,
                }),
                ..Default::default()
            },
            fields: "borderBottom".into(),
        }));
    }

    // Bullets last, in descending start order.
    for (start, end, kind) in merge_list_items(&pending.items) {
        requests.push(Request::CreateParagraphBullets(
            CreateParagraphBulletsRequest {
                range: range(start, end),
                bullet_preset: kind.preset(),
            },
        ));
    }

    requests
}

/// Collapse adjacent same-kind items into one bullet range. Items are
/// adjacent when only the line break separates them; any other intervening
/// content breaks the chain, which keeps following blocks (a heading after
/// the list, say) out of the bullet range. Checkbox items never merge, so
/// each to-do paragraph gets its own preset application.
pub(crate) fn merge_list_items(items: &[PendingListItem]) -> Vec<(i64, i64, ItemKind)> {
    let mut spans: Vec<(i64, i64, ItemKind)> = items
        .iter()
        .filter_map(|item| item.span().map(|(start, end)| (start, end, item.kind)))
        .collect();
    spans.sort_by_key(|&(start, _, _)| start);

    let mut merged: Vec<(i64, i64, ItemKind)> = Vec::new();
    for (start, end, kind) in spans {
        match merged.last_mut() {
            Some((_, prev_end, prev_kind))
                if *prev_kind == kind && kind != ItemKind::Checkbox && start - *prev_end <= 1 =>
            {
                *prev_end = (*prev_end).max(end);
            }
            _ => merged.push((start, end, kind)),
        }
    }

    // Applying a preset consumes the leading indent tabs, which shifts
    // every later offset; emitting high-to-low keeps the not-yet-applied
    // ranges valid.
    merged.sort_by(|a, b| b.0.cmp(&a.0));
    merged
}
