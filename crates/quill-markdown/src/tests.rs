//! Tests for the markdown compiler.
//!
//! Most cases go through the real tokenizer via `compile`; the raw-event
//! tests at the bottom feed `compile_events` directly to cover stream
//! shapes the tokenizer won't produce.

use pulldown_cmark::{CowStr, Event, LinkType, Tag, TagEnd};
use quill_api::{BulletPreset, NamedStyleType, Request};
use serde_json::json;
use smol_str::SmolStr;

use crate::{ConvertOptions, compile_events, markdown_to_requests};

fn compile(input: &str) -> Vec<Request> {
    markdown_to_requests(input, &ConvertOptions::default()).unwrap()
}

fn compile_with(input: &str, options: &ConvertOptions) -> Vec<Request> {
    markdown_to_requests(input, options).unwrap()
}

/// All inserted text, concatenated in emission order.
fn inserted_text(requests: &[Request]) -> String {
    requests
        .iter()
        .filter_map(|request| request.inserted_text())
        .collect()
}

fn bullet_requests(requests: &[Request]) -> Vec<&quill_api::CreateParagraphBulletsRequest> {
    requests
        .iter()
        .filter_map(|request| match request {
            Request::CreateParagraphBullets(req) => Some(req),
            _ => None,
        })
        .collect()
}

fn is_insertion(request: &Request) -> bool {
    matches!(request, Request::InsertText(_) | Request::InsertTable(_))
}

// =============================================================================
// Basics
// =============================================================================

#[test]
fn test_smoke() {
    let requests = compile("Hello world");
    assert_eq!(inserted_text(&requests), "Hello world\n");
}

#[test]
fn test_empty_input() {
    assert_eq!(compile(""), vec![]);
}

#[test]
fn test_whitespace_only_input() {
    assert_eq!(compile("   \n\n  \t\n"), vec![]);
}

#[test]
fn test_plain_paragraph_batch() {
    let requests = compile("Hello world");
    assert_eq!(
        serde_json::to_value(&requests).unwrap(),
        json!([
            {"insertText": {"text": "Hello world", "location": {"index": 1}}},
            {"insertText": {"text": "\n", "location": {"index": 12}}},
            {"updateParagraphStyle": {
                "range": {"startIndex": 1, "endIndex": 13},
                "paragraphStyle": {"spaceBelow": {"magnitude": 12.0, "unit": "PT"}},
                "fields": "spaceBelow"
            }}
        ])
    );
}

#[test]
fn test_custom_start_index() {
    let options = ConvertOptions {
        start_index: 100,
        ..Default::default()
    };
    let requests = compile_with("Hi", &options);
    assert_eq!(
        serde_json::to_value(&requests[0]).unwrap(),
        json!({"insertText": {"text": "Hi", "location": {"index": 100}}})
    );
    assert_eq!(
        serde_json::to_value(&requests[1]).unwrap(),
        json!({"insertText": {"text": "\n", "location": {"index": 102}}})
    );
}

// =============================================================================
// Inline formatting
// =============================================================================

#[test]
fn test_bold() {
    let requests = compile("**x**");
    assert_eq!(
        serde_json::to_value(&requests).unwrap(),
        json!([
            {"insertText": {"text": "x", "location": {"index": 1}}},
            {"insertText": {"text": "\n", "location": {"index": 2}}},
            {"updateTextStyle": {
                "range": {"startIndex": 1, "endIndex": 2},
                "textStyle": {"bold": true},
                "fields": "bold"
            }},
            {"updateParagraphStyle": {
                "range": {"startIndex": 1, "endIndex": 3},
                "paragraphStyle": {"spaceBelow": {"magnitude": 12.0, "unit": "PT"}},
                "fields": "spaceBelow"
            }}
        ])
    );
}

#[test]
fn test_nested_formatting_flattens() {
    let requests = compile("**bold _both_**");
    let styles: Vec<_> = requests
        .iter()
        .filter_map(|request| match request {
            Request::UpdateTextStyle(req) => Some(req),
            _ => None,
        })
        .collect();
    assert_eq!(styles.len(), 2);
    assert_eq!(styles[0].fields, "bold");
    assert_eq!(styles[1].fields, "bold,italic");
    assert_eq!(styles[1].text_style.bold, Some(true));
    assert_eq!(styles[1].text_style.italic, Some(true));
}

#[test]
fn test_strikethrough() {
    let requests = compile("~~gone~~");
    let style = requests.iter().find_map(|request| match request {
        Request::UpdateTextStyle(req) => Some(req),
        _ => None,
    });
    let style = style.expect("strikethrough span should be styled");
    assert_eq!(style.fields, "strikethrough");
    assert_eq!(style.text_style.strikethrough, Some(true));
}

#[test]
fn test_inline_code_style() {
    let requests = compile("run `cargo` now");
    let style = requests
        .iter()
        .find_map(|request| match request {
            Request::UpdateTextStyle(req) => Some(req),
            _ => None,
        })
        .expect("inline code span should be styled");
    assert_eq!(style.fields, "weightedFontFamily,backgroundColor");
    assert_eq!(
        style.text_style.weighted_font_family.as_ref().unwrap().font_family,
        "Courier New"
    );
    // "run " is 4 long, so the code span sits at [5, 10).
    assert_eq!(style.range.start_index, 5);
    assert_eq!(style.range.end_index, 10);
    assert_eq!(inserted_text(&requests), "run cargo now\n");
}

#[test]
fn test_link_style() {
    let requests = compile("[docs](https://example.com)");
    let styles: Vec<_> = requests
        .iter()
        .filter_map(|request| match request {
            Request::UpdateTextStyle(req) => Some(req),
            _ => None,
        })
        .collect();
    // A plain link earns exactly one style request: the link itself.
    assert_eq!(styles.len(), 1);
    assert_eq!(styles[0].fields, "link,underline,foregroundColor");
    assert_eq!(
        styles[0].text_style.link.as_ref().unwrap().url,
        "https://example.com"
    );
    assert_eq!(styles[0].text_style.underline, Some(true));
    assert_eq!(styles[0].range.start_index, 1);
    assert_eq!(styles[0].range.end_index, 5);
}

#[test]
fn test_bold_link_gets_both_requests() {
    let requests = compile("**[docs](https://example.com)**");
    let styles: Vec<_> = requests
        .iter()
        .filter_map(|request| match request {
            Request::UpdateTextStyle(req) => Some(req),
            _ => None,
        })
        .collect();
    assert_eq!(styles.len(), 2);
    assert_eq!(styles[0].fields, "bold");
    assert_eq!(styles[1].fields, "link,underline,foregroundColor");
    assert_eq!(styles[0].range, styles[1].range);
}

// =============================================================================
// Headings
// =============================================================================

#[test]
fn test_heading_named_style() {
    let requests = compile("# H");
    assert_eq!(
        serde_json::to_value(&requests).unwrap(),
        json!([
            {"insertText": {"text": "H", "location": {"index": 1}}},
            {"insertText": {"text": "\n", "location": {"index": 2}}},
            {"updateParagraphStyle": {
                "range": {"startIndex": 1, "endIndex": 2},
                "paragraphStyle": {"namedStyleType": "HEADING_1"},
                "fields": "namedStyleType"
            }}
        ])
    );
}

#[test]
fn test_heading_levels() {
    let requests = compile("### Deep");
    let style = requests
        .iter()
        .find_map(|request| match request {
            Request::UpdateParagraphStyle(req) => Some(req),
            _ => None,
        })
        .unwrap();
    assert_eq!(
        style.paragraph_style.named_style_type,
        Some(NamedStyleType::Heading3)
    );
}

#[test]
fn test_title_promotion_applies_once() {
    let options = ConvertOptions {
        promote_first_heading: true,
        ..Default::default()
    };
    let requests = compile_with("# First\n\n# Second", &options);
    let named: Vec<_> = requests
        .iter()
        .filter_map(|request| match request {
            Request::UpdateParagraphStyle(req) => req.paragraph_style.named_style_type,
            _ => None,
        })
        .collect();
    assert_eq!(named, vec![NamedStyleType::Title, NamedStyleType::Heading1]);
}

#[test]
fn test_title_promotion_skips_deeper_headings() {
    let options = ConvertOptions {
        promote_first_heading: true,
        ..Default::default()
    };
    let requests = compile_with("## Not a title", &options);
    let named: Vec<_> = requests
        .iter()
        .filter_map(|request| match request {
            Request::UpdateParagraphStyle(req) => req.paragraph_style.named_style_type,
            _ => None,
        })
        .collect();
    assert_eq!(named, vec![NamedStyleType::Heading2]);
}

// =============================================================================
// Lists
// =============================================================================

#[test]
fn test_bullet_list_merges_into_single_request() {
    let requests = compile("- a\n- b\n- c");
    assert_eq!(inserted_text(&requests), "a\nb\nc\n");

    let bullets = bullet_requests(&requests);
    assert_eq!(bullets.len(), 1);
    assert_eq!(bullets[0].bullet_preset, BulletPreset::BulletDiscCircleSquare);
    // One range spanning all three items.
    assert_eq!(bullets[0].range.start_index, 1);
    assert_eq!(bullets[0].range.end_index, 6);
}

#[test]
fn test_ordered_list_preset() {
    let requests = compile("1. one\n2. two");
    let bullets = bullet_requests(&requests);
    assert_eq!(bullets.len(), 1);
    assert_eq!(
        bullets[0].bullet_preset,
        BulletPreset::NumberedDecimalAlphaRoman
    );
}

#[test]
fn test_task_list_checkbox_requests() {
    let requests = compile("- [x] done\n- [ ] todo");
    let text = inserted_text(&requests);
    assert!(!text.contains("[x]"));
    assert!(!text.contains("[ ]"));
    assert_eq!(text, "done\ntodo\n");

    let bullets = bullet_requests(&requests);
    assert_eq!(bullets.len(), 2);
    for bullet in &bullets {
        assert_eq!(bullet.bullet_preset, BulletPreset::BulletCheckbox);
    }
}

#[test]
fn test_nested_list_indentation() {
    let requests = compile("- Parent\n  - Child");
    let texts: Vec<&str> = requests
        .iter()
        .filter_map(|request| request.inserted_text())
        .collect();
    // One indent unit precedes the child item's text.
    let tab_pos = texts.iter().position(|t| *t == "\t").expect("indent insertion");
    assert_eq!(texts[tab_pos + 1], "Child");
}

#[test]
fn test_list_then_heading_keeps_heading_out_of_bullets() {
    let requests = compile("- a\n- b\n\n# Done");
    let heading_start = requests
        .iter()
        .find_map(|request| match request {
            Request::InsertText(req) if req.text == "Done" => Some(req.location.index),
            _ => None,
        })
        .unwrap();
    for bullet in bullet_requests(&requests) {
        assert!(bullet.range.end_index <= heading_start);
    }
}

#[test]
fn test_loose_list_matches_tight_list_ranges() {
    let tight = bullet_requests(&compile("- a\n- b"))
        .iter()
        .map(|b| (b.range.start_index, b.range.end_index))
        .collect::<Vec<_>>();
    let loose = bullet_requests(&compile("- a\n\n- b"))
        .iter()
        .map(|b| (b.range.start_index, b.range.end_index))
        .collect::<Vec<_>>();
    assert_eq!(tight, loose);
}

#[test]
fn test_separate_lists_do_not_merge() {
    let requests = compile("- a\n\n1. b");
    let bullets = bullet_requests(&requests);
    assert_eq!(bullets.len(), 2);
    // Descending start order.
    assert!(bullets[0].range.start_index > bullets[1].range.start_index);
}

// =============================================================================
// Breaks and rules
// =============================================================================

#[test]
fn test_soft_break_inserts_space() {
    let requests = compile("a\nb");
    assert_eq!(inserted_text(&requests), "a b\n");
}

#[test]
fn test_hard_break_inserts_newline() {
    let requests = compile("a  \nb");
    assert_eq!(inserted_text(&requests), "a\nb\n");
}

#[test]
fn test_rule_border_request() {
    let requests = compile("above\n\n---\n\nbelow");
    let border = requests
        .iter()
        .find_map(|request| match request {
            Request::UpdateParagraphStyle(req) if req.fields == "borderBottom" => Some(req),
            _ => None,
        })
        .expect("rule should produce a border request");
    // The rule is the empty paragraph between the two text paragraphs:
    // "above\n" occupies [1, 7), the rule newline sits at 7.
    assert_eq!(border.range.start_index, 7);
    assert_eq!(border.range.end_index, 8);
    assert!(border.paragraph_style.border_bottom.is_some());
}

// =============================================================================
// Code blocks
// =============================================================================

#[test]
fn test_code_block_structural_encoding() {
    let requests = compile("```rust\nfn main() {}\n```");
    let inserts: Vec<_> = requests.iter().filter(|r| is_insertion(r)).collect();
    assert_eq!(
        serde_json::to_value(&inserts).unwrap(),
        json!([
            {"insertTable": {"rows": 1, "columns": 1, "location": {"index": 1}}},
            {"insertText": {"text": "fn main() {}", "location": {"index": 5}}},
            {"insertText": {"text": "\n", "location": {"index": 19}}}
        ])
    );

    let mono = requests
        .iter()
        .find_map(|request| match request {
            Request::UpdateTextStyle(req) => Some(req),
            _ => None,
        })
        .expect("code text should get a monospace style");
    assert_eq!(mono.fields, "weightedFontFamily,fontSize");
    assert_eq!(mono.range.start_index, 5);
    assert_eq!(mono.range.end_index, 17);

    let cell = requests
        .iter()
        .find_map(|request| match request {
            Request::UpdateTableCellStyle(req) => Some(req),
            _ => None,
        })
        .expect("the cell should be decorated");
    // The table element itself starts one past the insertion point.
    assert_eq!(
        cell.table_range.table_cell_location.table_start_location.index,
        2
    );
    assert_eq!(cell.table_range.row_span, 1);
    assert_eq!(cell.table_range.column_span, 1);
}

#[test]
fn test_code_block_after_paragraph_gets_leading_break() {
    let requests = compile("intro\n\n```\ncode\n```");
    // "intro" + paragraph break occupy [1, 7); the table goes at 7.
    let table = requests
        .iter()
        .find_map(|request| match request {
            Request::InsertTable(req) => Some(req),
            _ => None,
        })
        .unwrap();
    assert_eq!(table.location.index, 7);
    // Code text lands a fixed distance inside the cell.
    let code = requests
        .iter()
        .find_map(|request| match request {
            Request::InsertText(req) if req.text == "code" => Some(req.location.index),
            _ => None,
        })
        .unwrap();
    assert_eq!(code, 11);
}

#[test]
fn test_empty_code_block() {
    let requests = compile("```\n```");
    // No content insert, no monospace style, but the container is still
    // created and decorated.
    assert!(requests.iter().any(|r| matches!(r, Request::InsertTable(_))));
    assert!(
        !requests
            .iter()
            .any(|r| matches!(r, Request::UpdateTextStyle(_)))
    );
    assert!(
        requests
            .iter()
            .any(|r| matches!(r, Request::UpdateTableCellStyle(_)))
    );
}

// =============================================================================
// Skipped constructs
// =============================================================================

#[test]
fn test_blockquote_skipped() {
    assert_eq!(compile("> quoted text"), vec![]);
}

#[test]
fn test_table_skipped() {
    assert_eq!(compile("| a | b |\n|---|---|\n| c | d |"), vec![]);
}

#[test]
fn test_image_skipped() {
    assert_eq!(compile("![alt text](image.png)"), vec![]);
}

#[test]
fn test_html_skipped() {
    let requests = compile("before <span>raw</span> after");
    let text = inserted_text(&requests);
    assert!(!text.contains("<span>"));
    assert!(text.contains("before "));
}

// =============================================================================
// Batch-wide properties
// =============================================================================

#[test]
fn test_insertions_precede_style_requests() {
    let requests = compile("# T\n\npara **b**\n\n- a\n- b\n\n```\ncode\n```");
    let first_style = requests.iter().position(|r| !is_insertion(r)).unwrap();
    assert!(requests[first_style..].iter().all(|r| !is_insertion(r)));
}

#[test]
fn test_insertions_are_contiguous() {
    // Without a code block, every insertion starts exactly where the
    // previous one ended: the cursor only moves by realized text.
    let requests = compile("# Title\n\nHello **world** and _more_.\n\n- a\n- b\n\nLast.");
    let mut expected = 1;
    for request in &requests {
        if let Request::InsertText(req) = request {
            assert_eq!(req.location.index, expected);
            expected += req.text.encode_utf16().count() as i64;
        }
    }
}

#[test]
fn test_unicode_cursor_advances_by_utf16_units() {
    let requests = compile("😀 café");
    // The emoji is two code units, so the paragraph break lands at
    // 1 + 2 + 1 + 4 = 8.
    assert_eq!(
        serde_json::to_value(&requests[1]).unwrap(),
        json!({"insertText": {"text": "\n", "location": {"index": 8}}})
    );
}

#[test]
fn test_rendered_text_reconstruction() {
    let requests = compile("# T\n\nHello **world**\n\n- a\n- b");
    assert_eq!(inserted_text(&requests), "T\nHello world\na\nb\n");
}

#[test]
fn test_tab_id_on_every_location_and_range() {
    let options = ConvertOptions {
        tab_id: Some(SmolStr::new("t.7")),
        ..Default::default()
    };
    let requests = compile_with(
        "# T\n\npara [l](https://e.example)\n\n- a\n\n```\ncode\n```\n\n---",
        &options,
    );
    assert!(!requests.is_empty());
    let value = serde_json::to_value(&requests).unwrap();
    assert_tab_everywhere(&value);
}

fn assert_tab_everywhere(value: &serde_json::Value) {
    match value {
        serde_json::Value::Object(map) => {
            if map.contains_key("index") || map.contains_key("startIndex") {
                assert_eq!(
                    map.get("tabId").and_then(|v| v.as_str()),
                    Some("t.7"),
                    "location or range without the tab id: {map:?}"
                );
            }
            for nested in map.values() {
                assert_tab_everywhere(nested);
            }
        }
        serde_json::Value::Array(values) => {
            for nested in values {
                assert_tab_everywhere(nested);
            }
        }
        _ => {}
    }
}

// =============================================================================
// Raw event streams
// =============================================================================

#[test]
fn test_stray_list_item_is_fatal() {
    let events = vec![Event::Start(Tag::Item), Event::Text(CowStr::from("x"))];
    let result = compile_events(events.into_iter(), &ConvertOptions::default());
    assert!(result.is_err());
}

#[test]
fn test_out_of_order_close_keeps_outer_format() {
    // Bold closes while the link is still open; the link entry must
    // survive untouched.
    let events = vec![
        Event::Start(Tag::Paragraph),
        Event::Start(Tag::Strong),
        Event::Start(Tag::Link {
            link_type: LinkType::Inline,
            dest_url: CowStr::from("https://example.com"),
            title: CowStr::from(""),
            id: CowStr::from(""),
        }),
        Event::Text(CowStr::from("x")),
        Event::End(TagEnd::Strong),
        Event::Text(CowStr::from("y")),
        Event::End(TagEnd::Link),
        Event::End(TagEnd::Paragraph),
    ];
    let requests = compile_events(events.into_iter(), &ConvertOptions::default()).unwrap();

    let styles: Vec<_> = requests
        .iter()
        .filter_map(|request| match request {
            Request::UpdateTextStyle(req) => Some(req),
            _ => None,
        })
        .collect();
    // "x": bold + link (two requests); "y": link only.
    assert_eq!(styles.len(), 3);
    assert_eq!(styles[0].fields, "bold");
    assert_eq!(styles[0].range.start_index, 1);
    assert_eq!(styles[1].fields, "link,underline,foregroundColor");
    assert_eq!(styles[2].fields, "link,underline,foregroundColor");
    assert_eq!(styles[2].range.start_index, 2);
}

#[test]
fn test_task_marker_prefix_fallback() {
    // A stream without the tasklist extension delivers the marker inside
    // the first text leaf.
    let events = vec![
        Event::Start(Tag::List(None)),
        Event::Start(Tag::Item),
        Event::Text(CowStr::from("[x] shipped")),
        Event::End(TagEnd::Item),
        Event::End(TagEnd::List(false)),
    ];
    let requests = compile_events(events.into_iter(), &ConvertOptions::default()).unwrap();
    assert_eq!(inserted_text(&requests), "shipped\n");
    let bullets = bullet_requests(&requests);
    assert_eq!(bullets.len(), 1);
    assert_eq!(bullets[0].bullet_preset, BulletPreset::BulletCheckbox);
}
