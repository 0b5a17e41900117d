//! Split message text into prose and fenced code segments
//!
//! The presentation layer hands `Code` segments to its syntax highlighter
//! and renders `Prose` as-is. Indented code blocks stay prose; only fenced
//! blocks carry a language hint worth highlighting.

use pulldown_cmark::{CodeBlockKind, Event, Parser, Tag, TagEnd};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Segment {
    Prose {
        text: String,
    },
    Code {
        #[serde(skip_serializing_if = "Option::is_none")]
        language: Option<String>,
        code: String,
    },
}

/// Fenced block being collected
struct OpenFence {
    language: Option<String>,
    code: String,
}

pub fn segments(text: &str) -> Vec<Segment> {
    let mut out = Vec::new();
    let mut cursor = 0;
    let mut open: Option<OpenFence> = None;

    for (event, range) in Parser::new(text).into_offset_iter() {
        match event {
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info))) => {
                push_prose(&mut out, text.get(cursor..range.start).unwrap_or_default());
                let language = info
                    .split_whitespace()
                    .next()
                    .map(ToString::to_string);
                open = Some(OpenFence {
                    language,
                    code: String::new(),
                });
            }
            Event::Text(chunk) => {
                if let Some(fence) = open.as_mut() {
                    fence.code.push_str(&chunk);
                }
            }
            Event::End(TagEnd::CodeBlock) => {
                if let Some(fence) = open.take() {
                    out.push(Segment::Code {
                        language: fence.language,
                        code: fence.code,
                    });
                    cursor = range.end;
                }
            }
            _ => {}
        }
    }

    // An unterminated fence runs to the end of the message
    if let Some(fence) = open.take() {
        out.push(Segment::Code {
            language: fence.language,
            code: fence.code,
        });
        cursor = text.len();
    }
    push_prose(&mut out, text.get(cursor..).unwrap_or_default());
    out
}

fn push_prose(out: &mut Vec<Segment>, text: &str) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        out.push(Segment::Prose {
            text: trimmed.to_string(),
        });
    }
}
