//! Splits a model reply into plain text and fenced code blocks
//!
//! A fence is three backticks, an optional word tag glued to them, a newline,
//! then everything up to the next three backticks. Fences are recognised
//! anywhere in the text, not only at the start of a line. An opening fence
//! without a closing one is left as ordinary text.

use serde::{Deserialize, Serialize};

const FENCE: &str = "```";

/// A displayable piece of an assistant message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentSegment {
    Text(String),
    Code {
        language: Option<String>,
        body: String,
    },
}

impl ContentSegment {
    pub fn code(language: Option<&str>, body: impl Into<String>) -> Self {
        ContentSegment::Code {
            language: language.map(str::to_string),
            body: body.into(),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        ContentSegment::Text(text.into())
    }

    pub fn is_code(&self) -> bool {
        matches!(self, ContentSegment::Code { .. })
    }

    /// The text a copy action should put on the clipboard
    pub fn copy_text(&self) -> &str {
        match self {
            ContentSegment::Text(text) => text,
            ContentSegment::Code { body, .. } => body,
        }
    }
}

enum ScanState<'a> {
    OutsideFence,
    InsideFence {
        open: usize,
        language: &'a str,
        body_start: usize,
    },
}

pub fn parse_segments(text: &str) -> Vec<ContentSegment> {
    let mut segments = Vec::new();
    let mut state = ScanState::OutsideFence;
    let mut pos = 0;
    let mut last_end = 0;

    loop {
        match state {
            ScanState::OutsideFence => {
                let Some(rel) = text[pos..].find(FENCE) else {
                    break;
                };
                let open = pos + rel;
                match fence_header(text, open + FENCE.len()) {
                    Some((language, body_start)) => {
                        state = ScanState::InsideFence {
                            open,
                            language,
                            body_start,
                        };
                    }
                    // A fourth backtick or a bad tag; the fence may still start one byte later
                    None => pos = open + 1,
                }
            }
            ScanState::InsideFence {
                open,
                language,
                body_start,
            } => {
                // No closing fence: nothing further in the text can close either
                let Some(rel) = text[body_start..].find(FENCE) else {
                    break;
                };
                let close = body_start + rel;

                push_text(&mut segments, &text[last_end..open]);
                segments.push(ContentSegment::Code {
                    language: (!language.is_empty()).then(|| language.to_string()),
                    body: text[body_start..close].trim().to_string(),
                });

                last_end = close + FENCE.len();
                pos = last_end;
                state = ScanState::OutsideFence;
            }
        }
    }

    push_text(&mut segments, &text[last_end..]);
    segments
}

/// All code blocks in `text`, in order of appearance
pub fn code_blocks(text: &str) -> Vec<ContentSegment> {
    parse_segments(text)
        .into_iter()
        .filter(ContentSegment::is_code)
        .collect()
}

/// Parse the optional language tag and mandatory newline after an opening fence.
///
/// Returns the tag and the byte offset where the body starts.
fn fence_header(text: &str, start: usize) -> Option<(&str, usize)> {
    let rest = &text[start..];
    let tag_len = rest
        .bytes()
        .take_while(|b| b.is_ascii_alphanumeric() || *b == b'_')
        .count();
    if rest.as_bytes().get(tag_len) != Some(&b'\n') {
        return None;
    }
    Some((&rest[..tag_len], start + tag_len + 1))
}

fn push_text(segments: &mut Vec<ContentSegment>, text: &str) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        segments.push(ContentSegment::Text(trimmed.to_string()));
    }
}
