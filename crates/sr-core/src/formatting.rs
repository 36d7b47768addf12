//! Formatting utilities for Telegram HTML parse mode.

/// Escape HTML special characters for Telegram HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Pack `header` followed by `blocks` into messages of at most `limit` bytes.
///
/// Blocks are never split across messages and the header always shares a
/// message with the first block. Callers keep each block within
/// `limit - header.len()`; a longer block is cut on a char boundary, which may
/// break its markup.
pub fn pack_blocks(header: &str, blocks: &[String], limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    let mut out = Vec::new();
    let mut current = header.to_string();
    let mut has_block = false;

    for block in blocks {
        if has_block && current.len() + block.len() > limit {
            out.push(std::mem::take(&mut current));
            has_block = false;
        }
        if current.len() + block.len() > limit {
            let room = limit.saturating_sub(current.len());
            current.push_str(truncate_at_char_boundary(block, room));
            out.push(std::mem::take(&mut current));
            continue;
        }
        current.push_str(block);
        has_block = true;
    }

    if !current.trim().is_empty() {
        out.push(current);
    }
    out
}

fn truncate_at_char_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
