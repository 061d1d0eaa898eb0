//! Wire-boundary conversions: the only place LSP's 0-based
//! positions, `file://` URIs, and the delta-encoded semantic-token
//! stream meet the core's 1-based `Position` and plain `PathBuf`s.

use crate::types::Position;
use lsp_types::Url;
use std::path::{Path, PathBuf};

#[must_use]
pub fn uri_to_path(uri: &Url) -> Option<PathBuf> {
    uri.to_file_path().ok()
}

#[must_use]
pub fn path_to_uri(path: &Path) -> Option<Url> {
    Url::from_file_path(path).ok()
}

#[must_use]
pub fn lsp_position_to_core(pos: lsp_types::Position) -> Position {
    Position::from_lsp(pos)
}

/// Extracts the identifier token touching 0-based `character` on `line`,
/// including a leading `$` so variable references resolve. `::` is kept
/// as part of the token so qualified names survive intact.
#[must_use]
pub fn word_at(line: &str, character: usize) -> Option<&str> {
    let bytes = line.as_bytes();
    if character > bytes.len() {
        return None;
    }
    let is_word_byte = |b: u8| b.is_ascii_alphanumeric() || b == b'_' || b == b':';

    let mut start = character;
    while start > 0 && (is_word_byte(bytes[start - 1]) || bytes[start - 1] == b'$') {
        start -= 1;
    }
    let mut end = character;
    while end < bytes.len() && is_word_byte(bytes[end]) {
        end += 1;
    }
    if start == end {
        return None;
    }
    Some(&line[start..end])
}

/// Decodes a delta-encoded semantic token stream back to absolute
/// `(line, character, length, token_type)` tuples.
#[must_use]
pub fn decode_semantic_tokens(data: &[u32]) -> Vec<(u32, u32, u32, u32)> {
    let mut out = Vec::with_capacity(data.len() / 5);
    let (mut line, mut character) = (0u32, 0u32);
    for chunk in data.chunks_exact(5) {
        let (delta_line, delta_char, length, token_type) = (chunk[0], chunk[1], chunk[2], chunk[3]);
        if delta_line == 0 {
            character += delta_char;
        } else {
            line += delta_line;
            character = delta_char;
        }
        out.push((line, character, length, token_type));
    }
    out
}

/// Re-encodes absolute token tuples back into the LSP delta stream.
#[must_use]
pub fn encode_semantic_tokens(tokens: &[(u32, u32, u32, u32)]) -> Vec<u32> {
    let mut out = Vec::with_capacity(tokens.len() * 5);
    let (mut prev_line, mut prev_char) = (0u32, 0u32);
    for &(line, character, length, token_type) in tokens {
        let delta_line = line - prev_line;
        let delta_char = if delta_line == 0 { character - prev_char } else { character };
        out.extend([delta_line, delta_char, length, token_type, 0]);
        prev_line = line;
        prev_char = character;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_at_includes_dollar_sigil() {
        let line = "set y [expr {$x + 1}]";
        let dollar_idx = line.find('$').unwrap();
        assert_eq!(word_at(line, dollar_idx + 1), Some("$x"));
    }

    #[test]
    fn word_at_keeps_qualified_name_intact() {
        let line = "utils::format arg";
        assert_eq!(word_at(line, 2), Some("utils::format"));
    }

    #[test]
    fn word_at_none_on_whitespace() {
        let line = "set x 1";
        assert_eq!(word_at(line, 3), None);
    }

    #[test]
    fn semantic_token_roundtrip_via_filter() {
        let tokens = vec![(0, 0, 4, 0), (0, 5, 3, 1), (2, 0, 1, 2)];
        let encoded = encode_semantic_tokens(&tokens);
        let decoded = decode_semantic_tokens(&encoded);
        assert_eq!(decoded, tokens);
    }
}
