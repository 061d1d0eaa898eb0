//! The RVT block extractor.
//!
//! Apache Rivet templates interleave HTML with Tcl inside `<? ... ?>`
//! (Code) and `<?= ... ?>` (Expr) blocks. This module slices a `.rvt`
//! file into those blocks, tracking template-relative `(line, column)`
//! so any AST position produced by parsing a block's code can be
//! remapped back to template coordinates.

/// Either a plain statement block or an expression block (whose value is
/// implicitly `puts`ed into the page output).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Code,
    Expr,
}

/// One embedded Tcl block, with its position in the *template's* own
/// coordinates (1-based, matching [`crate::types::Position`]).
#[derive(Debug, Clone, PartialEq)]
pub struct RvtBlock {
    pub kind: BlockKind,
    pub code: String,
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
}

/// Extracts all embedded Tcl blocks from Rivet template source.
///
/// Linear scan tracking `(line, column)`. An unclosed `<?`/`<?=` is
/// silently discarded — the scanner advances past the opening
/// delimiter and keeps looking for the next one, rather than treating
/// the rest of the file as code. Rivet has no nested blocks, so the
/// scan never needs to track block depth.
#[must_use]
pub fn extract_blocks(source: &str) -> Vec<RvtBlock> {
    let mut blocks = Vec::new();
    let bytes = source.as_bytes();
    let mut i = 0usize;
    let mut line = 1u32;
    let mut col = 1u32;

    while i < bytes.len() {
        if bytes[i] == b'<' && bytes.get(i + 1) == Some(&b'?') {
            let is_expr = bytes.get(i + 2) == Some(&b'=');
            let delim_len = if is_expr { 3 } else { 2 };
            let (mut j, mut jline, mut jcol) = (i, line, col);
            for _ in 0..delim_len {
                advance(bytes, &mut j, &mut jline, &mut jcol);
            }

            let start_line = jline;
            let start_col = jcol;
            let code_start = j;

            let mut k = j;
            let (mut kline, mut kcol) = (jline, jcol);
            let mut closed = false;
            while k < bytes.len() {
                if bytes[k] == b'?' && bytes.get(k + 1) == Some(&b'>') {
                    closed = true;
                    break;
                }
                advance(bytes, &mut k, &mut kline, &mut kcol);
            }

            if closed {
                let code = String::from_utf8_lossy(&bytes[code_start..k]).into_owned();
                blocks.push(RvtBlock {
                    kind: if is_expr { BlockKind::Expr } else { BlockKind::Code },
                    code,
                    start_line,
                    start_col,
                    end_line: kline,
                });
                i = k + 2;
                line = kline;
                col = kcol + 2;
            } else {
                // Unclosed block: skip past just the opening delimiter
                // and keep scanning — do not consume the remainder of
                // the file as code.
                i += 1;
                col += 1;
            }
        } else {
            advance(bytes, &mut i, &mut line, &mut col);
        }
    }

    blocks
}

fn advance(bytes: &[u8], i: &mut usize, line: &mut u32, col: &mut u32) {
    if bytes[*i] == b'\n' {
        *line += 1;
        *col = 1;
    } else {
        *col += 1;
    }
    *i += 1;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_code_and_expr_blocks() {
        let src = "<html><? set x 1 ?><?= $x ?></html>";
        let blocks = extract_blocks(src);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].kind, BlockKind::Code);
        assert_eq!(blocks[0].code, " set x 1 ");
        assert_eq!(blocks[1].kind, BlockKind::Expr);
        assert_eq!(blocks[1].code, " $x ");
    }

    #[test]
    fn unclosed_block_is_discarded_but_later_blocks_still_index() {
        let src = "<? set x 1\n<?= $y ?>";
        let blocks = extract_blocks(src);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].kind, BlockKind::Expr);
        assert_eq!(blocks[0].code, " $y ");
    }

    #[test]
    fn tracks_multiline_positions() {
        let src = "line one\n<?\nset x 1\n?>\nline four";
        let blocks = extract_blocks(src);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].start_line, 2);
        assert_eq!(blocks[0].start_col, 3);
        assert_eq!(blocks[0].end_line, 4);
    }

    #[test]
    fn no_blocks_in_plain_html() {
        assert!(extract_blocks("<html><body>hi</body></html>").is_empty());
    }
}
