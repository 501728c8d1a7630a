use unicode_width::UnicodeWidthStr;

/// Number of columns a tab expands to, both in the echoed source line and
/// when placing the caret.
pub const TAB_WIDTH: usize = 4;

/// Renders `message` above the source line containing `offset` and a caret
/// under the column where `offset` lands.
///
/// `offset` is a byte offset. It is clamped into `0..=source.len()` and moved
/// back to the nearest character boundary, so any value is accepted.
pub fn format_diagnostic(message: &str, source: &str, offset: usize) -> String {
    let offset = clamp_offset(source, offset);

    let line_start = source[..offset].rfind('\n').map_or(0, |i| i + 1);
    let line_end = source[offset..]
        .find('\n')
        .map_or(source.len(), |i| offset + i);
    let line = source[line_start..line_end].trim_end_matches('\r');

    let column = display_width(&source[line_start..offset]);

    format!(
        "{message}\n{}\n{}^",
        expand_tabs(line),
        " ".repeat(column)
    )
}

fn clamp_offset(source: &str, offset: usize) -> usize {
    let mut offset = offset.min(source.len());
    while !source.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

fn expand_tabs(text: &str) -> String {
    text.replace('\t', &" ".repeat(TAB_WIDTH))
}

/// Terminal columns taken by `text` once tabs are expanded.
fn display_width(text: &str) -> usize {
    expand_tabs(text).width()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caret_under_offset() {
        let rendered = format_diagnostic("boom", "2 + @ 3", 4);
        assert_eq!(rendered, "boom\n2 + @ 3\n    ^");
    }

    #[test]
    fn test_tabs_expand_in_line_and_caret() {
        let rendered = format_diagnostic("bad", "\t1 +\t@", 5);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[1], "    1 +    @");
        assert_eq!(lines[2].len() - 1, lines[1].find('@').unwrap());
    }

    #[test]
    fn test_offset_is_clamped() {
        let rendered = format_diagnostic("eof", "1 +", 100);
        assert_eq!(rendered, "eof\n1 +\n   ^");
    }

    #[test]
    fn test_multibyte_prefix() {
        // 'é' is two bytes but one column; '世' is three bytes and two columns.
        let source = "é + 世 @";
        let at = source.find('@').unwrap();
        let rendered = format_diagnostic("x", source, at);
        let caret_line = rendered.lines().nth(2).unwrap();
        assert_eq!(caret_line, "       ^");
    }

    #[test]
    fn test_offset_inside_multibyte_char_snaps_back() {
        let rendered = format_diagnostic("x", "aé", 2);
        assert_eq!(rendered.lines().nth(2).unwrap(), " ^");
    }

    #[test]
    fn test_picks_line_containing_offset() {
        let source = "1 + 2\n3 $ 4";
        let rendered = format_diagnostic("x", source, 8);
        assert_eq!(rendered, "x\n3 $ 4\n  ^");
    }
}
