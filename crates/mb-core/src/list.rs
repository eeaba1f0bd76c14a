//! Newline-delimited blocklist parsing.
//!
//! Both remote lists share one format: one entry per line, surrounding
//! whitespace ignored, blank lines and `#` comments dropped. Entries are
//! kept verbatim and in source order; duplicates are not removed.

/// Per-list parse counters, reported after a refresh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseStats {
    pub lines: usize,
    pub entries: usize,
    pub comments: usize,
    pub blank: usize,
}

/// Parse raw list text into its entries.
pub fn parse_list(text: &str) -> Vec<String> {
    parse_list_with_stats(text).0
}

/// Parse raw list text, also returning line counters.
pub fn parse_list_with_stats(text: &str) -> (Vec<String>, ParseStats) {
    let mut entries = Vec::new();
    let mut stats = ParseStats::default();

    // `split('\n')` rather than `lines()` so a lone '\r' left by CRLF is
    // handled by the trim below, same as any other whitespace.
    for raw_line in text.split('\n') {
        stats.lines += 1;
        let line = raw_line.trim();
        if line.is_empty() {
            stats.blank += 1;
            continue;
        }
        if is_comment_line(line) {
            stats.comments += 1;
            continue;
        }
        entries.push(line.to_string());
    }

    stats.entries = entries.len();
    (entries, stats)
}

fn is_comment_line(line: &str) -> bool {
    line.starts_with('#')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_comments_and_blank_lines() {
        let text = "# header\n\nbad.com\n   \n  # indented comment\nworse.net  \n";
        assert_eq!(parse_list(text), vec!["bad.com", "worse.net"]);
    }

    #[test]
    fn keeps_order_and_duplicates() {
        assert_eq!(parse_list("b\na\nb"), vec!["b", "a", "b"]);
    }

    #[test]
    fn handles_crlf_line_endings() {
        assert_eq!(parse_list("one\r\ntwo\r\n"), vec!["one", "two"]);
    }

    #[test]
    fn hash_inside_entry_is_not_a_comment() {
        assert_eq!(parse_list("slot#88"), vec!["slot#88"]);
    }

    #[test]
    fn counts_lines() {
        let (entries, stats) = parse_list_with_stats("# c\na\n\nb");
        assert_eq!(entries.len(), 2);
        assert_eq!(
            stats,
            ParseStats {
                lines: 4,
                entries: 2,
                comments: 1,
                blank: 1
            }
        );
    }

    #[test]
    fn empty_text_yields_no_entries() {
        assert!(parse_list("").is_empty());
    }
}
