//! Line-oriented span helpers for the regex fallback strategies.
//!
//! Brace and indentation counting here is purely textual: delimiters inside
//! string literals or comments are counted like real ones.

/// Characters that mean a declaration header continues on the next line.
const CONTINUATION_SUFFIXES: &[char] = &['(', ',', '=', '|', '&', '<', ':'];

/// Index of the last line of the brace-delimited block starting at `start`.
///
/// A header with no `{` ends at the first line ending in `;`, or at the first
/// line that neither continues the header nor is followed by a line opening
/// the block.
pub(crate) fn brace_block_end(lines: &[&str], start: usize) -> usize {
    let mut depth: i32 = 0;
    let mut opened = false;

    for (i, line) in lines.iter().enumerate().skip(start) {
        for ch in line.chars() {
            match ch {
                '{' => {
                    depth += 1;
                    opened = true;
                }
                '}' => depth -= 1,
                _ => {}
            }
        }
        if opened {
            if depth <= 0 {
                return i;
            }
            continue;
        }

        let trimmed = line.trim_end();
        if trimmed.ends_with(';') {
            return i;
        }
        let continues = trimmed.ends_with(CONTINUATION_SUFFIXES) || trimmed.ends_with("=>");
        let next_opens = next_non_blank(lines, i + 1).is_some_and(|n| lines[n].trim_start().starts_with('{'));
        if !continues && !next_opens {
            return i;
        }
    }

    lines.len().saturating_sub(1).max(start)
}

/// Brace depth at the beginning of every line.
pub(crate) fn depth_profile(lines: &[&str]) -> Vec<i32> {
    let mut depths = Vec::with_capacity(lines.len());
    let mut depth: i32 = 0;
    for line in lines {
        depths.push(depth);
        for ch in line.chars() {
            match ch {
                '{' => depth += 1,
                '}' => depth -= 1,
                _ => {}
            }
        }
    }
    depths
}

/// Leading whitespace width; a tab counts as four columns.
pub(crate) fn indent_of(line: &str) -> usize {
    line.chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}

/// Index of the last line of the indentation block headed by `start`.
///
/// The block runs until the first non-blank line indented no deeper than the
/// header. Trailing blank lines are not part of the block.
pub(crate) fn indent_block_end(lines: &[&str], start: usize) -> usize {
    let header_indent = indent_of(lines[start]);
    let mut end = start;
    for (i, line) in lines.iter().enumerate().skip(start + 1) {
        if line.trim().is_empty() {
            continue;
        }
        if indent_of(line) <= header_indent {
            break;
        }
        end = i;
    }
    end
}

pub(crate) fn next_non_blank(lines: &[&str], from: usize) -> Option<usize> {
    (from..lines.len()).find(|&i| !lines[i].trim().is_empty())
}

/// First index of the contiguous run of lines directly above `start` that
/// satisfy `pred`. Returns `start` when the line above does not match.
pub(crate) fn run_above(lines: &[&str], start: usize, pred: impl Fn(&str) -> bool) -> usize {
    let mut first = start;
    while first > 0 && pred(lines[first - 1].trim()) {
        first -= 1;
    }
    first
}

/// Whether a trimmed line belongs to a `//` or `/* */` comment.
pub(crate) fn is_c_comment_line(trimmed: &str) -> bool {
    trimmed.starts_with("//") || trimmed.starts_with("/*") || trimmed.starts_with('*')
}

/// Cleaned comment text of the comment run directly above `start`.
pub(crate) fn comment_above(lines: &[&str], start: usize, doc_only: bool) -> Option<String> {
    let first = run_above(lines, start, is_c_comment_line);
    if first == start {
        return None;
    }
    let block = lines[first..start].join("\n");
    if doc_only && !block.trim_start().starts_with("/**") {
        return None;
    }
    let cleaned = super::ast::clean_comment(&block);
    (!cleaned.is_empty()).then_some(cleaned)
}

/// Source text of lines `start..=end` (0-based).
pub(crate) fn span_code(lines: &[&str], start: usize, end: usize) -> String {
    lines[start..=end].join("\n")
}

/// Split a parameter or type list on top-level commas.
pub(crate) fn split_top_level(list: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth: i32 = 0;
    let mut current = String::new();

    for ch in list.chars() {
        match ch {
            '(' | '[' | '{' | '<' => depth += 1,
            ')' | ']' | '}' | '>' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(std::mem::take(&mut current));
                continue;
            }
            _ => {}
        }
        current.push(ch);
    }
    parts.push(current);

    parts
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(src: &str) -> Vec<&str> {
        src.lines().collect()
    }

    #[test]
    fn brace_block_single_line() {
        let l = lines("func Add(a, b int) int { return a + b }\nfunc B() {}");
        assert_eq!(brace_block_end(&l, 0), 0);
    }

    #[test]
    fn brace_block_multi_line() {
        let l = lines("class A {\n  m() {\n    x();\n  }\n}\nafter");
        assert_eq!(brace_block_end(&l, 0), 4);
        assert_eq!(brace_block_end(&l, 1), 3);
    }

    #[test]
    fn brace_block_opening_on_next_line() {
        let l = lines("public void run()\n{\n  go();\n}");
        assert_eq!(brace_block_end(&l, 0), 3);
    }

    #[test]
    fn brace_block_without_body_ends_at_header() {
        let l = lines("type Celsius float64\nfunc x() {}");
        assert_eq!(brace_block_end(&l, 0), 0);
    }

    #[test]
    fn brace_block_semicolon_terminated() {
        let l = lines("abstract void run(int a,\n    int b);\nvoid other() {}");
        assert_eq!(brace_block_end(&l, 0), 1);
    }

    #[test]
    fn brace_block_counts_braces_in_strings() {
        let l = lines("func f() {\n  s := \"}\"\n  return\n}");
        assert_eq!(brace_block_end(&l, 0), 1);
    }

    #[test]
    fn depth_profile_tracks_nesting() {
        let l = lines("class A {\n  m() {\n  }\n}");
        assert_eq!(depth_profile(&l), vec![0, 1, 2, 1]);
    }

    #[test]
    fn indent_block_python_function() {
        let l = lines("def f():\n    a = 1\n\n    return a\n\ndef g():\n    pass");
        assert_eq!(indent_block_end(&l, 0), 3);
        assert_eq!(indent_block_end(&l, 5), 6);
    }

    #[test]
    fn indent_block_header_only() {
        let l = lines("def f(): pass\nx = 1");
        assert_eq!(indent_block_end(&l, 0), 0);
    }

    #[test]
    fn indent_of_tabs_and_spaces() {
        assert_eq!(indent_of("\tx"), 4);
        assert_eq!(indent_of("  x"), 2);
        assert_eq!(indent_of("x"), 0);
    }

    #[test]
    fn comment_above_collects_run() {
        let l = lines("x\n// First.\n// Second.\nfunc A() {}");
        assert_eq!(comment_above(&l, 3, false).as_deref(), Some("First.\nSecond."));
        assert_eq!(comment_above(&l, 3, true), None);
        assert_eq!(comment_above(&l, 0, false), None);
    }

    #[test]
    fn split_top_level_respects_nesting() {
        assert_eq!(
            split_top_level("a int, m map[string]int, f func(int, int) error"),
            vec!["a int", "m map[string]int", "f func(int, int) error"]
        );
        assert_eq!(split_top_level("Map<String, Integer> m, int x"), vec!["Map<String, Integer> m", "int x"]);
        assert!(split_top_level("  ").is_empty());
    }
}
