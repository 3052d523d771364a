//! Shared utility functions used across the codebase.

/// Replace exactly one occurrence of `old` in `content`.
///
/// Fails when `old` is absent or ambiguous, so every successful patch has
/// an unambiguous target. Error strings are surfaced verbatim through the
/// patch tools.
pub fn replace_once(content: &str, old: &str, new: &str) -> Result<String, String> {
    if old.is_empty() {
        return Err("old_string not found".to_string());
    }
    let matches = content.matches(old).count();
    match matches {
        0 => Err("old_string not found".to_string()),
        1 => Ok(content.replacen(old, new, 1)),
        n => Err(format!("{n} matches for old_string, expected 1")),
    }
}

/// Strip `//` line comments and `/* */` block comments from a JSONC document.
///
/// Comment markers inside string literals are left alone. This is the whole
/// of the JSONC support the config loader needs; the result is plain JSON.
pub fn strip_jsonc_comments(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut in_string = false;
    let mut escaped = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '/' if chars.peek() == Some(&'/') => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = ' ';
                for next in chars.by_ref() {
                    if prev == '*' && next == '/' {
                        break;
                    }
                    prev = next;
                }
            }
            _ => out.push(c),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── replace_once ──

    #[test]
    fn replace_once_single_match() {
        assert_eq!(
            replace_once("hello world", "world", "there").unwrap(),
            "hello there"
        );
    }

    #[test]
    fn replace_once_no_match() {
        let err = replace_once("hello", "absent", "x").unwrap_err();
        assert_eq!(err, "old_string not found");
    }

    #[test]
    fn replace_once_ambiguous() {
        let err = replace_once("aaa bbb aaa", "aaa", "x").unwrap_err();
        assert_eq!(err, "2 matches for old_string, expected 1");
    }

    #[test]
    fn replace_once_empty_old_is_not_found() {
        let err = replace_once("hello", "", "x").unwrap_err();
        assert_eq!(err, "old_string not found");
    }

    #[test]
    fn replace_once_only_first_of_one() {
        // Overlap-free single occurrence with the new string containing the old
        assert_eq!(replace_once("abc", "b", "bb").unwrap(), "abbc");
    }

    #[test]
    fn replace_once_multiline() {
        let content = "line one\nline two\nline three\n";
        let patched = replace_once(content, "line two\n", "line 2\n").unwrap();
        assert_eq!(patched, "line one\nline 2\nline three\n");
    }

    // ── strip_jsonc_comments ──

    #[test]
    fn strip_line_comments() {
        let doc = "{\n  // comment\n  \"a\": 1\n}";
        let json = strip_jsonc_comments(doc);
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["a"], 1);
    }

    #[test]
    fn strip_block_comments() {
        let doc = "{ /* before */ \"a\": /* mid */ 2 }";
        let json = strip_jsonc_comments(doc);
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["a"], 2);
    }

    #[test]
    fn comment_markers_inside_strings_survive() {
        let doc = r#"{ "url": "https://example.com", "glob": "a/*b*/c" }"#;
        let json = strip_jsonc_comments(doc);
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["url"], "https://example.com");
        assert_eq!(parsed["glob"], "a/*b*/c");
    }

    #[test]
    fn escaped_quote_does_not_end_string() {
        let doc = r#"{ "s": "quote \" // not a comment" }"#;
        let json = strip_jsonc_comments(doc);
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["s"], "quote \" // not a comment");
    }

    #[test]
    fn plain_json_unchanged() {
        let doc = r#"{"a":1,"b":[true,null]}"#;
        assert_eq!(strip_jsonc_comments(doc), doc);
    }
}
