//! Near-JSON Repair
//!
//! Model output is often almost JSON. Before a strict parse we normalize a
//! fixed set of deviations, and nothing else:
//!
//! - markdown code fences (` ```json ... ``` `)
//! - prose around the object (the outermost balanced `{...}` is kept)
//! - trailing commas before `}` or `]`
//! - unquoted object keys
//! - single-quoted strings
//! - Python literals `True`, `False`, `None`
//! - raw newlines and tabs inside strings

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::error::RepairError;

static RE_CODE_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"```[a-zA-Z]*\n?").unwrap());

/// Remove fenced-code-block markers and surrounding whitespace
pub fn strip_code_fences(raw: &str) -> String {
    RE_CODE_FENCE.replace_all(raw, "").trim().to_string()
}

/// Strict parse, falling back to extraction and normalization
pub fn fix_and_parse_json(raw: &str) -> Result<Value, RepairError> {
    let trimmed = raw.trim();
    if let Ok(value) = serde_json::from_str(trimmed) {
        return Ok(value);
    }

    let candidate = extract_object(trimmed).ok_or(RepairError::NoObject)?;
    let repaired = normalize(candidate);
    debug!(original_len = trimmed.len(), repaired_len = repaired.len(), "Repaired near-JSON");

    Ok(serde_json::from_str(&repaired)?)
}

/// Outermost balanced `{...}`, ignoring braces inside quoted strings
fn extract_object(s: &str) -> Option<&str> {
    let start = s.find('{')?;
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (i, c) in s[start..].char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }

        match c {
            '"' | '\'' => quote = Some(c),
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[start..start + i + 1]);
                }
            }
            _ => {}
        }
    }

    None
}

fn next_significant(chars: &[char], from: usize) -> Option<char> {
    chars[from.min(chars.len())..]
        .iter()
        .copied()
        .find(|c| !c.is_whitespace())
}

fn last_significant(out: &str) -> Option<char> {
    out.chars().rev().find(|c| !c.is_whitespace())
}

/// Rewrite the accepted deviations into strict JSON
fn normalize(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len() + 16);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '"' | '\'' => {
                i = copy_string(&chars, i, &mut out);
            }
            ',' => {
                if !matches!(next_significant(&chars, i + 1), Some('}') | Some(']')) {
                    out.push(',');
                }
                i += 1;
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();

                let is_key = next_significant(&chars, i) == Some(':')
                    && matches!(last_significant(&out), Some('{') | Some(','));

                if is_key {
                    out.push('"');
                    out.push_str(&word);
                    out.push('"');
                } else {
                    out.push_str(match word.as_str() {
                        "True" => "true",
                        "False" => "false",
                        "None" => "null",
                        other => other,
                    });
                }
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    out
}

/// Copy a quoted string starting at `start` as a double-quoted JSON string.
/// Returns the index just past the closing quote.
fn copy_string(chars: &[char], start: usize, out: &mut String) -> usize {
    let quote = chars[start];
    out.push('"');
    let mut i = start + 1;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\\' if i + 1 < chars.len() => {
                let next = chars[i + 1];
                if quote == '\'' && next == '\'' {
                    out.push('\'');
                } else {
                    out.push('\\');
                    out.push(next);
                }
                i += 2;
                continue;
            }
            c if c == quote => {
                out.push('"');
                return i + 1;
            }
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
        i += 1;
    }

    i
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fences("  {\"a\": 1}  "), "{\"a\": 1}");
    }

    #[test]
    fn test_strict_json_passes_through() {
        let v = fix_and_parse_json(r#"{"success": true, "critique": ""}"#).unwrap();
        assert_eq!(v, json!({"success": true, "critique": ""}));
    }

    #[test]
    fn test_surrounding_prose() {
        let v = fix_and_parse_json(r#"Here you go: {"success": false} hope that helps"#).unwrap();
        assert_eq!(v, json!({"success": false}));
    }

    #[test]
    fn test_trailing_commas() {
        let v = fix_and_parse_json(r#"{"success": true, "items": [1, 2,],}"#).unwrap();
        assert_eq!(v, json!({"success": true, "items": [1, 2]}));
    }

    #[test]
    fn test_unquoted_keys() {
        let v = fix_and_parse_json(r#"{success: true, critique: "mine more logs"}"#).unwrap();
        assert_eq!(v, json!({"success": true, "critique": "mine more logs"}));
    }

    #[test]
    fn test_single_quotes() {
        let v = fix_and_parse_json(r#"{'success': false, 'critique': 'say "hi" and don\'t stop'}"#).unwrap();
        assert_eq!(v["critique"], "say \"hi\" and don't stop");
    }

    #[test]
    fn test_python_literals() {
        let v = fix_and_parse_json(r#"{"success": True, "critique": None}"#).unwrap();
        assert_eq!(v, json!({"success": true, "critique": null}));
    }

    #[test]
    fn test_raw_newline_in_string() {
        let v = fix_and_parse_json("{\"success\": false, \"critique\": \"line one\nline two\"}").unwrap();
        assert_eq!(v["critique"], "line one\nline two");
    }

    #[test]
    fn test_braces_inside_strings() {
        let v = fix_and_parse_json(r#"noise {"critique": "use {curly} braces", "success": true,} tail"#).unwrap();
        assert_eq!(v["critique"], "use {curly} braces");
    }

    #[test]
    fn test_word_values_are_not_keys() {
        // "true" is a value after ':', not a key
        let v = fix_and_parse_json(r#"{ok: true, n: 1e3,}"#).unwrap();
        assert_eq!(v, json!({"ok": true, "n": 1000.0}));
    }

    #[test]
    fn test_rejected_inputs() {
        assert!(matches!(fix_and_parse_json("not json"), Err(RepairError::NoObject)));
        assert!(matches!(fix_and_parse_json("{\"success\": true"), Err(RepairError::NoObject)));
        assert!(matches!(fix_and_parse_json("{\"success\" true}"), Err(RepairError::Parse(_))));
    }
}
