//! Post-processing of model replies.
//!
//! Two unrelated cleanups live here because both repair the same kind of
//! model disobedience:
//!
//! * [`clean_markdown`] normalises the OCR transcription before it is
//!   checkpointed and fed to triage.
//! * [`extract_json`] digs the JSON object out of a structured-stage reply
//!   that came back fenced or wrapped in prose.
//!
//! Every rule is deterministic and content-preserving.

use once_cell::sync::Lazy;
use regex::Regex;

/// Clean an OCR transcription.
///
/// Rules (applied in order):
/// 1. Strip an outer ```` ```markdown ```` fence
/// 2. Normalise line endings and drop invisible Unicode
/// 3. Trim trailing whitespace, collapse runs of blank lines
/// 4. Repair GFM tables (missing header separator, stray body separators)
/// 5. Replace image links with their alt text (a scan has no image files)
/// 6. End with exactly one newline
pub fn clean_markdown(input: &str) -> String {
    let s = strip_outer_fence(input.trim());
    let s = normalise_chars(s);
    let s = tidy_lines(&s);
    let s = repair_tables(&s);
    let s = images_to_captions(&s);
    finish(&s)
}

// ── Rule 1: outer fence ──────────────────────────────────────────────────

static RE_MD_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:markdown|md)?[ \t]*\r?\n(.*?)\r?\n?```$").unwrap());

fn strip_outer_fence(input: &str) -> &str {
    match RE_MD_FENCE.captures(input).and_then(|c| c.get(1)) {
        Some(body) => body.as_str(),
        None => input,
    }
}

// ── Rule 2: characters ───────────────────────────────────────────────────

const INVISIBLE: [char; 6] = ['\u{200B}', '\u{200C}', '\u{200D}', '\u{2060}', '\u{FEFF}', '\u{00AD}'];

fn normalise_chars(input: &str) -> String {
    input
        .replace("\r\n", "\n")
        .chars()
        .filter(|c| !INVISIBLE.contains(c))
        .map(|c| if c == '\r' { '\n' } else { c })
        .collect()
}

// ── Rule 3: lines ────────────────────────────────────────────────────────

/// At most two consecutive blank lines survive.
fn tidy_lines(input: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    let mut blanks = 0;
    for line in input.lines().map(str::trim_end) {
        if line.is_empty() {
            blanks += 1;
            if blanks > 2 {
                continue;
            }
        } else {
            blanks = 0;
        }
        out.push(line);
    }
    out.join("\n")
}

// ── Rule 4: tables ───────────────────────────────────────────────────────

fn is_table_row(line: &str) -> bool {
    let t = line.trim();
    t.len() > 2 && t.starts_with('|') && t.ends_with('|')
}

fn is_separator_row(line: &str) -> bool {
    is_table_row(line)
        && line.contains('-')
        && line.trim().chars().all(|c| matches!(c, '|' | '-' | ':' | ' '))
}

fn separator_for(header: &str) -> String {
    let columns = header.trim().matches('|').count().saturating_sub(1).max(1);
    format!("|{}", " --- |".repeat(columns))
}

/// Within each run of table rows, row 2 must be the only separator.
fn repair_tables(input: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut row = 0usize;
    let mut header = String::new();

    for line in input.lines() {
        if !is_table_row(line) {
            row = 0;
            out.push(line.to_string());
            continue;
        }
        row += 1;
        match row {
            1 => {
                header = line.to_string();
                out.push(line.to_string());
            }
            2 if !is_separator_row(line) => {
                out.push(separator_for(&header));
                out.push(line.to_string());
                row = 3;
            }
            2 => out.push(line.to_string()),
            _ if is_separator_row(line) => {}
            _ => out.push(line.to_string()),
        }
    }
    out.join("\n")
}

// ── Rule 5: images ───────────────────────────────────────────────────────

static RE_IMAGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"!\[([^\]]*)\]\([^)]*\)").unwrap());

fn images_to_captions(input: &str) -> String {
    RE_IMAGE
        .replace_all(input, |caps: &regex::Captures<'_>| {
            let alt = caps[1].trim();
            if alt.is_empty() {
                String::new()
            } else {
                format!("*{alt}*")
            }
        })
        .into_owned()
}

// ── Rule 6: final newline ────────────────────────────────────────────────

fn finish(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{trimmed}\n")
    }
}

// ── JSON payload ─────────────────────────────────────────────────────────

static RE_JSON_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:json|JSON)?[ \t]*\r?\n(.*?)```").unwrap());

/// Locate the JSON object in a model reply.
///
/// Accepts a bare object, a fenced block, or an object surrounded by prose.
/// Returns the first balanced `{…}` span, honouring string literals, or
/// `None` when there is none.
pub fn extract_json(reply: &str) -> Option<&str> {
    let body = RE_JSON_FENCE
        .captures(reply)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(reply);

    let start = body.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in body[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&body[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_markdown_fence() {
        assert_eq!(strip_outer_fence("```markdown\n# A\nB\n```"), "# A\nB");
        assert_eq!(strip_outer_fence("```\n# A\n```"), "# A");
        assert_eq!(strip_outer_fence("# A"), "# A");
    }

    #[test]
    fn normalises_line_endings_and_invisible_chars() {
        assert_eq!(normalise_chars("a\r\nb\rc"), "a\nb\nc");
        assert_eq!(normalise_chars("NIF\u{200B} 54\u{FEFF}17"), "NIF 5417");
    }

    #[test]
    fn collapses_blank_runs() {
        assert_eq!(tidy_lines("a   \n\n\n\n\n\nb"), "a\n\n\nb");
    }

    #[test]
    fn inserts_missing_header_separator() {
        let out = repair_tables("| Artigo | Total |\n| Caneta | 100 |");
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(is_separator_row(lines[1]));
        assert_eq!(lines[2], "| Caneta | 100 |");
    }

    #[test]
    fn drops_body_separators() {
        let input = "| A | B |\n| --- | --- |\n| 1 | 2 |\n| --- | --- |\n| 3 | 4 |";
        let out = repair_tables(input);
        assert_eq!(out.lines().filter(|l| is_separator_row(l)).count(), 1);
        assert!(out.ends_with("| 3 | 4 |"));
    }

    #[test]
    fn well_formed_table_untouched() {
        let input = "| A | B |\n| :-- | --: |\n| 1 | 2 |\n\ntext";
        assert_eq!(repair_tables(input), input);
    }

    #[test]
    fn images_become_captions() {
        assert_eq!(images_to_captions("![Logótipo BAI](logo.png)"), "*Logótipo BAI*");
        assert_eq!(images_to_captions("x ![](a.png) y"), "x  y");
    }

    #[test]
    fn clean_markdown_full_pipeline() {
        let input = "```markdown\n# FACTURA\r\n\r\nNIF: 5417000000   \n\n\n\n\n| A | B |\n| 1 | 2 |\n```";
        let out = clean_markdown(input);
        assert!(out.starts_with("# FACTURA"));
        assert!(out.ends_with("| 1 | 2 |\n"));
        assert!(!out.contains("\n\n\n\n"));
        assert!(!out.contains('\r'));
    }

    #[test]
    fn blank_transcription_stays_blank() {
        assert_eq!(clean_markdown("```markdown\n\n```"), "");
        assert_eq!(clean_markdown("   "), "");
    }

    #[test]
    fn extract_bare_object() {
        assert_eq!(extract_json(r#"{"a": 1}"#), Some(r#"{"a": 1}"#));
    }

    #[test]
    fn extract_fenced_object() {
        let reply = "```json\n{\"a\": {\"b\": 2}}\n```";
        assert_eq!(extract_json(reply), Some("{\"a\": {\"b\": 2}}"));
    }

    #[test]
    fn extract_object_in_prose_with_braces_in_strings() {
        let reply = r#"Aqui está: {"notas": "chaves } e { no texto", "n": "\"x\""} obrigado"#;
        assert_eq!(
            extract_json(reply),
            Some(r#"{"notas": "chaves } e { no texto", "n": "\"x\""}"#)
        );
    }

    #[test]
    fn extract_none_when_missing_or_unbalanced() {
        assert_eq!(extract_json("sem json"), None);
        assert_eq!(extract_json(r#"{"a": 1"#), None);
    }
}
