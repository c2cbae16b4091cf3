//! Block comments attached to helpers.

use super::scanner::literal_spans;

/// The block comment that immediately precedes `member_start`, cleaned.
///
/// Only whitespace may separate the comment from the member. The search never
/// looks before `floor`, so the first member of an object literal cannot pick
/// up a comment written outside the literal.
pub fn preceding_doc(text: &str, member_start: usize, floor: usize) -> Option<String> {
    let before = text.get(floor..member_start)?.trim_end();
    if !before.ends_with("*/") {
        return None;
    }
    // The opener is found by scanning forward: a `/*` inside the comment body
    // (`src/*.ts`) or inside an earlier string must not be taken for it.
    let span = literal_spans(before).pop().filter(|s| s.end == before.len())?;
    let raw = &before[span];
    if !raw.starts_with("/*") {
        return None;
    }
    let cleaned = clean_comment(raw);
    (!cleaned.is_empty()).then_some(cleaned)
}

/// Strip `/*`, `*/` and leading `*` decoration from each line of a block
/// comment. Blank lines at either end are dropped; interior ones are kept.
pub fn clean_comment(raw: &str) -> String {
    let inner = raw.strip_prefix("/*").unwrap_or(raw);
    let inner = inner.strip_suffix("*/").unwrap_or(inner);

    let lines: Vec<&str> = inner
        .lines()
        .map(|line| {
            let line = line.trim().trim_start_matches('*');
            line.strip_prefix(' ').unwrap_or(line).trim_end()
        })
        .collect();

    let first = lines.iter().position(|l| !l.is_empty());
    let last = lines.iter().rposition(|l| !l.is_empty());
    match (first, last) {
        (Some(first), Some(last)) => lines[first..=last].join("\n"),
        _ => String::new(),
    }
}
