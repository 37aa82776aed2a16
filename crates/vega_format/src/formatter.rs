//! Markdown normalization of provider responses.

use regex::{Captures, Regex};
use std::sync::LazyLock;

/// A fenced block, optionally tagged with a language on the opening line.
static FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:([A-Za-z0-9_+#.-]+)[ \t]*\n|\n)?(.*?)\n?```")
        .expect("fence pattern is valid")
});

/// Single-line backtick span.
static INLINE_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`[^`\n]+`").expect("inline code pattern is valid"));

static ORDERED_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\s+").expect("ordered item pattern is valid"));

static BULLET_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-*+]\s+").expect("bullet item pattern is valid"));

/// Label words, optionally already wrapped in bold.
static LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\*\*)?\b(result|output|example|результат|вывод|пример):\s*")
        .expect("label pattern is valid")
});

/// Runs of three or more uppercase letters, any script.
static SHOUTING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\p{Lu}{3,})\b").expect("uppercase pattern is valid"));

static BLANK_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("blank run pattern is valid"));

const HEADING_KEYWORDS: &[&str] = &[
    "example",
    "result",
    "output",
    "solution",
    "answer",
    "explanation",
    "concepts",
    "points",
    "usage",
    "application",
    "how",
    "what",
    "why",
    "пример",
    "результат",
    "вывод",
    "решение",
    "ответ",
    "объяснение",
    "концепции",
    "моменты",
    "использование",
    "применение",
    "как",
    "что",
    "зачем",
];

const INLINE_CODE_MAX: usize = 100;
const HEADING_MAX_CHARS: usize = 80;
const HEADING_MAX_WORDS: usize = 8;
const LIST_LINE_MAX_CHARS: usize = 200;
const LIST_LINE_MAX_WORDS: usize = 15;

/// Normalizes provider output into consistent markdown.
///
/// Transformations, in order:
///
/// 1. Fenced code blocks are rewritten to a canonical form, each fence on its own line.
///    Block content is preserved byte for byte.
/// 2. Short single-line backtick spans are treated as inline code and shielded from emphasis.
/// 3. Outside fences, label words (`Result:`, `Output:`, `Example:`) become bold labels
///    ending their line.
/// 4. Outside fences, colon-terminated lines that read like section titles become `##`
///    headings, and short lines next to list items become bullet items. Label lines and
///    the line right after a label are never bulleted.
/// 5. Outside fences, words written in capitals become bold.
/// 6. Runs of blank lines collapse to one and the result is trimmed.
///
/// Applying `format` to its own output changes nothing.
///
/// Never fails. Empty input is returned unchanged.
///
/// # Example
///
/// ```
/// let text = vega_format::format("RESULT: done ```sh\nls\n```");
/// assert_eq!(text, "**RESULT:**\ndone\n```sh\nls\n```");
/// ```
#[must_use]
pub fn format(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let text = normalize_fences(text);
    let text = map_prose(&text, bold_labels);
    let text = restructure_lines(&text);
    let text = map_prose(&text, emphasize);
    let text = map_prose(&text, |segment| {
        BLANK_RUN.replace_all(segment, "\n\n").into_owned()
    });

    text.trim().to_string()
}

// ─────────────────────
// Fences
// ─────────────────────

fn normalize_fences(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    let mut last = 0;

    for caps in FENCE.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };

        out.push_str(&text[last..whole.start()]);
        if !out.is_empty() && !out.ends_with('\n') {
            out.truncate(out.trim_end_matches([' ', '\t']).len());
            if !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
        }

        let lang = caps.get(1).map_or("", |m| m.as_str());
        let body = caps.get(2).map_or("", |m| m.as_str());
        out.push_str("```");
        out.push_str(lang);
        out.push('\n');
        out.push_str(body);
        out.push_str("\n```");

        last = whole.end();
        let rest = &text[last..];
        let rest_trimmed = rest.trim_start_matches([' ', '\t']);
        if !rest_trimmed.is_empty() && !rest_trimmed.starts_with('\n') {
            last += rest.len() - rest_trimmed.len();
            out.push('\n');
        }
    }

    out.push_str(&text[last..]);
    out
}

/// Applies `f` to the segments outside fences, leaving fence interiors untouched.
fn map_prose(text: &str, f: impl Fn(&str) -> String) -> String {
    text.split("```")
        .enumerate()
        .map(|(i, segment)| {
            if i % 2 == 0 {
                f(segment)
            } else {
                segment.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("```")
}

// ─────────────────────
// Lines
// ─────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind {
    /// Fence line or fence interior.
    Code,
    Blank,
    ListItem,
    /// Section-title candidate; the flag records whether it carries a keyword.
    Heading(bool),
    /// Short prose that becomes a bullet when it touches a list.
    Bulletable,
    Plain,
}

fn is_list_item(stripped: &str) -> bool {
    ORDERED_ITEM.is_match(stripped) || BULLET_ITEM.is_match(stripped)
}

/// True when the line's last label closes it, so the next line holds the label's body.
fn ends_with_label(stripped: &str) -> bool {
    LABEL
        .find_iter(stripped)
        .last()
        .is_some_and(|m| stripped[m.end()..].trim_start_matches('*').trim().is_empty())
}

fn classify_line(stripped: &str) -> LineKind {
    if stripped.is_empty() {
        return LineKind::Blank;
    }
    if is_list_item(stripped) {
        return LineKind::ListItem;
    }
    if stripped.starts_with('#') {
        return LineKind::Plain;
    }

    // Emphasis markers do not count towards length limits.
    let chars = stripped.chars().filter(|c| *c != '*').count();
    let words = stripped.split_whitespace().count();

    if stripped.ends_with(':') && chars < HEADING_MAX_CHARS && words <= HEADING_MAX_WORDS {
        let lower = stripped.to_lowercase();
        let keyword = HEADING_KEYWORDS.iter().any(|k| lower.contains(k));
        return LineKind::Heading(keyword);
    }

    if LABEL.is_match(stripped) {
        return LineKind::Plain;
    }

    if chars < LIST_LINE_MAX_CHARS && words < LIST_LINE_MAX_WORDS {
        LineKind::Bulletable
    } else {
        LineKind::Plain
    }
}

fn restructure_lines(text: &str) -> String {
    let lines: Vec<&str> = text.split('\n').collect();

    let mut in_fence = false;
    let mut after_label = false;
    let kinds: Vec<LineKind> = lines
        .iter()
        .map(|line| {
            let stripped = line.trim();
            let kind = if stripped.starts_with("```") {
                in_fence = !in_fence;
                LineKind::Code
            } else if in_fence {
                LineKind::Code
            } else {
                match classify_line(stripped) {
                    LineKind::Bulletable if after_label => LineKind::Plain,
                    kind => kind,
                }
            };
            after_label = kind != LineKind::Code && ends_with_label(stripped);
            kind
        })
        .collect();

    // A run of bulletable lines touching a list on either end joins the list.
    let mut bullet = vec![false; kinds.len()];
    for i in 1..kinds.len() {
        if kinds[i] == LineKind::Bulletable
            && (kinds[i - 1] == LineKind::ListItem || bullet[i - 1])
        {
            bullet[i] = true;
        }
    }
    for i in (0..kinds.len().saturating_sub(1)).rev() {
        if kinds[i] == LineKind::Bulletable
            && (kinds[i + 1] == LineKind::ListItem || bullet[i + 1])
        {
            bullet[i] = true;
        }
    }

    lines
        .iter()
        .zip(&kinds)
        .zip(&bullet)
        .map(|((line, kind), is_bullet)| match kind {
            LineKind::Heading(true) => format!("## {}", line.trim()),
            LineKind::Bulletable if *is_bullet => format!("- {}", line.trim()),
            _ => (*line).to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ─────────────────────
// Emphasis
// ─────────────────────

fn bold_labels(segment: &str) -> String {
    LABEL
        .replace_all(segment, |caps: &Captures<'_>| {
            if caps.get(1).is_some() {
                caps[0].to_string()
            } else {
                format!("**{}:**\n", &caps[2])
            }
        })
        .into_owned()
}

fn emphasize(segment: &str) -> String {
    // Even pieces lie outside existing bold spans.
    segment
        .split("**")
        .enumerate()
        .map(|(i, piece)| {
            if i % 2 == 0 {
                bold_shouting(piece)
            } else {
                piece.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("**")
}

fn bold_shouting(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for span in INLINE_CODE.find_iter(text) {
        let inner = &span.as_str()[1..span.as_str().len() - 1];
        if inner.trim().chars().count() >= INLINE_CODE_MAX {
            continue;
        }
        out.push_str(&SHOUTING.replace_all(&text[last..span.start()], "**${1}**"));
        out.push_str(span.as_str());
        last = span.end();
    }

    out.push_str(&SHOUTING.replace_all(&text[last..], "**${1}**"));
    out
}
