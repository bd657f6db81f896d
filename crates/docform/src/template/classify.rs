//! Text heuristics that decide how a paragraph is styled.

use std::cmp::Reverse;
use std::collections::{BTreeSet, HashMap};

use once_cell::sync::Lazy;
use regex::{Regex, RegexSet};

/// Paragraphs longer than this are never headings.
const MAX_HEADING_CHARS: usize = 150;
/// Paragraphs longer than this are never subheadings.
const MAX_SUBHEADING_CHARS: usize = 100;
/// Length limit for heading-like and keyword-prefixed subheadings.
const SHORT_SUBHEADING_CHARS: usize = 60;
/// A colon heading needs a short tail after the first colon.
const MAX_COLON_TAIL_CHARS: usize = 100;
/// Anything with fewer words is treated as a heading.
const HEADING_WORD_LIMIT: usize = 6;
/// Every line must be longer than this for space-aligned column detection.
const MIN_ALIGNED_LINE_CHARS: usize = 20;

const HEADING_WORDS: &[&str] = &[
    "introduction",
    "conclusion",
    "summary",
    "overview",
    "background",
    "methodology",
    "results",
    "discussion",
    "recommendations",
    "references",
    "abstract",
    "executive summary",
    "scope",
    "objectives",
    "findings",
    "analysis",
    "recommendation",
    "appendix",
    "bibliography",
    "acknowledgments",
];

const SUBHEADING_PREFIXES: &[&str] = &["subsection", "part", "item", "sub", "section"];

static HEADING_PATTERNS: Lazy<RegexSet> = Lazy::new(|| {
    RegexSet::new([
        r"(?i)^\s*\d+(\.\d+)*\s+",
        r"(?i)^\s*[IVX]+\.\s+",
        r"(?i)^\s*[A-Z]\.\s+",
        r"(?i)^[A-Z\s]{3,}$",
        r"(?i)^\s*[•\-*]\s+",
        r"(?i)^(Section|Chapter|Part|Appendix)\s+\d+",
        r"(?i)^[\w\s]{3,30}\.$",
        r"(?i)^(Overview|Summary|Introduction|Conclusion|Background|Methodology|Results|Discussion|Recommendations|References)",
        r"(?i)^\d+\.\s+[A-Za-z]",
    ])
    .unwrap_or_else(|_| RegexSet::empty())
});

static DEEPER_NUMBERING: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^\s*(\d+\.\d+|\d+\.\d+\.\d+|[a-z]\.|\([a-z]\)|\([ivx]+\))").ok());

static INDENTED_MARKER: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^(?:\s+\d+\.|\s+[a-z]\.|\s+•|\s+-|\s+\*)").ok());

static WIDE_GAP: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"\s{2,}").ok());

/// Decides whether a paragraph reads like a heading.
pub fn is_heading(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.chars().count() > MAX_HEADING_CHARS {
        return false;
    }

    if let Some((_, tail)) = text.split_once(':') {
        if tail.trim().chars().count() < MAX_COLON_TAIL_CHARS {
            return true;
        }
    }

    if trimmed.split_whitespace().count() < HEADING_WORD_LIMIT {
        return true;
    }

    let lower = trimmed.to_lowercase();
    if HEADING_WORDS.iter().any(|word| lower.starts_with(word)) {
        return true;
    }

    HEADING_PATTERNS.is_match(trimmed)
}

/// Decides whether a paragraph reads like a subheading. `after_heading` is
/// true while the paragraph is within a few paragraphs of a heading.
pub fn is_subheading(text: &str, after_heading: bool) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.chars().count() > MAX_SUBHEADING_CHARS {
        return false;
    }

    if after_heading {
        if matches_opt(&DEEPER_NUMBERING, trimmed) {
            return true;
        }
        if is_heading(text) && trimmed.chars().count() < SHORT_SUBHEADING_CHARS {
            return true;
        }
    }

    if matches_opt(&INDENTED_MARKER, text) {
        return true;
    }

    let lower = text.to_lowercase();
    let short = text.chars().count() < SHORT_SUBHEADING_CHARS;
    short && SUBHEADING_PREFIXES.iter().any(|p| lower.starts_with(p))
}

fn matches_opt(regex: &Lazy<Option<Regex>>, text: &str) -> bool {
    regex.as_ref().is_some_and(|r| r.is_match(text))
}

#[derive(Debug, Clone, Copy)]
enum Delimiter {
    Tab,
    Pipe,
    Comma,
    WideGap,
}

impl Delimiter {
    const ALL: [Delimiter; 4] = [
        Delimiter::Tab,
        Delimiter::Pipe,
        Delimiter::Comma,
        Delimiter::WideGap,
    ];

    fn split(self, line: &str) -> Vec<String> {
        let parts: Vec<&str> = match self {
            Delimiter::Tab => line.split('\t').collect(),
            Delimiter::Pipe => line.split('|').collect(),
            Delimiter::Comma => line.split(',').collect(),
            Delimiter::WideGap => match WIDE_GAP.as_ref() {
                Some(re) => re.split(line).collect(),
                None => vec![line],
            },
        };
        parts
            .into_iter()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Detects a table typed as delimited lines inside one paragraph and
/// returns its rows, each padded or cut to the dominant column count.
pub fn detect_text_table(text: &str) -> Option<Vec<Vec<String>>> {
    let lines: Vec<&str> = text
        .trim()
        .split('\n')
        .filter(|line| !line.trim().is_empty())
        .collect();
    if lines.len() < 2 {
        return None;
    }

    for delimiter in Delimiter::ALL {
        let rows: Vec<Vec<String>> = lines.iter().map(|line| delimiter.split(line)).collect();

        let mut frequency: HashMap<usize, usize> = HashMap::new();
        for row in &rows {
            *frequency.entry(row.len()).or_default() += 1;
        }
        if frequency.len() > 2 {
            continue;
        }

        // Most frequent column count; ties go to the narrower layout.
        let Some(columns) = frequency
            .iter()
            .max_by_key(|(columns, count)| (**count, Reverse(**columns)))
            .map(|(columns, _)| *columns)
        else {
            continue;
        };
        if columns < 2 {
            continue;
        }

        let table = rows
            .into_iter()
            .map(|mut row| {
                row.resize(columns, String::new());
                row
            })
            .collect();
        return Some(table);
    }

    aligned_columns(&lines)
}

/// Positions of spaces that are neither the first nor the last character.
fn inner_spaces(line: &[char]) -> BTreeSet<usize> {
    (1..line.len().saturating_sub(1)).filter(|&i| line[i] == ' ').collect()
}

/// Splits lines at the character positions where every line has a space,
/// for columns aligned with single spaces. Rows follow the first row's width.
fn aligned_columns(lines: &[&str]) -> Option<Vec<Vec<String>>> {
    let lines: Vec<Vec<char>> = lines.iter().map(|line| line.chars().collect()).collect();
    if lines.iter().any(|line| line.len() <= MIN_ALIGNED_LINE_CHARS) {
        return None;
    }

    let mut common = inner_spaces(&lines[0]);
    for line in &lines[1..] {
        let spaces = inner_spaces(line);
        common.retain(|position| spaces.contains(position));
    }
    if common.is_empty() {
        return None;
    }

    let rows: Vec<Vec<String>> = lines
        .iter()
        .map(|line| {
            let mut cuts: Vec<usize> = common.iter().copied().collect();
            cuts.push(line.len());
            let mut start = 0;
            let mut parts = Vec::new();
            for end in cuts {
                let part: String = line[start..end].iter().collect();
                let part = part.trim();
                if !part.is_empty() {
                    parts.push(part.to_string());
                }
                start = end;
            }
            parts
        })
        .filter(|parts| !parts.is_empty())
        .collect();

    let columns = rows.first().map(Vec::len)?;
    if columns < 2 {
        return None;
    }
    Some(
        rows.into_iter()
            .map(|mut row| {
                row.resize(columns, String::new());
                row
            })
            .collect(),
    )
}
