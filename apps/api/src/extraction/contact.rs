//! Contact extraction: heuristic name / email / phone lookup over resume text.
//!
//! Best-effort only: a missed field is fine, a wrong one is tolerated.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// How many non-empty lines from the top of the document are considered for the name.
const NAME_SCAN_LINES: usize = 10;
const MAX_NAME_WORDS: usize = 4;
const MIN_NAME_CHARS: usize = 4;
/// Widths of the candidate columns these values are stored in.
const MAX_FIELD_CHARS: usize = 255;
const MAX_PHONE_CHARS: usize = 50;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContactDetails {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}\b").unwrap()
});

// Order matters: the first pattern with a match wins.
static PHONE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        // 415-555-1212, 415.555.1212, 415 555 1212
        Regex::new(r"\b\d{3}[-. ]\d{3}[-. ]\d{4}\b").unwrap(),
        // (415) 555-1212, (415)5551212
        Regex::new(r"\(\d{3}\) ?\d{3}[-. ]?\d{4}\b").unwrap(),
        // 4155551212
        Regex::new(r"\b\d{10}\b").unwrap(),
        // +44 20 7946 0958, +1-415-555-1212, +91 98765 43210
        Regex::new(r"\+\d{1,3}[-. ]?\(?\d{1,4}\)?(?:[-. ]?\d{2,5}){1,3}").unwrap(),
    ]
});

static PHONE_DISALLOWED: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\d+\-(). ]").unwrap());

static NON_NAME_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        // URLs and profile links
        Regex::new(r"(?i)(https?://|www\.|linkedin\.com|github\.com)").unwrap(),
        // pure numbers / phone-ish lines
        Regex::new(r"^[\d\s+\-().,/]+$").unwrap(),
        // symbol-only lines (rules, bullets)
        Regex::new(r"^[^\p{L}\d]+$").unwrap(),
        // contact labels
        Regex::new(
            r"(?i)^(e-?mail|phone|mobile|cell|tel(ephone)?|address|linkedin|github|website|portfolio)\s*[:|\-]",
        )
        .unwrap(),
        // section headers
        Regex::new(
            r"(?i)^(summary|professional summary|objective|profile|experience|work experience|professional experience|employment history|education|skills|technical skills|projects|certifications|awards|publications|references|contact|contact information|languages|interests|resume|curriculum vitae|cv)\s*:?$",
        )
        .unwrap(),
        Regex::new(r"@").unwrap(),
    ]
});

/// Runs all three heuristics over the extracted text.
pub fn extract_contacts(text: &str) -> ContactDetails {
    ContactDetails {
        name: extract_name(text),
        email: extract_email(text),
        phone: extract_phone(text),
    }
}

pub fn extract_email(text: &str) -> Option<String> {
    EMAIL_PATTERN
        .find(text)
        .map(|m| m.as_str().to_lowercase())
        .filter(|e| e.chars().count() <= MAX_FIELD_CHARS)
}

pub fn extract_phone(text: &str) -> Option<String> {
    PHONE_PATTERNS
        .iter()
        .find_map(|p| p.find(text))
        .map(|m| PHONE_DISALLOWED.replace_all(m.as_str(), "").trim().to_string())
        .filter(|p| !p.is_empty() && p.chars().count() <= MAX_PHONE_CHARS)
}

pub fn extract_name(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .take(NAME_SCAN_LINES)
        .filter(|l| !NON_NAME_PATTERNS.iter().any(|p| p.is_match(l)))
        .find(|l| looks_like_name(l))
        .map(|l| l.split_whitespace().collect::<Vec<_>>().join(" "))
}

fn looks_like_name(line: &str) -> bool {
    let words: Vec<&str> = line.split_whitespace().collect();
    if words.is_empty() || words.len() > MAX_NAME_WORDS {
        return false;
    }
    let chars = line.chars().count();
    if chars < MIN_NAME_CHARS || chars > MAX_FIELD_CHARS {
        return false;
    }

    let any_title = words.iter().any(|w| is_title_case(w));
    let all_upper = words.iter().all(|w| is_all_upper(w));
    any_title && !all_upper
}

/// First letter upper-case, every following letter lower-case ("Doe", "Q.", "O'neil").
fn is_title_case(word: &str) -> bool {
    let mut letters = word.chars().filter(|c| c.is_alphabetic());
    match letters.next() {
        Some(first) if first.is_uppercase() => letters.all(|c| c.is_lowercase()),
        _ => false,
    }
}

fn is_all_upper(word: &str) -> bool {
    let mut letters = word.chars().filter(|c| c.is_alphabetic()).peekable();
    letters.peek().is_some() && letters.all(|c| c.is_uppercase())
}
