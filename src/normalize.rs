use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Call-UI labels that OCR picks up next to participant names. Device words
/// only match as whole words, optionally with the owner's "'s" in front.
static NOISE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"\((?:co-host|host|guest|me|you)\)",
        r"|(?:'s\s+)?\b(?:macbook(?:\s+(?:pro|air))?|iphone|ipad|android|galaxy)\b",
    ))
    .expect("valid noise pattern")
});

/// Letters NFKD leaves intact that still have an obvious Latin spelling.
fn ascii_fold(c: char) -> &'static str {
    match c {
        'ı' => "i",
        'ł' => "l",
        'ø' => "o",
        'đ' | 'ð' => "d",
        'ħ' => "h",
        'ß' => "ss",
        'æ' => "ae",
        'œ' => "oe",
        'þ' => "th",
        _ => "",
    }
}

/// Lowercase, decompose, fold to ASCII, trim.
pub fn normalize(text: &str) -> String {
    let mut folded = String::with_capacity(text.len());
    for c in text.to_lowercase().nfkd() {
        match c {
            '\u{2018}' | '\u{2019}' | '\u{02bc}' => folded.push('\''),
            c if c.is_ascii() => folded.push(c),
            c => folded.push_str(ascii_fold(c)),
        }
    }
    folded.trim().to_string()
}

/// Strip call-UI noise from a transcript line and normalize what is left.
pub fn clean_line(line: &str) -> String {
    let mut current = normalize(line);
    loop {
        let next = collapse_whitespace(&NOISE.replace_all(&current, " "));
        if next == current {
            return current;
        }
        current = next;
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
