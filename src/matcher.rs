use std::collections::{HashMap, HashSet};

use crate::config::MatchConfig;
use crate::fuzzy::token_set_ratio;
use crate::models::{MemberMatch, Strategy};
use crate::normalize::{clean_line, normalize};

/// Transcript state shared by every strategy for one matching run.
struct Transcript {
    blob: String,
    lines: Vec<String>,
    compact_lines: Vec<String>,
    first_names: HashMap<String, usize>,
}

impl Transcript {
    fn new(raw: &str, roster: &[String]) -> Self {
        let lines: Vec<String> = raw
            .lines()
            .map(clean_line)
            .filter(|line| !line.is_empty())
            .collect();
        let compact_lines = lines.iter().map(|line| compact(line)).collect();

        let mut first_names = HashMap::new();
        for member in roster {
            if let Some(first) = first_name(&normalize(member)) {
                *first_names.entry(first.to_string()).or_insert(0) += 1;
            }
        }

        Self {
            blob: normalize(raw),
            lines,
            compact_lines,
            first_names,
        }
    }

    fn best_line(&self, needle: &str) -> Option<(&str, u8)> {
        self.lines
            .iter()
            .map(|line| (line.as_str(), token_set_ratio(needle, line)))
            .fold(None, |best, candidate| match best {
                Some((_, score)) if score >= candidate.1 => best,
                _ => Some(candidate),
            })
    }
}

struct Hit {
    line: Option<String>,
    score: Option<u8>,
}

/// Strategies see the member's normalized name.
type StrategyFn = fn(&str, &Transcript, &MatchConfig) -> Option<Hit>;

/// Evaluated in order; the first strategy that accepts decides the match.
const CASCADE: [(Strategy, StrategyFn); 4] = [
    (Strategy::Substring, substring),
    (Strategy::Concatenated, concatenated),
    (Strategy::FuzzyTokenSet, fuzzy_token_set),
    (Strategy::UniqueFirstName, unique_first_name),
];

fn compact(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

fn first_name(normalized: &str) -> Option<&str> {
    normalized.split_whitespace().next()
}

fn substring(name: &str, transcript: &Transcript, _: &MatchConfig) -> Option<Hit> {
    transcript.blob.contains(name).then_some(Hit {
        line: None,
        score: None,
    })
}

fn concatenated(name: &str, transcript: &Transcript, _: &MatchConfig) -> Option<Hit> {
    let needle = compact(name);
    if needle.is_empty() {
        return None;
    }
    transcript
        .lines
        .iter()
        .zip(&transcript.compact_lines)
        .find(|(_, compacted)| compacted.contains(&needle))
        .map(|(line, _)| Hit {
            line: Some(line.clone()),
            score: None,
        })
}

fn fuzzy_token_set(name: &str, transcript: &Transcript, config: &MatchConfig) -> Option<Hit> {
    let (line, score) = transcript.best_line(name)?;
    (score >= config.fuzzy_threshold).then(|| Hit {
        line: Some(line.to_string()),
        score: Some(score),
    })
}

fn unique_first_name(name: &str, transcript: &Transcript, config: &MatchConfig) -> Option<Hit> {
    let first = first_name(name)?;
    if transcript.first_names.get(first).copied() != Some(1) {
        return None;
    }
    let (line, score) = transcript.best_line(first)?;
    (score >= config.first_name_threshold).then(|| Hit {
        line: Some(line.to_string()),
        score: Some(score),
    })
}

/// Decide which roster members appear in an OCR transcript.
///
/// Results follow roster order. Blank roster entries are skipped and a name
/// listed twice is reported once.
pub fn match_attendance(
    transcript: &str,
    roster: &[String],
    config: &MatchConfig,
) -> Vec<MemberMatch> {
    let context = Transcript::new(transcript, roster);
    let mut seen = HashSet::new();
    let mut matches = Vec::new();

    for member in roster {
        let name = normalize(member);
        if name.is_empty() || !seen.insert(member.trim()) {
            continue;
        }
        let hit = CASCADE.iter().find_map(|(strategy, check)| {
            check(&name, &context, config).map(|hit| (*strategy, hit))
        });

        match hit {
            Some((strategy, hit)) => {
                tracing::debug!(
                    member = %member,
                    ?strategy,
                    line = hit.line.as_deref().unwrap_or(""),
                    score = hit.score.unwrap_or(100),
                    "matched"
                );
                matches.push(MemberMatch {
                    member: member.clone(),
                    strategy,
                    line: hit.line,
                    score: hit.score,
                });
            }
            None => tracing::trace!(member = %member, "no match"),
        }
    }

    matches
}

pub fn present_set(matches: &[MemberMatch]) -> HashSet<String> {
    matches.iter().map(|m| m.member.trim().to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn matched(transcript: &str, names: &[&str]) -> Vec<MemberMatch> {
        match_attendance(transcript, &roster(names), &MatchConfig::default())
    }

    #[test]
    fn substring_match_ignores_call_labels() {
        let result = matched("Onur Celik (me)", &["Onur Celik"]);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].member, "Onur Celik");
        assert_eq!(result[0].strategy, Strategy::Substring);
    }

    #[test]
    fn concatenated_match_recovers_missing_spaces() {
        let result = matched("batuhanaltan", &["Batuhan Altan"]);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].strategy, Strategy::Concatenated);
        assert_eq!(result[0].line.as_deref(), Some("batuhanaltan"));
    }

    #[test]
    fn dotless_i_names_match_their_ascii_spelling() {
        let result = matched("aliyildiz", &["Ali Yıldız"]);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].strategy, Strategy::Concatenated);

        let result = matched("Batuhan Altin (me)\nIşık Kaya", &["Batuhan Altın", "Isik Kaya"]);
        assert_eq!(result.len(), 2);
        assert!(result.iter().all(|m| m.strategy == Strategy::Substring));
    }

    #[test]
    fn device_word_inside_a_name_is_kept() {
        let result = matched("androidsonkaya (me)", &["Androidson Kaya"]);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].strategy, Strategy::Concatenated);
        assert_eq!(result[0].line.as_deref(), Some("androidsonkaya"));
    }

    #[test]
    fn unique_first_name_matches_bracketed_label() {
        let result = matched("Emre (Patientdesk.ai)", &["Emre Kaplaner", "Efe Berke"]);
        let present = present_set(&result);
        assert_eq!(present, HashSet::from(["Emre Kaplaner".to_string()]));
        assert_eq!(result[0].strategy, Strategy::UniqueFirstName);
    }

    #[test]
    fn shared_first_name_disables_fallback() {
        let result = matched(
            "Emre (Patientdesk.ai)",
            &["Emre Kaplaner", "Emre Yilmaz", "Efe Berke"],
        );
        assert!(result.is_empty());
    }

    #[test]
    fn fuzzy_match_tolerates_typos_and_diacritics() {
        let result = matched(
            "Fikri Koktas (Host)\nOnur Gelik (me)",
            &["Şan Fikri Köktas", "Onur Celik"],
        );
        let present = present_set(&result);
        assert!(present.contains("Şan Fikri Köktas"));
        assert!(present.contains("Onur Celik"));
        assert!(result
            .iter()
            .all(|m| m.strategy == Strategy::FuzzyTokenSet));
    }

    #[test]
    fn regression_transcript_matches_everyone() {
        let transcript = [
            "Onur's Iphone (me)",
            "batuhanaltan",
            "Emre (Patientdesk.ai)",
            "Fikri Koktas (Host)",
            "Onur Gelik (me)",
        ]
        .join("\n");
        let names = [
            "Onur Celik",
            "Batuhan Altan",
            "Emre Kaplaner",
            "Şan Fikri Köktas",
            "Efe Berke",
        ];
        let present = present_set(&matched(&transcript, &names));
        for expected in &names[..4] {
            assert!(present.contains(*expected), "{expected} missing");
        }
        assert!(!present.contains("Efe Berke"));
    }

    #[test]
    fn blank_and_duplicate_members_are_skipped() {
        let result = matched("Onur Celik", &["", "   ", "Onur Celik", "Onur Celik"]);
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn unknown_people_are_absent() {
        let result = matched("Random Person\nAnother Guest", &["Onur Celik", "Efe Berke"]);
        assert!(result.is_empty());
    }
}
