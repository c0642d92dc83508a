use std::collections::BTreeSet;

/// Indel similarity in 0..=100: `2 * LCS / (len a + len b)`.
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 0.0;
    }
    200.0 * longest_common_subsequence(&a, &b) as f64 / total as f64
}

fn longest_common_subsequence(a: &[char], b: &[char]) -> usize {
    let mut previous = vec![0usize; b.len() + 1];
    let mut current = vec![0usize; b.len() + 1];
    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            current[j + 1] = if ca == cb {
                previous[j] + 1
            } else {
                current[j].max(previous[j + 1])
            };
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}

fn tokens(text: &str) -> BTreeSet<String> {
    let processed: String = text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    processed.split_whitespace().map(str::to_string).collect()
}

fn join(parts: &[&String]) -> String {
    parts
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Order- and duplicate-insensitive token overlap score.
pub fn token_set_ratio(a: &str, b: &str) -> u8 {
    let left = tokens(a);
    let right = tokens(b);
    if left.is_empty() || right.is_empty() {
        return 0;
    }

    let sect: Vec<&String> = left.intersection(&right).collect();
    let only_left: Vec<&String> = left.difference(&right).collect();
    let only_right: Vec<&String> = right.difference(&left).collect();

    let sect = join(&sect);
    let combined_left = format!("{} {}", sect, join(&only_left)).trim().to_string();
    let combined_right = format!("{} {}", sect, join(&only_right)).trim().to_string();

    let mut best = ratio(&combined_left, &combined_right);
    if !sect.is_empty() {
        best = best
            .max(ratio(&sect, &combined_left))
            .max(ratio(&sect, &combined_right));
    }
    best.round().clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_matches_indel_similarity() {
        assert_eq!(ratio("abc", "abc"), 100.0);
        assert_eq!(ratio("", ""), 0.0);
        assert!((ratio("onur celik", "onur gelik") - 90.0).abs() < 1e-9);
    }

    #[test]
    fn token_set_ignores_order_and_duplicates() {
        assert_eq!(token_set_ratio("celik onur", "Onur Celik onur"), 100);
    }

    #[test]
    fn subset_tokens_score_full() {
        assert_eq!(token_set_ratio("emre", "emre (patientdesk.ai)"), 100);
        assert_eq!(token_set_ratio("san fikri koktas", "fikri koktas"), 100);
    }

    #[test]
    fn disjoint_tokens_score_low() {
        assert!(token_set_ratio("efe", "emre patientdesk ai") < 50);
        assert!(token_set_ratio("emre kaplaner", "emre patientdesk ai") < 85);
        assert_eq!(token_set_ratio("", "anything"), 0);
    }
}
