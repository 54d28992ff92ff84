//! Dictionary-driven phrase substitution
//!
//! One ordered rule table, built once. Rule order is observable: overlapping
//! rules fire in declaration order, and a later rule sees an earlier rule's
//! output.

use crate::rng;
use crate::text::match_case;
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;

/// A phrase pattern and its natural alternatives
pub struct PatternRule {
    pub pattern: Regex,
    pub alternatives: &'static [&'static str],
}

const RULES: &[(&str, &[&str])] = &[
    // Formal/Latinate vocabulary
    ("delve into", &["explore", "examine", "look into", "dig into", "study"]),
    ("embark upon|embark on", &["begin", "start", "set out on", "kick off"]),
    ("a testament to", &["proof of", "evidence of", "a sign of"]),
    ("landscape of", &["world of", "field of", "area of", "space of"]),
    ("navigating", &["handling", "managing", "dealing with", "working through", "tackling"]),
    ("meticulous", &["careful", "thorough", "detailed", "precise"]),
    ("intricate", &["complex", "detailed", "elaborate", "involved"]),
    ("myriad", &["many", "countless", "lots of", "plenty of"]),
    ("plethora", &["abundance", "wealth", "range", "load"]),
    ("paradigm", &["model", "framework", "approach", "way of thinking"]),
    ("synergy", &["teamwork", "cooperation", "collaboration"]),
    ("leverage", &["use", "tap into", "make use of", "draw on"]),
    ("facilitate", &["help", "enable", "support", "make easier"]),
    ("optimize", &["improve", "refine", "fine-tune", "boost"]),
    ("streamline", &["simplify", "smooth out", "tidy up"]),
    ("robust", &["strong", "reliable", "solid", "sturdy"]),
    ("seamless", &["smooth", "effortless", "easy"]),
    ("cutting-edge", &["advanced", "modern", "latest", "leading"]),
    ("utilize", &["use", "employ", "make use of", "apply"]),
    ("comprehensive", &["complete", "thorough", "full", "in-depth"]),
    ("demonstrate", &["show", "prove", "illustrate", "reveal"]),
    ("obtain", &["get", "gain", "secure", "pick up"]),
    // Transition adverbs
    ("furthermore", &["also", "plus", "what's more", "on top of that", "besides"]),
    ("moreover", &["also", "plus", "what's more", "besides"]),
    ("additionally", &["also", "plus", "on top of that", "as well"]),
    ("however", &["but", "yet", "still", "that said"]),
    ("nevertheless", &["still", "even so", "all the same", "but"]),
    ("therefore", &["so", "that's why", "as a result", "for this reason"]),
    ("consequently", &["so", "as a result", "because of this"]),
    ("in conclusion", &["to wrap up", "in the end", "all in all", "finally"]),
    ("in summary", &["in short", "to sum up", "basically", "overall"]),
    // Hedges and wordy connectors
    ("it is important to note that", &["note that", "keep in mind that", "worth saying,"]),
    ("it is worth noting that", &["notably,", "interestingly,", "keep in mind that"]),
    ("in order to", &["to", "so as to"]),
    ("due to the fact that", &["because", "since", "given that"]),
    ("for the purpose of", &["to", "for"]),
    ("with regard to", &["about", "regarding", "when it comes to", "as for"]),
    ("in terms of", &["regarding", "when it comes to", "as for"]),
    ("by means of", &["through", "using", "via"]),
    ("as a result of", &["because of", "due to", "thanks to"]),
    ("in the event that", &["if", "in case"]),
    ("prior to", &["before", "ahead of"]),
    ("subsequent to", &["after", "following"]),
    ("arguably", &["probably", "maybe", "you could say"]),
    ("it could be argued that", &["some would say", "you might say"]),
];

/// The shared rule table (case-insensitive, word-bounded)
pub static PATTERN_TABLE: Lazy<Vec<PatternRule>> = Lazy::new(|| {
    RULES
        .iter()
        .map(|(phrase, alternatives)| PatternRule {
            pattern: Regex::new(&format!(r"(?i)\b(?:{})\b", phrase)).unwrap(),
            alternatives,
        })
        .collect()
});

/// Replace rule matches in `text`.
///
/// Per rule: every match is found in one scan, a uniform draw per match (in
/// match order) decides whether it is replaced, and edits are applied from
/// the highest offset down so earlier offsets stay valid.
pub fn apply<R: Rng + ?Sized>(text: &str, table: &[PatternRule], apply_probability: f64, rng: &mut R) -> String {
    let mut result = text.to_string();

    for rule in table {
        let mut edits: Vec<(usize, usize, String)> = Vec::new();
        for m in rule.pattern.find_iter(&result) {
            if !rng::chance(rng, apply_probability) {
                continue;
            }
            if let Some(choice) = rng::pick(rng, rule.alternatives) {
                edits.push((m.start(), m.end(), match_case(m.as_str(), choice)));
            }
        }

        for (start, end, replacement) in edits.into_iter().rev() {
            result.replace_range(start..end, &replacement);
        }
    }

    result
}

/// Number of rules with at least one match in `text`
pub fn count_matching_rules(text: &str, table: &[PatternRule]) -> usize {
    table.iter().filter(|rule| rule.pattern.is_match(text)).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::seeded;

    #[test]
    fn test_table_size() {
        assert!(PATTERN_TABLE.len() >= 30);
    }

    #[test]
    fn test_probability_one_replaces_everything() {
        let mut rng = seeded(Some(3));
        let out = apply("Moreover, we utilize tools. Furthermore, it works.", &PATTERN_TABLE, 1.0, &mut rng);
        assert!(!out.to_lowercase().contains("moreover"));
        assert!(!out.to_lowercase().contains("utilize"));
        assert!(!out.to_lowercase().contains("furthermore"));
    }

    #[test]
    fn test_probability_zero_is_identity() {
        let mut rng = seeded(Some(3));
        let text = "Moreover, we utilize tools.";
        assert_eq!(apply(text, &PATTERN_TABLE, 0.0, &mut rng), text);
    }

    #[test]
    fn test_capitalization_preserved() {
        let mut rng = seeded(Some(11));
        let out = apply("However, it rained.", &PATTERN_TABLE, 1.0, &mut rng);
        let first = out.chars().next().unwrap();
        assert!(first.is_uppercase(), "got {out}");
    }

    #[test]
    fn test_word_boundaries_respected() {
        let mut rng = seeded(Some(5));
        // "robustness" must not be touched by the "robust" rule
        let text = "The robustness of the system matters.";
        assert_eq!(apply(text, &PATTERN_TABLE, 1.0, &mut rng), text);
    }

    #[test]
    fn test_back_to_front_multiple_matches() {
        let mut rng = seeded(Some(9));
        let out = apply("utilize this, utilize that, utilize more", &PATTERN_TABLE, 1.0, &mut rng);
        assert!(!out.contains("utilize"));
        assert!(out.contains("this,") && out.contains("that,") && out.ends_with("more"));
    }

    fn rule(phrase: &str, alternatives: &'static [&'static str]) -> PatternRule {
        PatternRule {
            pattern: Regex::new(&format!(r"(?i)\b(?:{})\b", phrase)).unwrap(),
            alternatives,
        }
    }

    #[test]
    fn test_later_rules_see_earlier_output() {
        let text = "It is important to note that the plan works.";
        let hedge = || rule("it is important to note that", &["keep in mind that"]);
        let reminder = || rule("keep in mind", &["remember"]);

        let mut rng = seeded(Some(1));
        let forward = apply(text, &[hedge(), reminder()], 1.0, &mut rng);
        assert_eq!(forward, "Remember that the plan works.");

        let mut rng = seeded(Some(1));
        let reversed = apply(text, &[reminder(), hedge()], 1.0, &mut rng);
        assert_eq!(reversed, "Keep in mind that the plan works.");
    }

    #[test]
    fn test_rule_does_not_rescan_its_own_output() {
        let mut rng = seeded(Some(2));
        let out = apply("use it", &[rule("use", &["use and reuse"])], 1.0, &mut rng);
        assert_eq!(out, "use and reuse it");
    }

    #[test]
    fn test_count_matching_rules() {
        assert_eq!(count_matching_rules("Moreover, we utilize it.", &PATTERN_TABLE), 2);
        assert_eq!(count_matching_rules("Plain words only.", &PATTERN_TABLE), 0);
    }
}
