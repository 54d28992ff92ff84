//! Sentence restructuring strategies
//!
//! Each strategy returns `None` when it does not apply. `restructure` wraps
//! the chosen strategy so the caller always gets a usable sentence back: a
//! result that is empty or shorter than three words is discarded in favour of
//! the input.

use crate::preserve::is_protected;
use crate::rng;
use crate::text::{capitalize_first, lowercase_first, split_terminal, word_count, Document};
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use tracing::debug;

/// Sentences must have more words than this to be restructured
pub const MIN_ELIGIBLE_WORDS: usize = 8;
/// Compound splitting needs a longer sentence
const MIN_SPLIT_WORDS: usize = 15;
const MIN_RESULT_WORDS: usize = 3;

static LEADING_CLAUSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(although|while|since|because|when|if|once)\s+([^,]+),\s*(.+)$").unwrap()
});
static TRAILING_CLAUSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(.+?),?\s+(because|since|although|while|whenever)\s+(.+)$").unwrap()
});
static PASSIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^((?:the|a|an|this|that|these|those|our|their|its)\s+)?(\w+)\s+(?:is|are|was|were|has been|have been)\s+(\w+ed|shown|seen|made|done|taken|given|found|written|known|built)\s+by\s+([^,.;:!?]+?)(\s*[,;:].*)?$",
    )
    .unwrap()
});
static IT_IS_THAT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^it is (\w+) that (.+)$").unwrap());

const INTERJECTIONS: &[&str] = &[", you know,", ", I mean,", ", basically,", ", actually,", ", really,", ", honestly,"];

/// (conjunction as written in the sentence, connectors that may replace it)
const COMPOUND_SPLITS: &[(&str, &[&str])] = &[
    (", and ", &["Also,", "Plus,", "On top of that,", "And"]),
    (", but ", &["But", "Still,", "That said,"]),
    (", so ", &["So", "Because of that,"]),
    (", yet ", &["Yet", "Even so,"]),
    (", or ", &["Or", "Then again,"]),
    ("; however, ", &["But", "Still,", "That said,"]),
    ("; moreover, ", &["Also,", "Plus,", "What's more,"]),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    MoveClause,
    SplitCompound,
    ActiveVoice,
    Interjection,
    Emphasis,
}

impl Strategy {
    pub const ALL: [Strategy; 5] = [
        Strategy::MoveClause,
        Strategy::SplitCompound,
        Strategy::ActiveVoice,
        Strategy::Interjection,
        Strategy::Emphasis,
    ];

    fn apply<R: Rng + ?Sized>(&self, sentence: &str, rng: &mut R) -> Option<String> {
        match self {
            Strategy::MoveClause => move_clause(sentence),
            Strategy::SplitCompound => split_compound(sentence, rng),
            Strategy::ActiveVoice => passive_to_active(sentence),
            Strategy::Interjection => insert_interjection(sentence, rng),
            Strategy::Emphasis => emphasize(sentence),
        }
    }
}

/// Restructure one sentence with a randomly chosen strategy
pub fn restructure<R: Rng + ?Sized>(sentence: &str, rng: &mut R) -> String {
    let strategy = Strategy::ALL[rng::index(rng, Strategy::ALL.len())];
    restructure_with(strategy, sentence, rng)
}

/// Apply a specific strategy, falling back to the input when it does not fit
pub fn restructure_with<R: Rng + ?Sized>(strategy: Strategy, sentence: &str, rng: &mut R) -> String {
    match strategy.apply(sentence, rng) {
        Some(result) if !result.trim().is_empty() && word_count(&result) >= MIN_RESULT_WORDS => result,
        Some(_) => {
            debug!("Strategy {:?} produced a degenerate sentence; keeping original", strategy);
            sentence.to_string()
        }
        None => sentence.to_string(),
    }
}

/// Restructure eligible, unprotected sentences in place
pub fn restructure_document<R: Rng + ?Sized>(doc: &mut Document, probability: f64, rng: &mut R) {
    for sentence in doc.sentences_mut() {
        if is_protected(sentence) || word_count(sentence) <= MIN_ELIGIBLE_WORDS {
            continue;
        }
        if rng::chance(rng, probability) {
            *sentence = restructure(sentence, rng);
        }
    }
}

fn terminal_or_period(punct: &str) -> &str {
    if punct.is_empty() {
        "."
    } else {
        punct
    }
}

/// "Although X, Y." ⇄ "Y, although X." / "Y because X." → "Because X, Y."
fn move_clause(sentence: &str) -> Option<String> {
    let (body, punct) = split_terminal(sentence);
    let punct = terminal_or_period(punct);

    if let Some(caps) = LEADING_CLAUSE.captures(body) {
        let conj = caps[1].to_lowercase();
        let clause = caps[2].trim();
        let main = caps[3].trim();
        return Some(format!("{}, {} {}{}", capitalize_first(main), conj, clause, punct));
    }

    if let Some(caps) = TRAILING_CLAUSE.captures(body) {
        let main = caps[1].trim();
        let conj = &caps[2];
        let clause = caps[3].trim();
        if word_count(main) < 2 {
            return None;
        }
        return Some(format!("{} {}, {}{}", capitalize_first(&conj.to_lowercase()), clause, lowercase_first(main), punct));
    }

    None
}

/// Split at the first coordinating conjunction of a long sentence
fn split_compound<R: Rng + ?Sized>(sentence: &str, rng: &mut R) -> Option<String> {
    if word_count(sentence) <= MIN_SPLIT_WORDS {
        return None;
    }

    for (conj, connectors) in COMPOUND_SPLITS {
        let Some(pos) = sentence.find(conj) else {
            continue;
        };
        let first = sentence[..pos].trim();
        let second = sentence[pos + conj.len()..].trim();
        if word_count(first) <= 3 || word_count(second) <= 3 {
            continue;
        }
        let connector = rng::pick(rng, *connectors).copied().unwrap_or("Also,");
        let first = if first.ends_with(['.', '!', '?']) { first.to_string() } else { format!("{}.", first) };
        return Some(format!("{} {} {}", first, connector, lowercase_first(second)));
    }

    None
}

/// "The data was analyzed by the team." → "The team analyzed the data."
fn passive_to_active(sentence: &str) -> Option<String> {
    let (body, punct) = split_terminal(sentence);
    let punct = terminal_or_period(punct);
    let caps = PASSIVE.captures(body)?;

    let determiner = caps.get(1).map(|m| m.as_str().to_lowercase()).unwrap_or_default();
    let patient = &caps[2];
    let verb = caps[3].to_lowercase();
    let agent = caps[4].trim();
    let rest = caps.get(5).map(|m| m.as_str()).unwrap_or("");

    if agent.is_empty() {
        return None;
    }

    let patient = if determiner.is_empty() { lowercase_first(patient) } else { format!("{}{}", determiner, patient) };
    Some(format!("{} {} {}{}{}", capitalize_first(agent), verb, patient, rest, punct))
}

/// Drop a casual aside right after the first comma
fn insert_interjection<R: Rng + ?Sized>(sentence: &str, rng: &mut R) -> Option<String> {
    let pos = sentence.find(',')?;
    let aside = rng::pick(rng, INTERJECTIONS)?;
    Some(format!("{}{}{}", &sentence[..pos], aside, &sentence[pos + 1..]))
}

/// "It is clear that X." → "What's clear is that X."
fn emphasize(sentence: &str) -> Option<String> {
    let caps = IT_IS_THAT.captures(sentence)?;
    Some(format!("What's {} is that {}", caps[1].to_lowercase(), &caps[2]))
}
