//! Style injection: tone starters, intensifiers, contractions, formality
//! swaps, idioms and length adjustment, plus the human-quirk and polish
//! passes that run after it.

use crate::preserve::is_protected;
use crate::rng;
use crate::text::{capitalize_first, lowercase_first, match_case, split_terminal, word_count, Document};
use crate::types::{Configuration, Tone};
use once_cell::sync::Lazy;
use rand::Rng;
use regex::{Captures, Regex};

const STARTER_PROBABILITY: f64 = 0.3;
const INTENSIFIER_PROBABILITY: f64 = 0.2;
const IDIOM_SCALE: f64 = 0.3;
const IDIOM_MIN_WORDS: usize = 5;
const CONTRACT_BELOW: f64 = 0.4;
const EXPAND_ABOVE: f64 = 0.7;
const FORMAL_SWAP_ABOVE: f64 = 0.7;
const INFORMAL_SWAP_BELOW: f64 = 0.3;
const CONCISE_ABOVE: f64 = 0.7;
const VERBOSE_BELOW: f64 = 0.3;
const HEDGE_DROP_PROBABILITY: f64 = 0.5;

const QUIRK_FORMALITY_CEILING: f64 = 0.4;
const TYPO_FORMALITY_CEILING: f64 = 0.3;
const FILLER_PROBABILITY: f64 = 0.03;
const RUN_ON_PROBABILITY: f64 = 0.03;
const TYPO_PROBABILITY: f64 = 0.02;
const RUN_ON_MAX_WORDS: usize = 10;

/// Per-tone phrase tables. An empty starter means "no starter".
pub struct ToneProfile {
    pub starters: &'static [&'static str],
    pub intensifiers: &'static [&'static str],
    pub idioms: &'static [&'static str],
}

static NEUTRAL: ToneProfile = ToneProfile {
    starters: &["", "Also, ", "In fact, ", "Of course, ", "Still, "],
    intensifiers: &[],
    idioms: &["in a nutshell", "by and large", "at the end of the day", "more often than not"],
};

static CASUAL: ToneProfile = ToneProfile {
    starters: &["Well, ", "So, ", "You know, ", "Actually, ", "Honestly, "],
    intensifiers: &["really", "pretty", "quite", "super", "totally"],
    idioms: &[
        "a piece of cake",
        "hit the nail on the head",
        "once in a blue moon",
        "the ball is in your court",
        "cut to the chase",
        "get the ball rolling",
        "in a nutshell",
    ],
};

static FORMAL: ToneProfile = ToneProfile {
    starters: &["", "Indeed, ", "Notably, ", "In particular, ", "Accordingly, "],
    intensifiers: &[],
    idioms: &["on balance", "all things considered", "in the long run", "by and large"],
};

static PERSUASIVE: ToneProfile = ToneProfile {
    starters: &["Clearly, ", "Obviously, ", "Without doubt, ", "It's evident that "],
    intensifiers: &["absolutely", "certainly", "undoubtedly", "definitely"],
    idioms: &["make no mistake", "the writing is on the wall", "at the end of the day", "the bottom line is"],
};

static ACADEMIC: ToneProfile = ToneProfile {
    starters: &["", "Research indicates that ", "Studies suggest that ", "It has been observed that "],
    intensifiers: &[],
    idioms: &["on balance", "in the long run", "for the most part"],
};

impl ToneProfile {
    pub fn for_tone(tone: Tone) -> &'static ToneProfile {
        match tone {
            Tone::Neutral => &NEUTRAL,
            Tone::Casual => &CASUAL,
            Tone::Formal => &FORMAL,
            Tone::Persuasive => &PERSUASIVE,
            Tone::Academic => &ACADEMIC,
        }
    }
}

/// (expanded, contracted), both directions
pub const CONTRACTIONS: &[(&str, &str)] = &[
    ("are not", "aren't"),
    ("cannot", "can't"),
    ("could not", "couldn't"),
    ("did not", "didn't"),
    ("do not", "don't"),
    ("does not", "doesn't"),
    ("had not", "hadn't"),
    ("has not", "hasn't"),
    ("have not", "haven't"),
    ("he is", "he's"),
    ("he will", "he'll"),
    ("he would", "he'd"),
    ("I am", "I'm"),
    ("I have", "I've"),
    ("I will", "I'll"),
    ("I would", "I'd"),
    ("is not", "isn't"),
    ("it is", "it's"),
    ("it will", "it'll"),
    ("she is", "she's"),
    ("she will", "she'll"),
    ("she would", "she'd"),
    ("should not", "shouldn't"),
    ("that is", "that's"),
    ("they are", "they're"),
    ("they have", "they've"),
    ("they will", "they'll"),
    ("was not", "wasn't"),
    ("we are", "we're"),
    ("we have", "we've"),
    ("we will", "we'll"),
    ("were not", "weren't"),
    ("what is", "what's"),
    ("will not", "won't"),
    ("would not", "wouldn't"),
    ("you are", "you're"),
    ("you have", "you've"),
    ("you will", "you'll"),
];

struct ContractionRule {
    expanded: Regex,
    contracted: Regex,
    expanded_text: &'static str,
    contracted_text: &'static str,
}

static CONTRACTION_RULES: Lazy<Vec<ContractionRule>> = Lazy::new(|| {
    CONTRACTIONS
        .iter()
        .map(|(expanded, contracted)| ContractionRule {
            expanded: Regex::new(&format!(r"(?i)\b{}\b", expanded.replace(' ', r"\s+"))).unwrap(),
            contracted: Regex::new(&format!(r"(?i)\b{}\b", contracted.replace('\'', "['’]"))).unwrap(),
            expanded_text: *expanded,
            contracted_text: *contracted,
        })
        .collect()
});

const INFORMAL_TO_FORMAL: &[(&str, &str)] = &[
    ("kids", "children"),
    ("stuff", "materials"),
    ("things", "items"),
    ("a lot of", "numerous"),
    ("get", "obtain"),
    ("give", "provide"),
    ("help", "assist"),
    ("need", "require"),
    ("want", "desire"),
    ("think", "believe"),
];

const FORMAL_TO_INFORMAL: &[(&str, &str)] = &[
    ("children", "kids"),
    ("obtain", "get"),
    ("provide", "give"),
    ("assist", "help"),
    ("require", "need"),
    ("numerous", "a lot of"),
    ("utilize", "use"),
    ("commence", "start"),
    ("terminate", "end"),
];

static FORMAL_SWAPS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| compile_swaps(INFORMAL_TO_FORMAL));
static INFORMAL_SWAPS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| compile_swaps(FORMAL_TO_INFORMAL));

fn compile_swaps(table: &'static [(&'static str, &'static str)]) -> Vec<(Regex, &'static str)> {
    table
        .iter()
        .map(|(from, to)| (Regex::new(&format!(r"(?i)\b{}\b", from)).unwrap(), *to))
        .collect()
}

const HEDGES: &[&str] = &["really", "very", "quite", "rather", "somewhat", "basically", "actually", "just", "fairly"];
const DESCRIPTORS: &[&str] = &["quite", "rather", "somewhat", "particularly", "especially"];

const COMMON_ADJECTIVES: &[&str] = &[
    "good", "bad", "great", "big", "small", "new", "old", "important", "clear", "hard", "easy",
    "simple", "strong", "weak", "fast", "slow", "high", "low", "common", "different", "likely",
    "complex", "significant", "difficult", "obvious", "large", "useful", "major",
];
const ADJECTIVE_SUFFIXES: &[&str] = &["ful", "ous", "ive", "able", "ible", "less", "ical"];

const FILLERS: &[&str] = &["you know", "I mean", "kind of", "sort of", "basically", "actually", "pretty much"];

static TYPO_TARGET: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(the|and|that|with|have|their)\b").unwrap());
const TYPOS: &[(&str, &str)] = &[
    ("the", "teh"),
    ("and", "adn"),
    ("that", "taht"),
    ("with", "wiht"),
    ("have", "ahve"),
    ("their", "thier"),
];

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static SPACE_BEFORE_PUNCT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+([,.!?;:])").unwrap());
static DOUBLED_COMMA: Lazy<Regex> = Lazy::new(|| Regex::new(r",(?:\s*,)+").unwrap());
static COMMA_BEFORE_END: Lazy<Regex> = Lazy::new(|| Regex::new(r",+([.!?])").unwrap());

/// Contract every expanded form in the table
pub fn contract(text: &str) -> String {
    let mut result = text.to_string();
    for rule in CONTRACTION_RULES.iter() {
        result = rule
            .expanded
            .replace_all(&result, |caps: &Captures| match_case(&caps[0], rule.contracted_text))
            .into_owned();
    }
    result
}

/// Expand every contracted form in the table (straight or curly apostrophe)
pub fn expand(text: &str) -> String {
    let mut result = text.to_string();
    for rule in CONTRACTION_RULES.iter() {
        result = rule
            .contracted
            .replace_all(&result, |caps: &Captures| match_case(&caps[0], rule.expanded_text))
            .into_owned();
    }
    result
}

/// Informal → formal above 0.7, formal → informal below 0.3
pub fn swap_formality(sentence: &str, formality: f64) -> String {
    let swaps = if formality > FORMAL_SWAP_ABOVE {
        &*FORMAL_SWAPS
    } else if formality < INFORMAL_SWAP_BELOW {
        &*INFORMAL_SWAPS
    } else {
        return sentence.to_string();
    };

    let mut result = sentence.to_string();
    for (pattern, replacement) in swaps {
        result = pattern
            .replace_all(&result, |caps: &Captures| match_case(&caps[0], replacement))
            .into_owned();
    }
    result
}

fn bare_lower(word: &str) -> String {
    word.trim_matches(|c: char| !c.is_alphabetic()).to_lowercase()
}

fn is_adjective_like(word: &str) -> bool {
    // Attached punctuation means the word closes a clause; leave it alone
    if word.ends_with(|c: char| !c.is_alphabetic()) {
        return false;
    }
    let bare = bare_lower(word);
    COMMON_ADJECTIVES.contains(&bare.as_str())
        || (bare.chars().count() > 5 && ADJECTIVE_SUFFIXES.iter().any(|s| bare.ends_with(s)))
}

/// First adjective-like word after position 0 not already modified
fn modifier_slot(words: &[&str]) -> Option<usize> {
    (1..words.len()).find(|&i| {
        let prev = bare_lower(words[i - 1]);
        is_adjective_like(words[i]) && !HEDGES.contains(&prev.as_str()) && !DESCRIPTORS.contains(&prev.as_str())
    })
}

fn insert_word(words: &[&str], at: usize, word: &str) -> String {
    let mut out: Vec<&str> = Vec::with_capacity(words.len() + 1);
    out.extend_from_slice(&words[..at]);
    out.push(word);
    out.extend_from_slice(&words[at..]);
    out.join(" ")
}

/// Insert `, aside,` before word `at` (1 ≤ at < len)
fn insert_aside(words: &[&str], at: usize, aside: &str) -> String {
    let left = words[..at].join(" ");
    let left = left.trim_end_matches(',');
    format!("{}, {}, {}", left, aside, words[at..].join(" "))
}

pub fn add_starter<R: Rng + ?Sized>(sentence: &str, starters: &[&str], rng: &mut R) -> String {
    let Some(starter) = rng::pick(rng, starters) else {
        return sentence.to_string();
    };
    let trimmed = starter.trim();
    if trimmed.is_empty() || sentence.to_lowercase().starts_with(&trimmed.to_lowercase()) {
        return sentence.to_string();
    }
    format!("{}{}", starter, lowercase_first(sentence))
}

pub fn add_intensifier<R: Rng + ?Sized>(sentence: &str, intensifiers: &[&str], rng: &mut R) -> String {
    let words: Vec<&str> = sentence.split_whitespace().collect();
    let (Some(slot), Some(intensifier)) = (modifier_slot(&words), rng::pick(rng, intensifiers)) else {
        return sentence.to_string();
    };
    insert_word(&words, slot, intensifier)
}

pub fn insert_idiom<R: Rng + ?Sized>(sentence: &str, idioms: &[&str], rng: &mut R) -> String {
    let words: Vec<&str> = sentence.split_whitespace().collect();
    if words.len() <= IDIOM_MIN_WORDS {
        return sentence.to_string();
    }
    let Some(idiom) = rng::pick(rng, idioms) else {
        return sentence.to_string();
    };
    let at = 1 + rng::index(rng, words.len() - 1);
    insert_aside(&words, at, idiom)
}

/// Drop hedging adverbs (concise) or add a descriptor (verbose)
pub fn adjust_length<R: Rng + ?Sized>(sentence: &str, conciseness: f64, rng: &mut R) -> String {
    let words: Vec<&str> = sentence.split_whitespace().collect();

    if conciseness > CONCISE_ABOVE {
        let mut kept: Vec<&str> = Vec::with_capacity(words.len());
        for (i, word) in words.iter().enumerate() {
            let droppable = i > 0 && HEDGES.contains(&word.to_lowercase().as_str());
            if droppable && rng::chance(rng, HEDGE_DROP_PROBABILITY) {
                continue;
            }
            kept.push(*word);
        }
        if kept.len() < 3 {
            return sentence.to_string();
        }
        return kept.join(" ");
    }

    if conciseness < VERBOSE_BELOW {
        if let (Some(slot), Some(descriptor)) = (modifier_slot(&words), rng::pick(rng, DESCRIPTORS)) {
            return insert_word(&words, slot, descriptor);
        }
    }

    sentence.to_string()
}

/// The style-injection pass over every unprotected sentence
pub fn inject<R: Rng + ?Sized>(doc: &mut Document, cfg: &Configuration, rng: &mut R) {
    let profile = ToneProfile::for_tone(cfg.tone);
    let intensity = cfg.intensity();

    for (index, sentence) in doc.sentences_mut().enumerate() {
        if is_protected(sentence) {
            continue;
        }
        let mut s = sentence.clone();

        if rng::chance(rng, cfg.burstiness) {
            s = adjust_length(&s, cfg.conciseness, rng);
        }
        if index == 0 || rng::chance(rng, STARTER_PROBABILITY) {
            s = add_starter(&s, profile.starters, rng);
        }
        if !profile.intensifiers.is_empty() && rng::chance(rng, INTENSIFIER_PROBABILITY) {
            s = add_intensifier(&s, profile.intensifiers, rng);
        }
        if cfg.formality < CONTRACT_BELOW {
            if rng::chance(rng, intensity.contraction_probability()) {
                s = contract(&s);
            }
        } else if cfg.formality > EXPAND_ABOVE {
            s = expand(&s);
        }
        if word_count(&s) > IDIOM_MIN_WORDS && rng::chance(rng, cfg.idiom_density * IDIOM_SCALE) {
            s = insert_idiom(&s, profile.idioms, rng);
        }
        s = swap_formality(&s, cfg.formality);

        *sentence = s;
    }
}

/// Replace the first common word with its usual misspelling
pub fn introduce_typo(sentence: &str) -> String {
    let Some(m) = TYPO_TARGET.find(sentence) else {
        return sentence.to_string();
    };
    let lower = m.as_str().to_lowercase();
    let Some((_, typo)) = TYPOS.iter().find(|(word, _)| *word == lower) else {
        return sentence.to_string();
    };
    format!("{}{}{}", &sentence[..m.start()], match_case(m.as_str(), typo), &sentence[m.end()..])
}

/// Join short adjacent unprotected sentences with a comma
pub fn merge_run_ons<R: Rng + ?Sized>(paragraph: &mut Vec<String>, probability: f64, rng: &mut R) {
    let mut merged: Vec<String> = Vec::with_capacity(paragraph.len());
    let mut i = 0;
    while i < paragraph.len() {
        let current = &paragraph[i];
        let eligible = i + 1 < paragraph.len()
            && current.ends_with('.')
            && !is_protected(current)
            && !is_protected(&paragraph[i + 1])
            && word_count(current) < RUN_ON_MAX_WORDS
            && word_count(&paragraph[i + 1]) < RUN_ON_MAX_WORDS;

        if eligible && rng::chance(rng, probability) {
            let (body, _) = split_terminal(current);
            merged.push(format!("{}, {}", body, lowercase_first(&paragraph[i + 1])));
            i += 2;
        } else {
            merged.push(current.clone());
            i += 1;
        }
    }
    *paragraph = merged;
}

/// The human-quirks pass: rare fillers, run-ons and typos, informal text only
pub fn inject_quirks<R: Rng + ?Sized>(doc: &mut Document, formality: f64, rng: &mut R) {
    if formality >= QUIRK_FORMALITY_CEILING {
        return;
    }

    for sentence in doc.sentences_mut() {
        if is_protected(sentence) {
            continue;
        }
        let words: Vec<&str> = sentence.split_whitespace().collect();
        let mut s = sentence.clone();
        if words.len() > 5 && rng::chance(rng, FILLER_PROBABILITY) {
            if let Some(filler) = rng::pick(rng, FILLERS) {
                let at = 2 + rng::index(rng, words.len() - 3);
                s = insert_aside(&words, at, filler);
            }
        }
        if formality < TYPO_FORMALITY_CEILING && rng::chance(rng, TYPO_PROBABILITY) {
            s = introduce_typo(&s);
        }
        *sentence = s;
    }

    for paragraph in doc.paragraphs.iter_mut() {
        merge_run_ons(paragraph, RUN_ON_PROBABILITY, rng);
    }
}

/// Spacing and punctuation cleanup, sentence-initial capitals
pub fn polish(text: &str) -> String {
    let mut doc = Document::parse(text);
    for sentence in doc.sentences_mut() {
        if is_protected(sentence) {
            continue;
        }
        let s = WHITESPACE.replace_all(sentence, " ");
        let s = SPACE_BEFORE_PUNCT.replace_all(&s, "$1");
        let s = DOUBLED_COMMA.replace_all(&s, ",");
        let s = COMMA_BEFORE_END.replace_all(&s, "$1");
        let s = s.trim();
        *sentence = if s.starts_with(char::is_lowercase) { capitalize_first(s) } else { s.to_string() };
    }
    doc.render()
}
