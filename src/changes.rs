//! Sentence-level change records between input and output

use crate::metrics::count_contractions;
use crate::text::{word_count, word_tokens, Document};
use crate::types::{ChangeRecord, ChangeTag};
use std::collections::{BTreeSet, HashSet};

fn dash_count(text: &str) -> usize {
    text.matches('—').count() + text.matches('–').count() + text.matches(" - ").count() + text.matches("--").count()
}

fn ellipsis_count(text: &str) -> usize {
    text.matches("...").count() + text.matches('…').count()
}

/// Tags describing how `rewritten` differs from `original`
pub fn classify(original: &str, rewritten: &str) -> BTreeSet<ChangeTag> {
    let mut tags = BTreeSet::new();

    if word_count(original) != word_count(rewritten) {
        tags.insert(ChangeTag::LengthChanged);
    }

    let before: HashSet<String> = word_tokens(original).into_iter().collect();
    let after: HashSet<String> = word_tokens(rewritten).into_iter().collect();
    if before != after {
        tags.insert(ChangeTag::VocabularyVaried);
    }

    let (c_before, c_after) = (count_contractions(original), count_contractions(rewritten));
    if c_after > c_before {
        tags.insert(ChangeTag::ContractionsAdded);
    } else if c_after < c_before {
        tags.insert(ChangeTag::ContractionsRemoved);
    }

    if ellipsis_count(rewritten) > ellipsis_count(original) {
        tags.insert(ChangeTag::EllipsisAdded);
    }
    if dash_count(rewritten) > dash_count(original) {
        tags.insert(ChangeTag::DashesAdded);
    }

    tags
}

/// One record per changed sentence, pairing sentences by position.
/// After an accepted whole-document rewrite sentence boundaries no longer
/// line up, so a single summary record covers the whole text.
pub fn diff_changes(original: &str, humanized: &str, rewrite_accepted: bool) -> Vec<ChangeRecord> {
    if original == humanized {
        return Vec::new();
    }

    if rewrite_accepted {
        return vec![ChangeRecord {
            position: 0,
            original: original.to_string(),
            rewritten: humanized.to_string(),
            tags: classify(original, humanized),
        }];
    }

    let before: Vec<String> = Document::parse(original).sentences().cloned().collect();
    let after: Vec<String> = Document::parse(humanized).sentences().cloned().collect();
    let len = before.len().max(after.len());

    (0..len)
        .filter_map(|position| {
            let original = before.get(position).cloned().unwrap_or_default();
            let rewritten = after.get(position).cloned().unwrap_or_default();
            if original == rewritten {
                return None;
            }
            let tags = classify(&original, &rewritten);
            Some(ChangeRecord {
                position,
                original,
                rewritten,
                tags,
            })
        })
        .collect()
}
