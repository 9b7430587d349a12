//! Topic and area aggregation
//!
//! Membership, contributor, and tag state is computed as explicit folds
//! over the batch and the disk index, then combined with pure `union`
//! combinators. Nothing here mutates shared maps while walking files;
//! monotonicity falls out of the set union instead of being re-proved at
//! every call site. All sets are `BTreeSet` so downstream rendering is
//! order-stable.

use std::collections::{BTreeMap, BTreeSet};

use crate::model::{AnalysisResult, ContributionKind};
use crate::vault::{normalize_person_name, slugify};

use super::scanner::{ContributionDoc, ContributionIndex};

/// Everything known about one topic, keyed externally by slug.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TopicAggregate {
    /// Display title. First spelling observed for the slug; on-disk
    /// state is folded before the batch, so persisted spellings win.
    pub title: String,
    pub contributors: BTreeSet<String>,
    pub tags: BTreeSet<String>,
    pub questions: BTreeSet<String>,
    pub answers: BTreeSet<String>,
    pub notes: BTreeSet<String>,
}

impl TopicAggregate {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Monotonic merge: membership and attribution only ever grow.
    pub fn union(mut a: Self, b: Self) -> Self {
        if a.title.is_empty() {
            a.title = b.title;
        }
        a.contributors.extend(b.contributors);
        a.tags.extend(b.tags);
        a.questions.extend(b.questions);
        a.answers.extend(b.answers);
        a.notes.extend(b.notes);
        a
    }

    pub fn member_count(&self) -> usize {
        self.questions.len() + self.answers.len() + self.notes.len()
    }

    fn add(&mut self, id: &str, kind: ContributionKind, author: &str, tags: &[String]) {
        match kind {
            ContributionKind::Question => self.questions.insert(id.to_string()),
            ContributionKind::Answer => self.answers.insert(id.to_string()),
            ContributionKind::Note => self.notes.insert(id.to_string()),
        };
        if !author.trim().is_empty() {
            self.contributors.insert(author.to_string());
        }
        for tag in tags {
            if !tag.trim().is_empty() {
                self.tags.insert(tag.clone());
            }
        }
    }
}

/// Everything known about one area, keyed externally by slug.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AreaAggregate {
    pub title: String,
    pub contributors: BTreeSet<String>,
    /// Topic display titles seen among this area's contributions.
    pub topic_titles: BTreeSet<String>,
}

impl AreaAggregate {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn union(mut a: Self, b: Self) -> Self {
        if a.title.is_empty() {
            a.title = b.title;
        }
        a.contributors.extend(b.contributors);
        a.topic_titles.extend(b.topic_titles);
        a
    }
}

/// Fold a batch into per-topic aggregates, keyed by slug.
pub fn batch_topics(batch: &AnalysisResult) -> BTreeMap<String, TopicAggregate> {
    let mut topics: BTreeMap<String, TopicAggregate> = BTreeMap::new();
    for c in batch.contributions() {
        for title in c.topics() {
            let slug = slugify(title);
            if slug.is_empty() {
                continue;
            }
            topics
                .entry(slug)
                .or_insert_with(|| TopicAggregate::new(title.clone()))
                .add(c.id(), c.kind(), c.author(), c.tags());
        }
    }
    topics
}

/// Fold a batch into per-area aggregates, keyed by slug.
pub fn batch_areas(batch: &AnalysisResult) -> BTreeMap<String, AreaAggregate> {
    let mut areas: BTreeMap<String, AreaAggregate> = BTreeMap::new();
    for c in batch.contributions() {
        let Some(area_title) = c.area() else {
            continue;
        };
        let slug = slugify(area_title);
        if slug.is_empty() {
            continue;
        }
        let area = areas
            .entry(slug)
            .or_insert_with(|| AreaAggregate::new(area_title));
        if !c.author().trim().is_empty() {
            area.contributors.insert(c.author().to_string());
        }
        for title in c.topics() {
            if !title.trim().is_empty() {
                area.topic_titles.insert(title.clone());
            }
        }
    }
    areas
}

/// Fold the persisted contribution index into per-topic aggregates.
pub fn index_topics(index: &ContributionIndex) -> BTreeMap<String, TopicAggregate> {
    let mut topics: BTreeMap<String, TopicAggregate> = BTreeMap::new();
    for doc in index.values() {
        for title in &doc.topics {
            let slug = slugify(title);
            if slug.is_empty() {
                continue;
            }
            topics
                .entry(slug)
                .or_insert_with(|| TopicAggregate::new(title.clone()))
                .add(&doc.id, doc.kind, &doc.author, &doc.tags);
        }
    }
    topics
}

/// Answer→question linkage over the full known set. Global on purpose:
/// classification filters by link target membership per topic, so an
/// answer can resolve a question in a topic it is not itself a member of.
pub fn link_map(index: &ContributionIndex) -> BTreeMap<String, String> {
    let mut links = BTreeMap::new();
    for doc in index.values() {
        if doc.kind != ContributionKind::Answer {
            continue;
        }
        if let Some(q) = &doc.answers_question {
            if !q.trim().is_empty() {
                links.insert(doc.id.clone(), q.clone());
            }
        }
    }
    links
}

/// Union two aggregate maps key-wise. Left side folds first, so pass the
/// disk-derived map as `a` when persisted titles should win.
pub fn union_topic_maps(
    a: BTreeMap<String, TopicAggregate>,
    b: BTreeMap<String, TopicAggregate>,
) -> BTreeMap<String, TopicAggregate> {
    let mut merged = a;
    for (slug, agg) in b {
        match merged.remove(&slug) {
            Some(existing) => {
                merged.insert(slug, TopicAggregate::union(existing, agg));
            }
            None => {
                merged.insert(slug, agg);
            }
        }
    }
    merged
}

/// Docs authored by each person across the full known set, keyed by
/// normalized name (the person identity). Ids are already unique in the
/// index, so each person's list is duplicate-free.
pub fn by_author(index: &ContributionIndex) -> BTreeMap<String, Vec<&ContributionDoc>> {
    let mut authors: BTreeMap<String, Vec<&ContributionDoc>> = BTreeMap::new();
    for doc in index.values() {
        let key = normalize_person_name(&doc.author);
        if key.is_empty() {
            continue;
        }
        authors.entry(key).or_default().push(doc);
    }
    authors
}
