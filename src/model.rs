//! Analysis-batch input model
//!
//! The shape of one logical analysis result as produced by the external
//! analysis step: extracted questions, answers, and notes. These types are
//! the wire format (camelCase JSON) and the in-memory form the upsert
//! engine consumes; the engine never mutates them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The three kinds of authored contribution, partitioned by id prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContributionKind {
    Question,
    Answer,
    Note,
}

impl ContributionKind {
    /// Id prefix for this kind (`q_`, `a_`, `n_`).
    pub fn prefix(&self) -> &'static str {
        match self {
            ContributionKind::Question => "q_",
            ContributionKind::Answer => "a_",
            ContributionKind::Note => "n_",
        }
    }

    /// Flat vault directory holding documents of this kind.
    pub fn dir_name(&self) -> &'static str {
        match self {
            ContributionKind::Question => "questions",
            ContributionKind::Answer => "answers",
            ContributionKind::Note => "notes",
        }
    }

    /// Classify an id by its kind prefix.
    pub fn kind_of(id: &str) -> Option<ContributionKind> {
        if id.starts_with("q_") {
            Some(ContributionKind::Question)
        } else if id.starts_with("a_") {
            Some(ContributionKind::Answer)
        } else if id.starts_with("n_") {
            Some(ContributionKind::Note)
        } else {
            None
        }
    }

    pub fn all() -> [ContributionKind; 3] {
        [
            ContributionKind::Question,
            ContributionKind::Answer,
            ContributionKind::Note,
        ]
    }
}

impl std::fmt::Display for ContributionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ContributionKind::Question => "question",
            ContributionKind::Answer => "answer",
            ContributionKind::Note => "note",
        };
        write!(f, "{}", s)
    }
}

/// A titled external reference attached to a contribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub title: String,
    pub url: String,
}

/// A question extracted from source material.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    /// Unique kind-prefixed id (`q_0001`).
    pub id: String,
    pub author: String,
    pub date: DateTime<Utc>,
    /// Broad knowledge domain. Contributions without one are never persisted.
    #[serde(default)]
    pub area: Option<String>,
    /// Titles of the topics this question belongs to. May be empty.
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub text: String,
    #[serde(default)]
    pub links: Vec<Link>,
    /// Id of the accepted answer, when the analysis step identified one.
    #[serde(default)]
    pub answered_by: Option<String>,
}

/// An answer extracted from source material.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    /// Unique kind-prefixed id (`a_0001`).
    pub id: String,
    pub author: String,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub area: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub text: String,
    #[serde(default)]
    pub links: Vec<Link>,
    /// Id of the question this answers, when known.
    #[serde(default)]
    pub answers_question: Option<String>,
    /// Quality score assigned by the analysis step. Metadata only; never
    /// used for ordering.
    #[serde(default)]
    pub quality: f64,
}

/// A standalone note extracted from source material.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// Unique kind-prefixed id (`n_0001`).
    pub id: String,
    pub author: String,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub area: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub text: String,
    #[serde(default)]
    pub links: Vec<Link>,
}

/// One logical analysis batch: everything the analysis step extracted from
/// a single sync of one source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(default)]
    pub answers: Vec<Answer>,
    #[serde(default)]
    pub notes: Vec<Note>,
}

impl AnalysisResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty() && self.answers.is_empty() && self.notes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.questions.len() + self.answers.len() + self.notes.len()
    }

    /// All contributions in the batch, questions first, as trait objects.
    pub fn contributions(&self) -> impl Iterator<Item = &dyn Contribution> {
        self.questions
            .iter()
            .map(|q| q as &dyn Contribution)
            .chain(self.answers.iter().map(|a| a as &dyn Contribution))
            .chain(self.notes.iter().map(|n| n as &dyn Contribution))
    }
}

/// Shared accessors over the three contribution kinds, so the engine can
/// filter, group, and render them uniformly.
pub trait Contribution {
    fn id(&self) -> &str;
    fn author(&self) -> &str;
    fn date(&self) -> DateTime<Utc>;
    fn area(&self) -> Option<&str>;
    fn topics(&self) -> &[String];
    fn tags(&self) -> &[String];
    fn text(&self) -> &str;
    fn links(&self) -> &[Link];
    fn kind(&self) -> ContributionKind;

    /// True when the contribution carries a usable (non-empty) area.
    fn has_area(&self) -> bool {
        self.area().map(|a| !a.trim().is_empty()).unwrap_or(false)
    }
}

macro_rules! impl_contribution {
    ($ty:ty, $kind:expr) => {
        impl Contribution for $ty {
            fn id(&self) -> &str {
                &self.id
            }
            fn author(&self) -> &str {
                &self.author
            }
            fn date(&self) -> DateTime<Utc> {
                self.date
            }
            fn area(&self) -> Option<&str> {
                self.area.as_deref()
            }
            fn topics(&self) -> &[String] {
                &self.topics
            }
            fn tags(&self) -> &[String] {
                &self.tags
            }
            fn text(&self) -> &str {
                &self.text
            }
            fn links(&self) -> &[Link] {
                &self.links
            }
            fn kind(&self) -> ContributionKind {
                $kind
            }
        }
    };
}

impl_contribution!(Question, ContributionKind::Question);
impl_contribution!(Answer, ContributionKind::Answer);
impl_contribution!(Note, ContributionKind::Note);
