//! Shared fixtures for vault integration tests.
//!
//! Builders produce fully-populated batch contributions with fixed dates
//! so rendered documents are comparable across runs, plus tree snapshot
//! helpers for byte-level comparisons.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, TimeZone, Utc};
use tempfile::TempDir;
use trellis::{AnalysisResult, Answer, Note, Question, Vault};
use walkdir::WalkDir;

pub fn temp_vault() -> (TempDir, Vault) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let vault = Vault::open(dir.path().join("vault")).expect("Failed to open vault");
    (dir, vault)
}

/// A fixed March 2024 timestamp; `day` and `hour` vary per contribution.
pub fn date(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// A question in `area` (empty string means no area).
pub fn question(id: &str, author: &str, area: &str, topics: &[&str], text: &str) -> Question {
    Question {
        id: id.to_string(),
        author: author.to_string(),
        date: date(1, 9),
        area: (!area.is_empty()).then(|| area.to_string()),
        topics: strings(topics),
        tags: Vec::new(),
        text: text.to_string(),
        links: Vec::new(),
        answered_by: None,
    }
}

pub fn answer(
    id: &str,
    author: &str,
    area: &str,
    topics: &[&str],
    question: Option<&str>,
    text: &str,
) -> Answer {
    Answer {
        id: id.to_string(),
        author: author.to_string(),
        date: date(1, 14),
        area: (!area.is_empty()).then(|| area.to_string()),
        topics: strings(topics),
        tags: Vec::new(),
        text: text.to_string(),
        links: Vec::new(),
        answers_question: question.map(|s| s.to_string()),
        quality: 0.8,
    }
}

pub fn note(id: &str, author: &str, area: &str, topics: &[&str], text: &str) -> Note {
    Note {
        id: id.to_string(),
        author: author.to_string(),
        date: date(1, 11),
        area: (!area.is_empty()).then(|| area.to_string()),
        topics: strings(topics),
        tags: Vec::new(),
        text: text.to_string(),
        links: Vec::new(),
    }
}

pub fn batch(questions: Vec<Question>, answers: Vec<Answer>, notes: Vec<Note>) -> AnalysisResult {
    AnalysisResult {
        questions,
        answers,
        notes,
    }
}

/// Relative path -> contents for every file under `root`.
#[allow(dead_code)]
pub fn snapshot(root: &Path) -> BTreeMap<String, String> {
    let mut files = BTreeMap::new();
    for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(root)
            .expect("entry under root")
            .to_string_lossy()
            .to_string();
        let content = std::fs::read_to_string(entry.path()).expect("Failed to read vault file");
        files.insert(rel, content);
    }
    files
}

/// Tree snapshot with wall-clock `created` lines blanked, for comparing
/// vaults written at different instants.
#[allow(dead_code)]
pub fn snapshot_created_normalized(root: &Path) -> BTreeMap<String, String> {
    snapshot(root)
        .into_iter()
        .map(|(path, content)| {
            let kept: Vec<&str> = content
                .lines()
                .filter(|line| !line.starts_with("created: "))
                .collect();
            (path, kept.join("\n"))
        })
        .collect()
}
