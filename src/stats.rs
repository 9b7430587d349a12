//! Vault statistics projection
//!
//! A read-only summary over the final file set: entity counts, per-area
//! and per-month contribution breakdowns, and top contributors. Used by
//! `trellis stats` to give confidence that applies are landing where
//! expected. Never writes into the vault; unreadable documents are
//! skipped the same way the incremental scanner skips them.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::builder::scanner;
use crate::model::ContributionKind;
use crate::vault::{layout, Vault, VaultResult};

/// Aggregated counts over one vault.
#[derive(Debug, Clone, Default)]
pub struct VaultStats {
    pub root: PathBuf,
    pub questions: usize,
    pub answers: usize,
    pub notes: usize,
    pub topics: usize,
    pub areas: usize,
    pub people: usize,
    /// Contribution count per area title, as written in headers.
    pub by_area: BTreeMap<String, usize>,
    /// Contribution count per `YYYY-MM` month of the contribution date.
    pub by_month: BTreeMap<String, usize>,
    /// Authors by contribution count, descending.
    pub contributors: Vec<(String, usize)>,
}

impl VaultStats {
    /// Walk the vault once and derive all counts.
    pub fn collect(vault: &Vault) -> VaultResult<VaultStats> {
        let index = scanner::scan_contributions(vault)?;

        let mut stats = VaultStats {
            root: vault.root().to_path_buf(),
            topics: vault.list_subdirs(layout::TOPICS_DIR)?.len(),
            areas: vault.list_subdirs(layout::AREAS_DIR)?.len(),
            people: vault.list_markdown(layout::PEOPLE_DIR)?.len(),
            ..VaultStats::default()
        };

        let mut per_author: BTreeMap<String, usize> = BTreeMap::new();
        for doc in index.values() {
            match doc.kind {
                ContributionKind::Question => stats.questions += 1,
                ContributionKind::Answer => stats.answers += 1,
                ContributionKind::Note => stats.notes += 1,
            }
            if let Some(area) = &doc.area {
                *stats.by_area.entry(area.clone()).or_default() += 1;
            }
            if let Some(date) = doc.date {
                *stats
                    .by_month
                    .entry(date.format("%Y-%m").to_string())
                    .or_default() += 1;
            }
            if !doc.author.trim().is_empty() {
                *per_author.entry(doc.author.clone()).or_default() += 1;
            }
        }

        stats.contributors = per_author.into_iter().collect();
        stats
            .contributors
            .sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        Ok(stats)
    }

    pub fn contributions(&self) -> usize {
        self.questions + self.answers + self.notes
    }

    /// Print the dashboard to stdout.
    pub fn print(&self) {
        println!("Trellis Vault Stats");
        println!("===================");
        println!();
        println!("  Vault:       {}", self.root.display());
        println!();
        println!("  Questions:   {}", self.questions);
        println!("  Answers:     {}", self.answers);
        println!("  Notes:       {}", self.notes);
        println!("  Topics:      {}", self.topics);
        println!("  Areas:       {}", self.areas);
        println!("  People:      {}", self.people);

        if !self.by_area.is_empty() {
            println!();
            println!("  By area:");
            println!("  {:<32} {:>14}", "AREA", "CONTRIBUTIONS");
            println!("  {}", "-".repeat(47));
            for (area, count) in &self.by_area {
                println!("  {:<32} {:>14}", area, count);
            }
        }

        if !self.by_month.is_empty() {
            println!();
            println!("  By month:");
            for (month, count) in &self.by_month {
                println!("  {:<10} {:>6}", month, count);
            }
        }

        if !self.contributors.is_empty() {
            println!();
            println!("  Top contributors:");
            for (author, count) in self.contributors.iter().take(10) {
                println!("  {:<32} {:>6}", author, count);
            }
        }

        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn contribution(id: &str, author: &str, area: &str, date: &str) -> String {
        format!(
            "---\nid: \"{id}\"\nauthor: \"{author}\"\ndate: \"{date}\"\narea: \"{area}\"\ntopics: [\"Auth\"]\ntags: []\n---\n\nbody\n"
        )
    }

    #[test]
    fn test_collect_counts_everything() {
        let dir = TempDir::new().unwrap();
        let vault = Vault::open(dir.path().join("vault")).unwrap();
        vault
            .write(
                "questions/q_0001.md",
                &contribution("q_0001", "Alice", "Backend", "2024-03-01T12:00:00Z"),
            )
            .unwrap();
        vault
            .write(
                "answers/a_0001.md",
                &contribution("a_0001", "Bob", "Backend", "2024-04-02T08:00:00Z"),
            )
            .unwrap();
        vault
            .write(
                "notes/n_0001.md",
                &contribution("n_0001", "Alice", "Frontend", "2024-04-10T09:30:00Z"),
            )
            .unwrap();
        vault.write("topics/auth/auth.md", "---\ntitle: \"Auth\"\n---\n").unwrap();
        vault
            .write("areas/backend/backend.md", "---\ntitle: \"Backend\"\n---\n")
            .unwrap();
        vault.write("people/Alice.md", "---\nname: \"Alice\"\n---\n").unwrap();

        let stats = VaultStats::collect(&vault).unwrap();
        assert_eq!(stats.questions, 1);
        assert_eq!(stats.answers, 1);
        assert_eq!(stats.notes, 1);
        assert_eq!(stats.contributions(), 3);
        assert_eq!(stats.topics, 1);
        assert_eq!(stats.areas, 1);
        assert_eq!(stats.people, 1);
        assert_eq!(stats.by_area["Backend"], 2);
        assert_eq!(stats.by_area["Frontend"], 1);
        assert_eq!(stats.by_month["2024-03"], 1);
        assert_eq!(stats.by_month["2024-04"], 2);
        assert_eq!(stats.contributors[0], ("Alice".to_string(), 2));
    }

    #[test]
    fn test_collect_empty_vault() {
        let dir = TempDir::new().unwrap();
        let vault = Vault::open(dir.path().join("vault")).unwrap();
        let stats = VaultStats::collect(&vault).unwrap();
        assert_eq!(stats.contributions(), 0);
        assert!(stats.by_area.is_empty());
        stats.print();
    }
}
