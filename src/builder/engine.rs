//! Entity upsert engine
//!
//! Applies one analyzed batch against the vault. The sequence per run:
//!
//! 1. Drop contributions without an area; they are never persisted.
//! 2. Scan the persisted contribution index once.
//! 3. Upsert areas touched by the batch, merging each with its own
//!    pre-existing document. Areas are never synthesized from
//!    historical topic data alone.
//! 4. Upsert every known topic from the merged batch+disk aggregates,
//!    rendering the member classification into the generated region.
//!    The source name joins a topic's `sources` only when the batch
//!    actually contributed to it.
//! 5. Write contribution documents. These are immutable creates: a
//!    question embeds the same-batch answers that resolve it, and no
//!    later run rewrites the file.
//! 6. Upsert the people who authored anything in the batch, recomputing
//!    counts and projections from the full known set.
//!
//! A failed write is recorded per entity and never blocks the rest of
//! the run; unreadable prior documents degrade to "no prior data".

use std::collections::{BTreeMap, BTreeSet};

use chrono::{SecondsFormat, Utc};
use tracing::{debug, info, warn};

use crate::model::{AnalysisResult, Answer, Contribution, ContributionKind, Link, Note, Question};
use crate::vault::{
    layout, normalize_person_name, slugify, Block, Document, Frontmatter, Section, Vault,
    VaultResult,
};

use super::aggregate::{self, AreaAggregate, TopicAggregate};
use super::classify::{classify, sort_by_ordinal};
use super::scanner::{self, ContributionDoc, ContributionIndex, ExistingEntity};

/// Per-entity outcome counts for one apply run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    pub areas_written: usize,
    pub topics_written: usize,
    pub questions_written: usize,
    pub answers_written: usize,
    pub notes_written: usize,
    pub people_written: usize,
    pub skipped_no_area: usize,
    pub failures: Vec<String>,
}

impl RunReport {
    pub fn contributions_written(&self) -> usize {
        self.questions_written + self.answers_written + self.notes_written
    }

    pub fn summary(&self) -> String {
        format!(
            "{} areas, {} topics, {} contributions, {} people written ({} skipped without area, {} failed)",
            self.areas_written,
            self.topics_written,
            self.contributions_written(),
            self.people_written,
            self.skipped_no_area,
            self.failures.len()
        )
    }

    fn fail(&mut self, entity: &str, key: &str, error: crate::vault::VaultError) {
        warn!("Failed to write {} '{}': {}", entity, key, error);
        self.failures.push(format!("{entity} {key}: {error}"));
    }
}

/// The incremental document-graph builder.
pub struct UpsertEngine<'a> {
    vault: &'a Vault,
}

impl<'a> UpsertEngine<'a> {
    pub fn new(vault: &'a Vault) -> Self {
        Self { vault }
    }

    /// Apply one batch from `source_name`, returning per-entity counts.
    ///
    /// Only vault-level failures (the initial directory scan) abort the
    /// run; entity-level failures are collected in the report.
    pub fn apply(&self, batch: &AnalysisResult, source_name: &str) -> VaultResult<RunReport> {
        let mut report = RunReport::default();
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);

        // Step 1: area gating.
        let batch = filter_batch(batch, &mut report);

        // Step 2: one scan; everything incremental derives from it.
        let disk_index = scanner::scan_contributions(self.vault)?;
        let mut full_index = disk_index.clone();
        for q in &batch.questions {
            full_index.insert(q.id.clone(), ContributionDoc::from_question(q));
        }
        for a in &batch.answers {
            full_index.insert(a.id.clone(), ContributionDoc::from_answer(a));
        }
        for n in &batch.notes {
            full_index.insert(n.id.clone(), ContributionDoc::from_note(n));
        }
        let links = aggregate::link_map(&full_index);

        // Step 3: areas, from the batch only.
        for (slug, agg) in aggregate::batch_areas(&batch) {
            match self.write_area(&slug, &agg, source_name, &now) {
                Ok(()) => report.areas_written += 1,
                Err(e) => report.fail("area", &slug, e),
            }
        }

        // Step 4: every known topic, merged disk-first so persisted
        // titles keep naming their slug.
        let batch_map = aggregate::batch_topics(&batch);
        let batch_slugs: BTreeSet<String> = batch_map.keys().cloned().collect();
        let merged = aggregate::union_topic_maps(aggregate::index_topics(&disk_index), batch_map);
        for (slug, agg) in &merged {
            let in_batch = batch_slugs.contains(slug);
            match self.write_topic(slug, agg, &links, in_batch, source_name, &now) {
                Ok(()) => report.topics_written += 1,
                Err(e) => report.fail("topic", slug, e),
            }
        }

        // Step 5: contribution files.
        for q in &batch.questions {
            let mut answer_ids: Vec<String> = batch
                .answers
                .iter()
                .filter(|a| a.answers_question.as_deref() == Some(q.id.as_str()))
                .map(|a| a.id.clone())
                .collect();
            sort_by_ordinal(&mut answer_ids);
            match self.write_question(q, &answer_ids) {
                Ok(()) => report.questions_written += 1,
                Err(e) => report.fail("question", &q.id, e),
            }
        }
        for a in &batch.answers {
            match self.write_answer(a) {
                Ok(()) => report.answers_written += 1,
                Err(e) => report.fail("answer", &a.id, e),
            }
        }
        for n in &batch.notes {
            match self.write_note(n) {
                Ok(()) => report.notes_written += 1,
                Err(e) => report.fail("note", &n.id, e),
            }
        }

        // Step 6: people.
        self.upsert_people(&batch, &full_index, &merged, source_name, &mut report);

        info!("Applied batch from '{}': {}", source_name, report.summary());
        Ok(report)
    }

    fn write_area(
        &self,
        slug: &str,
        agg: &AreaAggregate,
        source: &str,
        now: &str,
    ) -> VaultResult<()> {
        let rel = layout::area_doc(slug);
        let existing = self.read_entity(&rel);

        let prior = AreaAggregate {
            title: existing
                .title
                .clone()
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_default(),
            contributors: existing.contributors.clone(),
            topic_titles: existing.topics.iter().cloned().collect(),
        };
        let merged = AreaAggregate::union(prior, agg.clone());
        let mut sources = existing.sources.clone();
        // Areas are only upserted when the batch contributed to them.
        sources.insert(source.to_string());
        let created = existing.created.clone().unwrap_or_else(|| now.to_string());

        let mut fm = Frontmatter::new();
        fm.push_str("title", &merged.title);
        fm.push_str("created", &created);
        fm.push_list("sources", sources);
        fm.push_list("contributors", merged.contributors.iter().cloned());

        let mut doc =
            self.shell_or_scaffold(&rel, fm, &merged.title, &layout::area_description_target(slug))?;
        let mut blocks = Vec::new();
        if !merged.topic_titles.is_empty() {
            blocks.push(Block::Heading("Topics".to_string()));
            for topic_title in &merged.topic_titles {
                blocks.push(Block::Link {
                    target: slugify(topic_title),
                    label: topic_title.clone(),
                });
            }
        }
        doc.set_generated(blocks);

        self.vault.write(&rel, &doc.render())?;
        self.vault.ensure_description(&layout::area_description(slug))?;
        debug!("Upserted area '{}'", slug);
        Ok(())
    }

    fn write_topic(
        &self,
        slug: &str,
        agg: &TopicAggregate,
        links: &BTreeMap<String, String>,
        in_batch: bool,
        source: &str,
        now: &str,
    ) -> VaultResult<()> {
        let rel = layout::topic_doc(slug);
        let existing = self.read_entity(&rel);

        let title = existing
            .title
            .clone()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| agg.title.clone());
        let mut sources = existing.sources.clone();
        if in_batch {
            sources.insert(source.to_string());
        }
        let mut contributors = existing.contributors.clone();
        contributors.extend(agg.contributors.iter().cloned());
        let created = existing.created.clone().unwrap_or_else(|| now.to_string());

        let mut fm = Frontmatter::new();
        fm.push_str("title", &title);
        fm.push_str("created", &created);
        fm.push_list("sources", sources);
        fm.push_list("contributors", contributors);
        fm.push_list("tags", agg.tags.iter().cloned());
        fm.push_int("questions", agg.questions.len() as i64);
        fm.push_int("answers", agg.answers.len() as i64);
        fm.push_int("notes", agg.notes.len() as i64);

        let mut doc =
            self.shell_or_scaffold(&rel, fm, &title, &layout::topic_description_target(slug))?;
        let classification = classify(agg, links);
        let mut blocks = Vec::new();
        if !classification.notes.is_empty() {
            blocks.push(Block::Heading("Notes".to_string()));
            for id in &classification.notes {
                blocks.push(Block::Embed(id.clone()));
            }
        }
        if !classification.answered.is_empty() {
            blocks.push(Block::Heading("Questions with Answers".to_string()));
            for (question_id, answer_ids) in &classification.answered {
                blocks.push(Block::Embed(question_id.clone()));
                for answer_id in answer_ids {
                    blocks.push(Block::Embed(answer_id.clone()));
                }
            }
        }
        if !classification.unanswered.is_empty() {
            blocks.push(Block::Heading("Questions without Answers".to_string()));
            for id in &classification.unanswered {
                blocks.push(Block::Embed(id.clone()));
            }
        }
        if !classification.standalone.is_empty() {
            blocks.push(Block::Heading("Additional Answers".to_string()));
            for id in &classification.standalone {
                blocks.push(Block::Embed(id.clone()));
            }
        }
        doc.set_generated(blocks);

        self.vault.write(&rel, &doc.render())?;
        self.vault.ensure_description(&layout::topic_description(slug))?;
        debug!("Upserted topic '{}' with {} members", slug, agg.member_count());
        Ok(())
    }

    fn write_question(&self, q: &Question, answer_ids: &[String]) -> VaultResult<()> {
        let mut fm = contribution_frontmatter(q);
        if let Some(answered_by) = &q.answered_by {
            fm.push_str("answeredBy", answered_by);
        }
        let mut doc = Document::new(fm);
        push_body(&mut doc, &q.text, &q.links);
        if !answer_ids.is_empty() {
            let mut section = String::from("## Answers\n");
            for id in answer_ids {
                section.push_str("![[");
                section.push_str(id);
                section.push_str("]]\n");
            }
            doc.sections.push(Section::Blank);
            doc.sections.push(Section::Verbatim(section));
        }
        self.vault
            .write(&layout::contribution_doc(q.kind(), &q.id), &doc.render())
    }

    fn write_answer(&self, a: &Answer) -> VaultResult<()> {
        let mut fm = contribution_frontmatter(a);
        if let Some(question_id) = &a.answers_question {
            fm.push_str("answersQuestion", question_id);
        }
        fm.push_float("quality", a.quality);
        let mut doc = Document::new(fm);
        push_body(&mut doc, &a.text, &a.links);
        self.vault
            .write(&layout::contribution_doc(a.kind(), &a.id), &doc.render())
    }

    fn write_note(&self, n: &Note) -> VaultResult<()> {
        let mut doc = Document::new(contribution_frontmatter(n));
        push_body(&mut doc, &n.text, &n.links);
        self.vault
            .write(&layout::contribution_doc(n.kind(), &n.id), &doc.render())
    }

    fn upsert_people(
        &self,
        batch: &AnalysisResult,
        full_index: &ContributionIndex,
        merged_topics: &BTreeMap<String, TopicAggregate>,
        source: &str,
        report: &mut RunReport,
    ) {
        // Person identity is the normalized name; the display form is
        // whatever the batch spelled first.
        let mut people: BTreeMap<String, String> = BTreeMap::new();
        for c in batch.contributions() {
            let author = c.author().trim();
            let key = normalize_person_name(author);
            if key.is_empty() {
                continue;
            }
            people.entry(key).or_insert_with(|| author.to_string());
        }

        let docs_by_person = aggregate::by_author(full_index);
        for (key, display) in &people {
            let empty = Vec::new();
            let docs = docs_by_person.get(key).unwrap_or(&empty);
            match self.write_person(key, display, docs, merged_topics, source) {
                Ok(()) => report.people_written += 1,
                Err(e) => report.fail("person", key, e),
            }
        }
    }

    fn write_person(
        &self,
        key: &str,
        display: &str,
        docs: &[&ContributionDoc],
        merged_topics: &BTreeMap<String, TopicAggregate>,
        source: &str,
    ) -> VaultResult<()> {
        let mut questions = Vec::new();
        let mut answers = Vec::new();
        let mut notes = Vec::new();
        // slug -> (display title, contribution count)
        let mut topic_counts: BTreeMap<String, (String, usize)> = BTreeMap::new();
        for doc in docs {
            match doc.kind {
                ContributionKind::Question => questions.push(doc.id.clone()),
                ContributionKind::Answer => answers.push(doc.id.clone()),
                ContributionKind::Note => notes.push(doc.id.clone()),
            }
            let mut seen = BTreeSet::new();
            for topic_title in &doc.topics {
                let slug = slugify(topic_title);
                if slug.is_empty() || !seen.insert(slug.clone()) {
                    continue;
                }
                let entry = topic_counts.entry(slug.clone()).or_insert_with(|| {
                    let title = merged_topics
                        .get(&slug)
                        .map(|t| t.title.clone())
                        .unwrap_or_else(|| topic_title.clone());
                    (title, 0)
                });
                entry.1 += 1;
            }
        }
        sort_by_ordinal(&mut questions);
        sort_by_ordinal(&mut answers);
        sort_by_ordinal(&mut notes);
        let mut ranked_topics: Vec<(String, String, usize)> = topic_counts
            .into_iter()
            .map(|(slug, (title, count))| (slug, title, count))
            .collect();
        ranked_topics.sort_by(|a, b| b.2.cmp(&a.2).then_with(|| a.1.cmp(&b.1)));

        let rel = layout::person_doc(key);
        let existing = self.read_entity(&rel);
        let mut sources = existing.sources.clone();
        sources.insert(source.to_string());

        let mut fm = Frontmatter::new();
        fm.push_str("name", display);
        fm.push_list("sources", sources);
        fm.push_int("questions", questions.len() as i64);
        fm.push_int("answers", answers.len() as i64);
        fm.push_int("notes", notes.len() as i64);

        let mut doc = match self.load_shell(&rel)? {
            Some(mut shell) => {
                shell.frontmatter = fm;
                shell
            }
            None => Document::new(fm)
                .with_section(Section::Blank)
                .with_section(Section::Title(display.to_string()))
                .with_section(Section::Blank)
                .with_section(Section::Generated(Vec::new())),
        };

        let mut blocks = Vec::new();
        for (heading, ids) in [
            ("Questions", &questions),
            ("Answers", &answers),
            ("Notes", &notes),
        ] {
            if ids.is_empty() {
                continue;
            }
            blocks.push(Block::Heading(heading.to_string()));
            for id in ids {
                blocks.push(Block::Ref(id.clone()));
            }
        }
        if !ranked_topics.is_empty() {
            blocks.push(Block::Heading("Topics".to_string()));
            for (slug, title, count) in &ranked_topics {
                blocks.push(Block::Text(format!("- [[{slug}|{title}]] ({count})")));
            }
        }
        doc.set_generated(blocks);

        self.vault.write(&rel, &doc.render())?;
        debug!("Upserted person '{}'", key);
        Ok(())
    }

    /// Prior merge data for an entity document. Unreadable prior state
    /// degrades to empty with a warning; the run continues.
    fn read_entity(&self, rel: &str) -> ExistingEntity {
        if !self.vault.exists(rel) {
            return ExistingEntity::default();
        }
        match scanner::read_existing(self.vault, rel) {
            Ok(entity) => entity,
            Err(e) => {
                warn!("No prior data recovered from {}: {}", rel, e);
                ExistingEntity::default()
            }
        }
    }

    /// The preserved body shell of an existing document, if any. IO
    /// failures propagate so the caller records an entity failure
    /// instead of overwriting a file it could not read.
    fn load_shell(&self, rel: &str) -> VaultResult<Option<Document>> {
        if !self.vault.exists(rel) {
            return Ok(None);
        }
        let text = self.vault.read_to_string(rel)?;
        Ok(Some(Document::parse(&text)))
    }

    fn shell_or_scaffold(
        &self,
        rel: &str,
        fm: Frontmatter,
        title: &str,
        description_target: &str,
    ) -> VaultResult<Document> {
        Ok(match self.load_shell(rel)? {
            Some(mut shell) => {
                shell.frontmatter = fm;
                shell
            }
            None => Document::scaffold(fm, title, description_target),
        })
    }
}

/// Drop contributions without an area. They are never persisted and
/// never influence any entity.
fn filter_batch(batch: &AnalysisResult, report: &mut RunReport) -> AnalysisResult {
    let mut kept = AnalysisResult::new();
    for q in &batch.questions {
        if q.has_area() {
            kept.questions.push(q.clone());
        } else {
            report.skipped_no_area += 1;
            warn!("Dropping contribution {} with no area", q.id);
        }
    }
    for a in &batch.answers {
        if a.has_area() {
            kept.answers.push(a.clone());
        } else {
            report.skipped_no_area += 1;
            warn!("Dropping contribution {} with no area", a.id);
        }
    }
    for n in &batch.notes {
        if n.has_area() {
            kept.notes.push(n.clone());
        } else {
            report.skipped_no_area += 1;
            warn!("Dropping contribution {} with no area", n.id);
        }
    }
    kept
}

/// Shared header fields, in canonical order. Kind-specific fields are
/// pushed after by the caller.
fn contribution_frontmatter(c: &dyn Contribution) -> Frontmatter {
    let mut fm = Frontmatter::new();
    fm.push_str("id", c.id());
    fm.push_str("author", c.author());
    fm.push_str("date", c.date().to_rfc3339_opts(SecondsFormat::Secs, true));
    if let Some(area) = c.area() {
        fm.push_str("area", area);
    }
    fm.push_list("topics", c.topics().iter().cloned());
    fm.push_list("tags", c.tags().iter().cloned());
    fm
}

/// Body text plus the optional reference-links section.
fn push_body(doc: &mut Document, text: &str, links: &[Link]) {
    if !text.trim().is_empty() {
        let mut body = text.trim_end().to_string();
        body.push('\n');
        doc.sections.push(Section::Blank);
        doc.sections.push(Section::Verbatim(body));
    }
    if !links.is_empty() {
        let mut section = String::from("## Links\n");
        for link in links {
            let label = if link.title.trim().is_empty() {
                &link.url
            } else {
                &link.title
            };
            section.push_str(&format!("- [{}]({})\n", label, link.url));
        }
        doc.sections.push(Section::Blank);
        doc.sections.push(Section::Verbatim(section));
    }
}
