//! Vault directory layout
//!
//! All paths are relative to the vault root and built here, so the
//! on-disk contract lives in one place. Contribution documents are flat
//! per kind; topics and areas get a directory per slug holding the
//! entity document and its description; people are flat files named by
//! normalized author name.

use crate::model::ContributionKind;

pub const TOPICS_DIR: &str = "topics";
pub const AREAS_DIR: &str = "areas";
pub const PEOPLE_DIR: &str = "people";
pub const STATE_DIR: &str = ".trellis";
pub const SYNC_FILE: &str = ".trellis/sync.json";
pub const DESCRIPTION_FILE: &str = "description.md";

/// Every directory `Vault::open` guarantees to exist.
pub fn base_dirs() -> Vec<String> {
    let mut dirs: Vec<String> = ContributionKind::all()
        .iter()
        .map(|k| k.dir_name().to_string())
        .collect();
    dirs.push(TOPICS_DIR.to_string());
    dirs.push(AREAS_DIR.to_string());
    dirs.push(PEOPLE_DIR.to_string());
    dirs.push(STATE_DIR.to_string());
    dirs
}

/// `questions/q_0001.md` and friends.
pub fn contribution_doc(kind: ContributionKind, id: &str) -> String {
    format!("{}/{}.md", kind.dir_name(), id)
}

/// `topics/<slug>/<slug>.md`
pub fn topic_doc(slug: &str) -> String {
    format!("{}/{}/{}.md", TOPICS_DIR, slug, slug)
}

/// `topics/<slug>/description.md`
pub fn topic_description(slug: &str) -> String {
    format!("{}/{}/{}", TOPICS_DIR, slug, DESCRIPTION_FILE)
}

/// Embed target for a topic description (no extension; the vault viewer
/// resolves it).
pub fn topic_description_target(slug: &str) -> String {
    format!("{}/{}/description", TOPICS_DIR, slug)
}

/// `areas/<slug>/<slug>.md`
pub fn area_doc(slug: &str) -> String {
    format!("{}/{}/{}.md", AREAS_DIR, slug, slug)
}

/// `areas/<slug>/description.md`
pub fn area_description(slug: &str) -> String {
    format!("{}/{}/{}", AREAS_DIR, slug, DESCRIPTION_FILE)
}

/// Embed target for an area description.
pub fn area_description_target(slug: &str) -> String {
    format!("{}/{}/description", AREAS_DIR, slug)
}

/// `people/<Name_Normalized>.md`, from an already-normalized name.
pub fn person_doc(normalized: &str) -> String {
    format!("{}/{}.md", PEOPLE_DIR, normalized)
}
