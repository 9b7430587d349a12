//! Topic member classification
//!
//! Decides how each member of a topic is displayed: notes first, then
//! questions with their resolved answers embedded, then open questions,
//! then standalone answers. An answer is standalone in a topic exactly
//! when its linked question is not a member of that same topic (or it
//! has no link); the link map is global, so the very same answer can be
//! embedded under its question in one topic and standalone in another.

use std::collections::BTreeMap;

use crate::vault::extract_ordinal;

use super::aggregate::TopicAggregate;

/// Display classification of one topic's members.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TopicClassification {
    pub notes: Vec<String>,
    /// Each answered question with its resolving answer ids.
    pub answered: Vec<(String, Vec<String>)>,
    pub unanswered: Vec<String>,
    pub standalone: Vec<String>,
}

impl TopicClassification {
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
            && self.answered.is_empty()
            && self.unanswered.is_empty()
            && self.standalone.is_empty()
    }
}

/// Classify a topic's members against the global answer→question links.
pub fn classify(members: &TopicAggregate, links: &BTreeMap<String, String>) -> TopicClassification {
    // Question → answers, restricted by link target membership only. The
    // answer side is unrestricted: any known answer can resolve a member
    // question.
    let mut question_answers: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for (answer_id, question_id) in links {
        if members.questions.contains(question_id) {
            question_answers
                .entry(question_id.as_str())
                .or_default()
                .push(answer_id.clone());
        }
    }

    let mut answered = Vec::new();
    let mut unanswered = Vec::new();
    for question_id in &members.questions {
        match question_answers.get(question_id.as_str()) {
            Some(answer_ids) => {
                let mut answer_ids = answer_ids.clone();
                sort_by_ordinal(&mut answer_ids);
                answered.push((question_id.clone(), answer_ids));
            }
            None => unanswered.push(question_id.clone()),
        }
    }
    answered.sort_by(|(a, _), (b, _)| ordinal_key(a).cmp(&ordinal_key(b)));
    sort_by_ordinal(&mut unanswered);

    let mut standalone: Vec<String> = members
        .answers
        .iter()
        .filter(|answer_id| match links.get(*answer_id) {
            Some(question_id) => !members.questions.contains(question_id),
            None => true,
        })
        .cloned()
        .collect();
    sort_by_ordinal(&mut standalone);

    let mut notes: Vec<String> = members.notes.iter().cloned().collect();
    sort_by_ordinal(&mut notes);

    TopicClassification {
        notes,
        answered,
        unanswered,
        standalone,
    }
}

fn ordinal_key(id: &str) -> (u64, String) {
    (extract_ordinal(id), id.to_string())
}

/// Numeric-ordinal sort with the full id as tiebreak, so ids that do not
/// parse still land deterministically.
pub fn sort_by_ordinal(ids: &mut [String]) {
    ids.sort_by(|a, b| ordinal_key(a).cmp(&ordinal_key(b)));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn members(questions: &[&str], answers: &[&str], notes: &[&str]) -> TopicAggregate {
        let mut agg = TopicAggregate::new("Auth");
        agg.questions = questions.iter().map(|s| s.to_string()).collect();
        agg.answers = answers.iter().map(|s| s.to_string()).collect();
        agg.notes = notes.iter().map(|s| s.to_string()).collect();
        agg
    }

    fn links(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(a, q)| (a.to_string(), q.to_string()))
            .collect()
    }

    #[test]
    fn test_member_answer_to_member_question_is_embedded() {
        let agg = members(&["q_0001"], &["a_0001"], &[]);
        let c = classify(&agg, &links(&[("a_0001", "q_0001")]));

        assert_eq!(c.answered, vec![("q_0001".to_string(), vec!["a_0001".to_string()])]);
        assert!(c.unanswered.is_empty());
        assert!(c.standalone.is_empty());
    }

    #[test]
    fn test_answer_to_foreign_question_is_standalone() {
        // a_0002 answers q_0002, which lives in some other topic.
        let agg = members(&["q_0001"], &["a_0001", "a_0002"], &[]);
        let c = classify(&agg, &links(&[("a_0001", "q_0001"), ("a_0002", "q_0002")]));

        assert_eq!(c.answered.len(), 1);
        assert_eq!(c.answered[0].0, "q_0001");
        assert_eq!(c.standalone, vec!["a_0002"]);
    }

    #[test]
    fn test_unlinked_answer_is_standalone() {
        let agg = members(&[], &["a_0003"], &[]);
        let c = classify(&agg, &links(&[]));
        assert_eq!(c.standalone, vec!["a_0003"]);
    }

    #[test]
    fn test_nonmember_answer_still_resolves_member_question() {
        // The answer belongs to another topic, but its link target is a
        // member question here: the question counts as answered, and the
        // answer is not listed standalone (it is not a member).
        let agg = members(&["q_0002"], &[], &[]);
        let c = classify(&agg, &links(&[("a_0002", "q_0002")]));

        assert_eq!(c.answered, vec![("q_0002".to_string(), vec!["a_0002".to_string()])]);
        assert!(c.standalone.is_empty());
    }

    #[test]
    fn test_ordinal_sorting_everywhere() {
        let agg = members(
            &["q_0010", "q_0002"],
            &["a_0010", "a_0002"],
            &["n_0010", "n_0002"],
        );
        let c = classify(
            &agg,
            &links(&[("a_0010", "q_0002"), ("a_0002", "q_0002")]),
        );

        assert_eq!(c.notes, vec!["n_0002", "n_0010"]);
        assert_eq!(c.answered.len(), 1);
        assert_eq!(c.answered[0].1, vec!["a_0002", "a_0010"]);
        assert_eq!(c.unanswered, vec!["q_0010"]);
    }

    #[test]
    fn test_multiple_answers_per_question() {
        let agg = members(&["q_0001"], &["a_0001", "a_0002"], &[]);
        let c = classify(
            &agg,
            &links(&[("a_0001", "q_0001"), ("a_0002", "q_0001")]),
        );
        assert_eq!(
            c.answered,
            vec![("q_0001".to_string(), vec!["a_0001".to_string(), "a_0002".to_string()])]
        );
        assert!(c.standalone.is_empty());
    }
}
