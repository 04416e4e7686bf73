use std::collections::BTreeSet;

use crate::model::QuestionId;

/// Questions the student marked for review. Advisory only; never submitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagTracker {
    flagged: BTreeSet<QuestionId>,
}

impl FlagTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip the flag for `question_id`. Returns whether it is now flagged.
    pub fn toggle(&mut self, question_id: QuestionId) -> bool {
        if self.flagged.remove(&question_id) {
            false
        } else {
            self.flagged.insert(question_id);
            true
        }
    }

    #[must_use]
    pub fn is_flagged(&self, question_id: &QuestionId) -> bool {
        self.flagged.contains(question_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &QuestionId> {
        self.flagged.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.flagged.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.flagged.is_empty()
    }

    pub fn clear(&mut self) {
        self.flagged.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_toggle_is_identity() {
        let mut flags = FlagTracker::new();
        let q2 = QuestionId::new("q2");

        assert!(flags.toggle(q2.clone()));
        assert!(flags.is_flagged(&q2));
        assert!(!flags.toggle(q2.clone()));
        assert!(flags.is_empty());
    }

    #[test]
    fn iterates_in_id_order() {
        let mut flags = FlagTracker::new();
        flags.toggle(QuestionId::new("q3"));
        flags.toggle(QuestionId::new("q1"));

        let ids: Vec<_> = flags.iter().map(QuestionId::as_str).collect();
        assert_eq!(ids, vec!["q1", "q3"]);
    }
}
