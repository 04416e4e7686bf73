//! Flattened, order-preserving index over every question of a test.
//!
//! Built once per loaded `Test` and never mutated; a reload builds a fresh
//! index. Lookups by flat position and by question id are O(1).

use std::collections::HashMap;

use crate::model::{GroupId, QuestionId, SectionId, Test};

/// Position of one question within the test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavQuestionRef {
    pub question_id: QuestionId,
    pub section_id: SectionId,
    pub group_id: GroupId,
    pub section_index: usize,
    pub group_index: usize,
    pub flat_index: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavigationIndex {
    refs: Vec<NavQuestionRef>,
    by_question: HashMap<QuestionId, usize>,
    /// Flat index of the first question of each `(section_index, group_index)`.
    group_heads: HashMap<(usize, usize), usize>,
}

impl NavigationIndex {
    #[must_use]
    pub fn build(test: &Test) -> Self {
        let mut index = Self {
            refs: Vec::with_capacity(test.question_count()),
            ..Self::default()
        };

        for (section_index, section) in test.sections().iter().enumerate() {
            for (group_index, group) in section.groups.iter().enumerate() {
                for question in &group.questions {
                    let flat_index = index.refs.len();
                    index
                        .group_heads
                        .entry((section_index, group_index))
                        .or_insert(flat_index);
                    index.by_question.insert(question.id().clone(), flat_index);
                    index.refs.push(NavQuestionRef {
                        question_id: question.id().clone(),
                        section_id: section.id.clone(),
                        group_id: group.id.clone(),
                        section_index,
                        group_index,
                        flat_index,
                    });
                }
            }
        }

        index
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.refs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    #[must_use]
    pub fn refs(&self) -> &[NavQuestionRef] {
        &self.refs
    }

    #[must_use]
    pub fn jump_to(&self, flat_index: usize) -> Option<&NavQuestionRef> {
        self.refs.get(flat_index)
    }

    #[must_use]
    pub fn jump_to_question(&self, question_id: &QuestionId) -> Option<&NavQuestionRef> {
        self.by_question
            .get(question_id)
            .and_then(|&flat| self.refs.get(flat))
    }

    #[must_use]
    pub fn contains(&self, question_id: &QuestionId) -> bool {
        self.by_question.contains_key(question_id)
    }

    /// Whether `nav` is the first question of its group. The presentation
    /// layer renders a group's shared passage/instruction only there.
    #[must_use]
    pub fn is_first_in_group(&self, nav: &NavQuestionRef) -> bool {
        self.group_heads
            .get(&(nav.section_index, nav.group_index))
            .is_some_and(|&head| head == nav.flat_index)
    }

    /// Refs belonging to the section at `section_index`, in flat order.
    pub fn section_refs(&self, section_index: usize) -> impl Iterator<Item = &NavQuestionRef> {
        self.refs
            .iter()
            .filter(move |nav| nav.section_index == section_index)
    }
}
