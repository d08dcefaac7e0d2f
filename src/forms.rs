//! Experiment design batch: `(FormBatch, FormEvent) -> FormBatch`.
//!
//! Every edit produces a new batch; nothing is mutated in place. Forms are
//! shown one per page, so slots in events are page-relative.

use crate::api::QuestionForm;

pub const FORMS_PER_PAGE: usize = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormEvent {
    SetDependent { slot: usize, text: String },
    /// Free text; split on newlines, commas, semicolons and spaces.
    SetIndependents { slot: usize, text: String },
    AddForm,
    RemoveLast,
    Clear { slot: usize },
    NextPage,
    PreviousPage,
    SubmitStarted,
    /// Submission accepted; start over with one blank form.
    Reset,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormBatch {
    forms: Vec<QuestionForm>,
    history_len: usize,
    page: usize,
    processing: bool,
}

impl FormBatch {
    /// One blank form numbered after the `history_len` questions already on record.
    pub fn new(history_len: usize) -> Self {
        Self {
            forms: vec![QuestionForm::blank(history_len as u64 + 1)],
            history_len,
            page: 1,
            processing: false,
        }
    }

    pub fn forms(&self) -> &[QuestionForm] {
        &self.forms
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn processing(&self) -> bool {
        self.processing
    }

    pub fn total_pages(&self) -> usize {
        self.forms.len().div_ceil(FORMS_PER_PAGE)
    }

    /// Forms on the current page.
    pub fn visible(&self) -> &[QuestionForm] {
        let start = ((self.page - 1) * FORMS_PER_PAGE).min(self.forms.len());
        let end = (start + FORMS_PER_PAGE).min(self.forms.len());
        &self.forms[start..end]
    }

    /// Submit is offered only when every form has a dependent and at least one independent.
    pub fn can_submit(&self) -> bool {
        !self.processing && self.forms.iter().all(is_valid)
    }

    pub fn apply(&self, event: FormEvent) -> FormBatch {
        let mut next = self.clone();
        match event {
            FormEvent::SetDependent { slot, text } => {
                if let Some(form) = next.slot_mut(slot) {
                    form.dep_var = text;
                }
            }
            FormEvent::SetIndependents { slot, text } => {
                if let Some(form) = next.slot_mut(slot) {
                    form.independents = split_independents(&text);
                }
            }
            FormEvent::AddForm => {
                let id = (self.history_len + self.forms.len() + 1) as u64;
                next.forms.push(QuestionForm::blank(id));
            }
            FormEvent::RemoveLast => {
                if next.forms.len() > 1 {
                    next.forms.pop();
                    next.page = next.page.min(next.total_pages());
                }
            }
            FormEvent::Clear { slot } => {
                if let Some(form) = next.slot_mut(slot) {
                    *form = QuestionForm::blank(form.id);
                }
            }
            FormEvent::NextPage => {
                if next.page < next.total_pages() {
                    next.page += 1;
                }
            }
            FormEvent::PreviousPage => {
                if next.page > 1 {
                    next.page -= 1;
                }
            }
            FormEvent::SubmitStarted => next.processing = true,
            FormEvent::Reset => next = FormBatch::new(self.history_len),
        }
        next
    }

    fn slot_mut(&mut self, slot: usize) -> Option<&mut QuestionForm> {
        let index = (self.page - 1) * FORMS_PER_PAGE + slot;
        self.forms.get_mut(index)
    }
}

pub fn split_independents(text: &str) -> Vec<String> {
    text.split(|c: char| matches!(c, '\n' | ',' | ';' | ' '))
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn is_empty(form: &QuestionForm) -> bool {
    form.dep_var.trim().is_empty() && form.independents.is_empty()
}

pub fn is_valid(form: &QuestionForm) -> bool {
    !form.dep_var.trim().is_empty() && !form.independents.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::QuestionStatus;

    fn filled(batch: &FormBatch, slot: usize, dep: &str, indep: &str) -> FormBatch {
        batch
            .apply(FormEvent::SetDependent { slot, text: dep.into() })
            .apply(FormEvent::SetIndependents { slot, text: indep.into() })
    }

    #[test]
    fn starts_with_one_blank_form_after_history() {
        let b = FormBatch::new(4);
        assert_eq!(b.forms().len(), 1);
        assert_eq!(b.forms()[0].id, 5);
        assert_eq!(b.forms()[0].status, QuestionStatus::NotStarted);
        assert!(is_empty(&b.forms()[0]));
        assert!(!b.can_submit());
    }

    #[test]
    fn independents_split_on_any_separator() {
        assert_eq!(
            split_independents("age, income;\n\nregion  tenure"),
            vec!["age", "income", "region", "tenure"]
        );
        assert!(split_independents(" ,;\n").is_empty());
    }

    #[test]
    fn apply_leaves_input_untouched() {
        let b = FormBatch::new(0);
        let edited = b.apply(FormEvent::SetDependent { slot: 0, text: "churn".into() });
        assert_eq!(b.forms()[0].dep_var, "");
        assert_eq!(edited.forms()[0].dep_var, "churn");
    }

    #[test]
    fn add_numbers_after_existing_forms() {
        let b = FormBatch::new(2).apply(FormEvent::AddForm).apply(FormEvent::AddForm);
        let ids: Vec<u64> = b.forms().iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![3, 4, 5]);
        assert_eq!(b.total_pages(), 3);
    }

    #[test]
    fn slots_are_page_relative() {
        let b = FormBatch::new(0)
            .apply(FormEvent::AddForm)
            .apply(FormEvent::NextPage);
        let b = filled(&b, 0, "y", "a b");
        assert_eq!(b.forms()[0].dep_var, "");
        assert_eq!(b.forms()[1].dep_var, "y");
        assert_eq!(b.visible()[0].id, 2);
    }

    #[test]
    fn paging_is_clamped() {
        let b = FormBatch::new(0).apply(FormEvent::PreviousPage);
        assert_eq!(b.page(), 1);
        let b = b.apply(FormEvent::AddForm).apply(FormEvent::NextPage).apply(FormEvent::NextPage);
        assert_eq!(b.page(), 2);
    }

    #[test]
    fn remove_keeps_last_form_and_page_in_range() {
        let b = FormBatch::new(0).apply(FormEvent::RemoveLast);
        assert_eq!(b.forms().len(), 1);

        let b = b.apply(FormEvent::AddForm).apply(FormEvent::NextPage).apply(FormEvent::RemoveLast);
        assert_eq!(b.forms().len(), 1);
        assert_eq!(b.page(), 1);
    }

    #[test]
    fn clear_keeps_id() {
        let b = filled(&FormBatch::new(9), 0, "y", "a");
        let cleared = b.apply(FormEvent::Clear { slot: 0 });
        assert_eq!(cleared.forms()[0], QuestionForm::blank(10));
    }

    #[test]
    fn submit_needs_every_form_valid() {
        let b = filled(&FormBatch::new(0), 0, "y", "a,b");
        assert!(b.can_submit());
        let b = b.apply(FormEvent::AddForm);
        assert!(!b.can_submit());
        let b = b.apply(FormEvent::NextPage);
        let b = filled(&b, 0, "  ", "c");
        assert!(!b.can_submit());
        let b = filled(&b, 0, "z", "c");
        assert!(b.can_submit());
        assert!(!b.apply(FormEvent::SubmitStarted).can_submit());
    }

    #[test]
    fn reset_returns_to_single_blank_form() {
        let b = filled(&FormBatch::new(3), 0, "y", "a")
            .apply(FormEvent::AddForm)
            .apply(FormEvent::SubmitStarted)
            .apply(FormEvent::Reset);
        assert_eq!(b, FormBatch::new(3));
    }
}
