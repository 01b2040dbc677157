use tracing::info;
use uuid::Uuid;

use hacks_types::models::{NewSubmission, Question, SubmissionStatus};

use crate::{AppContext, AppError, Result, Route};

pub const SIGN_IN_TO_SUBMIT: &str = "Please sign in to submit a hack";
pub const MISSING_FIELDS: &str = "Please fill in all required fields";
pub const SUBMITTED: &str = "Hack submitted! It will be reviewed and published soon.";

/// Form state for a new hack. Fields hold raw input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HackDraft {
    pub question_id: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub why_it_works: String,
}

impl HackDraft {
    /// Check required fields and build the row to insert. Whitespace-only
    /// input counts as empty.
    pub fn validate(&self, user_id: Uuid) -> Result<NewSubmission> {
        let title = self.title.trim();
        let description = self.description.trim();
        let question_id = match self.question_id {
            Some(id) if !title.is_empty() && !description.is_empty() => id,
            _ => return Err(AppError::Validation(MISSING_FIELDS.into())),
        };

        let why = self.why_it_works.trim();
        Ok(NewSubmission {
            user_id,
            question_id,
            title: title.to_string(),
            description: description.to_string(),
            why_it_works: (!why.is_empty()).then(|| why.to_string()),
            status: SubmissionStatus::Pending,
        })
    }
}

#[derive(Debug)]
pub struct SubmitPage {
    /// Questions grouped by category for the picker, categories ascending.
    pub groups: Vec<(String, Vec<Question>)>,
    pub draft: HackDraft,
    pub signed_in: bool,
}

impl SubmitPage {
    pub async fn load(ctx: &AppContext, question: Option<Uuid>) -> Result<Self> {
        let questions = ctx.db.questions_by_category_order().await?;
        Ok(Self {
            groups: group_by_category(questions),
            draft: HackDraft {
                question_id: question,
                ..HackDraft::default()
            },
            signed_in: ctx.user_id().await.is_some(),
        })
    }

    pub fn question(&self, id: Uuid) -> Option<&Question> {
        self.groups
            .iter()
            .flat_map(|(_, qs)| qs.iter())
            .find(|q| q.id == id)
    }

    /// Queue the draft for review and return the question page to show next.
    pub async fn submit(&self, ctx: &AppContext) -> Result<Route> {
        let user = ctx.require_user(SIGN_IN_TO_SUBMIT).await?;
        let row = self.draft.validate(user.id)?;
        let question_id = row.question_id;

        let stored = ctx.db.insert_submission(&row).await?;
        info!(submission_id = %stored.id, question_id = %question_id, "hack submitted for review");
        Ok(Route::Question(question_id))
    }
}

/// Group questions already ordered by category, keeping that order.
pub fn group_by_category(questions: Vec<Question>) -> Vec<(String, Vec<Question>)> {
    let mut groups: Vec<(String, Vec<Question>)> = Vec::new();
    for q in questions {
        match groups.last_mut() {
            Some((category, items)) if *category == q.category => items.push(q),
            _ => groups.push((q.category.clone(), vec![q])),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::Utc;

    use super::*;

    fn draft(title: &str, description: &str, why: &str) -> HackDraft {
        HackDraft {
            question_id: Some(Uuid::new_v4()),
            title: title.into(),
            description: description.into(),
            why_it_works: why.into(),
        }
    }

    #[test]
    fn required_fields() {
        let user = Uuid::new_v4();
        assert_matches!(
            draft("", "desc", "").validate(user),
            Err(AppError::Validation(msg)) if msg == MISSING_FIELDS
        );
        assert_matches!(draft("title", "   ", "").validate(user), Err(AppError::Validation(_)));

        let mut no_question = draft("title", "desc", "");
        no_question.question_id = None;
        assert_matches!(no_question.validate(user), Err(AppError::Validation(_)));
    }

    #[test]
    fn valid_draft_becomes_pending_row() {
        let user = Uuid::new_v4();
        let row = draft(" Songs ", "Play them", "  ").validate(user).unwrap();
        assert_eq!(row.title, "Songs");
        assert_eq!(row.why_it_works, None);
        assert_eq!(row.status, SubmissionStatus::Pending);
        assert_eq!(row.user_id, user);

        let row = draft("Songs", "Play them", "Routine").validate(user).unwrap();
        assert_eq!(row.why_it_works.as_deref(), Some("Routine"));
    }

    #[test]
    fn grouping_keeps_category_order() {
        let q = |category: &str| Question {
            id: Uuid::new_v4(),
            title: format!("{} question", category),
            category: category.into(),
            description: None,
            created_at: Utc::now(),
        };
        let groups = group_by_category(vec![q("Eating"), q("Sleep"), q("Sleep"), q("Tantrums")]);
        let shape: Vec<(&str, usize)> = groups.iter().map(|(c, qs)| (c.as_str(), qs.len())).collect();
        assert_eq!(shape, vec![("Eating", 1), ("Sleep", 2), ("Tantrums", 1)]);
    }
}
