use tracing::debug;

use hacks_types::models::Question;

use crate::{AppContext, Result};

#[derive(Debug)]
pub struct CategoryPage {
    pub category: String,
    /// Newest first.
    pub questions: Vec<Question>,
}

impl CategoryPage {
    pub async fn load(ctx: &AppContext, category: &str) -> Result<Self> {
        let questions = ctx.db.questions_in_category(category).await?;
        debug!(category, count = questions.len(), "category loaded");
        Ok(Self {
            category: category.to_string(),
            questions,
        })
    }

    pub fn count_label(&self) -> String {
        match self.questions.len() {
            1 => "1 question".to_string(),
            n => format!("{} questions", n),
        }
    }
}
