use tracing::debug;
use uuid::Uuid;

use hacks_types::models::Question;

use crate::card::{self, HackCard};
use crate::{AppContext, Result, Route};

#[derive(Debug)]
pub struct QuestionPage {
    pub question_id: Uuid,
    /// Absent when the id matches no question; the hack list still loads.
    pub question: Option<Question>,
    /// Ranked by upvotes.
    pub cards: Vec<HackCard>,
}

impl QuestionPage {
    pub async fn load(ctx: &AppContext, question_id: Uuid) -> Result<Self> {
        let (question, hacks) = tokio::try_join!(
            ctx.db.question_by_id(question_id),
            ctx.db.hacks_for_question(question_id)
        )?;
        debug!(question_id = %question_id, hacks = hacks.len(), "question loaded");

        let mut cards: Vec<HackCard> = hacks.into_iter().map(|h| HackCard::new(h, None)).collect();
        card::attach_flags(ctx, &mut cards).await;

        Ok(Self {
            question_id,
            question,
            cards,
        })
    }

    /// Where "back" goes: the question's category, or home.
    pub fn back(&self) -> (String, Route) {
        match &self.question {
            Some(q) => (format!("Back to {}", q.category), Route::Category(q.category.clone())),
            None => ("Back to home".to_string(), Route::Home),
        }
    }

    pub fn submit_route(&self) -> Route {
        Route::Submit {
            question: Some(self.question_id),
        }
    }
}
