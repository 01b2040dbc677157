use std::collections::BTreeSet;

use tracing::debug;

use crate::card::{self, HackCard};
use crate::{AppContext, Result};

pub const TRENDING_LIMIT: u64 = 5;

#[derive(Debug)]
pub struct HomePage {
    /// Most upvoted hacks with their questions.
    pub cards: Vec<HackCard>,
    /// Distinct question categories, sorted.
    pub categories: Vec<String>,
}

impl HomePage {
    pub async fn load(ctx: &AppContext) -> Result<Self> {
        let hacks = ctx.db.top_hacks(TRENDING_LIMIT).await?;
        let questions = ctx.db.all_questions().await?;
        debug!(hacks = hacks.len(), questions = questions.len(), "trending rows fetched");

        let mut cards = card::join_questions(hacks, &questions);
        card::attach_flags(ctx, &mut cards).await;

        let categories = questions
            .into_iter()
            .map(|q| q.category)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        Ok(Self { cards, categories })
    }
}
