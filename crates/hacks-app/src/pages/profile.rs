use std::collections::HashMap;

use tracing::debug;
use uuid::Uuid;

use hacks_types::api::AuthUser;
use hacks_types::models::{HackSubmission, Question};

use crate::card::{self, HackCard};
use crate::{AppContext, AppError, Result, Route};

pub const DEFAULT_DISPLAY_NAME: &str = "User";

#[derive(Debug, Clone)]
pub struct SubmissionView {
    pub submission: HackSubmission,
    pub question_title: Option<String>,
}

#[derive(Debug)]
pub struct ProfilePage {
    pub display_name: String,
    pub email: Option<String>,
    /// Saved hacks, most recently saved first.
    pub saved: Vec<HackCard>,
    /// The user's own submissions with their review status.
    pub submissions: Vec<SubmissionView>,
}

impl ProfilePage {
    pub async fn load(ctx: &AppContext, user: &AuthUser) -> Result<Self> {
        let display_name = ctx
            .auth
            .profile()
            .await
            .and_then(|p| p.username)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| DEFAULT_DISPLAY_NAME.to_string());

        let (saved, submissions) = tokio::try_join!(load_saved(ctx, user.id), async {
            Ok::<_, AppError>(ctx.db.submissions_for_user(user.id).await?)
        })?;

        let question_ids: Vec<Uuid> = submissions.iter().filter_map(|s| s.question_id).collect();
        let titles: HashMap<Uuid, String> = ctx
            .db
            .questions_by_ids(&question_ids)
            .await?
            .into_iter()
            .map(|q| (q.id, q.title))
            .collect();

        let submissions = submissions
            .into_iter()
            .map(|submission| SubmissionView {
                question_title: submission
                    .question_id
                    .and_then(|id| titles.get(&id).cloned()),
                submission,
            })
            .collect();

        Ok(Self {
            display_name,
            email: user.email.clone(),
            saved,
            submissions,
        })
    }

    pub async fn sign_out(ctx: &AppContext) -> Route {
        ctx.auth.sign_out().await;
        Route::Home
    }
}

async fn load_saved(ctx: &AppContext, user_id: Uuid) -> Result<Vec<HackCard>> {
    let saved = ctx.db.saved_hacks_for_user(user_id).await?;
    let hack_ids: Vec<Uuid> = saved.iter().map(|s| s.hack_id).collect();

    let hacks = ctx.db.hacks_by_ids(&hack_ids).await?;
    let question_ids: Vec<Uuid> = hacks.iter().map(|h| h.question_id).collect();
    let questions: Vec<Question> = ctx.db.questions_by_ids(&question_ids).await?;

    // Restore the saved order; the id lookup returns rows in store order
    let mut by_id: HashMap<Uuid, HackCard> = card::join_questions(hacks, &questions)
        .into_iter()
        .map(|c| (c.id(), c))
        .collect();
    let mut cards: Vec<HackCard> = hack_ids.iter().filter_map(|id| by_id.remove(id)).collect();

    card::attach_flags(ctx, &mut cards).await;
    debug!(user_id = %user_id, saved = cards.len(), "saved hacks loaded");
    Ok(cards)
}
