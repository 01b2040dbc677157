use std::collections::HashMap;

use tracing::{debug, warn};
use uuid::Uuid;

use hacks_types::models::{Comment, NewComment};

use crate::card::{self, HackCard};
use crate::{AppContext, AppError, Result, Route};

pub const SIGN_IN_TO_VOTE: &str = "Sign in to upvote!";
pub const SIGN_IN_TO_COMMENT: &str = "Sign in to comment!";
pub const ANONYMOUS: &str = "Anonymous";

#[derive(Debug, Clone)]
pub struct CommentView {
    pub comment: Comment,
    pub author: Option<String>,
}

impl CommentView {
    pub fn author_name(&self) -> &str {
        self.author.as_deref().unwrap_or(ANONYMOUS)
    }

    pub fn initial(&self) -> char {
        self.author
            .as_deref()
            .and_then(|name| name.chars().next())
            .and_then(|c| c.to_uppercase().next())
            .unwrap_or('U')
    }
}

#[derive(Debug)]
pub struct HackDetailPage {
    pub hack_id: Uuid,
    /// `None` renders the not-found state.
    pub card: Option<HackCard>,
    /// Newest first.
    pub comments: Vec<CommentView>,
}

impl HackDetailPage {
    pub async fn load(ctx: &AppContext, hack_id: Uuid) -> Result<Self> {
        let Some(hack) = ctx.db.hack_by_id(hack_id).await? else {
            debug!(hack_id = %hack_id, "hack not found");
            return Ok(Self {
                hack_id,
                card: None,
                comments: Vec::new(),
            });
        };

        let question = ctx.db.question_by_id(hack.question_id).await?;
        let mut cards = vec![HackCard::new(hack, question)];
        card::attach_flags(ctx, &mut cards).await;

        let comments = match load_comments(ctx, hack_id).await {
            Ok(comments) => comments,
            Err(e) => {
                warn!(hack_id = %hack_id, "comments unavailable: {}", e);
                Vec::new()
            }
        };

        Ok(Self {
            hack_id,
            card: cards.pop(),
            comments,
        })
    }

    /// Back to the hack's question, or home when it has none.
    pub fn back(&self) -> Route {
        match self.card.as_ref().and_then(|c| c.question.as_ref()) {
            Some(q) => Route::Question(q.id),
            None => Route::Home,
        }
    }

    /// Upvote from the detail view, which has its own sign-in prompt.
    pub async fn toggle_upvote(&mut self, ctx: &AppContext) -> Result<()> {
        ctx.require_user(SIGN_IN_TO_VOTE).await?;
        match &mut self.card {
            Some(card) => card.toggle_upvote(ctx).await,
            None => Err(AppError::NotFound(format!("hack {}", self.hack_id))),
        }
    }

    /// Post a comment as the viewer. Blank text is ignored and returns false.
    pub async fn post_comment(&mut self, ctx: &AppContext, text: &str) -> Result<bool> {
        let user = ctx.require_user(SIGN_IN_TO_COMMENT).await?;
        let content = text.trim();
        if content.is_empty() {
            return Ok(false);
        }

        let comment = ctx
            .db
            .insert_comment(&NewComment {
                hack_id: self.hack_id,
                user_id: user.id,
                content: content.to_string(),
            })
            .await?;
        let author = ctx.auth.profile().await.and_then(|p| p.username);

        debug!(hack_id = %self.hack_id, comment_id = %comment.id, "comment posted");
        self.comments.insert(0, CommentView { comment, author });
        Ok(true)
    }
}

async fn load_comments(ctx: &AppContext, hack_id: Uuid) -> Result<Vec<CommentView>> {
    let comments = ctx.db.comments_for_hack(hack_id).await?;

    let mut author_ids: Vec<Uuid> = comments.iter().map(|c| c.user_id).collect();
    author_ids.sort();
    author_ids.dedup();

    let names: HashMap<Uuid, Option<String>> = ctx
        .db
        .profiles_by_ids(&author_ids)
        .await?
        .into_iter()
        .map(|p| (p.id, p.username))
        .collect();

    Ok(comments
        .into_iter()
        .map(|comment| CommentView {
            author: names.get(&comment.user_id).cloned().flatten(),
            comment,
        })
        .collect())
}
