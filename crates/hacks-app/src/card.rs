use std::collections::HashMap;

use tracing::{debug, warn};
use uuid::Uuid;

use hacks_types::models::{Hack, Question};

use crate::{AppContext, Result};

pub const SIGN_IN_TO_UPVOTE: &str = "Sign in to upvote hacks!";
pub const SIGN_IN_TO_SAVE: &str = "Sign in to save hacks!";

/// A hack as shown in lists, with the viewer's vote and save state.
///
/// `upvotes` is the locally displayed count and may run ahead of the row in
/// `hack` while a toggle is in flight.
#[derive(Debug, Clone)]
pub struct HackCard {
    pub hack: Hack,
    pub question: Option<Question>,
    pub upvotes: i64,
    pub has_voted: bool,
    pub has_saved: bool,
}

impl HackCard {
    pub fn new(hack: Hack, question: Option<Question>) -> Self {
        Self {
            upvotes: hack.upvotes,
            hack,
            question,
            has_voted: false,
            has_saved: false,
        }
    }

    pub fn id(&self) -> Uuid {
        self.hack.id
    }

    /// Add or remove the viewer's upvote.
    ///
    /// The card flips first; the vote row and the counter are written
    /// concurrently and the card is restored if either write fails.
    pub async fn toggle_upvote(&mut self, ctx: &AppContext) -> Result<()> {
        let user = ctx.require_user(SIGN_IN_TO_UPVOTE).await?;
        let (previous_count, previous_voted) = (self.upvotes, self.has_voted);
        let removing = previous_voted;
        let count = if removing { previous_count - 1 } else { previous_count + 1 };

        self.upvotes = count;
        self.has_voted = !removing;

        let hack_id = self.hack.id;
        let row = async {
            if removing {
                ctx.db.delete_vote(user.id, hack_id).await
            } else {
                ctx.db.insert_vote(user.id, hack_id).await
            }
        };
        let counter = ctx.db.set_upvotes(hack_id, count);

        match tokio::try_join!(row, counter) {
            Ok(_) => {
                self.hack.upvotes = count;
                debug!(hack_id = %hack_id, upvotes = count, voted = !removing, "vote toggled");
                Ok(())
            }
            Err(e) => {
                warn!(hack_id = %hack_id, "vote toggle failed, restoring: {}", e);
                self.upvotes = previous_count;
                self.has_voted = previous_voted;
                Err(e.into())
            }
        }
    }

    /// Save or unsave the hack for the viewer, restoring on failure.
    pub async fn toggle_save(&mut self, ctx: &AppContext) -> Result<()> {
        let user = ctx.require_user(SIGN_IN_TO_SAVE).await?;
        let removing = self.has_saved;
        self.has_saved = !removing;

        let written = if removing {
            ctx.db.delete_saved(user.id, self.hack.id).await
        } else {
            ctx.db.insert_saved(user.id, self.hack.id).await
        };

        if let Err(e) = written {
            warn!(hack_id = %self.hack.id, "save toggle failed, restoring: {}", e);
            self.has_saved = removing;
            return Err(e.into());
        }
        Ok(())
    }
}

/// Pair each hack with its question through an id lookup.
pub fn join_questions(hacks: Vec<Hack>, questions: &[Question]) -> Vec<HackCard> {
    let by_id: HashMap<Uuid, &Question> = questions.iter().map(|q| (q.id, q)).collect();
    hacks
        .into_iter()
        .map(|hack| {
            let question = by_id.get(&hack.question_id).map(|q| (*q).clone());
            HackCard::new(hack, question)
        })
        .collect()
}

/// Fill in the viewer's vote and save flags with two concurrent lookups.
///
/// Signed-out viewers and lookup failures leave every flag false.
pub async fn attach_flags(ctx: &AppContext, cards: &mut [HackCard]) {
    let Some(user_id) = ctx.user_id().await else {
        return;
    };
    if cards.is_empty() {
        return;
    }

    let ids: Vec<Uuid> = cards.iter().map(HackCard::id).collect();
    let (voted, saved) = tokio::join!(
        ctx.db.voted_hack_ids(user_id, &ids),
        ctx.db.saved_hack_ids(user_id, &ids)
    );

    let voted = voted.unwrap_or_else(|e| {
        warn!(user_id = %user_id, "vote lookup failed: {}", e);
        Default::default()
    });
    let saved = saved.unwrap_or_else(|e| {
        warn!(user_id = %user_id, "saved lookup failed: {}", e);
        Default::default()
    });

    for card in cards {
        card.has_voted = voted.contains(&card.hack.id);
        card.has_saved = saved.contains(&card.hack.id);
    }
}
