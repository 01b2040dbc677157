use std::collections::HashSet;

use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use hacks_types::models::{
    Comment, Hack, HackSubmission, NewComment, NewProfile, NewSavedHack, NewSubmission, NewVote,
    Profile, Question, SavedHack,
};

use crate::query::{Direction, Filter, Query, contains_pattern};
use crate::{Database, Result};

pub const PROFILES: &str = "profiles";
pub const QUESTIONS: &str = "questions";
pub const HACKS: &str = "hacks";
pub const HACK_VOTES: &str = "hack_votes";
pub const SAVED_HACKS: &str = "saved_hacks";
pub const HACK_SUBMISSIONS: &str = "hack_submissions";
pub const HACK_COMMENTS: &str = "hack_comments";

/// Upper bound used for "all rows" listings, matching the hosted API's
/// `range(0, 9999)` convention.
pub const MAX_LISTING: u64 = 10_000;

#[derive(Deserialize)]
struct HackIdRow {
    hack_id: Uuid,
}

fn ids(values: &[Uuid]) -> Vec<String> {
    values.iter().map(Uuid::to_string).collect()
}

impl Database {
    // -- Profiles --

    pub async fn profile_by_id(&self, id: Uuid) -> Result<Option<Profile>> {
        self.fetch_optional(&Query::select(PROFILES).eq("id", id.to_string()))
            .await
    }

    pub async fn profiles_by_ids(&self, user_ids: &[Uuid]) -> Result<Vec<Profile>> {
        if user_ids.is_empty() {
            return Ok(vec![]);
        }
        self.fetch(&Query::select(PROFILES).in_list("id", ids(user_ids)))
            .await
    }

    pub async fn insert_profile(&self, id: Uuid, username: &str) -> Result<()> {
        self.insert(
            PROFILES,
            &NewProfile {
                id,
                username: username.to_string(),
            },
        )
        .await
    }

    // -- Questions --

    pub async fn all_questions(&self) -> Result<Vec<Question>> {
        self.fetch(&Query::select(QUESTIONS)).await
    }

    /// All questions ordered by category, for grouped pickers.
    pub async fn questions_by_category_order(&self) -> Result<Vec<Question>> {
        self.fetch(&Query::select(QUESTIONS).order("category", Direction::Asc))
            .await
    }

    /// Questions of one category, newest first.
    pub async fn questions_in_category(&self, category: &str) -> Result<Vec<Question>> {
        self.fetch(
            &Query::select(QUESTIONS)
                .eq("category", category)
                .order("created_at", Direction::Desc)
                .range(0, MAX_LISTING - 1),
        )
        .await
    }

    pub async fn question_by_id(&self, id: Uuid) -> Result<Option<Question>> {
        self.fetch_optional(&Query::select(QUESTIONS).eq("id", id.to_string()))
            .await
    }

    pub async fn questions_by_ids(&self, question_ids: &[Uuid]) -> Result<Vec<Question>> {
        if question_ids.is_empty() {
            return Ok(vec![]);
        }
        self.fetch(&Query::select(QUESTIONS).in_list("id", ids(question_ids)))
            .await
    }

    /// Substring match on title, description or category.
    pub async fn search_questions(&self, term: &str, limit: u64) -> Result<Vec<Question>> {
        let pattern = contains_pattern(term);
        self.fetch(
            &Query::select(QUESTIONS)
                .or(vec![
                    Filter::ilike("title", pattern.clone()),
                    Filter::ilike("description", pattern.clone()),
                    Filter::ilike("category", pattern),
                ])
                .limit(limit),
        )
        .await
    }

    // -- Hacks --

    /// Most upvoted hacks across all questions.
    pub async fn top_hacks(&self, limit: u64) -> Result<Vec<Hack>> {
        self.fetch(
            &Query::select(HACKS)
                .order("upvotes", Direction::Desc)
                .limit(limit),
        )
        .await
    }

    pub async fn hacks_for_question(&self, question_id: Uuid) -> Result<Vec<Hack>> {
        self.fetch(
            &Query::select(HACKS)
                .eq("question_id", question_id.to_string())
                .order("upvotes", Direction::Desc)
                .range(0, MAX_LISTING - 1),
        )
        .await
    }

    pub async fn hack_by_id(&self, id: Uuid) -> Result<Option<Hack>> {
        self.fetch_optional(&Query::select(HACKS).eq("id", id.to_string()))
            .await
    }

    pub async fn hacks_by_ids(&self, hack_ids: &[Uuid]) -> Result<Vec<Hack>> {
        if hack_ids.is_empty() {
            return Ok(vec![]);
        }
        self.fetch(&Query::select(HACKS).in_list("id", ids(hack_ids)))
            .await
    }

    /// Overwrite the denormalized counter. Not atomic with the vote row.
    pub async fn set_upvotes(&self, hack_id: Uuid, upvotes: i64) -> Result<()> {
        self.run(&Query::update(HACKS, json!({ "upvotes": upvotes })).eq("id", hack_id.to_string()))
            .await?;
        Ok(())
    }

    // -- Votes --

    /// Which of `hack_ids` the user has upvoted.
    pub async fn voted_hack_ids(&self, user_id: Uuid, hack_ids: &[Uuid]) -> Result<HashSet<Uuid>> {
        self.hack_ids_in(HACK_VOTES, user_id, hack_ids).await
    }

    pub async fn has_voted(&self, user_id: Uuid, hack_id: Uuid) -> Result<bool> {
        Ok(!self.voted_hack_ids(user_id, &[hack_id]).await?.is_empty())
    }

    pub async fn insert_vote(&self, user_id: Uuid, hack_id: Uuid) -> Result<()> {
        self.insert(HACK_VOTES, &NewVote { hack_id, user_id }).await
    }

    pub async fn delete_vote(&self, user_id: Uuid, hack_id: Uuid) -> Result<()> {
        self.run(
            &Query::delete(HACK_VOTES)
                .eq("hack_id", hack_id.to_string())
                .eq("user_id", user_id.to_string()),
        )
        .await?;
        Ok(())
    }

    // -- Saved hacks --

    pub async fn saved_hack_ids(&self, user_id: Uuid, hack_ids: &[Uuid]) -> Result<HashSet<Uuid>> {
        self.hack_ids_in(SAVED_HACKS, user_id, hack_ids).await
    }

    pub async fn has_saved(&self, user_id: Uuid, hack_id: Uuid) -> Result<bool> {
        Ok(!self.saved_hack_ids(user_id, &[hack_id]).await?.is_empty())
    }

    /// Join rows for everything the user saved, most recent first.
    pub async fn saved_hacks_for_user(&self, user_id: Uuid) -> Result<Vec<SavedHack>> {
        self.fetch(
            &Query::select(SAVED_HACKS)
                .eq("user_id", user_id.to_string())
                .order("created_at", Direction::Desc),
        )
        .await
    }

    pub async fn insert_saved(&self, user_id: Uuid, hack_id: Uuid) -> Result<()> {
        self.insert(SAVED_HACKS, &NewSavedHack { hack_id, user_id })
            .await
    }

    pub async fn delete_saved(&self, user_id: Uuid, hack_id: Uuid) -> Result<()> {
        self.run(
            &Query::delete(SAVED_HACKS)
                .eq("hack_id", hack_id.to_string())
                .eq("user_id", user_id.to_string()),
        )
        .await?;
        Ok(())
    }

    async fn hack_ids_in(&self, table: &str, user_id: Uuid, hack_ids: &[Uuid]) -> Result<HashSet<Uuid>> {
        if hack_ids.is_empty() {
            return Ok(HashSet::new());
        }
        let rows: Vec<HackIdRow> = self
            .fetch(
                &Query::select(table)
                    .columns("hack_id")
                    .eq("user_id", user_id.to_string())
                    .in_list("hack_id", ids(hack_ids)),
            )
            .await?;
        Ok(rows.into_iter().map(|r| r.hack_id).collect())
    }

    // -- Comments --

    /// Comments on a hack, newest first.
    pub async fn comments_for_hack(&self, hack_id: Uuid) -> Result<Vec<Comment>> {
        self.fetch(
            &Query::select(HACK_COMMENTS)
                .eq("hack_id", hack_id.to_string())
                .order("created_at", Direction::Desc),
        )
        .await
    }

    pub async fn insert_comment(&self, comment: &NewComment) -> Result<Comment> {
        self.insert_returning(HACK_COMMENTS, comment).await
    }

    // -- Submissions --

    pub async fn insert_submission(&self, submission: &NewSubmission) -> Result<HackSubmission> {
        self.insert_returning(HACK_SUBMISSIONS, submission).await
    }

    pub async fn submissions_for_user(&self, user_id: Uuid) -> Result<Vec<HackSubmission>> {
        self.fetch(
            &Query::select(HACK_SUBMISSIONS)
                .eq("user_id", user_id.to_string())
                .order("created_at", Direction::Desc),
        )
        .await
    }
}
