//! Page view-models against the local store and in-memory identity.

use std::sync::Arc;

use assert_matches::assert_matches;
use uuid::Uuid;

use hacks_app::card::{SIGN_IN_TO_SAVE, SIGN_IN_TO_UPVOTE};
use hacks_app::pages::hack::{SIGN_IN_TO_COMMENT, SIGN_IN_TO_VOTE};
use hacks_app::pages::submit::{MISSING_FIELDS, SIGN_IN_TO_SUBMIT};
use hacks_app::pages::{AuthForm, AuthMode, AuthOutcome, ProfilePage};
use hacks_app::{AppContext, AppError, Page, Route, SearchBox, navigate};
use hacks_auth::{AuthError, IdentityBackend, MemoryIdentity, SessionProvider};
use hacks_db::{Database, DbError, LocalBackend};
use hacks_types::events::AuthEvent;
use hacks_types::models::SubmissionStatus;

const SLEEP_QUESTION: &str = "00000000-0000-4000-8000-000000000101";
const PLAYLIST_HACK: &str = "00000000-0000-4000-8000-000000000201";
const SHOPPING_HACK: &str = "00000000-0000-4000-8000-000000000205";

fn id(s: &str) -> Uuid {
    Uuid::parse_str(s).unwrap()
}

async fn context_with(identity: MemoryIdentity) -> AppContext {
    let backend = LocalBackend::open_in_memory().unwrap();
    backend.seed_demo().unwrap();
    let db = Database::new(Arc::new(backend));
    let auth = SessionProvider::new(Arc::new(identity), db, None);
    auth.initialize().await;
    AppContext::new(auth)
}

async fn context() -> AppContext {
    context_with(MemoryIdentity::new()).await
}

async fn signed_in(username: &str) -> AppContext {
    let ctx = context().await;
    ctx.auth
        .sign_up(&format!("{}@example.com", username), "bedtime1", username)
        .await
        .unwrap();
    ctx
}

async fn open(ctx: &AppContext, route: Route) -> Page {
    navigate(ctx, &route).await.unwrap()
}

#[tokio::test]
async fn home_shows_trending_hacks_with_questions() {
    let ctx = context().await;
    let Page::Home(home) = open(&ctx, Route::Home).await else {
        panic!("expected home");
    };

    assert_eq!(home.cards.len(), 5);
    assert_eq!(home.cards[0].id(), id(SHOPPING_HACK));
    assert_eq!(
        home.cards[0].question.as_ref().map(|q| q.category.as_str()),
        Some("Tantrums")
    );
    assert!(home.cards.iter().all(|c| !c.has_voted && !c.has_saved));
    assert_eq!(home.categories, vec!["Eating", "Screen Time", "Sleep", "Tantrums"]);
}

#[tokio::test]
async fn upvoting_twice_restores_the_count() {
    let ctx = signed_in("sam").await;
    let user = ctx.user_id().await.unwrap();
    let mut page = open(&ctx, Route::Question(id(SLEEP_QUESTION))).await;
    let card = &mut page.cards_mut()[0];
    assert_eq!(card.id(), id(PLAYLIST_HACK));
    assert_eq!(card.upvotes, 42);

    card.toggle_upvote(&ctx).await.unwrap();
    assert_eq!((card.upvotes, card.has_voted), (43, true));
    assert_eq!(ctx.db.hack_by_id(card.id()).await.unwrap().unwrap().upvotes, 43);
    assert!(ctx.db.has_voted(user, card.id()).await.unwrap());

    card.toggle_upvote(&ctx).await.unwrap();
    assert_eq!((card.upvotes, card.has_voted), (42, false));
    assert_eq!(ctx.db.hack_by_id(card.id()).await.unwrap().unwrap().upvotes, 42);
    assert!(!ctx.db.has_voted(user, card.id()).await.unwrap());
}

#[tokio::test]
async fn vote_flags_survive_reload() {
    let ctx = signed_in("sam").await;
    let mut page = open(&ctx, Route::Home).await;
    page.cards_mut()[1].toggle_upvote(&ctx).await.unwrap();
    let voted = page.cards_mut()[1].id();

    let Page::Home(home) = open(&ctx, Route::Home).await else {
        panic!("expected home");
    };
    let card = home.cards.iter().find(|c| c.id() == voted).unwrap();
    assert!(card.has_voted);
}

#[tokio::test]
async fn signed_out_viewers_cannot_vote_or_save() {
    let ctx = context().await;
    let mut page = open(&ctx, Route::Home).await;
    let card = &mut page.cards_mut()[0];

    let err = card.toggle_upvote(&ctx).await.unwrap_err();
    assert_eq!(err.to_string(), SIGN_IN_TO_UPVOTE);
    assert_eq!((card.upvotes, card.has_voted), (58, false));

    let err = card.toggle_save(&ctx).await.unwrap_err();
    assert_matches!(err, AppError::SignInRequired(msg) if msg == SIGN_IN_TO_SAVE);
    assert!(!card.has_saved);
}

#[tokio::test]
async fn failed_vote_restores_the_card() {
    let ctx = signed_in("sam").await;
    let user = ctx.user_id().await.unwrap();
    let mut page = open(&ctx, Route::Home).await;

    // Vote behind the card's back so its insert collides
    let card = &mut page.cards_mut()[0];
    ctx.db.insert_vote(user, card.id()).await.unwrap();

    let err = card.toggle_upvote(&ctx).await.unwrap_err();
    assert_matches!(err, AppError::Db(DbError::Conflict(_)));
    assert_eq!((card.upvotes, card.has_voted), (58, false));
}

#[tokio::test]
async fn failed_save_restores_the_card() {
    let ctx = signed_in("sam").await;
    let user = ctx.user_id().await.unwrap();
    let mut page = open(&ctx, Route::Home).await;

    let card = &mut page.cards_mut()[0];
    ctx.db.insert_saved(user, card.id()).await.unwrap();

    let err = card.toggle_save(&ctx).await.unwrap_err();
    assert_matches!(err, AppError::Db(DbError::Conflict(_)));
    assert!(!card.has_saved);
}

#[tokio::test]
async fn expired_session_is_refreshed_before_loading_and_writing() {
    let ctx = context_with(MemoryIdentity::new().with_ttl(0)).await;
    ctx.auth
        .sign_up("sam@example.com", "bedtime1", "sam")
        .await
        .unwrap();
    let stale = ctx.auth.session().await.unwrap().refresh_token;
    let mut events = ctx.auth.subscribe();

    let mut page = open(&ctx, Route::Home).await;
    assert_matches!(events.try_recv(), Ok(AuthEvent::TokenRefreshed { .. }));
    let fresh = ctx.auth.session().await.unwrap().refresh_token;
    assert_ne!(stale, fresh);

    page.cards_mut()[0].toggle_upvote(&ctx).await.unwrap();
    assert_matches!(events.try_recv(), Ok(AuthEvent::TokenRefreshed { .. }));
    assert!(ctx.user().await.is_some());
}

#[tokio::test]
async fn saved_hacks_show_on_the_profile() {
    let ctx = signed_in("sam").await;
    let mut page = open(&ctx, Route::Home).await;
    for card in page.cards_mut().iter_mut().take(2) {
        card.toggle_save(&ctx).await.unwrap();
        assert!(card.has_saved);
    }

    let Page::Profile(profile) = open(&ctx, Route::Profile).await else {
        panic!("expected profile");
    };
    assert_eq!(profile.display_name, "sam");
    assert_eq!(profile.email.as_deref(), Some("sam@example.com"));
    assert_eq!(profile.saved.len(), 2);
    assert!(profile.saved.iter().all(|c| c.has_saved && c.question.is_some()));

    // Unsaving from the profile takes it off the list on reload
    let mut page = Page::Profile(profile);
    page.cards_mut()[0].toggle_save(&ctx).await.unwrap();
    let Page::Profile(profile) = open(&ctx, Route::Profile).await else {
        panic!("expected profile");
    };
    assert_eq!(profile.saved.len(), 1);
}

#[tokio::test]
async fn profile_redirects_signed_out_viewers() {
    let ctx = context().await;
    let page = open(&ctx, Route::Profile).await;
    assert_matches!(page, Page::Auth(_));
    assert_eq!(page.route(), Route::Auth);
}

#[tokio::test]
async fn search_matches_title_description_and_category() {
    let ctx = context().await;
    let mut search = SearchBox::new();

    let results = search.search(&ctx.db, "toddler to sleep").await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, id(SLEEP_QUESTION));

    assert_eq!(search.search(&ctx.db, "beige").await.unwrap().len(), 1);
    assert_eq!(search.search(&ctx.db, "screen time").await.unwrap().len(), 1);
    assert!(search.search(&ctx.db, "  ").await.unwrap().is_empty());
    assert!(search.search(&ctx.db, "100%").await.unwrap().is_empty());
}

#[tokio::test]
async fn category_page_counts_questions() {
    let ctx = context().await;

    let Page::Category(sleep) = open(&ctx, Route::Category("Sleep".into())).await else {
        panic!("expected category");
    };
    assert_eq!(sleep.count_label(), "2 questions");
    assert!(sleep.questions[0].created_at > sleep.questions[1].created_at);

    let Page::Category(eating) = open(&ctx, Route::Category("Eating".into())).await else {
        panic!("expected category");
    };
    assert_eq!(eating.count_label(), "1 question");

    let Page::Category(none) = open(&ctx, Route::Category("Homework".into())).await else {
        panic!("expected category");
    };
    assert_eq!(none.count_label(), "0 questions");
}

#[tokio::test]
async fn question_page_links() {
    let ctx = context().await;
    let Page::Question(page) = open(&ctx, Route::Question(id(SLEEP_QUESTION))).await else {
        panic!("expected question");
    };
    assert_eq!(page.cards.len(), 2);
    assert!(page.cards[0].upvotes >= page.cards[1].upvotes);
    assert_eq!(page.back(), ("Back to Sleep".to_string(), Route::Category("Sleep".into())));
    assert_eq!(page.submit_route().path(), format!("/submit?question={}", SLEEP_QUESTION));

    let Page::Question(missing) = open(&ctx, Route::Question(Uuid::new_v4())).await else {
        panic!("expected question");
    };
    assert!(missing.question.is_none());
    assert!(missing.cards.is_empty());
    assert_eq!(missing.back().1, Route::Home);
}

#[tokio::test]
async fn comments_are_newest_first_with_authors() {
    let ctx = signed_in("sam").await;
    let Page::Hack(mut page) = open(&ctx, Route::Hack(id(PLAYLIST_HACK))).await else {
        panic!("expected hack");
    };
    assert_eq!(page.back(), Route::Question(id(SLEEP_QUESTION)));
    assert!(page.comments.is_empty());

    assert!(page.post_comment(&ctx, "  Worked for us  ").await.unwrap());
    assert!(!page.post_comment(&ctx, "   ").await.unwrap());
    // Timestamps have millisecond resolution
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    assert!(page.post_comment(&ctx, "Second night too").await.unwrap());
    assert_eq!(page.comments.len(), 2);
    assert_eq!(page.comments[0].comment.content, "Second night too");
    assert_eq!(page.comments[1].author_name(), "sam");

    let Page::Hack(reloaded) = open(&ctx, Route::Hack(id(PLAYLIST_HACK))).await else {
        panic!("expected hack");
    };
    let contents: Vec<&str> = reloaded
        .comments
        .iter()
        .map(|c| c.comment.content.as_str())
        .collect();
    assert_eq!(contents, vec!["Second night too", "Worked for us"]);
    assert_eq!(reloaded.comments[0].initial(), 'S');
}

#[tokio::test]
async fn commenting_needs_a_session() {
    let ctx = context().await;
    let Page::Hack(mut page) = open(&ctx, Route::Hack(id(PLAYLIST_HACK))).await else {
        panic!("expected hack");
    };
    let err = page.post_comment(&ctx, "hello").await.unwrap_err();
    assert_eq!(err.to_string(), SIGN_IN_TO_COMMENT);
}

#[tokio::test]
async fn detail_page_has_its_own_upvote_prompt() {
    let ctx = context().await;
    let Page::Hack(mut page) = open(&ctx, Route::Hack(id(PLAYLIST_HACK))).await else {
        panic!("expected hack");
    };
    let err = page.toggle_upvote(&ctx).await.unwrap_err();
    assert_eq!(err.to_string(), SIGN_IN_TO_VOTE);

    let ctx = signed_in("sam").await;
    let Page::Hack(mut page) = open(&ctx, Route::Hack(id(PLAYLIST_HACK))).await else {
        panic!("expected hack");
    };
    page.toggle_upvote(&ctx).await.unwrap();
    assert_eq!(page.card.as_ref().map(|c| c.upvotes), Some(43));
}

#[tokio::test]
async fn unknown_hack_renders_not_found() {
    let ctx = context().await;
    let Page::Hack(page) = open(&ctx, Route::Hack(Uuid::new_v4())).await else {
        panic!("expected hack");
    };
    assert!(page.card.is_none());
    assert_eq!(page.back(), Route::Home);
}

#[tokio::test]
async fn submit_flow() {
    let ctx = context().await;
    let Page::Submit(mut page) = open(&ctx, Route::Submit { question: Some(id(SLEEP_QUESTION)) }).await else {
        panic!("expected submit");
    };
    assert!(!page.signed_in);
    assert_eq!(page.groups.len(), 4);
    assert_eq!(page.groups[0].0, "Eating");
    assert!(page.question(id(SLEEP_QUESTION)).is_some());

    page.draft.title = "White noise".into();
    page.draft.description = "Fan on low all night".into();
    let err = page.submit(&ctx).await.unwrap_err();
    assert_matches!(err, AppError::SignInRequired(msg) if msg == SIGN_IN_TO_SUBMIT);

    ctx.auth
        .sign_up("sam@example.com", "bedtime1", "sam")
        .await
        .unwrap();

    page.draft.description = "   ".into();
    let err = page.submit(&ctx).await.unwrap_err();
    assert_eq!(err.to_string(), MISSING_FIELDS);

    page.draft.description = "Fan on low all night".into();
    let next = page.submit(&ctx).await.unwrap();
    assert_eq!(next, Route::Question(id(SLEEP_QUESTION)));

    let Page::Profile(profile) = open(&ctx, Route::Profile).await else {
        panic!("expected profile");
    };
    assert_eq!(profile.submissions.len(), 1);
    let view = &profile.submissions[0];
    assert_eq!(view.submission.status, SubmissionStatus::Pending);
    assert_eq!(view.submission.why_it_works, None);
    assert_eq!(
        view.question_title.as_deref(),
        Some("How do I get my toddler to sleep through the night?")
    );

    // Submissions are queued for review, not published
    let Page::Question(question) = open(&ctx, next).await else {
        panic!("expected question");
    };
    assert_eq!(question.cards.len(), 2);
}

#[tokio::test]
async fn auth_form_sign_up_and_sign_in() {
    let ctx = context().await;
    let mut form = AuthForm::default();
    form.toggle_mode();
    assert_eq!(form.mode, AuthMode::SignUp);
    form.email = "sam@example.com".into();
    form.password = "bedtime1".into();

    let err = form.submit(&ctx).await.unwrap_err();
    assert_eq!(err.to_string(), "Please enter a username");

    form.username = "sam".into();
    assert_eq!(form.submit(&ctx).await.unwrap(), AuthOutcome::SignedIn(Route::Home));
    assert_eq!(ctx.auth.profile().await.unwrap().username.as_deref(), Some("sam"));

    assert_eq!(ProfilePage::sign_out(&ctx).await, Route::Home);
    assert!(ctx.user().await.is_none());

    form.toggle_mode();
    form.password = "wrong-one".into();
    let err = form.submit(&ctx).await.unwrap_err();
    assert_matches!(err, AppError::Auth(AuthError::InvalidCredentials));
    assert_eq!(err.to_string(), "Invalid login credentials");

    form.password = "bedtime1".into();
    assert_eq!(form.submit(&ctx).await.unwrap(), AuthOutcome::SignedIn(Route::Home));
    assert!(ctx.user().await.is_some());
}

#[tokio::test]
async fn sign_up_awaiting_confirmation() {
    let identity = MemoryIdentity::requiring_confirmation();
    let ctx = context_with(identity.clone()).await;
    let form = AuthForm {
        mode: AuthMode::SignUp,
        email: "sam@example.com".into(),
        password: "bedtime1".into(),
        username: "sam".into(),
    };

    assert_eq!(form.submit(&ctx).await.unwrap(), AuthOutcome::AwaitingConfirmation);
    assert!(ctx.user().await.is_none());

    let err = identity
        .sign_in_with_password(&hacks_types::api::PasswordCredentials {
            email: "sam@example.com".into(),
            password: "bedtime1".into(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Email not confirmed");
}

#[tokio::test]
async fn missing_credentials_are_rejected_before_any_request() {
    let ctx = context().await;
    let form = AuthForm {
        email: "  ".into(),
        ..AuthForm::default()
    };
    assert_matches!(form.submit(&ctx).await, Err(AppError::Validation(_)));
}
