//! Page view-models. Each page loads its rows once per navigation and then
//! exposes the actions its screen offers.

pub mod auth;
pub mod category;
pub mod hack;
pub mod home;
pub mod profile;
pub mod question;
pub mod submit;

use tracing::info;

use crate::card::HackCard;
use crate::{AppContext, Result, Route};

pub use auth::{AuthForm, AuthMode, AuthOutcome};
pub use category::CategoryPage;
pub use hack::{CommentView, HackDetailPage};
pub use home::HomePage;
pub use profile::{ProfilePage, SubmissionView};
pub use question::QuestionPage;
pub use submit::{HackDraft, SubmitPage};

#[derive(Debug)]
pub enum Page {
    Home(HomePage),
    Category(CategoryPage),
    Question(QuestionPage),
    Hack(HackDetailPage),
    Submit(SubmitPage),
    Auth(AuthForm),
    Profile(ProfilePage),
}

impl Page {
    /// The route this page is actually showing; differs from the requested
    /// one after a redirect.
    pub fn route(&self) -> Route {
        match self {
            Self::Home(_) => Route::Home,
            Self::Category(page) => Route::Category(page.category.clone()),
            Self::Question(page) => Route::Question(page.question_id),
            Self::Hack(page) => Route::Hack(page.hack_id),
            Self::Submit(page) => Route::Submit {
                question: page.draft.question_id,
            },
            Self::Auth(_) => Route::Auth,
            Self::Profile(_) => Route::Profile,
        }
    }

    /// Cards the viewer can act on, in display order.
    pub fn cards_mut(&mut self) -> &mut [HackCard] {
        match self {
            Self::Home(page) => &mut page.cards,
            Self::Question(page) => &mut page.cards,
            Self::Hack(page) => match &mut page.card {
                Some(card) => std::slice::from_mut(card),
                None => &mut [],
            },
            Self::Profile(page) => &mut page.saved,
            Self::Category(_) | Self::Submit(_) | Self::Auth(_) => &mut [],
        }
    }
}

/// Load the page for `route`.
///
/// The profile needs a signed-in user and sends everyone else to the
/// sign-in form.
pub async fn navigate(ctx: &AppContext, route: &Route) -> Result<Page> {
    info!(path = %route, "navigating");
    ctx.refresh_session().await;
    let page = match route {
        Route::Home => Page::Home(HomePage::load(ctx).await?),
        Route::Category(category) => Page::Category(CategoryPage::load(ctx, category).await?),
        Route::Question(id) => Page::Question(QuestionPage::load(ctx, *id).await?),
        Route::Hack(id) => Page::Hack(HackDetailPage::load(ctx, *id).await?),
        Route::Submit { question } => Page::Submit(SubmitPage::load(ctx, *question).await?),
        Route::Auth => Page::Auth(AuthForm::default()),
        Route::Profile => match ctx.user().await {
            Some(user) => Page::Profile(ProfilePage::load(ctx, &user).await?),
            None => {
                info!("profile needs a session, redirecting to sign-in");
                Page::Auth(AuthForm::default())
            }
        },
    };
    Ok(page)
}
