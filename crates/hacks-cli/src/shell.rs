use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};
use uuid::Uuid;

use hacks_app::layout::Header;
use hacks_app::pages::auth::ACCOUNT_CREATED;
use hacks_app::pages::submit::SUBMITTED;
use hacks_app::pages::{AuthForm, AuthMode, AuthOutcome, ProfilePage};
use hacks_app::{AppContext, AppError, Page, Route, SearchBox, navigate};
use hacks_types::events::AuthEvent;

use crate::render;

pub const HELP: &str = "\
Commands:
  go <path>         open a page, e.g. go /category/Sleep
  back              return to the previous page
  search <text>     find questions by title, description or category
  upvote <n>        toggle your upvote on hack n of this page
  save <n>          toggle saving hack n of this page
  comment <text>    comment on the open hack
  submit            share a hack (opens the form)
  signin | signup   sign in or create an account
  signout           end your session
  whoami            show who is signed in
  help              show this list
  quit              leave";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Go(String),
    Back,
    Search(String),
    Upvote(usize),
    Save(usize),
    Comment(String),
    Submit,
    SignIn,
    SignUp,
    SignOut,
    WhoAmI,
    Help,
    Quit,
    Nothing,
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let command = match word.to_lowercase().as_str() {
            "" => Self::Nothing,
            "go" | "open" if !rest.is_empty() => Self::Go(rest.to_string()),
            "go" | "open" => return Err("usage: go <path>".into()),
            "back" => Self::Back,
            "search" | "/" => Self::Search(rest.to_string()),
            "upvote" | "vote" => Self::Upvote(item_number(rest)?),
            "save" | "unsave" => Self::Save(item_number(rest)?),
            "comment" if !rest.is_empty() => Self::Comment(rest.to_string()),
            "comment" => return Err("usage: comment <text>".into()),
            "submit" => Self::Submit,
            "signin" | "login" => Self::SignIn,
            "signup" | "register" => Self::SignUp,
            "signout" | "logout" => Self::SignOut,
            "whoami" => Self::WhoAmI,
            "help" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            other => return Err(format!("unknown command `{}`; type `help`", other)),
        };
        Ok(command)
    }
}

fn item_number(arg: &str) -> Result<usize, String> {
    match arg.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err("expected an item number from the page, e.g. upvote 1".into()),
    }
}

/// Interactive session over a line-oriented input.
pub struct Shell<R> {
    ctx: AppContext,
    page: Page,
    history: Vec<Route>,
    search: SearchBox,
    input: Lines<BufReader<R>>,
    events: broadcast::Receiver<AuthEvent>,
}

impl<R: AsyncRead + Unpin> Shell<R> {
    pub async fn open(ctx: AppContext, input: R) -> Result<Self, AppError> {
        let events = ctx.auth.subscribe();
        let page = navigate(&ctx, &Route::Home).await?;
        Ok(Self {
            ctx,
            page,
            history: Vec::new(),
            search: SearchBox::new(),
            input: BufReader::new(input).lines(),
            events,
        })
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub async fn run(&mut self) -> anyhow::Result<()> {
        self.print_page().await;
        let mut events_open = true;

        loop {
            tokio::select! {
                line = self.input.next_line() => {
                    let Some(line) = line? else { break };
                    match Command::parse(&line) {
                        Ok(Command::Quit) => break,
                        Ok(command) => self.execute(command).await?,
                        Err(usage) => println!("{}", usage),
                    }
                }
                event = self.events.recv(), if events_open => match event {
                    Ok(AuthEvent::TokenRefreshed { .. }) => debug!("access token refreshed"),
                    Ok(event) => {
                        debug!(?event, "session changed, reloading page");
                        self.reload().await;
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(skipped, "missed session events, reloading page");
                        self.reload().await;
                    }
                    Err(RecvError::Closed) => events_open = false,
                },
            }
        }
        Ok(())
    }

    pub async fn execute(&mut self, command: Command) -> anyhow::Result<()> {
        match command {
            Command::Nothing | Command::Quit => {}
            Command::Help => println!("{}", HELP),
            Command::Go(path) => match Route::parse(&path) {
                Some(route) => self.go(route).await,
                None => println!("No page at {}", path),
            },
            Command::Back => match self.history.pop() {
                Some(route) => self.show(route).await,
                None => println!("Nothing to go back to"),
            },
            Command::Search(text) => {
                self.ctx.refresh_session().await;
                match self.search.search(&self.ctx.db, &text).await {
                    Ok(results) => print!("{}", render::search_results(&text, results)),
                    Err(e) => report(&e),
                }
            }
            Command::Upvote(n) => self.toggle(n, true).await,
            Command::Save(n) => self.toggle(n, false).await,
            Command::Comment(text) => self.comment(&text).await,
            Command::Submit => self.submit().await?,
            Command::SignIn => self.authenticate(AuthMode::SignIn).await?,
            Command::SignUp => self.authenticate(AuthMode::SignUp).await?,
            Command::SignOut => {
                if self.ctx.user().await.is_none() {
                    println!("You are not signed in");
                } else {
                    let next = ProfilePage::sign_out(&self.ctx).await;
                    self.go(next).await;
                }
            }
            Command::WhoAmI => {
                let state = self.ctx.auth.snapshot().await;
                match state.user() {
                    Some(user) => {
                        let name = state
                            .profile
                            .as_ref()
                            .and_then(|p| p.username.clone())
                            .unwrap_or_else(|| "User".into());
                        println!(
                            "Signed in as {} <{}>",
                            name,
                            user.email.as_deref().unwrap_or("no email")
                        );
                    }
                    None => println!("Not signed in"),
                }
            }
        }
        Ok(())
    }

    async fn go(&mut self, route: Route) {
        self.history.push(self.page.route());
        self.show(route).await;
    }

    async fn show(&mut self, route: Route) {
        match navigate(&self.ctx, &route).await {
            Ok(page) => {
                self.page = page;
                self.search.clear();
                self.print_page().await;
            }
            Err(e) => report(&e),
        }
    }

    async fn reload(&mut self) {
        let route = self.page.route();
        self.show(route).await;
    }

    async fn print_page(&self) {
        let state = self.ctx.auth.snapshot().await;
        print!("{}", render::header(&Header::for_state(&state)));
        print!("{}", render::page(&self.page));
        print!("{}", render::footer());
    }

    async fn toggle(&mut self, n: usize, upvote: bool) {
        if let (Page::Hack(page), true, 1) = (&mut self.page, upvote, n) {
            match page.toggle_upvote(&self.ctx).await {
                Ok(()) => {
                    if let Some(card) = &page.card {
                        println!("{} · {}", card.hack.title, card.upvotes);
                    }
                }
                Err(e) => report(&e),
            }
            return;
        }

        let card = n
            .checked_sub(1)
            .and_then(|i| self.page.cards_mut().get_mut(i));
        let Some(card) = card else {
            println!("There is no hack {} on this page", n);
            return;
        };

        let result = if upvote {
            card.toggle_upvote(&self.ctx).await
        } else {
            card.toggle_save(&self.ctx).await
        };
        match result {
            Ok(()) if upvote => println!(
                "{} {} · {}",
                if card.has_voted { "Upvoted" } else { "Removed upvote from" },
                card.hack.title,
                card.upvotes
            ),
            Ok(()) => println!(
                "{} {}",
                if card.has_saved { "Saved" } else { "Unsaved" },
                card.hack.title
            ),
            Err(e) => report(&e),
        }
    }

    async fn comment(&mut self, text: &str) {
        let Page::Hack(page) = &mut self.page else {
            println!("Open a hack first, e.g. go /hack/<id>");
            return;
        };
        match page.post_comment(&self.ctx, text).await {
            Ok(true) => println!("Comment posted"),
            Ok(false) => {}
            Err(AppError::Db(e)) => {
                warn!("comment insert failed: {}", e);
                println!("Error posting comment. Please try again.");
            }
            Err(e) => report(&e),
        }
    }

    async fn submit(&mut self) -> anyhow::Result<()> {
        if !matches!(self.page, Page::Submit(_)) {
            let question = match &self.page {
                Page::Question(p) => Some(p.question_id),
                Page::Hack(p) => p.card.as_ref().map(|c| c.hack.question_id),
                _ => None,
            };
            self.go(Route::Submit { question }).await;
        }
        let Page::Submit(page) = &self.page else {
            return Ok(());
        };
        if !page.signed_in {
            return Ok(());
        }

        let choices: Vec<Uuid> = page
            .groups
            .iter()
            .flat_map(|(_, qs)| qs.iter().map(|q| q.id))
            .collect();
        let preselected = page.draft.question_id;

        let Some(pick) = self.prompt("Question number (blank keeps *)").await? else {
            return Ok(());
        };
        let question_id = match pick.parse::<usize>() {
            Ok(n) if n >= 1 && n <= choices.len() => Some(choices[n - 1]),
            _ => preselected,
        };
        let Some(title) = self.prompt("Hack title").await? else { return Ok(()) };
        let Some(description) = self.prompt("Description").await? else { return Ok(()) };
        let Some(why) = self.prompt("Why it works (optional)").await? else { return Ok(()) };

        let Page::Submit(page) = &mut self.page else {
            return Ok(());
        };
        page.draft.question_id = question_id;
        page.draft.title = title;
        page.draft.description = description;
        page.draft.why_it_works = why;

        match page.submit(&self.ctx).await {
            Ok(next) => {
                println!("{}", SUBMITTED);
                self.go(next).await;
            }
            Err(AppError::Db(e)) => {
                warn!("submission insert failed: {}", e);
                println!("Error submitting hack. Please try again.");
            }
            Err(e) => report(&e),
        }
        Ok(())
    }

    async fn authenticate(&mut self, mode: AuthMode) -> anyhow::Result<()> {
        let mut form = AuthForm {
            mode,
            ..AuthForm::default()
        };
        println!("{}: {}", mode.heading(), mode.tagline());

        if mode == AuthMode::SignUp {
            let Some(username) = self.prompt("Username").await? else { return Ok(()) };
            form.username = username;
        }
        let Some(email) = self.prompt("Email").await? else { return Ok(()) };
        let Some(password) = self.prompt("Password").await? else { return Ok(()) };
        form.email = email;
        form.password = password;

        match form.submit(&self.ctx).await {
            Ok(AuthOutcome::SignedIn(next)) => self.go(next).await,
            Ok(AuthOutcome::AwaitingConfirmation) => println!("{}", ACCOUNT_CREATED),
            Err(e) => report(&e),
        }
        Ok(())
    }

    /// Ask for one line; `None` when input has ended.
    async fn prompt(&mut self, label: &str) -> anyhow::Result<Option<String>> {
        println!("{}:", label);
        Ok(self.input.next_line().await?)
    }
}

fn report(error: &AppError) {
    match error {
        AppError::SignInRequired(_) | AppError::Validation(_) | AppError::Auth(_) => {
            println!("{}", error)
        }
        other => {
            warn!("action failed: {}", other);
            println!("Something went wrong: {}", other);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use assert_matches::assert_matches;

    use hacks_auth::{MemoryIdentity, SessionProvider};
    use hacks_db::{Database, LocalBackend};

    use super::*;

    #[test]
    fn parses_commands() {
        assert_eq!(Command::parse("go /category/Sleep"), Ok(Command::Go("/category/Sleep".into())));
        assert_eq!(Command::parse("  upvote 2 "), Ok(Command::Upvote(2)));
        assert_eq!(Command::parse("SAVE 1"), Ok(Command::Save(1)));
        assert_eq!(Command::parse("comment so good"), Ok(Command::Comment("so good".into())));
        assert_eq!(Command::parse("search"), Ok(Command::Search(String::new())));
        assert_eq!(Command::parse(""), Ok(Command::Nothing));
        assert_eq!(Command::parse("exit"), Ok(Command::Quit));
        assert!(Command::parse("upvote zero").is_err());
        assert!(Command::parse("upvote 0").is_err());
        assert!(Command::parse("go").is_err());
        assert!(Command::parse("dance").is_err());
    }

    async fn context() -> AppContext {
        let backend = LocalBackend::open_in_memory().unwrap();
        backend.seed_demo().unwrap();
        let auth = SessionProvider::new(
            Arc::new(MemoryIdentity::new()),
            Database::new(Arc::new(backend)),
            None,
        );
        auth.initialize().await;
        AppContext::new(auth)
    }

    #[tokio::test]
    async fn scripted_session() {
        let input: &[u8] = b"signup\nsam\nsam@example.com\nbedtime1\nupvote 1\ngo /profile\nback\nsignout\nquit\n";
        let mut shell = Shell::open(context().await, input).await.unwrap();
        shell.run().await.unwrap();

        assert_matches!(shell.page(), Page::Home(home) if home.cards[0].upvotes == 59);
    }

    #[tokio::test]
    async fn navigation_history() {
        let ctx = context().await;
        let mut shell = Shell::open(ctx, &b""[..]).await.unwrap();

        shell.execute(Command::Go("/category/Sleep".into())).await.unwrap();
        assert_eq!(shell.page().route(), Route::Category("Sleep".into()));

        shell.execute(Command::Go("/nowhere".into())).await.unwrap();
        assert_eq!(shell.page().route(), Route::Category("Sleep".into()));

        shell.execute(Command::Back).await.unwrap();
        assert_eq!(shell.page().route(), Route::Home);
    }
}
