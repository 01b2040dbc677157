//! Plain-text rendering of pages for the terminal.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};

use hacks_app::layout::{APP_TITLE, FOOTER, Header};
use hacks_app::pages::{
    AuthForm, CategoryPage, HackDetailPage, HomePage, ProfilePage, QuestionPage, SubmitPage,
};
use hacks_app::{HackCard, Page};
use hacks_types::models::{Hack, Question};

/// `Jan 5, 2024`
pub fn format_date(at: &DateTime<Utc>) -> String {
    at.format("%b %-d, %Y").to_string()
}

pub fn header(header: &Header) -> String {
    let mut out = String::new();
    let links: Vec<String> = header
        .links
        .iter()
        .map(|(label, route)| format!("{} ({})", label, route))
        .collect();
    match header.avatar {
        Some(initial) => {
            let _ = writeln!(out, "{}  [{}]  {}", APP_TITLE, initial, links.join("  "));
        }
        None => {
            let _ = writeln!(out, "{}  {}", APP_TITLE, links.join("  "));
        }
    }
    let _ = writeln!(out, "{}", "=".repeat(60));
    out
}

pub fn footer() -> String {
    format!("{}\n{}\n", "-".repeat(60), FOOTER)
}

pub fn page(page: &Page) -> String {
    match page {
        Page::Home(p) => home(p),
        Page::Category(p) => category(p),
        Page::Question(p) => question(p),
        Page::Hack(p) => hack_detail(p),
        Page::Submit(p) => submit(p),
        Page::Auth(p) => auth(p),
        Page::Profile(p) => profile(p),
    }
}

fn home(page: &HomePage) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Trending Parent Hacks");
    let _ = writeln!(
        out,
        "The most upvoted solutions from real parents. Save your favorites and discover what works."
    );
    let _ = writeln!(out, "Type `search <words>` to find a question.\n");

    cards(&mut out, &page.cards, true);

    if !page.categories.is_empty() {
        let _ = writeln!(out, "\nBrowse by category:");
        for category in &page.categories {
            let _ = writeln!(
                out,
                "  {}  (go {})",
                category,
                hacks_app::Route::Category(category.clone())
            );
        }
    }
    out
}

fn category(page: &CategoryPage) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "< Back to home (go /)\n");
    let _ = writeln!(out, "Category");
    let _ = writeln!(out, "{}", page.category);
    let _ = writeln!(out, "{}\n", page.count_label());

    if page.questions.is_empty() {
        let _ = writeln!(out, "No questions in this category yet.");
    }
    for q in &page.questions {
        question_line(&mut out, q);
    }
    out
}

fn question(page: &QuestionPage) -> String {
    let mut out = String::new();
    let (back_label, back_route) = page.back();
    let _ = writeln!(out, "< {} (go {})\n", back_label, back_route);

    if let Some(q) = &page.question {
        let _ = writeln!(out, "[{}]", q.category);
        let _ = writeln!(out, "{}", q.title);
        if let Some(description) = &q.description {
            let _ = writeln!(out, "{}", description);
        }
    }

    let _ = writeln!(
        out,
        "\nSolutions ({})    + Add Hack (go {})\n",
        page.cards.len(),
        page.submit_route()
    );
    if page.cards.is_empty() {
        let _ = writeln!(out, "No hacks yet for this question");
        let _ = writeln!(out, "Be the first to share a solution (go {})", page.submit_route());
    }
    cards(&mut out, &page.cards, false);
    out
}

fn hack_detail(page: &HackDetailPage) -> String {
    let mut out = String::new();
    let Some(card) = &page.card else {
        let _ = writeln!(out, "Hack not found");
        let _ = writeln!(out, "< Back to home (go /)");
        return out;
    };
    let _ = writeln!(out, "< Back (go {})\n", page.back());

    if let Some(q) = &card.question {
        let _ = writeln!(out, "[{}] {}", q.category, q.title);
    }
    let _ = writeln!(
        out,
        "[1] {} {}  {}{}\n",
        vote_marker(card),
        card.upvotes,
        card.hack.title,
        if card.has_saved { "  (saved)" } else { "" }
    );
    let _ = writeln!(out, "{}", card.hack.description);
    hack_fields(&mut out, &card.hack);

    let _ = writeln!(out, "\nDiscussion ({})", page.comments.len());
    if page.comments.is_empty() {
        let _ = writeln!(out, "No comments yet. Start the conversation!");
    }
    for view in &page.comments {
        let _ = writeln!(
            out,
            "  ({}) {} · {}",
            view.initial(),
            view.author_name(),
            format_date(&view.comment.created_at)
        );
        let _ = writeln!(out, "      {}", view.comment.content);
    }
    out
}

fn submit(page: &SubmitPage) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "< Back to home (go /)\n");
    let _ = writeln!(out, "Submit a Hack");
    let _ = writeln!(out, "Share your parenting solution with the community\n");

    if !page.signed_in {
        let _ = writeln!(out, "You need to be signed in to submit a hack.");
        let _ = writeln!(out, "Sign In (go /auth)");
        return out;
    }

    let mut n = 0;
    for (category, questions) in &page.groups {
        let _ = writeln!(out, "{}", category);
        for q in questions {
            n += 1;
            let selected = page.draft.question_id == Some(q.id);
            let _ = writeln!(out, "  {}{:>2}. {}", if selected { "*" } else { " " }, n, q.title);
        }
    }
    let _ = writeln!(out, "\nType `submit` to fill in the form.");
    let _ = writeln!(out, "  • Be specific and detailed in your description");
    let _ = writeln!(out, "  • Share what actually worked for you");
    let _ = writeln!(out, "  • Your hack will be reviewed before being published");
    out
}

fn auth(form: &AuthForm) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "< Back to home (go /)\n");
    let _ = writeln!(out, "{}", form.mode.heading());
    let _ = writeln!(out, "{}\n", form.mode.tagline());
    let _ = writeln!(out, "Type `signin` to sign in or `signup` to create an account.");
    out
}

fn profile(page: &ProfilePage) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", page.display_name);
    if let Some(email) = &page.email {
        let _ = writeln!(out, "{}", email);
    }
    let _ = writeln!(out, "Type `signout` to sign out.\n");

    let _ = writeln!(out, "Saved Hacks ({})", page.saved.len());
    if page.saved.is_empty() {
        let _ = writeln!(out, "Nothing saved yet. Browse Hacks (go /)");
    }
    cards(&mut out, &page.saved, true);

    let _ = writeln!(out, "\nMy Submissions ({})", page.submissions.len());
    for view in &page.submissions {
        let title = view.submission.title.as_deref().unwrap_or("(untitled)");
        let _ = writeln!(
            out,
            "  [{}] {} · {}",
            view.submission.status.as_str(),
            title,
            format_date(&view.submission.created_at)
        );
        if let Some(question) = &view.question_title {
            let _ = writeln!(out, "      for: {}", question);
        }
    }
    out
}

fn cards(out: &mut String, cards: &[HackCard], with_question: bool) {
    for (i, card) in cards.iter().enumerate() {
        let _ = writeln!(
            out,
            "[{}] {} {:<4} {}{}",
            i + 1,
            vote_marker(card),
            card.upvotes,
            card.hack.title,
            if card.has_saved { "  (saved)" } else { "" }
        );
        if with_question {
            if let Some(q) = &card.question {
                let _ = writeln!(out, "         {} · {}", q.category, q.title);
            }
        }
        let _ = writeln!(out, "         {}", card.hack.description);
        let meta: Vec<&str> = [card.hack.age_range.as_deref(), card.hack.time_cost.as_deref()]
            .into_iter()
            .flatten()
            .collect();
        if !meta.is_empty() {
            let _ = writeln!(out, "         {}", meta.join(" · "));
        }
        let _ = writeln!(out, "         View details (go {})", hacks_app::Route::Hack(card.id()));
    }
}

fn hack_fields(out: &mut String, hack: &Hack) {
    let fields = [
        ("Why it works", &hack.why_it_works),
        ("Time", &hack.time_cost),
        ("Cost", &hack.money_cost),
        ("Intensity", &hack.intensity),
        ("Age", &hack.age_range),
        ("Use when", &hack.use_when),
        ("Avoid when", &hack.avoid_when),
    ];
    for (label, value) in fields {
        if let Some(value) = value {
            let _ = writeln!(out, "{}: {}", label, value);
        }
    }
}

fn question_line(out: &mut String, q: &Question) {
    let _ = writeln!(out, "• {}", q.title);
    if let Some(description) = &q.description {
        let _ = writeln!(out, "  {}", description);
    }
    let _ = writeln!(out, "  View hacks (go {})", hacks_app::Route::Question(q.id));
}

/// Search results as shown under the search box.
pub fn search_results(query: &str, results: &[Question]) -> String {
    let mut out = String::new();
    if query.trim().is_empty() {
        return out;
    }
    if results.is_empty() {
        let _ = writeln!(out, "No questions match \"{}\".", query.trim());
        return out;
    }
    for q in results {
        question_line(&mut out, q);
    }
    out
}

fn vote_marker(card: &HackCard) -> &'static str {
    if card.has_voted { "▲" } else { "△" }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use uuid::Uuid;

    use super::*;

    fn hack() -> Hack {
        Hack {
            id: Uuid::new_v4(),
            question_id: Uuid::new_v4(),
            title: "Same three songs every night".into(),
            description: "Play the same playlist.".into(),
            why_it_works: Some("Predictable cue.".into()),
            use_when: None,
            avoid_when: None,
            age_range: Some("1-4 years".into()),
            time_cost: Some("5 min".into()),
            money_cost: None,
            intensity: None,
            upvotes: 42,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn dates_read_like_the_web_app() {
        let at = Utc.with_ymd_and_hms(2024, 1, 5, 20, 0, 0).unwrap();
        assert_eq!(format_date(&at), "Jan 5, 2024");
        let at = Utc.with_ymd_and_hms(2023, 12, 25, 0, 0, 0).unwrap();
        assert_eq!(format_date(&at), "Dec 25, 2023");
    }

    #[test]
    fn cards_are_numbered_with_vote_state() {
        let mut card = HackCard::new(hack(), None);
        card.has_voted = true;
        card.has_saved = true;
        let page = Page::Home(HomePage {
            cards: vec![card],
            categories: vec!["Sleep".into()],
        });

        let text = super::page(&page);
        assert!(text.contains("[1] ▲ 42"));
        assert!(text.contains("(saved)"));
        assert!(text.contains("1-4 years · 5 min"));
        assert!(text.contains("Sleep  (go /category/Sleep)"));
    }

    #[test]
    fn empty_search_renders_nothing() {
        assert_eq!(search_results("  ", &[]), "");
        assert!(search_results("zzz", &[]).contains("No questions match \"zzz\""));
    }
}
