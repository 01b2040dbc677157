use rusqlite::Connection;
use tracing::info;

use crate::Result;

/// Tables served by the local backend, with whether rows carry a generated
/// `id` primary key.
pub const TABLES: &[(&str, bool)] = &[
    ("profiles", false),
    ("questions", true),
    ("hacks", true),
    ("hack_votes", true),
    ("saved_hacks", false),
    ("hack_submissions", true),
    ("hack_comments", true),
];

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS profiles (
            id          TEXT PRIMARY KEY,
            username    TEXT,
            created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );

        CREATE TABLE IF NOT EXISTS questions (
            id          TEXT PRIMARY KEY,
            title       TEXT NOT NULL,
            category    TEXT NOT NULL,
            description TEXT,
            created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );

        CREATE INDEX IF NOT EXISTS idx_questions_category
            ON questions(category, created_at);

        CREATE TABLE IF NOT EXISTS hacks (
            id              TEXT PRIMARY KEY,
            question_id     TEXT NOT NULL REFERENCES questions(id),
            title           TEXT NOT NULL,
            description     TEXT NOT NULL,
            why_it_works    TEXT,
            use_when        TEXT,
            avoid_when      TEXT,
            age_range       TEXT,
            time_cost       TEXT,
            money_cost      TEXT,
            intensity       TEXT,
            upvotes         INTEGER NOT NULL DEFAULT 0,
            created_at      TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );

        CREATE INDEX IF NOT EXISTS idx_hacks_question
            ON hacks(question_id, upvotes);

        CREATE TABLE IF NOT EXISTS hack_votes (
            id          TEXT PRIMARY KEY,
            hack_id     TEXT NOT NULL REFERENCES hacks(id),
            user_id     TEXT NOT NULL REFERENCES profiles(id),
            created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
            UNIQUE(hack_id, user_id)
        );

        CREATE TABLE IF NOT EXISTS saved_hacks (
            user_id     TEXT NOT NULL REFERENCES profiles(id),
            hack_id     TEXT NOT NULL REFERENCES hacks(id),
            created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
            PRIMARY KEY(user_id, hack_id)
        );

        CREATE TABLE IF NOT EXISTS hack_submissions (
            id              TEXT PRIMARY KEY,
            user_id         TEXT REFERENCES profiles(id),
            question_id     TEXT REFERENCES questions(id),
            title           TEXT,
            description     TEXT,
            why_it_works    TEXT,
            status          TEXT NOT NULL DEFAULT 'pending',
            created_at      TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );

        CREATE TABLE IF NOT EXISTS hack_comments (
            id          TEXT PRIMARY KEY,
            hack_id     TEXT NOT NULL REFERENCES hacks(id),
            user_id     TEXT NOT NULL REFERENCES profiles(id),
            content     TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );

        CREATE INDEX IF NOT EXISTS idx_comments_hack
            ON hack_comments(hack_id, created_at);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}

/// Sample questions and hacks for offline demos. Idempotent.
pub fn seed_demo(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        INSERT OR IGNORE INTO questions (id, title, category, description, created_at) VALUES
            ('00000000-0000-4000-8000-000000000101', 'How do I get my toddler to sleep through the night?', 'Sleep',
             'Wakes up two or three times every night and wants to play.', '2024-01-05T20:00:00.000Z'),
            ('00000000-0000-4000-8000-000000000102', 'How do I stop bedtime from turning into a battle?', 'Sleep',
             NULL, '2024-01-06T20:00:00.000Z'),
            ('00000000-0000-4000-8000-000000000103', 'My kid refuses every vegetable. What works?', 'Eating',
             'Four years old, will only eat beige food.', '2024-01-07T12:00:00.000Z'),
            ('00000000-0000-4000-8000-000000000104', 'How do I handle tantrums in the supermarket?', 'Tantrums',
             NULL, '2024-01-08T09:30:00.000Z'),
            ('00000000-0000-4000-8000-000000000105', 'How can I cut down screen time without a meltdown?', 'Screen Time',
             'Tablet comes out every time we need ten quiet minutes.', '2024-01-09T17:45:00.000Z');

        INSERT OR IGNORE INTO hacks (id, question_id, title, description, why_it_works, use_when, avoid_when,
                                     age_range, time_cost, money_cost, intensity, upvotes, created_at) VALUES
            ('00000000-0000-4000-8000-000000000201', '00000000-0000-4000-8000-000000000101',
             'Same three songs every night', 'Play the same short playlist at lights-out, in the same order.',
             'A predictable audio cue becomes a sleep signal.', 'Night wakings after a busy day', 'When they are ill',
             '1-4 years', '5 min', 'Free', 'Low', 42, '2024-01-10T20:00:00.000Z'),
            ('00000000-0000-4000-8000-000000000202', '00000000-0000-4000-8000-000000000101',
             'Boring parent mode', 'Respond to night wakings with minimal talk and no lights.',
             'Nothing interesting happens at night, so waking up stops paying off.', NULL, NULL,
             '1-3 years', 'Ongoing', 'Free', 'Medium', 17, '2024-01-11T20:00:00.000Z'),
            ('00000000-0000-4000-8000-000000000203', '00000000-0000-4000-8000-000000000102',
             'Bedtime choice board', 'Let them pick the order of pyjamas, teeth and story from picture cards.',
             'Small choices give control without negotiating the bedtime itself.', NULL, NULL,
             '2-6 years', '10 min', 'Cheap', 'Low', 23, '2024-01-12T20:00:00.000Z'),
            ('00000000-0000-4000-8000-000000000204', '00000000-0000-4000-8000-000000000103',
             'Vegetable taste-test game', 'Serve three tiny pieces and let them rate each with a sticker.',
             'Tasting becomes a game instead of a demand.', NULL, 'When they are already hungry and cranky',
             '3-7 years', '15 min', 'Cheap', 'Low', 31, '2024-01-13T12:00:00.000Z'),
            ('00000000-0000-4000-8000-000000000205', '00000000-0000-4000-8000-000000000104',
             'Give them the shopping list', 'Hand over a picture list and make them the official finder.',
             'A job channels the energy that would become a meltdown.', NULL, NULL,
             '3-8 years', '5 min', 'Free', 'Low', 58, '2024-01-14T09:30:00.000Z'),
            ('00000000-0000-4000-8000-000000000206', '00000000-0000-4000-8000-000000000105',
             'Visual timer for screens', 'Start a sand timer when the tablet comes out; it goes away when the sand runs out.',
             'The timer is the bad guy, not the parent.', NULL, NULL,
             '3-10 years', '1 min', 'Cheap', 'Medium', 12, '2024-01-15T17:45:00.000Z');
        ",
    )?;

    info!("Demo data seeded");
    Ok(())
}
