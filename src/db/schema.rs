//! Database schema and migrations for Teahouse.
//!
//! Migrations are applied sequentially when the database is first opened or
//! upgraded. Timestamp columns hold `datetime::STORAGE_FORMAT` text written by
//! the application, never SQL defaults.

/// Database migrations.
///
/// Each migration is a SQL script that will be executed in order.
/// The schema_version table tracks which migrations have been applied.
pub const MIGRATIONS: &[&str] = &[
    // v1: users and their permission records
    r#"
CREATE TABLE users (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    username    TEXT NOT NULL UNIQUE COLLATE NOCASE,
    email       TEXT NOT NULL UNIQUE COLLATE NOCASE,
    password    TEXT NOT NULL,           -- Argon2 PHC string
    created_at  TEXT NOT NULL
);

-- One row per user, created in the same transaction as the user
CREATE TABLE permissions (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id     INTEGER NOT NULL UNIQUE REFERENCES users(id),
    master      INTEGER NOT NULL DEFAULT 0,
    admin       INTEGER NOT NULL DEFAULT 0,
    team        INTEGER NOT NULL DEFAULT 0,
    wiki        INTEGER NOT NULL DEFAULT 0,
    news        INTEGER NOT NULL DEFAULT 0,
    translate   INTEGER NOT NULL DEFAULT 0,
    comment     INTEGER NOT NULL DEFAULT 1
);
"#,
    // v2: login sessions
    r#"
CREATE TABLE sessions (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    token         TEXT NOT NULL UNIQUE,
    user_id       INTEGER NOT NULL REFERENCES users(id),
    valid_after   TEXT NOT NULL,
    valid_before  TEXT               -- NULL = remember me
);

CREATE INDEX idx_sessions_user_id ON sessions(user_id);
CREATE INDEX idx_sessions_valid_before ON sessions(valid_before);
"#,
    // v3: languages, seeded with the default
    r#"
CREATE TABLE languages (
    id    INTEGER PRIMARY KEY AUTOINCREMENT,
    code  TEXT NOT NULL UNIQUE,
    name  TEXT NOT NULL
);

INSERT INTO languages (code, name) VALUES ('en_US', 'English');
"#,
    // v4: news posts, localized titles and bodies, tags
    r#"
CREATE TABLE news (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    post_short  TEXT NOT NULL UNIQUE,
    title       TEXT NOT NULL UNIQUE,
    media       TEXT,
    author_id   INTEGER NOT NULL REFERENCES users(id),
    created     TEXT NOT NULL,
    last_edit   TEXT
);

CREATE INDEX idx_news_created ON news(created);

CREATE TABLE news_titles (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    news_id      INTEGER NOT NULL REFERENCES news(id) ON DELETE CASCADE,
    language_id  INTEGER NOT NULL REFERENCES languages(id),
    title        TEXT NOT NULL,
    UNIQUE (news_id, language_id)
);

CREATE TABLE news_bodies (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    news_id      INTEGER NOT NULL REFERENCES news(id) ON DELETE CASCADE,
    language_id  INTEGER NOT NULL REFERENCES languages(id),
    body         TEXT NOT NULL,
    UNIQUE (news_id, language_id)
);

CREATE TABLE tags (
    id    INTEGER PRIMARY KEY AUTOINCREMENT,
    name  TEXT NOT NULL UNIQUE
);

CREATE TABLE news_tags (
    news_id  INTEGER NOT NULL REFERENCES news(id) ON DELETE CASCADE,
    tag_id   INTEGER NOT NULL REFERENCES tags(id),
    PRIMARY KEY (news_id, tag_id)
);

CREATE INDEX idx_news_tags_tag_id ON news_tags(tag_id);
"#,
    // v5: comments on news posts
    r#"
CREATE TABLE comments (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    news_id     INTEGER NOT NULL REFERENCES news(id) ON DELETE CASCADE,
    author_id   INTEGER NOT NULL REFERENCES users(id),
    body        TEXT NOT NULL,
    created     TEXT NOT NULL,
    last_edit   TEXT
);

CREATE INDEX idx_comments_news_id ON comments(news_id);
"#,
];
