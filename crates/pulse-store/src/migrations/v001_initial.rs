//! v001 -- Initial schema creation.
//!
//! Creates `identities`, `conversations`, `participants`, `messages` and the
//! `kv` table.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Identities
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS identities (
    id           TEXT PRIMARY KEY NOT NULL,   -- "usr-xxxxxxxx"
    display_name TEXT NOT NULL,
    avatar_ref   TEXT NOT NULL
);

-- ----------------------------------------------------------------
-- Conversations
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS conversations (
    id             TEXT PRIMARY KEY NOT NULL, -- UUID v4
    kind           TEXT NOT NULL,             -- 'dm' | 'group'
    name           TEXT,                      -- groups only
    last_active_at TEXT NOT NULL              -- RFC-3339, fixed width
);

-- ----------------------------------------------------------------
-- Participants
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS participants (
    conversation_id TEXT NOT NULL,            -- FK -> conversations(id)
    user_id         TEXT NOT NULL,
    is_admin        INTEGER NOT NULL DEFAULT 0,
    status          TEXT NOT NULL,            -- 'pending' | 'joined'

    UNIQUE (conversation_id, user_id),
    FOREIGN KEY (conversation_id) REFERENCES conversations(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_participants_user ON participants(user_id);

-- ----------------------------------------------------------------
-- Messages
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS messages (
    id              TEXT PRIMARY KEY NOT NULL, -- UUID v4
    conversation_id TEXT NOT NULL,             -- FK -> conversations(id)
    sender_id       TEXT NOT NULL,
    text            TEXT NOT NULL,
    is_generated    INTEGER NOT NULL DEFAULT 0,
    created_at      TEXT NOT NULL,

    FOREIGN KEY (conversation_id) REFERENCES conversations(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_messages_conversation_ts
    ON messages(conversation_id, created_at ASC);

-- ----------------------------------------------------------------
-- Key/value records (session identity, ...)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS kv (
    key   TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL
);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
