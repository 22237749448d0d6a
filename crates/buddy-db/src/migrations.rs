use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            email       TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS profiles (
            user_id      TEXT PRIMARY KEY REFERENCES users(id),
            display_name TEXT NOT NULL,
            bio          TEXT,
            avatar_path  TEXT,
            created_at   TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS user_preferences (
            user_id             TEXT PRIMARY KEY REFERENCES users(id),
            email_notifications INTEGER NOT NULL DEFAULT 1,
            overdue_reminders   INTEGER NOT NULL DEFAULT 1,
            created_at          TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS groups (
            id          TEXT PRIMARY KEY,
            name        TEXT NOT NULL,
            description TEXT,
            is_private  INTEGER NOT NULL DEFAULT 0,
            created_by  TEXT NOT NULL REFERENCES users(id),
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS group_members (
            group_id    TEXT NOT NULL REFERENCES groups(id),
            user_id     TEXT NOT NULL REFERENCES users(id),
            role        TEXT NOT NULL DEFAULT 'member',
            joined_at   TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (group_id, user_id)
        );

        CREATE INDEX IF NOT EXISTS idx_group_members_user
            ON group_members(user_id);

        CREATE TABLE IF NOT EXISTS group_invites (
            code        TEXT PRIMARY KEY,
            group_id    TEXT NOT NULL REFERENCES groups(id),
            -- '*' marks a general link invite usable by anyone with the code
            email       TEXT NOT NULL,
            invited_by  TEXT NOT NULL REFERENCES users(id),
            expires_at  TEXT,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_group_invites_group
            ON group_invites(group_id);

        CREATE TABLE IF NOT EXISTS tool_categories (
            id          INTEGER PRIMARY KEY,
            name        TEXT NOT NULL UNIQUE
        );

        CREATE TABLE IF NOT EXISTS tools (
            id           TEXT PRIMARY KEY,
            owner_id     TEXT NOT NULL REFERENCES users(id),
            name         TEXT NOT NULL,
            description  TEXT,
            category_id  INTEGER NOT NULL REFERENCES tool_categories(id),
            status       TEXT NOT NULL DEFAULT 'available',
            brand        TEXT,
            power_source TEXT,
            condition    TEXT,
            image_path   TEXT,
            created_at   TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_tools_owner
            ON tools(owner_id);

        CREATE TABLE IF NOT EXISTS tool_group_visibility (
            tool_id     TEXT NOT NULL REFERENCES tools(id),
            group_id    TEXT NOT NULL REFERENCES groups(id),
            PRIMARY KEY (tool_id, group_id)
        );

        CREATE TABLE IF NOT EXISTS tool_requests (
            id           TEXT PRIMARY KEY,
            tool_id      TEXT NOT NULL REFERENCES tools(id),
            borrower_id  TEXT NOT NULL REFERENCES users(id),
            status       TEXT NOT NULL DEFAULT 'pending',
            start_date   TEXT NOT NULL,
            end_date     TEXT NOT NULL,
            message      TEXT,
            picked_up_at TEXT,
            returned_at  TEXT,
            return_notes TEXT,
            created_at   TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_tool_requests_tool
            ON tool_requests(tool_id);
        CREATE INDEX IF NOT EXISTS idx_tool_requests_borrower
            ON tool_requests(borrower_id);
        CREATE INDEX IF NOT EXISTS idx_tool_requests_status
            ON tool_requests(status, end_date);

        CREATE TABLE IF NOT EXISTS tool_history (
            id          TEXT PRIMARY KEY,
            request_id  TEXT NOT NULL REFERENCES tool_requests(id),
            actor_id    TEXT,
            event       TEXT NOT NULL,
            notes       TEXT,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_tool_history_request
            ON tool_history(request_id);

        CREATE TABLE IF NOT EXISTS notifications (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL REFERENCES users(id),
            kind        TEXT NOT NULL,
            title       TEXT NOT NULL,
            body        TEXT,
            request_id  TEXT,
            group_id    TEXT,
            is_read     INTEGER NOT NULL DEFAULT 0,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_notifications_user
            ON notifications(user_id, is_read);

        -- Seed the category list
        INSERT OR IGNORE INTO tool_categories (id, name) VALUES
            (1, 'Power Tools'),
            (2, 'Hand Tools'),
            (3, 'Garden & Yard'),
            (4, 'Automotive'),
            (5, 'Ladders & Access'),
            (6, 'Painting & Decorating'),
            (7, 'Cleaning'),
            (8, 'Measuring & Layout'),
            (9, 'Other');
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
