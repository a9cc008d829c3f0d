use crate::Database;
use crate::models::{MessageRow, UserRow};
use anyhow::Result;
use rusqlite::{Connection, params};

const USER_COLUMNS: &str = "id, username, name, email, password, created_at";

const MESSAGE_SELECT: &str =
    "SELECT m.id, m.sender_id, s.username, m.receiver_id, r.username, m.description, m.time, m.seen
     FROM messages m
     JOIN users s ON m.sender_id = s.id
     JOIN users r ON m.receiver_id = r.id";

impl Database {
    // -- Users --

    pub fn create_user(
        &self,
        id: &str,
        username: &str,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, name, email, password) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id, username, name, email, password_hash],
            )?;
            Ok(())
        })
    }

    /// Insert the user if the username is free, then return whatever row owns it.
    pub fn ensure_user(&self, id: &str, username: &str, name: &str, email: &str) -> Result<UserRow> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO users (id, username, name, email, password) VALUES (?1, ?2, ?3, ?4, '')",
                params![id, username, name, email],
            )?;
            query_user(conn, "username", username)?
                .ok_or_else(|| anyhow::anyhow!("User '{}' missing after insert", username))
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    pub fn email_taken(&self, email: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found = conn
                .query_row("SELECT 1 FROM users WHERE email = ?1", [email], |_| Ok(()))
                .optional()?;
            Ok(found.is_some())
        })
    }

    /// Case-sensitive substring match on name or username. `limit` of `None`
    /// returns every match.
    pub fn search_users(
        &self,
        query: Option<&str>,
        exclude: Option<&str>,
        limit: Option<u32>,
    ) -> Result<Vec<UserRow>> {
        let limit = limit.map_or(-1, i64::from);
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {USER_COLUMNS} FROM users
                 WHERE (?1 IS NULL OR instr(name, ?1) > 0 OR instr(username, ?1) > 0)
                   AND (?2 IS NULL OR username != ?2)
                 ORDER BY username
                 LIMIT ?3"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![query, exclude, limit], map_user)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Friends --

    /// Record the friendship in both directions. Returns false if the edge
    /// already existed, in which case nothing is written.
    pub fn add_friend(&self, user_id: &str, friend_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let inserted = tx.execute(
                "INSERT OR IGNORE INTO friends (user_id, friend_id) VALUES (?1, ?2)",
                [user_id, friend_id],
            )?;
            tx.execute(
                "INSERT OR IGNORE INTO friends (user_id, friend_id) VALUES (?1, ?2)",
                [friend_id, user_id],
            )?;
            tx.commit()?;
            Ok(inserted > 0)
        })
    }

    pub fn get_friends(&self, user_id: &str) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT u.id, u.username, u.name, u.email, u.password, u.created_at
                 FROM friends f
                 JOIN users u ON f.friend_id = u.id
                 WHERE f.user_id = ?1
                 ORDER BY f.created_at, u.username",
            )?;
            let rows = stmt
                .query_map([user_id], map_user)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Messages --

    pub fn insert_message(
        &self,
        id: &str,
        sender_id: &str,
        receiver_id: &str,
        description: &str,
        time: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (id, sender_id, receiver_id, description, time) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id, sender_id, receiver_id, description, time],
            )?;
            Ok(())
        })
    }

    pub fn get_message(&self, id: &str) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| {
            let sql = format!("{MESSAGE_SELECT} WHERE m.id = ?1");
            Ok(query_messages(conn, &sql, params![id])?.pop())
        })
    }

    /// Fetch every unseen message from `sender_id` to `receiver_id` and mark
    /// them seen in the same transaction. The returned rows still read
    /// `seen = false`.
    pub fn take_unseen_messages(&self, sender_id: &str, receiver_id: &str) -> Result<Vec<MessageRow>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let sql = format!(
                "{MESSAGE_SELECT}
                 WHERE m.sender_id = ?1 AND m.receiver_id = ?2 AND m.seen = 0
                 ORDER BY m.time, m.rowid"
            );
            let rows = query_messages(&tx, &sql, params![sender_id, receiver_id])?;
            tx.execute(
                "UPDATE messages SET seen = 1 WHERE sender_id = ?1 AND receiver_id = ?2 AND seen = 0",
                [sender_id, receiver_id],
            )?;
            tx.commit()?;
            Ok(rows)
        })
    }

    /// All messages exchanged between two users, both directions, oldest first.
    pub fn get_conversation(&self, user_id: &str, other_id: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{MESSAGE_SELECT}
                 WHERE (m.sender_id = ?1 AND m.receiver_id = ?2)
                    OR (m.sender_id = ?2 AND m.receiver_id = ?1)
                 ORDER BY m.time, m.rowid"
            );
            query_messages(conn, &sql, params![user_id, other_id])
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1");
    let mut stmt = conn.prepare(&sql)?;
    let row = stmt.query_row([value], map_user).optional()?;
    Ok(row)
}

fn map_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        name: row.get(2)?,
        email: row.get(3)?,
        password: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn query_messages(conn: &Connection, sql: &str, params: impl rusqlite::Params) -> Result<Vec<MessageRow>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, |row| {
            Ok(MessageRow {
                id: row.get(0)?,
                sender_id: row.get(1)?,
                sender_name: row.get(2)?,
                receiver_id: row.get(3)?,
                receiver_name: row.get(4)?,
                description: row.get(5)?,
                time: row.get(6)?,
                seen: row.get(7)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
