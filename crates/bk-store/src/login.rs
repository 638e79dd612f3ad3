use rusqlite::{params, OptionalExtension};

use bk_domain::Credentials;

use crate::db::{LOGIN_ROW_ID, LOGIN_TABLE};
use crate::{LocalDb, Result};

impl LocalDb {
    /// Remembered credentials; anonymous when nothing was ever stored.
    pub fn get_login(&self) -> Result<Credentials> {
        let row = self
            .conn()
            .query_row(
                &format!("SELECT username, token FROM {LOGIN_TABLE} WHERE id = ?1"),
                params![LOGIN_ROW_ID],
                |row| {
                    Ok(Credentials {
                        username: row.get(0)?,
                        token: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(row.unwrap_or_default())
    }

    /// Replaces the single login row.
    pub fn set_login(&self, login: &Credentials) -> Result<()> {
        self.conn().execute(
            &format!(
                "INSERT OR REPLACE INTO {LOGIN_TABLE} (id, username, token) VALUES (?1, ?2, ?3)"
            ),
            params![LOGIN_ROW_ID, login.username, login.token],
        )?;
        Ok(())
    }

    pub fn get_username(&self) -> Result<Option<String>> {
        Ok(self.get_login()?.username)
    }
}
