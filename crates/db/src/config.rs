use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::config;

/// Key which, when set to `1`, closes registration to new players.
pub const DISABLE_SIGNUPS: &str = "disable_signups";

#[derive(Debug, Queryable, Serialize, Deserialize, Clone, Hash, PartialEq, Eq)]
pub struct ConfigItem {
    pub id: i64,
    pub public_id: String,
    pub key: String,
    pub value: String,
}

impl ConfigItem {
    pub fn value_of(
        conn: &mut SqliteConnection,
        key: &str,
    ) -> QueryResult<Option<String>> {
        config::table
            .filter(config::key.eq(key))
            .select(config::value)
            .first::<String>(conn)
            .optional()
    }

    pub fn signups_disabled(conn: &mut SqliteConnection) -> QueryResult<bool> {
        Ok(Self::value_of(conn, DISABLE_SIGNUPS)?
            .map(|value| value.trim() == "1")
            .unwrap_or(false))
    }
}
