use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::Serialize;

use crate::schema::courts;

/// A venue at which events are played.
#[derive(Debug, Queryable, Serialize, Clone, PartialEq, Eq)]
pub struct Court {
    pub id: i64,
    pub public_id: String,
    pub name: String,
    pub photo: Option<String>,
    pub created_at: NaiveDateTime,
}

impl Court {
    pub fn validate_name(name: &str) -> bool {
        let n = name.trim().chars().count();
        n > 0 && n <= 80
    }

    /// Photos are referenced by URL (uploads are handled elsewhere).
    pub fn validate_photo(photo: &str) -> bool {
        photo.starts_with("https://") || photo.starts_with("http://")
    }

    pub fn load_by_public_id(
        conn: &mut SqliteConnection,
        public_id: &str,
    ) -> QueryResult<Option<Court>> {
        courts::table
            .filter(courts::public_id.eq(public_id))
            .first::<Court>(conn)
            .optional()
    }

    pub fn load_all(conn: &mut SqliteConnection) -> QueryResult<Vec<Court>> {
        courts::table.order_by(courts::name.asc()).load::<Court>(conn)
    }
}

#[cfg(test)]
#[test]
fn test_court_validate() {
    assert!(Court::validate_name("Riverside Beach Court"));
    assert!(!Court::validate_name("   "));
    assert!(!Court::validate_name(&"x".repeat(81)));
}
