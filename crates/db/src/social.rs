//! Fills in profile fields from the data a social login provider hands back
//! when a player signs up through it. The OAuth exchange itself happens
//! outside this application; only the resulting profile payload is used.

use chrono::NaiveDate;
use diesel::prelude::*;
use serde_json::Value;
use thiserror::Error;

use crate::{schema::users, user::Gender};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ProfileEnrichment {
    pub gender: Option<Gender>,
    pub date_of_birth: Option<NaiveDate>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnrichmentError {
    #[error("the `{0}` field of the provider profile is missing")]
    MissingField(&'static str),
    #[error("could not read birthday `{0}` (expected MM/DD/YYYY)")]
    BadBirthday(String),
}

/// Reads the fields we care about out of a provider's profile payload.
/// Providers other than Facebook contribute nothing. A social-login
/// callback calls this and then [`apply_enrichment`] once it has the payload.
pub fn enrichment_from_profile(
    provider: &str,
    extra_data: &Value,
) -> Result<ProfileEnrichment, EnrichmentError> {
    if provider != "facebook" {
        return Ok(ProfileEnrichment::default());
    }

    let gender = extra_data
        .get("gender")
        .and_then(Value::as_str)
        .ok_or(EnrichmentError::MissingField("gender"))?;
    let birthday = extra_data
        .get("birthday")
        .and_then(Value::as_str)
        .ok_or(EnrichmentError::MissingField("birthday"))?;

    let date_of_birth = NaiveDate::parse_from_str(birthday, "%m/%d/%Y")
        .map_err(|_| EnrichmentError::BadBirthday(birthday.to_string()))?;

    Ok(ProfileEnrichment {
        gender: Some(if gender == "male" {
            Gender::Male
        } else {
            Gender::Female
        }),
        date_of_birth: Some(date_of_birth),
    })
}

/// Writes whatever the enrichment found onto the player's row. This is the
/// second half of the social-login callback hook.
pub fn apply_enrichment(
    conn: &mut SqliteConnection,
    user_id: i64,
    enrichment: ProfileEnrichment,
) -> QueryResult<()> {
    if let Some(gender) = enrichment.gender {
        diesel::update(users::table.filter(users::id.eq(user_id)))
            .set(users::gender.eq(gender.code()))
            .execute(conn)?;
    }
    if let Some(date_of_birth) = enrichment.date_of_birth {
        diesel::update(users::table.filter(users::id.eq(user_id)))
            .set(users::date_of_birth.eq(Some(date_of_birth)))
            .execute(conn)?;
    }
    Ok(())
}
