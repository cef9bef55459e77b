//! Sends emails.
//!
//! Debug builds only log what would have been sent. Release builds deliver
//! over SMTP using `SMTP_HOST`, `SMTP_USERNAME`, `SMTP_PASSWORD` and
//! `SMTP_DOMAIN`, and record each delivered message in the `emails` table.
use db::DbConn;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("the {0} environment variable is not set")]
    MissingSetting(&'static str),
    #[error("invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),
    #[error("could not build message: {0}")]
    Build(#[from] lettre::error::Error),
    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

#[cfg(debug_assertions)]
pub async fn send_mail(
    to: Vec<(&str, &str)>,
    subject: &str,
    _html_contents: &str,
    text_contents: &str,
    _db: Arc<DbConn>,
) {
    let recipients = format_recipients(&to);
    tracing::info!("Not sending email {subject:?} to {recipients} (debug build)");
    tracing::debug!("{text_contents}");
}

#[cfg(not(debug_assertions))]
pub async fn send_mail(
    to: Vec<(&str, &str)>,
    subject: &str,
    html_contents: &str,
    text_contents: &str,
    db: Arc<DbConn>,
) {
    if let Err(e) =
        send_mail_internal(to, subject, html_contents, text_contents, db)
    {
        tracing::error!("Failed to queue email {subject:?}: {e}");
    }
}

fn format_recipients(to: &[(&str, &str)]) -> String {
    to.iter()
        .map(|(name, email)| format!("{name} <{email}>"))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg_attr(debug_assertions, allow(dead_code))]
fn setting(key: &'static str) -> Result<String, MailError> {
    std::env::var(key).map_err(|_| MailError::MissingSetting(key))
}

#[cfg_attr(debug_assertions, allow(dead_code))]
fn send_mail_internal(
    to: Vec<(&str, &str)>,
    subject: &str,
    html_contents: &str,
    text_contents: &str,
    db: Arc<DbConn>,
) -> Result<(), MailError> {
    use db::schema::emails;
    use diesel::prelude::*;
    use lettre::{
        message::{header::ContentType, Mailbox, MultiPart, SinglePart},
        transport::smtp::authentication::Credentials,
        AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    };
    use uuid::Uuid;

    let domain = setting("SMTP_DOMAIN")?;

    let mut msg = Message::builder()
        .from(format!("PlayOne <noreply@{domain}>").parse::<Mailbox>()?)
        .subject(subject);
    for (name, email) in &to {
        msg = msg.to(format!("{name} <{email}>").parse::<Mailbox>()?)
    }

    let msg_id = format!("{}@{}", Uuid::now_v7(), domain);

    let msg = msg.message_id(Some(msg_id.clone())).multipart(
        MultiPart::alternative()
            .singlepart(
                SinglePart::builder()
                    .content_type(ContentType::TEXT_PLAIN)
                    .body(text_contents.to_string()),
            )
            .singlepart(
                SinglePart::builder()
                    .content_type(ContentType::TEXT_HTML)
                    .body(html_contents.to_string()),
            ),
    )?;

    let creds =
        Credentials::new(setting("SMTP_USERNAME")?, setting("SMTP_PASSWORD")?);
    let mailer: AsyncSmtpTransport<Tokio1Executor> =
        AsyncSmtpTransport::<Tokio1Executor>::relay(&setting("SMTP_HOST")?)?
            .credentials(creds)
            .build();

    let recipients = format_recipients(&to);

    // delivered after the response is sent
    rocket::tokio::spawn(async move {
        if let Err(e) = mailer.send(msg).await {
            tracing::error!("Failed to deliver email {msg_id} to {recipients}: {e}");
            return;
        }

        let logged = db
            .run(move |conn| {
                diesel::insert_into(emails::table)
                    .values((
                        emails::message_id.eq(&msg_id),
                        emails::recipients.eq(&recipients),
                        emails::created_at.eq(diesel::dsl::now),
                    ))
                    .execute(conn)
            })
            .await;
        if let Err(e) = logged {
            tracing::warn!("Delivered an email but could not record it: {e}");
        }
    });

    Ok(())
}
