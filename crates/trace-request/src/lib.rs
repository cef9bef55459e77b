//! Gives every request an ID and a tracing span.
//!
//! The ID is taken from an incoming `X-Request-Id` header when present (so
//! that a reverse proxy can correlate logs) and is echoed back on the
//! response.

use std::fmt;

use rocket::{
    Data, Response,
    fairing::{Fairing, Info, Kind},
    http::Status,
    request::{self, FromRequest, Request},
};
use tracing::Span;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

#[derive(Clone, Debug)]
pub struct RequestId(pub String);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for RequestId {
    type Error = ();

    async fn from_request(
        request: &'r Request<'_>,
    ) -> request::Outcome<Self, Self::Error> {
        // `local_cache` runs the closure at most once per request
        request::Outcome::Success(
            request
                .local_cache(|| {
                    RequestId(
                        request
                            .headers()
                            .get_one(REQUEST_ID_HEADER)
                            .map(ToString::to_string)
                            .unwrap_or_else(|| Uuid::new_v4().to_string()),
                    )
                })
                .clone(),
        )
    }
}

/// The span opened for the current request. Blocking database work should be
/// run inside it so that queries are attributed to the request.
pub struct TracingSpan<T = Span>(pub T);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for TracingSpan {
    type Error = ();

    async fn from_request(
        request: &'r Request<'_>,
    ) -> request::Outcome<Self, ()> {
        match request.local_cache(|| TracingSpan::<Option<Span>>(None)) {
            TracingSpan(Some(span)) => {
                request::Outcome::Success(TracingSpan(span.to_owned()))
            }
            TracingSpan(None) => {
                request::Outcome::Error((Status::InternalServerError, ()))
            }
        }
    }
}

pub struct RequestIdFairing;

#[rocket::async_trait]
impl Fairing for RequestIdFairing {
    fn info(&self) -> Info {
        Info {
            name: "Request ID and tracing span",
            kind: Kind::Request | Kind::Response,
        }
    }

    async fn on_request(&self, req: &mut Request<'_>, _data: &mut Data<'_>) {
        let request_id = match req.guard::<RequestId>().await {
            request::Outcome::Success(id) => id,
            _ => return,
        };

        let span = tracing::info_span!(
            "request",
            http.method = %req.method(),
            http.uri = %req.uri().path(),
            http.status_code = tracing::field::Empty,
            http.request_id = %request_id,
        );
        span.in_scope(|| {
            tracing::info!("received request");
            sentry::configure_scope(|scope| {
                scope.set_tag("request_id", &request_id);
            });
        });
        req.local_cache(|| TracingSpan::<Option<Span>>(Some(span)));
    }

    async fn on_response<'r>(
        &self,
        req: &'r Request<'_>,
        res: &mut Response<'r>,
    ) {
        let request_id = req.guard::<RequestId>().await;

        if let Some(span) =
            req.local_cache(|| TracingSpan::<Option<Span>>(None)).0.clone()
        {
            span.record("http.status_code", res.status().code);
            span.in_scope(|| {
                tracing::info!("responding with {}", res.status());
            });
        }

        if let request::Outcome::Success(request_id) = request_id {
            res.set_raw_header(REQUEST_ID_HEADER, request_id.0);
        }
    }
}
