use maud::Markup;
use rocket::{response::Redirect, Responder};

pub fn see_other_ok(r: Redirect) -> StandardResponse {
    Ok(SuccessResponse::SeeOther(Box::new(r)))
}

pub fn success(html: Markup) -> StandardResponse {
    Ok(SuccessResponse::Success(html))
}

pub fn bad_request(html: Markup) -> StandardResponse {
    Err(FailureResponse::BadRequest(html))
}

pub fn forbidden(html: Markup) -> StandardResponse {
    Err(FailureResponse::Forbidden(html))
}

pub fn err_not_found(html: Markup) -> StandardResponse {
    Err(FailureResponse::NotFound(html))
}

pub type StandardResponse = Result<SuccessResponse, FailureResponse>;

#[derive(Responder)]
pub enum SuccessResponse {
    Success(Markup),
    SeeOther(Box<Redirect>),
}

/// Returning one of these from inside `conn.transaction` rolls the
/// transaction back.
#[derive(Responder, Debug)]
pub enum FailureResponse {
    #[response(status = 400)]
    BadRequest(Markup),
    #[response(status = 403)]
    Forbidden(Markup),
    #[response(status = 404)]
    NotFound(Markup),
    #[response(status = 500)]
    ServerError(()),
}

impl From<diesel::result::Error> for FailureResponse {
    fn from(e: diesel::result::Error) -> Self {
        tracing::error!("Database error: {e}");
        FailureResponse::ServerError(())
    }
}
