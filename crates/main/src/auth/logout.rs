use db::user::remove_login_cookie;
use rocket::{http::CookieJar, response::Redirect};

#[get("/logout")]
pub async fn logout(jar: &CookieJar<'_>) -> Redirect {
    remove_login_cookie(jar);
    Redirect::to("/")
}

#[post("/logout")]
pub async fn do_logout(jar: &CookieJar<'_>) -> Redirect {
    remove_login_cookie(jar);
    Redirect::to("/")
}
