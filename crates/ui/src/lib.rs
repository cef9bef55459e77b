use db::user::User;
use maud::{html, Markup, DOCTYPE};

/// Renders an HTML page with the provided body markup.
pub fn page_of_body(body: Markup, user: Option<User>) -> Markup {
    html! {
        (DOCTYPE)
        html {
            head {
                title { "PlayOne" }
                link href="https://cdn.jsdelivr.net/npm/bootstrap@5.3.3/dist/css/bootstrap.min.css" rel="stylesheet" integrity="sha384-QWTKZyjpPEjISv5WaRU9OFeRpok6YctnYmDr5pNlyT2bRjXh0JMhjY6hW+ALEwIH" crossorigin="anonymous" {}
                meta name="viewport" content="width=device-width, initial-scale=1" {}
            }
            body {
                nav class="navbar navbar-expand" style="background-color: #1B6CA8" data-bs-theme="dark" {
                    div class="container-fluid" {
                        ul class="nav nav-justify-start" data-bs-theme="dark" {
                            li class="nav-item" {
                                a class="nav-link text-white" href="/" { "Home" }
                            }
                            li class="nav-item" {
                                a class="nav-link text-white" href="/events" { "Events" }
                            }
                            li class="nav-item" {
                                a class="nav-link text-white" href="/groups" { "Groups" }
                            }
                            li class="nav-item" {
                                a class="nav-link text-white" href="/courts" { "Courts" }
                            }
                        }
                        ul class="nav nav-justify-end" data-bs-theme="dark" {
                            @if let Some(user) = &user {
                                li class="nav-item" {
                                    a class="nav-link text-white" href="/settings" { (user.short_name()) }
                                }
                                li class="nav-item" {
                                    a class="nav-link text-white" href="/logout" { "Logout" }
                                }
                            } @else {
                                li class="nav-item" {
                                    a class="nav-link text-white" href="/login" { "Login" }
                                }
                                li class="nav-item" {
                                    a class="nav-link text-white" href="/register" { "Register" }
                                }
                            }
                        }
                    }
                }
                div class="container" {
                    div class="mt-4" {
                        (body)
                    }
                }
            }
        }
    }
}

pub fn error_403<T: ToString>(error: Option<T>, user: Option<User>) -> Markup {
    page_of_body(
        html! {
            div class="text-center" {
                h1 class="display-1 text-danger" { "403" }
                h2 class="mb-4" { "Forbidden" }
                p class="lead" { "You don't have permission to do that." }
                @if let Some(err) = error {
                    div class="alert alert-danger" role="alert" {
                        (err.to_string())
                    }
                }
                a class="btn btn-danger" href="/" { "Return Home" }
            }
        },
        user,
    )
}

pub fn error_404<T: ToString>(error: Option<T>, user: Option<User>) -> Markup {
    page_of_body(
        html! {
            div class="text-center" {
                h1 class="display-1 text-danger" { "404" }
                h2 class="mb-4" { "Not found" }
                p class="lead" { "We couldn't find what you were looking for." }
                @if let Some(err) = error {
                    div class="alert alert-danger" role="alert" {
                        (err.to_string())
                    }
                }
                a class="btn btn-danger" href="/" { "Return Home" }
            }
        },
        user,
    )
}

pub fn page_title<T: ToString>(title: T) -> Markup {
    maud::html! {
        div class="col-md m-3 h2 d-flex align-items-center" {
            h1 { (title.to_string()) }
        }
    }
}

/// An inline error alert, for re-rendered forms.
pub fn form_error(error: Option<&str>) -> Markup {
    html! {
        @if let Some(err) = error {
            div class="alert alert-danger" role="alert" {
                (err)
            }
        }
    }
}

/// A form consisting of a single button, for actions which must be POSTed.
pub fn action_button(action: &str, label: &str, class: &str) -> Markup {
    html! {
        form method="post" action=(action) class="d-inline" {
            button type="submit" class=(format!("btn btn-sm {class} m-1")) { (label) }
        }
    }
}
