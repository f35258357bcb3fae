//! `GET /` (`spec.md` §6). Static file and template serving is out of
//! scope for the core; this is a thin placeholder so the route exists.

use actix_web::{HttpResponse, get};

#[get("/")]
pub async fn index() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body("DBL is running.")
}
