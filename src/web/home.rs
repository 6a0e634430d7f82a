//! Landing page

use axum::{Router, response::Response, routing::get};

use super::flash::Flash;
use super::templates;
use crate::AppState;
use crate::auth::MaybeUser;

pub fn home_router() -> Router<AppState> {
    Router::new().route("/", get(index))
}

/// GET /
async fn index(MaybeUser(user): MaybeUser, flash: Flash) -> Response {
    let (flash, messages) = flash.take();
    flash.render(templates::index(user.as_ref(), &messages))
}
