//! All API endpoint setup

use axum::Router;
use axum::routing::delete;
use axum::routing::get;
use axum::routing::post;

use crate::storage::Storage;

pub use current_user::CurrentUser;
pub use current_user::JwtKeys;
pub use request::Form;
pub use request::PathParameters;
pub use request::QueryParameters;
pub use response::Error;
pub use response::Success;
pub use validation::FieldErrors;

mod comments;
mod current_user;
mod datetime;
mod notes;
mod request;
mod response;
mod users;
mod validation;

/// Get the Axum router for all API routes
///
/// Paths have no trailing slash, requests are normalized before they get here
pub fn router<S: Storage>() -> Router {
    let users = Router::new()
        .route("/token", post(users::token::<S>))
        .route("/", post(users::create::<S>))
        .route("/me", get(users::me::<S>))
        .route("/{user}", delete(users::delete::<S>));

    let notes = Router::new()
        .route("/", get(notes::list::<S>).post(notes::create::<S>))
        .route("/public", get(notes::public::<S>))
        .route("/sort", get(notes::sort::<S>))
        .route("/filter", get(notes::filter::<S>))
        .route("/filter/status", get(notes::filter_status::<S>))
        .route("/filter/comment", get(comments::filter::<S>))
        .route(
            "/{note}",
            get(notes::single::<S>)
                .put(notes::replace::<S>)
                .patch(notes::update::<S>)
                .delete(notes::delete::<S>),
        )
        .route("/{note}/comment", post(comments::create::<S>));

    Router::new().nest("/users", users).nest("/note", notes)
}
