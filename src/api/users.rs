//! Users of the notes API
//!
//! Just enough to know who is calling: tokens, the caller itself, and admins adding or removing
//! members

use axum::Extension;
use chrono::NaiveDateTime;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

use crate::password;
use crate::storage::CreateUserValues;
use crate::storage::Storage;
use crate::users::Role;
use crate::users::User;

use super::CurrentUser;
use super::Error;
use super::Form;
use super::JwtKeys;
use super::PathParameters;
use super::Success;
use super::current_user::Token;
use super::current_user::generate_token;

/// A user as shown to the outside world, never with the hashed password
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub role: Role,

    #[serde(serialize_with = "super::datetime::serialize")]
    pub created_at: NaiveDateTime,

    /// Only present right after creation, when the password was generated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            role: user.role,
            created_at: user.created_at,
            password: None,
        }
    }
}

/// Credentials to trade for a token
#[derive(Debug, Deserialize)]
pub struct TokenForm {
    username: String,
    password: String,
}

/// Trade credentials for a bearer token
///
/// Request:
/// ```sh
/// curl -v -H 'Content-Type: application/json' \
///     -d '{ "username": "admin", "password": "verysecret" }' \
///     http://localhost:6000/api/users/token
/// ```
///
/// Response:
/// ```json
/// { "data": { "token_type": "Bearer", "expires_in": 3600, "access_token": "..." } }
/// ```
pub async fn token<S: Storage>(
    Extension(jwt_keys): Extension<JwtKeys>,
    Extension(storage): Extension<S>,
    Form(form): Form<TokenForm>,
) -> Result<Success<Token>, Error> {
    let user = find_user_by_username(&storage, &form.username)
        .await?
        .filter(|user| password::verify(&user.hashed_password, &form.password))
        .ok_or_else(|| Error::bad_request("Invalid user"))?;

    tracing::debug!("Token requested by `{}`", user.username);

    generate_token(&jwt_keys, &user).map(Success::ok)
}

/// Who am I?
///
/// Request:
/// ```sh
/// curl -v -H 'Authorization: Bearer tokentokentoken' \
///     http://localhost:6000/api/users/me
/// ```
pub async fn me<S: Storage>(current_user: CurrentUser<S>) -> Success<UserResponse> {
    Success::ok(UserResponse::from(&*current_user))
}

/// A new user, admins only
#[derive(Debug, Deserialize)]
pub struct NewUserForm {
    username: String,
    role: Role,

    /// Generated (and shown once) when missing
    password: Option<String>,
}

/// Add a user
///
/// Request:
/// ```sh
/// curl -v -H 'Content-Type: application/json' \
///     -H 'Authorization: Bearer tokentokentoken' \
///     -d '{ "username": "jane", "role": "member" }' \
///     http://localhost:6000/api/users
/// ```
pub async fn create<S: Storage>(
    Extension(storage): Extension<S>,
    current_user: CurrentUser<S>,
    Form(form): Form<NewUserForm>,
) -> Result<Success<UserResponse>, Error> {
    current_user.role.is_allowed(Role::Admin)?;

    let username = form.username.trim();
    if username.is_empty() {
        return Err(Error::bad_request("Username can not be empty"));
    }

    if find_user_by_username(&storage, username).await?.is_some() {
        return Err(Error::bad_request("User already exists"));
    }

    let generated_password = form.password.is_none().then(password::generate);
    let hashed_password = password::hash(
        form.password
            .as_deref()
            .or(generated_password.as_deref())
            .unwrap_or_default(),
    )
    .map_err(Error::internal_server_error)?;

    let user = storage
        .create_user(&CreateUserValues {
            session_id: &Uuid::new_v4(),
            role: form.role,
            username,
            hashed_password: &hashed_password,
        })
        .await
        .map_err(Error::internal_server_error)?;

    tracing::info!("User `{}` added by `{}`", user.username, current_user.username);

    Ok(Success::created(UserResponse {
        password: generated_password,
        ..UserResponse::from(&user)
    }))
}

/// Remove a user together with their notes and comments
///
/// Request:
/// ```sh
/// curl -v -XDELETE -H 'Authorization: Bearer tokentokentoken' \
///     http://localhost:6000/api/users/<uuid>
/// ```
pub async fn delete<S: Storage>(
    Extension(storage): Extension<S>,
    current_user: CurrentUser<S>,
    PathParameters(user_id): PathParameters<Uuid>,
) -> Result<Success<&'static str>, Error> {
    current_user.role.is_allowed(Role::Admin)?;

    if user_id == current_user.id {
        return Err(Error::bad_request("Can not delete yourself"));
    }

    let user = storage
        .find_single_user_by_id(&user_id)
        .await
        .map_err(Error::internal_server_error)?
        .ok_or_else(|| Error::not_found("User not found"))?;

    storage
        .delete_user(&user)
        .await
        .map_err(Error::internal_server_error)?;

    tracing::info!("User `{}` removed by `{}`", user.username, current_user.username);

    Ok(Success::<&'static str>::no_content())
}

async fn find_user_by_username<S: Storage>(
    storage: &S,
    username: &str,
) -> Result<Option<User>, Error> {
    storage
        .find_single_user_by_username(username)
        .await
        .map_err(Error::internal_server_error)
}
