//! Who is calling?
//!
//! Callers identify with a bearer token in the `Authorization` header. Handlers that need an
//! author take a `CurrentUser`, pages that only greet take an `Option<CurrentUser>`.

use std::marker::PhantomData;
use std::ops::Deref;
use std::sync::Arc;

use axum::Extension;
use axum::RequestPartsExt;
use axum::extract::FromRequestParts;
use axum::extract::OptionalFromRequestParts;
use axum::http::request::Parts;
use axum_extra::TypedHeader;
use axum_extra::headers::Authorization;
use axum_extra::headers::authorization::Bearer;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::EncodingKey;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

use crate::api::Error;
use crate::storage::Storage;
use crate::users::User;

/// Tokens are valid for an hour
const TOKEN_LIFETIME_SECONDS: i64 = 3600;

/// HS256 keys, both sides derived from the same secret
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl JwtKeys {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

/// What goes inside a token
#[derive(Debug, Deserialize, Serialize)]
struct Claims {
    /// User ID
    sub: Uuid,

    /// Expiration, UNIX timestamp
    exp: i64,

    /// Session of the user at the time the token was handed out
    jti: Uuid,
}

/// Answer to a successful token request
#[derive(Debug, Serialize)]
pub struct Token {
    #[allow(clippy::struct_field_names)]
    token_type: &'static str,

    /// Seconds until the token stops working
    expires_in: i64,

    #[allow(clippy::struct_field_names)]
    access_token: String,
}

/// The authenticated caller, every note or comment written in the request belongs to them
#[derive(Clone)]
pub struct CurrentUser<S: Storage> {
    user: Arc<User>,
    storage: PhantomData<S>,
}

impl<S: Storage> Deref for CurrentUser<S> {
    type Target = User;

    fn deref(&self) -> &Self::Target {
        &self.user
    }
}

/// Hand out a bearer token for `user`
pub fn generate_token(jwt_keys: &JwtKeys, user: &User) -> Result<Token, Error> {
    let claims = Claims {
        sub: user.id,
        exp: chrono::Utc::now().timestamp() + TOKEN_LIFETIME_SECONDS,
        jti: user.session_id,
    };

    let access_token =
        jsonwebtoken::encode(&jsonwebtoken::Header::default(), &claims, &jwt_keys.encoding)
            .map_err(Error::internal_server_error)?;

    Ok(Token {
        token_type: "Bearer",
        expires_in: TOKEN_LIFETIME_SECONDS,
        access_token,
    })
}

/// Check the claims against the storage
async fn find_token_user<S: Storage>(storage: &S, claims: &Claims) -> Result<User, Error> {
    let user = storage
        .find_single_user_by_id(&claims.sub)
        .await
        .map_err(|_| Error::forbidden("Could not find user"))?
        .ok_or_else(|| Error::forbidden("Could not find user"))?;

    // a new session makes older tokens useless
    if claims.jti != user.session_id {
        return Err(Error::forbidden("Token expired"));
    }

    Ok(user)
}

impl<B, S> FromRequestParts<B> for CurrentUser<S>
where
    B: Send + Sync,
    S: Storage,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &B) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            <TypedHeader<Authorization<Bearer>> as FromRequestParts<B>>::from_request_parts(
                parts, state,
            )
            .await
            .map_err(|_| Error::forbidden("Missing API token"))?;

        let Extension(jwt_keys) = parts
            .extract::<Extension<JwtKeys>>()
            .await
            .map_err(|_| Error::internal_server_error("Could not get JWT keys"))?;

        let Extension(storage) = parts
            .extract::<Extension<S>>()
            .await
            .map_err(|_| Error::internal_server_error("Could not get the storage"))?;

        let claims = jsonwebtoken::decode::<Claims>(
            bearer.token(),
            &jwt_keys.decoding,
            &jsonwebtoken::Validation::default(),
        )
        .map_err(|err| Error::forbidden(format!("Invalid token: {err}")))?
        .claims;

        let user = find_token_user(&storage, &claims).await?;

        Ok(Self {
            user: Arc::new(user),
            storage: PhantomData,
        })
    }
}

/// Without a usable token the caller is anonymous
impl<B, S> OptionalFromRequestParts<B> for CurrentUser<S>
where
    B: Send + Sync,
    S: Storage,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &B,
    ) -> Result<Option<Self>, Self::Rejection> {
        let current_user =
            <CurrentUser<S> as FromRequestParts<B>>::from_request_parts(parts, state).await;

        Ok(current_user.ok())
    }
}
