use axum::Extension;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::choices::ChoiceFilter;
use crate::comments::Comment;
use crate::comments::Rating;
use crate::storage::CreateCommentValues;
use crate::storage::Storage;

use super::CurrentUser;
use super::Error;
use super::FieldErrors;
use super::Form;
use super::PathParameters;
use super::QueryParameters;
use super::Success;
use super::notes::get_note;
use super::response::ChoiceResponse;
use super::validation;

#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub id: i64,

    /// ID of the user that left the comment
    pub author: Uuid,

    /// ID of the note the comment is about
    pub note: i64,

    pub rating: ChoiceResponse,
}

impl CommentResponse {
    pub fn from_comment(comment: Comment) -> Self {
        Self {
            id: comment.id,
            author: comment.author_id,
            note: comment.note_id,
            rating: ChoiceResponse::from_choice(comment.rating),
        }
    }

    fn from_comment_multiple(mut comments: Vec<Comment>) -> Vec<Self> {
        comments
            .drain(..)
            .map(Self::from_comment)
            .collect::<Vec<Self>>()
    }
}

/// Query string of the rating filter, `?rating=1&rating=5`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RatingFilterQuery {
    rating: Vec<String>,
}

/// List comments with one of the requested ratings, all comments without any
///
/// Request:
/// ```sh
/// curl -v 'http://localhost:6000/api/note/filter/comment/?rating=4&rating=5'
/// ```
pub async fn filter<S: Storage>(
    Extension(storage): Extension<S>,
    QueryParameters(query): QueryParameters<RatingFilterQuery>,
) -> Result<Success<Vec<CommentResponse>>, Error> {
    let mut errors = FieldErrors::new();
    let ratings = validation::choices::<Rating>(&mut errors, "rating", &query.rating);
    let rating = errors.into_result(ChoiceFilter::from_values(ratings))?;

    tracing::debug!("Filtering comments on {rating:?}");

    let comments = storage
        .find_all_comments(&rating)
        .await
        .map_err(Error::internal_server_error)?;

    Ok(Success::ok(CommentResponse::from_comment_multiple(comments)))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateCommentForm {
    /// Rating of the note, "Without rating" when missing
    rating: Option<Value>,
}

/// Leave a comment on a note, the caller is the author
///
/// Request:
/// ```sh
/// curl -v -H 'Content-Type: application/json' \
///     -H 'Authorization: Bearer tokentokentoken' \
///     -d '{ "rating": 4 }' \
///     http://localhost:6000/api/note/1/comment/
/// ```
pub async fn create<S: Storage>(
    Extension(storage): Extension<S>,
    current_user: CurrentUser<S>,
    PathParameters(note_id): PathParameters<i64>,
    Form(form): Form<CreateCommentForm>,
) -> Result<Success<CommentResponse>, Error> {
    let note = get_note(&storage, note_id).await?;

    let mut errors = FieldErrors::new();
    let rating = validation::choice::<Rating>(&mut errors, "rating", form.rating);
    let rating = errors.into_result(rating.unwrap_or_default())?;

    let values = CreateCommentValues {
        author: &current_user,
        rating,
    };

    let comment = storage
        .create_comment(&note, &values)
        .await
        .map_err(Error::internal_server_error)?;

    tracing::info!(
        "Comment {} on note {} by `{}`",
        comment.id,
        note.id,
        current_user.username
    );

    Ok(Success::created(CommentResponse::from_comment(comment)))
}
