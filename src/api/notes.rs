use std::collections::HashMap;

use axum::Extension;
use chrono::NaiveDateTime;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::choices::ChoiceFilter;
use crate::notes::Note;
use crate::notes::NoteStatus;
use crate::storage::CreateNoteValues;
use crate::storage::NoteFilter;
use crate::storage::NoteOrder;
use crate::storage::Storage;
use crate::storage::UpdateNoteValues;

use super::CurrentUser;
use super::Error;
use super::FieldErrors;
use super::Form;
use super::PathParameters;
use super::QueryParameters;
use super::Success;
use super::comments::CommentResponse;
use super::response::ChoiceResponse;
use super::validation;

/// Longest title allowed, in characters
const TITLE_MAX_LENGTH: usize = 255;

/// A note in listings
#[derive(Debug, Serialize)]
pub struct NoteResponse {
    pub id: i64,
    pub title: String,
    pub content: String,
    #[serde(serialize_with = "super::datetime::serialize")]
    pub created_at: NaiveDateTime,
    #[serde(serialize_with = "super::datetime::serialize")]
    pub due_to: NaiveDateTime,
    pub public: bool,
    pub importance: bool,

    /// ID of the author
    pub author: Uuid,

    pub note_status: ChoiceResponse,
}

impl NoteResponse {
    fn from_note(note: Note) -> Self {
        Self {
            id: note.id,
            title: note.title,
            content: note.content,
            created_at: note.created_at,
            due_to: note.due_to,
            public: note.public,
            importance: note.importance,
            author: note.author_id,
            note_status: ChoiceResponse::from_choice(note.note_status),
        }
    }

    fn from_note_multiple(mut notes: Vec<Note>) -> Vec<Self> {
        notes.drain(..).map(Self::from_note).collect::<Vec<Self>>()
    }
}

/// A note with its author's name and all its comments
#[derive(Debug, Serialize)]
pub struct NoteDetailResponse {
    pub id: i64,
    pub title: String,
    pub content: String,
    #[serde(serialize_with = "super::datetime::serialize")]
    pub created_at: NaiveDateTime,
    #[serde(serialize_with = "super::datetime::serialize")]
    pub due_to: NaiveDateTime,
    pub importance: bool,
    pub public: bool,
    pub note_status: ChoiceResponse,

    /// Username of the author
    pub author: String,

    pub comments: Vec<CommentResponse>,
}

impl NoteDetailResponse {
    fn from_note(note: Note, author: String, comments: Vec<CommentResponse>) -> Self {
        Self {
            id: note.id,
            title: note.title,
            content: note.content,
            created_at: note.created_at,
            due_to: note.due_to,
            importance: note.importance,
            public: note.public,
            note_status: ChoiceResponse::from_choice(note.note_status),
            author,
            comments,
        }
    }

    /// Build the detail of all notes, authors and comments are fetched once for all of them
    async fn from_note_multiple<S: Storage>(
        storage: &S,
        notes: Vec<Note>,
    ) -> Result<Vec<Self>, Error> {
        let mut author_ids = notes.iter().map(|note| note.author_id).collect::<Vec<_>>();
        author_ids.sort_unstable();
        author_ids.dedup();

        let usernames = storage
            .find_all_users_by_ids(&author_ids)
            .await
            .map_err(Error::internal_server_error)?
            .into_iter()
            .map(|user| (user.id, user.username))
            .collect::<HashMap<Uuid, String>>();

        let mut comments = HashMap::<i64, Vec<CommentResponse>>::new();
        for comment in storage
            .find_all_comments_by_notes(&notes)
            .await
            .map_err(Error::internal_server_error)?
        {
            comments
                .entry(comment.note_id)
                .or_default()
                .push(CommentResponse::from_comment(comment));
        }

        notes
            .into_iter()
            .map(|note| {
                let author = usernames.get(&note.author_id).cloned().ok_or_else(|| {
                    Error::internal_server_error(format!("Missing author of note {}", note.id))
                })?;
                let comments = comments.remove(&note.id).unwrap_or_default();

                Ok(Self::from_note(note, author, comments))
            })
            .collect()
    }

    async fn from_single_note<S: Storage>(storage: &S, note: Note) -> Result<Self, Error> {
        Self::from_note_multiple(storage, vec![note])
            .await?
            .pop()
            .ok_or_else(|| Error::internal_server_error("Could not build note detail"))
    }
}

/// List all notes
///
/// Request:
/// ```sh
/// curl -v http://localhost:6000/api/note/
/// ```
pub async fn list<S: Storage>(
    Extension(storage): Extension<S>,
) -> Result<Success<Vec<NoteResponse>>, Error> {
    find_notes(&storage, &NoteFilter::default(), NoteOrder::Id).await
}

/// Get a note with its comments
///
/// Request:
/// ```sh
/// curl -v http://localhost:6000/api/note/1/
/// ```
pub async fn single<S: Storage>(
    Extension(storage): Extension<S>,
    PathParameters(note_id): PathParameters<i64>,
) -> Result<Success<NoteDetailResponse>, Error> {
    let note = get_note(&storage, note_id).await?;

    NoteDetailResponse::from_single_note(&storage, note)
        .await
        .map(Success::ok)
}

/// Note payload, every field is checked by hand to report all problems at once
///
/// `null` counts as missing, unknown fields (`author`, `id`, `created_at`) are ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NoteForm {
    title: Option<Value>,
    content: Option<Value>,
    due_to: Option<Value>,
    public: Option<Value>,
    importance: Option<Value>,
    note_status: Option<Value>,
}

/// A note payload that passed validation
#[derive(Debug)]
struct ValidNoteForm {
    title: Option<String>,
    content: Option<String>,
    due_to: Option<NaiveDateTime>,
    public: Option<bool>,
    importance: Option<bool>,
    note_status: Option<NoteStatus>,
}

impl NoteForm {
    /// Check all fields, the title can only be left out of partial updates
    fn validate(self, partial: bool) -> Result<ValidNoteForm, Error> {
        let mut errors = FieldErrors::new();

        if !partial && self.title.is_none() {
            errors.add("title", validation::REQUIRED);
        }

        let form = ValidNoteForm {
            title: validation::text(
                &mut errors,
                "title",
                self.title,
                false,
                Some(TITLE_MAX_LENGTH),
            ),
            content: validation::text(&mut errors, "content", self.content, true, None),
            due_to: validation::datetime(&mut errors, "due_to", self.due_to),
            public: validation::flag(&mut errors, "public", self.public),
            importance: validation::flag(&mut errors, "importance", self.importance),
            note_status: validation::choice(&mut errors, "note_status", self.note_status),
        };

        errors.into_result(form)
    }
}

impl ValidNoteForm {
    /// Only the given fields change
    fn update_values(&self) -> UpdateNoteValues<'_> {
        UpdateNoteValues {
            title: self.title.as_deref(),
            content: self.content.as_deref(),
            due_to: self.due_to,
            public: self.public,
            importance: self.importance,
            note_status: self.note_status,
        }
    }
}

/// Create a note, the caller is the author
///
/// Request:
/// ```sh
/// curl -v -H 'Content-Type: application/json' \
///     -H 'Authorization: Bearer tokentokentoken' \
///     -d '{ "title": "Groceries", "content": "Milk", "importance": false }' \
///     http://localhost:6000/api/note/
/// ```
pub async fn create<S: Storage>(
    Extension(storage): Extension<S>,
    current_user: CurrentUser<S>,
    Form(form): Form<NoteForm>,
) -> Result<Success<NoteResponse>, Error> {
    let form = form.validate(false)?;

    let values = CreateNoteValues {
        author: &current_user,
        title: form.title.as_deref().unwrap_or_default(),
        content: form.content.as_deref().unwrap_or_default(),
        due_to: form.due_to,
        public: form.public.unwrap_or(false),
        importance: form.importance.unwrap_or(true),
        note_status: form.note_status.unwrap_or_default(),
    };

    let note = storage
        .create_note(&values)
        .await
        .map_err(Error::internal_server_error)?;

    tracing::info!("Note {} created by `{}`", note.id, current_user.username);

    Ok(Success::created(NoteResponse::from_note(note)))
}

/// Change a note with PUT
///
/// Like an update, fields that are left out keep their stored value
///
/// Request:
/// ```sh
/// curl -v -XPUT -H 'Content-Type: application/json' \
///     -H 'Authorization: Bearer tokentokentoken' \
///     -d '{ "title": "Groceries", "note_status": 1 }' \
///     http://localhost:6000/api/note/1/
/// ```
pub async fn replace<S: Storage>(
    Extension(storage): Extension<S>,
    current_user: CurrentUser<S>,
    PathParameters(note_id): PathParameters<i64>,
    Form(form): Form<NoteForm>,
) -> Result<Success<NoteDetailResponse>, Error> {
    let note = get_note(&storage, note_id).await?;
    let form = form.validate(true)?;

    if !note.is_written_by(&current_user.id) {
        return Err(Error::forbidden(
            "You can not change this note, only its author can",
        ));
    }

    save_note(&storage, &current_user, &note, &form.update_values()).await
}

/// Update some fields of a note
///
/// Request:
/// ```sh
/// curl -v -XPATCH -H 'Content-Type: application/json' \
///     -H 'Authorization: Bearer tokentokentoken' \
///     -d '{ "public": true }' \
///     http://localhost:6000/api/note/1/
/// ```
pub async fn update<S: Storage>(
    Extension(storage): Extension<S>,
    current_user: CurrentUser<S>,
    PathParameters(note_id): PathParameters<i64>,
    Form(form): Form<NoteForm>,
) -> Result<Success<NoteDetailResponse>, Error> {
    let note = get_note(&storage, note_id).await?;
    let form = form.validate(true)?;

    if !note.is_written_by(&current_user.id) {
        return Err(Error::forbidden(
            "You can not edit this note, only its author can",
        ));
    }

    save_note(&storage, &current_user, &note, &form.update_values()).await
}

/// Delete a note with all its comments
///
/// Request:
/// ```sh
/// curl -v -XDELETE \
///     -H 'Authorization: Bearer tokentokentoken' \
///     http://localhost:6000/api/note/1/
/// ```
pub async fn delete<S: Storage>(
    Extension(storage): Extension<S>,
    current_user: CurrentUser<S>,
    PathParameters(note_id): PathParameters<i64>,
) -> Result<Success<&'static str>, Error> {
    let note = get_note(&storage, note_id).await?;

    if !note.is_written_by(&current_user.id) {
        return Err(Error::forbidden(
            "You can not delete this note, only its author can",
        ));
    }

    storage
        .delete_note(&note)
        .await
        .map_err(Error::internal_server_error)?;

    tracing::info!("Note {} deleted by `{}`", note.id, current_user.username);

    Ok(Success::<&'static str>::no_content())
}

/// List public notes, with their author and comments
pub async fn public<S: Storage>(
    Extension(storage): Extension<S>,
) -> Result<Success<Vec<NoteDetailResponse>>, Error> {
    let filter = NoteFilter {
        public: Some(true),
        ..NoteFilter::default()
    };

    let notes = storage
        .find_all_notes(&filter, NoteOrder::Id)
        .await
        .map_err(Error::internal_server_error)?;

    NoteDetailResponse::from_note_multiple(&storage, notes)
        .await
        .map(Success::ok)
}

/// Query string of the importance/publicity filter
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FlagFilterQuery {
    importance: Option<String>,
    public: Option<String>,
}

/// List notes on importance and/or publicity
///
/// Request:
/// ```sh
/// curl -v 'http://localhost:6000/api/note/filter/?importance=true&public=False'
/// ```
pub async fn filter<S: Storage>(
    Extension(storage): Extension<S>,
    QueryParameters(query): QueryParameters<FlagFilterQuery>,
) -> Result<Success<Vec<NoteResponse>>, Error> {
    let mut errors = FieldErrors::new();

    let filter = NoteFilter {
        importance: validation::query_flag(
            &mut errors,
            "importance",
            query.importance.as_deref(),
        ),
        public: validation::query_flag(&mut errors, "public", query.public.as_deref()),
        ..NoteFilter::default()
    };

    let filter = errors.into_result(filter)?;

    find_notes(&storage, &filter, NoteOrder::Id).await
}

/// Query string of the status filter, `?note_status=0&note_status=2`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StatusFilterQuery {
    note_status: Vec<String>,
}

/// List notes with one of the requested statuses, all notes without any
///
/// Request:
/// ```sh
/// curl -v 'http://localhost:6000/api/note/filter/status/?note_status=0&note_status=1'
/// ```
pub async fn filter_status<S: Storage>(
    Extension(storage): Extension<S>,
    QueryParameters(query): QueryParameters<StatusFilterQuery>,
) -> Result<Success<Vec<NoteResponse>>, Error> {
    let mut errors = FieldErrors::new();

    let statuses =
        validation::choices::<NoteStatus>(&mut errors, "note_status", &query.note_status);

    let filter = errors.into_result(NoteFilter {
        note_status: ChoiceFilter::from_values(statuses),
        ..NoteFilter::default()
    })?;

    find_notes(&storage, &filter, NoteOrder::Id).await
}

/// List all notes, newest day first and important notes first within a day
pub async fn sort<S: Storage>(
    Extension(storage): Extension<S>,
) -> Result<Success<Vec<NoteResponse>>, Error> {
    find_notes(
        &storage,
        &NoteFilter::default(),
        NoteOrder::CreatedDayThenImportance,
    )
    .await
}

async fn find_notes<S: Storage>(
    storage: &S,
    filter: &NoteFilter,
    order: NoteOrder,
) -> Result<Success<Vec<NoteResponse>>, Error> {
    tracing::debug!("Finding notes with {filter:?} in {order:?} order");

    storage
        .find_all_notes(filter, order)
        .await
        .map(|notes| Success::ok(NoteResponse::from_note_multiple(notes)))
        .map_err(Error::internal_server_error)
}

async fn save_note<S: Storage>(
    storage: &S,
    current_user: &CurrentUser<S>,
    note: &Note,
    values: &UpdateNoteValues<'_>,
) -> Result<Success<NoteDetailResponse>, Error> {
    let note = storage
        .update_note(note, values)
        .await
        .map_err(Error::internal_server_error)?;

    tracing::info!("Note {} updated by `{}`", note.id, current_user.username);

    NoteDetailResponse::from_single_note(storage, note)
        .await
        .map(Success::ok)
}

pub(super) async fn get_note<S: Storage>(storage: &S, note_id: i64) -> Result<Note, Error> {
    tracing::debug!("Looking up note {note_id}");

    storage
        .find_single_note_by_id(note_id)
        .await
        .map_err(Error::internal_server_error)?
        .map_or_else(|| Err(Error::not_found("Note not found")), Ok)
}
