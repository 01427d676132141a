//! All things related to the storage of users, notes and comments

use std::fmt;
use std::future::Future;

use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::choices::ChoiceFilter;
use crate::comments::Comment;
use crate::comments::Rating;
use crate::notes::Note;
use crate::notes::NoteStatus;
use crate::users::Role;
use crate::users::User;

pub use memory::Memory;
pub use postgres::Postgres;

mod memory;
mod postgres;

/// Storage errors
#[derive(Debug)]
pub enum Error {
    /// A connection error with the storage
    Connection(String),

    /// A stored value could not be turned into a domain value
    Corrupted(String),

    /// A record went away while working with it
    Missing(String),
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Connection(error) => write!(f, "Connection error: {error}"),
            Error::Corrupted(error) => write!(f, "Corrupted data: {error}"),
            Error::Missing(error) => write!(f, "Missing record: {error}"),
        }
    }
}

/// Result type for all storage interactions
pub type Result<T> = core::result::Result<T, Error>;

/// Values to create a User
pub struct CreateUserValues<'a> {
    /// The initial session ID for the user
    pub session_id: &'a Uuid,

    /// The role of the user
    pub role: Role,

    /// The username
    pub username: &'a str,

    /// The hashed password
    pub hashed_password: &'a str,
}

/// Values to create a Note
pub struct CreateNoteValues<'a> {
    /// User writing the note, never taken from the payload
    pub author: &'a User,

    pub title: &'a str,

    pub content: &'a str,

    /// Defaults to one day after creation
    pub due_to: Option<NaiveDateTime>,

    pub public: bool,

    pub importance: bool,

    pub note_status: NoteStatus,
}

/// Values to update a Note
///
/// Fields that are `None` are not touched
#[derive(Default)]
pub struct UpdateNoteValues<'a> {
    pub title: Option<&'a str>,
    pub content: Option<&'a str>,
    pub due_to: Option<NaiveDateTime>,
    pub public: Option<bool>,
    pub importance: Option<bool>,
    pub note_status: Option<NoteStatus>,
}

/// Values to create a Comment
pub struct CreateCommentValues<'a> {
    /// User leaving the comment
    pub author: &'a User,

    pub rating: Rating,
}

/// Which notes to find
#[derive(Clone, Debug, Default)]
pub struct NoteFilter {
    /// Only notes with this visibility
    pub public: Option<bool>,

    /// Only notes with this importance
    pub importance: Option<bool>,

    /// Only notes with one of these statuses
    pub note_status: ChoiceFilter<NoteStatus>,
}

impl NoteFilter {
    /// Does the note pass the filter?
    pub fn matches(&self, note: &Note) -> bool {
        self.public.is_none_or(|public| note.public == public)
            && self
                .importance
                .is_none_or(|importance| note.importance == importance)
            && self.note_status.accepts(note.note_status)
    }
}

/// Order of a note listing
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NoteOrder {
    /// By ID, the order of creation
    #[default]
    Id,

    /// Newest creation day first, important notes first within a day
    CreatedDayThenImportance,
}

/// Storage with all supported operations
pub trait Storage: Clone + Send + Sync + 'static {
    /// Find any single user
    fn find_any_single_user(&self) -> impl Future<Output = Result<Option<User>>> + Send;

    /// Finds a single user by its username
    fn find_single_user_by_username(
        &self,
        username: &str,
    ) -> impl Future<Output = Result<Option<User>>> + Send;

    /// Finds a single user by its ID
    fn find_single_user_by_id(
        &self,
        id: &Uuid,
    ) -> impl Future<Output = Result<Option<User>>> + Send;

    /// Finds all users with one of the given IDs
    fn find_all_users_by_ids(&self, ids: &[Uuid])
    -> impl Future<Output = Result<Vec<User>>> + Send;

    /// Create a single user
    fn create_user(
        &self,
        values: &CreateUserValues<'_>,
    ) -> impl Future<Output = Result<User>> + Send;

    /// Delete a user, their notes and their comments
    fn delete_user(&self, user: &User) -> impl Future<Output = Result<()>> + Send;

    /// Find all notes passing the filter, in the given order
    fn find_all_notes(
        &self,
        filter: &NoteFilter,
        order: NoteOrder,
    ) -> impl Future<Output = Result<Vec<Note>>> + Send;

    /// Find a single note by ID
    fn find_single_note_by_id(&self, id: i64)
    -> impl Future<Output = Result<Option<Note>>> + Send;

    /// Create a note
    fn create_note(
        &self,
        values: &CreateNoteValues<'_>,
    ) -> impl Future<Output = Result<Note>> + Send;

    /// Update a note
    fn update_note(
        &self,
        note: &Note,
        values: &UpdateNoteValues<'_>,
    ) -> impl Future<Output = Result<Note>> + Send;

    /// Delete a note and its comments
    fn delete_note(&self, note: &Note) -> impl Future<Output = Result<()>> + Send;

    /// Find all comments with one of the given ratings
    fn find_all_comments(
        &self,
        rating: &ChoiceFilter<Rating>,
    ) -> impl Future<Output = Result<Vec<Comment>>> + Send;

    /// Find all comments of all given notes
    fn find_all_comments_by_notes(
        &self,
        notes: &[Note],
    ) -> impl Future<Output = Result<Vec<Comment>>> + Send;

    /// Create a comment on a note
    fn create_comment(
        &self,
        note: &Note,
        values: &CreateCommentValues<'_>,
    ) -> impl Future<Output = Result<Comment>> + Send;
}
