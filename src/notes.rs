//! Notes

use chrono::naive::NaiveDateTime;
use uuid::Uuid;

use crate::choices::Choice;

/// Progress of a note
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NoteStatus {
    /// Still to do
    #[default]
    Active,

    /// Done
    Executed,

    /// Pushed back
    Postponed,
}

impl Choice for NoteStatus {
    const ALL: &'static [Self] = &[Self::Active, Self::Executed, Self::Postponed];

    fn value(self) -> i16 {
        match self {
            Self::Active => 0,
            Self::Executed => 1,
            Self::Postponed => 2,
        }
    }

    fn display(self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Executed => "Executed",
            Self::Postponed => "Postponed",
        }
    }
}

/// A note (or to-do) written by a user
#[derive(Clone, Debug)]
pub struct Note {
    /// Note ID
    pub id: i64,

    /// Title, never empty
    pub title: String,

    /// Body of the note, empty by default
    pub content: String,

    /// Creation date, never changes
    pub created_at: NaiveDateTime,

    /// When the note should be done
    pub due_to: NaiveDateTime,

    /// Visible in the public listing
    pub public: bool,

    /// Important notes go first within a day
    pub importance: bool,

    /// The user that wrote the note
    pub author_id: Uuid,

    /// Progress of the note
    pub note_status: NoteStatus,
}

impl Note {
    /// Is the given user the author of this note?
    pub fn is_written_by(&self, user_id: &Uuid) -> bool {
        &self.author_id == user_id
    }
}
