//! Memory storage
//!
//! Will be destroyed on system shutdown

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::Arc;

use chrono::Duration;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::choices::ChoiceFilter;
use crate::comments::Comment;
use crate::comments::Rating;
use crate::notes::Note;
use crate::users::User;

use super::CreateCommentValues;
use super::CreateNoteValues;
use super::CreateUserValues;
use super::Error;
use super::NoteFilter;
use super::NoteOrder;
use super::Result;
use super::Storage;
use super::UpdateNoteValues;

/// All tables, behind a single lock so cascades are atomic
#[derive(Debug, Default)]
struct Tables {
    users: HashMap<Uuid, User>,

    /// Keyed by ID, iteration follows creation order
    notes: BTreeMap<i64, Note>,

    /// Keyed by ID, iteration follows creation order
    comments: BTreeMap<i64, Comment>,

    last_note_id: i64,

    last_comment_id: i64,
}

/// An in-memory storage
///
/// Will be destroyed on system shutdown
#[derive(Clone, Debug, Default)]
pub struct Memory {
    tables: Arc<Mutex<Tables>>,
}

impl Memory {
    /// Create a new empty Memory storage
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for Memory {
    async fn find_any_single_user(&self) -> Result<Option<User>> {
        Ok(self.tables.lock().await.users.values().next().cloned())
    }

    async fn find_single_user_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self
            .tables
            .lock()
            .await
            .users
            .values()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn find_single_user_by_id(&self, id: &Uuid) -> Result<Option<User>> {
        Ok(self.tables.lock().await.users.get(id).cloned())
    }

    async fn find_all_users_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>> {
        let tables = self.tables.lock().await;

        Ok(ids
            .iter()
            .filter_map(|id| tables.users.get(id))
            .cloned()
            .collect())
    }

    async fn create_user(&self, values: &CreateUserValues<'_>) -> Result<User> {
        let user = User {
            id: Uuid::new_v4(),
            session_id: *values.session_id,
            username: values.username.to_string(),
            hashed_password: values.hashed_password.to_string(),
            role: values.role,
            created_at: Utc::now().naive_utc(),
        };

        self.tables
            .lock()
            .await
            .users
            .insert(user.id, user.clone());

        Ok(user)
    }

    async fn delete_user(&self, user: &User) -> Result<()> {
        let mut tables = self.tables.lock().await;

        tables.users.remove(&user.id);
        tables.notes.retain(|_, note| note.author_id != user.id);

        let Tables {
            notes, comments, ..
        } = &mut *tables;
        comments.retain(|_, comment| {
            comment.author_id != user.id && notes.contains_key(&comment.note_id)
        });

        Ok(())
    }

    async fn find_all_notes(&self, filter: &NoteFilter, order: NoteOrder) -> Result<Vec<Note>> {
        let mut notes = self
            .tables
            .lock()
            .await
            .notes
            .values()
            .filter(|note| filter.matches(note))
            .cloned()
            .collect::<Vec<Note>>();

        // stable sort, ties keep the creation order
        if order == NoteOrder::CreatedDayThenImportance {
            notes.sort_by_key(|note| (Reverse(note.created_at.date()), Reverse(note.importance)));
        }

        Ok(notes)
    }

    async fn find_single_note_by_id(&self, id: i64) -> Result<Option<Note>> {
        Ok(self.tables.lock().await.notes.get(&id).cloned())
    }

    async fn create_note(&self, values: &CreateNoteValues<'_>) -> Result<Note> {
        let mut tables = self.tables.lock().await;

        tables.last_note_id += 1;

        let created_at = Utc::now().naive_utc();
        let note = Note {
            id: tables.last_note_id,
            title: values.title.to_string(),
            content: values.content.to_string(),
            created_at,
            due_to: values.due_to.unwrap_or(created_at + Duration::days(1)),
            public: values.public,
            importance: values.importance,
            author_id: values.author.id,
            note_status: values.note_status,
        };

        tables.notes.insert(note.id, note.clone());

        Ok(note)
    }

    async fn update_note(&self, note: &Note, values: &UpdateNoteValues<'_>) -> Result<Note> {
        self.tables
            .lock()
            .await
            .notes
            .get_mut(&note.id)
            .map(|note| {
                if let Some(title) = values.title {
                    note.title = title.to_string();
                }

                if let Some(content) = values.content {
                    note.content = content.to_string();
                }

                if let Some(due_to) = values.due_to {
                    note.due_to = due_to;
                }

                if let Some(public) = values.public {
                    note.public = public;
                }

                if let Some(importance) = values.importance {
                    note.importance = importance;
                }

                if let Some(note_status) = values.note_status {
                    note.note_status = note_status;
                }

                note.clone()
            })
            .ok_or_else(|| Error::Missing(format!("Note {} no longer exists", note.id)))
    }

    async fn delete_note(&self, note: &Note) -> Result<()> {
        let mut tables = self.tables.lock().await;

        tables.notes.remove(&note.id);
        tables
            .comments
            .retain(|_, comment| comment.note_id != note.id);

        Ok(())
    }

    async fn find_all_comments(&self, rating: &ChoiceFilter<Rating>) -> Result<Vec<Comment>> {
        Ok(self
            .tables
            .lock()
            .await
            .comments
            .values()
            .filter(|comment| rating.accepts(comment.rating))
            .cloned()
            .collect())
    }

    async fn find_all_comments_by_notes(&self, notes: &[Note]) -> Result<Vec<Comment>> {
        if notes.is_empty() {
            return Ok(Vec::new());
        }

        Ok(self
            .tables
            .lock()
            .await
            .comments
            .values()
            .filter(|comment| notes.iter().any(|note| note.id == comment.note_id))
            .cloned()
            .collect())
    }

    async fn create_comment(
        &self,
        note: &Note,
        values: &CreateCommentValues<'_>,
    ) -> Result<Comment> {
        let mut tables = self.tables.lock().await;

        if !tables.notes.contains_key(&note.id) {
            return Err(Error::Missing(format!("Note {} no longer exists", note.id)));
        }

        tables.last_comment_id += 1;

        let comment = Comment {
            id: tables.last_comment_id,
            author_id: values.author.id,
            note_id: note.id,
            rating: values.rating,
        };

        tables.comments.insert(comment.id, comment.clone());

        Ok(comment)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::notes::NoteStatus;
    use crate::users::Role;

    async fn user(storage: &Memory, username: &str) -> User {
        storage
            .create_user(&CreateUserValues {
                session_id: &Uuid::new_v4(),
                role: Role::Member,
                username,
                hashed_password: "hash",
            })
            .await
            .unwrap()
    }

    async fn note(storage: &Memory, author: &User, title: &str, importance: bool) -> Note {
        storage
            .create_note(&CreateNoteValues {
                author,
                title,
                content: "",
                due_to: None,
                public: false,
                importance,
                note_status: NoteStatus::Active,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_due_to_defaults_to_next_day() {
        let storage = Memory::new();
        let author = user(&storage, "author").await;

        let note = note(&storage, &author, "Tomorrow", true).await;

        assert_eq!(Duration::days(1), note.due_to - note.created_at);
    }

    #[tokio::test]
    async fn test_sort_by_day_then_importance() {
        let storage = Memory::new();
        let author = user(&storage, "author").await;

        let old = note(&storage, &author, "Old", true).await;
        let unimportant = note(&storage, &author, "Unimportant", false).await;
        let important = note(&storage, &author, "Important", true).await;

        // move the first note a day back
        {
            let mut tables = storage.tables.lock().await;
            let stored = tables.notes.get_mut(&old.id).unwrap();
            stored.created_at = NaiveDate::from_ymd_opt(2020, 1, 1)
                .unwrap()
                .and_hms_opt(23, 59, 59)
                .unwrap();
        }

        let notes = storage
            .find_all_notes(&NoteFilter::default(), NoteOrder::CreatedDayThenImportance)
            .await
            .unwrap();

        let titles = notes.iter().map(|note| note.title.as_str()).collect::<Vec<_>>();
        assert_eq!(vec!["Important", "Unimportant", "Old"], titles);
        assert!(important.id > unimportant.id);
    }

    #[tokio::test]
    async fn test_delete_cascades() {
        let storage = Memory::new();
        let author = user(&storage, "author").await;
        let commenter = user(&storage, "commenter").await;

        let first = note(&storage, &author, "First", true).await;
        let second = note(&storage, &commenter, "Second", true).await;

        for note in [&first, &second] {
            storage
                .create_comment(
                    note,
                    &CreateCommentValues {
                        author: &commenter,
                        rating: Rating::Good,
                    },
                )
                .await
                .unwrap();
        }

        storage.delete_note(&first).await.unwrap();

        let comments = storage.find_all_comments(&ChoiceFilter::Any).await.unwrap();
        assert_eq!(1, comments.len());
        assert_eq!(second.id, comments[0].note_id);

        storage.delete_user(&commenter).await.unwrap();

        assert!(storage.find_single_note_by_id(second.id).await.unwrap().is_none());
        assert!(storage.find_all_comments(&ChoiceFilter::Any).await.unwrap().is_empty());
        assert!(storage.find_single_user_by_id(&author.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_writing_to_a_deleted_note() {
        let storage = Memory::new();
        let author = user(&storage, "author").await;

        let gone = note(&storage, &author, "Gone", true).await;
        storage.delete_note(&gone).await.unwrap();

        let values = UpdateNoteValues {
            title: Some("Back"),
            content: None,
            due_to: None,
            public: None,
            importance: None,
            note_status: None,
        };
        let err = storage.update_note(&gone, &values).await.unwrap_err();
        assert!(matches!(err, Error::Missing(_)), "{err}");

        let err = storage
            .create_comment(
                &gone,
                &CreateCommentValues {
                    author: &author,
                    rating: Rating::Good,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Missing(_)), "{err}");
    }
}
