//! Postgres storage

use std::time::Duration;

use chrono::NaiveDateTime;
use sqlx::PgPool;
use sqlx::Postgres as Driver;
use sqlx::QueryBuilder;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use crate::choices::Choice;
use crate::choices::ChoiceFilter;
use crate::comments::Comment;
use crate::comments::Rating;
use crate::notes::Note;
use crate::notes::NoteStatus;
use crate::users::Role;
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

/// Migrator to run migrations on startup
static MIGRATOR: Migrator = sqlx::migrate!();

const USER_COLUMNS: &str = "id, session_id, username, hashed_password, role, created_at";

const NOTE_COLUMNS: &str =
    "id, title, content, created_at, due_to, public, importance, author_id, note_status";

const COMMENT_COLUMNS: &str = "id, author_id, note_id, rating";

/// Postgres type for user role
#[derive(PartialEq, Debug, sqlx::Type)]
#[sqlx(type_name = "user_role_type")]
#[sqlx(rename_all = "kebab-case")]
enum UserRoleType {
    /// Admin
    Admin,

    /// Member
    Member,
}

impl UserRoleType {
    /// Create user role type from role
    fn from_role(role: Role) -> Self {
        match role {
            Role::Admin => UserRoleType::Admin,
            Role::Member => UserRoleType::Member,
        }
    }

    /// Create role from user role type
    fn to_role(&self) -> Role {
        match self {
            UserRoleType::Admin => Role::Admin,
            UserRoleType::Member => Role::Member,
        }
    }
}

/// Postgres version of a user
#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    session_id: Uuid,
    username: String,
    hashed_password: String,
    role: UserRoleType,
    created_at: NaiveDateTime,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            session_id: row.session_id,
            username: row.username,
            hashed_password: row.hashed_password,
            role: row.role.to_role(),
            created_at: row.created_at,
        }
    }
}

/// Postgres version of a note, the status is a plain `SMALLINT`
#[derive(sqlx::FromRow)]
struct NoteRow {
    id: i64,
    title: String,
    content: String,
    created_at: NaiveDateTime,
    due_to: NaiveDateTime,
    public: bool,
    importance: bool,
    author_id: Uuid,
    note_status: i16,
}

impl TryFrom<NoteRow> for Note {
    type Error = Error;

    fn try_from(row: NoteRow) -> Result<Self> {
        let note_status = NoteStatus::from_value(i64::from(row.note_status)).ok_or_else(|| {
            Error::Corrupted(format!(
                "Note {} has unknown status {}",
                row.id, row.note_status
            ))
        })?;

        Ok(Self {
            id: row.id,
            title: row.title,
            content: row.content,
            created_at: row.created_at,
            due_to: row.due_to,
            public: row.public,
            importance: row.importance,
            author_id: row.author_id,
            note_status,
        })
    }
}

/// Postgres version of a comment, the rating is a plain `SMALLINT`
#[derive(sqlx::FromRow)]
struct CommentRow {
    id: i64,
    author_id: Uuid,
    note_id: i64,
    rating: i16,
}

impl TryFrom<CommentRow> for Comment {
    type Error = Error;

    fn try_from(row: CommentRow) -> Result<Self> {
        let rating = Rating::from_value(i64::from(row.rating)).ok_or_else(|| {
            Error::Corrupted(format!("Comment {} has unknown rating {}", row.id, row.rating))
        })?;

        Ok(Self {
            id: row.id,
            author_id: row.author_id,
            note_id: row.note_id,
            rating,
        })
    }
}

/// Convert rows into domain values, failing on the first corrupted row
fn from_rows<R, T>(rows: Vec<R>) -> Result<Vec<T>>
where
    T: TryFrom<R, Error = Error>,
{
    rows.into_iter().map(T::try_from).collect()
}

/// Postgres storage
#[derive(Clone)]
pub struct Postgres {
    /// Pool of connections
    connection_pool: PgPool,
}

impl Postgres {
    /// Connect to Postgres and run the migrations
    pub async fn connect(database_url: &str) -> Result<Self> {
        let connection_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(database_url)
            .await
            .map_err(connection_error)?;

        Self::new_with_pool(connection_pool).await
    }

    /// Create Postgres storage with existing pool
    ///
    /// Migrations will be run
    pub async fn new_with_pool(connection_pool: PgPool) -> Result<Self> {
        MIGRATOR
            .run(&connection_pool)
            .await
            .map_err(|err| Error::Connection(format!("Migrations could not run: {err}")))?;

        Ok(Self { connection_pool })
    }
}

impl Storage for Postgres {
    async fn find_any_single_user(&self) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users LIMIT 1"
        ))
        .fetch_optional(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        Ok(user.map(User::from))
    }

    async fn find_single_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1 LIMIT 1"
        ))
        .bind(username)
        .fetch_optional(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        Ok(user.map(User::from))
    }

    async fn find_single_user_by_id(&self, id: &Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 LIMIT 1"
        ))
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        Ok(user.map(User::from))
    }

    async fn find_all_users_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let users = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ANY($1)"
        ))
        .bind(ids.to_vec())
        .fetch_all(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        Ok(users.into_iter().map(User::from).collect())
    }

    async fn create_user(&self, values: &CreateUserValues<'_>) -> Result<User> {
        let user = sqlx::query_as::<_, UserRow>(&format!(
            r"
            INSERT INTO users (id, session_id, username, hashed_password, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(Uuid::new_v4())
        .bind(values.session_id)
        .bind(values.username)
        .bind(values.hashed_password)
        .bind(UserRoleType::from_role(values.role))
        .fetch_one(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        Ok(User::from(user))
    }

    async fn delete_user(&self, user: &User) -> Result<()> {
        // notes and comments follow through `ON DELETE CASCADE`
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user.id)
            .execute(&self.connection_pool)
            .await
            .map_err(connection_error)?;

        Ok(())
    }

    async fn find_all_notes(&self, filter: &NoteFilter, order: NoteOrder) -> Result<Vec<Note>> {
        let mut query =
            QueryBuilder::<Driver>::new(format!("SELECT {NOTE_COLUMNS} FROM notes WHERE TRUE"));

        if let Some(public) = filter.public {
            query.push(" AND public = ").push_bind(public);
        }

        if let Some(importance) = filter.importance {
            query.push(" AND importance = ").push_bind(importance);
        }

        if let Some(statuses) = filter.note_status.values() {
            query
                .push(" AND note_status = ANY(")
                .push_bind(statuses)
                .push(")");
        }

        query.push(match order {
            NoteOrder::Id => " ORDER BY id",
            NoteOrder::CreatedDayThenImportance => {
                " ORDER BY date_trunc('day', created_at) DESC, importance DESC, id"
            }
        });

        let notes = query
            .build_query_as::<NoteRow>()
            .fetch_all(&self.connection_pool)
            .await
            .map_err(connection_error)?;

        from_rows(notes)
    }

    async fn find_single_note_by_id(&self, id: i64) -> Result<Option<Note>> {
        let note = sqlx::query_as::<_, NoteRow>(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes WHERE id = $1 LIMIT 1"
        ))
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        note.map(Note::try_from).transpose()
    }

    async fn create_note(&self, values: &CreateNoteValues<'_>) -> Result<Note> {
        let note = sqlx::query_as::<_, NoteRow>(&format!(
            r"
            INSERT INTO notes (title, content, due_to, public, importance, author_id, note_status)
            VALUES ($1, $2, COALESCE($3, timezone('utc', now()) + INTERVAL '1 day'), $4, $5, $6, $7)
            RETURNING {NOTE_COLUMNS}
            "
        ))
        .bind(values.title)
        .bind(values.content)
        .bind(values.due_to)
        .bind(values.public)
        .bind(values.importance)
        .bind(values.author.id)
        .bind(values.note_status.value())
        .fetch_one(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        Note::try_from(note)
    }

    async fn update_note(&self, note: &Note, values: &UpdateNoteValues<'_>) -> Result<Note> {
        let updated_note = sqlx::query_as::<_, NoteRow>(&format!(
            r"
            UPDATE notes
            SET title = $1, content = $2, due_to = $3, public = $4, importance = $5, note_status = $6
            WHERE id = $7
            RETURNING {NOTE_COLUMNS}
            "
        ))
        .bind(values.title.unwrap_or(&note.title))
        .bind(values.content.unwrap_or(&note.content))
        .bind(values.due_to.unwrap_or(note.due_to))
        .bind(values.public.unwrap_or(note.public))
        .bind(values.importance.unwrap_or(note.importance))
        .bind(values.note_status.unwrap_or(note.note_status).value())
        .bind(note.id)
        .fetch_one(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        Note::try_from(updated_note)
    }

    async fn delete_note(&self, note: &Note) -> Result<()> {
        // comments follow through `ON DELETE CASCADE`
        sqlx::query("DELETE FROM notes WHERE id = $1")
            .bind(note.id)
            .execute(&self.connection_pool)
            .await
            .map_err(connection_error)?;

        Ok(())
    }

    async fn find_all_comments(&self, rating: &ChoiceFilter<Rating>) -> Result<Vec<Comment>> {
        let mut query =
            QueryBuilder::<Driver>::new(format!("SELECT {COMMENT_COLUMNS} FROM comments"));

        if let Some(ratings) = rating.values() {
            query.push(" WHERE rating = ANY(").push_bind(ratings).push(")");
        }

        query.push(" ORDER BY id");

        let comments = query
            .build_query_as::<CommentRow>()
            .fetch_all(&self.connection_pool)
            .await
            .map_err(connection_error)?;

        from_rows(comments)
    }

    async fn find_all_comments_by_notes(&self, notes: &[Note]) -> Result<Vec<Comment>> {
        if notes.is_empty() {
            return Ok(Vec::new());
        }

        let comments = sqlx::query_as::<_, CommentRow>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE note_id = ANY($1) ORDER BY id"
        ))
        .bind(notes.iter().map(|note| note.id).collect::<Vec<i64>>())
        .fetch_all(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        from_rows(comments)
    }

    async fn create_comment(
        &self,
        note: &Note,
        values: &CreateCommentValues<'_>,
    ) -> Result<Comment> {
        let comment = sqlx::query_as::<_, CommentRow>(&format!(
            r"
            INSERT INTO comments (author_id, note_id, rating)
            VALUES ($1, $2, $3)
            RETURNING {COMMENT_COLUMNS}
            "
        ))
        .bind(values.author.id)
        .bind(note.id)
        .bind(values.rating.value())
        .fetch_one(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        Comment::try_from(comment)
    }
}

/// Convert `SQLx` to storage connection error
fn connection_error<E>(err: E) -> Error
where
    E: std::error::Error,
{
    Error::Connection(err.to_string())
}
