use axum::http::Method;
use axum::http::StatusCode;
use chrono::Duration;
use chrono::NaiveDateTime;
use serde_json::Value;
use serde_json::json;

use crate::tests::helper;

fn parse_displayed(value: &Value) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(value.as_str().unwrap(), "%d %B %Y %H:%M:%S").unwrap()
}

#[tokio::test]
async fn test_notes() {
    let mut app = helper::setup_test_app().await;

    let access_token = helper::login(&mut app).await;
    let (_, admin, _) = helper::me(&mut app, &access_token).await;
    let admin = admin.unwrap();

    // verify empty note list
    assert!(helper::list(&mut app, "/api/note/").await.is_empty());

    // create note, author comes from the token
    let note = helper::create_note(
        &mut app,
        &access_token,
        &json!({ "title": "Groceries", "author": "somebody-else", "content": null }),
    )
    .await;
    assert_eq!("Groceries", note["title"]);
    assert_eq!("", note["content"]);
    assert_eq!(false, note["public"]);
    assert_eq!(true, note["importance"]);
    assert_eq!(admin["id"], note["author"]);
    assert_eq!(json!({ "value": 0, "display": "Active" }), note["note_status"]);
    let id = note["id"].as_i64().unwrap();

    // fetch notes, note is included
    let notes = helper::list(&mut app, "/api/note/").await;
    assert_eq!(1, notes.len());
    assert_eq!(note, notes[0]);

    // verify note detail
    let (status_code, detail, _) = helper::get(&mut app, &format!("/api/note/{id}/")).await;
    assert_eq!(StatusCode::OK, status_code);
    let detail = detail.unwrap();
    assert_eq!("Groceries", detail["title"]);
    assert_eq!("admin", detail["author"]);
    assert_eq!(json!([]), detail["comments"]);
    assert_eq!(note["created_at"], detail["created_at"]);

    // update some fields, `null` is ignored
    let (status_code, detail, _) = helper::maybe_change_note(
        &mut app,
        Method::PATCH,
        &access_token,
        id,
        &json!({ "title": null, "content": "Milk", "public": true, "note_status": 1 }),
    )
    .await;
    assert_eq!(StatusCode::OK, status_code);
    let detail = detail.unwrap();
    assert_eq!("Groceries", detail["title"]);
    assert_eq!("Milk", detail["content"]);
    assert_eq!(true, detail["public"]);
    assert_eq!(json!({ "value": 1, "display": "Executed" }), detail["note_status"]);
    assert_eq!(note["created_at"], detail["created_at"]);

    // PUT only changes what is given, like PATCH
    let (status_code, detail, _) = helper::maybe_change_note(
        &mut app,
        Method::PUT,
        &access_token,
        id,
        &json!({ "title": "Shopping", "importance": false }),
    )
    .await;
    assert_eq!(StatusCode::OK, status_code);
    let detail = detail.unwrap();
    assert_eq!("Shopping", detail["title"]);
    assert_eq!("Milk", detail["content"]);
    assert_eq!(true, detail["public"]);
    assert_eq!(false, detail["importance"]);
    assert_eq!(json!({ "value": 1, "display": "Executed" }), detail["note_status"]);
    assert_eq!(note["due_to"], detail["due_to"]);
    assert_eq!(note["created_at"], detail["created_at"]);

    // delete note
    let (status_code, _) = helper::maybe_delete_note(&mut app, &access_token, id).await;
    assert_eq!(StatusCode::NO_CONTENT, status_code);

    // note is no more
    let (status_code, _, error) = helper::get(&mut app, &format!("/api/note/{id}/")).await;
    assert_eq!(StatusCode::NOT_FOUND, status_code);
    assert_eq!("Note not found", error.unwrap().error);

    let (status_code, error) = helper::maybe_delete_note(&mut app, &access_token, id).await;
    assert_eq!(StatusCode::NOT_FOUND, status_code);
    assert_eq!("Note not found", error.unwrap().error);

    assert!(helper::list(&mut app, "/api/note/").await.is_empty());
}

#[tokio::test]
async fn test_due_to() {
    let mut app = helper::setup_test_app().await;

    let access_token = helper::login(&mut app).await;

    // defaults to one day after creation
    let note = helper::create_note(&mut app, &access_token, &json!({ "title": "Later" })).await;
    let created_at = parse_displayed(&note["created_at"]);
    let due_to = parse_displayed(&note["due_to"]);
    assert_eq!(Duration::days(1), due_to - created_at);

    // given values are shown in the display format, in UTC
    let note = helper::create_note(
        &mut app,
        &access_token,
        &json!({ "title": "Party", "due_to": "2030-01-02T05:04:05+02:00" }),
    )
    .await;
    assert_eq!("02 January 2030 03:04:05", note["due_to"]);

    let id = note["id"].as_i64().unwrap();
    let (status_code, detail, _) = helper::maybe_change_note(
        &mut app,
        Method::PATCH,
        &access_token,
        id,
        &json!({ "due_to": "2031-12-24" }),
    )
    .await;
    assert_eq!(StatusCode::OK, status_code);
    assert_eq!("24 December 2031 00:00:00", detail.unwrap()["due_to"]);
}

#[tokio::test]
async fn test_note_validation() {
    let mut app = helper::setup_test_app().await;

    let access_token = helper::login(&mut app).await;

    // title is required
    let (status_code, _, error) =
        helper::maybe_create_note(&mut app, &access_token, &json!({})).await;
    assert_eq!(StatusCode::BAD_REQUEST, status_code);
    let error = error.unwrap();
    assert_eq!("Validation error", error.error);
    assert_eq!(json!({ "title": ["This field is required."] }), error.fields);

    // all problems are reported at once
    let (status_code, _, error) = helper::maybe_create_note(
        &mut app,
        &access_token,
        &json!({
            "title": "x".repeat(256),
            "content": 12,
            "due_to": "tomorrow",
            "public": "maybe",
            "note_status": 5,
        }),
    )
    .await;
    assert_eq!(StatusCode::BAD_REQUEST, status_code);
    let fields = error.unwrap().fields;
    assert_eq!(
        json!(["Ensure this field has no more than 255 characters."]),
        fields["title"]
    );
    assert_eq!(json!(["Not a valid string."]), fields["content"]);
    assert_eq!(json!(["Must be a valid boolean."]), fields["public"]);
    assert_eq!(json!([r#""5" is not a valid choice."#]), fields["note_status"]);
    assert!(fields["due_to"].is_array());
    assert!(fields.get("importance").is_none());

    // blank title
    let (status_code, _, error) =
        helper::maybe_create_note(&mut app, &access_token, &json!({ "title": "  " })).await;
    assert_eq!(StatusCode::BAD_REQUEST, status_code);
    assert_eq!(
        json!({ "title": ["This field may not be blank."] }),
        error.unwrap().fields
    );

    // nothing got stored
    assert!(helper::list(&mut app, "/api/note/").await.is_empty());

    // PUT does not need a title, but what is given gets checked
    let note = helper::create_note(
        &mut app,
        &access_token,
        &json!({ "title": "Valid", "content": "keep me", "public": true, "note_status": 2 }),
    )
    .await;
    let id = note["id"].as_i64().unwrap();

    let (status_code, detail, _) = helper::maybe_change_note(
        &mut app,
        Method::PUT,
        &access_token,
        id,
        &json!({ "importance": false }),
    )
    .await;
    assert_eq!(StatusCode::OK, status_code);
    let detail = detail.unwrap();
    assert_eq!("Valid", detail["title"]);
    assert_eq!("keep me", detail["content"]);
    assert_eq!(true, detail["public"]);
    assert_eq!(false, detail["importance"]);
    assert_eq!(json!({ "value": 2, "display": "Postponed" }), detail["note_status"]);

    let (status_code, _, error) = helper::maybe_change_note(
        &mut app,
        Method::PUT,
        &access_token,
        id,
        &json!({ "title": "" }),
    )
    .await;
    assert_eq!(StatusCode::BAD_REQUEST, status_code);
    assert_eq!(
        json!({ "title": ["This field may not be blank."] }),
        error.unwrap().fields
    );
}

#[tokio::test]
async fn test_only_author_can_change_note() {
    let mut app = helper::setup_test_app().await;

    let access_token = helper::login(&mut app).await;
    let member_token = helper::login_as_member(&mut app, &access_token, "member").await;

    let note = helper::create_note(&mut app, &access_token, &json!({ "title": "Mine" })).await;
    let id = note["id"].as_i64().unwrap();

    // replace
    let (status_code, _, error) = helper::maybe_change_note(
        &mut app,
        Method::PUT,
        &member_token,
        id,
        &json!({ "title": "Yours" }),
    )
    .await;
    assert_eq!(StatusCode::FORBIDDEN, status_code);
    assert_eq!(
        "You can not change this note, only its author can",
        error.unwrap().error
    );

    // update
    let (status_code, _, error) = helper::maybe_change_note(
        &mut app,
        Method::PATCH,
        &member_token,
        id,
        &json!({ "public": true }),
    )
    .await;
    assert_eq!(StatusCode::FORBIDDEN, status_code);
    assert_eq!(
        "You can not edit this note, only its author can",
        error.unwrap().error
    );

    // validation goes first
    let (status_code, _, error) = helper::maybe_change_note(
        &mut app,
        Method::PATCH,
        &member_token,
        id,
        &json!({ "public": "maybe" }),
    )
    .await;
    assert_eq!(StatusCode::BAD_REQUEST, status_code);
    assert_eq!("Validation error", error.unwrap().error);

    // delete
    let (status_code, error) = helper::maybe_delete_note(&mut app, &member_token, id).await;
    assert_eq!(StatusCode::FORBIDDEN, status_code);
    assert_eq!(
        "You can not delete this note, only its author can",
        error.unwrap().error
    );

    // note is untouched
    let (status_code, detail, _) = helper::get(&mut app, &format!("/api/note/{id}")).await;
    assert_eq!(StatusCode::OK, status_code);
    let detail = detail.unwrap();
    assert_eq!("Mine", detail["title"]);
    assert_eq!(false, detail["public"]);

    // the author can
    let (status_code, _, _) = helper::maybe_change_note(
        &mut app,
        Method::PATCH,
        &access_token,
        id,
        &json!({ "public": true }),
    )
    .await;
    assert_eq!(StatusCode::OK, status_code);
}

#[tokio::test]
async fn test_note_paths() {
    let mut app = helper::setup_test_app().await;

    let access_token = helper::login(&mut app).await;

    helper::create_note(&mut app, &access_token, &json!({ "title": "Slashes" })).await;

    // trailing slash or not, same handler
    let with_slash = helper::list(&mut app, "/api/note/").await;
    let without_slash = helper::list(&mut app, "/api/note").await;
    assert_eq!(1, with_slash.len());
    assert_eq!(with_slash, without_slash);

    let id = with_slash[0]["id"].as_i64().unwrap();
    let (status_code, _, _) = helper::get(&mut app, &format!("/api/note/{id}")).await;
    assert_eq!(StatusCode::OK, status_code);

    // unknown ID
    let (status_code, _, error) = helper::get(&mut app, "/api/note/999/").await;
    assert_eq!(StatusCode::NOT_FOUND, status_code);
    assert_eq!("Note not found", error.unwrap().error);

    // not an ID at all
    let (status_code, _, error) = helper::get(&mut app, "/api/note/abc/").await;
    assert_eq!(StatusCode::BAD_REQUEST, status_code);
    assert_eq!("Invalid path parameter", error.unwrap().error);
}
