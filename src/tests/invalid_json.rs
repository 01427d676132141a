use axum::http::Method;
use axum::http::StatusCode;

use crate::tests::helper;

#[tokio::test]
async fn test_invalid_json() {
    let mut app = helper::setup_test_app().await;

    let access_token = helper::login(&mut app).await;

    // wrong shape
    let (status_code, error) = helper::call_raw(
        &mut app,
        Method::POST,
        "/api/note",
        &access_token,
        r#""just a title""#,
        true,
    )
    .await;
    assert_eq!(StatusCode::BAD_REQUEST, status_code);
    assert_eq!("Data error", error.error);
    assert!(error.description.is_some());

    // syntax error
    let (status_code, error) = helper::call_raw(
        &mut app,
        Method::POST,
        "/api/note",
        &access_token,
        r#"{"}"#,
        true,
    )
    .await;
    assert_eq!(StatusCode::BAD_REQUEST, status_code);
    assert_eq!("JSON syntax error", error.error);
    assert!(error.description.is_some());

    // syntax error
    let (status_code, error) = helper::call_raw(
        &mut app,
        Method::PATCH,
        "/api/note/1",
        &access_token,
        r#"{"title":{"bar":}}"#,
        true,
    )
    .await;
    assert_eq!(StatusCode::BAD_REQUEST, status_code);
    assert_eq!("JSON syntax error", error.error);

    // missing content type
    let (status_code, error) = helper::call_raw(
        &mut app,
        Method::POST,
        "/api/note",
        &access_token,
        r#"{"title":"x"}"#,
        false,
    )
    .await;
    assert_eq!(StatusCode::BAD_REQUEST, status_code);
    assert_eq!("Missing `application/json` content type", error.error);

    // nothing got stored
    assert!(helper::list(&mut app, "/api/note").await.is_empty());
}
