use axum::http::Method;
use axum::http::StatusCode;

use crate::tests::helper;

#[tokio::test]
async fn test_login_page() {
    let mut app = helper::setup_test_app().await;

    let (status_code, content_type, body) =
        helper::page(&mut app, Method::GET, "/login/", None, None).await;
    assert_eq!(StatusCode::OK, status_code);
    assert!(content_type.unwrap().starts_with("text/html"));
    assert!(body.contains(r#"<form method="post" action="/login/">"#));
    assert!(body.contains(r#"name="username""#));
    assert!(body.contains(r#"name="password""#));
}

#[tokio::test]
async fn test_login_echo() {
    let mut app = helper::setup_test_app().await;

    let (status_code, content_type, body) = helper::page(
        &mut app,
        Method::POST,
        "/login/",
        None,
        Some("username=admin&password=s3cret%21"),
    )
    .await;
    assert_eq!(StatusCode::OK, status_code);
    assert_eq!(Some("application/json".to_string()), content_type);
    assert_eq!(
        "{\n    \"password\": \"s3cret!\",\n    \"username\": \"admin\"\n}",
        body
    );
}

#[tokio::test]
async fn test_about_page() {
    let mut app = helper::setup_test_app().await;

    // anonymous
    let (status_code, _, body) = helper::page(&mut app, Method::GET, "/about/", None, None).await;
    assert_eq!(StatusCode::OK, status_code);
    assert!(body.contains("Server: notes.example.com"));
    assert!(body.contains("User: anonymous"));

    // broken token, still anonymous
    let (status_code, _, body) =
        helper::page(&mut app, Method::GET, "/about", Some("Bearer nope"), None).await;
    assert_eq!(StatusCode::OK, status_code);
    assert!(body.contains("User: anonymous"));

    // logged in
    let access_token = helper::login(&mut app).await;
    let (status_code, _, body) =
        helper::page(&mut app, Method::GET, "/about/", Some(access_token.as_str()), None).await;
    assert_eq!(StatusCode::OK, status_code);
    assert!(body.contains("User: admin"));
}
