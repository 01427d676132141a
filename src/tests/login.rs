use axum::http::Method;
use axum::http::StatusCode;

use crate::tests::helper;

#[tokio::test]
async fn test_login() {
    let mut app = helper::setup_test_app().await;

    let access_token = helper::login(&mut app).await;
    assert!(access_token.len() > 10);

    // token identifies the user
    let (status_code, user, _) = helper::me(&mut app, &access_token).await;
    assert_eq!(StatusCode::OK, status_code);
    let user = user.unwrap();
    assert_eq!("admin", user["username"]);
    assert_eq!("admin", user["role"]);
    assert!(user.get("password").is_none());
}

#[tokio::test]
async fn test_login_with_wrong_password() {
    let mut app = helper::setup_test_app().await;

    let (status_code, error) = helper::call_raw(
        &mut app,
        Method::POST,
        "/api/users/token",
        "",
        r#"{"username":"admin","password":"notsosecret"}"#,
        true,
    )
    .await;
    assert_eq!(StatusCode::BAD_REQUEST, status_code);
    assert_eq!("Invalid user", error.error);
}

#[tokio::test]
async fn test_invalid_tokens() {
    let mut app = helper::setup_test_app().await;

    // no token at all
    let (status_code, error) =
        helper::call_raw(&mut app, Method::POST, "/api/note", "", r#"{"title":"x"}"#, true)
            .await;
    assert_eq!(StatusCode::FORBIDDEN, status_code);
    assert_eq!("Missing API token", error.error);

    // garbage token
    let (status_code, _, error) = helper::me(&mut app, "Bearer garbage").await;
    assert_eq!(StatusCode::FORBIDDEN, status_code);
    assert!(error.unwrap().error.starts_with("Invalid token"));
}
