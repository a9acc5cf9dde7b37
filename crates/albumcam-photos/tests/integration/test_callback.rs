//! Integration tests for the loopback OAuth callback server

use albumcam_photos::auth::LocalCallbackServer;

#[tokio::test]
async fn test_callback_server_returns_code_and_state() {
    let server = LocalCallbackServer::bind(0).await.expect("bind");
    let redirect = server.redirect_uri();
    let waiter = tokio::spawn(server.wait());

    let http = reqwest::Client::new();
    let favicon = http
        .get(format!("{redirect}favicon.ico"))
        .send()
        .await
        .expect("favicon request");
    assert_eq!(favicon.status(), reqwest::StatusCode::NOT_FOUND);

    let response = http
        .get(format!("{redirect}?code=4%2F0AbC&state=csrf-123"))
        .send()
        .await
        .expect("callback request");
    assert!(response.status().is_success());
    assert!(response.text().await.unwrap().contains("Authorization Complete"));

    let params = waiter.await.unwrap().expect("callback params");
    assert_eq!(params.code, "4/0AbC");
    assert_eq!(params.state, "csrf-123");
}

#[tokio::test]
async fn test_callback_server_reports_denied_access() {
    let server = LocalCallbackServer::bind(0).await.expect("bind");
    let redirect = server.redirect_uri();
    let waiter = tokio::spawn(server.wait());

    let response = reqwest::get(format!("{redirect}?error=access_denied&state=x"))
        .await
        .expect("callback request");
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

    let err = waiter.await.unwrap().unwrap_err();
    assert!(err.to_string().contains("access_denied"));
}
