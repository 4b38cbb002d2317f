use crate::support::spawn_app;

#[tokio::test]
async fn answering_an_unknown_question_is_not_found() {
    let server = spawn_app().await;
    let client = reqwest::Client::new();

    let bogus = uuid::Uuid::new_v4();
    let response = client
        .post(format!("{}/answer/{bogus}", server.base_url))
        .body("42")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn preflight_is_answered_permissively() {
    let server = spawn_app().await;
    let client = reqwest::Client::new();

    let bogus = uuid::Uuid::new_v4();
    let response = client
        .request(
            reqwest::Method::OPTIONS,
            format!("{}/answer/{bogus}", server.base_url),
        )
        .header("Origin", "https://example.com")
        .header("Access-Control-Request-Method", "POST")
        .send()
        .await
        .unwrap();

    assert!(response.status().is_success());
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "*"
    );
}
