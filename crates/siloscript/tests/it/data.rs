use crate::support::spawn_app;

#[tokio::test]
async fn run_exposes_a_data_url_and_closes_the_silo_on_completion() {
    let server = spawn_app().await;
    let client = reqwest::Client::new();

    let script = "echo_url.sh";
    std::fs::write(
        server.script_root.join(script),
        "#!/bin/sh\necho -n \"$DATASTORE_URL\"\n",
    )
    .unwrap();
    set_executable(&server.script_root.join(script));

    let run = client
        .post(format!("{}/run/jim", server.base_url))
        .form(&[("script", script), ("channel_key", ""), ("args", "")])
        .send()
        .await
        .unwrap();
    assert!(run.status().is_success());
    let data_url = run.text().await.unwrap();
    let handle = data_url.rsplit('/').next().unwrap();
    assert!(!handle.is_empty());

    // The run already completed, so its silo is closed: any data access
    // against its handle now fails as not found.
    let get = client
        .get(format!("{}/data/{handle}/k", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(get.status(), reqwest::StatusCode::NOT_FOUND);
}

/// The reference client sends Python's `str(bool)` casing (`True`/`False`)
/// for the `save` query parameter, not lowercase `true`/`false`. A
/// `save=False` read with no channel attached reaches application logic
/// (and fails as not-found, since there is no prompt channel to ask
/// through) instead of being rejected at query-string parsing.
#[tokio::test]
async fn save_false_is_accepted_in_capitalized_python_bool_form() {
    let server = spawn_app().await;
    let client = reqwest::Client::new();

    let script = "echo_url.sh";
    std::fs::write(
        server.script_root.join(script),
        "#!/bin/sh\necho -n \"$DATASTORE_URL\"\n",
    )
    .unwrap();
    set_executable(&server.script_root.join(script));

    let run = client
        .post(format!("{}/run/jim", server.base_url))
        .form(&[("script", script), ("channel_key", ""), ("args", "")])
        .send()
        .await
        .unwrap();
    let data_url = run.text().await.unwrap();

    // The silo closed when the run finished, so this is a not-found rather
    // than a successful prompt — the point is that it is *not* the 400
    // "invalid boolean" query-rejection the uppercase value used to cause.
    let get = client
        .get(format!("{data_url}/age?prompt=age%3F&save=False"))
        .send()
        .await
        .unwrap();
    assert_eq!(get.status(), reqwest::StatusCode::NOT_FOUND);
    let body = get.text().await.unwrap();
    assert!(!body.contains("invalid boolean"), "got: {body}");
}

#[tokio::test]
async fn reserved_key_is_rejected_before_handle_lookup() {
    let server = spawn_app().await;
    let client = reqwest::Client::new();

    // Keys starting with `:` are rejected regardless of whether the
    // handle itself is known, so a syntactically valid but unknown handle
    // is enough to exercise the rule.
    let bogus = uuid::Uuid::new_v4();

    let put = client
        .put(format!("{}/data/{bogus}/:tokens", server.base_url))
        .body("x")
        .send()
        .await
        .unwrap();
    assert_eq!(put.status(), reqwest::StatusCode::BAD_REQUEST);

    let get = client
        .get(format!("{}/data/{bogus}/:tokens", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(get.status(), reqwest::StatusCode::BAD_REQUEST);
}

fn set_executable(path: &std::path::Path) {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = std::fs::metadata(path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(path, perms).unwrap();
}
