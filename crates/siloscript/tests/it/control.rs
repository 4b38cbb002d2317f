use std::time::Duration;

use serde::Deserialize;

use crate::support::spawn_app;

#[tokio::test]
async fn channel_open_returns_a_fresh_id() {
    let server = spawn_app().await;
    let client = reqwest::Client::new();

    let a = client
        .get(format!("{}/channel/open", server.base_url))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    let b = client
        .get(format!("{}/channel/open", server.base_url))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    assert_ne!(a, b);
}

#[derive(Deserialize)]
struct QuestionPayload {
    id: String,
    prompt: String,
}

/// End-to-end over real HTTP: a script asks for a missing key, the event
/// stream carries the question to an "operator" who answers through the
/// Public façade, and the run's stdout reflects the answer.
#[tokio::test]
async fn run_prompts_through_the_event_stream_and_completes() {
    let server = spawn_app().await;
    let client = reqwest::Client::new();

    let script = "ask_age.sh";
    std::fs::write(
        server.script_root.join(script),
        "#!/bin/sh\n/usr/bin/curl -s \"$DATASTORE_URL/age?prompt=age%3F&save=true\"\n",
    )
    .unwrap();
    set_executable(&server.script_root.join(script));

    let channel = client
        .get(format!("{}/channel/open", server.base_url))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    let events_url = format!("{}/channel/{channel}/events", server.base_url);
    let mut events = client.get(&events_url).send().await.unwrap();

    // First event on connect is always `channel_key`.
    let first = read_sse_event(&mut events).await;
    assert!(first.contains("channel_key"));

    let base_url = server.base_url.clone();
    let run_channel = channel.clone();
    let run_task = tokio::spawn(async move {
        reqwest::Client::new()
            .post(format!("{base_url}/run/jim"))
            .form(&[("script", "ask_age.sh"), ("channel_key", &run_channel), ("args", "")])
            .send()
            .await
            .unwrap()
    });

    let question_event = read_sse_event(&mut events).await;
    assert!(question_event.contains("event: question"));
    let json_line = question_event
        .lines()
        .find(|l| l.starts_with("data:"))
        .unwrap()
        .trim_start_matches("data:")
        .trim();
    let question: QuestionPayload = serde_json::from_str(json_line).unwrap();
    assert_eq!(question.prompt, "age?");

    let answer = client
        .post(format!("{}/answer/{}", server.base_url, question.id))
        .body("42")
        .send()
        .await
        .unwrap();
    assert!(answer.status().is_success());

    let run_response = run_task.await.unwrap();
    assert!(run_response.status().is_success());
    assert_eq!(run_response.text().await.unwrap(), "42");
}

async fn read_sse_event(response: &mut reqwest::Response) -> String {
    tokio::time::timeout(Duration::from_secs(5), async {
        let chunk = response.chunk().await.unwrap().expect("stream not closed");
        String::from_utf8(chunk.to_vec()).unwrap()
    })
    .await
    .expect("event arrived within the timeout")
}

fn set_executable(path: &std::path::Path) {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = std::fs::metadata(path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(path, perms).unwrap();
}
