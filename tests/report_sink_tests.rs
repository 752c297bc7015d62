use matrix_ci::{
    HttpReportingSink, HttpStatusSignal, ReportingSink, RunId, SinkError, SinkSettings,
    StatusSignal, Verdict,
};

fn settings(url: &str) -> SinkSettings {
    SinkSettings {
        url: url.to_string(),
    }
}

#[tokio::test]
async fn test_comment_is_put_keyed_by_run_id() {
    let mut server = mockito::Server::new_async().await;
    let run_id = RunId::new();
    let mock = server
        .mock("PUT", format!("/runs/{}/comment", run_id).as_str())
        .match_header("content-type", "application/json")
        .with_status(200)
        .create_async()
        .await;

    let sink = HttpReportingSink::new(&settings(&server.url()));
    sink.publish(run_id, "## Test pipeline: success").await.unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn test_reposting_same_run_hits_same_resource() {
    let mut server = mockito::Server::new_async().await;
    let run_id = RunId::new();
    let mock = server
        .mock("PUT", format!("/runs/{}/comment", run_id).as_str())
        .with_status(200)
        .expect(2)
        .create_async()
        .await;

    let sink = HttpReportingSink::new(&settings(&server.url()));
    sink.publish(run_id, "first draft").await.unwrap();
    sink.publish(run_id, "updated").await.unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn test_server_error_maps_to_sink_error() {
    let mut server = mockito::Server::new_async().await;
    let run_id = RunId::new();
    server
        .mock("PUT", format!("/runs/{}/comment", run_id).as_str())
        .with_status(503)
        .with_body("unavailable")
        .create_async()
        .await;

    let sink = HttpReportingSink::new(&settings(&server.url()));
    let err = sink.publish(run_id, "body").await.unwrap_err();

    match err {
        SinkError::Http { status, message } => {
            assert_eq!(status, 503);
            assert_eq!(message, "unavailable");
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_status_signal_carries_verdict() {
    let mut server = mockito::Server::new_async().await;
    let run_id = RunId::new();
    let mock = server
        .mock("PUT", format!("/runs/{}/status", run_id).as_str())
        .match_body(mockito::Matcher::PartialJsonString(
            r#"{"success": false, "verdict": "failure"}"#.to_string(),
        ))
        .with_status(200)
        .create_async()
        .await;

    let signal = HttpStatusSignal::new(&settings(&server.url()));
    signal.publish(run_id, Verdict::Failure).await.unwrap();

    mock.assert_async().await;
}
