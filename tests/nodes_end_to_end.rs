//! Host-facing nodes driven against a mock upstream.

mod common;

use common::{MockServerFixture, GENERATIONS_PATH, PNG};
use mockito::Matcher;
use nano_banana_nodes::batch::{InMemoryProgressSink, StopSignal};
use nano_banana_nodes::config::NetworkRoute;
use nano_banana_nodes::nodes::{
    ApiConfigInput, ApiConfigNode, BatchProcessorNode, TextToImageNode,
};
use nano_banana_nodes::presets::GenerationCatalog;
use nano_banana_nodes::resilience::PacingConfig;
use nano_banana_nodes::{Error, FailureKind};
use std::sync::Arc;
use std::time::Duration;

fn fast_batch_node() -> BatchProcessorNode {
    BatchProcessorNode::new(
        GenerationCatalog::standard(),
        PacingConfig::new().with_base_interval(Duration::from_millis(500)),
    )
}

#[tokio::test]
async fn test_api_config_feeds_text_to_image() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture
        .server
        .mock("POST", GENERATIONS_PATH)
        .match_header("authorization", "Bearer sk-node")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "prompt": "a paper boat",
            "seed": 42,
        })))
        .with_status(200)
        .with_body(serde_json::json!({ "data": [{ "b64_json": common::png_b64() }] }).to_string())
        .expect(1)
        .create_async()
        .await;

    let config = ApiConfigNode::new(fixture.config())
        .build(&ApiConfigInput {
            api_key: "sk-node".into(),
            proxy: String::new(),
            network: "Direct".into(),
        })
        .unwrap();
    assert_eq!(config.network, NetworkRoute::Direct);

    let node = TextToImageNode::default();
    let mut input = node.default_input("a paper boat");
    input.seed = 42;
    let image = node.run(&config, &input).await.unwrap();
    assert_eq!(image.data.as_ref(), PNG);
    assert_eq!(image.extension(), "png");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_batch_processor_writes_one_file_per_job() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture
        .server
        .mock("POST", GENERATIONS_PATH)
        .with_status(200)
        .with_body(serde_json::json!({ "data": [{ "b64_json": common::png_b64() }] }).to_string())
        .expect(4)
        .create_async()
        .await;

    let input_dir = tempfile::tempdir().unwrap();
    for name in ["one.png", "two.jpg", "notes.txt"] {
        std::fs::write(input_dir.path().join(name), PNG).unwrap();
    }
    let out_dir = tempfile::tempdir().unwrap();

    let node = fast_batch_node();
    let mut input = node.default_input("first\nsecond", input_dir.path());
    input.output_folder = Some(out_dir.path().to_path_buf());
    let sink = Arc::new(InMemoryProgressSink::new());

    let output = node
        .run(&fixture.config(), &input, sink.clone(), StopSignal::new())
        .await
        .unwrap();

    assert_eq!(output.images.len(), 4);
    assert!(output.report.all_succeeded());
    assert_eq!(sink.len(), 4);
    let mut names: Vec<String> = output
        .saved
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(
        names,
        ["prompt1_one.png", "prompt1_two.png", "prompt2_one.png", "prompt2_two.png"]
    );
    mock.assert_async().await;
}

#[tokio::test]
async fn test_batch_processor_errors_when_every_job_fails() {
    let mut fixture = MockServerFixture::new().await;
    let _mock = fixture
        .server
        .mock("POST", GENERATIONS_PATH)
        .with_status(401)
        .with_body(r#"{"error":{"message":"invalid token"}}"#)
        .create_async()
        .await;

    let input_dir = tempfile::tempdir().unwrap();
    std::fs::write(input_dir.path().join("only.png"), PNG).unwrap();

    let node = fast_batch_node();
    let input = node.default_input("p", input_dir.path());
    let err = node
        .run(
            &fixture.config(),
            &input,
            Arc::new(InMemoryProgressSink::new()),
            StopSignal::new(),
        )
        .await
        .unwrap_err();

    match err {
        Error::Generation(failure) => {
            assert_eq!(failure.kind, FailureKind::Authentication);
            assert!(failure.message.contains("all 1 jobs failed"));
            assert_eq!(failure.status, Some(401));
        }
        other => panic!("expected generation error, got {other:?}"),
    }
}
