//! Tests for the output stream pumps and channel integration.

use tokio::io::AsyncWriteExt;

use testwatch::runner::{into_channel, ClassifiedEvent, OutputDemultiplexer, DEFAULT_CHANNEL_BUFFER};

#[test]
fn default_channel_buffer_size() {
    assert_eq!(DEFAULT_CHANNEL_BUFFER, 64);
}

#[tokio::test]
async fn into_channel_receives_classified_events() {
    let (reader, mut writer) = tokio::io::duplex(1024);

    tokio::spawn(async move {
        writer.write_all(b"{\"succ").await.unwrap();
        writer
            .write_all(b"ess\":true,\"testResults\":[]}")
            .await
            .unwrap();
        // Close the writer to signal EOF
        drop(writer);
    });

    let mut rx = into_channel(reader, OutputDemultiplexer::new(), 16);

    let event = rx.recv().await.expect("one event");
    let results = event.results().expect("json result");
    assert!(results.success);

    // Stream ended, channel closes
    assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn payload_with_char_split_across_reads_reconstructs_exactly() {
    let payload = r#"{"success":false,"testResults":[{"name":"a.test.js","status":"failed","message":"xx✕tail"}]}"#;
    let bytes = payload.as_bytes();
    // Split inside the three-byte '✕' so each read ends mid-character
    let split = payload.find('✕').unwrap() + 1;

    let reader = tokio_test::io::Builder::new()
        .read(&bytes[..split])
        .read(&bytes[split..])
        .build();

    let mut rx = into_channel(reader, OutputDemultiplexer::new(), 16);

    let event = rx.recv().await.expect("one event");
    let results = event.results().expect("json result");
    assert_eq!(results.test_results[0].message, "xx✕tail");
    assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn log_text_with_char_split_across_reads_stays_intact() {
    let text = "PASS ✕ src/sum.test.js\n";
    let bytes = text.as_bytes();
    let split = text.find('✕').unwrap() + 1;

    let reader = tokio_test::io::Builder::new()
        .read(&bytes[..split])
        .read(&bytes[split..])
        .build();

    let mut rx = into_channel(reader, OutputDemultiplexer::new(), 16);

    let mut combined = String::new();
    while let Some(event) = rx.recv().await {
        match event {
            ClassifiedEvent::LogLine(line) => combined.push_str(&line),
            other => panic!("Expected LogLine, got {other:?}"),
        }
    }

    assert_eq!(combined, text);
    assert!(!combined.contains('\u{FFFD}'));
}

#[tokio::test]
async fn dangling_bytes_are_flushed_lossily_at_eof() {
    // Stream ends two bytes into a three-byte character
    let reader = tokio_test::io::Builder::new()
        .read(b"tail\xe2\x9c")
        .build();

    let mut rx = into_channel(reader, OutputDemultiplexer::new(), 16);

    assert_eq!(
        rx.recv().await,
        Some(ClassifiedEvent::LogLine("tail".to_string()))
    );
    match rx.recv().await {
        Some(ClassifiedEvent::LogLine(line)) => assert!(line.contains('\u{FFFD}')),
        other => panic!("Expected lossy LogLine, got {other:?}"),
    }
    assert!(rx.recv().await.is_none());
}
