//! End-to-end session scenarios against a scripted server

mod support;

use serde_json::json;
use std::time::Duration;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use voxstream_core::{
    FinishReason, Modality, OutputRecord, SessionSetup, ToolDeclaration,
};
use voxstream_session::{OutputStream, Session, SessionOptions, SessionState};

async fn next_record(output: &mut OutputStream) -> OutputRecord {
    tokio::time::timeout(Duration::from_secs(5), output.next())
        .await
        .expect("timed out waiting for output record")
        .expect("output stream ended early")
}

#[tokio::test]
async fn text_turn_streams_deltas_and_folds_terminal() {
    let (listener, url) = support::bind().await;

    let server = tokio::spawn(async move {
        let mut ws = support::accept(&listener).await;
        support::ack_setup(&mut ws).await;

        let content = support::next_json(&mut ws).await;
        assert_eq!(
            content["client_content"]["turns"][0]["parts"][0]["text"],
            "Hello"
        );
        assert_eq!(content["client_content"]["turns"][0]["role"], "user");
        assert_eq!(content["client_content"]["turn_complete"], true);

        support::send_json(
            &mut ws,
            &json!({"serverContent":{"modelTurn":{"parts":[{"text":"Hi "}]}}}),
        )
        .await;
        support::send_json(
            &mut ws,
            &json!({
                "serverContent":{"modelTurn":{"parts":[{"text":"there."}]},"turnComplete":true},
                "usageMetadata":{"promptTokenCount":10,"responseTokenCount":2}
            }),
        )
        .await;
        support::drain(ws).await;
    });

    let session = Session::connect(
        support::transport_config(&url),
        SessionSetup::new("models/live-test"),
        SessionOptions::default(),
    )
    .await
    .unwrap();
    let mut output = session.output_stream();

    session.send_text("Hello", true).await.unwrap();
    assert_eq!(session.state(), SessionState::InTurn);

    match next_record(&mut output).await {
        OutputRecord::Delta(delta) => {
            assert_eq!(delta.text.as_deref(), Some("Hi "));
            assert_eq!(delta.content, "Hi ");
            assert!(delta.finish_reason.is_none());
            assert!(delta.cost.is_none());
        }
        other => panic!("expected Delta, got {other:?}"),
    }

    match next_record(&mut output).await {
        OutputRecord::Delta(delta) => {
            assert_eq!(delta.text.as_deref(), Some("there."));
            assert_eq!(delta.content, "Hi there.");
            assert_eq!(delta.finish_reason, Some(FinishReason::Complete));
            let cost = delta.cost.expect("cost folded into the final delta");
            assert_eq!(cost.input_tokens, 10);
            assert_eq!(cost.output_tokens, 2);
        }
        other => panic!("expected Delta, got {other:?}"),
    }

    assert_eq!(session.state(), SessionState::Ready);
    session.close().await;
    session.done().await;
    server.await.unwrap();
}

#[tokio::test]
async fn audio_turn_round_trip() {
    let (listener, url) = support::bind().await;

    // 1 s of 440 Hz: 16 000 samples, 32 000 bytes, ten 100 ms chunks
    let audio = voxstream_audio::int16_to_bytes(&voxstream_audio::sine_wave(
        440.0,
        Duration::from_secs(1),
        0.5,
    ));
    assert_eq!(audio.len(), 32_000);
    let expected_frames: Vec<String> = audio
        .chunks(voxstream_audio::DEFAULT_CHUNK_SIZE)
        .map(|piece| voxstream_audio::encode(piece).unwrap())
        .collect();
    let silence_frame =
        voxstream_audio::encode(&voxstream_audio::silence(Duration::from_millis(100))).unwrap();

    let server = tokio::spawn(async move {
        let mut ws = support::accept(&listener).await;
        support::ack_setup(&mut ws).await;

        for expected in &expected_frames {
            let frame = support::next_json(&mut ws).await;
            let chunks = frame["realtime_input"]["media_chunks"].as_array().unwrap();
            assert_eq!(chunks.len(), 1);
            assert_eq!(chunks[0]["mime_type"], "audio/pcm");
            assert_eq!(chunks[0]["data"], *expected);
        }

        // end_input flushes trailing silence before the turn boundary
        for _ in 0..3 {
            let frame = support::next_json(&mut ws).await;
            assert_eq!(
                frame["realtime_input"]["media_chunks"][0]["data"],
                silence_frame
            );
        }
        let boundary = support::next_json(&mut ws).await;
        assert_eq!(boundary["client_content"]["turn_complete"], true);
        assert!(boundary["client_content"].get("turns").is_none());

        support::send_json(
            &mut ws,
            &json!({
                "serverContent":{
                    "modelTurn":{"parts":[{"inlineData":{"mimeType":"audio/pcm","data":"AAAA"}}]},
                    "turnComplete":true
                }
            }),
        )
        .await;
        support::drain(ws).await;
    });

    let setup =
        SessionSetup::new("models/live-test").with_response_modalities(vec![Modality::Audio]);
    let session = Session::connect(
        support::transport_config(&url),
        setup,
        SessionOptions::default(),
    )
    .await
    .unwrap();
    let mut output = session.output_stream();

    let cancel = tokio_util::sync::CancellationToken::new();
    let chunks =
        voxstream_audio::chunk(&audio, voxstream_audio::DEFAULT_CHUNK_SIZE, &cancel).unwrap();
    assert_eq!(chunks.len(), 10);
    assert!(chunks[9].is_last);

    for chunk in chunks {
        session.send_chunk(chunk).await.unwrap();
    }
    session.end_input().await.unwrap();

    match next_record(&mut output).await {
        OutputRecord::Delta(delta) => {
            assert!(delta.text.is_none());
            assert_eq!(delta.media.len(), 1);
            assert_eq!(delta.media[0].mime_type, "audio/pcm");
            assert_eq!(delta.media[0].channels, Some(1));
            assert_eq!(delta.media[0].sample_rate, Some(16_000));
            assert_eq!(delta.finish_reason, Some(FinishReason::Complete));
        }
        other => panic!("expected Delta, got {other:?}"),
    }

    session.close().await;
    server.await.unwrap();
}

#[tokio::test]
async fn tool_call_and_response_round_trip() {
    let (listener, url) = support::bind().await;

    let server = tokio::spawn(async move {
        let mut ws = support::accept(&listener).await;
        let setup = support::ack_setup(&mut ws).await;
        assert!(setup.contains("getWeather"));

        let _question = support::next_json(&mut ws).await;
        support::send_json(
            &mut ws,
            &json!({"toolCall":{"functionCalls":[{"id":"c1","name":"getWeather","args":{"loc":"SF"}}]}}),
        )
        .await;

        // The tool response envelope, byte for byte
        let response = support::next_text(&mut ws).await;
        assert_eq!(
            response,
            r#"{"toolResponse":{"functionResponses":[{"id":"c1","response":{"temp":72}}]}}"#
        );
        support::drain(ws).await;
    });

    let setup = SessionSetup::new("models/live-test").with_tool(ToolDeclaration::new(
        "getWeather",
        "Look up the weather",
        json!({"type":"object","properties":{"loc":{"type":"string"}}}),
    ));
    let session = Session::connect(
        support::transport_config(&url),
        setup,
        SessionOptions::default(),
    )
    .await
    .unwrap();
    let mut output = session.output_stream();

    session.send_text("SF weather?", true).await.unwrap();

    match next_record(&mut output).await {
        OutputRecord::ToolCalls {
            calls,
            finish_reason,
        } => {
            assert_eq!(finish_reason, FinishReason::ToolCalls);
            assert_eq!(calls.len(), 1);
            assert_eq!(calls[0].id, "c1");
            assert_eq!(calls[0].name, "getWeather");
            assert_eq!(calls[0].args, r#"{"loc":"SF"}"#);
        }
        other => panic!("expected ToolCalls, got {other:?}"),
    }
    assert_eq!(session.state(), SessionState::AwaitingToolResponse);

    session
        .send_tool_response("c1", r#"{"temp":72}"#)
        .await
        .unwrap();
    assert_eq!(session.state(), SessionState::InTurn);

    session.close().await;
    server.await.unwrap();
}

#[tokio::test]
async fn interruption_returns_session_to_ready() {
    let (listener, url) = support::bind().await;

    let server = tokio::spawn(async move {
        let mut ws = support::accept(&listener).await;
        support::ack_setup(&mut ws).await;

        let _first = support::next_json(&mut ws).await;
        support::send_json(
            &mut ws,
            &json!({"serverContent":{"modelTurn":{"parts":[{"text":"Let me think"}]}}}),
        )
        .await;
        support::send_json(&mut ws, &json!({"serverContent":{"interrupted":true}})).await;

        // The session must still accept input afterwards
        let next = support::next_json(&mut ws).await;
        assert_eq!(
            next["client_content"]["turns"][0]["parts"][0]["text"],
            "never mind"
        );
        support::drain(ws).await;
    });

    let session = Session::connect(
        support::transport_config(&url),
        SessionSetup::new("models/live-test"),
        SessionOptions::default(),
    )
    .await
    .unwrap();
    let mut output = session.output_stream();

    session.send_text("Tell me a story", true).await.unwrap();

    match next_record(&mut output).await {
        OutputRecord::Delta(delta) => assert_eq!(delta.text.as_deref(), Some("Let me think")),
        other => panic!("expected Delta, got {other:?}"),
    }
    match next_record(&mut output).await {
        OutputRecord::Interrupted => {}
        other => panic!("expected Interrupted, got {other:?}"),
    }
    assert_eq!(session.state(), SessionState::Ready);

    session.send_text("never mind", true).await.unwrap();

    session.close().await;
    server.await.unwrap();
}

#[tokio::test]
async fn reconnect_replays_setup_bytes_verbatim() {
    let (listener, url) = support::bind().await;

    let server = tokio::spawn(async move {
        let mut first = support::accept(&listener).await;
        let setup_first = support::ack_setup(&mut first).await;
        // Abrupt drop, no close handshake
        drop(first);

        let mut second = support::accept(&listener).await;
        let setup_second = support::ack_setup(&mut second).await;

        let ping = support::next_json(&mut second).await;
        assert_eq!(
            ping["client_content"]["turns"][0]["parts"][0]["text"],
            "ping"
        );
        support::drain(second).await;
        (setup_first, setup_second)
    });

    let setup = SessionSetup::new("models/live-test").with_system_instruction("stay calm");
    let session = Session::connect(
        support::transport_config(&url),
        setup,
        SessionOptions::default().with_max_reconnect_tries(3),
    )
    .await
    .unwrap();

    let mut states = session.state_changes();
    // The drop is noticed, the session passes through Reconnecting...
    while *states.borrow_and_update() != SessionState::Reconnecting {
        states.changed().await.unwrap();
    }
    // ...and comes back up Ready.
    while *states.borrow_and_update() != SessionState::Ready {
        states.changed().await.unwrap();
    }

    session.send_text("ping", true).await.unwrap();

    session.close().await;
    let (setup_first, setup_second) = server.await.unwrap();
    assert_eq!(setup_first, setup_second);
}

#[tokio::test]
async fn policy_close_is_fatal_and_never_retried() {
    let (listener, url) = support::bind().await;

    let server = tokio::spawn(async move {
        let mut ws = support::accept(&listener).await;
        support::ack_setup(&mut ws).await;
        ws.close(Some(CloseFrame {
            code: CloseCode::Policy,
            reason: "content blocked".into(),
        }))
        .await
        .unwrap();

        // A reconnect attempt would land here within the backoff window
        match tokio::time::timeout(Duration::from_millis(600), listener.accept()).await {
            Err(_) => {}
            Ok(_) => panic!("session reconnected after a fatal policy close"),
        }
    });

    let session = Session::connect(
        support::transport_config(&url),
        SessionSetup::new("models/live-test"),
        SessionOptions::default(),
    )
    .await
    .unwrap();
    let mut output = session.output_stream();

    match next_record(&mut output).await {
        OutputRecord::Terminal {
            finish_reason,
            cost,
        } => {
            assert_eq!(finish_reason, FinishReason::Error);
            assert!(cost.is_none());
        }
        other => panic!("expected Terminal, got {other:?}"),
    }
    assert!(output.next().await.is_none());

    session.done().await;
    assert!(session.is_closed());
    let err = session.last_error().expect("error latched");
    assert!(matches!(
        err.as_ref(),
        voxstream_session::SessionError::Transport(
            voxstream_transport::TransportError::Closed {
                code: Some(1008),
                ..
            }
        )
    ));

    server.await.unwrap();
}

#[tokio::test]
async fn close_is_idempotent_and_fails_later_sends() {
    let (listener, url) = support::bind().await;

    let server = tokio::spawn(async move {
        let mut ws = support::accept(&listener).await;
        support::ack_setup(&mut ws).await;
        support::drain(ws).await;
    });

    let session = Session::connect(
        support::transport_config(&url),
        SessionSetup::new("models/live-test"),
        SessionOptions::default(),
    )
    .await
    .unwrap();
    let mut output = session.output_stream();

    session.close().await;
    session.close().await;
    assert_eq!(session.state(), SessionState::Closed);

    let err = session.send_text("too late", true).await.unwrap_err();
    assert!(matches!(
        err,
        voxstream_session::SessionError::SessionClosed
    ));

    assert!(output.next().await.is_none());
    session.done().await;
    server.await.unwrap();
}
