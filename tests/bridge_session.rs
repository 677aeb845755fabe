//! End-to-end bridge sessions over in-memory pipes
//!
//! A scripted consumer reads the text channel the way a game engine would,
//! echoing pings and decoding skeleton lines.

use std::time::Duration;

use bodylink::protocol::{Message, decode_skeleton};
use bodylink::types::{HandState, JointType, SkeletonFrame, TrackingState};
use bodylink::{Bridge, BridgeConfig, BridgeError, RecordingSource, Shutdown};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};
use tokio::task::JoinHandle;

/// Two tracked subjects; the first one is nearer. Joint 3 is only inferred.
const TWO_SUBJECTS: &str = r#"
tick_rate: 30
frames:
  - bodies: &bodies
      - tracked: true
        hand_left: 2
        hand_right: 3
        joints:
          - { joint: 0, state: 2, position: { x: 0.0, y: 0.1, z: 2.0 } }
          - { joint: 3, state: 1, position: { x: 0.0, y: 0.7, z: 2.0 } }
      - tracked: true
        hand_left: 4
        hand_right: 4
        joints:
          - { joint: 0, state: 2, position: { x: 0.0, y: 0.1, z: 3.0 } }
  - bodies: *bodies
  - bodies: *bodies
  - bodies: *bodies
  - bodies: *bodies
  - bodies: *bodies
  - bodies: *bodies
  - bodies: *bodies
  - bodies: *bodies
  - bodies: *bodies
"#;

fn config() -> BridgeConfig {
    BridgeConfig { ping_interval: Duration::from_millis(50), ..Default::default() }
}

/// Spawn a consumer that collects every line and optionally echoes pings.
/// `extra` is written to the bridge before anything is read.
fn consumer(output: DuplexStream, mut input: DuplexStream, echo_pings: bool, extra: &'static [u8]) -> JoinHandle<Vec<String>> {
    tokio::spawn(async move {
        let _ = input.write_all(extra).await;
        let mut lines = BufReader::new(output).lines();
        let mut seen = Vec::new();
        while let Ok(Some(line)) = lines.next_line().await {
            if echo_pings && line == "P|" {
                let _ = input.write_all(b"P|\n").await;
            }
            seen.push(line);
        }
        seen
    })
}

#[tokio::test(start_paused = true)]
async fn replayed_session_sends_nearest_subject() {
    let (bridge_in, consumer_out) = tokio::io::duplex(1024);
    let (bridge_out, consumer_in) = tokio::io::duplex(64 * 1024);
    let seen = consumer(consumer_in, consumer_out, true, b"");

    let source = RecordingSource::from_yaml(TWO_SUBJECTS, "two_subjects.yaml").unwrap();
    let shutdown = Bridge::new(config(), source).run(bridge_in, bridge_out).await.unwrap();

    let Shutdown::SourceEnded(summary) = shutdown else {
        panic!("expected the recording to end the session, got {shutdown:?}");
    };
    assert_eq!(summary.ticks, 10);
    assert_eq!(summary.batches_sent, 10);

    let lines = seen.await.unwrap();
    assert_eq!(&lines[..2], ["d|Starting up...", "d|Found a sensor"]);
    assert!(lines.iter().any(|l| l == "P|"));

    let mut skeleton = SkeletonFrame::new();
    let mut skeletons = 0;
    let mut hands = Vec::new();
    for line in &lines[2..] {
        match Message::parse(line).unwrap() {
            Message::Skeleton(payload) => {
                decode_skeleton(payload, skeleton.joints_mut()).unwrap();
                skeletons += 1;
            }
            Message::HandLeft(state) | Message::HandRight(state) => hands.push(state),
            Message::Ping => {}
            other => panic!("unexpected message {other:?}"),
        }
    }

    assert_eq!(skeletons, 10);
    let root = skeleton.get(JointType::SpineBase);
    assert_eq!(root.state, TrackingState::Tracked);
    assert_eq!(root.position.z, 2.0);
    // Inferred joints are not transmitted
    assert_eq!(skeleton.get(JointType::Head).state, TrackingState::NotTracked);
    assert_eq!(skeleton.tracked().count(), 1);
    assert!(hands.chunks(2).all(|pair| pair == [HandState::Open, HandState::Closed]));
}

#[tokio::test(start_paused = true)]
async fn unanswered_pings_end_the_session() {
    let (bridge_in, consumer_out) = tokio::io::duplex(1024);
    let (bridge_out, consumer_in) = tokio::io::duplex(64 * 1024);
    let seen = consumer(consumer_in, consumer_out, false, b"");

    let source = RecordingSource::from_yaml(TWO_SUBJECTS, "two_subjects.yaml").unwrap().with_looping(true);
    let result = Bridge::new(config(), source).run(bridge_in, bridge_out).await;

    assert!(matches!(result, Err(BridgeError::WatchdogTimeout { missed: 2 })));
    let lines = seen.await.unwrap();
    assert!(lines.iter().filter(|l| *l == "P|").count() >= 2);
}

#[tokio::test(start_paused = true)]
async fn unrecognized_input_is_reported_as_debug() {
    let (bridge_in, consumer_out) = tokio::io::duplex(1024);
    let (bridge_out, consumer_in) = tokio::io::duplex(64 * 1024);
    let seen = consumer(consumer_in, consumer_out, true, "\u{FEFF}P|\nhello engine\n".as_bytes());

    let source = RecordingSource::from_yaml(TWO_SUBJECTS, "two_subjects.yaml").unwrap();
    let shutdown = Bridge::new(config(), source).run(bridge_in, bridge_out).await.unwrap();
    assert!(matches!(shutdown, Shutdown::SourceEnded(_)));

    let lines = seen.await.unwrap();
    assert!(lines.iter().any(|l| l == "d|Unrecognized input: hello engine"));
    // The byte order mark is stripped, so the echo counts as a ping
    assert_eq!(lines.iter().filter(|l| l.starts_with("d|Unrecognized input:")).count(), 1);
}

#[tokio::test]
async fn recording_without_devices_reports_no_sensor() {
    let (bridge_in, _consumer_out) = tokio::io::duplex(1024);
    let (bridge_out, consumer_in) = tokio::io::duplex(1024);
    let seen = consumer(consumer_in, tokio::io::duplex(8).0, false, b"");

    let source = RecordingSource::from_yaml("devices: 0\ntick_rate: 30\n", "empty.yaml").unwrap();
    let result = Bridge::new(config(), source).run(bridge_in, bridge_out).await;

    assert!(matches!(result, Err(BridgeError::NoSensorAvailable)));
    assert_eq!(seen.await.unwrap(), ["d|Starting up...", "E|No sensor device was found."]);
}

#[tokio::test(start_paused = true)]
async fn consumer_that_stops_reading_still_trips_the_watchdog() {
    let (bridge_in, _consumer_out) = tokio::io::duplex(1024);
    // Room for a few lines only, and nobody reads them.
    let (bridge_out, _consumer_in) = tokio::io::duplex(256);

    let source = RecordingSource::from_yaml(TWO_SUBJECTS, "two_subjects.yaml").unwrap().with_looping(true);
    let session = Bridge::new(config(), source).run(bridge_in, bridge_out);
    let result = tokio::time::timeout(Duration::from_secs(10), session).await.expect("session must end");

    assert!(matches!(result, Err(BridgeError::WatchdogTimeout { missed: 2 })));
}

#[tokio::test(start_paused = true)]
async fn invalid_utf8_input_does_not_end_the_session() {
    let (bridge_in, consumer_out) = tokio::io::duplex(1024);
    let (bridge_out, consumer_in) = tokio::io::duplex(64 * 1024);
    let seen = consumer(consumer_in, consumer_out, true, b"\xff\xfegarbage\n");

    let source = RecordingSource::from_yaml(TWO_SUBJECTS, "two_subjects.yaml").unwrap();
    let shutdown = Bridge::new(config(), source).run(bridge_in, bridge_out).await.unwrap();
    assert!(matches!(shutdown, Shutdown::SourceEnded(summary) if summary.ticks == 10));

    let lines = seen.await.unwrap();
    assert!(lines.iter().any(|l| l == "d|Unrecognized input: \u{FFFD}\u{FFFD}garbage"));
}
