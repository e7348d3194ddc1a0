//! End-to-end tests of the request boundary against a mock device.

use mcu_bridge::link::{Channel, Exchanger, MockSerialPort, SerialConfig};
use mcu_bridge::{Bridge, BridgeError, Response, SensorResponse};
use serde_json::json;
use std::time::Duration;

fn mock_config() -> SerialConfig {
    SerialConfig {
        port: "mock".into(),
        read_timeout_ms: 50,
        ..SerialConfig::default()
    }
}

fn bridge(mock: &MockSerialPort) -> Bridge<MockSerialPort> {
    let channel = Channel::with_link(mock.clone(), &mock_config());
    Bridge::new(Exchanger::new(channel, Duration::ZERO))
}

fn unavailable_bridge() -> Bridge<MockSerialPort> {
    Bridge::new(Exchanger::new(
        Channel::unavailable(&mock_config()),
        Duration::ZERO,
    ))
}

#[tokio::test]
async fn test_lcd_message_is_quoted() {
    let mock = MockSerialPort::new();
    mock.script_reply(r#"lcd "Hi there""#, &["LCD updated"]);
    let bridge = bridge(&mock);

    let response = bridge.control(Some("lcd"), Some("Hi there")).await.unwrap();
    assert_eq!(response.command, r#"lcd "Hi there""#);
    assert_eq!(mock.get_tx_data(), b"lcd \"Hi there\"\n".to_vec());
    assert_eq!(
        serde_json::to_value(&response).unwrap(),
        json!({
            "status": "success",
            "command": "lcd \"Hi there\"",
            "response": ["LCD updated"],
        })
    );
}

#[tokio::test]
async fn test_control_missing_command() {
    let mock = MockSerialPort::new();
    let bridge = bridge(&mock);

    let result = bridge.control(None, None).await;
    assert!(matches!(result, Err(BridgeError::MissingCommand)));
    assert!(mock.get_tx_data().is_empty());

    let response = bridge.handle(Some(""), None).await;
    assert!(response.is_error());
    assert_eq!(
        serde_json::to_value(&response).unwrap(),
        json!({"status": "error", "message": "No command provided."})
    );
}

#[tokio::test]
async fn test_control_on_unavailable_port() {
    let bridge = unavailable_bridge();
    let response = bridge.control(Some("led on"), None).await.unwrap();
    assert_eq!(response.response.lines(), ["Serial port is not available.".to_string()]);
}

#[tokio::test]
async fn test_sensors_parses_reply() {
    let mock = MockSerialPort::new();
    mock.script_reply(
        "sensors",
        &[
            "Reading all sensors",
            "Result: Temperature: 24.00C",
            "Result: Humidity: 55%",
            "Result: Fire Detected!",
            "Result: Nothing to report",
        ],
    );
    let bridge = bridge(&mock);

    let response = bridge.sensors().await;
    assert_eq!(
        serde_json::to_value(&response).unwrap(),
        json!({
            "temperature": "24.00C",
            "humidity": "55%",
            "fire_safety": "Fire Detected!",
        })
    );
}

#[tokio::test]
async fn test_sensors_ignores_stale_input() {
    let mock = MockSerialPort::new();
    mock.queue_lines(&["Result: Temperature: 99C"]);
    mock.script_reply("sensors", &["Result: Temperature: 21C"]);
    let bridge = bridge(&mock);

    match bridge.sensors().await {
        SensorResponse::Reading(reading) => assert_eq!(reading.get("temperature"), Some("21C")),
        other => panic!("expected a reading, got {other:?}"),
    }
}

#[tokio::test]
async fn test_sensors_silent_device_gives_empty_reading() {
    let mock = MockSerialPort::new();
    let bridge = bridge(&mock);

    match bridge.sensors().await {
        SensorResponse::Reading(reading) => assert!(reading.is_empty()),
        other => panic!("expected a reading, got {other:?}"),
    }
}

#[tokio::test]
async fn test_sensors_unavailable_port() {
    let bridge = unavailable_bridge();
    assert_eq!(bridge.sensors().await, SensorResponse::unavailable());
}

#[tokio::test]
async fn test_handle_routes_sensors_to_parser() {
    let mock = MockSerialPort::new();
    mock.script_reply("sensors", &["Result: Light: 300"]);
    let bridge = bridge(&mock);

    let response = bridge.handle(Some(" sensors "), None).await;
    assert!(matches!(response, Response::Sensors(SensorResponse::Reading(_))));
    assert_eq!(serde_json::to_value(&response).unwrap(), json!({"light": "300"}));
}

#[tokio::test]
async fn test_handle_line_lcd_and_plain() {
    let mock = MockSerialPort::new();
    let bridge = bridge(&mock);

    bridge.handle_line("lcd Hello world").await;
    bridge.handle_line("lcd").await;
    bridge.handle_line("servo 45").await;

    assert_eq!(
        mock.sent_lines(),
        vec![
            r#"lcd "Hello world""#.to_string(),
            r#"lcd """#.to_string(),
            "servo 45".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_open_missing_port_is_unavailable() {
    let config = SerialConfig {
        port: "/dev/does-not-exist-mcu-bridge".into(),
        open_settle_ms: 0,
        ..SerialConfig::default()
    };
    let bridge = Bridge::open(&config).await;
    assert!(!bridge.exchanger().is_available().await);
    assert_eq!(bridge.sensors().await, SensorResponse::unavailable());
}
