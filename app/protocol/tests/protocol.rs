//! Protocol type serialization tests.

use drover_protocol::{DEFAULT_TASK_DURATION, DEFAULT_WORK, Message, Task};
use serde_json::json;
use std::time::Duration;

#[test]
fn register_wire_shape() {
    let msg = Message::Register {
        id: Some("worker-7".into()),
        load: 42.5,
    };
    let value = serde_json::to_value(&msg).unwrap();
    assert_eq!(value, json!({"type": "register", "id": "worker-7", "load": 42.5}));
}

#[test]
fn task_wire_shape() {
    let msg = Message::from(Task {
        task_id: 3,
        work: "compute_pi".into(),
        duration: 3.0,
    });
    let value = serde_json::to_value(&msg).unwrap();
    assert_eq!(
        value,
        json!({"type": "task", "taskId": 3, "work": "compute_pi", "duration": 3.0})
    );
}

#[test]
fn done_wire_shape() {
    let msg = Message::Done {
        id: "worker-7".into(),
        task_id: 9,
    };
    let value = serde_json::to_value(&msg).unwrap();
    assert_eq!(value, json!({"type": "done", "id": "worker-7", "taskId": 9}));
}

#[test]
fn load_without_id_or_load() {
    let msg: Message = serde_json::from_str(r#"{"type":"load"}"#).unwrap();
    assert_eq!(msg, Message::Load { id: None, load: 0.0 });
    assert_eq!(msg.kind(), "load");
}

#[test]
fn anonymous_register_omits_id() {
    let msg = Message::Register { id: None, load: 1.0 };
    let json = serde_json::to_string(&msg).unwrap();
    assert!(!json.contains("\"id\""));
}

#[test]
fn task_defaults() {
    let msg: Message = serde_json::from_str(r#"{"type":"task","taskId":1}"#).unwrap();
    let task = match msg {
        Message::Task(task) => task,
        other => panic!("expected task, got {other:?}"),
    };
    assert_eq!(task.work, DEFAULT_WORK);
    assert_eq!(task.duration, DEFAULT_TASK_DURATION);
    assert_eq!(task.duration(), Duration::from_secs(3));
}

#[test]
fn task_negative_duration_is_zero() {
    let task = Task {
        task_id: 0,
        work: "compute_pi".into(),
        duration: -1.0,
    };
    assert_eq!(task.duration(), Duration::ZERO);
}

#[test]
fn unknown_type_rejected() {
    let result = serde_json::from_str::<Message>(r#"{"type":"shutdown"}"#);
    assert!(result.is_err());
}
