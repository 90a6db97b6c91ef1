use pimbridge::protocol::{decode_chat, decode_query, encode, PromptRequest};
use pimbridge::settings::{Mode, Settings};

#[test]
fn query_envelope_without_selection_args() {
    let envelope = decode_query(
        r#"{"service":"calendar","parameters":{"fields":["title"],"filter":"title LIKE ?","sort":"start_date","limit":3}}"#,
    )
    .expect("decodes");
    assert_eq!(envelope.service, "calendar");
    assert!(envelope.parameters.selection_args.is_empty());
    assert_eq!(envelope.parameters.limit, 3);
    assert!(envelope.data.is_none());
}

#[test]
fn query_envelope_with_selection_args() {
    let envelope = decode_query(
        r#"{"service":"contacts","parameters":{"fields":["display_name","phone_number"],"filter":"display_name LIKE ?","selectionArgs":["%ann%"],"sort":"","limit":1}}"#,
    )
    .expect("decodes");
    assert_eq!(envelope.parameters.selection_args, vec!["%ann%".to_string()]);
}

#[test]
fn query_envelope_with_null_selection_args() {
    let envelope = decode_query(
        r#"{"service":"calendar","parameters":{"fields":["title"],"filter":"title LIKE ?","selectionArgs":null,"sort":"","limit":3}}"#,
    )
    .expect("null is treated as absent");
    assert!(envelope.parameters.selection_args.is_empty());
    assert_eq!(envelope.parameters.limit, 3);
}

#[test]
fn query_envelope_missing_limit_is_rejected() {
    assert!(decode_query(r#"{"service":"calendar","parameters":{"fields":[]}}"#).is_err());
}

#[test]
fn prompt_request_wire_shape() {
    let json = encode(&PromptRequest::new("date of next sunday")).unwrap();
    assert_eq!(json, r#"{"type":"prompt","user_prompt":"date of next sunday"}"#);
}

#[test]
fn chat_frame_defaults() {
    let frame = decode_chat(r#"{"message":"hello"}"#).expect("decodes");
    assert_eq!(frame.message, "hello");
    assert!(!frame.is_sent_by_user);
    assert!(frame.timestamp > 0);
    assert!(decode_chat("hello").is_err());
}

#[test]
fn settings_defaults_and_overrides() {
    let defaults = Settings::from_toml("").expect("defaults");
    assert_eq!(defaults, Settings::default());

    let custom = Settings::from_toml(
        r#"
        server_url = "ws://10.0.2.2:8000/ws"
        store_path = "pim.db"
        mode = "chat"
        "#,
    )
    .expect("custom");
    assert_eq!(custom.server_url, "ws://10.0.2.2:8000/ws");
    assert_eq!(custom.store_path.as_deref(), Some("pim.db"));
    assert_eq!(custom.mode, Mode::Chat);
    assert_eq!(custom.prompt, "date of next sunday");
}
