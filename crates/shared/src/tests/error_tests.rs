use super::*;

fn validation_entry(field: &str, messages: &[&str]) -> ErrorEntry {
    ErrorEntry {
        status_code: 400,
        error: Some("Bad Request".to_string()),
        field: Some(field.to_string()),
        message: ErrorMessage::Validation(
            messages
                .iter()
                .map(|m| ValidationEntry {
                    message: m.to_string(),
                    code: "invalid".to_string(),
                })
                .collect(),
        ),
    }
}

#[test]
fn maps_status_codes_to_error_codes() {
    assert_eq!(ErrorCode::from_status(401), ErrorCode::Unauthorized);
    assert_eq!(ErrorCode::from_status(403), ErrorCode::Forbidden);
    assert_eq!(ErrorCode::from_status(404), ErrorCode::NotFound);
    assert_eq!(ErrorCode::from_status(400), ErrorCode::Validation);
    assert_eq!(ErrorCode::from_status(429), ErrorCode::RateLimited);
    assert_eq!(ErrorCode::from_status(502), ErrorCode::Internal);
}

#[test]
fn unauthorized_wins_over_other_entries() {
    let entries = vec![
        validation_entry("content", &["must not be empty"]),
        ErrorEntry::new(401, "token expired"),
    ];
    assert_eq!(
        RpcError::from_entries(&entries),
        RpcError::Unauthorized("token expired".to_string())
    );
}

#[test]
fn collects_validation_messages_per_field() {
    let entries = vec![
        validation_entry("username", &["too short", "must be alphanumeric"]),
        validation_entry("password", &["too weak"]),
    ];
    let err = RpcError::from_entries(&entries);
    let RpcError::Validation(fields) = &err else {
        panic!("expected validation error, got {err:?}");
    };
    assert_eq!(fields.len(), 2);
    assert_eq!(fields[0].field.as_deref(), Some("username"));
    assert_eq!(fields[0].messages, vec!["too short", "must be alphanumeric"]);
    assert_eq!(
        err.to_string(),
        "validation failed: username: too short, must be alphanumeric; password: too weak"
    );
}

#[test]
fn other_statuses_keep_first_entry_message() {
    let mut entry = ErrorEntry::new(500, "database unavailable");
    entry.error = Some("Internal Server Error".to_string());
    let err = RpcError::from_entries(&[entry]);
    assert_eq!(
        err,
        RpcError::Failed {
            code: ErrorCode::Internal,
            message: "Internal Server Error: database unavailable".to_string(),
        }
    );
}

#[test]
fn error_message_decodes_plain_and_structured_forms() {
    let plain: ErrorEntry =
        serde_json::from_str(r#"{"statusCode":404,"message":"Conversation not found"}"#)
            .expect("plain");
    assert_eq!(
        plain.message,
        ErrorMessage::Plain("Conversation not found".to_string())
    );

    let structured: ErrorEntry = serde_json::from_str(
        r#"{"statusCode":400,"field":"content","message":[{"message":"too long","code":"max_length"}]}"#,
    )
    .expect("structured");
    assert_eq!(structured.field.as_deref(), Some("content"));
    assert_eq!(structured.message.summary(), "too long");
}
