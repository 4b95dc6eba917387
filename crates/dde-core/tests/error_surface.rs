use dde_core::errors::{DdeError, ErrorInfo};

fn sample_info(code: &str, message: &str) -> ErrorInfo {
    ErrorInfo::new(code, message)
        .with_context("run", "RUN_C0_1")
        .with_context("table", "world_evaluation")
}

#[test]
fn malformed_table_surface() {
    let err = DdeError::MalformedTable(sample_info("table_row_width", "row has 3 fields"));
    assert_eq!(err.info().code, "table_row_width");
    assert!(err.info().context.contains_key("run"));
    assert!(err.to_string().starts_with("malformed table:"));
}

#[test]
fn checkpoint_surface() {
    let err = DdeError::Checkpoint(sample_info("checkpoint_missing", "no rows"));
    assert_eq!(err.info().code, "checkpoint_missing");
    assert!(err.to_string().contains("table=world_evaluation"));
}

#[test]
fn schema_mismatch_surface_carries_hint() {
    let err = DdeError::SchemaMismatch(
        ErrorInfo::new("schema_mismatch", "columns differ").with_hint("check TRACK_SYSTEMATICS"),
    );
    assert!(err.to_string().contains("hint: check TRACK_SYSTEMATICS"));
}

#[test]
fn errors_serialize_with_family_tag() {
    let err = DdeError::Field(sample_info("field_json", "bad list"));
    let value = serde_json::to_value(&err).expect("serialize");
    assert_eq!(value["family"], "Field");
    assert_eq!(value["detail"]["code"], "field_json");
    let back: DdeError = serde_json::from_value(value).expect("deserialize");
    assert_eq!(back, err);
}
