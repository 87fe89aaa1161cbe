use committee_core::errors::{CommitteeError, ExError, ExErrorKind};

#[test]
fn test_not_found_verifiable_by_kind() {
    let err = CommitteeError::CommitteeNotFound {
        uid: "unknown".to_string(),
    };

    let ex_err: ExError = err.into();

    assert_eq!(ex_err.kind(), ExErrorKind::NotFound);
    assert_eq!(ex_err.code(), "ERR_NOT_FOUND");
    assert_eq!(ex_err.entity_id(), Some("unknown"));
}

#[test]
fn test_stale_revision_is_conflict_with_canonical_message() {
    let err = CommitteeError::RevisionMismatch {
        entity: "committee",
        uid: "c1".to_string(),
        expected: 3,
        actual: 4,
    };

    assert!(err.is_conflict());
    assert_eq!(
        err.to_string(),
        "committee has been modified by another process"
    );

    let ex_err: ExError = err.into();
    assert_eq!(ex_err.status_class(), 409);
    assert_eq!(ex_err.entity_id(), Some("c1"));
}

#[test]
fn test_name_taken_reports_owner() {
    let err = CommitteeError::NameTaken {
        project_uid: "p1".to_string(),
        name: "TSC".to_string(),
        owner_uid: Some("c-owner".to_string()),
    };

    let ex_err: ExError = err.into();
    assert_eq!(ex_err.kind(), ExErrorKind::Conflict);
    assert_eq!(ex_err.entity_id(), Some("c-owner"));
    assert!(ex_err.message().contains("TSC"));
}

#[test]
fn test_missing_fields_is_validation() {
    let err = CommitteeError::MissingRequiredFields {
        category: "Government Advisory Council".to_string(),
        fields: vec!["country".to_string()],
    };

    assert_eq!(err.kind(), ExErrorKind::Validation);
    assert!(err.to_string().contains("missing required fields"));
    assert!(err.to_string().ends_with("country"));
}

#[test]
fn test_retries_exhausted_is_unexpected() {
    let err = CommitteeError::RetriesExhausted {
        op: "reserve_sso_group_name".to_string(),
        attempts: 100,
    };

    assert!(err.to_string().contains("exceeded maximum retries"));

    let ex_err: ExError = err.into();
    assert_eq!(ex_err.kind(), ExErrorKind::Unexpected);
    assert_eq!(ex_err.op(), Some("reserve_sso_group_name"));
}

#[test]
fn test_cancellation_maps_to_unexpected() {
    let err = CommitteeError::Cancelled {
        op: "create_committee".to_string(),
    };
    assert_eq!(err.kind(), ExErrorKind::Unexpected);
}

#[test]
fn test_error_kind_code_mapping() {
    let kinds = vec![
        (ExErrorKind::NotFound, "ERR_NOT_FOUND", 404),
        (ExErrorKind::Conflict, "ERR_CONFLICT", 409),
        (ExErrorKind::Validation, "ERR_VALIDATION", 400),
        (ExErrorKind::Unexpected, "ERR_UNEXPECTED", 500),
    ];

    for (kind, expected_code, status) in kinds {
        assert_eq!(kind.code(), expected_code);
        assert_eq!(kind.status_class(), status);
    }
}

#[test]
fn test_key_errors_carry_key() {
    let ex_err: ExError = CommitteeError::KeyExists {
        key: "lookup/committees/p1/tsc".to_string(),
    }
    .into();
    assert_eq!(ex_err.key(), Some("lookup/committees/p1/tsc"));
    assert_eq!(ex_err.kind(), ExErrorKind::Conflict);
}

#[test]
fn test_display_includes_context() {
    let ex_err = ExError::new(ExErrorKind::NotFound)
        .with_op("get_committee")
        .with_entity_id("c9")
        .with_message("committee not found: c9");
    let rendered = ex_err.to_string();
    assert!(rendered.contains("ERR_NOT_FOUND"));
    assert!(rendered.contains("get_committee"));
    assert!(rendered.contains("c9"));
}
