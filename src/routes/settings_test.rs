use super::*;

#[test]
fn version_conflict_is_409() {
    let err = settings_error_to_api(SettingsError::VersionConflict { expected: 3, actual: 4 });
    assert_eq!(err.status, StatusCode::CONFLICT);
    assert_eq!(err.code, "E_VERSION_CONFLICT");
    assert!(err.message.contains("expected version 3"));
}

#[test]
fn last_banner_line_is_400() {
    let err = settings_error_to_api(SettingsError::LastBannerLine);
    assert_eq!(err.status, StatusCode::BAD_REQUEST);
    assert_eq!(err.code, "E_LAST_BANNER_LINE");
}

#[test]
fn missing_banner_line_is_404() {
    assert_eq!(settings_error_to_api(SettingsError::BannerLineNotFound(9)).status, StatusCode::NOT_FOUND);
}

#[test]
fn update_body_version_is_optional() {
    let body: UpdateSettingsBody =
        serde_json::from_value(serde_json::json!({ "patch": { "maintenance_mode": true } })).unwrap();
    assert!(body.expected_version.is_none());
    assert_eq!(body.patch["maintenance_mode"], true);
}
