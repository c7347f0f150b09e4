use super::*;

#[derive(Debug, thiserror::Error)]
#[error("widget {0} is broken")]
struct WidgetError(u32);

impl ErrorCode for WidgetError {
    fn error_code(&self) -> &'static str {
        "E_WIDGET"
    }
}

#[test]
fn from_service_keeps_client_error_message() {
    let err = ApiError::from_service(StatusCode::CONFLICT, &WidgetError(7));
    assert_eq!(err.status, StatusCode::CONFLICT);
    assert_eq!(err.code, "E_WIDGET");
    assert_eq!(err.message, "widget 7 is broken");
}

#[test]
fn from_service_hides_server_error_message() {
    let err = ApiError::from_service(StatusCode::INTERNAL_SERVER_ERROR, &WidgetError(7));
    assert_eq!(err.code, "E_WIDGET");
    assert_eq!(err.message, "internal error");
}

#[test]
fn sqlx_error_maps_to_internal() {
    let err: ApiError = sqlx::Error::RowNotFound.into();
    assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(err.code, "E_DATABASE");
}

#[test]
fn helper_constructors_use_expected_statuses() {
    assert_eq!(ApiError::bad_request("x").status, StatusCode::BAD_REQUEST);
    assert_eq!(ApiError::unauthorized().status, StatusCode::UNAUTHORIZED);
    assert_eq!(ApiError::forbidden().status, StatusCode::FORBIDDEN);
    assert_eq!(ApiError::not_found("x").code, "E_NOT_FOUND");
}

#[test]
fn into_response_carries_status() {
    let resp = ApiError::new(StatusCode::TOO_MANY_REQUESTS, "E_RATE_LIMITED", "slow down").into_response();
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
}
