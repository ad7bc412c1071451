//! Conversions from external infrastructure errors into domain errors.

use my500_common::error::CommonError;
use my500_domain::My500Error;
use reqwest::Error as HttpError;
use rusqlite::Error as SqlError;

/// Error newtype that keeps conversions on the infrastructure side and can
/// be converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub My500Error);

impl From<InfraError> for My500Error {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<My500Error> for InfraError {
    fn from(value: My500Error) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and
/// within this module.
trait IntoMy500Error {
    fn into_my500(self) -> My500Error;
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → My500Error */
/* -------------------------------------------------------------------------- */

impl IntoMy500Error for SqlError {
    fn into_my500(self) -> My500Error {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match (err.code, err.extended_code) {
                    (ErrorCode::DatabaseBusy, _) => {
                        My500Error::Database("database is busy".into())
                    }
                    (ErrorCode::DatabaseLocked, _) => {
                        My500Error::Database("database is locked".into())
                    }
                    (ErrorCode::ConstraintViolation, 2067) => {
                        My500Error::Database("unique constraint violation".into())
                    }
                    (ErrorCode::ConstraintViolation, 787) => {
                        My500Error::Database("foreign key constraint violation".into())
                    }
                    _ => My500Error::Database(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::QueryReturnedNoRows => My500Error::NotFound("no rows returned by query".into()),
            RE::FromSqlConversionFailure(_, _, cause) => {
                My500Error::Database(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, _, ty) => {
                My500Error::Database(format!("invalid column type: {ty}"))
            }
            RE::Utf8Error(_) => My500Error::Database("invalid UTF-8 returned from sqlite".into()),
            RE::InvalidParameterName(parameter_name) => {
                My500Error::Database(format!("invalid parameter name: {parameter_name}"))
            }
            RE::InvalidPath(path) => {
                My500Error::Database(format!("invalid database path: {}", path.to_string_lossy()))
            }
            RE::InvalidQuery => My500Error::Database("invalid SQL query".into()),
            other => My500Error::Database(other.to_string()),
        }
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        InfraError(value.into_my500())
    }
}

/* -------------------------------------------------------------------------- */
/* r2d2::Error → My500Error */
/* -------------------------------------------------------------------------- */

impl From<r2d2::Error> for InfraError {
    fn from(value: r2d2::Error) -> Self {
        InfraError(My500Error::Database(format!("connection pool error: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* CommonError → My500Error */
/* -------------------------------------------------------------------------- */

impl IntoMy500Error for CommonError {
    fn into_my500(self) -> My500Error {
        match self {
            CommonError::Crypto(msg) => My500Error::Crypto(msg),
            CommonError::Format(msg) => My500Error::Credential(msg),
            CommonError::InvalidInput(msg) => My500Error::Validation(msg),
            CommonError::Internal(msg) => My500Error::Internal(msg),
        }
    }
}

impl From<CommonError> for InfraError {
    fn from(value: CommonError) -> Self {
        InfraError(value.into_my500())
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → My500Error */
/* -------------------------------------------------------------------------- */

impl IntoMy500Error for HttpError {
    fn into_my500(self) -> My500Error {
        if self.is_timeout() {
            return My500Error::Transport("HTTP request timed out".into());
        }

        if self.is_connect() {
            return My500Error::Transport("HTTP connection failure".into());
        }

        if let Some(status) = self.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));

            return match code {
                401 | 403 => My500Error::Credential(message),
                404 => My500Error::NotFound(message),
                409 => My500Error::Conflict(message),
                429 => My500Error::RateLimit(message),
                400..=499 => My500Error::Validation(message),
                _ => My500Error::Transport(message),
            };
        }

        My500Error::Transport(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_my500())
    }
}

#[cfg(test)]
mod tests {
    use reqwest::{Client, StatusCode};
    use rusqlite::ffi::{Error as FfiError, ErrorCode};
    use rusqlite::Error as SqlError;
    use tokio::runtime::Runtime;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[test]
    fn sqlite_busy_maps_to_database_error() {
        let err = SqlError::SqliteFailure(
            FfiError { code: ErrorCode::DatabaseBusy, extended_code: 5 },
            Some("database is locked".into()),
        );

        let mapped: My500Error = InfraError::from(err).into();
        match mapped {
            My500Error::Database(msg) => {
                assert!(msg.contains("busy") || msg.contains("locked"));
            }
            other => panic!("expected database error, got {:?}", other),
        }
    }

    #[test]
    fn sqlite_no_rows_maps_to_not_found() {
        let mapped: My500Error = InfraError::from(SqlError::QueryReturnedNoRows).into();
        assert!(matches!(mapped, My500Error::NotFound(_)));
    }

    #[test]
    fn common_format_error_maps_to_credential() {
        let err = CommonError::Format("not an envelope".into());
        let mapped: My500Error = InfraError::from(err).into();
        assert!(matches!(mapped, My500Error::Credential(_)));
    }

    #[test]
    fn http_status_401_maps_to_credential_error() {
        Runtime::new().unwrap().block_on(async {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(StatusCode::UNAUTHORIZED))
                .mount(&server)
                .await;

            let client = Client::builder().no_proxy().build().unwrap();
            let error =
                client.get(server.uri()).send().await.unwrap().error_for_status().unwrap_err();

            let mapped: My500Error = InfraError::from(error).into();
            match mapped {
                My500Error::Credential(msg) => assert!(msg.contains("401")),
                other => panic!("expected credential error, got {:?}", other),
            }
        });
    }

    #[test]
    fn http_status_429_maps_to_rate_limit() {
        Runtime::new().unwrap().block_on(async {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(StatusCode::TOO_MANY_REQUESTS))
                .mount(&server)
                .await;

            let client = Client::builder().no_proxy().build().unwrap();
            let error =
                client.get(server.uri()).send().await.unwrap().error_for_status().unwrap_err();

            let mapped: My500Error = InfraError::from(error).into();
            assert!(mapped.is_retryable());
        });
    }
}
