// Stable exit codes for the boardpad CLI.
//
//   0  = success
//   1  = general error
//   2  = usage/argument error
//   10 = document not found
//   11 = storage quota exceeded
//   12 = corrupted record
//   13 = storage read/write failure
//   14 = malformed share link
//   15 = configuration error

use std::process;

use boardpad_common::share::ShareError;
use boardpad_session::config::ConfigError;
use boardpad_session::controller::SessionError;
use boardpad_session::store::StoreError;

/// Named exit codes for the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    Error = 1,
    Usage = 2,
    NotFound = 10,
    Quota = 11,
    Corrupted = 12,
    Storage = 13,
    Share = 14,
    Config = 15,
}

impl ExitCode {
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Map an anyhow error to an exit code by inspecting the error chain.
    pub fn from_error(err: &anyhow::Error) -> Self {
        for cause in err.chain() {
            if let Some(store_err) = cause.downcast_ref::<StoreError>() {
                return Self::from_store_code(store_err.code());
            }
            if let Some(session_err) = cause.downcast_ref::<SessionError>() {
                return match session_err {
                    SessionError::Store(inner) => Self::from_store_code(inner.code()),
                    SessionError::Share(_) => Self::Share,
                    SessionError::Import { .. } => Self::NotFound,
                    _ => Self::Error,
                };
            }
            if cause.downcast_ref::<ShareError>().is_some() {
                return Self::Share;
            }
            if cause.downcast_ref::<ConfigError>().is_some() {
                return Self::Config;
            }
            if let Some(io_err) = cause.downcast_ref::<std::io::Error>() {
                return match io_err.kind() {
                    std::io::ErrorKind::NotFound => Self::NotFound,
                    _ => Self::Error,
                };
            }
        }
        Self::Error
    }

    /// Map a store error code string to an exit code.
    pub fn from_store_code(code: &str) -> Self {
        match code {
            "NOT_FOUND" => Self::NotFound,
            "QUOTA_EXCEEDED" => Self::Quota,
            "CORRUPTED_RECORD" => Self::Corrupted,
            "STORAGE_WRITE_ERROR" | "STORAGE_READ_ERROR" => Self::Storage,
            "INVALID_ARGUMENT" => Self::Usage,
            _ => Self::Error,
        }
    }
}

impl From<ExitCode> for process::ExitCode {
    fn from(code: ExitCode) -> Self {
        process::ExitCode::from(code.code() as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_code_values() {
        assert_eq!(ExitCode::Success.code(), 0);
        assert_eq!(ExitCode::Error.code(), 1);
        assert_eq!(ExitCode::Usage.code(), 2);
        assert_eq!(ExitCode::NotFound.code(), 10);
        assert_eq!(ExitCode::Quota.code(), 11);
        assert_eq!(ExitCode::Share.code(), 14);
    }

    #[test]
    fn from_store_code_maps_each_store_failure() {
        assert_eq!(ExitCode::from_store_code("NOT_FOUND"), ExitCode::NotFound);
        assert_eq!(ExitCode::from_store_code("QUOTA_EXCEEDED"), ExitCode::Quota);
        assert_eq!(ExitCode::from_store_code("CORRUPTED_RECORD"), ExitCode::Corrupted);
        assert_eq!(ExitCode::from_store_code("STORAGE_READ_ERROR"), ExitCode::Storage);
        assert_eq!(ExitCode::from_store_code("INVALID_ARGUMENT"), ExitCode::Usage);
        assert_eq!(ExitCode::from_store_code("EXPORT_FAILED"), ExitCode::Error);
    }

    #[test]
    fn from_error_finds_store_error_under_context() {
        let err = anyhow::Error::new(StoreError::QuotaExceeded("full".into()))
            .context("failed to save document");
        assert_eq!(ExitCode::from_error(&err), ExitCode::Quota);
    }

    #[test]
    fn from_error_unwraps_session_error() {
        let err = anyhow::Error::new(SessionError::Store(StoreError::NotFound("x".into())));
        assert_eq!(ExitCode::from_error(&err), ExitCode::NotFound);
        let err = anyhow::Error::new(SessionError::VersionLoading);
        assert_eq!(ExitCode::from_error(&err), ExitCode::Error);
    }

    #[test]
    fn from_error_share_and_config() {
        let err = anyhow::Error::new(boardpad_common::share::decode("!!").unwrap_err());
        assert_eq!(ExitCode::from_error(&err), ExitCode::Share);
        let err = anyhow::Error::new(ConfigError::NoHomeDir);
        assert_eq!(ExitCode::from_error(&err), ExitCode::Config);
    }

    #[test]
    fn from_error_missing_file_is_not_found() {
        let err = anyhow::Error::new(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert_eq!(ExitCode::from_error(&err), ExitCode::NotFound);
    }

    #[test]
    fn from_error_generic_is_error() {
        let err = anyhow::anyhow!("something went wrong");
        assert_eq!(ExitCode::from_error(&err), ExitCode::Error);
    }
}
