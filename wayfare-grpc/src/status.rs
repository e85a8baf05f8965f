//! Conversion between the framework-independent [`wayfare_core::error`]
//! types and `tonic`'s wire status, per §6's wire mapping table.

use tonic::{Code, Status};
use wayfare_core::{CoreError, ErrorCode, WireStatus};

/// Maps a [`WireStatus`] to its `tonic::Code`.
pub fn wire_to_code(status: WireStatus) -> Code {
    match status {
        WireStatus::InvalidArgument => Code::InvalidArgument,
        WireStatus::FailedPrecondition => Code::FailedPrecondition,
        WireStatus::NotFound => Code::NotFound,
        WireStatus::DeadlineExceeded => Code::DeadlineExceeded,
        WireStatus::Unauthenticated => Code::Unauthenticated,
        WireStatus::PermissionDenied => Code::PermissionDenied,
        WireStatus::Aborted => Code::Aborted,
        WireStatus::DataLoss => Code::DataLoss,
        WireStatus::Internal => Code::Internal,
    }
}

/// Reverse of [`wire_to_code`]. Codes with no `WireStatus` counterpart
/// (e.g. `Unavailable`, `Cancelled`) collapse onto `Internal`.
pub fn code_to_wire(code: Code) -> WireStatus {
    match code {
        Code::InvalidArgument => WireStatus::InvalidArgument,
        Code::FailedPrecondition => WireStatus::FailedPrecondition,
        Code::NotFound => WireStatus::NotFound,
        Code::DeadlineExceeded => WireStatus::DeadlineExceeded,
        Code::Unauthenticated => WireStatus::Unauthenticated,
        Code::PermissionDenied => WireStatus::PermissionDenied,
        Code::Aborted => WireStatus::Aborted,
        Code::DataLoss => WireStatus::DataLoss,
        _ => WireStatus::Internal,
    }
}

/// Converts a [`CoreError`] into the `tonic::Status` an RPC handler returns.
pub fn core_error_to_status(err: &CoreError) -> Status {
    Status::new(wire_to_code(err.code().to_wire()), err.message().to_string())
}

/// Reverse of [`core_error_to_status`]: wraps a returned `Status` back into
/// a [`CoreError`], for interceptors that need to classify outcomes
/// (audit, logging) without re-parsing `Status` directly.
pub fn status_to_core_error(status: &Status) -> CoreError {
    let code = code_to_wire(status.code());
    CoreError::new(wire_status_error_code(code), status.message().to_string())
}

fn wire_status_error_code(status: WireStatus) -> ErrorCode {
    match status {
        WireStatus::InvalidArgument => ErrorCode::InvalidArgument,
        WireStatus::FailedPrecondition => ErrorCode::NoPath,
        WireStatus::NotFound => ErrorCode::NotFound,
        WireStatus::DeadlineExceeded => ErrorCode::Timeout,
        WireStatus::Unauthenticated => ErrorCode::Unauthenticated,
        WireStatus::PermissionDenied => ErrorCode::PermissionDenied,
        WireStatus::Aborted => ErrorCode::Infeasible,
        WireStatus::DataLoss => ErrorCode::FlowViolation,
        WireStatus::Internal => ErrorCode::Internal,
    }
}

/// Stable label for a `tonic::Code`, for metrics/audit dimensions.
pub fn code_label(code: Code) -> &'static str {
    match code {
        Code::Ok => "ok",
        Code::Cancelled => "cancelled",
        Code::Unknown => "unknown",
        Code::InvalidArgument => "invalid_argument",
        Code::DeadlineExceeded => "deadline_exceeded",
        Code::NotFound => "not_found",
        Code::AlreadyExists => "already_exists",
        Code::PermissionDenied => "permission_denied",
        Code::ResourceExhausted => "resource_exhausted",
        Code::FailedPrecondition => "failed_precondition",
        Code::Aborted => "aborted",
        Code::OutOfRange => "out_of_range",
        Code::Unimplemented => "unimplemented",
        Code::Internal => "internal",
        Code::Unavailable => "unavailable",
        Code::DataLoss => "data_loss",
        Code::Unauthenticated => "unauthenticated",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_to_code_covers_every_variant() {
        assert_eq!(wire_to_code(WireStatus::InvalidArgument), Code::InvalidArgument);
        assert_eq!(wire_to_code(WireStatus::NotFound), Code::NotFound);
        assert_eq!(wire_to_code(WireStatus::Internal), Code::Internal);
    }

    #[test]
    fn code_to_wire_collapses_unmapped_codes_to_internal() {
        assert_eq!(code_to_wire(Code::Unavailable), WireStatus::Internal);
        assert_eq!(code_to_wire(Code::Cancelled), WireStatus::Internal);
    }

    #[test]
    fn core_error_to_status_preserves_message_and_maps_code() {
        let err = CoreError::new(ErrorCode::NotFound, "no such graph");
        let status = core_error_to_status(&err);
        assert_eq!(status.code(), Code::NotFound);
        assert_eq!(status.message(), "no such graph");
    }

    #[test]
    fn status_to_core_error_round_trips_through_the_lossy_mapping() {
        let status = Status::new(Code::DeadlineExceeded, "timed out");
        let err = status_to_core_error(&status);
        assert!(err.is(ErrorCode::Timeout));
    }
}
