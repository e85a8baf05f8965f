//! Structured error model shared across every Wayfare component.
//!
//! Every fallible operation returns a [`CoreError`] rather than an ad-hoc
//! string or a third-party error type. `CoreError` carries an [`ErrorCode`]
//! drawn from a closed, fixed set, so the mapping to a wire status is a
//! single exhaustive `match` the compiler checks for us.

use std::collections::BTreeMap;
use std::fmt;

/// Severity of an error, independent of its code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
    Critical,
}

/// The closed set of core error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorCode {
    InvalidGraph,
    EmptyGraph,
    InvalidSource,
    InvalidSink,
    DuplicateNode,
    DanglingEdge,
    SelfLoop,
    NegativeCapacity,
    NegativeCost,
    SourceEqualsSink,
    InvalidCapacity,
    NegativeLength,
    NilInput,
    InvalidPagination,
    InvalidThreshold,
    InvalidAlgorithm,
    InvalidArgument,
    NoPath,
    DisconnectedGraph,
    IsolatedNode,
    UnreachableNode,
    NegativeCycle,
    AlgorithmMismatch,
    NotFound,
    Timeout,
    IterationLimit,
    Unauthenticated,
    PermissionDenied,
    Infeasible,
    FlowViolation,
    CapacityOverflow,
    ConservationViolation,
    NegativeFlow,
    FlowImbalance,
    Internal,
}

impl ErrorCode {
    /// Enumerated string form, e.g. `"INVALID_GRAPH"`. Never empty.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::InvalidGraph => "INVALID_GRAPH",
            ErrorCode::EmptyGraph => "EMPTY_GRAPH",
            ErrorCode::InvalidSource => "INVALID_SOURCE",
            ErrorCode::InvalidSink => "INVALID_SINK",
            ErrorCode::DuplicateNode => "DUPLICATE_NODE",
            ErrorCode::DanglingEdge => "DANGLING_EDGE",
            ErrorCode::SelfLoop => "SELF_LOOP",
            ErrorCode::NegativeCapacity => "NEGATIVE_CAPACITY",
            ErrorCode::NegativeCost => "NEGATIVE_COST",
            ErrorCode::SourceEqualsSink => "SOURCE_EQUALS_SINK",
            ErrorCode::InvalidCapacity => "INVALID_CAPACITY",
            ErrorCode::NegativeLength => "NEGATIVE_LENGTH",
            ErrorCode::NilInput => "NIL_INPUT",
            ErrorCode::InvalidPagination => "INVALID_PAGINATION",
            ErrorCode::InvalidThreshold => "INVALID_THRESHOLD",
            ErrorCode::InvalidAlgorithm => "INVALID_ALGORITHM",
            ErrorCode::InvalidArgument => "INVALID_ARGUMENT",
            ErrorCode::NoPath => "NO_PATH",
            ErrorCode::DisconnectedGraph => "DISCONNECTED_GRAPH",
            ErrorCode::IsolatedNode => "ISOLATED_NODE",
            ErrorCode::UnreachableNode => "UNREACHABLE_NODE",
            ErrorCode::NegativeCycle => "NEGATIVE_CYCLE",
            ErrorCode::AlgorithmMismatch => "ALGORITHM_MISMATCH",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::IterationLimit => "ITERATION_LIMIT",
            ErrorCode::Unauthenticated => "UNAUTHENTICATED",
            ErrorCode::PermissionDenied => "PERMISSION_DENIED",
            ErrorCode::Infeasible => "INFEASIBLE",
            ErrorCode::FlowViolation => "FLOW_VIOLATION",
            ErrorCode::CapacityOverflow => "CAPACITY_OVERFLOW",
            ErrorCode::ConservationViolation => "CONSERVATION_VIOLATION",
            ErrorCode::NegativeFlow => "NEGATIVE_FLOW",
            ErrorCode::FlowImbalance => "FLOW_IMBALANCE",
            ErrorCode::Internal => "INTERNAL",
        }
    }

    /// Map a core error code to its wire status. Total: every variant has
    /// exactly one arm.
    pub fn to_wire(self) -> WireStatus {
        use ErrorCode::*;
        match self {
            InvalidGraph | EmptyGraph | InvalidSource | InvalidSink | DuplicateNode
            | DanglingEdge | SelfLoop | NegativeCapacity | NegativeCost | SourceEqualsSink
            | InvalidCapacity | NegativeLength | NilInput | InvalidPagination
            | InvalidThreshold | InvalidAlgorithm | InvalidArgument => {
                WireStatus::InvalidArgument
            }
            NoPath | DisconnectedGraph | IsolatedNode | UnreachableNode | NegativeCycle
            | AlgorithmMismatch => WireStatus::FailedPrecondition,
            NotFound => WireStatus::NotFound,
            Timeout | IterationLimit => WireStatus::DeadlineExceeded,
            Unauthenticated => WireStatus::Unauthenticated,
            PermissionDenied => WireStatus::PermissionDenied,
            Infeasible => WireStatus::Aborted,
            FlowViolation | CapacityOverflow | ConservationViolation | NegativeFlow
            | FlowImbalance => WireStatus::DataLoss,
            Internal => WireStatus::Internal,
        }
    }

    /// Reverse mapping used by [`from_wire`]. Lossy: several core codes
    /// collapse onto the same wire status, so each arm picks the most
    /// common cause.
    fn from_wire_status(status: WireStatus) -> ErrorCode {
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
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wire-level status, independent of any particular RPC framework's status
/// type. The gRPC layer converts this to `tonic::Code`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireStatus {
    InvalidArgument,
    FailedPrecondition,
    NotFound,
    DeadlineExceeded,
    Unauthenticated,
    PermissionDenied,
    Aborted,
    DataLoss,
    Internal,
}

/// A structured core error.
#[derive(Debug, Clone)]
pub struct CoreError {
    code: ErrorCode,
    message: String,
    field: Option<String>,
    details: BTreeMap<String, serde_json::Value>,
    cause: Option<Box<CoreError>>,
    severity: Severity,
}

impl CoreError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        CoreError {
            code,
            message: message.into(),
            field: None,
            details: BTreeMap::new(),
            cause: None,
            severity: Severity::Error,
        }
    }

    pub fn new_with_field(code: ErrorCode, message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::new(code, message).with_field(field)
    }

    pub fn new_warning(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(code, message).with_severity(Severity::Warning)
    }

    pub fn new_critical(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(code, message).with_severity(Severity::Critical)
    }

    /// Wrap an existing error as the `cause` of a new one.
    pub fn wrap(cause: CoreError, code: ErrorCode, message: impl Into<String>) -> Self {
        let mut err = Self::new(code, message);
        err.cause = Some(Box::new(cause));
        err
    }

    pub fn with_details(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn details(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.details
    }

    pub fn cause(&self) -> Option<&CoreError> {
        self.cause.as_deref()
    }

    /// Walk the cause chain (`self`, then `self.cause`, then its cause, ...)
    /// looking for `code`.
    pub fn is(&self, code: ErrorCode) -> bool {
        let mut current = Some(self);
        while let Some(err) = current {
            if err.code == code {
                return true;
            }
            current = err.cause.as_deref();
        }
        false
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(field) = &self.field {
            write!(f, " (field: {field})")?;
        }
        if let Some(cause) = &self.cause {
            write!(f, ": {cause}")?;
        }
        Ok(())
    }
}

impl std::error::Error for CoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause.as_deref().map(|c| c as &(dyn std::error::Error + 'static))
    }
}

/// A wire-level error ready to be returned from an RPC handler.
#[derive(Debug, Clone)]
pub struct WireError {
    pub status: WireStatus,
    pub message: String,
}

/// Convert a core error to a wire error. `None` in, `None` out.
pub fn to_wire(err: Option<&CoreError>) -> Option<WireError> {
    err.map(|e| WireError {
        status: e.code.to_wire(),
        message: e.message.clone(),
    })
}

/// Reverse of [`to_wire`]: map a wire error back to the nearest core error.
/// `None` in, `None` out. Lossy — see [`ErrorCode::from_wire_status`].
pub fn from_wire(err: Option<&WireError>) -> Option<CoreError> {
    err.map(|e| CoreError::new(ErrorCode::from_wire_status(e.status), e.message.clone()))
}

/// Generate `From<E> for CoreError` implementations that map error types to
/// a specific [`ErrorCode`].
///
/// ```ignore
/// wayfare_core::map_error! {
///     sqlx::Error => Internal,
///     std::io::Error => Internal,
/// }
/// ```
#[macro_export]
macro_rules! map_error {
    ( $( $err_ty:ty => $code:ident ),* $(,)? ) => {
        $(
            impl From<$err_ty> for $crate::error::CoreError {
                fn from(err: $err_ty) -> Self {
                    $crate::error::CoreError::new($crate::error::ErrorCode::$code, err.to_string())
                }
            }
        )*
    };
}

map_error! {
    std::io::Error => Internal,
}

/// Aggregate of errors and warnings produced by request validation.
#[derive(Debug, Clone, Default)]
pub struct ValidationErrors {
    errors: Vec<CoreError>,
    warnings: Vec<CoreError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_error(&mut self, err: CoreError) {
        self.errors.push(err);
    }

    pub fn push_warning(&mut self, warn: CoreError) {
        self.warnings.push(warn);
    }

    pub fn errors(&self) -> &[CoreError] {
        &self.errors
    }

    pub fn warnings(&self) -> &[CoreError] {
        &self.warnings
    }

    /// `true` iff there are no errors. Warnings never affect validity.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_is_non_empty() {
        assert!(!ErrorCode::Internal.as_str().is_empty());
        assert!(!ErrorCode::NoPath.as_str().is_empty());
    }

    #[test]
    fn wire_mapping_is_total_and_matches_table() {
        assert_eq!(ErrorCode::InvalidGraph.to_wire(), WireStatus::InvalidArgument);
        assert_eq!(ErrorCode::InvalidArgument.to_wire(), WireStatus::InvalidArgument);
        assert_eq!(ErrorCode::NoPath.to_wire(), WireStatus::FailedPrecondition);
        assert_eq!(ErrorCode::AlgorithmMismatch.to_wire(), WireStatus::FailedPrecondition);
        assert_eq!(ErrorCode::NotFound.to_wire(), WireStatus::NotFound);
        assert_eq!(ErrorCode::Timeout.to_wire(), WireStatus::DeadlineExceeded);
        assert_eq!(ErrorCode::IterationLimit.to_wire(), WireStatus::DeadlineExceeded);
        assert_eq!(ErrorCode::Unauthenticated.to_wire(), WireStatus::Unauthenticated);
        assert_eq!(ErrorCode::PermissionDenied.to_wire(), WireStatus::PermissionDenied);
        assert_eq!(ErrorCode::Infeasible.to_wire(), WireStatus::Aborted);
        assert_eq!(ErrorCode::FlowViolation.to_wire(), WireStatus::DataLoss);
        assert_eq!(ErrorCode::NegativeFlow.to_wire(), WireStatus::DataLoss);
        assert_eq!(ErrorCode::Internal.to_wire(), WireStatus::Internal);
    }

    #[test]
    fn to_wire_and_from_wire_roundtrip_null() {
        assert!(to_wire(None).is_none());
        assert!(from_wire(None).is_none());
    }

    #[test]
    fn to_wire_preserves_message() {
        let err = CoreError::new(ErrorCode::NoPath, "no augmenting path");
        let wire = to_wire(Some(&err)).unwrap();
        assert_eq!(wire.status, WireStatus::FailedPrecondition);
        assert_eq!(wire.message, "no augmenting path");
    }

    #[test]
    fn from_wire_is_lossy_toward_most_common_cause() {
        let wire = WireError {
            status: WireStatus::FailedPrecondition,
            message: "precondition failed".into(),
        };
        let core = from_wire(Some(&wire)).unwrap();
        assert_eq!(core.code(), ErrorCode::NoPath);
    }

    #[test]
    fn cause_chain_walk_finds_nested_code() {
        let root = CoreError::new(ErrorCode::Timeout, "db timed out");
        let wrapped = CoreError::wrap(root, ErrorCode::Internal, "query failed");
        assert!(wrapped.is(ErrorCode::Internal));
        assert!(wrapped.is(ErrorCode::Timeout));
        assert!(!wrapped.is(ErrorCode::NotFound));
    }

    #[test]
    fn builder_methods_set_field_and_severity() {
        let err = CoreError::new(ErrorCode::InvalidArgument, "bad source")
            .with_field("source_id")
            .with_severity(Severity::Critical)
            .with_details("value", serde_json::json!(-1));
        assert_eq!(err.field(), Some("source_id"));
        assert_eq!(err.severity(), Severity::Critical);
        assert_eq!(err.details().get("value"), Some(&serde_json::json!(-1)));
    }

    #[test]
    fn validation_errors_validity_ignores_warnings() {
        let mut errs = ValidationErrors::new();
        errs.push_warning(CoreError::new_warning(ErrorCode::InvalidThreshold, "low threshold"));
        assert!(errs.is_valid());
        errs.push_error(CoreError::new(ErrorCode::InvalidGraph, "missing nodes"));
        assert!(!errs.is_valid());
        assert_eq!(errs.warnings().len(), 1);
        assert_eq!(errs.errors().len(), 1);
    }

    #[test]
    fn io_error_maps_to_internal() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let core: CoreError = io_err.into();
        assert_eq!(core.code(), ErrorCode::Internal);
        assert!(core.message().contains("file missing"));
    }
}
