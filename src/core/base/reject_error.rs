use http::StatusCode;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectType {
    Unknown,
    /// the client address is blacklisted
    Blacklisted,
    /// no slot freed up within the admission timeout
    Timeout,
}

impl Default for RejectType {
    fn default() -> Self {
        Self::Unknown
    }
}

impl fmt::Display for RejectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// RejectError indicates the request was not admitted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RejectError {
    reject_type: RejectType,
    // reject_msg provides additional message for the reject error.
    reject_msg: String,
    // name of the controller that turned the request away
    controller: Option<String>,
}

impl RejectError {
    pub fn new(reject_type: RejectType) -> Self {
        Self {
            reject_type,
            ..Self::default()
        }
    }

    pub fn new_with_msg(reject_type: RejectType, reject_msg: String) -> Self {
        Self {
            reject_type,
            reject_msg,
            ..Self::default()
        }
    }

    pub fn new_with_cause(reject_type: RejectType, reject_msg: String, controller: String) -> Self {
        Self {
            reject_type,
            reject_msg,
            controller: Some(controller),
        }
    }

    pub fn reject_type(&self) -> RejectType {
        self.reject_type
    }

    pub fn reject_msg(&self) -> &str {
        &self.reject_msg
    }

    pub fn controller(&self) -> Option<&str> {
        self.controller.as_deref()
    }

    /// HTTP status the request should be answered with.
    pub fn status_code(&self) -> StatusCode {
        match self.reject_type {
            RejectType::Blacklisted => StatusCode::FORBIDDEN,
            RejectType::Timeout | RejectType::Unknown => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl fmt::Display for RejectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.reject_msg.is_empty() {
            write!(f, "ControlFlowRejectError: {}", self.reject_type)
        } else {
            write!(
                f,
                "ControlFlowRejectError: {}, message: {}",
                self.reject_type, self.reject_msg
            )
        }
    }
}

impl std::error::Error for RejectError {}

#[cfg(test)]
mod test {
    use super::*;

    fn testcase(reject_type: RejectType, reject_msg: Option<String>, controller: Option<String>) {
        let reject_err: RejectError;
        if let (Some(reject_msg), Some(controller)) = (reject_msg.clone(), controller) {
            reject_err =
                RejectError::new_with_cause(reject_type, reject_msg.clone(), controller.clone());
            assert_eq!(reject_err.reject_type(), reject_type);
            assert_eq!(reject_err.reject_msg(), reject_msg);
            assert_eq!(reject_err.controller(), Some(controller.as_str()));
        } else if let Some(reject_msg) = reject_msg {
            reject_err = RejectError::new_with_msg(reject_type, reject_msg.clone());
            assert_eq!(reject_err.reject_type, reject_type);
            assert_eq!(reject_err.reject_msg, reject_msg);
            assert!(reject_err.controller().is_none());
        } else {
            reject_err = RejectError::new(reject_type);
            assert_eq!(reject_err.reject_type, reject_type);
            assert_eq!(reject_err.reject_msg, String::default());
            assert!(reject_err.controller().is_none());
        }
    }

    #[test]
    fn error_create() {
        testcase(RejectType::Timeout, None, None);
        testcase(RejectType::Timeout, Some(String::from("mock msg")), None);
        testcase(
            RejectType::Blacklisted,
            Some(String::from("mock msg")),
            Some(String::from("IpBlacklistFilter")),
        );
    }

    #[test]
    fn status_codes() {
        assert_eq!(
            RejectError::new(RejectType::Blacklisted).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            RejectError::new(RejectType::Timeout).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn display() {
        assert_eq!(
            RejectError::new(RejectType::Timeout).to_string(),
            "ControlFlowRejectError: Timeout"
        );
        assert_eq!(
            RejectError::new_with_msg(RejectType::Blacklisted, "10.0.0.1".into()).to_string(),
            "ControlFlowRejectError: Blacklisted, message: 10.0.0.1"
        );
    }
}
