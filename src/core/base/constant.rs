// request headers
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
pub const COOKIE: &str = "cookie";

// response headers
pub const SET_COOKIE: &str = "set-cookie";
pub const DELAY_HEADER: &str = "x-control-flow-delay-ms";

// cookie carrying the user identity of `UserConcurrentFlowController`
pub const DEFAULT_COOKIE_NAME: &str = "GS_FLOW_CONTROL";
