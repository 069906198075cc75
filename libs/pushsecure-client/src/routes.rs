//! Endpoint paths, relative to the API base URL
//!
//! Each route is a list of path segments; the transport appends the
//! trailing slash Django REST Framework routes require.

pub const ACCOUNTS: &[&str] = &["accounts"];
pub const GCM_DEVICES: &[&str] = &["device", "gcm"];
pub const APNS_DEVICES: &[&str] = &["device", "apns"];
pub const TOKENS: &[&str] = &["tokens"];
pub const MESSAGES: &[&str] = &["messages"];

/// Single GCM device resource
pub fn gcm_device(id: &str) -> Vec<&str> {
    let mut segments = GCM_DEVICES.to_vec();
    segments.push(id);
    segments
}

/// Single token resource
pub fn token(token: &str) -> Vec<&str> {
    let mut segments = TOKENS.to_vec();
    segments.push(token);
    segments
}
