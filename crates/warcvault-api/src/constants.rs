/// Prefix of every download route
pub const API_PREFIX: &str = "/api/v1";

pub const OCTET_STREAM: &str = "application/octet-stream";
