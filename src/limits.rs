/// Longest accepted guest name, in bytes.
pub const MAX_USER_NAME_LEN: usize = 256;

/// Largest accepted SQL statement, in bytes.
pub const MAX_QUERY_LEN: usize = 16 * 1024;
