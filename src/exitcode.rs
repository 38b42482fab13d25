//! Standard exit codes (BSD sysexits.h compatible)

/// Successful termination
pub const OK: i32 = 0;

/// Command line usage error, including malformed edit operations
pub const USAGE: i32 = 64;

/// Data format error: unknown kind or property, invalid value, missing node
pub const DATAERR: i32 = 65;

/// Internal software error, e.g. a broken naming invariant
pub const SOFTWARE: i32 = 70;

/// Configuration error
pub const CONFIG: i32 = 78;
