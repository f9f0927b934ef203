//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract — scripts rely on them.
//!
//! # Exit Codes
//!
//! | Code | Domain    | Description                                    |
//! |------|-----------|------------------------------------------------|
//! | 0    | Universal | Success                                        |
//! | 1    | Universal | General error (unspecified)                    |
//! | 2    | Universal | CLI usage error (bad args, missing file)       |
//! | 3    | catalog   | Unresolved integrity violations                |
//! | 4    | catalog   | Duplicate canonical id after merge             |
//! | 5    | catalog   | Source parse error (corrupt JSON snapshot)     |
//! | 6    | catalog   | Config parse/validation error                  |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant below
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// Integrity violations survived the run (category conflicts, invalid
/// enum values). The consolidated store is left untouched.
pub const EXIT_INTEGRITY: u8 = 3;

/// Duplicate canonical id after merge. Should be unreachable; indicates
/// an engine regression, and the store is left untouched.
pub const EXIT_DUPLICATE: u8 = 4;

/// A JSON source snapshot failed to parse. Malformed rows inside an
/// otherwise valid source are warnings, not this.
pub const EXIT_PARSE: u8 = 5;

/// Config file failed to parse or validate.
pub const EXIT_CONFIG: u8 = 6;
