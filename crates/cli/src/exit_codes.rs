//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain     | Description                              |
//! |---------|------------|------------------------------------------|
//! | 0       | Universal  | Success                                  |
//! | 1       | Universal  | General error (unspecified)              |
//! | 2       | Universal  | CLI usage error (bad args, bad config)   |
//! | 3       | Universal  | I/O error (unreadable file, auth file)   |
//! | 4       | Universal  | Input parse error                        |
//! | 40-49   | store      | Hosted store codes                       |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use bestie_store_client::StoreError;

// =============================================================================
// Universal (0-4)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, unknown time zone, invalid milestones.
pub const EXIT_USAGE: u8 = 2;

/// Input file or credentials file could not be read or written.
pub const EXIT_IO: u8 = 3;

/// Input is not valid JSON or not the expected shape.
pub const EXIT_PARSE: u8 = 4;

// =============================================================================
// Store (40-49)
// =============================================================================

/// No saved credentials, or the store rejected them (401/403).
pub const EXIT_STORE_NOT_AUTH: u8 = 40;

/// Network failure, non-success status or unreadable response.
pub const EXIT_STORE_UPSTREAM: u8 = 41;

/// Map a StoreError to its exit code.
pub fn store_exit_code(err: &StoreError) -> u8 {
    match err {
        StoreError::NotAuthenticated | StoreError::Unauthorized(_) => EXIT_STORE_NOT_AUTH,
        StoreError::Network(_)
        | StoreError::Http(..)
        | StoreError::Validation(_)
        | StoreError::Parse(_) => EXIT_STORE_UPSTREAM,
        StoreError::Io(_) => EXIT_IO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_registry() {
        assert_eq!(store_exit_code(&StoreError::NotAuthenticated), EXIT_STORE_NOT_AUTH);
        assert_eq!(store_exit_code(&StoreError::Unauthorized("x".into())), EXIT_STORE_NOT_AUTH);
        assert_eq!(store_exit_code(&StoreError::Http(500, "x".into())), EXIT_STORE_UPSTREAM);
        assert_eq!(store_exit_code(&StoreError::Validation("x".into())), EXIT_STORE_UPSTREAM);
        assert_eq!(store_exit_code(&StoreError::Io("x".into())), EXIT_IO);
    }
}
