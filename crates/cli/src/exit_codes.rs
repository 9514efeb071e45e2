//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain     | Description                                   |
//! |---------|------------|-----------------------------------------------|
//! | 0       | Universal  | Success                                       |
//! | 1       | Universal  | General error (unspecified)                   |
//! | 2       | Universal  | CLI usage error (bad args, missing file)      |
//! | 3-9     | config     | Configuration file codes                      |
//! | 10-19   | store      | Directory / intake / outbox I/O               |
//! | 20-29   | reconcile  | Matching and write-back codes                 |
//! | 30-39   | approval   | Approval link codes                           |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Map it in `recon_exit_code` if a `ReconError` can produce it

use fairways_recon::ReconError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Config (3-9)
// =============================================================================

/// No config file at the resolved path.
pub const EXIT_CONFIG_MISSING: u8 = 3;

/// Config file failed to parse or validate.
pub const EXIT_CONFIG_INVALID: u8 = 4;

// =============================================================================
// Store (10-19)
// =============================================================================

/// Reading or writing the directory, intake or outbox failed.
pub const EXIT_STORE: u8 = 10;

/// Directory has no header row and none could be derived.
pub const EXIT_SCHEMA: u8 = 11;

// =============================================================================
// Reconcile (20-29)
// =============================================================================

/// Several rows matched and `fail_on_ambiguous` is set. Nothing was written.
pub const EXIT_AMBIGUOUS: u8 = 20;

// =============================================================================
// Approval (30-39)
// =============================================================================

/// Approval link or decision rejected (bad parameters, wrong sheet, no approver).
pub const EXIT_INVALID_REQUEST: u8 = 30;

/// Map a ReconError to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::Store(_) | ReconError::Io(_) => EXIT_STORE,
        ReconError::Schema(_) => EXIT_SCHEMA,
        ReconError::AmbiguousMatch { .. } => EXIT_AMBIGUOUS,
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => EXIT_CONFIG_INVALID,
        ReconError::InvalidRequest(_) => EXIT_INVALID_REQUEST,
    }
}
