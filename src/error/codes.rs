/// Error code registry for Catalyst
///
/// Error codes are organized by category:
/// - 1000-1999: Configuration errors
/// - 2000-2999: Entitlement errors
/// - 3000-3999: Ledger errors
/// - 4000-4999: Collaborator and transport errors
/// - 5000-5999: Job errors
/// - 6000-6999: Catalog state errors
/// - 7000-7999: Validation errors
pub struct ErrorCode;

impl ErrorCode {
    // Configuration errors (1000-1999)
    pub const CONFIG_GENERIC: u16 = 1000;
    pub const CONFIG_NOT_FOUND: u16 = 1001;
    pub const CONFIG_INVALID_TOML: u16 = 1002;
    pub const CONFIG_INVALID_VALUE: u16 = 1005;
    pub const CONFIG_PATH_ERROR: u16 = 1006;

    // Entitlement errors (2000-2999)
    pub const ENTITLEMENT_UNAVAILABLE: u16 = 2001;

    // Ledger errors (3000-3999)
    pub const LEDGER_UNKNOWN_RESERVATION: u16 = 3001;
    pub const LEDGER_UNAVAILABLE: u16 = 3002;
    pub const LEDGER_OVERFLOW: u16 = 3003;

    // Collaborator errors (4000-4999)
    pub const COLLABORATOR_GENERIC: u16 = 4000;
    pub const COLLABORATOR_TRANSPORT: u16 = 4001;
    pub const COLLABORATOR_STATUS: u16 = 4002;
    pub const COLLABORATOR_DECODE: u16 = 4003;
    pub const COLLABORATOR_CLIENT_BUILD: u16 = 4004;

    // Job errors (5000-5999)
    pub const JOB_NOT_COMPLETED: u16 = 5001;
    pub const JOB_RELOAD_FAILED: u16 = 5002;
    pub const JOB_ABORTED: u16 = 5003;

    // Catalog state errors (6000-6999)
    pub const CATALOG_GENERIC: u16 = 6000;
    pub const CATALOG_IO_ERROR: u16 = 6001;
    pub const CATALOG_INVALID_FORMAT: u16 = 6002;
    pub const CATALOG_NOT_FOUND: u16 = 6003;

    // Validation errors (7000-7999)
    pub const VALIDATION_INVALID_INPUT: u16 = 7001;
    pub const VALIDATION_EMPTY_SELECTION: u16 = 7002;
}

/// Get a human-readable description for an error code
pub fn describe_error_code(code: u16) -> &'static str {
    match code {
        ErrorCode::CONFIG_GENERIC => "General configuration error",
        ErrorCode::CONFIG_NOT_FOUND => "Configuration file not found",
        ErrorCode::CONFIG_INVALID_TOML => "Invalid TOML syntax in configuration",
        ErrorCode::CONFIG_INVALID_VALUE => "Invalid configuration value",
        ErrorCode::CONFIG_PATH_ERROR => "Configuration directory could not be determined",

        ErrorCode::ENTITLEMENT_UNAVAILABLE => "Entitlement source unavailable",

        ErrorCode::LEDGER_UNKNOWN_RESERVATION => "Reservation unknown or already settled",
        ErrorCode::LEDGER_UNAVAILABLE => "Token balance source unavailable",
        ErrorCode::LEDGER_OVERFLOW => "Token arithmetic overflow",

        ErrorCode::COLLABORATOR_GENERIC => "General collaborator error",
        ErrorCode::COLLABORATOR_TRANSPORT => "Request could not be delivered",
        ErrorCode::COLLABORATOR_STATUS => "Collaborator returned an error status",
        ErrorCode::COLLABORATOR_DECODE => "Collaborator response could not be decoded",
        ErrorCode::COLLABORATOR_CLIENT_BUILD => "HTTP client could not be constructed",

        ErrorCode::JOB_NOT_COMPLETED => "Job did not complete and cannot be applied",
        ErrorCode::JOB_RELOAD_FAILED => "Confirmatory reload failed",
        ErrorCode::JOB_ABORTED => "Job stopped on a store-wide condition",

        ErrorCode::CATALOG_GENERIC => "General catalog state error",
        ErrorCode::CATALOG_IO_ERROR => "Catalog file I/O failed",
        ErrorCode::CATALOG_INVALID_FORMAT => "Catalog file has an invalid format",
        ErrorCode::CATALOG_NOT_FOUND => "Catalog file not found",

        ErrorCode::VALIDATION_INVALID_INPUT => "Invalid input provided",
        ErrorCode::VALIDATION_EMPTY_SELECTION => "Nothing was selected",
        _ => "Unknown error code",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes_are_described() {
        assert_eq!(
            describe_error_code(ErrorCode::JOB_NOT_COMPLETED),
            "Job did not complete and cannot be applied"
        );
        assert_eq!(
            describe_error_code(ErrorCode::LEDGER_UNAVAILABLE),
            "Token balance source unavailable"
        );
        assert_eq!(describe_error_code(1234), "Unknown error code");
        assert_eq!(describe_error_code(9000), "Unknown error code");
    }
}
