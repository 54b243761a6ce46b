//! Error handling utilities

use tracing::error;

/// Handle fatal errors and exit with appropriate status code
///
/// - For `CatalystError`: shows the user message, and the full cause chain in
///   verbose mode
/// - For other errors: shows the message and the anyhow chain in verbose mode
pub fn handle_fatal_error(error: anyhow::Error, verbose: u8) -> ! {
    use crate::error::CatalystError;

    error!("Fatal error: {}", error);

    let exit_code = if let Some(catalyst_err) = error.downcast_ref::<CatalystError>() {
        eprintln!("{}", catalyst_err.user_message());

        if verbose >= 1 {
            eprintln!("\nContext Chain:\n{}", catalyst_err.developer_message());
        }

        catalyst_err.exit_code()
    } else {
        eprintln!("Error: {error}");

        if verbose >= 1 {
            eprintln!("\nError chain:");
            for (i, cause) in error.chain().enumerate() {
                eprintln!("  {}: {}", i, cause);
            }
        }

        1
    };

    std::process::exit(exit_code)
}
