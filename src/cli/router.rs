//! Command routing and execution

use crate::app::AppConfig;
use crate::cli::args::Commands;
use crate::cli::commands::*;
use anyhow::Result;

/// Execute a CLI command based on the parsed arguments
pub async fn execute_command(command: Commands, app: &AppConfig) -> Result<()> {
    match command {
        Commands::Plans { json } => run_plans_command(json),
        Commands::Preflight {
            selection,
            account,
            json,
        } => run_preflight_command(app, selection, account, json).await,
        Commands::Run {
            selection,
            account,
            apply,
            dry_run,
            window_size,
            json,
        } => {
            run_optimize_command(
                app,
                RunParams {
                    selection,
                    account,
                    apply,
                    dry_run,
                    window_size,
                    json,
                },
            )
            .await
        }
    }
}
