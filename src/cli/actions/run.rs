use crate::cli::{
    actions::{Action, password, sso},
    telemetry,
};
use anyhow::Result;

/// Execute the provided action.
// Single dispatch point for all CLI actions.
/// # Errors
/// Returns an error if the action fails.
pub async fn execute(action: Action) -> Result<()> {
    let result = match action {
        Action::Sso(args) => sso::execute(args).await,
        Action::Password(args) => password::execute(args).await,
    };

    telemetry::shutdown_tracer();

    result
}
