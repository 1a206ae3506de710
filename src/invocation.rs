use clap::Parser;
use obligations_api::{execute, DispatchRemindersUseCase};
use obligations_infra::ObligationsContext;
use tracing::{error, info};

/// Dispatch the due subscription and compliance reminders once
#[derive(Debug, Default, Parser)]
#[command(name = "dispatch_reminders", version)]
pub struct DispatchArgs {
    /// Only dispatch the reminders of this tenant
    #[arg(long = "tenant")]
    pub tenant_id: Option<String>,
}

/// Runs one dispatcher pass and returns the exit status of the invocation
pub async fn run_once(ctx: &ObligationsContext, args: DispatchArgs) -> i32 {
    let tenant_id = args
        .tenant_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty());
    let usecase = DispatchRemindersUseCase { tenant_id };

    match execute(usecase, ctx).await {
        Ok(summary) => {
            info!(
                "Reminder dispatch done. Processed: {}, sent: {}, skipped: {}, errors: {}",
                summary.processed, summary.sent, summary.skipped, summary.errors
            );
            0
        }
        Err(e) => {
            error!("Reminder dispatch failed: {:?}", e);
            1
        }
    }
}
