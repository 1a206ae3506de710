use crate::{reminder::dispatch_reminders::DispatchRemindersUseCase, shared::usecase::execute};
use actix_web::rt::time::{interval, sleep};
use obligations_infra::ObligationsContext;
use std::time::Duration;
use tracing::info;

const DAY_MILLIS: i64 = 24 * 60 * 60 * 1000;

/// Millis from `now_ts` until the next midnight at the given UTC offset
pub fn get_start_delay(now_ts: i64, offset_minutes: i32) -> i64 {
    let local_ts = now_ts + i64::from(offset_minutes) * 60 * 1000;
    DAY_MILLIS - local_ts.rem_euclid(DAY_MILLIS)
}

/// Runs a dispatcher pass at every business midnight and then once every
/// `reminder_dispatch_interval_millis`. Every tick spawns its own pass,
/// overlapping passes are resolved by the claims.
pub fn start_dispatch_reminders_job(ctx: ObligationsContext) {
    actix_web::rt::spawn(async move {
        let now = ctx.sys.get_timestamp_millis();
        let delay = get_start_delay(now, ctx.config.business_utc_offset_minutes);
        info!("First reminder dispatch will run in {} seconds", delay / 1000);
        sleep(Duration::from_millis(delay.max(0) as u64)).await;

        let period = ctx.config.reminder_dispatch_interval_millis.max(1000) as u64;
        let mut dispatch_interval = interval(Duration::from_millis(period));
        loop {
            dispatch_interval.tick().await;
            let context = ctx.clone();
            actix_web::rt::spawn(dispatch_reminders(context));
        }
    });
}

async fn dispatch_reminders(ctx: ObligationsContext) {
    // Errors are logged by `execute`
    let _ = execute(DispatchRemindersUseCase::default(), &ctx).await;
}
