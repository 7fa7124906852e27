//! Shoot a whole strip on this machine.

use snapbooth_capture_engine::{ShotOutcome, TriggerOrigin};
use snapbooth_common::config::AppConfig;

use crate::BoothArgs;

pub async fn run(config: &AppConfig, args: BoothArgs) -> anyhow::Result<()> {
    let mut booth = super::build_controller(config, &args)?;
    let total = booth.session().total_shots();

    println!("SnapBooth: {} layout, {total} shot(s)", booth.settings().layout);
    println!("  Local:  {}", args.local);
    println!("  Remote: {}", args.remote);
    println!("  Filter: {}", booth.settings().filter);
    println!();

    loop {
        match booth.request_shot(TriggerOrigin::Local).await {
            ShotOutcome::Captured { .. } => continue,
            ShotOutcome::Finished => break,
            ShotOutcome::Failed(e) => return Err(e.into()),
            ShotOutcome::Ignored(reason) => anyhow::bail!("Shot unexpectedly ignored: {reason:?}"),
            ShotOutcome::Discarded => anyhow::bail!("Shot unexpectedly discarded"),
        }
    }

    Ok(())
}
