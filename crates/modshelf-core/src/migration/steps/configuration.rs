//! Step 2: carry legacy settings over. Best-effort.

use async_trait::async_trait;

use super::MigrationStep;
use crate::error::Result;
use crate::migration::context::{MigrationServices, RunContext};
use crate::migration::types::StepKind;

pub struct MigrateConfigurationStep;

#[async_trait]
impl MigrationStep for MigrateConfigurationStep {
    fn kind(&self) -> StepKind {
        StepKind::Configuration
    }

    async fn run(&self, ctx: &mut RunContext, services: &MigrationServices) -> Result<()> {
        let Some(config) = ctx.analysis.as_ref().and_then(|a| a.configuration.clone()) else {
            ctx.info("No legacy configuration found, settings left unchanged").await;
            return Ok(());
        };

        let settings = config.to_settings();
        let total = settings.len();
        let mut applied = 0;
        for (index, (key, value)) in settings.into_iter().enumerate() {
            match services.settings.set_setting(key, value).await {
                Ok(()) => applied += 1,
                Err(e) => ctx.warn(format!("Setting '{}' was not migrated: {}", key, e)).await,
            }
            ctx.report(key, index + 1, total);
        }

        if config.ignored_keys > 0 {
            ctx.info(format!(
                "Ignored {} unrecognized configuration keys",
                config.ignored_keys
            ))
            .await;
        }
        ctx.info(format!("Migrated {} of {} settings", applied, total)).await;
        Ok(())
    }
}
