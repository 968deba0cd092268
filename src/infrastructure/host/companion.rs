//! Cleanup for modules that install an external dependency tree next to the bot

use async_trait::async_trait;

use crate::domain::traits::RemoveHook;
use crate::infrastructure::config::CompanionConfig;

/// Uninstalls a companion's dependencies and deletes its directory
pub struct CompanionCleanup {
    config: CompanionConfig,
}

impl CompanionCleanup {
    pub fn new(mut config: CompanionConfig) -> Self {
        config.name = config.name.to_lowercase();
        Self { config }
    }

    async fn run_uninstall(&self) -> Result<(), String> {
        let Some((program, args)) = self.config.uninstall_command.split_first() else {
            return Ok(());
        };

        let status = tokio::process::Command::new(program)
            .args(args)
            .current_dir(&self.config.directory)
            .status()
            .await
            .map_err(|e| format!("Failed to run {}: {}", program, e))?;

        if !status.success() {
            // Dependencies may be half gone already; the directory still goes.
            tracing::warn!("Uninstall for {} exited with {}", self.config.name, status);
        }
        Ok(())
    }
}

#[async_trait]
impl RemoveHook for CompanionCleanup {
    fn module_name(&self) -> &str {
        &self.config.name
    }

    async fn after_remove(&self) -> Result<(), String> {
        let dir = &self.config.directory;
        if !tokio::fs::try_exists(dir).await.unwrap_or(false) {
            tracing::debug!("Companion directory {} already gone", dir.display());
            return Ok(());
        }

        // The directory goes even when the uninstaller cannot start
        let uninstalled = self.run_uninstall().await;
        if let Err(e) = &uninstalled {
            tracing::warn!("{}", e);
        }

        tokio::fs::remove_dir_all(dir)
            .await
            .map_err(|e| format!("Failed to delete {}: {}", dir.display(), e))?;
        tracing::info!("Cleaned up companion {} at {}", self.config.name, dir.display());
        uninstalled
    }
}
