//! Chat commands exposing the module lifecycle

use std::fmt::Display;
use std::sync::Arc;

use crate::application::errors::{CommandError, ModuleError};
use crate::application::services::{CommandService, ModuleManager};
use crate::domain::entities::{Command, Message, ModuleReference};

/// Turn an operation result into its single status line
fn status<T: Display>(result: Result<T, ModuleError>) -> String {
    match result {
        Ok(outcome) => outcome.to_string(),
        Err(e) => {
            tracing::warn!("Module operation failed: {}", e);
            e.to_string()
        }
    }
}

fn reference_from(message: &Message, extension: &str) -> Result<ModuleReference, CommandError> {
    if let Some(raw) = message.args().first() {
        return Ok(ModuleReference::parse(raw));
    }
    if let Some(attachment) = &message.attachment {
        return Ok(ModuleReference::uploaded(
            attachment.file_name.clone(),
            attachment.local_path.clone(),
        ));
    }
    Err(CommandError::InvalidArgs(format!(
        "Specify module to download or reply to a .{} file",
        extension
    )))
}

/// Register loadmod, unloadmod, modhash, loadallmods, updateallmods and listmods
pub fn register_loader_commands(commands: &mut CommandService, manager: Arc<ModuleManager>) {
    let prefix = commands.prefix().to_string();

    let m = manager.clone();
    commands.register(Command::new("loadmod")
        .with_description(format!("Download module from URL or reply to a .{} file", manager.extension()))
        .with_aliases(vec!["lm".to_string()])
        .with_usage(format!("{}loadmod [module_name|url]", prefix))
        .with_handler(move |msg| {
            let manager = m.clone();
            async move {
                match reference_from(&msg, manager.extension()) {
                    Ok(reference) => Ok(status(manager.install(&reference).await)),
                    Err(e) => Err(e),
                }
            }
        }));

    let m = manager.clone();
    let usage = format!("Usage: {}unloadmod <module_name>", prefix);
    commands.register(Command::new("unloadmod")
        .with_description("Delete specified module")
        .with_aliases(vec!["ulm".to_string()])
        .with_usage(format!("{}unloadmod <module_name>", prefix))
        .with_handler(move |msg| {
            let manager = m.clone();
            let usage = usage.clone();
            async move {
                let Some(name) = msg.args().first() else {
                    return Err(CommandError::InvalidArgs(usage));
                };
                Ok(status(manager.remove(name).await))
            }
        }));

    let m = manager.clone();
    let usage = format!("Usage: {}modhash <URL>", prefix);
    commands.register(Command::new("modhash")
        .with_description("Get SHA-256 hash of the file at the specified URL")
        .with_aliases(vec!["mh".to_string()])
        .with_usage(format!("{}modhash <URL>", prefix))
        .with_handler(move |msg| {
            let manager = m.clone();
            let usage = usage.clone();
            async move {
                let [url] = msg.args() else {
                    return Err(CommandError::InvalidArgs(usage));
                };
                Ok(status(manager.hash(url).await))
            }
        }));

    let m = manager.clone();
    commands.register(Command::new("loadallmods")
        .with_description("Load all available custom modules from the repository")
        .with_handler(move |_| {
            let manager = m.clone();
            async move { Ok(status(manager.install_all_missing().await)) }
        }));

    let m = manager.clone();
    commands.register(Command::new("updateallmods")
        .with_description("Update all installed custom modules from the repository")
        .with_handler(move |_| {
            let manager = m.clone();
            async move { Ok(status(manager.update_all_installed().await)) }
        }));

    let m = manager;
    commands.register(Command::new("listmods")
        .with_description("List installed custom modules with their hashes")
        .with_aliases(vec!["lsm".to_string()])
        .with_handler(move |_| {
            let manager = m.clone();
            async move {
                manager.refresh_catalog().await
                    .map(|_| manager.catalog().render())
                    .map_err(|e| CommandError::ExecutionFailed(e.to_string()))
            }
        }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::testing::{FakeFetcher, RecordingHost};
    use crate::domain::entities::Attachment;
    use crate::domain::traits::ModuleStore;
    use crate::infrastructure::config::Config;
    use crate::infrastructure::storage::FsModuleStore;

    const PREFIX: &str = "https://raw.githubusercontent.com/The-MoonTg-project/custom_modules/main/";

    fn setup(fetcher: FakeFetcher) -> (tempfile::TempDir, Arc<FsModuleStore>, CommandService) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FsModuleStore::new(dir.path().join("mods"), "py"));
        let manager = ModuleManager::new(
            &Config::default(),
            Arc::new(fetcher),
            store.clone(),
            Arc::new(RecordingHost::default()),
        );
        let mut commands = CommandService::new("/");
        register_loader_commands(&mut commands, Arc::new(manager));
        (dir, store, commands)
    }

    fn cmd(name: &str, args: &[&str]) -> Message {
        Message::from_command("console", name, args.iter().map(|a| a.to_string()).collect())
    }

    #[tokio::test]
    async fn test_loadmod_and_unloadmod_report_status() {
        let (_dir, store, commands) = setup(FakeFetcher::new().with(&format!("{}weather.py", PREFIX), b"w"));

        let reply = commands.handle(&cmd("lm", &["weather"])).await.unwrap().unwrap();
        assert_eq!(reply, "The module weather is loaded!");
        assert!(store.exists("weather").await.unwrap());

        let reply = commands.handle(&cmd("ulm", &["weather"])).await.unwrap().unwrap();
        assert_eq!(reply, "The module weather removed!");

        let reply = commands.handle(&cmd("unloadmod", &["weather"])).await.unwrap().unwrap();
        assert_eq!(reply, "Module weather is not found or is a built-in module");
    }

    #[tokio::test]
    async fn test_loadmod_from_attachment() {
        let (dir, store, commands) = setup(FakeFetcher::new());
        let upload = dir.path().join("upload.bin");
        std::fs::write(&upload, b"attached").unwrap();

        let msg = cmd("loadmod", &[]).with_attachment(Attachment::new("clock.py", &upload));
        let reply = commands.handle(&msg).await.unwrap().unwrap();
        assert_eq!(reply, "The module clock is loaded!");
        assert_eq!(store.read("clock").await.unwrap().as_deref(), Some(&b"attached"[..]));
    }

    #[tokio::test]
    async fn test_usage_errors() {
        let (_dir, _store, commands) = setup(FakeFetcher::new());

        let err = commands.handle(&cmd("loadmod", &[])).await.unwrap_err();
        assert_eq!(err.to_string(), "Specify module to download or reply to a .py file");

        let err = commands.handle(&cmd("mh", &[])).await.unwrap_err();
        assert_eq!(err.to_string(), "Usage: /modhash <URL>");

        let err = commands.handle(&cmd("ulm", &[])).await.unwrap_err();
        assert_eq!(err.to_string(), "Usage: /unloadmod <module_name>");
    }

    #[tokio::test]
    async fn test_failures_become_status_lines() {
        let (_dir, _store, commands) = setup(FakeFetcher::new());

        let reply = commands.handle(&cmd("loadallmods", &[])).await.unwrap().unwrap();
        assert!(reply.starts_with("Failed to fetch module list"));

        let reply = commands.handle(&cmd("updateallmods", &[])).await.unwrap().unwrap();
        assert_eq!(reply, "No modules installed");

        let reply = commands.handle(&cmd("lsm", &[])).await.unwrap().unwrap();
        assert_eq!(reply, "No modules installed");
    }
}
