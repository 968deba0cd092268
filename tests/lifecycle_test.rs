//! Module lifecycle integration tests
//! Run with: cargo test --test lifecycle_test

use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, Once};

use modkeeper::application::errors::{FetchError, ModuleError};
use modkeeper::application::services::{
    register_loader_commands, CommandService, InstallAllOutcome, ModuleManager,
};
use modkeeper::domain::entities::{Message, ModuleReference};
use modkeeper::domain::traits::{Fetcher, ModuleStore};
use modkeeper::infrastructure::config::Config;
use modkeeper::infrastructure::hashing;
use modkeeper::infrastructure::host::RestartSignal;
use modkeeper::infrastructure::storage::FsModuleStore;

const RAW: &str = "https://raw.githubusercontent.com/The-MoonTg-project/custom_modules/main";
const LISTING: &str = "https://api.github.com/repos/The-MoonTg-project/custom_modules/contents/";

static INIT: Once = Once::new();

fn ensure_init() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

/// Registry stand-in: canned bodies, 404 for anything else
#[derive(Default)]
struct Registry {
    files: Mutex<HashMap<String, Vec<u8>>>,
    hits: Mutex<Vec<String>>,
}

impl Registry {
    fn serve(&self, url: &str, body: &[u8]) {
        self.files.lock().unwrap().insert(url.to_string(), body.to_vec());
    }

    fn hits(&self) -> Vec<String> {
        self.hits.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for Registry {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.hits.lock().unwrap().push(url.to_string());
        self.files
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or(FetchError::Status(404))
    }
}

struct Bot {
    _dir: tempfile::TempDir,
    registry: Arc<Registry>,
    store: Arc<FsModuleStore>,
    signal: Arc<RestartSignal>,
    manager: Arc<ModuleManager>,
}

fn bot() -> Bot {
    ensure_init();
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.modules.directory = dir.path().join("modules").join("custom_modules");

    let registry = Arc::new(Registry::default());
    let store = Arc::new(FsModuleStore::new(&config.modules.directory, "py"));
    let signal = Arc::new(RestartSignal::new());
    let manager = Arc::new(ModuleManager::new(&config, registry.clone(), store.clone(), signal.clone()));

    Bot { _dir: dir, registry, store, signal, manager }
}

#[tokio::test]
async fn test_install_all_into_empty_store() {
    let bot = bot();
    let listing = serde_json::json!([
        {"name": "weather.py", "type": "file", "download_url": format!("{}/weather.py", RAW)}
    ]);
    bot.registry.serve(LISTING, listing.to_string().as_bytes());
    bot.registry.serve(&format!("{}/weather.py", RAW), b"async def weather(): ...");

    let outcome = bot.manager.install_all_missing().await.unwrap();

    assert_eq!(outcome.added(), BTreeSet::from(["weather".to_string()]));
    assert!(bot.store.base_path().join("weather.py").is_file());
    assert!(bot.signal.is_requested());
    assert_eq!(outcome.to_string(), "Successfully loaded new modules: weather");
}

#[tokio::test]
async fn test_partial_registry_failure_skips_only_broken_module() {
    let bot = bot();
    let listing = serde_json::json!([
        {"name": "a.py", "type": "file", "download_url": format!("{}/a.py", RAW)},
        {"name": "b.py", "type": "file", "download_url": format!("{}/b.py", RAW)},
        {"name": "c.py", "type": "file", "download_url": format!("{}/c.py", RAW)},
    ]);
    bot.registry.serve(LISTING, listing.to_string().as_bytes());
    bot.registry.serve(&format!("{}/c.py", RAW), b"c");
    bot.store.put("a", b"a").await.unwrap();

    let outcome = bot.manager.install_all_missing().await.unwrap();

    let InstallAllOutcome::Installed { added, failed } = outcome else {
        panic!("expected installs");
    };
    assert_eq!(added, BTreeSet::from(["c".to_string()]));
    assert_eq!(failed, BTreeSet::from(["b".to_string()]));
    let installed: Vec<String> = bot.store.list().await.unwrap().into_iter().collect();
    assert_eq!(installed, vec!["a".to_string(), "c".to_string()]);
}

#[tokio::test]
async fn test_install_remove_round_trip() {
    let bot = bot();
    bot.registry.serve(&format!("{}/time.py", RAW), b"tz");
    let before = bot.store.list().await.unwrap();

    let installed = bot.manager.install(&ModuleReference::parse("TIME")).await.unwrap();
    assert_eq!(installed.digest, hashing::digest(b"tz"));
    bot.manager.remove("time").await.unwrap();

    assert_eq!(bot.store.list().await.unwrap(), before);
    assert!(bot.manager.catalog().entries().is_empty());
}

#[tokio::test]
async fn test_unreachable_url_never_touches_store() {
    let bot = bot();

    let err = bot
        .manager
        .install(&ModuleReference::parse("https://example.org/mods/missing.py"))
        .await
        .unwrap_err();

    assert!(matches!(err, ModuleError::NotFound(_)));
    assert!(bot.store.list().await.unwrap().is_empty());
    assert!(!bot.signal.is_requested());
}

#[tokio::test]
async fn test_update_all_empty_store_makes_no_requests() {
    let bot = bot();

    let outcome = bot.manager.update_all_installed().await.unwrap();

    assert_eq!(outcome.to_string(), "No modules installed");
    assert!(bot.registry.hits().is_empty());
}

#[tokio::test]
async fn test_chat_commands_end_to_end() {
    let bot = bot();
    bot.registry.serve(&format!("{}/ai_ask.py", RAW), b"ask");
    let mut commands = CommandService::new(".");
    commands.register_defaults();
    register_loader_commands(&mut commands, bot.manager.clone());

    let hash = commands
        .handle(&Message::from_command("me", "mh", vec![format!("{}/ai_ask.py", RAW)]))
        .await
        .unwrap()
        .unwrap();
    assert!(hash.contains(&hashing::digest(b"ask")));
    assert!(hash.ends_with("File: ai_ask.py"));
    assert!(!bot.signal.is_requested());

    let loaded = commands
        .handle(&Message::from_command("me", "loadmod", vec![format!("{}/ai_ask.py", RAW)]))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded, "The module ai_ask is loaded!");
    assert!(bot.signal.is_requested());

    let listed = commands
        .handle(&Message::from_command("me", "listmods", vec![]))
        .await
        .unwrap()
        .unwrap();
    assert!(listed.contains("ai_ask"));
}
