use async_trait::async_trait;

/// Host process controls the module manager relies on
pub trait Host: Send + Sync {
    /// Ask the host to reinitialize so module-set changes take effect.
    /// Fire-and-forget.
    fn request_restart(&self);
}

/// Hook run after a module file has been removed from the store
#[async_trait]
pub trait RemoveHook: Send + Sync {
    /// Module name this hook is attached to
    fn module_name(&self) -> &str;

    /// Clean up whatever the module brought along. Failures are reported, not fatal.
    async fn after_remove(&self) -> Result<(), String>;
}
