//! Host process integration - restart signalling and post-remove cleanup

pub mod companion;

use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

use crate::domain::traits::Host;

pub use companion::CompanionCleanup;

/// Restart request shared between the module manager and the run loop
#[derive(Default)]
pub struct RestartSignal {
    requested: AtomicBool,
    notify: Notify,
}

impl RestartSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Resolve once a restart has been requested
    pub async fn wait(&self) {
        while !self.is_requested() {
            self.notify.notified().await;
        }
    }
}

impl Host for RestartSignal {
    fn request_restart(&self) {
        if !self.requested.swap(true, Ordering::SeqCst) {
            tracing::info!("Restart requested");
        }
        self.notify.notify_one();
    }
}

/// Replace the current process with a fresh copy of itself, same arguments.
///
/// Only returns on failure.
pub fn restart_process() -> std::io::Error {
    let exe = match std::env::current_exe() {
        Ok(exe) => exe,
        Err(e) => return e,
    };
    let args: Vec<std::ffi::OsString> = std::env::args_os().skip(1).collect();
    tracing::info!("Restarting {}", exe.display());

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        std::process::Command::new(exe).args(args).exec()
    }

    #[cfg(not(unix))]
    {
        match std::process::Command::new(exe).args(args).spawn() {
            Ok(_) => std::process::exit(0),
            Err(e) => e,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_wait_resolves_after_request() {
        let signal = Arc::new(RestartSignal::new());
        assert!(!signal.is_requested());

        let waiter = {
            let signal = signal.clone();
            tokio::spawn(async move { signal.wait().await })
        };
        signal.request_restart();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("wait resolved")
            .unwrap();
        assert!(signal.is_requested());
    }

    #[tokio::test]
    async fn test_wait_returns_immediately_when_already_requested() {
        let signal = RestartSignal::new();
        signal.request_restart();
        signal.request_restart();
        tokio::time::timeout(Duration::from_millis(100), signal.wait())
            .await
            .expect("already requested");
    }
}
