//! Process-wide error capture
//!
//! Two channels feed the global session:
//! - panics, through a panic hook installed by [`Diagnostics::install_global_handler`]
//! - failed or panicked background tasks started with [`Diagnostics::spawn_monitored`]
//!
//! Both only record. Control flow is never altered. A panic inside a
//! monitored task is recorded exactly once: by the hook if one was installed
//! when it panicked, otherwise by the monitor.

use crate::entry::ErrorDetails;
use crate::service::Diagnostics;
use std::future::Future;
use std::panic::PanicHookInfo;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio::task::JoinHandle;

type PanicHook = dyn Fn(&PanicHookInfo<'_>) + Send + Sync + 'static;

static INSTALLED: AtomicBool = AtomicBool::new(false);

tokio::task_local! {
    /// Set by the panic hook when it records a panic of a monitored task
    static PANIC_RECORDED: Arc<AtomicBool>;
}

/// Global handler errors
#[derive(Debug, thiserror::Error)]
pub enum GlobalHandlerError {
    /// A handler is already installed in this process
    #[error("global error handler already installed")]
    AlreadyInstalled,
}

/// Keeps the panic hook installed; dropping it restores the previous hook
#[must_use = "dropping the guard uninstalls the global handler"]
pub struct GlobalHandlerGuard {
    previous: Arc<PanicHook>,
}

impl std::fmt::Debug for GlobalHandlerGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlobalHandlerGuard").finish_non_exhaustive()
    }
}

impl Drop for GlobalHandlerGuard {
    fn drop(&mut self) {
        let previous = Arc::clone(&self.previous);
        std::panic::set_hook(Box::new(move |info| previous(info)));
        INSTALLED.store(false, Ordering::SeqCst);
        tracing::debug!("Global error handler uninstalled");
    }
}

/// Whether a global handler is currently installed
#[inline]
#[must_use]
pub fn is_installed() -> bool {
    INSTALLED.load(Ordering::SeqCst)
}

impl Diagnostics {
    /// Install the process-wide panic hook
    ///
    /// The hook records each panic under the global session, then chains to
    /// the hook that was installed before. It holds only a weak reference, so
    /// it never keeps the service alive.
    ///
    /// # Errors
    /// - `GlobalHandlerError::AlreadyInstalled` if another guard is live
    pub fn install_global_handler(
        self: &Arc<Self>,
    ) -> Result<GlobalHandlerGuard, GlobalHandlerError> {
        if INSTALLED
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(GlobalHandlerError::AlreadyInstalled);
        }

        let previous: Arc<PanicHook> = Arc::from(std::panic::take_hook());
        let chained = Arc::clone(&previous);
        let weak: Weak<Diagnostics> = Arc::downgrade(self);

        std::panic::set_hook(Box::new(move |info| {
            if let Some(diagnostics) = weak.upgrade() {
                let location = info
                    .location()
                    .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()));
                diagnostics.report_global(
                    ErrorDetails::new("Panic", panic_message(info)),
                    "panic",
                    location,
                );
                let _ = PANIC_RECORDED
                    .try_with(|recorded| recorded.store(true, Ordering::SeqCst));
            }
            chained(info);
        }));

        tracing::debug!("Global error handler installed");
        Ok(GlobalHandlerGuard { previous })
    }

    /// Spawn a background task whose failure is recorded globally
    ///
    /// `Err` results are recorded with source `task`. Panics are recorded here
    /// only when the panic hook did not already record them.
    /// The returned handle yields `None` when the task failed.
    pub fn spawn_monitored<F, T, E>(
        self: &Arc<Self>,
        name: &'static str,
        future: F,
    ) -> JoinHandle<Option<T>>
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: std::error::Error + Send + 'static,
    {
        let diagnostics = Arc::clone(self);
        let recorded = Arc::new(AtomicBool::new(false));
        let task = tokio::spawn(PANIC_RECORDED.scope(Arc::clone(&recorded), future));

        tokio::spawn(async move {
            match task.await {
                Ok(Ok(value)) => Some(value),
                Ok(Err(error)) => {
                    diagnostics
                        .report_global_async(
                            ErrorDetails::from_error(&error),
                            "task",
                            Some(name.to_string()),
                        )
                        .await;
                    None
                }
                Err(join) if join.is_panic() => {
                    if !recorded.load(Ordering::SeqCst) {
                        diagnostics
                            .report_global_async(
                                ErrorDetails::new("Panic", join.to_string()),
                                "task",
                                Some(name.to_string()),
                            )
                            .await;
                    }
                    None
                }
                Err(_) => {
                    tracing::debug!(task = name, "Monitored task cancelled");
                    None
                }
            }
        })
    }
}

fn panic_message(info: &PanicHookInfo<'_>) -> String {
    let payload = info.payload();
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
