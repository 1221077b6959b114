use anyhow::Context;
use log::{info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;

/// Set once an operator asks the station to stop; checked between cycles.
#[derive(Clone, Default)]
pub struct ShutdownFlag(Arc<AtomicBool>);

impl ShutdownFlag {
    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Waits for Ctrl+C (and SIGTERM on unix) on a background thread.
pub fn install(flag: ShutdownFlag) -> anyhow::Result<()> {
    let runtime = TokioBuilder::new_current_thread()
        .enable_all()
        .build()
        .context("creating runtime for signal handling")?;
    thread::Builder::new()
        .name("signals".into())
        .spawn(move || {
            runtime.block_on(async move {
                if wait_for_interrupt().await {
                    info!("stop requested; finishing the current cycle");
                    flag.request();
                }
            })
        })
        .context("spawning signal thread")?;
    Ok(())
}

/// Returns false when no handler could be registered.
async fn ctrl_c() -> bool {
    match signal::ctrl_c().await {
        Ok(()) => true,
        Err(err) => {
            warn!("awaiting Ctrl+C failed: {}", err);
            false
        }
    }
}

#[cfg(unix)]
async fn wait_for_interrupt() -> bool {
    use tokio::signal::unix::{signal as unix_signal, SignalKind};

    match unix_signal(SignalKind::terminate()) {
        Ok(mut terminate) => {
            tokio::select! {
                received = ctrl_c() => received,
                _ = terminate.recv() => true,
            }
        }
        Err(err) => {
            warn!("SIGTERM handler unavailable: {}", err);
            ctrl_c().await
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_interrupt() -> bool {
    ctrl_c().await
}
