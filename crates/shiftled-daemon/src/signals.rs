//! Signal handling for graceful shutdown.
//!
//! SIGINT and SIGTERM must not abort an in-flight tick, so the handlers
//! only set an atomic flag (the only async-signal-safe work allowed); a
//! small bridge thread propagates the flag into the loop's cancellation
//! token.

use shiftled_runtime::CancelToken;
use tracing::{debug, info};

/// Handle for the installed signal bridge.
pub struct SignalHandler {
    token: CancelToken,
}

impl SignalHandler {
    /// Register handlers for SIGINT and SIGTERM and start the bridge
    /// thread that trips `token` when either arrives.
    ///
    /// On non-Unix platforms only manual cancellation is supported.
    pub fn install(token: CancelToken) -> std::io::Result<Self> {
        let handler = Self {
            token: token.clone(),
        };

        #[cfg(unix)]
        handler.register_unix_handlers()?;

        Ok(handler)
    }

    #[cfg(unix)]
    fn register_unix_handlers(&self) -> std::io::Result<()> {
        use std::os::raw::c_int;
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::time::Duration;

        static INTERRUPT_FLAG: AtomicBool = AtomicBool::new(false);

        extern "C" fn interrupt_handler(_: c_int) {
            INTERRUPT_FLAG.store(true, Ordering::Relaxed);
        }

        // SAFETY: installing a handler that performs a single atomic store
        unsafe {
            libc::signal(libc::SIGINT, interrupt_handler as libc::sighandler_t);
            libc::signal(libc::SIGTERM, interrupt_handler as libc::sighandler_t);
        }

        // Bridge thread: polls the async-signal-safe flag and forwards it
        // into the cancellation token, then exits.
        let token = self.token.clone();
        std::thread::Builder::new()
            .name("shiftled-signals".into())
            .spawn(move || {
                loop {
                    if INTERRUPT_FLAG.swap(false, Ordering::Relaxed) {
                        info!("interrupt received, requesting cancellation");
                        token.cancel();
                    }
                    if token.is_cancelled() {
                        break;
                    }
                    std::thread::sleep(Duration::from_millis(10));
                }
            })?;

        debug!("Unix signal handlers registered");
        Ok(())
    }

    /// Manually request cancellation (used on non-signal shutdown paths so
    /// the bridge thread also winds down).
    pub fn cancel(&self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_and_manual_cancel() {
        let token = CancelToken::new();
        let handler = SignalHandler::install(token.clone()).unwrap();

        assert!(!token.is_cancelled());
        handler.cancel();
        assert!(token.is_cancelled());
    }
}
