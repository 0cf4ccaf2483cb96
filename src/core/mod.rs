//! Core infrastructure module for foldeval.
//!
//! - [`types`]: class ids, fold indices, group keys
//! - [`constants`]: defaults shared across the crate
//! - [`error`]: the error taxonomy
//! - [`traits`]: interfaces to the external model-fitting harness

pub mod constants;
pub mod error;
pub mod traits;
pub mod types;

pub use constants::*;
pub use error::{FoldEvalError, Result};
pub use traits::*;
pub use types::*;

use std::sync::atomic::{AtomicBool, Ordering};

static CORE_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Initialize logging. Safe to call more than once.
pub fn initialize_core() -> Result<()> {
    if CORE_INITIALIZED.load(Ordering::Acquire) {
        return Ok(());
    }

    // env_logger may already be installed by the host application
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();

    CORE_INITIALIZED.store(true, Ordering::Release);
    log::debug!("foldeval {} initialized", FOLDEVAL_VERSION);
    Ok(())
}

/// Check if [`initialize_core`] has run
pub fn is_core_initialized() -> bool {
    CORE_INITIALIZED.load(Ordering::Acquire)
}
