//! Runtime settings shared by the registry, generators and session.
//!
//! Settings are a small set of flags read on every operation, so they are
//! stored as atomics and shared as `Arc<Settings>`. Any combination of flags
//! is valid and may be changed while the library is in use.
//!
//! # Environment Variables
//!
//! - `AORM_DEBUG=1` - Log every generated statement
//! - `AORM_SUPPORT_EXTEND=0` - Map only an entity's own columns
//! - `AORM_EXACT_UPSERT=1` - Decide insert-or-update by querying the key

use std::env;
use std::sync::atomic::{AtomicBool, Ordering};

/// Tag attached to every log event emitted by the library.
pub const LOG_TAG: &str = "AORM";

/// Library-wide behaviour flags.
#[derive(Debug)]
pub struct Settings {
    debug: AtomicBool,
    support_extend: AtomicBool,
    exact_insert_or_update: AtomicBool,
}

impl Default for Settings {
    fn default() -> Self {
        Self::new()
    }
}

impl Settings {
    /// Create settings with the defaults: debug off, extend on, fast upsert.
    pub const fn new() -> Self {
        Self {
            debug: AtomicBool::new(false),
            support_extend: AtomicBool::new(true),
            exact_insert_or_update: AtomicBool::new(false),
        }
    }

    /// Create settings from the defaults, overridden by `AORM_*` variables.
    ///
    /// Unrecognized values leave the default in place.
    pub fn from_env() -> Self {
        let settings = Self::new();
        if let Some(v) = env_flag("AORM_DEBUG") {
            settings.set_debug(v);
        }
        if let Some(v) = env_flag("AORM_SUPPORT_EXTEND") {
            settings.set_support_extend(v);
        }
        if let Some(v) = env_flag("AORM_EXACT_UPSERT") {
            settings.set_exact_insert_or_update(v);
        }
        settings
    }

    /// Whether generated SQL is logged.
    #[inline]
    pub fn debug(&self) -> bool {
        self.debug.load(Ordering::Acquire)
    }

    pub fn set_debug(&self, value: bool) {
        self.debug.store(value, Ordering::Release);
    }

    /// Whether entities inherit the columns of their base entity.
    #[inline]
    pub fn support_extend(&self) -> bool {
        self.support_extend.load(Ordering::Acquire)
    }

    pub fn set_support_extend(&self, value: bool) {
        self.support_extend.store(value, Ordering::Release);
    }

    /// Whether insert-or-update checks for an existing row before deciding.
    #[inline]
    pub fn exact_insert_or_update(&self) -> bool {
        self.exact_insert_or_update.load(Ordering::Acquire)
    }

    pub fn set_exact_insert_or_update(&self, value: bool) {
        self.exact_insert_or_update.store(value, Ordering::Release);
    }
}

fn env_flag(name: &str) -> Option<bool> {
    let raw = env::var(name).ok()?;
    let parsed = parse_flag(&raw);
    if parsed.is_none() {
        tracing::warn!(tag = LOG_TAG, var = name, value = %raw, "ignoring unrecognized flag value");
    }
    parsed
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
