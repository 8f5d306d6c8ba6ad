//! Logging helpers for the JS-facing layer.
//!
//! On wasm32 these write to the browser console; elsewhere they forward to
//! `tracing` so native tests and tools never touch JS imports.

/// Log to browser console
#[macro_export]
macro_rules! console_log {
    ($($t:tt)*) => {{
        #[cfg(target_arch = "wasm32")]
        web_sys::console::log_1(&format!($($t)*).into());
        #[cfg(not(target_arch = "wasm32"))]
        tracing::info!("{}", format!($($t)*));
    }};
}

/// Warn in browser console
#[macro_export]
macro_rules! console_warn {
    ($($t:tt)*) => {{
        #[cfg(target_arch = "wasm32")]
        web_sys::console::warn_1(&format!($($t)*).into());
        #[cfg(not(target_arch = "wasm32"))]
        tracing::warn!("{}", format!($($t)*));
    }};
}
