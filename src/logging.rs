//! tracing set-up. `RUST_LOG` filters (default `info`). Native builds also
//! write a daily log file, `RUST_LOG_FILE` picks its location.

use cfg_if::cfg_if;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

cfg_if! {
    if #[cfg(target_arch = "wasm32")] {
        pub fn init() {
            let console = tracing_wasm::WASMLayer::new(tracing_wasm::WASMLayerConfig::default());
            // A second init (hot reload) keeps the first subscriber
            let _ = tracing_subscriber::registry().with(env_filter()).with(console).try_init();

            #[cfg(feature = "console_error_panic_hook")]
            console_error_panic_hook::set_once();
        }
    } else {
        use std::ffi::OsString;
        use std::path::PathBuf;

        use once_cell::sync::OnceCell;
        use tracing_appender::non_blocking::WorkerGuard;
        use tracing_subscriber::fmt;

        const DEFAULT_LOG_FILE: &str = "logs/skydrone.log";

        // Dropping the guard flushes and stops the writer thread
        static LOG_GUARD: OnceCell<WorkerGuard> = OnceCell::new();

        /// Directory and file-name prefix for the rolling appender
        fn log_file_location(path: &str) -> (PathBuf, OsString) {
            let path = PathBuf::from(path);
            let dir = match path.parent() {
                Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
                _ => PathBuf::from("."),
            };
            let prefix = path
                .file_name()
                .map(|name| name.to_os_string())
                .unwrap_or_else(|| OsString::from("skydrone.log"));
            (dir, prefix)
        }

        pub fn init() {
            let path = std::env::var("RUST_LOG_FILE").unwrap_or_else(|_| DEFAULT_LOG_FILE.to_string());
            let (dir, prefix) = log_file_location(&path);
            let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, prefix));
            let _ = LOG_GUARD.set(guard);

            let stderr_layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_file(true)
                .with_line_number(true)
                .compact();
            let file_layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_file(true)
                .with_line_number(true)
                .compact();

            let _ = tracing_subscriber::registry()
                .with(env_filter())
                .with(stderr_layer)
                .with(file_layer)
                .try_init();

            // Route panics into the log file too, with a backtrace
            std::panic::set_hook(Box::new(|info| {
                let backtrace = std::backtrace::Backtrace::force_capture();
                tracing::error!("{info}\nbacktrace:\n{backtrace}");
            }));
        }

    }
}
