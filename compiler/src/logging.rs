//! Log setup for `gmc`
//!
//! Library code only emits through the `log` facade. The binary picks a
//! backend here: an explicit level from `-v` / `--trace`, or `RUST_LOG`
//! when no flag is given.
//!
//! Phases are logged at `info`, per-macro and per-pass detail at `debug`,
//! and each expanded statement or executed instruction at `trace`.
//!
//! ```bash
//! RUST_LOG=compiler::macro_system=debug gmc compile prog.gc
//! RUST_LOG=gmc_runtime=trace gmc run prog.g
//! ```

use env_logger::{Builder, Env};
use log::LevelFilter;
use std::io::Write;
use std::sync::Once;

static INIT: Once = Once::new();

/// `-v` count to level: none warns, then info, debug, trace.
pub fn level_for_verbosity(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Install the backend at a fixed level. Later calls are ignored.
pub fn init_with_level(level: LevelFilter) {
    INIT.call_once(|| {
        Builder::new()
            .filter_level(level)
            .format(|buf, record| {
                writeln!(buf, "[{:5}] {}: {}", record.level(), record.target(), record.args())
            })
            .init();
    });
}

/// Install the backend from `RUST_LOG`, warning level when unset.
pub fn init_from_env() {
    INIT.call_once(|| {
        Builder::from_env(Env::default().default_filter_or("warn")).init();
    });
}

/// Capture-friendly logger for tests; safe to call from every test.
pub fn init_test() {
    let _ = Builder::new()
        .filter_level(LevelFilter::Warn)
        .parse_default_env()
        .is_test(true)
        .try_init();
}
