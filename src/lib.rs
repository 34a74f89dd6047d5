// Library surface for headless/integration tests and reuse.
// The binary in main.rs only adds argument parsing and terminal setup.
pub mod app;
pub mod app_dirs;
pub mod clock;
pub mod config;
pub mod content;
pub mod error;
pub mod history;
pub mod logging;
pub mod runtime;
pub mod session;
pub mod ui;
pub mod util;
