//! Tracing subscriber set-up shared by the healthwatch binaries.

mod subscriber;

pub use subscriber::{LogFormat, init_tracing, init_tracing_with_level};
