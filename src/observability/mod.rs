//! Observability: structured logging setup and span macros

pub mod logging;

pub use logging::{init_default_logging, init_logging, level_for_verbosity, parse_level, LogFormat};

pub use logging::mqtt_span;
