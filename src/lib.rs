//! Locate Go tests in `_test.go` files and build the `go test` commands that run them.

mod command;
pub use command::{TestCommand, build_go_test_command, ensure_available, go_run_pattern};

mod config;
pub use config::{Config, GO_ENV, QUIET_ENV, TAGS_ENV};

mod engine;
pub use engine::Engine;

mod error;
pub use error::{Error, Result};

mod framework;
pub use framework::{Framework, FrameworkProvider};

mod golang;
pub use golang::GotestProvider;

mod registry;
pub use registry::FrameworkRegistry;

mod types;
pub use types::{
    Buffer, Capability, CapabilityDetails, CursorPosition, Language, Runnable, RunnableMeta,
    Search, Target,
};

mod util;
pub use util::Delimiter;
