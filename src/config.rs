use std::env::var;

pub const GO_ENV: &str = "TEST_LOCATOR_GO";
pub const TAGS_ENV: &str = "TEST_LOCATOR_TAGS";
pub const QUIET_ENV: &str = "TEST_LOCATOR_QUIET";

/// Settings that shape the generated `go test` commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Program invoked in place of `go`
    pub go_program: String,
    /// Build tags added to every command, after the file's own
    pub extra_tags: Vec<String>,
    /// Pass `-v` to `go test`
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            go_program: String::from("go"),
            extra_tags: Vec::new(),
            verbose: true,
        }
    }
}

impl Config {
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(go_program) = var(GO_ENV).ok().filter(|value| !value.trim().is_empty()) {
            config.go_program = go_program;
        }
        if let Ok(tags) = var(TAGS_ENV) {
            config.extra_tags = split_tags(&tags);
        }
        config.verbose = !enabled(QUIET_ENV);
        config
    }
}

fn split_tags(tags: &str) -> Vec<String> {
    tags.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

fn enabled(key: &str) -> bool {
    var(key).is_ok_and(|value| value != "0")
}
