use crate::{
    Error, Result,
    command::TestCommand,
    config::Config,
    framework::Framework,
    golang::GotestProvider,
    registry::FrameworkRegistry,
    types::{Buffer, Capability, CursorPosition, Runnable, Search, Target},
};
use log::{debug, warn};
use std::{
    collections::{BTreeMap, btree_map::Entry},
    ffi::OsStr,
    fs::read_to_string,
    path::Path,
};
use walkdir::{DirEntry, WalkDir};

/// Directories the go tool never looks inside.
const SKIPPED_DIRS: &[&str] = &["vendor", "testdata"];

pub struct Engine {
    registry: FrameworkRegistry,
}

impl Engine {
    #[must_use]
    pub fn initialize() -> Self {
        let mut registry = FrameworkRegistry::new();
        registry.register(Box::new(GotestProvider::new()));
        Self { registry }
    }

    #[must_use]
    pub fn registry(&self) -> &FrameworkRegistry {
        &self.registry
    }

    fn detect(&self, target: &Target) -> Option<Box<dyn Framework>> {
        self.registry
            .frameworks()
            .find(|framework| framework.detect(target))
    }

    /// Runnables of `target`, from the first framework that recognizes it.
    pub fn runnables(&self, target: &Target) -> Result<Vec<Runnable>> {
        let Some(framework) = self.detect(target) else {
            return Err(Error::Undetected(target.buffer.filepath.clone()));
        };
        framework.runnables(target)
    }

    /// One command per runnable, in order, each from the framework that found it.
    pub fn commands(&self, runnables: &[Runnable], config: &Config) -> Result<Vec<TestCommand>> {
        let mut frameworks: BTreeMap<&str, Box<dyn Framework>> = BTreeMap::new();
        let mut commands = Vec::with_capacity(runnables.len());
        for runnable in runnables {
            let framework = match frameworks.entry(runnable.framework) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    let Some(framework) = self.registry.get_framework(runnable.framework) else {
                        return Err(Error::Undetected(runnable.filepath.clone()));
                    };
                    entry.insert(framework)
                }
            };
            commands.push(framework.generate_command(runnable, config));
        }
        Ok(commands)
    }

    /// Every runnable in the test files below `dir`, sorted by path.
    pub fn directory_runnables(&self, dir: &Path) -> Result<Vec<Runnable>> {
        let mut runnables = Vec::new();
        let walker = WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_skipped_dir(entry));
        for result in walker {
            let entry = result.map_err(|source| Error::Walk {
                path: dir.to_path_buf(),
                source,
            })?;
            let path = entry.path();
            if !entry.file_type().is_file() || !is_go_test_file(path) {
                continue;
            }
            let content = read_to_string(path).map_err(|source| Error::Io {
                path: path.to_path_buf(),
                source,
            })?;
            let buffer = Buffer::new(&content, path, CursorPosition::default());
            let mut target = Target::new(Capability::TestRunner, buffer);
            target.override_search_strategy(Search::Directory);
            let Some(framework) = self.detect(&target) else {
                debug!("skipping `{}`", path.display());
                continue;
            };
            match framework.runnables(&target) {
                Ok(found) => runnables.extend(found),
                Err(Error::NotFound(_)) => debug!("no tests in `{}`", path.display()),
                Err(error) => warn!("skipping `{}`: {error}", path.display()),
            }
        }
        if runnables.is_empty() {
            return Err(Error::NotFound(format!(
                "no Go tests below `{}`",
                dir.display()
            )));
        }
        runnables.sort_by(|left, right| left.filepath.cmp(&right.filepath));
        Ok(runnables)
    }
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || name.starts_with('_') || SKIPPED_DIRS.contains(&name.as_ref())
}

fn is_go_test_file(path: &Path) -> bool {
    path.file_name()
        .and_then(OsStr::to_str)
        .is_some_and(|name| name.ends_with("_test.go"))
}
