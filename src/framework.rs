use crate::{
    Result,
    command::TestCommand,
    config::Config,
    types::{Capability, CapabilityDetails, Language, Runnable, Search, Target},
};
use std::collections::HashSet;

pub trait Framework {
    fn detect(&self, target: &Target) -> bool;
    fn runnables(&self, target: &Target) -> Result<Vec<Runnable>>;
    fn generate_command(&self, runnable: &Runnable, config: &Config) -> TestCommand;
    fn capabilities(&self) -> &HashSet<CapabilityDetails>;

    fn search_for_capability(&self, description: &str) -> Option<CapabilityDetails> {
        self.capabilities()
            .iter()
            .find(|details| details.description == description)
            .cloned()
    }

    fn supports(&self, search: Search) -> bool {
        self.capabilities()
            .iter()
            .any(|details| details.search == search)
    }
}

pub trait FrameworkProvider {
    fn create(&self) -> Box<dyn Framework>;
    fn name(&self) -> &'static str;
    fn language(&self) -> Language;
    fn capability(&self) -> Capability;
}
