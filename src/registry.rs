use crate::{
    framework::{Framework, FrameworkProvider},
    types::{Capability, Language},
};
use std::collections::BTreeMap;

#[derive(Default)]
pub struct FrameworkRegistry {
    providers: BTreeMap<&'static str, Box<dyn FrameworkProvider>>,
}

impl FrameworkRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `provider`, replacing any provider with the same name.
    pub fn register(&mut self, provider: Box<dyn FrameworkProvider>) {
        self.providers.insert(provider.name(), provider);
    }

    #[must_use]
    pub fn get_framework(&self, name: &str) -> Option<Box<dyn Framework>> {
        self.providers.get(name).map(|provider| provider.create())
    }

    #[must_use]
    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.keys().copied().collect()
    }

    pub fn frameworks(&self) -> impl Iterator<Item = Box<dyn Framework>> + '_ {
        self.providers.values().map(|provider| provider.create())
    }

    #[must_use]
    pub fn frameworks_by_capability_and_language(
        &self,
        capability: Capability,
        language: Language,
    ) -> Vec<Box<dyn Framework>> {
        self.providers
            .values()
            .filter(|provider| provider.capability() == capability && provider.language() == language)
            .map(|provider| provider.create())
            .collect()
    }
}
