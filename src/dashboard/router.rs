//! Router Module
//! Maps a category label to its dashboard, building it on first selection.

use crate::config::AppConfig;
use crate::dashboard::cache::DatasetCache;
use crate::dashboard::dashboard::Dashboard;
use crate::error::{DashboardError, Result};
use std::collections::hash_map::Entry;
use std::collections::HashMap;

pub struct Router {
    config: AppConfig,
    cache: DatasetCache,
    dashboards: HashMap<String, Dashboard>,
}

impl Router {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            cache: DatasetCache::new(),
            dashboards: HashMap::new(),
        }
    }

    /// Category labels in catalog order.
    pub fn categories(&self) -> Vec<&str> {
        self.config
            .dashboards
            .iter()
            .map(|d| d.label.as_str())
            .collect()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn cache(&self) -> &DatasetCache {
        &self.cache
    }

    /// Whether the dashboard for `label` has been built.
    pub fn is_open(&self, label: &str) -> bool {
        self.dashboards.contains_key(label)
    }

    /// The dashboard for `label`. A construction failure is returned and not
    /// kept, so the next selection tries again.
    pub fn select(&mut self, label: &str) -> Result<&mut Dashboard> {
        match self.dashboards.entry(label.to_string()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let config = self
                    .config
                    .dashboard(label)
                    .ok_or_else(|| DashboardError::Config(format!("unknown category '{}'", label)))?;
                let dashboard = Dashboard::open(config, &self.cache, &self.config.data_dir)
                    .map_err(|e| {
                        tracing::error!("Cannot open dashboard '{}': {}", label, e);
                        e
                    })?;
                Ok(entry.insert(dashboard))
            }
        }
    }
}
