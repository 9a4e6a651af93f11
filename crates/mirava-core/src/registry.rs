//! Process-wide registry of mirror managers, one per upstream type

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{info, warn};

use crate::config::MirrorTypeConfig;
use crate::error::CoreError;
use crate::mirror::{Mirror, MirrorManager};

/// Maps upstream type names to their managers.
///
/// Entries are inserted or replaced, never removed.
#[derive(Default)]
pub struct MirrorRegistry {
    managers: RwLock<BTreeMap<String, Arc<MirrorManager>>>,
}

impl MirrorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from the static mirror configuration
    pub fn from_config(types: &[MirrorTypeConfig], max_failures: u32) -> Self {
        let registry = Self::new();

        for mirror_type in types {
            let manager = MirrorManager::new(&mirror_type.name, max_failures);
            if let Some(official_url) = &mirror_type.official_url {
                manager.set_official_url(official_url);
            }
            for mirror in &mirror_type.mirrors {
                manager.add(&mirror.url, &mirror.name, mirror.priority);
            }
            registry.register(&mirror_type.name, Arc::new(manager));
        }

        registry
    }

    /// Insert or replace the manager for `mirror_type`
    pub fn register(&self, mirror_type: &str, manager: Arc<MirrorManager>) {
        let previous = self
            .managers
            .write()
            .insert(mirror_type.to_string(), manager);
        if previous.is_some() {
            warn!("Replaced mirror manager: {}", mirror_type);
        } else {
            info!("Registered mirror manager: {}", mirror_type);
        }
    }

    /// Look up the manager for `mirror_type`
    pub fn get(&self, mirror_type: &str) -> Result<Arc<MirrorManager>, CoreError> {
        self.managers
            .read()
            .get(mirror_type)
            .cloned()
            .ok_or_else(|| CoreError::UnknownMirrorType(mirror_type.to_string()))
    }

    /// Snapshot of the full mapping, ordered by type name
    pub fn list_managers(&self) -> BTreeMap<String, Arc<MirrorManager>> {
        self.managers.read().clone()
    }

    /// Every registered mirror across all types
    pub fn all_mirrors(&self) -> Vec<Arc<Mirror>> {
        self.managers
            .read()
            .values()
            .flat_map(|m| m.mirrors())
            .collect()
    }

    /// Reset mirror `name` of `mirror_type`
    pub fn reset(&self, mirror_type: &str, name: &str) -> Result<(), CoreError> {
        if self.get(mirror_type)?.reset(name) {
            Ok(())
        } else {
            Err(CoreError::MirrorNotFound(format!("{}/{}", mirror_type, name)))
        }
    }

    /// Reset every `Down` mirror in every manager
    pub fn reset_down(&self) -> usize {
        self.list_managers()
            .values()
            .map(|m| m.reset_down())
            .sum()
    }
}

/// Spawn a background task that re-admits `Down` mirrors every `interval_secs`.
///
/// Without this task a `Down` mirror stays excluded until reset by name.
pub fn spawn_recovery_task(
    registry: Arc<MirrorRegistry>,
    interval_secs: u64,
) -> tokio::task::JoinHandle<()> {
    use tokio::time::{Duration, interval};

    info!(
        "Starting background mirror recovery task (interval: {} seconds)",
        interval_secs
    );

    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_secs(interval_secs.max(1)));

        // Skip the first tick (which fires immediately)
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let revived = registry.reset_down();
            if revived > 0 {
                info!("Scheduled recovery: {} mirrors re-admitted", revived);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_mirror_types;
    use crate::mirror::MirrorHealth;

    #[test]
    fn test_from_config_registers_every_type() {
        let registry = MirrorRegistry::from_config(&default_mirror_types(), 3);

        let managers = registry.list_managers();
        assert_eq!(
            managers.keys().cloned().collect::<Vec<_>>(),
            vec!["docker", "pypi"]
        );
        assert_eq!(registry.all_mirrors().len(), 7);

        let pypi = registry.get("pypi").unwrap();
        assert_eq!(pypi.max_failures(), 3);
        assert_eq!(pypi.official().unwrap().url(), "https://pypi.org/simple");
        assert!(pypi.mirrors().iter().all(|m| m.mirror_type() == "pypi"));
    }

    #[test]
    fn test_get_unknown_type() {
        let registry = MirrorRegistry::new();
        assert!(matches!(
            registry.get("npm"),
            Err(CoreError::UnknownMirrorType(t)) if t == "npm"
        ));
    }

    #[test]
    fn test_register_overwrites() {
        let registry = MirrorRegistry::new();
        let first = Arc::new(MirrorManager::new("docker", 3));
        first.add("https://a", "a", 0);
        registry.register("docker", first);
        registry.register("docker", Arc::new(MirrorManager::new("docker", 3)));

        assert_eq!(registry.list_managers().len(), 1);
        assert_eq!(registry.get("docker").unwrap().mirror_count(), 0);
    }

    #[test]
    fn test_list_managers_is_a_snapshot() {
        let registry = MirrorRegistry::new();
        let snapshot = registry.list_managers();
        registry.register("docker", Arc::new(MirrorManager::new("docker", 3)));
        assert!(snapshot.is_empty());
    }

    #[test]
    fn test_reset_by_type_and_name() {
        let registry = MirrorRegistry::from_config(&default_mirror_types(), 1);
        let docker = registry.get("docker").unwrap();
        let ustc = docker.mirrors()[1].clone();
        docker.mark_failure(&ustc, "HTTP 500");
        assert_eq!(ustc.health(), MirrorHealth::Down);

        registry.reset("docker", "ustc").unwrap();
        assert_eq!(ustc.health(), MirrorHealth::Healthy);

        assert!(matches!(
            registry.reset("docker", "nope"),
            Err(CoreError::MirrorNotFound(_))
        ));
        assert!(matches!(
            registry.reset("npm", "ustc"),
            Err(CoreError::UnknownMirrorType(_))
        ));
    }

    #[test]
    fn test_reset_official_fallback_by_name() {
        let registry = MirrorRegistry::from_config(&default_mirror_types(), 1);
        let docker = registry.get("docker").unwrap();
        let official = docker.official().unwrap();
        docker.mark_failure(&official, "HTTP 503");

        registry.reset("docker", "docker-official").unwrap();

        assert_eq!(official.health(), MirrorHealth::Healthy);
        assert!(
            docker
                .healthy_mirrors()
                .iter()
                .any(|m| m.name() == "docker-official")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovery_task_readmits_down_mirrors() {
        let registry = Arc::new(MirrorRegistry::from_config(&default_mirror_types(), 1));
        let docker = registry.get("docker").unwrap();
        let first = docker.mirrors()[0].clone();
        docker.mark_failure(&first, "timeout");

        let handle = spawn_recovery_task(registry.clone(), 30);

        tokio::time::sleep(std::time::Duration::from_secs(31)).await;
        tokio::task::yield_now().await;

        assert_eq!(first.health(), MirrorHealth::Healthy);
        handle.abort();
    }
}
