use krbmv_types::CacheName;
use serde::{Deserialize, Serialize};

use crate::error::{MigrateError, MigrateResult};

/// Inputs of one migration run.
///
/// Everything the engine would otherwise read from the environment is
/// carried here, so runs are reproducible without touching process state.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrateConfig {
    /// Source cache. `None` means the store's default cache.
    pub source: Option<CacheName>,
    /// Destination cache. Required.
    pub target: Option<CacheName>,
    /// Permit overwriting a FILE cache that already holds a principal.
    pub force: bool,
}

impl MigrateConfig {
    pub fn new(target: CacheName) -> Self {
        Self {
            target: Some(target),
            ..Default::default()
        }
    }

    pub fn with_source(mut self, source: CacheName) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// The destination name, or a configuration error if none is set.
    pub fn target_name(&self) -> MigrateResult<&CacheName> {
        match &self.target {
            Some(name) if !name.is_empty() => Ok(name),
            _ => Err(MigrateError::Configuration(
                "no target credential cache name configured".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_no_target() {
        let config = MigrateConfig::default();
        assert!(!config.force);
        assert!(config.source.is_none());
        assert!(matches!(
            config.target_name(),
            Err(MigrateError::Configuration(_))
        ));
    }

    #[test]
    fn empty_target_is_a_configuration_error() {
        let config = MigrateConfig::new(CacheName::new(Vec::new()));
        assert!(matches!(
            config.target_name(),
            Err(MigrateError::Configuration(_))
        ));
    }

    #[test]
    fn builder_sets_fields() {
        let config = MigrateConfig::new(CacheName::from("DIR:/run/cc"))
            .with_source(CacheName::from("FILE:/tmp/krb5cc_1000"))
            .with_force(true);
        assert_eq!(config.target_name().unwrap(), &CacheName::from("DIR:/run/cc"));
        assert_eq!(config.source, Some(CacheName::from("FILE:/tmp/krb5cc_1000")));
        assert!(config.force);
    }
}
