use dashmap::DashMap;

#[derive(Debug, thiserror::Error)]
#[error("unknown scale `{0}`")]
pub struct UnknownScale(pub String);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScaleInfo {
    pub name: &'static str,
    pub category: &'static str,
    pub enabled: bool,
}

/// Keeps track of every loaded scale and whether it is currently enabled.
#[derive(Default)]
pub struct ScaleRegistry {
    scales: DashMap<&'static str, ScaleInfo>,
}

impl ScaleRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a scale, it starts disabled if its name is part of `disabled`.
    pub fn register(&self, category: &'static str, name: &'static str, disabled: &[String]) {
        let enabled = !disabled
            .iter()
            .any(|d| d.eq_ignore_ascii_case(name) || *d == format!("{category}/{name}"));
        if !enabled {
            tracing::info!("Scale {category}/{name} is disabled");
        }

        self.scales.insert(name, ScaleInfo {
            name,
            category,
            enabled,
        });
    }

    /// Unknown scales are treated as enabled, commands outside of a scale are always allowed.
    #[must_use]
    pub fn is_enabled(&self, name: &str) -> bool {
        self.scales.get(name).map_or(true, |s| s.enabled)
    }

    /// Returns whether the state changed.
    pub fn set_enabled(&self, name: &str, enabled: bool) -> Result<bool, UnknownScale> {
        let mut scale = self
            .scales
            .get_mut(name)
            .ok_or_else(|| UnknownScale(name.to_owned()))?;

        let changed = scale.enabled != enabled;
        scale.enabled = enabled;
        Ok(changed)
    }

    /// Every registered scale, sorted by category and name.
    #[must_use]
    pub fn list(&self) -> Vec<ScaleInfo> {
        let mut scales: Vec<_> = self.scales.iter().map(|s| s.value().clone()).collect();
        scales.sort_by_key(|s| (s.category, s.name));
        scales
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.scales.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scales.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_from_config() {
        let registry = ScaleRegistry::new();
        let disabled = vec!["quiz".to_string(), "misc/leet".to_string()];
        registry.register("social", "money", &disabled);
        registry.register("events", "quiz", &disabled);
        registry.register("misc", "leet", &disabled);

        assert!(registry.is_enabled("money"));
        assert!(!registry.is_enabled("quiz"));
        assert!(!registry.is_enabled("leet"));
        assert!(registry.is_enabled("not-a-scale"));
    }

    #[test]
    fn toggling() {
        let registry = ScaleRegistry::new();
        registry.register("social", "money", &[]);

        assert!(registry.set_enabled("money", false).unwrap());
        assert!(!registry.set_enabled("money", false).unwrap());
        assert!(!registry.is_enabled("money"));
        assert!(registry.set_enabled("money", true).unwrap());
        assert!(registry.set_enabled("nope", true).is_err());
    }

    #[test]
    fn list_is_sorted() {
        let registry = ScaleRegistry::new();
        registry.register("social", "money", &[]);
        registry.register("development", "debug", &[]);
        registry.register("social", "inventory", &[]);

        let names: Vec<_> = registry.list().into_iter().map(|s| s.name).collect();
        assert_eq!(names, ["debug", "inventory", "money"]);
        assert_eq!(registry.len(), 3);
    }
}
