//! Save-format version migration chain.
//!
//! A registry of pure JSON transforms, each upgrading a document by exactly
//! one version. Loading runs every step above the document's version in
//! ascending order. Shipped steps are never removed.

use std::collections::BTreeMap;

use serde_json::Value as Json;

use crate::steps;

/// The schema version this build reads and writes.
pub const CURRENT_VERSION: u32 = 10;

/// Errors that can occur during migration.
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("no migration path from version {from} to version {to}")]
    NoMigrationPath { from: u32, to: u32 },
    #[error("migration to version {version} ({name}) failed: {reason}")]
    StepFailed {
        version: u32,
        name: &'static str,
        reason: String,
    },
}

/// A transform taking data at `version - 1` to `version`.
pub type UpgradeFn = fn(Json) -> Result<Json, String>;

#[derive(Debug, Clone, Copy)]
pub struct MigrationStep {
    /// The version this step produces.
    pub version: u32,
    pub name: &'static str,
    pub upgrade: UpgradeFn,
}

/// Registry of migration steps keyed by the version they produce.
#[derive(Debug, Default)]
pub struct MigrationChain {
    steps: BTreeMap<u32, MigrationStep>,
}

impl MigrationChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every step from the first save format to [`CURRENT_VERSION`].
    pub fn standard() -> Self {
        let mut chain = Self::new();
        for step in steps::all() {
            chain.register(step);
        }
        chain
    }

    pub fn register(&mut self, step: MigrationStep) {
        self.steps.insert(step.version, step);
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub fn steps(&self) -> impl Iterator<Item = &MigrationStep> {
        self.steps.values()
    }

    /// Whether every step from `from + 1` through `to` is registered.
    pub fn can_migrate(&self, from: u32, to: u32) -> bool {
        if from >= to {
            return from == to;
        }
        (from + 1..=to).all(|v| self.steps.contains_key(&v))
    }

    /// Upgrade a document from `from` to `to`, updating its `version` field
    /// after each step. Data already at `to` is returned unchanged.
    pub fn migrate(&self, mut doc: Json, from: u32, to: u32) -> Result<Json, MigrationError> {
        if from > to || !self.can_migrate(from, to) {
            return Err(MigrationError::NoMigrationPath { from, to });
        }
        for version in from + 1..=to {
            let step = self.steps[&version];
            doc = (step.upgrade)(doc).map_err(|reason| MigrationError::StepFailed {
                version,
                name: step.name,
                reason,
            })?;
            if let Some(obj) = doc.as_object_mut() {
                obj.insert("version".into(), Json::from(version));
            }
            tracing::info!(version, step = step.name, "applied save migration");
        }
        Ok(doc)
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tag(mut doc: Json) -> Result<Json, String> {
        let seen = doc["version"].clone();
        doc["trail"].as_array_mut().ok_or("no trail")?.push(seen);
        Ok(doc)
    }

    fn broken(_: Json) -> Result<Json, String> {
        Err("malformed legacy data".into())
    }

    fn step(version: u32, upgrade: UpgradeFn) -> MigrationStep {
        MigrationStep {
            version,
            name: "test",
            upgrade,
        }
    }

    // -----------------------------------------------------------------------
    // Registry
    // -----------------------------------------------------------------------

    #[test]
    fn standard_chain_covers_every_version() {
        let chain = MigrationChain::standard();
        assert_eq!(chain.step_count(), CURRENT_VERSION as usize);
        for v in 0..CURRENT_VERSION {
            assert!(chain.can_migrate(v, CURRENT_VERSION), "no path from {v}");
        }
        let versions: Vec<u32> = chain.steps().map(|s| s.version).collect();
        assert_eq!(versions, (1..=CURRENT_VERSION).collect::<Vec<_>>());
    }

    #[test]
    fn gaps_and_backwards_have_no_path() {
        let mut chain = MigrationChain::new();
        chain.register(step(1, tag));
        chain.register(step(3, tag));
        assert!(chain.can_migrate(0, 1));
        assert!(!chain.can_migrate(0, 3));
        assert!(!chain.can_migrate(3, 1));
        assert!(chain.can_migrate(2, 2));
    }

    // -----------------------------------------------------------------------
    // Migrate
    // -----------------------------------------------------------------------

    #[test]
    fn steps_run_in_order_and_bump_version() {
        let mut chain = MigrationChain::new();
        chain.register(step(2, tag));
        chain.register(step(1, tag));
        let doc = json!({"version": 0, "trail": []});
        let out = chain.migrate(doc, 0, 2).unwrap();
        assert_eq!(out["trail"], json!([0, 1]));
        assert_eq!(out["version"], json!(2));
    }

    #[test]
    fn same_version_is_a_no_op() {
        let chain = MigrationChain::standard();
        let doc = json!({"version": CURRENT_VERSION, "blocks": [{"id": "and"}]});
        let out = chain.migrate(doc.clone(), CURRENT_VERSION, CURRENT_VERSION).unwrap();
        assert_eq!(out, doc);
    }

    #[test]
    fn failing_step_names_itself() {
        let mut chain = MigrationChain::new();
        chain.register(MigrationStep {
            version: 1,
            name: "explode",
            upgrade: broken,
        });
        let err = chain.migrate(json!({"version": 0}), 0, 1).unwrap_err();
        assert_eq!(
            err.to_string(),
            "migration to version 1 (explode) failed: malformed legacy data"
        );
    }

    #[test]
    fn missing_step_is_reported() {
        let chain = MigrationChain::new();
        match chain.migrate(json!({}), 1, 3) {
            Err(MigrationError::NoMigrationPath { from: 1, to: 3 }) => {}
            other => panic!("expected NoMigrationPath {{1, 3}}, got {other:?}"),
        }
    }
}
