//! Transform registry and pipeline runner.
//!
//! A transform is a named function that mutates an [`InstructionSet`] in
//! place. Transforms are registered once at startup with a priority; the
//! pipeline runs them in ascending priority against the same database and
//! stops at the first failure without rolling back.
//!
//! Transforms sharing a priority must not touch the same fields. Between
//! them, the pipeline orders by name. Registration order never matters.

use std::collections::HashSet;
use std::sync::OnceLock;

use crate::{checks, cleanup, Error, InstructionSet, PipelineError};

/// Signature of a transform.
pub type TransformFn = fn(&mut InstructionSet) -> Result<(), Error>;

/// Priority of the read-only consistency checks.
pub const CHECK_PRIORITY: i32 = 0;
/// Priority of the annotation transforms.
pub const CLEANUP_PRIORITY: i32 = 1000;

/// A registered transform.
#[derive(Debug, Clone, Copy)]
pub struct Transform {
    /// Unique transform name.
    pub name: &'static str,
    /// Lower priorities run first.
    pub priority: i32,
    /// The transform itself.
    pub function: TransformFn,
}

/// Pipeline run options.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct PipelineConfig {
    /// Names of registered transforms to skip.
    pub excluded_transforms: Vec<String>,
}

impl PipelineConfig {
    /// Returns a config that skips the given transforms.
    #[must_use]
    pub fn excluding<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            excluded_transforms: names.into_iter().map(Into::into).collect(),
        }
    }
}

/// Set of transforms consulted by the pipeline.
#[derive(Debug, Clone, Default)]
pub struct TransformRegistry {
    transforms: Vec<Transform>,
}

impl TransformRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            transforms: Vec::new(),
        }
    }

    /// Registers a transform.
    ///
    /// # Panics
    ///
    /// Panics when a transform with the same name is already registered.
    pub fn register(
        &mut self,
        name: &'static str,
        priority: i32,
        function: TransformFn,
    ) -> &mut Self {
        assert!(
            self.get(name).is_none(),
            "duplicate transform registration: {name}"
        );
        self.transforms.push(Transform {
            name,
            priority,
            function,
        });
        self
    }

    /// Looks up a transform by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Transform> {
        self.transforms.iter().find(|transform| transform.name == name)
    }

    /// Number of registered transforms.
    #[must_use]
    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    /// Returns `true` when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    /// Transforms in execution order: ascending priority, then name.
    #[must_use]
    pub fn ordered(&self) -> Vec<&Transform> {
        let mut ordered: Vec<_> = self.transforms.iter().collect();
        ordered.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.name.cmp(b.name)));
        ordered
    }

    /// Runs every transform not excluded by `config` against
    /// `instruction_set`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] before running anything when
    /// `config` excludes an unregistered transform, and
    /// [`PipelineError::TransformFailed`] for the first failing transform.
    /// Mutations made before a failure are kept.
    pub fn run(
        &self,
        instruction_set: &mut InstructionSet,
        config: &PipelineConfig,
    ) -> Result<(), PipelineError> {
        let mut excluded = HashSet::new();
        for name in &config.excluded_transforms {
            if self.get(name).is_none() {
                return Err(PipelineError::InvalidConfig(Error::UnknownTransform(
                    name.clone(),
                )));
            }
            excluded.insert(name.as_str());
        }

        let transforms: Vec<_> = self
            .ordered()
            .into_iter()
            .filter(|transform| !excluded.contains(transform.name))
            .collect();
        log::info!(
            "running {} transforms over {} instructions",
            transforms.len(),
            instruction_set.len()
        );
        for (first, second) in shared_priorities(&transforms) {
            log::debug!(
                "transforms {} and {} share priority {}; they must be independent",
                first.name,
                second.name,
                first.priority
            );
        }
        for transform in transforms {
            log::debug!("transform {} (priority {})", transform.name, transform.priority);
            (transform.function)(instruction_set).map_err(|source| {
                PipelineError::TransformFailed {
                    transform: transform.name,
                    source,
                }
            })?;
        }
        Ok(())
    }
}

/// Adjacent pairs of `ordered` transforms with equal priority.
fn shared_priorities<'a>(
    ordered: &'a [&'a Transform],
) -> impl Iterator<Item = (&'a Transform, &'a Transform)> + 'a {
    ordered
        .windows(2)
        .filter(|pair| pair[0].priority == pair[1].priority)
        .map(|pair| (pair[0], pair[1]))
}

/// Builds the registry of built-in transforms.
///
/// This is the startup registration routine; call it, or
/// [`default_registry`], before running a pipeline.
#[must_use]
pub fn default_transforms() -> TransformRegistry {
    let mut registry = TransformRegistry::new();
    registry
        .register("check_has_vendor_syntax", CHECK_PRIORITY, checks::check_has_vendor_syntax)
        .register("check_opcode_format", CHECK_PRIORITY, checks::check_opcode_format)
        .register("check_modrm_usage", CHECK_PRIORITY, checks::check_modrm_usage)
        .register(
            "check_immediate_value_bytes",
            CHECK_PRIORITY,
            checks::check_immediate_value_bytes,
        )
        .register("add_missing_cpu_flags", CLEANUP_PRIORITY, cleanup::add_missing_cpu_flags)
        .register("add_protection_modes", CLEANUP_PRIORITY, cleanup::add_protection_modes);
    registry
}

/// Process-wide registry of built-in transforms, built on first use and
/// read-only afterwards.
#[must_use]
pub fn default_registry() -> &'static TransformRegistry {
    static REGISTRY: OnceLock<TransformRegistry> = OnceLock::new();
    REGISTRY.get_or_init(default_transforms)
}

/// Runs the built-in transforms over `instruction_set`.
///
/// # Errors
///
/// See [`TransformRegistry::run`].
pub fn run_transform_pipeline(
    instruction_set: &mut InstructionSet,
    config: &PipelineConfig,
) -> Result<(), PipelineError> {
    default_registry().run(instruction_set, config)
}

#[cfg(test)]
mod tests {
    use super::{
        default_transforms, shared_priorities, TransformRegistry, CHECK_PRIORITY, CLEANUP_PRIORITY,
    };
    use crate::{Error, InstructionSet};

    #[allow(clippy::unnecessary_wraps)]
    fn noop(_: &mut InstructionSet) -> Result<(), Error> {
        Ok(())
    }

    #[test]
    fn order_is_priority_then_name() {
        let mut registry = TransformRegistry::new();
        registry
            .register("zeta", 5, noop)
            .register("alpha", 10, noop)
            .register("beta", 5, noop);
        let names: Vec<_> = registry.ordered().iter().map(|t| t.name).collect();
        assert_eq!(names, ["beta", "zeta", "alpha"]);
    }

    #[test]
    fn shared_priorities_pair_adjacent_ties_only() {
        let mut registry = TransformRegistry::new();
        registry
            .register("zeta", 5, noop)
            .register("alpha", 10, noop)
            .register("beta", 5, noop)
            .register("gamma", 5, noop);
        let ordered = registry.ordered();
        let pairs: Vec<_> = shared_priorities(&ordered)
            .map(|(first, second)| (first.name, second.name))
            .collect();
        assert_eq!(pairs, [("beta", "gamma"), ("gamma", "zeta")]);
        assert!(shared_priorities(&ordered[2..]).next().is_none());
    }

    #[test]
    #[should_panic(expected = "duplicate transform registration: zeta")]
    fn duplicate_name_is_fatal() {
        TransformRegistry::new()
            .register("zeta", 5, noop)
            .register("zeta", 6, noop);
    }

    #[test]
    fn checks_run_before_cleanups() {
        let registry = default_transforms();
        assert_eq!(registry.len(), 6);
        let priorities: Vec<_> = registry.ordered().iter().map(|t| t.priority).collect();
        assert_eq!(
            priorities,
            [
                CHECK_PRIORITY,
                CHECK_PRIORITY,
                CHECK_PRIORITY,
                CHECK_PRIORITY,
                CLEANUP_PRIORITY,
                CLEANUP_PRIORITY
            ]
        );
        assert_eq!(
            registry.get("add_protection_modes").map(|t| t.priority),
            Some(CLEANUP_PRIORITY)
        );
    }
}
