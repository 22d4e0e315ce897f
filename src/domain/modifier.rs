//! Image modifiers and ordered modifier chains.
//!
//! A [`Modifier`] is a pure transform with a stable identifier. The
//! identifier is the only thing that distinguishes one transform step from
//! another in the cache key, so two modifiers sharing an identifier must
//! behave identically. Violating that is a caller bug: the cache will serve
//! whichever image was materialized first. [`IdentifierRegistry`] detects
//! the common form of the mistake (one identifier used by two modifier
//! types) but cannot prove two configurations of the same type equivalent.

use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use image::DynamicImage;
use parking_lot::Mutex;

use crate::domain::errors::{ModifierError, PipelineError, PipelineResult};

/// A named, pure image transform.
pub trait Modifier: Send + Sync + 'static {
    /// Stable identifier, unique per transform configuration.
    fn identifier(&self) -> &str;

    /// Transforms `image`.
    ///
    /// # Errors
    /// Returns error if the modifier cannot process its input.
    fn modify(&self, image: DynamicImage) -> Result<DynamicImage, ModifierError>;

    /// Name of the implementing type, used in diagnostics.
    fn kind(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Identity of the implementing type. Distinct closures get distinct ids
    /// even when their names match.
    fn kind_id(&self) -> TypeId {
        TypeId::of::<Self>()
    }
}

type ModifyFn = dyn Fn(DynamicImage) -> Result<DynamicImage, ModifierError> + Send + Sync;

/// Modifier backed by a closure.
pub struct FnModifier {
    identifier: String,
    kind: &'static str,
    kind_id: TypeId,
    f: Box<ModifyFn>,
}

impl FnModifier {
    /// Creates a modifier from an identifier and a transform closure.
    pub fn new<F>(identifier: impl Into<String>, f: F) -> Self
    where
        F: Fn(DynamicImage) -> Result<DynamicImage, ModifierError> + Send + Sync + 'static,
    {
        Self {
            identifier: identifier.into(),
            kind: std::any::type_name::<F>(),
            kind_id: TypeId::of::<F>(),
            f: Box::new(f),
        }
    }
}

impl std::fmt::Debug for FnModifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnModifier")
            .field("identifier", &self.identifier)
            .finish_non_exhaustive()
    }
}

impl Modifier for FnModifier {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn modify(&self, image: DynamicImage) -> Result<DynamicImage, ModifierError> {
        (self.f)(image)
    }

    fn kind(&self) -> &'static str {
        self.kind
    }

    fn kind_id(&self) -> TypeId {
        self.kind_id
    }
}

/// Ordered sequence of modifiers, applied left to right.
#[derive(Clone, Default)]
pub struct ModifierChain {
    steps: Vec<Arc<dyn Modifier>>,
}

impl ModifierChain {
    /// Creates an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a modifier and returns the chain.
    #[must_use]
    pub fn then(mut self, modifier: impl Modifier + 'static) -> Self {
        self.steps.push(Arc::new(modifier));
        self
    }

    /// Appends a shared modifier.
    pub fn push(&mut self, modifier: Arc<dyn Modifier>) {
        self.steps.push(modifier);
    }

    /// Returns the modifiers in application order.
    #[must_use]
    pub fn steps(&self) -> &[Arc<dyn Modifier>] {
        &self.steps
    }

    /// Returns the identifiers in application order.
    pub fn identifiers(&self) -> impl Iterator<Item = &str> + '_ {
        self.steps.iter().map(|m| m.identifier())
    }

    /// Number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns true if the chain has no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Applies every step in order. The output of step `i` feeds step `i + 1`.
    ///
    /// # Errors
    /// Returns `PipelineError::Transform` for the first step that fails. No
    /// intermediate image is returned.
    pub fn apply(&self, image: DynamicImage) -> PipelineResult<DynamicImage> {
        self.steps
            .iter()
            .enumerate()
            .try_fold(image, |image, (step, modifier)| {
                modifier
                    .modify(image)
                    .map_err(|e| PipelineError::transform(modifier.identifier(), step, &e))
            })
    }
}

impl std::fmt::Debug for ModifierChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.identifiers()).finish()
    }
}

impl FromIterator<Arc<dyn Modifier>> for ModifierChain {
    fn from_iter<I: IntoIterator<Item = Arc<dyn Modifier>>>(iter: I) -> Self {
        Self {
            steps: iter.into_iter().collect(),
        }
    }
}

/// One identifier observed for two different modifier types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierConflict {
    /// The shared identifier.
    pub identifier: String,
    /// Type first registered for the identifier.
    pub registered_kind: &'static str,
    /// Type seen later with the same identifier.
    pub conflicting_kind: &'static str,
}

/// Identifiers tracked before the registry stops admitting new ones.
pub const MAX_TRACKED_IDENTIFIERS: usize = 4096;

#[derive(Debug, Clone, Copy)]
struct Owner {
    id: TypeId,
    kind: &'static str,
}

#[derive(Debug, Default)]
struct RegistryState {
    owners: HashMap<String, Owner>,
    reported: HashSet<(String, TypeId)>,
}

/// Tracks which modifier type owns each identifier.
///
/// At most `capacity` identifiers are tracked; identifiers first seen after
/// that are not checked.
#[derive(Debug)]
pub struct IdentifierRegistry {
    state: Mutex<RegistryState>,
    capacity: usize,
}

impl Default for IdentifierRegistry {
    fn default() -> Self {
        Self::with_capacity(MAX_TRACKED_IDENTIFIERS)
    }
}

impl IdentifierRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty registry tracking at most `capacity` identifiers.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            state: Mutex::new(RegistryState::default()),
            capacity,
        }
    }

    /// Number of identifiers currently tracked.
    #[must_use]
    pub fn tracked(&self) -> usize {
        self.state.lock().owners.len()
    }

    /// Records every step of `chain`, returning conflicts not reported before.
    pub fn observe(&self, chain: &ModifierChain) -> Vec<IdentifierConflict> {
        if chain.is_empty() {
            return Vec::new();
        }

        let mut conflicts = Vec::new();
        let mut state = self.state.lock();

        for modifier in chain.steps() {
            let identifier = modifier.identifier();
            let id = modifier.kind_id();

            let Some(owner) = state.owners.get(identifier).copied() else {
                if state.owners.len() < self.capacity {
                    let owner = Owner {
                        id,
                        kind: modifier.kind(),
                    };
                    state.owners.insert(identifier.to_string(), owner);
                }
                continue;
            };

            if owner.id != id && state.reported.insert((identifier.to_string(), id)) {
                conflicts.push(IdentifierConflict {
                    identifier: identifier.to_string(),
                    registered_kind: owner.kind,
                    conflicting_kind: modifier.kind(),
                });
            }
        }

        conflicts
    }
}
