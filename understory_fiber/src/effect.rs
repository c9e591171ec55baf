// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Effect records, dependency lists, and the per-component effect list.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::any::Any;
use core::cell::RefCell;
use core::fmt;

use crate::ring::Ring;
use crate::types::HookEffectTags;

/// Cleanup returned by an effect body.
pub type Destroy = Box<dyn FnOnce()>;

pub(crate) type Create = Box<dyn FnOnce() -> Option<Destroy>>;

/// A value that can take part in a dependency list.
///
/// Implemented for every `PartialEq + 'static` type. Two values compare equal only
/// if they have the same concrete type and that type's `PartialEq` says so.
pub trait DepValue: Any {
    /// Compare against another dependency of any type.
    fn dep_eq(&self, other: &dyn DepValue) -> bool;
    /// Upcast for downcasting.
    fn as_any(&self) -> &dyn Any;
}

impl<T: PartialEq + 'static> DepValue for T {
    fn dep_eq(&self, other: &dyn DepValue) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| other == self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Dependency list of an effect.
///
/// Lists are equal when they have the same length and every positional pair is
/// equal. Build one with [`deps!`](crate::deps) or [`Deps::with`].
#[derive(Default)]
pub struct Deps(Vec<Box<dyn DepValue>>);

impl Deps {
    /// An empty list: the effect runs on mount only.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Append a value.
    #[must_use]
    pub fn with(mut self, value: impl DepValue) -> Self {
        self.0.push(Box::new(value));
        self
    }

    /// Number of values.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if the list has no values.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl PartialEq for Deps {
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len()
            && self
                .0
                .iter()
                .zip(&other.0)
                .all(|(next, prev)| next.dep_eq(&**prev))
    }
}

impl fmt::Debug for Deps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deps").field("len", &self.0.len()).finish()
    }
}

/// Build a [`Deps`] list from values.
///
/// ```
/// use understory_fiber::deps;
///
/// assert_eq!(deps![1, "a"], deps![1, "a"]);
/// assert_ne!(deps![1], deps![2]);
/// assert_ne!(deps![1], deps![1_u8], "different types never compare equal");
/// assert!(deps![].is_empty());
/// ```
#[macro_export]
macro_rules! deps {
    () => {
        $crate::Deps::new()
    };
    ($($value:expr),+ $(,)?) => {
        $crate::Deps::new()$(.with($value))+
    };
}

/// Cleanup slot shared by every render's record of the same effect hook.
#[derive(Default)]
pub(crate) struct EffectInstance {
    destroy: RefCell<Option<Destroy>>,
}

/// One side-effect registration.
pub struct Effect {
    tag: HookEffectTags,
    create: RefCell<Option<Create>>,
    pub(crate) inst: Rc<EffectInstance>,
    deps: Option<Deps>,
}

impl Effect {
    /// Kind of the effect, and whether it has to run.
    pub fn tag(&self) -> HookEffectTags {
        self.tag
    }

    /// Dependency list, or `None` for "run after every render".
    pub fn deps(&self) -> Option<&Deps> {
        self.deps.as_ref()
    }

    /// True if a cleanup from an earlier run is waiting to be called.
    pub fn has_destroy(&self) -> bool {
        self.inst.destroy.borrow().is_some()
    }

    /// Run the pending cleanup, if any.
    pub(crate) fn destroy(&self) {
        let destroy = self.inst.destroy.borrow_mut().take();
        if let Some(destroy) = destroy {
            destroy();
        }
    }

    /// Run the body, if it has not run yet, and keep its cleanup.
    pub(crate) fn create(&self) {
        let create = self.create.borrow_mut().take();
        if let Some(create) = create {
            let destroy = create();
            *self.inst.destroy.borrow_mut() = destroy;
        }
    }
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("tag", &self.tag)
            .field("deps", &self.deps)
            .field("has_destroy", &self.has_destroy())
            .finish_non_exhaustive()
    }
}

/// The effects recorded by one render of a component, in call order.
#[derive(Clone, Debug, Default)]
pub struct EffectList {
    effects: Ring<Rc<Effect>>,
}

impl EffectList {
    pub(crate) fn push_effect(
        &mut self,
        tag: HookEffectTags,
        create: Create,
        inst: Rc<EffectInstance>,
        deps: Option<Deps>,
    ) -> Rc<Effect> {
        let effect = Rc::new(Effect {
            tag,
            create: RefCell::new(Some(create)),
            inst,
            deps,
        });
        self.effects.push(Rc::clone(&effect));
        effect
    }

    /// Number of effects.
    pub fn len(&self) -> usize {
        self.effects.len()
    }

    /// True if no effect was recorded.
    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// The most recently recorded effect.
    pub fn last_effect(&self) -> Option<&Effect> {
        self.effects.last().map(|effect| &**effect)
    }

    /// Effects in call order.
    pub fn iter(&self) -> impl Iterator<Item = &Effect> {
        self.effects.iter().map(|effect| &**effect)
    }

    /// Effects whose tag contains all of `tags`.
    pub(crate) fn matching(&self, tags: HookEffectTags) -> Vec<Rc<Effect>> {
        self.effects
            .iter()
            .filter(|effect| effect.tag.contains(tags))
            .cloned()
            .collect()
    }
}
