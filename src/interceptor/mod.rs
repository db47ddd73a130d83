//! Interceptor (aspect) subsystem.
//!
//! # Data Flow
//! ```text
//! Registry build:
//!     register(Interceptor) per owning type, in registration order
//!     uses_aspects(handler type → companion aspect types)
//!     → resolve(handler type): own aspects, then companions in declared order,
//!       duplicates dropped, stable-sorted by priority per kind
//!     → filtered by the action's markers (only / unless)
//!     → InterceptorSet stored on the MethodAction
//!
//! Per request (dispatch/lifecycle.rs):
//!     BEFORE → INVOKE → AFTER, CATCH on failure, FINALLY always
//! ```
//!
//! # Design Decisions
//! - Identity is (owner type, method name); re-registering is a no-op
//! - Equal priorities keep discovery order, so the first registered catch wins

pub mod registry;

use std::fmt;
use std::sync::Arc;

use crate::action::method::{Call, HandlerFn, Reply};
use crate::dispatch::error::HandlerError;
use crate::param::{ParamDescriptor, TypeTag};

pub use registry::InterceptorRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AspectKind {
    Before,
    After,
    Catch,
    Finally,
}

impl AspectKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AspectKind::Before => "before",
            AspectKind::After => "after",
            AspectKind::Catch => "catch",
            AspectKind::Finally => "finally",
        }
    }
}

/// One aspect method.
pub struct Interceptor {
    pub owner: String,
    pub method: String,
    pub kind: AspectKind,
    /// Lower runs earlier.
    pub priority: i32,
    /// Fire only for actions carrying one of these markers.
    pub only: Vec<String>,
    /// Fire only for actions carrying none of these markers.
    pub unless: Vec<String>,
    /// Error classes handled by a catch aspect.
    pub catches: Vec<TypeTag>,
    /// View used to render a catch aspect's result.
    pub view: Option<String>,
    pub params: Vec<ParamDescriptor>,
    pub handler: HandlerFn,
}

impl Interceptor {
    pub fn new<F>(owner: impl Into<String>, method: impl Into<String>, kind: AspectKind, handler: F) -> Self
    where
        F: Fn(&mut Call<'_>) -> Result<Reply, HandlerError> + Send + Sync + 'static,
    {
        Self {
            owner: owner.into(),
            method: method.into(),
            kind,
            priority: 0,
            only: Vec::new(),
            unless: Vec::new(),
            catches: Vec::new(),
            view: None,
            params: Vec::new(),
            handler: Arc::new(handler),
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn only<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.only = markers.into_iter().map(Into::into).collect();
        self
    }

    pub fn unless<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unless = markers.into_iter().map(Into::into).collect();
        self
    }

    pub fn catching(mut self, classes: Vec<TypeTag>) -> Self {
        self.catches = classes;
        self
    }

    pub fn with_view(mut self, view: impl Into<String>) -> Self {
        self.view = Some(view.into());
        self
    }

    pub fn with_param(mut self, param: ParamDescriptor) -> Self {
        self.params.push(param);
        self
    }

    /// `Owner#method`.
    pub fn name(&self) -> String {
        format!("{}#{}", self.owner, self.method)
    }

    pub fn same_identity(&self, other: &Interceptor) -> bool {
        self.owner == other.owner && self.method == other.method
    }

    /// Applicability against an action's marker names.
    pub fn applies_to(&self, markers: &[&str]) -> bool {
        let intersects = |set: &[String]| set.iter().any(|m| markers.contains(&m.as_str()));

        if !self.only.is_empty() {
            return intersects(&self.only);
        }
        if !self.unless.is_empty() {
            return !intersects(&self.unless);
        }
        true
    }

    /// True if a failure of `class` is handled here.
    pub fn catches(&self, class: &TypeTag) -> bool {
        self.catches.iter().any(|declared| class.is_a(declared))
    }
}

impl PartialEq for Interceptor {
    fn eq(&self, other: &Self) -> bool {
        self.same_identity(other)
    }
}

impl fmt::Debug for Interceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interceptor")
            .field("name", &self.name())
            .field("kind", &self.kind)
            .field("priority", &self.priority)
            .finish()
    }
}

/// Resolved aspects for one action, one ordered list per kind.
#[derive(Clone, Default)]
pub struct InterceptorSet {
    before: Vec<Arc<Interceptor>>,
    after: Vec<Arc<Interceptor>>,
    catch: Vec<Arc<Interceptor>>,
    finally: Vec<Arc<Interceptor>>,
}

impl InterceptorSet {
    pub fn get(&self, kind: AspectKind) -> &[Arc<Interceptor>] {
        match kind {
            AspectKind::Before => &self.before,
            AspectKind::After => &self.after,
            AspectKind::Catch => &self.catch,
            AspectKind::Finally => &self.finally,
        }
    }

    fn list_mut(&mut self, kind: AspectKind) -> &mut Vec<Arc<Interceptor>> {
        match kind {
            AspectKind::Before => &mut self.before,
            AspectKind::After => &mut self.after,
            AspectKind::Catch => &mut self.catch,
            AspectKind::Finally => &mut self.finally,
        }
    }

    /// Append unless an aspect with the same identity is already present.
    pub fn insert(&mut self, interceptor: Arc<Interceptor>) -> bool {
        let list = self.list_mut(interceptor.kind);
        if list.iter().any(|existing| existing.same_identity(&interceptor)) {
            return false;
        }
        list.push(interceptor);
        true
    }

    /// Stable sort of every list by ascending priority.
    pub fn sort(&mut self) {
        for kind in [AspectKind::Before, AspectKind::After, AspectKind::Catch, AspectKind::Finally] {
            self.list_mut(kind).sort_by_key(|i| i.priority);
        }
    }

    /// Keep only aspects applicable to an action with `markers`.
    pub fn filtered(&self, markers: &[&str]) -> InterceptorSet {
        let keep = |list: &[Arc<Interceptor>]| {
            list.iter()
                .filter(|i| i.applies_to(markers))
                .cloned()
                .collect::<Vec<_>>()
        };
        InterceptorSet {
            before: keep(&self.before),
            after: keep(&self.after),
            catch: keep(&self.catch),
            finally: keep(&self.finally),
        }
    }

    /// First catch aspect, in priority order, handling `class`.
    pub fn find_catch(&self, class: &TypeTag) -> Option<&Arc<Interceptor>> {
        self.catch.iter().find(|i| i.catches(class))
    }

    pub fn len(&self) -> usize {
        self.before.len() + self.after.len() + self.catch.len() + self.finally.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for InterceptorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = |list: &[Arc<Interceptor>]| list.iter().map(|i| i.name()).collect::<Vec<_>>();
        f.debug_struct("InterceptorSet")
            .field("before", &names(&self.before))
            .field("after", &names(&self.after))
            .field("catch", &names(&self.catch))
            .field("finally", &names(&self.finally))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(owner: &str, method: &str, kind: AspectKind) -> Interceptor {
        Interceptor::new(owner, method, kind, |_call: &mut Call<'_>| Ok(Reply::empty()))
    }

    #[test]
    fn test_applicability_filters() {
        let always = noop("A", "log", AspectKind::Before);
        let only = noop("A", "auth", AspectKind::Before).only(["Secured"]);
        let unless = noop("A", "cache", AspectKind::Before).unless(["NoCache"]);

        assert!(always.applies_to(&[]));
        assert!(only.applies_to(&["Secured", "Get"]));
        assert!(!only.applies_to(&["Get"]));
        assert!(unless.applies_to(&["Get"]));
        assert!(!unless.applies_to(&["NoCache"]));
    }

    #[test]
    fn test_catch_matches_ancestry() {
        let runtime = TypeTag::error("RuntimeException");
        let not_found = TypeTag::new("NotFoundException").extends(&runtime);
        let handler = noop("E", "onRuntime", AspectKind::Catch).catching(vec![runtime.clone()]);

        assert!(handler.catches(&not_found));
        assert!(handler.catches(&runtime));
        assert!(!handler.catches(&TypeTag::exception()));
    }

    #[test]
    fn test_set_dedupes_and_sorts() {
        let mut set = InterceptorSet::default();
        assert!(set.insert(Arc::new(noop("A", "late", AspectKind::Before).with_priority(5))));
        assert!(set.insert(Arc::new(noop("A", "first", AspectKind::Before).with_priority(1))));
        assert!(set.insert(Arc::new(noop("B", "tie", AspectKind::Before).with_priority(1))));
        assert!(!set.insert(Arc::new(noop("A", "late", AspectKind::Before).with_priority(0))));
        set.sort();

        let names: Vec<_> = set.get(AspectKind::Before).iter().map(|i| i.name()).collect();
        assert_eq!(names, vec!["A#first", "B#tie", "A#late"]);
        assert_eq!(set.len(), 3);
    }
}
