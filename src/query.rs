//! Query predicates and the materialized, incrementally-maintained entity lists behind them.

use crate::component::{Component, ComponentId};
use crate::entity::Entity;
use crate::error::{EcsError, EcsResult};
use crate::event::EventDispatcher;
use bit_set::BitSet;
use fxhash::FxHashMap;
use std::any::TypeId;

/// Index into the world's query table. Entities reference the queries they belong to by this
/// id rather than by owning a reference, so entity and query never form a cycle.
pub type QueryId = usize;

/// A term of a query predicate: a required component type, or `without::<T>()`'s exclusion.
#[derive(Clone, Debug)]
struct Term {
    id: ComponentId,
    name: &'static str,
}

/// An `(include, exclude)` predicate, built up fluently before being resolved to a [`Query`] via
/// [`crate::world::World::get_query`].
#[derive(Clone, Debug, Default)]
pub struct QuerySpec {
    include: Vec<Term>,
    exclude: Vec<Term>,
}

impl QuerySpec {
    pub fn new() -> Self { Self::default() }

    /// Requires entities to carry component `T`.
    pub fn with<T: Component + 'static>(mut self) -> Self {
        self.include.push(Term { id: TypeId::of::<T>(), name: std::any::type_name::<T>() });
        self
    }

    /// Excludes entities that carry component `T`. Spec's `Not(T)` exclusion marker.
    pub fn without<T: Component + 'static>(mut self) -> Self {
        self.exclude.push(Term { id: TypeId::of::<T>(), name: std::any::type_name::<T>() });
        self
    }

    /// A stable key: a canonical sort of type names, `!`-prefixed for exclusions. Identical
    /// regardless of the order terms were added in, so two specs naming the same set of
    /// components resolve to the same cached [`Query`].
    pub fn key(&self) -> String {
        use itertools::Itertools;
        self.include
            .iter()
            .map(|t| t.name.to_string())
            .chain(self.exclude.iter().map(|t| format!("!{}", t.name)))
            .sorted()
            .join(",")
    }

    pub(crate) fn include_ids(&self) -> impl Iterator<Item = ComponentId> + '_ {
        self.include.iter().map(|t| t.id)
    }

    pub(crate) fn exclude_ids(&self) -> impl Iterator<Item = ComponentId> + '_ {
        self.exclude.iter().map(|t| t.id)
    }

    fn is_empty_include(&self) -> bool { self.include.is_empty() }
}

/// Reactive events a query can dispatch to subscribed systems.
pub enum QueryEvent {
    EntityAdded(Entity),
    EntityRemoved(Entity),
    ComponentChanged(Entity, ComponentId),
}

/// A cached `(include, exclude)` predicate plus its materialized matching-entity list.
///
/// Membership is maintained incrementally by [`crate::world::World::on_component_added`] /
/// `on_component_removed` — `match_bits` is only ever consulted when a query is first built
/// (to bootstrap against existing entities) or as an assertion in tests, not on every mutation.
pub struct Query {
    key: String,
    include_names: Vec<&'static str>,
    exclude_names: Vec<&'static str>,
    pub(crate) include_bits: BitSet,
    pub(crate) exclude_bits: BitSet,
    entities: Vec<Entity>,
    entity_slot: FxHashMap<Entity, usize>,
    reactive: bool,
    pub(crate) on_added: EventDispatcher<Entity>,
    pub(crate) on_removed: EventDispatcher<Entity>,
    pub(crate) on_changed: EventDispatcher<(Entity, ComponentId)>,
}

impl Query {
    pub(crate) fn new(
        spec: &QuerySpec,
        include_bits: BitSet,
        exclude_bits: BitSet,
    ) -> EcsResult<Self> {
        if spec.is_empty_include() {
            return Err(EcsError::EmptyQuery);
        }
        Ok(Self {
            key: spec.key(),
            include_names: spec.include.iter().map(|t| t.name).collect(),
            exclude_names: spec.exclude.iter().map(|t| t.name).collect(),
            include_bits,
            exclude_bits,
            entities: Vec::new(),
            entity_slot: FxHashMap::default(),
            reactive: false,
            on_added: EventDispatcher::new(),
            on_removed: EventDispatcher::new(),
            on_changed: EventDispatcher::new(),
        })
    }

    pub fn key(&self) -> &str { &self.key }

    pub fn set_reactive(&mut self) { self.reactive = true; }

    pub fn is_reactive(&self) -> bool { self.reactive }

    /// `true` iff `attached` is a superset of the include set and disjoint from the exclude set.
    pub fn matches(&self, attached: &BitSet) -> bool {
        self.include_bits.is_subset(attached) && self.exclude_bits.is_disjoint(attached)
    }

    pub fn contains(&self, entity: Entity) -> bool { self.entity_slot.contains_key(&entity) }

    pub fn entities(&self) -> &[Entity] { &self.entities }

    pub fn len(&self) -> usize { self.entities.len() }

    pub fn is_empty(&self) -> bool { self.entities.is_empty() }

    /// Adds `entity`, emitting `ENTITY_ADDED` to reactive subscribers. Silent during bootstrap
    /// scans (see `World::get_query`), which insert directly without going through here.
    pub(crate) fn add_entity(&mut self, entity: Entity) {
        if self.entity_slot.contains_key(&entity) {
            return;
        }
        self.entity_slot.insert(entity, self.entities.len());
        self.entities.push(entity);
        self.on_added.dispatch(&entity);
    }

    pub(crate) fn remove_entity(&mut self, entity: Entity) {
        if let Some(slot) = self.entity_slot.remove(&entity) {
            self.entities.swap_remove(slot);
            if let Some(moved) = self.entities.get(slot).copied() {
                self.entity_slot.insert(moved, slot);
            }
            self.on_removed.dispatch(&entity);
        }
    }

    pub(crate) fn add_entity_silent(&mut self, entity: Entity) {
        if self.entity_slot.contains_key(&entity) {
            return;
        }
        self.entity_slot.insert(entity, self.entities.len());
        self.entities.push(entity);
    }

    pub(crate) fn notify_changed(&mut self, entity: Entity, component: ComponentId) {
        if self.entity_slot.contains_key(&entity) {
            self.on_changed.dispatch(&(entity, component));
        }
    }

    pub fn stats(&self) -> QueryStats {
        QueryStats {
            num_entities: self.entities.len(),
            added_fired: self.on_added.fired(),
            removed_fired: self.on_removed.fired(),
            changed_fired: self.on_changed.fired(),
        }
    }

    pub fn to_json(&self) -> QueryJson {
        QueryJson {
            key: self.key.clone(),
            reactive: self.reactive,
            included: self.include_names.iter().map(|s| s.to_string()).collect(),
            not: self.exclude_names.iter().map(|s| s.to_string()).collect(),
            num_entities: self.entities.len(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct QueryStats {
    pub num_entities: usize,
    pub added_fired: u64,
    pub removed_fired: u64,
    pub changed_fired: u64,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct QueryJson {
    pub key: String,
    pub reactive: bool,
    pub included: Vec<String>,
    pub not: Vec<String>,
    pub num_entities: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    struct A;
    struct B;
    impl Default for A {
        fn default() -> Self { A }
    }
    impl Clone for A {
        fn clone(&self) -> Self { A }
    }
    impl Default for B {
        fn default() -> Self { B }
    }
    impl Clone for B {
        fn clone(&self) -> Self { B }
    }

    #[test]
    fn key_is_stable_under_permutation() {
        let a = QuerySpec::new().with::<A>().without::<B>();
        let b = QuerySpec::new().without::<B>().with::<A>();
        assert_eq!(a.key(), b.key());
    }

    #[test]
    fn empty_include_is_rejected() {
        let spec = QuerySpec::new().without::<B>();
        let err = Query::new(&spec, BitSet::new(), BitSet::new()).unwrap_err();
        assert!(matches!(err, EcsError::EmptyQuery));
    }
}
