//! The central coordinator: owns the entity arena, every component store, the query table, and
//! the deferred-removal queues, and routes component mutations into whichever queries care.

use crate::component::{Component, ComponentId, ComponentKind, ComponentStore};
use crate::entity::{Entity, EntityArena};
use crate::error::EcsResult;
use crate::query::{Query, QueryId, QuerySpec};
use crate::system::SystemManager;
use bit_set::BitSet;
use fxhash::FxHashMap;
use smallvec::SmallVec;
use std::any::TypeId;
use std::time::Instant;

/// Emitted once, at world construction, to a host-provided observability sink if one was given.
pub struct WorldCreated {
    pub version: &'static str,
}

pub trait EventSink {
    fn world_created(&self, event: &WorldCreated);
}

/// Central coordinator for entities, components, queries and systems.
pub struct World {
    pub(crate) entities: EntityArena,
    component_stores: FxHashMap<ComponentId, ComponentStore>,
    type_index: FxHashMap<ComponentId, usize>,
    next_type_index: usize,
    queries: Vec<Query>,
    query_by_key: FxHashMap<String, QueryId>,
    /// Reverse index from a component type to the queries whose include or exclude set
    /// references it, so a component add/remove/mutation touches only the queries that could
    /// possibly care instead of the full query table (§4.3's "O(queries-referencing-affected-type)"
    /// complexity contract).
    queries_by_component: FxHashMap<ComponentId, SmallVec<[QueryId; 4]>>,
    named_entities: FxHashMap<String, SmallVec<[Entity; 1]>>,
    dispose_queue: Vec<Entity>,
    removal_queue: Vec<Entity>,
    deferred_removal_enabled: bool,
    enabled: bool,
    pub(crate) system_manager: SystemManager,
    last_tick: Option<Instant>,
    last_warning: Option<String>,
}

impl Default for World {
    fn default() -> Self {
        Self {
            entities: EntityArena::new(),
            component_stores: FxHashMap::default(),
            type_index: FxHashMap::default(),
            next_type_index: 0,
            queries: Vec::new(),
            query_by_key: FxHashMap::default(),
            queries_by_component: FxHashMap::default(),
            named_entities: FxHashMap::default(),
            dispose_queue: Vec::new(),
            removal_queue: Vec::new(),
            deferred_removal_enabled: true,
            enabled: true,
            system_manager: SystemManager::default(),
            last_tick: None,
            last_warning: None,
        }
    }
}

impl World {
    pub fn new() -> Self { Self::default() }

    /// Constructs a world and, if `sink` is given, immediately emits `world-created`.
    pub fn with_event_sink(sink: &dyn EventSink) -> Self {
        let world = Self::new();
        sink.world_created(&WorldCreated { version: crate::VERSION });
        world
    }

    /// Disabling defers nothing: every mutator behaves as if deferred removal were off, i.e.
    /// removals and disposals take effect immediately regardless of the `immediate` flag passed
    /// in. This is the recommended resolution to the spec's open question on what
    /// `deferredRemovalEnabled = false` should mean.
    pub fn set_deferred_removal_enabled(&mut self, enabled: bool) {
        self.deferred_removal_enabled = enabled;
    }

    pub fn deferred_removal_enabled(&self) -> bool { self.deferred_removal_enabled }

    /// The most recent non-fatal warning (duplicate-registration, missing-registration,
    /// entity-already-added), if any. Each of those kinds is logged via `tracing` as it happens
    /// and also recorded here, for hosts that want the last one without a subscriber.
    pub fn last_warning(&self) -> Option<&str> { self.last_warning.as_deref() }

    pub(crate) fn record_warning(&mut self, message: String) {
        self.last_warning = Some(message);
    }

    // ---------------------------------------------------------------- component registration

    fn type_index(&mut self, id: ComponentId) -> usize {
        *self.type_index.entry(id).or_insert_with(|| {
            let index = self.next_type_index;
            self.next_type_index += 1;
            index
        })
    }

    /// Registers a component type. Double registration logs a warning and is a no-op.
    pub fn register_component<T: Default + Clone + 'static>(
        &mut self,
        kind: ComponentKind,
        pooled: bool,
    ) -> EcsResult<()> {
        let id = TypeId::of::<T>();
        if self.component_stores.contains_key(&id) {
            let message = format!("duplicate registration for component `{}`", std::any::type_name::<T>());
            tracing::warn!(component = std::any::type_name::<T>(), "duplicate component registration");
            self.record_warning(message);
            return Ok(());
        }
        self.type_index(id);
        self.component_stores
            .insert(id, ComponentStore::new(Box::<T>::default(), kind, pooled));
        Ok(())
    }

    fn ensure_registered<T: Default + Clone + 'static>(&mut self) -> ComponentId {
        let id = TypeId::of::<T>();
        if !self.component_stores.contains_key(&id) {
            tracing::warn!(
                component = std::any::type_name::<T>(),
                "component used without prior registration; registering with defaults"
            );
            self.record_warning(format!(
                "component `{}` used without prior registration",
                std::any::type_name::<T>()
            ));
            let _ = self.register_component::<T>(ComponentKind::NORMAL, true);
        }
        id
    }

    pub fn component_count<T: 'static>(&self) -> usize {
        self.component_stores.get(&TypeId::of::<T>()).map(|s| s.live_count()).unwrap_or(0)
    }

    // -------------------------------------------------------------------------- entity lifecycle

    /// Creates an entity and immediately adds it to the world.
    pub fn create_entity(&mut self) -> Entity {
        let entity = self.create_detached_entity();
        self.add_entity(entity);
        entity
    }

    /// Allocates an entity without adding it; components attached before `add_entity` do not
    /// emit add-events — `add_entity` replays them to every matching query once.
    pub fn create_detached_entity(&mut self) -> Entity {
        self.entities.allocate()
    }

    /// Marks a detached entity alive and replays its already-attached components into every
    /// query they make it match. A live id passed here is an `entity-already-added` warning.
    pub fn add_entity(&mut self, entity: Entity) {
        let already_alive = self.entities.get(entity).map(|r| r.alive).unwrap_or(false);
        if already_alive {
            tracing::warn!(entity = %entity, "addEntity called on an already-live entity");
            self.record_warning(format!("entity {} was already added", entity));
            return;
        }
        if let Some(record) = self.entities.get_mut(entity) {
            record.alive = true;
        }
        let attached: SmallVec<[ComponentId; 8]> =
            self.entities.get(entity).map(|r| r.component_order.clone()).unwrap_or_default();
        for component_id in attached {
            self.on_component_added(entity, component_id);
        }
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        self.entities.get(entity).map(|r| r.alive).unwrap_or(false)
    }

    pub fn set_name(&mut self, entity: Entity, name: impl Into<String>) {
        let name = name.into();
        if let Some(record) = self.entities.get_mut(entity) {
            record.name = Some(name.clone());
        }
        self.named_entities.entry(name).or_default().push(entity);
    }

    pub fn find_entity_by_name(&self, name: &str) -> Option<Entity> {
        self.named_entities.get(name).and_then(|v| v.first().copied())
    }

    pub fn entities_by_name(&self, name: &str) -> &[Entity] {
        self.named_entities.get(name).map(|v| v.as_slice()).unwrap_or(&[])
    }

    // ----------------------------------------------------------------------------- components

    /// Attaches `T`, constructing from the registered pool (or a plain clone if unpooled). A
    /// no-op if `T` is already attached. `props`, if given, overwrites the freshly constructed
    /// instance's fields (`copy`, in the source runtime's terms).
    pub fn add_component<T: Default + Clone + 'static>(&mut self, entity: Entity, props: Option<T>) {
        let id = self.ensure_registered::<T>();
        if self.entities.get(entity).map(|r| r.components.contains_key(&id)).unwrap_or(true) {
            return;
        }

        let store = self.component_stores.get_mut(&id).expect("registered above");
        let mut instance = store.construct();
        if let Some(props) = props {
            instance.copy_from(&props);
        }
        let is_system_state = store.is_system_state();
        self.attach_instance(entity, id, instance, is_system_state);
    }

    /// Attaches a pre-built instance by its runtime type. Semantics identical to
    /// [`World::add_component`] minus construction.
    pub fn attach_component(&mut self, entity: Entity, instance: Box<dyn Component>) {
        let id = instance.component_type_id();
        if !self.component_stores.contains_key(&id) {
            tracing::warn!(component = instance.type_name(), "component used without prior registration");
            self.record_warning(format!("component `{}` used without prior registration", instance.type_name()));
            self.type_index(id);
            self.component_stores.insert(
                id,
                ComponentStore::new(instance.clone_component(), ComponentKind::NORMAL, true),
            );
        }
        if self.entities.get(entity).map(|r| r.components.contains_key(&id)).unwrap_or(true) {
            return;
        }
        let is_system_state = self.component_stores[&id].is_system_state();
        self.component_stores.get_mut(&id).unwrap().note_external_construct();
        self.attach_instance(entity, id, instance, is_system_state);
    }

    fn attach_instance(
        &mut self,
        entity: Entity,
        id: ComponentId,
        instance: Box<dyn Component>,
        is_system_state: bool,
    ) {
        let index = self.type_index(id);
        let alive = {
            let record = self.entities.get_mut(entity).expect("unknown entity");
            record.components.insert(id, instance);
            record.component_order.push(id);
            record.component_bits.insert(index);
            if is_system_state {
                record.state_component_count += 1;
            }
            record.alive
        };
        if alive {
            self.on_component_added(entity, id);
        }
    }

    pub fn has_component<T: 'static>(&self, entity: Entity, include_removed: bool) -> bool {
        let id = TypeId::of::<T>();
        self.entities
            .get(entity)
            .map(|r| {
                r.components.contains_key(&id)
                    || (include_removed && r.pending_removal.contains_key(&id))
            })
            .unwrap_or(false)
    }

    pub fn has_all_components(&self, entity: Entity, ids: &[ComponentId]) -> bool {
        self.entities.get(entity).map(|r| ids.iter().all(|id| r.components.contains_key(id))).unwrap_or(false)
    }

    pub fn has_any_components(&self, entity: Entity, ids: &[ComponentId]) -> bool {
        self.entities.get(entity).map(|r| ids.iter().any(|id| r.components.contains_key(id))).unwrap_or(false)
    }

    pub fn get_component<T: 'static>(&self, entity: Entity, include_removed: bool) -> Option<&T> {
        let id = TypeId::of::<T>();
        let record = self.entities.get(entity)?;
        record
            .components
            .get(&id)
            .or_else(|| if include_removed { record.pending_removal.get(&id) } else { None })
            .and_then(|c| c.downcast_ref::<T>())
    }

    pub fn get_removed_component<T: 'static>(&self, entity: Entity) -> Option<&T> {
        let id = TypeId::of::<T>();
        self.entities.get(entity)?.pending_removal.get(&id).and_then(|c| c.downcast_ref::<T>())
    }

    pub fn components_to_remove(&self, entity: Entity) -> Vec<ComponentId> {
        self.entities.get(entity).map(|r| r.pending_removal.keys().copied().collect()).unwrap_or_default()
    }

    /// A mutable view, dispatching `COMPONENT_CHANGED` synchronously (at this call, not after
    /// the caller finishes mutating) to every reactive query that references `T` and currently
    /// contains `entity` — matching the source runtime's "fires at the `getMutableComponent`
    /// call site" semantics described in the ordering guarantees.
    pub fn get_mut_component<T: 'static>(&mut self, entity: Entity) -> Option<&mut T> {
        let id = TypeId::of::<T>();
        if !self.entities.get(entity).map(|r| r.components.contains_key(&id)).unwrap_or(false) {
            return None;
        }
        if let Some(&index) = self.type_index.get(&id) {
            if let Some(candidates) = self.queries_by_component.get(&id) {
                let candidates: SmallVec<[QueryId; 4]> = candidates.clone();
                for query_id in candidates {
                    let query = &mut self.queries[query_id];
                    if query.is_reactive() && query.include_bits.contains(index) {
                        query.notify_changed(entity, id);
                    }
                }
            }
        }
        self.entities.get_mut(entity)?.components.get_mut(&id)?.downcast_mut::<T>()
    }

    /// Removes `T` from `entity`'s attached set immediately, so queries see it gone right away.
    /// If `immediate`, the instance is disposed (returned to its pool) now; otherwise it moves
    /// into the pending-removal map until the next deferred-removal drain. A no-op if `T` is
    /// not attached. Disabling deferred removal (see [`World::set_deferred_removal_enabled`])
    /// forces immediate semantics regardless of `immediate`.
    pub fn remove_component<T: 'static>(&mut self, entity: Entity, immediate: bool) {
        let id = TypeId::of::<T>();
        let immediate = immediate || !self.deferred_removal_enabled;

        let Some(record) = self.entities.get_mut(entity) else { return };
        let Some(instance) = record.components.remove(&id) else { return };
        record.component_order.retain(|c| *c != id);
        if let Some(&index) = self.type_index.get(&id) {
            record.component_bits.remove(index);
        }

        let is_system_state =
            self.component_stores.get(&id).map(|s| s.is_system_state()).unwrap_or(false);
        if is_system_state {
            record.state_component_count = record.state_component_count.saturating_sub(1);
        }

        if immediate {
            if let Some(store) = self.component_stores.get_mut(&id) {
                store.dispose(instance);
            }
        } else {
            record.pending_removal.insert(id, instance);
            self.removal_queue.push(entity);
        }

        self.on_component_removed(entity, id);
        self.maybe_self_dispose_ghost(entity);
    }

    /// Drains `entity`'s pending-removal map, finalizing each as an immediate removal.
    pub fn process_removed_components(&mut self, entity: Entity) {
        let pending: Vec<ComponentId> =
            self.entities.get(entity).map(|r| r.pending_removal.keys().copied().collect()).unwrap_or_default();
        for id in pending {
            if let Some(record) = self.entities.get_mut(entity) {
                if let Some(instance) = record.pending_removal.remove(&id) {
                    if let Some(store) = self.component_stores.get_mut(&id) {
                        store.dispose(instance);
                    }
                }
            }
        }
    }

    fn maybe_self_dispose_ghost(&mut self, entity: Entity) {
        let is_ghost_done = self
            .entities
            .get(entity)
            .map(|r| !r.alive && r.state_component_count == 0)
            .unwrap_or(false);
        // A ghost (alive=false, state-count > 0) is resurrected into full disposal only when its
        // last system-state component is removed.
        if is_ghost_done && !self.dispose_queue.contains(&entity) {
            self.finalize_dispose(entity);
        }
    }

    // ------------------------------------------------------------------------------ disposal

    /// Marks the entity dead and either finalizes its component teardown right away
    /// (`immediate`) or enqueues it for the next tick's drain. Deferred disposal does *not*
    /// touch the entity's attached-component set or bitset at the call site: query membership
    /// is driven purely by that bitset (see [`Query::matches`]), so an entity queued for
    /// disposal keeps matching every query its components satisfy until
    /// [`World::process_deferred_removal`] actually strips it — the boundary case the spec
    /// calls out explicitly (components "removed" but still visible for the rest of the tick).
    /// An entity with attached system-state components is drained of everything else at
    /// finalization but kept alive as a ghost until those are removed too.
    pub fn dispose_entity(&mut self, entity: Entity, immediate: bool) {
        let immediate = immediate || !self.deferred_removal_enabled;

        if self.entities.get(entity).is_none() {
            return;
        }
        if let Some(record) = self.entities.get_mut(entity) {
            record.alive = false;
            record.queries.clear();
        }

        if immediate {
            self.finalize_dispose(entity);
        } else {
            self.dispose_queue.push(entity);
        }
    }

    fn remove_component_by_id(&mut self, entity: Entity, id: ComponentId, immediate: bool) {
        let Some(record) = self.entities.get_mut(entity) else { return };
        let Some(instance) = record.components.remove(&id) else { return };
        record.component_order.retain(|c| *c != id);
        if let Some(&index) = self.type_index.get(&id) {
            record.component_bits.remove(index);
        }
        if immediate {
            if let Some(store) = self.component_stores.get_mut(&id) {
                store.dispose(instance);
            }
        } else {
            record.pending_removal.insert(id, instance);
            self.removal_queue.push(entity);
        }
        self.on_component_removed(entity, id);
    }

    /// Actually tears an entity down: finalizes any component removals already pending from
    /// earlier standalone `removeComponent` calls, then immediately removes and disposes every
    /// attached non-system-state component (each removal updates queries right away, via
    /// `on_component_removed`, same as a live `removeComponent` call would). If a system-state
    /// component remains, the entity survives as a ghost — alive is already false, and it stays
    /// registered in whichever queries its remaining components still satisfy. Otherwise the
    /// entity is fully unregistered and returned to the pool.
    fn finalize_dispose(&mut self, entity: Entity) {
        self.process_removed_components(entity);

        let attached: SmallVec<[ComponentId; 8]> =
            self.entities.get(entity).map(|r| r.component_order.clone()).unwrap_or_default();
        for id in attached {
            let is_state = self.component_stores.get(&id).map(|s| s.is_system_state()).unwrap_or(false);
            if !is_state {
                self.remove_component_by_id(entity, id, true);
            }
        }

        let has_state = self.entities.get(entity).map(|r| r.state_component_count > 0).unwrap_or(false);
        if has_state {
            return;
        }

        // Nothing system-state-bearing remains; drop anything left (shouldn't be any) and free.
        let remaining: SmallVec<[ComponentId; 8]> =
            self.entities.get(entity).map(|r| r.component_order.clone()).unwrap_or_default();
        for id in remaining {
            self.remove_component_by_id(entity, id, true);
        }
        for query in &mut self.queries {
            query.remove_entity(entity);
        }
        self.entities.free(entity);
    }

    /// Structural copy of `other`'s attached components onto `entity`. A no-op (not a panic) if
    /// either handle is stale or unknown, matching every other mutator in this file.
    pub fn copy_entity(&mut self, entity: Entity, other: Entity) {
        if self.entities.get(entity).is_none() || self.entities.get(other).is_none() {
            return;
        }
        let component_ids: SmallVec<[ComponentId; 8]> =
            self.entities.get(other).map(|r| r.component_order.clone()).unwrap_or_default();
        for id in component_ids {
            let Some(instance) =
                self.entities.get(other).and_then(|r| r.components.get(&id)).map(|c| c.clone_component())
            else {
                continue;
            };
            let already_attached =
                self.entities.get(entity).map(|r| r.components.contains_key(&id)).unwrap_or(false);
            if already_attached {
                if let Some(existing) =
                    self.entities.get_mut(entity).and_then(|r| r.components.get_mut(&id))
                {
                    existing.copy_from(instance.as_ref());
                }
            } else {
                let is_system_state =
                    self.component_stores.get(&id).map(|s| s.is_system_state()).unwrap_or(false);
                self.attach_instance(entity, id, instance, is_system_state);
            }
        }
    }

    /// Creates a new entity with the same attached components as `entity`, born alive the same
    /// way [`World::create_entity`] is: `add_entity` replays its (just-copied) components into
    /// every query they match, so the clone is immediately visible to queries, `stats()`, and
    /// future bootstrap scans rather than sitting invisibly detached forever.
    pub fn clone_entity(&mut self, entity: Entity) -> Entity {
        let clone = self.create_detached_entity();
        self.copy_entity(clone, entity);
        self.add_entity(clone);
        clone
    }

    // -------------------------------------------------------------------------------- queries

    /// Canonicalizes `spec` to a key and returns the cached query, or builds and indexes a new
    /// one (scanning existing entities, without emitting add-events for the bootstrap).
    pub fn try_get_query(&mut self, spec: QuerySpec) -> EcsResult<QueryId> {
        let key = spec.key();
        if let Some(&id) = self.query_by_key.get(&key) {
            return Ok(id);
        }

        let mut include_bits = BitSet::new();
        for id in spec.include_ids() {
            include_bits.insert(self.type_index(id));
        }
        let mut exclude_bits = BitSet::new();
        for id in spec.exclude_ids() {
            exclude_bits.insert(self.type_index(id));
        }

        let mut query = Query::new(&spec, include_bits, exclude_bits)?;
        for (entity, record) in self.entities.iter() {
            if query.matches(&record.component_bits) {
                query.add_entity_silent(entity);
            }
        }

        let id = self.queries.len();
        self.query_by_key.insert(key, id);
        let matched: Vec<Entity> = query.entities().to_vec();
        self.queries.push(query);

        for component_id in spec.include_ids().chain(spec.exclude_ids()) {
            self.queries_by_component.entry(component_id).or_default().push(id);
        }

        for entity in matched {
            self.entities.get_mut(entity).unwrap().queries.push(id);
        }
        Ok(id)
    }

    /// Panics on an invalid spec (empty include set), matching the spec's "fatal at call site"
    /// disposition for this error.
    pub fn get_query(&mut self, spec: QuerySpec) -> QueryId {
        self.try_get_query(spec).expect("invalid query spec")
    }

    pub fn query_by_id(&self, id: QueryId) -> &Query { &self.queries[id] }

    pub(crate) fn query_by_id_mut(&mut self, id: QueryId) -> &mut Query { &mut self.queries[id] }

    pub fn queries(&self) -> &[Query] { &self.queries }

    /// Reindexes only the queries whose include/exclude set actually references `component`
    /// (via the `queries_by_component` reverse index), not the full query table — the spec's
    /// §4.3 "query reindexing is O(queries-referencing-affected-type)" contract.
    fn on_component_added(&mut self, entity: Entity, component: ComponentId) {
        let bits = match self.entities.get(entity) {
            Some(r) => r.component_bits.clone(),
            None => return,
        };
        let index = match self.type_index.get(&component) {
            Some(i) => *i,
            None => return,
        };
        let Some(candidates) = self.queries_by_component.get(&component) else { return };
        let candidates: SmallVec<[QueryId; 4]> = candidates.clone();
        for query_id in candidates {
            let query = &mut self.queries[query_id];
            let in_exclude = query.exclude_bits.contains(index);
            let in_include = query.include_bits.contains(index);
            if in_exclude && query.contains(entity) {
                query.remove_entity(entity);
                if let Some(record) = self.entities.get_mut(entity) {
                    record.queries.retain(|q| *q != query_id);
                }
            } else if in_include && !query.contains(entity) && query.matches(&bits) {
                query.add_entity(entity);
                if let Some(record) = self.entities.get_mut(entity) {
                    record.queries.push(query_id);
                }
            }
        }
    }

    fn on_component_removed(&mut self, entity: Entity, component: ComponentId) {
        let bits = match self.entities.get(entity) {
            Some(r) => r.component_bits.clone(),
            None => return,
        };
        let index = match self.type_index.get(&component) {
            Some(i) => *i,
            None => return,
        };
        let Some(candidates) = self.queries_by_component.get(&component) else { return };
        let candidates: SmallVec<[QueryId; 4]> = candidates.clone();
        for query_id in candidates {
            let query = &mut self.queries[query_id];
            let in_exclude = query.exclude_bits.contains(index);
            let in_include = query.include_bits.contains(index);
            if in_exclude && !query.contains(entity) && query.matches(&bits) {
                query.add_entity(entity);
                if let Some(record) = self.entities.get_mut(entity) {
                    record.queries.push(query_id);
                }
            } else if in_include && query.contains(entity) && !query.matches(&bits) {
                query.remove_entity(entity);
                if let Some(record) = self.entities.get_mut(entity) {
                    record.queries.retain(|q| *q != query_id);
                }
            }
        }
    }

    // ------------------------------------------------------------------------------ scheduler

    /// Drains both deferred-work queues: disposes queued entities, then finalizes queued
    /// component removals. Best-effort — failures on one entity should not block the rest, but
    /// since every step here is infallible by construction, there is nothing to isolate today.
    pub fn process_deferred_removal(&mut self) {
        let dispose = std::mem::take(&mut self.dispose_queue);
        for entity in dispose {
            self.finalize_dispose_for_drain(entity);
        }
        let removals = std::mem::take(&mut self.removal_queue);
        for entity in removals {
            self.process_removed_components(entity);
        }
    }

    fn finalize_dispose_for_drain(&mut self, entity: Entity) {
        if self.entities.get(entity).is_some() {
            self.finalize_dispose(entity);
        }
    }

    /// Runs one tick: computes `delta` from the monotonic clock if not supplied, drives every
    /// enabled system in priority order, then (if enabled) drains deferred removals.
    pub fn execute(&mut self, delta: Option<f32>, time: Option<f32>) {
        if !self.enabled {
            return;
        }
        let now = Instant::now();
        let dt = delta.unwrap_or_else(|| {
            let elapsed = self.last_tick.map(|t| now.duration_since(t).as_secs_f32()).unwrap_or(0.0);
            elapsed
        });
        self.last_tick = Some(now);
        let t = time.unwrap_or(0.0);

        let mut manager = std::mem::take(&mut self.system_manager);
        manager.execute_all(self, dt, t, false);
        self.system_manager = manager;

        if self.deferred_removal_enabled {
            self.process_deferred_removal();
        }
    }

    pub fn stop(&mut self) {
        self.enabled = false;
        self.system_manager.stop();
    }

    pub fn play(&mut self) {
        self.enabled = true;
        self.system_manager.play();
    }

    pub fn is_running(&self) -> bool { self.enabled }

    /// Looks up a registered system by its concrete type. The spec's `getSystem(Type)`.
    pub fn get_system<S: crate::system::System>(&self) -> Option<&S> {
        self.system_manager.get::<S>()
    }

    /// Every registered system as an untyped trait object, in registration order. The spec's
    /// `getSystems()`.
    pub fn get_systems(&self) -> impl Iterator<Item = &dyn crate::system::System> {
        self.system_manager.systems()
    }

    /// Removes a registered system by its concrete type, calling `stop()` on the manager's
    /// bookkeeping for it first (see the spec's open question on `removeSystem`).
    pub fn remove_system<S: crate::system::System>(&mut self) -> bool {
        self.system_manager.remove::<S>()
    }

    /// Every registered system's `toJSON()` form: name, enabled, last execute time, priority,
    /// and its declared queries' keys/mandatory/reactive/listen-buffer-size state.
    pub fn system_stats(&self) -> Vec<crate::system::SystemJson> {
        self.system_manager.stats(self)
    }

    /// Pauses a single system by type, leaving the rest of the schedule untouched — the
    /// per-system generalization of the broadcast [`World::stop`].
    pub fn stop_system<S: crate::system::System>(&mut self) -> bool {
        self.system_manager.stop_one::<S>()
    }

    pub fn play_system<S: crate::system::System>(&mut self) -> bool {
        self.system_manager.play_one::<S>()
    }

    /// Discards a single system's buffered reactive events without running it.
    pub fn clear_system_events<S: crate::system::System>(&self) -> bool {
        self.system_manager.clear_events::<S>()
    }

    pub fn stats(&self) -> WorldStats {
        WorldStats {
            num_entities: self.entities.iter().count(),
            num_component_types: self.component_stores.len(),
            num_queries: self.queries.len(),
            num_systems: self.system_manager.len(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct WorldStats {
    pub num_entities: usize,
    pub num_component_types: usize,
    pub num_queries: usize,
    pub num_systems: usize,
}
