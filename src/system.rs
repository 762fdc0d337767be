//! Systems and the manager that schedules them.
//!
//! A system is built with a [`SystemBuilder`]: it declares named queries (optionally mandatory,
//! optionally reactive) up front, then wraps a [`System`] implementation. The manager resolves
//! each declaration against the world's query table at registration time, wires any `listen`
//! declarations into that query's event dispatcher, and re-sorts its execution order by
//! `(priority, registration order)` whenever a system is added.

use crate::component::ComponentId;
use crate::entity::Entity;
use crate::query::{QueryId, QuerySpec};
use crate::world::World;
use downcast_rs::{impl_downcast, Downcast};
use fxhash::FxHashMap;
use std::any::TypeId;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// What a query's `changed` listener narrows its attention to.
#[derive(Clone, Debug)]
pub enum ChangedFilter {
    /// Any change to any component the query includes.
    Any,
    /// Only changes to these component types.
    Types(Vec<ComponentId>),
}

/// Which reactive events a query declaration subscribes to.
#[derive(Clone, Debug, Default)]
pub struct Listen {
    pub added: bool,
    pub removed: bool,
    pub changed: Option<ChangedFilter>,
}

impl Listen {
    pub fn none() -> Self { Self::default() }

    pub fn added() -> Self { Self { added: true, ..Self::default() } }

    pub fn added_removed() -> Self { Self { added: true, removed: true, ..Self::default() } }

    pub fn changed_any(mut self) -> Self {
        self.changed = Some(ChangedFilter::Any);
        self
    }

    pub fn changed_types(mut self, types: Vec<ComponentId>) -> Self {
        self.changed = Some(ChangedFilter::Types(types));
        self
    }

    fn is_reactive(&self) -> bool { self.added || self.removed || self.changed.is_some() }
}

/// One query a system declares: its predicate, whether the system requires it non-empty to run
/// (`mandatory`), and which reactive events it listens for.
pub struct QueryDecl {
    pub name: &'static str,
    pub spec: QuerySpec,
    pub mandatory: bool,
    pub listen: Listen,
}

impl QueryDecl {
    pub fn new(name: &'static str, spec: QuerySpec) -> Self {
        Self { name, spec, mandatory: false, listen: Listen::none() }
    }

    pub fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }

    pub fn listen(mut self, listen: Listen) -> Self {
        self.listen = listen;
        self
    }
}

#[derive(Default)]
struct QueryBuffers {
    added: Vec<Entity>,
    removed: Vec<Entity>,
    changed: Vec<Entity>,
    changed_seen: std::collections::HashSet<Entity, fxhash::FxBuildHasher>,
}

impl QueryBuffers {
    fn clear(&mut self) {
        self.added.clear();
        self.removed.clear();
        self.changed.clear();
        self.changed_seen.clear();
    }

    fn push_changed(&mut self, entity: Entity) {
        if self.changed_seen.insert(entity) {
            self.changed.push(entity);
        }
    }
}

type SharedBuffers = Rc<RefCell<QueryBuffers>>;

/// A read-only snapshot of one named query as seen by a system during one `execute` call:
/// its materialized entities plus whatever accumulated in its reactive buffers since the last
/// time this system ran.
pub struct QueryView {
    pub mandatory: bool,
    pub entities: Vec<Entity>,
    pub added: Vec<Entity>,
    pub removed: Vec<Entity>,
    pub changed: Vec<Entity>,
}

/// Everything a system's `execute` needs: mutable world access plus the snapshot of its own
/// declared queries.
pub struct SystemRunCtx<'w> {
    pub world: &'w mut World,
    pub queries: FxHashMap<&'static str, QueryView>,
}

impl<'w> SystemRunCtx<'w> {
    pub fn query(&self, name: &str) -> &QueryView {
        self.queries.get(name).unwrap_or_else(|| panic!("system has no query named `{}`", name))
    }
}

/// User-implemented system behavior. `init` runs once at registration; `execute` runs once per
/// tick the system is enabled, initialized, and its mandatory queries are all non-empty.
pub trait System: Downcast {
    fn init(&mut self, _world: &mut World) {}

    fn execute(&mut self, ctx: &mut SystemRunCtx, delta: f32, time: f32);
}
impl_downcast!(System);

/// Opaque handle used for duplicate-registration checks and `removeSystem` (removal is always
/// by type identity, never by array index — see the spec's open question on this).
pub type SystemId = TypeId;

/// The trait-object `system`/`buffers` fields can't derive `Debug` on their own; `derivative`
/// lets the rest of the struct's fields (the bookkeeping actually worth printing) derive it
/// normally while those two are just elided.
#[derive(derivative::Derivative)]
#[derivative(Debug)]
struct SystemEntry {
    id: SystemId,
    name: &'static str,
    #[derivative(Debug = "ignore")]
    system: Box<dyn System>,
    decls: Vec<(QueryId, &'static str, bool)>,
    #[derivative(Debug = "ignore")]
    buffers: FxHashMap<&'static str, SharedBuffers>,
    priority: i32,
    order: u64,
    enabled: bool,
    initialized: bool,
    has_execute: bool,
    last_execute_time: Duration,
}

impl SystemEntry {
    fn snapshot_queries(&self, world: &World) -> FxHashMap<&'static str, QueryView> {
        self.decls
            .iter()
            .map(|(query_id, name, mandatory)| {
                let query = world.query_by_id(*query_id);
                let buffers = self.buffers.get(name).unwrap().borrow();
                let view = QueryView {
                    mandatory: *mandatory,
                    entities: query.entities().to_vec(),
                    added: buffers.added.clone(),
                    removed: buffers.removed.clone(),
                    changed: buffers.changed.clone(),
                };
                (*name, view)
            })
            .collect()
    }

    fn can_execute(&self, world: &World) -> bool {
        self.decls
            .iter()
            .filter(|(_, _, mandatory)| *mandatory)
            .all(|(query_id, _, _)| !world.query_by_id(*query_id).is_empty())
    }

    fn clear_buffers(&self) {
        for buf in self.buffers.values() {
            buf.borrow_mut().clear();
        }
    }

    fn to_json(&self, world: &World) -> SystemJson {
        let queries = self
            .decls
            .iter()
            .map(|(query_id, name, mandatory)| {
                let query = world.query_by_id(*query_id);
                let buffers = self.buffers.get(name).unwrap().borrow();
                let listen = if query.is_reactive() {
                    Some(ListenJson {
                        added: buffers.added.len(),
                        removed: buffers.removed.len(),
                        changed: buffers.changed.len(),
                    })
                } else {
                    None
                };
                (
                    name.to_string(),
                    QueryDeclJson {
                        key: query.key().to_string(),
                        mandatory: *mandatory,
                        reactive: query.is_reactive(),
                        listen,
                    },
                )
            })
            .collect();
        SystemJson {
            name: self.name.to_string(),
            enabled: self.enabled,
            execute_time: self.last_execute_time.as_secs_f64(),
            priority: self.priority,
            queries,
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ListenJson {
    pub added: usize,
    pub removed: usize,
    pub changed: usize,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct QueryDeclJson {
    pub key: String,
    pub mandatory: bool,
    pub reactive: bool,
    pub listen: Option<ListenJson>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct SystemJson {
    pub name: String,
    pub enabled: bool,
    pub execute_time: f64,
    pub priority: i32,
    pub queries: FxHashMap<String, QueryDeclJson>,
}

/// A system under construction: name, priority, and query declarations, ready to be attached to
/// a concrete [`System`] implementation via [`SystemBuilder::build`].
pub struct SystemBuilder {
    name: &'static str,
    priority: i32,
    decls: Vec<QueryDecl>,
}

impl SystemBuilder {
    pub fn new(name: &'static str) -> Self { Self { name, priority: 0, decls: Vec::new() } }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn query(mut self, decl: QueryDecl) -> Self {
        self.decls.push(decl);
        self
    }

    /// Resolves every declared query against `world`'s query table, wires reactive listeners,
    /// runs `system.init`, and registers it with the world's scheduler.
    pub fn build<S: System>(self, world: &mut World, mut system: S) -> SystemId {
        let id = TypeId::of::<S>();
        if world.system_manager.by_id.contains_key(&id) {
            tracing::warn!(system = self.name, "system already registered; ignoring");
            world.record_warning(format!("duplicate registration for system `{}`", self.name));
            return id;
        }

        let mut decls = Vec::with_capacity(self.decls.len());
        let mut buffers = FxHashMap::default();
        for decl in &self.decls {
            let query_id = world.get_query(decl.spec.clone());
            decls.push((query_id, decl.name, decl.mandatory));

            let shared: SharedBuffers = Rc::new(RefCell::new(QueryBuffers::default()));
            buffers.insert(decl.name, shared.clone());

            if decl.listen.is_reactive() {
                let query = world.query_by_id_mut(query_id);
                query.set_reactive();
                if decl.listen.added {
                    let buf = shared.clone();
                    query.on_added.add(move |e| buf.borrow_mut().added.push(*e));
                }
                if decl.listen.removed {
                    let buf = shared.clone();
                    query.on_removed.add(move |e| buf.borrow_mut().removed.push(*e));
                }
                match &decl.listen.changed {
                    Some(ChangedFilter::Any) => {
                        let buf = shared.clone();
                        query.on_changed.add(move |(e, _)| buf.borrow_mut().push_changed(*e));
                    }
                    Some(ChangedFilter::Types(types)) => {
                        let buf = shared.clone();
                        let types = types.clone();
                        query.on_changed.add(move |(e, component)| {
                            if types.contains(component) {
                                buf.borrow_mut().push_changed(*e);
                            }
                        });
                    }
                    None => {}
                }
            }
        }

        system.init(world);

        let order = world.system_manager.next_order;
        world.system_manager.next_order += 1;

        let entry = SystemEntry {
            id,
            name: self.name,
            system: Box::new(system),
            decls,
            buffers,
            priority: self.priority,
            order,
            enabled: true,
            initialized: true,
            has_execute: true,
            last_execute_time: Duration::default(),
        };
        world.system_manager.insert(entry);
        id
    }
}

/// Owns every registered system and the priority-ordered execution list.
#[derive(Default)]
pub struct SystemManager {
    systems: Vec<SystemEntry>,
    by_id: FxHashMap<SystemId, usize>,
    execute_order: Vec<usize>,
    next_order: u64,
}

impl SystemManager {
    fn insert(&mut self, entry: SystemEntry) {
        self.by_id.insert(entry.id, self.systems.len());
        let has_execute = entry.has_execute;
        self.systems.push(entry);
        if has_execute {
            self.execute_order.push(self.systems.len() - 1);
        }
        self.resort();
    }

    fn resort(&mut self) {
        let systems = &self.systems;
        self.execute_order.sort_by(|&a, &b| {
            systems[a].priority.cmp(&systems[b].priority).then(systems[a].order.cmp(&systems[b].order))
        });
    }

    /// Removes the system of type `S`, calling `stop()` on it first. Removal is always by type
    /// identity (never by array index — the source's `indexOf`-based removal conflated the two
    /// and is respecified here as type-keyed).
    pub fn remove<S: System>(&mut self) -> bool {
        let id = TypeId::of::<S>();
        let Some(&index) = self.by_id.get(&id) else { return false };
        self.systems[index].enabled = false;
        self.systems.remove(index);
        self.by_id.remove(&id);
        for v in self.by_id.values_mut() {
            if *v > index {
                *v -= 1;
            }
        }
        self.execute_order.retain(|&i| i != index);
        for i in self.execute_order.iter_mut() {
            if *i > index {
                *i -= 1;
            }
        }
        true
    }

    pub fn get<S: System>(&self) -> Option<&S> {
        let id = TypeId::of::<S>();
        self.by_id.get(&id).and_then(|&i| self.systems[i].system.downcast_ref::<S>())
    }

    /// Every registered system, as trait objects, in registration order (not execution order) —
    /// the untyped `getSystems()` surface a host uses for introspection/debug UIs rather than
    /// for driving a specific system by its concrete type.
    pub fn systems(&self) -> impl Iterator<Item = &dyn System> {
        self.systems.iter().map(|entry| entry.system.as_ref())
    }

    pub(crate) fn execute_all(&mut self, world: &mut World, delta: f32, time: f32, force: bool) {
        let order = self.execute_order.clone();
        for index in order {
            let (should_run, name) = {
                let entry = &self.systems[index];
                (entry.initialized && (force || entry.enabled) && entry.can_execute(world), entry.name)
            };
            if !should_run {
                continue;
            }
            let start = Instant::now();
            let mut ctx = SystemRunCtx {
                queries: self.systems[index].snapshot_queries(world),
                world,
            };
            tracing::trace!(system = name, "executing system");
            self.systems[index].system.execute(&mut ctx, delta, time);
            let elapsed = start.elapsed();
            let entry = &mut self.systems[index];
            entry.last_execute_time = elapsed;
            entry.clear_buffers();
        }
    }

    /// Broadcasts stop to every system: disabled, timing zeroed. No events are emitted while
    /// stopped, since a disabled system is simply skipped by `execute_all`.
    pub fn stop(&mut self) {
        for entry in &mut self.systems {
            entry.enabled = false;
            entry.last_execute_time = Duration::default();
        }
    }

    pub fn play(&mut self) {
        for entry in &mut self.systems {
            entry.enabled = true;
        }
    }

    /// Stops a single system by type identity, leaving the rest of the schedule untouched.
    pub fn stop_one<S: System>(&mut self) -> bool {
        let id = TypeId::of::<S>();
        let Some(&index) = self.by_id.get(&id) else { return false };
        self.systems[index].enabled = false;
        self.systems[index].last_execute_time = Duration::default();
        true
    }

    /// Clears one system's per-query reactive buffers on demand — the spec's `clearEvents()`,
    /// normally invoked automatically after that system's own `execute` but exposed here for a
    /// host that wants to discard buffered events without running the system.
    pub fn clear_events<S: System>(&self) -> bool {
        let id = TypeId::of::<S>();
        let Some(&index) = self.by_id.get(&id) else { return false };
        self.systems[index].clear_buffers();
        true
    }

    pub fn play_one<S: System>(&mut self) -> bool {
        let id = TypeId::of::<S>();
        let Some(&index) = self.by_id.get(&id) else { return false };
        self.systems[index].enabled = true;
        true
    }

    pub fn stats(&self, world: &World) -> Vec<SystemJson> {
        self.systems.iter().map(|e| e.to_json(world)).collect()
    }

    pub fn len(&self) -> usize { self.systems.len() }

    pub fn is_empty(&self) -> bool { self.systems.is_empty() }
}
