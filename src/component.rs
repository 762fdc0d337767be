//! Component types, instances and their per-type store.
//!
//! A component type is any `T: Default + Clone + 'static`; the blanket impl below is the
//! Rust-native stand-in for the source runtime's per-field `{type, default, clone, copy}`
//! descriptor (see [`crate::types`] for the literal, schema-driven version of that vtable).
//! Components are stored behind `Box<dyn Component>` so the world can keep a single
//! heterogeneous arena per type without generic parameters leaking into `World`/`Entity`.

use crate::pool::{ObjectPool, Poolable};
use downcast_rs::{impl_downcast, Downcast};
use std::any::TypeId;

/// Stable identifier for a component type. Spec calls this a "runtime class name"; here it is
/// simply a [`TypeId`], per the design note to key arenas by a stable type identifier rather
/// than dynamic dispatch on a class name.
pub type ComponentId = TypeId;

/// A component type's runtime vtable: construct a detached clone, and copy another instance's
/// fields into this one.
pub trait Component: Downcast {
    fn clone_component(&self) -> Box<dyn Component>;
    fn copy_from(&mut self, other: &dyn Component);
    fn type_name(&self) -> &'static str;
    fn component_type_id(&self) -> ComponentId;
}
impl_downcast!(Component);

impl<T> Component for T
where
    T: Default + Clone + 'static,
{
    fn clone_component(&self) -> Box<dyn Component> { Box::new(self.clone()) }

    fn copy_from(&mut self, other: &dyn Component) {
        if let Some(other) = other.downcast_ref::<T>() {
            self.clone_from(other);
        }
    }

    fn type_name(&self) -> &'static str { std::any::type_name::<T>() }

    fn component_type_id(&self) -> ComponentId { TypeId::of::<T>() }
}

impl Clone for Box<dyn Component> {
    fn clone(&self) -> Self { self.clone_component() }
}

impl Poolable for Box<dyn Component> {
    fn reset_to(&mut self, prototype: &Self) { self.copy_from(prototype.as_ref()); }
}

/// How a component type behaves with respect to entity lifecycle and query membership.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ComponentKind {
    /// A tag carries no meaningful fields; it exists purely for query membership.
    pub tag: bool,
    /// A system-state component survives its owner's logical death; see the ghost-entity rule.
    pub system_state: bool,
}

impl ComponentKind {
    pub const NORMAL: Self = Self { tag: false, system_state: false };
    pub const TAG: Self = Self { tag: true, system_state: false };
    pub const SYSTEM_STATE: Self = Self { tag: false, system_state: true };
}

/// Per-component-type storage: a prototype, an optional recycling pool, live-instance count and
/// lifecycle kind. Registered once per type in [`crate::world::World::register_component`].
pub struct ComponentStore {
    prototype: Box<dyn Component>,
    type_name: &'static str,
    kind: ComponentKind,
    pool: Option<ObjectPool<Box<dyn Component>>>,
    live_count: usize,
}

impl ComponentStore {
    pub fn new(prototype: Box<dyn Component>, kind: ComponentKind, pooled: bool) -> Self {
        let type_name = prototype.type_name();
        let pool = if pooled { Some(ObjectPool::new(prototype.clone_component())) } else { None };
        Self { prototype, type_name, kind, pool, live_count: 0 }
    }

    /// Produces a fresh, detached instance: pulled from the pool if enabled, otherwise a plain
    /// clone of the prototype.
    pub fn construct(&mut self) -> Box<dyn Component> {
        self.live_count += 1;
        match &mut self.pool {
            Some(pool) => pool.acquire(),
            None => self.prototype.clone_component(),
        }
    }

    /// Returns `instance` to the pool (resetting it to the prototype) or drops it if unpooled.
    pub fn dispose(&mut self, instance: Box<dyn Component>) {
        self.live_count -= 1;
        if let Some(pool) = &mut self.pool {
            pool.release(instance);
        }
    }

    /// Accounts for an instance that was constructed outside this store (attached directly via
    /// `World::attach_component` rather than `construct()`), so `live_count`/`dispose` stay
    /// balanced for it too.
    pub fn note_external_construct(&mut self) {
        self.live_count += 1;
    }

    pub fn live_count(&self) -> usize { self.live_count }

    pub fn kind(&self) -> ComponentKind { self.kind }

    pub fn is_tag(&self) -> bool { self.kind.tag }

    pub fn is_system_state(&self) -> bool { self.kind.system_state }

    pub fn type_name(&self) -> &'static str { self.type_name }

    pub fn pool(&self) -> Option<&ObjectPool<Box<dyn Component>>> { self.pool.as_ref() }

    pub fn prototype(&self) -> &dyn Component { self.prototype.as_ref() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Default, Debug, PartialEq)]
    struct Position {
        x: f32,
        y: f32,
    }

    #[test]
    fn clone_and_copy_round_trip() {
        let a: Box<dyn Component> = Box::new(Position { x: 1.0, y: 2.0 });
        let mut b: Box<dyn Component> = Box::new(Position::default());
        b.copy_from(a.as_ref());
        assert_eq!(*b.downcast_ref::<Position>().unwrap(), Position { x: 1.0, y: 2.0 });
    }

    #[test]
    fn store_tracks_live_count() {
        let mut store =
            ComponentStore::new(Box::new(Position::default()), ComponentKind::NORMAL, true);
        let a = store.construct();
        let b = store.construct();
        assert_eq!(store.live_count(), 2);
        store.dispose(a);
        store.dispose(b);
        assert_eq!(store.live_count(), 0);
    }

    #[test]
    fn pooled_construct_recycles_released_instances() {
        let mut store =
            ComponentStore::new(Box::new(Position::default()), ComponentKind::NORMAL, true);
        let mut a = store.construct();
        a.downcast_mut::<Position>().unwrap().x = 5.0;
        store.dispose(a);

        let b = store.construct();
        assert_eq!(*b.downcast_ref::<Position>().unwrap(), Position::default());
    }
}
