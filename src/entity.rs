//! Entity identities and the per-entity bookkeeping the world keeps for them.
//!
//! `Entity` itself is a lightweight, `Copy` handle (index + generation), in the style of
//! `legion`'s allocator. All of the state the specification hangs off of "the entity" — its
//! attached components, which queries it belongs to, its pending removals, its alive flag and
//! system-state counter — lives in an [`EntityRecord`] owned by the [`crate::world::World`]'s
//! entity arena, indexed by `Entity::index`. This keeps component storage in per-type arenas
//! (see [`crate::component::ComponentStore`]) rather than inside the entity itself.

use crate::component::{Component, ComponentId};
use crate::query::QueryId;
use bit_set::BitSet;
use fxhash::FxHashMap;
use smallvec::SmallVec;
use std::fmt;

pub(crate) type EntityIndex = u32;
pub(crate) type EntityGeneration = u32;

/// A handle to an entity: stable identity, cheap to copy, meaningless once the generation it
/// was issued for has been recycled.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct Entity {
    pub(crate) index: EntityIndex,
    pub(crate) generation: EntityGeneration,
}

impl Entity {
    pub(crate) fn new(index: EntityIndex, generation: EntityGeneration) -> Self {
        Self { index, generation }
    }

    pub fn index(self) -> u32 { self.index }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({}#{})", self.index, self.generation)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.index, self.generation)
    }
}

/// Per-entity state the world maintains out-of-line from the `Entity` handle itself.
pub(crate) struct EntityRecord {
    pub generation: EntityGeneration,
    pub alive: bool,
    pub name: Option<String>,
    pub components: FxHashMap<ComponentId, Box<dyn Component>>,
    /// Attachment order, so `clone`/iteration is deterministic.
    pub component_order: SmallVec<[ComponentId; 8]>,
    /// Mirrors `components`' key set as a bitset over the world's dense type indices, so query
    /// matching is a couple of word-sized set operations instead of a hash-map walk per term.
    pub component_bits: BitSet,
    pub queries: SmallVec<[QueryId; 4]>,
    pub pending_removal: FxHashMap<ComponentId, Box<dyn Component>>,
    pub state_component_count: u32,
}

impl EntityRecord {
    fn fresh(generation: EntityGeneration) -> Self {
        Self {
            generation,
            alive: false,
            name: None,
            components: FxHashMap::default(),
            component_order: SmallVec::new(),
            component_bits: BitSet::new(),
            queries: SmallVec::new(),
            pending_removal: FxHashMap::default(),
            state_component_count: 0,
        }
    }

    fn reset(&mut self) {
        self.alive = false;
        self.name = None;
        self.components.clear();
        self.component_order.clear();
        self.component_bits.clear();
        self.queries.clear();
        self.pending_removal.clear();
        self.state_component_count = 0;
    }

    pub fn is_ghost(&self) -> bool { !self.alive && self.state_component_count > 0 }
}

/// The entity arena: a dense `Vec` of slots, each either free (tracked in `free_list`, which
/// doubles as the "entity pool" the specification describes) or occupied by an `EntityRecord`.
#[derive(Default)]
pub(crate) struct EntityArena {
    slots: Vec<EntityRecord>,
    free_list: Vec<EntityIndex>,
}

impl EntityArena {
    pub fn new() -> Self { Self::default() }

    /// Acquires a slot from the free list, or grows the arena by one fresh slot.
    pub fn allocate(&mut self) -> Entity {
        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            Entity::new(index, slot.generation)
        } else {
            let index = self.slots.len() as EntityIndex;
            self.slots.push(EntityRecord::fresh(0));
            Entity::new(index, 0)
        }
    }

    /// Returns a slot to the free list, bumping its generation so stale handles are rejected.
    pub fn free(&mut self, entity: Entity) {
        let slot = &mut self.slots[entity.index as usize];
        slot.reset();
        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(entity.index);
    }

    pub fn is_current(&self, entity: Entity) -> bool {
        self.slots
            .get(entity.index as usize)
            .map(|slot| slot.generation == entity.generation)
            .unwrap_or(false)
    }

    pub fn get(&self, entity: Entity) -> Option<&EntityRecord> {
        if !self.is_current(entity) {
            return None;
        }
        self.slots.get(entity.index as usize)
    }

    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut EntityRecord> {
        if !self.is_current(entity) {
            return None;
        }
        self.slots.get_mut(entity.index as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Entity, &EntityRecord)> {
        self.slots.iter().enumerate().filter_map(|(i, slot)| {
            if slot.alive || slot.is_ghost() {
                Some((Entity::new(i as EntityIndex, slot.generation), slot))
            } else {
                None
            }
        })
    }

    pub fn total_allocated(&self) -> usize { self.slots.len() }

    pub fn free_count(&self) -> usize { self.free_list.len() }
}
