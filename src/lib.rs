//! A data-driven entity-component-system runtime: an entity/component store, an incrementally
//! maintained query index, and a reactive, priority-ordered system scheduler.
//!
//! Components are ordinary `Default + Clone` Rust types (see [`component`]); entities are cheap
//! `Copy` handles into a generational arena (see [`entity`]); queries are `(include, exclude)`
//! predicates whose matching-entity lists are kept up to date as components are attached and
//! detached, rather than recomputed per tick (see [`query`]); systems declare the queries they
//! need up front and are driven each tick by a [`system::SystemManager`] in priority order.
//!
//! ```
//! use ecstasy::prelude::*;
//!
//! #[derive(Clone, Default)]
//! struct Position { x: f32, y: f32 }
//!
//! let mut world = World::new();
//! world.register_component::<Position>(ComponentKind::NORMAL, true).unwrap();
//!
//! let query = world.get_query(QuerySpec::new().with::<Position>());
//! let entity = world.create_entity();
//! world.add_component::<Position>(entity, None);
//!
//! assert_eq!(world.query_by_id(query).len(), 1);
//! ```

pub mod component;
pub mod entity;
pub mod error;
pub mod event;
pub mod pool;
pub mod query;
pub mod system;
pub mod types;
pub mod world;

/// Crate version, used in the `world-created` observability event.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Re-exports of the types most hosts need to wire up a world, register components, build
/// queries and systems.
pub mod prelude {
    pub use crate::component::{Component, ComponentId, ComponentKind};
    pub use crate::entity::Entity;
    pub use crate::error::{EcsError, EcsResult};
    pub use crate::query::QuerySpec;
    pub use crate::system::{Listen, QueryDecl, System, SystemBuilder, SystemJson, SystemRunCtx};
    pub use crate::world::World;
}
