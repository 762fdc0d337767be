use criterion::*;

use ecstasy::component::ComponentKind;
use ecstasy::query::QuerySpec;
use ecstasy::world::World;

#[derive(Clone, Default)]
struct Position {
    x: f32,
    y: f32,
}

#[derive(Clone, Default)]
struct Velocity {
    x: f32,
    y: f32,
}

#[derive(Clone, Default)]
struct Marker;

fn populated_world(count: usize) -> World {
    let mut world = World::new();
    world.register_component::<Position>(ComponentKind::NORMAL, true).unwrap();
    world.register_component::<Velocity>(ComponentKind::NORMAL, true).unwrap();
    world.register_component::<Marker>(ComponentKind::TAG, true).unwrap();
    for i in 0..count {
        let entity = world.create_entity();
        world.add_component::<Position>(entity, None);
        if i % 2 == 0 {
            world.add_component::<Velocity>(entity, None);
        }
    }
    world
}

fn bench_attach_detach_churn(c: &mut Criterion) {
    c.bench_function("attach_detach_churn_1000", |b| {
        b.iter(|| {
            let mut world = populated_world(1000);
            let query = world.get_query(QuerySpec::new().with::<Position>().with::<Velocity>());
            for i in 0..1000 {
                let entity = world.create_entity();
                world.add_component::<Position>(entity, None);
                world.add_component::<Velocity>(entity, None);
                if i % 3 == 0 {
                    world.remove_component::<Velocity>(entity, true);
                }
            }
            black_box(world.query_by_id(query).len());
        });
    });
}

fn bench_query_resolution_with_existing_entities(c: &mut Criterion) {
    c.bench(
        "get_query_bootstrap_scan",
        ParameterizedBenchmark::new(
            "entity_count",
            |b, n| {
                b.iter(|| {
                    let mut world = populated_world(*n);
                    let query = world.get_query(QuerySpec::new().with::<Position>());
                    black_box(world.query_by_id(query).len());
                });
            },
            (1..6).map(|i| i * 2000),
        ),
    );
}

fn bench_pooled_component_attach(c: &mut Criterion) {
    c.bench_function("pooled_attach_after_drain", |b| {
        b.iter(|| {
            let mut world = populated_world(0);
            let mut entities = Vec::with_capacity(500);
            for _ in 0..500 {
                let entity = world.create_entity();
                world.add_component::<Marker>(entity, None);
                entities.push(entity);
            }
            for entity in entities.drain(..) {
                world.remove_component::<Marker>(entity, true);
            }
            for _ in 0..500 {
                let entity = world.create_entity();
                world.add_component::<Marker>(entity, None);
            }
        });
    });
}

criterion_group!(
    world_benches,
    bench_attach_detach_churn,
    bench_query_resolution_with_existing_entities,
    bench_pooled_component_attach,
);
criterion_main!(world_benches);
