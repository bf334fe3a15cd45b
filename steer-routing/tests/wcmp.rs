// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

use approx::assert_relative_eq;
use steer_engine::test_helpers::start_test;
use steer_routing::errors::RoutingError;
use steer_routing::flow_cache::FlowRouteCache;
use steer_routing::load_balancer::{LoadBalancer, StatelessLoadBalancer};
use steer_routing::path::Path;
use steer_routing::registry::{
    DEFAULT_WEIGHT_TOLERANCE, RoutingWeights, WeightRegistry, WeightTuple,
};

fn tuple(path: &[usize], weight: f64) -> WeightTuple {
    WeightTuple {
        source: path[0],
        destination: path[path.len() - 1],
        path: path.to_vec(),
        weight,
    }
}

fn p(nodes: &[usize]) -> Path {
    Path::new(nodes.to_vec()).unwrap()
}

#[test]
fn one_to_five_scenario() {
    let registry = WeightRegistry::from_tuples(
        [tuple(&[1, 2, 5], 0.6), tuple(&[1, 3, 5], 0.4)],
        DEFAULT_WEIGHT_TOLERANCE,
    )
    .unwrap();

    let table = registry.table(1, 5).unwrap();
    assert_relative_eq!(table.sum_weights(), 1.0);
    assert_relative_eq!(table.weight_of(&p(&[1, 2, 5])).unwrap(), 0.6);
    assert_eq!(
        table.weight_of(&p(&[1, 4, 5])),
        Err(RoutingError::UnknownPath {
            path: "1->4->5".to_string()
        })
    );
}

#[test]
fn reload_does_not_disturb_readers() {
    let engine = start_test(file!());
    let weights = RoutingWeights::new(
        engine.top(),
        "weights",
        WeightRegistry::from_tuples([tuple(&[1, 2, 5], 1.0)], DEFAULT_WEIGHT_TOLERANCE).unwrap(),
    );

    let mut balancer = StatelessLoadBalancer::default();
    let mut cache = FlowRouteCache::new();

    let snapshot = weights.snapshot();
    let chosen = cache
        .route(1, snapshot.table(1, 5).unwrap(), &mut balancer)
        .unwrap()
        .clone();
    assert_eq!(chosen, p(&[1, 2, 5]));

    // New weights move all traffic to another path
    let next =
        WeightRegistry::from_tuples([tuple(&[1, 3, 5], 1.0)], DEFAULT_WEIGHT_TOLERANCE).unwrap();
    weights.install(next);

    // The old snapshot is untouched and the cached flow keeps its path
    assert!(snapshot.table(1, 5).unwrap().contains(&p(&[1, 2, 5])));
    let live = weights.snapshot();
    assert_eq!(
        cache
            .route(1, live.table(1, 5).unwrap(), &mut balancer)
            .unwrap(),
        &chosen
    );

    // Until the cache is invalidated
    cache.invalidate();
    assert_eq!(
        cache
            .route(1, live.table(1, 5).unwrap(), &mut balancer)
            .unwrap(),
        &p(&[1, 3, 5])
    );
}

#[test]
fn every_table_is_normalized_after_reload() {
    let tuples = [
        tuple(&[1, 2, 5], 0.25),
        tuple(&[1, 3, 5], 0.25),
        tuple(&[1, 4, 5], 0.5),
        tuple(&[2, 1], 0.1),
        tuple(&[2, 3, 1], 0.9),
    ];
    let registry = WeightRegistry::from_tuples(tuples, DEFAULT_WEIGHT_TOLERANCE).unwrap();
    for (s, d) in [(1, 5), (2, 1)] {
        assert_relative_eq!(
            registry.table(s, d).unwrap().sum_weights(),
            1.0,
            epsilon = DEFAULT_WEIGHT_TOLERANCE
        );
    }

    let mut balancer = StatelessLoadBalancer::new(5);
    for _ in 0..100 {
        let path = balancer.choose_path(registry.table(2, 1).unwrap()).unwrap();
        assert_eq!(path.source(), 2);
        assert_eq!(path.destination(), 1);
    }
}
