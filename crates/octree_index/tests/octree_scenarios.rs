//! End-to-end octree scenarios: random populations, movement, removal,
//! resizing and ray cast cross-checks, with the tree invariants verified
//! after every step.

use std::collections::HashSet;

use octree_index::foundation::logging;
use octree_index::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

struct Body {
    sphere: Sphere,
}

impl Body {
    fn new(center: Vec3, radius: f32) -> Self {
        Self {
            sphere: Sphere::new(center, radius),
        }
    }
}

impl OctreeNode for Body {
    fn world_bounding_box(&self) -> BoundingBox {
        self.sphere.bounding_box()
    }

    fn on_raycast(
        &self,
        key: NodeKey,
        results: &mut Vec<RaycastResult>,
        ray: &Ray,
        max_distance: f32,
    ) {
        if let Some((distance, position, normal)) = self.sphere.intersect_ray(ray) {
            if distance < max_distance {
                results.push(RaycastResult {
                    position,
                    normal,
                    distance,
                    node: Some(key),
                    sub_object: 0,
                });
            }
        }
    }
}

fn random_point(rng: &mut StdRng, extent: f32) -> Vec3 {
    Vec3::new(
        rng.gen_range(-extent..extent),
        rng.gen_range(-extent..extent),
        rng.gen_range(-extent..extent),
    )
}

fn random_body(rng: &mut StdRng) -> Body {
    // Mostly small objects with the occasional giant
    let radius = if rng.gen_bool(0.05) {
        rng.gen_range(100.0..600.0)
    } else {
        rng.gen_range(0.1..10.0)
    };
    Body::new(random_point(rng, 1000.0), radius)
}

/// Walk the whole tree and assert every structural invariant
fn assert_invariants(octree: &Octree<Body>) {
    let root = octree.root_key();
    let mut seen = HashSet::new();
    let reachable = check_octant(octree, root, &mut seen);

    assert_eq!(reachable, octree.octant_count(), "unreachable octants left in the arena");
    assert_eq!(octree.num_nodes(), seen.len());

    for (key, _) in octree.iter() {
        if let Some(octant) = octree.node_octant(key) {
            assert!(seen.contains(&key), "node points at an octant that does not list it");
            assert!(octree.octant(octant).unwrap().nodes().contains(&key));
        }
    }
}

/// Returns the number of octants in the subtree
fn check_octant(octree: &Octree<Body>, key: OctantKey, seen: &mut HashSet<NodeKey>) -> usize {
    let octant = octree.octant(key).unwrap();
    let is_root = key == octree.root_key();

    if !is_root {
        assert!(octant.num_nodes() > 0, "empty non-root octant survived");
    }

    for &node in octant.nodes() {
        assert!(seen.insert(node), "node listed twice");
        assert_eq!(octree.node_octant(node), Some(key));

        let bounds = octree.node(node).unwrap().world_bounding_box();
        let fits = octant.fit_bounding_box(&bounds, &bounds.size());
        let inside = octant.culling_box().is_inside(&bounds) == Intersection::Inside;
        if is_root {
            assert!(fits || !inside);
        } else {
            assert!(fits && inside);
        }
    }

    let mut octants = 1;
    let mut count = octant.nodes().len();
    for child in octant.children().iter().flatten() {
        let child_octant = octree.octant(*child).unwrap();
        assert_eq!(child_octant.parent(), Some(key));
        assert_eq!(child_octant.level(), octant.level() - 1);
        assert_eq!(
            octant.world_bounding_box().is_inside(child_octant.world_bounding_box()),
            Intersection::Inside
        );
        count += child_octant.num_nodes();
        octants += check_octant(octree, *child, seen);
    }
    assert_eq!(octant.num_nodes(), count, "incremental count drifted");

    octants
}

fn cast_all(octree: &Octree<Body>, ray: &Ray, max_distance: f32) -> Vec<RaycastResult> {
    octree.raycast(ray, NodeFlags::empty(), max_distance, LAYER_MASK_ALL)
}

fn cast_single(octree: &Octree<Body>, ray: &Ray, max_distance: f32) -> RaycastResult {
    octree.raycast_single(ray, NodeFlags::empty(), max_distance, LAYER_MASK_ALL)
}

fn placements(octree: &Octree<Body>) -> Vec<(NodeKey, Option<OctantKey>)> {
    let mut result: Vec<_> = octree
        .iter()
        .map(|(key, _)| (key, octree.node_octant(key)))
        .collect();
    result.sort_by_key(|(key, _)| *key);
    result
}

#[test]
fn test_thousand_random_objects_keep_counts() {
    logging::init_with_default("debug");
    let mut rng = StdRng::seed_from_u64(7);
    let mut octree = Octree::new();

    for _ in 0..1000 {
        octree.add_node(random_body(&mut rng));
    }
    octree.update();

    assert_eq!(octree.num_nodes(), 1000);
    assert_eq!(octree.pending_updates(), 0);
    assert!(octree.octant_count() > 1);
    assert_invariants(&octree);
}

#[test]
fn test_second_update_is_noop() {
    let mut rng = StdRng::seed_from_u64(11);
    let mut octree = Octree::new();
    for _ in 0..200 {
        octree.add_node(random_body(&mut rng));
    }
    octree.update();

    let before = placements(&octree);
    let octants = octree.octant_count();
    octree.update();

    assert_eq!(placements(&octree), before);
    assert_eq!(octree.octant_count(), octants);
}

#[test]
fn test_moving_and_removing_over_many_frames() {
    logging::init_with_default("debug");
    let mut rng = StdRng::seed_from_u64(23);
    let mut octree = Octree::new();
    let mut keys: Vec<NodeKey> = (0..300)
        .map(|_| octree.add_node(random_body(&mut rng)))
        .collect();
    octree.update();

    for frame in 0..20 {
        for &key in &keys {
            if rng.gen_bool(0.3) {
                let step = random_point(&mut rng, 60.0);
                octree.node_mut(key).unwrap().sphere.center += step;
                octree.queue_update(key).unwrap();
            }
        }

        // Some objects go away mid-frame, possibly with an update pending
        if frame % 3 == 0 {
            for _ in 0..5 {
                let index = rng.gen_range(0..keys.len());
                let key = keys.swap_remove(index);
                octree.remove_node(key).unwrap();
            }
        }
        keys.extend((0..3).map(|_| octree.add_node(random_body(&mut rng))));

        octree.update();
        assert_eq!(octree.pending_updates(), 0);
        assert_eq!(octree.num_nodes(), keys.len());
        assert_invariants(&octree);
    }
}

#[test]
fn test_object_leaving_world_moves_to_root_and_prunes() {
    let mut octree = Octree::new();
    let key = octree.add_node(Body::new(Vec3::new(500.0, 500.0, 500.0), 1.0));
    octree.update();

    let leaf = octree.node_octant(key).unwrap();
    assert_ne!(leaf, octree.root_key());
    assert_eq!(octree.octant(leaf).unwrap().level(), 1);

    // Past the root culling box (-2000..2000)
    octree.node_mut(key).unwrap().sphere.center = Vec3::new(5000.0, 0.0, 0.0);
    octree.queue_update(key).unwrap();
    octree.update();

    assert_eq!(octree.node_octant(key), Some(octree.root_key()));
    assert!(octree.octant(leaf).is_none());
    assert_eq!(octree.octant_count(), 1);
    assert_invariants(&octree);
}

#[test]
fn test_two_objects_on_positive_z() {
    let mut octree = Octree::new();
    let near = octree.add_node(Body::new(Vec3::new(0.0, 0.0, 6.0), 1.0));
    let far = octree.add_node(Body::new(Vec3::new(0.0, 0.0, 11.0), 1.0));
    octree.update();

    let ray = Ray::new(Vec3::zeros(), Vec3::z());
    let single = cast_single(&octree, &ray, f32::INFINITY);
    assert_eq!(single.node, Some(near));
    assert!((single.distance - 5.0).abs() < 1e-4);

    let all = cast_all(&octree, &ray, f32::INFINITY);
    let order: Vec<_> = all.iter().map(|hit| hit.node).collect();
    assert_eq!(order, vec![Some(near), Some(far)]);
    assert!((all[1].distance - 10.0).abs() < 1e-4);
}

#[test]
fn test_raycast_single_matches_full_raycast() {
    let mut rng = StdRng::seed_from_u64(99);
    let mut octree = Octree::new();
    for _ in 0..500 {
        octree.add_node(random_body(&mut rng));
    }
    octree.update();

    let mut hits_seen = 0;
    for _ in 0..200 {
        let origin = random_point(&mut rng, 1200.0);
        let direction = random_point(&mut rng, 1.0) + Vec3::new(0.0, 0.0, 0.01);
        let ray = Ray::new(origin, direction);
        let max_distance = if rng.gen_bool(0.5) {
            f32::INFINITY
        } else {
            rng.gen_range(10.0..1500.0)
        };

        let all = cast_all(&octree, &ray, max_distance);
        let single = cast_single(&octree, &ray, max_distance);

        assert!(all.windows(2).all(|pair| pair[0].distance <= pair[1].distance));
        match all.first() {
            Some(nearest) => {
                hits_seen += 1;
                assert_eq!(single.distance, nearest.distance);
                assert_eq!(single.node, nearest.node);
            }
            None => assert!(!single.is_hit()),
        }
    }
    assert!(hits_seen > 0);
}

#[test]
fn test_tangent_ray_found_by_both_raycasts() {
    let mut octree = Octree::new();
    let key = octree.add_node(Body::new(Vec3::new(0.0, 0.0, 10.0), 1.0));
    octree.update();

    // Slides along the x = 1 face of the sphere's box and grazes the sphere
    let ray = Ray::new(Vec3::new(1.0, 0.0, 0.0), Vec3::z());
    let all = cast_all(&octree, &ray, f32::INFINITY);
    let single = cast_single(&octree, &ray, f32::INFINITY);

    assert_eq!(all.first().map(|hit| hit.node), Some(Some(key)));
    assert_eq!(single.node, Some(key));
    assert_eq!(single.distance, all[0].distance);
}

#[test]
fn test_face_aligned_rays_agree() {
    let mut rng = StdRng::seed_from_u64(31);
    let mut octree = Octree::new();
    let keys: Vec<NodeKey> = (0..300)
        .map(|_| octree.add_node(random_body(&mut rng)))
        .collect();
    octree.update();

    for &key in keys.iter().take(60) {
        let bounds = octree.node(key).unwrap().world_bounding_box();
        let origin = Vec3::new(bounds.max.x, bounds.center().y, -1500.0);
        let ray = Ray::new(origin, Vec3::z());

        let all = cast_all(&octree, &ray, f32::INFINITY);
        let single = cast_single(&octree, &ray, f32::INFINITY);

        match all.first() {
            Some(nearest) => {
                assert_eq!(single.distance, nearest.distance);
                assert_eq!(single.node, nearest.node);
            }
            None => assert!(!single.is_hit()),
        }
    }
}

#[test]
fn test_resize_preserves_membership() {
    logging::init_with_default("debug");
    let mut rng = StdRng::seed_from_u64(5);
    let mut octree = Octree::new();
    let keys: HashSet<NodeKey> = (0..400)
        .map(|_| octree.add_node(random_body(&mut rng)))
        .collect();
    octree.update();

    octree.resize(BoundingBox::from_scalar(-250.0, 250.0), 6);

    let collected: HashSet<NodeKey> = octree
        .collect_all(NodeFlags::empty(), LAYER_MASK_ALL)
        .into_iter()
        .collect();
    assert_eq!(collected, keys);
    assert_eq!(octree.num_levels_attr(), 6);
    assert_invariants(&octree);
}

#[test]
fn test_resize_smaller_world_clamps_to_root() {
    let mut octree = Octree::new();
    let key = octree.add_node(Body::new(Vec3::new(800.0, 800.0, 800.0), 2.0));
    octree.update();
    assert_eq!(octree.octant(octree.node_octant(key).unwrap()).unwrap().level(), 1);

    octree.resize(BoundingBox::from_scalar(-100.0, 100.0), 8);

    assert_eq!(octree.node_octant(key), Some(octree.root_key()));
    assert_eq!(octree.octant_count(), 1);
    assert_eq!(octree.collect_all(NodeFlags::empty(), LAYER_MASK_ALL), vec![key]);
    assert_invariants(&octree);
}

#[test]
fn test_region_query_matches_brute_force() {
    let mut rng = StdRng::seed_from_u64(42);
    let mut octree = Octree::new();
    for _ in 0..600 {
        octree.add_node(random_body(&mut rng));
    }
    octree.update();

    for _ in 0..50 {
        let sphere = Sphere::new(random_point(&mut rng, 1000.0), rng.gen_range(10.0..400.0));

        let mut found = octree.collect_in_volume(&sphere, NodeFlags::empty(), LAYER_MASK_ALL);
        let mut expected: Vec<NodeKey> = octree
            .iter()
            .filter(|(_, body)| {
                sphere.classify(&body.world_bounding_box()) != Intersection::Outside
            })
            .map(|(key, _)| key)
            .collect();

        found.sort();
        expected.sort();
        assert_eq!(found, expected);
    }
}
