//! Octree queries: enumeration, region collection and ray casts
//!
//! Non-root octants only ever hold objects inside their culling box, so a
//! culling box test decides for the whole subtree. The root is the
//! exception: objects larger than the world are kept there regardless, so
//! its own objects are always tested individually.

use super::bounding_box::Intersection;
use super::node::{NodeFlags, NodeKey, OctreeNode};
use super::octant::OctantKey;
use super::octree::Octree;
use super::ray::{sort_by_distance, Ray, RaycastResult};
use super::volume::CullingVolume;

impl<T: OctreeNode> Octree<T> {
    /// Collect every placed object matching the flags and layer mask
    ///
    /// No geometric test is done; useful for full enumeration and debugging.
    pub fn collect_all(&self, flags: NodeFlags, layer_mask: u32) -> Vec<NodeKey> {
        let mut result = Vec::new();
        self.collect_matching(self.root, flags, layer_mask, &mut result);
        result
    }

    /// Collect placed objects whose bounding box touches `volume`
    pub fn collect_in_volume<V>(
        &self,
        volume: &V,
        flags: NodeFlags,
        layer_mask: u32,
    ) -> Vec<NodeKey>
    where
        V: CullingVolume + ?Sized,
    {
        let mut result = Vec::new();
        self.collect_volume(
            self.root,
            volume,
            false,
            flags,
            layer_mask,
            &mut result,
        );
        result
    }

    /// Cast a ray and return every precise hit, nearest first
    ///
    /// Subtrees whose culling box is at or beyond `max_distance` are skipped.
    pub fn raycast(
        &self,
        ray: &Ray,
        flags: NodeFlags,
        max_distance: f32,
        layer_mask: u32,
    ) -> Vec<RaycastResult> {
        let mut result = Vec::new();
        self.raycast_octant(
            self.root,
            ray,
            flags,
            max_distance,
            layer_mask,
            &mut result,
        );
        sort_by_distance(&mut result);
        result
    }

    /// Cast a ray and return only the nearest precise hit
    ///
    /// Candidates are first ordered by their bounding box distance; precise
    /// tests stop once the next candidate's box is farther than the best hit
    /// so far. Returns [`RaycastResult::none`] when nothing is hit.
    pub fn raycast_single(
        &self,
        ray: &Ray,
        flags: NodeFlags,
        max_distance: f32,
        layer_mask: u32,
    ) -> RaycastResult {
        let mut candidates = Vec::new();
        self.collect_ray_candidates(
            self.root,
            ray,
            flags,
            max_distance,
            layer_mask,
            &mut candidates,
        );
        candidates.sort_by(|a, b| a.1.total_cmp(&b.1));

        let mut hits = Vec::new();
        let mut closest = f32::INFINITY;
        let mut tested = 0usize;

        for &(key, box_distance) in &candidates {
            if box_distance >= closest.min(max_distance) {
                break;
            }

            let start = hits.len();
            self.nodes[key]
                .object
                .on_raycast(key, &mut hits, ray, max_distance);
            tested += 1;

            if let Some(nearest) = hits[start..]
                .iter()
                .map(|hit| hit.distance)
                .min_by(f32::total_cmp)
            {
                closest = closest.min(nearest);
            }
        }

        log::trace!(
            "Raycast single: {} candidates, {} precise tests",
            candidates.len(),
            tested
        );

        hits.into_iter()
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
            .unwrap_or_else(RaycastResult::none)
    }

    fn collect_matching(
        &self,
        octant: OctantKey,
        flags: NodeFlags,
        layer_mask: u32,
        result: &mut Vec<NodeKey>,
    ) {
        let octant = &self.octants[octant];

        result.extend(
            octant
                .nodes()
                .iter()
                .copied()
                .filter(|&key| self.nodes[key].object.matches(flags, layer_mask)),
        );

        for child in octant.children().iter().flatten() {
            self.collect_matching(*child, flags, layer_mask, result);
        }
    }

    fn collect_volume<V>(
        &self,
        octant_key: OctantKey,
        volume: &V,
        fully_inside: bool,
        flags: NodeFlags,
        layer_mask: u32,
        result: &mut Vec<NodeKey>,
    ) where
        V: CullingVolume + ?Sized,
    {
        let octant = &self.octants[octant_key];
        let is_root = octant_key == self.root;

        let classification = if fully_inside {
            Intersection::Inside
        } else {
            volume.classify(octant.culling_box())
        };
        if classification == Intersection::Outside && !is_root {
            return;
        }

        let test_each = is_root || classification != Intersection::Inside;
        for &key in octant.nodes() {
            let object = &self.nodes[key].object;
            if !object.matches(flags, layer_mask) {
                continue;
            }
            if !test_each
                || volume.classify(&object.world_bounding_box()) != Intersection::Outside
            {
                result.push(key);
            }
        }

        if classification == Intersection::Outside {
            return;
        }
        let children_inside = classification == Intersection::Inside;
        for child in octant.children().iter().flatten() {
            self.collect_volume(
                *child,
                volume,
                children_inside,
                flags,
                layer_mask,
                result,
            );
        }
    }

    /// Whether a ray query can skip this octant's subtree
    fn ray_misses(&self, octant_key: OctantKey, ray: &Ray, max_distance: f32) -> bool {
        octant_key != self.root
            && ray.hit_distance(self.octants[octant_key].culling_box()) >= max_distance
    }

    fn raycast_octant(
        &self,
        octant_key: OctantKey,
        ray: &Ray,
        flags: NodeFlags,
        max_distance: f32,
        layer_mask: u32,
        result: &mut Vec<RaycastResult>,
    ) {
        if self.ray_misses(octant_key, ray, max_distance) {
            return;
        }

        let octant = &self.octants[octant_key];
        for &key in octant.nodes() {
            let object = &self.nodes[key].object;
            if object.matches(flags, layer_mask) {
                object.on_raycast(key, result, ray, max_distance);
            }
        }

        for child in octant.children().iter().flatten() {
            self.raycast_octant(
                *child,
                ray,
                flags,
                max_distance,
                layer_mask,
                result,
            );
        }
    }

    fn collect_ray_candidates(
        &self,
        octant_key: OctantKey,
        ray: &Ray,
        flags: NodeFlags,
        max_distance: f32,
        layer_mask: u32,
        result: &mut Vec<(NodeKey, f32)>,
    ) {
        if self.ray_misses(octant_key, ray, max_distance) {
            return;
        }

        let octant = &self.octants[octant_key];
        for &key in octant.nodes() {
            let object = &self.nodes[key].object;
            if object.matches(flags, layer_mask) {
                let distance = ray.hit_distance(&object.world_bounding_box());
                if distance < max_distance {
                    result.push((key, distance));
                }
            }
        }

        for child in octant.children().iter().flatten() {
            self.collect_ray_candidates(
                *child,
                ray,
                flags,
                max_distance,
                layer_mask,
                result,
            );
        }
    }
}
