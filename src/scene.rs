//! Interactive scene — id-keyed nodes with spatial queries.
//!
//! Holds the interactive geometry the pointer subsystem casts against:
//! quads (panels), spheres (grabbable proxies), and circles (ground
//! discs/teleport pads). Teleport eligibility is an explicit tagged-id
//! set consulted in O(1), not a property stashed on nodes.
//!
//! Queries return intersections ordered ascending by distance; the
//! nearest hit is authoritative for single-target semantics.

use std::collections::{HashMap, HashSet};

use nalgebra::{Isometry3, Point3, Unit, Vector3};

/// Scene-assigned node identifier.
pub type NodeId = u32;

// ── Geometry ───────────────────────────────────────────────

/// Intersectable shapes. Quads and circles lie in their local XY plane
/// (normal +Z), centered at the local origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Geometry {
    Quad { width: f32, height: f32 },
    Sphere { radius: f32 },
    Circle { radius: f32 },
}

/// One interactive node.
#[derive(Debug, Clone)]
pub struct SceneNode {
    pub transform: Isometry3<f32>,
    pub geometry: Geometry,
    pub visible: bool,
}

// ── Ray ────────────────────────────────────────────────────

/// A ray in world space.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Point3<f32>,
    pub direction: Unit<Vector3<f32>>,
}

impl Ray {
    pub fn new(origin: Point3<f32>, direction: Vector3<f32>) -> Self {
        Self {
            origin,
            direction: Unit::new_normalize(direction),
        }
    }

    /// Point at parameter `t` along the ray.
    pub fn at(&self, t: f32) -> Point3<f32> {
        self.origin + self.direction.into_inner() * t
    }
}

// ── Intersection ───────────────────────────────────────────

/// One spatial hit from a ray or volume query.
#[derive(Debug, Clone, PartialEq)]
pub struct Intersection {
    /// Node that was hit.
    pub node: NodeId,
    /// World-space hit point.
    pub point: Point3<f32>,
    /// Distance along the ray, or to the volume surface.
    pub distance: f32,
    /// Surface normal at the hit, oriented toward the query origin.
    pub normal: Option<Vector3<f32>>,
    /// For polyline queries: index of the segment that hit.
    pub line_index: Option<usize>,
    /// For polyline queries: distance along that segment.
    pub distance_on_line: Option<f32>,
}

// ── Scene ──────────────────────────────────────────────────

/// Registry of interactive nodes plus the teleport-target tag set.
pub struct InteractiveScene {
    nodes: HashMap<NodeId, SceneNode>,
    teleport_targets: HashSet<NodeId>,
    next_id: NodeId,
}

impl InteractiveScene {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            teleport_targets: HashSet::new(),
            next_id: 1,
        }
    }

    /// Add a node; the scene assigns and returns its id.
    pub fn add_node(&mut self, transform: Isometry3<f32>, geometry: Geometry) -> NodeId {
        let id = self.next_id;
        self.next_id += 1;
        self.nodes.insert(
            id,
            SceneNode {
                transform,
                geometry,
                visible: true,
            },
        );
        id
    }

    /// Remove a node and its teleport tag.
    pub fn remove_node(&mut self, id: NodeId) {
        self.nodes.remove(&id);
        self.teleport_targets.remove(&id);
    }

    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(&id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.nodes.get_mut(&id)
    }

    /// Mark or unmark a node as a valid teleport destination.
    pub fn set_teleport_target(&mut self, id: NodeId, eligible: bool) {
        if eligible {
            self.teleport_targets.insert(id);
        } else {
            self.teleport_targets.remove(&id);
        }
    }

    pub fn is_teleport_target(&self, id: NodeId) -> bool {
        self.teleport_targets.contains(&id)
    }

    // ── Queries ────────────────────────────────────────────

    /// Cast a straight ray against all visible nodes. Hits are sorted
    /// ascending by distance.
    pub fn cast_ray(&self, ray: &Ray) -> Vec<Intersection> {
        let mut hits: Vec<Intersection> = self
            .nodes
            .iter()
            .filter(|(_, node)| node.visible)
            .filter_map(|(id, node)| intersect_ray(*id, node, ray))
            .collect();
        sort_by_distance(&mut hits);
        hits
    }

    /// Test a sphere volume against all visible nodes. The distance of
    /// each hit is from the sphere center to the surface point.
    pub fn cast_sphere(&self, center: Point3<f32>, radius: f32) -> Vec<Intersection> {
        let mut hits: Vec<Intersection> = self
            .nodes
            .iter()
            .filter(|(_, node)| node.visible)
            .filter_map(|(id, node)| intersect_sphere(*id, node, center, radius))
            .collect();
        sort_by_distance(&mut hits);
        hits
    }

    /// Cast along a polyline (curved pointer). Hit distances accumulate
    /// along the curve's arc length, so ordering reflects curve order;
    /// each hit carries its segment index and offset on that segment.
    pub fn cast_polyline(&self, points: &[Point3<f32>]) -> Vec<Intersection> {
        let mut hits = Vec::new();
        let mut arc_length = 0.0;
        for (index, window) in points.windows(2).enumerate() {
            let segment = window[1] - window[0];
            let length = segment.norm();
            if length <= f32::EPSILON {
                continue;
            }
            let ray = Ray::new(window[0], segment);
            for (id, node) in self.nodes.iter().filter(|(_, n)| n.visible) {
                if let Some(mut hit) = intersect_ray(*id, node, &ray) {
                    if hit.distance <= length {
                        hit.line_index = Some(index);
                        hit.distance_on_line = Some(hit.distance);
                        hit.distance += arc_length;
                        hits.push(hit);
                    }
                }
            }
            arc_length += length;
        }
        sort_by_distance(&mut hits);
        hits
    }
}

impl Default for InteractiveScene {
    fn default() -> Self {
        Self::new()
    }
}

fn sort_by_distance(hits: &mut [Intersection]) {
    hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
}

// ── Intersection math ──────────────────────────────────────

fn intersect_ray(id: NodeId, node: &SceneNode, ray: &Ray) -> Option<Intersection> {
    match node.geometry {
        Geometry::Quad { width, height } => {
            intersect_planar(id, node, ray, |x, y| {
                x.abs() <= width * 0.5 && y.abs() <= height * 0.5
            })
        }
        Geometry::Circle { radius } => {
            intersect_planar(id, node, ray, |x, y| x * x + y * y <= radius * radius)
        }
        Geometry::Sphere { radius } => intersect_ray_sphere(id, node, ray, radius),
    }
}

/// Ray against a bounded region of a node's local XY plane.
fn intersect_planar(
    id: NodeId,
    node: &SceneNode,
    ray: &Ray,
    in_bounds: impl Fn(f32, f32) -> bool,
) -> Option<Intersection> {
    let local_origin = node.transform.inverse_transform_point(&ray.origin);
    let local_dir = node.transform.inverse_transform_vector(&ray.direction);

    if local_dir.z.abs() < 1e-8 {
        return None; // parallel to the plane
    }
    let t = -local_origin.z / local_dir.z;
    if t < 0.0 {
        return None; // behind the ray
    }

    let hit_x = local_origin.x + local_dir.x * t;
    let hit_y = local_origin.y + local_dir.y * t;
    if !in_bounds(hit_x, hit_y) {
        return None;
    }

    let point = ray.at(t);
    let mut normal = node.transform.transform_vector(&Vector3::z());
    if normal.dot(&ray.direction) > 0.0 {
        normal = -normal; // face the ray
    }
    Some(Intersection {
        node: id,
        point,
        distance: t,
        normal: Some(normal),
        line_index: None,
        distance_on_line: None,
    })
}

fn intersect_ray_sphere(
    id: NodeId,
    node: &SceneNode,
    ray: &Ray,
    radius: f32,
) -> Option<Intersection> {
    let center: Point3<f32> = node.transform.translation.vector.into();
    let oc = ray.origin - center;
    let b = oc.dot(&ray.direction);
    let c = oc.norm_squared() - radius * radius;
    let discriminant = b * b - c;
    if discriminant < 0.0 {
        return None;
    }
    let sqrt_d = discriminant.sqrt();
    let t = if -b - sqrt_d >= 0.0 {
        -b - sqrt_d
    } else if -b + sqrt_d >= 0.0 {
        -b + sqrt_d // origin inside the sphere
    } else {
        return None;
    };

    let point = ray.at(t);
    let normal = (point - center) / radius;
    Some(Intersection {
        node: id,
        point,
        distance: t,
        normal: Some(normal),
        line_index: None,
        distance_on_line: None,
    })
}

fn intersect_sphere(
    id: NodeId,
    node: &SceneNode,
    center: Point3<f32>,
    radius: f32,
) -> Option<Intersection> {
    match node.geometry {
        Geometry::Quad { width, height } => overlap_planar(id, node, center, radius, |x, y| {
            (
                x.clamp(-width * 0.5, width * 0.5),
                y.clamp(-height * 0.5, height * 0.5),
            )
        }),
        Geometry::Circle { radius: disc } => overlap_planar(id, node, center, radius, |x, y| {
            let d = (x * x + y * y).sqrt();
            if d <= disc || d <= f32::EPSILON {
                (x, y)
            } else {
                (x / d * disc, y / d * disc)
            }
        }),
        Geometry::Sphere { radius: node_radius } => {
            let node_center: Point3<f32> = node.transform.translation.vector.into();
            let offset = center - node_center;
            let distance_between = offset.norm();
            if distance_between > radius + node_radius {
                return None;
            }
            let normal = if distance_between > f32::EPSILON {
                offset / distance_between
            } else {
                Vector3::z()
            };
            let point = node_center + normal * node_radius;
            Some(Intersection {
                node: id,
                point,
                distance: (center - point).norm(),
                normal: Some(normal),
                line_index: None,
                distance_on_line: None,
            })
        }
    }
}

/// Sphere volume against a bounded region of a node's local XY plane:
/// clamp the center into the region, measure to the clamped point.
fn overlap_planar(
    id: NodeId,
    node: &SceneNode,
    center: Point3<f32>,
    radius: f32,
    clamp: impl Fn(f32, f32) -> (f32, f32),
) -> Option<Intersection> {
    let local_center = node.transform.inverse_transform_point(&center);
    let (cx, cy) = clamp(local_center.x, local_center.y);
    let closest_local = Point3::new(cx, cy, 0.0);
    let closest = node.transform.transform_point(&closest_local);
    let distance = (center - closest).norm();
    if distance > radius {
        return None;
    }

    let mut normal = node.transform.transform_vector(&Vector3::z());
    if normal.dot(&(center - closest)) < 0.0 {
        normal = -normal; // face the probe
    }
    Some(Intersection {
        node: id,
        point: closest,
        distance,
        normal: Some(normal),
        line_index: None,
        distance_on_line: None,
    })
}

// ── Test helpers ───────────────────────────────────────────

#[cfg(test)]
pub(crate) fn facing_quad(z: f32, size: f32) -> (Isometry3<f32>, Geometry) {
    // A quad at (0, 0, z) facing +Z (toward the default -Z ray).
    (
        Isometry3::translation(0.0, 0.0, z),
        Geometry::Quad {
            width: size,
            height: size,
        },
    )
}

// ── Tests ──────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::UnitQuaternion;
    use std::f32::consts::FRAC_PI_2;

    fn forward_ray() -> Ray {
        Ray::new(Point3::origin(), Vector3::new(0.0, 0.0, -1.0))
    }

    #[test]
    fn test_ray_hits_nearest_quad_first() {
        let mut scene = InteractiveScene::new();
        let (t3, g) = facing_quad(-3.0, 1.0);
        let far = scene.add_node(t3, g);
        let (t1, g) = facing_quad(-1.0, 1.0);
        let near = scene.add_node(t1, g);
        let (t2, g) = facing_quad(-2.0, 1.0);
        let mid = scene.add_node(t2, g);

        let hits = scene.cast_ray(&forward_ray());
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].node, near);
        assert_eq!(hits[1].node, mid);
        assert_eq!(hits[2].node, far);
        assert!((hits[0].distance - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_ray_misses_outside_quad_bounds() {
        let mut scene = InteractiveScene::new();
        let (t, g) = facing_quad(-1.0, 0.5);
        scene.add_node(t, g);

        let off = Ray::new(Point3::new(1.0, 0.0, 0.0), Vector3::new(0.0, 0.0, -1.0));
        assert!(scene.cast_ray(&off).is_empty());
    }

    #[test]
    fn test_ray_ignores_invisible_and_behind() {
        let mut scene = InteractiveScene::new();
        let (t, g) = facing_quad(-1.0, 1.0);
        let id = scene.add_node(t, g);
        let (behind_t, g) = facing_quad(2.0, 1.0);
        scene.add_node(behind_t, g);

        assert_eq!(scene.cast_ray(&forward_ray()).len(), 1);
        scene.node_mut(id).unwrap().visible = false;
        assert!(scene.cast_ray(&forward_ray()).is_empty());
    }

    #[test]
    fn test_ray_normal_faces_origin() {
        let mut scene = InteractiveScene::new();
        let (t, g) = facing_quad(-2.0, 1.0);
        scene.add_node(t, g);

        let hits = scene.cast_ray(&forward_ray());
        let normal = hits[0].normal.unwrap();
        assert!(normal.z > 0.9, "normal should face the ray origin: {normal}");
    }

    #[test]
    fn test_ray_sphere() {
        let mut scene = InteractiveScene::new();
        let id = scene.add_node(
            Isometry3::translation(0.0, 0.0, -5.0),
            Geometry::Sphere { radius: 1.0 },
        );

        let hits = scene.cast_ray(&forward_ray());
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].node, id);
        assert!((hits[0].distance - 4.0).abs() < 1e-4);
        assert!(hits[0].normal.unwrap().z > 0.9);
    }

    #[test]
    fn test_ray_circle_bounds() {
        let mut scene = InteractiveScene::new();
        scene.add_node(
            Isometry3::translation(0.0, 0.0, -1.0),
            Geometry::Circle { radius: 0.5 },
        );

        assert_eq!(scene.cast_ray(&forward_ray()).len(), 1);
        let corner = Ray::new(Point3::new(0.45, 0.45, 0.0), Vector3::new(0.0, 0.0, -1.0));
        // Inside the bounding square but outside the disc.
        assert!(scene.cast_ray(&corner).is_empty());
    }

    #[test]
    fn test_sphere_overlap_quad() {
        let mut scene = InteractiveScene::new();
        let (t, g) = facing_quad(-0.05, 1.0);
        let id = scene.add_node(t, g);

        let hits = scene.cast_sphere(Point3::origin(), 0.07);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].node, id);
        assert!((hits[0].distance - 0.05).abs() < 1e-5);

        assert!(scene.cast_sphere(Point3::origin(), 0.04).is_empty());
    }

    #[test]
    fn test_sphere_overlap_clamps_to_edge() {
        let mut scene = InteractiveScene::new();
        let (t, g) = facing_quad(0.0, 1.0);
        scene.add_node(t, g);

        // Probe centered past the quad's right edge; closest point clamps
        // to x = 0.5.
        let hits = scene.cast_sphere(Point3::new(0.6, 0.0, 0.0), 0.2);
        assert_eq!(hits.len(), 1);
        assert!((hits[0].point.x - 0.5).abs() < 1e-5);
        assert!((hits[0].distance - 0.1).abs() < 1e-5);
    }

    #[test]
    fn test_sphere_overlap_sphere() {
        let mut scene = InteractiveScene::new();
        scene.add_node(
            Isometry3::translation(0.0, 0.0, -1.0),
            Geometry::Sphere { radius: 0.5 },
        );

        let hits = scene.cast_sphere(Point3::origin(), 0.6);
        assert_eq!(hits.len(), 1);
        assert!((hits[0].distance - 0.5).abs() < 1e-5);
        assert!(scene.cast_sphere(Point3::origin(), 0.4).is_empty());
    }

    #[test]
    fn test_polyline_reports_segment_and_offset() {
        let mut scene = InteractiveScene::new();
        // Ground circle at y = 0, facing up.
        let up = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), -FRAC_PI_2);
        let pad = scene.add_node(
            Isometry3::from_parts(Vector3::new(0.0, 0.0, -2.0).into(), up),
            Geometry::Circle { radius: 1.0 },
        );

        // Polyline arcing forward and down through the pad.
        let points = [
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, -2.0),
            Point3::new(0.0, -1.0, -2.0),
        ];
        let hits = scene.cast_polyline(&points);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].node, pad);
        assert_eq!(hits[0].line_index, Some(1));
        assert!((hits[0].distance_on_line.unwrap() - 1.0).abs() < 1e-4);
        // Arc length: 2.0 on segment 0 plus 1.0 into segment 1.
        assert!((hits[0].distance - 3.0).abs() < 1e-4);
    }

    #[test]
    fn test_polyline_ignores_hits_past_segment_end() {
        let mut scene = InteractiveScene::new();
        let (t, g) = facing_quad(-5.0, 1.0);
        scene.add_node(t, g);

        // Segment stops short of the quad.
        let points = [Point3::origin(), Point3::new(0.0, 0.0, -2.0)];
        assert!(scene.cast_polyline(&points).is_empty());
    }

    #[test]
    fn test_teleport_tagging() {
        let mut scene = InteractiveScene::new();
        let (t, g) = facing_quad(-1.0, 1.0);
        let id = scene.add_node(t, g);

        assert!(!scene.is_teleport_target(id));
        scene.set_teleport_target(id, true);
        assert!(scene.is_teleport_target(id));
        scene.set_teleport_target(id, false);
        assert!(!scene.is_teleport_target(id));

        scene.set_teleport_target(id, true);
        scene.remove_node(id);
        assert!(!scene.is_teleport_target(id));
        assert!(scene.node(id).is_none());
    }
}
