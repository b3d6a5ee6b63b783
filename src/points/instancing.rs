//! Instanced points: per-element shape placement.
//!
//! On export an instancer attached to the emitter is sampled into an
//! [`InstanceCorrelationTable`]: one record per element with its source
//! shape and orientation. On import, the archived instance names are turned
//! back into an [`InstancerRewire`] describing how the host instancer should
//! be rebuilt. [`InstancingRegistry`] tracks the imported objects that take
//! part in that final pass.

use tracing::{debug, warn};

use crate::archive::{channel, Archive, PointsSource};
use crate::store::channel as store_channel;
use crate::util::{extract_rotation, quat_to_wxyz, DMat4, DataType, EulerRot, Quat, Result};

/// `.shapetype` value marking instanced geometry.
pub const SHAPE_TYPE_INSTANCE: u16 = 7;

/// Raw instancer query result.
///
/// `path_start_indices[i]` is the first entry of `path_indices` used by
/// element `i`; each path index points into `paths`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InstancerState {
    pub name: String,
    /// Full host paths of the instanced shapes, `|` separated.
    pub paths: Vec<String>,
    /// One transform per element.
    pub matrices: Vec<DMat4>,
    pub path_start_indices: Vec<usize>,
    pub path_indices: Vec<usize>,
}

/// Host instancer connected to an emitter.
pub trait InstancerSource {
    /// Instancer node name.
    fn name(&self) -> &str;

    /// Query every live instance.
    fn all_instances(&self) -> Result<InstancerState>;
}

impl InstancerSource for InstancerState {
    fn name(&self) -> &str {
        &self.name
    }

    fn all_instances(&self) -> Result<InstancerState> {
        Ok(self.clone())
    }
}

/// Choose the instancer to export through.
///
/// Exactly one connected instancer enables instancing. With several, none is
/// picked and a warning is logged.
pub fn pick_instancer<'a>(
    emitter: &str,
    candidates: &[&'a dyn InstancerSource],
) -> Option<&'a dyn InstancerSource> {
    match candidates {
        [] => None,
        [only] => Some(*only),
        _ => {
            warn!(
                "more than one instancer associated to {}, instancing disabled",
                emitter
            );
            None
        }
    }
}

/// One instanced element.
#[derive(Clone, Debug, PartialEq)]
pub struct InstanceRecord {
    /// Host path of the shape placed at this element (empty if none).
    pub full_path: String,
    pub orientation_matrix: DMat4,
    /// Rotation part of `orientation_matrix`.
    pub orientation: Quat,
    /// Index into the instance name table. Only the element's first shape
    /// is recorded.
    pub shape_id: u16,
}

/// Instance names plus per-element placements for one export frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InstanceCorrelationTable {
    names: Vec<String>,
    records: Vec<InstanceRecord>,
}

impl InstanceCorrelationTable {
    /// Query `source` and build one record per element.
    pub fn capture(source: &dyn InstancerSource) -> Result<Self> {
        let state = source.all_instances()?;

        let names = state.paths.iter().map(|p| p.replace('|', "/")).collect();

        let records = state
            .matrices
            .iter()
            .enumerate()
            .map(|(i, matrix)| {
                let path_index = state
                    .path_start_indices
                    .get(i)
                    .and_then(|&start| state.path_indices.get(start))
                    .copied();
                let shape_id = path_index
                    .and_then(|p| u16::try_from(p).ok())
                    .unwrap_or_default();
                let full_path = path_index
                    .and_then(|p| state.paths.get(p))
                    .cloned()
                    .unwrap_or_default();
                InstanceRecord {
                    full_path,
                    orientation_matrix: *matrix,
                    orientation: extract_rotation(matrix),
                    shape_id,
                }
            })
            .collect();

        debug!("{}: captured {} instances", source.name(), state.matrices.len());
        Ok(Self { names, records })
    }

    /// Instanced shape paths, `/` separated.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn records(&self) -> &[InstanceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Orientations packed `[w, x, y, z]`.
    pub fn orientations(&self) -> Vec<[f32; 4]> {
        self.records.iter().map(|r| quat_to_wxyz(r.orientation)).collect()
    }

    pub fn shape_ids(&self) -> Vec<u16> {
        self.records.iter().map(|r| r.shape_id).collect()
    }
}

/// Instancer binding to recreate for an imported object.
#[derive(Clone, Debug, PartialEq)]
pub struct InstancerRewire {
    /// Archived object identifier.
    pub points: String,
    /// Host shapes to instance, in archived order.
    pub objects: Vec<String>,
    /// Per-element channel selecting the shape.
    pub object_index: &'static str,
    /// Per-element rotation channel, euler angles in radians.
    pub rotation: &'static str,
    pub rotation_order: EulerRot,
}

/// Convert an archived `/` path back to a host `|` path.
///
/// Returns the cleaned name and the number of separators converted. Only
/// alphanumerics, `_`, `:` and `|` survive.
pub fn normalize_instance_name(name: &str) -> (String, usize) {
    let mut replaced = 0;
    let cleaned = name
        .chars()
        .filter_map(|c| match c {
            '/' => {
                replaced += 1;
                Some('|')
            }
            c if c.is_ascii_alphanumeric() || matches!(c, '_' | ':' | '|') => Some(c),
            _ => None,
        })
        .collect();
    (cleaned, replaced)
}

/// True when the last `.shapetype` sample starts with the instance marker.
fn has_instance_shape_type(source: &dyn PointsSource) -> bool {
    let Some(property) = source.property(channel::SHAPE_TYPE) else {
        return false;
    };
    if property.data_type() != DataType::UINT16 {
        return false;
    }
    property
        .last_sample()
        .and_then(|s| s.decode::<u16>().ok())
        .and_then(|v| v.first().copied())
        == Some(SHAPE_TYPE_INSTANCE)
}

/// Rebuild the instancer binding of an imported object.
///
/// Returns None unless the object was exported as instanced geometry and
/// carries a non-empty instance name table. Names with a single separator
/// may be bare shape names from older archives; `lookup` resolves those to
/// full host paths.
pub fn build_instancer_rewire(
    source: &dyn PointsSource,
    mut lookup: impl FnMut(&str) -> Option<String>,
) -> Option<InstancerRewire> {
    if !has_instance_shape_type(source) {
        return None;
    }

    let names = source
        .property(channel::INSTANCE_NAMES)?
        .last_sample()?
        .strings()?;
    match names {
        [] => return None,
        [only] if only.is_empty() => return None,
        _ => {}
    }

    let objects = names
        .iter()
        .filter(|name| !name.is_empty())
        .map(|name| {
            let (path, replaced) = normalize_instance_name(name);
            if replaced != 1 {
                return path;
            }
            let short = path.strip_prefix('|').unwrap_or(&path);
            match lookup(short) {
                Some(full) => full,
                None => {
                    warn!("{}: cannot resolve instanced shape {}", source.name(), short);
                    path
                }
            }
        })
        .collect();

    Some(InstancerRewire {
        points: source.name().to_string(),
        objects,
        object_index: store_channel::SHAPE_INSTANCE_ID,
        rotation: store_channel::ORIENTATION,
        rotation_order: EulerRot::XYZ,
    })
}

/// Drops cached per-object state before its owner goes away.
pub trait Release {
    fn on_release(&mut self);
}

/// Imported Points objects taking part in the post-import instancing pass.
///
/// Scoped to one archive session: create it alongside the archive, register
/// each imported object, then call [`finalize_instancing`] once.
#[derive(Clone, Debug, Default)]
pub struct InstancingRegistry {
    identifiers: Vec<String>,
}

impl InstancingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `identifier`. Registering twice is a no-op.
    pub fn register(&mut self, identifier: &str) {
        if !self.contains(identifier) {
            self.identifiers.push(identifier.to_string());
        }
    }

    /// Stop tracking `identifier`.
    pub fn deregister(&mut self, identifier: &str) {
        self.identifiers.retain(|id| id != identifier);
    }

    /// Release `node` and stop tracking it.
    pub fn release(&mut self, identifier: &str, node: &mut dyn Release) {
        node.on_release();
        self.deregister(identifier);
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.identifiers.iter().any(|id| id == identifier)
    }

    pub fn identifiers(&self) -> &[String] {
        &self.identifiers
    }

    pub fn len(&self) -> usize {
        self.identifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identifiers.is_empty()
    }
}

/// Build the instancer rewire of every registered object that needs one.
///
/// Objects missing from `archive` are skipped with a warning.
pub fn finalize_instancing(
    registry: &InstancingRegistry,
    archive: &Archive,
    mut lookup: impl FnMut(&str) -> Option<String>,
) -> Vec<InstancerRewire> {
    registry
        .identifiers()
        .iter()
        .filter_map(|identifier| match archive.points(identifier) {
            Ok(points) => build_instancer_rewire(points, &mut lookup),
            Err(e) => {
                warn!("instancing: {}", e);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{ArraySample, PointsObject, PointsSink};
    use crate::core::PropertyHeader;
    use crate::util::{DQuat, DVec3};

    fn instancer() -> InstancerState {
        InstancerState {
            name: "instancer1".into(),
            paths: vec!["|shapes|cube".into(), "|shapes|sphere".into()],
            matrices: vec![
                DMat4::from_rotation_z(0.5),
                DMat4::from_scale_rotation_translation(
                    DVec3::splat(3.0),
                    DQuat::from_rotation_x(1.0),
                    DVec3::X,
                ),
            ],
            // Element 1 references two shapes; only the first counts.
            path_start_indices: vec![0, 1],
            path_indices: vec![0, 1, 0],
        }
    }

    #[test]
    fn test_capture() {
        let table = InstanceCorrelationTable::capture(&instancer()).unwrap();
        assert_eq!(table.names(), &["/shapes/cube".to_string(), "/shapes/sphere".to_string()]);
        assert_eq!(table.shape_ids(), vec![0, 1]);
        assert_eq!(table.records()[1].full_path, "|shapes|sphere");

        let q = table.records()[1].orientation;
        assert!(q.abs_diff_eq(Quat::from_rotation_x(1.0), 1e-5));
        assert_eq!(table.orientations()[0][0], table.records()[0].orientation.w);
    }

    #[test]
    fn test_pick_instancer() {
        let a = instancer();
        let b = instancer();
        assert!(pick_instancer("emitter", &[]).is_none());
        assert_eq!(pick_instancer("emitter", &[&a]).unwrap().name(), "instancer1");
        assert!(pick_instancer("emitter", &[&a, &b]).is_none());
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_instance_name("/shapes/cube"), ("|shapes|cube".into(), 2));
        assert_eq!(normalize_instance_name("/ns:cube shape!"), ("|ns:cubeshape".into(), 1));
    }

    fn instanced(shape_type: u16, names: Vec<String>) -> PointsObject {
        let mut points = PointsObject::new("particles");
        points
            .property_mut(PropertyHeader::array(channel::SHAPE_TYPE, DataType::UINT16))
            .unwrap()
            .push_pod(&[shape_type, shape_type])
            .unwrap();
        points
            .property_mut(PropertyHeader::array(channel::INSTANCE_NAMES, DataType::STRING))
            .unwrap()
            .push(ArraySample::from_strings(names))
            .unwrap();
        points
    }

    #[test]
    fn test_rewire() {
        let points = instanced(7, vec!["/shapes/cube".into(), "".into(), "/sphere".into()]);
        let rewire = build_instancer_rewire(&points, |short| {
            (short == "sphere").then(|| "|shapes|sphere".to_string())
        })
        .unwrap();
        assert_eq!(rewire.objects, vec!["|shapes|cube", "|shapes|sphere"]);
        assert_eq!(rewire.object_index, "shapeInstanceIdPP");
        assert_eq!(rewire.rotation, "orientationPP");
        assert_eq!(rewire.rotation_order, EulerRot::XYZ);
    }

    #[test]
    fn test_rewire_preconditions() {
        let none = |_: &str| None;
        assert!(build_instancer_rewire(&instanced(3, vec!["/a/b".into()]), none).is_none());
        assert!(build_instancer_rewire(&instanced(7, vec!["".into()]), none).is_none());
        assert!(build_instancer_rewire(&instanced(7, vec![]), none).is_none());
        assert!(build_instancer_rewire(&PointsObject::new("plain"), none).is_none());
        // Unresolved short names keep their cleaned path.
        let rewire = build_instancer_rewire(&instanced(7, vec!["/cube".into()]), none).unwrap();
        assert_eq!(rewire.objects, vec!["|cube"]);
    }

    struct Node {
        released: bool,
    }

    impl Release for Node {
        fn on_release(&mut self) {
            self.released = true;
        }
    }

    #[test]
    fn test_registry_and_finalize() {
        let mut archive = Archive::new("cache.abc");
        archive.add_points(instanced(7, vec!["/shapes/cube".into()]));
        let mut plain = PointsObject::new("plain");
        plain.append_sample(0.0, &Default::default()).unwrap();
        archive.add_points(plain);

        let mut registry = InstancingRegistry::new();
        registry.register("/particles");
        registry.register("/particles");
        registry.register("plain");
        registry.register("gone");
        assert_eq!(registry.len(), 3);

        let rewires = finalize_instancing(&registry, &archive, |_| None);
        assert_eq!(rewires.len(), 1);
        assert_eq!(rewires[0].points, "particles");

        let mut node = Node { released: false };
        registry.release("/particles", &mut node);
        assert!(node.released);
        assert!(!registry.contains("/particles"));
        assert!(finalize_instancing(&registry, &archive, |_| None).is_empty());
    }
}
