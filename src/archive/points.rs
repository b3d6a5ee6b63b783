//! Points schema: an archived particle object.
//!
//! Layout follows `AbcGeom_Points_v1`: a `.geom` compound holding `P`, `id`,
//! `.velocities`, `.widths` and `.selfBnds`, plus an `.arbGeomParams`
//! compound for every side channel and user-defined property.

use std::cell::Cell;

use crate::core::{MetaData, PropertyHeader, TimeSampling};
use crate::util::{BBox3d, Chrono, DataType, Error, Result, Vec3};

use super::property::ArrayProperty;
use super::{PointsSink, PointsSource};

/// Points schema identifier.
pub const POINTS_SCHEMA: &str = "AbcGeom_Points_v1";

/// Id value that, alone in a sample, marks a frame without elements.
pub const EMPTY_SENTINEL_ID: u64 = u64::MAX;

const P: &str = "P";
const ID: &str = "id";
const VELOCITIES: &str = ".velocities";
const WIDTHS: &str = ".widths";

/// Points sample data.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PointsSample {
    /// Point positions.
    pub positions: Vec<Vec3>,
    /// Point IDs (unique identifiers).
    pub ids: Vec<u64>,
    /// Optional velocities.
    pub velocities: Vec<Vec3>,
    /// Optional widths (radius per point).
    pub widths: Vec<f32>,
    /// Self bounds over all positions.
    pub self_bounds: Option<BBox3d>,
}

impl PointsSample {
    /// Create empty sample.
    pub fn new() -> Self {
        Self::default()
    }

    /// Legacy encoding of a frame without elements: one position, one
    /// sentinel id.
    pub fn empty_sentinel() -> Self {
        Self {
            positions: vec![Vec3::ZERO],
            ids: vec![EMPTY_SENTINEL_ID],
            velocities: vec![Vec3::ZERO],
            widths: vec![0.0],
            self_bounds: Some(BBox3d::EMPTY),
        }
    }

    /// Get number of points.
    pub fn num_points(&self) -> usize {
        self.positions.len()
    }

    /// Check if sample has velocity data.
    pub fn has_velocities(&self) -> bool {
        !self.velocities.is_empty()
    }

    /// True when the ids carry the single-element empty marker.
    pub fn is_empty_sentinel(&self) -> bool {
        self.ids.len() == 1 && self.ids[0] == EMPTY_SENTINEL_ID
    }

    /// Effective element count: position count, or zero for the empty marker.
    pub fn element_count(&self) -> usize {
        if self.is_empty_sentinel() {
            0
        } else {
            self.positions.len()
        }
    }

    /// Compute bounding box.
    pub fn compute_bounds(&self) -> BBox3d {
        let mut bounds = BBox3d::EMPTY;
        for p in &self.positions {
            bounds.expand_by_point(p.as_dvec3());
        }
        bounds
    }
}

/// Archived Points object.
#[derive(Debug)]
pub struct PointsObject {
    name: String,
    meta_data: MetaData,
    time_sampling: TimeSampling,
    geom: Vec<ArrayProperty>,
    self_bounds: Vec<BBox3d>,
    arb_geom_params: Vec<ArrayProperty>,
    sample_reads: Cell<usize>,
}

impl PointsObject {
    /// Create a Points object recording frame times acyclically.
    pub fn new(name: &str) -> Self {
        Self::with_time_sampling(name, TimeSampling::acyclic(Vec::new()))
    }

    /// Create a Points object with explicit time sampling.
    pub fn with_time_sampling(name: &str, time_sampling: TimeSampling) -> Self {
        let meta_data = MetaData::new()
            .with(MetaData::SCHEMA_KEY, POINTS_SCHEMA)
            .with(MetaData::SCHEMA_BASE_KEY, "AbcGeom_GeomBase_v1");

        let vtx = || MetaData::new().with(MetaData::GEO_SCOPE_KEY, "vtx");
        let geom = vec![
            ArrayProperty::new(
                PropertyHeader::array(P, DataType::VEC3F)
                    .with_meta_data(vtx().with(MetaData::INTERPRETATION_KEY, "point")),
            ),
            ArrayProperty::new(PropertyHeader::array(ID, DataType::UINT64)),
            ArrayProperty::new(
                PropertyHeader::array(VELOCITIES, DataType::VEC3F)
                    .with_meta_data(vtx().with(MetaData::INTERPRETATION_KEY, "vector")),
            ),
            ArrayProperty::new(PropertyHeader::array(WIDTHS, DataType::FLOAT32).with_meta_data(vtx())),
        ];

        Self {
            name: name.trim_start_matches('/').to_string(),
            meta_data,
            time_sampling,
            geom,
            self_bounds: Vec::new(),
            arb_geom_params: Vec::new(),
            sample_reads: Cell::new(0),
        }
    }

    pub fn meta_data(&self) -> &MetaData {
        &self.meta_data
    }

    /// Number of schema sample reads so far.
    pub fn sample_reads(&self) -> usize {
        self.sample_reads.get()
    }

    /// Insert a fully built generic property, replacing one of the same name.
    pub fn insert_property(&mut self, property: ArrayProperty) {
        match self.arb_geom_params.iter_mut().find(|p| p.name() == property.name()) {
            Some(slot) => *slot = property,
            None => self.arb_geom_params.push(property),
        }
    }

    fn geom(&self, name: &str) -> Result<&ArrayProperty> {
        self.geom
            .iter()
            .find(|p| p.name() == name)
            .ok_or_else(|| Error::PropertyNotFound(name.to_string()))
    }

    fn geom_mut(&mut self, name: &str) -> Result<&mut ArrayProperty> {
        self.geom
            .iter_mut()
            .find(|p| p.name() == name)
            .ok_or_else(|| Error::PropertyNotFound(name.to_string()))
    }
}

impl PointsSource for PointsObject {
    fn name(&self) -> &str {
        &self.name
    }

    fn time_sampling(&self) -> &TimeSampling {
        &self.time_sampling
    }

    fn num_samples(&self) -> usize {
        self.self_bounds.len()
    }

    fn get_sample(&self, index: usize) -> Result<PointsSample> {
        self.sample_reads.set(self.sample_reads.get() + 1);
        let count = self.num_samples();
        if index >= count {
            return Err(Error::SampleOutOfBounds { index, count });
        }

        Ok(PointsSample {
            positions: self.geom(P)?.sample(index)?.decode()?,
            ids: self.geom(ID)?.sample(index)?.decode()?,
            velocities: self.geom(VELOCITIES)?.sample(index)?.decode()?,
            widths: self.geom(WIDTHS)?.sample(index)?.decode()?,
            self_bounds: Some(self.self_bounds[index]),
        })
    }

    fn property_headers(&self) -> Vec<&PropertyHeader> {
        self.arb_geom_params.iter().map(ArrayProperty::header).collect()
    }

    fn property(&self, name: &str) -> Option<&ArrayProperty> {
        self.arb_geom_params.iter().find(|p| p.name() == name)
    }
}

impl PointsSink for PointsObject {
    fn append_sample(&mut self, time: Chrono, sample: &PointsSample) -> Result<usize> {
        self.time_sampling.record(time)?;

        self.geom_mut(P)?.push_pod(&sample.positions)?;
        self.geom_mut(ID)?.push_pod(&sample.ids)?;
        self.geom_mut(VELOCITIES)?.push_pod(&sample.velocities)?;
        self.geom_mut(WIDTHS)?.push_pod(&sample.widths)?;
        self.self_bounds
            .push(sample.self_bounds.unwrap_or_else(|| sample.compute_bounds()));

        Ok(self.self_bounds.len() - 1)
    }

    fn property_mut(&mut self, header: PropertyHeader) -> Result<&mut ArrayProperty> {
        let idx = match self.arb_geom_params.iter().position(|p| p.name() == header.name) {
            Some(idx) => {
                let existing = self.arb_geom_params[idx].header();
                if existing.data_type != header.data_type
                    || existing.property_type != header.property_type
                {
                    return Err(Error::TypeMismatch {
                        name: header.name,
                        expected: existing.data_type,
                        actual: header.data_type,
                    });
                }
                idx
            }
            None => {
                self.arb_geom_params.push(ArrayProperty::new(header));
                self.arb_geom_params.len() - 1
            }
        };
        Ok(&mut self.arb_geom_params[idx])
    }
}
