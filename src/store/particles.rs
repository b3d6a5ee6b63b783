//! In-memory particle attribute store.

use tracing::debug;

use crate::util::{DMat4, DataType, Error, Result};

use super::{channel, AttributeArray, AttributeInfo, AttributeKind, AttributeStore};

#[derive(Clone, Debug)]
struct Column {
    info: AttributeInfo,
    values: AttributeArray,
}

/// Particle system attribute table.
///
/// Starts with the core channels every particle system has: ids, position,
/// velocity, radius, age and mass. Color, opacity and instancing channels
/// appear once declared. Emitted elements get fresh sequential ids and zero
/// everywhere else.
#[derive(Clone, Debug)]
pub struct ParticleStore {
    columns: Vec<Column>,
    count: usize,
    next_id: i32,
    world: DMat4,
}

impl Default for ParticleStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ParticleStore {
    /// Create an empty particle system.
    pub fn new() -> Self {
        let core = [
            AttributeInfo::with_kind(channel::ID, DataType::INT32, AttributeKind::Int),
            AttributeInfo::new(channel::POSITION, DataType::VEC3D),
            AttributeInfo::new(channel::VELOCITY, DataType::VEC3D),
            AttributeInfo::new(channel::RADIUS, DataType::FLOAT64),
            AttributeInfo::new(channel::AGE, DataType::FLOAT64),
            AttributeInfo::new(channel::MASS, DataType::FLOAT64),
        ];
        let columns = core
            .into_iter()
            .map(|info| Column { values: AttributeArray::zeroed(info.kind, 0), info })
            .collect();
        Self { columns, count: 0, next_id: 0, world: DMat4::IDENTITY }
    }

    /// Set the object's world transform.
    pub fn set_world_matrix(&mut self, world: DMat4) {
        self.world = world;
    }

    fn column(&self, name: &str) -> Result<&Column> {
        self.columns
            .iter()
            .find(|c| c.info.name == name)
            .ok_or_else(|| Error::AttributeNotFound(name.to_string()))
    }
}

impl AttributeStore for ParticleStore {
    fn declare_attribute(&mut self, name: &str, data_type: DataType) -> Result<()> {
        let info = AttributeInfo::new(name, data_type);
        if let Ok(existing) = self.column(name) {
            if existing.info.kind != info.kind {
                return Err(Error::AttributeType {
                    name: name.to_string(),
                    expected: existing.info.kind.name(),
                    actual: info.kind.name(),
                });
            }
            return Ok(());
        }
        debug!("declare {} as {} ({})", name, info.kind.name(), data_type);
        self.columns.push(Column {
            values: AttributeArray::zeroed(info.kind, self.count),
            info,
        });
        Ok(())
    }

    fn attributes(&self) -> Vec<AttributeInfo> {
        self.columns.iter().map(|c| c.info.clone()).collect()
    }

    fn has_attribute(&self, name: &str) -> bool {
        self.column(name).is_ok()
    }

    fn get_attribute(&self, name: &str) -> Result<AttributeArray> {
        Ok(self.column(name)?.values.clone())
    }

    fn set_attribute(&mut self, name: &str, values: AttributeArray) -> Result<()> {
        let count = self.count;
        let column = self
            .columns
            .iter_mut()
            .find(|c| c.info.name == name)
            .ok_or_else(|| Error::AttributeNotFound(name.to_string()))?;
        if values.kind() != column.info.kind {
            return Err(Error::AttributeType {
                name: name.to_string(),
                expected: column.info.kind.name(),
                actual: values.kind().name(),
            });
        }
        if values.len() != count {
            return Err(Error::ElementCountMismatch {
                name: name.to_string(),
                expected: count,
                actual: values.len(),
            });
        }
        column.values = values;
        Ok(())
    }

    fn element_count(&self) -> usize {
        self.count
    }

    fn set_element_count(&mut self, count: usize) -> Result<()> {
        if count > self.count {
            return self.emit_elements(count - self.count);
        }
        for column in &mut self.columns {
            column.values.resize(count);
        }
        self.count = count;
        Ok(())
    }

    fn emit_elements(&mut self, count: usize) -> Result<()> {
        let new_count = self.count + count;
        let first_id = self.next_id;
        self.next_id = first_id
            .checked_add(i32::try_from(count).map_err(|_| Error::other("too many elements"))?)
            .ok_or_else(|| Error::other("particle id space exhausted"))?;

        for column in &mut self.columns {
            if column.info.name == channel::ID {
                if let AttributeArray::Int(ids) = &mut column.values {
                    ids.extend(first_id..self.next_id);
                    continue;
                }
            }
            column.values.resize(new_count);
        }
        self.count = new_count;
        Ok(())
    }

    fn world_matrix(&self) -> DMat4 {
        self.world
    }
}
