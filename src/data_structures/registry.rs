//! Name-unique containers for the scene's shared instances.
//!
//! A registry owns its entries and hands out [`RegistryId`]s. The world graph
//! stores ids instead of references, so any number of nodes can point at the
//! same object and the registry remains the single owner.

use std::collections::HashMap;

use crate::{
    context::GraphicsContext,
    data_structures::object::Object,
    error::{RegistryError, RenderError},
    render::Renderable,
    vehicle::Vehicle,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegistryId(usize);

impl RegistryId {
    pub fn index(&self) -> usize {
        self.0
    }
}

pub type ObjectId = RegistryId;

/// Insertion-ordered map from unique names to owned entries.
pub struct Registry<T> {
    kind: &'static str,
    names: Vec<String>,
    entries: Vec<T>,
    by_name: HashMap<String, RegistryId>,
}

impl<T> Registry<T> {
    /// `kind` only shows up in diagnostics.
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            names: Vec::new(),
            entries: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    /// Adds `value` under `name`. An existing entry with that name wins and
    /// `value` is dropped.
    pub fn insert(&mut self, name: impl Into<String>, value: T) -> Result<RegistryId, RegistryError> {
        let name = name.into();
        if self.by_name.contains_key(&name) {
            log::warn!(
                "A {} named {:?} already exists, the new one is ignored.",
                self.kind,
                name
            );
            return Err(RegistryError::Duplicate(name));
        }
        let id = RegistryId(self.entries.len());
        self.by_name.insert(name.clone(), id);
        self.names.push(name);
        self.entries.push(value);
        Ok(id)
    }

    pub fn id(&self, name: &str) -> Option<RegistryId> {
        self.by_name.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn get(&self, id: RegistryId) -> Option<&T> {
        self.entries.get(id.0)
    }

    pub fn get_mut(&mut self, id: RegistryId) -> Option<&mut T> {
        self.entries.get_mut(id.0)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&T> {
        self.id(name).and_then(|id| self.get(id))
    }

    pub fn name(&self, id: RegistryId) -> Option<&str> {
        self.names.get(id.0).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.names.iter().map(String::as_str).zip(self.entries.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut T)> {
        self.names.iter().map(String::as_str).zip(self.entries.iter_mut())
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.entries.iter_mut()
    }

    pub fn clear(&mut self) {
        self.names.clear();
        self.entries.clear();
        self.by_name.clear();
    }
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self::new("entry")
    }
}

pub type ObjectRegistry = Registry<Object>;

impl Registry<Object> {
    pub fn objects() -> Self {
        Self::new("object")
    }

    /// Uploads every object. An object the backend refuses is marked failed
    /// and the rest are still uploaded.
    pub fn initialize_all(&mut self, ctx: &mut dyn GraphicsContext) {
        for object in self.entries.iter_mut() {
            if let Err(e) = object.initialize(ctx) {
                log::error!("Object {} could not be initialized: {}", object.name(), e);
            }
        }
    }

    /// Releases GPU resources and forgets all objects.
    pub fn cleanup_all(&mut self, ctx: &mut dyn GraphicsContext) {
        for object in self.entries.iter_mut() {
            object.cleanup(ctx);
        }
        self.clear();
    }
}

pub type VehicleRegistry = Registry<Box<dyn Vehicle>>;

impl Registry<Box<dyn Vehicle>> {
    pub fn vehicles() -> Self {
        Self::new("vehicle")
    }

    pub fn initialize_all(&mut self, ctx: &mut dyn GraphicsContext) -> Result<(), RenderError> {
        for vehicle in self.entries.iter_mut() {
            vehicle.initialize(ctx)?;
        }
        Ok(())
    }

    pub fn cleanup_all(&mut self, ctx: &mut dyn GraphicsContext) {
        for vehicle in self.entries.iter_mut() {
            vehicle.cleanup(ctx);
        }
        self.clear();
    }

    /// Earliest and latest timestep over all vehicles, widened to contain 0..1.
    pub fn timestep_bounds(&self) -> (f32, f32) {
        self.entries.iter().fold((0.0_f32, 1.0_f32), |(first, last), v| {
            (first.min(v.first_timestep()), last.max(v.final_timestep()))
        })
    }
}
