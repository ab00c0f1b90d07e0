//! Collision shapes.

use std::cell::RefCell;

use glam::Vec3;
use kestrel_core::{Handle, RefCount, RefCounted};

use crate::material::Material;

/// Shape geometry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Geometry {
    /// Sphere around the actor origin.
    Sphere {
        /// Radius; must be positive.
        radius: f32,
    },
    /// Axis-aligned box around the actor origin.
    Box {
        /// Half extents per axis; all must be positive.
        half_extents: Vec3,
    },
    /// Capsule along the actor's Y axis.
    Capsule {
        /// Radius; must be positive.
        radius: f32,
        /// Half the cylindrical section's height; must be positive.
        half_height: f32,
    },
    /// Infinite ground plane through the actor origin.
    Plane,
}

impl Geometry {
    /// Radius of the bounding sphere, or `None` for unbounded geometry.
    #[must_use]
    pub fn bounding_radius(&self) -> Option<f32> {
        match *self {
            Self::Sphere { radius } => Some(radius),
            Self::Box { half_extents } => Some(half_extents.length()),
            Self::Capsule {
                radius,
                half_height,
            } => Some(radius + half_height),
            Self::Plane => None,
        }
    }
}

/// Pooled shape implementation. Reached only through [`Shape`] handles.
///
/// A shape retains a handle to its material: a material can never be
/// destroyed while a shape still uses it.
pub struct ShapeImpl {
    refs: RefCount,
    geometry: RefCell<Geometry>,
    material: RefCell<Material>,
}

impl ShapeImpl {
    pub(crate) fn new(geometry: Geometry, material: Material) -> Self {
        Self {
            refs: RefCount::new(),
            geometry: RefCell::new(geometry),
            material: RefCell::new(material),
        }
    }

    /// Current geometry.
    #[must_use]
    pub fn geometry(&self) -> Geometry {
        *self.geometry.borrow()
    }

    /// Handle to the current material.
    #[must_use]
    pub fn material(&self) -> Material {
        self.material.borrow().clone()
    }

    /// Replaces the geometry in place.
    pub fn set_geometry(&self, geometry: Geometry) {
        *self.geometry.borrow_mut() = geometry;
    }

    /// Replaces the material, releasing the reference to the old one.
    pub fn set_material(&self, material: Material) {
        *self.material.borrow_mut() = material;
    }
}

impl RefCounted for ShapeImpl {
    fn ref_count(&self) -> &RefCount {
        &self.refs
    }
}

/// Shareable handle to a pooled shape.
pub type Shape = Handle<ShapeImpl>;
