//! Surface materials.

use std::cell::Cell;

use kestrel_core::{Handle, RefCount, RefCounted};

/// Pooled material implementation. Reached only through [`Material`]
/// handles; all parameters are tunable after creation.
pub struct MaterialImpl {
    refs: RefCount,
    static_friction: Cell<f32>,
    dynamic_friction: Cell<f32>,
    restitution: Cell<f32>,
}

impl MaterialImpl {
    pub(crate) fn new(static_friction: f32, dynamic_friction: f32, restitution: f32) -> Self {
        Self {
            refs: RefCount::new(),
            static_friction: Cell::new(static_friction),
            dynamic_friction: Cell::new(dynamic_friction),
            restitution: Cell::new(restitution),
        }
    }

    /// Friction coefficient while at rest.
    #[must_use]
    pub fn static_friction(&self) -> f32 {
        self.static_friction.get()
    }

    /// Friction coefficient while sliding.
    #[must_use]
    pub fn dynamic_friction(&self) -> f32 {
        self.dynamic_friction.get()
    }

    /// Bounciness in `[0, 1]`.
    #[must_use]
    pub fn restitution(&self) -> f32 {
        self.restitution.get()
    }

    /// Sets the at-rest friction coefficient.
    pub fn set_static_friction(&self, value: f32) {
        self.static_friction.set(value);
    }

    /// Sets the sliding friction coefficient.
    pub fn set_dynamic_friction(&self, value: f32) {
        self.dynamic_friction.set(value);
    }

    /// Sets the bounciness.
    pub fn set_restitution(&self, value: f32) {
        self.restitution.set(value);
    }
}

impl RefCounted for MaterialImpl {
    fn ref_count(&self) -> &RefCount {
        &self.refs
    }
}

/// Shareable handle to a pooled material.
pub type Material = Handle<MaterialImpl>;
