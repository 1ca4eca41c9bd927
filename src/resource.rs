//! Named handles to external GPU objects.

use std::sync::Arc;

use crate::types::{Access, ArrayLen, Dim, ResourceKind, Ty};

/// Explicit register/space assignment for a resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Binding {
    pub register: Option<u32>,
    pub space: Option<u32>,
}

/// Element resource and size of a resource array.
#[derive(Clone, Debug)]
pub struct ResourceArray {
    pub elem: Arc<Resource>,
    pub size: ArrayLen,
}

/// A named, typed handle to a texture, buffer, sampler, acceleration
/// structure, plain constant, or an array of such handles.
#[derive(Clone, Debug)]
pub struct Resource {
    pub name: String,
    pub ty: Ty,
    pub array: Option<ResourceArray>,
    pub binding: Option<Binding>,
}

impl Resource {
    pub fn new(name: &str, ty: Ty) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            ty,
            array: None,
            binding: None,
        })
    }

    pub fn texture_2d(name: &str, elem: Ty) -> Arc<Self> {
        Self::new(name, Ty::texture(elem, Dim::D2))
    }

    pub fn rw_texture_2d(name: &str, elem: Ty) -> Arc<Self> {
        Self::new(name, Ty::rw_texture(elem, Dim::D2))
    }

    pub fn texture_3d(name: &str, elem: Ty) -> Arc<Self> {
        Self::new(name, Ty::texture(elem, Dim::D3))
    }

    pub fn rw_texture_3d(name: &str, elem: Ty) -> Arc<Self> {
        Self::new(name, Ty::rw_texture(elem, Dim::D3))
    }

    pub fn buffer(name: &str, elem: Ty) -> Arc<Self> {
        Self::new(name, Ty::buffer(elem))
    }

    pub fn rw_buffer(name: &str, elem: Ty) -> Arc<Self> {
        Self::new(name, Ty::rw_buffer(elem))
    }

    pub fn sampler(name: &str) -> Arc<Self> {
        Self::new(name, Ty::sampler())
    }

    pub fn tlas(name: &str) -> Arc<Self> {
        Self::new(name, Ty::tlas())
    }

    pub fn constant(name: &str, ty: Ty) -> Arc<Self> {
        Self::new(name, Ty::constant(ty))
    }

    /// Array of `elem`-shaped resources, unbounded when `size` is
    /// `ArrayLen::Unbounded` (bindless).
    pub fn array(name: &str, elem: Arc<Resource>, size: ArrayLen) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            ty: Ty::array(elem.ty.clone(), size),
            array: Some(ResourceArray { elem, size }),
            binding: None,
        })
    }

    /// Copy of this resource with an explicit register/space assignment.
    pub fn with_binding(&self, register: Option<u32>, space: Option<u32>) -> Arc<Self> {
        Arc::new(Self {
            binding: Some(Binding { register, space }),
            ..self.clone()
        })
    }

    pub fn is_array(&self) -> bool {
        self.array.is_some()
    }

    /// The resource type of this handle, or of its elements for arrays.
    pub fn shape(&self) -> &Ty {
        match &self.array {
            Some(array) => &array.elem.ty,
            None => &self.ty,
        }
    }

    pub fn kind(&self) -> Option<ResourceKind> {
        self.shape().resource_kind()
    }

    /// HLSL register class letter for this resource's shape.
    pub fn register_letter(&self) -> char {
        match (self.kind(), self.shape().access()) {
            (Some(ResourceKind::Sampler), _) => 's',
            (Some(ResourceKind::Constant), _) => 'b',
            (_, Some(Access::ReadWrite)) => 'u',
            _ => 't',
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_texture_resource() {
        let r = Resource::texture_2d("g_albedo", Ty::f32x4());
        assert_eq!(r.name, "g_albedo");
        assert_eq!(r.ty.name(), "Texture2D");
        assert_eq!(r.kind(), Some(ResourceKind::Texture));
        assert!(!r.is_array());
        assert_eq!(r.register_letter(), 't');
    }

    #[test]
    fn test_unbounded_array() {
        let elem = Resource::texture_2d("g_textures", Ty::f32x4());
        let arr = Resource::array("g_textures", elem, ArrayLen::Unbounded);
        assert!(arr.is_array());
        assert!(arr.ty.is_array());
        assert_eq!(arr.ty.elem(), Some(Ty::texture(Ty::f32x4(), Dim::D2)));
        assert_eq!(arr.shape().name(), "Texture2D");
    }

    #[test]
    fn test_register_letters() {
        assert_eq!(Resource::rw_buffer("b", Ty::u32()).register_letter(), 'u');
        assert_eq!(Resource::sampler("s").register_letter(), 's');
        assert_eq!(Resource::constant("c", Ty::u32()).register_letter(), 'b');
        assert_eq!(Resource::tlas("t").register_letter(), 't');
    }

    #[test]
    fn test_with_binding() {
        let r = Resource::buffer("g_data", Ty::u32()).with_binding(Some(3), Some(1));
        assert_eq!(
            r.binding,
            Some(Binding {
                register: Some(3),
                space: Some(1)
            })
        );
    }
}
