use std::fmt;

/// Semantic type of a user-facing shader parameter.
///
/// The set is closed: anything the driver reports outside of it (matrices,
/// samplers, images) is dropped during reflection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UniformType {
    Float,
    Vec2,
    Vec3,
    Vec4,
    Double,
    DVec2,
    DVec3,
    DVec4,
    Int,
    IVec2,
    IVec3,
    IVec4,
    UInt,
    UVec2,
    UVec3,
    UVec4,
    Bool,
    BVec2,
    BVec3,
    BVec4,
}

/// Which member of [`UniformValue`] a type stores its value in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueKind {
    Float,
    Int,
    Bool,
}

impl UniformType {
    /// Maps a GL reflection type tag onto a supported parameter type.
    pub fn from_gl(tag: u32) -> Option<Self> {
        let ty = match tag {
            glow::FLOAT => Self::Float,
            glow::FLOAT_VEC2 => Self::Vec2,
            glow::FLOAT_VEC3 => Self::Vec3,
            glow::FLOAT_VEC4 => Self::Vec4,
            glow::DOUBLE => Self::Double,
            glow::DOUBLE_VEC2 => Self::DVec2,
            glow::DOUBLE_VEC3 => Self::DVec3,
            glow::DOUBLE_VEC4 => Self::DVec4,
            glow::INT => Self::Int,
            glow::INT_VEC2 => Self::IVec2,
            glow::INT_VEC3 => Self::IVec3,
            glow::INT_VEC4 => Self::IVec4,
            glow::UNSIGNED_INT => Self::UInt,
            glow::UNSIGNED_INT_VEC2 => Self::UVec2,
            glow::UNSIGNED_INT_VEC3 => Self::UVec3,
            glow::UNSIGNED_INT_VEC4 => Self::UVec4,
            glow::BOOL => Self::Bool,
            glow::BOOL_VEC2 => Self::BVec2,
            glow::BOOL_VEC3 => Self::BVec3,
            glow::BOOL_VEC4 => Self::BVec4,
            _ => return None,
        };
        Some(ty)
    }

    pub fn kind(self) -> ValueKind {
        match self {
            Self::Float
            | Self::Vec2
            | Self::Vec3
            | Self::Vec4
            | Self::Double
            | Self::DVec2
            | Self::DVec3
            | Self::DVec4 => ValueKind::Float,
            Self::Int
            | Self::IVec2
            | Self::IVec3
            | Self::IVec4
            | Self::UInt
            | Self::UVec2
            | Self::UVec3
            | Self::UVec4 => ValueKind::Int,
            Self::Bool | Self::BVec2 | Self::BVec3 | Self::BVec4 => ValueKind::Bool,
        }
    }

    /// Number of meaningful lanes, between 1 and 4.
    pub fn components(self) -> usize {
        match self {
            Self::Float | Self::Double | Self::Int | Self::UInt | Self::Bool => 1,
            Self::Vec2 | Self::DVec2 | Self::IVec2 | Self::UVec2 | Self::BVec2 => 2,
            Self::Vec3 | Self::DVec3 | Self::IVec3 | Self::UVec3 | Self::BVec3 => 3,
            Self::Vec4 | Self::DVec4 | Self::IVec4 | Self::UVec4 | Self::BVec4 => 4,
        }
    }

    pub fn is_double(self) -> bool {
        matches!(self, Self::Double | Self::DVec2 | Self::DVec3 | Self::DVec4)
    }

    pub fn is_unsigned(self) -> bool {
        matches!(self, Self::UInt | Self::UVec2 | Self::UVec3 | Self::UVec4)
    }

    pub fn glsl_name(self) -> &'static str {
        match self {
            Self::Float => "float",
            Self::Vec2 => "vec2",
            Self::Vec3 => "vec3",
            Self::Vec4 => "vec4",
            Self::Double => "double",
            Self::DVec2 => "dvec2",
            Self::DVec3 => "dvec3",
            Self::DVec4 => "dvec4",
            Self::Int => "int",
            Self::IVec2 => "ivec2",
            Self::IVec3 => "ivec3",
            Self::IVec4 => "ivec4",
            Self::UInt => "uint",
            Self::UVec2 => "uvec2",
            Self::UVec3 => "uvec3",
            Self::UVec4 => "uvec4",
            Self::Bool => "bool",
            Self::BVec2 => "bvec2",
            Self::BVec3 => "bvec3",
            Self::BVec4 => "bvec4",
        }
    }
}

impl fmt::Display for UniformType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.glsl_name())
    }
}

/// Value storage for a parameter, sized for the widest supported type.
///
/// Lanes beyond [`UniformType::components`] are carried but never bound.
/// Doubles live in the float lanes and unsigned integers in the int lanes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UniformValue {
    Float([f32; 4]),
    Int([i32; 4]),
    Bool([bool; 4]),
}

impl UniformValue {
    pub fn zeroed(ty: UniformType) -> Self {
        match ty.kind() {
            ValueKind::Float => Self::Float([0.0; 4]),
            ValueKind::Int => Self::Int([0; 4]),
            ValueKind::Bool => Self::Bool([false; 4]),
        }
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Float(_) => ValueKind::Float,
            Self::Int(_) => ValueKind::Int,
            Self::Bool(_) => ValueKind::Bool,
        }
    }
}

/// Location a parameter is uploaded to inside one linked program.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BindingSlot {
    #[default]
    Unresolved,
    Resolved(u32),
}

impl BindingSlot {
    pub fn location(self) -> Option<u32> {
        match self {
            Self::Resolved(location) => Some(location),
            Self::Unresolved => None,
        }
    }

    pub fn is_resolved(self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}

/// A user-facing parameter declared by the scene source.
#[derive(Clone, Debug, PartialEq)]
pub struct Uniform {
    pub name: String,
    pub ty: UniformType,
    pub slot: BindingSlot,
    pub value: UniformValue,
}

impl Uniform {
    /// Creates a parameter with a zero value and no binding slot yet.
    pub fn new(name: impl Into<String>, ty: UniformType) -> Self {
        Self {
            name: name.into(),
            ty,
            slot: BindingSlot::Unresolved,
            value: UniformValue::zeroed(ty),
        }
    }

    /// Whether this declaration is the same parameter as `other` across reloads.
    pub fn same_declaration(&self, other: &Uniform) -> bool {
        self.name == other.name && self.ty == other.ty
    }
}
