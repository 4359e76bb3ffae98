use strata_ir::{
    self as ir, DataType, Dims, FieldKind, GetName, Halo, Id,
};
use strata_utils::StrataResult;

/// A field as seen by a compiled stencil.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct FieldInfo {
    pub name: Id,
    pub dtype: DataType,
    pub dims: Dims,
    pub kind: FieldKind,
    /// Points needed around the domain on each axis.
    pub halo: [Halo; 3],
}

impl FieldInfo {
    pub fn is_api(&self) -> bool {
        self.kind != FieldKind::Temporary
    }
}

impl GetName for FieldInfo {
    fn name(&self) -> Id {
        self.name
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct ScalarInfo {
    pub name: Id,
    pub dtype: DataType,
}

/// Everything a caller has to provide to run a stencil.
///
/// Fields are numbered: the API fields in signature order come first,
/// followed by the temporaries. Kernels refer to fields and scalars by these
/// numbers.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct Interface {
    pub name: Id,
    pub fields: Vec<FieldInfo>,
    pub scalars: Vec<ScalarInfo>,
    /// Smallest vertical domain the stencil accepts.
    pub min_k_size: u64,
}

impl Interface {
    /// Fails if the extents of `ctx` were never computed.
    pub fn new(ctx: &ir::Context) -> StrataResult<Self> {
        let extents = ctx.extents()?;
        let fields = ctx
            .stencil
            .fields
            .values()
            .map(|f| FieldInfo {
                name: f.name,
                dtype: f.dtype,
                dims: f.dims,
                kind: f.kind,
                halo: extents.halo(&f.name),
            })
            .collect();
        let scalars = ctx
            .stencil
            .scalars
            .values()
            .map(|s| ScalarInfo {
                name: s.name,
                dtype: s.dtype,
            })
            .collect();
        Ok(Self {
            name: ctx.stencil.name,
            fields,
            scalars,
            min_k_size: ctx.min_k_size,
        })
    }

    pub fn api_fields(&self) -> impl Iterator<Item = &FieldInfo> {
        self.fields.iter().filter(|f| f.is_api())
    }

    pub fn num_api_fields(&self) -> usize {
        self.api_fields().count()
    }

    /// Number of the field `name`.
    pub fn slot(&self, name: &Id) -> Option<usize> {
        self.fields.iter().position(|f| f.name == *name)
    }

    /// Number of the scalar parameter `name`.
    pub fn scalar_slot(&self, name: &Id) -> Option<usize> {
        self.scalars.iter().position(|s| s.name == *name)
    }
}
