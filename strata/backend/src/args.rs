//! Binding call arguments to the interface of a compiled stencil.
use crate::{Interface, Storage};
use itertools::Itertools;
use std::collections::HashMap;
use strata_ir::{DataType, Dims, FieldKind, Id, Literal};
use strata_utils::{Error, StrataResult};

/// A field buffer passed to a stencil. Output fields have to be passed as
/// [FieldArg::Mut].
#[derive(Debug)]
pub enum FieldArg<'a> {
    Ref(&'a Storage),
    Mut(&'a mut Storage),
}

impl FieldArg<'_> {
    pub fn storage(&self) -> &Storage {
        match self {
            FieldArg::Ref(s) => s,
            FieldArg::Mut(s) => s,
        }
    }
}

/// Position of the first domain point in each field buffer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Origin {
    global: [usize; 3],
    fields: HashMap<Id, [usize; 3]>,
}

impl Origin {
    /// The same origin for every field.
    pub fn new(global: [usize; 3]) -> Self {
        Self {
            global,
            fields: HashMap::new(),
        }
    }

    /// Override the origin of one field.
    pub fn with_field<S: Into<Id>>(mut self, name: S, origin: [usize; 3]) -> Self {
        self.fields.insert(name.into(), origin);
        self
    }

    pub fn of(&self, name: &Id) -> [usize; 3] {
        self.fields.get(name).copied().unwrap_or(self.global)
    }
}

/// Fields and scalars for one call of a stencil.
///
/// ```
/// # use strata_backend::{Arguments, Storage};
/// # use strata_ir::DataType;
/// let inp = Storage::zeros([4, 4, 4], DataType::F64);
/// let mut out = Storage::zeros([4, 4, 4], DataType::F64);
/// let args = Arguments::new()
///     .arg(&inp)
///     .field_mut("out", &mut out)
///     .scalar("weight", 0.5);
/// # drop(args);
/// ```
#[derive(Debug, Default)]
pub struct Arguments<'a> {
    positional: Vec<FieldArg<'a>>,
    keyword: Vec<(Id, FieldArg<'a>)>,
    scalars: Vec<(Id, Literal)>,
}

/// Arguments matched against an [Interface]: one buffer per API field in
/// signature order and one value per scalar parameter.
pub(crate) struct BoundArgs<'a> {
    pub fields: Vec<(FieldArg<'a>, [usize; 3])>,
    pub scalars: Vec<f64>,
}

impl<'a> Arguments<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the next field of the signature to a read-only buffer.
    pub fn arg(mut self, storage: &'a Storage) -> Self {
        self.positional.push(FieldArg::Ref(storage));
        self
    }

    /// Bind the next field of the signature to a writable buffer.
    pub fn arg_mut(mut self, storage: &'a mut Storage) -> Self {
        self.positional.push(FieldArg::Mut(storage));
        self
    }

    pub fn field<S: Into<Id>>(mut self, name: S, storage: &'a Storage) -> Self {
        self.keyword.push((name.into(), FieldArg::Ref(storage)));
        self
    }

    pub fn field_mut<S: Into<Id>>(
        mut self,
        name: S,
        storage: &'a mut Storage,
    ) -> Self {
        self.keyword.push((name.into(), FieldArg::Mut(storage)));
        self
    }

    pub fn scalar<S: Into<Id>, L: Into<Literal>>(mut self, name: S, value: L) -> Self {
        self.scalars.push((name.into(), value.into()));
        self
    }

    /// Match the arguments against `iface` and check that every buffer
    /// covers `domain` plus the halo its field needs.
    pub(crate) fn bind(
        self,
        iface: &Interface,
        origin: &Origin,
        domain: [usize; 3],
    ) -> StrataResult<BoundArgs<'a>> {
        if (domain[2] as u64) < iface.min_k_size {
            return Err(Error::domain_mismatch(format!(
                "`{}' needs at least {} vertical levels, the domain has {}",
                iface.name, iface.min_k_size, domain[2]
            )));
        }

        let api = iface.api_fields().collect_vec();
        if self.positional.len() > api.len() {
            return Err(Error::domain_mismatch(format!(
                "`{}' takes {} fields but {} were passed by position",
                iface.name,
                api.len(),
                self.positional.len()
            )));
        }
        let mut slots: Vec<Option<FieldArg<'a>>> =
            api.iter().map(|_| None).collect();
        for (slot, arg) in slots.iter_mut().zip(self.positional) {
            *slot = Some(arg);
        }
        for (name, arg) in self.keyword {
            let Some(at) = api.iter().position(|f| f.name == name) else {
                return Err(Error::domain_mismatch(format!(
                    "`{}' has no field named `{name}'",
                    iface.name
                )));
            };
            if slots[at].is_some() {
                return Err(Error::domain_mismatch(format!(
                    "field `{name}' is bound more than once"
                )));
            }
            slots[at] = Some(arg);
        }

        let mut fields = Vec::with_capacity(api.len());
        for (info, slot) in api.iter().zip(slots) {
            let Some(arg) = slot else {
                return Err(Error::domain_mismatch(format!(
                    "field `{}' of `{}' is not bound",
                    info.name, iface.name
                )));
            };
            let storage = arg.storage();
            if storage.dtype() != info.dtype {
                return Err(Error::domain_mismatch(format!(
                    "field `{}' is declared {} but the buffer holds {}",
                    info.name,
                    info.dtype,
                    storage.dtype()
                )));
            }
            if info.kind == FieldKind::Output && matches!(arg, FieldArg::Ref(_)) {
                return Err(Error::domain_mismatch(format!(
                    "output field `{}' was passed read-only",
                    info.name
                )));
            }
            let field_origin = origin.of(&info.name);
            if info.dims == Dims::Zero {
                if storage.shape() != [1, 1, 1] {
                    return Err(Error::domain_mismatch(format!(
                        "0-D field `{}' needs a buffer of shape [1, 1, 1], got {:?}",
                        info.name,
                        storage.shape()
                    )));
                }
            } else {
                check_halo(&info.name, info.halo, storage.shape(), field_origin, domain)?;
            }
            fields.push((arg, field_origin));
        }

        let mut given: HashMap<Id, Literal> = HashMap::new();
        for (name, value) in self.scalars {
            if iface.scalar_slot(&name).is_none() {
                return Err(Error::domain_mismatch(format!(
                    "`{}' has no scalar parameter named `{name}'",
                    iface.name
                )));
            }
            if given.insert(name, value).is_some() {
                return Err(Error::domain_mismatch(format!(
                    "scalar `{name}' is bound more than once"
                )));
            }
        }
        let scalars = iface
            .scalars
            .iter()
            .map(|s| {
                let value = given.get(&s.name).ok_or_else(|| {
                    Error::domain_mismatch(format!(
                        "scalar `{}' of `{}' is not bound",
                        s.name, iface.name
                    ))
                })?;
                scalar_value(s.name, s.dtype, value)
            })
            .collect::<StrataResult<_>>()?;

        Ok(BoundArgs { fields, scalars })
    }
}

fn check_halo(
    name: &Id,
    halo: [(u64, u64); 3],
    shape: [usize; 3],
    origin: [usize; 3],
    domain: [usize; 3],
) -> StrataResult<()> {
    for (axis, label) in ["I", "J", "K"].iter().enumerate() {
        let (lo, hi) = halo[axis];
        if (origin[axis] as u64) < lo {
            return Err(Error::domain_mismatch(format!(
                "field `{name}' needs {lo} points before the origin along {label} but its origin is at {}",
                origin[axis]
            )));
        }
        let end = origin[axis]
            .checked_add(domain[axis])
            .and_then(|end| (end as u64).checked_add(hi))
            .ok_or_else(|| {
                Error::domain_mismatch(format!(
                    "field `{name}' with origin {} and domain {} does not fit along {label}",
                    origin[axis], domain[axis]
                ))
            })?;
        if end > shape[axis] as u64 {
            return Err(Error::domain_mismatch(format!(
                "field `{name}' needs {end} points along {label} but its buffer has {}",
                shape[axis]
            )));
        }
    }
    Ok(())
}

/// Check a scalar value against its declared type. Integers are accepted
/// for floating point parameters.
fn scalar_value(name: Id, dtype: DataType, value: &Literal) -> StrataResult<f64> {
    let fits = match (dtype, value) {
        (DataType::Bool, Literal::Bool(_)) => true,
        (DataType::I32 | DataType::I64, Literal::Int(_)) => true,
        (DataType::F32 | DataType::F64, Literal::Int(_) | Literal::Float(_)) => {
            true
        }
        _ => false,
    };
    if !fits {
        return Err(Error::domain_mismatch(format!(
            "scalar `{name}' is declared {dtype} but got {value}"
        )));
    }
    Ok(dtype.cast(value.as_f64()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::{FieldInfo, ScalarInfo};
    use strata_utils::ErrorKind;

    fn iface() -> Interface {
        let field = |name: &str, kind, halo| FieldInfo {
            name: name.into(),
            dtype: DataType::F64,
            dims: Dims::IJK,
            kind,
            halo,
        };
        Interface {
            name: "s".into(),
            fields: vec![
                field("a", FieldKind::Input, [(1, 1), (0, 2), (0, 0)]),
                field("b", FieldKind::Output, [(0, 0); 3]),
                field("tmp", FieldKind::Temporary, [(0, 0); 3]),
            ],
            scalars: vec![ScalarInfo {
                name: "w".into(),
                dtype: DataType::F32,
            }],
            min_k_size: 2,
        }
    }

    fn mismatch(res: StrataResult<BoundArgs<'_>>) -> String {
        match res {
            Err(e) if matches!(e.kind(), ErrorKind::DomainMismatch(_)) => {
                e.message()
            }
            Err(e) => panic!("unexpected error {e:?}"),
            Ok(_) => panic!("expected a domain mismatch"),
        }
    }

    #[test]
    fn binds_by_position_and_name() {
        let iface = iface();
        let a = Storage::zeros([6, 6, 4], DataType::F64);
        let mut b = Storage::zeros([4, 4, 4], DataType::F64);
        let bound = Arguments::new()
            .arg(&a)
            .field_mut("b", &mut b)
            .scalar("w", 2i64)
            .bind(&iface, &Origin::new([0; 3]).with_field("a", [1, 0, 0]), [4, 4, 4])
            .unwrap();
        assert_eq!(bound.fields.len(), 2);
        assert_eq!(bound.fields[0].1, [1, 0, 0]);
        assert_eq!(bound.scalars, vec![2.0]);
    }

    #[test]
    fn halo_is_checked() {
        let iface = iface();
        let a = Storage::zeros([6, 6, 4], DataType::F64);
        let mut b = Storage::zeros([4, 4, 4], DataType::F64);
        let msg = mismatch(
            Arguments::new()
                .field("a", &a)
                .field_mut("b", &mut b)
                .scalar("w", 1.0)
                .bind(&iface, &Origin::default(), [4, 4, 4]),
        );
        assert!(msg.contains("needs 1 points before the origin along I"), "{msg}");

        let mut b = Storage::zeros([4, 4, 4], DataType::F64);
        let msg = mismatch(
            Arguments::new()
                .field("a", &a)
                .field_mut("b", &mut b)
                .scalar("w", 1.0)
                .bind(&iface, &Origin::new([1, 0, 0]), [4, 4, 4]),
        );
        assert!(msg.contains("`b' needs 5 points along I"), "{msg}");

        let mut b = Storage::zeros([4, 4, 4], DataType::F64);
        let origin = Origin::new([1, 0, 0]).with_field("b", [0, usize::MAX, 0]);
        let msg = mismatch(
            Arguments::new()
                .field("a", &a)
                .field_mut("b", &mut b)
                .scalar("w", 1.0)
                .bind(&iface, &origin, [4, 4, 4]),
        );
        assert!(msg.contains("does not fit along J"), "{msg}");
    }

    #[test]
    fn call_errors() {
        let iface = iface();
        let a = Storage::zeros([6, 6, 4], DataType::F64);
        let b = Storage::zeros([4, 4, 4], DataType::F64);
        let origin = Origin::new([1, 0, 0]).with_field("b", [0, 0, 0]);
        let msg = mismatch(Arguments::new().arg(&a).arg(&b).scalar("w", 1.0).bind(
            &iface,
            &origin,
            [4, 4, 4],
        ));
        assert!(msg.contains("passed read-only"), "{msg}");

        let mut b = Storage::zeros([4, 4, 4], DataType::F64);
        let msg = mismatch(
            Arguments::new()
                .arg(&a)
                .field_mut("b", &mut b)
                .scalar("w", 1.0)
                .bind(&iface, &origin, [4, 4, 1]),
        );
        assert!(msg.contains("at least 2 vertical levels"), "{msg}");

        let mut b = Storage::zeros([4, 4, 4], DataType::F64);
        let msg = mismatch(
            Arguments::new()
                .arg(&a)
                .field_mut("b", &mut b)
                .scalar("w", true)
                .bind(&iface, &origin, [4, 4, 4]),
        );
        assert!(msg.contains("declared f32"), "{msg}");

        let mut b = Storage::zeros([4, 4, 4], DataType::F32);
        let msg = mismatch(
            Arguments::new()
                .arg(&a)
                .field_mut("b", &mut b)
                .bind(&iface, &origin, [4, 4, 4]),
        );
        assert!(msg.contains("declared f64 but the buffer holds f32"), "{msg}");

        let msg = mismatch(
            Arguments::new()
                .arg(&a)
                .field("tmp", &a)
                .bind(&iface, &origin, [4, 4, 4]),
        );
        assert!(msg.contains("no field named `tmp'"), "{msg}");
    }
}
