//! Access extents of fields and statements.
use crate::{Offset, StmtRef};
use linked_hash_map::LinkedHashMap;
use std::collections::HashMap;
use std::fmt::{self, Display};
use strata_utils::Id;

/// Per axis `(min, max)` offsets relative to a grid point.
///
/// `min <= 0 <= max` does not have to hold: a field only read at `[1, 0, 0]`
/// has the extent `i:[1,1]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct Extent {
    pub i: (i64, i64),
    pub j: (i64, i64),
    pub k: (i64, i64),
}

/// Padding per side of one axis: `(below, above)`.
pub type Halo = (u64, u64);

impl Extent {
    /// The extent of a point evaluated with no offset.
    pub fn zero() -> Self {
        Self::from(Offset::zero())
    }

    /// Smallest extent containing both `self` and `other`.
    pub fn union(&self, other: &Extent) -> Self {
        fn hull(a: (i64, i64), b: (i64, i64)) -> (i64, i64) {
            (a.0.min(b.0), a.1.max(b.1))
        }
        Self {
            i: hull(self.i, other.i),
            j: hull(self.j, other.j),
            k: hull(self.k, other.k),
        }
    }

    /// The extent moved by `offset`, or `None` if a bound overflows.
    pub fn checked_shift(&self, offset: Offset) -> Option<Self> {
        fn add((lo, hi): (i64, i64), by: i64) -> Option<(i64, i64)> {
            Some((lo.checked_add(by)?, hi.checked_add(by)?))
        }
        Some(Self {
            i: add(self.i, offset.i)?,
            j: add(self.j, offset.j)?,
            k: add(self.k, offset.k)?,
        })
    }

    /// The same extent restricted to the current plane.
    pub fn horizontal(&self) -> Self {
        Self { k: (0, 0), ..*self }
    }

    /// Padding a buffer needs on each side of each axis.
    pub fn halo(&self) -> [Halo; 3] {
        fn pad((lo, hi): (i64, i64)) -> Halo {
            (lo.min(0).unsigned_abs(), hi.max(0).unsigned_abs())
        }
        [pad(self.i), pad(self.j), pad(self.k)]
    }

    /// The range of axis `axis` (0 = i, 1 = j, 2 = k).
    pub fn axis(&self, axis: usize) -> (i64, i64) {
        match axis {
            0 => self.i,
            1 => self.j,
            _ => self.k,
        }
    }
}

impl From<Offset> for Extent {
    fn from(o: Offset) -> Self {
        Self {
            i: (o.i, o.i),
            j: (o.j, o.j),
            k: (o.k, o.k),
        }
    }
}

impl Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "i:[{},{}] j:[{},{}] k:[{},{}]",
            self.i.0, self.i.1, self.j.0, self.j.1, self.k.0, self.k.1
        )
    }
}

/// What the stencil needs from one field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct FieldExtent {
    /// Offsets at which the field is accessed, relative to the domain.
    pub extent: Extent,
    /// Range of vertical offsets at which a sequential block reads values of
    /// this field that the block itself computed on earlier planes. These
    /// reads never touch the halo.
    pub seq_dep: Option<(i64, i64)>,
}

/// Result of extent analysis, attached to [crate::Context::extents].
#[derive(Clone, Debug, Default)]
pub struct ExtentMap {
    fields: LinkedHashMap<Id, FieldExtent>,
    /// Compute extents of live statements.
    stmts: HashMap<StmtRef, Extent>,
    /// Number of statements the analysis looked at.
    num_stmts: usize,
}

impl ExtentMap {
    pub fn new(
        fields: LinkedHashMap<Id, FieldExtent>,
        stmts: HashMap<StmtRef, Extent>,
        num_stmts: usize,
    ) -> Self {
        Self {
            fields,
            stmts,
            num_stmts,
        }
    }

    pub fn get(&self, field: &Id) -> Option<&FieldExtent> {
        self.fields.get(field)
    }

    /// The access extent of `field`, if it is accessed at all.
    pub fn extent(&self, field: &Id) -> Option<Extent> {
        self.fields.get(field).map(|fe| fe.extent)
    }

    /// Padding `field` needs. Fields that are never accessed need none.
    pub fn halo(&self, field: &Id) -> [Halo; 3] {
        self.extent(field)
            .map(|e| e.halo())
            .unwrap_or([(0, 0); 3])
    }

    /// Region offsets over which statement `stmt` is evaluated. `None` if
    /// nothing depends on the statement.
    pub fn compute_extent(&self, stmt: StmtRef) -> Option<Extent> {
        self.stmts.get(&stmt).copied()
    }

    pub fn is_dead(&self, stmt: StmtRef) -> bool {
        !self.stmts.contains_key(&stmt)
    }

    pub fn num_dead(&self) -> usize {
        self.num_stmts - self.stmts.len()
    }

    /// Iterate over accessed fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&Id, &FieldExtent)> {
        self.fields.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_and_shift() {
        let a = Extent::from(Offset::new(1, 0, 0));
        let b = Extent::from(Offset::new(-1, 1, 3))
            .checked_shift(Offset::new(-1, 0, -3))
            .unwrap();
        let u = a.union(&b);
        assert_eq!(u.i, (-2, 1));
        assert_eq!(u.j, (0, 1));
        assert_eq!(u.to_string(), "i:[-2,1] j:[0,1] k:[0,0]");
        assert_eq!(Extent::from(Offset::new(0, 0, 2)).horizontal(), Extent::zero());
    }

    #[test]
    fn shift_overflow() {
        let far = Extent::from(Offset::new(0, 0, i64::MAX));
        assert_eq!(far.checked_shift(Offset::new(0, 0, 1)), None);
        assert!(far.checked_shift(Offset::new(0, 0, -1)).is_some());
        assert_eq!(
            Extent::from(Offset::new(i64::MIN, 0, 0)).halo()[0],
            (1 << 63, 0)
        );
    }

    #[test]
    fn halo_clamps_at_zero() {
        let e = Extent::from(Offset::new(1, -1, 0));
        assert_eq!(e.halo(), [(0, 1), (1, 0), (0, 0)]);
        let wide = e.union(&Extent::from(Offset::new(-2, 2, 0)));
        assert_eq!(wide.halo(), [(2, 1), (1, 2), (0, 0)]);
    }
}
