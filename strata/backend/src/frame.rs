//! The buffers a kernel reads and writes during one call.
use crate::{Interface, Storage, args::BoundArgs, args::FieldArg};
use itertools::iproduct;
use std::ops::Range;
use strata_ir::{Dims, Extent, Id, Offset};
use strata_utils::{Error, StrataResult};

/// A box of grid points relative to the origin of the domain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Region {
    pub i: Range<i64>,
    pub j: Range<i64>,
    pub k: Range<i64>,
}

impl Region {
    /// The domain grown by the horizontal part of `extent`, restricted to
    /// the planes `k`.
    pub fn grown(extent: &Extent, domain: [usize; 3], k: Range<i64>) -> Self {
        Self {
            i: extent.i.0..domain[0] as i64 + extent.i.1,
            j: extent.j.0..domain[1] as i64 + extent.j.1,
            k,
        }
    }

    /// The same box cut down to the single plane `k`.
    pub fn plane(&self, k: i64) -> Self {
        Self {
            i: self.i.clone(),
            j: self.j.clone(),
            k: k..k + 1,
        }
    }

    fn span(r: &Range<i64>) -> usize {
        (r.end - r.start).max(0) as usize
    }

    pub fn len(&self) -> usize {
        Self::span(&self.i) * Self::span(&self.j) * Self::span(&self.k)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Points of the region with the last axis running fastest.
    pub fn points(&self) -> impl Iterator<Item = [i64; 3]> + use<> {
        iproduct!(self.i.clone(), self.j.clone(), self.k.clone())
            .map(|(i, j, k)| [i, j, k])
    }

    /// `(i, j)` columns of the region, in the same order as [Region::points].
    fn columns(&self) -> impl Iterator<Item = (i64, i64)> + use<> {
        iproduct!(self.i.clone(), self.j.clone())
    }
}

enum Buffer<'a> {
    Shared(&'a Storage),
    Unique(&'a mut Storage),
    /// Temporaries.
    Owned(Storage),
}

impl Buffer<'_> {
    fn storage(&self) -> &Storage {
        match self {
            Buffer::Shared(s) => s,
            Buffer::Unique(s) => s,
            Buffer::Owned(s) => s,
        }
    }

    fn storage_mut(&mut self) -> Option<&mut Storage> {
        match self {
            Buffer::Shared(_) => None,
            Buffer::Unique(s) => Some(s),
            Buffer::Owned(s) => Some(s),
        }
    }
}

/// A field buffer together with the position of the domain origin in it.
struct View<'a> {
    name: Id,
    buf: Buffer<'a>,
    origin: [i64; 3],
    /// Every access goes to the single element of the buffer.
    zero_dim: bool,
    /// For temporaries, which buffer planes a statement has computed.
    written: Option<Vec<bool>>,
}

impl View<'_> {
    fn index(&self, point: [i64; 3]) -> [i64; 3] {
        if self.zero_dim {
            [0; 3]
        } else {
            [
                self.origin[0] + point[0],
                self.origin[1] + point[1],
                self.origin[2] + point[2],
            ]
        }
    }

    /// Fails if one of the `count` planes from domain plane `k` on belongs
    /// to a temporary and has not been computed yet. Planes outside the
    /// buffer are left to the bounds checks.
    fn check_computed(&self, k: i64, count: usize) -> StrataResult<()> {
        let Some(written) = &self.written else {
            return Ok(());
        };
        for plane in (k..).take(count) {
            let at = usize::try_from(self.origin[2] + plane).ok();
            if at.and_then(|at| written.get(at)) == Some(&false) {
                return Err(Error::ordering(format!(
                    "`{}' is read at plane {plane} before any statement computes it",
                    self.name
                )));
            }
        }
        Ok(())
    }

    fn out_of_bounds(&self, point: [i64; 3]) -> Error {
        Error::domain_mismatch(format!(
            "access to `{}' at {:?} lies outside its buffer of shape {:?}",
            self.name,
            point,
            self.buf.storage().shape()
        ))
    }
}

/// Field views indexed by their number in the [Interface], and the values of
/// the scalar parameters.
pub struct Frame<'a> {
    views: Vec<View<'a>>,
    scalars: Vec<f64>,
}

impl<'a> Frame<'a> {
    /// Lay out the bound arguments and allocate zeroed temporaries large
    /// enough for their halo.
    pub(crate) fn new(
        iface: &Interface,
        args: BoundArgs<'a>,
        domain: [usize; 3],
    ) -> Self {
        let mut api = args.fields.into_iter();
        let views = iface
            .fields
            .iter()
            .filter_map(|info| {
                let zero_dim = info.dims == Dims::Zero;
                if info.is_api() {
                    let (arg, origin) = api.next()?;
                    let buf = match arg {
                        FieldArg::Ref(s) => Buffer::Shared(s),
                        FieldArg::Mut(s) => Buffer::Unique(s),
                    };
                    Some(View {
                        name: info.name,
                        buf,
                        origin: origin.map(|x| x as i64),
                        zero_dim,
                        written: None,
                    })
                } else {
                    let shape = if zero_dim {
                        [1, 1, 1]
                    } else {
                        [0, 1, 2].map(|ax| {
                            let (lo, hi) = info.halo[ax];
                            domain[ax] + (lo + hi) as usize
                        })
                    };
                    Some(View {
                        name: info.name,
                        buf: Buffer::Owned(Storage::zeros(shape, info.dtype)),
                        origin: info.halo.map(|(lo, _)| lo as i64),
                        zero_dim,
                        written: (!zero_dim).then(|| vec![false; shape[2]]),
                    })
                }
            })
            .collect();
        Self {
            views,
            scalars: args.scalars,
        }
    }

    pub fn scalar(&self, slot: usize) -> f64 {
        self.scalars[slot]
    }

    /// Value of field `slot` at `point`, relative to the domain origin.
    pub fn read(&self, slot: usize, point: [i64; 3]) -> StrataResult<f64> {
        let view = &self.views[slot];
        let storage = view.buf.storage();
        let at = storage
            .linear(view.index(point))
            .ok_or_else(|| view.out_of_bounds(point))?;
        view.check_computed(point[2], 1)?;
        Ok(storage.data()[at])
    }

    /// Append the values of field `slot` at every point of `region` moved by
    /// `offset` to `out`, one contiguous vertical run at a time.
    pub fn gather(
        &self,
        slot: usize,
        offset: Offset,
        region: &Region,
        out: &mut Vec<f64>,
    ) -> StrataResult<()> {
        let view = &self.views[slot];
        let storage = view.buf.storage();
        if view.zero_dim {
            let value = storage.data()[0];
            out.extend(std::iter::repeat_n(value, region.len()));
            return Ok(());
        }
        let run = Region::span(&region.k);
        if run == 0 {
            return Ok(());
        }
        view.check_computed(region.k.start + offset.k, run)?;
        for (i, j) in region.columns() {
            let first = [i + offset.i, j + offset.j, region.k.start + offset.k];
            let last = [first[0], first[1], first[2] + run as i64 - 1];
            let (Some(lo), Some(_)) = (
                storage.linear(view.index(first)),
                storage.linear(view.index(last)),
            ) else {
                return Err(view.out_of_bounds(first));
            };
            out.extend_from_slice(&storage.data()[lo..lo + run]);
        }
        Ok(())
    }

    /// Store `values`, computed for the points of `region` in order, into
    /// field `slot`.
    pub fn commit(
        &mut self,
        slot: usize,
        region: &Region,
        values: &[f64],
    ) -> StrataResult<()> {
        let view = &mut self.views[slot];
        let points = region.points().map(|p| view.index(p)).collect::<Vec<_>>();
        let name = view.name;
        let Some(storage) = view.buf.storage_mut() else {
            return Err(Error::backend(format!(
                "field `{name}' is written but was bound read-only"
            )));
        };
        let dtype = storage.dtype();
        for (idx, value) in points.into_iter().zip(values) {
            let Some(at) = storage.linear(idx) else {
                return Err(Error::domain_mismatch(format!(
                    "write to `{name}' at {idx:?} lies outside its buffer of shape {:?}",
                    storage.shape()
                )));
            };
            storage.data_mut()[at] = dtype.cast(*value);
        }
        if let Some(written) = &mut view.written {
            for plane in region.k.clone() {
                if let Ok(at) = usize::try_from(view.origin[2] + plane) {
                    if let Some(done) = written.get_mut(at) {
                        *done = true;
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::FieldInfo;
    use strata_ir::{DataType, FieldKind};
    use strata_utils::ErrorKind;

    fn iface() -> Interface {
        Interface {
            name: "s".into(),
            fields: vec![
                FieldInfo {
                    name: "a".into(),
                    dtype: DataType::F64,
                    dims: Dims::IJK,
                    kind: FieldKind::Input,
                    halo: [(1, 1), (0, 0), (0, 0)],
                },
                FieldInfo {
                    name: "t".into(),
                    dtype: DataType::I32,
                    dims: Dims::IJK,
                    kind: FieldKind::Temporary,
                    halo: [(1, 0), (0, 0), (0, 0)],
                },
            ],
            scalars: vec![],
            min_k_size: 0,
        }
    }

    #[test]
    fn regions() {
        let ext = Extent::zero().union(&Extent::from(Offset::new(-1, 2, 0)));
        let r = Region::grown(&ext, [2, 2, 3], 1..3);
        assert_eq!(r.i, -1..2);
        assert_eq!(r.j, 0..4);
        assert_eq!(r.len(), 3 * 4 * 2);
        assert_eq!(r.plane(1).len(), 12);
        assert_eq!(r.points().next(), Some([-1, 0, 1]));
        assert!(Region::grown(&Extent::zero(), [2, 2, 3], 2..1).is_empty());
    }

    #[test]
    fn reads_gathers_and_commits() {
        let iface = iface();
        let a = Storage::from_fn([4, 1, 3], DataType::F64, |i, _, k| {
            (10 * i + k) as f64
        });
        let bound = BoundArgs {
            fields: vec![(FieldArg::Ref(&a), [1, 0, 0])],
            scalars: vec![],
        };
        let mut frame = Frame::new(&iface, bound, [2, 1, 3]);
        assert_eq!(frame.read(0, [-1, 0, 2]).unwrap(), 2.0);
        assert!(frame.read(0, [3, 0, 0]).is_err());

        let region = Region::grown(&Extent::zero(), [2, 1, 3], 0..3);
        let mut out = Vec::new();
        frame.gather(0, Offset::new(1, 0, 0), &region, &mut out).unwrap();
        assert_eq!(out, vec![20.0, 21.0, 22.0, 30.0, 31.0, 32.0]);
        out.clear();
        assert!(frame.gather(0, Offset::new(0, 0, 1), &region, &mut out).is_err());

        // Temporaries cast stores to their element type.
        let plane = region.plane(1);
        frame.commit(1, &plane, &[1.5, 2.5]).unwrap();
        assert_eq!(frame.read(1, [0, 0, 1]).unwrap(), 1.0);
        assert_eq!(frame.read(1, [1, 0, 1]).unwrap(), 2.0);
        assert!(frame.commit(0, &plane, &[0.0, 0.0]).is_err());
    }

    #[test]
    fn temporaries_are_read_only_where_computed() {
        let iface = iface();
        let a = Storage::zeros([4, 1, 3], DataType::F64);
        let bound = BoundArgs {
            fields: vec![(FieldArg::Ref(&a), [1, 0, 0])],
            scalars: vec![],
        };
        let mut frame = Frame::new(&iface, bound, [2, 1, 3]);
        let err = frame.read(1, [0, 0, 0]).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Ordering(_)), "{err:?}");
        assert!(err.message().contains("`t' is read at plane 0"), "{}", err.message());

        let region = Region::grown(&Extent::zero(), [2, 1, 3], 0..3);
        frame.commit(1, &region.plane(0), &[1.0, 2.0]).unwrap();
        frame.commit(1, &region.plane(1), &[3.0, 4.0]).unwrap();
        assert_eq!(frame.read(1, [1, 0, 0]).unwrap(), 2.0);

        let mut out = Vec::new();
        let lower = Region::grown(&Extent::zero(), [2, 1, 3], 0..1);
        frame.gather(1, Offset::new(0, 0, 1), &lower, &mut out).unwrap();
        assert_eq!(out, vec![3.0, 4.0]);
        out.clear();
        let err = frame
            .gather(1, Offset::new(0, 0, 1), &region.plane(1), &mut out)
            .unwrap_err();
        assert!(err.message().contains("plane 2"), "{}", err.message());
        // Fields passed by the caller are always readable.
        assert_eq!(frame.read(0, [0, 0, 2]).unwrap(), 0.0);
    }
}
