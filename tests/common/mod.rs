#![allow(dead_code)]
use rand::prelude::*;
use std::path::PathBuf;
use strata::{DataType, Externals, Registry, Storage};

/// Source of `tests/stencils/<name>.stencil`.
pub fn fixture(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/stencils")
        .join(format!("{name}.stencil"));
    std::fs::read_to_string(&path)
        .unwrap_or_else(|err| panic!("cannot read {}: {err}", path.display()))
}

/// A registry holding the fixtures `names`, each with no default externals.
pub fn registry(names: &[&str]) -> Registry {
    let registry = Registry::new();
    for name in names {
        registry
            .register(name, &fixture(name), Externals::new())
            .unwrap();
    }
    registry
}

/// Deterministic, irregular data in `[-1, 1)`.
pub fn noise(shape: [usize; 3], seed: u64) -> Storage {
    let mut rng = StdRng::seed_from_u64(seed);
    Storage::from_fn(shape, DataType::F64, |_, _, _| rng.random_range(-1.0..1.0))
}

pub fn assert_close(actual: &Storage, expected: &Storage, tol: f64) {
    assert_eq!(actual.shape(), expected.shape());
    for (at, (a, e)) in actual.as_slice().iter().zip(expected.as_slice()).enumerate() {
        assert!((a - e).abs() <= tol, "element {at}: {a} != {e}");
    }
}
