mod common;

use common::{fixture, registry};
use std::sync::Arc;
use strata::{
    BackendKind, CacheStats, DataType, ErrorKind, Externals, Registry,
    StrataResult, TypeSignature,
};

fn specialize_src(src: &str) -> StrataResult<()> {
    let registry = Registry::new();
    registry.register("s", src, Externals::new())?;
    registry.specialize("s", &Externals::new(), BackendKind::Debug, &TypeSignature::new())?;
    Ok(())
}

#[test]
fn repeated_specializations_hit_the_cache() {
    let registry = registry(&["horizontal_diffusion"]);
    let sig = TypeSignature::new();
    let first = registry
        .specialize("horizontal_diffusion", &Externals::new(), BackendKind::Vector, &sig)
        .unwrap();
    let second = registry
        .specialize("horizontal_diffusion", &Externals::new(), BackendKind::Vector, &sig)
        .unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    let f32_sig = TypeSignature::new().with("coeff", DataType::F32);
    let narrow = registry
        .specialize("horizontal_diffusion", &Externals::new(), BackendKind::Vector, &f32_sig)
        .unwrap();
    assert_ne!(narrow.id(), first.id());
    let debug = registry
        .specialize("horizontal_diffusion", &Externals::new(), BackendKind::Debug, &sig)
        .unwrap();
    assert_ne!(debug.id(), first.id());

    assert_eq!(
        registry.stats(),
        CacheStats {
            hits: 1,
            misses: 3,
            compilations: 3,
            entries: 3,
        }
    );
    assert_eq!(registry.invalidate("horizontal_diffusion").unwrap(), 3);
    assert_eq!(registry.stats().entries, 0);
    assert!(registry.definition("horizontal_diffusion").is_some());
}

#[test]
fn failed_compilations_are_not_cached() {
    let registry = Registry::new();
    registry
        .register(
            "vertical_advection_dycore",
            &fixture("vertical_advection_dycore"),
            Externals::new(),
        )
        .unwrap();
    let sig = TypeSignature::new();
    for _ in 0..2 {
        let err = registry
            .specialize("vertical_advection_dycore", &Externals::new(), BackendKind::Debug, &sig)
            .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::ExternalResolution(_)), "{err:?}");
    }
    let stats = registry.stats();
    assert_eq!((stats.misses, stats.compilations, stats.entries), (2, 0, 0));

    let externals = Externals::new().with("BET_M", 0.5).with("BET_P", 0.5);
    registry
        .specialize("vertical_advection_dycore", &externals, BackendKind::Debug, &sig)
        .unwrap();
    assert_eq!(registry.stats().compilations, 1);
}

#[test]
fn concurrent_callers_compile_once() {
    let registry = registry(&["horizontal_diffusion", "tridiagonal_solver"]);
    let results = std::thread::scope(|s| {
        let handles = (0..8)
            .map(|n| {
                let registry = &registry;
                s.spawn(move || {
                    let name = if n % 2 == 0 {
                        "horizontal_diffusion"
                    } else {
                        "tridiagonal_solver"
                    };
                    registry.specialize(
                        name,
                        &Externals::new(),
                        BackendKind::Vector,
                        &TypeSignature::new(),
                    )
                })
            })
            .collect::<Vec<_>>();
        handles
            .into_iter()
            .map(|h| h.join().unwrap().unwrap())
            .collect::<Vec<_>>()
    });
    for pair in results.chunks(2).collect::<Vec<_>>().windows(2) {
        assert!(Arc::ptr_eq(&pair[0][0], &pair[1][0]));
        assert!(Arc::ptr_eq(&pair[0][1], &pair[1][1]));
    }
    let stats = registry.stats();
    assert_eq!((stats.compilations, stats.misses, stats.hits), (2, 2, 6));
}

#[test]
fn errors_carry_their_kind() {
    let grammar = specialize_src("stencil s(a: Field[f64]) { with computation(PARALLEL) }")
        .unwrap_err();
    assert!(matches!(grammar.kind(), ErrorKind::Grammar(_)), "{grammar:?}");

    let interval = specialize_src(
        "stencil s(a: Field[f64], b: Field[f64]) {
            with computation(FORWARD) {
                interval(0, 3) { b = a }
                interval(2, None) { b = a + 1 }
            }
        }",
    )
    .unwrap_err();
    assert!(matches!(interval.kind(), ErrorKind::Interval(_)), "{interval:?}");

    let far = specialize_src(
        "stencil s(a: Field[f64], b: Field[f64]) {
            with computation(PARALLEL), interval(1, -9223372036854775807) { b = a }
        }",
    )
    .unwrap_err();
    assert!(matches!(far.kind(), ErrorKind::Interval(_)), "{far:?}");

    let ordering = specialize_src(
        "stencil s(a: Field[f64], b: Field[f64]) {
            with computation(PARALLEL), interval(...) { b = b[0, 0, 1] + a }
        }",
    )
    .unwrap_err();
    assert!(matches!(ordering.kind(), ErrorKind::Ordering(_)), "{ordering:?}");

    let unknown = Registry::new()
        .specialize("nope", &Externals::new(), BackendKind::Debug, &TypeSignature::new())
        .unwrap_err();
    assert!(unknown.message().contains("nope"));
}
