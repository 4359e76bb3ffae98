//! Registry of stencil definitions and the cache of their compiled forms.
use crate::pipeline;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt::{self, Display};
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::Instant;
use strata_backend::{Arguments, BackendKind, Interface, Kernel, Origin};
use strata_frontend::{Printer, StrataParser, ast};
use strata_ir::{self as ir, Externals, TypeSignature};
use strata_utils::{Error, Id, StrataResult};

/// Content hash identifying one specialization of a stencil.
///
/// Computed from the canonical text of the definition, the values of the
/// externals it declares, the backend and the type signature. Equal inputs
/// always give equal IDs.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StencilId([u8; 32]);

impl StencilId {
    pub fn compute(
        fingerprint: &str,
        externals: &Externals,
        backend: BackendKind,
        signature: &TypeSignature,
    ) -> Self {
        let mut hasher = Sha256::new();
        for part in [
            fingerprint.to_string(),
            externals.to_string(),
            backend.to_string(),
            signature.to_string(),
        ] {
            hasher.update((part.len() as u64).to_le_bytes());
            hasher.update(part.as_bytes());
        }
        Self(hasher.finalize().into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl Display for StencilId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.iter().try_for_each(|b| write!(f, "{b:02x}"))
    }
}

impl fmt::Debug for StencilId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StencilId({self})")
    }
}

/// A registered stencil definition.
#[derive(Debug)]
pub struct Definition {
    def: ast::StencilDef,
    /// Canonical text of the definition.
    fingerprint: String,
    defaults: Externals,
}

impl Definition {
    pub fn name(&self) -> Id {
        self.def.name
    }

    pub fn ast(&self) -> &ast::StencilDef {
        &self.def
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Externals used when a specialization does not override them.
    pub fn defaults(&self) -> &Externals {
        &self.defaults
    }

    pub fn declares(&self, external: &Id) -> bool {
        self.def.externals.iter().any(|(name, _)| name == external)
    }

    /// The defaults merged with `overrides`, restricted to the externals the
    /// definition declares.
    fn resolve(&self, overrides: &Externals) -> Externals {
        for (name, _) in overrides.iter() {
            if !self.declares(name) {
                log::warn!(
                    "`{}' does not declare external `{name}', ignoring it",
                    self.name()
                );
            }
        }
        self.defaults
            .merged(overrides)
            .iter()
            .filter(|(name, _)| self.declares(name))
            .map(|(name, value)| (*name, *value))
            .collect()
    }
}

/// A stencil compiled for one set of externals, backend and signature.
pub struct CompiledStencil {
    id: StencilId,
    backend: BackendKind,
    context: ir::Context,
    kernel: Box<dyn Kernel>,
}

impl CompiledStencil {
    pub fn id(&self) -> StencilId {
        self.id
    }

    pub fn name(&self) -> Id {
        self.kernel.name()
    }

    pub fn backend(&self) -> BackendKind {
        self.backend
    }

    /// The analyzed IR the kernel was generated from.
    pub fn context(&self) -> &ir::Context {
        &self.context
    }

    pub fn extents(&self) -> StrataResult<&ir::ExtentMap> {
        self.context.extents()
    }

    pub fn interface(&self) -> &Interface {
        self.kernel.interface()
    }

    pub fn kernel(&self) -> &dyn Kernel {
        self.kernel.as_ref()
    }

    /// Run the stencil. See [Kernel::run].
    pub fn run(
        &self,
        args: Arguments<'_>,
        origin: &Origin,
        domain: [usize; 3],
    ) -> StrataResult<()> {
        self.kernel.run(args, origin, domain)
    }

    pub fn emit(&self, out: &mut dyn io::Write) -> io::Result<()> {
        self.kernel.emit(out)
    }
}

impl fmt::Debug for CompiledStencil {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledStencil")
            .field("id", &self.id)
            .field("name", &self.name())
            .field("backend", &self.backend)
            .finish_non_exhaustive()
    }
}

/// Counters of a [Registry].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Specializations answered from the cache.
    pub hits: u64,
    /// Specializations that had to compile.
    pub misses: u64,
    /// Compilations that succeeded.
    pub compilations: u64,
    /// Artifacts currently cached.
    pub entries: usize,
}

/// Single-assignment cell for the artifact of one ID. Its lock is held while
/// compiling so that concurrent callers wait for the first compilation.
type Slot = Arc<Mutex<Option<Arc<CompiledStencil>>>>;

struct Entry {
    name: Id,
    slot: Slot,
}

/// Stencil definitions by name and the compiled specializations of them.
///
/// ```
/// use strata::{BackendKind, Externals, Registry, TypeSignature};
///
/// let registry = Registry::new();
/// registry.register(
///     "copy",
///     "stencil copy(a: Field[f64], b: Field[f64]) {
///          with computation(PARALLEL), interval(...) { b = a }
///      }",
///     Externals::new(),
/// )?;
/// let first = registry.specialize("copy", &Externals::new(), BackendKind::Debug, &TypeSignature::new())?;
/// let again = registry.specialize("copy", &Externals::new(), BackendKind::Debug, &TypeSignature::new())?;
/// assert!(std::sync::Arc::ptr_eq(&first, &again));
/// assert_eq!(registry.stats().compilations, 1);
/// # Ok::<(), strata::Error>(())
/// ```
#[derive(Default)]
pub struct Registry {
    definitions: RwLock<HashMap<Id, Arc<Definition>>>,
    cache: Mutex<HashMap<StencilId, Entry>>,
    hits: AtomicU64,
    misses: AtomicU64,
    compilations: AtomicU64,
}

fn poisoned(what: &str) -> Error {
    Error::cache_consistency(format!("{what} lock was poisoned"))
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn cache(&self) -> StrataResult<MutexGuard<'_, HashMap<StencilId, Entry>>> {
        self.cache.lock().map_err(|_| poisoned("cache table"))
    }

    /// Parse `source` and register one of its stencils under `name`.
    ///
    /// The stencil called `name` is taken if there is one. Otherwise the
    /// source must hold a single stencil, which is renamed to `name`.
    pub fn register(
        &self,
        name: &str,
        source: &str,
        defaults: Externals,
    ) -> StrataResult<Arc<Definition>> {
        let ns = StrataParser::parse_str(name, source)?;
        let mut def = match (ns.find(name), ns.stencils.as_slice()) {
            (Some(def), _) | (None, [def]) => def.clone(),
            (None, _) => return Err(Error::undefined(Id::new(name), "stencil")),
        };
        if def.name != name {
            log::debug!("registering stencil `{}' as `{name}'", def.name);
            def.name = Id::new(name);
        }
        self.insert(def, defaults)
    }

    /// Register an already parsed definition.
    pub fn insert(
        &self,
        def: ast::StencilDef,
        defaults: Externals,
    ) -> StrataResult<Arc<Definition>> {
        let mut defs = self
            .definitions
            .write()
            .map_err(|_| poisoned("definition table"))?;
        if defs.contains_key(&def.name) {
            return Err(Error::already_bound(def.name, "a registered stencil")
                .with_pos(&def));
        }
        let definition = Arc::new(Definition {
            fingerprint: Printer::stencil_to_string(&def),
            def,
            defaults,
        });
        for (name, _) in definition.defaults.iter() {
            if !definition.declares(name) {
                log::warn!(
                    "`{}' does not declare external `{name}', its default is unused",
                    definition.name()
                );
            }
        }
        log::info!("registered stencil `{}'", definition.name());
        defs.insert(definition.name(), Arc::clone(&definition));
        Ok(definition)
    }

    pub fn definition(&self, name: &str) -> Option<Arc<Definition>> {
        self.definitions
            .read()
            .ok()
            .and_then(|defs| defs.get(&Id::new(name)).cloned())
    }

    /// Names of the registered stencils, sorted.
    pub fn names(&self) -> Vec<Id> {
        let mut names = self
            .definitions
            .read()
            .map(|defs| defs.keys().copied().collect::<Vec<_>>())
            .unwrap_or_default();
        names.sort();
        names
    }

    /// The ID [Registry::specialize] would use for these arguments.
    pub fn stencil_id(
        &self,
        name: &str,
        overrides: &Externals,
        backend: BackendKind,
        signature: &TypeSignature,
    ) -> StrataResult<StencilId> {
        let def = self.lookup(name)?;
        Ok(StencilId::compute(
            &def.fingerprint,
            &def.resolve(overrides),
            backend,
            signature,
        ))
    }

    fn lookup(&self, name: &str) -> StrataResult<Arc<Definition>> {
        self.definition(name)
            .ok_or_else(|| Error::undefined(Id::new(name), "stencil"))
    }

    /// Compile `name` with `overrides` replacing its default externals, or
    /// return the artifact compiled earlier for the same inputs.
    ///
    /// Every ID is compiled at most once, even when several threads ask for
    /// it at the same time. Failed compilations are not cached.
    pub fn specialize(
        &self,
        name: &str,
        overrides: &Externals,
        backend: BackendKind,
        signature: &TypeSignature,
    ) -> StrataResult<Arc<CompiledStencil>> {
        let def = self.lookup(name)?;
        let externals = def.resolve(overrides);
        let id =
            StencilId::compute(&def.fingerprint, &externals, backend, signature);

        let slot = Arc::clone(
            &self
                .cache()?
                .entry(id)
                .or_insert_with(|| Entry {
                    name: def.name(),
                    slot: Slot::default(),
                })
                .slot,
        );
        // Only this slot stays locked while compiling.
        let mut artifact = slot
            .lock()
            .map_err(|_| poisoned(&format!("slot of `{name}'")))?;
        if let Some(compiled) = artifact.as_ref() {
            if compiled.id != id {
                return Err(Error::cache_consistency(format!(
                    "artifact {} is stored under {id}",
                    compiled.id
                )));
            }
            self.hits.fetch_add(1, Ordering::Relaxed);
            log::debug!("cache hit for `{name}' ({id})");
            return Ok(Arc::clone(compiled));
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let start = Instant::now();
        let built = pipeline::analyze(def.ast(), &externals, signature)
            .and_then(|context| {
                let kernel = pipeline::codegen(&context, backend)?;
                Ok((context, kernel))
            });
        let (context, kernel) = match built {
            Ok(built) => built,
            Err(err) => {
                drop(artifact);
                self.forget(id, &slot)?;
                return Err(err);
            }
        };
        let compiled = Arc::new(CompiledStencil {
            id,
            backend,
            context,
            kernel,
        });
        self.compilations.fetch_add(1, Ordering::Relaxed);
        log::info!(
            "compiled `{name}' for {backend} in {}ms ({id})",
            start.elapsed().as_millis()
        );
        *artifact = Some(Arc::clone(&compiled));
        Ok(compiled)
    }

    /// Remove the entry of `id` after a failed compilation, unless another
    /// caller has replaced it or filled its slot in the meantime.
    fn forget(&self, id: StencilId, slot: &Slot) -> StrataResult<()> {
        let mut cache = self.cache()?;
        let unused = cache.get(&id).is_some_and(|entry| {
            Arc::ptr_eq(&entry.slot, slot)
                && entry.slot.try_lock().is_ok_and(|s| s.is_none())
        });
        if unused {
            cache.remove(&id);
        }
        Ok(())
    }

    /// Drop every cached specialization of `name`. Returns how many were
    /// dropped. The definition stays registered.
    pub fn invalidate(&self, name: &str) -> StrataResult<usize> {
        let name = Id::new(name);
        let mut cache = self.cache()?;
        let before = cache.len();
        cache.retain(|_, entry| entry.name != name);
        let dropped = before - cache.len();
        log::debug!("invalidated {dropped} artifacts of `{name}'");
        Ok(dropped)
    }

    /// Drop every cached specialization.
    pub fn clear(&self) -> StrataResult<()> {
        self.cache()?.clear();
        Ok(())
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self
            .cache
            .lock()
            .map(|cache| {
                cache
                    .values()
                    .filter(|e| e.slot.try_lock().is_ok_and(|s| s.is_some()))
                    .count()
            })
            .unwrap_or_default();
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            compilations: self.compilations.load(Ordering::Relaxed),
            entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_utils::ErrorKind;

    const SRC: &str = "stencil scale(a: Field[f64], b: Field[f64]) {
        externals FACTOR
        with computation(PARALLEL), interval(...) { b = FACTOR * a }
    }";

    fn specialize(r: &Registry, factor: f64) -> StrataResult<Arc<CompiledStencil>> {
        r.specialize(
            "scale",
            &Externals::new().with("FACTOR", factor),
            BackendKind::Debug,
            &TypeSignature::new(),
        )
    }

    #[test]
    fn ids_depend_on_every_input() {
        let ext = Externals::new().with("X", 1i64);
        let sig = TypeSignature::new();
        let base = StencilId::compute("s", &ext, BackendKind::Debug, &sig);
        assert_eq!(base, StencilId::compute("s", &ext, BackendKind::Debug, &sig));
        assert_ne!(base, StencilId::compute("t", &ext, BackendKind::Debug, &sig));
        assert_ne!(base, StencilId::compute("s", &ext, BackendKind::Vector, &sig));
        assert_ne!(
            base,
            StencilId::compute("s", &Externals::new(), BackendKind::Debug, &sig)
        );
        let f32_sig = TypeSignature::new().with("a", strata_ir::DataType::F32);
        assert_ne!(base, StencilId::compute("s", &ext, BackendKind::Debug, &f32_sig));
        assert_eq!(base.to_string().len(), 64);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let r = Registry::new();
        r.register("scale", SRC, Externals::new()).unwrap();
        let err = r.register("scale", SRC, Externals::new()).unwrap_err();
        assert!(err.message().contains("already bound"), "{err:?}");
    }

    #[test]
    fn single_stencils_are_registered_under_the_given_name() {
        let r = Registry::new();
        let def = r.register("twice", SRC, Externals::new()).unwrap();
        assert_eq!(def.name(), "twice");
        assert!(r.definition("scale").is_none());
        let compiled = r
            .specialize(
                "twice",
                &Externals::new().with("FACTOR", 2.0),
                BackendKind::Debug,
                &TypeSignature::new(),
            )
            .unwrap();
        assert_eq!(compiled.name(), "twice");
        assert_eq!(r.invalidate("twice").unwrap(), 1);

        // With several stencils in the source, `name` has to pick one.
        let two = format!("{SRC}\nstencil copy(a: Field[f64], b: Field[f64]) {{
            with computation(PARALLEL), interval(...) {{ b = a }}
        }}");
        assert_eq!(r.register("copy", &two, Externals::new()).unwrap().name(), "copy");
        let err = r.register("other", &two, Externals::new()).unwrap_err();
        assert!(err.message().contains("Undefined stencil name: other"));
    }

    #[test]
    fn failed_compilations_leave_no_entry() {
        let r = Registry::new();
        r.register("scale", SRC, Externals::new()).unwrap();
        for backend in BackendKind::all() {
            r.specialize("scale", &Externals::new(), backend, &TypeSignature::new())
                .unwrap_err();
        }
        assert!(r.cache.lock().unwrap().is_empty());
        specialize(&r, 1.0).unwrap();
        assert_eq!(r.cache.lock().unwrap().len(), 1);
    }

    #[test]
    fn hits_and_invalidation() {
        let r = Registry::new();
        r.register("scale", SRC, Externals::new().with("FACTOR", 2.0))
            .unwrap();
        let a = specialize(&r, 2.0).unwrap();
        let b = specialize(&r, 2.0).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        // Overriding with the default value is the same specialization.
        let c = r
            .specialize("scale", &Externals::new(), BackendKind::Debug, &TypeSignature::new())
            .unwrap();
        assert!(Arc::ptr_eq(&a, &c));
        let d = specialize(&r, 3.0).unwrap();
        assert_ne!(a.id(), d.id());
        assert_eq!(
            r.stats(),
            CacheStats {
                hits: 2,
                misses: 2,
                compilations: 2,
                entries: 2
            }
        );
        assert_eq!(r.invalidate("scale").unwrap(), 2);
        let e = specialize(&r, 2.0).unwrap();
        assert!(!Arc::ptr_eq(&a, &e));
        assert_eq!(a.id(), e.id());
        r.clear().unwrap();
        assert_eq!(r.stats().entries, 0);
    }

    #[test]
    fn missing_externals_are_not_cached() {
        let r = Registry::new();
        r.register("scale", SRC, Externals::new()).unwrap();
        let err = r
            .specialize("scale", &Externals::new(), BackendKind::Debug, &TypeSignature::new())
            .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::ExternalResolution(_)));
        assert!(specialize(&r, 1.0).is_ok());
        let stats = r.stats();
        assert_eq!((stats.misses, stats.compilations, stats.entries), (2, 1, 1));
    }

    #[test]
    fn undeclared_overrides_do_not_change_the_id() {
        let r = Registry::new();
        r.register("scale", SRC, Externals::new()).unwrap();
        let ext = Externals::new().with("FACTOR", 1.0);
        let sig = TypeSignature::new();
        let id = r.stencil_id("scale", &ext, BackendKind::Debug, &sig).unwrap();
        let noisy = ext.merged(&Externals::new().with("UNUSED", true));
        assert_eq!(
            r.stencil_id("scale", &noisy, BackendKind::Debug, &sig).unwrap(),
            id
        );
    }
}
