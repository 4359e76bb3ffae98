//! Driver for the Strata compiler.
use crate::cmdline::{EmitKind, Opts};
use std::io::Write;
use strata::{CompiledStencil, Registry};
use strata_frontend::StrataParser;
use strata_opt::pass_manager::PassManager;
use strata_utils::{Error, StrataResult};

/// Run the compiler from the command line.
pub fn run_compiler() -> StrataResult<()> {
    // parse the command line arguments into Opts struct
    let opts: Opts = argh::from_env();

    // enable tracing
    env_logger::Builder::new()
        .format_timestamp(None)
        .filter_level(opts.log_level)
        .target(env_logger::Target::Stderr)
        .init();

    // list all the avaliable pass options when flag --list-passes is enabled
    if opts.list_passes {
        let pm = PassManager::default_passes()?;
        println!("{}", pm.complete_help());
        return Ok(());
    }

    let Some(file) = &opts.file else {
        return Err(Error::misc("No input file given. Run with --help for usage."));
    };
    let ns = StrataParser::parse_file(file)?;
    let def = match &opts.stencil {
        Some(name) => ns.find(name).ok_or_else(|| {
            Error::undefined(name.into(), "stencil")
        })?,
        None => ns.stencils.first().ok_or_else(|| {
            Error::misc(format!("{} defines no stencils", file.display()))
        })?,
    };

    let registry = Registry::new();
    let name = def.name;
    registry.insert(def.clone(), opts.externals())?;
    let compiled = registry.specialize(
        name.as_str(),
        &strata::Externals::new(),
        opts.backend,
        &opts.signature(),
    )?;

    let mut out = opts.output.get_write()?;
    emit(&compiled, opts.emit, &mut out)?;
    out.flush()?;
    Ok(())
}

fn emit(
    compiled: &CompiledStencil,
    kind: EmitKind,
    mut out: &mut dyn Write,
) -> StrataResult<()> {
    match kind {
        EmitKind::Ir => {
            strata_ir::Printer::write_context(compiled.context(), &mut out)?
        }
        EmitKind::Extents => {
            for (field, fe) in compiled.extents()?.fields() {
                write!(out, "{field}: {}", fe.extent)?;
                if let Some((lo, hi)) = fe.seq_dep {
                    write!(out, " sequential k:[{lo},{hi}]")?;
                }
                writeln!(out)?;
            }
            let dead = compiled.extents()?.num_dead();
            if dead > 0 {
                writeln!(out, "# {dead} dead statements")?;
            }
        }
        EmitKind::Id => writeln!(out, "{}", compiled.id())?,
        EmitKind::Kernel => compiled.emit(out)?,
        EmitKind::Json => {
            let extents = compiled
                .extents()?
                .fields()
                .map(|(field, fe)| (field.to_string(), serde_json::json!(fe)))
                .collect::<serde_json::Map<_, _>>();
            let summary = serde_json::json!({
                "id": compiled.id().to_string(),
                "backend": compiled.backend().to_string(),
                "interface": compiled.interface(),
                "extents": extents,
            });
            serde_json::to_writer_pretty(&mut out, &summary)
                .map_err(Error::write_error)?;
            writeln!(out)?;
        }
    }
    Ok(())
}
