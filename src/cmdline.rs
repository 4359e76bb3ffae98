//! Command line parsing for the Strata compiler.
use argh::FromArgs;
use itertools::Itertools;
use std::path::PathBuf;
use std::str::FromStr;
use strata::{BackendKind, DataType, Externals, Literal, TypeSignature};
use strata_utils::{Id, OutputFile};

/// What the compiler prints.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EmitKind {
    /// The analyzed IR.
    Ir,
    /// Access extents of every field.
    Extents,
    /// The stencil ID.
    Id,
    /// The generated kernel.
    #[default]
    Kernel,
    /// Interface and extents as JSON.
    Json,
}

fn emit_kinds() -> Vec<(&'static str, EmitKind)> {
    vec![
        ("ir", EmitKind::Ir),
        ("extents", EmitKind::Extents),
        ("id", EmitKind::Id),
        ("kernel", EmitKind::Kernel),
        ("json", EmitKind::Json),
    ]
}

impl FromStr for EmitKind {
    type Err = String;
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let kinds = emit_kinds();
        kinds
            .iter()
            .find(|(name, _)| *name == input)
            .map(|(_, kind)| *kind)
            .ok_or_else(|| {
                format!(
                    "`{input}' is not a valid output.\nValid outputs: {}",
                    kinds.iter().map(|(name, _)| *name).join(", ")
                )
            })
    }
}

/// A `NAME=VALUE` pair.
#[derive(Clone, Debug, PartialEq)]
pub struct ExternalArg(pub Id, pub Literal);

impl FromStr for ExternalArg {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, value) = s
            .split_once('=')
            .ok_or_else(|| format!("`{s}': externals must be given as NAME=VALUE"))?;
        Ok(ExternalArg(Id::new(name.trim()), value.parse()?))
    }
}

/// A `field=dtype` pair.
#[derive(Clone, Debug, PartialEq)]
pub struct TypeArg(pub Id, pub DataType);

impl FromStr for TypeArg {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, dtype) = s
            .split_once('=')
            .ok_or_else(|| format!("`{s}': types must be given as field=dtype"))?;
        Ok(TypeArg(Id::new(name.trim()), dtype.trim().parse()?))
    }
}

#[derive(FromArgs)]
/// Compiler for stencil computations on structured grids
pub struct Opts {
    /// input stencil file
    #[argh(positional)]
    pub file: Option<PathBuf>,

    /// stencil to compile, defaults to the first one in the file
    #[argh(option, short = 's')]
    pub stencil: Option<String>,

    /// backend: debug or vector
    #[argh(option, short = 'b', default = "BackendKind::Debug")]
    pub backend: BackendKind,

    /// value of an external as NAME=VALUE
    #[argh(option, short = 'x', long = "external")]
    pub externals: Vec<ExternalArg>,

    /// element type override as field=dtype
    #[argh(option, short = 't', long = "type")]
    pub types: Vec<TypeArg>,

    /// what to print: ir, extents, id, kernel or json
    #[argh(option, default = "EmitKind::Kernel")]
    pub emit: EmitKind,

    /// output file, default is stdout
    #[argh(option, short = 'o', default = "OutputFile::Stdout")]
    pub output: OutputFile,

    /// logging level
    #[argh(option, long = "log-level", default = "log::LevelFilter::Warn")]
    pub log_level: log::LevelFilter,

    /// list all the available passes and exit
    #[argh(switch, long = "list-passes")]
    pub list_passes: bool,
}

impl Opts {
    pub fn externals(&self) -> Externals {
        self.externals
            .iter()
            .map(|ExternalArg(name, value)| (*name, *value))
            .collect()
    }

    pub fn signature(&self) -> TypeSignature {
        let mut sig = TypeSignature::new();
        for TypeArg(name, dtype) in &self.types {
            sig.insert(*name, *dtype);
        }
        sig
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_options() {
        let opts = Opts::from_args(
            &["strata"],
            &[
                "hdiff.stencil",
                "-b",
                "vector",
                "-x",
                "BET_M=0.5",
                "-x",
                "LIMIT=True",
                "-t",
                "in_f=f32",
                "--emit",
                "extents",
            ],
        )
        .unwrap();
        assert_eq!(opts.backend, BackendKind::Vector);
        assert_eq!(opts.emit, EmitKind::Extents);
        assert_eq!(
            opts.externals().to_string(),
            "BET_M=0.5,LIMIT=True"
        );
        assert_eq!(opts.signature().get(&Id::new("in_f")), Some(DataType::F32));
        assert_eq!(opts.output, OutputFile::Stdout);
    }

    #[test]
    fn rejects_malformed_pairs() {
        assert!("BET_M".parse::<ExternalArg>().is_err());
        assert!("a=f16".parse::<TypeArg>().is_err());
        assert!("wat".parse::<EmitKind>().unwrap_err().contains("Valid outputs"));
    }
}
