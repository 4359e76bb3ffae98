//! Define the PassManager structure that is used to construct and run
//! passes.
use crate::traversal;
use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use std::time::Instant;
use strata_ir as ir;
use strata_utils::{Error, StrataResult};

/// Top-level type for all passes that analyze an [ir::Context]
pub type PassClosure = Box<dyn Fn(&mut ir::Context) -> StrataResult<()> + Send + Sync>;

/// Structure that tracks all registered passes for the compiler.
#[derive(Default)]
pub struct PassManager {
    /// All registered passes
    passes: HashMap<String, PassClosure>,
    /// Tracks alias for groups of passes that run together.
    aliases: HashMap<String, Vec<String>>,
    // Track the help information for passes
    help: HashMap<String, String>,
}

impl PassManager {
    /// Register a new pass and return an error if another pass with the
    /// same name has already been registered.
    ///
    /// ## Example
    /// ```rust
    /// # use strata_opt::{pass_manager::PassManager, passes::InferExtents};
    /// let mut pm = PassManager::default();
    /// pm.register_pass::<InferExtents>().unwrap();
    /// ```
    pub fn register_pass<Pass>(&mut self) -> StrataResult<()>
    where
        Pass:
            traversal::Visitor + traversal::ConstructVisitor + traversal::Named,
    {
        self.register_generic_pass::<Pass>(Box::new(|ir| {
            Pass::do_pass_default(ir)?;
            Ok(())
        }))
    }

    /// Registers a diagnostic pass as a normal pass. If there is an error,
    /// this will report the first error gathered by the pass and log the
    /// rest.
    pub fn register_diagnostic<Pass>(&mut self) -> StrataResult<()>
    where
        Pass: traversal::Visitor
            + traversal::ConstructVisitor
            + traversal::Named
            + traversal::DiagnosticPass,
    {
        self.register_generic_pass::<Pass>(Box::new(|ir| {
            let mut visitor = Pass::from(ir)?;
            visitor.do_pass(ir)?;

            let mut errors = visitor.diagnostics().errors_iter().cloned();
            if let Some(first) = errors.next() {
                errors.for_each(
                    |err| log::error!(target: Pass::name(), "{err:?}"),
                );
                Err(first)
            } else {
                // only show warnings, if there are no errors
                visitor.diagnostics().warning_iter().for_each(
                    |warning| log::warn!(target: Pass::name(), "{warning:?}"),
                );
                Ok(())
            }
        }))
    }

    fn register_generic_pass<Pass>(
        &mut self,
        pass_closure: PassClosure,
    ) -> StrataResult<()>
    where
        Pass:
            traversal::Visitor + traversal::ConstructVisitor + traversal::Named,
    {
        let name = Pass::name().to_string();
        if self.passes.contains_key(&name) {
            return Err(Error::misc(format!(
                "Pass with name '{}' is already registered.",
                name
            )));
        }
        self.passes.insert(name.clone(), pass_closure);
        let help = format!("- {}: {}", name, Pass::description());
        self.help.insert(name, help);
        Ok(())
    }

    /// Adds a new alias for groups of passes. An alias is a list of strings
    /// that represent valid pass names OR an alias.
    /// The passes and aliases are executed in the order they are given.
    pub fn add_alias(
        &mut self,
        name: String,
        passes: Vec<String>,
    ) -> StrataResult<()> {
        if self.aliases.contains_key(&name) {
            return Err(Error::misc(format!(
                "Alias with name '{}'  already registered.",
                name
            )));
        }
        // Expand any aliases used in defining this alias.
        let mut all_passes = Vec::with_capacity(passes.len());
        for pass in passes {
            if let Some(expanded) = self.aliases.get(&pass) {
                all_passes.extend(expanded.iter().cloned());
            } else if self.passes.contains_key(&pass) {
                all_passes.push(pass);
            } else {
                return Err(Error::misc(format!(
                    "No pass or alias named: {}",
                    pass
                )));
            }
        }
        self.aliases.insert(name, all_passes);
        Ok(())
    }

    /// Return the help string for a specific pass.
    pub fn specific_help(&self, pass: &str) -> Option<String> {
        self.help.get(pass).cloned().or_else(|| {
            self.aliases.get(pass).map(|passes| {
                let pass_str = passes
                    .iter()
                    .map(|p| format!("- {p}"))
                    .collect::<Vec<String>>()
                    .join("\n");
                format!("`{pass}' is an alias for pass pipeline:\n{}", pass_str)
            })
        })
    }

    /// Return a string representation to show all available passes and aliases.
    /// Appropriate for help text.
    pub fn complete_help(&self) -> String {
        let mut ret = String::with_capacity(1000);

        // Push all passes.
        let mut pass_names = self.passes.keys().collect::<Vec<_>>();
        pass_names.sort();
        ret.push_str("Passes:\n");
        pass_names.iter().for_each(|&pass| {
            let _ = writeln!(ret, "{}", self.help[pass]);
        });

        // Push all aliases
        let mut aliases = self.aliases.iter().collect::<Vec<_>>();
        aliases.sort_by(|kv1, kv2| kv1.0.cmp(kv2.0));
        ret.push_str("\nAliases:\n");
        aliases.iter().for_each(|(alias, passes)| {
            let pass_str = passes
                .iter()
                .map(|p| p.to_string())
                .collect::<Vec<String>>()
                .join(", ");
            let _ = writeln!(ret, "- {}: {}", alias, pass_str);
        });
        ret
    }

    /// Attempts to resolve the alias name. If there is no alias with this name,
    /// assumes that this is a pass instead.
    fn resolve_alias(&self, maybe_alias: &str) -> Vec<String> {
        self.aliases
            .get(maybe_alias)
            .cloned()
            .unwrap_or_else(|| vec![maybe_alias.to_string()])
    }

    /// Creates a plan using an inclusion and exclusion list which might contain
    /// aliases.
    fn create_plan(
        &self,
        incls: &[String],
        excls: &[String],
    ) -> StrataResult<(Vec<String>, HashSet<String>)> {
        // Incls and excls can have aliases in them. Resolve them.
        let passes = incls
            .iter()
            .flat_map(|maybe_alias| self.resolve_alias(maybe_alias))
            .collect::<Vec<_>>();

        let excl_set = excls
            .iter()
            .flat_map(|maybe_alias| self.resolve_alias(maybe_alias))
            .collect::<HashSet<String>>();

        // Validate that names of passes in incl and excl sets are known
        passes.iter().chain(excl_set.iter()).try_for_each(|pass| {
            if !self.passes.contains_key(pass) {
                Err(Error::misc(format!(
                    "Unknown pass: {pass}. Run with --list-passes to view registered passes."
                )))
            } else {
                Ok(())
            }
        })?;

        Ok((passes, excl_set))
    }

    /// Executes a given "plan" constructed using the incl and excl lists.
    pub fn execute_plan(
        &self,
        ctx: &mut ir::Context,
        incl: &[String],
        excl: &[String],
        dump_ir: bool,
    ) -> StrataResult<()> {
        let (passes, excl_set) = self.create_plan(incl, excl)?;

        for name in passes {
            // Pass is known to exist because create_plan validates the
            // names of passes.
            let pass = &self.passes[&name];

            if !excl_set.contains(&name) {
                let start = Instant::now();
                pass(ctx)?;
                if dump_ir {
                    ir::Printer::write_context(ctx, &mut std::io::stdout())?;
                }
                let elapsed = start.elapsed();
                // Warn if pass takes more than 5 seconds.
                if elapsed.as_secs() > 5 {
                    log::warn!("{name}: {}ms", elapsed.as_millis());
                } else {
                    log::info!("{name}: {}ms", elapsed.as_millis());
                }
            } else {
                log::info!("{name}: Ignored")
            }
        }

        Ok(())
    }
}

/// Simple macro to register an alias with a pass manager.
///
/// ## Example
/// ```ignore
/// let pm = PassManager::default();
/// // Register passes IntervalCheck and OrderingCheck.
/// register_alias!(pm, "validate", [IntervalCheck, OrderingCheck]);
/// ```
#[macro_export]
macro_rules! register_alias {
    (@unwrap_name $pass:ident) => {
        $pass::name().to_string()
    };

    (@unwrap_name $pass:literal) => {
        $pass.to_string()
    };

    ($manager:expr, $alias:literal, [ $($pass:tt),* $(,)? ]) => {
        $manager.add_alias($alias.to_string(), vec![
            $(register_alias!(@unwrap_name $pass)),*
        ])?;
    };
}
