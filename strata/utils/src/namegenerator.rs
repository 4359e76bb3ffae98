use crate::Id;
use std::collections::{HashMap, HashSet};

/// Generates fresh names that never collide with names already in use.
///
/// Used by the IR builder to name condition temporaries introduced while
/// lowering `if` statements.
#[derive(Clone, Debug, Default)]
pub struct NameGenerator {
    name_hash: HashMap<Id, i64>,
    generated_names: HashSet<Id>,
}

impl NameGenerator {
    /// Create a NameGenerator where `names` are already defined so that this
    /// generator will never generate those names.
    pub fn with_prev_defined_names(names: HashSet<Id>) -> Self {
        NameGenerator {
            generated_names: names,
            name_hash: HashMap::default(),
        }
    }

    /// Add names that must never be generated.
    pub fn add_names<I: IntoIterator<Item = Id>>(&mut self, names: I) {
        self.generated_names.extend(names)
    }

    /// Returns a new name that starts with `prefix`.
    /// For example:
    /// ```
    /// # use strata_utils::NameGenerator;
    /// let mut namegen = NameGenerator::default();
    /// assert_eq!(namegen.gen_name("__cond"), "__cond0");
    /// assert_eq!(namegen.gen_name("__cond"), "__cond1");
    /// ```
    pub fn gen_name<S>(&mut self, prefix: S) -> Id
    where
        S: Into<Id>,
    {
        let prefix: Id = prefix.into();
        let count = self.name_hash.entry(prefix).or_insert(0);
        loop {
            let name = Id::from(format!("{prefix}{count}"));
            *count += 1;
            // Counters taken by the user are skipped.
            if self.generated_names.insert(name) {
                return name;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn avoids_defined_names() {
        let mut namegen = NameGenerator::with_prev_defined_names(
            [Id::new("tmp0"), Id::new("tmp1")].into_iter().collect(),
        );
        assert_eq!(namegen.gen_name("tmp"), "tmp2");
        assert_eq!(namegen.gen_name("tmp"), "tmp3");
    }

    #[test]
    fn skips_taken_counters() {
        let mut namegen = NameGenerator::default();
        namegen.add_names([Id::new("c0"), Id::new("c2")]);
        assert_eq!(namegen.gen_name("c"), "c1");
        assert_eq!(namegen.gen_name("c"), "c3");
        assert_eq!(namegen.gen_name("d"), "d0");
    }
}
