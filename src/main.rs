mod cmdline;
mod driver;

use strata_utils::StrataResult;

fn main() -> StrataResult<()> {
    driver::run_compiler()
}
