//! Check executors.
//!
//! One executor per check family, dispatched by an exhaustive match on
//! [`CheckFamily`]. Families the engine does not know are reported as
//! `unknown` without touching the host.
//!
//! - [`RegistryExecutor`] - `registry_test`
//! - [`FileExecutor`] - `file_test`
//! - [`comparator`] - Value comparison shared by both

pub mod comparator;
pub mod file;
pub mod registry;

pub use comparator::{compare, compare_typed, Comparison};
pub use file::FileExecutor;
pub use registry::RegistryExecutor;

use crate::core::{CheckExecutor, CheckFamily, ProbeError, SystemProbe, TestResult};
use crate::document::ObjectLocator;
use crate::manager::config::AbsencePolicy;
use crate::resolver::Check;

/// The closed set of executors used by a scan.
#[derive(Debug, Clone, Default)]
pub struct Executors {
    registry: RegistryExecutor,
    file: FileExecutor,
}

impl Executors {
    /// Creates the executor set with the given absence policy.
    pub fn new(absence: AbsencePolicy) -> Self {
        Self {
            registry: RegistryExecutor::new(absence),
            file: FileExecutor::new(absence),
        }
    }

    /// Returns the executor for a family, if the engine supports it.
    pub fn for_family(&self, family: &CheckFamily) -> Option<&dyn CheckExecutor> {
        match family {
            CheckFamily::Registry => Some(&self.registry),
            CheckFamily::File => Some(&self.file),
            CheckFamily::Unsupported(_) => None,
        }
    }

    /// Runs a check with the executor for its family.
    ///
    /// # Errors
    ///
    /// Returns `ProbeError` when the probe could not assess the resource.
    pub async fn execute(
        &self,
        probe: &dyn SystemProbe,
        check: &Check,
    ) -> Result<TestResult, ProbeError> {
        match self.for_family(&check.family) {
            Some(executor) => executor.execute(probe, check).await,
            None => Ok(TestResult::unknown(
                &check.test_id,
                format!("unsupported test type '{}'", check.family),
            )),
        }
    }
}

/// The `unknown` result of a check whose object cannot be probed by the
/// executor for `family`.
pub(crate) fn unusable_object(check: &Check, family: &str) -> TestResult {
    let object_id = check.object.id.as_str();
    let message = match &check.object.locator {
        ObjectLocator::Incomplete { element, missing } => {
            format!("{element} '{object_id}' is missing '{missing}'")
        }
        _ => format!("{family} test references non-{family} object '{object_id}'"),
    };
    TestResult::unknown(&check.test_id, message).with_detail("object_id", object_id)
}
