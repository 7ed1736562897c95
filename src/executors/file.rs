//! File property executor.

use crate::core::{
    CheckExecutor, CheckFamily, Datatype, FileStat, ProbeError, SystemProbe, TestResult,
};
use crate::document::{ObjectLocator, StateEntity};
use crate::executors::comparator::{compare_typed, Comparison};
use crate::executors::unusable_object;
use crate::manager::config::AbsencePolicy;
use crate::resolver::Check;

use async_trait::async_trait;
use tracing::debug;

/// State entities that repeat the object's location rather than assert a
/// property.
const LOCATING_FIELDS: [&str; 3] = ["filepath", "path", "filename"];

/// What a file check asserts, derived from its state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileCheckKind<'a> {
    /// No state, or a state with only locating entities.
    Exists,
    /// A `uwrite` entity: compare the owner-write bit.
    Writable(&'a StateEntity),
    /// Any other entity.
    Unrecognized(&'a str),
}

impl<'a> FileCheckKind<'a> {
    fn of(check: &'a Check) -> Self {
        let Some(state) = &check.state else {
            return Self::Exists;
        };
        let mut asserted = state
            .entities
            .iter()
            .filter(|entity| !LOCATING_FIELDS.contains(&entity.field.as_str()));

        match asserted.find(|entity| entity.field != "uwrite") {
            Some(other) => Self::Unrecognized(&other.field),
            None => state.entity("uwrite").map_or(Self::Exists, Self::Writable),
        }
    }
}

/// Evaluates `file_test` checks.
#[derive(Debug, Clone, Default)]
pub struct FileExecutor {
    absence: AbsencePolicy,
}

impl FileExecutor {
    /// Creates an executor with the given absence policy.
    pub fn new(absence: AbsencePolicy) -> Self {
        Self { absence }
    }

    fn judge(&self, check: &Check, path: &str, stat: &FileStat) -> TestResult {
        match FileCheckKind::of(check) {
            FileCheckKind::Exists => TestResult::pass(&check.test_id, format!("file {path} exists")),
            FileCheckKind::Writable(entity) => {
                let observed = stat.owner_writable();
                let verdict = compare_typed(
                    if observed { "true" } else { "false" },
                    &entity.expected,
                    &entity.operation,
                    &Datatype::Boolean,
                );
                let described = if observed { "writable" } else { "not writable" };
                match verdict {
                    Comparison::Satisfied => TestResult::pass(
                        &check.test_id,
                        format!("file {path} is {described} by its owner, as expected"),
                    ),
                    Comparison::Unsatisfied => TestResult::fail(
                        &check.test_id,
                        format!("file {path} is {described} by its owner"),
                    ),
                    Comparison::Indeterminate(reason) => TestResult::unknown(&check.test_id, reason),
                }
                .with_detail("expected", entity.expected.as_str())
                .with_detail("actual", observed)
            }
            FileCheckKind::Unrecognized(field) => TestResult::unknown(
                &check.test_id,
                format!("unrecognized file test sub-type '{field}'"),
            ),
        }
    }
}

#[async_trait]
impl CheckExecutor for FileExecutor {
    fn family(&self) -> CheckFamily {
        CheckFamily::File
    }

    async fn execute(&self, probe: &dyn SystemProbe, check: &Check) -> Result<TestResult, ProbeError> {
        let ObjectLocator::File(locator) = &check.object.locator else {
            return Ok(unusable_object(check, "file"));
        };
        let path = locator.path.as_str();

        let Some(stat) = probe.stat_file(path).await? else {
            return Ok(TestResult::new(
                &check.test_id,
                self.absence.status(),
                format!("file {path} not found"),
            )
            .with_detail("file_path", path));
        };

        debug!(test_id = %check.test_id, path = %path, size = stat.size, "File probed");

        let mut result = self
            .judge(check, path, &stat)
            .with_detail("file_path", path)
            .with_detail("size", stat.size)
            .with_detail("permissions", stat.permissions_octal());
        if let Some(modified) = stat.modified {
            result = result.with_detail("modified", modified.to_rfc3339());
        }
        Ok(result)
    }
}
