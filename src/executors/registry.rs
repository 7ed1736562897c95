//! Registry value executor.

use crate::core::{
    CheckExecutor, CheckFamily, Datatype, ProbeError, RegistryLookup, SystemProbe, TestResult,
};
use crate::document::ObjectLocator;
use crate::executors::comparator::{compare_typed, Comparison};
use crate::executors::unusable_object;
use crate::manager::config::AbsencePolicy;
use crate::resolver::Check;

use async_trait::async_trait;
use tracing::debug;

/// Evaluates `registry_test` checks.
///
/// An object without a value name is a key-existence check. Otherwise the
/// named value is read and compared against the state's `value` entity;
/// with no state, or a state without entities, the value only has to exist.
/// Other state entities (`hive`, `key`, `name`, `type`) are not compared.
#[derive(Debug, Clone, Default)]
pub struct RegistryExecutor {
    absence: AbsencePolicy,
}

impl RegistryExecutor {
    /// Creates an executor with the given absence policy.
    pub fn new(absence: AbsencePolicy) -> Self {
        Self { absence }
    }
}

#[async_trait]
impl CheckExecutor for RegistryExecutor {
    fn family(&self) -> CheckFamily {
        CheckFamily::Registry
    }

    async fn execute(&self, probe: &dyn SystemProbe, check: &Check) -> Result<TestResult, ProbeError> {
        let ObjectLocator::Registry(locator) = &check.object.locator else {
            return Ok(unusable_object(check, "registry"));
        };

        let entity = match &check.state {
            Some(state) if !state.entities.is_empty() => match state.entity("value") {
                Some(entity) => Some(entity),
                None => {
                    return Ok(TestResult::unknown(
                        &check.test_id,
                        format!(
                            "registry state '{}' has no value entity (fields: {})",
                            state.id,
                            state.fields().join(", ")
                        ),
                    ))
                }
            },
            _ => None,
        };

        let key_path = locator.key_path();
        if !locator.hive.is_recognized() {
            return Ok(TestResult::unknown(
                &check.test_id,
                format!("unrecognized registry hive '{}'", locator.hive),
            )
            .with_detail("hive", locator.hive.as_str()));
        }

        let lookup = probe
            .read_registry_string(&locator.hive, &locator.key, locator.name.as_deref())
            .await?;

        debug!(test_id = %check.test_id, key = %key_path, lookup = ?lookup, "Registry probed");

        let mut result = match (&lookup, &locator.name) {
            (RegistryLookup::KeyMissing, _) => TestResult::new(
                &check.test_id,
                self.absence.status(),
                format!("registry key {key_path} not found"),
            ),
            (RegistryLookup::ValueMissing, Some(name)) => TestResult::new(
                &check.test_id,
                self.absence.status(),
                format!("registry value '{name}' not found under {key_path}"),
            ),
            (RegistryLookup::ValueMissing, None) | (RegistryLookup::KeyPresent, None) => {
                TestResult::pass(&check.test_id, format!("registry key {key_path} exists"))
            }
            (RegistryLookup::KeyPresent, Some(name)) => {
                return Err(ProbeError::backend(
                    probe.name(),
                    format!("answered key presence for value '{name}' under {key_path}"),
                ))
            }
            (RegistryLookup::Value { data }, _) => match entity {
                None => TestResult::pass(
                    &check.test_id,
                    format!("registry value under {key_path} exists"),
                ),
                Some(entity) => {
                    let verdict =
                        compare_typed(data, &entity.expected, &entity.operation, &entity.datatype);
                    let mut result = match verdict {
                        Comparison::Satisfied => TestResult::pass(
                            &check.test_id,
                            format!(
                                "registry value '{data}' {} '{}'",
                                entity.operation, entity.expected
                            ),
                        ),
                        Comparison::Unsatisfied => TestResult::fail(
                            &check.test_id,
                            format!(
                                "registry value '{data}' does not satisfy {} '{}'",
                                entity.operation, entity.expected
                            ),
                        ),
                        Comparison::Indeterminate(reason) => {
                            TestResult::unknown(&check.test_id, reason)
                        }
                    }
                    .with_detail("expected", entity.expected.as_str())
                    .with_detail("operation", entity.operation.as_str());
                    if entity.datatype != Datatype::String {
                        result = result.with_detail("datatype", entity.datatype.to_string());
                    }
                    result
                }
            },
        };

        result = result
            .with_detail("hive", locator.hive.as_str())
            .with_detail("key", locator.key.as_str());
        if let Some(name) = &locator.name {
            result = result.with_detail("value_name", name.as_str());
        }
        if let RegistryLookup::Value { data } = lookup {
            result = result.with_detail("actual", data);
        }

        Ok(result)
    }
}
