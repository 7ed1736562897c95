//! Recursive criteria tree evaluation.
//!
//! Each node yields a boolean plus two taint flags. A leaf is `true` only for
//! a `pass` result; `error` and `unknown` results count as `false` for the
//! boolean but set `has_error` / `has_unknown`. Alongside the boolean, every
//! node carries a three-valued verdict in which inconclusive leaves stay
//! undetermined, so an `unknown` input only reaches the definition status
//! when it could change the outcome. Negation flips both values and leaves
//! the flags alone.

use crate::core::{ResultStatus, TestResult};
use crate::document::{CriteriaNode, CriteriaOperator};

use std::collections::HashMap;

/// Test results indexed by test id.
pub type ResultIndex<'a> = HashMap<&'a str, &'a TestResult>;

/// The result of evaluating a criteria (sub)tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CriteriaOutcome {
    /// Boolean value after negation.
    pub value: bool,
    /// A leaf below was `error` or named a missing test.
    pub has_error: bool,
    /// A leaf below was `unknown`, or a node could not be evaluated.
    pub has_unknown: bool,
    /// Three-valued verdict; `None` when inconclusive leaves decide it.
    pub verdict: Option<bool>,
    /// Leaf test references with no result, in tree order.
    pub missing_refs: Vec<String>,
}

impl CriteriaOutcome {
    fn leaf(value: bool) -> Self {
        Self {
            value,
            verdict: Some(value),
            ..Self::default()
        }
    }

    fn inconclusive() -> Self {
        Self::default()
    }

    fn absorb(&mut self, child: CriteriaOutcome) {
        self.has_error |= child.has_error;
        self.has_unknown |= child.has_unknown;
        self.missing_refs.extend(child.missing_refs);
    }

    /// Derives the definition status.
    ///
    /// Errors dominate. Otherwise a decided verdict maps to `pass` or
    /// `fail`, and an undecided one to `unknown`.
    pub fn status(&self) -> ResultStatus {
        if self.has_error {
            return ResultStatus::Error;
        }
        match self.verdict {
            Some(true) => ResultStatus::Pass,
            Some(false) => ResultStatus::Fail,
            None => ResultStatus::Unknown,
        }
    }
}

/// Evaluates a criteria tree against already computed test results.
///
/// Every child is evaluated; there is no short-circuiting, so the taint
/// flags reflect the whole tree.
pub fn evaluate(node: &CriteriaNode, results: &ResultIndex<'_>) -> CriteriaOutcome {
    let (mut outcome, negate) = match node {
        CriteriaNode::Criterion {
            test_ref, negate, ..
        } => {
            let outcome = match results.get(test_ref.as_str()) {
                Some(result) => match result.status {
                    ResultStatus::Pass => CriteriaOutcome::leaf(true),
                    ResultStatus::Fail => CriteriaOutcome::leaf(false),
                    ResultStatus::Error => CriteriaOutcome {
                        has_error: true,
                        ..CriteriaOutcome::inconclusive()
                    },
                    ResultStatus::Unknown => CriteriaOutcome {
                        has_unknown: true,
                        ..CriteriaOutcome::inconclusive()
                    },
                },
                None => CriteriaOutcome {
                    has_error: true,
                    missing_refs: vec![test_ref.clone()],
                    ..CriteriaOutcome::inconclusive()
                },
            };
            (outcome, *negate)
        }

        CriteriaNode::Criteria {
            operator,
            negate,
            children,
            ..
        } => {
            let mut outcome = CriteriaOutcome::inconclusive();
            let mut true_count = 0usize;
            let mut tally = Tally::default();
            for child in children {
                let child = evaluate(child, results);
                true_count += usize::from(child.value);
                tally.add(child.verdict);
                outcome.absorb(child);
            }

            (outcome.value, outcome.verdict) = match operator {
                CriteriaOperator::And => (true_count == children.len(), tally.all()),
                CriteriaOperator::Or => (true_count > 0, tally.any()),
                CriteriaOperator::One => (true_count == 1, tally.exactly_one()),
                CriteriaOperator::Xor => (true_count % 2 == 1, tally.odd()),
                CriteriaOperator::Other(_) => {
                    outcome.has_unknown = true;
                    (false, None)
                }
            };
            (outcome, *negate)
        }

        CriteriaNode::Unsupported { negate, .. } => {
            let outcome = CriteriaOutcome {
                has_unknown: true,
                ..CriteriaOutcome::inconclusive()
            };
            (outcome, *negate)
        }
    };

    if negate {
        outcome.value = !outcome.value;
        outcome.verdict = outcome.verdict.map(|v| !v);
    }
    outcome
}

/// Counts of decided and undecided child verdicts.
#[derive(Debug, Default)]
struct Tally {
    trues: usize,
    falses: usize,
    undecided: usize,
}

impl Tally {
    fn add(&mut self, verdict: Option<bool>) {
        match verdict {
            Some(true) => self.trues += 1,
            Some(false) => self.falses += 1,
            None => self.undecided += 1,
        }
    }

    fn decided(&self, value: bool) -> Option<bool> {
        (self.undecided == 0).then_some(value)
    }

    fn all(&self) -> Option<bool> {
        if self.falses > 0 {
            Some(false)
        } else {
            self.decided(true)
        }
    }

    fn any(&self) -> Option<bool> {
        if self.trues > 0 {
            Some(true)
        } else {
            self.decided(false)
        }
    }

    fn exactly_one(&self) -> Option<bool> {
        if self.trues > 1 {
            Some(false)
        } else {
            self.decided(self.trues == 1)
        }
    }

    fn odd(&self) -> Option<bool> {
        self.decided(self.trues % 2 == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn results(entries: &[(&'static str, ResultStatus)]) -> Vec<TestResult> {
        entries
            .iter()
            .map(|(id, status)| TestResult::new(*id, *status, "test"))
            .collect()
    }

    fn index(results: &[TestResult]) -> ResultIndex<'_> {
        results.iter().map(|r| (r.test_id.as_str(), r)).collect()
    }

    #[test]
    fn test_and_or_algebra() {
        let results = results(&[("a", ResultStatus::Pass), ("b", ResultStatus::Fail)]);
        let index = index(&results);
        let leaves = || vec![CriteriaNode::criterion("a"), CriteriaNode::criterion("b")];

        let and = evaluate(&CriteriaNode::and(leaves()), &index);
        assert!(!and.value);
        assert_eq!(and.status(), ResultStatus::Fail);

        let or = evaluate(&CriteriaNode::or(leaves()), &index);
        assert!(or.value);
        assert_eq!(or.status(), ResultStatus::Pass);
    }

    #[test]
    fn test_double_negation_is_identity() {
        for status in [ResultStatus::Pass, ResultStatus::Fail] {
            let results = results(&[("a", status)]);
            let index = index(&results);

            let plain = evaluate(&CriteriaNode::criterion("a"), &index);
            let doubled = evaluate(
                &CriteriaNode::and(vec![CriteriaNode::criterion("a").negated()]).negated(),
                &index,
            );
            assert_eq!(plain.value, doubled.value);
            assert_eq!(plain.status(), doubled.status());
        }
    }

    #[test]
    fn test_negated_leaf() {
        let results = results(&[("a", ResultStatus::Fail)]);
        let outcome = evaluate(&CriteriaNode::criterion("a").negated(), &index(&results));
        assert_eq!(outcome.status(), ResultStatus::Pass);
    }

    #[test]
    fn test_missing_reference_is_error() {
        let results = results(&[("a", ResultStatus::Pass), ("b", ResultStatus::Pass)]);
        let tree = CriteriaNode::and(vec![
            CriteriaNode::criterion("a"),
            CriteriaNode::criterion("ghost"),
            CriteriaNode::criterion("b"),
        ]);

        let outcome = evaluate(&tree, &index(&results));
        assert_eq!(outcome.status(), ResultStatus::Error);
        assert_eq!(outcome.missing_refs, vec!["ghost".to_string()]);
    }

    #[test]
    fn test_missing_reference_is_error_even_when_or_is_true() {
        let results = results(&[("a", ResultStatus::Pass)]);
        let tree = CriteriaNode::or(vec![
            CriteriaNode::criterion("a"),
            CriteriaNode::criterion("ghost").negated(),
        ]);

        let outcome = evaluate(&tree, &index(&results));
        assert!(outcome.value);
        assert_eq!(outcome.status(), ResultStatus::Error);
    }

    #[test]
    fn test_error_and_unknown_leaves_taint_the_verdict() {
        let results = results(&[
            ("a", ResultStatus::Pass),
            ("e", ResultStatus::Error),
            ("u", ResultStatus::Unknown),
        ]);
        let index = index(&results);

        let errored = evaluate(
            &CriteriaNode::or(vec![CriteriaNode::criterion("a"), CriteriaNode::criterion("e")]),
            &index,
        );
        assert_eq!(errored.status(), ResultStatus::Error);

        let unknown = evaluate(
            &CriteriaNode::and(vec![CriteriaNode::criterion("a"), CriteriaNode::criterion("u")]),
            &index,
        );
        assert!(!unknown.value);
        assert_eq!(unknown.status(), ResultStatus::Unknown);

        let both = evaluate(
            &CriteriaNode::and(vec![CriteriaNode::criterion("u"), CriteriaNode::criterion("e")]),
            &index,
        );
        assert_eq!(both.status(), ResultStatus::Error);
    }

    #[test]
    fn test_unknown_leaf_that_cannot_change_the_outcome() {
        let results = results(&[
            ("a", ResultStatus::Pass),
            ("f", ResultStatus::Fail),
            ("u", ResultStatus::Unknown),
        ]);
        let index = index(&results);
        let pair = |x: &str, y: &str| vec![CriteriaNode::criterion(x), CriteriaNode::criterion(y)];

        let or = evaluate(&CriteriaNode::or(pair("a", "u")), &index);
        assert!(or.value);
        assert!(or.has_unknown);
        assert_eq!(or.status(), ResultStatus::Pass);

        let and = evaluate(&CriteriaNode::and(pair("f", "u")), &index);
        assert_eq!(and.status(), ResultStatus::Fail);

        let open_or = evaluate(&CriteriaNode::or(pair("f", "u")), &index);
        assert_eq!(open_or.status(), ResultStatus::Unknown);

        let negated = evaluate(&CriteriaNode::criterion("u").negated(), &index);
        assert!(negated.value);
        assert_eq!(negated.status(), ResultStatus::Unknown);

        let one = evaluate(
            &CriteriaNode::criteria(
                CriteriaOperator::One,
                vec![
                    CriteriaNode::criterion("a"),
                    CriteriaNode::criterion("a"),
                    CriteriaNode::criterion("u"),
                ],
            ),
            &index,
        );
        assert_eq!(one.status(), ResultStatus::Fail);

        let xor = evaluate(
            &CriteriaNode::criteria(CriteriaOperator::Xor, pair("a", "u")),
            &index,
        );
        assert_eq!(xor.status(), ResultStatus::Unknown);
    }

    #[test]
    fn test_negated_error_stays_error() {
        let results = results(&[("e", ResultStatus::Error)]);
        let outcome = evaluate(&CriteriaNode::criterion("e").negated(), &index(&results));
        assert!(outcome.value);
        assert_eq!(outcome.status(), ResultStatus::Error);
    }

    #[test]
    fn test_one_and_xor() {
        let results = results(&[
            ("a", ResultStatus::Pass),
            ("b", ResultStatus::Pass),
            ("c", ResultStatus::Fail),
        ]);
        let index = index(&results);
        let leaves = |ids: &[&str]| -> Vec<CriteriaNode> {
            ids.iter().map(|id| CriteriaNode::criterion(*id)).collect()
        };

        let one = |ids: &[&str]| {
            evaluate(&CriteriaNode::criteria(CriteriaOperator::One, leaves(ids)), &index).value
        };
        assert!(one(&["a", "c"]));
        assert!(!one(&["a", "b"]));

        let xor = |ids: &[&str]| {
            evaluate(&CriteriaNode::criteria(CriteriaOperator::Xor, leaves(ids)), &index).value
        };
        assert!(xor(&["a", "c"]));
        assert!(!xor(&["a", "b"]));
        assert!(!xor(&["c"]));
    }

    #[test]
    fn test_empty_groups() {
        let index = ResultIndex::new();
        assert!(evaluate(&CriteriaNode::and(Vec::new()), &index).value);
        assert!(!evaluate(&CriteriaNode::or(Vec::new()), &index).value);
        assert_eq!(
            evaluate(&CriteriaNode::and(Vec::new()), &index).status(),
            ResultStatus::Pass
        );
    }

    #[test]
    fn test_unsupported_nodes_are_unknown() {
        let results = results(&[("a", ResultStatus::Pass)]);
        let index = index(&results);

        let extended = CriteriaNode::and(vec![
            CriteriaNode::criterion("a"),
            CriteriaNode::Unsupported {
                element: "extend_definition".to_string(),
                negate: false,
            },
        ]);
        assert_eq!(evaluate(&extended, &index).status(), ResultStatus::Unknown);

        let nand = CriteriaNode::criteria(
            CriteriaOperator::Other("NAND".to_string()),
            vec![CriteriaNode::criterion("a")],
        );
        assert_eq!(evaluate(&nand, &index).status(), ResultStatus::Unknown);
    }
}
