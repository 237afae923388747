//! Weighted feature rules and the matcher shared by the analyzers.
//!
//! A rule names a clinical keyword, its weight, and the field checks that
//! count as evidence for it. A rule matches when the keyword itself was
//! reported as a symptom, or when every check of any one alternative holds.

use crate::features::FeatureBag;

/// Check applied to one feature value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Predicate {
    Equals(&'static str),
    Contains(&'static str),
    OneOf(&'static [&'static str]),
    GreaterThan(f64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Condition {
    pub path: &'static str,
    pub predicate: Predicate,
}

impl Condition {
    pub fn holds(&self, bag: &FeatureBag) -> bool {
        match self.predicate {
            Predicate::Equals(expected) => bag.text(self.path) == Some(expected),
            Predicate::Contains(needle) => bag.text(self.path).is_some_and(|v| v.contains(needle)),
            Predicate::OneOf(options) => bag
                .text(self.path)
                .is_some_and(|v| options.contains(&v)),
            Predicate::GreaterThan(limit) => bag.number(self.path).is_some_and(|v| v > limit),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureRule {
    pub keyword: &'static str,
    pub weight: f64,
    /// Any one group matching in full counts as evidence
    pub alternatives: &'static [&'static [Condition]],
}

impl FeatureRule {
    pub fn matches(&self, bag: &FeatureBag) -> bool {
        bag.has_symptom(self.keyword)
            || self
                .alternatives
                .iter()
                .any(|group| !group.is_empty() && group.iter().all(|c| c.holds(bag)))
    }
}

/// Outcome of scoring one rule set
#[derive(Debug, Clone, PartialEq)]
pub struct RuleScore {
    pub raw: f64,
    pub total: f64,
    /// `raw / total` on a 0-100 scale
    pub normalized: f64,
    pub matched: Vec<&'static str>,
}

pub fn score_rules(rules: &[FeatureRule], bag: &FeatureBag) -> RuleScore {
    let mut raw = 0.0;
    let mut total = 0.0;
    let mut matched = Vec::new();

    for rule in rules {
        total += rule.weight;
        if rule.matches(bag) {
            raw += rule.weight;
            matched.push(rule.keyword);
        }
    }

    let normalized = if total > 0.0 { raw / total * 100.0 } else { 0.0 };
    RuleScore {
        raw,
        total,
        normalized,
        matched,
    }
}

/// Build a [`Condition`] as a plain literal so rule tables can live in statics.
macro_rules! when {
    ($path:expr => equals $value:literal) => {
        $crate::rules::Condition {
            path: $path,
            predicate: $crate::rules::Predicate::Equals($value),
        }
    };
    ($path:expr => contains $value:literal) => {
        $crate::rules::Condition {
            path: $path,
            predicate: $crate::rules::Predicate::Contains($value),
        }
    };
    ($path:expr => one_of [$($value:literal),+ $(,)?]) => {
        $crate::rules::Condition {
            path: $path,
            predicate: $crate::rules::Predicate::OneOf(&[$($value),+]),
        }
    };
    ($path:expr => above $value:literal) => {
        $crate::rules::Condition {
            path: $path,
            predicate: $crate::rules::Predicate::GreaterThan($value),
        }
    };
}

/// Build a [`FeatureRule`]; each bracketed group is one alternative.
macro_rules! rule {
    ($keyword:literal, $weight:literal) => {
        $crate::rules::FeatureRule {
            keyword: $keyword,
            weight: $weight,
            alternatives: &[],
        }
    };
    ($keyword:literal, $weight:literal, $([$($condition:expr),+ $(,)?]),+ $(,)?) => {
        $crate::rules::FeatureRule {
            keyword: $keyword,
            weight: $weight,
            alternatives: &[$(&[$($condition),+]),+],
        }
    };
}

pub(crate) use rule;
pub(crate) use when;

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::features::paths;

    static RULES: &[FeatureRule] = &[
        rule!("畏寒", 0.5),
        rule!("舌淡", 0.5, [when!(paths::TONGUE_COLOR => one_of ["淡红", "淡白"])]),
        rule!(
            "脉沉迟",
            0.5,
            [
                when!(paths::PULSE_DEPTH => equals "沉"),
                when!(paths::PULSE_RATE => contains "迟"),
            ]
        ),
        rule!("形体肥胖", 1.0, [when!(paths::BODY_BMI => above 25.0)]),
    ];

    #[test]
    fn test_symptom_membership_matches() {
        let bag = FeatureBag::new().with_symptom("畏寒");
        let score = score_rules(RULES, &bag);
        assert_eq!(score.matched, vec!["畏寒"]);
        assert!((score.normalized - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_all_conditions_of_a_group_required() {
        let half = FeatureBag::new().with_text(paths::PULSE_DEPTH, "沉");
        assert!(!RULES[2].matches(&half));

        let full = half.with_text(paths::PULSE_RATE, "沉迟");
        assert!(RULES[2].matches(&full));
    }

    #[test]
    fn test_one_of_and_threshold_predicates() {
        let bag = FeatureBag::new()
            .with_text(paths::TONGUE_COLOR, "淡白")
            .with_number(paths::BODY_BMI, 25.0);
        assert!(RULES[1].matches(&bag));
        assert!(!RULES[3].matches(&bag));

        let heavier = bag.with_text(paths::BODY_BMI, "26.1");
        assert!(RULES[3].matches(&heavier));
    }

    #[test]
    fn test_empty_bag_scores_zero() {
        let score = score_rules(RULES, &FeatureBag::new());
        assert_eq!(score.raw, 0.0);
        assert!((score.total - 2.5).abs() < 1e-9);
        assert_eq!(score.normalized, 0.0);
        assert!(score.matched.is_empty());
    }

    #[test]
    fn test_empty_rule_set_scores_zero() {
        let score = score_rules(&[], &FeatureBag::new().with_symptom("畏寒"));
        assert_eq!(score.normalized, 0.0);
    }
}
