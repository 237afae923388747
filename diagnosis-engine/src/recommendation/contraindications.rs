//! Contraindications per known medical condition.
//!
//! Each entry pairs the note shown to the user with the phrases that mark a
//! recommendation as unsafe for that condition. Phrases are matched against
//! the lower-cased description.

use crate::types::MedicalCondition;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contraindication {
    pub note: &'static str,
    pub keywords: &'static [&'static str],
}

impl Contraindication {
    pub fn matches(&self, description: &str) -> bool {
        let description = description.to_lowercase();
        self.keywords.iter().any(|k| description.contains(k))
    }
}

const STRENUOUS_EXERCISE: &[&str] = &["vigorous", "strenuous", "high intensity", "high-intensity"];
const SODIUM: &[&str] = &["salty", "high-sodium", "pickled"];

static PREGNANCY: &[Contraindication] = &[
    Contraindication {
        note: "Avoid blood-activating and stasis-resolving remedies",
        keywords: &["activate blood", "blood-activating", "resolve stasis"],
    },
    Contraindication {
        note: "Avoid cold and cooling foods",
        keywords: &["cooling", "cold food"],
    },
    Contraindication {
        note: "Avoid strenuous exercise",
        keywords: STRENUOUS_EXERCISE,
    },
    Contraindication {
        note: "Avoid needling certain acupoints",
        keywords: &["acupuncture", "needling"],
    },
];

static HYPERTENSION: &[Contraindication] = &[
    Contraindication {
        note: "Limit sodium intake",
        keywords: SODIUM,
    },
    Contraindication {
        note: "Avoid high-intensity exercise",
        keywords: STRENUOUS_EXERCISE,
    },
    Contraindication {
        note: "Avoid excessive warming tonics",
        keywords: &["warming tonic"],
    },
];

static DIABETES: &[Contraindication] = &[
    Contraindication {
        note: "Control sugar intake",
        keywords: &["honey", "sugary", "high-sugar"],
    },
    Contraindication {
        note: "Watch exercise intensity",
        keywords: STRENUOUS_EXERCISE,
    },
];

static HEART_DISEASE: &[Contraindication] = &[
    Contraindication {
        note: "Avoid strenuous exercise",
        keywords: STRENUOUS_EXERCISE,
    },
    Contraindication {
        note: "Limit sodium intake",
        keywords: SODIUM,
    },
    Contraindication {
        note: "Avoid sudden emotional strain",
        keywords: &["competitive"],
    },
];

static LIVER_DISEASE: &[Contraindication] = &[
    Contraindication {
        note: "Avoid alcohol",
        keywords: &["alcohol", "medicinal wine", "rice wine"],
    },
    Contraindication {
        note: "Avoid hepatotoxic medicines",
        keywords: &["hepatotoxic"],
    },
    Contraindication {
        note: "Avoid a high-fat diet",
        keywords: &["high-fat", "fatty meat"],
    },
];

static KIDNEY_DISEASE: &[Contraindication] = &[
    Contraindication {
        note: "Limit protein intake",
        keywords: &["high-protein", "protein"],
    },
    Contraindication {
        note: "Control fluid intake",
        keywords: &["plenty of water", "drink more water"],
    },
    Contraindication {
        note: "Avoid nephrotoxic medicines",
        keywords: &["nephrotoxic"],
    },
];

pub fn contraindications_for(condition: MedicalCondition) -> &'static [Contraindication] {
    match condition {
        MedicalCondition::Pregnancy => PREGNANCY,
        MedicalCondition::Hypertension => HYPERTENSION,
        MedicalCondition::Diabetes => DIABETES,
        MedicalCondition::HeartDisease => HEART_DISEASE,
        MedicalCondition::LiverDisease => LIVER_DISEASE,
        MedicalCondition::KidneyDisease => KIDNEY_DISEASE,
    }
}

/// Notes of every contraindication the description triggers, in table order
pub fn matching_notes(conditions: &[MedicalCondition], description: &str) -> Vec<&'static str> {
    let mut notes = Vec::new();
    for condition in conditions {
        for entry in contraindications_for(*condition) {
            if entry.matches(description) && !notes.contains(&entry.note) {
                notes.push(entry.note);
            }
        }
    }
    notes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_is_case_insensitive() {
        let notes = matching_notes(
            &[MedicalCondition::Pregnancy],
            "Choose VIGOROUS aerobic exercise",
        );
        assert_eq!(notes, vec!["Avoid strenuous exercise"]);
    }

    #[test]
    fn test_shared_notes_reported_once() {
        let notes = matching_notes(
            &[MedicalCondition::Pregnancy, MedicalCondition::HeartDisease],
            "strenuous intervals",
        );
        assert_eq!(notes, vec!["Avoid strenuous exercise"]);
    }

    #[test]
    fn test_no_conditions_no_matches() {
        assert!(matching_notes(&[], "vigorous cooling honey").is_empty());
    }

    #[test]
    fn test_every_condition_has_entries() {
        for condition in [
            MedicalCondition::Pregnancy,
            MedicalCondition::Hypertension,
            MedicalCondition::Diabetes,
            MedicalCondition::HeartDisease,
            MedicalCondition::LiverDisease,
            MedicalCondition::KidneyDisease,
        ] {
            let entries = contraindications_for(condition);
            assert!(!entries.is_empty(), "{}", condition.as_str());
            assert!(entries.iter().all(|e| !e.keywords.is_empty()));
        }
    }
}
