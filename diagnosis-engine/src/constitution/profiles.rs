//! Reference data for the nine constitution types: defining features, the
//! symptom vocabulary scanned in complaints, and health guidance templates.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::features::paths;
use crate::rules::{rule, when, FeatureRule};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstitutionType {
    Balanced,
    QiDeficiency,
    YangDeficiency,
    YinDeficiency,
    PhlegmDampness,
    DampHeat,
    BloodStasis,
    QiStagnation,
    SpecialDiathesis,
}

impl ConstitutionType {
    pub const ALL: [ConstitutionType; 9] = [
        ConstitutionType::Balanced,
        ConstitutionType::QiDeficiency,
        ConstitutionType::YangDeficiency,
        ConstitutionType::YinDeficiency,
        ConstitutionType::PhlegmDampness,
        ConstitutionType::DampHeat,
        ConstitutionType::BloodStasis,
        ConstitutionType::QiStagnation,
        ConstitutionType::SpecialDiathesis,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConstitutionType::Balanced => "balanced",
            ConstitutionType::QiDeficiency => "qi_deficiency",
            ConstitutionType::YangDeficiency => "yang_deficiency",
            ConstitutionType::YinDeficiency => "yin_deficiency",
            ConstitutionType::PhlegmDampness => "phlegm_dampness",
            ConstitutionType::DampHeat => "damp_heat",
            ConstitutionType::BloodStasis => "blood_stasis",
            ConstitutionType::QiStagnation => "qi_stagnation",
            ConstitutionType::SpecialDiathesis => "special_diathesis",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ConstitutionType::Balanced => "Balanced",
            ConstitutionType::QiDeficiency => "Qi deficiency",
            ConstitutionType::YangDeficiency => "Yang deficiency",
            ConstitutionType::YinDeficiency => "Yin deficiency",
            ConstitutionType::PhlegmDampness => "Phlegm-dampness",
            ConstitutionType::DampHeat => "Damp-heat",
            ConstitutionType::BloodStasis => "Blood stasis",
            ConstitutionType::QiStagnation => "Qi stagnation",
            ConstitutionType::SpecialDiathesis => "Special diathesis",
        }
    }

    pub fn name_zh(&self) -> &'static str {
        match self {
            ConstitutionType::Balanced => "平和质",
            ConstitutionType::QiDeficiency => "气虚质",
            ConstitutionType::YangDeficiency => "阳虚质",
            ConstitutionType::YinDeficiency => "阴虚质",
            ConstitutionType::PhlegmDampness => "痰湿质",
            ConstitutionType::DampHeat => "湿热质",
            ConstitutionType::BloodStasis => "血瘀质",
            ConstitutionType::QiStagnation => "气郁质",
            ConstitutionType::SpecialDiathesis => "特禀质",
        }
    }

    /// Defining features of this type
    pub fn rules(&self) -> &'static [FeatureRule] {
        match self {
            ConstitutionType::Balanced => BALANCED,
            ConstitutionType::QiDeficiency => QI_DEFICIENCY,
            ConstitutionType::YangDeficiency => YANG_DEFICIENCY,
            ConstitutionType::YinDeficiency => YIN_DEFICIENCY,
            ConstitutionType::PhlegmDampness => PHLEGM_DAMPNESS,
            ConstitutionType::DampHeat => DAMP_HEAT,
            ConstitutionType::BloodStasis => BLOOD_STASIS,
            ConstitutionType::QiStagnation => QI_STAGNATION,
            ConstitutionType::SpecialDiathesis => SPECIAL_DIATHESIS,
        }
    }

    pub fn guidance(&self) -> &'static GuidanceTemplate {
        match self {
            ConstitutionType::Balanced => &BALANCED_GUIDANCE,
            ConstitutionType::QiDeficiency => &QI_DEFICIENCY_GUIDANCE,
            ConstitutionType::YangDeficiency => &YANG_DEFICIENCY_GUIDANCE,
            ConstitutionType::YinDeficiency => &YIN_DEFICIENCY_GUIDANCE,
            ConstitutionType::PhlegmDampness => &PHLEGM_DAMPNESS_GUIDANCE,
            ConstitutionType::DampHeat => &DAMP_HEAT_GUIDANCE,
            ConstitutionType::BloodStasis => &BLOOD_STASIS_GUIDANCE,
            ConstitutionType::QiStagnation => &QI_STAGNATION_GUIDANCE,
            ConstitutionType::SpecialDiathesis => &SPECIAL_DIATHESIS_GUIDANCE,
        }
    }
}

impl fmt::Display for ConstitutionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Symptom keywords looked for in the chief complaint
pub const CONSTITUTION_SYMPTOMS: &[&str] = &[
    "畏寒怕冷", "手足不温", "容易疲乏", "容易出汗", "手足心热", "口燥咽干", "形体肥胖", "容易困倦",
    "痰多", "面垢油腻", "口苦口干", "肤色晦暗", "容易出现瘀斑", "情绪不稳定", "胸胁胀满", "善太息",
    "过敏体质", "鼻塞流涕",
];

// ============================================================================
// DEFINING FEATURES
// ============================================================================

static BALANCED: &[FeatureRule] = &[
    rule!("体形匀称健壮", 0.8, [when!(paths::BODY_TYPE => equals "匀称")]),
    rule!("面色润泽", 0.7, [when!(paths::FACE_COMPLEXION => equals "润泽")]),
    rule!("精力充沛", 0.8, [when!(paths::ENERGY => equals "高")]),
    rule!("睡眠良好", 0.7, [when!(paths::SLEEP_QUALITY => equals "良好")]),
    rule!("食欲正常", 0.6, [when!(paths::APPETITE => equals "正常")]),
    rule!("二便正常", 0.7),
    // any pale-red tongue counts, whatever the coating
    rule!("舌淡红苔薄白", 0.8, [when!(paths::TONGUE_COLOR => equals "淡红")]),
    rule!(
        "脉和缓有力",
        0.7,
        [
            when!(paths::PULSE_RHYTHM => contains "和缓"),
            when!(paths::PULSE_STRENGTH => contains "有力"),
        ]
    ),
];

static QI_DEFICIENCY: &[FeatureRule] = &[
    rule!("容易疲乏", 0.9, [when!(paths::ENERGY => equals "低")]),
    rule!("容易出汗", 0.8),
    rule!("舌淡红", 0.7, [when!(paths::TONGUE_COLOR => equals "淡红")]),
    rule!("脉弱", 0.8, [when!(paths::PULSE_STRENGTH => contains "弱")]),
    rule!("容易感冒", 0.7),
    rule!("声音低微", 0.6, [when!(paths::VOICE_STRENGTH => equals "低微")]),
    rule!("面色萎黄", 0.7, [when!(paths::FACE_COLOR => contains "萎黄")]),
];

static YANG_DEFICIENCY: &[FeatureRule] = &[
    rule!("畏寒怕冷", 0.9),
    rule!("喜热饮食", 0.7, [when!(paths::FOOD_PREFERENCES => contains "热")]),
    rule!("精神不振", 0.8, [when!(paths::ENERGY => equals "低")]),
    rule!(
        "舌淡胖",
        0.8,
        [
            when!(paths::TONGUE_COLOR => equals "淡"),
            when!(paths::TONGUE_SHAPE => contains "胖"),
        ]
    ),
    rule!(
        "脉沉迟",
        0.8,
        [
            when!(paths::PULSE_DEPTH => contains "沉"),
            when!(paths::PULSE_RATE => contains "迟"),
        ]
    ),
    rule!("面色柔白", 0.6, [when!(paths::FACE_COLOR => contains "柔白")]),
    rule!("小便清长", 0.7),
];

static YIN_DEFICIENCY: &[FeatureRule] = &[
    rule!("手足心热", 0.9),
    rule!("口燥咽干", 0.8),
    rule!("大便干燥", 0.7),
    rule!(
        "舌红少津",
        0.8,
        [
            when!(paths::TONGUE_COLOR => equals "红"),
            when!(paths::TONGUE_MOISTURE => contains "少津"),
        ]
    ),
    rule!(
        "脉细数",
        0.8,
        [
            when!(paths::PULSE_STRENGTH => contains "细"),
            when!(paths::PULSE_RATE => contains "数"),
        ]
    ),
    rule!("面色潮红", 0.6, [when!(paths::FACE_COLOR => contains "潮红")]),
    rule!("眼干涩", 0.6),
    rule!("皮肤干燥", 0.7),
];

static PHLEGM_DAMPNESS: &[FeatureRule] = &[
    rule!("形体肥胖", 0.9, [when!(paths::BODY_BMI => above 25.0)]),
    rule!("容易困倦", 0.8),
    rule!("痰多", 0.8),
    rule!("舌体胖大", 0.8, [when!(paths::TONGUE_SHAPE => contains "胖大")]),
    rule!("脉滑", 0.7, [when!(paths::PULSE_RHYTHM => contains "滑")]),
    rule!("面部皮肤油脂多", 0.6),
    rule!("胸闷", 0.7),
];

static DAMP_HEAT: &[FeatureRule] = &[
    rule!("面垢油腻", 0.8, [when!(paths::FACE_COMPLEXION => contains "油腻")]),
    rule!("口苦口干", 0.8),
    rule!("大便黏滞", 0.8),
    rule!("小便短赤", 0.7),
    rule!("舌质偏红", 0.8, [when!(paths::TONGUE_COLOR => contains "红")]),
    // a slippery pulse is enough, rapid or not
    rule!("脉滑数", 0.7, [when!(paths::PULSE_RHYTHM => contains "滑")]),
    rule!("易生疮疖", 0.6),
];

static BLOOD_STASIS: &[FeatureRule] = &[
    rule!("肤色晦暗", 0.8, [when!(paths::FACE_COLOR => contains "晦暗")]),
    rule!("容易出现瘀斑", 0.9),
    rule!("口唇黯淡", 0.7),
    rule!("脉涩", 0.8, [when!(paths::PULSE_RHYTHM => contains "涩")]),
    rule!("眼眶黯黑", 0.6),
    rule!("头发易脱落", 0.5),
    rule!("健忘", 0.6),
];

static QI_STAGNATION: &[FeatureRule] = &[
    rule!("情绪不稳定", 0.9, [when!(paths::MOOD => equals "不稳定")]),
    rule!("胸胁胀满", 0.8),
    rule!("善太息", 0.8),
    rule!("舌淡红", 0.6, [when!(paths::TONGUE_COLOR => equals "淡红")]),
    rule!("脉弦", 0.8, [when!(paths::PULSE_STRENGTH => contains "弦")]),
    rule!("睡眠不安", 0.7, [when!(paths::SLEEP_QUALITY => equals "不佳")]),
    rule!("咽部异物感", 0.6),
];

static SPECIAL_DIATHESIS: &[FeatureRule] = &[
    rule!("过敏体质", 0.9),
    rule!("鼻塞流涕", 0.8),
    rule!("皮肤过敏", 0.8),
    rule!("哮喘", 0.7),
    rule!("药物过敏", 0.6),
    rule!("舌淡", 0.5),
    rule!(
        "脉濡弱",
        0.6,
        [
            when!(paths::PULSE_STRENGTH => contains "濡"),
            when!(paths::PULSE_STRENGTH => contains "弱"),
        ]
    ),
];

// ============================================================================
// HEALTH GUIDANCE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuidanceTemplate {
    pub diet: &'static str,
    pub exercise: &'static str,
    pub lifestyle: &'static str,
    pub emotion: &'static str,
    pub season: &'static str,
}

static BALANCED_GUIDANCE: GuidanceTemplate = GuidanceTemplate {
    diet: "Eat regular, moderate meals; avoid over-eating, going hungry, and unclean food",
    exercise: "Higher-volume activities such as running, martial arts and ball games suit this type",
    lifestyle: "Keep a regular routine, balance work and rest, and sleep enough",
    emotion: "Keep an even temper and avoid extremes of joy or grief",
    season: "Follow the seasons and adjust daily rhythm as they change",
};

static QI_DEFICIENCY_GUIDANCE: GuidanceTemplate = GuidanceTemplate {
    diet: "Favour neutral to mildly warm foods that strengthen the spleen, such as jujube, Chinese yam and millet",
    exercise: "Gentle, soft exercise such as walking and tai chi",
    lifestyle: "Keep a regular routine, avoid overexertion, and sleep enough",
    emotion: "Stay optimistic and avoid excessive worry",
    season: "Nourish yang in spring and summer, keep warm, and avoid heavy sweating",
};

static YANG_DEFICIENCY_GUIDANCE: GuidanceTemplate = GuidanceTemplate {
    diet: "Favour warming foods such as lamb, Chinese chives and ginger; limit raw and chilled food",
    exercise: "Relaxed, soft exercise; avoid drenching sweats",
    lifestyle: "Keep warm, especially the back and legs, and avoid late nights",
    emotion: "Keep a positive outlook and seek out company",
    season: "Nourish yang in spring and summer; guard against cold in autumn and winter",
};

static YIN_DEFICIENCY_GUIDANCE: GuidanceTemplate = GuidanceTemplate {
    diet: "Favour sweet, cooling, moistening foods such as lily bulb, goji berry and white fungus",
    exercise: "Low to moderate intensity exercise; avoid drenching sweats",
    lifestyle: "Keep regular hours, avoid late nights, and sleep enough",
    emotion: "Stay calm and avoid emotional agitation",
    season: "Nourish yin in autumn and winter; avoid strong summer sun and heat",
};

static PHLEGM_DAMPNESS_GUIDANCE: GuidanceTemplate = GuidanceTemplate {
    diet: "Eat light, low-salt, low-sugar meals with foods that strengthen the spleen and drain dampness",
    exercise: "Higher-volume exercise such as running and swimming",
    lifestyle: "Live somewhere dry and avoid damp surroundings",
    emotion: "Stay cheerful and take part in social activities",
    season: "Dispel dampness during the rainy season and avoid chilled food and drink",
};

static DAMP_HEAT_GUIDANCE: GuidanceTemplate = GuidanceTemplate {
    diet: "Favour foods that clear heat and drain dampness, such as mung bean, winter melon and bitter melon",
    exercise: "High-intensity, high-volume training",
    lifestyle: "Keep the home dry and ventilated and avoid late nights",
    emotion: "Stay even-tempered and avoid irritability and anger",
    season: "Avoid summer heat and damp; resolve dampness in late summer",
};

static BLOOD_STASIS_GUIDANCE: GuidanceTemplate = GuidanceTemplate {
    diet: "Favour foods that activate blood, such as hawthorn, vinegar and rose tea",
    exercise: "Exercise that moves qi and blood, such as tai chi and ba duan jin",
    lifestyle: "Keep regular hours and avoid sitting or standing for long periods",
    emotion: "Keep a relaxed mood and avoid brooding",
    season: "Keep warm so cold does not congeal the blood",
};

static QI_STAGNATION_GUIDANCE: GuidanceTemplate = GuidanceTemplate {
    diet: "Favour foods that move qi and relieve constraint, such as citrus, pomelo and finger citron",
    exercise: "Outdoor activity such as jogging, hiking and swimming",
    lifestyle: "Keep regular hours and make the bedroom quiet",
    emotion: "Stay cheerful and join group activities",
    season: "In spring soothe the liver and keep emotions flowing",
};

static SPECIAL_DIATHESIS_GUIDANCE: GuidanceTemplate = GuidanceTemplate {
    diet: "Eat plainly and avoid foods known to provoke allergies",
    exercise: "Gentle exercise; avoid strenuous activity",
    lifestyle: "Keep pollen, dust and other allergens out of the living space",
    emotion: "Stay calm and avoid emotional swings",
    season: "Guard against wind in spring and summer damp-heat; keep surroundings clean",
};

/// Note added when both types appear among the tendencies
pub struct CombinationNote {
    pub first: ConstitutionType,
    pub second: ConstitutionType,
    pub note: &'static str,
}

pub static COMBINATION_NOTES: &[CombinationNote] = &[
    CombinationNote {
        first: ConstitutionType::QiDeficiency,
        second: ConstitutionType::YangDeficiency,
        note: "Qi and yang are both deficient: warm and tonify qi and yang, and avoid overexertion",
    },
    CombinationNote {
        first: ConstitutionType::YinDeficiency,
        second: ConstitutionType::DampHeat,
        note: "Yin deficiency with damp-heat: nourish yin and clear heat, and avoid spicy, drying food",
    },
    CombinationNote {
        first: ConstitutionType::QiStagnation,
        second: ConstitutionType::BloodStasis,
        note: "Qi stagnation with blood stasis: soothe the liver, regulate qi and activate blood",
    },
];

pub const SPECIAL_DIATHESIS_NOTE: &str =
    "Special diathesis: take particular care to avoid allergens and have regular check-ups";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_type_has_rules_and_guidance() {
        for constitution in ConstitutionType::ALL {
            assert!(!constitution.rules().is_empty(), "{constitution}");
            assert!(!constitution.guidance().diet.is_empty(), "{constitution}");
        }
    }

    #[test]
    fn test_weights_positive() {
        for constitution in ConstitutionType::ALL {
            for rule in constitution.rules() {
                assert!(rule.weight > 0.0 && rule.weight <= 1.0);
            }
        }
    }
}
