//! Syndrome pattern library.
//!
//! Keywords are the clinical terms the modality services report, so they stay
//! in Chinese. A keyword counts when it appears in the parsed symptom list or
//! when its field checks hold.

use serde::{Deserialize, Serialize};

use crate::features::paths;
use crate::rules::{rule, when, FeatureRule};

/// Default weight of a defining keyword
pub const KEYWORD_WEIGHT: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyndromeCategory {
    EightPrinciples,
    QiBlood,
    ZangFu,
    SixChannels,
    WeiQiYingXue,
    SanJiao,
}

impl SyndromeCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyndromeCategory::EightPrinciples => "eight_principles",
            SyndromeCategory::QiBlood => "qi_blood",
            SyndromeCategory::ZangFu => "zang_fu",
            SyndromeCategory::SixChannels => "six_channels",
            SyndromeCategory::WeiQiYingXue => "wei_qi_ying_xue",
            SyndromeCategory::SanJiao => "san_jiao",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyndromePattern {
    pub id: &'static str,
    pub name: &'static str,
    pub name_zh: &'static str,
    pub category: SyndromeCategory,
    pub description: &'static str,
    pub rules: &'static [FeatureRule],
    pub related_organs: &'static [&'static str],
    pub pathogenesis: &'static str,
    pub treatment_principle: &'static str,
}

/// Two primary patterns that together form a recognised compound pattern
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyndromeCombination {
    pub first: &'static str,
    pub second: &'static str,
    pub name: &'static str,
    pub name_zh: &'static str,
    pub description: &'static str,
    pub treatment_principle: &'static str,
}

/// Symptom keywords looked for in the chief complaint
pub const SYMPTOM_VOCABULARY: &[&str] = &[
    "畏寒", "四肢不温", "精神萎靡", "五心烦热", "盗汗", "口干", "神疲乏力", "气短懒言", "自汗",
    "刺痛", "痛有定处", "胸闷", "痰多", "身重", "胸胁胀痛", "情志抑郁", "善太息", "食少腹胀",
    "便溏", "倦怠乏力", "腰膝酸冷", "阳痿", "小便清长", "心悸", "失眠", "健忘", "面色淡白",
    "咳嗽气短", "声音低微", "易感冒",
];

// ============================================================================
// SHARED TONGUE AND PULSE RULES
// ============================================================================

const PALE_TONGUE: FeatureRule = rule!(
    "舌淡",
    0.5,
    [when!(paths::TONGUE_COLOR => one_of ["淡红", "淡白"])]
);

const DEEP_SLOW_PULSE: FeatureRule = rule!(
    "脉沉迟",
    0.5,
    [
        when!(paths::PULSE_DEPTH => equals "沉"),
        when!(paths::PULSE_RATE => contains "迟"),
    ]
);

const WEAK_PULSE: FeatureRule = rule!("脉弱", 0.5, [when!(paths::PULSE_STRENGTH => contains "弱")]);

// ============================================================================
// PATTERN LIBRARY
// ============================================================================

pub static SYNDROME_PATTERNS: &[SyndromePattern] = &[
    SyndromePattern {
        id: "yang_deficiency",
        name: "Yang deficiency",
        name_zh: "阳虚证",
        category: SyndromeCategory::EightPrinciples,
        description: "Insufficient yang qi with a weakened warming function",
        rules: &[
            rule!("畏寒", 0.5),
            rule!("四肢不温", 0.5),
            rule!("精神萎靡", 0.5),
            PALE_TONGUE,
            DEEP_SLOW_PULSE,
        ],
        related_organs: &["kidney", "spleen", "heart"],
        pathogenesis: "Declining yang qi fails to warm the body",
        treatment_principle: "Warm yang and tonify qi",
    },
    SyndromePattern {
        id: "yin_deficiency",
        name: "Yin deficiency",
        name_zh: "阴虚证",
        category: SyndromeCategory::EightPrinciples,
        description: "Insufficient yin fluids with internal deficiency heat",
        rules: &[
            rule!("五心烦热", 0.5),
            rule!("盗汗", 0.5),
            rule!("口干", 0.5),
            rule!(
                "舌红少苔",
                0.5,
                [
                    when!(paths::TONGUE_COLOR => equals "红"),
                    when!(paths::TONGUE_COATING => contains "少苔"),
                ]
            ),
            rule!(
                "脉细数",
                0.5,
                [
                    when!(paths::PULSE_STRENGTH => contains "细"),
                    when!(paths::PULSE_RATE => contains "数"),
                ]
            ),
        ],
        related_organs: &["kidney", "lung", "stomach"],
        pathogenesis: "Depleted yin fluids let deficiency fire flare upward",
        treatment_principle: "Nourish yin and clear deficiency fire",
    },
    SyndromePattern {
        id: "qi_deficiency",
        name: "Qi deficiency",
        name_zh: "气虚证",
        category: SyndromeCategory::QiBlood,
        description: "Insufficient original qi with weakened organ function",
        rules: &[
            rule!("神疲乏力", 0.5),
            rule!("气短懒言", 0.5),
            rule!("自汗", 0.5),
            PALE_TONGUE,
            WEAK_PULSE,
        ],
        related_organs: &["spleen", "lung", "kidney"],
        pathogenesis: "Insufficient original qi leaves the organs unnourished",
        treatment_principle: "Tonify qi and strengthen the spleen",
    },
    SyndromePattern {
        id: "blood_stasis",
        name: "Blood stasis",
        name_zh: "血瘀证",
        category: SyndromeCategory::QiBlood,
        description: "Sluggish blood flow with static blood",
        rules: &[
            rule!("刺痛", 0.5),
            rule!("痛有定处", 0.5),
            rule!("舌紫暗", 0.5, [when!(paths::TONGUE_COLOR => contains "紫")]),
            rule!("脉涩", 0.5, [when!(paths::PULSE_RHYTHM => contains "涩")]),
        ],
        related_organs: &["heart", "liver"],
        pathogenesis: "Impeded blood flow lets static blood obstruct the collaterals",
        treatment_principle: "Activate blood and resolve stasis",
    },
    SyndromePattern {
        id: "phlegm_dampness",
        name: "Phlegm-dampness",
        name_zh: "痰湿证",
        category: SyndromeCategory::QiBlood,
        description: "Phlegm and dampness accumulating internally",
        rules: &[
            rule!("胸闷", 0.5),
            rule!("痰多", 0.5),
            rule!("身重", 0.5),
            rule!("舌苔厚腻", 0.5, [when!(paths::TONGUE_COATING => contains "厚腻")]),
            rule!("脉滑", 0.5, [when!(paths::PULSE_RHYTHM => contains "滑")]),
        ],
        related_organs: &["spleen", "lung"],
        pathogenesis: "The spleen fails to transform fluids, so phlegm-dampness forms internally",
        treatment_principle: "Resolve phlegm and eliminate dampness",
    },
    SyndromePattern {
        id: "liver_qi_stagnation",
        name: "Liver qi stagnation",
        name_zh: "肝气郁结",
        category: SyndromeCategory::ZangFu,
        description: "Constrained liver qi with impaired free flow",
        rules: &[
            rule!("胸胁胀痛", 0.5),
            rule!("情志抑郁", 0.5),
            rule!("善太息", 0.5),
            rule!("脉弦", 0.5, [when!(paths::PULSE_STRENGTH => contains "弦")]),
        ],
        related_organs: &["liver"],
        pathogenesis: "Emotional strain constrains the free flow of liver qi",
        treatment_principle: "Soothe the liver and regulate qi",
    },
    SyndromePattern {
        id: "spleen_qi_deficiency",
        name: "Spleen qi deficiency",
        name_zh: "脾气虚证",
        category: SyndromeCategory::ZangFu,
        description: "Weak spleen qi with impaired transportation",
        rules: &[
            rule!("食少腹胀", 0.5),
            rule!("便溏", 0.5),
            rule!("倦怠乏力", 0.5),
            rule!("舌淡苔白", 0.5),
            rule!(
                "脉缓弱",
                0.5,
                [
                    when!(paths::PULSE_RATE => contains "缓"),
                    when!(paths::PULSE_STRENGTH => contains "弱"),
                ]
            ),
        ],
        related_organs: &["spleen"],
        pathogenesis: "Weak spleen qi fails in transportation and transformation",
        treatment_principle: "Strengthen the spleen and boost qi",
    },
    SyndromePattern {
        id: "kidney_yang_deficiency",
        name: "Kidney yang deficiency",
        name_zh: "肾阳虚证",
        category: SyndromeCategory::ZangFu,
        description: "Deficient kidney yang with a declining life-gate fire",
        rules: &[
            rule!("腰膝酸冷", 0.5),
            rule!("阳痿", 0.5),
            rule!("小便清长", 0.5),
            PALE_TONGUE,
            DEEP_SLOW_PULSE,
        ],
        related_organs: &["kidney"],
        pathogenesis: "Depleted kidney yang lets the life-gate fire decline",
        treatment_principle: "Warm and tonify kidney yang",
    },
    SyndromePattern {
        id: "heart_blood_deficiency",
        name: "Heart blood deficiency",
        name_zh: "心血虚证",
        category: SyndromeCategory::ZangFu,
        description: "Insufficient heart blood leaving the spirit unnourished",
        rules: &[
            rule!("心悸", 0.5),
            rule!("失眠", 0.5),
            rule!("健忘", 0.5),
            rule!("面色淡白", 0.5),
            rule!("脉细弱", 0.5),
        ],
        related_organs: &["heart"],
        pathogenesis: "Insufficient heart blood fails to nourish the spirit",
        treatment_principle: "Nourish blood and calm the spirit",
    },
    SyndromePattern {
        id: "lung_qi_deficiency",
        name: "Lung qi deficiency",
        name_zh: "肺气虚证",
        category: SyndromeCategory::ZangFu,
        description: "Weak lung qi with impaired dispersing and descending",
        rules: &[
            rule!("咳嗽气短", 0.5),
            rule!("声音低微", 0.5),
            rule!("易感冒", 0.5),
            PALE_TONGUE,
            WEAK_PULSE,
        ],
        related_organs: &["lung"],
        pathogenesis: "Weak lung qi fails to disperse and descend",
        treatment_principle: "Tonify the lung and boost qi",
    },
];

pub static SYNDROME_COMBINATIONS: &[SyndromeCombination] = &[
    SyndromeCombination {
        first: "qi_deficiency",
        second: "blood_stasis",
        name: "Qi deficiency with blood stasis",
        name_zh: "气虚血瘀",
        description: "Deficient qi cannot propel the blood, so the blood stagnates",
        treatment_principle: "Boost qi and activate blood",
    },
    SyndromeCombination {
        first: "yin_deficiency",
        second: "yang_deficiency",
        name: "Dual deficiency of yin and yang",
        name_zh: "阴阳两虚",
        description: "Both yin and yang are depleted and need joint tonification",
        treatment_principle: "Tonify yin and yang together",
    },
    SyndromeCombination {
        first: "liver_qi_stagnation",
        second: "spleen_qi_deficiency",
        name: "Liver stagnation with spleen deficiency",
        name_zh: "肝郁脾虚",
        description: "Constrained liver qi alongside weak spleen qi",
        treatment_principle: "Soothe the liver and strengthen the spleen",
    },
    SyndromeCombination {
        first: "phlegm_dampness",
        second: "qi_deficiency",
        name: "Phlegm-dampness with qi deficiency",
        name_zh: "痰湿气虚",
        description: "Spleen deficiency breeds phlegm, and the phlegm-dampness encumbers the spleen",
        treatment_principle: "Strengthen the spleen and resolve phlegm",
    },
];

pub fn find_pattern(id: &str) -> Option<&'static SyndromePattern> {
    SYNDROME_PATTERNS.iter().find(|p| p.id == id)
}
