//! Static recommendation templates.

use super::{Priority, RecommendationType};

/// A labelled list of concrete items appended to a template description
pub type ItemList = (&'static str, &'static [&'static str]);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecommendationTemplate {
    pub key: &'static str,
    pub category: RecommendationType,
    pub title: &'static str,
    pub description: &'static str,
    pub priority: Priority,
    pub items: &'static [ItemList],
    pub precautions: &'static [&'static str],
    pub duration: Option<&'static str>,
    pub frequency: Option<&'static str>,
}

impl RecommendationTemplate {
    /// Description followed by one line per item list
    pub fn render_description(&self) -> String {
        let mut description = self.description.to_string();
        for (label, items) in self.items {
            description.push('\n');
            description.push_str(label);
            description.push_str(": ");
            description.push_str(&items.join(", "));
        }
        description
    }
}

pub const DIET_YANG_DEFICIENCY: RecommendationTemplate = RecommendationTemplate {
    key: "diet_yang_deficiency",
    category: RecommendationType::Diet,
    title: "Warming diet to support yang qi",
    description: "Favour warming foods and stay away from raw or chilled food",
    priority: Priority::High,
    items: &[
        (
            "Recommended foods",
            &["lamb", "Chinese chives", "fresh ginger", "longan", "walnuts", "red dates", "millet"],
        ),
        (
            "Foods to avoid",
            &["watermelon", "pear", "bitter melon", "mung beans", "iced drinks", "raw lettuce"],
        ),
    ],
    precautions: &[],
    duration: None,
    frequency: None,
};

pub const DIET_YIN_DEFICIENCY: RecommendationTemplate = RecommendationTemplate {
    key: "diet_yin_deficiency",
    category: RecommendationType::Diet,
    title: "Moistening diet to nourish yin",
    description: "Favour sweet, cooling and moistening foods; avoid pungent and drying food",
    priority: Priority::High,
    items: &[
        (
            "Recommended foods",
            &["lily bulb", "white fungus", "goji berries", "pear", "honey", "sesame", "duck"],
        ),
        (
            "Foods to avoid",
            &["chili", "pepper", "barbecue", "deep-fried food", "hard liquor", "coffee"],
        ),
    ],
    precautions: &[],
    duration: None,
    frequency: None,
};

pub const DIET_QI_DEFICIENCY: RecommendationTemplate = RecommendationTemplate {
    key: "diet_qi_deficiency",
    category: RecommendationType::Diet,
    title: "Qi-tonifying diet to strengthen the spleen",
    description: "Favour easily digested foods that strengthen the spleen and tonify qi",
    priority: Priority::High,
    items: &[
        (
            "Recommended foods",
            &["Chinese yam", "jujube", "millet", "pumpkin", "potato", "chicken", "crucian carp"],
        ),
        (
            "Foods to avoid",
            &["raw or chilled food", "greasy food", "hard-to-digest food", "overly sweet food"],
        ),
    ],
    precautions: &[],
    duration: None,
    frequency: None,
};

pub const DIET_PHLEGM_DAMPNESS: RecommendationTemplate = RecommendationTemplate {
    key: "diet_phlegm_dampness",
    category: RecommendationType::Diet,
    title: "Diet to resolve phlegm and drain dampness",
    description: "Favour foods that strengthen the spleen and resolve dampness, and keep body weight under control",
    priority: Priority::High,
    items: &[
        (
            "Recommended foods",
            &["coix seed", "winter melon", "white radish", "dried tangerine peel", "poria", "lotus leaf"],
        ),
        (
            "Foods to avoid",
            &["greasy food", "overly sweet food", "heavy drinking", "excess dairy"],
        ),
    ],
    precautions: &[],
    duration: None,
    frequency: None,
};

pub const EXERCISE_YANG_DEFICIENCY: RecommendationTemplate = RecommendationTemplate {
    key: "exercise_yang_deficiency",
    category: RecommendationType::Exercise,
    title: "Gentle exercise to build yang",
    description: "Choose gentle exercise in the morning and avoid drenching sweats",
    priority: Priority::Medium,
    items: &[("Recommended exercises", &["tai chi", "baduanjin", "slow walking", "yoga"])],
    precautions: &["Avoid heavy sweating", "Keep warm after exercise"],
    duration: Some("30-45 minutes"),
    frequency: Some("3-4 times a week"),
};

pub const EXERCISE_QI_DEFICIENCY: RecommendationTemplate = RecommendationTemplate {
    key: "exercise_qi_deficiency",
    category: RecommendationType::Exercise,
    title: "Exercise to tonify qi",
    description: "Choose mild aerobic exercise and build up gradually",
    priority: Priority::Medium,
    items: &[("Recommended exercises", &["walking", "tai chi", "five-animal play", "qigong"])],
    precautions: &["Avoid overexertion", "Increase the load gradually"],
    duration: Some("20-30 minutes"),
    frequency: Some("Daily or every other day"),
};

pub const EXERCISE_PHLEGM_DAMPNESS: RecommendationTemplate = RecommendationTemplate {
    key: "exercise_phlegm_dampness",
    category: RecommendationType::Exercise,
    title: "Exercise to resolve dampness and lose weight",
    description: "Choose vigorous aerobic exercise to speed up metabolism",
    priority: Priority::High,
    items: &[(
        "Recommended exercises",
        &["brisk walking", "jogging", "swimming", "cycling", "aerobics"],
    )],
    precautions: &["Sweat moderately", "Rehydrate after exercise"],
    duration: Some("45-60 minutes"),
    frequency: Some("4-5 times a week"),
};

pub const LIFESTYLE_GENERAL: RecommendationTemplate = RecommendationTemplate {
    key: "lifestyle_general",
    category: RecommendationType::Lifestyle,
    title: "Healthy lifestyle guidance",
    description: "Keep a regular routine: in bed by 22:00-23:00, up at 6:00-7:00, 7-8 hours of sleep, \
                  balanced work and rest, and a clean, well-ventilated home",
    priority: Priority::Medium,
    items: &[],
    precautions: &[],
    duration: None,
    frequency: None,
};

pub const EMOTIONAL_QI_STAGNATION: RecommendationTemplate = RecommendationTemplate {
    key: "emotional_qi_stagnation",
    category: RecommendationType::Emotional,
    title: "Emotional regulation to soothe the liver",
    description: "Regulate emotions and relieve constrained liver qi",
    priority: Priority::High,
    items: &[(
        "Techniques",
        &["deep breathing", "meditation", "music therapy", "aromatherapy"],
    )],
    precautions: &[
        "Do not bottle up emotions for long",
        "Avoid overthinking",
        "Avoid late nights",
        "Seek counselling when needed",
    ],
    duration: None,
    frequency: None,
};

pub const SEASONAL_SPRING: RecommendationTemplate = RecommendationTemplate {
    key: "seasonal_spring",
    category: RecommendationType::Seasonal,
    title: "Spring health guidance",
    description: "Follow the rising yang of spring and keep liver qi flowing: more green vegetables, \
                  less sour food, more time outdoors, and an even temper",
    priority: Priority::Low,
    items: &[],
    precautions: &[],
    duration: None,
    frequency: None,
};

pub const SEASONAL_SUMMER: RecommendationTemplate = RecommendationTemplate {
    key: "seasonal_summer",
    category: RecommendationType::Seasonal,
    title: "Summer health guidance",
    description: "Protect the heart through the summer heat: light meals, stay hydrated, \
                  rest at midday and avoid long sun exposure",
    priority: Priority::Low,
    items: &[],
    precautions: &[],
    duration: None,
    frequency: None,
};

pub const SEASONAL_AUTUMN: RecommendationTemplate = RecommendationTemplate {
    key: "seasonal_autumn",
    category: RecommendationType::Seasonal,
    title: "Autumn health guidance",
    description: "Nourish the lungs against autumn dryness: moistening foods such as pear and lily bulb, \
                  early to bed and early to rise",
    priority: Priority::Low,
    items: &[],
    precautions: &[],
    duration: None,
    frequency: None,
};

pub const SEASONAL_WINTER: RecommendationTemplate = RecommendationTemplate {
    key: "seasonal_winter",
    category: RecommendationType::Seasonal,
    title: "Winter health guidance",
    description: "Conserve energy through winter: keep warm, go to bed early and rise late, \
                  and favour nourishing stews",
    priority: Priority::Low,
    items: &[],
    precautions: &[],
    duration: None,
    frequency: None,
};

pub const PREVENTION_GENERAL: RecommendationTemplate = RecommendationTemplate {
    key: "prevention_general",
    category: RecommendationType::Prevention,
    title: "Everyday prevention",
    description: "Prevent illness and maintain health: regular check-ups, keep vaccinations current, \
                  wash hands often and mind the air quality",
    priority: Priority::Medium,
    items: &[],
    precautions: &[],
    duration: None,
    frequency: None,
};

pub const SLEEP_IMPROVEMENT: RecommendationTemplate = RecommendationTemplate {
    key: "sleep_improvement",
    category: RecommendationType::Lifestyle,
    title: "Sleep improvement plan",
    description: "Build regular sleep habits and a restful sleep environment",
    priority: Priority::High,
    items: &[],
    precautions: &[
        "No screens before bed",
        "Keep the bedroom quiet and dark",
        "No coffee or tea before bed",
        "Keep a fixed bedtime ritual",
    ],
    duration: None,
    frequency: None,
};

pub const STRESS_MANAGEMENT: RecommendationTemplate = RecommendationTemplate {
    key: "stress_management",
    category: RecommendationType::Emotional,
    title: "Stress management",
    description: "Learn effective ways to relieve stress and protect mental health",
    priority: Priority::High,
    items: &[],
    precautions: &[
        "Practise deep breathing and meditation",
        "Exercise regularly",
        "Stay in touch with friends and family",
        "Seek professional help when needed",
    ],
    duration: None,
    frequency: None,
};

pub const SYMPTOM_MONITORING: RecommendationTemplate = RecommendationTemplate {
    key: "symptom_monitoring",
    category: RecommendationType::Monitoring,
    title: "Symptom monitoring",
    description: "Watch for changes in",
    priority: Priority::Medium,
    items: &[],
    precautions: &[
        "Record when symptoms occur and how severe they are",
        "Note how symptoms trend over time",
        "See a doctor promptly if symptoms worsen",
        "Attend follow-up visits on schedule",
    ],
    duration: None,
    frequency: None,
};

pub const ELDERLY_CARE: RecommendationTemplate = RecommendationTemplate {
    key: "elderly_care",
    category: RecommendationType::Prevention,
    title: "Health care for older adults",
    description: "A care plan for the particular health needs of older adults",
    priority: Priority::Medium,
    items: &[],
    precautions: &[
        "Have bone density checked regularly",
        "Take steps to prevent falls",
        "Keep up moderate social activity",
        "Have vision and hearing checked regularly",
        "Keep nutrition balanced",
    ],
    duration: None,
    frequency: None,
};

pub const MIDDLE_AGE_CARE: RecommendationTemplate = RecommendationTemplate {
    key: "middle_age_care",
    category: RecommendationType::Prevention,
    title: "Health care for middle age",
    description: "A prevention plan for the health risks of middle age",
    priority: Priority::Medium,
    items: &[],
    precautions: &[
        "Have cardiovascular checks regularly",
        "Keep body weight under control",
        "Attend cancer screening",
        "Balance work and personal life",
        "Look after bones and joints",
    ],
    duration: None,
    frequency: None,
};

/// Calendar season used to pick the seasonal template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Season {
    Spring,
    Summer,
    Autumn,
    Winter,
}

impl Season {
    /// Mar-May spring, Jun-Aug summer, Sep-Nov autumn, Dec-Feb winter
    pub fn from_month(month: u32) -> Self {
        match month {
            3..=5 => Season::Spring,
            6..=8 => Season::Summer,
            9..=11 => Season::Autumn,
            _ => Season::Winter,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Season::Spring => "spring",
            Season::Summer => "summer",
            Season::Autumn => "autumn",
            Season::Winter => "winter",
        }
    }

    pub fn template(&self) -> &'static RecommendationTemplate {
        match self {
            Season::Spring => &SEASONAL_SPRING,
            Season::Summer => &SEASONAL_SUMMER,
            Season::Autumn => &SEASONAL_AUTUMN,
            Season::Winter => &SEASONAL_WINTER,
        }
    }
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_render_appends_item_lines() {
        let description = DIET_YANG_DEFICIENCY.render_description();
        let lines: Vec<&str> = description.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("Recommended foods: lamb, Chinese chives"));
        assert!(lines[2].starts_with("Foods to avoid: watermelon"));
    }

    #[test]
    fn test_render_without_items_is_plain_description() {
        assert_eq!(
            PREVENTION_GENERAL.render_description(),
            PREVENTION_GENERAL.description
        );
    }

    #[test]
    fn test_season_boundaries() {
        assert_eq!(Season::from_month(2), Season::Winter);
        assert_eq!(Season::from_month(3), Season::Spring);
        assert_eq!(Season::from_month(5), Season::Spring);
        assert_eq!(Season::from_month(6), Season::Summer);
        assert_eq!(Season::from_month(9), Season::Autumn);
        assert_eq!(Season::from_month(11), Season::Autumn);
        assert_eq!(Season::from_month(12), Season::Winter);
        assert_eq!(Season::from_month(1).template().key, "seasonal_winter");
    }
}
