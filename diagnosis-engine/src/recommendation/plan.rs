use chrono::{DateTime, Duration, Utc};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use super::{Priority, Recommendation, RecommendationType};

const DIET_MONITORING: &str = "Monitor how the body responds to dietary changes";
const EXERCISE_MONITORING: &str = "Monitor energy and mood after exercise";

/// One scheduled check-in, counted in days from the start of the plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowUpCheckpoint {
    pub name: String,
    pub interval_days: u32,
    /// Repeats every `interval_days` once reached
    pub recurring: bool,
}

impl FollowUpCheckpoint {
    fn once(name: &str, interval_days: u32) -> Self {
        Self {
            name: name.to_string(),
            interval_days,
            recurring: false,
        }
    }

    fn every(name: &str, interval_days: u32) -> Self {
        Self {
            name: name.to_string(),
            interval_days,
            recurring: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationPlan {
    pub plan_id: String,
    pub user_id: String,
    pub session_id: String,
    pub recommendations: Vec<Recommendation>,
    pub overall_strategy: String,
    /// Recommendation ids, highest priority first
    pub implementation_order: Vec<String>,
    pub monitoring_points: Vec<String>,
    pub follow_up_schedule: Vec<FollowUpCheckpoint>,
    pub created_at: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
}

impl RecommendationPlan {
    pub fn is_valid_at(&self, at: DateTime<Utc>) -> bool {
        at < self.valid_until
    }
}

pub(crate) fn build_plan(
    user_id: &str,
    session_id: &str,
    recommendations: Vec<Recommendation>,
    created_at: DateTime<Utc>,
    validity_days: u32,
) -> RecommendationPlan {
    let valid_until = created_at
        .checked_add_signed(Duration::days(i64::from(validity_days)))
        .unwrap_or(created_at);

    RecommendationPlan {
        plan_id: format!("plan_{user_id}_{session_id}_{}", created_at.timestamp()),
        user_id: user_id.to_string(),
        session_id: session_id.to_string(),
        overall_strategy: overall_strategy(&recommendations),
        implementation_order: implementation_order(&recommendations),
        monitoring_points: monitoring_points(&recommendations),
        follow_up_schedule: follow_up_schedule(&recommendations),
        recommendations,
        created_at,
        valid_until,
    }
}

fn implementation_order(recommendations: &[Recommendation]) -> Vec<String> {
    recommendations
        .iter()
        .sorted_by(|a, b| b.priority.cmp(&a.priority))
        .map(|r| r.id.to_string())
        .collect()
}

fn monitoring_points(recommendations: &[Recommendation]) -> Vec<String> {
    recommendations
        .iter()
        .filter_map(|r| match r.category {
            RecommendationType::Monitoring => Some(r.description.clone()),
            RecommendationType::Diet => Some(DIET_MONITORING.to_string()),
            RecommendationType::Exercise => Some(EXERCISE_MONITORING.to_string()),
            _ => None,
        })
        .unique()
        .collect()
}

/// Weekly then fortnightly when anything is high priority, otherwise fortnightly then monthly
fn follow_up_schedule(recommendations: &[Recommendation]) -> Vec<FollowUpCheckpoint> {
    let pressing = recommendations
        .iter()
        .any(|r| r.priority >= Priority::High);

    if pressing {
        vec![
            FollowUpCheckpoint::once("first_follow_up", 7),
            FollowUpCheckpoint::once("second_follow_up", 14),
            FollowUpCheckpoint::every("monthly_follow_up", 30),
        ]
    } else {
        vec![
            FollowUpCheckpoint::once("first_follow_up", 14),
            FollowUpCheckpoint::every("monthly_follow_up", 30),
        ]
    }
}

fn overall_strategy(recommendations: &[Recommendation]) -> String {
    let present = |category: RecommendationType| recommendations.iter().any(|r| r.category == category);

    let parts: Vec<&str> = [
        (RecommendationType::Diet, "improve the constitution through diet"),
        (RecommendationType::Exercise, "strengthen the body with suitable exercise"),
        (RecommendationType::Emotional, "attend to emotional regulation"),
        (RecommendationType::Lifestyle, "build a healthy lifestyle"),
    ]
    .into_iter()
    .filter(|(category, _)| present(*category))
    .map(|(_, part)| part)
    .collect();

    let strategy = if parts.is_empty() {
        "regulate the whole body".to_string()
    } else {
        parts.join("; ")
    };
    format!("Take a holistic TCM approach: {strategy}. Progress step by step and keep at it.")
}
