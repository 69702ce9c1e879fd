//! Clinic analytics responses and the chart series derived from them.

use serde::{Deserialize, Serialize};

/// `GET /api/clinic-analytics/dashboard`
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardMetrics {
    pub today_appointments: u32,
    pub completed_today: u32,
    pub cancelled_today: u32,
    pub no_show_today: u32,
    pub completion_rate: f64,
    pub pending_intakes: u32,
    pub total_patients: u32,
    pub new_patients_this_month: u32,
    pub estimated_revenue: f64,
    pub no_show_rate: f64,
    pub average_wait_time: f64,
    pub staff_utilization: f64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConditionCount {
    pub condition: String,
    pub count: u32,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BodyRegionCount {
    pub region: String,
    pub count: u32,
    #[serde(default)]
    pub avg_intensity: f64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentTrend {
    pub date: String,
    #[serde(default)]
    pub scheduled: u32,
    #[serde(default)]
    pub completed: u32,
    #[serde(default)]
    pub cancelled: u32,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PromCompletion {
    pub week: String,
    #[serde(default)]
    pub completed: u32,
    #[serde(default)]
    pub pending: u32,
    #[serde(default)]
    pub completion_rate: f64,
}

/// `GET /api/clinic-analytics/clinical`
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ClinicalAnalytics {
    pub average_prom_score: f64,
    pub total_evaluations: u32,
    pub top_conditions: Vec<ConditionCount>,
    pub average_pain_intensity: f64,
    pub body_region_distribution: Vec<BodyRegionCount>,
    pub patient_improvement_rate: f64,
    pub total_patients_tracked: u32,
    pub appointment_trends: Vec<AppointmentTrend>,
    pub prom_completion_data: Vec<PromCompletion>,
    pub patient_satisfaction: Option<f64>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PainPoint3D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub intensity: u8,
    #[serde(default)]
    pub body_region: Option<String>,
    #[serde(default)]
    pub pain_type: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TypeCount {
    #[serde(rename = "type")]
    pub kind: String,
    pub count: u32,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RangeCount {
    pub range: String,
    pub count: u32,
}

/// `GET /api/clinic-analytics/pain-maps`
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PainMapAnalytics {
    pub total_pain_maps: u32,
    #[serde(rename = "painPoints3D")]
    pub pain_points_3d: Vec<PainPoint3D>,
    pub pain_type_distribution: Vec<TypeCount>,
    pub intensity_distribution: Vec<RangeCount>,
    pub average_intensity: f64,
    pub most_common_region: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct HealthMetric {
    pub id: String,
    pub category: Option<String>,
    pub name: String,
    pub value: Option<f64>,
    pub unit: Option<String>,
    pub trend: Option<String>,
    pub percentage_change: Option<f64>,
    pub status: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PromTemplateStats {
    pub template_name: String,
    pub total_count: u32,
    pub completed_count: u32,
    pub completion_rate: f64,
    pub average_score: Option<f64>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct HealthGoal {
    pub id: String,
    pub title: String,
    pub category: Option<String>,
    pub target: f64,
    pub current: f64,
    pub unit: Option<String>,
    pub progress: f64,
    pub status: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct MetricCorrelation {
    pub metric1: String,
    pub metric2: String,
    pub correlation: f64,
    pub significance: Option<String>,
}

/// `GET /api/clinic-analytics/unified?days=N`
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct UnifiedAnalytics {
    pub health_metrics: Vec<HealthMetric>,
    pub prom_analytics: Vec<PromTemplateStats>,
    pub health_goals: Vec<HealthGoal>,
    pub correlations: Vec<MetricCorrelation>,
}

/// One slice of the condition share chart.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ConditionShare {
    pub name: String,
    pub value: u32,
    pub percentage: f64,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct AppointmentPoint {
    pub name: String,
    pub scheduled: u32,
    pub completed: u32,
    pub cancelled: u32,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct CompletionPoint {
    pub name: String,
    pub completed: u32,
    pub pending: u32,
    pub completion_rate: f64,
}

const TOP_CONDITIONS: usize = 5;

impl ClinicalAnalytics {
    /// Share of the five most frequent conditions, relative to all listed conditions.
    pub fn condition_shares(&self) -> Vec<ConditionShare> {
        let total: u32 = self.top_conditions.iter().map(|c| c.count).sum();
        let total = if total == 0 { 1 } else { total };

        self.top_conditions
            .iter()
            .take(TOP_CONDITIONS)
            .map(|c| ConditionShare {
                name: c.condition.clone(),
                value: c.count,
                percentage: f64::from(c.count) / f64::from(total) * 100.0,
            })
            .collect()
    }

    pub fn appointment_series(&self) -> Vec<AppointmentPoint> {
        self.appointment_trends
            .iter()
            .map(|t| AppointmentPoint {
                name: t.date.clone(),
                scheduled: t.scheduled,
                completed: t.completed,
                cancelled: t.cancelled,
            })
            .collect()
    }

    /// Completed/pending as percentages of each week, the pending bar filling up to 100.
    pub fn prom_completion_series(&self) -> Vec<CompletionPoint> {
        self.prom_completion_data
            .iter()
            .map(|p| {
                let completed = p.completion_rate.round().clamp(0.0, 100.0) as u32;
                CompletionPoint {
                    name: p.week.clone(),
                    completed,
                    pending: 100 - completed,
                    completion_rate: p.completion_rate,
                }
            })
            .collect()
    }
}

impl PainMapAnalytics {
    /// Bucket the raw pain points into the `1-3`, `4-6`, `7-10` intensity bands.
    pub fn intensity_buckets(&self) -> Vec<RangeCount> {
        let mut counts = [0u32; 3];
        for point in &self.pain_points_3d {
            match point.intensity {
                1..=3 => counts[0] += 1,
                4..=6 => counts[1] += 1,
                7..=10 => counts[2] += 1,
                _ => {}
            }
        }
        ["1-3", "4-6", "7-10"]
            .iter()
            .zip(counts)
            .map(|(range, count)| RangeCount {
                range: (*range).to_string(),
                count,
            })
            .collect()
    }
}
