use anyhow::{anyhow, Error};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Class-year category of a student
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AcademicLevel {
    Freshman,
    Sophomore,
    Junior,
    Senior,
    Graduate,
}

impl AcademicLevel {
    pub const ALL: [AcademicLevel; 5] = [
        AcademicLevel::Freshman,
        AcademicLevel::Sophomore,
        AcademicLevel::Junior,
        AcademicLevel::Senior,
        AcademicLevel::Graduate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AcademicLevel::Freshman => "Freshman",
            AcademicLevel::Sophomore => "Sophomore",
            AcademicLevel::Junior => "Junior",
            AcademicLevel::Senior => "Senior",
            AcademicLevel::Graduate => "Graduate",
        }
    }
}

impl fmt::Display for AcademicLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AcademicLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AcademicLevel::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| anyhow!("Unknown academic level: {}", s))
    }
}

/// A student on a teacher's roster. Read-only to the clustering engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub major: String,
    pub academic_level: AcademicLevel,
    #[serde(default)]
    pub gpa: Option<f64>,
    #[serde(default)]
    pub career_interests: Vec<String>,
}

impl Student {
    pub fn new(id: &str, major: &str, academic_level: AcademicLevel) -> Self {
        Student {
            id: id.to_string(),
            major: major.to_string(),
            academic_level,
            gpa: None,
            career_interests: Vec::new(),
        }
    }

    pub fn with_gpa(mut self, gpa: f64) -> Self {
        self.gpa = Some(gpa);
        self
    }

    pub fn with_interests(mut self, interests: &[&str]) -> Self {
        self.career_interests = interests.iter().map(|i| i.to_string()).collect();
        self
    }

    /// GPA if it is known and inside the 0.0 - 4.0 scale
    pub fn known_gpa(&self) -> Option<f64> {
        self.gpa
            .filter(|gpa| gpa.is_finite() && (0.0..=4.0).contains(gpa))
    }
}

/// Partitioning strategy. Unknown names are rejected when parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusteringStrategy {
    #[default]
    MajorLevel,
    GpaInterests,
    Custom,
}

impl ClusteringStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClusteringStrategy::MajorLevel => "major_level",
            ClusteringStrategy::GpaInterests => "gpa_interests",
            ClusteringStrategy::Custom => "custom",
        }
    }
}

impl fmt::Display for ClusteringStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClusteringStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "major_level" => Ok(ClusteringStrategy::MajorLevel),
            "gpa_interests" => Ok(ClusteringStrategy::GpaInterests),
            "custom" => Ok(ClusteringStrategy::Custom),
            other => Err(anyhow!(
                "Unknown clustering strategy '{}' (expected major_level, gpa_interests or custom)",
                other
            )),
        }
    }
}

/// Configuration for a clustering run.
///
/// Callers must keep `min_cluster_size <= max_cluster_size`; the engine does not check it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusteringOptions {
    pub strategy: ClusteringStrategy,
    pub max_cluster_size: usize,
    pub min_cluster_size: usize,
    // Accepted and recorded, but no strategy weights anything by them yet.
    #[serde(default)]
    pub gpa_weight: Option<f64>,
    #[serde(default)]
    pub interest_weight: Option<f64>,
    /// Opaque input for a plugged-in custom strategy
    #[serde(default)]
    pub custom_criteria: Option<serde_json::Value>,
}

impl Default for ClusteringOptions {
    fn default() -> Self {
        ClusteringOptions {
            strategy: ClusteringStrategy::MajorLevel,
            max_cluster_size: 15,
            min_cluster_size: 5,
            gpa_weight: None,
            interest_weight: None,
            custom_criteria: None,
        }
    }
}

impl ClusteringOptions {
    pub fn new(strategy: ClusteringStrategy, min_cluster_size: usize, max_cluster_size: usize) -> Self {
        ClusteringOptions {
            strategy,
            max_cluster_size,
            min_cluster_size,
            ..Default::default()
        }
    }
}

/// Fixed GPA bands used by the `gpa_interests` strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GpaBand {
    HighPerformers,
    Strong,
    Developing,
    AtRisk,
}

impl GpaBand {
    /// Bands in the order clusters are emitted
    pub const ALL: [GpaBand; 4] = [
        GpaBand::HighPerformers,
        GpaBand::Strong,
        GpaBand::Developing,
        GpaBand::AtRisk,
    ];

    /// Band for a GPA on the 0.0 - 4.0 scale. Anything else has no band.
    pub fn for_gpa(gpa: f64) -> Option<GpaBand> {
        if !gpa.is_finite() || !(0.0..=4.0).contains(&gpa) {
            None
        } else if gpa >= 3.5 {
            Some(GpaBand::HighPerformers)
        } else if gpa >= 3.0 {
            Some(GpaBand::Strong)
        } else if gpa >= 2.5 {
            Some(GpaBand::Developing)
        } else {
            Some(GpaBand::AtRisk)
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            GpaBand::HighPerformers => "High Performers",
            GpaBand::Strong => "Strong",
            GpaBand::Developing => "Developing",
            GpaBand::AtRisk => "At-Risk",
        }
    }

    pub fn range_label(&self) -> &'static str {
        match self {
            GpaBand::HighPerformers => "3.5-4.0",
            GpaBand::Strong => "3.0-3.49",
            GpaBand::Developing => "2.5-2.99",
            GpaBand::AtRisk => "0-2.49",
        }
    }
}

impl fmt::Display for GpaBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Coarse learning-style label derived from majors and interests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LearningStyle {
    Analytical,
    Creative,
    Quantitative,
    #[serde(rename = "Research-Oriented")]
    ResearchOriented,
    Practical,
}

impl fmt::Display for LearningStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LearningStyle::Analytical => write!(f, "Analytical"),
            LearningStyle::Creative => write!(f, "Creative"),
            LearningStyle::Quantitative => write!(f, "Quantitative"),
            LearningStyle::ResearchOriented => write!(f, "Research-Oriented"),
            LearningStyle::Practical => write!(f, "Practical"),
        }
    }
}

/// Aggregate view of a cluster's membership
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterCharacteristics {
    #[serde(rename = "averageGPA")]
    pub average_gpa: f64,
    pub common_interests: Vec<String>,
    pub major_distribution: BTreeMap<String, usize>,
    pub dominant_major: Option<String>,
    pub learning_style: LearningStyle,
}

/// Partition keys that produced a cluster, kept for traceability
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterCriteria {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub major: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub academic_level: Option<AcademicLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpa_band: Option<GpaBand>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interest: Option<String>,
    /// 1-based sub-group index when an oversized group was split
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<usize>,
}

/// A group of students produced by one clustering run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    pub name: String,
    pub description: String,
    pub characteristics: ClusterCharacteristics,
    pub student_ids: Vec<String>,
    pub criteria: ClusterCriteria,
}

impl Cluster {
    pub fn size(&self) -> usize {
        self.student_ids.len()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusteringSummary {
    pub total_clusters: usize,
    pub total_students: usize,
    pub average_cluster_size: f64,
    pub ungrouped_students: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusteringResult {
    pub clusters: Vec<Cluster>,
    pub summary: ClusteringSummary,
}
