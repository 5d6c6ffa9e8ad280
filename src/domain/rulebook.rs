use serde::{Deserialize, Serialize};

/// Competition thresholds for one run. An absent field is unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RulebookConfig {
    /// Required prefix for folder, UI name, `SCREEN_NAME` and KN5 file names.
    pub name_prefix: Option<String>,
    pub min_year: Option<i64>,
    pub enforce_body_types: bool,
    pub allowed_body_types: Vec<String>,
    pub forbidden_body_types: Vec<String>,
    pub require_rwd: bool,
    pub min_total_mass_kg: Option<f64>,
    pub front_bias_target: Option<f64>,
    pub rear_tyre_max_mm: Option<i64>,
    pub front_tyre_range_mm: Option<(i64, i64)>,
    pub max_kn5_mb: Option<f64>,
    pub max_skin_mb: Option<f64>,
    pub max_triangles: Option<i64>,
    pub max_objects: Option<i64>,
    pub max_steer_angle_deg: Option<f64>,
    pub require_steer_measurement: bool,
    /// Shell template with `{car}` and `{out}` placeholders.
    pub steer_measurement_cmd: Option<String>,
    pub require_kn5_stats: bool,
    pub kn5_stats_cmd: Option<String>,
    pub external_timeout_secs: Option<u64>,
    pub fallback_reference_key: Option<String>,
}

pub const DEFAULT_EXTERNAL_TIMEOUT_SECS: u64 = 30;

impl RulebookConfig {
    pub fn competition() -> Self {
        Self {
            name_prefix: Some("EFVD".to_string()),
            min_year: Some(1965),
            enforce_body_types: true,
            allowed_body_types: [
                "coupe",
                "sedan",
                "convertible",
                "hatchback",
                "estate",
                "wagon",
                "ute",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            forbidden_body_types: vec!["truck".to_string(), "suv".to_string()],
            require_rwd: true,
            min_total_mass_kg: Some(1300.0),
            front_bias_target: Some(0.52),
            rear_tyre_max_mm: Some(265),
            front_tyre_range_mm: Some((225, 265)),
            max_kn5_mb: Some(60.0),
            max_skin_mb: Some(30.0),
            max_triangles: Some(500_000),
            max_objects: Some(300),
            max_steer_angle_deg: Some(70.0),
            ..Self::default()
        }
    }

    pub fn external_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(
            self.external_timeout_secs
                .unwrap_or(DEFAULT_EXTERNAL_TIMEOUT_SECS),
        )
    }
}
