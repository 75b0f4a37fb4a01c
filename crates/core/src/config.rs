use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Vertical placement strategy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DecisionMode {
    Cpu,
    Deadline,
    Count,
    Weighted,
}

impl DecisionMode {
    pub const ALL: [DecisionMode; 4] = [
        DecisionMode::Cpu,
        DecisionMode::Deadline,
        DecisionMode::Count,
        DecisionMode::Weighted,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DecisionMode::Cpu => "cpu",
            DecisionMode::Deadline => "deadline",
            DecisionMode::Count => "count",
            DecisionMode::Weighted => "weighted",
        }
    }
}

impl std::str::FromStr for DecisionMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DecisionMode::ALL
            .into_iter()
            .find(|mode| mode.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CoreError::Config(format!("unknown decision mode '{}'", s)))
    }
}

impl std::fmt::Display for DecisionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-factor weights of the weighted strategy. They are used as given and
/// need not sum to 1.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WeightConfig {
    pub cpu: f64,
    pub deadline: f64,
    pub computation: f64,
    pub task_count: f64,
}

impl Default for WeightConfig {
    fn default() -> Self {
        Self {
            cpu: 0.4,
            deadline: 0.3,
            computation: 0.2,
            task_count: 0.1,
        }
    }
}

impl WeightConfig {
    pub fn total(&self) -> f64 {
        self.cpu + self.deadline + self.computation + self.task_count
    }
}

/// Deadline range the weighted deadline sub-score maps linearly onto 100..0.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DeadlineDomain {
    pub min_secs: f64,
    pub max_secs: f64,
}

impl Default for DeadlineDomain {
    fn default() -> Self {
        Self {
            min_secs: 0.5,
            max_secs: 10.0,
        }
    }
}

/// Vertical balancer configuration. Read once at construction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BalancerConfig {
    /// Root load (%) above which the cpu strategy offloads.
    pub cpu_threshold: f64,
    /// Deadline (seconds) above which the deadline strategy offloads.
    pub deadline_threshold: f64,
    /// Consecutive edge tasks before the count strategy offloads one.
    pub count_threshold: u32,
    pub mode: DecisionMode,
    pub weights: WeightConfig,
    /// Weighted score (0-100) at or above which a task goes to the cloud.
    pub cloud_threshold: f64,
    pub deadline_domain: DeadlineDomain,
    /// Rescale present sub-scores to the full weight sum when the deadline
    /// or model term is absent. Off: absent terms simply contribute zero.
    pub renormalize_absent_weights: bool,
}

impl Default for BalancerConfig {
    fn default() -> Self {
        Self {
            cpu_threshold: 33.0,
            deadline_threshold: 7.0,
            count_threshold: 25,
            mode: DecisionMode::Weighted,
            weights: WeightConfig::default(),
            cloud_threshold: 60.0,
            deadline_domain: DeadlineDomain::default(),
            renormalize_absent_weights: false,
        }
    }
}

impl BalancerConfig {
    pub fn validate(&self) -> Result<(), CoreError> {
        let finite = [
            ("cpu_threshold", self.cpu_threshold),
            ("deadline_threshold", self.deadline_threshold),
            ("cloud_threshold", self.cloud_threshold),
            ("weights.cpu", self.weights.cpu),
            ("weights.deadline", self.weights.deadline),
            ("weights.computation", self.weights.computation),
            ("weights.task_count", self.weights.task_count),
            ("deadline_domain.min_secs", self.deadline_domain.min_secs),
            ("deadline_domain.max_secs", self.deadline_domain.max_secs),
        ];
        for (name, value) in finite {
            if !value.is_finite() {
                return Err(CoreError::Config(format!("{} must be finite", name)));
            }
        }

        let w = &self.weights;
        if [w.cpu, w.deadline, w.computation, w.task_count]
            .iter()
            .any(|&v| v < 0.0)
        {
            return Err(CoreError::Config("weights must be non-negative".into()));
        }

        if self.deadline_domain.max_secs <= self.deadline_domain.min_secs {
            return Err(CoreError::Config(format!(
                "deadline_domain is empty: [{}, {}]",
                self.deadline_domain.min_secs, self.deadline_domain.max_secs
            )));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CloudConfig {
    pub min_latency_secs: f64,
    pub max_latency_secs: f64,
    /// Probability that the cloud is reachable for a given request.
    pub success_rate: f64,
    pub processing_secs: f64,
    /// Requests closer together than this are held back by the gateway.
    pub min_request_interval_secs: f64,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            min_latency_secs: 0.1,
            max_latency_secs: 0.3,
            success_rate: 0.95,
            processing_secs: 0.05,
            min_request_interval_secs: 0.1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EdgeConfig {
    pub processing_secs: f64,
    /// Extra time spent when the root has a model to run.
    pub model_processing_secs: f64,
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            processing_secs: 0.1,
            model_processing_secs: 0.2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeviceConfig {
    pub id: String,
    pub cpu_speed_ghz: f64,
    pub cores: u32,
}

impl DeviceConfig {
    fn new(id: &str, cpu_speed_ghz: f64, cores: u32) -> Self {
        Self {
            id: id.to_string(),
            cpu_speed_ghz,
            cores,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DevicesConfig {
    pub root: DeviceConfig,
    pub edges: Vec<DeviceConfig>,
}

impl Default for DevicesConfig {
    fn default() -> Self {
        Self {
            root: DeviceConfig::new("root", 1.4, 4),
            edges: vec![
                DeviceConfig::new("edge1", 1.2, 4),
                DeviceConfig::new("edge2", 2.4, 4),
                DeviceConfig::new("edge3", 1.0, 2),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TaskGenConfig {
    pub min_deadline_secs: f64,
    pub max_deadline_secs: f64,
    pub sensitive_ratio: f64,
}

impl Default for TaskGenConfig {
    fn default() -> Self {
        Self {
            min_deadline_secs: 0.5,
            max_deadline_secs: 10.0,
            sensitive_ratio: 0.2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExperimentConfig {
    pub num_tasks: usize,
    pub modes: Vec<DecisionMode>,
    pub model: String,
    pub save_results: bool,
    pub results_file: String,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            num_tasks: 1000,
            modes: DecisionMode::ALL.to_vec(),
            model: "alexnet".to_string(),
            save_results: true,
            results_file: "results.json".to_string(),
        }
    }
}

/// Top-level configuration aggregating all sub-configs.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct TieredConfig {
    #[serde(default)]
    pub vertical: BalancerConfig,
    #[serde(default)]
    pub cloud: CloudConfig,
    #[serde(default)]
    pub edge: EdgeConfig,
    #[serde(default)]
    pub devices: DevicesConfig,
    #[serde(default)]
    pub tasks: TaskGenConfig,
    #[serde(default)]
    pub experiment: ExperimentConfig,
}

/// Load configuration from a TOML file.
/// Falls back to defaults if the file doesn't exist or fails to parse.
pub fn load_config(path: &str) -> TieredConfig {
    match std::fs::read_to_string(path) {
        Ok(contents) => match parse_config(&contents) {
            Ok(config) => {
                tracing::info!("Loaded config from {}", path);
                config
            }
            Err(e) => {
                tracing::warn!("Failed to parse config {}: {}, using defaults", path, e);
                TieredConfig::default()
            }
        },
        Err(_) => {
            tracing::debug!("Config file {} not found, using defaults", path);
            TieredConfig::default()
        }
    }
}

/// Parse and validate a TOML configuration document.
pub fn parse_config(contents: &str) -> Result<TieredConfig, CoreError> {
    let config: TieredConfig = toml::from_str(contents)?;
    config.vertical.validate()?;
    Ok(config)
}

/// Save configuration to a TOML file.
/// Creates parent directories if they don't exist.
pub fn save_config(config: &TieredConfig, path: &str) -> Result<(), CoreError> {
    let path = std::path::Path::new(path);

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    tracing::info!("Config saved to {:?}", path);
    Ok(())
}
