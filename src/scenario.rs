use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{DEFAULT_TIMEOUT_TICKS, PedestrianConfig, SimulationConfig, VehicleConfig};
use crate::error::ScenarioError;
use crate::models::{DEFAULT_PEDESTRIAN_RADIUS, DEFAULT_VEHICLE_SIZE_M, Position3D, TrajectoryTrack};
use tracing::warn;

/// シナリオメタデータ
#[derive(Debug, Deserialize, Serialize)]
pub struct ScenarioMeta {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// シミュレーション設定
#[derive(Debug, Deserialize, Serialize)]
pub struct SimSettings {
    #[serde(default = "default_timeout_ticks")]
    pub timeout_ticks: u64,
    #[serde(default)]
    pub pacing_ms: Option<u64>,
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            timeout_ticks: DEFAULT_TIMEOUT_TICKS,
            pacing_ms: None,
        }
    }
}

/// 3成分のベクトル（zは省略可）
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

/// 車両設定
#[derive(Debug, Deserialize, Serialize)]
pub struct VehicleSection {
    #[serde(default = "default_vehicle_name")]
    pub name: String,
    pub position_m: Vector3,
    pub velocity_mps: Vector3,
    #[serde(default = "default_vehicle_size")]
    pub width_m: f64,
    #[serde(default = "default_vehicle_size")]
    pub depth_m: f64,
    /// 軌道オーバーライドファイル（シナリオファイルからの相対パス）
    #[serde(default)]
    pub trajectory: Option<PathBuf>,
}

/// 歩行者設定
#[derive(Debug, Deserialize, Serialize)]
pub struct PedestrianSection {
    #[serde(default = "default_pedestrian_name")]
    pub name: String,
    pub position_m: Vector3,
    pub velocity_mps: Vector3,
    #[serde(default = "default_pedestrian_radius")]
    pub radius_m: f64,
    #[serde(default)]
    pub trajectory: Option<PathBuf>,
}

/// 完全なシナリオ設定
#[derive(Debug, Deserialize, Serialize)]
pub struct ScenarioConfig {
    pub meta: ScenarioMeta,
    #[serde(default)]
    pub sim: SimSettings,
    pub vehicle: VehicleSection,
    pub pedestrian: PedestrianSection,
    /// 軌道ファイルの基準ディレクトリ
    #[serde(skip)]
    pub base_dir: PathBuf,
}

fn default_timeout_ticks() -> u64 {
    DEFAULT_TIMEOUT_TICKS
}

fn default_vehicle_name() -> String {
    "car".to_string()
}

fn default_pedestrian_name() -> String {
    "ped".to_string()
}

fn default_vehicle_size() -> f64 {
    DEFAULT_VEHICLE_SIZE_M
}

fn default_pedestrian_radius() -> f64 {
    DEFAULT_PEDESTRIAN_RADIUS
}

impl ScenarioConfig {
    /// YAMLファイルからシナリオ設定を読み込み
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();

        // ファイル存在チェック
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.to_path_buf()));
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| ScenarioError::IoError(path.to_path_buf(), e))?;

        let mut config: ScenarioConfig = serde_yaml::from_str(&contents)
            .map_err(|e| ScenarioError::ParseError(path.to_path_buf(), e))?;
        config.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();

        config.validate()?;

        Ok(config)
    }

    /// YAML文字列から読み込み（軌道ファイルは `base_dir` からの相対パス）
    pub fn from_yaml_str(contents: &str, base_dir: impl Into<PathBuf>) -> Result<Self, ScenarioError> {
        let mut config: ScenarioConfig = serde_yaml::from_str(contents)
            .map_err(|e| ScenarioError::ParseError(PathBuf::from("<inline>"), e))?;
        config.base_dir = base_dir.into();
        config.validate()?;
        Ok(config)
    }

    /// 設定の基本的な検証
    ///
    /// 初期配置の検証はシミュレーション側の `validate()` で行います。
    pub fn validate(&self) -> Result<(), ScenarioError> {
        if !(self.pedestrian.radius_m > 0.0) {
            return Err(ScenarioError::ValidationError("radius_m must be positive".to_string()));
        }
        if self.vehicle.width_m < 0.0 || self.vehicle.depth_m < 0.0 {
            return Err(ScenarioError::ValidationError("vehicle size must not be negative".to_string()));
        }

        let vectors = [
            self.vehicle.position_m,
            self.vehicle.velocity_mps,
            self.pedestrian.position_m,
            self.pedestrian.velocity_mps,
        ];
        if vectors.iter().any(|v| !(v.x.is_finite() && v.y.is_finite() && v.z.is_finite())) {
            return Err(ScenarioError::ValidationError("positions and velocities must be finite".to_string()));
        }

        Ok(())
    }

    /// 実行設定に変換
    ///
    /// 軌道ファイルが読めない、または解析できない場合は警告を出して無視します。
    pub fn to_simulation_config(&self) -> SimulationConfig {
        let mut vehicle = VehicleConfig::new(
            to_position(self.vehicle.position_m),
            to_array(self.vehicle.velocity_mps),
        );
        vehicle.name = self.vehicle.name.clone();
        vehicle.width = self.vehicle.width_m;
        vehicle.depth = self.vehicle.depth_m;
        vehicle.trajectory = self.load_trajectory(self.vehicle.trajectory.as_deref());

        let mut pedestrian = PedestrianConfig::new(
            to_position(self.pedestrian.position_m),
            to_array(self.pedestrian.velocity_mps),
        )
        .with_radius(self.pedestrian.radius_m);
        pedestrian.name = self.pedestrian.name.clone();
        pedestrian.trajectory = self.load_trajectory(self.pedestrian.trajectory.as_deref());

        let mut config = SimulationConfig::new(self.meta.name.clone())
            .with_vehicle(vehicle)
            .with_pedestrian(pedestrian)
            .with_timeout(self.sim.timeout_ticks);
        config.pacing_ms = self.sim.pacing_ms;
        config
    }

    fn load_trajectory(&self, relative: Option<&Path>) -> Option<TrajectoryTrack> {
        let relative = relative?;
        let path = self.base_dir.join(relative);
        let name = relative.display().to_string();

        match fs::read_to_string(&path) {
            Ok(text) => Some(TrajectoryTrack::parse_or_invalid(name, &text)),
            Err(e) => {
                warn!(
                    track = %name,
                    path = %path.display(),
                    error = %e,
                    "TRAJECTORY_REJECTED: 軌道ファイルを読み込めません"
                );
                Some(TrajectoryTrack::invalid(name))
            }
        }
    }

    /// シナリオの概要を表示
    pub fn print_summary(&self) {
        println!("=== シナリオ情報 ===");
        println!("名前: {}", self.meta.name);
        if !self.meta.description.is_empty() {
            println!("説明: {}", self.meta.description);
        }
        println!();

        println!("=== シミュレーション設定 ===");
        println!("タイムアウト: {}ティック ({:.1}秒)", self.sim.timeout_ticks, self.sim.timeout_ticks as f64 / 1000.0);
        if let Some(pacing) = self.sim.pacing_ms {
            println!("実時間ウェイト: {}ms", pacing);
        }
        println!();

        println!("=== 車両 ===");
        println!("位置: {}", to_position(self.vehicle.position_m));
        println!("速度: ({:.2}, {:.2}, {:.2}) m/s", self.vehicle.velocity_mps.x, self.vehicle.velocity_mps.y, self.vehicle.velocity_mps.z);
        if let Some(trajectory) = &self.vehicle.trajectory {
            println!("軌道: {}", trajectory.display());
        }
        println!();

        println!("=== 歩行者 ===");
        println!("位置: {}", to_position(self.pedestrian.position_m));
        println!("速度: ({:.2}, {:.2}, {:.2}) m/s", self.pedestrian.velocity_mps.x, self.pedestrian.velocity_mps.y, self.pedestrian.velocity_mps.z);
        println!("衝突半径: {:.2}m", self.pedestrian.radius_m);
        if let Some(trajectory) = &self.pedestrian.trajectory {
            println!("軌道: {}", trajectory.display());
        }
    }
}

fn to_position(v: Vector3) -> Position3D {
    Position3D::new(v.x, v.y, v.z)
}

fn to_array(v: Vector3) -> [f64; 3] {
    [v.x, v.y, v.z]
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEMO: &str = "
meta:
  name: Case1
vehicle:
  position_m: { x: 0, y: 0 }
  velocity_mps: { x: 13.9, y: 0 }
pedestrian:
  position_m: { x: 35, y: -7 }
  velocity_mps: { x: 0, y: 1.67 }
";

    #[test]
    fn test_defaults_are_applied() {
        let scenario = ScenarioConfig::from_yaml_str(DEMO, ".").unwrap();
        assert_eq!(scenario.sim.timeout_ticks, 1_000_000);
        assert_eq!(scenario.pedestrian.radius_m, 0.5);
        assert_eq!(scenario.vehicle.width_m, 2.0);

        let config = scenario.to_simulation_config();
        assert_eq!(config, SimulationConfig::demo());
    }

    #[test]
    fn test_missing_trajectory_file_is_ignored() {
        let yaml = format!("{}  trajectory: does_not_exist.traj\n", DEMO);
        let scenario = ScenarioConfig::from_yaml_str(&yaml, std::env::temp_dir()).unwrap();
        let config = scenario.to_simulation_config();
        let track = config.pedestrian.unwrap().trajectory.unwrap();
        assert!(!track.is_valid());
    }

    #[test]
    fn test_rejects_non_positive_radius() {
        let yaml = format!("{}  radius_m: 0\n", DEMO);
        assert!(matches!(
            ScenarioConfig::from_yaml_str(&yaml, "."),
            Err(ScenarioError::ValidationError(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            ScenarioConfig::from_file("no/such/scenario.yaml"),
            Err(ScenarioError::FileNotFound(_))
        ));
    }
}
