//! # 実行設定
//!
//! 1回のシミュレーション実行を構成する不変の設定値です。
//! プロセス全体の状態は持たず、`Simulation::new` に渡して使用します。
//! 入力値は利用者向けの単位（m、m/s）で保持し、エージェント生成時に内部単位へ変換します。

use crate::models::{
    DEFAULT_PEDESTRIAN_RADIUS, DEFAULT_VEHICLE_SIZE_M, Pedestrian, Position3D, TrajectoryTrack,
    Vehicle, Velocity3D,
};

/// 既定のタイムアウト（ティック数）
pub const DEFAULT_TIMEOUT_TICKS: u64 = 1_000_000;

/// 車両設定
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleConfig {
    pub name: String,
    /// 初期位置（m）
    pub position: Position3D,
    /// 初期速度（m/s）。定常速度にもなる
    pub velocity_mps: [f64; 3],
    /// 幅（m）
    pub width: f64,
    /// 奥行き（m）
    pub depth: f64,
    /// 解析済みの軌道オーバーライド
    pub trajectory: Option<TrajectoryTrack>,
}

impl VehicleConfig {
    pub fn new(position: Position3D, velocity_mps: [f64; 3]) -> Self {
        Self {
            name: "car".to_string(),
            position,
            velocity_mps,
            width: DEFAULT_VEHICLE_SIZE_M,
            depth: DEFAULT_VEHICLE_SIZE_M,
            trajectory: None,
        }
    }

    pub fn with_trajectory(mut self, trajectory: TrajectoryTrack) -> Self {
        self.trajectory = Some(trajectory);
        self
    }

    /// 車両エージェントを生成
    pub fn build(&self) -> Vehicle {
        let [dx, dy, dz] = self.velocity_mps;
        Vehicle::new(
            self.name.clone(),
            self.width,
            self.depth,
            self.position,
            Velocity3D::from_mps(dx, dy, dz),
        )
        .with_trajectory(self.trajectory.clone())
    }
}

/// 歩行者設定
#[derive(Debug, Clone, PartialEq)]
pub struct PedestrianConfig {
    pub name: String,
    /// 初期位置（m）
    pub position: Position3D,
    /// 初期速度（m/s）。定常速度にもなる
    pub velocity_mps: [f64; 3],
    /// 衝突半径（m）
    pub radius: f64,
    /// 解析済みの軌道オーバーライド
    pub trajectory: Option<TrajectoryTrack>,
}

impl PedestrianConfig {
    pub fn new(position: Position3D, velocity_mps: [f64; 3]) -> Self {
        Self {
            name: "ped".to_string(),
            position,
            velocity_mps,
            radius: DEFAULT_PEDESTRIAN_RADIUS,
            trajectory: None,
        }
    }

    pub fn with_radius(mut self, radius: f64) -> Self {
        self.radius = radius;
        self
    }

    pub fn with_trajectory(mut self, trajectory: TrajectoryTrack) -> Self {
        self.trajectory = Some(trajectory);
        self
    }

    /// 歩行者エージェントを生成
    pub fn build(&self) -> Pedestrian {
        let [dx, dy, dz] = self.velocity_mps;
        Pedestrian::new(
            self.name.clone(),
            self.position,
            Velocity3D::from_mps(dx, dy, dz),
            self.radius,
        )
        .with_trajectory(self.trajectory.clone())
    }
}

/// シミュレーション実行設定
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    pub name: String,
    pub vehicle: Option<VehicleConfig>,
    pub pedestrian: Option<PedestrianConfig>,
    /// 最大ティック数
    pub timeout_ticks: u64,
    /// ティック間の実時間ウェイト（ms、観察用）
    pub pacing_ms: Option<u64>,
}

impl SimulationConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vehicle: None,
            pedestrian: None,
            timeout_ticks: DEFAULT_TIMEOUT_TICKS,
            pacing_ms: None,
        }
    }

    pub fn with_vehicle(mut self, vehicle: VehicleConfig) -> Self {
        self.vehicle = Some(vehicle);
        self
    }

    pub fn with_pedestrian(mut self, pedestrian: PedestrianConfig) -> Self {
        self.pedestrian = Some(pedestrian);
        self
    }

    pub fn with_timeout(mut self, timeout_ticks: u64) -> Self {
        self.timeout_ticks = timeout_ticks;
        self
    }

    /// 既定のデモケース
    ///
    /// 車両は(0, 0)からx正方向に13.9m/s、歩行者は(35, -7)からy正方向に1.67m/sで移動します。
    pub fn demo() -> Self {
        Self::new("Case1")
            .with_vehicle(VehicleConfig::new(Position3D::new(0.0, 0.0, 0.0), [13.9, 0.0, 0.0]))
            .with_pedestrian(PedestrianConfig::new(Position3D::new(35.0, -7.0, 0.0), [0.0, 1.67, 0.0]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::IAgent;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_build_converts_to_internal_units() {
        let config = SimulationConfig::demo();
        let vehicle = config.vehicle.as_ref().unwrap().build();
        assert_approx_eq!(vehicle.entity.velocity.x, 0.0139);
        assert_eq!(vehicle.entity.steady_state_velocity(), vehicle.entity.velocity);

        let pedestrian = config.pedestrian.as_ref().unwrap().build();
        assert_eq!(pedestrian.get_id(), "ped");
        assert_approx_eq!(pedestrian.radius, 0.5);
        assert_approx_eq!(pedestrian.entity.velocity.y, 0.00167);
    }

    #[test]
    fn test_defaults() {
        let config = SimulationConfig::new("empty");
        assert_eq!(config.timeout_ticks, 1_000_000);
        assert!(config.vehicle.is_none());
        assert!(config.pedestrian.is_none());
        assert!(config.pacing_ms.is_none());
    }
}
