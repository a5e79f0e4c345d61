use crate::models::{
    common::{GRAVITY_MPS2, Position3D, TICKS_PER_SECOND, Velocity3D},
    moving_entity::MovingEntity,
    sensor::SensorReading,
};
use tracing::debug;

/// 最大制動（Gに対する割合）
pub const MAX_BRAKING_G: f64 = 0.7;

/// 最大加速（Gに対する割合）
pub const MAX_ACCELERATION_G: f64 = 0.25;

/// 予測ホライズン（ms）。センサーパケット間隔と同じ
pub const PROJECTION_HORIZON_MS: f64 = 100.0;

/// 制動強度の係数
const BRAKING_GAIN: f64 = 0.02;

/// 制御アクション
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlAction {
    /// Gに対する割合で制動
    Brake(f64),
    /// Gに対する割合で加速
    Accelerate(f64),
    /// 何もしない
    NoAction,
}

/// 衝突リスク評価
///
/// 距離はm、速度はm/s、時間は秒で表します。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskAssessment {
    /// 現在の距離
    pub current_distance: f64,
    /// 100ms後の予測距離
    pub projected_distance: f64,
    /// 接近速度（正なら接近中）
    pub approach_rate_mps: f64,
    /// 衝突までの時間（接近していない場合はNone）
    pub time_to_impact_s: Option<f64>,
    /// 最大制動で停止するまでの時間
    pub time_to_stop_s: f64,
    /// 最大制動での停止距離
    pub stopping_distance: f64,
    /// 現在の車両速度
    pub vehicle_speed_mps: f64,
}

impl RiskAssessment {
    pub fn is_approaching(&self) -> bool {
        self.approach_rate_mps > 0.0
    }
}

/// コントローラ1回分の判断記録
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerReport {
    /// 判断時刻（車両の内部時計、ms）
    pub time_ms: u64,
    pub vehicle_position: Position3D,
    /// 車両から見た歩行者の相対位置
    pub relative_position: Position3D,
    /// 車両速度（m/s）
    pub vehicle_velocity_mps: Velocity3D,
    /// 歩行者速度（m/s）
    pub pedestrian_velocity_mps: Velocity3D,
    pub assessment: RiskAssessment,
    pub action: ControlAction,
}

/// 等速を仮定した位置の予測
///
/// # 引数
///
/// * `position` - 現在位置
/// * `velocity` - 速度（m/ms）
/// * `time_ms` - 予測時間（ms）
pub fn projection(position: Position3D, velocity: Velocity3D, time_ms: f64) -> Position3D {
    position + velocity * time_ms
}

/// 衝突リスクコントローラ
///
/// センサーパケットごと（100ms間隔）に呼び出され、両エージェントの
/// 100ms後の位置を等速で予測して制動・加速を決定します。
#[derive(Debug, Clone, Default)]
pub struct Controller;

impl Controller {
    pub fn new() -> Self {
        Self
    }

    /// 衝突リスクを評価
    ///
    /// 車両を相対座標の原点に置き、歩行者の相対位置と絶対速度から
    /// 100ms後の相対ベクトルを求めます。
    pub fn assess(&self, reading: &SensorReading, vehicle_velocity: Velocity3D) -> RiskAssessment {
        let current_distance = reading.relative_position.distance_to_origin();

        let pedestrian_projected = projection(
            reading.relative_position,
            reading.pedestrian_velocity,
            PROJECTION_HORIZON_MS,
        );
        let vehicle_projected = projection(Position3D::origin(), vehicle_velocity, PROJECTION_HORIZON_MS);
        let projected_distance = (pedestrian_projected - vehicle_projected).distance_to_origin();

        // m/ms
        let rate = (current_distance - projected_distance) / PROJECTION_HORIZON_MS;
        let approach_rate_mps = rate * TICKS_PER_SECOND;

        let time_to_impact_s = (approach_rate_mps > 0.0).then(|| current_distance / approach_rate_mps);

        let max_decel = GRAVITY_MPS2 * MAX_BRAKING_G;
        let vehicle_speed_mps = vehicle_velocity.speed_mps();
        let time_to_stop_s = vehicle_speed_mps / max_decel;
        let stopping_distance = (max_decel / 2.0) * time_to_stop_s.powi(2);

        RiskAssessment {
            current_distance,
            projected_distance,
            approach_rate_mps,
            time_to_impact_s,
            time_to_stop_s,
            stopping_distance,
            vehicle_speed_mps,
        }
    }

    /// 評価結果から制御アクションを決定
    ///
    /// 接近中で停止距離が予測距離を超える場合は制動、そうでなければ
    /// 巡航速度未満のときに一定の加速を行います。
    pub fn decide(&self, assessment: &RiskAssessment, below_cruise: bool) -> ControlAction {
        if assessment.is_approaching() && assessment.stopping_distance > assessment.projected_distance {
            let how_much = if assessment.projected_distance > 0.0 {
                (assessment.stopping_distance / assessment.projected_distance) * MAX_BRAKING_G * BRAKING_GAIN
            } else {
                MAX_BRAKING_G
            };
            return ControlAction::Brake(how_much);
        }

        if below_cruise {
            ControlAction::Accelerate(MAX_ACCELERATION_G)
        } else {
            ControlAction::NoAction
        }
    }

    /// センサー観測値から判断記録を作成
    pub fn evaluate(&self, reading: &SensorReading, vehicle: &MovingEntity) -> ControllerReport {
        let assessment = self.assess(reading, vehicle.velocity);
        let action = self.decide(&assessment, vehicle.is_below_steady_state());

        debug!(
            time_ms = vehicle.time_ms,
            vehicle_position = %vehicle.position,
            relative_position = %reading.relative_position,
            vehicle_velocity = %vehicle.velocity.to_mps(),
            pedestrian_velocity = %reading.pedestrian_velocity.to_mps(),
            time_to_impact_s = ?assessment.time_to_impact_s,
            time_to_stop_s = assessment.time_to_stop_s,
            current_distance = assessment.current_distance,
            projected_distance = assessment.projected_distance,
            vehicle_speed_mps = assessment.vehicle_speed_mps,
            approach_rate_mps = assessment.approach_rate_mps,
            action = ?action,
            "CONTROLLER_DECISION: 衝突リスクを評価しました"
        );

        ControllerReport {
            time_ms: vehicle.time_ms,
            vehicle_position: vehicle.position,
            relative_position: reading.relative_position,
            vehicle_velocity_mps: vehicle.velocity.to_mps(),
            pedestrian_velocity_mps: reading.pedestrian_velocity.to_mps(),
            assessment,
            action,
        }
    }
}
