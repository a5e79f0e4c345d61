use std::fmt;

use crate::models::{
    common::{Acceleration3D, GRAVITY_MPS2, KinematicState, Position3D, Velocity3D},
    controller::{ControlAction, Controller, ControllerReport, MAX_ACCELERATION_G, MAX_BRAKING_G},
    moving_entity::MovingEntity,
    pedestrian::Pedestrian,
    sensor::Sensor,
    trajectory::TrajectoryTrack,
    traits::{IAgent, IMovable},
};
use tracing::{debug, info};

/// 車両の既定の幅・奥行き（m）
pub const DEFAULT_VEHICLE_SIZE_M: f64 = 2.0;

/// 1ティック分の車両処理結果
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VehicleTick {
    /// このティックで衝突したか
    pub impact: bool,
    /// このティックで歩行者を捕捉したか
    pub acquired: bool,
    /// コントローラが呼び出された場合の判断記録
    pub report: Option<ControllerReport>,
}

/// 車両エージェント
///
/// 移動体にセンサーと衝突リスクコントローラを組み合わせたエージェントです。
/// 毎ティック運動を積分して衝突判定を行い、100ティックごとのセンサーパケットで
/// 歩行者の捕捉、またはコントローラによる制動・加速の判断を行います。
#[derive(Debug, Clone)]
pub struct Vehicle {
    pub entity: MovingEntity,
    /// 幅（m、形状判定には未使用）
    pub width: f64,
    /// 奥行き（m、形状判定には未使用）
    pub depth: f64,
    pub controller: Controller,
    pub sensor: Sensor,
    /// ブレーキ作動中フラグ
    pub braking_on: bool,
    /// 毎ティックの加速度の大きさ（m/s²）
    pub acceleration_log: Vec<f64>,
    /// 毎ティックの歩行者までの距離（未捕捉時は0）
    pub distance_log: Vec<f64>,
}

impl Vehicle {
    pub fn new(
        name: impl Into<String>,
        width: f64,
        depth: f64,
        position: Position3D,
        velocity: Velocity3D,
    ) -> Self {
        let entity = MovingEntity::new(name, position, velocity);
        let sensor = Sensor::new(format!("{}_sensor", entity.name));
        Self {
            entity,
            width,
            depth,
            controller: Controller::new(),
            sensor,
            braking_on: false,
            acceleration_log: Vec::new(),
            distance_log: Vec::new(),
        }
    }

    pub fn with_trajectory(mut self, trajectory: Option<TrajectoryTrack>) -> Self {
        self.entity = self.entity.with_trajectory(trajectory);
        self
    }

    /// 1ティックの処理実行
    ///
    /// 運動積分 → 記録 → 衝突判定 → （パケット受信時）捕捉またはコントローラ判断
    pub fn tick(&mut self, pedestrian: &mut Pedestrian) -> VehicleTick {
        let mut result = VehicleTick::default();

        self.entity.advance();

        self.acceleration_log.push(self.entity.acceleration.magnitude_per_second());
        self.distance_log.push(
            self.sensor
                .get_distance(&self.entity, pedestrian)
                .unwrap_or(0.0),
        );

        if self.check_impact(pedestrian) {
            result.impact = true;
            return result;
        }

        if !self.sensor.packet_due() {
            return result;
        }

        match self.sensor.sample(&self.entity, pedestrian) {
            Some(reading) => {
                let report = self.controller.evaluate(&reading, &self.entity);
                self.take_action(report.action);
                result.report = Some(report);
            }
            None => {
                result.acquired = self.sensor.seek_pedestrian_threat(&self.entity, pedestrian);
            }
        }

        result
    }

    /// 現在位置での衝突判定
    ///
    /// 毎ティックの積分後に加え、実行開始時に初期配置に対しても呼び出されます。
    pub fn check_impact(&mut self, pedestrian: &mut Pedestrian) -> bool {
        if !self.sensor.check_impact(&mut self.entity, pedestrian) {
            return false;
        }
        info!(
            vehicle_id = %self.entity.name,
            pedestrian_id = %pedestrian.get_id(),
            time_ms = self.entity.time_ms,
            vehicle_speed_mps = self.entity.velocity.speed_mps(),
            "IMPACT: 車両が歩行者に衝突しました"
        );
        true
    }

    /// 制御アクションをアクチュエータに伝達
    pub fn take_action(&mut self, action: ControlAction) -> bool {
        match action {
            ControlAction::Brake(g) => self.apply_brake(g),
            ControlAction::Accelerate(g) => self.apply_gas(g),
            ControlAction::NoAction => false,
        }
    }

    /// ブレーキを作動
    ///
    /// 速度方向と逆向きに `G·g` の加速度を設定します（gは0.7で頭打ち）。
    /// 停止中は方向が定まらないため何もしません。
    ///
    /// # 戻り値
    ///
    /// アクチュエータが作動した場合はtrue
    pub fn apply_brake(&mut self, g: f64) -> bool {
        let g = g.min(MAX_BRAKING_G);
        let Some(direction) = self.entity.velocity.unit_vector() else {
            return false;
        };
        self.entity.acceleration = Acceleration3D::along(direction, -GRAVITY_MPS2 * g);
        self.braking_on = true;

        debug!(
            vehicle_id = %self.entity.name,
            g = g,
            time_ms = self.entity.time_ms,
            "BRAKE_APPLIED: ブレーキを作動しました"
        );
        true
    }

    /// アクセルを作動
    ///
    /// 速度方向に `G·g` の加速度を設定します（gは0.25で頭打ち）。
    /// 定常速度を超えた時点で移動体側のクランプにより惰性走行に戻ります。
    pub fn apply_gas(&mut self, g: f64) -> bool {
        let g = g.min(MAX_ACCELERATION_G);
        let Some(direction) = self.entity.velocity.unit_vector() else {
            return false;
        };
        self.entity.acceleration = Acceleration3D::along(direction, GRAVITY_MPS2 * g);
        self.braking_on = false;

        debug!(
            vehicle_id = %self.entity.name,
            g = g,
            time_ms = self.entity.time_ms,
            "GAS_APPLIED: アクセルを作動しました"
        );
        true
    }
}

impl IAgent for Vehicle {
    fn get_id(&self) -> String {
        self.entity.name.clone()
    }

    fn has_impacted(&self) -> bool {
        self.entity.impact
    }
}

impl IMovable for Vehicle {
    fn advance(&mut self) {
        self.entity.advance();
    }

    fn current_state(&self) -> KinematicState {
        self.entity.current_state()
    }
}

impl fmt::Display for Vehicle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Name: {}, Pos: {}, Vel: {}, Hit Ped: {}",
            self.entity.name,
            self.entity.position,
            self.entity.velocity.to_mps(),
            self.entity.impact
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn car() -> Vehicle {
        Vehicle::new(
            "car",
            DEFAULT_VEHICLE_SIZE_M,
            DEFAULT_VEHICLE_SIZE_M,
            Position3D::origin(),
            Velocity3D::from_mps(13.9, 0.0, 0.0),
        )
    }

    #[test]
    fn test_brake_is_capped_and_opposes_motion() {
        let mut vehicle = car();
        assert!(vehicle.apply_brake(3.0));
        assert!(vehicle.braking_on);
        assert_approx_eq!(vehicle.entity.acceleration.x, -GRAVITY_MPS2 * 0.7 / 1000.0);
        assert_approx_eq!(vehicle.entity.acceleration.y, 0.0);
    }

    #[test]
    fn test_gas_is_capped_and_clears_brake() {
        let mut vehicle = car();
        vehicle.apply_brake(0.1);
        assert!(vehicle.apply_gas(1.0));
        assert!(!vehicle.braking_on);
        assert_approx_eq!(vehicle.entity.acceleration.x, GRAVITY_MPS2 * 0.25 / 1000.0);
    }

    #[test]
    fn test_stationary_vehicle_ignores_actuation() {
        let mut vehicle = Vehicle::new("car", 2.0, 2.0, Position3D::origin(), Velocity3D::zero());
        assert!(!vehicle.take_action(ControlAction::Brake(0.5)));
        assert!(!vehicle.take_action(ControlAction::Accelerate(0.25)));
        assert_eq!(vehicle.entity.acceleration, Acceleration3D::zero());
        assert!(!vehicle.braking_on);
    }

    #[test]
    fn test_first_packet_acquires_then_controller_runs() {
        let mut vehicle = car();
        let mut ped = Pedestrian::new("ped", Position3D::new(50.0, 0.0, 0.0), Velocity3D::zero(), 0.5);

        let mut acquired_at = None;
        let mut first_report = None;
        for tick in 1..=200u64 {
            let result = vehicle.tick(&mut ped);
            if result.acquired {
                acquired_at = Some(tick);
            }
            if let Some(report) = result.report {
                first_report.get_or_insert((tick, report));
            }
        }

        assert_eq!(acquired_at, Some(100));
        let (tick, report) = first_report.unwrap();
        assert_eq!(tick, 200);
        assert_eq!(report.action, ControlAction::NoAction);
        assert_eq!(vehicle.acceleration_log.len(), 200);
        assert_eq!(vehicle.distance_log[0], 0.0);
        assert!(vehicle.distance_log[199] > 0.0);
    }

    #[test]
    fn test_check_impact_at_exact_radius_without_moving() {
        let mut vehicle = car();
        let mut ped = Pedestrian::new("ped", Position3D::new(0.3, 0.4, 0.0), Velocity3D::zero(), 0.5);

        assert!(vehicle.check_impact(&mut ped));
        assert!(vehicle.has_impacted());
        assert!(ped.has_impacted());
        assert_eq!(vehicle.entity.time_ms, 0);
        assert_eq!(vehicle.entity.position, Position3D::origin());
    }
}
