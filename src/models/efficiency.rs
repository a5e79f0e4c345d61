use crate::models::{
    common::{Position3D, TICKS_PER_SECOND},
    moving_entity::MovingEntity,
    traits::IMovable,
    vehicle::Vehicle,
};

/// 効率ベースライン（ゴーストカー）
///
/// 歩行者を一切検知せずに定常速度で巡航し続けた場合の仮想車両です。
/// 制御判断には関与せず、実行後の効率算出にのみ使用します。
#[derive(Debug, Clone)]
pub struct EfficiencyTracker {
    ghost: MovingEntity,
    origin: Position3D,
}

impl EfficiencyTracker {
    /// 実行開始時の車両からゴーストを作成
    pub fn new(vehicle: &Vehicle) -> Self {
        let origin = vehicle.entity.position;
        Self {
            ghost: MovingEntity::new(
                format!("{}_ghost", vehicle.entity.name),
                origin,
                vehicle.entity.steady_state_velocity(),
            ),
            origin,
        }
    }

    /// ゴーストを1ティック進める
    pub fn advance(&mut self) {
        self.ghost.advance();
    }

    pub fn ghost(&self) -> &MovingEntity {
        &self.ghost
    }

    /// ゴーストの平均速度（m/s）
    pub fn baseline_speed_mps(&self) -> Option<f64> {
        let elapsed_s = self.ghost.time_ms as f64 / TICKS_PER_SECOND;
        (elapsed_s > 0.0).then(|| self.ghost.position.distance_to(&self.origin) / elapsed_s)
    }

    /// 効率（%）
    ///
    /// （実際の移動距離 / 経過時間）/ ゴーストの平均速度 × 100。
    /// 移動距離は開始位置からの正味の変位です。
    /// ゴーストが動いていない場合は定義できないためNoneを返します。
    pub fn efficiency_percent(&self, vehicle_position: Position3D, elapsed_ticks: u64) -> Option<f64> {
        if elapsed_ticks == 0 {
            return None;
        }
        let baseline = self.baseline_speed_mps().filter(|speed| *speed > 0.0)?;
        let elapsed_s = elapsed_ticks as f64 / TICKS_PER_SECOND;
        let actual_speed = vehicle_position.distance_to(&self.origin) / elapsed_s;
        Some(actual_speed / baseline * 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::common::Velocity3D;
    use assert_approx_eq::assert_approx_eq;

    fn car(speed_mps: f64) -> Vehicle {
        Vehicle::new("car", 2.0, 2.0, Position3D::origin(), Velocity3D::from_mps(speed_mps, 0.0, 0.0))
    }

    #[test]
    fn test_unobstructed_cruise_is_fully_efficient() {
        let mut vehicle = car(10.0);
        let mut tracker = EfficiencyTracker::new(&vehicle);
        for _ in 0..500 {
            vehicle.advance();
            tracker.advance();
        }
        assert_approx_eq!(tracker.baseline_speed_mps().unwrap(), 10.0, 1e-6);
        assert_approx_eq!(tracker.efficiency_percent(vehicle.entity.position, 500).unwrap(), 100.0, 1e-6);
    }

    #[test]
    fn test_halted_vehicle_halves_efficiency() {
        let vehicle = car(10.0);
        let mut tracker = EfficiencyTracker::new(&vehicle);
        for _ in 0..1000 {
            tracker.advance();
        }
        let halfway = Position3D::new(5.0, 0.0, 0.0);
        assert_approx_eq!(tracker.efficiency_percent(halfway, 1000).unwrap(), 50.0, 1e-6);
    }

    #[test]
    fn test_parked_ghost_has_no_baseline() {
        let vehicle = car(0.0);
        let mut tracker = EfficiencyTracker::new(&vehicle);
        tracker.advance();
        assert!(tracker.efficiency_percent(Position3D::origin(), 1).is_none());
        assert!(tracker.efficiency_percent(Position3D::origin(), 0).is_none());
    }
}
