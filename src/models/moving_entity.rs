use std::cmp::Ordering;

use crate::models::{
    common::{Acceleration3D, KinematicState, Position3D, Velocity3D},
    trajectory::TrajectoryTrack,
    traits::IMovable,
};
use tracing::trace;

/// 移動体
///
/// 車両と歩行者が共有する運動積分器です。1ティック（1ms）ごとに
/// オイラー法で速度と位置を更新し、定常速度を超えないようにクランプします。
/// 軌道オーバーライドが設定されている場合、内部時計が遷移時刻に一致した
/// ティックで速度と加速度を置き換えます。
#[derive(Debug, Clone)]
pub struct MovingEntity {
    pub name: String,
    pub position: Position3D,
    pub velocity: Velocity3D,
    pub acceleration: Acceleration3D,
    /// 構築時に決まる巡航速度（変更されない）
    steady_state_velocity: Velocity3D,
    /// 内部時計（ms）
    pub time_ms: u64,
    pub impact: bool,
    pub trajectory: Option<TrajectoryTrack>,
}

impl MovingEntity {
    /// 新しい移動体を作成します
    ///
    /// 初期速度がそのまま定常速度になります。
    pub fn new(name: impl Into<String>, position: Position3D, velocity: Velocity3D) -> Self {
        Self {
            name: name.into(),
            position,
            velocity,
            acceleration: Acceleration3D::zero(),
            steady_state_velocity: velocity,
            time_ms: 0,
            impact: false,
            trajectory: None,
        }
    }

    /// 軌道オーバーライドを設定
    ///
    /// 無効なトラックは設定されず、純粋な運動積分にフォールバックします。
    pub fn with_trajectory(mut self, trajectory: Option<TrajectoryTrack>) -> Self {
        self.trajectory = trajectory.filter(|t| t.is_valid());
        self
    }

    pub fn steady_state_velocity(&self) -> Velocity3D {
        self.steady_state_velocity
    }

    /// 現在速度が定常速度を下回っているか
    pub fn is_below_steady_state(&self) -> bool {
        self.velocity.cmp_speed(&self.steady_state_velocity) == Some(Ordering::Less)
    }

    pub fn distance_to(&self, other: &MovingEntity) -> f64 {
        self.position.distance_to(&other.position)
    }

    fn apply_trajectory_override(&mut self) {
        let Some(track) = self.trajectory.as_mut().filter(|t| t.has_pending()) else {
            return;
        };
        if let Some(transition) = track.take_due(self.time_ms) {
            self.velocity = transition.velocity;
            self.acceleration = transition.acceleration;

            trace!(
                entity = %self.name,
                time_ms = self.time_ms,
                velocity = %self.velocity.to_mps(),
                "TRAJECTORY_OVERRIDE: 軌道オーバーライドを適用しました"
            );
        }
    }
}

impl IMovable for MovingEntity {
    fn advance(&mut self) {
        self.apply_trajectory_override();

        self.velocity = self.velocity + self.acceleration;

        // 定常速度を超えたら定常速度に戻して惰性走行
        if self.velocity.speed() > self.steady_state_velocity.speed() {
            self.velocity = self.steady_state_velocity;
            self.acceleration = Acceleration3D::zero();
        }

        self.position = self.position + self.velocity;
        self.time_ms += 1;
    }

    fn current_state(&self) -> KinematicState {
        KinematicState {
            position: self.position,
            velocity: self.velocity,
            acceleration: self.acceleration,
            time_ms: self.time_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::trajectory::Transition;
    use assert_approx_eq::assert_approx_eq;

    fn walker() -> MovingEntity {
        MovingEntity::new(
            "walker",
            Position3D::origin(),
            Velocity3D::from_mps(2.0, 0.0, 0.0),
        )
    }

    #[test]
    fn test_constant_velocity_integration() {
        let mut entity = walker();
        for _ in 0..1000 {
            entity.advance();
        }
        assert_approx_eq!(entity.position.x, 2.0, 1e-9);
        assert_eq!(entity.time_ms, 1000);
    }

    #[test]
    fn test_speed_clamped_to_steady_state() {
        let mut entity = walker();
        entity.acceleration = Acceleration3D::from_per_second(0.5, 0.0, 0.0);
        for _ in 0..50 {
            entity.advance();
            assert!(entity.velocity.speed() <= entity.steady_state_velocity().speed());
        }
        assert_eq!(entity.velocity, entity.steady_state_velocity());
        assert_eq!(entity.acceleration, Acceleration3D::zero());
    }

    #[test]
    fn test_override_replaces_velocity_and_acceleration() {
        let track = TrajectoryTrack::new(
            "stop",
            vec![Transition {
                time_ms: 3,
                velocity: Velocity3D::zero(),
                acceleration: Acceleration3D::zero(),
            }],
        );
        let mut entity = walker().with_trajectory(Some(track));
        for _ in 0..10 {
            entity.advance();
        }
        // 3ティック分だけ進んで停止
        assert_approx_eq!(entity.position.x, 0.006, 1e-12);
        assert_eq!(entity.velocity, Velocity3D::zero());
    }

    #[test]
    fn test_invalid_trajectory_is_ignored() {
        let entity = walker().with_trajectory(Some(TrajectoryTrack::invalid("bad")));
        assert!(entity.trajectory.is_none());
    }

    #[test]
    fn test_steady_state_never_changes() {
        let mut entity = walker();
        entity.velocity = Velocity3D::zero();
        entity.advance();
        assert_eq!(entity.steady_state_velocity(), Velocity3D::from_mps(2.0, 0.0, 0.0));
        assert!(entity.is_below_steady_state());
    }
}
