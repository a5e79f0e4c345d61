use std::fmt;

use crate::models::{
    common::{KinematicState, Position3D, Velocity3D},
    moving_entity::MovingEntity,
    trajectory::TrajectoryTrack,
    traits::{IAgent, IMovable},
};

/// 歩行者の既定の衝突半径（m）
pub const DEFAULT_PEDESTRIAN_RADIUS: f64 = 0.5;

/// 歩行者エージェント
///
/// 移動体に衝突半径を加えたエージェントです。車両との距離が
/// 衝突半径以下になった時点で衝突と判定されます。
#[derive(Debug, Clone)]
pub struct Pedestrian {
    pub entity: MovingEntity,
    /// 衝突半径（m）
    pub radius: f64,
}

impl Pedestrian {
    pub fn new(
        name: impl Into<String>,
        position: Position3D,
        velocity: Velocity3D,
        radius: f64,
    ) -> Self {
        Self {
            entity: MovingEntity::new(name, position, velocity),
            radius,
        }
    }

    pub fn with_trajectory(mut self, trajectory: Option<TrajectoryTrack>) -> Self {
        self.entity = self.entity.with_trajectory(trajectory);
        self
    }

    pub fn mark_impact(&mut self) {
        self.entity.impact = true;
    }
}

impl IAgent for Pedestrian {
    fn get_id(&self) -> String {
        self.entity.name.clone()
    }

    fn has_impacted(&self) -> bool {
        self.entity.impact
    }
}

impl IMovable for Pedestrian {
    fn advance(&mut self) {
        self.entity.advance();
    }

    fn current_state(&self) -> KinematicState {
        self.entity.current_state()
    }
}

impl fmt::Display for Pedestrian {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Name: {}, Pos: {}, Vel: {}, Dead: {}",
            self.entity.name,
            self.entity.position,
            self.entity.velocity.to_mps(),
            self.entity.impact
        )
    }
}
