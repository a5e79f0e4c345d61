use crate::models::common::*;

/// 全てのシミュレーションエージェントが実装する基本インターフェース
pub trait IAgent {
    /// エージェントIDの取得
    fn get_id(&self) -> String;

    /// 衝突が発生したかどうか
    fn has_impacted(&self) -> bool;
}

/// 移動可能なエージェントのインターフェース
pub trait IMovable {
    /// 1ティック分の運動を積分
    fn advance(&mut self);

    /// 現在の運動状態の取得
    fn current_state(&self) -> KinematicState;

    /// 現在位置の取得
    fn get_position(&self) -> Position3D {
        self.current_state().position
    }

    /// 現在速度の取得
    fn get_velocity(&self) -> Velocity3D {
        self.current_state().velocity
    }
}
