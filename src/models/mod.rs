// 基本的なデータ型と物理定数
pub mod common;

// エージェントの基本インターフェース（trait）定義
pub mod traits;

// 運動積分と軌道オーバーライド
pub mod moving_entity;
pub mod trajectory;

// 各エージェントモデルの実装
pub mod pedestrian;
pub mod sensor;
pub mod controller;
pub mod vehicle;
pub mod efficiency;

// 便利な re-export
pub use common::*;
pub use traits::*;
pub use moving_entity::MovingEntity;
pub use trajectory::{TrajectoryTrack, Transition};
pub use pedestrian::{Pedestrian, DEFAULT_PEDESTRIAN_RADIUS};
pub use sensor::{Sensor, SensorReading, DetectionEvent, DetectionEventType};
pub use controller::{Controller, ControlAction, ControllerReport, RiskAssessment};
pub use vehicle::{Vehicle, VehicleTick, DEFAULT_VEHICLE_SIZE_M};
pub use efficiency::EfficiencyTracker;
