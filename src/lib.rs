//! # pedsim
//!
//! 車両と歩行者の衝突回避シミュレーション。
//!
//! 1ティック = 1ms の固定刻みで車両・歩行者を運動積分し、
//! センサーパケットごとに衝突リスクコントローラが制動・加速を判断します。

pub mod config;
pub mod error;
pub mod export;
pub mod logging;
pub mod models;
pub mod scenario;
pub mod simulation;
