//! # エラー型
//!
//! シミュレーション全体で使用するエラー型を定義します。
//!
//! - [`SimulationError`]: 実行前検証（エージェント未設定、初期配置不正）の失敗
//! - [`TrajectoryParseError`]: 軌道オーバーライドファイルの解析失敗（回復可能）
//! - [`ScenarioError`]: シナリオファイルの読み込み失敗
//! - [`ExportError`]: テレメトリのCSV出力失敗

use std::path::PathBuf;
use thiserror::Error;

/// シミュレーション構成エラー
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error("車両が設定されていません")]
    MissingVehicle,

    #[error("歩行者が設定されていません")]
    MissingPedestrian,

    #[error("初期配置が不正です: 車両のx座標 ({vehicle_x:.2}) は歩行者のx座標 ({pedestrian_x:.2}) より小さい必要があります")]
    InvalidGeometry { vehicle_x: f64, pedestrian_x: f64 },

    #[error("シミュレーションは既に実行済みです")]
    AlreadyStarted,
}

/// 軌道オーバーライドの解析エラー
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrajectoryParseError {
    #[error("{line}行目: トークン `{token}` は key:value 形式ではありません")]
    MalformedToken { line: usize, token: String },

    #[error("{line}行目: 未知のキー `{key}`")]
    UnknownKey { line: usize, key: String },

    #[error("{line}行目: `{key}` の値 `{value}` は数値ではありません")]
    InvalidNumber { line: usize, key: String, value: String },

    #[error("{line}行目: 時刻 `{value}` は0以上の整数(ms)である必要があります")]
    InvalidTime { line: usize, value: String },

    #[error("{line}行目: time が指定されていません")]
    MissingTime { line: usize },
}

/// シナリオ読み込みエラー
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("シナリオファイルが見つかりません: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("ファイル読み込みエラー {}: {}", .0.display(), .1)]
    IoError(PathBuf, #[source] std::io::Error),

    #[error("YAML解析エラー {}: {}", .0.display(), .1)]
    ParseError(PathBuf, #[source] serde_yaml::Error),

    #[error("設定検証エラー: {0}")]
    ValidationError(String),
}

/// テレメトリ出力エラー
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("I/Oエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV書き込みエラー: {0}")]
    Csv(#[from] csv::Error),
}
