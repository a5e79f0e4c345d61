//! # Simulation モジュール
//!
//! 車両と歩行者の衝突回避シミュレーションを実行するスケジューラを提供します。
//!
//! 1ティック = 1ms の固定刻みで、すべての処理を単一スレッドで順番に実行します。
//!
//! ## 1ティックの処理順序
//!
//! 1. **車両処理**: 運動積分、衝突判定、センサーパケット受信時の捕捉・制御判断
//! 2. **ゴースト処理**: 効率ベースライン用の仮想車両を巡航
//! 3. **歩行者処理**: 運動積分
//! 4. **記録処理**: 時系列サンプルの記録、安全通過判定
//!
//! 最初のティックの前に、初期配置で車両と歩行者が接触していないかを判定します。
//! 接触していれば0ティックで衝突として終了します。
//!
//! 衝突または安全通過で中断フラグが立つか、タイムアウトのティック数に達すると終了します。
//!
//! ## 使用例
//!
//! ```rust
//! use pedsim::config::SimulationConfig;
//! use pedsim::simulation::Simulation;
//!
//! let mut simulation = Simulation::new(SimulationConfig::demo());
//! let summary = simulation.run();
//! println!("衝突: {}", summary.impact);
//! ```

use std::fmt;
use std::time::Duration;

use crate::config::{PedestrianConfig, SimulationConfig, VehicleConfig};
use crate::error::SimulationError;
use crate::models::*;
use tracing::{debug, error, info, trace, warn};

/// 安全通過判定に使う接近距離（m）
pub const SAFE_PASSAGE_PROXIMITY_M: f64 = 10.0;

/// シミュレーションの状態
#[derive(Debug, Clone, PartialEq)]
pub enum SimulationState {
    /// 未検証
    Unvalidated,
    /// 検証済み、実行待ち
    Ready,
    /// 実行中
    Running,
    /// 停止（結果は以後変更されない）
    Stopped(RunOutcome),
}

/// 実行結果
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// 衝突または安全通過で完了
    Completed(CompletionCause),
    /// タイムアウト
    TimedOut,
    /// 検証失敗または外部からの中断
    Aborted(String),
}

/// 完了の原因
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CompletionCause {
    /// 車両が歩行者に衝突した
    Impact,
    /// 車両が歩行者を安全に通過した
    SafePassage,
}

/// 位置と速さのサンプル
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackSample {
    pub tick: u64,
    pub position: Position3D,
    /// 速さ（m/s）
    pub speed_mps: f64,
}

/// 接近速度のサンプル
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateSample {
    pub tick: u64,
    /// 接近速度（m/s）
    pub rate_mps: f64,
}

/// 車両の毎ティックのサンプル
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleSample {
    pub tick: u64,
    /// 加速度の大きさ（m/s²）
    pub acceleration_mps2: f64,
    /// 歩行者までの距離（未捕捉時は0）
    pub distance_to_pedestrian: f64,
}

/// 時系列テレメトリ
///
/// 描画やファイル出力など外部処理向けのサンプル列です。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Telemetry {
    pub vehicle_track: Vec<TrackSample>,
    pub pedestrian_track: Vec<TrackSample>,
    pub vehicle_series: Vec<VehicleSample>,
    pub approach_rates: Vec<RateSample>,
    pub controller_reports: Vec<ControllerReport>,
}

/// 実行サマリ
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub name: String,
    pub outcome: RunOutcome,
    pub impact: bool,
    pub elapsed_ticks: u64,
    /// 効率（%）、定義できない場合はNone
    pub efficiency_percent: Option<f64>,
}

impl RunSummary {
    /// 経過シミュレーション時間（秒）
    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed_ticks as f64 / TICKS_PER_SECOND
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Completed(CompletionCause::Impact) => write!(f, "完了（衝突）"),
            RunOutcome::Completed(CompletionCause::SafePassage) => write!(f, "完了（安全通過）"),
            RunOutcome::TimedOut => write!(f, "タイムアウト"),
            RunOutcome::Aborted(reason) => write!(f, "中断: {}", reason),
        }
    }
}

pub struct Simulation {
    name: String,
    timeout_ticks: u64,
    pacing_ms: Option<u64>,
    step_count: u64,
    verbose_level: u8,

    vehicle: Option<Vehicle>,
    pedestrian: Option<Pedestrian>,
    efficiency: Option<EfficiencyTracker>,

    state: SimulationState,
    abort: bool,
    stop_cause: Option<RunOutcome>,
    last_distance: Option<f64>,
    proximity_reached: bool,

    telemetry: Telemetry,
    summary: Option<RunSummary>,
}

impl Simulation {
    /// 設定からシミュレーションを作成
    ///
    /// 設定に含まれるエージェントはここで追加されます。
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            name: config.name,
            timeout_ticks: config.timeout_ticks,
            pacing_ms: config.pacing_ms,
            step_count: 0,
            verbose_level: 0,
            vehicle: config.vehicle.as_ref().map(VehicleConfig::build),
            pedestrian: config.pedestrian.as_ref().map(PedestrianConfig::build),
            efficiency: None,
            state: SimulationState::Unvalidated,
            abort: false,
            stop_cause: None,
            last_distance: None,
            proximity_reached: false,
            telemetry: Telemetry::default(),
            summary: None,
        }
    }

    pub fn with_verbosity(mut self, verbose_level: u8) -> Self {
        self.verbose_level = verbose_level;
        self
    }

    /// 車両を追加（置き換え）
    ///
    /// 検証済みの場合は未検証に戻り、次の実行前に再検証されます。
    /// 実行開始後は追加できません。
    pub fn add_vehicle(&mut self, config: &VehicleConfig) -> Result<(), SimulationError> {
        self.invalidate()?;
        self.vehicle = Some(config.build());
        Ok(())
    }

    /// 歩行者を追加（置き換え）
    pub fn add_pedestrian(&mut self, config: &PedestrianConfig) -> Result<(), SimulationError> {
        self.invalidate()?;
        self.pedestrian = Some(config.build());
        Ok(())
    }

    fn invalidate(&mut self) -> Result<(), SimulationError> {
        match self.state {
            SimulationState::Unvalidated => Ok(()),
            SimulationState::Ready => {
                self.state = SimulationState::Unvalidated;
                self.efficiency = None;
                Ok(())
            }
            SimulationState::Running | SimulationState::Stopped(_) => Err(SimulationError::AlreadyStarted),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn timeout_ticks(&self) -> u64 {
        self.timeout_ticks
    }

    pub fn pacing_ms(&self) -> Option<u64> {
        self.pacing_ms
    }

    /// 経過ティック数
    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn vehicle(&self) -> Option<&Vehicle> {
        self.vehicle.as_ref()
    }

    pub fn pedestrian(&self) -> Option<&Pedestrian> {
        self.pedestrian.as_ref()
    }

    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    pub fn summary(&self) -> Option<&RunSummary> {
        self.summary.as_ref()
    }

    /// 実行前の検証
    ///
    /// 両エージェントが設定され、車両が歩行者より左（x座標が小さい）にあることを確認します。
    /// 失敗した場合は実行を開始せずに中断状態へ移行します。
    pub fn validate(&mut self) -> Result<(), SimulationError> {
        if !matches!(self.state, SimulationState::Unvalidated | SimulationState::Ready) {
            return Err(SimulationError::AlreadyStarted);
        }

        match self.check_agents() {
            Ok(()) => {
                if let Some(vehicle) = &self.vehicle {
                    self.efficiency = Some(EfficiencyTracker::new(vehicle));
                }
                self.state = SimulationState::Ready;
                Ok(())
            }
            Err(e) => {
                error!(simulation = %self.name, error = %e, "VALIDATION_FAILED: シミュレーションを開始できません");
                self.finish(RunOutcome::Aborted(e.to_string()));
                Err(e)
            }
        }
    }

    fn check_agents(&self) -> Result<(), SimulationError> {
        let vehicle = self.vehicle.as_ref().ok_or(SimulationError::MissingVehicle)?;
        let pedestrian = self.pedestrian.as_ref().ok_or(SimulationError::MissingPedestrian)?;

        let vehicle_x = vehicle.entity.position.x;
        let pedestrian_x = pedestrian.entity.position.x;
        if vehicle_x >= pedestrian_x {
            return Err(SimulationError::InvalidGeometry { vehicle_x, pedestrian_x });
        }
        Ok(())
    }

    /// 外部からの中断要求
    pub fn abort(&mut self, reason: impl Into<String>) {
        if self.stop_cause.is_none() {
            self.stop_cause = Some(RunOutcome::Aborted(reason.into()));
        }
        self.abort = true;
    }

    fn stop(&mut self, cause: CompletionCause) {
        if self.stop_cause.is_none() {
            self.stop_cause = Some(RunOutcome::Completed(cause));
        }
        self.abort = true;
    }

    /// シミュレーションを実行
    ///
    /// 中断フラグが立つかタイムアウトに達するまでティックを進めます。
    /// 検証に失敗した場合も含め、常にサマリを返します。
    pub fn run(&mut self) -> RunSummary {
        if let Some(summary) = &self.summary {
            return summary.clone();
        }

        if self.state == SimulationState::Unvalidated {
            if let Err(e) = self.validate() {
                return match self.summary.clone() {
                    Some(summary) => summary,
                    None => self.finish(RunOutcome::Aborted(e.to_string())),
                };
            }
        }

        if let (Some(vehicle), Some(pedestrian)) = (&self.vehicle, &self.pedestrian) {
            info!("=== シミュレーション実行開始: {} ===", self.name);
            info!("{}", vehicle);
            info!("{}", pedestrian);
        }
        self.state = SimulationState::Running;
        self.check_initial_contact();

        while !self.abort && self.step_count < self.timeout_ticks {
            self.step();

            if self.verbose_level > 2 {
                trace!("時刻: {:.3}秒 (ステップ: {})", self.step_count as f64 / TICKS_PER_SECOND, self.step_count);
            }

            if self.verbose_level > 0 && self.step_count % 1000 == 0 {
                let progress = (self.step_count as f64 / self.timeout_ticks as f64) * 100.0;
                debug!("進行状況: {:.2}% ({}/{}ティック)", progress, self.step_count, self.timeout_ticks);
            }

            if let Some(pacing) = self.pacing_ms {
                std::thread::sleep(Duration::from_millis(pacing));
            }
        }

        let outcome = match self.stop_cause.take() {
            Some(outcome) => outcome,
            None => {
                warn!(
                    simulation = %self.name,
                    timeout_ticks = self.timeout_ticks,
                    "TIMEOUT: 最大ティック数に達しました"
                );
                RunOutcome::TimedOut
            }
        };
        let summary = self.finish(outcome);

        info!("=== シミュレーション完了 ===");
        info!("結果: {}", summary.outcome);
        info!("衝突: {}", summary.impact);
        info!("経過時間: {:.3}秒", summary.elapsed_seconds());
        if let Some(efficiency) = summary.efficiency_percent {
            info!("効率: {:.2}%", efficiency);
        }

        summary
    }

    /// 初期配置での衝突判定（0ティック目）
    fn check_initial_contact(&mut self) {
        let (Some(vehicle), Some(pedestrian)) = (self.vehicle.as_mut(), self.pedestrian.as_mut()) else {
            return;
        };
        if vehicle.check_impact(pedestrian) {
            self.stop(CompletionCause::Impact);
        }
    }

    /// 1ティックの処理
    fn step(&mut self) {
        if self.vehicle.is_none() || self.pedestrian.is_none() {
            self.abort("エージェントが設定されていません");
            return;
        }
        let (Some(vehicle), Some(pedestrian)) = (self.vehicle.as_mut(), self.pedestrian.as_mut()) else {
            return;
        };

        let tick = vehicle.tick(pedestrian);
        if let Some(efficiency) = self.efficiency.as_mut() {
            efficiency.advance();
        }
        pedestrian.advance();
        self.step_count += 1;

        let step = self.step_count;
        self.telemetry.vehicle_track.push(TrackSample {
            tick: step,
            position: vehicle.entity.position,
            speed_mps: vehicle.entity.velocity.speed_mps(),
        });
        self.telemetry.pedestrian_track.push(TrackSample {
            tick: step,
            position: pedestrian.entity.position,
            speed_mps: pedestrian.entity.velocity.speed_mps(),
        });
        self.telemetry.vehicle_series.push(VehicleSample {
            tick: step,
            acceleration_mps2: vehicle.acceleration_log.last().copied().unwrap_or(0.0),
            distance_to_pedestrian: vehicle.distance_log.last().copied().unwrap_or(0.0),
        });
        if let Some(report) = tick.report {
            self.telemetry.approach_rates.push(RateSample {
                tick: step,
                rate_mps: report.assessment.approach_rate_mps,
            });
            self.telemetry.controller_reports.push(report);
        }

        if tick.impact {
            self.stop(CompletionCause::Impact);
            return;
        }

        let distance = vehicle.entity.distance_to(&pedestrian.entity);
        let passed = vehicle.entity.position.x > pedestrian.entity.position.x;
        if distance < SAFE_PASSAGE_PROXIMITY_M {
            self.proximity_reached = true;
        }

        // 接近後に距離が増加し始めたら安全に通過したとみなす
        if let Some(last) = self.last_distance {
            if distance > last && (self.proximity_reached || passed) {
                info!(
                    simulation = %self.name,
                    tick = step,
                    distance = distance,
                    "SAFE_PASSAGE: 車両は歩行者を安全に通過しました"
                );
                self.last_distance = Some(distance);
                self.stop(CompletionCause::SafePassage);
                return;
            }
        }
        self.last_distance = Some(distance);
    }

    fn finish(&mut self, outcome: RunOutcome) -> RunSummary {
        let impact = self.vehicle.as_ref().is_some_and(|v| v.has_impacted());
        let efficiency_percent = match (&self.efficiency, &self.vehicle) {
            (Some(tracker), Some(vehicle)) => tracker.efficiency_percent(vehicle.entity.position, self.step_count),
            _ => None,
        };

        let summary = RunSummary {
            name: self.name.clone(),
            outcome: outcome.clone(),
            impact,
            elapsed_ticks: self.step_count,
            efficiency_percent,
        };

        if let Some(vehicle) = &self.vehicle {
            debug!(
                simulation = %self.name,
                acquired = ?vehicle.sensor.acquired_target(),
                "センサー捕捉状況"
            );
            for event in vehicle.sensor.detection_history() {
                debug!(
                    simulation = %self.name,
                    event_type = ?event.event_type,
                    pedestrian_id = %event.target_id,
                    time_ms = event.timestamp_ms,
                    distance = event.distance,
                    "DETECTION_EVENT: 検知イベント"
                );
            }
        }

        self.state = SimulationState::Stopped(outcome);
        self.summary = Some(summary.clone());
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn head_on(distance: f64) -> SimulationConfig {
        SimulationConfig::new("head_on")
            .with_vehicle(VehicleConfig::new(Position3D::origin(), [13.9, 0.0, 0.0]))
            .with_pedestrian(PedestrianConfig::new(Position3D::new(distance, 0.0, 0.0), [0.0, 0.0, 0.0]))
    }

    #[test]
    fn test_missing_agents_abort() {
        let mut simulation = Simulation::new(SimulationConfig::new("empty"));
        assert_eq!(simulation.validate(), Err(SimulationError::MissingVehicle));
        assert!(matches!(simulation.state(), SimulationState::Stopped(RunOutcome::Aborted(_))));

        let config = SimulationConfig::new("no_ped")
            .with_vehicle(VehicleConfig::new(Position3D::origin(), [10.0, 0.0, 0.0]));
        let mut simulation = Simulation::new(config);
        let summary = simulation.run();
        assert!(matches!(summary.outcome, RunOutcome::Aborted(_)));
        assert_eq!(summary.elapsed_ticks, 0);
        assert!(simulation.telemetry().vehicle_track.is_empty());
    }

    #[test]
    fn test_vehicle_must_start_left_of_pedestrian() {
        let config = SimulationConfig::new("bad")
            .with_vehicle(VehicleConfig::new(Position3D::new(35.0, 0.0, 0.0), [10.0, 0.0, 0.0]))
            .with_pedestrian(PedestrianConfig::new(Position3D::new(35.0, -7.0, 0.0), [0.0, 1.0, 0.0]));
        let mut simulation = Simulation::new(config);
        assert!(matches!(
            simulation.validate(),
            Err(SimulationError::InvalidGeometry { .. })
        ));
        assert_eq!(simulation.validate(), Err(SimulationError::AlreadyStarted));
    }

    #[test]
    fn test_timeout_bounds_run() {
        let mut simulation = Simulation::new(head_on(500.0).with_timeout(250));
        let summary = simulation.run();
        assert_eq!(summary.outcome, RunOutcome::TimedOut);
        assert_eq!(summary.elapsed_ticks, 250);
        assert_eq!(simulation.telemetry().vehicle_track.len(), 250);
        assert!(!summary.impact);
    }

    #[test]
    fn test_external_abort_stops_before_first_tick() {
        let mut simulation = Simulation::new(head_on(50.0));
        simulation.validate().unwrap();
        simulation.abort("operator");
        let summary = simulation.run();
        assert_eq!(summary.outcome, RunOutcome::Aborted("operator".to_string()));
        assert_eq!(summary.elapsed_ticks, 0);
    }

    #[test]
    fn test_results_are_frozen_after_stop() {
        let mut simulation = Simulation::new(head_on(500.0).with_timeout(10));
        let first = simulation.run();
        let second = simulation.run();
        assert_eq!(first, second);
        assert_eq!(simulation.step_count(), 10);
    }

    #[test]
    fn test_one_rate_sample_per_controller_call() {
        let mut simulation = Simulation::new(head_on(55.0).with_timeout(1000));
        simulation.run();
        let telemetry = simulation.telemetry();
        // 100ティック目で捕捉、以降100ティックごとに判断
        assert_eq!(telemetry.approach_rates.len(), 9);
        assert_eq!(telemetry.approach_rates[0].tick, 200);
        assert_eq!(telemetry.controller_reports.len(), telemetry.approach_rates.len());
    }

    #[test]
    fn test_agent_added_after_validate_is_revalidated() {
        let mut simulation = Simulation::new(SimulationConfig::demo());
        simulation.validate().unwrap();
        assert_eq!(simulation.state(), &SimulationState::Ready);

        simulation
            .add_vehicle(&VehicleConfig::new(Position3D::new(80.0, 0.0, 0.0), [13.9, 0.0, 0.0]))
            .unwrap();
        assert_eq!(simulation.state(), &SimulationState::Unvalidated);

        let summary = simulation.run();
        let expected = SimulationError::InvalidGeometry { vehicle_x: 80.0, pedestrian_x: 35.0 };
        assert_eq!(summary.outcome, RunOutcome::Aborted(expected.to_string()));
        assert_eq!(summary.elapsed_ticks, 0);
        assert_eq!(summary.efficiency_percent, None);
    }

    #[test]
    fn test_replaced_vehicle_gets_its_own_ghost() {
        let mut simulation = Simulation::new(SimulationConfig::demo().with_timeout(1000));
        simulation.validate().unwrap();
        simulation
            .add_vehicle(&VehicleConfig::new(Position3D::origin(), [10.0, 0.0, 0.0]))
            .unwrap();

        let summary = simulation.run();
        assert_eq!(summary.outcome, RunOutcome::TimedOut);
        // 制動なしで巡航したので基準と同じ速さ
        assert_approx_eq!(summary.efficiency_percent.unwrap(), 100.0, 1e-6);
    }

    #[test]
    fn test_agents_cannot_be_added_after_run() {
        let mut simulation = Simulation::new(head_on(500.0).with_timeout(10));
        let before = simulation.run();

        assert_eq!(
            simulation.add_pedestrian(&PedestrianConfig::new(Position3D::new(20.0, 0.0, 0.0), [0.0, 0.0, 0.0])),
            Err(SimulationError::AlreadyStarted)
        );
        assert_eq!(
            simulation.add_vehicle(&VehicleConfig::new(Position3D::origin(), [5.0, 0.0, 0.0])),
            Err(SimulationError::AlreadyStarted)
        );
        assert_eq!(simulation.run(), before);
        assert_eq!(simulation.pedestrian().unwrap().entity.position.x, 500.0);
    }
}
