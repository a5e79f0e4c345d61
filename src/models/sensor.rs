use crate::models::{
    common::{Position3D, Velocity3D},
    moving_entity::MovingEntity,
    pedestrian::Pedestrian,
    traits::IAgent,
};
use tracing::info;

/// 脅威として捕捉する距離（m）
pub const ACQUISITION_RANGE_M: f64 = 60.0;

/// センサーパケットの送信間隔（ティック）
pub const SENSOR_PACKET_INTERVAL_TICKS: u32 = 100;

/// センサーエージェント
///
/// 車両に搭載され、歩行者を捕捉して相対位置・速度を提供します。
/// 捕捉判定と制御用サンプリングは100ティックごとのパケット周期で行いますが、
/// 衝突判定は毎ティック実行されます。
///
/// 捕捉した歩行者はIDのみで参照し、歩行者の所有権は持ちません。
#[derive(Debug, Clone)]
pub struct Sensor {
    /// センサーの一意識別子
    pub id: String,
    /// 捕捉距離（メートル）
    pub detection_range: f64,
    /// 捕捉中の歩行者ID
    acquired: Option<String>,
    /// パケット周期カウンタ
    packet_timer: u32,
    /// 検知イベントの履歴
    detection_history: Vec<DetectionEvent>,
}

/// 検知イベント
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionEvent {
    /// イベント発生時刻（車両の内部時計、ms）
    pub timestamp_ms: u64,
    /// 歩行者のID
    pub target_id: String,
    /// 車両から歩行者までの距離（メートル）
    pub distance: f64,
    /// 検知イベントの種類
    pub event_type: DetectionEventType,
}

/// 検知イベントの種類
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DetectionEventType {
    /// 歩行者を脅威として捕捉した
    Acquired,
    /// 歩行者と衝突した
    Impact,
}

/// センサーパケット1回分の観測値
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    /// 車両から歩行者までの距離（m）
    pub distance: f64,
    /// 車両から見た歩行者の相対位置（車両の向きへの回転はしない）
    pub relative_position: Position3D,
    /// 歩行者の絶対速度（車両に対する相対速度ではない）
    pub pedestrian_velocity: Velocity3D,
}

impl Sensor {
    /// 新しいセンサーを作成します
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            detection_range: ACQUISITION_RANGE_M,
            acquired: None,
            packet_timer: 0,
            detection_history: Vec::new(),
        }
    }

    pub fn is_acquired(&self) -> bool {
        self.acquired.is_some()
    }

    pub fn acquired_target(&self) -> Option<&str> {
        self.acquired.as_deref()
    }

    /// 捕捉・衝突イベントの履歴（発生順）
    pub fn detection_history(&self) -> &[DetectionEvent] {
        &self.detection_history
    }

    /// パケット周期を1ティック進める
    ///
    /// # 戻り値
    ///
    /// このティックでパケットを受信する場合はtrue
    pub fn packet_due(&mut self) -> bool {
        self.packet_timer += 1;
        if self.packet_timer < SENSOR_PACKET_INTERVAL_TICKS {
            return false;
        }
        self.packet_timer = 0;
        true
    }

    /// 歩行者の脅威を探索
    ///
    /// 未捕捉の状態で歩行者が捕捉距離内にいれば捕捉します（確定的）。
    ///
    /// # 戻り値
    ///
    /// 今回新たに捕捉した場合はtrue
    pub fn seek_pedestrian_threat(&mut self, vehicle: &MovingEntity, pedestrian: &Pedestrian) -> bool {
        if self.acquired.is_some() {
            return false;
        }

        let distance = vehicle.distance_to(&pedestrian.entity);
        if distance >= self.detection_range {
            return false;
        }

        self.acquired = Some(pedestrian.get_id());
        self.detection_history.push(DetectionEvent {
            timestamp_ms: vehicle.time_ms,
            target_id: pedestrian.get_id(),
            distance,
            event_type: DetectionEventType::Acquired,
        });

        info!(
            sensor_id = %self.id,
            pedestrian_id = %pedestrian.get_id(),
            distance = distance,
            time_ms = vehicle.time_ms,
            "PEDESTRIAN_ACQUIRED: 歩行者を脅威として捕捉しました"
        );
        true
    }

    fn tracks(&self, pedestrian: &Pedestrian) -> bool {
        self.acquired.as_deref() == Some(pedestrian.entity.name.as_str())
    }

    /// 歩行者までの距離（未捕捉ならNone）
    pub fn get_distance(&self, vehicle: &MovingEntity, pedestrian: &Pedestrian) -> Option<f64> {
        self.tracks(pedestrian)
            .then(|| vehicle.distance_to(&pedestrian.entity))
    }

    /// 車両から見た歩行者の相対位置（未捕捉ならNone）
    pub fn get_ped_pos_rel(&self, vehicle: &MovingEntity, pedestrian: &Pedestrian) -> Option<Position3D> {
        self.tracks(pedestrian)
            .then(|| pedestrian.entity.position - vehicle.position)
    }

    /// 歩行者の絶対速度（未捕捉ならNone）
    pub fn get_ped_velocity(&self, pedestrian: &Pedestrian) -> Option<Velocity3D> {
        self.tracks(pedestrian).then_some(pedestrian.entity.velocity)
    }

    /// パケット1回分の観測値をまとめて取得
    pub fn sample(&self, vehicle: &MovingEntity, pedestrian: &Pedestrian) -> Option<SensorReading> {
        Some(SensorReading {
            distance: self.get_distance(vehicle, pedestrian)?,
            relative_position: self.get_ped_pos_rel(vehicle, pedestrian)?,
            pedestrian_velocity: self.get_ped_velocity(pedestrian)?,
        })
    }

    /// 衝突判定
    ///
    /// 捕捉状態に関わらず実際の距離で判定します。距離が歩行者の衝突半径以下の場合、
    /// 車両と歩行者の両方に衝突フラグを設定します。
    pub fn check_impact(&mut self, vehicle: &mut MovingEntity, pedestrian: &mut Pedestrian) -> bool {
        let distance = vehicle.distance_to(&pedestrian.entity);
        if distance > pedestrian.radius {
            return false;
        }

        vehicle.impact = true;
        pedestrian.mark_impact();
        self.detection_history.push(DetectionEvent {
            timestamp_ms: vehicle.time_ms,
            target_id: pedestrian.get_id(),
            distance,
            event_type: DetectionEventType::Impact,
        });
        true
    }
}
