use crate::error::TrajectoryParseError;
use crate::models::common::{Acceleration3D, Velocity3D};
use tracing::warn;

/// 軌道オーバーライドの1遷移
///
/// 移動体の内部時計が `time_ms` に一致したとき、速度と加速度を
/// この値で置き換えます（加算ではありません）。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    /// 適用時刻（ms）
    pub time_ms: u64,
    /// 置き換え後の速度（m/ms）
    pub velocity: Velocity3D,
    /// 置き換え後の加速度（1ティックあたりの速度増分）
    pub acceleration: Acceleration3D,
}

/// 軌道オーバーライドトラック
///
/// 時刻順に並んだ遷移のリストです。各遷移は一度だけ適用されます。
/// 解析に失敗したトラックは無効としてマークされ、移動体からは無視されます。
#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryTrack {
    pub name: String,
    transitions: Vec<Transition>,
    cursor: usize,
    valid: bool,
}

impl TrajectoryTrack {
    /// 遷移リストからトラックを作成（時刻順に安定ソート）
    pub fn new(name: impl Into<String>, mut transitions: Vec<Transition>) -> Self {
        transitions.sort_by_key(|t| t.time_ms);
        Self {
            name: name.into(),
            transitions,
            cursor: 0,
            valid: true,
        }
    }

    /// 無効なトラック
    pub fn invalid(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transitions: Vec::new(),
            cursor: 0,
            valid: false,
        }
    }

    /// テキスト形式の軌道を解析
    ///
    /// 1行1遷移で、空白区切りの `key:value` トークンを並べます。
    /// キーは `time`, `velx`, `vely`, `velz`, `accx`, `accy`, `accz`（大文字小文字区別なし）。
    /// 速度（m/s）と加速度（m/s²）は1000で割って内部単位に変換します。
    /// `#` 以降はコメントとして読み飛ばします。
    pub fn parse(name: impl Into<String>, text: &str) -> Result<Self, TrajectoryParseError> {
        let mut transitions = Vec::new();

        for (index, raw_line) in text.lines().enumerate() {
            let line = index + 1;
            let content = raw_line.split('#').next().unwrap_or("").trim();
            if content.is_empty() {
                continue;
            }

            let mut time_ms = None;
            let mut vel = [0.0; 3];
            let mut acc = [0.0; 3];

            for token in content.split_whitespace() {
                let (key, value) = token.split_once(':').ok_or_else(|| {
                    TrajectoryParseError::MalformedToken {
                        line,
                        token: token.to_string(),
                    }
                })?;
                let key = key.to_lowercase();

                if key == "time" {
                    time_ms = Some(parse_time(line, value)?);
                    continue;
                }

                let slot = match key.as_str() {
                    "velx" => &mut vel[0],
                    "vely" => &mut vel[1],
                    "velz" => &mut vel[2],
                    "accx" => &mut acc[0],
                    "accy" => &mut acc[1],
                    "accz" => &mut acc[2],
                    _ => return Err(TrajectoryParseError::UnknownKey { line, key: key.clone() }),
                };
                *slot = value
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| TrajectoryParseError::InvalidNumber {
                        line,
                        key: key.clone(),
                        value: value.to_string(),
                    })?;
            }

            let time_ms = time_ms.ok_or(TrajectoryParseError::MissingTime { line })?;
            transitions.push(Transition {
                time_ms,
                velocity: Velocity3D::from_mps(vel[0], vel[1], vel[2]),
                acceleration: Acceleration3D::from_per_second(acc[0], acc[1], acc[2]),
            });
        }

        Ok(Self::new(name, transitions))
    }

    /// 解析に失敗した場合は警告を出して無効なトラックを返す
    pub fn parse_or_invalid(name: impl Into<String>, text: &str) -> Self {
        let name = name.into();
        match Self::parse(name.clone(), text) {
            Ok(track) => track,
            Err(e) => {
                warn!(
                    track = %name,
                    error = %e,
                    "TRAJECTORY_REJECTED: 軌道オーバーライドを無効化しました"
                );
                Self::invalid(name)
            }
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// 指定時刻に適用すべき遷移を取り出す
    ///
    /// 既に過ぎた遷移は読み飛ばされ、再び適用されることはありません。
    /// 同一時刻に複数の遷移がある場合は最後のものが有効になります。
    pub fn take_due(&mut self, time_ms: u64) -> Option<Transition> {
        if !self.valid {
            return None;
        }

        while self.cursor < self.transitions.len() && self.transitions[self.cursor].time_ms < time_ms {
            self.cursor += 1;
        }

        let mut due = None;
        while self.cursor < self.transitions.len() && self.transitions[self.cursor].time_ms == time_ms {
            due = Some(self.transitions[self.cursor]);
            self.cursor += 1;
        }
        due
    }

    /// 未適用の遷移が残っているか
    pub fn has_pending(&self) -> bool {
        self.valid && self.cursor < self.transitions.len()
    }
}

fn parse_time(line: usize, value: &str) -> Result<u64, TrajectoryParseError> {
    let invalid = || TrajectoryParseError::InvalidTime {
        line,
        value: value.to_string(),
    };

    if let Ok(ms) = value.parse::<u64>() {
        return Ok(ms);
    }
    let ms = value.parse::<f64>().map_err(|_| invalid())?;
    if ms.is_finite() && ms >= 0.0 && ms.fract() == 0.0 {
        Ok(ms as u64)
    } else {
        Err(invalid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_parse_converts_units_and_sorts() {
        let text = "\
# pedestrian turns back
TIME:2000 velY:-1.67
time:0 velx:0 vely:1.67 accx:0.5
";
        let track = TrajectoryTrack::parse("ped", text).unwrap();
        assert!(track.is_valid());
        let transitions = track.transitions();
        assert_eq!(transitions.len(), 2);
        assert_eq!(transitions[0].time_ms, 0);
        assert_approx_eq!(transitions[0].velocity.y, 0.00167);
        assert_approx_eq!(transitions[0].acceleration.x, 0.0005);
        assert_eq!(transitions[1].time_ms, 2000);
        assert_approx_eq!(transitions[1].velocity.y, -0.00167);
    }

    #[test]
    fn test_parse_errors_carry_line_numbers() {
        assert_eq!(
            TrajectoryTrack::parse("t", "time:0\nvelx:1"),
            Err(TrajectoryParseError::MissingTime { line: 2 })
        );
        assert_eq!(
            TrajectoryTrack::parse("t", "time:0 speed:3"),
            Err(TrajectoryParseError::UnknownKey { line: 1, key: "speed".to_string() })
        );
        assert!(matches!(
            TrajectoryTrack::parse("t", "time:0 velx"),
            Err(TrajectoryParseError::MalformedToken { line: 1, .. })
        ));
        assert!(matches!(
            TrajectoryTrack::parse("t", "time:0 velx:fast"),
            Err(TrajectoryParseError::InvalidNumber { line: 1, .. })
        ));
        assert!(matches!(
            TrajectoryTrack::parse("t", "time:-5"),
            Err(TrajectoryParseError::InvalidTime { line: 1, .. })
        ));
        assert!(matches!(
            TrajectoryTrack::parse("t", "time:1.5"),
            Err(TrajectoryParseError::InvalidTime { line: 1, .. })
        ));
    }

    #[test]
    fn test_parse_or_invalid_marks_track_invalid() {
        let mut track = TrajectoryTrack::parse_or_invalid("broken", "time:0 bogus:1");
        assert!(!track.is_valid());
        assert!(track.take_due(0).is_none());
    }

    #[test]
    fn test_take_due_is_one_shot() {
        let mut track = TrajectoryTrack::parse("t", "time:5 velx:1\ntime:10 velx:2").unwrap();
        assert!(track.take_due(4).is_none());
        assert!(track.take_due(5).is_some());
        assert!(track.take_due(5).is_none());
        // 時刻10を飛ばすと二度と適用されない
        assert!(track.take_due(11).is_none());
        assert!(!track.has_pending());
    }
}
