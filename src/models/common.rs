use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Mul, Sub};

/// 重力加速度（m/s²）
pub const GRAVITY_MPS2: f64 = 9.81;

/// 1秒あたりのティック数（1ティック = 1ms）
pub const TICKS_PER_SECOND: f64 = 1000.0;

/// 3次元位置を表す構造体
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position3D {
    pub x: f64, // m
    pub y: f64, // m
    pub z: f64, // m
}

impl Position3D {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// 原点
    pub fn origin() -> Self {
        Self::default()
    }

    /// 原点からの距離（ベクトルの長さ）
    pub fn distance_to_origin(&self) -> f64 {
        (self.x.powi(2) + self.y.powi(2) + self.z.powi(2)).sqrt()
    }

    /// 3次元距離を計算
    pub fn distance_to(&self, other: &Position3D) -> f64 {
        (*other - *self).distance_to_origin()
    }
}

impl Add for Position3D {
    type Output = Self;

    fn add(self, other: Self) -> Self::Output {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl Sub for Position3D {
    type Output = Self;

    fn sub(self, other: Self) -> Self::Output {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

// 1ティック分の変位（速度はm/tick）
impl Add<Velocity3D> for Position3D {
    type Output = Self;

    fn add(self, velocity: Velocity3D) -> Self::Output {
        Self::new(self.x + velocity.x, self.y + velocity.y, self.z + velocity.z)
    }
}

impl fmt::Display for Position3D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pos({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

/// 3次元速度を表す構造体
///
/// 内部単位はm/ms（1ティックあたりの変位）です。
/// 利用者向けの値はm/sで、`from_mps` / `to_mps` で変換します。
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Velocity3D {
    pub x: f64, // m/ms
    pub y: f64, // m/ms
    pub z: f64, // m/ms
}

impl Velocity3D {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    /// m/s単位の成分から作成
    pub fn from_mps(x: f64, y: f64, z: f64) -> Self {
        Self::new(x / TICKS_PER_SECOND, y / TICKS_PER_SECOND, z / TICKS_PER_SECOND)
    }

    /// m/s単位に変換
    pub fn to_mps(&self) -> Self {
        *self * TICKS_PER_SECOND
    }

    /// 速度ベクトルの大きさ（m/ms）
    pub fn speed(&self) -> f64 {
        (self.x.powi(2) + self.y.powi(2) + self.z.powi(2)).sqrt()
    }

    /// 速度の大きさ（m/s）
    pub fn speed_mps(&self) -> f64 {
        self.speed() * TICKS_PER_SECOND
    }

    /// 単位ベクトル
    ///
    /// 停止中（大きさ0）の場合は方向が定義できないため `None` を返します。
    pub fn unit_vector(&self) -> Option<Self> {
        let speed = self.speed();
        if speed > 0.0 && speed.is_finite() {
            Some(Self::new(self.x / speed, self.y / speed, self.z / speed))
        } else {
            None
        }
    }

    /// 大きさのみによる比較（成分の辞書順ではない）
    pub fn cmp_speed(&self, other: &Velocity3D) -> Option<Ordering> {
        self.speed().partial_cmp(&other.speed())
    }
}

impl Add for Velocity3D {
    type Output = Self;

    fn add(self, other: Self) -> Self::Output {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl Sub for Velocity3D {
    type Output = Self;

    fn sub(self, other: Self) -> Self::Output {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

impl Mul<f64> for Velocity3D {
    type Output = Self;

    fn mul(self, scalar: f64) -> Self::Output {
        Self::new(self.x * scalar, self.y * scalar, self.z * scalar)
    }
}

// 1ティック分の速度変化
impl Add<Acceleration3D> for Velocity3D {
    type Output = Self;

    fn add(self, acceleration: Acceleration3D) -> Self::Output {
        Self::new(self.x + acceleration.x, self.y + acceleration.y, self.z + acceleration.z)
    }
}

impl fmt::Display for Velocity3D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Vel<{:.2}, {:.2}, {:.2}>", self.x, self.y, self.z)
    }
}

/// 3次元加速度を表す構造体
///
/// 1ティックあたりの速度増分として保持します。
/// 毎秒の値（m/s²）を1000で割った値が格納されます。
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Acceleration3D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Acceleration3D {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    /// 毎秒の値から作成（1000で割って格納）
    pub fn from_per_second(x: f64, y: f64, z: f64) -> Self {
        Self::new(x / TICKS_PER_SECOND, y / TICKS_PER_SECOND, z / TICKS_PER_SECOND)
    }

    /// 単位方向ベクトルに沿った加速度（`per_second` はm/s²）
    pub fn along(direction: Velocity3D, per_second: f64) -> Self {
        let scale = per_second / TICKS_PER_SECOND;
        Self::new(direction.x * scale, direction.y * scale, direction.z * scale)
    }

    /// 加速度ベクトルの大きさ（格納単位）
    pub fn magnitude(&self) -> f64 {
        (self.x.powi(2) + self.y.powi(2) + self.z.powi(2)).sqrt()
    }

    /// 毎秒の値に換算した大きさ（m/s²）
    pub fn magnitude_per_second(&self) -> f64 {
        self.magnitude() * TICKS_PER_SECOND
    }
}

impl Add for Acceleration3D {
    type Output = Self;

    fn add(self, other: Self) -> Self::Output {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl Mul<f64> for Acceleration3D {
    type Output = Self;

    fn mul(self, scalar: f64) -> Self::Output {
        Self::new(self.x * scalar, self.y * scalar, self.z * scalar)
    }
}

/// 移動体のある時点での運動状態
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KinematicState {
    pub position: Position3D,
    pub velocity: Velocity3D,
    pub acceleration: Acceleration3D,
    /// 移動体の内部時計（ms）
    pub time_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_position_distances() {
        let a = Position3D::new(3.0, 4.0, 0.0);
        let b = Position3D::new(0.0, 0.0, 12.0);
        assert_approx_eq!(a.distance_to_origin(), 5.0);
        assert_approx_eq!(a.distance_to(&b), 13.0);
        assert_eq!(a - a, Position3D::origin());
    }

    #[test]
    fn test_velocity_unit_conversion() {
        let v = Velocity3D::from_mps(13.9, 0.0, 0.0);
        assert_approx_eq!(v.x, 0.0139);
        assert_approx_eq!(v.speed_mps(), 13.9);
        assert_approx_eq!(v.to_mps().x, 13.9);
    }

    #[test]
    fn test_unit_vector_of_zero_is_none() {
        assert!(Velocity3D::zero().unit_vector().is_none());

        let unit = Velocity3D::new(0.0, -2.0, 0.0).unit_vector().unwrap();
        assert_approx_eq!(unit.y, -1.0);
        assert_approx_eq!(unit.speed(), 1.0);
    }

    #[test]
    fn test_speed_ordering_ignores_direction() {
        let slow = Velocity3D::new(5.0, 0.0, 0.0);
        let fast = Velocity3D::new(0.0, -6.0, 0.0);
        assert_eq!(slow.cmp_speed(&fast), Some(Ordering::Less));
        assert_eq!(fast.cmp_speed(&slow), Some(Ordering::Greater));
        assert_eq!(
            Velocity3D::new(3.0, 4.0, 0.0).cmp_speed(&Velocity3D::new(0.0, 0.0, -5.0)),
            Some(Ordering::Equal)
        );
    }

    #[test]
    fn test_acceleration_along_direction() {
        let direction = Velocity3D::new(1.0, 0.0, 0.0);
        let a = Acceleration3D::along(direction, -GRAVITY_MPS2 * 0.7);
        assert_approx_eq!(a.x, -0.006867);
        assert_approx_eq!(a.magnitude_per_second(), 6.867);
    }

    #[test]
    fn test_position_plus_velocity() {
        let p = Position3D::new(1.0, 1.0, 0.0) + Velocity3D::new(0.5, -0.5, 0.0) * 2.0;
        assert_eq!(p, Position3D::new(2.0, 0.0, 0.0));
    }
}
