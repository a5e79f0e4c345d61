//! CSVエクスポート
//!
//! 出力ディレクトリに以下の4ファイルを作成します。
//! - `vehicle_track.csv`
//! - `pedestrian_track.csv`
//! - `vehicle_series.csv`
//! - `controller.csv`

use std::fs::{self, File};
use std::path::Path;

use csv::Writer;

use crate::error::ExportError;
use crate::models::ControlAction;
use crate::simulation::{Telemetry, TrackSample};

/// テレメトリをCSVファイルに書き出す
pub fn export_telemetry(telemetry: &Telemetry, dir: &Path) -> Result<(), ExportError> {
    fs::create_dir_all(dir)?;

    write_track(&dir.join("vehicle_track.csv"), &telemetry.vehicle_track)?;
    write_track(&dir.join("pedestrian_track.csv"), &telemetry.pedestrian_track)?;

    let mut series = Writer::from_path(dir.join("vehicle_series.csv"))?;
    series.write_record(["tick", "acceleration_mps2", "distance_to_pedestrian_m"])?;
    for sample in &telemetry.vehicle_series {
        series.write_record(&[
            sample.tick.to_string(),
            sample.acceleration_mps2.to_string(),
            sample.distance_to_pedestrian.to_string(),
        ])?;
    }
    series.flush()?;

    let mut controller = Writer::from_path(dir.join("controller.csv"))?;
    controller.write_record([
        "tick",
        "current_distance_m",
        "projected_distance_m",
        "approach_rate_mps",
        "time_to_impact_s",
        "time_to_stop_s",
        "stopping_distance_m",
        "vehicle_speed_mps",
        "action",
        "g",
    ])?;
    for report in &telemetry.controller_reports {
        let a = &report.assessment;
        let (action, g) = match report.action {
            ControlAction::Brake(g) => ("brake", g.to_string()),
            ControlAction::Accelerate(g) => ("accelerate", g.to_string()),
            ControlAction::NoAction => ("none", String::new()),
        };
        controller.write_record(&[
            report.time_ms.to_string(),
            a.current_distance.to_string(),
            a.projected_distance.to_string(),
            a.approach_rate_mps.to_string(),
            a.time_to_impact_s.map(|t| t.to_string()).unwrap_or_default(),
            a.time_to_stop_s.to_string(),
            a.stopping_distance.to_string(),
            a.vehicle_speed_mps.to_string(),
            action.to_string(),
            g,
        ])?;
    }
    controller.flush()?;

    Ok(())
}

fn write_track(path: &Path, samples: &[TrackSample]) -> Result<(), ExportError> {
    let mut writer: Writer<File> = Writer::from_path(path)?;
    writer.write_record(["tick", "x_m", "y_m", "z_m", "speed_mps"])?;
    for sample in samples {
        writer.write_record(&[
            sample.tick.to_string(),
            sample.position.x.to_string(),
            sample.position.y.to_string(),
            sample.position.z.to_string(),
            sample.speed_mps.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;
    use crate::simulation::Simulation;

    #[test]
    fn test_export_writes_all_files() {
        let mut simulation = Simulation::new(SimulationConfig::demo().with_timeout(500));
        simulation.run();

        let dir = std::env::temp_dir().join(format!("pedsim_export_{}", std::process::id()));
        export_telemetry(simulation.telemetry(), &dir).unwrap();

        let track = fs::read_to_string(dir.join("vehicle_track.csv")).unwrap();
        assert_eq!(track.lines().count(), 501);
        assert!(track.starts_with("tick,x_m,y_m,z_m,speed_mps"));

        let controller = fs::read_to_string(dir.join("controller.csv")).unwrap();
        // 200, 300, 400, 500ティック目の判断
        assert_eq!(controller.lines().count(), 5);
        assert!(dir.join("pedestrian_track.csv").exists());
        assert!(dir.join("vehicle_series.csv").exists());

        fs::remove_dir_all(&dir).unwrap();
    }
}
