use std::path::Path;
use std::str::FromStr;

use clap::{Arg, ArgAction, Command};
use pedsim::config::SimulationConfig;
use pedsim::export::export_telemetry;
use pedsim::logging::{LogConfig, LogOutput, init_logging, level_from_verbosity, parse_log_level};
use pedsim::scenario::ScenarioConfig;
use pedsim::simulation::{RunOutcome, RunSummary, Simulation};
use tracing::info;

fn main() {
    // コマンドライン引数の解析
    let matches = Command::new("pedsim")
        .version("0.1.0")
        .about("歩行者衝突回避シミュレーション (Pedestrian Collision Avoidance Simulation)")
        .long_about("車両と歩行者の衝突回避シミュレーション\n\
                     1ms刻みの時間駆動型シミュレーションで制動制御の効果と走行効率を評価します。")
        .arg(
            Arg::new("scenario")
                .short('s')
                .long("scenario")
                .value_name("FILE")
                .help("シナリオファイル(.yaml)のパスを指定")
                .long_help("実行するシナリオファイル(.yaml)のパスを指定します。\n\
                           指定しない場合、既定のデモケースを実行します。")
        )
        .arg(
            Arg::new("info")
                .short('i')
                .long("info")
                .action(ArgAction::SetTrue)
                .requires("scenario")
                .help("シナリオの情報のみ表示して終了")
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .help("詳細出力レベル (-v: 基本, -vv: 詳細, -vvv: トレース)")
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .value_name("TICKS")
                .value_parser(clap::value_parser!(u64))
                .help("最大ティック数（シナリオの設定を上書き）")
        )
        .arg(
            Arg::new("export")
                .long("export")
                .value_name("DIR")
                .help("テレメトリをCSVとして出力するディレクトリ")
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .help("ログレベル (trace, debug, info, warn, error)")
        )
        .arg(
            Arg::new("log-output")
                .long("log-output")
                .value_name("TARGET")
                .default_value("console")
                .help("ログ出力先 (console, file, both)")
        )
        .get_matches();

    let verbose_level = matches.get_count("verbose");

    // ログの初期化
    let output = match matches.get_one::<String>("log-output").map(|s| LogOutput::from_str(s)) {
        Some(Ok(output)) => output,
        Some(Err(e)) => {
            eprintln!("エラー: {}", e);
            std::process::exit(1);
        }
        None => LogOutput::Console,
    };
    let level = match matches.get_one::<String>("log-level") {
        Some(level) => parse_log_level(level),
        None => level_from_verbosity(verbose_level),
    };
    let log_config = LogConfig {
        level,
        output,
        ..LogConfig::default()
    };
    let _guard = match init_logging(&log_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("ログ初期化エラー: {}", e);
            std::process::exit(1);
        }
    };

    println!("歩行者衝突回避シミュレーション - pedsim v0.1.0");
    println!();

    if verbose_level > 0 {
        println!("詳細出力レベル: {}", verbose_level);
    }

    let options = RunOptions {
        info_only: matches.get_flag("info"),
        verbose_level,
        timeout: matches.get_one::<u64>("timeout").copied(),
        export_dir: matches.get_one::<String>("export").map(String::as_str),
    };

    let result = match matches.get_one::<String>("scenario") {
        Some(scenario_path) => run_scenario(scenario_path, &options),
        None => {
            println!("シナリオ未指定のため、既定のデモケースを実行します。");
            println!();
            execute(SimulationConfig::demo(), &options)
        }
    };

    if let Err(e) = result {
        eprintln!("エラー: {}", e);
        std::process::exit(1);
    }
}

/// コマンドラインから指定された実行オプション
struct RunOptions<'a> {
    info_only: bool,
    verbose_level: u8,
    timeout: Option<u64>,
    export_dir: Option<&'a str>,
}

/// シナリオファイルを読み込んで実行
fn run_scenario(scenario_path: &str, options: &RunOptions) -> Result<(), Box<dyn std::error::Error>> {
    let scenario = ScenarioConfig::from_file(scenario_path)?;

    if options.verbose_level > 0 {
        println!("シナリオファイル読み込み完了: {}", scenario_path);
    }

    scenario.print_summary();
    println!();

    // 情報表示のみの場合
    if options.info_only {
        return Ok(());
    }

    execute(scenario.to_simulation_config(), options)
}

/// シミュレーションの実行と結果の出力
fn execute(mut config: SimulationConfig, options: &RunOptions) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(timeout) = options.timeout {
        config = config.with_timeout(timeout);
    }

    let mut simulation = Simulation::new(config).with_verbosity(options.verbose_level);
    let summary = simulation.run();
    print_summary(&summary);

    if let RunOutcome::Aborted(reason) = &summary.outcome {
        return Err(format!("シミュレーションは中断されました: {}", reason).into());
    }

    if let Some(dir) = options.export_dir {
        export_telemetry(simulation.telemetry(), Path::new(dir))?;
        info!(dir = %dir, "TELEMETRY_EXPORTED: テレメトリを出力しました");
        println!("テレメトリ出力先: {}", dir);
    }

    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!("=== 実行結果: {} ===", summary.name);
    println!("結果: {}", summary.outcome);
    println!("衝突: {}", if summary.impact { "あり" } else { "なし" });
    println!("経過時間: {:.3}秒 ({}ティック)", summary.elapsed_seconds(), summary.elapsed_ticks);
    match summary.efficiency_percent {
        Some(efficiency) => println!("効率: {:.2}%", efficiency),
        None => println!("効率: -"),
    }
}
