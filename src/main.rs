use clap::{Arg, Command};
use std::str::FromStr;
use aimsim::logging::{self, LogConfig, LogOutput};
use aimsim::scenario::ScenarioConfig;
use aimsim::simulation::{SimulationEngine, SimulationStats};

fn main() {
    // コマンドライン引数の解析
    let matches = Command::new("aimsim")
        .version("0.1.0")
        .about("照準補助シミュレーション (Aim-Assist Simulation)")
        .long_about("フレーム単位のターゲット捕捉・照準補助エンジン\n\
                     シナリオに記述したターゲットを動かし、照準・射撃の判断を再現します。")
        .arg(
            Arg::new("scenario")
                .short('s')
                .long("scenario")
                .value_name("FILE")
                .help("シナリオファイル(.yaml)のパスを指定")
                .long_help("実行するシナリオファイル(.yaml)のパスを指定します。\n\
                           指定しない場合、使用方法を表示して終了します。")
        )
        .arg(
            Arg::new("info")
                .short('i')
                .long("info")
                .action(clap::ArgAction::SetTrue)
                .help("シナリオの情報のみ表示して終了")
                .conflicts_with("test")
        )
        .arg(
            Arg::new("test")
                .short('t')
                .long("test")
                .action(clap::ArgAction::SetTrue)
                .help("組み込みデモシナリオを実行")
                .conflicts_with("info")
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(clap::ArgAction::Count)
                .help("詳細出力レベル (-v: 基本, -vv: 詳細, -vvv: デバッグ)")
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
                .value_name("OUTPUT")
                .default_value("console")
                .help("ログ出力先 (console, file, both)")
        )
        .arg(
            Arg::new("log-dir")
                .long("log-dir")
                .value_name("DIR")
                .default_value("logs")
                .help("ログファイルの出力ディレクトリ")
        )
        .get_matches();

    println!("照準補助シミュレーション (Aim-Assist Simulation) - aimsim v0.1.0");
    println!();

    let verbose_level = matches.get_count("verbose");

    // ログ設定
    let level = matches
        .get_one::<String>("log-level")
        .map(|s| logging::parse_log_level(s))
        .unwrap_or_else(|| logging::level_from_verbosity(verbose_level));
    let output = matches
        .get_one::<String>("log-output")
        .map(|s| LogOutput::from_str(s))
        .transpose();
    let output = match output {
        Ok(output) => output.unwrap_or(LogOutput::Console),
        Err(e) => {
            eprintln!("エラー: {}", e);
            std::process::exit(2);
        }
    };
    let log_config = LogConfig {
        level,
        output,
        log_dir: matches
            .get_one::<String>("log-dir")
            .cloned()
            .unwrap_or_else(|| "logs".to_string()),
        ..LogConfig::default()
    };

    // ガードはmainの終了まで保持
    let _log_guard = match logging::init_logging(log_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("ログ初期化エラー: {}", e);
            std::process::exit(1);
        }
    };

    if verbose_level > 0 {
        println!("詳細出力レベル: {}", verbose_level);
    }

    // デモモードの実行
    if matches.get_flag("test") {
        println!("=== 組み込みデモシナリオ ===");
        if let Err(e) = execute_scenario(ScenarioConfig::demo(), verbose_level) {
            eprintln!("エラー: {}", e);
            std::process::exit(1);
        }
        return;
    }

    // シナリオファイルの処理
    if let Some(scenario_path) = matches.get_one::<String>("scenario") {
        match run_scenario(scenario_path, matches.get_flag("info"), verbose_level) {
            Ok(_) => {
                if verbose_level > 0 {
                    println!("シナリオ実行が正常に完了しました。");
                }
            }
            Err(e) => {
                eprintln!("エラー: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        show_default_help();
    }
}

/// シナリオファイルを読み込んで実行
fn run_scenario(scenario_path: &str, info_only: bool, verbose_level: u8) -> Result<(), Box<dyn std::error::Error>> {
    let scenario = ScenarioConfig::from_file(scenario_path)?;

    if verbose_level > 0 {
        println!("シナリオファイル読み込み完了: {}", scenario_path);
    }

    // 情報表示のみの場合
    if info_only {
        scenario.print_summary();
        return Ok(());
    }

    execute_scenario(scenario, verbose_level)
}

/// シナリオの実行
fn execute_scenario(scenario: ScenarioConfig, verbose_level: u8) -> Result<(), Box<dyn std::error::Error>> {
    scenario.print_summary();
    println!();

    let mut simulation = SimulationEngine::new(scenario, verbose_level);
    simulation.initialize()?;
    let stats = simulation.run()?;

    print_results(&simulation, &stats);
    Ok(())
}

/// 実行結果の表示
fn print_results(simulation: &SimulationEngine, stats: &SimulationStats) {
    let aim = simulation.orchestrator.statistics();
    let report = simulation.orchestrator.performance().report();

    println!();
    println!("=== 実行結果 ===");
    println!("総ステップ数: {}", stats.steps);
    println!("ターゲット出現/消滅: {} / {}", stats.targets_spawned, stats.targets_despawned);
    println!("照準保持: {}ティック", stats.hold_steady_ticks);
    println!("照準移動: {}ティック", stats.steering_ticks);
    println!("追跡のみ: {}ティック", stats.tracking_ticks);
    println!("候補なし: {}ティック", stats.idle_ticks);
    println!("射撃数: {}発 (命中記録: {})", aim.shots_fired, aim.hits_recorded);
    println!("マウス移動送出: {}回", stats.mouse_emissions);
    println!("ターゲット切り替え: {}回", aim.target_switches);
    println!("平均フレーム時間: {:.2}ms ({:.1} fps)", report.average_frame_ms, report.fps);

    let tracked = simulation.orchestrator.tracker().get_tracked_targets();
    if !tracked.is_empty() {
        println!();
        println!("=== 追跡中ターゲット ===");
        for target in tracked {
            println!(
                "  {}: 脅威スコア {:.1}, 追跡時間 {:.0}ms",
                target.id,
                target.threat_score,
                target.track_duration()
            );
        }
    }
}

/// デフォルトヘルプとシナリオ一覧を表示
fn show_default_help() {
    println!("使用方法:");
    println!("  aimsim [オプション]");
    println!();
    println!("オプション:");
    println!("  -s, --scenario <FILE>   シナリオファイルを指定して実行");
    println!("  -i, --info              シナリオ情報のみ表示");
    println!("  -t, --test              組み込みデモシナリオを実行");
    println!("  -v, --verbose           詳細出力 (複数指定で詳細レベル上昇)");
    println!("      --log-level <LEVEL> ログレベル");
    println!("      --log-output <OUT>  ログ出力先 (console, file, both)");
    println!("      --log-dir <DIR>     ログディレクトリ");
    println!("  -h, --help              このヘルプを表示");
    println!();
    println!("利用可能なシナリオファイル:");
    println!("  scenarios/scenario_basic.yaml        - 静止ターゲット1体");
    println!("  scenarios/scenario_moving.yaml       - 移動ターゲットの予測照準");
    println!("  scenarios/scenario_multi_target.yaml - 複数部位の優先度選択");
    println!();
    println!("例:");
    println!("  aimsim -s scenarios/scenario_basic.yaml");
    println!("  aimsim -s scenarios/scenario_moving.yaml -vv");
    println!("  aimsim -s scenarios/scenario_multi_target.yaml -i");
    println!("  aimsim --test --log-output both");
}
