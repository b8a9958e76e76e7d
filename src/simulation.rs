//! # Simulation モジュール
//!
//! 照準補助エンジンを駆動するシミュレーションループを提供します。
//!
//! シナリオに記述されたスクリプトターゲットを固定時間刻みで動かし、
//! その姿勢を毎ティック照準補助オーケストレータへ供給します。
//! オーケストレータが送出したマウス移動・射撃は記録用アクチュエータで集計します。
//!
//! ## シミュレーション処理順序
//!
//! 各時間刻みにおいて、以下の順序で処理が実行されます：
//!
//! 1. **ターゲット処理**: 出現・移動・消滅と、レジストリへの登録・姿勢更新・削除
//! 2. **入力処理**: 射撃入力の時間帯判定
//! 3. **照準補助処理**: オーケストレータの1ティック
//!
//! ## 使用例
//!
//! ```no_run
//! use aimsim::simulation::SimulationEngine;
//! use aimsim::scenario::ScenarioConfig;
//!
//! let config = ScenarioConfig::from_file("scenarios/scenario_basic.yaml")?;
//! let mut engine = SimulationEngine::new(config, 1);
//! engine.initialize()?;
//! engine.run()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::collections::HashSet;
use crate::models::{
    camera::CameraModel,
    common::math_utils,
    orchestrator::{AutoAimOrchestrator, TickOutcome},
    target::ScriptedTarget,
    traits::{IAgent, RecordingActuator},
};
use crate::scenario::{ScenarioConfig, ScenarioError};
use tracing::{info, debug, trace};

/// 暴走防止のステップ上限
const MAX_STEPS: u64 = 1_000_000;

/// 実行結果の集計
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulationStats {
    pub steps: u64,
    pub disabled_ticks: u64,
    pub idle_ticks: u64,
    pub tracking_ticks: u64,
    pub hold_steady_ticks: u64,
    pub steering_ticks: u64,
    pub shots_fired: u32,
    pub mouse_emissions: usize,
    pub targets_spawned: u32,
    pub targets_despawned: u32,
}

impl SimulationStats {
    fn record(&mut self, outcome: &TickOutcome) {
        match outcome {
            TickOutcome::Disabled => self.disabled_ticks += 1,
            TickOutcome::NoCandidates => self.idle_ticks += 1,
            TickOutcome::Tracking { .. } => self.tracking_ticks += 1,
            TickOutcome::HoldSteady { .. } => self.hold_steady_ticks += 1,
            TickOutcome::Steering { .. } => self.steering_ticks += 1,
        }
    }
}

pub struct SimulationEngine {
    pub current_time: f64,
    pub dt: f64,
    pub max_time: f64,
    pub step_count: u64,

    pub orchestrator: AutoAimOrchestrator,
    pub targets: Vec<ScriptedTarget>,
    pub actuator: RecordingActuator,
    pub stats: SimulationStats,

    /// オーケストレータに登録済みのターゲットID
    registered: HashSet<String>,
    fire_pressed: bool,

    pub scenario_config: ScenarioConfig,
    pub verbose_level: u8,
}

impl SimulationEngine {
    pub fn new(scenario: ScenarioConfig, verbose_level: u8) -> Self {
        let camera = CameraModel::new(
            scenario.camera.position,
            math_utils::deg_to_rad(scenario.camera.yaw_deg),
            math_utils::deg_to_rad(scenario.camera.pitch_deg),
            scenario.camera.tuning,
        );
        let orchestrator = AutoAimOrchestrator::new(camera, scenario.settings);

        Self {
            current_time: 0.0,
            dt: scenario.sim.dt_s,
            max_time: scenario.sim.t_max_s,
            step_count: 0,
            orchestrator,
            targets: Vec::new(),
            actuator: RecordingActuator::default(),
            stats: SimulationStats::default(),
            registered: HashSet::new(),
            fire_pressed: false,
            scenario_config: scenario,
            verbose_level,
        }
    }

    pub fn initialize(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if self.verbose_level > 0 {
            info!("シミュレーションエンジンを初期化中...");
        }

        self.initialize_input();
        self.initialize_targets()?;

        if self.verbose_level > 0 {
            info!("初期化完了:");
            info!("  ターゲット: {}体", self.targets.len());
        }

        Ok(())
    }

    fn initialize_input(&mut self) {
        let input = &self.scenario_config.input;
        self.orchestrator.set_auto_fire(input.auto_fire);
        self.orchestrator.set_crosshair(input.crosshair);
        self.fire_pressed = input.fire_pressed_at(0.0);
        self.orchestrator.set_fire_pressed(self.fire_pressed);
    }

    fn initialize_targets(&mut self) -> Result<(), ScenarioError> {
        let mut targets = Vec::with_capacity(self.scenario_config.targets.len());

        for target_config in &self.scenario_config.targets {
            let kind = ScenarioConfig::target_kind(target_config)?;
            let collider = target_config.collider.clone().unwrap_or_default();

            let mut target = ScriptedTarget::new(
                target_config.id.clone(),
                kind,
                collider,
                target_config.pose,
            )
            .with_velocity(target_config.velocity)
            .with_schedule(target_config.spawn_time_s, target_config.despawn_time_s);

            target.initialize(&self.scenario_config);

            if self.verbose_level > 1 {
                debug!("ターゲット初期化: {} ({}, 出現時刻: {:.1}秒)",
                        target.get_id(),
                        target.kind,
                        target.spawn_time);
            }

            targets.push(target);
        }

        self.targets = targets;
        Ok(())
    }

    pub fn run(&mut self) -> Result<SimulationStats, Box<dyn std::error::Error>> {
        info!("=== シミュレーション実行開始 ===");

        while self.current_time < self.max_time {
            self.step()?;

            if self.verbose_level > 2 {
                trace!("時刻: {:.3}秒 (ステップ: {})", self.current_time, self.step_count);
            }

            if self.step_count % 100 == 0 && self.verbose_level > 0 {
                let progress = (self.current_time / self.max_time) * 100.0;
                info!("進行状況: {:.1}% ({:.1}/{:.1}秒)", progress, self.current_time, self.max_time);
            }

            if self.step_count > MAX_STEPS {
                break;
            }
        }

        self.stats.steps = self.step_count;
        self.stats.shots_fired = self.actuator.fire_count;
        self.stats.mouse_emissions = self.actuator.nonzero_deltas();

        let report = self.orchestrator.performance().report();
        let aim = self.orchestrator.statistics();
        info!("=== シミュレーション完了 ===");
        info!("実行時間: {:.2}秒", self.current_time);
        info!("総ステップ数: {}", self.step_count);
        info!(
            shots_fired = aim.shots_fired,
            hits_recorded = aim.hits_recorded,
            target_switches = aim.target_switches,
            mouse_emissions = aim.mouse_emissions,
            "SIM_SUMMARY: 照準補助の集計"
        );
        info!(
            average_frame_ms = report.average_frame_ms,
            fps = report.fps,
            "SIM_PERFORMANCE: フレーム計測"
        );

        Ok(self.stats.clone())
    }

    pub fn step(&mut self) -> Result<(), ScenarioError> {
        self.current_time += self.dt;
        self.step_count += 1;

        self.process_targets()?;
        self.process_input();
        self.process_aim();

        Ok(())
    }

    fn process_targets(&mut self) -> Result<(), ScenarioError> {
        for target in &mut self.targets {
            if target.is_despawned() {
                continue;
            }
            target.tick(self.dt);

            let id = target.get_id();
            if target.is_despawned() {
                if self.registered.remove(&id) {
                    self.orchestrator.remove_target(&id);
                    self.stats.targets_despawned += 1;
                }
                continue;
            }
            if !target.is_active() {
                continue;
            }

            if self.registered.contains(&id) {
                self.orchestrator.update_target_pose(&id, &target.pose, self.dt);
            } else {
                self.orchestrator
                    .register_target(&target.collider, &target.pose, target.kind, Some(&id))
                    .map_err(|e| ScenarioError::Target(id.clone(), e))?;
                self.registered.insert(id);
                self.stats.targets_spawned += 1;
            }
        }

        Ok(())
    }

    fn process_input(&mut self) {
        let pressed = self.scenario_config.input.fire_pressed_at(self.current_time);
        if pressed != self.fire_pressed {
            debug!(time_s = self.current_time, pressed, "INPUT_FIRE: 射撃入力が変化しました");
            self.fire_pressed = pressed;
            self.orchestrator.set_fire_pressed(pressed);
        }
    }

    fn process_aim(&mut self) {
        let now_ms = self.current_time * 1000.0;
        let outcome = self.orchestrator.update(now_ms, self.dt, &mut self.actuator);
        self.stats.record(&outcome);
    }
}
