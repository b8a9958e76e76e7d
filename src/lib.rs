//! # aimsim
//!
//! フレーム単位のターゲット捕捉・照準補助エンジンと、それを駆動する
//! シナリオシミュレーションを提供します。

pub mod logging;
pub mod models;
pub mod scenario;
pub mod simulation;
