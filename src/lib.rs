//! Aura: 原材料リストを読み解く消費者向けヘルス・コパイロット
//!
//! 写真またはテキストで受け取った成分リストを外部モデルに送り、
//! 構造化された判断を物語的なビューとして表示する。

pub mod app;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod input;
pub mod render;
