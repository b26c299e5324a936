//! 外部解析クライアント
//!
//! 解析入力を外部モデルへ送り、構造化された解析結果を受け取る。
//! トレイトを境界にして、テストではリモート側を差し替える。

mod gemini;

pub use gemini::GeminiClient;

use crate::error::Result;
use aura_common::{AnalysisInput, CoPilotAnalysis};
use std::future::Future;

/// 解析クライアント
///
/// 1回のリクエスト/レスポンスで完結する。リトライ・タイムアウトは持たない。
pub trait AnalysisClient: Send + Sync {
    fn analyze(
        &self,
        input: &AnalysisInput,
    ) -> impl Future<Output = Result<CoPilotAnalysis>> + Send;
}
