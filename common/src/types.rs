//! 解析入力・解析結果の型定義
//!
//! CLIとセッション状態機械で共有される型:
//! - AnalysisInput: ユーザー入力（画像・テキスト・補足回答）の累積
//! - CoPilotAnalysis: モデルが返す構造化された判断
//! - IngredientInsight: 成分ごとの洞察

use serde::{Deserialize, Serialize};
use std::fmt;

/// 解析入力
///
/// 画像はData URL（`data:image/jpeg;base64,...`）で保持する。
/// ラウンドをまたいで累積され、補足回答が既存のテキスト・画像を消すことはない。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// 確認質問への回答
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_context: Option<String>,
}

impl AnalysisInput {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn from_image(data_url: impl Into<String>) -> Self {
        Self {
            image: Some(data_url.into()),
            ..Default::default()
        }
    }

    pub fn from_clarification(answer: impl Into<String>) -> Self {
        Self {
            additional_context: Some(answer.into()),
            ..Default::default()
        }
    }

    /// パッチをマージした新しい入力を返す
    ///
    /// パッチ側に値があるフィールドだけ上書きし、無いフィールドは既存値を残す。
    pub fn merge(&self, patch: &AnalysisInput) -> AnalysisInput {
        AnalysisInput {
            text: patch.text.clone().or_else(|| self.text.clone()),
            image: patch.image.clone().or_else(|| self.image.clone()),
            additional_context: patch
                .additional_context
                .clone()
                .or_else(|| self.additional_context.clone()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.image.is_none() && self.additional_context.is_none()
    }
}

/// 推定されたユーザーの関心
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InferredIntent {
    pub concern: String,
    /// 0.0〜1.0
    pub confidence: f64,
    pub reasoning: String,
}

/// 不確実性レベル
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UncertaintyLevel {
    #[default]
    Low,
    Medium,
    High,
}

impl UncertaintyLevel {
    pub const ALL: [UncertaintyLevel; 3] = [Self::Low, Self::Medium, Self::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            UncertaintyLevel::Low => "Low",
            UncertaintyLevel::Medium => "Medium",
            UncertaintyLevel::High => "High",
        }
    }
}

impl fmt::Display for UncertaintyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UncertaintyLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UncertaintyLevel::ALL
            .into_iter()
            .find(|level| level.as_str() == s)
            .ok_or_else(|| format!("Unknown uncertainty level: {}. Use Low, Medium, or High", s))
    }
}

/// 成分ごとの洞察
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngredientInsight {
    pub ingredient: String,
    pub impact: String,
    pub why_it_matters: String,
    pub tradeoff: String,
    /// 推定された関心に直接関わる成分
    pub is_primary_concern: bool,
    pub uncertainty: UncertaintyLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uncertainty_reason: Option<String>,
}

/// モデルの解析結果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoPilotAnalysis {
    pub inferred_intent: InferredIntent,
    pub overall_narrative: String,
    pub insights: Vec<IngredientInsight>,
    pub clarifying_questions: Vec<String>,
    pub suggested_action: String,
}

impl CoPilotAnalysis {
    /// 表示する確認質問（先頭の1件のみ）
    pub fn first_question(&self) -> Option<&str> {
        self.clarifying_questions.first().map(String::as_str)
    }

    /// 主要な懸念を先に並べた洞察（各グループ内の順序は維持）
    pub fn ordered_insights(&self) -> Vec<&IngredientInsight> {
        let (primary, secondary): (Vec<_>, Vec<_>) =
            self.insights.iter().partition(|i| i.is_primary_concern);
        primary.into_iter().chain(secondary).collect()
    }
}
