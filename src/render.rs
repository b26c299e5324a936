//! 表示層
//!
//! セッション状態だけを入力にした純粋な描画関数と、操作の有効/無効判定。

use aura_common::{CoPilotAnalysis, IngredientInsight, SessionState, UncertaintyLevel, View};

/// テキスト送信に必要な最小文字数（これを超えると送信可能）
pub const MIN_TEXT_LENGTH: usize = 5;

pub const LOADING_MESSAGE: &str = "Consulting Aura...";

const RULE: &str = "────────────────────────────────────────";

/// 状態から決まる表示分岐
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// 入力フォーム
    Capture,
    /// 初回解析中
    Loading,
    /// 解析結果（refining: 再解析中）
    Reasoning { refining: bool },
    /// エラービュー
    Failure,
}

impl Screen {
    pub fn of(state: &SessionState) -> Self {
        if state.is_loading && state.view != View::Reasoning {
            return Screen::Loading;
        }
        match (state.view, &state.analysis) {
            (View::Reasoning, Some(_)) => Screen::Reasoning {
                refining: state.is_loading,
            },
            (View::Error, _) => Screen::Failure,
            // 結果の無い Reasoning はありえないが、入力フォームに戻す
            _ => Screen::Capture,
        }
    }
}

/// テキスト送信ボタンの有効判定
pub fn can_submit_text(text: &str) -> bool {
    text.trim().chars().count() > MIN_TEXT_LENGTH
}

/// 回答送信ボタンの有効判定（空欄・再解析中は無効）
pub fn can_refine(answer: &str, refining: bool) -> bool {
    !answer.trim().is_empty() && !refining
}

/// 信頼度を百分率に（0〜1 と 0〜100 のどちらで来ても扱う）
pub fn confidence_percent(confidence: f64) -> u8 {
    let pct = if confidence <= 1.0 { confidence * 100.0 } else { confidence };
    pct.clamp(0.0, 100.0).round() as u8
}

/// 不確実性バッジ（理由があればツールチップ相当として併記）
pub fn uncertainty_badge(level: UncertaintyLevel, reason: Option<&str>) -> String {
    match reason.map(str::trim).filter(|r| !r.is_empty()) {
        Some(reason) => format!("[{} Uncertainty: {}]", level, reason),
        None => format!("[{} Uncertainty]", level),
    }
}

/// 状態全体を描画
pub fn render(state: &SessionState) -> String {
    match Screen::of(state) {
        Screen::Capture => render_capture(),
        Screen::Loading => render_loading(),
        Screen::Reasoning { refining } => match &state.analysis {
            Some(analysis) => render_reasoning(analysis, state.error.as_deref(), refining),
            None => render_capture(),
        },
        Screen::Failure => render_failure(state.error.as_deref().unwrap_or_default()),
    }
}

fn render_capture() -> String {
    let lines = [
        "What are we looking at today?".to_string(),
        "Labels are for regulators. I'm here for you. Share a photo or a list of ingredients.".to_string(),
        String::new(),
        "  • Scan Label  (path to a photo of the ingredient list)".to_string(),
        format!("  • Type ingredients  (more than {} characters)", MIN_TEXT_LENGTH),
    ];
    join_lines(&lines)
}

fn render_loading() -> String {
    format!(
        "{}\nInferring your concerns, analyzing scientific nuances, and balancing uncertainty.\n",
        LOADING_MESSAGE
    )
}

fn render_failure(message: &str) -> String {
    format!("Something clouded our view\n{}\n\n[Try Again]\n", message)
}

fn render_reasoning(analysis: &CoPilotAnalysis, error: Option<&str>, refining: bool) -> String {
    let intent = &analysis.inferred_intent;
    let mut lines = vec![
        format!("INFERRED INTENT ({}% confidence)", confidence_percent(intent.confidence)),
        format!("\"I'm looking at this with {} in mind.\"", intent.concern),
        intent.reasoning.clone(),
    ];

    if let Some(error) = error {
        lines.push(String::new());
        lines.push(format!("! Couldn't refine: {}", error));
    }

    if let Some(question) = analysis.first_question() {
        lines.push(String::new());
        lines.push("A quick question to refine my perspective:".to_string());
        lines.push(format!("  \"{}\"", question));
        if refining {
            lines.push("  Refining...".to_string());
        }
    }

    lines.push(String::new());
    lines.push("THE HOLISTIC VIEW".to_string());
    lines.push(analysis.overall_narrative.clone());

    lines.push(String::new());
    lines.push("MEANINGFUL SIGNALS".to_string());
    for insight in analysis.ordered_insights() {
        lines.extend(insight_lines(insight));
    }

    lines.push(RULE.to_string());
    lines.push("CO-PILOT RECOMMENDATION".to_string());
    lines.push(analysis.suggested_action.clone());
    lines.push("[Reset]".to_string());
    join_lines(&lines)
}

fn insight_lines(insight: &IngredientInsight) -> [String; 5] {
    let marker = if insight.is_primary_concern { "●" } else { "○" };
    [
        RULE.to_string(),
        format!(
            "{} {}  {}",
            marker,
            insight.ingredient,
            uncertainty_badge(insight.uncertainty, insight.uncertainty_reason.as_deref())
        ),
        format!("  Impact: {}", insight.impact),
        format!("  Perspective: {}", insight.why_it_matters),
        format!("  The Trade-off: {}", insight.tradeoff),
    ]
}

/// 各行を改行付きで連結
fn join_lines(lines: &[String]) -> String {
    lines.iter().map(|line| format!("{}\n", line)).collect()
}
