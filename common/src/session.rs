//! セッション状態機械
//!
//! 状態は所有された値として扱い、遷移は `update(state, event)` の純粋関数で表す。
//! 外部呼び出しが必要な遷移は `Effect::Analyze` を返し、実行は呼び出し側に任せる。
//!
//! ```text
//! Landing --Submit--> Scanning --Succeeded--> Reasoning --Refine--> Reasoning(refining)
//!                        |                        ^                      |
//!                        +--Failed--> Error       +------Succeeded-------+
//! (any) --Reset--> Landing
//! ```

use crate::types::{AnalysisInput, CoPilotAnalysis};
use serde::{Deserialize, Serialize};

/// 失敗メッセージが空だった場合の表示
pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong.";

/// 現在のビュー
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    #[default]
    Landing,
    Scanning,
    Reasoning,
    Error,
}

/// セッション状態
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub view: View,
    pub input_data: AnalysisInput,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<CoPilotAnalysis>,
    pub is_loading: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SessionState {
    /// 既存の結果を表示したまま再解析中か
    pub fn is_refining(&self) -> bool {
        self.is_loading && self.view == View::Reasoning
    }
}

/// 状態機械への入力
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// 画像またはテキストの送信
    Submit(AnalysisInput),
    /// 確認質問への回答
    Refine(String),
    AnalysisSucceeded(CoPilotAnalysis),
    AnalysisFailed(String),
    /// エラーバナーを閉じる
    DismissError,
    Reset,
}

/// 遷移に伴って呼び出し側が実行すべき処理
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// マージ済み入力で解析を実行
    Analyze(AnalysisInput),
}

/// 状態遷移
pub fn update(state: SessionState, event: Event) -> (SessionState, Option<Effect>) {
    match event {
        Event::Submit(patch) => submit(state, patch),

        Event::Refine(answer) => {
            let answer = answer.trim();
            if state.view != View::Reasoning || answer.is_empty() {
                return (state, None);
            }
            submit(state, AnalysisInput::from_clarification(answer))
        }

        Event::AnalysisSucceeded(analysis) => {
            if !state.is_loading {
                return (state, None);
            }
            let next = SessionState {
                view: View::Reasoning,
                analysis: Some(analysis),
                is_loading: false,
                error: None,
                ..state
            };
            (next, None)
        }

        Event::AnalysisFailed(message) => {
            if !state.is_loading {
                return (state, None);
            }
            let message = if message.trim().is_empty() {
                GENERIC_FAILURE_MESSAGE.to_string()
            } else {
                message
            };
            // 再解析の失敗では直前の結果を残し、バナーとして表示する
            let view = if state.analysis.is_some() {
                View::Reasoning
            } else {
                View::Error
            };
            let next = SessionState {
                view,
                is_loading: false,
                error: Some(message),
                ..state
            };
            (next, None)
        }

        Event::DismissError => match state.view {
            View::Error => (SessionState::default(), None),
            _ => (SessionState { error: None, ..state }, None),
        },

        Event::Reset => (SessionState::default(), None),
    }
}

fn submit(state: SessionState, patch: AnalysisInput) -> (SessionState, Option<Effect>) {
    // 実行中の呼び出しがあれば重ねて発行しない
    if state.is_loading {
        return (state, None);
    }

    let input_data = state.input_data.merge(&patch);
    let view = if state.analysis.is_some() {
        View::Reasoning
    } else {
        View::Scanning
    };
    let next = SessionState {
        view,
        input_data: input_data.clone(),
        is_loading: true,
        error: None,
        ..state
    };
    (next, Some(Effect::Analyze(input_data)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::IngredientInsight;

    fn analysis(concern: &str) -> CoPilotAnalysis {
        CoPilotAnalysis {
            overall_narrative: format!("narrative for {}", concern),
            insights: vec![IngredientInsight {
                ingredient: "sugar".to_string(),
                is_primary_concern: true,
                ..Default::default()
            }],
            clarifying_questions: vec!["Is this for a child?".to_string()],
            ..Default::default()
        }
    }

    fn reasoning_state() -> SessionState {
        let (state, _) = update(SessionState::default(), Event::Submit(AnalysisInput::from_text("sugar, salt")));
        let (state, _) = update(state, Event::AnalysisSucceeded(analysis("first")));
        state
    }

    #[test]
    fn test_initial_state_is_landing() {
        let state = SessionState::default();
        assert_eq!(state.view, View::Landing);
        assert!(!state.is_loading);
        assert!(state.input_data.is_empty());
    }

    #[test]
    fn test_submit_from_landing_enters_scanning() {
        let (state, effect) =
            update(SessionState::default(), Event::Submit(AnalysisInput::from_text("sugar")));

        assert_eq!(state.view, View::Scanning);
        assert!(state.is_loading);
        assert!(!state.is_refining());
        assert_eq!(effect, Some(Effect::Analyze(AnalysisInput::from_text("sugar"))));
    }

    #[test]
    fn test_success_moves_to_reasoning() {
        let state = reasoning_state();
        assert_eq!(state.view, View::Reasoning);
        assert!(!state.is_loading);
        assert_eq!(state.analysis, Some(analysis("first")));
        assert_eq!(state.error, None);
    }

    #[test]
    fn test_failure_from_landing_moves_to_error() {
        let (state, _) =
            update(SessionState::default(), Event::Submit(AnalysisInput::from_text("sugar")));
        let (state, effect) = update(state, Event::AnalysisFailed("No response from Aura.".into()));

        assert_eq!(state.view, View::Error);
        assert!(!state.is_loading);
        assert_eq!(state.error.as_deref(), Some("No response from Aura."));
        assert_eq!(effect, None);
    }

    #[test]
    fn test_empty_failure_message_gets_fallback() {
        let (state, _) =
            update(SessionState::default(), Event::Submit(AnalysisInput::from_text("sugar")));
        let (state, _) = update(state, Event::AnalysisFailed(String::new()));
        assert_eq!(state.error.as_deref(), Some(GENERIC_FAILURE_MESSAGE));
    }

    #[test]
    fn test_refine_merges_answer_and_keeps_result_visible() {
        let state = reasoning_state();
        let (state, effect) = update(state, Event::Refine("  for my toddler ".into()));

        assert_eq!(state.view, View::Reasoning);
        assert!(state.is_refining());
        assert!(state.analysis.is_some());
        let expected = AnalysisInput {
            text: Some("sugar, salt".to_string()),
            image: None,
            additional_context: Some("for my toddler".to_string()),
        };
        assert_eq!(state.input_data, expected);
        assert_eq!(effect, Some(Effect::Analyze(expected)));
    }

    #[test]
    fn test_refine_success_replaces_analysis_wholesale() {
        let (state, _) = update(reasoning_state(), Event::Refine("diabetic adult".into()));
        let (state, _) = update(state, Event::AnalysisSucceeded(analysis("second")));

        assert_eq!(state.analysis, Some(analysis("second")));
        assert_eq!(state.input_data.additional_context.as_deref(), Some("diabetic adult"));
    }

    #[test]
    fn test_refine_failure_keeps_prior_result_with_banner() {
        let (state, _) = update(reasoning_state(), Event::Refine("diabetic adult".into()));
        let (state, _) = update(state, Event::AnalysisFailed("quota exceeded".into()));

        assert_eq!(state.view, View::Reasoning);
        assert!(!state.is_loading);
        assert_eq!(state.analysis, Some(analysis("first")));
        assert_eq!(state.error.as_deref(), Some("quota exceeded"));

        let (state, _) = update(state, Event::DismissError);
        assert_eq!(state.view, View::Reasoning);
        assert_eq!(state.error, None);
        assert!(state.analysis.is_some());
    }

    #[test]
    fn test_refine_ignored_outside_reasoning_or_blank() {
        let (state, effect) = update(SessionState::default(), Event::Refine("hi".into()));
        assert_eq!(state, SessionState::default());
        assert_eq!(effect, None);

        let before = reasoning_state();
        let (state, effect) = update(before.clone(), Event::Refine("   ".into()));
        assert_eq!(state, before);
        assert_eq!(effect, None);
    }

    #[test]
    fn test_submit_while_loading_is_ignored() {
        let (loading, _) =
            update(SessionState::default(), Event::Submit(AnalysisInput::from_text("sugar")));
        let (state, effect) = update(loading.clone(), Event::Submit(AnalysisInput::from_text("salt")));

        assert_eq!(state, loading);
        assert_eq!(effect, None);
    }

    #[test]
    fn test_stale_completion_is_ignored() {
        let idle = reasoning_state();
        let (state, _) = update(idle.clone(), Event::AnalysisFailed("late".into()));
        assert_eq!(state, idle);
    }

    #[test]
    fn test_reset_from_every_view_returns_default() {
        let (scanning, _) =
            update(SessionState::default(), Event::Submit(AnalysisInput::from_text("sugar")));
        let (error, _) = update(scanning.clone(), Event::AnalysisFailed("boom".into()));
        let (refining, _) = update(reasoning_state(), Event::Refine("kid".into()));

        for state in [SessionState::default(), scanning, error, reasoning_state(), refining] {
            let (next, effect) = update(state, Event::Reset);
            assert_eq!(next, SessionState::default());
            assert_eq!(effect, None);
        }
    }

    #[test]
    fn test_dismiss_error_view_resets() {
        let (state, _) =
            update(SessionState::default(), Event::Submit(AnalysisInput::from_text("sugar")));
        let (state, _) = update(state, Event::AnalysisFailed("boom".into()));
        let (state, _) = update(state, Event::DismissError);
        assert_eq!(state, SessionState::default());
    }

    #[test]
    fn test_view_serializes_lowercase() {
        let json = serde_json::to_string(&SessionState::default()).unwrap();
        assert_eq!(json, r#"{"view":"landing","inputData":{},"isLoading":false}"#);
    }
}
