//! 対話セッション
//!
//! 状態機械の効果（外部解析呼び出し）を実行するドライバと、
//! 端末上の対話ループ。呼び出しは常に1件ずつ完了まで待つ。

use crate::client::AnalysisClient;
use crate::error::Result;
use crate::error::AuraError;
use crate::input::{has_image_extension, load_image_data_url};
use crate::render::{can_refine, can_submit_text, render, Screen, LOADING_MESSAGE, MIN_TEXT_LENGTH};
use aura_common::{update, AnalysisInput, Effect, Event, SessionState};
use dialoguer::Input;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 状態とクライアントを持つセッション
pub struct Session<C> {
    client: C,
    state: SessionState,
    show_progress: bool,
}

impl<C: AnalysisClient> Session<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            state: SessionState::default(),
            show_progress: false,
        }
    }

    /// 解析中にスピナーを表示する
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn into_state(self) -> SessionState {
        self.state
    }

    /// イベントを適用し、効果があれば完了まで実行して結果を反映する
    pub async fn dispatch(&mut self, event: Event) -> &SessionState {
        let effect = self.apply(event);

        if let Some(Effect::Analyze(input)) = effect {
            let outcome = self.analyze(&input).await;
            let completion = match outcome {
                Ok(analysis) => Event::AnalysisSucceeded(analysis),
                Err(e) => {
                    tracing::warn!("解析失敗: {}", e);
                    Event::AnalysisFailed(e.user_message())
                }
            };
            self.apply(completion);
        }

        &self.state
    }

    fn apply(&mut self, event: Event) -> Option<Effect> {
        let (next, effect) = update(std::mem::take(&mut self.state), event);
        tracing::debug!(view = ?next.view, loading = next.is_loading, "state");
        self.state = next;
        effect
    }

    async fn analyze(&self, input: &AnalysisInput) -> Result<aura_common::CoPilotAnalysis> {
        let spinner = self.show_progress.then(|| {
            let message = if self.state.is_refining() { "Refining..." } else { LOADING_MESSAGE };
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::with_template("{spinner} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb.set_message(message);
            pb.enable_steady_tick(Duration::from_millis(120));
            pb
        });

        let result = self.client.analyze(input).await;

        if let Some(pb) = spinner {
            pb.finish_and_clear();
        }
        result
    }
}

/// 入力フォームでの操作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureAction {
    /// 画像ファイルを送信
    Image(PathBuf),
    /// 画像パスらしいがファイルが無い
    MissingImage(PathBuf),
    /// 成分テキストを送信
    Text(String),
    /// 最小文字数に満たない
    TooShort,
    Quit,
}

/// 結果ビューでの操作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReasoningAction {
    /// 確認質問への回答
    Answer(String),
    DismissError,
    Reset,
    Quit,
    /// 何もしない（空入力など）
    Stay,
}

/// 入力フォームの1行を解釈
///
/// 既存ファイルのパスなら画像、画像の拡張子なのに存在しなければ送信しない。
pub fn interpret_capture(line: &str) -> CaptureAction {
    let trimmed = line.trim();
    let path = Path::new(trimmed);
    match trimmed {
        "q" | "Q" => CaptureAction::Quit,
        _ if !trimmed.is_empty() && path.is_file() => CaptureAction::Image(path.to_path_buf()),
        _ if has_image_extension(path) => CaptureAction::MissingImage(path.to_path_buf()),
        _ if can_submit_text(trimmed) => CaptureAction::Text(trimmed.to_string()),
        _ => CaptureAction::TooShort,
    }
}

/// 結果ビューの1行を解釈
pub fn interpret_reasoning(line: &str, state: &SessionState) -> ReasoningAction {
    let trimmed = line.trim();
    let has_question = state
        .analysis
        .as_ref()
        .and_then(|a| a.first_question())
        .is_some();

    match trimmed {
        "q" | "Q" => ReasoningAction::Quit,
        "r" | "R" => ReasoningAction::Reset,
        "" if state.error.is_some() => ReasoningAction::DismissError,
        _ if has_question && can_refine(trimmed, state.is_refining()) => {
            ReasoningAction::Answer(trimmed.to_string())
        }
        _ => ReasoningAction::Stay,
    }
}

/// 端末上で対話セッションを実行
pub async fn run_interactive<C: AnalysisClient>(client: C) -> Result<()> {
    let mut session = Session::new(client).with_progress(true);

    loop {
        println!("\n{}", render(session.state()));

        match Screen::of(session.state()) {
            Screen::Capture => {
                let line: String = Input::new()
                    .with_prompt("Image path or ingredients (q:終了)")
                    .allow_empty(true)
                    .interact_text()?;

                match interpret_capture(&line) {
                    CaptureAction::Image(path) => match load_image_data_url(&path) {
                        Ok(data_url) => {
                            session.dispatch(Event::Submit(AnalysisInput::from_image(data_url))).await;
                        }
                        Err(e) => eprintln!("✗ {}", e),
                    },
                    CaptureAction::MissingImage(path) => {
                        eprintln!("✗ {}", AuraError::FileNotFound(path.display().to_string()));
                    }
                    CaptureAction::Text(text) => {
                        session.dispatch(Event::Submit(AnalysisInput::from_text(text))).await;
                    }
                    CaptureAction::TooShort => {
                        eprintln!("✗ {}文字より長く入力してください", MIN_TEXT_LENGTH);
                    }
                    CaptureAction::Quit => return Ok(()),
                }
            }

            Screen::Reasoning { .. } => {
                let state = session.state();
                let prompt = match (state.analysis.as_ref().and_then(|a| a.first_question()), &state.error) {
                    (Some(_), Some(_)) => "Your response (Enter:閉じる r:リセット q:終了)",
                    (Some(_), None) => "Your response (r:リセット q:終了)",
                    (None, Some(_)) => "(Enter:閉じる r:リセット q:終了)",
                    (None, None) => "(r:リセット q:終了)",
                };
                let line: String = Input::new()
                    .with_prompt(prompt)
                    .allow_empty(true)
                    .interact_text()?;

                match interpret_reasoning(&line, session.state()) {
                    ReasoningAction::Answer(answer) => {
                        session.dispatch(Event::Refine(answer)).await;
                    }
                    ReasoningAction::DismissError => {
                        session.dispatch(Event::DismissError).await;
                    }
                    ReasoningAction::Reset => {
                        session.dispatch(Event::Reset).await;
                    }
                    ReasoningAction::Quit => return Ok(()),
                    ReasoningAction::Stay => {}
                }
            }

            Screen::Failure => {
                let line: String = Input::new()
                    .with_prompt("Try Again? (Enter:やり直す q:終了)")
                    .allow_empty(true)
                    .interact_text()?;
                if matches!(line.trim(), "q" | "Q") {
                    return Ok(());
                }
                session.dispatch(Event::Reset).await;
            }

            // dispatch は完了まで待つので通常は到達しない
            Screen::Loading => {}
        }
    }
}
