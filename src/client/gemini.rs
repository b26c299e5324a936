//! Gemini API連携
//!
//! システム指示（出力スキーマ込み）と入力パートを generateContent に送り、
//! 返ってきたテキストを共通パーサーで検証・変換する。

use super::AnalysisClient;
use crate::config::Config;
use crate::error::{AuraError, Result};
use aura_common::{
    build_parts, parse_analysis_response, AnalysisInput, CoPilotAnalysis, PromptPart,
    SYSTEM_INSTRUCTION,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Gemini APIリクエスト
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    system_instruction: Content,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Debug, Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    response_mime_type: String,
}

/// Gemini APIレスポンス
#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

/// APIエラー応答（`{"error": {"message": ...}}`）
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl From<PromptPart> for Part {
    fn from(part: PromptPart) -> Self {
        match part {
            PromptPart::Text(text) => Part::Text { text },
            PromptPart::InlineImage { mime_type, data } => Part::InlineData {
                inline_data: InlineData { mime_type, data },
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeminiClient {
    api_key: String,
    model: String,
    endpoint: String,
    temperature: f32,
    client: Client,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String, endpoint: String, temperature: f32) -> Self {
        Self {
            api_key,
            model,
            endpoint,
            temperature,
            client: Client::new(),
        }
    }

    /// HTTPクライアントを差し替える（プロキシ設定など）
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.resolve_api_key(),
            config.model.clone(),
            config.endpoint.clone(),
            config.temperature,
        )
    }

    fn build_request(&self, input: &AnalysisInput) -> GeminiRequest {
        GeminiRequest {
            system_instruction: Content {
                parts: vec![Part::Text {
                    text: SYSTEM_INSTRUCTION.to_string(),
                }],
            },
            contents: vec![Content {
                parts: build_parts(input).into_iter().map(Part::from).collect(),
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                response_mime_type: "application/json".to_string(),
            },
        }
    }

    fn generate_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        )
    }

    /// Gemini API呼び出し。本文テキストが無ければ None
    async fn call_gemini_api(&self, request: &GeminiRequest) -> Result<Option<String>> {
        let url = self.generate_url();
        tracing::debug!(url = %url, model = %self.model, "Gemini API request");

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(request)
            .send()
            .await
            .map_err(|e| {
                // URLにはAPIキーが含まれるため落とす
                let e = e.without_url();
                tracing::error!("Gemini API request failed: {}", e);
                AuraError::ApiCall(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Gemini API error: {} - {}", status, body);
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|b| b.error.message)
                .unwrap_or(body);
            return Err(AuraError::ApiCall(message.trim().to_string()));
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            let e = e.without_url();
            tracing::error!("Failed to decode Gemini envelope: {}", e);
            AuraError::ApiCall(e.to_string())
        })?;

        Ok(extract_text(gemini_response))
    }
}

/// 先頭候補のテキストパートを連結（空なら None）
fn extract_text(response: GeminiResponse) -> Option<String> {
    let text: String = response
        .candidates
        .into_iter()
        .next()?
        .content?
        .parts
        .into_iter()
        .filter_map(|p| p.text)
        .collect();

    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

/// モデル出力テキストを解析結果に変換
///
/// 失敗時はパーサーの詳細を表に出さず、固定メッセージのエラーにする。
pub(crate) fn interpret_response(text: &str) -> Result<CoPilotAnalysis> {
    parse_analysis_response(text).map_err(|e| {
        tracing::error!(payload = %text, "Failed to parse AI response: {}", e);
        AuraError::Processing
    })
}

impl AnalysisClient for GeminiClient {
    async fn analyze(&self, input: &AnalysisInput) -> Result<CoPilotAnalysis> {
        let request = self.build_request(input);
        tracing::debug!(
            parts = request.contents[0].parts.len(),
            has_image = input.image.is_some(),
            "Analyzing ingredients"
        );

        let text = self
            .call_gemini_api(&request)
            .await?
            .ok_or(AuraError::NoResponse)?;
        tracing::debug!("レスポンス長: {} chars", text.len());

        interpret_response(&text)
    }
}
