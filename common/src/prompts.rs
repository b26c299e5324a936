//! プロンプト生成モジュール
//!
//! - SYSTEM_INSTRUCTION: 出力スキーマと行動指針を固定したシステム指示
//! - build_parts: 解析入力からメッセージのパート列を組み立てる
//! - split_data_url: Data URLからMIMEタイプとBase64部分を取り出す

use crate::types::AnalysisInput;

/// Data URLにMIMEタイプが無い場合の既定値
pub const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

/// システム指示（出力スキーマ込み）
pub const SYSTEM_INSTRUCTION: &str = r#"You are Aura, an AI-native consumer health co-pilot. You transform complex ingredient lists into human insight.

Core Directives:
1. INTENT INFERENCE: Start by inferring WHY the user is scanning this (e.g., metabolic health, child safety, food allergies, athletic performance). If you are unsure, provide your best guess but include a brief, natural language clarifying question.
2. DYNAMIC HIGHLIGHTING: Flag ingredients that specifically relate to the inferred intent as 'isPrimaryConcern: true'.
3. REASONING & TRADE-OFFS: Explain the 'why' behind ingredients. If an ingredient has benefits (preservation) but risks (health impact), explicitly detail this tradeoff.
4. HONEST UNCERTAINTY: Explicitly state what we don't know (e.g., "natural flavors" origin).
5. MINIMAL FRICTION CLARIFICATION: If the intent is ambiguous (e.g. could be for an infant OR a diabetic adult), ask ONE brief question like "Is this for a little one, or are we watching sugar for another reason?"

OUTPUT SCHEMA (Strict JSON):
{
  "inferredIntent": { "concern": string, "confidence": number, "reasoning": string },
  "overallNarrative": string,
  "insights": [
    {
      "ingredient": string,
      "impact": string,
      "whyItMatters": string,
      "tradeoff": string,
      "isPrimaryConcern": boolean,
      "uncertainty": "Low" | "Medium" | "High",
      "uncertaintyReason": string
    }
  ],
  "clarifyingQuestions": string[],
  "suggestedAction": string
}"#;

/// 可変パートの末尾に付ける固定指示
pub const CLOSING_DIRECTIVE: &str =
    "Analyze this as my co-pilot. Focus on reasoning and trade-offs.";

/// メッセージの1パート
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptPart {
    Text(String),
    InlineImage { mime_type: String, data: String },
}

/// Data URLを (MIMEタイプ, Base64データ) に分解
///
/// プレフィックスの無い文字列はそのままBase64データとして扱う。
///
/// # Examples
/// ```
/// use aura_common::split_data_url;
///
/// let (mime, data) = split_data_url("data:image/png;base64,iVBORw0K");
/// assert_eq!(mime, "image/png");
/// assert_eq!(data, "iVBORw0K");
/// ```
pub fn split_data_url(data_url: &str) -> (&str, &str) {
    match data_url.split_once(',') {
        Some((header, data)) if header.starts_with("data:") => {
            let mime = header
                .trim_start_matches("data:")
                .split(';')
                .next()
                .filter(|m| !m.is_empty())
                .unwrap_or(DEFAULT_IMAGE_MIME);
            (mime, data)
        }
        _ => (DEFAULT_IMAGE_MIME, data_url),
    }
}

/// 解析入力からパート列を組み立てる
///
/// 順序: 画像 → 成分テキスト → 補足回答 → 固定指示
pub fn build_parts(input: &AnalysisInput) -> Vec<PromptPart> {
    let mut parts = Vec::new();

    if let Some(image) = &input.image {
        let (mime_type, data) = split_data_url(image);
        parts.push(PromptPart::InlineImage {
            mime_type: mime_type.to_string(),
            data: data.to_string(),
        });
    }

    if let Some(text) = &input.text {
        parts.push(PromptPart::Text(format!("Ingredients: {}", text)));
    }

    if let Some(context) = &input.additional_context {
        parts.push(PromptPart::Text(format!("User clarification: {}", context)));
    }

    parts.push(PromptPart::Text(CLOSING_DIRECTIVE.to_string()));
    parts
}
