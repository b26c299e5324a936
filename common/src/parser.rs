//! APIレスポンスパーサー
//!
//! モデルの出力テキストからJSONオブジェクトを抽出し、
//! フィールド単位でスキーマを検証してから CoPilotAnalysis に変換する。
//! モデルは信頼できない外部データ源として扱う。

use crate::error::{Error, Result};
use crate::types::{CoPilotAnalysis, UncertaintyLevel};
use serde_json::{Map, Value};

/// レスポンスからJSONオブジェクト部分を抽出
///
/// 抽出優先順位:
/// 1. ```json ... ``` ブロック
/// 2. 最初の `{` から最後の `}` まで
/// 3. エラー
///
/// # Examples
/// ```
/// use aura_common::extract_json_object;
///
/// let response = "Sure! {\"overallNarrative\": \"ok\"}";
/// assert_eq!(extract_json_object(response).unwrap(), "{\"overallNarrative\": \"ok\"}");
/// ```
pub fn extract_json_object(response: &str) -> Result<&str> {
    if let Some(start_marker) = response.find("```json") {
        let start = start_marker + 7; // "```json" の長さ
        if let Some(end_offset) = response[start..].find("```") {
            let end = start + end_offset;
            return Ok(response[start..end].trim());
        }
    }

    if let (Some(start), Some(end)) = (response.find('{'), response.rfind('}')) {
        if end > start {
            return Ok(&response[start..=end]);
        }
    }

    Err(Error::Parse("JSONが見つかりません".into()))
}

/// 解析結果レスポンスをパース
///
/// JSONパース → スキーマ検証 → 型変換 の順に行う。
/// 全体がJSONとして読めない場合だけ抽出してから再パースする。
pub fn parse_analysis_response(response: &str) -> Result<CoPilotAnalysis> {
    let value: Value = match serde_json::from_str(response.trim()) {
        Ok(value) => value,
        Err(_) => {
            let json_str = extract_json_object(response)?;
            serde_json::from_str(json_str)
                .map_err(|e| Error::Parse(format!("JSONパースエラー: {}", e)))?
        }
    };

    validate_analysis(&value)?;

    Ok(serde_json::from_value(value)?)
}

/// 解析結果のスキーマをフィールド単位で検証
///
/// 必須フィールドの有無と型を確認する。未知のフィールドは無視する。
pub fn validate_analysis(value: &Value) -> Result<()> {
    let root = as_object(value, "$")?;

    let intent = as_object(field(root, "inferredIntent", "inferredIntent")?, "inferredIntent")?;
    require_str(intent, "concern", "inferredIntent.concern")?;
    require_number(intent, "confidence", "inferredIntent.confidence")?;
    require_str(intent, "reasoning", "inferredIntent.reasoning")?;

    require_str(root, "overallNarrative", "overallNarrative")?;

    let insights = require_array(root, "insights", "insights")?;
    for (idx, item) in insights.iter().enumerate() {
        let path = format!("insights[{}]", idx);
        let insight = as_object(item, &path)?;
        for key in ["ingredient", "impact", "whyItMatters", "tradeoff"] {
            require_str(insight, key, &format!("{}.{}", path, key))?;
        }
        require_bool(insight, "isPrimaryConcern", &format!("{}.isPrimaryConcern", path))?;

        let level_path = format!("{}.uncertainty", path);
        let level = require_str(insight, "uncertainty", &level_path)?;
        level.parse::<UncertaintyLevel>().map_err(|_| {
            Error::Schema(format!("{}: expected Low, Medium or High, got {:?}", level_path, level))
        })?;

        match insight.get("uncertaintyReason") {
            None | Some(Value::Null) | Some(Value::String(_)) => {}
            Some(other) => {
                return Err(type_error(&format!("{}.uncertaintyReason", path), "string", other));
            }
        }
    }

    let questions = require_array(root, "clarifyingQuestions", "clarifyingQuestions")?;
    for (idx, question) in questions.iter().enumerate() {
        if !question.is_string() {
            return Err(type_error(&format!("clarifyingQuestions[{}]", idx), "string", question));
        }
    }

    require_str(root, "suggestedAction", "suggestedAction")?;

    Ok(())
}

// =============================================
// 検証ヘルパー
// =============================================

fn field<'a>(obj: &'a Map<String, Value>, key: &str, path: &str) -> Result<&'a Value> {
    obj.get(key)
        .ok_or_else(|| Error::Schema(format!("{}: missing field", path)))
}

fn as_object<'a>(value: &'a Value, path: &str) -> Result<&'a Map<String, Value>> {
    value.as_object().ok_or_else(|| type_error(path, "object", value))
}

fn require_str<'a>(obj: &'a Map<String, Value>, key: &str, path: &str) -> Result<&'a str> {
    let value = field(obj, key, path)?;
    value.as_str().ok_or_else(|| type_error(path, "string", value))
}

fn require_number(obj: &Map<String, Value>, key: &str, path: &str) -> Result<f64> {
    let value = field(obj, key, path)?;
    value.as_f64().ok_or_else(|| type_error(path, "number", value))
}

fn require_bool(obj: &Map<String, Value>, key: &str, path: &str) -> Result<bool> {
    let value = field(obj, key, path)?;
    value.as_bool().ok_or_else(|| type_error(path, "boolean", value))
}

fn require_array<'a>(obj: &'a Map<String, Value>, key: &str, path: &str) -> Result<&'a Vec<Value>> {
    let value = field(obj, key, path)?;
    value.as_array().ok_or_else(|| type_error(path, "array", value))
}

fn type_error(path: &str, expected: &str, actual: &Value) -> Error {
    let actual = match actual {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    };
    Error::Schema(format!("{}: expected {}, got {}", path, expected, actual))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "inferredIntent": {
                "concern": "blood sugar",
                "confidence": 0.62,
                "reasoning": "Sugar is the first ingredient."
            },
            "overallNarrative": "Mostly sugar with a synthetic dye.",
            "insights": [
                {
                    "ingredient": "sugar",
                    "impact": "Raises blood glucose quickly.",
                    "whyItMatters": "It is listed first.",
                    "tradeoff": "Flavor versus glycemic load.",
                    "isPrimaryConcern": true,
                    "uncertainty": "Low",
                    "uncertaintyReason": "Well studied."
                },
                {
                    "ingredient": "red 40",
                    "impact": "Color only.",
                    "whyItMatters": "Some sensitivity reports.",
                    "tradeoff": "Appearance versus additive load.",
                    "isPrimaryConcern": false,
                    "uncertainty": "Medium"
                }
            ],
            "clarifyingQuestions": ["Is this for a little one?"],
            "suggestedAction": "Treat it as an occasional snack."
        })
    }

    // =============================================
    // extract_json_object テスト
    // =============================================

    #[test]
    fn test_extract_json_with_block() {
        let response = "Here you go:\n```json\n{\"a\": 1}\n```\nThanks.";
        assert_eq!(extract_json_object(response).unwrap(), "{\"a\": 1}");
    }

    #[test]
    fn test_extract_json_raw() {
        let response = r#"{"a": {"b": 2}}"#;
        assert_eq!(extract_json_object(response).unwrap(), response);
    }

    #[test]
    fn test_extract_json_error() {
        let result = extract_json_object("No JSON here, just plain text.");
        if let Err(Error::Parse(msg)) = result {
            assert!(msg.contains("JSONが見つかりません"));
        } else {
            panic!("Expected Parse error");
        }
    }

    #[test]
    fn test_extract_json_empty_response() {
        assert!(extract_json_object("").is_err());
        assert!(extract_json_object("} {").is_err());
    }

    // =============================================
    // parse_analysis_response テスト
    // =============================================

    #[test]
    fn test_parse_conforming_payload_preserves_fields() {
        let text = serde_json::to_string(&sample()).unwrap();
        let analysis = parse_analysis_response(&text).unwrap();

        assert_eq!(analysis.inferred_intent.concern, "blood sugar");
        assert_eq!(analysis.inferred_intent.confidence, 0.62);
        assert_eq!(analysis.inferred_intent.reasoning, "Sugar is the first ingredient.");
        assert_eq!(analysis.overall_narrative, "Mostly sugar with a synthetic dye.");
        assert_eq!(analysis.insights.len(), 2);
        assert_eq!(analysis.insights[0].why_it_matters, "It is listed first.");
        assert!(analysis.insights[0].is_primary_concern);
        assert_eq!(analysis.insights[0].uncertainty, UncertaintyLevel::Low);
        assert_eq!(analysis.insights[0].uncertainty_reason.as_deref(), Some("Well studied."));
        assert_eq!(analysis.insights[1].uncertainty, UncertaintyLevel::Medium);
        assert_eq!(analysis.insights[1].uncertainty_reason, None);
        assert_eq!(analysis.clarifying_questions, vec!["Is this for a little one?"]);
        assert_eq!(analysis.suggested_action, "Treat it as an occasional snack.");

        // 再シリアライズしても同じ値になる
        assert_eq!(serde_json::to_value(&analysis).unwrap(), sample());
    }

    #[test]
    fn test_parse_fenced_payload() {
        let text = format!("```json\n{}\n```", sample());
        assert!(parse_analysis_response(&text).is_ok());
    }

    #[test]
    fn test_parse_raw_payload_with_fence_in_string_field() {
        let mut payload = sample();
        payload["overallNarrative"] =
            json!("Tip: models sometimes wrap output in ```json blocks ``` which we ignore.");
        let text = serde_json::to_string(&payload).unwrap();

        let analysis = parse_analysis_response(&text).unwrap();
        assert_eq!(
            analysis.overall_narrative,
            "Tip: models sometimes wrap output in ```json blocks ``` which we ignore."
        );
        assert_eq!(serde_json::to_value(&analysis).unwrap(), payload);
    }

    #[test]
    fn test_parse_non_json_text() {
        let result = parse_analysis_response("I'm sorry, I can't read that label.");
        assert!(matches!(result, Err(Error::Parse(_))));
    }

    #[test]
    fn test_parse_broken_json() {
        let result = parse_analysis_response(r#"{"inferredIntent": {"concern": }"#);
        assert!(matches!(result, Err(Error::Parse(_))));
    }

    #[test]
    fn test_null_uncertainty_reason_is_accepted() {
        let mut value = sample();
        value["insights"][1]["uncertaintyReason"] = Value::Null;
        let analysis = parse_analysis_response(&value.to_string()).unwrap();
        assert_eq!(analysis.insights[1].uncertainty_reason, None);
    }

    #[test]
    fn test_extra_fields_are_ignored() {
        let mut value = sample();
        value["modelVersion"] = json!("x");
        assert!(validate_analysis(&value).is_ok());
    }

    // =============================================
    // validate_analysis テスト
    // =============================================

    fn schema_message(value: &Value) -> String {
        match validate_analysis(value) {
            Err(Error::Schema(msg)) => msg,
            other => panic!("Expected Schema error, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_missing_intent() {
        let mut value = sample();
        value.as_object_mut().unwrap().remove("inferredIntent");
        assert_eq!(schema_message(&value), "inferredIntent: missing field");
    }

    #[test]
    fn test_validate_confidence_as_string() {
        let mut value = sample();
        value["inferredIntent"]["confidence"] = json!("high");
        assert_eq!(
            schema_message(&value),
            "inferredIntent.confidence: expected number, got string"
        );
    }

    #[test]
    fn test_validate_bad_uncertainty_level() {
        let mut value = sample();
        value["insights"][1]["uncertainty"] = json!("Unknown");
        assert!(schema_message(&value).starts_with("insights[1].uncertainty: expected Low, Medium or High"));
    }

    #[test]
    fn test_validate_primary_flag_type() {
        let mut value = sample();
        value["insights"][0]["isPrimaryConcern"] = json!("yes");
        assert_eq!(
            schema_message(&value),
            "insights[0].isPrimaryConcern: expected boolean, got string"
        );
    }

    #[test]
    fn test_validate_question_type() {
        let mut value = sample();
        value["clarifyingQuestions"] = json!(["ok", 3]);
        assert_eq!(
            schema_message(&value),
            "clarifyingQuestions[1]: expected string, got number"
        );
    }

    #[test]
    fn test_validate_root_not_object() {
        assert_eq!(schema_message(&json!([1, 2])), "$: expected object, got array");
    }

    #[test]
    fn test_validate_missing_suggested_action() {
        let mut value = sample();
        value.as_object_mut().unwrap().remove("suggestedAction");
        assert_eq!(schema_message(&value), "suggestedAction: missing field");
    }
}
