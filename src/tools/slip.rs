//! Delivery slip tools
//!
//! Backed by a fixed lookup table; a real deployment points these at the
//! slip database and the reporting sheet.

use super::Tool;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

/// Returned when a slip id has no record
pub const SLIP_NOT_FOUND: &str = "指定された伝票は見つかりませんでした。";

/// Look up the current delivery status of a slip
pub struct SearchSlipInfoTool;

#[derive(Debug, Deserialize)]
struct SearchSlipInput {
    slip_id: String,
}

fn lookup_slip(slip_id: &str) -> Option<Value> {
    match slip_id {
        "12345" => Some(json!({
            "origin": "東京都千代田区",
            "destination": "愛知県名古屋市",
            "status": "完了"
        })),
        _ => None,
    }
}

#[async_trait]
impl Tool for SearchSlipInfoTool {
    fn name(&self) -> &'static str {
        "search_slip_info"
    }

    fn description(&self) -> String {
        "伝票番号(slip_id)を元に、現在の配送情報を検索します。".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["slip_id"],
            "properties": {
                "slip_id": {
                    "type": "string",
                    "description": "Delivery slip number"
                }
            }
        })
    }

    async fn run(&self, input: Value) -> Result<Value, String> {
        let input: SearchSlipInput =
            serde_json::from_value(input).map_err(|e| format!("Invalid input: {e}"))?;
        Ok(lookup_slip(&input.slip_id).unwrap_or_else(|| Value::String(SLIP_NOT_FOUND.to_string())))
    }
}

/// Record a new investigation report
pub struct CreateInvestigationReportTool;

#[derive(Debug, Deserialize)]
struct ReportInput {
    destination: String,
    note: String,
}

#[async_trait]
impl Tool for CreateInvestigationReportTool {
    fn name(&self) -> &'static str {
        "create_investigation_report"
    }

    fn description(&self) -> String {
        "新しいテスト伝票や調査レポートをシステムに作成・記録します。".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["destination", "note"],
            "properties": {
                "destination": {
                    "type": "string",
                    "description": "Destination address for the report"
                },
                "note": {
                    "type": "string",
                    "description": "Free-form remarks"
                }
            }
        })
    }

    async fn run(&self, input: Value) -> Result<Value, String> {
        let input: ReportInput =
            serde_json::from_value(input).map_err(|e| format!("Invalid input: {e}"))?;
        Ok(Value::String(format!(
            "宛先を『{}』に設定したレポート（備考: {}）を正常に作成しました。",
            input.destination, input.note
        )))
    }
}
