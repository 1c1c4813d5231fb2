//! 端点推送消息构建
//!
//! 按服务商生成 `MessageStructure=json` 格式的消息体：顶层 "default" 键加上
//! 每个服务商一个键，值为该服务商 payload 的 JSON 字符串。

use std::collections::BTreeSet;

use serde_json::{Map, Value, json};

use crate::error::Result;
use crate::types::Provider;

/// 构建发往单个端点的消息体
///
/// default_message 为空时使用 alert 作为默认消息，空白服务商标签被忽略。
pub fn build_endpoint_message(
    alert: &str,
    data: &Map<String, Value>,
    providers: &BTreeSet<Provider>,
    default_message: &str,
) -> Result<String> {
    let default = if default_message.is_empty() {
        alert
    } else {
        default_message
    };

    let mut body = Map::new();
    body.insert("default".to_string(), Value::String(default.to_string()));

    for provider in providers.iter().filter(|p| !p.is_empty()) {
        let payload = provider_payload(provider, alert, data);
        body.insert(
            provider.as_str().to_string(),
            Value::String(serde_json::to_string(&payload)?),
        );
    }

    Ok(serde_json::to_string(&Value::Object(body))?)
}

/// 单个服务商的 payload
///
/// 未识别的服务商使用 `{"data": {"message": ..., ...}}` 通用格式。
pub fn provider_payload(provider: &Provider, alert: &str, data: &Map<String, Value>) -> Value {
    match provider.as_str() {
        Provider::GCM => json!({
            "notification": { "body": alert },
            "data": data,
        }),
        Provider::APNS | Provider::APNS_SANDBOX => {
            // 业务数据平铺到顶层，aps 优先
            let mut payload = data.clone();
            payload.insert("aps".to_string(), json!({ "alert": alert }));
            Value::Object(payload)
        }
        _ => {
            let mut inner = Map::new();
            inner.insert("message".to_string(), Value::String(alert.to_string()));
            for (key, value) in data {
                inner.entry(key.clone()).or_insert_with(|| value.clone());
            }
            json!({ "data": inner })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(message: &str) -> Map<String, Value> {
        match serde_json::from_str(message).unwrap() {
            Value::Object(map) => map,
            other => panic!("消息体应为 JSON 对象: {other}"),
        }
    }

    fn inner(body: &Map<String, Value>, key: &str) -> Value {
        serde_json::from_str(body[key].as_str().unwrap()).unwrap()
    }

    #[test]
    fn test_default_falls_back_to_alert() {
        let providers = BTreeSet::from([Provider::gcm()]);
        let message = build_endpoint_message("hi", &Map::new(), &providers, "").unwrap();
        let body = decode(&message);

        assert_eq!(body["default"], "hi");
        assert_eq!(body.len(), 2);
    }

    #[test]
    fn test_default_message_overrides_alert() {
        let message =
            build_endpoint_message("hi", &Map::new(), &Provider::defaults(), "fallback").unwrap();
        let body = decode(&message);

        assert_eq!(body["default"], "fallback");
        assert!(body.contains_key("GCM"));
        assert!(body.contains_key("APNS"));
    }

    #[test]
    fn test_gcm_payload_shape() {
        let mut data = Map::new();
        data.insert("order_id".to_string(), json!(42));

        let providers = BTreeSet::from([Provider::gcm()]);
        let body = decode(&build_endpoint_message("新订单", &data, &providers, "").unwrap());

        assert_eq!(
            inner(&body, "GCM"),
            json!({"notification": {"body": "新订单"}, "data": {"order_id": 42}})
        );
    }

    #[test]
    fn test_apns_payload_merges_data_and_keeps_aps() {
        let mut data = Map::new();
        data.insert("badge_id".to_string(), json!(7));
        data.insert("aps".to_string(), json!("should be replaced"));

        let providers = BTreeSet::from([Provider::new("apns_sandbox")]);
        let body = decode(&build_endpoint_message("hello", &data, &providers, "").unwrap());

        assert_eq!(
            inner(&body, "APNS_SANDBOX"),
            json!({"aps": {"alert": "hello"}, "badge_id": 7})
        );
    }

    #[test]
    fn test_unknown_provider_uses_generic_shape() {
        let mut data = Map::new();
        data.insert("k".to_string(), json!("v"));
        data.insert("message".to_string(), json!("ignored"));

        let payload = provider_payload(&Provider::new("wns"), "hello", &data);
        assert_eq!(payload, json!({"data": {"message": "hello", "k": "v"}}));
    }

    #[test]
    fn test_blank_provider_is_skipped() {
        let providers = BTreeSet::from([Provider::new("  "), Provider::gcm()]);
        let body = decode(&build_endpoint_message("hi", &Map::new(), &providers, "").unwrap());

        assert!(!body.contains_key(""));
        assert_eq!(body.len(), 2);
        assert!(body.contains_key("GCM"));
    }

    #[test]
    fn test_empty_provider_set_only_has_default() {
        let body = decode(&build_endpoint_message("hi", &Map::new(), &BTreeSet::new(), "").unwrap());
        assert_eq!(body.len(), 1);
        assert_eq!(body["default"], "hi");
    }
}
