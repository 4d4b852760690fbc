// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Client-side checkout parameters.
//!
//! After `unified_order` returns a `prepay_id`, the merchant hands a second,
//! separately signed parameter set to the payer's device. These helpers build
//! it for in-app browser (JSAPI) and native app checkouts.

use serde::Serialize;

use crate::config::GatewayCredential;
use crate::error::{PayError, PayResult};
use crate::models::ParameterSet;
use crate::protocol::{nonce, signing};

/// Signature method advertised to the JSAPI bridge.
const SIGN_TYPE_MD5: &str = "MD5";

/// Fixed `package` value for app checkout.
const APP_PACKAGE: &str = "Sign=WXPay";

/// Parameters passed to the in-app browser payment bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JsapiPayParams {
    pub app_id: String,
    pub time_stamp: String,
    pub nonce_str: String,
    pub package: String,
    pub sign_type: String,
    pub pay_sign: String,
}

impl JsapiPayParams {
    pub fn to_json(&self) -> PayResult<String> {
        serde_json::to_string(self)
            .map_err(|e| PayError::Encode(format!("jsapi params serialization failed: {e}")))
    }
}

/// JSON for `WeixinJSBridge.invoke('getBrandWCPayRequest', ...)`.
pub fn jsapi_pay(credential: &GatewayCredential, prepay_id: &str) -> PayResult<String> {
    jsapi_pay_params(credential, prepay_id)?.to_json()
}

pub fn jsapi_pay_params(
    credential: &GatewayCredential,
    prepay_id: &str,
) -> PayResult<JsapiPayParams> {
    jsapi_pay_at(
        credential,
        prepay_id,
        chrono::Utc::now().timestamp(),
        nonce::generate(nonce::NONCE_LENGTH)?,
    )
}

fn jsapi_pay_at(
    credential: &GatewayCredential,
    prepay_id: &str,
    timestamp: i64,
    nonce_str: String,
) -> PayResult<JsapiPayParams> {
    let package = format!("prepay_id={prepay_id}");
    let time_stamp = timestamp.to_string();
    let signed = ParameterSet::from([
        ("appId", credential.app_id.as_str()),
        ("timeStamp", time_stamp.as_str()),
        ("nonceStr", nonce_str.as_str()),
        ("package", package.as_str()),
        ("signType", SIGN_TYPE_MD5),
    ]);
    let pay_sign = signing::sign(&signed, credential.app_key());

    Ok(JsapiPayParams {
        app_id: credential.app_id.clone(),
        time_stamp,
        nonce_str,
        package,
        sign_type: SIGN_TYPE_MD5.to_string(),
        pay_sign,
    })
}

/// Signed parameters for the native app payment SDK.
///
/// Keys: `appid`, `partnerid`, `prepayid`, `package`, `noncestr`,
/// `timestamp`, `sign`.
pub fn app_pay(credential: &GatewayCredential, prepay_id: &str) -> PayResult<ParameterSet> {
    Ok(app_pay_at(
        credential,
        prepay_id,
        chrono::Utc::now().timestamp(),
        nonce::generate(nonce::NONCE_LENGTH)?,
    ))
}

fn app_pay_at(
    credential: &GatewayCredential,
    prepay_id: &str,
    timestamp: i64,
    nonce_str: String,
) -> ParameterSet {
    let mut params = ParameterSet::from([
        ("appid", credential.app_id.as_str()),
        ("partnerid", credential.mch_id.as_str()),
        ("prepayid", prepay_id),
        ("package", APP_PACKAGE),
    ]);
    params.insert("noncestr", nonce_str);
    params.insert("timestamp", timestamp.to_string());
    let signature = signing::sign(&params, credential.app_key());
    params.insert("sign", signature);
    params
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credential() -> GatewayCredential {
        GatewayCredential::new("wx8a92954451ec0dfa", "1317382401", "KEY")
    }

    #[test]
    fn jsapi_signature_covers_bridge_fields() {
        let params = jsapi_pay_at(&credential(), "wx2014", 1_414_561_699, "abc".into()).unwrap();
        assert_eq!(params.package, "prepay_id=wx2014");
        assert_eq!(params.time_stamp, "1414561699");
        assert_eq!(params.sign_type, "MD5");

        let expected = ParameterSet::from([
            ("appId", "wx8a92954451ec0dfa"),
            ("nonceStr", "abc"),
            ("package", "prepay_id=wx2014"),
            ("signType", "MD5"),
            ("timeStamp", "1414561699"),
        ]);
        assert_eq!(params.pay_sign, signing::sign(&expected, "KEY"));
    }

    #[test]
    fn jsapi_json_uses_bridge_key_names() {
        let json = jsapi_pay(&credential(), "wx2014").unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        for key in ["appId", "timeStamp", "nonceStr", "package", "signType", "paySign"] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
        assert_eq!(value["nonceStr"].as_str().map(str::len), Some(32));
    }

    #[test]
    fn app_pay_is_self_verifying() {
        let params = app_pay_at(&credential(), "wx2014", 1_414_561_699, "abc".into());
        assert_eq!(params.get("partnerid"), Some("1317382401"));
        assert_eq!(params.get("package"), Some("Sign=WXPay"));
        assert_eq!(params.get("timestamp"), Some("1414561699"));

        let carried = params.get("sign").unwrap();
        assert!(signing::verify(&params, "KEY", carried));
    }

    #[test]
    fn app_pay_draws_fresh_nonce() {
        let first = app_pay(&credential(), "wx2014").unwrap();
        let second = app_pay(&credential(), "wx2014").unwrap();
        assert_ne!(first.get("noncestr"), second.get("noncestr"));
    }
}
