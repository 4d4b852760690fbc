// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! XML envelope codec.
//!
//! An envelope is one `<xml>` root holding one child element per field,
//! the value as text content:
//!
//! ```text
//! <xml>
//!   <appid>wx8a92954451ec0dfa</appid>
//!   <body>test</body>
//!   ...
//! </xml>
//! ```
//!
//! No attributes, no nesting, no repeated elements.

use quick_xml::escape::partial_escape;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::{PayError, PayResult};
use crate::models::ParameterSet;
use crate::protocol::response::{ResponseRecord, ResponseShape};

/// Name of the root element of every envelope.
pub const ROOT_ELEMENT: &str = "xml";

/// Serialize the non-empty fields of `params` into an envelope.
///
/// Elements are written in byte-wise key order. Values have `&`, `<` and
/// `>` escaped, so a `]]>` inside a value cannot end up in text content.
/// Quotes are left alone.
pub fn encode(params: &ParameterSet) -> PayResult<Vec<u8>> {
    let mut writer = Writer::new(Vec::new());
    write(&mut writer, Event::Start(BytesStart::new(ROOT_ELEMENT)))?;
    for (key, value) in params.non_empty() {
        if !is_field_name(key) {
            return Err(PayError::Encode(format!("invalid field name: {key:?}")));
        }
        write(&mut writer, Event::Start(BytesStart::new(key)))?;
        write(
            &mut writer,
            Event::Text(BytesText::from_escaped(partial_escape(value))),
        )?;
        write(&mut writer, Event::End(BytesEnd::new(key)))?;
    }
    write(&mut writer, Event::End(BytesEnd::new(ROOT_ELEMENT)))?;
    Ok(writer.into_inner())
}

fn write(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> PayResult<()> {
    writer
        .write_event(event)
        .map_err(|e| PayError::Encode(format!("xml write failed: {e}")))
}

/// Field names are ASCII identifiers.
fn is_field_name(key: &str) -> bool {
    let mut chars = key.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Parse an envelope into a [`ResponseRecord`] without checking which fields
/// it carries.
///
/// Text and CDATA content are both accepted. Whitespace between elements is
/// ignored; whitespace inside a value is kept as-is, since it is part of
/// what the gateway signed.
pub fn parse(bytes: &[u8]) -> PayResult<ResponseRecord> {
    let mut reader = Reader::from_reader(bytes);
    let mut entries: Vec<(String, Option<String>)> = Vec::new();
    let mut current: Option<(String, String)> = None;
    let mut depth = 0usize;
    let mut root_closed = false;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| PayError::Parse(format!("malformed xml: {e}")))?;
        match event {
            Event::Start(start) => {
                let name = element_name(start.name().as_ref())?;
                match depth {
                    0 if root_closed => {
                        return Err(PayError::Parse("more than one root element".to_string()))
                    }
                    0 => {}
                    1 => current = Some((name, String::new())),
                    _ => {
                        return Err(PayError::Parse(format!(
                            "nested element <{name}> in a flat envelope"
                        )))
                    }
                }
                depth += 1;
            }
            Event::Empty(start) => {
                let name = element_name(start.name().as_ref())?;
                match depth {
                    0 if root_closed => {
                        return Err(PayError::Parse("more than one root element".to_string()))
                    }
                    0 => root_closed = true,
                    1 => push_field(&mut entries, name, None)?,
                    _ => {
                        return Err(PayError::Parse(format!(
                            "nested element <{name}> in a flat envelope"
                        )))
                    }
                }
            }
            Event::End(_) => {
                match depth {
                    2 => {
                        if let Some((name, value)) = current.take() {
                            push_field(&mut entries, name, Some(value))?;
                        }
                    }
                    1 => root_closed = true,
                    _ => {}
                }
                depth = depth.saturating_sub(1);
            }
            Event::Text(text) => {
                let text = text
                    .unescape()
                    .map_err(|e| PayError::Parse(format!("bad text content: {e}")))?;
                match current.as_mut() {
                    Some((_, value)) if depth == 2 => value.push_str(&text),
                    _ if text.trim().is_empty() => {}
                    _ => return Err(PayError::Parse("text outside a field element".to_string())),
                }
            }
            Event::CData(cdata) => {
                let text = std::str::from_utf8(&cdata)
                    .map_err(|e| PayError::Parse(format!("bad cdata content: {e}")))?;
                match current.as_mut() {
                    Some((_, value)) if depth == 2 => value.push_str(text),
                    _ => return Err(PayError::Parse("cdata outside a field element".to_string())),
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !root_closed || depth != 0 {
        return Err(PayError::Parse("envelope has no complete root element".to_string()));
    }

    Ok(ResponseRecord::from_fields(entries))
}

fn element_name(raw: &[u8]) -> PayResult<String> {
    std::str::from_utf8(raw)
        .map(str::to_string)
        .map_err(|e| PayError::Parse(format!("element name is not utf-8: {e}")))
}

fn push_field(
    entries: &mut Vec<(String, Option<String>)>,
    name: String,
    value: Option<String>,
) -> PayResult<()> {
    if entries.iter().any(|(existing, _)| *existing == name) {
        return Err(PayError::Parse(format!("duplicate field <{name}>")));
    }
    entries.push((name, value));
    Ok(())
}

/// Parse an envelope into the typed shape `S`, requiring the mandatory
/// status and signature fields.
pub fn decode<S: ResponseShape>(bytes: &[u8]) -> PayResult<S> {
    let record = parse(bytes)?;
    record.check_mandatory()?;
    Ok(S::from_record(record))
}

/// Project a decoded response back into the parameters its signature covers.
pub fn flatten<S: ResponseShape>(response: &S) -> ParameterSet {
    response.record().flatten()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::response::{NotifyResponse, UnifiedOrderResponse};
    use crate::protocol::signing;

    fn text(bytes: &[u8]) -> &str {
        std::str::from_utf8(bytes).unwrap()
    }

    #[test]
    fn encode_writes_sorted_non_empty_children() {
        let params = ParameterSet::from([("total_fee", "100"), ("body", "test"), ("attach", "")]);
        let xml = encode(&params).unwrap();
        assert_eq!(
            text(&xml),
            "<xml><body>test</body><total_fee>100</total_fee></xml>"
        );
    }

    #[test]
    fn encode_escapes_markup_characters_only() {
        let params = ParameterSet::from([("attach", "a=1&b=<2>\""), ("body", "x]]>y")]);
        let xml = encode(&params).unwrap();
        assert_eq!(
            text(&xml),
            "<xml><attach>a=1&amp;b=&lt;2&gt;\"</attach><body>x]]&gt;y</body></xml>"
        );
        assert!(!text(&xml).contains("]]>"));

        let record = parse(&xml).unwrap();
        assert_eq!(record.get("body"), Some("x]]>y"));
    }

    #[test]
    fn encode_rejects_non_identifier_keys() {
        let params = ParameterSet::from([("bad key", "x")]);
        assert!(matches!(encode(&params), Err(PayError::Encode(_))));
    }

    #[test]
    fn parse_reads_text_and_cdata() {
        let xml = br#"<xml>
            <return_code><![CDATA[SUCCESS]]></return_code>
            <return_msg><![CDATA[OK]]></return_msg>
            <total_fee>100</total_fee>
            <attach>a&amp;b</attach>
        </xml>"#;
        let record = parse(xml).unwrap();
        assert_eq!(record.return_code(), "SUCCESS");
        assert_eq!(record.return_msg(), "OK");
        assert_eq!(record.get("total_fee"), Some("100"));
        assert_eq!(record.get("attach"), Some("a&b"));
    }

    #[test]
    fn parse_treats_empty_elements_as_absent() {
        let record = parse(b"<xml><return_code>FAIL</return_code><device_info/><attach></attach></xml>")
            .unwrap();
        assert_eq!(record.get("device_info"), None);
        assert_eq!(record.get("attach"), None);
        assert_eq!(record.entries().count(), 3);
    }

    #[test]
    fn parse_keeps_inner_whitespace() {
        let record = parse(b"<xml><body> two  words </body></xml>").unwrap();
        assert_eq!(record.get("body"), Some(" two  words "));
    }

    #[test]
    fn parse_rejects_malformed_documents() {
        assert!(matches!(parse(b"<xml><a>1</b></xml>"), Err(PayError::Parse(_))));
        assert!(matches!(parse(b"<xml><a>1</a>"), Err(PayError::Parse(_))));
        assert!(matches!(parse(b"not xml at all"), Err(PayError::Parse(_))));
        assert!(matches!(parse(b""), Err(PayError::Parse(_))));
    }

    #[test]
    fn parse_rejects_nesting_and_duplicates() {
        assert!(matches!(
            parse(b"<xml><a><b>1</b></a></xml>"),
            Err(PayError::Parse(_))
        ));
        assert!(matches!(
            parse(b"<xml><a>1</a><a>2</a></xml>"),
            Err(PayError::Parse(_))
        ));
        assert!(matches!(
            parse(b"<xml><a>1</a></xml><xml></xml>"),
            Err(PayError::Parse(_))
        ));
    }

    #[test]
    fn decode_requires_status_and_success_signature() {
        let missing_status = decode::<UnifiedOrderResponse>(b"<xml><return_msg>OK</return_msg></xml>");
        assert!(matches!(missing_status, Err(PayError::Parse(_))));

        let unsigned_success =
            decode::<UnifiedOrderResponse>(b"<xml><return_code>SUCCESS</return_code></xml>");
        assert!(matches!(unsigned_success, Err(PayError::Parse(_))));

        let rejected = decode::<UnifiedOrderResponse>(
            b"<xml><return_code>FAIL</return_code><return_msg>bad sign</return_msg></xml>",
        )
        .unwrap();
        assert_eq!(rejected.return_msg(), "bad sign");
    }

    #[test]
    fn flatten_of_decoded_encoding_reproduces_parameters() {
        let params = ParameterSet::from([
            ("return_code", "SUCCESS"),
            ("return_msg", "OK"),
            ("attach", "k=v&x=y"),
            ("body", "Order 42 & more"),
            ("total_fee", "100"),
            ("empty", ""),
            ("sign", "0123456789ABCDEF0123456789ABCDEF"),
        ]);
        let decoded: NotifyResponse = decode(&encode(&params).unwrap()).unwrap();
        let flat = flatten(&decoded);

        let expected: ParameterSet = params
            .signable()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        assert_eq!(flat, expected);
        assert_eq!(decoded.sign(), Some("0123456789ABCDEF0123456789ABCDEF"));

        let first = signing::sign(&flatten(&decoded), "KEY");
        assert_eq!(first, signing::sign(&flatten(&decoded), "KEY"));
    }
}
