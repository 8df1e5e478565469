//! Trace-context propagation over message headers
//!
//! Carries W3C `traceparent` / `baggage` headers across the bus so the
//! consumer can correlate its processing span with the producing request.
//!
//! Extraction is a total function: an absent key, a non-UTF-8 value, or a
//! malformed header degrades to an empty value for that key and never
//! fails. Each key degrades independently — a broken `traceparent` does
//! not prevent a well-formed `baggage` header from being read.

use crate::MessageHeaders;
use std::collections::BTreeMap;
use std::fmt;

/// Header key carrying the parent span identity.
pub const TRACEPARENT_HEADER: &str = "traceparent";
/// Header key carrying correlation baggage.
pub const BAGGAGE_HEADER: &str = "baggage";

/// Key/value correlation metadata propagated alongside the trace context.
pub type Baggage = BTreeMap<String, String>;

/// Parsed `traceparent` value: `00-{trace-id}-{parent-id}-{flags}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceParent {
    /// 32 lowercase hex characters, not all zero
    pub trace_id: String,
    /// 16 lowercase hex characters, not all zero
    pub span_id: String,
    /// Trace flags (bit 0 = sampled)
    pub flags: u8,
}

impl TraceParent {
    /// Parse a `traceparent` header value.
    ///
    /// Returns `None` for anything that is not a well-formed version-00
    /// value; the caller treats that as "no parent", never as an error.
    pub fn parse(value: &str) -> Option<Self> {
        let mut parts = value.trim().split('-');
        let version = parts.next()?;
        let trace_id = parts.next()?;
        let span_id = parts.next()?;
        let flags = parts.next()?;
        if parts.next().is_some() {
            return None;
        }

        if version.len() != 2 || version == "ff" || !is_lower_hex(version) {
            return None;
        }
        if trace_id.len() != 32 || !is_lower_hex(trace_id) || is_all_zero(trace_id) {
            return None;
        }
        if span_id.len() != 16 || !is_lower_hex(span_id) || is_all_zero(span_id) {
            return None;
        }
        if flags.len() != 2 || !is_lower_hex(flags) {
            return None;
        }
        let flags = u8::from_str_radix(flags, 16).ok()?;

        Some(Self {
            trace_id: trace_id.to_string(),
            span_id: span_id.to_string(),
            flags,
        })
    }

    /// Start a fresh sampled trace (producer side, no incoming parent).
    pub fn new_root() -> Self {
        let trace_id = uuid::Uuid::new_v4().simple().to_string();
        let span_id = uuid::Uuid::new_v4().simple().to_string()[..16].to_string();
        Self {
            trace_id,
            span_id,
            flags: 0x01,
        }
    }
}

impl fmt::Display for TraceParent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "00-{}-{}-{:02x}", self.trace_id, self.span_id, self.flags)
    }
}

/// Per-message trace context reconstructed from transport headers.
///
/// Ephemeral: scoped to one message's processing, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraceContext {
    /// Parent span identity, if a valid `traceparent` header was present
    pub parent: Option<TraceParent>,
    /// Baggage entries, empty if absent or entirely malformed
    pub baggage: Baggage,
}

impl TraceContext {
    /// An empty context: no parent, no baggage.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Context for a fresh root trace with no baggage.
    pub fn new_root() -> Self {
        Self {
            parent: Some(TraceParent::new_root()),
            baggage: Baggage::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_none() && self.baggage.is_empty()
    }

    /// Baggage rendered back to its `k=v,k=v` wire form.
    pub fn baggage_string(&self) -> String {
        self.baggage
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Extract a trace context from a message header map.
///
/// Missing headers, non-UTF-8 values, and malformed values all degrade to
/// the empty value for that key. Header names are matched
/// ASCII-case-insensitively.
pub fn extract(headers: Option<&MessageHeaders>) -> TraceContext {
    let parent = header_str(headers, TRACEPARENT_HEADER).and_then(TraceParent::parse);
    let baggage = header_str(headers, BAGGAGE_HEADER)
        .map(parse_baggage)
        .unwrap_or_default();

    TraceContext { parent, baggage }
}

/// Inject a trace context into a message header map (producer side).
///
/// Inverse of [`extract`] for well-formed contexts; empty components are
/// simply not written.
pub fn inject(ctx: &TraceContext, headers: &mut MessageHeaders) {
    if let Some(parent) = &ctx.parent {
        headers.insert(
            TRACEPARENT_HEADER.to_string(),
            parent.to_string().into_bytes(),
        );
    }
    if !ctx.baggage.is_empty() {
        headers.insert(
            BAGGAGE_HEADER.to_string(),
            ctx.baggage_string().into_bytes(),
        );
    }
}

/// Look up a header value and interpret it as UTF-8.
///
/// Returns `None` when the key is absent or the bytes are not valid UTF-8;
/// the degradation is per key, matching the extraction contract.
fn header_str<'a>(headers: Option<&'a MessageHeaders>, key: &str) -> Option<&'a str> {
    let headers = headers?;
    let value = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v)?;
    std::str::from_utf8(value).ok()
}

/// Parse a `baggage` header value, skipping malformed entries.
fn parse_baggage(value: &str) -> Baggage {
    let mut baggage = Baggage::new();
    for entry in value.split(',') {
        // Optional properties after ';' are not carried
        let entry = entry.split(';').next().unwrap_or("").trim();
        if let Some((key, val)) = entry.split_once('=') {
            let key = key.trim();
            let val = val.trim();
            if !key.is_empty() && !val.is_empty() {
                baggage.insert(key.to_string(), val.to_string());
            }
        }
    }
    baggage
}

fn is_lower_hex(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
}

fn is_all_zero(s: &str) -> bool {
    s.chars().all(|c| c == '0')
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_TRACEPARENT: &str = "00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01";

    fn headers_with(entries: &[(&str, &[u8])]) -> MessageHeaders {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_vec()))
            .collect()
    }

    #[test]
    fn test_extract_absent_headers_yields_empty_context() {
        let ctx = extract(None);
        assert!(ctx.is_empty());

        let headers = MessageHeaders::new();
        let ctx = extract(Some(&headers));
        assert!(ctx.parent.is_none());
        assert!(ctx.baggage.is_empty());
    }

    #[test]
    fn test_extract_valid_traceparent() {
        let headers = headers_with(&[(TRACEPARENT_HEADER, VALID_TRACEPARENT.as_bytes())]);
        let ctx = extract(Some(&headers));

        let parent = ctx.parent.expect("parent extracted");
        assert_eq!(parent.trace_id, "0af7651916cd43dd8448eb211c80319c");
        assert_eq!(parent.span_id, "b7ad6b7169203331");
        assert_eq!(parent.flags, 0x01);
    }

    #[test]
    fn test_extract_header_lookup_is_case_insensitive() {
        let headers = headers_with(&[("TraceParent", VALID_TRACEPARENT.as_bytes())]);
        let ctx = extract(Some(&headers));
        assert!(ctx.parent.is_some());
    }

    #[test]
    fn test_extract_non_utf8_value_degrades_to_empty() {
        let headers = headers_with(&[(TRACEPARENT_HEADER, &[0xff, 0xfe, 0xfd][..])]);
        let ctx = extract(Some(&headers));
        assert!(ctx.parent.is_none());
    }

    #[test]
    fn test_extract_keys_degrade_independently() {
        // Broken traceparent must not block well-formed baggage
        let headers = headers_with(&[
            (TRACEPARENT_HEADER, &[0xff, 0xfe][..]),
            (BAGGAGE_HEADER, &b"userId=42,tenant=acme"[..]),
        ]);
        let ctx = extract(Some(&headers));

        assert!(ctx.parent.is_none());
        assert_eq!(ctx.baggage.get("userId").map(String::as_str), Some("42"));
        assert_eq!(ctx.baggage.get("tenant").map(String::as_str), Some("acme"));
    }

    #[test]
    fn test_traceparent_rejects_malformed_values() {
        for bad in [
            "",
            "garbage",
            "00-short-b7ad6b7169203331-01",
            // all-zero trace id
            "00-00000000000000000000000000000000-b7ad6b7169203331-01",
            // all-zero span id
            "00-0af7651916cd43dd8448eb211c80319c-0000000000000000-01",
            // invalid version
            "ff-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01",
            // uppercase hex is rejected
            "00-0AF7651916CD43DD8448EB211C80319C-B7AD6B7169203331-01",
            // trailing field
            "00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01-extra",
        ] {
            assert!(TraceParent::parse(bad).is_none(), "accepted: {}", bad);
        }
    }

    #[test]
    fn test_baggage_skips_malformed_entries() {
        let headers =
            headers_with(&[(BAGGAGE_HEADER, &b"good=1,notanentry,=empty,also=2;prop=x"[..])]);
        let ctx = extract(Some(&headers));

        assert_eq!(ctx.baggage.len(), 2);
        assert_eq!(ctx.baggage.get("good").map(String::as_str), Some("1"));
        assert_eq!(ctx.baggage.get("also").map(String::as_str), Some("2"));
    }

    #[test]
    fn test_inject_extract_round_trip() {
        let mut ctx = TraceContext::new_root();
        ctx.baggage.insert("tenant".to_string(), "acme".to_string());
        ctx.baggage.insert("userId".to_string(), "42".to_string());

        let mut headers = MessageHeaders::new();
        inject(&ctx, &mut headers);

        let extracted = extract(Some(&headers));
        assert_eq!(extracted, ctx);
    }

    #[test]
    fn test_inject_empty_context_writes_nothing() {
        let mut headers = MessageHeaders::new();
        inject(&TraceContext::empty(), &mut headers);
        assert!(headers.is_empty());
    }

    #[test]
    fn test_new_root_is_well_formed() {
        let parent = TraceParent::new_root();
        let rendered = parent.to_string();
        assert_eq!(TraceParent::parse(&rendered), Some(parent));
    }
}
