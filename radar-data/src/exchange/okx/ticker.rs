use crate::error::DataError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

/// [`Okx`](super::Okx) spot ticker, shared by the REST snapshot and the `tickers` channel.
///
/// ### Raw Payload Examples
/// See docs: <https://www.okx.com/docs-v5/en/#order-book-trading-market-data-ws-tickers-channel>
/// ```json
/// {
///     "instType": "SPOT",
///     "instId": "BTC-USDT",
///     "last": "9999.99",
///     "lastSz": "0.1",
///     "askPx": "9999.99",
///     "askSz": "11",
///     "bidPx": "8888.88",
///     "bidSz": "5",
///     "ts": "1597026383085"
/// }
/// ```
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OkxTicker {
    pub inst_id: String,

    #[serde(rename = "bidPx", default, deserialize_with = "crate::de::de_opt_str_f64")]
    pub bid: Option<f64>,

    #[serde(rename = "askPx", default, deserialize_with = "crate::de::de_opt_str_f64")]
    pub ask: Option<f64>,

    #[serde(default, deserialize_with = "crate::de::de_opt_str_f64")]
    pub last: Option<f64>,
}

/// Parse a REST `/api/v5/market/tickers` response or a `tickers` channel push.
///
/// Event frames (subscription acks & errors) and the plain text `pong` keep-alive reply yield
/// nothing. Malformed entries within `data` are skipped.
///
/// ### Raw Payload Examples
/// ```json
/// {"event": "subscribe", "arg": {"channel": "tickers", "instId": "BTC-USDT"}, "connId": "a4d3ae55"}
/// ```
/// ```json
/// {"arg": {"channel": "tickers", "instId": "BTC-USDT"}, "data": [{"instId": "BTC-USDT", "last": "9999.99"}]}
/// ```
pub fn parse_tickers(payload: &str) -> Result<Vec<OkxTicker>, DataError> {
    if payload.trim() == "pong" {
        return Ok(Vec::new());
    }

    let value = serde_json::from_str::<Value>(payload)
        .map_err(|error| DataError::deserialise(error, payload))?;

    if let Some(event) = value.get("event").and_then(Value::as_str) {
        if event == "error" {
            warn!(
                code = ?value.get("code"),
                msg = ?value.get("msg"),
                "Okx rejected request"
            );
        }
        return Ok(Vec::new());
    }

    let data = value.get("data").and_then(Value::as_array).ok_or_else(|| {
        DataError::UnexpectedPayload("Okx tickers payload missing data array".to_string())
    })?;

    Ok(data
        .iter()
        .filter_map(|item| match serde_json::from_value::<OkxTicker>(item.clone()) {
            Ok(ticker) => Some(ticker),
            Err(error) => {
                debug!(%error, "dropping malformed Okx ticker entry");
                None
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_okx_parse_tickers() {
        struct TestCase {
            input: &'static str,
            expected: Result<Vec<(&'static str, Option<f64>, Option<f64>)>, ()>,
        }

        let tests = vec![
            TestCase {
                // TC0: subscription ack
                input: r#"{"event":"subscribe","arg":{"channel":"tickers","instId":"BTC-USDT"},"connId":"a4d3ae55"}"#,
                expected: Ok(vec![]),
            },
            TestCase {
                // TC1: error event
                input: r#"{"event":"error","code":"60012","msg":"Invalid request","connId":"a4d3ae55"}"#,
                expected: Ok(vec![]),
            },
            TestCase {
                // TC2: pong keep-alive
                input: "pong",
                expected: Ok(vec![]),
            },
            TestCase {
                // TC3: channel push with an empty bid
                input: r#"{"arg":{"channel":"tickers","instId":"BTC-USDT"},"data":[{"instType":"SPOT","instId":"BTC-USDT","last":"9999.99","askPx":"10000","bidPx":""}]}"#,
                expected: Ok(vec![("BTC-USDT", None, Some(10000.0))]),
            },
            TestCase {
                // TC4: REST response, one malformed entry
                input: r#"{"code":"0","msg":"","data":[{"instId":"ETH-USDT","bidPx":"99","askPx":"101","last":"100"},{"instId":"BAD-USDT","bidPx":"x"}]}"#,
                expected: Ok(vec![("ETH-USDT", Some(99.0), Some(101.0))]),
            },
            TestCase {
                // TC5: missing data
                input: r#"{"code":"50011","msg":"Rate limit reached"}"#,
                expected: Err(()),
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = parse_tickers(test.input)
                .map(|tickers| {
                    tickers
                        .into_iter()
                        .map(|ticker| (ticker.inst_id, ticker.bid, ticker.ask))
                        .collect::<Vec<_>>()
                })
                .map_err(|_| ());
            let expected = test.expected.map(|tickers| {
                tickers
                    .into_iter()
                    .map(|(inst_id, bid, ask)| (inst_id.to_string(), bid, ask))
                    .collect::<Vec<_>>()
            });
            assert_eq!(actual, expected, "TC{} failed", index);
        }
    }
}
