//! Offset/length pagination over the EIA v2 API.

use std::time::Duration;

use prices_core::{DataError, EiaResult, HttpSession, QueryParams, Result};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::frame::records_to_frame;
use crate::retry::get_json;

/// Replaces every value of `key` with a single `value`.
pub fn set_param(params: &mut QueryParams, key: &str, value: impl Into<String>) {
    params.retain(|(k, _)| k != key);
    params.push((key.to_string(), value.into()));
}

/// Fetches every page of an EIA v2 endpoint that uses offset/length
/// pagination and concatenates them into one table.
///
/// Each request carries `base_params` plus `api_key`, `offset` and `length`.
/// The declared total is read from the first response only. The loop stops on
/// an empty page, or once the offset reaches the declared total. Responses are
/// expected to look like `{"response": {"total": int, "data": [...]}}`.
///
/// # Errors
/// Returns [`DataError::Config`] for a blank API key and
/// [`DataError::InvalidParameter`] for a zero page size, both before any
/// request. Request failures propagate after retries; malformed `total` or
/// `data` fields yield [`DataError::Parse`].
pub async fn fetch_eia_v2_all_pages<S: HttpSession + ?Sized>(
    session: &S,
    base_url: &str,
    base_params: &[(String, String)],
    api_key: &str,
    page_size: usize,
    timeout: Duration,
) -> Result<EiaResult> {
    if api_key.trim().is_empty() {
        return Err(DataError::Config(
            "EIA API key must be set before fetching".to_string(),
        ));
    }
    if page_size == 0 {
        return Err(DataError::InvalidParameter(
            "page_size must be positive".to_string(),
        ));
    }

    let mut pages: Vec<Vec<Map<String, Value>>> = Vec::new();
    let mut offset = 0usize;
    let mut total: Option<usize> = None;

    loop {
        let mut params = base_params.to_vec();
        set_param(&mut params, "api_key", api_key);
        set_param(&mut params, "offset", offset.to_string());
        set_param(&mut params, "length", page_size.to_string());

        let mut payload = get_json(session, base_url, &params, timeout).await?;
        let response = payload
            .get_mut("response")
            .map(Value::take)
            .unwrap_or(Value::Null);

        let declared = match total {
            Some(t) => t,
            None => *total.insert(declared_total(&response)?),
        };

        let records = page_records(response)?;
        if records.is_empty() {
            debug!(offset, "Empty page, stopping");
            break;
        }

        debug!(offset, rows = records.len(), total = declared, "Fetched EIA page");
        pages.push(records);

        offset += page_size;
        if offset >= declared {
            break;
        }
    }

    let page_count = pages.len();
    let records: Vec<Map<String, Value>> = pages.into_iter().flatten().collect();
    let frame = records_to_frame(&records)?;
    let total = total.unwrap_or(0);

    if frame.height() != total {
        warn!(
            rows = frame.height(),
            total, "Fetched row count differs from declared total"
        );
    }
    info!(
        url = base_url,
        pages = page_count,
        rows = frame.height(),
        total,
        "Fetched EIA data"
    );

    Ok(EiaResult { frame, total })
}

/// Reads `response.total`, which EIA sends as an integer or a numeric string.
fn declared_total(response: &Value) -> Result<usize> {
    match response.get("total") {
        None | Some(Value::Null) => Ok(0),
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .map(|t| t as usize)
            .ok_or_else(|| DataError::Parse(format!("Invalid total: {n}"))),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map_err(|e| DataError::Parse(format!("Invalid total {s:?}: {e}"))),
        Some(other) => Err(DataError::Parse(format!("Invalid total: {other}"))),
    }
}

/// Takes the records of `response.data`; a missing array is an empty page.
fn page_records(mut response: Value) -> Result<Vec<Map<String, Value>>> {
    match response.get_mut("data").map(Value::take) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(record) => Ok(record),
                other => Err(DataError::Parse(format!(
                    "Expected an object in response.data, got {other}"
                ))),
            })
            .collect(),
        Some(other) => Err(DataError::Parse(format!(
            "Expected an array in response.data, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use polars::prelude::DataFrame;
    use serde_json::json;
    use std::sync::Mutex;

    const URL: &str = "https://api.eia.gov/v2/electricity/retail-sales/data";
    const TIMEOUT: Duration = Duration::from_secs(1);

    /// Session that serves consecutive pages of the given sizes.
    #[derive(Debug)]
    struct PagedSession {
        total: Value,
        page_sizes: Vec<usize>,
        requests: Mutex<Vec<QueryParams>>,
    }

    impl PagedSession {
        fn new(total: Value, page_sizes: Vec<usize>) -> Self {
            Self {
                total,
                page_sizes,
                requests: Mutex::new(Vec::new()),
            }
        }

        fn requests(&self) -> Vec<QueryParams> {
            self.requests.lock().unwrap().clone()
        }

        fn param(params: &QueryParams, key: &str) -> Option<String> {
            params.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
        }
    }

    #[async_trait]
    impl HttpSession for PagedSession {
        async fn get(
            &self,
            _url: &str,
            params: &[(String, String)],
            _timeout: Duration,
        ) -> Result<Value> {
            let mut requests = self.requests.lock().unwrap();
            let index = requests.len();
            requests.push(params.to_vec());

            let start: usize = self.page_sizes.iter().take(index).sum();
            let rows = self.page_sizes.get(index).copied().unwrap_or(0);
            let data: Vec<Value> = (start..start + rows)
                .map(|i| json!({"row": i, "stateid": "CA", "price": i as f64 * 0.5}))
                .collect();

            let mut response = json!({ "data": data });
            if !self.total.is_null() {
                response["total"] = self.total.clone();
            }
            Ok(json!({ "response": response }))
        }
    }

    fn row_ids(df: &DataFrame) -> Vec<i64> {
        df.column("row")
            .unwrap()
            .i64()
            .unwrap()
            .into_iter()
            .flatten()
            .collect()
    }

    #[tokio::test]
    async fn test_fetches_all_pages_in_order() {
        let session = PagedSession::new(json!(11234), vec![5000, 5000, 1234]);

        let result = fetch_eia_v2_all_pages(&session, URL, &[], "key", 5000, TIMEOUT)
            .await
            .unwrap();

        assert_eq!(result.total, 11234);
        assert_eq!(result.frame.height(), 11234);
        assert!(result.is_complete());
        let expected: Vec<i64> = (0..11234).collect();
        assert_eq!(row_ids(&result.frame), expected);

        let requests = session.requests();
        let offsets: Vec<String> = requests
            .iter()
            .map(|p| PagedSession::param(p, "offset").unwrap())
            .collect();
        assert_eq!(offsets, vec!["0", "5000", "10000"]);
        for params in &requests {
            assert_eq!(PagedSession::param(params, "length").unwrap(), "5000");
            assert_eq!(PagedSession::param(params, "api_key").unwrap(), "key");
        }
    }

    #[tokio::test]
    async fn test_empty_first_page_keeps_declared_total() {
        let session = PagedSession::new(json!(42), vec![0]);

        let result = fetch_eia_v2_all_pages(&session, URL, &[], "key", 5000, TIMEOUT)
            .await
            .unwrap();

        assert_eq!(result.frame.height(), 0);
        assert_eq!(result.total, 42);
        assert_eq!(session.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_total_defaults_to_zero() {
        let session = PagedSession::new(Value::Null, vec![0]);

        let result = fetch_eia_v2_all_pages(&session, URL, &[], "key", 5000, TIMEOUT)
            .await
            .unwrap();

        assert_eq!(result.total, 0);
        assert_eq!(result.frame.height(), 0);
    }

    #[tokio::test]
    async fn test_total_as_string() {
        let session = PagedSession::new(json!("3"), vec![2, 1]);

        let result = fetch_eia_v2_all_pages(&session, URL, &[], "key", 2, TIMEOUT)
            .await
            .unwrap();

        assert_eq!(result.total, 3);
        assert_eq!(row_ids(&result.frame), vec![0, 1, 2]);
        assert_eq!(session.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_page_stops_before_total() {
        let session = PagedSession::new(json!(10), vec![2, 0, 2]);

        let result = fetch_eia_v2_all_pages(&session, URL, &[], "key", 2, TIMEOUT)
            .await
            .unwrap();

        assert_eq!(result.total, 10);
        assert_eq!(result.frame.height(), 2);
        assert!(!result.is_complete());
        assert_eq!(session.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_short_page_does_not_stop_loop() {
        let session = PagedSession::new(json!(6), vec![3, 1, 2]);

        let result = fetch_eia_v2_all_pages(&session, URL, &[], "key", 3, TIMEOUT)
            .await
            .unwrap();

        assert_eq!(result.frame.height(), 4);
        assert_eq!(session.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_base_params_merged() {
        let session = PagedSession::new(json!(1), vec![1]);
        let base: QueryParams = vec![
            ("frequency".to_string(), "monthly".to_string()),
            ("facets[stateid][]".to_string(), "CA".to_string()),
            ("facets[stateid][]".to_string(), "TX".to_string()),
            ("offset".to_string(), "99".to_string()),
        ];

        fetch_eia_v2_all_pages(&session, URL, &base, "key", 5000, TIMEOUT)
            .await
            .unwrap();

        let request = &session.requests()[0];
        let facets: Vec<&str> = request
            .iter()
            .filter(|(k, _)| k == "facets[stateid][]")
            .map(|(_, v)| v.as_str())
            .collect();
        assert_eq!(facets, vec!["CA", "TX"]);
        let offsets: Vec<&str> = request
            .iter()
            .filter(|(k, _)| k == "offset")
            .map(|(_, v)| v.as_str())
            .collect();
        assert_eq!(offsets, vec!["0"]);
        assert_eq!(PagedSession::param(request, "frequency").unwrap(), "monthly");
    }

    #[tokio::test]
    async fn test_rejects_blank_key_and_zero_page_size() {
        let session = PagedSession::new(json!(1), vec![1]);

        let blank = fetch_eia_v2_all_pages(&session, URL, &[], "  ", 5000, TIMEOUT).await;
        assert!(matches!(blank, Err(DataError::Config(_))));

        let zero = fetch_eia_v2_all_pages(&session, URL, &[], "key", 0, TIMEOUT).await;
        assert!(matches!(zero, Err(DataError::InvalidParameter(_))));

        assert!(session.requests().is_empty());
    }

    #[test]
    fn test_declared_total_shapes() {
        assert_eq!(declared_total(&json!({"total": 5})).unwrap(), 5);
        assert_eq!(declared_total(&json!({"total": " 17 "})).unwrap(), 17);
        assert_eq!(declared_total(&json!({})).unwrap(), 0);
        assert_eq!(declared_total(&Value::Null).unwrap(), 0);
        assert!(matches!(
            declared_total(&json!({"total": "many"})),
            Err(DataError::Parse(_))
        ));
    }

    #[test]
    fn test_page_records_rejects_non_objects() {
        assert!(page_records(json!({"data": [1, 2]})).is_err());
        assert!(page_records(json!({"data": "oops"})).is_err());
        assert!(page_records(json!({})).unwrap().is_empty());
    }
}
