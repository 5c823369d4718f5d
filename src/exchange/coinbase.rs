//! Coinbase Exchange REST adapter.
//!
//! Private endpoints are authenticated with an HMAC-SHA256 signature over
//! `timestamp + METHOD + path + body`, where `path` includes the query
//! string and the key is the base64-decoded API secret. The signature and
//! timestamp travel in `CB-ACCESS-SIGN` / `CB-ACCESS-TIMESTAMP`; the key id
//! and passphrase are fixed headers on every request.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use sha2::Sha256;
use tracing::{debug, instrument};

use crate::config::KeyFile;
use crate::error::AdapterError;
use crate::exchange::adapter::{Balance, ExchangeAdapter};
use crate::orderbook::{BookTop, Quote};
use crate::trading::{OrderIntent, Side};

type HmacSha256 = Hmac<Sha256>;

const API_URL: &str = "https://api.exchange.coinbase.com";

/// Live adapter for Coinbase Exchange.
#[derive(Clone)]
pub struct CoinbaseExchange {
    http: reqwest::Client,
    api_url: String,
    /// Keyed HMAC prototype, cloned per signature.
    mac: HmacSha256,
    valuation_currency: String,
}

/// One account entry from `GET /accounts`.
#[derive(Debug, Clone, Deserialize)]
struct AccountResponse {
    /// Ticker this account holds.
    currency: String,
    /// Funds not locked by holds.
    available: Decimal,
}

/// Response from `GET /products/{id}/ticker`.
#[derive(Debug, Clone, Deserialize)]
struct TickerResponse {
    price: Decimal,
}

/// Response from `GET /products/{id}/book`.
///
/// Rows are `[price, size, num_orders]` with mixed JSON types, so they are
/// kept raw and picked apart by hand.
#[derive(Debug, Clone, Deserialize)]
struct BookResponse {
    bids: Vec<Vec<serde_json::Value>>,
    asks: Vec<Vec<serde_json::Value>>,
}

/// One order from `GET /orders` or `POST /orders`.
#[derive(Debug, Clone, Deserialize)]
struct OrderResponse {
    id: String,
}

/// Error body shape used by the venue.
#[derive(Debug, Clone, Deserialize)]
struct ErrorMessage {
    message: String,
}

impl CoinbaseExchange {
    /// Build an adapter from loaded credentials.
    pub fn new(key: &KeyFile, valuation_currency: impl Into<String>) -> Result<Self, AdapterError> {
        let secret = BASE64
            .decode(&key.api_secret)
            .map_err(|e| AdapterError::Auth(format!("api secret is not valid base64: {e}")))?;
        let mac = HmacSha256::new_from_slice(&secret)
            .map_err(|e| AdapterError::Auth(format!("invalid hmac key: {e}")))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let mut key_header = HeaderValue::from_str(&key.api_key)
            .map_err(|_| AdapterError::Auth("api key contains invalid header bytes".into()))?;
        key_header.set_sensitive(true);
        headers.insert("CB-ACCESS-KEY", key_header);
        let mut pass_header = HeaderValue::from_str(&key.passphrase)
            .map_err(|_| AdapterError::Auth("passphrase contains invalid header bytes".into()))?;
        pass_header.set_sensitive(true);
        headers.insert("CB-ACCESS-PASSPHRASE", pass_header);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(10))
            .connect_timeout(std::time::Duration::from_secs(5))
            .tcp_keepalive(std::time::Duration::from_secs(30))
            .pool_idle_timeout(std::time::Duration::from_secs(90))
            .build()?;

        Ok(Self {
            http,
            api_url: API_URL.to_string(),
            mac,
            valuation_currency: valuation_currency.into(),
        })
    }

    /// Sign `timestamp + method + path + body`; `path` must carry its query
    /// string and leading slash exactly as sent.
    fn sign(&self, timestamp: i64, method: &str, path: &str, body: &str) -> String {
        let message = format!("{timestamp}{method}{path}{body}");
        let mut mac = self.mac.clone();
        mac.update(message.as_bytes());
        BASE64.encode(mac.finalize().into_bytes())
    }

    /// Send a signed request. `body` is serialized exactly once so the
    /// signature always covers the bytes on the wire.
    async fn signed_request(
        &self,
        method: Method,
        path: &str,
        body: Option<String>,
    ) -> Result<reqwest::Response, AdapterError> {
        let timestamp = chrono::Utc::now().timestamp();
        let body = body.unwrap_or_default();
        let signature = self.sign(timestamp, method.as_str(), path, &body);
        debug!(%method, path, "sending signed request");

        let mut request = self
            .http
            .request(method, format!("{}{}", self.api_url, path))
            .header("CB-ACCESS-SIGN", signature)
            .header("CB-ACCESS-TIMESTAMP", timestamp.to_string());
        if !body.is_empty() {
            request = request.body(body);
        }

        Ok(request.send().await?)
    }

    /// Map non-success statuses onto the adapter error taxonomy.
    async fn ensure_success(
        response: reqwest::Response,
        endpoint: &str,
    ) -> Result<reqwest::Response, AdapterError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(AdapterError::Auth(format!("HTTP {status}: {body}")))
            }
            StatusCode::TOO_MANY_REQUESTS => Err(AdapterError::RateLimited {
                endpoint: endpoint.to_string(),
            }),
            _ => Err(AdapterError::RequestFailed {
                endpoint: endpoint.to_string(),
                reason: format!("HTTP {status}: {body}"),
            }),
        }
    }

    async fn parse_json<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
        endpoint: &str,
    ) -> Result<T, AdapterError> {
        response
            .json()
            .await
            .map_err(|e| AdapterError::Malformed {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            })
    }
}

/// Pull the top row of one book side into a validated quote.
fn quote_from_rows(
    rows: &[Vec<serde_json::Value>],
    pair: &str,
    side: Side,
    endpoint: &str,
) -> Result<Quote, AdapterError> {
    let malformed = |reason: String| AdapterError::Malformed {
        endpoint: endpoint.to_string(),
        reason,
    };

    let row = rows.first().ok_or_else(|| AdapterError::EmptyBook {
        pair: pair.to_string(),
        side,
    })?;
    let field = |idx: usize, name: &str| -> Result<Decimal, AdapterError> {
        row.get(idx)
            .and_then(|v| v.as_str())
            .ok_or_else(|| malformed(format!("{side} row has no {name} string")))?
            .parse()
            .map_err(|e| malformed(format!("{side} {name}: {e}")))
    };

    let quote = Quote::new(field(0, "price")?, field(1, "size")?);
    quote.validate().map_err(malformed)?;
    Ok(quote)
}

/// Keep the tracked tickers out of a full account listing, failing when any
/// of them has no account.
fn balance_from_accounts(
    accounts: Vec<AccountResponse>,
    tickers: &[&str],
) -> Result<Balance, AdapterError> {
    let balance: Balance = accounts
        .into_iter()
        .filter(|a| tickers.contains(&a.currency.as_str()))
        .map(|a| (a.currency, a.available))
        .collect();

    let missing = balance.missing_from(tickers);
    if !missing.is_empty() {
        return Err(AdapterError::IncompleteBalance { missing });
    }
    Ok(balance)
}

#[async_trait]
impl ExchangeAdapter for CoinbaseExchange {
    #[instrument(skip(self))]
    async fn get_balance(&self, tickers: &[&str]) -> Result<Balance, AdapterError> {
        let path = "/accounts";
        let response = self.signed_request(Method::GET, path, None).await?;
        let response = Self::ensure_success(response, path).await?;
        let accounts: Vec<AccountResponse> = Self::parse_json(response, path).await?;
        balance_from_accounts(accounts, tickers)
    }

    #[instrument(skip(self))]
    async fn get_last_price(&self, ticker: &str) -> Result<Decimal, AdapterError> {
        let path = format!("/products/{}-{}/ticker", ticker, self.valuation_currency);
        let response = self.signed_request(Method::GET, &path, None).await?;
        let response = Self::ensure_success(response, &path).await?;
        let ticker_data: TickerResponse = Self::parse_json(response, &path).await?;
        if ticker_data.price <= Decimal::ZERO {
            return Err(AdapterError::Malformed {
                endpoint: path,
                reason: format!("non-positive last price {}", ticker_data.price),
            });
        }
        Ok(ticker_data.price)
    }

    #[instrument(skip(self))]
    async fn get_book_top(&self, pair: &str) -> Result<BookTop, AdapterError> {
        let path = format!("/products/{pair}/book?level=1");
        let response = self.signed_request(Method::GET, &path, None).await?;
        let response = Self::ensure_success(response, &path).await?;
        let book: BookResponse = Self::parse_json(response, &path).await?;

        let bid = quote_from_rows(&book.bids, pair, Side::Bid, &path)?;
        let ask = quote_from_rows(&book.asks, pair, Side::Ask, &path)?;
        Ok(BookTop::new(pair, bid, ask))
    }

    #[instrument(skip(self))]
    async fn list_open_orders(&self) -> Result<Vec<String>, AdapterError> {
        let path = "/orders?limit=100";
        let response = self.signed_request(Method::GET, path, None).await?;
        let response = Self::ensure_success(response, path).await?;
        let orders: Vec<OrderResponse> = Self::parse_json(response, path).await?;
        Ok(orders.into_iter().map(|o| o.id).collect())
    }

    #[instrument(skip(self))]
    async fn place_order(&self, intent: &OrderIntent) -> Result<String, AdapterError> {
        intent
            .validate()
            .map_err(|reason| AdapterError::Rejected { reason })?;

        let side = match intent.side {
            Side::Bid => "buy",
            Side::Ask => "sell",
        };
        let body = json!({
            "type": "limit",
            "side": side,
            "product_id": intent.pair,
            "price": intent.price.to_string(),
            "size": intent.amount.to_string(),
        })
        .to_string();

        let path = "/orders";
        let response = self.signed_request(Method::POST, path, Some(body)).await?;

        // The venue explains rejections in a message body.
        if response.status() == StatusCode::BAD_REQUEST {
            let body = response.text().await.unwrap_or_default();
            let reason = serde_json::from_str::<ErrorMessage>(&body)
                .map(|m| m.message)
                .unwrap_or(body);
            return Err(AdapterError::Rejected { reason });
        }

        let response = Self::ensure_success(response, path).await?;
        let order: OrderResponse = Self::parse_json(response, path).await?;
        debug!(order_id = %order.id, pair = %intent.pair, "order accepted");
        Ok(order.id)
    }

    #[instrument(skip(self))]
    async fn cancel_order(&self, order_id: &str) -> Result<(), AdapterError> {
        let path = format!("/orders/{order_id}");
        let response = self.signed_request(Method::DELETE, &path, None).await?;

        // Already filled or already cancelled counts as done.
        if response.status() == StatusCode::NOT_FOUND {
            debug!(order_id, "order already gone, treating cancel as done");
            return Ok(());
        }

        Self::ensure_success(response, &path).await?;
        Ok(())
    }
}

// Credentials stay out of Debug output.
impl std::fmt::Debug for CoinbaseExchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoinbaseExchange")
            .field("api_url", &self.api_url)
            .field("valuation_currency", &self.valuation_currency)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn test_exchange() -> CoinbaseExchange {
        let key = KeyFile {
            api_key: "key-id".to_string(),
            passphrase: "pass".to_string(),
            // base64 of "top-secret"
            api_secret: "dG9wLXNlY3JldA==".to_string(),
        };
        CoinbaseExchange::new(&key, "EUR").unwrap()
    }

    #[test]
    fn signature_matches_known_vectors() {
        let exchange = test_exchange();
        assert_eq!(
            exchange.sign(1609459200, "GET", "/accounts", ""),
            "oGbBu10lyd3l7xN+UHTvfDDCGCL0nLMHTdwtGbDi4uQ="
        );
        assert_eq!(
            exchange.sign(1609459200, "POST", "/orders", "{\"price\":\"0.5\"}"),
            "gEMJBopQ7oHDrmUweCPtsPWc0otc/FcCGjmEi7tILz0="
        );
    }

    #[test]
    fn rejects_non_base64_secret() {
        let key = KeyFile {
            api_key: "key-id".to_string(),
            passphrase: "pass".to_string(),
            api_secret: "!!! not base64 !!!".to_string(),
        };
        assert!(matches!(
            CoinbaseExchange::new(&key, "EUR"),
            Err(AdapterError::Auth(_))
        ));
    }

    #[test]
    fn account_listing_builds_balance() {
        let accounts: Vec<AccountResponse> = serde_json::from_str(
            r#"[
                {"id": "1", "currency": "ADA", "balance": "520.1", "available": "500.0"},
                {"id": "2", "currency": "ETH", "balance": "2.0", "available": "2.0"},
                {"id": "3", "currency": "BTC", "balance": "0.4", "available": "0.35"},
                {"id": "4", "currency": "EUR", "balance": "10", "available": "10"}
            ]"#,
        )
        .unwrap();

        let balance = balance_from_accounts(accounts, &["ADA", "ETH", "BTC"]).unwrap();
        assert_eq!(balance.len(), 3);
        assert_eq!(balance.available("ADA"), dec!(500.0));
        assert_eq!(balance.available("BTC"), dec!(0.35));
        // The ask currency list is the filter, untracked accounts are dropped.
        assert_eq!(balance.available("EUR"), Decimal::ZERO);
    }

    #[test]
    fn missing_account_is_incomplete_balance() {
        let accounts: Vec<AccountResponse> = serde_json::from_str(
            r#"[{"currency": "ADA", "available": "500.0"}]"#,
        )
        .unwrap();

        let err = balance_from_accounts(accounts, &["ADA", "ETH", "BTC"]).unwrap_err();
        match err {
            AdapterError::IncompleteBalance { missing } => {
                assert_eq!(missing, vec!["ETH", "BTC"]);
            }
            other => panic!("expected IncompleteBalance, got {other:?}"),
        }
    }

    #[test]
    fn book_rows_parse_into_quotes() {
        let book: BookResponse = serde_json::from_str(
            r#"{
                "sequence": 12345,
                "bids": [["0.02202", "1103.5148", 4]],
                "asks": [["0.02400", "103.2", 1]]
            }"#,
        )
        .unwrap();

        let bid = quote_from_rows(&book.bids, "ADA-ETH", Side::Bid, "/test").unwrap();
        let ask = quote_from_rows(&book.asks, "ADA-ETH", Side::Ask, "/test").unwrap();
        assert_eq!(bid, Quote::new(dec!(0.02202), dec!(1103.5148)));
        assert_eq!(ask, Quote::new(dec!(0.02400), dec!(103.2)));
    }

    #[test]
    fn empty_book_side_is_its_own_error() {
        let err = quote_from_rows(&[], "ADA-ETH", Side::Ask, "/test").unwrap_err();
        assert!(matches!(
            err,
            AdapterError::EmptyBook { side: Side::Ask, .. }
        ));
    }

    #[test]
    fn malformed_book_row_is_rejected() {
        let rows = vec![vec![serde_json::json!(0.022), serde_json::json!("5")]];
        assert!(matches!(
            quote_from_rows(&rows, "ADA-ETH", Side::Bid, "/test"),
            Err(AdapterError::Malformed { .. })
        ));

        let zero_price = vec![vec![serde_json::json!("0"), serde_json::json!("5")]];
        assert!(matches!(
            quote_from_rows(&zero_price, "ADA-ETH", Side::Bid, "/test"),
            Err(AdapterError::Malformed { .. })
        ));
    }
}
