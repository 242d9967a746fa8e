//! Snowflake warehouse over the SQL API v2
//!
//! Every statement is a `POST /api/v2/statements` call. Statements that
//! outlive the synchronous window come back as HTTP 202 and are polled
//! through their statement handle. Inserts use array binding, so one
//! request carries a whole batch of rows.

use super::Warehouse;
use crate::model::{CellValue, ColumnType, Dialect, TableSchema, quote_ident};
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, Method, Request, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::str::FromStr;
use std::time::Duration;
use url::Url;

const TOKEN_TYPE_HEADER: &str = "X-Snowflake-Authorization-Token-Type";
const STATEMENT_TIMEOUT_SECS: u64 = 600;
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// How the bearer token was issued
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenType {
    #[default]
    Oauth,
    KeypairJwt,
}

impl TokenType {
    pub fn header_value(&self) -> &'static str {
        match self {
            Self::Oauth => "OAUTH",
            Self::KeypairJwt => "KEYPAIR_JWT",
        }
    }
}

impl std::fmt::Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.header_value())
    }
}

impl FromStr for TokenType {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "OAUTH" => Ok(Self::Oauth),
            "KEYPAIR_JWT" | "JWT" => Ok(Self::KeypairJwt),
            other => Err(Error::Config(format!(
                "Unknown Snowflake token type '{}' (expected OAUTH or KEYPAIR_JWT)",
                other
            ))),
        }
    }
}

/// Connection settings for [`SnowflakeWarehouse`]
#[derive(Debug, Clone, PartialEq)]
pub struct SnowflakeConfig {
    /// Account identifier, e.g. `myorg-myaccount`
    pub account: String,
    pub token: String,
    pub token_type: TokenType,
    pub warehouse: String,
    pub database: String,
    pub schema: String,
    pub role: Option<String>,
    /// Rows per INSERT request
    pub batch_rows: usize,
}

impl SnowflakeConfig {
    pub fn base_url(&self) -> Result<Url> {
        let url = format!("https://{}.snowflakecomputing.com/api/v2/", self.account);
        Url::parse(&url).map_err(|e| Error::Config(format!("Invalid Snowflake account: {}", e)))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatementResponse {
    #[serde(default)]
    statement_handle: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<Vec<Vec<Option<String>>>>,
}

/// A bound parameter: Snowflake type name plus one text value per row
#[derive(Debug, Clone, PartialEq)]
struct Binding {
    ty: &'static str,
    values: Vec<Option<String>>,
}

fn binding_text(cell: &CellValue) -> Option<String> {
    match cell {
        CellValue::Null => None,
        CellValue::Integer(v) => Some(v.to_string()),
        CellValue::Float(v) => Some(v.to_string()),
        CellValue::Text(v) => Some(v.clone()),
        CellValue::Timestamp(ts) => Some(format!("{} +00:00", ts.format("%Y-%m-%d %H:%M:%S"))),
    }
}

/// Column-major bindings for a batch of rows
fn bindings(schema: &TableSchema, rows: &[Vec<CellValue>]) -> Result<Map<String, Value>> {
    let mut columns: Vec<Binding> = schema
        .columns
        .iter()
        .map(|c| Binding {
            ty: match c.ty {
                ColumnType::Integer => "FIXED",
                ColumnType::Float => "REAL",
                _ => "TEXT",
            },
            values: Vec::with_capacity(rows.len()),
        })
        .collect();

    for (i, row) in rows.iter().enumerate() {
        if row.len() != columns.len() {
            return Err(Error::format(
                format!("row {} for {}", i, schema.name),
                format!("expected {} values, got {}", columns.len(), row.len()),
            ));
        }
        for (binding, cell) in columns.iter_mut().zip(row) {
            binding.values.push(binding_text(cell));
        }
    }

    Ok(columns
        .into_iter()
        .enumerate()
        .map(|(i, b)| {
            (
                (i + 1).to_string(),
                json!({ "type": b.ty, "value": b.values }),
            )
        })
        .collect())
}

pub struct SnowflakeWarehouse {
    client: Client,
    base: Url,
    config: SnowflakeConfig,
}

fn client_builder(config: &SnowflakeConfig) -> Result<reqwest::ClientBuilder> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(
        USER_AGENT,
        HeaderValue::from_static(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        )),
    );
    headers.insert(
        AUTHORIZATION,
        format!("Bearer {}", config.token)
            .parse()
            .map_err(|_| Error::Config("Snowflake token is not a valid header value".into()))?,
    );
    headers.insert(
        TOKEN_TYPE_HEADER,
        HeaderValue::from_static(config.token_type.header_value()),
    );

    Ok(Client::builder()
        .default_headers(headers)
        .timeout(Duration::from_secs(STATEMENT_TIMEOUT_SECS + 30)))
}

impl SnowflakeWarehouse {
    pub fn try_new(config: SnowflakeConfig) -> Result<Self> {
        let client = client_builder(&config)?
            .build()
            .map_err(|e| Error::connection("snowflake", e))?;

        Ok(Self {
            client,
            base: config.base_url()?,
            config,
        })
    }

    /// Point the warehouse at another API root, bypassing proxies
    #[cfg(test)]
    fn with_base_url(mut self, base: Url) -> Result<Self> {
        self.client = client_builder(&self.config)?
            .no_proxy()
            .build()
            .map_err(|e| Error::connection("snowflake", e))?;
        self.base = base;
        Ok(self)
    }

    /// JSON body of a statement request
    fn statement_body(&self, sql: &str, bindings: Option<Map<String, Value>>) -> Value {
        let mut body = json!({
            "statement": sql,
            "timeout": STATEMENT_TIMEOUT_SECS,
            "database": self.config.database,
            "schema": self.config.schema,
            "warehouse": self.config.warehouse,
            "parameters": { "TIMEZONE": "UTC" },
        });
        if let Some(role) = &self.config.role {
            body["role"] = json!(role);
        }
        if let Some(bindings) = bindings {
            body["bindings"] = Value::Object(bindings);
        }
        body
    }

    /// Build (without sending) a statement request
    fn statement_request(&self, sql: &str, bindings: Option<Map<String, Value>>) -> Result<Request> {
        let mut url = self
            .base
            .join("statements")
            .map_err(|e| Error::Config(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("requestId", &uuid::Uuid::new_v4().to_string());

        self.client
            .request(Method::POST, url)
            .json(&self.statement_body(sql, bindings))
            .build()
            .map_err(|e| Error::connection(self.base.as_str(), e))
    }

    fn status_request(&self, handle: &str) -> Result<Request> {
        let url = self
            .base
            .join(&format!("statements/{}", handle))
            .map_err(|e| Error::Config(e.to_string()))?;
        self.client
            .request(Method::GET, url)
            .build()
            .map_err(|e| Error::connection(self.base.as_str(), e))
    }

    async fn send(&self, request: Request) -> Result<(StatusCode, StatementResponse)> {
        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| Error::connection(self.base.as_str(), e))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::connection(self.base.as_str(), e))?;

        match serde_json::from_str::<StatementResponse>(&text) {
            Ok(body) => Ok((status, body)),
            Err(_) if !status.is_success() => Err(Error::connection(
                self.base.as_str(),
                format!("HTTP {}: {}", status, text),
            )),
            Err(e) => Err(Error::format("Snowflake response", e)),
        }
    }

    /// Execute one statement and wait for its result
    async fn execute(
        &self,
        sql: &str,
        bindings: Option<Map<String, Value>>,
    ) -> Result<Vec<Vec<Option<String>>>> {
        log::debug!("Snowflake: {}", sql);
        let (mut status, mut body) = self.send(self.statement_request(sql, bindings)?).await?;

        while status == StatusCode::ACCEPTED {
            let handle = body.statement_handle.clone().ok_or_else(|| {
                Error::format("Snowflake response", "202 response without a statement handle")
            })?;
            log::debug!("Statement {} still running", handle);
            tokio::time::sleep(POLL_INTERVAL).await;
            (status, body) = self.send(self.status_request(&handle)?).await?;
        }

        match status {
            s if s.is_success() => Ok(body.data.unwrap_or_default()),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(Error::connection(
                self.base.as_str(),
                body.message.unwrap_or_else(|| status.to_string()),
            )),
            _ => Err(Error::statement(
                "snowflake",
                body.message.unwrap_or_else(|| status.to_string()),
            )),
        }
    }
}

#[async_trait]
impl Warehouse for SnowflakeWarehouse {
    fn name(&self) -> &str {
        &self.config.database
    }

    async fn create_table(&self, schema: &TableSchema) -> Result<()> {
        self.execute(&schema.create_sql(Dialect::Snowflake), None)
            .await
            .map(|_| ())
    }

    async fn columns(&self, table: &str) -> Result<Vec<String>> {
        let mut params = Map::new();
        params.insert("1".into(), json!({ "type": "TEXT", "value": table }));
        let data = self
            .execute(
                "SELECT column_name FROM information_schema.columns \
                 WHERE table_schema = CURRENT_SCHEMA() AND table_name = ? \
                 ORDER BY ordinal_position",
                Some(params),
            )
            .await?;
        Ok(data
            .into_iter()
            .filter_map(|row| row.into_iter().next().flatten())
            .collect())
    }

    async fn append(&self, schema: &TableSchema, rows: Vec<Vec<CellValue>>) -> Result<usize> {
        let sql = schema.insert_sql();
        let mut count = 0;
        for batch in rows.chunks(self.config.batch_rows.max(1)) {
            self.execute(&sql, Some(bindings(schema, batch)?)).await?;
            count += batch.len();
            log::debug!("Inserted {}/{} row(s) into {}", count, rows.len(), schema.name);
        }
        Ok(count)
    }

    async fn row_count(&self, table: &str) -> Result<u64> {
        let data = self
            .execute(&format!("SELECT COUNT(*) FROM {}", quote_ident(table)), None)
            .await?;
        data.first()
            .and_then(|row| row.first().cloned().flatten())
            .ok_or_else(|| Error::format("Snowflake response", "COUNT(*) returned no rows"))?
            .parse()
            .map_err(|e| Error::format("Snowflake row count", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::catalog::FACT_PAYMENTS;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    fn config() -> SnowflakeConfig {
        SnowflakeConfig {
            account: "myorg-myaccount".into(),
            token: "secret-token".into(),
            token_type: TokenType::KeypairJwt,
            warehouse: "COMPUTE_WH".into(),
            database: "OLIST".into(),
            schema: "STAR".into(),
            role: Some("LOADER".into()),
            batch_rows: 2,
        }
    }

    /// Local HTTP endpoint answering each connection with the next scripted
    /// response. The task yields the request lines it saw.
    async fn serve(responses: Vec<(u16, &'static str)>) -> (Url, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = Url::parse(&format!(
            "http://{}/api/v2/",
            listener.local_addr().unwrap()
        ))
        .unwrap();

        let task = tokio::spawn(async move {
            let mut requests = Vec::new();
            for (status, body) in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                requests.push(read_request(&mut socket).await);

                let content_type = if body.starts_with('{') {
                    "application/json"
                } else {
                    "text/html"
                };
                let response = format!(
                    "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    StatusCode::from_u16(status)
                        .unwrap()
                        .canonical_reason()
                        .unwrap_or("Unknown"),
                    content_type,
                    body.len(),
                    body
                );
                socket.write_all(response.as_bytes()).await.unwrap();
                socket.shutdown().await.unwrap();
            }
            requests
        });
        (base, task)
    }

    /// Read one request (headers and body) and return its request line
    async fn read_request(socket: &mut TcpStream) -> String {
        let mut buffer = Vec::new();
        let mut chunk = [0u8; 1024];
        let header_end = loop {
            let n = socket.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before the request headers");
            buffer.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buffer.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };

        let head = String::from_utf8_lossy(&buffer[..header_end]).to_string();
        let length = head
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        while buffer.len() < header_end + length {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buffer.extend_from_slice(&chunk[..n]);
        }
        head.lines().next().unwrap_or_default().to_string()
    }

    async fn local_warehouse(
        responses: Vec<(u16, &'static str)>,
    ) -> (SnowflakeWarehouse, JoinHandle<Vec<String>>) {
        let (base, task) = serve(responses).await;
        let warehouse = SnowflakeWarehouse::try_new(config())
            .unwrap()
            .with_base_url(base)
            .unwrap();
        (warehouse, task)
    }

    fn payment(seq: i64, value: f64) -> Vec<CellValue> {
        vec![
            "b81ef226-f3fe-1789-b1e8-b2acac839d17".into(),
            seq.into(),
            "credit_card".into(),
            CellValue::Null,
            value.into(),
        ]
    }

    #[test]
    fn test_token_type_parse() {
        assert_eq!("oauth".parse::<TokenType>().unwrap(), TokenType::Oauth);
        assert_eq!(
            "KEYPAIR_JWT".parse::<TokenType>().unwrap(),
            TokenType::KeypairJwt
        );
        assert!(matches!(
            "basic".parse::<TokenType>(),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_statement_request_headers_and_url() {
        let warehouse = SnowflakeWarehouse::try_new(config()).unwrap();
        let request = warehouse.statement_request("SELECT 1", None).unwrap();

        assert_eq!(request.method(), Method::POST);
        assert_eq!(
            request.url().host_str(),
            Some("myorg-myaccount.snowflakecomputing.com")
        );
        assert_eq!(request.url().path(), "/api/v2/statements");
        assert!(request.url().query().unwrap().starts_with("requestId="));

        let body: Value = serde_json::from_slice(request.body().unwrap().as_bytes().unwrap()).unwrap();
        assert_eq!(body["statement"], "SELECT 1");
        assert_eq!(body["database"], "OLIST");
        assert_eq!(body["schema"], "STAR");
        assert_eq!(body["role"], "LOADER");
        assert!(body.get("bindings").is_none());
    }

    #[test]
    fn test_status_request_url() {
        let warehouse = SnowflakeWarehouse::try_new(config()).unwrap();
        let request = warehouse.status_request("01b2-handle").unwrap();
        assert_eq!(request.method(), Method::GET);
        assert_eq!(request.url().path(), "/api/v2/statements/01b2-handle");
    }

    #[test]
    fn test_bindings_are_column_major() {
        let rows = vec![payment(1, 18.12), payment(2, 2.5)];
        let bindings = bindings(&FACT_PAYMENTS, &rows).unwrap();

        assert_eq!(bindings.len(), 5);
        assert_eq!(
            bindings["1"]["value"],
            json!([
                "b81ef226-f3fe-1789-b1e8-b2acac839d17",
                "b81ef226-f3fe-1789-b1e8-b2acac839d17"
            ])
        );
        assert_eq!(bindings["2"], json!({ "type": "FIXED", "value": ["1", "2"] }));
        assert_eq!(bindings["4"]["value"], json!([null, null]));
        assert_eq!(bindings["5"], json!({ "type": "REAL", "value": ["18.12", "2.5"] }));
    }

    #[test]
    fn test_bindings_reject_short_rows() {
        let rows = vec![vec![CellValue::Null]];
        assert!(matches!(
            bindings(&FACT_PAYMENTS, &rows),
            Err(Error::Format { .. })
        ));
    }

    #[test]
    fn test_timestamp_binding_is_utc_text() {
        let ts = chrono::NaiveDate::from_ymd_opt(2017, 10, 2)
            .unwrap()
            .and_hms_opt(10, 56, 33)
            .unwrap();
        assert_eq!(
            binding_text(&CellValue::Timestamp(ts)).as_deref(),
            Some("2017-10-02 10:56:33 +00:00")
        );
    }

    #[test]
    fn test_parse_async_response() {
        let body: StatementResponse = serde_json::from_str(
            r#"{"code":"333334","message":"Asynchronous execution in progress.","statementHandle":"01b2c3d4","statementStatusUrl":"/api/v2/statements/01b2c3d4"}"#,
        )
        .unwrap();
        assert_eq!(body.statement_handle.as_deref(), Some("01b2c3d4"));
        assert!(body.data.is_none());

        let body: StatementResponse =
            serde_json::from_str(r#"{"statementHandle":"x","data":[["42"]]}"#).unwrap();
        assert_eq!(body.data.unwrap(), vec![vec![Some("42".to_string())]]);
    }

    #[tokio::test]
    async fn test_execute_polls_accepted_statement() {
        let (warehouse, task) = local_warehouse(vec![
            (202, r#"{"statementHandle":"01b2-handle","message":"Asynchronous execution in progress."}"#),
            (200, r#"{"statementHandle":"01b2-handle","data":[["7"]]}"#),
        ])
        .await;

        assert_eq!(warehouse.row_count("FACT_ORDERS").await.unwrap(), 7);

        let requests = task.await.unwrap();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].starts_with("POST /api/v2/statements?requestId="));
        assert_eq!(requests[1], "GET /api/v2/statements/01b2-handle HTTP/1.1");
    }

    #[tokio::test]
    async fn test_unauthorized_is_connection_error() {
        let (warehouse, task) =
            local_warehouse(vec![(401, r#"{"message":"Invalid OAuth access token."}"#)]).await;

        let err = warehouse.row_count("FACT_ORDERS").await.unwrap_err();
        assert!(
            matches!(&err, Error::Connection { message, .. } if message == "Invalid OAuth access token."),
            "{:?}",
            err
        );
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_rejected_statement_is_statement_error() {
        let (warehouse, task) = local_warehouse(vec![(
            422,
            r#"{"code":"002003","message":"SQL compilation error: Object 'FACT_ORDERS' does not exist."}"#,
        )])
        .await;

        let err = warehouse.create_table(&FACT_PAYMENTS).await.unwrap_err();
        assert!(
            matches!(&err, Error::Statement { message, .. } if message.starts_with("SQL compilation error")),
            "{:?}",
            err
        );
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_html_error_page_is_connection_error() {
        let (warehouse, task) =
            local_warehouse(vec![(502, "<html><body>Bad Gateway</body></html>")]).await;

        let err = warehouse.columns("FACT_ORDERS").await.unwrap_err();
        assert!(
            matches!(&err, Error::Connection { message, .. } if message.contains("502")),
            "{:?}",
            err
        );
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_append_sends_one_request_per_batch() {
        let (warehouse, task) = local_warehouse(vec![
            (200, r#"{"data":[["2"]]}"#),
            (200, r#"{"data":[["1"]]}"#),
        ])
        .await;

        let rows = vec![payment(1, 18.12), payment(2, 2.5), payment(3, 7.0)];
        assert_eq!(warehouse.append(&FACT_PAYMENTS, rows).await.unwrap(), 3);
        assert_eq!(task.await.unwrap().len(), 2);
    }
}
