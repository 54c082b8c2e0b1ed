use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rust_decimal::Decimal;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use voltdesk_api::{ApiError, BillingApi, HttpBillingApi};
use voltdesk_core::{
    LookupKind, LookupQuery, OtpPurpose, PaymentStatus, TransferDecision, TransferRequest,
};

/// A captured request: request line, authorization header, body.
#[derive(Debug, Clone)]
struct Seen {
    line: String,
    auth: Option<String>,
    body: String,
}

type Log = Arc<Mutex<Vec<Seen>>>;

fn route(line: &str) -> (u16, &'static str) {
    let path = line.split_whitespace().nth(1).unwrap_or_default();
    match path {
        p if p.starts_with("/api/customers/lookup") && p.contains("q=0412") => (
            200,
            r#"{"account_number":"0100234567","customer_name":"Ada Obi","meter_number":"04123456789","address":"12 Marina Road","tariff_band":"A","account_type":"prepaid","outstanding_balance":"0"}"#,
        ),
        p if p.starts_with("/api/customers/lookup") => (404, r#"{"error":"not found"}"#),
        "/api/transfers" => (200, r#"{"reference":"TRF-77","requires_otp":true}"#),
        "/api/otp" => (200, r#"{"sent":true}"#),
        "/api/transfers/TRF-77/confirm" => (
            200,
            r#"{"outcome":"failure","reason":"OTP expired"}"#,
        ),
        "/api/payments/PAY-1/status" => (
            200,
            r#"{"status":1,"artifacts":[{"token":"1111-2222-3333-4444-5555","amount":"30.5","unit":"kWh"}]}"#,
        ),
        "/api/payments/PAY-DENIED/status" => (401, ""),
        _ => (500, "boom"),
    }
}

async fn handle(mut stream: TcpStream, log: Log) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = stream.read(&mut chunk).await.expect("read request");
        if n == 0 {
            return;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.lines();
    let line = lines.next().unwrap_or_default().to_string();
    let mut content_length = 0usize;
    let mut auth = None;
    for header in lines {
        if let Some((name, value)) = header.split_once(':') {
            match name.trim().to_ascii_lowercase().as_str() {
                "content-length" => content_length = value.trim().parse().unwrap_or(0),
                "authorization" => auth = Some(value.trim().to_string()),
                _ => {}
            }
        }
    }
    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).await.expect("read body");
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body = String::from_utf8_lossy(&buf[header_end..]).to_string();

    let (status, payload) = route(&line);
    log.lock().unwrap().push(Seen { line, auth, body });

    let response = format!(
        "HTTP/1.1 {status} X\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{payload}",
        payload.len()
    );
    stream
        .write_all(response.as_bytes())
        .await
        .expect("write response");
    let _ = stream.shutdown().await;
}

async fn spawn_server() -> (SocketAddr, Log) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let log: Log = Arc::default();
    let server_log = log.clone();
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(handle(stream, server_log.clone()));
        }
    });
    (addr, log)
}

fn client(addr: SocketAddr) -> HttpBillingApi {
    HttpBillingApi::new(
        &format!("http://{addr}"),
        Some("secret-token".into()),
        Duration::from_secs(5),
    )
    .expect("client")
}

#[tokio::test]
async fn lookup_found_and_not_found() {
    let (addr, log) = spawn_server().await;
    let api = client(addr);

    let found = api
        .lookup_entity(&LookupQuery::new(LookupKind::MeterNumber, "0412"))
        .await
        .unwrap();
    assert_eq!(found.unwrap().customer_name, "Ada Obi");

    let missing = api
        .lookup_entity(&LookupQuery::new(LookupKind::AccountTag, "zzz"))
        .await
        .unwrap();
    assert!(missing.is_none());

    let seen = log.lock().unwrap().clone();
    assert_eq!(seen.len(), 2);
    assert!(seen[0].line.contains("kind=meter_number"));
    assert_eq!(seen[0].auth.as_deref(), Some("Bearer secret-token"));
}

#[tokio::test]
async fn short_lookup_never_reaches_server() {
    let (addr, log) = spawn_server().await;
    let api = client(addr);

    let err = api
        .lookup_entity(&LookupQuery::new(LookupKind::AccountTag, "ab"))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::QueryTooShort { min: 3 }));
    assert!(log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn transfer_round_trip() {
    let (addr, log) = spawn_server().await;
    let api = client(addr);

    let initiated = api
        .initiate_transfer(&TransferRequest {
            asset: "NGN".into(),
            amount: Decimal::new(123450, 2),
            recipient_account: "0123456789".into(),
            narration: None,
        })
        .await
        .unwrap();
    assert_eq!(initiated.reference, "TRF-77");
    assert!(initiated.requires_otp);

    assert!(api.request_otp(OtpPurpose::TransferAuthorization).await.unwrap());

    let decision = api.confirm_transfer("TRF-77", "123456").await.unwrap();
    assert_eq!(
        decision,
        TransferDecision::Failure {
            reason: "OTP expired".into()
        }
    );

    let seen = log.lock().unwrap().clone();
    assert!(seen[0].line.starts_with("POST /api/transfers "));
    let sent: serde_json::Value = serde_json::from_str(&seen[0].body).unwrap();
    assert_eq!(sent["recipient_account"], "0123456789");
    assert_eq!(seen[2].body, r#"{"otp":"123456"}"#);
}

#[tokio::test]
async fn payment_status_and_errors() {
    let (addr, _log) = spawn_server().await;
    let api = client(addr);

    let report = api.check_payment_status("PAY-1").await.unwrap();
    assert_eq!(report.payment_status(), PaymentStatus::Confirmed);
    assert_eq!(report.artifacts.len(), 1);

    let denied = api.check_payment_status("PAY-DENIED").await.unwrap_err();
    assert!(matches!(denied, ApiError::Unauthorized { status: 401 }));

    let broken = api.check_payment_status("PAY-UNKNOWN").await.unwrap_err();
    assert!(matches!(broken, ApiError::Server { status: 500, ref body } if body == "boom"));
}
