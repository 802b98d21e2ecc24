//! Poll cycles against a throwaway local HTTP server.

use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::thread;
use std::time::Duration;

use tempfile::TempDir;
use tokenboard::app::Dashboard;
use tokenboard::board::HtmlFileSink;
use tokenboard::config::Config;
use tokenboard::feed::{HttpSource, PayloadSource};
use tokenboard::model::PayloadShape;
use tokenboard::page::LAST_REFRESH_ID;
use tokenboard::render::Column;

/// Serve the given (status, body) pairs, one connection each, then stop.
fn serve(responses: Vec<(&'static str, String)>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("local addr");
    thread::spawn(move || {
        for (status, body) in responses {
            let mut stream = match listener.accept() {
                Ok((s, _)) => s,
                Err(_) => return,
            };
            let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));
            let mut line = String::new();
            loop {
                line.clear();
                match reader.read_line(&mut line) {
                    Ok(0) | Err(_) => break,
                    Ok(_) if line == "\r\n" => break,
                    Ok(_) => {}
                }
            }
            let response = format!(
                "HTTP/1.1 {}\r\n\
                 Content-Type: application/json\r\n\
                 Content-Length: {}\r\n\
                 Connection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            let _ = stream.write_all(response.as_bytes());
        }
    });
    format!("http://{}", addr)
}

fn config_for(base: &str, output: &str) -> Config {
    let base = base.to_string();
    let output = output.to_string();
    Config::from_lookup(move |key| match key {
        "DASHBOARD_URL" => Some(base.clone()),
        "OUTPUT_PATH" => Some(output.clone()),
        "ONESHOT" => Some("1".to_string()),
        _ => None,
    })
}

const CURRENT_BODY: &str = r#"{
    "rows": [
        {"coin_id": "bitcoin", "coin_name": "Bitcoin", "price": 3, "financing_based_price": 5},
        {"coin_id": "ethereum", "coin_name": "Ethereum", "price": null}
    ],
    "last_refresh_epoch": 1700000000,
    "next_refresh_epoch": 1700000300
}"#;

#[tokio::test]
async fn http_source_decodes_current_payload() {
    let base = serve(vec![("200 OK", CURRENT_BODY.to_string())]);
    let source = HttpSource::new(&format!("{}/api/data", base), Duration::from_secs(5)).unwrap();
    let fetched = source.fetch().await.unwrap();
    assert_eq!(fetched.shape, PayloadShape::Current);
    assert_eq!(fetched.payload.rows.len(), 2);
    assert_eq!(fetched.payload.last_refresh_epoch, Some(1_700_000_000.0));
}

#[tokio::test]
async fn http_source_rejects_error_status() {
    let base = serve(vec![("500 Internal Server Error", "{}".to_string())]);
    let source = HttpSource::new(&format!("{}/api/data", base), Duration::from_secs(5)).unwrap();
    let err = source.fetch().await.unwrap_err();
    assert!(format!("{:#}", err).contains("500"));
}

#[tokio::test]
async fn http_source_rejects_malformed_json() {
    let base = serve(vec![("200 OK", "{\"rows\": [".to_string())]);
    let source = HttpSource::new(&format!("{}/api/data", base), Duration::from_secs(5)).unwrap();
    assert!(source.fetch().await.is_err());
}

#[tokio::test]
async fn legacy_prices_array_is_accepted() {
    let base = serve(vec![(
        "200 OK",
        r#"[{"coin_name": "Solana", "price": 150.25}]"#.to_string(),
    )]);
    let source = HttpSource::new(&format!("{}/api/prices", base), Duration::from_secs(5)).unwrap();
    let fetched = source.fetch().await.unwrap();
    assert_eq!(fetched.shape, PayloadShape::Legacy);
    assert_eq!(fetched.payload.rows[0].price, Some(150.25));
}

#[tokio::test]
async fn one_shot_publishes_table_and_clock() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("dashboard.html");
    let base = serve(vec![("200 OK", CURRENT_BODY.to_string())]);
    let cfg = config_for(&base, output.to_str().unwrap());

    let mut dashboard = Dashboard::from_config(cfg).unwrap();
    let report = dashboard.run_once().await.unwrap();
    assert_eq!(report.rows, 2);

    let last = dashboard
        .board()
        .with_page(|p| p.text(LAST_REFRESH_ID).map(str::to_string))
        .unwrap();
    assert_eq!(last.as_deref(), Some("2023-11-14 22:13:20"));

    let html = fs::read_to_string(&output).unwrap();
    assert!(html.contains("<span id=\"last-refresh\">2023-11-14 22:13:20</span>"));
    assert!(html.contains("<span id=\"next-refresh\">2023-11-14 22:18:20</span>"));
    assert!(html.contains(">Bitcoin</a>"));
    assert!(html.contains("<td class=\"highlight overvalued\">$5</td>"));
    assert!(html.contains("<td class=\"highlight\">-</td>"));
}

#[tokio::test]
async fn failed_cycle_keeps_published_table() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("dashboard.html");
    let base = serve(vec![
        ("200 OK", CURRENT_BODY.to_string()),
        ("503 Service Unavailable", String::new()),
        ("200 OK", r#"{"rows": [{"coin_name": "Tron"}]}"#.to_string()),
    ]);
    let cfg = config_for(&base, output.to_str().unwrap());
    let source = HttpSource::from_config(&cfg).unwrap();
    let mut dashboard = Dashboard::new(cfg, source, Some(HtmlFileSink::new(&output)));

    dashboard.run_once().await.unwrap();
    assert!(dashboard.run_once().await.is_err());
    let names: Vec<String> = dashboard
        .board()
        .with_page(|p| {
            p.rows()
                .iter()
                .map(|r| r.cell(Column::CoinName).unwrap().text.clone())
                .collect()
        })
        .unwrap();
    assert_eq!(names, vec!["Bitcoin", "Ethereum"]);
    assert!(fs::read_to_string(&output).unwrap().contains(">Ethereum</a>"));

    let report = dashboard.run_once().await.unwrap();
    assert_eq!(report.rows, 1);
    let html = fs::read_to_string(&output).unwrap();
    assert!(html.contains(">Tron<"));
    assert!(!html.contains("Ethereum"));
}
