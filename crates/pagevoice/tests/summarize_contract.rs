use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::net::SocketAddr;
use std::process::Command;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const LONG: &str = "Solar panels convert sunlight into electricity. \
    The weather was pleasant on Tuesday. \
    Modern solar panels reach high efficiency in direct sunlight. \
    Lunch was served at noon. \
    Electricity from solar panels can be stored in batteries.";

fn pagevoice() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("pagevoice"));
    cmd.env_remove("PAGEVOICE_OPENAI_COMPAT_API_KEY")
        .env_remove("OPENAI_API_KEY")
        .env_remove("PAGEVOICE_OPENAI_COMPAT_BASE_URL")
        .env_remove("PAGEVOICE_OFFLINE")
        .env_remove("PAGEVOICE_ENV_FILE");
    cmd
}

fn stdout_json(cmd: &mut Command) -> serde_json::Value {
    let out = cmd.output().expect("run pagevoice");
    assert!(
        out.status.success(),
        "pagevoice failed: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    serde_json::from_slice(&out.stdout).expect("parse json stdout")
}

/// Chat-completions stub on 127.0.0.1:0; counts requests.
fn stub(
    rt: &tokio::runtime::Runtime,
    status: u16,
    body: serde_json::Value,
) -> (SocketAddr, Arc<AtomicUsize>) {
    use axum::{http::StatusCode, routing::post, Json, Router};

    let hits = Arc::new(AtomicUsize::new(0));
    let hits_for_route = hits.clone();
    let addr = rt.block_on(async move {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        let app = Router::new().route(
            "/v1/chat/completions",
            post(move |Json(req): Json<serde_json::Value>| {
                let hits = hits_for_route.clone();
                let body = body.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    assert_eq!(req["model"].as_str(), Some("stub-model"));
                    (StatusCode::from_u16(status).unwrap(), Json(body))
                }
            }),
        );
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("axum serve");
        });
        addr
    });
    (addr, hits)
}

#[test]
fn summarize_local_by_default() {
    pagevoice()
        .args(["summarize", "--max-sentences", "1", "--text", LONG])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "\"summary\":\"Modern solar panels reach high efficiency in direct sunlight.\"",
        ))
        .stdout(predicate::str::contains("\"remote\":false"));
}

#[test]
fn summarize_reads_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    let p = dir.path().join("in.txt");
    std::fs::write(&p, LONG).expect("write input");

    let v = stdout_json(pagevoice().args(["summarize", "--file"]).arg(&p));
    assert_eq!(
        v["summary"].as_str(),
        Some(
            "Solar panels convert sunlight into electricity. \
             Modern solar panels reach high efficiency in direct sunlight. \
             Electricity from solar panels can be stored in batteries."
        )
    );
}

#[test]
fn summarize_requires_exactly_one_input() {
    pagevoice().args(["summarize"]).assert().failure();
    pagevoice()
        .args(["summarize", "--text", "a", "--file", "b.txt"])
        .assert()
        .failure();
}

#[test]
fn heading_takes_leading_words() {
    let v = stdout_json(pagevoice().args([
        "heading",
        "--max-words",
        "4",
        "--text",
        "  The city   council approved a new budget for parks.",
    ]));
    assert_eq!(v["heading"].as_str(), Some("The city council approved"));
}

#[test]
fn summarize_remote_uses_the_endpoint() {
    let rt = tokio::runtime::Runtime::new().expect("rt");
    let (addr, hits) = stub(
        &rt,
        200,
        serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "  Solar power, briefly. "}}]
        }),
    );

    let v = stdout_json(
        pagevoice()
            .args(["summarize", "--remote", "true", "--text", LONG])
            .env("PAGEVOICE_OPENAI_COMPAT_BASE_URL", format!("http://{addr}"))
            .env("PAGEVOICE_OPENAI_COMPAT_API_KEY", "sk-stub")
            .env("PAGEVOICE_OPENAI_COMPAT_MODEL", "stub-model"),
    );
    assert_eq!(v["summary"].as_str(), Some("Solar power, briefly."));
    assert_eq!(v["backend"].as_str(), Some("openai_compat"));
    assert_eq!(v["ai_enabled"].as_bool(), Some(true));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn summarize_remote_quota_falls_back_and_disables() {
    let rt = tokio::runtime::Runtime::new().expect("rt");
    let (addr, hits) = stub(
        &rt,
        429,
        serde_json::json!({
            "error": {"message": "You exceeded your current quota.", "type": "insufficient_quota", "code": "insufficient_quota"}
        }),
    );

    let v = stdout_json(
        pagevoice()
            .args(["summarize", "--remote", "true", "--max-sentences", "1", "--text", LONG])
            .env("PAGEVOICE_OPENAI_COMPAT_BASE_URL", format!("http://{addr}"))
            .env("PAGEVOICE_OPENAI_COMPAT_API_KEY", "sk-stub")
            .env("PAGEVOICE_OPENAI_COMPAT_MODEL", "stub-model"),
    );
    assert_eq!(
        v["summary"].as_str(),
        Some("Modern solar panels reach high efficiency in direct sunlight.")
    );
    assert_eq!(v["ai_enabled"].as_bool(), Some(false));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn summarize_remote_offline_never_calls_out() {
    let rt = tokio::runtime::Runtime::new().expect("rt");
    let (addr, hits) = stub(&rt, 200, serde_json::json!({"choices": []}));

    let v = stdout_json(
        pagevoice()
            .args(["summarize", "--remote", "true", "--text", LONG])
            .env("PAGEVOICE_OPENAI_COMPAT_BASE_URL", format!("http://{addr}"))
            .env("PAGEVOICE_OPENAI_COMPAT_API_KEY", "sk-stub")
            .env("PAGEVOICE_OFFLINE", "1"),
    );
    assert!(v["backend"].is_null());
    assert_eq!(v["ai_enabled"].as_bool(), Some(false));
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}
