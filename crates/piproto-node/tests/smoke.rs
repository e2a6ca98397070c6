//! End-to-end smoke test for piproto-node.
//!
//! Starts a real node process, drives it over HTTP and asserts that state
//! changes are reflected, including across a restart of the sled store.
//!
//! Run with:
//!   cargo test -p piproto-node --test smoke

use std::net::TcpListener;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use serde_json::{json, Value};

// ── Node lifecycle ────────────────────────────────────────────────────────────

struct NodeGuard {
    child: Child,
    data_dir: Option<PathBuf>,
}

impl NodeGuard {
    fn stop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

impl Drop for NodeGuard {
    fn drop(&mut self) {
        self.stop();
        if let Some(dir) = &self.data_dir {
            let _ = std::fs::remove_dir_all(dir);
        }
    }
}

/// Find a free TCP port on loopback.
fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

fn spawn_node(port: u16, store_args: &[&str]) -> Child {
    Command::new(env!("CARGO_BIN_EXE_piproto-node"))
        .args(["--listen", &format!("127.0.0.1:{port}")])
        .args(store_args)
        .env("RUST_LOG", "warn")
        .env_remove("PORT")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn piproto-node")
}

// ── HTTP helpers ──────────────────────────────────────────────────────────────

/// Poll `/health` until the server responds or the timeout elapses.
async fn wait_for_http(client: &reqwest::Client, base: &str, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if let Ok(resp) = client.get(format!("{base}/health")).send().await {
            if resp.status().is_success() {
                return true;
            }
        }
        tokio::time::sleep(Duration::from_millis(250)).await;
    }
    false
}

async fn post(client: &reqwest::Client, base: &str, path: &str, body: Value) -> (u16, Value) {
    let resp = client
        .post(format!("{base}{path}"))
        .json(&body)
        .send()
        .await
        .unwrap_or_else(|e| panic!("POST {path} failed: {e}"));
    let status = resp.status().as_u16();
    (status, resp.json().await.expect("parse JSON"))
}

async fn get(client: &reqwest::Client, base: &str, path: &str) -> (u16, Value) {
    let resp = client
        .get(format!("{base}{path}"))
        .send()
        .await
        .unwrap_or_else(|e| panic!("GET {path} failed: {e}"));
    let status = resp.status().as_u16();
    (status, resp.json().await.expect("parse JSON"))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn memory_node_serves_full_flow() {
    let port = free_port();
    let _node = NodeGuard { child: spawn_node(port, &["--store", "memory"]), data_dir: None };
    let base = format!("http://127.0.0.1:{port}");
    let client = reqwest::Client::new();
    assert!(wait_for_http(&client, &base, Duration::from_secs(20)).await, "node did not start");

    let (status, news) = get(&client, &base, "/news").await;
    assert_eq!(status, 200);
    assert_eq!(news.as_array().unwrap().len(), 5);

    post(&client, &base, "/mining/start", json!({"userId": "U0"})).await;
    let (status, body) = post(&client, &base, "/claim", json!({"userId": "U0", "amount": 10})).await;
    assert_eq!(status, 200);
    assert_eq!(body["coins"], 10.0);

    let (status, body) =
        post(&client, &base, "/convert/coins-to-pi", json!({"userId": "U0", "coins": 10, "pi": 2})).await;
    assert_eq!(status, 200);
    assert_eq!(body["pi"], 2.0);

    let (status, _) =
        post(&client, &base, "/referral/register", json!({"inviterCode": "U0", "userId": "U1"})).await;
    assert_eq!(status, 200);
    let (status, _) = post(&client, &base, "/referral/activate", json!({"userId": "U1"})).await;
    assert_eq!(status, 200);
    let (_, stats) = post(&client, &base, "/referral/stats", json!({"userId": "U0"})).await;
    assert_eq!(stats["invited"], 1);
    assert_eq!(stats["active"], 1);

    let (status, body) = get(&client, &base, "/user/nobody").await;
    assert_eq!(status, 404);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn sled_store_survives_restart() {
    let data_dir = std::env::temp_dir().join(format!("piproto_smoke_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&data_dir);
    let dir_arg = data_dir.to_string_lossy().into_owned();
    let client = reqwest::Client::new();

    let port = free_port();
    let mut node = NodeGuard {
        child: spawn_node(port, &["--store", "sled", "--data-dir", &dir_arg]),
        data_dir: Some(data_dir.clone()),
    };
    let base = format!("http://127.0.0.1:{port}");
    assert!(wait_for_http(&client, &base, Duration::from_secs(20)).await, "node did not start");

    let (status, _) = post(&client, &base, "/claim", json!({"userId": "U1", "amount": 7})).await;
    assert_eq!(status, 200);
    let (status, _) =
        post(&client, &base, "/tasks/claim", json!({"userId": "U1", "taskId": "t1", "reward": 3})).await;
    assert_eq!(status, 200);
    // sled flushes in the background every 500 ms; the node is killed, not shut down.
    tokio::time::sleep(Duration::from_secs(2)).await;
    node.stop();

    let port = free_port();
    node.child = spawn_node(port, &["--store", "sled", "--data-dir", &dir_arg]);
    let base = format!("http://127.0.0.1:{port}");
    assert!(wait_for_http(&client, &base, Duration::from_secs(20)).await, "node did not restart");

    let (status, body) = get(&client, &base, "/user/U1").await;
    assert_eq!(status, 200);
    assert_eq!(body["user"]["coins"], 10.0);
    assert_eq!(body["user"]["completedTasks"], json!(["t1"]));

    // Already paid before the restart.
    let (_, body) =
        post(&client, &base, "/tasks/claim", json!({"userId": "U1", "taskId": "t1", "reward": 3})).await;
    assert_eq!(body["coins"], 10.0);
}

#[test]
fn unopenable_store_is_fatal() {
    let blocker = std::env::temp_dir().join(format!("piproto_smoke_blocker_{}", std::process::id()));
    std::fs::write(&blocker, b"not a directory").unwrap();

    let status = Command::new(env!("CARGO_BIN_EXE_piproto-node"))
        .args(["--listen", &format!("127.0.0.1:{}", free_port())])
        .args(["--store", "sled", "--data-dir"])
        .arg(blocker.join("data"))
        .env("RUST_LOG", "off")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .expect("run piproto-node");
    let _ = std::fs::remove_file(&blocker);
    assert!(!status.success());
}
