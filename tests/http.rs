use chrono::{Duration, NaiveDate, Utc};
use once_cell::sync::Lazy;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::net::TcpListener;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tokio::time::sleep;

#[derive(Debug, Deserialize)]
struct Habit {
    id: String,
    title: String,
    current_streak: u32,
    longest_streak: u32,
    chain_color: String,
}

#[derive(Debug, Deserialize)]
struct StreakReport {
    current_streak: u32,
    longest_streak: u32,
    tier: String,
    excluded_malformed: u32,
    excluded_future: u32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    habit: Habit,
    date: String,
    completed: bool,
    changed: bool,
    streaks: StreakReport,
}

#[derive(Debug, Deserialize)]
struct CompletionsResponse {
    dates: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ChainProgress {
    total_days: u32,
    completed_days: u32,
}

#[derive(Debug, Deserialize)]
struct ChainResponse {
    tier: String,
    runs: Vec<serde_json::Value>,
    progress: ChainProgress,
}

struct TestServer {
    base_url: String,
    child: Child,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

static TEST_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));
static SERVER: Lazy<Mutex<Option<Arc<TestServer>>>> = Lazy::new(|| Mutex::new(None));

#[cfg(unix)]
mod cleanup {
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Once;

    static REGISTER: Once = Once::new();
    static PID: AtomicI32 = AtomicI32::new(0);

    pub fn register(pid: u32) {
        REGISTER.call_once(|| {
            PID.store(pid as i32, Ordering::SeqCst);
            unsafe {
                libc::atexit(on_exit);
            }
        });
    }

    extern "C" fn on_exit() {
        let pid = PID.load(Ordering::SeqCst);
        if pid > 0 {
            unsafe {
                libc::kill(pid, libc::SIGTERM);
            }
        }
    }
}

fn pick_free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind random port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

fn unique_data_path() -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!("habit_chain_http_{}_{}.json", std::process::id(), nanos));
    path.to_string_lossy().to_string()
}

async fn wait_until_ready(base_url: &str) {
    let client = Client::new();
    let deadline = Instant::now() + std::time::Duration::from_secs(3);
    loop {
        if let Ok(resp) = client.get(format!("{base_url}/health")).send().await {
            if resp.status().is_success() {
                return;
            }
        }
        if Instant::now() > deadline {
            panic!("server did not become ready");
        }
        sleep(std::time::Duration::from_millis(100)).await;
    }
}

async fn spawn_server() -> TestServer {
    let port = pick_free_port();
    let data_path = unique_data_path();
    let child = Command::new(env!("CARGO_BIN_EXE_habit_chain"))
        .env("PORT", port.to_string())
        .env("APP_DATA_PATH", data_path)
        .env("RUST_LOG", "info")
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .expect("failed to spawn server");

    #[cfg(unix)]
    cleanup::register(child.id());

    let base_url = format!("http://127.0.0.1:{port}");
    wait_until_ready(&base_url).await;

    TestServer { base_url, child }
}

async fn shared_server() -> Arc<TestServer> {
    let mut guard = SERVER.lock().await;
    if let Some(server) = guard.as_ref() {
        return Arc::clone(server);
    }
    let server = Arc::new(spawn_server().await);
    *guard = Some(Arc::clone(&server));
    server
}

async fn create_habit(client: &Client, base_url: &str, title: &str) -> Habit {
    let response = client
        .post(format!("{base_url}/api/habits"))
        .json(&serde_json::json!({ "title": title, "description": "integration" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    response.json().await.unwrap()
}

fn day(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

#[tokio::test]
async fn http_streak_endpoint_matches_scenarios() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let report: StreakReport = client
        .post(format!("{}/api/streaks", server.base_url))
        .json(&serde_json::json!({
            "dates": ["2026-01-07", "2026-01-01", "2026-01-02", "2026-01-05", "2026-01-06", "2026-01-06", "junk"],
            "as_of": "2026-01-07"
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(report.current_streak, 3);
    assert_eq!(report.longest_streak, 3);
    assert_eq!(report.tier, "bronze");
    assert_eq!(report.excluded_malformed, 1);
    assert_eq!(report.excluded_future, 0);

    let broken: StreakReport = client
        .post(format!("{}/api/streaks", server.base_url))
        .json(&serde_json::json!({
            "dates": ["2026-01-01", "2026-01-02", "2026-01-03"],
            "as_of": "2026-01-10"
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(broken.current_streak, 0);
    assert_eq!(broken.longest_streak, 3);
    assert_eq!(broken.tier, "none");
}

#[tokio::test]
async fn http_toggle_updates_habit_streaks() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    let habit = create_habit(&client, &server.base_url, "Read").await;
    assert_eq!(habit.title, "Read");
    assert_eq!(habit.chain_color, "none");

    let today = Utc::now().date_naive();
    let yesterday = today - Duration::days(1);
    let response = client
        .put(format!(
            "{}/api/habits/{}/completions/{}",
            server.base_url,
            habit.id,
            day(yesterday)
        ))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let toggled: CompletionResponse = client
        .post(format!("{}/api/habits/{}/toggle", server.base_url, habit.id))
        .json(&serde_json::json!({ "date": day(today), "expected": false }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    // Yesterday and today form a run that stays current whether the server's
    // clock reads `today` or has just rolled over to the next UTC day.
    assert!(toggled.completed);
    assert!(toggled.changed);
    assert_eq!(toggled.date, day(today));
    assert_eq!(toggled.streaks.current_streak, 2);
    assert_eq!(toggled.habit.current_streak, 2);
    assert_eq!(toggled.habit.longest_streak, 2);
    assert_eq!(toggled.habit.chain_color, "bronze");

    let completions: CompletionsResponse = client
        .get(format!("{}/api/habits/{}/completions", server.base_url, habit.id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(completions.dates, vec![day(yesterday), day(today)]);

    let chain: ChainResponse = client
        .get(format!(
            "{}/api/habits/{}/chain?start={}&end={}",
            server.base_url,
            habit.id,
            day(today - Duration::days(6)),
            day(today)
        ))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(chain.tier, "bronze");
    assert_eq!(chain.runs.len(), 1);
    assert_eq!(chain.progress.total_days, 7);
    assert_eq!(chain.progress.completed_days, 2);

    let untoggled: CompletionResponse = client
        .post(format!("{}/api/habits/{}/toggle", server.base_url, habit.id))
        .json(&serde_json::json!({ "date": day(today) }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(!untoggled.completed);
    // Only yesterday remains: alive while the server is still on `today`,
    // broken once its clock has passed UTC midnight.
    if Utc::now().date_naive() == today {
        assert_eq!(untoggled.streaks.current_streak, 1);
    } else {
        assert!(untoggled.streaks.current_streak <= 1);
    }
}

#[tokio::test]
async fn http_stale_toggle_is_rejected() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    let habit = create_habit(&client, &server.base_url, "Stretch").await;

    let response = client
        .post(format!("{}/api/habits/{}/toggle", server.base_url, habit.id))
        .json(&serde_json::json!({ "date": "2026-01-02", "expected": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let completions: CompletionsResponse = client
        .get(format!("{}/api/habits/{}/completions", server.base_url, habit.id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(completions.dates.is_empty());
}

#[tokio::test]
async fn http_rejects_bad_input() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let missing = client
        .get(format!("{}/api/habits/does-not-exist", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    let blank = client
        .post(format!("{}/api/habits", server.base_url))
        .json(&serde_json::json!({ "title": "   " }))
        .send()
        .await
        .unwrap();
    assert_eq!(blank.status(), StatusCode::BAD_REQUEST);

    let habit = create_habit(&client, &server.base_url, "Walk").await;
    let bad_date = client
        .put(format!(
            "{}/api/habits/{}/completions/yesterday",
            server.base_url, habit.id
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(bad_date.status(), StatusCode::BAD_REQUEST);

    let deleted = client
        .delete(format!("{}/api/habits/{}", server.base_url, habit.id))
        .send()
        .await
        .unwrap();
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    let gone = client
        .get(format!("{}/api/habits/{}/completions", server.base_url, habit.id))
        .send()
        .await
        .unwrap();
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);
}
