use packhorse::{ConnectivityProbe, LocalStore, Project, RemoteStore, Repository, SyncConfig, User};
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[allow(dead_code)]
pub struct TestNode {
    pub local: Arc<LocalStore>,
    pub remote: Arc<RemoteStore>,
    pub probe: Arc<ConnectivityProbe>,
    pub repo: Repository,
    pub config: SyncConfig,
}

/// Node wired against a wiremock remote. With no mocks mounted the TCP dial
/// succeeds but `GET /health` 404s, so the node reads as offline until the
/// test mounts a health mock; that models connectivity coming and going
/// without rebuilding anything.
pub fn node_against(server: &MockServer) -> TestNode {
    build_node(server.uri(), server.address().to_string())
}

/// Node whose remote and probe target point at a dead port, so the network
/// check itself fails fast.
#[allow(dead_code)]
pub fn offline_node() -> TestNode {
    build_node("http://127.0.0.1:9".to_string(), "127.0.0.1:9".to_string())
}

/// Install a tracing subscriber once per test binary; `RUST_LOG` controls
/// what shows up on failure output.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn build_node(remote_url: String, probe_target: String) -> TestNode {
    init_tracing();
    let config = SyncConfig {
        remote_url,
        probe_target,
        probe_timeout_secs: 1,
        ..SyncConfig::default()
    };

    let local = Arc::new(LocalStore::open_in_memory().unwrap());
    let remote = Arc::new(RemoteStore::new(&config.remote_url, config.probe_timeout()));
    let probe = Arc::new(ConnectivityProbe::new(
        &config.probe_target,
        config.probe_timeout(),
        Arc::clone(&remote),
    ));
    let repo = Repository::new(
        Arc::clone(&local),
        Arc::clone(&remote),
        Arc::clone(&probe),
        &config,
    );

    TestNode {
        local,
        remote,
        probe,
        repo,
        config,
    }
}

pub async fn mount_health(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
}

pub fn seed_user(local: &LocalStore) -> i64 {
    local
        .insert_user(&User {
            id: 0,
            username: "ana".to_string(),
            email: "ana@example.com".to_string(),
        })
        .unwrap()
        .id
}

pub fn sample_project(name: &str, user_id: i64) -> Project {
    Project {
        id: 0,
        name: name.to_string(),
        category: "topography".to_string(),
        description: "ridge line".to_string(),
        img: None,
        lat: 16.75,
        lng: -93.12,
        recorded_on: "2025-03-14".parse().unwrap(),
        user_id,
    }
}

/// Requests the remote saw, as (method, path) pairs in arrival order.
#[allow(dead_code)]
pub async fn requests_seen(server: &MockServer) -> Vec<(String, String)> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|r| (r.method.to_string(), r.url.path().to_string()))
        .collect()
}
