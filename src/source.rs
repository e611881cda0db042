use crate::model::{Task, UserId};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("server responded with {0}")]
    Status(reqwest::StatusCode),
    #[error("reading {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("parsing json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("parsing yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("loader thread exited without a result")]
    Disconnected,
}

/// Where tasks come from. Called once per load, never retried.
pub trait TaskSource: Send + Sync {
    fn fetch_tasks(&self, user: UserId) -> Result<Vec<Task>, LoadError>;

    fn describe(&self) -> String;
}

pub struct HttpSource {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl HttpSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, LoadError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(HttpSource {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn todos_url(&self) -> String {
        format!("{}/todos", self.base_url)
    }
}

impl TaskSource for HttpSource {
    fn fetch_tasks(&self, user: UserId) -> Result<Vec<Task>, LoadError> {
        let response = self
            .client
            .get(self.todos_url())
            .query(&[("userId", user.get())])
            .send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(LoadError::Status(status));
        }
        Ok(response.json::<Vec<Task>>()?)
    }

    fn describe(&self) -> String {
        self.todos_url()
    }
}

/// Local JSON or YAML file holding an array of tasks, possibly for several users.
pub struct FixtureSource {
    path: PathBuf,
}

impl FixtureSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FixtureSource { path: path.into() }
    }

    fn parse(&self, data: &str) -> Result<Vec<Task>, LoadError> {
        if is_json(&self.path) {
            Ok(serde_json::from_str(data)?)
        } else {
            Ok(serde_yaml::from_str(data)?)
        }
    }
}

impl TaskSource for FixtureSource {
    fn fetch_tasks(&self, user: UserId) -> Result<Vec<Task>, LoadError> {
        let data = fs::read_to_string(&self.path).map_err(|source| LoadError::Read {
            path: self.path.clone(),
            source,
        })?;
        let mut tasks = self.parse(&data)?;
        tasks.retain(|t| t.user_id == user.get());
        Ok(tasks)
    }

    fn describe(&self) -> String {
        format!("{}", self.path.display())
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

/// Handle on a fetch running on a worker thread. Yields exactly one result.
pub struct PendingLoad {
    rx: Receiver<Result<Vec<Task>, LoadError>>,
}

impl PendingLoad {
    /// Non-blocking; `None` while the fetch is still in flight.
    pub fn poll(&self) -> Option<Result<Vec<Task>, LoadError>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(LoadError::Disconnected)),
        }
    }

    pub fn wait(self) -> Result<Vec<Task>, LoadError> {
        self.rx.recv().unwrap_or(Err(LoadError::Disconnected))
    }
}

pub fn spawn_load(source: Arc<dyn TaskSource>, user: UserId) -> PendingLoad {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        info!(user = %user, source = %source.describe(), "loading tasks");
        let result = source.fetch_tasks(user);
        match &result {
            Ok(tasks) => info!(count = tasks.len(), "tasks loaded"),
            Err(err) => warn!(error = %err, "task load failed"),
        }
        if tx.send(result).is_err() {
            warn!("load finished after its view was closed; result dropped");
        }
    });
    PendingLoad { rx }
}


#[cfg(test)]
mod tests {
    use super::stub::StubSource;
    use super::*;
    use crate::model::task;
    use std::io::Write;

    fn user(raw: u64) -> UserId {
        UserId::new(raw).unwrap()
    }

    #[test]
    fn fixture_json_keeps_only_requested_user_in_order() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"[
                {{"id":3,"userId":1,"title":"c","completed":false}},
                {{"id":1,"userId":2,"title":"other","completed":true}},
                {{"id":2,"userId":1,"title":"b","completed":true}}
            ]"#
        )
        .unwrap();
        let source = FixtureSource::new(file.path());
        let tasks = source.fetch_tasks(user(1)).unwrap();
        assert_eq!(tasks.iter().map(|t| t.id).collect::<Vec<_>>(), vec![3, 2]);
    }

    #[test]
    fn fixture_yaml_is_supported() {
        let mut file = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
        writeln!(
            file,
            "- id: 1\n  userId: 5\n  title: water plants\n  completed: false"
        )
        .unwrap();
        let tasks = FixtureSource::new(file.path()).fetch_tasks(user(5)).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "water plants");
    }

    #[test]
    fn missing_fixture_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = FixtureSource::new(dir.path().join("nope.json"));
        assert!(matches!(
            source.fetch_tasks(user(1)),
            Err(LoadError::Read { .. })
        ));
    }

    #[test]
    fn malformed_fixture_is_a_parse_error() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, "{{not json").unwrap();
        assert!(matches!(
            FixtureSource::new(file.path()).fetch_tasks(user(1)),
            Err(LoadError::Json(_))
        ));
    }

    #[test]
    fn http_source_builds_todos_url() {
        let source = HttpSource::new("https://example.test/", Duration::from_secs(1)).unwrap();
        assert_eq!(source.describe(), "https://example.test/todos");
    }

    /// Serves a single canned HTTP reply on a loopback port; yields the request line.
    fn serve_once(status: &'static str, body: &'static str) -> (String, thread::JoinHandle<String>) {
        use std::io::{BufRead, BufReader};
        use std::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            let mut header = String::new();
            while reader.read_line(&mut header).unwrap() > 0 && header != "\r\n" {
                header.clear();
            }
            let mut stream = stream;
            write!(
                stream,
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            )
            .unwrap();
            stream.flush().unwrap();
            request_line.trim_end().to_string()
        });
        (base, handle)
    }

    #[test]
    fn http_source_queries_user_and_keeps_server_order() {
        let (base, server) = serve_once(
            "200 OK",
            r#"[{"id":2,"userId":7,"title":"B","completed":true},{"id":1,"userId":7,"title":"A","completed":false}]"#,
        );
        let source = HttpSource::new(base, Duration::from_secs(5)).unwrap();
        let tasks = source.fetch_tasks(user(7)).unwrap();

        assert_eq!(server.join().unwrap(), "GET /todos?userId=7 HTTP/1.1");
        assert_eq!(tasks.iter().map(|t| t.id).collect::<Vec<_>>(), vec![2, 1]);
    }

    #[test]
    fn http_source_maps_error_status() {
        let (base, server) = serve_once("500 Internal Server Error", "oops");
        let source = HttpSource::new(base, Duration::from_secs(5)).unwrap();
        let result = source.fetch_tasks(user(7));
        server.join().unwrap();

        match result {
            Err(LoadError::Status(status)) => assert_eq!(status.as_u16(), 500),
            other => panic!("unexpected result: {:?}", other.map(|t| t.len())),
        }
    }

    #[test]
    fn spawned_load_delivers_one_result() {
        let stub = StubSource::ok(vec![task(1, "A", false)]);
        let pending = spawn_load(stub.clone(), user(1));
        let tasks = pending.wait().unwrap();
        assert_eq!(tasks, vec![task(1, "A", false)]);
        assert_eq!(stub.call_count(), 1);
    }

    #[test]
    fn spawned_load_reports_failure() {
        let pending = spawn_load(StubSource::failing(), user(1));
        assert!(matches!(pending.wait(), Err(LoadError::Status(_))));
    }
}
