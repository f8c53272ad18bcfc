use crate::WatchError;
use std::io::Read;
use std::time::Duration;

/// Retrieves the raw bytes behind a watched URL.
///
/// Implementations must bound how long a single call can block; the pool's
/// shutdown latency is bounded by the slowest in-flight fetch.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, WatchError>;
}

/// Plain HTTP(S) GET fetcher with a global per-request timeout.
pub struct HttpFetcher {
    agent: ureq::Agent,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
        }
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, WatchError> {
        tracing::debug!("GET {url}");
        let resp = match self
            .agent
            .get(url)
            .header("User-Agent", concat!("daybreak/", env!("CARGO_PKG_VERSION")))
            .call()
        {
            Ok(r) => r,
            Err(ureq::Error::StatusCode(code)) => {
                return Err(WatchError::Status {
                    url: url.to_owned(),
                    code,
                });
            }
            Err(e) => return Err(WatchError::Http(e.to_string())),
        };

        let code = resp.status().as_u16();
        if code >= 400 {
            return Err(WatchError::Status {
                url: url.to_owned(),
                code,
            });
        }

        let mut reader = resp.into_body().into_reader();
        let mut body = Vec::new();
        reader
            .read_to_end(&mut body)
            .map_err(|e| WatchError::Http(e.to_string()))?;
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::sync::{Arc, Mutex};

    /// Serves fixed bodies per path; unknown paths answer 404.
    struct MockServer {
        addr: String,
        routes: Arc<Mutex<HashMap<String, Vec<u8>>>>,
        _handle: std::thread::JoinHandle<()>,
    }

    impl MockServer {
        fn start() -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            let addr = format!("http://{}", listener.local_addr().unwrap());
            let routes: Arc<Mutex<HashMap<String, Vec<u8>>>> =
                Arc::new(Mutex::new(HashMap::new()));

            let routes_clone = Arc::clone(&routes);
            let handle = std::thread::spawn(move || {
                for stream in listener.incoming() {
                    let Ok(mut stream) = stream else { break };
                    let mut reader = BufReader::new(stream.try_clone().unwrap());
                    let mut request_line = String::new();
                    if reader.read_line(&mut request_line).is_err() {
                        continue;
                    }
                    loop {
                        let mut line = String::new();
                        if reader.read_line(&mut line).is_err() || line.trim().is_empty() {
                            break;
                        }
                    }
                    let path = request_line
                        .split_whitespace()
                        .nth(1)
                        .unwrap_or("/")
                        .to_owned();

                    let body = routes_clone.lock().unwrap().get(&path).cloned();
                    match body {
                        Some(body) => {
                            let head = format!(
                                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                                body.len()
                            );
                            let _ = stream.write_all(head.as_bytes());
                            let _ = stream.write_all(&body);
                        }
                        None => {
                            let _ = stream.write_all(
                                b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                            );
                        }
                    }
                    let _ = stream.flush();
                }
            });

            Self {
                addr,
                routes,
                _handle: handle,
            }
        }

        fn serve(&self, path: &str, body: &[u8]) {
            self.routes
                .lock()
                .unwrap()
                .insert(path.to_owned(), body.to_vec());
        }
    }

    #[test]
    fn fetches_body() {
        let server = MockServer::start();
        server.serve("/manifest.toml", b"name = \"remote\"\n");

        let fetcher = HttpFetcher::new(Duration::from_secs(5));
        let body = fetcher
            .fetch(&format!("{}/manifest.toml", server.addr))
            .unwrap();
        assert_eq!(body, b"name = \"remote\"\n");
    }

    #[test]
    fn missing_path_is_status_error() {
        let server = MockServer::start();
        let fetcher = HttpFetcher::new(Duration::from_secs(5));
        let err = fetcher
            .fetch(&format!("{}/missing.toml", server.addr))
            .unwrap_err();
        assert!(matches!(err, WatchError::Status { code: 404, .. }));
    }

    #[test]
    fn unreachable_host_is_transport_error() {
        // Bind and immediately drop to get a port nothing listens on.
        let port = {
            let l = TcpListener::bind("127.0.0.1:0").unwrap();
            l.local_addr().unwrap().port()
        };
        let fetcher = HttpFetcher::new(Duration::from_secs(2));
        let err = fetcher
            .fetch(&format!("http://127.0.0.1:{port}/m.toml"))
            .unwrap_err();
        assert!(matches!(err, WatchError::Http(_)));
    }
}
