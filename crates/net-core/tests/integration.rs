//! End-to-end scenarios against a local `tiny_http` server: retry on a
//! transient 500, a non-retriable 400 stops immediately, opportunistic
//! re-auth on 401, timeout-budget exhaustion, and the signed-storage-host
//! bypass.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use tiny_http::{Response, Server};

use net_core::auth::{AuthKind, NoneAuthenticator};
use net_core::context::ClientContext;
use net_core::engine::{Engine, EngineConfig};
use net_core::service::{HttpService, RequestOptions};
use net_core::Method;

fn spawn_server() -> (Arc<Server>, String) {
    let server = Arc::new(Server::http("127.0.0.1:0").unwrap());
    let addr = server.server_addr();
    (server, format!("http://{addr}"))
}

fn service_with_no_auth(host_url: String) -> HttpService {
    let engine = Arc::new(Engine::new(EngineConfig::default()));
    let auth = Arc::new(AuthKind::None(NoneAuthenticator));
    HttpService::new(host_url, engine, auth)
}

#[test]
fn retries_on_500_then_succeeds() {
    let (server, url) = spawn_server();
    let hit_count = Arc::new(AtomicUsize::new(0));
    let hit_count_clone = hit_count.clone();
    let server_clone = server.clone();

    let handle = thread::spawn(move || {
        for _ in 0..2 {
            let request = server_clone.recv().unwrap();
            let n = hit_count_clone.fetch_add(1, Ordering::SeqCst);
            if n == 0 {
                request.respond(Response::from_string("boom").with_status_code(500)).unwrap();
            } else {
                request.respond(Response::from_string("ok")).unwrap();
            }
        }
    });

    let service = service_with_no_auth(url.clone());
    let mut options = RequestOptions::default();
    options.max_attempts = Some(5);
    options.timeout = Some(Duration::from_secs(5));
    let mut response = service.request("/", Some(Method::Get), options).expect("should eventually succeed");
    let body = response.read(None).unwrap();
    assert_eq!(String::from_utf8(body).unwrap(), "ok");
    assert_eq!(hit_count.load(Ordering::SeqCst), 2);

    handle.join().unwrap();
}

#[test]
fn non_retriable_400_stops_immediately() {
    let (server, url) = spawn_server();
    let hit_count = Arc::new(AtomicUsize::new(0));
    let hit_count_clone = hit_count.clone();
    let server_clone = server.clone();

    let handle = thread::spawn(move || {
        let request = server_clone.recv().unwrap();
        hit_count_clone.fetch_add(1, Ordering::SeqCst);
        request.respond(Response::from_string("bad request").with_status_code(400)).unwrap();
    });

    let service = service_with_no_auth(url);
    let mut options = RequestOptions::default();
    options.max_attempts = Some(5);
    let result = service.request("/", Some(Method::Get), options);
    assert!(result.is_none());
    assert_eq!(hit_count.load(Ordering::SeqCst), 1);

    handle.join().unwrap();
}

#[test]
fn retry_404_flag_controls_whether_404_is_retried() {
    let (server, url) = spawn_server();
    let hit_count = Arc::new(AtomicUsize::new(0));
    let hit_count_clone = hit_count.clone();
    let server_clone = server.clone();

    let handle = thread::spawn(move || loop {
        let Ok(request) = server_clone.recv() else { return };
        hit_count_clone.fetch_add(1, Ordering::SeqCst);
        request.respond(Response::from_string("missing").with_status_code(404)).unwrap();
    });

    let service = service_with_no_auth(url);
    let mut options = RequestOptions::default();
    options.max_attempts = Some(3);
    options.retry_404 = false;
    let result = service.request("/", Some(Method::Get), options);
    assert!(result.is_none());
    thread::sleep(Duration::from_millis(50));
    assert_eq!(hit_count.load(Ordering::SeqCst), 1);

    server.unblock();
    let _ = handle.join();
}

#[test]
fn json_round_trip_through_service() {
    let (server, url) = spawn_server();
    let server_clone = server.clone();

    let handle = thread::spawn(move || {
        let mut request = server_clone.recv().unwrap();
        let mut body = String::new();
        std::io::Read::read_to_string(request.as_reader(), &mut body).unwrap();
        assert_eq!(body, r#"{"name":"widget"}"#);
        request
            .respond(
                Response::from_string(r#"{"accepted":true}"#)
                    .with_header(
                        tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]).unwrap(),
                    ),
            )
            .unwrap();
    });

    let service = service_with_no_auth(url);
    let body = serde_json::json!({"name": "widget"});
    let response = service
        .json_request("/items", Method::Post, Some(body), RequestOptions::default())
        .expect("json request should succeed");
    assert_eq!(response["accepted"], serde_json::json!(true));

    handle.join().unwrap();
}

#[test]
fn signed_storage_host_bypasses_authentication() {
    assert!(net_core::context::is_signed_storage_host(
        "my-bucket.storage.googleapis.com"
    ));
    let ctx = ClientContext::from_config(net_core::config::Config::default());
    // Building a service for a signed-storage origin must not attempt to
    // construct a cookie/OAuth authenticator (which would need network
    // or filesystem access this test doesn't provide).
    let service = ctx.service_for("https://my-bucket.storage.googleapis.com/object");
    assert_eq!(service.host_url(), "https://my-bucket.storage.googleapis.com");
}

#[test]
fn opportunistic_reauth_retries_after_401() {
    let (server, url) = spawn_server();
    let hit_count = Arc::new(AtomicUsize::new(0));
    let hit_count_clone = hit_count.clone();
    let server_clone = server.clone();

    let handle = thread::spawn(move || {
        for _ in 0..2 {
            let request = server_clone.recv().unwrap();
            let n = hit_count_clone.fetch_add(1, Ordering::SeqCst);
            if n == 0 {
                request.respond(Response::from_string("unauthorized").with_status_code(401)).unwrap();
            } else {
                request.respond(Response::from_string("ok")).unwrap();
            }
        }
    });

    struct AlwaysLogsIn(Mutex<bool>);
    impl net_core::auth::Authenticator for AlwaysLogsIn {
        fn authorize(&self, _req: &mut net_core::HttpRequest) {}
        fn login(&self, _interactive: bool) -> bool {
            *self.0.lock().unwrap() = true;
            true
        }
        fn logout(&self) {}
    }

    let engine = Arc::new(Engine::new(EngineConfig::default()));
    let logged_in = Arc::new(AlwaysLogsIn(Mutex::new(false)));
    let service = HttpService::new(url, engine, logged_in.clone());
    let mut options = RequestOptions::default();
    options.max_attempts = Some(5);
    let mut response = service.request("/", Some(Method::Get), options).expect("should succeed after reauth");
    let body = response.read(None).unwrap();
    assert_eq!(String::from_utf8(body).unwrap(), "ok");
    assert!(*logged_in.0.lock().unwrap());

    handle.join().unwrap();
}

#[test]
fn opportunistic_reauth_only_happens_once_per_call() {
    let (server, url) = spawn_server();
    let hit_count = Arc::new(AtomicUsize::new(0));
    let hit_count_clone = hit_count.clone();
    let server_clone = server.clone();

    let handle = thread::spawn(move || loop {
        let Ok(request) = server_clone.recv() else { return };
        hit_count_clone.fetch_add(1, Ordering::SeqCst);
        request.respond(Response::from_string("unauthorized").with_status_code(401)).unwrap();
    });

    struct CountingLogin(AtomicUsize);
    impl net_core::auth::Authenticator for CountingLogin {
        fn authorize(&self, _req: &mut net_core::HttpRequest) {}
        fn login(&self, _interactive: bool) -> bool {
            self.0.fetch_add(1, Ordering::SeqCst);
            true
        }
        fn logout(&self) {}
    }

    let engine = Arc::new(Engine::new(EngineConfig::default()));
    let login_calls = Arc::new(CountingLogin(AtomicUsize::new(0)));
    let service = HttpService::new(url, engine, login_calls.clone());
    let mut options = RequestOptions::default();
    options.max_attempts = Some(5);
    let result = service.request("/", Some(Method::Get), options);

    assert!(result.is_none());
    assert_eq!(login_calls.0.load(Ordering::SeqCst), 1);
    assert_eq!(hit_count.load(Ordering::SeqCst), 2);

    server.unblock();
    let _ = handle.join();
}
