use std::net::SocketAddr;
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use axum::extract::{ConnectInfo, State};
use axum::http::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

use jrpc_core::{CallArgs, ClientConfig, RpcClient, RpcError};

static TRACING_INIT: Once = Once::new();

fn init_tracing() {
    TRACING_INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("jrpc_core=debug")),
            )
            .with_target(true)
            .with_test_writer()
            .try_init();
    });
}

// ==============================================================================
// Stub JSON-RPC server
// ==============================================================================

#[derive(Debug, Clone)]
struct Seen {
    peer: SocketAddr,
    content_type: Option<String>,
    cookie: Option<String>,
    body: Value,
}

#[derive(Clone, Default)]
struct StubState {
    seen: Arc<Mutex<Vec<Seen>>>,
}

impl StubState {
    fn seen(&self) -> Vec<Seen> {
        self.seen.lock().expect("stub lock poisoned").clone()
    }
}

async fn handle(
    State(state): State<StubState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let envelope: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
    let header_str = |name| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
    };
    state.seen.lock().expect("stub lock poisoned").push(Seen {
        peer,
        content_type: header_str(CONTENT_TYPE),
        cookie: header_str(COOKIE),
        body: envelope.clone(),
    });

    let id = envelope["id"].clone();
    let method = envelope["method"].as_str().unwrap_or_default().to_owned();
    let session = [(SET_COOKIE, "session=abc123; Path=/")];
    match method.as_str() {
        "broken" => (StatusCode::OK, session, "<html>oops</html>").into_response(),
        "forbidden" => (StatusCode::FORBIDDEN, "forbidden").into_response(),
        "slow" => {
            tokio::time::sleep(Duration::from_secs(2)).await;
            Json(json!({"id": id, "result": "late", "error": null})).into_response()
        }
        "fail" => (
            session,
            Json(json!({
                "id": id,
                "result": null,
                "error": {"code": -32601, "message": "Method not found"}
            })),
        )
            .into_response(),
        _ => (
            session,
            Json(json!({
                "id": id,
                "result": {"method": method, "params": envelope["params"]},
                "error": null
            })),
        )
            .into_response(),
    }
}

async fn spawn_stub() -> (SocketAddr, StubState) {
    let state = StubState::default();
    let app = Router::new()
        .route("/", post(handle))
        .route("/json_rpc", post(handle))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("stub listener must bind");
    let addr = listener.local_addr().expect("stub listener has an address");
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .expect("stub server must run");
    });
    (addr, state)
}

fn client_for(addr: SocketAddr) -> RpcClient {
    RpcClient::new(ClientConfig::new("127.0.0.1", addr.port())).expect("client must build")
}

// ==============================================================================
// Tests
// ==============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn posts_envelopes_as_json_and_returns_results() {
    init_tracing();
    let (addr, stub) = spawn_stub().await;
    let rpc = client_for(addr);

    let listed = rpc
        .method("list_all")
        .arg("first")
        .arg("second")
        .send()
        .await
        .expect("list_all must succeed");
    let found = rpc
        .method("find")
        .kwarg("name", "john")
        .send()
        .await
        .expect("find must succeed");

    assert_eq!(
        listed,
        json!({"method": "list_all", "params": ["first", "second"]})
    );
    assert_eq!(found, json!({"method": "find", "params": {"name": "john"}}));

    let seen = stub.seen();
    assert_eq!(seen.len(), 2);
    assert_eq!(
        seen[0].body,
        json!({"id": 1, "jsonrpc": "2.0", "method": "list_all", "params": ["first", "second"]})
    );
    assert_eq!(
        seen[1].body,
        json!({"id": 2, "jsonrpc": "2.0", "method": "find", "params": {"name": "john"}})
    );
    assert!(seen
        .iter()
        .all(|s| s.content_type.as_deref() == Some("application/json")));
}

#[tokio::test(flavor = "multi_thread")]
async fn sequential_calls_reuse_connection_and_cookies() {
    init_tracing();
    let (addr, stub) = spawn_stub().await;
    let rpc = client_for(addr);

    for method in ["one", "two", "three"] {
        rpc.call(method, CallArgs::new())
            .await
            .expect("call must succeed");
    }

    let seen = stub.seen();
    assert_eq!(seen.len(), 3);
    assert!(
        seen.iter().all(|s| s.peer == seen[0].peer),
        "all calls must arrive over one keep-alive connection: {seen:?}"
    );
    assert_eq!(seen[0].cookie, None);
    assert_eq!(seen[1].cookie.as_deref(), Some("session=abc123"));
    assert_eq!(seen[2].cookie.as_deref(), Some("session=abc123"));
}

#[tokio::test(flavor = "multi_thread")]
async fn separate_clients_do_not_share_a_session() {
    init_tracing();
    let (addr, stub) = spawn_stub().await;

    client_for(addr)
        .call("first", CallArgs::new())
        .await
        .expect("call must succeed");
    client_for(addr)
        .call("second", CallArgs::new())
        .await
        .expect("call must succeed");

    let seen = stub.seen();
    assert_eq!(seen[0].body["id"], json!(1));
    assert_eq!(seen[1].body["id"], json!(1));
    assert_eq!(seen[1].cookie, None);
}

#[tokio::test(flavor = "multi_thread")]
async fn endpoint_path_is_honoured() {
    init_tracing();
    let (addr, stub) = spawn_stub().await;
    let rpc = RpcClient::new(ClientConfig::new("127.0.0.1", addr.port()).with_path("/json_rpc"))
        .expect("client must build");

    let result = rpc
        .call("get_height", CallArgs::new())
        .await
        .expect("call must succeed");
    assert_eq!(result["method"], "get_height");
    assert_eq!(stub.seen().len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn failures_are_typed_and_ids_keep_advancing() {
    init_tracing();
    let (addr, stub) = spawn_stub().await;
    let rpc = client_for(addr);

    let server = rpc
        .call("fail", CallArgs::new())
        .await
        .expect_err("fail must error");
    assert_eq!(
        server.as_server_error().map(|e| &e.payload),
        Some(&json!({"code": -32601, "message": "Method not found"}))
    );

    let parse = rpc
        .call("broken", CallArgs::new())
        .await
        .expect_err("broken must error");
    assert!(matches!(parse, RpcError::Parse(_)), "got {parse:?}");

    let http = rpc
        .call("forbidden", CallArgs::new())
        .await
        .expect_err("forbidden must error");
    assert!(
        matches!(http, RpcError::Http { status, ref body } if status == 403 && body == "forbidden"),
        "got {http:?}"
    );

    rpc.call("ok", CallArgs::new())
        .await
        .expect("ok must succeed");

    let ids: Vec<Value> = stub.seen().into_iter().map(|s| s.body["id"].clone()).collect();
    assert_eq!(ids, vec![json!(1), json!(2), json!(3), json!(4)]);
}

#[tokio::test(flavor = "multi_thread")]
async fn timeout_surfaces_as_transport_error() {
    init_tracing();
    let (addr, _stub) = spawn_stub().await;
    let rpc = RpcClient::new(
        ClientConfig::new("127.0.0.1", addr.port()).with_timeout(Duration::from_millis(200)),
    )
    .expect("client must build");

    let err = rpc
        .call("slow", CallArgs::new())
        .await
        .expect_err("slow must time out");
    assert!(
        matches!(&err, RpcError::Transport(e) if e.is_timeout()),
        "got {err:?}"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn refused_connection_is_transport_error() {
    init_tracing();
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        listener.local_addr().expect("addr").port()
    };
    let rpc = RpcClient::new(ClientConfig::new("127.0.0.1", port)).expect("client must build");

    let err = rpc
        .call("getinfo", CallArgs::new())
        .await
        .expect_err("nothing is listening");
    assert!(matches!(err, RpcError::Transport(_)), "got {err:?}");
    assert!(!err.is_server_error());
}
