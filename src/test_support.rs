//! One-shot HTTP servers standing in for Google endpoints in tests.

use std::sync::Arc;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

fn json_reply(status: StatusCode, body: String) -> Response<Full<Bytes>> {
  Response::builder()
    .status(status)
    .header("content-type", "application/json")
    .header("connection", "close")
    .body(Full::new(Bytes::from(body)))
    .unwrap()
}

/// Serves a single request with a fixed JSON reply. Returns `http://addr/`.
pub(crate) async fn serve_json_once(status: StatusCode, body: &'static str) -> (String, JoinHandle<()>) {
  let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();

  let task = tokio::spawn(async move {
    let (stream, _) = listener.accept().await.unwrap();
    let io = TokioIo::new(stream);
    http1::Builder::new()
      .serve_connection(
        io,
        service_fn(move |_req: Request<Incoming>| async move {
          Ok::<_, hyper::Error>(json_reply(status, body.to_string()))
        }),
      )
      .await
      .unwrap();
  });

  (format!("http://{}/", addr), task)
}

/// Serves requests until aborted, answering each with `route(path_and_query, authorization)`.
pub(crate) async fn serve_routes<F>(route: F) -> (String, JoinHandle<()>)
where
  F: Fn(&str, &str) -> (StatusCode, String) + Send + Sync + 'static,
{
  let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  let route = Arc::new(route);

  let task = tokio::spawn(async move {
    loop {
      let Ok((stream, _)) = listener.accept().await else {
        return;
      };
      let route = route.clone();
      tokio::spawn(async move {
        let io = TokioIo::new(stream);
        let _ = http1::Builder::new()
          .serve_connection(
            io,
            service_fn(move |req: Request<Incoming>| {
              let route = route.clone();
              async move {
                let path = req
                  .uri()
                  .path_and_query()
                  .map(|p| p.as_str().to_string())
                  .unwrap_or_default();
                let auth = req
                  .headers()
                  .get(hyper::header::AUTHORIZATION)
                  .and_then(|v| v.to_str().ok())
                  .unwrap_or("")
                  .to_string();
                let (status, body) = route(&path, &auth);
                Ok::<_, hyper::Error>(json_reply(status, body))
              }
            }),
          )
          .await;
      });
    }
  });

  (format!("http://{}/", addr), task)
}
