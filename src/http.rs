use hyper::{HeaderMap, StatusCode, Uri};
use vercel_runtime::{Error, Response, ResponseBody};

pub const OAUTH_STATE_COOKIE: &str = "yt_oauth_state";
const OAUTH_STATE_MAX_AGE_SECS: u32 = 600;

pub fn json_response(status: StatusCode, value: serde_json::Value) -> Result<Response<ResponseBody>, Error> {
  Ok(
    Response::builder()
      .status(status)
      .header("content-type", "application/json; charset=utf-8")
      .header("cache-control", "no-store")
      .body(ResponseBody::from(value))?,
  )
}

pub fn method_not_allowed() -> Result<Response<ResponseBody>, Error> {
  json_response(
    StatusCode::METHOD_NOT_ALLOWED,
    serde_json::json!({"ok": false, "error": "method_not_allowed"}),
  )
}

/// 302 to `location`, optionally setting or clearing a cookie on the way.
pub fn redirect_response(location: &str, set_cookie: Option<String>) -> Result<Response<ResponseBody>, Error> {
  let mut builder = Response::builder()
    .status(StatusCode::FOUND)
    .header("location", location)
    .header("cache-control", "no-store")
    .header("content-type", "application/json; charset=utf-8");
  if let Some(cookie) = set_cookie {
    builder = builder.header("set-cookie", cookie);
  }
  Ok(builder.body(ResponseBody::from(serde_json::json!({"ok": true, "redirect": location})))?)
}

pub fn state_cookie(state: &str) -> String {
  format!(
    "{OAUTH_STATE_COOKIE}={state}; Path=/; Max-Age={OAUTH_STATE_MAX_AGE_SECS}; HttpOnly; Secure; SameSite=Lax"
  )
}

pub fn clear_state_cookie() -> String {
  format!("{OAUTH_STATE_COOKIE}=; Path=/; Max-Age=0; HttpOnly; Secure; SameSite=Lax")
}

fn decode_hex_digit(b: u8) -> Option<u8> {
  match b {
    b'0'..=b'9' => Some(b - b'0'),
    b'a'..=b'f' => Some(b - b'a' + 10),
    b'A'..=b'F' => Some(b - b'A' + 10),
    _ => None,
  }
}

fn percent_decode(input: &str) -> Option<String> {
  let bytes = input.as_bytes();
  let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
  let mut i = 0;
  while i < bytes.len() {
    match bytes[i] {
      b'%' if i + 2 < bytes.len() => {
        let hi = decode_hex_digit(bytes[i + 1])?;
        let lo = decode_hex_digit(bytes[i + 2])?;
        out.push((hi << 4) | lo);
        i += 3;
      }
      b'+' => {
        out.push(b' ');
        i += 1;
      }
      b => {
        out.push(b);
        i += 1;
      }
    }
  }
  String::from_utf8(out).ok()
}

pub fn get_query_param(uri: &Uri, key: &str) -> Option<String> {
  let query = uri.query()?;
  for part in query.split('&') {
    let mut it = part.splitn(2, '=');
    let k = it.next().unwrap_or("");
    if k != key {
      continue;
    }
    let v = it.next().unwrap_or("");
    return percent_decode(v).or_else(|| Some(v.to_string()));
  }
  None
}

pub fn get_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
  headers
    .get_all("cookie")
    .iter()
    .filter_map(|v| v.to_str().ok())
    .flat_map(|v| v.split(';'))
    .filter_map(|pair| {
      let (k, v) = pair.trim().split_once('=')?;
      (k == name).then(|| v.to_string())
    })
    .next()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn get_query_param_decodes_values() {
    let uri: Uri = "/api/auth/youtube/callback?code=4%2F0Ab-x&state=abc+def&scope=a"
      .parse()
      .unwrap();
    assert_eq!(get_query_param(&uri, "code").as_deref(), Some("4/0Ab-x"));
    assert_eq!(get_query_param(&uri, "state").as_deref(), Some("abc def"));
    assert_eq!(get_query_param(&uri, "missing"), None);
  }

  #[test]
  fn percent_decode_handles_trailing_escape() {
    assert_eq!(percent_decode("a%2Fb").as_deref(), Some("a/b"));
    assert_eq!(percent_decode("a%2F").as_deref(), Some("a/"));
    assert_eq!(percent_decode("a%2").as_deref(), Some("a%2"));
    assert_eq!(percent_decode("a%").as_deref(), Some("a%"));
    assert_eq!(percent_decode("%zz"), None);
  }

  #[test]
  fn get_cookie_finds_named_cookie() {
    let mut headers = HeaderMap::new();
    headers.insert("cookie", "theme=dark; yt_oauth_state=s123; other=1".parse().unwrap());
    assert_eq!(get_cookie(&headers, OAUTH_STATE_COOKIE).as_deref(), Some("s123"));
    assert_eq!(get_cookie(&headers, "absent"), None);
  }

  #[test]
  fn state_cookie_is_http_only_and_short_lived() {
    let cookie = state_cookie("s123");
    assert!(cookie.starts_with("yt_oauth_state=s123;"));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("Max-Age=600"));
    assert!(clear_state_cookie().contains("Max-Age=0"));
  }
}
