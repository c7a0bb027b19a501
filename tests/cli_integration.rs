// CLI integration tests for the encode/decode/params/listen flows.
use std::io::{BufRead, BufReader, Write};
use std::process::{Command, Stdio};

use serde_json::{Value, json};

const CARDS: &str = r#"[{"Q":"Qual é a capital do Brasil?","A":"Brasília","T":"Geografia"}]"#;

fn cmd() -> Command {
    let exe = env!("CARGO_BIN_EXE_framepass");
    let mut command = Command::new(exe);
    command.env_remove("RUST_LOG");
    command
}

fn parse_json(value: &str) -> Value {
    serde_json::from_str(value).expect("valid json")
}

fn parse_json_line(output: &[u8]) -> Value {
    let text = String::from_utf8_lossy(output);
    let line = text.lines().next().expect("json line");
    parse_json(line)
}

fn encode(payload: &str) -> String {
    let output = cmd().args(["encode", payload]).output().expect("encode");
    assert!(output.status.success());
    let value = parse_json_line(&output.stdout);
    value["token"].as_str().expect("token").to_string()
}

#[test]
fn encode_decode_round_trip_keeps_accents() {
    let output = cmd().args(["encode", CARDS]).output().expect("encode");
    assert!(output.status.success());
    let encoded = parse_json_line(&output.stdout);
    let token = encoded["token"].as_str().unwrap();
    assert!(token.starts_with("b64_"));
    assert!(!token.contains('+') && !token.contains('/'));
    assert_eq!(encoded["bytes"].as_u64().unwrap() as usize, token.len());

    for flags in [&[][..], &["--strict"][..]] {
        let decode = cmd()
            .arg("decode")
            .args(flags)
            .arg(token)
            .output()
            .expect("decode");
        assert!(decode.status.success());
        assert_eq!(parse_json_line(&decode.stdout), parse_json(CARDS));
    }
}

#[test]
fn bare_encode_is_decodable() {
    let output = cmd()
        .args(["encode", "--bare", CARDS])
        .output()
        .expect("encode");
    let token = parse_json_line(&output.stdout)["token"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(!token.starts_with("b64_"));

    let decode = cmd().args(["decode", &token]).output().expect("decode");
    assert!(decode.status.success());
    assert_eq!(parse_json_line(&decode.stdout), parse_json(CARDS));
}

#[test]
fn encode_reads_payload_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("cards.json");
    std::fs::write(&path, CARDS).expect("write");

    let output = cmd()
        .args(["encode", "-f", path.to_str().unwrap()])
        .output()
        .expect("encode");
    assert!(output.status.success());
    assert_eq!(
        parse_json_line(&output.stdout)["token"].as_str().unwrap(),
        encode(CARDS)
    );
}

#[test]
fn decode_accepts_percent_encoded_json() {
    let output = cmd()
        .args(["decode", "%5B%7B%22Q%22%3A%22Caf%C3%A9%22%7D%5D"])
        .output()
        .expect("decode");
    assert!(output.status.success());
    assert_eq!(parse_json_line(&output.stdout), json!([{"Q": "Café"}]));
}

#[test]
fn decode_explain_lists_candidates() {
    let token = encode(CARDS);
    let output = cmd()
        .args(["decode", "--explain", &token])
        .output()
        .expect("decode");
    assert!(output.status.success());
    let explained = parse_json_line(&output.stdout);
    assert_eq!(explained["strategy"], "prefixed-base64");
    let candidates = explained["candidates"].as_array().unwrap();
    assert!(candidates.len() >= 2);
    assert_eq!(candidates[0]["source"], "utf8");
    assert_eq!(candidates[0]["score"], 0);
    assert_eq!(explained["value"], parse_json(CARDS));
}

#[test]
fn decode_failure_reports_no_valid_candidate() {
    let output = cmd()
        .args(["decode", "%7Bbroken"])
        .output()
        .expect("decode");
    assert_eq!(output.status.code(), Some(5));
    let err = parse_json_line(&output.stderr);
    assert_eq!(err["error"]["kind"], "NoValidCandidate");
    assert_eq!(err["error"]["strategy"], "percent-encoded-json");
    assert!(err["error"]["hint"].as_str().unwrap().contains("--explain"));
}

#[test]
fn strict_decode_rejects_bad_base64() {
    let output = cmd()
        .args(["decode", "--strict", "b64_not*base64"])
        .output()
        .expect("decode");
    assert_eq!(output.status.code(), Some(4));
    let err = parse_json_line(&output.stderr);
    assert_eq!(err["error"]["kind"], "InvalidBase64");
}

#[test]
fn embed_builds_link_and_iframe() {
    let output = cmd()
        .args(["embed", "--origin", "https://widgets.example", CARDS])
        .output()
        .expect("embed");
    assert!(output.status.success());
    let embed = parse_json_line(&output.stdout);
    let url = embed["url"].as_str().unwrap();
    assert!(url.starts_with("https://widgets.example/widgets/flashcards?data_b64=b64_"));
    assert!(embed["iframe"].as_str().unwrap().contains(url));
    assert_eq!(embed["token"].as_str().unwrap(), encode(CARDS));
}

#[test]
fn params_decodes_data_and_config() {
    let token = encode(CARDS);
    let url = format!(
        "https://widgets.example/widgets/flashcards?data_b64={token}&config=%7B%22theme%22%3A%22dark%22%7D"
    );
    let output = cmd().args(["params", &url]).output().expect("params");
    assert!(output.status.success());
    let params = parse_json_line(&output.stdout);
    assert_eq!(params["source"], "data_b64");
    assert_eq!(params["data"], parse_json(CARDS));
    assert_eq!(
        params["config"],
        json!({"title": "Flashcards", "theme": "dark", "shuffleCards": true})
    );
    assert!(output.stderr.is_empty());
}

#[test]
fn params_falls_back_to_example_with_notice() {
    let output = cmd()
        .args([
            "params",
            "https://widgets.example/widgets/flashcards?data=%257Bbroken&config=oops",
        ])
        .output()
        .expect("params");
    assert!(output.status.success());
    let params = parse_json_line(&output.stdout);
    assert_eq!(params["source"], "example");
    assert_eq!(params["data"].as_array().unwrap().len(), 3);
    assert_eq!(params["config"]["title"], "Flashcards");

    let stderr = String::from_utf8_lossy(&output.stderr);
    let kinds: Vec<String> = stderr
        .lines()
        .map(parse_json)
        .map(|notice| notice["notice"]["kind"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(kinds, ["fallback", "config-ignored"]);
}

#[test]
fn example_prints_sample_cards() {
    let output = cmd().arg("example").output().expect("example");
    assert!(output.status.success());
    let cards = parse_json_line(&output.stdout);
    assert_eq!(cards[0]["A"], "Brasília");
    assert_eq!(cards[2]["A"], "H₂O");

    let unknown = cmd()
        .args(["example", "--widget", "quiz"])
        .output()
        .expect("example");
    assert_eq!(unknown.status.code(), Some(2));
}

#[test]
fn listen_sends_ready_then_resolves_from_host_message() {
    let mut child = cmd()
        .arg("listen")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("listen");
    let mut stdin = child.stdin.take().expect("stdin");
    let mut stdout = BufReader::new(child.stdout.take().expect("stdout"));

    let mut line = String::new();
    stdout.read_line(&mut line).expect("ready line");
    assert_eq!(parse_json(&line), json!({"type": "ready", "widget": "flashcards"}));

    writeln!(stdin, "not json").unwrap();
    writeln!(stdin, r#"{{"type":"quiz","cards":[]}}"#).unwrap();
    writeln!(stdin, r#"{{"type":"flashcards","cards":{CARDS}}}"#).unwrap();
    stdin.flush().unwrap();

    line.clear();
    stdout.read_line(&mut line).expect("resolved line");
    let resolved = parse_json(&line);
    assert_eq!(resolved["type"], "resolved");
    assert_eq!(resolved["source"], "message");
    assert_eq!(resolved["cards"], parse_json(CARDS));

    drop(stdin);
    let status = child.wait().expect("wait");
    assert!(status.success());
}

#[test]
fn listen_uses_url_token_without_ready() {
    let token = encode(CARDS);
    let url = format!("https://widgets.example/widgets/flashcards?data_b64={token}");
    let output = cmd()
        .args(["listen", "--url", &url])
        .stdin(Stdio::null())
        .output()
        .expect("listen");
    assert!(output.status.success());
    let text = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<Value> = text.lines().map(parse_json).collect();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["source"], "url");
    assert_eq!(lines[0]["cards"], parse_json(CARDS));
}

#[test]
fn listen_cancels_when_host_closes() {
    let output = cmd()
        .args(["listen", "--widget", "quiz", "--field", "items"])
        .stdin(Stdio::null())
        .output()
        .expect("listen");
    assert_eq!(output.status.code(), Some(7));
    assert_eq!(
        parse_json_line(&output.stdout),
        json!({"type": "ready", "widget": "quiz"})
    );
    let err = parse_json_line(&output.stderr);
    assert_eq!(err["error"]["kind"], "Cancelled");
}

#[test]
fn usage_exit_code() {
    let output = cmd()
        .args(["encode", "{not json"])
        .output()
        .expect("encode");
    assert_eq!(output.status.code(), Some(2));
    let err = parse_json_line(&output.stderr);
    assert_eq!(err["error"]["kind"], "Usage");
}
