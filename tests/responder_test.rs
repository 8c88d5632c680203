mod common;

use catalog_worker::engine::Responder;
use catalog_worker::model::{CODE_ERROR, MessageType, ResponseData, ResponsePayload};
use common::{assert_header, assert_terminated, header, parse_envelopes};
use tokio::sync::mpsc;

fn item(slug: &str) -> ResponsePayload {
    ResponsePayload::data(ResponseData {
        href_slug: slug.to_string(),
        encoding: String::new(),
        body: r#"{"id":1}"#.to_string(),
        status: 200,
    })
}

#[test]
fn create_response_numbers_envelopes() {
    let mut responder = Responder::new(Vec::<u8>::new(), header());

    let first: serde_json::Value =
        serde_json::from_str(&responder.create_response(&item("/a")).unwrap()).unwrap();
    let second: serde_json::Value =
        serde_json::from_str(&responder.create_response(&item("/b")).unwrap()).unwrap();

    assert_eq!(first["serial"], 1);
    assert_eq!(second["serial"], 2);
    assert_eq!(first["message_type"], "data");
    assert_eq!(first["account"], "Buzz");
    assert_eq!(first["in_response_to"], "345");
    assert_eq!(first["payload"]["href_slug"], "/a");
    assert_eq!(first["code"], 0);
    assert_ne!(first["message_id"], second["message_id"]);
}

#[test]
fn eof_envelope_has_no_payload() {
    let mut responder = Responder::new(Vec::<u8>::new(), header());
    let eof: serde_json::Value =
        serde_json::from_str(&responder.create_response(&ResponsePayload::eof()).unwrap()).unwrap();
    assert_eq!(eof["message_type"], "eof");
    assert!(eof.get("payload").is_none());
}

#[tokio::test]
async fn run_writes_one_line_per_item_until_eof() {
    let (tx, rx) = mpsc::channel(1);
    let task = tokio::spawn(Responder::new(Vec::<u8>::new(), header()).run(rx));

    tx.send(item("/a")).await.unwrap();
    tx.send(ResponsePayload::error("/b", "boom", 500)).await.unwrap();
    tx.send(ResponsePayload::eof()).await.unwrap();

    let output = task.await.unwrap().unwrap();
    let envelopes = parse_envelopes(&output);

    assert_eq!(envelopes.len(), 3);
    assert_header(&envelopes);
    assert_terminated(&envelopes);
    assert_eq!(envelopes[1].code, CODE_ERROR);
    assert_eq!(envelopes[1].payload.as_ref().unwrap().body, "boom");
    assert_eq!(envelopes[1].payload.as_ref().unwrap().status, 500);
    assert_eq!(envelopes[2].serial, 3);
}

#[tokio::test]
async fn closed_channel_still_terminates_stream() {
    let (tx, rx) = mpsc::channel(1);
    let task = tokio::spawn(Responder::new(Vec::<u8>::new(), header()).run(rx));

    tx.send(item("/a")).await.unwrap();
    drop(tx);

    let output = task.await.unwrap().unwrap();
    let envelopes = parse_envelopes(&output);

    assert_eq!(envelopes.len(), 2);
    assert_eq!(envelopes[0].message_type, MessageType::Data);
    assert_terminated(&envelopes);
}
