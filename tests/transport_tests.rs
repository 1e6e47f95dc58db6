use std::io::{BufReader, Cursor};
use std::net::TcpListener;
use std::thread;

use pretty_assertions::assert_eq;

use policy_crawler::transport::{Block, ResultCollector, ResultSender, encode_block, read_blocks};

fn blocks_of(input: &str) -> (Vec<Block>, bool) {
    let mut blocks = Vec::new();
    let finished = read_blocks(Cursor::new(input), |block| {
        blocks.push(block);
        Ok(())
    })
    .unwrap();
    (blocks, finished)
}

// ============================================================================
// Framing
// ============================================================================

#[test]
fn block_is_id_payload_and_terminator() {
    assert_eq!(encode_block("com.example.app", "line 1\nline 2"), "com.example.app\nline 1\nline 2\n---\n");
}

#[test]
fn sender_output_reads_back_as_blocks() {
    let mut sender = ResultSender::new(Vec::new());
    sender.send("com.example.one", "first policy").unwrap();
    sender.send("com.example.two", "second\npolicy").unwrap();
    let bytes = sender.finish().unwrap();

    let (blocks, finished) = blocks_of(&String::from_utf8(bytes).unwrap());
    assert!(finished);
    assert_eq!(
        blocks,
        vec![
            Block {
                app_id: "com.example.one".into(),
                payload: "first policy".into(),
            },
            Block {
                app_id: "com.example.two".into(),
                payload: "second\npolicy".into(),
            },
        ]
    );
}

#[test]
fn ok_inside_a_block_is_payload() {
    let (blocks, finished) = blocks_of("app\nOK\nthanks\n---\nOK\n");
    assert!(finished);
    assert_eq!(blocks[0].payload, "OK\nthanks");
}

#[test]
fn blank_lines_between_blocks_are_skipped() {
    let (blocks, _) = blocks_of("\n\na\none\n---\n\nb\ntwo\n---\n");
    let ids: Vec<&str> = blocks.iter().map(|b| b.app_id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
}

#[test]
fn unterminated_block_is_dropped() {
    let (blocks, finished) = blocks_of("a\none\n---\nb\npartial");
    assert!(!finished);
    assert_eq!(blocks.len(), 1);
}

#[test]
fn crlf_line_endings_are_accepted() {
    let (blocks, finished) = blocks_of("a\r\none\r\n---\r\nOK\r\n");
    assert!(finished);
    assert_eq!(blocks[0].payload, "one");
}

// ============================================================================
// Collector
// ============================================================================

#[test]
fn collector_writes_one_file_per_app() {
    let dir = tempfile::tempdir().unwrap();
    let collector = ResultCollector::new(dir.path(), ".txt");

    let (files, finished) = collector
        .collect(Cursor::new("com.example.one\npolicy one\n---\ncom.example.two\npolicy two\n---\nOK\n"))
        .unwrap();

    assert!(finished);
    assert_eq!(files.len(), 2);
    assert_eq!(
        std::fs::read_to_string(dir.path().join("com.example.one.txt")).unwrap(),
        "policy one"
    );
}

#[test]
fn collector_sanitizes_file_names() {
    let collector = ResultCollector::new("out", "xml");
    assert_eq!(
        collector.path_for("../evil app"),
        std::path::PathBuf::from("out/.._evil_app.xml")
    );
}

#[test]
fn collector_serves_until_ok() {
    let dir = tempfile::tempdir().unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let sender = thread::spawn(move || {
        let mut sender = ResultSender::connect(addr).unwrap();
        sender.send("com.example.app", "the policy").unwrap();
        sender.finish().unwrap();
    });

    let collector = ResultCollector::new(dir.path(), "txt");
    let files = collector.serve(&listener).unwrap();
    sender.join().unwrap();

    assert_eq!(files, vec![dir.path().join("com.example.app.txt")]);
    let stored = std::fs::read_to_string(&files[0]).unwrap();
    assert_eq!(stored, "the policy");
}

#[test]
fn reader_accepts_buffered_streams() {
    let input = "a\none\n---\nOK\n".as_bytes();
    let finished = read_blocks(BufReader::new(input), |_| Ok(())).unwrap();
    assert!(finished);
}
