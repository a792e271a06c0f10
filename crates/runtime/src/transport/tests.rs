use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use super::*;

#[tokio::test]
async fn test_send_writes_one_line_per_frame() {
	// Transport writes into stdin, we read from the other end
	let (stdin_read, stdin_write) = tokio::io::duplex(1024);
	let (stdout_read, _stdout_write) = tokio::io::duplex(1024);

	let (transport, _rx) = PipeTransport::new(stdin_write, stdout_read);
	let (mut sender, _receiver) = transport.into_parts();

	let first = serde_json::json!({"id": 0, "method": "initialize", "params": {}});
	let second = serde_json::json!({"id": 1, "method": "getInfo", "params": {}});
	sender.send(first.clone()).await.unwrap();
	sender.send(second.clone()).await.unwrap();

	let mut lines = BufReader::new(stdin_read).lines();
	let line = lines.next_line().await.unwrap().unwrap();
	assert_eq!(serde_json::from_str::<Value>(&line).unwrap(), first);
	let line = lines.next_line().await.unwrap().unwrap();
	assert_eq!(serde_json::from_str::<Value>(&line).unwrap(), second);
}

#[tokio::test]
async fn test_receiver_delivers_frames_in_order() {
	let (_stdin_read, stdin_write) = tokio::io::duplex(1024);
	let (stdout_read, mut stdout_write) = tokio::io::duplex(1024);

	let (transport, mut rx) = PipeTransport::new(stdin_write, stdout_read);
	let (_sender, receiver) = transport.into_parts();
	let handle = tokio::spawn(receiver.run());

	stdout_write
		.write_all(b"{\"event\":\"ready\"}\n\n{\"id\":3,\"result\":null}\n")
		.await
		.unwrap();
	drop(stdout_write);

	assert_eq!(rx.recv().await.unwrap()["event"], "ready");
	assert_eq!(rx.recv().await.unwrap()["id"], 3);
	assert!(handle.await.unwrap().is_ok());
	assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn test_malformed_line_is_skipped() {
	let (_stdin_read, stdin_write) = tokio::io::duplex(1024);
	let (stdout_read, mut stdout_write) = tokio::io::duplex(1024);

	let (transport, mut rx) = PipeTransport::new(stdin_write, stdout_read);
	let (_sender, receiver) = transport.into_parts();
	let handle = tokio::spawn(receiver.run());

	stdout_write
		.write_all(b"not json\n{\"event\":\"authenticated\"}\n")
		.await
		.unwrap();
	drop(stdout_write);

	assert_eq!(rx.recv().await.unwrap()["event"], "authenticated");
	assert!(handle.await.unwrap().is_ok());
}

#[tokio::test]
async fn test_frame_split_across_writes() {
	let (_stdin_read, stdin_write) = tokio::io::duplex(1024);
	let (stdout_read, mut stdout_write) = tokio::io::duplex(1024);

	let (transport, mut rx) = PipeTransport::new(stdin_write, stdout_read);
	let (_sender, receiver) = transport.into_parts();
	tokio::spawn(receiver.run());

	stdout_write.write_all(b"{\"event\":\"qr\",").await.unwrap();
	stdout_write.flush().await.unwrap();
	stdout_write.write_all(b"\"data\":{\"code\":\"abc\"}}\n").await.unwrap();

	let frame = rx.recv().await.unwrap();
	assert_eq!(frame["data"]["code"], "abc");
}
