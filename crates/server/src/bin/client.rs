use futures::StreamExt;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use domain::{Comment, LikeState, StreamEvent};

const BASE_URL: &str = "http://127.0.0.1:3000";
const POST_ID: &str = "hello-commentcast";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateCommentRequest {
    author_id: String,
    content: String,
    parent_id: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let base = std::env::var("COMMENTCAST_URL").unwrap_or_else(|_| BASE_URL.to_string());
    let post_id = std::env::args().nth(1).unwrap_or_else(|| POST_ID.to_string());
    let client = reqwest::Client::new();
    println!("Starting commentcast test client against {} (post {})", base, post_id);

    println!("\n[1/5] Opening comment stream...");
    let stream_url = format!("{}/api/posts/{}/comments/stream", base, post_id);
    let resp = client.get(&stream_url).send().await?.error_for_status()?;
    let tail = tokio::spawn(async move {
        let mut body = resp.bytes_stream();
        let mut buf = String::new();
        while let Some(Ok(chunk)) = body.next().await {
            buf.push_str(&String::from_utf8_lossy(&chunk));
            while let Some(end) = buf.find("\n\n") {
                let frame: String = buf.drain(..end + 2).collect();
                if let Some(data) = frame.trim_end().strip_prefix("data: ") {
                    match serde_json::from_str::<StreamEvent>(data) {
                        Ok(ev) => println!("   <- {}: {}", ev.kind(), data),
                        Err(_) => println!("   <- (unparsed) {}", data),
                    }
                }
            }
        }
    });

    println!("\n[2/5] Posting a comment...");
    let payload = CreateCommentRequest {
        author_id: "42".to_string(),
        content: "This is a message from the commentcast test client!".to_string(),
        parent_id: None,
    };
    let post_url = format!("{}/api/posts/{}/comments", base, post_id);
    let resp = client.post(&post_url).json(&payload).send().await?;
    if !resp.status().is_success() {
        println!("   -> ❌ Failed to post: {:?}", resp.text().await?);
        tail.abort();
        return Ok(());
    }
    let comment: Comment = resp.json().await?;
    println!("   -> ✅ Created {}", comment.id);

    println!("\n[3/5] Toggling a like twice...");
    let like_url = format!("{}/api/comments/{}/like", base, comment.id);
    for _ in 0..2 {
        let state: LikeState = client
            .post(&like_url)
            .json(&serde_json::json!({ "userId": "7" }))
            .send()
            .await?
            .json()
            .await?;
        println!("   -> liked={} likeCount={}", state.liked, state.like_count);
    }

    println!("\n[4/5] Deleting the comment...");
    let resp: Value = client
        .delete(format!("{}/api/comments/{}", base, comment.id))
        .send()
        .await?
        .json()
        .await?;
    println!("   -> {}", resp);

    println!("\n[5/5] Waiting 2 seconds for stream frames...");
    tokio::time::sleep(Duration::from_secs(2)).await;
    tail.abort();

    Ok(())
}
