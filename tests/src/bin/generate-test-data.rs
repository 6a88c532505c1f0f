//! Prints a campaign discussion as the backend would return it, replies
//! nested, for use as a fixture or for eyeballing the renderer.

use pledge_client::api::{CampaignId, Comment, PageRequest};
use pledge_mock_server::MockServer;

const NUM_THREADS: usize = 30;
const PAGE_SIZE: u32 = 100;

fn with_replies(server: &mut MockServer, mut c: Comment) -> anyhow::Result<Comment> {
    if c.reply_count > 0 {
        let page = server.fetch_replies(&c.id, PageRequest::new(1, PAGE_SIZE))?;
        c.replies = page
            .replies
            .into_iter()
            .map(|r| with_replies(server, r))
            .collect::<anyhow::Result<_>>()?;
    }
    Ok(c)
}

fn main() -> anyhow::Result<()> {
    let campaign = CampaignId::new(
        std::env::args()
            .nth(1)
            .unwrap_or_else(|| String::from("demo")),
    );
    let mut server = MockServer::new();
    server.seed_demo(&campaign, NUM_THREADS);
    let page = server.fetch_comments(&campaign, PageRequest::new(1, PAGE_SIZE))?;
    let comments = page
        .comments
        .into_iter()
        .map(|c| with_replies(&mut server, c))
        .collect::<anyhow::Result<Vec<_>>>()?;
    println!("{}", serde_json::to_string_pretty(&comments)?);
    Ok(())
}
