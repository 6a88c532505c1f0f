use std::path::PathBuf;

use anyhow::{anyhow, Context};
use async_recursion::async_recursion;
use pledge_client::{
    api::{CampaignId, Comment, CommentId, CommentUpdate, NewComment, PageRequest},
    recent::JsonFileStorage,
    tree, ClientConfig, CommentService, CommentView, HttpService, RecentSearches,
};

#[derive(structopt::StructOpt)]
struct Opt {
    /// Backend base URL, defaults to $PLEDGE_HOST or the local development server
    #[structopt(short, long)]
    host: Option<String>,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(structopt::StructOpt)]
enum Command {
    /// List one page of top-level comments of a campaign
    List {
        campaign: String,

        #[structopt(short, long, default_value = "1")]
        page: u32,
    },

    /// List the direct replies of a comment
    Replies { comment: String },

    /// Print the whole discussion of a campaign, with every thread expanded
    Tree {
        campaign: String,

        /// Only expand the first page of top-level comments
        #[structopt(long)]
        first_page: bool,
    },

    /// Post a comment, or a reply with --parent. Needs $PLEDGE_TOKEN.
    Post {
        campaign: String,
        content: String,

        #[structopt(long)]
        parent: Option<String>,
    },

    /// Replace the content of one of your comments. Needs $PLEDGE_TOKEN.
    Edit { comment: String, content: String },

    /// Delete one of your comments with all its replies. Needs $PLEDGE_TOKEN.
    Delete {
        comment: String,

        /// Confirm the deletion
        #[structopt(long)]
        yes: bool,
    },

    /// Show recent campaign searches, optionally recording a new one
    Recent {
        /// Search to record
        query: Option<String>,

        #[structopt(long)]
        clear: bool,

        #[structopt(long, env = "PLEDGE_HISTORY", default_value = ".pledge-recent-searches.json")]
        file: PathBuf,
    },
}

fn print_comment(c: &Comment, indent: usize) {
    let author = c
        .user
        .as_ref()
        .map(|u| u.display_name())
        .unwrap_or_else(|| c.author_id.to_string());
    let mut flags = String::new();
    if !c.is_approved {
        flags.push_str(" [pending approval]");
    }
    if c.reply_count > 0 {
        flags.push_str(&format!(" [{} replies]", c.reply_count));
    }
    println!(
        "{:indent$}{} {} ({}){}",
        "",
        c.created_at.format("%Y-%m-%d %H:%M"),
        author,
        c.id,
        flags,
        indent = indent * 2,
    );
    for line in c.content.lines() {
        println!("{:indent$}  {}", "", line, indent = indent * 2);
    }
}

fn needs_token(config: &ClientConfig) -> anyhow::Result<()> {
    match config.token {
        Some(_) => Ok(()),
        None => Err(anyhow!("PLEDGE_TOKEN must be set to modify comments")),
    }
}

/// Expands every comment that has replies, depth first
#[async_recursion]
async fn expand_all(view: &CommentView<HttpService>, ids: Vec<CommentId>) -> anyhow::Result<()> {
    for id in ids {
        if !view.find(&id).map_or(false, |c| c.has_replies()) {
            continue;
        }
        if !view.snapshot().is_expanded(&id) {
            tracing::debug!(comment = %id, "expanding replies");
            view.toggle_replies(&id)
                .await
                .with_context(|| format!("fetching replies of {id}"))?;
        }
        let children = view
            .find(&id)
            .map(|c| c.replies.iter().map(|r| r.id.clone()).collect())
            .unwrap_or_default();
        expand_all(view, children).await?;
    }
    Ok(())
}

async fn print_tree(config: ClientConfig, campaign: CampaignId, first_page: bool) -> anyhow::Result<()> {
    let service = HttpService::new(config.clone());
    let (view, _notices) = CommentView::new(service, campaign, None, &config);
    view.open().await.context("loading comments")?;
    while !first_page && view.snapshot().has_more {
        tracing::debug!(loaded = view.snapshot().comment_count(), "loading next page");
        view.load_more().await.context("loading more comments")?;
    }
    let roots = view.snapshot().roots().map(|c| c.id.clone()).collect();
    expand_all(&view, roots).await?;

    let snapshot = view.snapshot();
    println!(
        "{} threads, {} comments in total, on {}",
        snapshot.comment_count(),
        tree::count(&snapshot.comments),
        view.campaign()
    );
    for row in snapshot.rows() {
        print_comment(row.comment, row.depth);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let opt = <Opt as structopt::StructOpt>::from_args();

    let mut config = ClientConfig::from_env();
    if let Some(host) = opt.host {
        config = config.with_host(host);
    }
    tracing::debug!(host = %config.host, authenticated = config.token.is_some(), "using backend");
    match opt.cmd {
        Command::List { campaign, page } => {
            let service = HttpService::new(config.clone());
            let res = service
                .fetch_comments(
                    &CampaignId::new(campaign),
                    PageRequest::new(page, config.page_size),
                )
                .await
                .context("fetching comments")?;
            for c in &res.comments {
                print_comment(c, 0);
            }
            println!(
                "page {} of {}, {} comments in total",
                res.pagination.page, res.pagination.total_pages, res.pagination.total
            );
        }
        Command::Replies { comment } => {
            let service = HttpService::new(config.clone());
            let res = service
                .fetch_replies(
                    &CommentId::new(comment),
                    PageRequest::new(1, config.reply_page_size),
                )
                .await
                .context("fetching replies")?;
            for c in &res.replies {
                print_comment(c, 0);
            }
        }
        Command::Tree {
            campaign,
            first_page,
        } => print_tree(config, CampaignId::new(campaign), first_page).await?,
        Command::Post {
            campaign,
            content,
            parent,
        } => {
            needs_token(&config)?;
            let service = HttpService::new(config.clone());
            let c = service
                .create_comment(NewComment {
                    campaign_id: CampaignId::new(campaign),
                    content,
                    parent_id: parent.map(CommentId::new),
                })
                .await
                .context("posting comment")?;
            print_comment(&c, 0);
        }
        Command::Edit { comment, content } => {
            needs_token(&config)?;
            let service = HttpService::new(config.clone());
            let c = service
                .update_comment(&CommentId::new(comment), CommentUpdate { content })
                .await
                .context("updating comment")?;
            print_comment(&c, 0);
        }
        Command::Delete { comment, yes } => {
            needs_token(&config)?;
            if !yes {
                return Err(anyhow!(
                    "deleting {comment} also deletes all its replies, pass --yes to confirm"
                ));
            }
            let service = HttpService::new(config.clone());
            let id = CommentId::new(comment);
            service
                .delete_comment(&id)
                .await
                .context("deleting comment")?;
            tracing::info!(comment = %id, "deleted comment and its replies");
        }
        Command::Recent { query, clear, file } => {
            let mut recent = RecentSearches::load(JsonFileStorage::new(file));
            if clear {
                recent.clear().context("clearing recent searches")?;
            }
            if let Some(query) = query {
                recent.record(&query).context("recording search")?;
            }
            for q in recent.entries() {
                println!("{q}");
            }
        }
    }

    Ok(())
}
