use std::sync::Arc;

use anyhow::Context;
use blog_portal::{
    config::{AppConfig, Env},
    guard::{History, Navigator},
    moderation::{DEFAULT_PAGE_SIZE, ModerationBoard, ModerationPipeline},
    repository::{CommentRepositoryState, HttpRepository, PostRepositoryState},
    routes::Router,
    session::SessionStore,
    storage::{FileTokenStore, TokenStoreState},
};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

/// Command-line client for the blog portal.
#[derive(Parser)]
#[command(name = "blog-portal", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Adopt a bearer token returned by the login endpoint.
    Login { token: String },
    /// Forget the current session.
    Logout,
    /// Show who the current session acts as.
    Whoami,
    /// Navigate to a client path and report what renders.
    Open { path: String },
    /// List published posts.
    Feed,
    /// List the moderation queue (admins only).
    Queue {
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        per_page: usize,
    },
    /// Approve a pending post.
    Approve { id: Uuid },
    /// Delete a post.
    Delete { id: Uuid },
    /// List the comments of a post.
    Comments { post_id: Uuid },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Configuration (fail-fast in production)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "blog_portal=debug".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
    }

    let cli = Cli::parse();
    tracing::debug!("client starting in {:?} mode", config.env);

    // 3. Session, restored from the token file
    let tokens = Arc::new(FileTokenStore::new(config.token_path.clone())) as TokenStoreState;
    let mut session = SessionStore::restore(tokens.clone());

    // 4. Repositories and pipeline
    let http = Arc::new(HttpRepository::new(&config.api_base_url, tokens));
    let pipeline = Arc::new(
        ModerationPipeline::new(
            http.clone() as PostRepositoryState,
            http as CommentRepositoryState,
        )
        .with_edit_policy(config.edit_policy),
    );

    let router = Router::from_config(&config);
    let mut history = History::default();

    match cli.command {
        Command::Login { token } => {
            session
                .sign_in(&token)
                .context("token does not carry a usable identity, nothing was stored")?;
            println!("signed in as {} ({})", session.user_id().unwrap_or("-"), session.role());
        }
        Command::Logout => {
            router.sign_out(&mut session, &mut history);
            println!("signed out, now at {}", history.current().unwrap_or("/"));
        }
        Command::Whoami => match session.user_id() {
            Some(user_id) => println!("{user_id} ({})", session.role()),
            None => println!("guest"),
        },
        Command::Open { path } => match router.enter(&session, &path, &mut history) {
            Some(route) => println!("{} -> {:?} {:?}", route.path, route.view, route.params),
            None => println!(
                "{path} -> redirected to {}",
                history.current().unwrap_or(router.fallback_route())
            ),
        },
        Command::Feed => {
            for post in pipeline.feed().await? {
                print_post(&post);
            }
        }
        Command::Queue { page, per_page } => {
            let mut board = ModerationBoard::new(pipeline);
            board.reload(&session).await?;
            for post in board.page(page, per_page) {
                print_post(post);
            }
            println!("page {page} of {}", board.total_pages(per_page));
        }
        Command::Approve { id } => {
            let mut board = ModerationBoard::new(pipeline);
            board.reload(&session).await?;
            board.approve(&session, id).await?;
            println!("approved {id}; {} post(s) still pending", board.pending().len());
        }
        Command::Delete { id } => {
            let post = pipeline
                .post_detail(&session, id)
                .await?
                .with_context(|| format!("post {id} not found"))?;
            pipeline.delete_post(&session, &post).await?;
            println!("deleted {id}");
        }
        Command::Comments { post_id } => {
            for comment in pipeline.comments(post_id).await? {
                println!(
                    "{}  {}  {}",
                    comment.created_at.format("%Y-%m-%d %H:%M"),
                    comment.author_user_id,
                    comment.content
                );
            }
        }
    }

    Ok(())
}

fn print_post(post: &blog_portal::models::Post) {
    println!(
        "{}  {}  {}  by {}{}",
        post.id,
        post.created_at.format("%Y-%m-%d"),
        post.title,
        post.author,
        if post.approved { "" } else { "  [pending]" }
    );
}
