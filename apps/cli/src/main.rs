use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{ControllerError, FileTokenStore, HttpArticleService, SessionController};
use shared::domain::{ArticleDraft, ArticleId, Credentials, Topic};
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod config;

use config::{load_settings, validated_server_url};

#[derive(Parser, Debug)]
#[command(name = "articles", about = "Log in and manage your articles")]
struct Cli {
    #[arg(long, default_value = "articles.toml")]
    config: PathBuf,
    #[arg(long)]
    server_url: Option<String>,
    #[arg(long)]
    token_path: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Login {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    Logout,
    List,
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        text: String,
        #[arg(long, value_parser = parse_topic)]
        topic: Topic,
    },
    /// Fields left out keep their current value.
    Update {
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        text: Option<String>,
        #[arg(long, value_parser = parse_topic)]
        topic: Option<Topic>,
    },
    Delete {
        id: i64,
    },
}

fn parse_topic(raw: &str) -> std::result::Result<Topic, String> {
    Topic::parse(raw).ok_or_else(|| {
        let known: Vec<_> = Topic::ALL.iter().map(|t| t.as_str()).collect();
        format!("unknown topic '{raw}', expected one of {}", known.join(", "))
    })
}

fn explain(err: ControllerError) -> anyhow::Error {
    if err.is_session_expired() {
        anyhow::anyhow!("session expired or missing; run `articles login` first")
    } else {
        err.into()
    }
}

fn print_status(controller: &SessionController) {
    let message = controller.message();
    if !message.is_empty() {
        println!("{message}");
    }
}

async fn run(controller: &SessionController, command: Command) -> Result<()> {
    match command {
        Command::Login { username, password } => {
            let credentials = Credentials::new(username, password);
            if !credentials.is_well_formed() {
                bail!("username and password must not be blank");
            }
            controller.login(credentials).await.map_err(explain)?;
        }
        Command::Logout => {
            controller.logout().map_err(explain)?;
            if controller.message().is_empty() {
                println!("Not logged in.");
                return Ok(());
            }
        }
        Command::List => {
            controller.load_articles().await.map_err(explain)?;
            print_status(controller);
            for article in &controller.articles() {
                println!(
                    "#{} [{}] {}\n    {}",
                    article.article_id, article.topic, article.title, article.text
                );
            }
            return Ok(());
        }
        Command::Create { title, text, topic } => {
            let draft = ArticleDraft::new(title, text, topic);
            if !draft.is_submittable() {
                bail!("title and text must not be blank");
            }
            controller.create_article(draft).await.map_err(explain)?;
        }
        Command::Update {
            id,
            title,
            text,
            topic,
        } => {
            let id = ArticleId(id);
            controller.load_articles().await.map_err(explain)?;
            controller.set_editing_target(id)?;
            let mut draft = controller
                .editing_article()
                .map(|article| ArticleDraft::from(&article))
                .with_context(|| format!("article {id} disappeared before editing"))?;
            if let Some(title) = title {
                draft.title = title;
            }
            if let Some(text) = text {
                draft.text = text;
            }
            if let Some(topic) = topic {
                draft.topic = topic;
            }
            if !draft.is_submittable() {
                controller.clear_editing_target();
                bail!("title and text must not be blank");
            }
            controller.update_article(id, draft).await.map_err(explain)?;
        }
        Command::Delete { id } => {
            controller
                .delete_article(ArticleId(id))
                .await
                .map_err(explain)?;
        }
    }

    print_status(controller);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let mut settings = load_settings(&cli.config);
    if let Some(server_url) = cli.server_url {
        settings.server_url = server_url;
    }
    if let Some(token_path) = cli.token_path {
        settings.token_path = token_path;
    }

    let server_url = validated_server_url(&settings.server_url)?;
    let service = HttpArticleService::with_timeout(
        server_url,
        Duration::from_secs(settings.request_timeout_secs),
    )
    .context("failed to build HTTP client")?;
    let tokens = FileTokenStore::new(settings.token_path);
    debug!(
        server_url = service.server_url(),
        token_path = %tokens.path().display(),
        "cli: configured"
    );
    let controller = SessionController::new(Arc::new(service), Arc::new(tokens));

    run(&controller, cli.command).await
}
