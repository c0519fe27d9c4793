use clap::Parser;
use env_logger::Env;
use log::error;
use redtree::cli::{Cli, Commands};
use redtree::config::AppConfig;
use redtree::error::RedditClientError;
use redtree::operations::comments::{handle_comments_command_with_client, CommentsOptions};
use redtree::operations::find::{handle_find_command_with_client, FindOptions};

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = AppConfig::load();

    if let Err(err) = run(cli, config).await {
        error!("{}", err);
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: AppConfig) -> Result<(), RedditClientError> {
    let client = config.create_authenticated_client().await?;

    match cli.command {
        Commands::Comments {
            submission,
            sort,
            focus,
            all,
            depth_limit,
            request_limit,
        } => {
            let options = CommentsOptions {
                submission,
                sort: sort.unwrap_or(config.comment_sort),
                focus,
                load_all: all,
                depth_limit,
                request_limit,
                timezone: config.timezone,
            };
            handle_comments_command_with_client(options, client).await
        }
        Commands::Find {
            submission,
            comment,
            hint,
            sort,
            all,
            request_limit,
        } => {
            let options = FindOptions {
                submission,
                comment,
                hint: hint.into(),
                sort: sort.unwrap_or(config.comment_sort),
                load_all: all,
                request_limit,
                timezone: config.timezone,
            };
            handle_find_command_with_client(options, client).await
        }
    }
}
