use anyhow::Context;
use clap::Parser;
use std::io::IsTerminal;
use std::sync::Arc;

use scm_history::cli::Args;
use scm_history::git::GitHistoryProvider;
use scm_history::infrastructure::{setup_logging, AppConfig, ConfigManager, ConfigSource};
use scm_history::report::{formatter_for, OutputFormat, RowFormatter};
use scm_history::scm::{
    CachedHistoryProvider, HistoryTreeController, HistoryViewModel, Repository, RepositoryId,
    TreeElement,
};

fn load_config(args: &Args) -> anyhow::Result<AppConfig> {
    let mut manager = ConfigManager::new().add_source(ConfigSource::EnvFile(None));
    if let Some(path) = &args.config {
        manager = manager.add_source(ConfigSource::File(path.clone()));
    }
    let mut manager = manager
        .add_source(ConfigSource::Environment)
        .add_source(ConfigSource::CommandLine(args.overrides()));

    Ok(manager.load()?.clone())
}

async fn print_changes(
    controller: &HistoryTreeController,
    formatter: &dyn RowFormatter,
    commit: &str,
) -> anyhow::Result<()> {
    let rows = controller.rows().await;
    let element = rows
        .iter()
        .find(|row| match row {
            TreeElement::HistoryItem { view_model, .. } => view_model.history_item.id.starts_with(commit),
            TreeElement::LoadMore { .. } => false,
        })
        .with_context(|| format!("提交 {} 不在已加载的历史中，可以增大 --pages", commit))?;

    let changes = controller.data_source().open_item(element).await?;
    print!("{}", formatter.format_changes(&changes)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;
    setup_logging(&config.logging)?;

    let format: OutputFormat = args.format.parse()?;
    let use_colors = !args.no_color && std::io::stdout().is_terminal();
    let formatter = formatter_for(format, use_colors);

    let git_provider = GitHistoryProvider::discover(&config.history.git_binary, &args.repo)
        .await
        .with_context(|| format!("{} 不是 git 仓库", args.repo.display()))?;
    let root = git_provider.repo_path().to_path_buf();
    let provider = Arc::new(CachedHistoryProvider::new(
        Arc::new(git_provider),
        config.history.changes_cache_size,
    ));

    let repository_id = RepositoryId::new(root.to_string_lossy());
    let repository = Arc::new(Repository::new(repository_id.clone(), root, provider));

    let view_model = Arc::new(HistoryViewModel::new(
        config.history.page_size,
        config.history.filter,
    ));
    view_model.add_repository(repository.clone()).await;
    view_model.set_active_repository(Some(repository_id)).await;

    if args.merge_base {
        match view_model.resolve_common_ancestor(&repository).await? {
            Some(ancestor) => println!("{}", ancestor),
            None => println!("没有可用的共同祖先"),
        }
        return Ok(());
    }

    let controller = HistoryTreeController::new(view_model);
    controller.refresh(false).await;
    if let Some(error) = controller.last_error().await {
        return Err(error.into());
    }

    for _ in 1..args.pages.max(1) {
        let has_more = matches!(controller.rows().await.last(), Some(TreeElement::LoadMore { .. }));
        if !has_more {
            break;
        }
        controller.load_more().await?;
    }

    if let Some(commit) = &args.changes {
        return print_changes(&controller, formatter.as_ref(), commit).await;
    }

    print!("{}", formatter.format_rows(&controller.rows().await)?);
    Ok(())
}
