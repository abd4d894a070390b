//! Command dispatch: bridges CLI args -> catalog operations -> JSON output.

pub mod config_cmd;

use serde::Serialize;
use serde_json::json;

use betaseries_core::{Catalog, Change, MovieState};

use crate::cli::{Command, GlobalOpts, MovieStateArg, OutputFormat, ShowAction, TitleKind};
use crate::error::CliError;

/// Dispatch an API-bound command to the catalog.
pub async fn dispatch(cmd: Command, catalog: &Catalog, global: &GlobalOpts) -> Result<(), CliError> {
    let out = global.output;
    match cmd {
        Command::Show { id, force } => print(out, &catalog.show(id, force).await?),
        Command::ShowAction { action, id } => {
            let change = match action {
                ShowAction::Add => catalog.add_show(id).await?,
                ShowAction::Remove => catalog.remove_show(id).await?,
                ShowAction::Archive => catalog.archive_show(id).await?,
                ShowAction::Unarchive => catalog.unarchive_show(id).await?,
                ShowAction::Favorite => catalog.favorite_show(id).await?,
                ShowAction::Unfavorite => catalog.unfavorite_show(id).await?,
            };
            print_change(out, change)
        }
        Command::Episodes { show_id, season } => {
            print(out, &catalog.show_episodes(show_id, season).await?)
        }
        Command::Similars { kind, id } => match kind {
            TitleKind::Show => print(out, &catalog.show_similars(id).await?),
            TitleKind::Movie => print(out, &catalog.movie_similars(id).await?),
        },
        Command::Movie { id, force } => print(out, &catalog.movie(id, force).await?),
        Command::MovieAdd { id, state } => {
            print_change(out, catalog.add_movie(id, movie_state(state)).await?)
        }
        Command::MovieRemove { id } => print_change(out, catalog.remove_movie(id).await?),
        Command::Episode { id, force } => print(out, &catalog.episode(id, force).await?),
        Command::Watch { id, no_bulk } => {
            print_change(out, catalog.mark_watched(id, !no_bulk).await?)
        }
        Command::Unwatch { id } => print_change(out, catalog.unmark_watched(id).await?),
        Command::Member { id } => print(out, &catalog.member(id).await?),
        Command::Session => {
            let active = catalog
                .client()
                .is_session_active()
                .await
                .map_err(betaseries_core::CoreError::from)?;
            print(out, &json!({ "active": active }))
        }
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}

fn movie_state(arg: MovieStateArg) -> MovieState {
    match arg {
        MovieStateArg::ToSee => MovieState::ToSee,
        MovieStateArg::Seen => MovieState::Seen,
        MovieStateArg::WontSee => MovieState::WontSee,
    }
}

fn print_change<T: Serialize>(out: OutputFormat, change: Change<T>) -> Result<(), CliError> {
    let rendered = match change {
        Change::Applied(resource) => json!({ "status": "applied", "resource": resource }),
        Change::AlreadyApplied(tag) => json!({ "status": "already_applied", "reason": tag.as_ref() }),
    };
    print(out, &rendered)
}

fn print<T: Serialize + ?Sized>(out: OutputFormat, value: &T) -> Result<(), CliError> {
    let rendered = match out {
        OutputFormat::Json => serde_json::to_string_pretty(value)?,
        OutputFormat::JsonCompact => serde_json::to_string(value)?,
    };
    println!("{rendered}");
    Ok(())
}
