use clap::{ArgMatches, CommandFactory, FromArgMatches};

use crate::args::SyncArgs;
use crate::error::{AppError, AppResult};

pub(super) fn parse_with_matches(argv: &[&str]) -> AppResult<(SyncArgs, ArgMatches)> {
    let matches = SyncArgs::command()
        .try_get_matches_from(argv)
        .map_err(AppError::from)?;
    let args = SyncArgs::from_arg_matches(&matches)?;
    Ok((args, matches))
}
