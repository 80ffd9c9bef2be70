use clap::Parser;

use crate::error::{AppError, AppResult};

use super::SyncArgs;

pub(crate) fn parse_test_args<I, T>(args: I) -> AppResult<SyncArgs>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    SyncArgs::try_parse_from(args).map_err(AppError::from)
}
