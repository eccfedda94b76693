// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use slog::Drain;
use slog::Logger;
use slog::o;

mod prompt;

pub use prompt::*;

pub fn log_level(verbose: bool) -> slog::Level {
    if verbose { slog::Level::Debug } else { slog::Level::Info }
}

/// A terminal logger that shows debug records only when `verbose` is set.
pub fn create_logger(verbose: bool) -> Logger {
    let level = log_level(verbose);

    let decorator = slog_term::TermDecorator::new().stderr().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    let drain = slog::LevelFilter::new(drain, level).fuse();

    Logger::root(drain, o!())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_log_level() {
        assert_eq!(log_level(false), slog::Level::Info);
        assert_eq!(log_level(true), slog::Level::Debug);

        assert!(!slog::Level::Debug.is_at_least(log_level(false)));
        assert!(slog::Level::Debug.is_at_least(log_level(true)));
    }
}
