use std::path::PathBuf;

use clap::Args;
use nulpfetcher::SourceSettings;

pub const DEFAULT_DB_PATH: &str = "./data/content.sqlite";
pub const DEFAULT_BIND: &str = "127.0.0.1:3000";

/// Remote endpoints; every flag falls back to its environment variable.
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Content search endpoint used for courses
    #[arg(long, env = "COURSE_API_URL")]
    pub course_api_url: String,
    /// Maximum number of courses requested per run
    #[arg(long, env = "COURSE_API_LIMIT")]
    pub course_api_limit: u32,
    /// Content search endpoint for good practices (defaults to the course endpoint)
    #[arg(long, env = "GOOD_PRACTICE_API_URL")]
    pub good_practice_api_url: Option<String>,
    /// Maximum number of good practices requested per run
    #[arg(long, env = "GOOD_PRACTICE_API_LIMIT")]
    pub good_practice_api_limit: Option<u32>,
    /// Forum topic list endpoint
    #[arg(long, env = "DISCUSSION_API_URL")]
    pub discussion_api_url: Option<String>,
    /// Reported discussion limit; the topic endpoint has no limit parameter
    #[arg(long, env = "DISCUSSION_API_LIMIT")]
    pub discussion_api_limit: Option<u32>,
    /// Timeout applied to every outbound request
    #[arg(long, env = "SYNC_HTTP_TIMEOUT_SECS")]
    pub http_timeout_secs: Option<u64>,
}

impl SourceArgs {
    pub fn settings(&self) -> SourceSettings {
        SourceSettings {
            course_api_url: self.course_api_url.clone(),
            course_api_limit: self.course_api_limit,
            good_practice_api_url: non_blank(&self.good_practice_api_url),
            good_practice_api_limit: self.good_practice_api_limit,
            discussion_api_url: non_blank(&self.discussion_api_url),
            discussion_api_limit: self.discussion_api_limit,
            http_timeout_secs: self.http_timeout_secs,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    /// SQLite file holding the mirrored content
    #[arg(long, env = "NSYNC_DB_PATH", default_value = DEFAULT_DB_PATH)]
    pub db_path: PathBuf,
}

// An exported-but-empty variable means "not set".
fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        sources: SourceArgs,
        #[command(flatten)]
        store: StoreArgs,
    }

    #[test]
    fn flags_map_onto_source_settings() {
        let harness = Harness::parse_from([
            "nsync",
            "--course-api-url",
            "https://nulp.example/api/content/v1/search",
            "--course-api-limit",
            "20",
            "--good-practice-api-url",
            " ",
            "--http-timeout-secs",
            "5",
        ]);
        let settings = harness.sources.settings();
        assert_eq!(settings.course_api_limit, 20);
        assert_eq!(settings.good_practice_api_url, None);
        assert_eq!(settings.http_timeout_secs, Some(5));
        assert_eq!(harness.store.db_path, PathBuf::from(DEFAULT_DB_PATH));
    }
}
