use crate::cli::actions::Action;
use anyhow::Result;

pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    Ok(Action::Server {
        port: matches.get_one::<u16>("port").copied().unwrap_or(8080),
        upstream: matches
            .get_one("upstream")
            .map(|s: &String| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --upstream"))?,
        cookie_name: matches
            .get_one("cookie-name")
            .map_or_else(|| "token".to_string(), |s: &String| s.to_string()),
    })
}
