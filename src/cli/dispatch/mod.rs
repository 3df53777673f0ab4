use crate::cli::{
    actions::{outbound, server, Action},
    globals::GlobalArgs,
};
use anyhow::{Context, Result};
use std::path::PathBuf;
use url::Url;

fn required_url(matches: &clap::ArgMatches, name: &str) -> Result<Url> {
    let value = matches
        .get_one::<String>(name)
        .with_context(|| format!("missing required argument: --{name}"))?;

    Url::parse(value).with_context(|| format!("invalid --{name}: {value}"))
}

/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let mut globals = GlobalArgs::new(
        required_url(matches, "public-url")?,
        required_url(matches, "cookie-handover-url")?,
        required_url(matches, "token-handover-url")?,
    );

    globals.set_apps(
        matches
            .get_many::<String>("apps")
            .map(|apps| apps.map(|app| app.trim().to_string()).collect())
            .unwrap_or_default(),
    );

    if let Some(sub_m) = matches.subcommand_matches("outbound") {
        return Ok(Action::Outbound(outbound::Args {
            target: sub_m
                .get_one::<String>("target")
                .cloned()
                .context("missing required argument: --target")?,
            direct: sub_m.get_flag("direct"),
            globals,
        }));
    }

    Ok(Action::Server(server::Args {
        port: matches.get_one::<u16>("port").copied().unwrap_or(8080),
        storage: matches.get_one::<PathBuf>("storage").cloned(),
        globals,
    }))
}
