use crate::{
    cli::globals::GlobalArgs,
    landing::HANDOVER_PATH,
    protocol::{create_outbound_url, create_outbound_url_direct},
};
use anyhow::{Context, Result};
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub target: String,
    pub direct: bool,
    pub globals: GlobalArgs,
}

/// Build the URL that starts a handover.
/// # Errors
/// Returns an error if the landing URL cannot be derived from the public URL.
pub fn build(args: &Args) -> Result<Url> {
    let handover_url = args
        .globals
        .public_url
        .join(HANDOVER_PATH)
        .context("Invalid --public-url")?;

    Ok(if args.direct {
        create_outbound_url_direct(
            &args.globals.endpoints.cookie_handover_url,
            &handover_url,
            &args.target,
        )
    } else {
        create_outbound_url(&handover_url, &args.target)
    })
}

/// Print the outbound URL.
/// # Errors
/// Returns an error if the URL cannot be built.
pub fn execute(args: &Args) -> Result<()> {
    println!("{}", build(args)?);

    Ok(())
}
