use anyhow::Result;
use mgmtkit::{Catalog, Transport, Verb, request};

use crate::Context;
use crate::cli::ListingArgs;
use crate::output;

/// Run `list <kind>` or `show <kind>` and print the rendered response.
pub fn run(ctx: &Context, verb: Verb, args: &ListingArgs) -> Result<()> {
    let descriptor = Catalog::global().lookup(verb, &args.kind)?;
    let columns = request::listing_columns(descriptor, &args.columns, &ctx.config);
    let request = request::build_listing(descriptor, &columns, &ctx.config)?;

    let response = Transport::new(&ctx.config)?.send(&request)?;
    if let Some(body) = response.json()? {
        print!(
            "{}",
            output::render(&body, &columns, ctx.config.format, ctx.config.depth)
        );
    }
    Ok(())
}
