use anyhow::Result;
use mgmtkit::{Catalog, Transport, Verb, request};

use crate::Context;
use crate::cli::ResourceArgs;
use crate::ui;

/// Run declare, delete, close or purge for one resource.
pub fn run(ctx: &Context, verb: Verb, args: &ResourceArgs) -> Result<()> {
    let descriptor = Catalog::global().lookup(verb, &args.kind)?;
    let fields = request::parse_fields(&args.fields)?;
    let request = request::build(descriptor, &fields, &ctx.config)?;

    Transport::new(&ctx.config)?.send(&request)?;

    if !ctx.quiet {
        ui::success(&status_message(verb, &args.kind));
    }
    Ok(())
}

fn status_message(verb: Verb, kind: &str) -> String {
    let done = match verb {
        Verb::Declare => "declared",
        Verb::Delete => "deleted",
        Verb::Close => "closed",
        Verb::Purge => "purged",
        other => other.as_str(),
    };
    format!("{kind} {done}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_message() {
        assert_eq!(status_message(Verb::Declare, "exchange"), "exchange declared");
        assert_eq!(status_message(Verb::Delete, "queue"), "queue deleted");
        assert_eq!(status_message(Verb::Close, "connection"), "connection closed");
        assert_eq!(status_message(Verb::Purge, "queue"), "queue purged");
    }
}
