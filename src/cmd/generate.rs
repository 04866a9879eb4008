use std::fs;

use crate::context::AppContext;
use crate::error::AppResult;
use crate::workflow::generate;

pub async fn run(ctx: &AppContext) -> AppResult<()> {
    let outcome = generate::run(ctx).await?;

    match &ctx.config.output {
        Some(path) => {
            fs::write(path, &outcome.document)?;
            println!("Release notes generated: {}", path.display());
        }
        None => println!("{}", outcome.notes.join("\n")),
    }

    Ok(())
}
