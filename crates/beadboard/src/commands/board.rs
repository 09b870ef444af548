//! `beadboard board` - one-shot render.

use std::path::Path;

use anyhow::Result;
use clap::ArgMatches;

use crate::{commands, render};

#[allow(clippy::print_stdout)]
pub async fn run(project_root: &Path, matches: &ArgMatches) -> Result<()> {
    let store = commands::make_store(project_root);
    store.fetch_issues(false).await?;

    let json = matches.get_flag("json");

    if let Some(root_id) = matches.get_one::<String>("root") {
        let root = commands::find_epic(&store, root_id)?;
        store.select_root(Some(root)).await;
        let batches = store.batches();
        if json {
            println!("{}", serde_json::to_string_pretty(&batches)?);
        } else {
            print!("{}", render::render_batches(root_id, &batches, &store));
        }
        return Ok(());
    }

    let issues: Vec<_> = store.issues().iter().cloned().collect();
    if json {
        println!("{}", serde_json::to_string_pretty(&issues)?);
    } else {
        print!("{}", render::render_board(&issues));
    }
    Ok(())
}
