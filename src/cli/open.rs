//! Open command implementation

use anyhow::Result;
use clap::Args;
use console::style;

use super::utils::{open_store, parse_csv};
use crate::domain::Config;
use crate::error::Error;
use crate::open::{BrowserOpener, UrlOpener};
use crate::store::ResolveRequest;

#[derive(Args)]
pub struct OpenArgs {
    /// Group name (case-insensitive)
    #[arg(value_name = "NAME")]
    pub name: Option<String>,

    /// Open every version carrying all of these tags (comma-separated)
    #[arg(short = 't', long, value_name = "TAGS")]
    pub tags: Option<String>,

    /// Open the tabs of every stored version, oldest first
    #[arg(short = 'm', long)]
    pub merge: bool,

    /// Print the URLs instead of launching the browser
    #[arg(short = 'p', long)]
    pub print: bool,
}

pub fn run(args: OpenArgs, config: &Config) -> Result<()> {
    let request = build_request(&args)?;
    let store = open_store(config)?;

    let urls = match store.resolve(&request) {
        Ok(urls) => urls,
        Err(err @ Error::NotFound(_)) => {
            tracing::debug!("{err}");
            println!("No tabs found {}", describe(&request));
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };

    if args.print {
        for url in &urls {
            println!("{url}");
        }
        return Ok(());
    }

    BrowserOpener::new(config.browser.clone()).open(&urls)?;
    println!("{} {} tabs {}", style("Opened").green().bold(), urls.len(), describe(&request));
    Ok(())
}

fn build_request(args: &OpenArgs) -> Result<ResolveRequest> {
    let tags = parse_csv(&args.tags).unwrap_or_default();
    if !tags.is_empty() {
        if args.name.is_some() {
            tracing::warn!("--tags given; ignoring the group name");
        }
        return Ok(ResolveRequest::by_tags(tags));
    }
    match args.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) if args.merge => Ok(ResolveRequest::merged(name)),
        Some(name) => Ok(ResolveRequest::by_name(name)),
        None => anyhow::bail!("Provide a group name or --tags"),
    }
}

fn describe(request: &ResolveRequest) -> String {
    if request.tags.is_empty() {
        format!("for group '{}'", request.group_name.as_deref().unwrap_or_default())
    } else {
        format!("for tags {}", request.tags.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(name: Option<&str>, tags: Option<&str>, merge: bool) -> OpenArgs {
        OpenArgs { name: name.map(str::to_string), tags: tags.map(str::to_string), merge, print: true }
    }

    #[test]
    fn tags_take_precedence_over_name() {
        let request = build_request(&args(Some("music"), Some("a, b"), false)).expect("request");
        assert_eq!(request, ResolveRequest::by_tags(["a", "b"]));
    }

    #[test]
    fn merge_flag_selects_all_versions() {
        let request = build_request(&args(Some("music"), None, true)).expect("request");
        assert_eq!(request, ResolveRequest::merged("music"));
    }

    #[test]
    fn name_or_tags_required() {
        assert!(build_request(&args(None, Some(" , "), false)).is_err());
    }
}
