//! Parse command - show the directive a mention's text produces

use alt_text_bot_domain::Language;
use alt_text_bot_domain::usecases::parse_directive;
use anyhow::Result;
use std::path::PathBuf;

use crate::args::ParseArgs;
use crate::config::AppConfig;

pub async fn execute(args: ParseArgs, config_path: Option<PathBuf>) -> Result<()> {
    let default_language = match &args.language {
        Some(tag) => Language::new(tag),
        None => AppConfig::load(config_path.as_deref())?.default_language(),
    };

    let directive = parse_directive(&args.text, &default_language);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&directive)?);
    } else {
        println!("{}", directive);
    }

    Ok(())
}
