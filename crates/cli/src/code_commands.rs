use {anyhow::Result, clap::Subcommand, lansite_config::LansiteConfig, lansite_sessions::CodeBook};

#[derive(Subcommand)]
pub enum CodeAction {
    /// Mint login codes for the given display names.
    Generate {
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Show the configured login codes.
    List,
}

pub fn handle_codes(action: CodeAction, config: &LansiteConfig) -> Result<()> {
    let mut book = CodeBook::from_map(&config.codes);
    match action {
        CodeAction::Generate { names } => {
            println!("# add under [codes] in your config file");
            for name in &names {
                let code = book
                    .generate(name)
                    .ok_or_else(|| anyhow::anyhow!("display name must not be blank"))?;
                println!("{code} = {name:?}");
            }
            Ok(())
        },
        CodeAction::List => {
            if book.is_empty() {
                println!("no login codes configured");
            }
            for (code, name) in book.entries() {
                println!("{code}  {name}");
            }
            Ok(())
        },
    }
}
