//! Render command - Print or write the Terraform definition.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use cloudstrap_config::OptionTables;
use cloudstrap_templates::{DefinitionWriter, TemplateRenderer};

use super::args::ParamArgs;
use super::prompt;
use crate::ExitCodes;

#[derive(Args, Debug)]
pub struct RenderArgs {
    #[command(flatten)]
    pub params: ParamArgs,

    /// Write the definition into this directory instead of printing it
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Render a custom template file instead of the built-in one
    #[arg(long)]
    pub template: Option<PathBuf>,
}

pub async fn execute(args: RenderArgs) -> Result<u8> {
    let tables = OptionTables::standard();
    let selections = args.params.selections()?;
    let config = prompt::resolve(&tables, selections, !args.params.non_interactive)?;

    let renderer = match &args.template {
        Some(path) => TemplateRenderer::from_file(path)
            .with_context(|| format!("loading template {}", path.display()))?,
        None => TemplateRenderer::new(),
    };
    let definition = renderer.render(&config)?;

    match &args.output {
        Some(dir) => {
            let path = DefinitionWriter::new(dir).write(&definition)?;
            info!("Definition written to {}", path.display());
            println!("✅ Wrote {}", path.display());
        }
        None => print!("{}", definition),
    }
    Ok(ExitCodes::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(output: Option<PathBuf>) -> RenderArgs {
        RenderArgs {
            params: ParamArgs {
                params: None,
                ami: Some("ubuntu".to_string()),
                instance_type: Some("t3.small".to_string()),
                region: None,
                availability_zone: Some("us-east-1b".to_string()),
                load_balancer_name: Some("web-alb".to_string()),
                non_interactive: true,
            },
            output,
            template: None,
        }
    }

    #[tokio::test]
    async fn test_render_writes_definition() {
        let dir = tempfile::tempdir().unwrap();
        let code = execute(args(Some(dir.path().join("out")))).await.unwrap();
        assert_eq!(code, ExitCodes::SUCCESS);

        let written = std::fs::read_to_string(dir.path().join("out").join("main.tf")).unwrap();
        assert!(written.contains("ami-0c02fb55956c7d316"));
        assert!(written.contains("web-alb"));
        assert!(written.contains("us-east-1b"));
    }

    #[tokio::test]
    async fn test_render_rejects_invalid_name() {
        let mut bad = args(None);
        bad.params.load_balancer_name = Some("-bad-".to_string());
        let err = execute(bad).await.unwrap_err();
        assert!(err.downcast_ref::<cloudstrap_config::ConfigError>().is_some());
    }
}
