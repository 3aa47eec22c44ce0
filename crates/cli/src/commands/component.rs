use clap::Args;
use tagbot_core::config::ConfigOverrides;
use tagbot_core::domain::component::{Component, ComponentChannel};
use tagbot_db::{ComponentRepository, SqlComponentRepository};

use crate::commands::{open_database, prepare, to_data, CommandResult, StepError};

#[derive(Debug, Clone, Args)]
pub struct ComponentArgs {
    #[arg(long, help = "Human-readable component name")]
    pub name: String,
    #[arg(long, help = "Component Slack channel id; the key tags are registered against")]
    pub channel: String,
    #[arg(long, help = "Slack user id of the component owner")]
    pub owner: String,
    #[arg(long, help = "Support channel id, if the component has one")]
    pub support_channel: Option<String>,
    #[arg(long, default_value = "", help = "Runbook URL")]
    pub runbook: String,
}

impl ComponentArgs {
    fn into_component(self) -> Result<Component, String> {
        let name = self.name.trim().to_string();
        let channel = self.channel.trim().to_string();
        let owner = self.owner.trim().to_string();
        if name.is_empty() || channel.is_empty() || owner.is_empty() {
            return Err("name, channel and owner must not be blank".to_string());
        }

        Ok(Component {
            name,
            channel: ComponentChannel(channel),
            support_channel: self
                .support_channel
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty()),
            runbook_url: self.runbook.trim().to_string(),
            owner_reference: owner,
        })
    }
}

pub fn run(args: ComponentArgs) -> CommandResult {
    let component = match args.into_component() {
        Ok(component) => component,
        Err(message) => return CommandResult::failure("component", "invalid_input", message, 2),
    };

    let (config, runtime) = match prepare("component", ConfigOverrides::default()) {
        Ok(prepared) => prepared,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = open_database(&config).await?;
        let repository = SqlComponentRepository::new(pool.clone());
        repository
            .save(component.clone())
            .await
            .map_err(|error| ("db_write", error.to_string(), 4u8))?;
        pool.close().await;
        Ok::<(), StepError>(())
    });

    match result {
        Ok(()) => CommandResult::success_with_data(
            "component",
            format!("saved component `{}` on {}", component.name, component.channel.0),
            to_data(&component),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("component", error_class, message, exit_code)
        }
    }
}
