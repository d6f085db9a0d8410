//! Interactive parameter prompts and the teardown confirmation.

use anyhow::{Context, Result};
use async_trait::async_trait;
use dialoguer::{Confirm, Input, Select};
use tracing::warn;

use cloudstrap_config::{
    check_load_balancer_name, ConfigCollector, ConfigResult, DeploymentConfig, OptionTables,
    Selections,
};
use cloudstrap_core::{CoreError, CoreResult, TeardownDecider, TeardownDecision, TeardownPrompt};

/// Build the deployment configuration from `given`, prompting for anything
/// missing or invalid when `interactive` is set.
pub fn resolve(
    tables: &OptionTables,
    given: Selections,
    interactive: bool,
) -> Result<DeploymentConfig> {
    let collector = ConfigCollector::new(tables);
    let selections = if interactive {
        fill_interactively(&collector, given)?
    } else {
        given
    };
    Ok(collector.collect(&selections)?)
}

fn fill_interactively(collector: &ConfigCollector<'_>, given: Selections) -> Result<Selections> {
    let tables = collector.tables();

    let ami = match accepted(given.ami.as_deref(), |v| collector.check_ami(v)) {
        Some(ami) => ami.key,
        None => {
            let items: Vec<String> = tables
                .amis()
                .iter()
                .map(|a| format!("{} ({})", a.label, a.image_id))
                .collect();
            let idx = Select::new()
                .with_prompt("Select an AMI")
                .items(&items)
                .default(0)
                .interact()
                .context("AMI selection")?;
            tables.amis()[idx].key.clone()
        }
    };

    let instance_type = match accepted(given.instance_type.as_deref(), |v| {
        collector.check_instance_type(v)
    }) {
        Some(value) => value,
        None => pick("Select an instance type", tables.instance_types())?,
    };

    let region = match given.region.as_deref() {
        Some(value) => match collector.check_region(Some(value)) {
            Ok(region) => region,
            Err(e) => {
                warn!("{}", e);
                prompt_region(collector)?
            }
        },
        None => prompt_region(collector)?,
    };

    let availability_zone = match accepted(given.availability_zone.as_deref(), |v| {
        collector.check_zone(v)
    }) {
        Some(value) => value,
        None => pick("Select an availability zone", tables.availability_zones())?,
    };

    let load_balancer_name = match accepted(
        given.load_balancer_name.as_deref(),
        check_load_balancer_name,
    ) {
        Some(value) => value,
        None => Input::<String>::new()
            .with_prompt("Load balancer name")
            .validate_with(|input: &String| -> Result<(), String> {
                check_load_balancer_name(input)
                    .map(|_| ())
                    .map_err(|e| e.to_string())
            })
            .interact_text()
            .context("load balancer name")?,
    };

    Ok(Selections {
        ami: Some(ami),
        instance_type: Some(instance_type),
        region: Some(region),
        availability_zone: Some(availability_zone),
        load_balancer_name: Some(load_balancer_name),
    })
}

/// A pre-supplied value that passes `check`. Rejected values are reported
/// and dropped so the caller prompts instead.
fn accepted<T>(given: Option<&str>, check: impl Fn(&str) -> ConfigResult<T>) -> Option<T> {
    let value = given?;
    match check(value) {
        Ok(checked) => Some(checked),
        Err(e) => {
            warn!("{}", e);
            None
        }
    }
}

fn pick(prompt: &str, options: &[String]) -> Result<String> {
    let idx = Select::new()
        .with_prompt(prompt)
        .items(options)
        .default(0)
        .interact()
        .with_context(|| prompt.to_lowercase())?;
    Ok(options[idx].clone())
}

fn prompt_region(collector: &ConfigCollector<'_>) -> Result<String> {
    let answer = Input::<String>::new()
        .with_prompt("Region")
        .default(collector.tables().region().to_string())
        .validate_with(|input: &String| -> Result<(), String> {
            collector
                .check_region(Some(input))
                .map(|_| ())
                .map_err(|e| e.to_string())
        })
        .interact_text()
        .context("region")?;
    Ok(collector.check_region(Some(&answer))?)
}

/// Asks the operator on the terminal.
pub struct DialoguerDecider;

#[async_trait]
impl TeardownDecider for DialoguerDecider {
    async fn decide(&self, prompt: &TeardownPrompt) -> CoreResult<TeardownDecision> {
        let question = prompt.question();
        let confirmed = tokio::task::spawn_blocking(move || {
            Confirm::new()
                .with_prompt(question)
                .default(false)
                .interact()
        })
        .await
        .map_err(|e| CoreError::Decision(e.to_string()))?
        .map_err(|e| CoreError::Decision(e.to_string()))?;

        Ok(if confirmed {
            TeardownDecision::Destroy
        } else {
            TeardownDecision::Keep
        })
    }
}
