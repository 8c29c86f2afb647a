//! Page zoom through the scale-factor override.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::time::Instant;

use taskmind_cdp::{CommandResult, Invoker};
use taskmind_config::CommandsConfig;

use crate::command::Command;
use crate::page::{Outcome, finish, from_cdp, invalid, parse_args};
use crate::schema::{CapabilityDescriptor, ValueType};

#[derive(Debug, Deserialize)]
struct ZoomArgs {
    factor: f64,
}

/// `zoom`: set the page scale factor. Out-of-range factors are rejected
/// before any protocol call.
pub struct ZoomCommand {
    descriptor: CapabilityDescriptor,
    max_factor: f64,
}

impl ZoomCommand {
    pub fn new(config: &CommandsConfig) -> Self {
        Self {
            descriptor: CapabilityDescriptor::new("zoom", "Set the page scale factor")
                .required("factor", ValueType::Number)
                .output("factor", ValueType::Number),
            max_factor: config.max_zoom,
        }
    }

    fn check(&self, factor: f64) -> Outcome<()> {
        if factor.is_finite() && factor > 0.0 && factor <= self.max_factor {
            Ok(())
        } else {
            Err(invalid(format!(
                "zoom factor {} is outside (0, {}]",
                factor, self.max_factor
            )))
        }
    }

    async fn run(&self, invoker: &dyn Invoker, args: ZoomArgs) -> Outcome<Value> {
        self.check(args.factor)?;
        invoker
            .call(
                "Emulation.setPageScaleFactor",
                json!({"pageScaleFactor": args.factor}),
                None,
            )
            .await
            .map_err(from_cdp)?;
        Ok(json!({"factor": args.factor}))
    }
}

#[async_trait]
impl Command for ZoomCommand {
    fn descriptor(&self) -> &CapabilityDescriptor {
        &self.descriptor
    }

    async fn execute(&self, invoker: &dyn Invoker, args: Value) -> CommandResult {
        let started = Instant::now();
        let outcome = match parse_args::<ZoomArgs>(args) {
            Ok(args) => self.run(invoker, args).await,
            Err(f) => Err(f),
        };
        finish(started, outcome)
    }
}
