use crate::action::Action;
use crate::cli::{UpdateDailyLimitArgs, UpdateRequiredArgs};
use crate::commands::{parse_unit, propose};
use crate::config::{Config, Overrides};
use crate::types::parse_u256;
use anyhow::Result;

pub async fn run_daily_limit(
    args: UpdateDailyLimitArgs,
    config: Config,
    overrides: Overrides,
) -> Result<()> {
    let settings = config.resolve(&overrides);
    let unit = parse_unit(&settings.denom, args.unit.as_deref())?;
    let limit = settings.denom.to_minor(&args.amount, unit)?;
    propose(&config, &overrides, Action::DailyLimitChange { limit }, &args.wait).await
}

/// The bound against the owner count is checked before signing.
pub async fn run_required(
    args: UpdateRequiredArgs,
    config: Config,
    overrides: Overrides,
) -> Result<()> {
    let required = parse_u256(&args.required)?;
    propose(&config, &overrides, Action::RequiredChange { required }, &args.wait).await
}
