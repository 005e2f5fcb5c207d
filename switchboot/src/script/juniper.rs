//! Juniper JunOS template.

use secrecy::SecretString;

use super::{CommandScript, CommandStep, Reply, ScriptParams, need};
use crate::credentials::Credentials;
use crate::device::DeviceDescriptor;
use crate::error::Result;

/// `plain-text-password` opens a two-prompt dialog; answer both with `secret`.
fn password_step(text: String, secret: &SecretString) -> CommandStep {
    CommandStep::timed(text)
        .on("retype new password", Reply::Secret(secret.clone()))
        .on("new password", Reply::Secret(secret.clone()))
}

/// Factory reset, root authentication, identity, management address, SSH.
pub(super) fn bring_up(
    device: &DeviceDescriptor,
    credentials: &Credentials,
    params: &ScriptParams,
) -> Result<CommandScript> {
    let domain = need(
        params.domain.as_deref().or(device.domain_name.as_deref()),
        "domain_name",
    )?;
    let mgt_ip = need(device.mgt_ip, "mgt_ip")?;
    let mask = need(device.mgt_mask, "mgt_mask")?;
    let username = &credentials.username;

    let mut steps = vec![
        CommandStep::immediate("configure"),
        CommandStep::immediate("load factory-default"),
        password_step(
            "set system root-authentication plain-text-password".to_string(),
            credentials.root_secret(),
        ),
        CommandStep::immediate("commit"),
        CommandStep::immediate(format!("set system host-name {}", device.hostname())),
        CommandStep::immediate(format!("set system domain-name {domain}")),
        CommandStep::immediate(format!("set system login user {username} class super-user")),
        password_step(
            format!("set system login user {username} authentication plain-text-password"),
            &credentials.secret,
        ),
        CommandStep::immediate("set interfaces vlan unit 0 vlan-id 1"),
        CommandStep::immediate(format!(
            "set interfaces vlan unit 0 family inet address {mgt_ip}/{}",
            mask.prefix()
        )),
        CommandStep::immediate("set vlans default l3-interface vlan.0"),
    ];
    if let Some(gateway) = params.mgt_gateway {
        steps.push(CommandStep::immediate(format!(
            "set routing-options static route 0.0.0.0/0 next-hop {gateway}"
        )));
    }
    steps.extend([
        CommandStep::immediate("set system services ssh"),
        CommandStep::immediate("commit"),
    ]);

    Ok(CommandScript::new(
        steps,
        Some(CommandStep::immediate("commit and-quit")),
    ))
}
