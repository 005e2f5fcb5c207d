//! Cisco IOS templates.

use secrecy::ExposeSecret;

use super::{CommandScript, CommandStep, Reply, ScriptParams, VlanBackup, need, unsupported};
use crate::credentials::Credentials;
use crate::device::{DeviceDescriptor, DeviceRole};
use crate::error::Result;

/// Bring-up for L2 and L3 switches: identity, management address, SSHv2.
pub(super) fn bring_up(
    device: &DeviceDescriptor,
    credentials: &Credentials,
    params: &ScriptParams,
) -> Result<CommandScript> {
    if !matches!(device.role, DeviceRole::L2Switch | DeviceRole::L3Switch) {
        return Err(unsupported(device));
    }

    let gateway = need(params.mgt_gateway, "mgt_gateway")?;
    let domain = need(
        params.domain.as_deref().or(device.domain_name.as_deref()),
        "domain_name",
    )?;
    let mgt_ip = need(device.mgt_ip, "mgt_ip")?;
    let mask = need(device.mgt_mask, "mgt_mask")?;
    let username = &credentials.username;
    let secret = credentials.secret.expose_secret();

    let mut steps = Vec::new();
    if params.factory_reset {
        steps.push(CommandStep::timed("enable"));
        steps.push(CommandStep::timed("write erase").on("[confirm]", Reply::Enter));
        steps.push(CommandStep::reload("reload"));
    }

    steps.extend([
        CommandStep::timed("enable"),
        CommandStep::timed("configure terminal"),
    ]);
    if device.role == DeviceRole::L2Switch {
        steps.push(CommandStep::immediate("no spanning-tree vlan 1"));
    }
    steps.extend([
        CommandStep::immediate(format!("ip default-gateway {gateway}")),
        CommandStep::immediate(format!("ip route 0.0.0.0 0.0.0.0 {gateway}")),
        CommandStep::timed(format!("hostname {}", device.hostname())),
        CommandStep::immediate(format!("ip domain-name {domain}")),
        CommandStep::immediate(format!("username {username} privilege 15 secret {secret}"))
            .conceal(&credentials.secret),
        CommandStep::timed(format!("enable secret {secret}")).conceal(&credentials.secret),
    ]);

    match device.role {
        DeviceRole::L2Switch => steps.extend([
            CommandStep::timed("crypto key generate rsa modulus 2048")
                .on("replace them", Reply::Text("yes".into())),
            CommandStep::timed("int vlan 1"),
            CommandStep::immediate("no shutdown"),
            CommandStep::immediate(format!("ip address {mgt_ip} {mask}")),
            CommandStep::timed("exit"),
            CommandStep::immediate(format!("int {}", device.uplink)),
            CommandStep::immediate("no shutdown"),
            CommandStep::timed("exit"),
            CommandStep::immediate("ip routing"),
            CommandStep::immediate("aaa new-model"),
        ]),
        _ => steps.extend([
            CommandStep::timed("crypto key generate rsa general-keys modulus 2048")
                .on("replace them", Reply::Text("yes".into())),
            CommandStep::immediate("aaa new-model"),
            CommandStep::immediate(format!("int {}", device.uplink)),
            CommandStep::immediate("no switchport"),
            CommandStep::immediate(format!("ip address {mgt_ip} {mask}")),
            CommandStep::immediate("no shutdown"),
            CommandStep::timed("exit"),
        ]),
    }

    steps.extend([
        CommandStep::immediate("ip ssh version 2"),
        CommandStep::timed("line vty 0 4"),
        CommandStep::immediate("transport input ssh"),
        CommandStep::timed("end"),
    ]);

    Ok(CommandScript::new(
        steps,
        Some(CommandStep::immediate("write memory")),
    ))
}

/// Create VLANs, save, and copy the startup config to a TFTP server.
pub(super) fn vlan_backup(
    device: &DeviceDescriptor,
    credentials: &Credentials,
    job: &VlanBackup,
) -> Result<CommandScript> {
    if !matches!(device.role, DeviceRole::L2Switch | DeviceRole::L3Switch) {
        return Err(unsupported(device));
    }

    let filename = format!("{}_startup_{}.cfg", device.hostname(), job.backup_label);
    let server = job.tftp_server.to_string();

    let mut steps = vec![
        CommandStep::timed("enable").on("password:", Reply::Secret(credentials.secret.clone())),
        CommandStep::timed("configure terminal"),
    ];
    for id in job.vlans.ids() {
        steps.extend([
            CommandStep::immediate(format!("vlan {id}")),
            CommandStep::immediate(format!("name vlan{id}")),
            CommandStep::immediate("exit"),
        ]);
    }
    steps.extend([
        CommandStep::timed("end"),
        CommandStep::immediate("write memory"),
        CommandStep::timed(format!("copy startup-config tftp://{server}/{filename}"))
            .on("address or name of remote host", Reply::Text(server.clone()))
            .on("destination filename", Reply::Text(filename.clone())),
    ]);

    Ok(CommandScript::new(steps, None))
}
