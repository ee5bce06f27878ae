/// Restart the node.
///
/// On bare-metal ARM this performs a full system reset and never returns; the
/// next boot re-reads the peer record and re-enters the boot decision. On
/// other targets it only logs, and the caller's session loop re-enters the
/// boot decision in-process with freshly initialized session state, which is
/// equivalent for the protocol.
pub fn restart_node() {
    warn!("Restarting node!");
    // For cortex-m:
    #[cfg(all(
        target_arch = "arm",
        target_os = "none",
        any(target_abi = "eabi", target_abi = "eabihf")
    ))]
    cortex_m::peripheral::SCB::sys_reset();
}
