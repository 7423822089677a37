//! Check command implementation.
//!
//! Validates /proc access, parsing and configuration against a live process.

use herakles_proc_watch::process::{children, cpu_usage, is_running, memory_usage, process_state};
use herakles_proc_watch::ProcessHandle;
use nix::unistd::geteuid;

use crate::config::{validate_effective_config, Config};

/// Probes every reader against `pid` (or this process) and prints a summary.
///
/// Returns `Ok(false)` when any check failed.
pub fn command_check(pid: Option<u32>, config: &Config) -> anyhow::Result<bool> {
    println!("🔍 Herakles Process Watch - System Check");
    println!("========================================");

    let procfs = config.procfs();
    let pid = pid.unwrap_or_else(std::process::id);
    let mut all_ok = true;

    if geteuid().is_root() {
        println!("\n👤 Running as root - all processes are observable");
    } else {
        println!("\n👤 Running as uid {} - foreign processes may be unreadable", geteuid());
    }

    println!("\n📁 Checking {} ...", procfs.root().display());
    match procfs.pids() {
        Ok(pids) if !pids.is_empty() => {
            println!("   ✅ Can list {} process entries", pids.len());
        }
        Ok(_) => {
            println!("   ❌ No process entries found");
            all_ok = false;
        }
        Err(e) => {
            println!("   ❌ Cannot list process entries: {}", e);
            all_ok = false;
        }
    }
    match procfs.read_uptime() {
        Ok(uptime) => println!("   ✅ uptime readable ({:.0}s)", uptime),
        Err(e) => {
            println!("   ❌ uptime unreadable: {}", e);
            all_ok = false;
        }
    }

    println!("\n🧭 Checking process {} ...", pid);
    match ProcessHandle::open_with(procfs.clone(), pid, config.retry_policy()) {
        Ok(mut handle) => match handle.status() {
            Ok(status) => println!(
                "   ✅ status parsed: name={} VmSize={} kB",
                status.name, status.vm_size_kb
            ),
            Err(e) => {
                println!("   ❌ status parsing failed: {}", e);
                all_ok = false;
            }
        },
        Err(e) => {
            println!("   ❌ Cannot open status: {}", e);
            all_ok = false;
        }
    }

    match is_running(pid) {
        Ok(true) => println!("   ✅ liveness probe: running"),
        Ok(false) => {
            println!("   ❌ liveness probe: not running");
            all_ok = false;
        }
        Err(e) => {
            println!("   ❌ liveness probe failed: {}", e);
            all_ok = false;
        }
    }

    match process_state(&procfs, pid) {
        Ok(state) => println!("   ✅ scheduler state: {}", state),
        Err(e) => {
            println!("   ❌ scheduler state unreadable: {}", e);
            all_ok = false;
        }
    }

    println!("\n💾 Checking memory and CPU accounting...");
    if procfs.pid_file(pid, "smaps_rollup").exists() {
        println!("   ✅ smaps_rollup available (fast path)");
    } else if procfs.pid_file(pid, "smaps").exists() {
        println!("   ✅ smaps available (slow path)");
    } else {
        println!("   ❌ No memory maps accessible");
        all_ok = false;
    }

    match children(&procfs, pid) {
        Ok(kids) => println!("   ✅ {} direct children", kids.len()),
        Err(e) => {
            println!("   ❌ Child discovery failed: {}", e);
            all_ok = false;
        }
    }

    match memory_usage(&procfs, pid) {
        Ok(mem) => println!(
            "   ✅ Memory parsing successful: RSS={} kB, RSS+Swap={} kB",
            mem.rss_kb, mem.rss_swap_kb
        ),
        Err(e) => {
            println!("   ❌ Memory parsing failed: {}", e);
            all_ok = false;
        }
    }

    match cpu_usage(&procfs, pid) {
        Ok(cpu) => println!("   ✅ CPU sampling successful: {:.1}%", cpu.percentage),
        Err(e) => {
            println!("   ❌ CPU sampling failed: {}", e);
            all_ok = false;
        }
    }

    println!("\n⚙️  Checking configuration...");
    match validate_effective_config(config) {
        Ok(_) => println!("   ✅ Configuration is valid"),
        Err(e) => {
            println!("   ❌ Configuration invalid: {}", e);
            all_ok = false;
        }
    }

    println!("\n📋 Summary:");
    if all_ok {
        println!("   ✅ All checks passed - process is observable");
    } else {
        println!("   ❌ Some checks failed - please review the output above");
    }
    Ok(all_ok)
}
