use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::process::Command;

use anyhow::Result;

use pipegov::runner::{RUN_INFERENCE_SCRIPT, SET_FAN_SCRIPT, SET_FREQ_SCRIPT};

fn check_tool(name: &str) -> bool {
    Command::new("which")
        .arg(name)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

// PRESENT AND EXECUTABLE BY SOMEONE
fn check_script(dir: &Path, name: &str) -> bool {
    std::fs::metadata(dir.join(name))
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

fn check_board() -> bool {
    let out = match Command::new("adb").args(["-d", "get-state"]).output() {
        Ok(o) => o,
        Err(_) => {
            println!("  board                 adb NOT RUNNABLE (SKIPPED)");
            return true;
        }
    };
    let state = String::from_utf8_lossy(&out.stdout);
    let state = state.trim();
    if out.status.success() && state == "device" {
        println!("  board                 CONNECTED");
        true
    } else {
        println!("  board                 NOT CONNECTED");
        false
    }
}

pub fn run_check(work_dir: &Path) -> Result<()> {
    println!("PIPEGOV DEPENDENCY CHECK");
    println!();

    let mut ok = true;
    for tool in ["adb", "sh"] {
        if check_tool(tool) {
            println!("  {:<24}OK", tool);
        } else {
            println!("  {:<24}MISSING", tool);
            ok = false;
        }
    }
    println!();

    println!("SCRIPTS ({}):", work_dir.display());
    for script in [SET_FREQ_SCRIPT, RUN_INFERENCE_SCRIPT, SET_FAN_SCRIPT] {
        if check_script(work_dir, script) {
            println!("  {:<24}OK", script);
        } else {
            println!("  {:<24}MISSING OR NOT EXECUTABLE", script);
            ok = false;
        }
    }
    println!();

    if check_tool("adb") && !check_board() {
        ok = false;
    }
    println!();

    if ok {
        println!("ALL CHECKS PASSED");
    } else {
        println!("SOME CHECKS FAILED");
        if !check_tool("adb") {
            println!("  Install platform-tools: https://developer.android.com/tools/releases/platform-tools");
        }
        std::process::exit(1);
    }

    Ok(())
}
