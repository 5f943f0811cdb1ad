use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{anyhow, Context, Result};

pub const GCC_DATA_ROOT: &str = "/usr/share/gcc-data";

pub fn discover_gcc_info_dir() -> Option<PathBuf> {
    discover_gcc_info_dir_with_runner(Path::new(GCC_DATA_ROOT), capture_stdout)
}

/// `<data_root>/<machine>/<version>/info` as reported by the active gcc, if
/// that directory exists.
pub fn discover_gcc_info_dir_with_runner<RunCommand>(
    data_root: &Path,
    mut run: RunCommand,
) -> Option<PathBuf>
where
    RunCommand: FnMut(&mut Command, &str) -> Result<String>,
{
    let machine = query_gcc(&mut run, "-dumpmachine")?;
    let version = query_gcc(&mut run, "-dumpversion")?;
    let info_dir = data_root.join(machine).join(version).join("info");
    if info_dir.is_dir() {
        return Some(info_dir);
    }
    tracing::debug!(
        target: "clashguard.cli.discovery",
        path = %info_dir.display(),
        "gcc info directory not present"
    );
    None
}

fn query_gcc<RunCommand>(run: &mut RunCommand, flag: &str) -> Option<String>
where
    RunCommand: FnMut(&mut Command, &str) -> Result<String>,
{
    let mut command = Command::new("gcc");
    command.arg(flag);
    match run(&mut command, &format!("gcc {flag}")) {
        Ok(output) => {
            let value = output.trim();
            // Used as a single path component.
            if value.is_empty() || value.contains('/') || value == ".." {
                return None;
            }
            Some(value.to_string())
        }
        Err(err) => {
            tracing::debug!(target: "clashguard.cli.discovery", error = %err, "gcc query failed");
            None
        }
    }
}

pub fn build_bashrc_query_command(bashrc_files: &[&str], key: &str) -> Command {
    let mut script = String::new();
    for file in bashrc_files {
        script.push_str(&format!("source {} >/dev/null 2>&1; ", shell_quote(file)));
    }
    script.push_str(&format!("printf '%s' \"${{{key}}}\""));

    let mut command = Command::new("bash");
    command.arg("-c").arg(script);
    command
}

/// Value of `key` after sourcing each file listed in `bashrc_files`.
pub fn read_bashrc_var_with_runner<RunCommand>(
    bashrc_files: &str,
    key: &str,
    mut run: RunCommand,
) -> Option<String>
where
    RunCommand: FnMut(&mut Command, &str) -> Result<String>,
{
    if !is_shell_identifier(key) {
        return None;
    }
    let files: Vec<&str> = bashrc_files.split_whitespace().collect();
    if files.is_empty() {
        return None;
    }

    let mut command = build_bashrc_query_command(&files, key);
    match run(&mut command, &format!("failed to read {key} from bashrc files")) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::debug!(
                target: "clashguard.cli.discovery",
                key,
                error = %err,
                "bashrc query failed"
            );
            None
        }
    }
}

pub fn capture_stdout(command: &mut Command, context_message: &str) -> Result<String> {
    let output = command
        .output()
        .with_context(|| format!("{context_message}: command failed to start"))?;
    if output.status.success() {
        return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    Err(anyhow!(
        "{context_message}: status={} stderr='{}'",
        output.status,
        stderr.trim()
    ))
}

fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}

fn is_shell_identifier(key: &str) -> bool {
    let mut chars = key.chars();
    matches!(chars.next(), Some(c) if c == '_' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}
