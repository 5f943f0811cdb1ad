use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{anyhow, Result};
use clashguard_check::{CheckPhase, Verdict};
use clashguard_core::{CheckError, FIXED_INFO_INDEX};
use clashguard_installed::{RepositoryConfig, INSTALLED_REPO, UNPACKAGED_REPO};

use crate::config::CheckConfig;
use crate::discovery::{
    build_bashrc_query_command, discover_gcc_info_dir_with_runner, read_bashrc_var_with_runner,
};
use crate::dispatch::run_check;
use crate::hook_env::{
    build_ignore_set, build_request, collision_ignore_with_runner, target_root, InstallVars,
    RequestOverrides,
};
use crate::render::{
    format_verdict_lines, ordinal, render_progress_marker, render_status_line,
    resolve_output_style, OutputStyle, TerminalObserver, TerminalRenderer,
};
use crate::OutputFormat;

static TEST_DIR_COUNTER: AtomicU64 = AtomicU64::new(0);

fn build_test_dir_path(nanos: u128) -> PathBuf {
    let mut path = std::env::temp_dir();
    path.push(format!(
        "clashguard-cli-tests-{}-{}-{}",
        std::process::id(),
        nanos,
        TEST_DIR_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));
    path
}

fn test_dir() -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system time")
        .as_nanos();
    let path = build_test_dir_path(nanos);
    fs::create_dir_all(&path).expect("must create test dir");
    path
}

fn write_file(base: &Path, logical: &str) {
    let path = base.join(logical.trim_start_matches('/'));
    fs::create_dir_all(path.parent().expect("file must have parent")).expect("must create parent");
    fs::write(&path, b"payload").expect("must write file");
}

fn vars(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

fn hook_vars(image: &Path, root: &Path) -> BTreeMap<String, String> {
    let mut vars = vars(&[
        ("CATEGORY", "app-misc"),
        ("PN", "foo"),
        ("PVR", "1.0"),
        ("SLOT", "0"),
        ("COLLISION_IGNORE", ""),
    ]);
    vars.insert("IMAGE".to_string(), image.to_string_lossy().into_owned());
    vars.insert("ROOT".to_string(), root.to_string_lossy().into_owned());
    vars
}

fn offline_config() -> CheckConfig {
    CheckConfig {
        discover_info_dir: false,
        ..CheckConfig::default()
    }
}

#[test]
fn build_test_dir_path_disambiguates_same_timestamp_calls() {
    assert_ne!(build_test_dir_path(42), build_test_dir_path(42));
}

#[test]
fn require_treats_empty_values_as_missing() {
    let vars = vars(&[("PN", "")]);
    let err = vars.require("PN").expect_err("empty PN must be rejected");
    assert!(matches!(err, CheckError::MissingVariable(ref key) if key == "PN"));
    assert_eq!(vars.get_or_empty("CONFIG_PROTECT"), "");
}

#[test]
fn build_request_reports_first_missing_variable() {
    let err = build_request(&vars(&[("CATEGORY", "app-misc")]), &RequestOverrides::default())
        .expect_err("request without IMAGE must fail");
    assert!(matches!(err, CheckError::MissingVariable(ref key) if key == "IMAGE"));

    let err = build_request(
        &vars(&[("IMAGE", "/tmp/image"), ("CATEGORY", "app-misc"), ("PN", "foo")]),
        &RequestOverrides::default(),
    )
    .expect_err("request without PVR must fail");
    assert!(matches!(err, CheckError::MissingVariable(ref key) if key == "PVR"));
}

#[test]
fn build_request_applies_defaults() {
    let request = build_request(
        &vars(&[
            ("IMAGE", "/tmp/image"),
            ("CATEGORY", "app-misc"),
            ("PN", "foo"),
            ("PVR", "1.2-r1"),
        ]),
        &RequestOverrides::default(),
    )
    .expect("request must build");

    assert_eq!(request.slot, "0");
    assert_eq!(request.root, PathBuf::from("/"));
    assert_eq!(request.destination_repo, INSTALLED_REPO);
    assert_eq!(request.version.revision(), 1);
    assert_eq!(
        request.installing().to_string(),
        "app-misc/foo-1.2-r1:0::installed"
    );
}

#[test]
fn build_request_routes_importare_to_unpackaged_repository() {
    let request = build_request(
        &vars(&[
            ("IMAGE", "/tmp/image"),
            ("CATEGORY", "app-misc"),
            ("PN", "foo"),
            ("PVR", "1.0"),
            ("PALUDIS_CLIENT", "importare"),
        ]),
        &RequestOverrides::default(),
    )
    .expect("request must build");
    assert_eq!(request.destination_repo, UNPACKAGED_REPO);
}

#[test]
fn build_request_prefers_command_line_overrides() {
    let overrides = RequestOverrides {
        root: Some(PathBuf::from("/mnt/target")),
        image: Some(PathBuf::from("/var/tmp/image")),
        destination_repo: Some("custom".to_string()),
    };
    let request = build_request(
        &vars(&[
            ("IMAGE", "/tmp/image"),
            ("ROOT", "/"),
            ("CATEGORY", "app-misc"),
            ("PN", "foo"),
            ("PVR", "1.0"),
        ]),
        &overrides,
    )
    .expect("request must build");

    assert_eq!(request.root, PathBuf::from("/mnt/target"));
    assert_eq!(request.image, PathBuf::from("/var/tmp/image"));
    assert_eq!(request.destination_repo, "custom");
}

#[test]
fn build_request_rejects_unparsable_version() {
    let err = build_request(
        &vars(&[
            ("IMAGE", "/tmp/image"),
            ("CATEGORY", "app-misc"),
            ("PN", "foo"),
            ("PVR", "one.two"),
        ]),
        &RequestOverrides::default(),
    )
    .expect_err("bad PVR must fail");
    assert!(
        matches!(err, CheckError::InvalidVersion { ref variable, ref value, .. } if variable == "PVR" && value == "one.two")
    );
}

#[test]
fn target_root_defaults_to_slash() {
    assert_eq!(
        target_root(&vars(&[("ROOT", "")]), &RequestOverrides::default()),
        PathBuf::from("/")
    );
    assert_eq!(
        target_root(&vars(&[("ROOT", "/mnt/gentoo")]), &RequestOverrides::default()),
        PathBuf::from("/mnt/gentoo")
    );
}

#[test]
fn build_ignore_set_unions_sources_in_order() {
    let vars = vars(&[
        ("CONFIG_PROTECT_MASK", "/etc/env.d /etc/gconf"),
        ("CONFIG_PROTECT", "/etc /opt/etc /etc/env.d"),
    ]);
    let config = CheckConfig {
        extra_ignore: vec!["/var/cache/extra".to_string()],
        ..offline_config()
    };
    let ignore = build_ignore_set(
        &vars,
        "/opt/games /etc",
        &config,
        Some(Path::new("/usr/share/gcc-data/x86_64-pc-linux-gnu/13/info")),
    );

    assert_eq!(
        ignore.prefixes(),
        [
            "/opt/games",
            "/etc",
            "/etc/env.d",
            "/etc/gconf",
            "/opt/etc",
            FIXED_INFO_INDEX,
            "/usr/share/gcc-data/x86_64-pc-linux-gnu/13/info/dir",
            "/var/cache/extra",
        ]
    );
}

#[test]
fn build_ignore_set_without_info_dir_keeps_fixed_index() {
    let ignore = build_ignore_set(&vars(&[]), "", &offline_config(), None);
    assert_eq!(ignore.prefixes(), [FIXED_INFO_INDEX]);
}

#[test]
fn collision_ignore_prefers_environment_value() {
    let vars = vars(&[
        ("COLLISION_IGNORE", "/lib/modules"),
        ("PALUDIS_BASHRC_FILES", "/etc/paludis/bashrc"),
    ]);
    let value = collision_ignore_with_runner(&vars, |_: &mut Command, _: &str| -> Result<String> {
        panic!("bashrc must not be sourced when the variable is exported")
    });
    assert_eq!(value, "/lib/modules");
}

#[test]
fn collision_ignore_sources_bashrc_files() {
    let vars = vars(&[(
        "PALUDIS_BASHRC_FILES",
        "/etc/paludis/bashrc /etc/paludis/it's.bash",
    )]);
    let mut seen_script = String::new();
    let value = collision_ignore_with_runner(&vars, |command: &mut Command, _: &str| {
        assert_eq!(command.get_program(), "bash");
        seen_script = command
            .get_args()
            .last()
            .map(|arg| arg.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok("/opt/ignored".to_string())
    });

    assert_eq!(value, "/opt/ignored");
    assert!(seen_script.contains("source '/etc/paludis/bashrc'"));
    assert!(seen_script.contains("source '/etc/paludis/it'\\''s.bash'"));
    assert!(seen_script.ends_with("printf '%s' \"${COLLISION_IGNORE}\""));
}

#[test]
fn collision_ignore_is_empty_when_bashrc_query_fails() {
    let vars = vars(&[("PALUDIS_BASHRC_FILES", "/etc/paludis/bashrc")]);
    let value = collision_ignore_with_runner(&vars, |_: &mut Command, context: &str| {
        Err(anyhow!("{context}: status=1"))
    });
    assert_eq!(value, "");
}

#[test]
fn read_bashrc_var_skips_shell_without_files_or_with_bad_key() {
    let mut calls = 0;
    let mut run = |_: &mut Command, _: &str| -> Result<String> {
        calls += 1;
        Ok(String::new())
    };
    assert_eq!(read_bashrc_var_with_runner("", "COLLISION_IGNORE", &mut run), None);
    assert_eq!(read_bashrc_var_with_runner("/etc/bashrc", "BAD KEY", &mut run), None);
    assert_eq!(calls, 0);
}

#[test]
fn bashrc_query_command_prints_requested_key() {
    let command = build_bashrc_query_command(&["/etc/a"], "CONFIG_PROTECT");
    let args: Vec<String> = command
        .get_args()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();
    assert_eq!(args[0], "-c");
    assert_eq!(
        args[1],
        "source '/etc/a' >/dev/null 2>&1; printf '%s' \"${CONFIG_PROTECT}\""
    );
}

fn fake_gcc(machine: &'static str) -> impl FnMut(&mut Command, &str) -> Result<String> {
    move |command: &mut Command, _: &str| -> Result<String> {
        let flag = command
            .get_args()
            .next()
            .map(|arg| arg.to_string_lossy().into_owned())
            .unwrap_or_default();
        match flag.as_str() {
            "-dumpmachine" => Ok(format!("{machine}\n")),
            "-dumpversion" => Ok("13\n".to_string()),
            other => Err(anyhow!("unexpected gcc flag {other}")),
        }
    }
}

#[test]
fn discover_gcc_info_dir_uses_machine_and_version() {
    let data_root = test_dir();
    let info_dir = data_root.join("x86_64-pc-linux-gnu").join("13").join("info");
    fs::create_dir_all(&info_dir).expect("must create info dir");

    let found = discover_gcc_info_dir_with_runner(&data_root, fake_gcc("x86_64-pc-linux-gnu"));
    assert_eq!(found, Some(info_dir));

    let _ = fs::remove_dir_all(&data_root);
}

#[test]
fn discover_gcc_info_dir_requires_existing_directory() {
    let data_root = test_dir();
    assert_eq!(
        discover_gcc_info_dir_with_runner(&data_root, fake_gcc("x86_64-pc-linux-gnu")),
        None
    );
    let _ = fs::remove_dir_all(&data_root);
}

#[test]
fn discover_gcc_info_dir_ignores_failed_or_suspicious_output() {
    let data_root = test_dir();
    fs::create_dir_all(data_root.join("13").join("info")).expect("must create dir");

    let failing = |_: &mut Command, context: &str| -> Result<String> {
        Err(anyhow!("{context}: command failed to start"))
    };
    assert_eq!(discover_gcc_info_dir_with_runner(&data_root, failing), None);
    assert_eq!(discover_gcc_info_dir_with_runner(&data_root, fake_gcc("..")), None);
    assert_eq!(discover_gcc_info_dir_with_runner(&data_root, fake_gcc("a/b")), None);

    let _ = fs::remove_dir_all(&data_root);
}

#[test]
fn config_defaults_enable_discovery_and_standard_interval() {
    let config = CheckConfig::from_toml_str("").expect("empty config must parse");
    assert_eq!(config, CheckConfig::default());
    assert!(config.discover_info_dir);
    assert_eq!(config.progress_interval, 500);

    let repositories = config.repositories_for(Path::new("/mnt/root"));
    assert_eq!(repositories[0].name, INSTALLED_REPO);
    assert_eq!(repositories[0].location, PathBuf::from("/mnt/root/var/db/pkg"));
    assert_eq!(repositories[1].name, UNPACKAGED_REPO);
}

#[test]
fn config_parses_repositories_and_ignores() {
    let config = CheckConfig::from_toml_str(
        r#"
extra_ignore = ["/usr/lib/debug"]
discover_info_dir = false
progress_interval = 100

[[repositories]]
name = "installed"
location = "/srv/pkgdb"
"#,
    )
    .expect("config must parse");

    assert_eq!(config.extra_ignore, vec!["/usr/lib/debug".to_string()]);
    assert!(!config.discover_info_dir);
    assert_eq!(config.progress_interval, 100);
    assert_eq!(
        config.repositories_for(Path::new("/")),
        vec![RepositoryConfig::new("installed", "/srv/pkgdb")]
    );
}

#[test]
fn config_rejects_unknown_keys() {
    assert!(CheckConfig::from_toml_str("collision_ignore = \"/\"").is_err());
}

#[test]
fn config_load_reports_missing_file() {
    let dir = test_dir();
    let err = CheckConfig::load(Some(dir.join("absent.toml").as_path())).expect_err("must fail");
    assert!(err.to_string().contains("failed to read config"));
    assert_eq!(
        CheckConfig::load(None).expect("no file means defaults"),
        CheckConfig::default()
    );
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn resolve_output_style_follows_stdout_terminal() {
    assert_eq!(resolve_output_style(true), OutputStyle::Rich);
    assert_eq!(resolve_output_style(false), OutputStyle::Plain);
}

#[test]
fn render_status_line_plain_is_unadorned() {
    assert_eq!(
        render_status_line(OutputStyle::Plain, "ok", "No collision detected, continuing"),
        "No collision detected, continuing"
    );
}

#[test]
fn render_status_line_rich_includes_ascii_badge() {
    assert_eq!(
        render_status_line(OutputStyle::Rich, "fail", "Collisions detected, aborting"),
        "[FAIL] Collisions detected, aborting"
    );
}

#[test]
fn format_verdict_lines_badges_only_closing_line() {
    let verdict = Verdict {
        exit_status: 1,
        message: "Detected collisions:\n  Orphaned files (attributed to x):\n    /a\nCollisions detected, aborting"
            .to_string(),
        collisions: Vec::new(),
    };
    let lines = format_verdict_lines(&verdict, OutputStyle::Rich);
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "Detected collisions:");
    assert_eq!(lines[3], "[FAIL] Collisions detected, aborting");

    let lines = format_verdict_lines(&Verdict::clear(), OutputStyle::Plain);
    assert_eq!(lines, vec!["No collision detected, continuing".to_string()]);
}

#[test]
fn progress_marker_uses_english_ordinals() {
    assert_eq!(render_progress_marker(500), "...on 500th target...");
    assert_eq!(ordinal(1), "1st");
    assert_eq!(ordinal(22), "22nd");
    assert_eq!(ordinal(103), "103rd");
    assert_eq!(ordinal(111), "111th");
    assert_eq!(ordinal(212), "212th");
}

#[test]
fn terminal_observer_tracks_phase() {
    let mut observer = TerminalObserver::new(TerminalRenderer::from_style(OutputStyle::Plain));
    assert_eq!(observer.current_phase(), CheckPhase::Idle);
    clashguard_check::CheckObserver::phase(&mut observer, CheckPhase::Clear);
    assert_eq!(observer.current_phase(), CheckPhase::Clear);
}

#[test]
fn run_check_skips_when_root_is_ignored() {
    let vars = vars(&[("ROOT", "/"), ("COLLISION_IGNORE", "/lib/modules /")]);
    let verdict = run_check(
        &vars,
        &RequestOverrides::default(),
        &offline_config(),
        OutputFormat::Json,
        TerminalRenderer::from_style(OutputStyle::Plain),
    )
    .expect("skip needs no package variables");

    assert_eq!(verdict.exit_status, 0);
    assert_eq!(
        verdict.message,
        "${COLLISION_IGNORE} contains \"/\", skipping collision check"
    );
}

#[test]
fn run_check_reports_orphaned_collision() {
    let base = test_dir();
    let image = base.join("image");
    let root = base.join("root");
    write_file(&image, "/usr/bin/foo");
    write_file(&image, "/usr/share/foo/data");
    write_file(&root, "/usr/bin/foo");

    let verdict = run_check(
        &hook_vars(&image, &root),
        &RequestOverrides::default(),
        &offline_config(),
        OutputFormat::Json,
        TerminalRenderer::from_style(OutputStyle::Plain),
    )
    .expect("check must run");

    assert_eq!(verdict.exit_status, 1);
    assert!(verdict
        .message
        .contains("  Orphaned files (attributed to app-misc/foo-1.0:0::installed):"));
    assert!(verdict.message.contains("    /usr/bin/foo"));
    assert!(!verdict.message.contains("/usr/share/foo/data"));
    assert!(verdict.message.ends_with("Collisions detected, aborting"));
    assert_eq!(verdict.collisions.len(), 1);
    assert!(verdict.collisions[0].orphaned);

    let _ = fs::remove_dir_all(&base);
}

#[test]
fn run_check_clears_when_target_is_empty() {
    let base = test_dir();
    let image = base.join("image");
    let root = base.join("root");
    write_file(&image, "/usr/bin/foo");
    fs::create_dir_all(&root).expect("must create root");

    let verdict = run_check(
        &hook_vars(&image, &root),
        &RequestOverrides::default(),
        &offline_config(),
        OutputFormat::Json,
        TerminalRenderer::from_style(OutputStyle::Plain),
    )
    .expect("check must run");

    assert_eq!(verdict, Verdict::clear());
    let _ = fs::remove_dir_all(&base);
}

#[test]
fn run_check_fails_on_unreadable_image() {
    let base = test_dir();
    let root = base.join("root");
    fs::create_dir_all(&root).expect("must create root");

    let err = run_check(
        &hook_vars(&base.join("missing-image"), &root),
        &RequestOverrides::default(),
        &offline_config(),
        OutputFormat::Json,
        TerminalRenderer::from_style(OutputStyle::Plain),
    )
    .expect_err("missing image must abort");
    let verdict = Verdict::failed(format!("{err:#}"));
    assert_eq!(verdict.exit_status, 1);
    assert!(verdict.message.starts_with("Collision check failed: "));
    assert!(verdict.message.contains("failed to read staging tree"));

    let _ = fs::remove_dir_all(&base);
}
