//! Integration tests for npm-accel

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use tempfile::TempDir;

    fn npm_accel() -> Command {
        let mut cmd = cargo_bin_cmd!("npm-accel");
        cmd.env_remove("NPM_ACCEL_CACHE_LIMIT")
            .env_remove("NODE_ENV")
            .env_remove("RUST_LOG")
            .env("NPM_ACCEL_CONFIG", "/nonexistent/npm-accel/config.toml");
        cmd
    }

    #[test]
    fn help_displays() {
        npm_accel()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Accelerator for npm"))
            .stdout(predicate::str::contains("--cache-limit"));
    }

    #[test]
    fn version_displays() {
        npm_accel()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("npm-accel"));
    }

    #[test]
    fn missing_manifest_fails() {
        let project = TempDir::new().unwrap();
        npm_accel()
            .arg(project.path())
            .assert()
            .failure()
            .stderr(predicate::str::contains("Missing package.json"));
    }

    #[test]
    fn invalid_cache_limit_fails() {
        let project = TempDir::new().unwrap();
        npm_accel()
            .args(["--cache-limit", "0"])
            .arg(project.path())
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid cache limit"));
    }

    #[test]
    fn invalid_cache_limit_from_env_fails() {
        let project = TempDir::new().unwrap();
        npm_accel()
            .env("NPM_ACCEL_CACHE_LIMIT", "many")
            .arg(project.path())
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid cache limit"));
    }

    #[test]
    fn unknown_installer_rejected() {
        npm_accel().args(["--installer", "bun"]).assert().failure();
    }

    #[test]
    fn invalid_config_file_fails() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("config.toml");
        std::fs::write(&config, "[cache\n").unwrap();

        npm_accel()
            .env("NPM_ACCEL_CONFIG", &config)
            .arg(dir.path())
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }
}

#[cfg(unix)]
mod install_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    /// A project, a cache directory and a bin directory with fake tools
    struct Sandbox {
        root: TempDir,
    }

    impl Sandbox {
        fn new() -> Self {
            let sandbox = Self {
                root: TempDir::new().unwrap(),
            };
            for dir in [sandbox.bin(), sandbox.project(), sandbox.cache()] {
                fs::create_dir_all(dir).unwrap();
            }
            fs::write(
                sandbox.project().join("package.json"),
                r#"{"name":"demo","dependencies":{"left-pad":"1.3.0"}}"#,
            )
            .unwrap();
            sandbox.script("node", "echo v20.11.0");
            sandbox
        }

        fn bin(&self) -> PathBuf {
            self.root.path().join("bin")
        }

        fn project(&self) -> PathBuf {
            self.root.path().join("project")
        }

        fn cache(&self) -> PathBuf {
            self.root.path().join("cache")
        }

        fn run_log(&self) -> PathBuf {
            self.root.path().join("installer-runs.log")
        }

        fn script(&self, name: &str, body: &str) {
            let path = self.bin().join(name);
            fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        }

        /// Fake npm that records each install and writes one package
        fn working_npm(&self) {
            self.script(
                "npm",
                &format!(
                    r#"if [ "$1" = "--version" ]; then echo 10.2.4; exit 0; fi
echo "$@" >> "{}"
/bin/mkdir -p node_modules/left-pad
echo "module.exports = 1;" > node_modules/left-pad/index.js"#,
                    self.run_log().display()
                ),
            );
        }

        fn installer_runs(&self) -> usize {
            fs::read_to_string(self.run_log())
                .map(|log| log.lines().count())
                .unwrap_or(0)
        }

        fn archives(&self) -> usize {
            fs::read_dir(self.cache())
                .unwrap()
                .filter_map(Result::ok)
                .filter(|e| e.path().extension().is_some_and(|ext| ext == "tar"))
                .count()
        }

        fn command(&self) -> Command {
            let mut cmd = cargo_bin_cmd!("npm-accel");
            cmd.env("PATH", self.bin())
                .env("NPM_ACCEL_CONFIG", self.root.path().join("config.toml"))
                .env_remove("NPM_ACCEL_CACHE_LIMIT")
                .env_remove("NODE_ENV")
                .env_remove("RUST_LOG")
                .arg("--cache-directory")
                .arg(self.cache())
                .arg(self.project());
            cmd
        }
    }

    fn module_file(project: &Path) -> PathBuf {
        project.join("node_modules/left-pad/index.js")
    }

    #[test]
    fn second_run_restores_from_cache() {
        let sandbox = Sandbox::new();
        sandbox.working_npm();

        sandbox
            .command()
            .assert()
            .success()
            .stdout(predicate::str::contains("Installed node_modules with npm"));
        assert_eq!(sandbox.installer_runs(), 1);
        assert_eq!(sandbox.archives(), 1);

        fs::remove_dir_all(sandbox.project().join("node_modules")).unwrap();

        sandbox
            .command()
            .assert()
            .success()
            .stdout(predicate::str::contains("Restored node_modules from cache"));
        assert_eq!(sandbox.installer_runs(), 1);
        assert!(module_file(&sandbox.project()).is_file());
    }

    #[test]
    fn installer_receives_production_flag() {
        let sandbox = Sandbox::new();
        sandbox.working_npm();

        sandbox.command().arg("--production").assert().success();
        sandbox.command().env("NODE_ENV", "production").assert().success();

        let log = fs::read_to_string(sandbox.run_log()).unwrap();
        assert_eq!(log.trim(), "install --production=true");
    }

    #[test]
    fn no_cache_leaves_cache_empty() {
        let sandbox = Sandbox::new();
        sandbox.working_npm();

        sandbox.command().arg("--no-cache").assert().success();

        assert_eq!(sandbox.installer_runs(), 1);
        assert_eq!(sandbox.archives(), 0);
        assert!(module_file(&sandbox.project()).is_file());
    }

    #[test]
    fn update_reinstalls() {
        let sandbox = Sandbox::new();
        sandbox.working_npm();

        sandbox.command().assert().success();
        sandbox.command().arg("--update").assert().success();

        assert_eq!(sandbox.installer_runs(), 2);
        assert_eq!(sandbox.archives(), 1);
    }

    #[test]
    fn cache_limit_evicts_old_archives() {
        let sandbox = Sandbox::new();
        sandbox.working_npm();

        for version in ["1.0.0", "1.1.0", "1.2.0"] {
            fs::write(
                sandbox.project().join("package.json"),
                format!(r#"{{"dependencies":{{"left-pad":"{}"}}}}"#, version),
            )
            .unwrap();
            sandbox.command().args(["--cache-limit", "2"]).assert().success();
        }

        assert_eq!(sandbox.installer_runs(), 3);
        assert_eq!(sandbox.archives(), 2);
    }

    #[test]
    fn failing_installer_reports_error() {
        let sandbox = Sandbox::new();
        sandbox.script(
            "npm",
            r#"if [ "$1" = "--version" ]; then echo 10.2.4; exit 0; fi
echo "npm ERR! 404 Not Found: left-pad@1.3.0" >&2
exit 1"#,
        );

        sandbox
            .command()
            .assert()
            .failure()
            .stderr(predicate::str::contains("Installer command failed"))
            .stderr(predicate::str::contains("404 Not Found"));
        assert_eq!(sandbox.archives(), 0);
    }

    #[test]
    fn explicit_installer_must_exist() {
        let sandbox = Sandbox::new();
        sandbox.working_npm();

        sandbox
            .command()
            .args(["--installer", "pnpm"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Installer not found"));
        assert_eq!(sandbox.installer_runs(), 0);
    }

    #[test]
    fn no_installer_available() {
        let sandbox = Sandbox::new();

        sandbox
            .command()
            .assert()
            .failure()
            .stderr(predicate::str::contains("No supported installer"));
    }

    #[test]
    fn missing_node_fails() {
        let sandbox = Sandbox::new();
        sandbox.working_npm();
        fs::remove_file(sandbox.bin().join("node")).unwrap();

        sandbox
            .command()
            .assert()
            .failure()
            .stderr(predicate::str::contains("Node.js interpreter"));
    }

    #[test]
    fn benchmark_reports_table() {
        let sandbox = Sandbox::new();
        sandbox.working_npm();

        sandbox
            .command()
            .args(["--benchmark", "--iterations", "2"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Benchmark results"))
            .stdout(predicate::str::contains("npm-accel"))
            .stdout(predicate::str::contains("100%"));

        // Two plain npm rounds plus one accelerated miss; the second accelerated round is a hit
        assert_eq!(sandbox.installer_runs(), 3);
        // The benchmark never touches the real cache
        assert_eq!(sandbox.archives(), 0);
    }
}
