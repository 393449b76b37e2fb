#![allow(dead_code)]

use std::{
    env,
    fs::{self, create_dir},
    path::{Path, PathBuf},
    process::{Command, ExitStatus},
};

use anyhow::{bail, Context as _, Result};

use p12_data_formats::test_helpers::{generate_key, self_signed};

const KEY_NAMES: &[&str] = &["server", "intermediate", "root"];

pub struct TestContext {
    testpath: PathBuf,

    // Kept last so everything else can use testpath before it is removed
    #[allow(dead_code)]
    testdir: Option<tempfile::TempDir>,
}

impl TestContext {
    pub fn new() -> Result<Self> {
        let testdir = tempfile::Builder::new()
            .prefix("p12-bundle-tool-test-")
            .tempdir()
            .context("Error creating temporary directory")?;
        let (testdir, testpath) = if env::var("BUNDLE_TOOL_TEST_KEEP_FOLDER").is_ok() {
            println!("Keeping test folder at {:?}", testdir.path());
            (None, testdir.into_path())
        } else {
            let path = testdir.path().to_owned();
            (Some(testdir), path)
        };

        let new_context = TestContext { testpath, testdir };
        new_context.create_keys().context("Error creating keys")?;

        Ok(new_context)
    }

    pub fn testpath(&self) -> &Path {
        &self.testpath
    }

    pub fn keys_path(&self) -> PathBuf {
        self.testpath.join("keys")
    }

    pub fn key_path(&self, name: &str) -> String {
        self.keys_path()
            .join(format!("{}_key.der", name))
            .to_string_lossy()
            .into_owned()
    }

    pub fn cert_path(&self, name: &str) -> String {
        self.keys_path()
            .join(format!("{}_cert.pem", name))
            .to_string_lossy()
            .into_owned()
    }

    pub fn path(&self, name: &str) -> String {
        self.testpath.join(name).to_string_lossy().into_owned()
    }

    pub fn config_path(&self) -> PathBuf {
        self.testpath.join("bundle-tool.yml")
    }

    pub fn write_config(&self, contents: &str) -> Result<()> {
        fs::write(self.config_path(), contents).context("Error writing configuration file")
    }

    fn create_keys(&self) -> Result<()> {
        let keys_path = self.keys_path();
        create_dir(&keys_path).context("Error creating keys directory")?;

        for key_name in KEY_NAMES {
            let private_key = generate_key().context("Error generating private key")?;
            let cert =
                self_signed(key_name, &private_key).context("Error creating certificate")?;

            let private_key = private_key
                .private_key_to_der()
                .context("Error converting private key to DER")?;
            let cert = cert
                .to_pem()
                .context("Error converting certificate to PEM")?;

            fs::write(keys_path.join(format!("{}_key.der", key_name)), private_key)
                .context("Error writing private key")?;
            fs::write(keys_path.join(format!("{}_cert.pem", key_name)), cert)
                .context("Error writing certificate")?;
        }

        Ok(())
    }

    pub fn run_bundle_tool(&self, args: &[&str]) -> Result<TestClientResult> {
        let output = Command::new(env!("CARGO_BIN_EXE_p12-bundle-tool"))
            .current_dir(&self.testpath)
            .env("LOG_LEVEL", "trace")
            .env("BUNDLE_TOOL_CONF", self.config_path())
            .env(
                "BUNDLE_TOOL_CONF_DIR",
                self.testpath.join("bundle-tool.conf.d").join("*.yml"),
            )
            .args(args)
            .output()
            .context("Error running bundle tool")?;

        TestClientResult::new(args, output.status, output.stdout, output.stderr)
    }
}

#[derive(Debug)]
pub struct TestClientResult {
    command: String,
    status: ExitStatus,
    stdout: Vec<String>,
    stderr: Vec<String>,
}

impl TestClientResult {
    fn new(args: &[&str], status: ExitStatus, stdout: Vec<u8>, stderr: Vec<u8>) -> Result<Self> {
        let command = args.join(" ");
        let stdout: Vec<String> = String::from_utf8(stdout)
            .context("Non-UTF-8 stdout")?
            .lines()
            .map(String::from)
            .collect();
        let stderr: Vec<String> = String::from_utf8_lossy(&stderr)
            .lines()
            .map(String::from)
            .collect();

        println!("Command '{}' succeeded: {}", command, status.success());
        println!("=========================================");
        for line in &stdout {
            println!("{}", line);
        }
        println!("=========================================");
        for line in &stderr {
            println!("{}", line);
        }
        println!("=========================================");

        Ok(TestClientResult {
            command,
            status,
            stdout,
            stderr,
        })
    }

    pub fn expect_success(&self) -> Result<()> {
        if self.status.success() {
            Ok(())
        } else {
            bail!("Command '{}' failed", self.command);
        }
    }

    pub fn expect_failure(&self) -> Result<()> {
        if self.status.success() {
            bail!("Command '{}' succeeded unexpectedly", self.command);
        } else {
            Ok(())
        }
    }

    pub fn stdout(&self) -> &[String] {
        &self.stdout
    }

    fn expect_line(&self, output: &[String], line: &str) -> Result<()> {
        if output.iter().any(|outputline| outputline.contains(line)) {
            Ok(())
        } else {
            bail!("Expected line {} not found in output", line);
        }
    }

    pub fn expect_stdout_line(&self, line: &str) -> Result<()> {
        self.expect_line(&self.stdout, line)
    }

    pub fn expect_stderr_line(&self, line: &str) -> Result<()> {
        self.expect_line(&self.stderr, line)
    }

    pub fn expect_not_stdout_line(&self, line: &str) -> Result<()> {
        if self.expect_line(&self.stdout, line).is_ok() {
            bail!("Expected line {} found in output", line);
        }
        Ok(())
    }
}
