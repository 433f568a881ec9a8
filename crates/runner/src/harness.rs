//! Harness file generation
//!
//! Each browser test needs two files in the generated directory under
//! `test/`: an HTML page the engine loads, and a bootstrap script that
//! installs the browser unittest configuration before calling the test's
//! `main`.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use drt_common::{Error, Result, TestDescriptor};

/// Placeholder in harness templates replaced with the bootstrap script path
pub const SCRIPT_PLACEHOLDER: &str = "{{test_script}}";

/// Built-in harness page
pub const DEFAULT_HTML_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
  <head>
    <meta charset="utf-8">
    <title>drt browser test</title>
  </head>
  <body>
    <script type="text/javascript" src="/packages/unittest/test_controller.js"></script>
    <script type="application/dart" src="{{test_script}}"></script>
    <script type="text/javascript" src="/packages/browser/dart.js"></script>
  </body>
</html>
"#;

/// Produces the harness files for a test
#[async_trait]
pub trait HarnessGenerator: Send + Sync {
    /// Write the HTML page; resolves once it exists on disk
    async fn generate_page(&self, descriptor: &TestDescriptor) -> Result<PathBuf>;

    /// Write the bootstrap script; resolves once it exists on disk
    async fn generate_script(&self, descriptor: &TestDescriptor) -> Result<PathBuf>;
}

/// Writes harness files into `<project>/test/<generated_dir>/`
#[derive(Debug, Clone)]
pub struct FileHarnessGenerator {
    generated_dir: String,
}

impl FileHarnessGenerator {
    pub fn new(generated_dir: impl Into<String>) -> Self {
        Self {
            generated_dir: generated_dir.into(),
        }
    }

    pub fn generated_dir(&self) -> &str {
        &self.generated_dir
    }

    async fn write(&self, descriptor: &TestDescriptor, file_name: &str, contents: String) -> Result<PathBuf> {
        let dir = descriptor.generated_dir(&self.generated_dir);
        let path = dir.join(file_name);

        let written = async {
            tokio::fs::create_dir_all(&dir).await?;
            tokio::fs::write(&path, contents).await
        }
        .await;

        match written {
            Ok(()) => {
                debug!("Generated {}", path.display());
                Ok(path)
            }
            Err(e) => Err(Error::GenerationFailed {
                path,
                reason: e.to_string(),
            }),
        }
    }
}

#[async_trait]
impl HarnessGenerator for FileHarnessGenerator {
    async fn generate_page(&self, descriptor: &TestDescriptor) -> Result<PathBuf> {
        let template = match &descriptor.html_harness {
            Some(custom) => tokio::fs::read_to_string(custom)
                .await
                .map_err(|e| Error::GenerationFailed {
                    path: custom.clone(),
                    reason: format!("cannot read html harness: {}", e),
                })?,
            None => DEFAULT_HTML_TEMPLATE.to_string(),
        };

        let page = render_page(&template, &descriptor.script_file_name());
        self.write(descriptor, &descriptor.harness_file_name(), page).await
    }

    async fn generate_script(&self, descriptor: &TestDescriptor) -> Result<PathBuf> {
        let script = render_script(&descriptor.test_import_path());
        self.write(descriptor, &descriptor.script_file_name(), script).await
    }
}

/// Fill the script placeholder of a harness template
pub fn render_page(template: &str, script_path: &str) -> String {
    template.replace(SCRIPT_PLACEHOLDER, script_path)
}

/// Bootstrap that runs the test at `import_path` under the html configuration
pub fn render_script(import_path: &str) -> String {
    format!(
        r#"library drt_generated_test;

import 'package:unittest/html_config.dart';
import '{import_path}' as test;

void main() {{
  useHtmlConfiguration();
  test.main();
}}
"#
    )
}
