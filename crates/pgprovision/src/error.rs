//! Diagnostic output for failed runs

use colored::Colorize;
use pgprovision_core::{ErrorKind, ProvisionError, REQUIRED_VARS};

/// Cargo-style diagnostic printed to stderr
///
/// ```text
/// error: Failed to load credentials
///   Required environment variable AZURE_TENANT_ID is not set
///
///   tip: export the service principal before running:
///       AZURE_TENANT_ID AZURE_CLIENT_ID AZURE_CLIENT_SECRET AZURE_SUBSCRIPTION_ID
/// ```
pub struct CliDiagnostic {
    message: String,
    detail: Option<String>,
    tips: Vec<(String, Vec<String>)>,
}

impl CliDiagnostic {
    pub fn error(message: &str) -> Self {
        Self {
            message: message.to_string(),
            detail: None,
            tips: Vec::new(),
        }
    }

    pub fn detail(mut self, text: &str) -> Self {
        self.detail = Some(text.to_string());
        self
    }

    pub fn tip(mut self, description: &str, lines: &[&str]) -> Self {
        self.tips.push((
            description.to_string(),
            lines.iter().map(|s| s.to_string()).collect(),
        ));
        self
    }

    /// Build the diagnostic for a failed provisioning run
    pub fn from_provision_error(err: &ProvisionError) -> Self {
        let diagnostic = Self::error(&err.step.to_string()).detail(&err.source.to_string());
        match err.kind() {
            ErrorKind::EnvironmentMissing => {
                let vars = REQUIRED_VARS.join(" ");
                diagnostic.tip(
                    "export the service principal before running:",
                    &[vars.as_str()],
                )
            }
            ErrorKind::AuthenticationFailure => diagnostic.tip(
                "check the tenant, client id and secret of the service principal",
                &[],
            ),
            ErrorKind::Configuration => diagnostic.tip(
                "check the config file and the endpoint overrides:",
                &["AZURE_AUTHORITY_HOST", "AZURE_RESOURCE_MANAGER_URL"],
            ),
            ErrorKind::RemoteRequestFailure if err.source.is_conflict() => diagnostic.tip(
                "server names are global, try another one:",
                &["pgprovision --server-name <unique-name>"],
            ),
            ErrorKind::RemoteRequestFailure => diagnostic,
        }
    }

    /// Render without colors
    #[cfg(test)]
    pub fn render(&self) -> String {
        self.format("error".to_string(), "tip".to_string(), ": ".to_string())
    }

    /// Print the diagnostic to stderr with colored formatting.
    pub fn print(&self) {
        eprint!(
            "{}",
            self.format(
                "error".red().bold().to_string(),
                "tip".yellow().bold().to_string(),
                ": ".bold().to_string(),
            )
        );
    }

    fn format(&self, error: String, tip: String, separator: String) -> String {
        let mut out = format!("{}{}{}\n", error, separator, self.message);
        if let Some(detail) = &self.detail {
            out.push_str(&format!("  {}\n", detail));
        }
        for (description, lines) in &self.tips {
            out.push_str(&format!("\n  {}{}{}\n", tip, separator, description));
            for line in lines {
                out.push_str(&format!("      {}\n", line));
            }
        }
        out
    }
}
