//! Colored output helpers for CLI
//!
//! Provides consistent, colored terminal output for the quorum-server CLI.

use crate::types::{OrchestrateResponse, ProviderCheck, ProviderSummary, ResultStatus};
use owo_colors::OwoColorize;

const COLUMN_WIDTH: usize = 15;

/// Output style configuration
pub struct Output {
    /// Whether to use colored output
    pub colored: bool,
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

impl Output {
    /// Create a new output helper with colors enabled
    pub fn new() -> Self {
        Self { colored: true }
    }

    /// Create a new output helper with colors disabled
    pub fn no_color() -> Self {
        Self { colored: false }
    }

    /// Print the Quorum banner
    pub fn banner(&self) {
        let art = [
            "  ___  _   _  ___  ____  _   _ __  __ ",
            " / _ \\| | | |/ _ \\|  _ \\| | | |  \\/  |",
            "| | | | | | | | | | |_) | | | | |\\/| |",
            "| |_| | |_| | |_| |  _ <| |_| | |  | |",
            " \\__\\_\\\\___/ \\___/|_| \\_\\\\___/|_|  |_|",
        ];

        println!();
        if self.colored {
            for (i, line) in art.iter().enumerate() {
                if i < 2 {
                    println!("   {}", line.bright_magenta().bold());
                } else {
                    println!("   {}", line.magenta().bold());
                }
            }
            println!(
                "\n   {} {}\n",
                "Multi-provider inference orchestration".bright_white().bold(),
                format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
            );
        } else {
            for line in art {
                println!("   {}", line);
            }
            println!(
                "\n   Multi-provider inference orchestration v{}\n",
                env!("CARGO_PKG_VERSION")
            );
        }
    }

    /// Print a success message with a checkmark
    pub fn success(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "✓".green().bold(), message.green());
        } else {
            println!("  [OK] {}", message);
        }
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "•".blue(), message);
        } else {
            println!("  [INFO] {}", message);
        }
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "⚠".yellow().bold(), message.yellow());
        } else {
            println!("  [WARN] {}", message);
        }
    }

    /// Print an error message
    pub fn error(&self, message: &str) {
        if self.colored {
            eprintln!("  {} {}", "✗".red().bold(), message.red());
        } else {
            eprintln!("  [ERROR] {}", message);
        }
    }

    /// Print a file creation message
    pub fn created(&self, file_type: &str, path: &str) {
        if self.colored {
            println!(
                "  {} {} {}",
                "✓".green().bold(),
                file_type.dimmed(),
                path.bright_white()
            );
        } else {
            println!("  [CREATED] {} {}", file_type, path);
        }
    }

    /// Print a header for a section
    pub fn header(&self, title: &str) {
        if self.colored {
            println!("\n  {}", title.bright_white().bold().underline());
        } else {
            println!("\n  === {} ===", title);
        }
    }

    /// Print a subheader
    pub fn subheader(&self, title: &str) {
        if self.colored {
            println!("\n  {}", title.cyan().bold());
        } else {
            println!("\n  --- {} ---", title);
        }
    }

    /// Print a key-value pair
    pub fn kv(&self, key: &str, value: &str) {
        if self.colored {
            println!("    {}: {}", key.dimmed(), value.bright_white());
        } else {
            println!("    {}: {}", key, value);
        }
    }

    /// Print a list item
    pub fn list_item(&self, item: &str) {
        if self.colored {
            println!("    {} {}", "•".blue(), item);
        } else {
            println!("    - {}", item);
        }
    }

    /// Print a hint/tip message
    pub fn hint(&self, message: &str) {
        if self.colored {
            println!("\n  {} {}", "💡".dimmed(), message.dimmed().italic());
        } else {
            println!("\n  [TIP] {}", message);
        }
    }

    /// Print a command suggestion
    pub fn command(&self, cmd: &str) {
        if self.colored {
            println!("     {}", format!("$ {}", cmd).bright_cyan());
        } else {
            println!("     $ {}", cmd);
        }
    }

    /// Print completion message
    pub fn complete(&self, message: &str) {
        if self.colored {
            println!("\n  {} {}", "🚀".green(), message.bright_green().bold());
        } else {
            println!("\n  [DONE] {}", message);
        }
    }

    /// Print a table header row
    pub fn table_header(&self, columns: &[&str]) {
        let header = format_row(columns);
        let rule_len = columns.len() * (COLUMN_WIDTH + 1);
        if self.colored {
            println!("    {}", header.bright_white().bold());
            println!("    {}", "─".repeat(rule_len).dimmed());
        } else {
            println!("    {}", header);
            println!("    {}", "-".repeat(rule_len));
        }
    }

    /// Print a table row
    pub fn table_row(&self, values: &[&str]) {
        println!("    {}", format_row(values));
    }

    /// Print newline
    pub fn newline(&self) {
        println!();
    }

    /// Result status, green for success and red otherwise.
    pub fn status(&self, status: ResultStatus) -> String {
        let padded = format!("{:<width$}", status.as_str(), width = COLUMN_WIDTH);
        if !self.colored {
            padded
        } else if status.is_success() {
            padded.green().to_string()
        } else {
            padded.red().to_string()
        }
    }

    /// Render an orchestrated answer with its provenance.
    pub fn response(&self, response: &OrchestrateResponse) {
        self.header("Answer");
        self.newline();
        for line in response.content.lines() {
            println!("    {}", line);
        }

        self.subheader("Summary");
        self.kv("confidence", &format!("{:.2}", response.confidence));
        self.kv("fallback used", &response.fallback_used.to_string());
        let contributors = if response.contributing_providers.is_empty() {
            "none".to_string()
        } else {
            response.contributing_providers.join(", ")
        };
        self.kv("contributors", &contributors);
        self.kv("latency", &format!("{} ms", response.total_latency_ms));

        self.subheader("Provider calls");
        self.table_header(&["Capability", "Provider", "Status", "Latency"]);
        for entry in &response.per_task {
            println!(
                "    {} {} {} {}",
                pad(entry.capability.as_str()),
                pad(entry.provider.as_deref().unwrap_or("-")),
                self.status(entry.status),
                format!("{} ms", entry.latency_ms)
            );
        }
    }

    /// Render the provider catalog.
    pub fn providers(&self, providers: &[ProviderSummary]) {
        self.header("Providers");
        self.newline();
        if providers.is_empty() {
            self.warning("No providers configured");
            return;
        }

        self.table_header(&["Id", "Family", "Priority", "Reliability", "Available"]);
        for provider in providers {
            self.table_row(&[
                &provider.id,
                &provider.family,
                &provider.priority.to_string(),
                &format!("{:.2}", provider.reliability),
                if provider.available { "yes" } else { "no" },
            ]);
            let caps: Vec<&str> = provider.capabilities.iter().map(|c| c.as_str()).collect();
            self.list_item(&caps.join(", "));
        }
    }

    /// Render live connectivity checks.
    pub fn checks(&self, checks: &[ProviderCheck]) {
        self.subheader("Connectivity");
        self.table_header(&["Id", "Family", "Status", "Latency"]);
        for check in checks {
            println!(
                "    {} {} {} {} ms",
                pad(&check.id),
                pad(&check.family),
                self.status(check.status),
                check.latency_ms
            );
            if let Some(detail) = &check.detail {
                self.list_item(detail);
            }
        }

        let reachable = checks.iter().filter(|c| c.status.is_success()).count();
        if reachable == checks.len() {
            self.success(&format!("{} of {} providers reachable", reachable, checks.len()));
        } else {
            self.warning(&format!("{} of {} providers reachable", reachable, checks.len()));
        }
    }
}

fn pad(value: &str) -> String {
    format!("{:<width$}", value, width = COLUMN_WIDTH)
}

fn format_row(values: &[&str]) -> String {
    values
        .iter()
        .map(|v| pad(v))
        .collect::<Vec<_>>()
        .join(" ")
}
