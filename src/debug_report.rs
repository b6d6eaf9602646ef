use bladeconf::{BladeResolution, ResolveError, Stage};
use serde_json::Value;

mod ansi {
    pub const RED: &str = "\x1b[31m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const BLUE: &str = "\x1b[34m";
    pub const CYAN: &str = "\x1b[36m";
    const GRAY: &str = "\x1b[90m";
    const BOLD: &str = "\x1b[1m";
    const DIM: &str = "\x1b[2m";
    const RESET: &str = "\x1b[0m";

    /// Styles report text, or passes it through when colour is off.
    pub struct Palette {
        enabled: bool,
    }

    impl Palette {
        pub fn new(enabled: bool) -> Self {
            Self { enabled }
        }

        pub fn paint(&self, s: impl AsRef<str>, code: &str) -> String {
            if self.enabled { format!("{code}{}{RESET}", s.as_ref()) } else { s.as_ref().to_string() }
        }

        pub fn bold(&self, s: impl AsRef<str>) -> String {
            self.paint(s, BOLD)
        }

        pub fn dim(&self, s: impl AsRef<str>) -> String {
            self.paint(s, DIM)
        }

        /// `━━━ Title ━━━` header, preceded by a blank line.
        pub fn section(&self, title: &str) -> String {
            format!("\n{}", self.paint(format!("━━━ {title} ━━━"), GRAY))
        }
    }
}

pub fn print_resolution(source: &str, res: &BladeResolution, color: bool) {
    let palette = ansi::Palette::new(color);
    println!("\n{}", palette.bold(palette.paint(format!("⚙  Resolving: {source}"), ansi::CYAN)));

    println!("{}", palette.section("Route"));
    let via = match res.matched_rule {
        Some(index) => palette.paint(format!("rule #{index}"), ansi::BLUE),
        None => palette.dim("default"),
    };
    println!("  {} {}  {} {}", palette.dim("target:"), palette.bold(palette.paint(&res.target, ansi::GREEN)), palette.dim("│ via:"), via);

    println!("{}", palette.section("Tokens"));
    if res.tokens.is_empty() {
        println!("{}", palette.dim("  No data tokens"));
    }
    for token in &res.tokens {
        let vars = if token.has_variables { palette.paint(" {vars}", ansi::YELLOW) } else { String::new() };
        println!(
            "  {}{}  {} {}  {} {}",
            palette.paint(&token.original, ansi::CYAN),
            vars,
            palette.dim("source:"),
            palette.paint(&token.source, ansi::BLUE),
            palette.dim("│ key:"),
            token.config_key,
        );
    }

    println!("{}", palette.section("Resolved"));
    if res.config.is_empty() {
        println!("{}", palette.dim("  Empty configuration"));
    }
    for (key, value) in &res.config {
        let shown = match value {
            Value::String(s) => s.clone(),
            other => palette.dim(other.to_string()),
        };
        println!("  {} {} {}", palette.bold(key), palette.dim("="), shown);
    }

    if !res.diagnostics.is_empty() {
        println!("{}", palette.section("Diagnostics"));
        for diag in &res.diagnostics {
            let (label, tint) = match diag.stage {
                Stage::Data => ("warn ", ansi::YELLOW),
                Stage::Expression => ("error", ansi::RED),
            };
            println!(
                "  {} {} {} {}",
                palette.paint(label, tint),
                palette.bold(&diag.key),
                palette.dim("│"),
                palette.paint(&diag.token, ansi::CYAN)
            );
            println!("        {}", diag.message);
            if let Some(fix) = bladeconf::remediation_for(&diag.message) {
                println!("        {}", palette.dim(format!("hint: {fix}")));
            }
        }
    }

    let m = &res.metrics;
    println!("{}", palette.section("Timing"));
    println!(
        "  Total: {}  │  Values: {} ({} passed through)",
        palette.paint(format!("{:?}", m.total), ansi::GREEN),
        palette.paint(m.values.to_string(), ansi::BLUE),
        m.passthrough,
    );
    println!(
        "  {}",
        palette.dim(format!(
            "variables {}/{}  data {}/{}  expressions {}/{}  legacy {}/{}  (resolved/unresolved)",
            m.variables.resolved,
            m.variables.unresolved,
            m.data.resolved,
            m.data.unresolved,
            m.expressions.resolved,
            m.expressions.unresolved,
            m.legacy_calls.resolved,
            m.legacy_calls.unresolved,
        ))
    );
    println!();
}

pub fn print_failure(err: &ResolveError, color: bool) {
    let palette = ansi::Palette::new(color);
    eprintln!("{} {}", palette.bold(palette.paint("error:", ansi::RED)), err);
    if let Some(fix) = err.remediation() {
        eprintln!("  {} {}", palette.paint("hint:", ansi::YELLOW), fix);
    }
}
