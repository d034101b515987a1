//! Line-coverage extraction from the report formats test tools emit

use anyhow::{anyhow, bail, Context, Result};
use regex::Regex;
use roxmltree::{Document, Node, ParsingOptions};
use serde::Serialize;
use serde_json::Value;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CoverageFormat {
    Cobertura,
    Jacoco,
    Clover,
    /// Jest/Istanbul `coverage-summary.json`
    JestSummary,
    /// SimpleCov `.last_run.json`
    SimpleCov,
    /// `go tool cover -func` output
    GoCover,
}

impl CoverageFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            CoverageFormat::Cobertura => "cobertura",
            CoverageFormat::Jacoco => "jacoco",
            CoverageFormat::Clover => "clover",
            CoverageFormat::JestSummary => "jest-summary",
            CoverageFormat::SimpleCov => "simplecov",
            CoverageFormat::GoCover => "go-cover",
        }
    }

    /// Guess the format of a report from its content
    pub fn sniff(content: &str) -> Option<Self> {
        let trimmed = content.trim_start();
        if trimmed.starts_with('{') {
            let json: Value = serde_json::from_str(trimmed).ok()?;
            if json.get("total").is_some() {
                return Some(CoverageFormat::JestSummary);
            }
            if json.get("result").is_some() {
                return Some(CoverageFormat::SimpleCov);
            }
            return None;
        }
        if trimmed.starts_with('<') {
            let doc = parse_xml(trimmed).ok()?;
            let root = doc.root_element();
            return match root.tag_name().name() {
                "report" => Some(CoverageFormat::Jacoco),
                "coverage" if root.attribute("line-rate").is_some() => {
                    Some(CoverageFormat::Cobertura)
                }
                "coverage" if child(root, "project").is_some() => Some(CoverageFormat::Clover),
                _ => None,
            };
        }
        go_total_regex()
            .is_match(content)
            .then_some(CoverageFormat::GoCover)
    }

    /// Line coverage percentage (0-100)
    pub fn parse(&self, content: &str) -> Result<f64> {
        let pct = match self {
            CoverageFormat::Cobertura => parse_cobertura(content),
            CoverageFormat::Jacoco => parse_jacoco(content),
            CoverageFormat::Clover => parse_clover(content),
            CoverageFormat::JestSummary => parse_jest(content),
            CoverageFormat::SimpleCov => parse_simplecov(content),
            CoverageFormat::GoCover => parse_go_cover(content),
        }
        .with_context(|| format!("Failed to read {} coverage report", self.as_str()))?;

        if !(0.0..=100.0).contains(&pct) {
            bail!("Coverage {} is outside 0-100", pct);
        }
        Ok(pct)
    }
}

fn parse_xml(content: &str) -> Result<Document<'_>> {
    // JaCoCo reports carry a DOCTYPE
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    Document::parse_with_options(content, options).context("Invalid XML")
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|c| c.is_element() && c.tag_name().name() == name)
}

fn numeric_attr(node: Node, name: &str) -> Result<f64> {
    node.attribute(name)
        .ok_or_else(|| anyhow!("missing '{}' attribute on <{}>", name, node.tag_name().name()))?
        .parse::<f64>()
        .with_context(|| format!("'{}' is not a number", name))
}

fn ratio(covered: f64, total: f64) -> Result<f64> {
    if total <= 0.0 {
        bail!("report contains no measurable lines");
    }
    Ok(covered / total * 100.0)
}

fn parse_cobertura(content: &str) -> Result<f64> {
    let doc = parse_xml(content)?;
    Ok(numeric_attr(doc.root_element(), "line-rate")? * 100.0)
}

fn parse_jacoco(content: &str) -> Result<f64> {
    let doc = parse_xml(content)?;
    // Report-level counters are direct children of <report>
    let counter = doc
        .root_element()
        .children()
        .find(|c| {
            c.is_element() && c.tag_name().name() == "counter" && c.attribute("type") == Some("LINE")
        })
        .ok_or_else(|| anyhow!("no LINE counter on <report>"))?;
    let missed = numeric_attr(counter, "missed")?;
    let covered = numeric_attr(counter, "covered")?;
    ratio(covered, missed + covered)
}

fn parse_clover(content: &str) -> Result<f64> {
    let doc = parse_xml(content)?;
    let metrics = child(doc.root_element(), "project")
        .and_then(|project| child(project, "metrics"))
        .ok_or_else(|| anyhow!("no <project><metrics> element"))?;
    ratio(
        numeric_attr(metrics, "coveredstatements")?,
        numeric_attr(metrics, "statements")?,
    )
}

fn parse_jest(content: &str) -> Result<f64> {
    let json: Value = serde_json::from_str(content).context("Invalid JSON")?;
    json.pointer("/total/lines/pct")
        .and_then(Value::as_f64)
        .ok_or_else(|| anyhow!("no numeric total.lines.pct"))
}

fn parse_simplecov(content: &str) -> Result<f64> {
    let json: Value = serde_json::from_str(content).context("Invalid JSON")?;
    json.pointer("/result/line")
        .or_else(|| json.pointer("/result/covered_percent"))
        .and_then(Value::as_f64)
        .ok_or_else(|| anyhow!("no numeric result.line"))
}

fn go_total_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^total:\s+\(statements\)\s+([0-9]+(?:\.[0-9]+)?)%")
            .expect("valid regex")
    })
}

fn parse_go_cover(content: &str) -> Result<f64> {
    let caps = go_total_regex()
        .captures(content)
        .ok_or_else(|| anyhow!("no 'total: (statements)' line"))?;
    caps[1].parse::<f64>().context("total is not a number")
}
