use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use activator::ActivationWarning;

use crate::config::RegistryConfig;
use crate::report::{self, Mode};

const FIXTURE_SUFFIX: &str = ".test.html";

#[derive(Debug, Deserialize)]
pub struct ExpectedWarning {
    /// Substring that must appear in the warning message.
    pub contains: String,

    /// If set, the warning's element must start on this 1-based source line.
    #[serde(default)]
    pub line: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct TestConfig {
    #[serde(default)]
    pub description: Option<String>,

    /// Request token to activate under.
    #[serde(default)]
    pub token: Option<String>,

    #[serde(default)]
    pub mode: Mode,

    #[serde(flatten)]
    pub registry: RegistryConfig,

    /// Expected activation report (trimmed comparison).
    #[serde(default)]
    pub expect_output: Option<String>,

    /// Substring of the expected activation error.
    #[serde(default)]
    pub expect_error: Option<String>,

    #[serde(default)]
    pub expect_parse_error: bool,

    /// If present (even empty), warning count and content are checked.
    #[serde(default)]
    pub expect_warnings: Option<Vec<ExpectedWarning>>,
}

/// Split a fixture into its TOML frontmatter and HTML body.
fn parse_test_file(content: &str) -> Result<(TestConfig, &str), String> {
    let content = content.trim_start_matches('\u{feff}');

    let after_open = content
        .strip_prefix("---")
        .ok_or("missing opening --- frontmatter delimiter")?;
    let after_open = after_open
        .strip_prefix('\n')
        .or_else(|| after_open.strip_prefix("\r\n"))
        .unwrap_or(after_open);

    let close_pos = after_open
        .find("\n---")
        .ok_or("missing closing --- frontmatter delimiter")?;

    let toml_str = after_open[..close_pos].trim_end_matches('\r');
    let rest = &after_open[close_pos + 4..];
    let source = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))
        .unwrap_or(rest);

    let config: TestConfig =
        toml::from_str(toml_str).map_err(|e| format!("TOML parse error: {}", e))?;

    Ok((config, source))
}

pub enum TestOutcome {
    Pass,
    Fail(String),
}

pub struct TestResult {
    pub path: PathBuf,
    pub description: Option<String>,
    pub outcome: TestOutcome,
}

fn run_single_test(path: &Path) -> TestResult {
    let fail = |description: Option<String>, reason: String| TestResult {
        path: path.to_path_buf(),
        description,
        outcome: TestOutcome::Fail(reason),
    };

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => return fail(None, format!("cannot read file: {}", e)),
    };

    let (config, source) = match parse_test_file(&content) {
        Ok(pair) => pair,
        Err(e) => return fail(None, format!("frontmatter error: {}", e)),
    };
    let description = config.description.clone();

    let outcome = check_fixture(&config, source);
    TestResult {
        path: path.to_path_buf(),
        description,
        outcome: match outcome {
            Some(reason) => TestOutcome::Fail(reason),
            None => TestOutcome::Pass,
        },
    }
}

/// Run one fixture body against its config. Returns `Some(reason)` on failure.
fn check_fixture(config: &TestConfig, source: &str) -> Option<String> {
    let parse_result = dom::parser::Parser::new(source.to_string(), 0).parse();

    if config.expect_parse_error {
        return match parse_result {
            Err(_) => None,
            Ok(_) => Some("expected parse error, but parsing succeeded".into()),
        };
    }

    let mut dom = match parse_result {
        Ok(dom) => dom,
        Err(errs) => {
            let msgs: Vec<String> = errs.iter().map(|e| e.message.clone()).collect();
            return Some(format!("unexpected parse error: {}", msgs.join("; ")));
        }
    };

    let registry = match config.registry.build() {
        Ok(registry) => registry,
        Err(e) => return Some(format!("registry error: {}", e)),
    };

    let root = dom.root();
    let (result, warnings) = match report::activate_and_render(
        &mut dom,
        root,
        &registry,
        config.mode,
        config.token.as_deref(),
    ) {
        Ok((rendered, warnings)) => (Ok(rendered), warnings),
        Err(err) => (Err(err), Vec::new()),
    };

    let reason = match (&config.expect_error, &config.expect_output, result) {
        (Some(expected), _, Err(err)) => {
            let err = err.to_string();
            (!err.contains(expected.as_str()))
                .then(|| format!("expected error containing \"{}\", got: {}", expected, err))
        }
        (Some(expected), _, Ok(_)) => Some(format!(
            "expected error containing \"{}\", but activation succeeded",
            expected
        )),
        (None, _, Err(err)) => Some(format!("unexpected activation error: {}", err)),
        (None, Some(expected), Ok(actual)) => {
            let (expected, actual) = (expected.trim(), actual.trim());
            (expected != actual).then(|| {
                format!(
                    "output mismatch\n  expected:\n{}\n  actual:\n{}",
                    indent(expected),
                    indent(actual)
                )
            })
        }
        (None, None, Ok(_)) => None,
    };
    if reason.is_some() {
        return reason;
    }

    config
        .expect_warnings
        .as_ref()
        .and_then(|expected| check_warnings(source, &warnings, expected))
}

fn indent(text: &str) -> String {
    text.lines()
        .map(|line| format!("    {}", line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Convert a byte offset in `source` to a 1-based line number.
fn byte_offset_to_line(source: &str, offset: usize) -> usize {
    source[..offset.min(source.len())]
        .bytes()
        .filter(|&b| b == b'\n')
        .count()
        + 1
}

/// Check that actual warnings match expectations. Returns `Some(reason)` on mismatch.
fn check_warnings(
    source: &str,
    warnings: &[ActivationWarning],
    expected: &[ExpectedWarning],
) -> Option<String> {
    if warnings.len() != expected.len() {
        let actual: Vec<String> = warnings.iter().map(|w| format!("  - {}", w)).collect();
        return Some(format!(
            "expected {} warning(s), got {}\n  actual warnings:\n{}",
            expected.len(),
            warnings.len(),
            if actual.is_empty() {
                "    (none)".to_string()
            } else {
                actual.join("\n")
            }
        ));
    }

    for (i, (actual, expected)) in warnings.iter().zip(expected).enumerate() {
        if !actual.message.contains(&expected.contains) {
            return Some(format!(
                "warning[{}]: expected message containing \"{}\", got: {}",
                i, expected.contains, actual
            ));
        }

        let Some(expected_line) = expected.line else {
            continue;
        };
        match &actual.span {
            Some(span) => {
                let actual_line = byte_offset_to_line(source, span.start);
                if actual_line != expected_line {
                    return Some(format!(
                        "warning[{}]: expected on line {}, but element is on line {}",
                        i, expected_line, actual_line
                    ));
                }
            }
            None => {
                return Some(format!(
                    "warning[{}]: expected on line {}, but warning has no span",
                    i, expected_line
                ));
            }
        }
    }

    None
}

/// Fixture files grouped by category (subfolder relative to root). Files
/// directly in `root` get category "".
fn discover_categorized(root: &Path) -> BTreeMap<String, Vec<PathBuf>> {
    let mut categories: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    collect_tests(root, root, &mut categories);
    for files in categories.values_mut() {
        files.sort();
    }
    categories
}

fn collect_tests(dir: &Path, root: &Path, out: &mut BTreeMap<String, Vec<PathBuf>>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_tests(&path, root, out);
        } else if path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| name.ends_with(FIXTURE_SUFFIX))
        {
            let category = path
                .parent()
                .and_then(|p| p.strip_prefix(root).ok())
                .map(|p| p.to_string_lossy().replace('\\', "/"))
                .unwrap_or_default();
            out.entry(category).or_default().push(path);
        }
    }
}

pub fn list_categories(path: &Path) {
    if path.is_file() {
        eprintln!("(single file, no categories)");
        return;
    }

    let categories = discover_categorized(path);
    if categories.is_empty() {
        eprintln!("no {} files found in {}", FIXTURE_SUFFIX, path.display());
        return;
    }

    eprintln!("available categories:");
    for (cat, files) in &categories {
        let label = if cat.is_empty() { "(root)" } else { cat.as_str() };
        eprintln!("  {} ({} tests)", label, files.len());
    }
}

fn paint(text: &str, code: &str, no_color: bool) -> String {
    if no_color {
        text.to_string()
    } else {
        format!("\x1b[{}m{}\x1b[0m", code, text)
    }
}

fn label_for<'a>(result: &'a TestResult) -> &'a str {
    result.description.as_deref().unwrap_or_else(|| {
        result
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .and_then(|s| s.strip_suffix(FIXTURE_SUFFIX))
            .unwrap_or("?")
    })
}

/// Select the categories to run. Unknown requested categories are reported
/// and skipped.
fn select_categories<'a>(
    all: &'a BTreeMap<String, Vec<PathBuf>>,
    requested: &[String],
) -> BTreeMap<&'a str, &'a Vec<PathBuf>> {
    if requested.is_empty() {
        return all.iter().map(|(k, v)| (k.as_str(), v)).collect();
    }
    let mut selected = BTreeMap::new();
    for req in requested {
        let req = req.trim_matches('/');
        let prefix = format!("{}/", req);
        let before = selected.len();
        for (cat, files) in all {
            if cat == req || cat.starts_with(&prefix) {
                selected.insert(cat.as_str(), files);
            }
        }
        if selected.len() == before {
            eprintln!(
                "warning: category '{}' not found (available: {})",
                req,
                all.keys()
                    .map(|k| if k.is_empty() { "(root)" } else { k.as_str() })
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
    }
    selected
}

/// Run every fixture under `path` (or a single file) and print a report.
/// Returns the process exit code: 0 when everything passed.
pub fn run_tests(path: &Path, no_color: bool, categories: &[String]) -> i32 {
    let all_categories = if path.is_file() {
        BTreeMap::from([(String::new(), vec![path.to_path_buf()])])
    } else {
        discover_categorized(path)
    };

    if all_categories.is_empty() {
        eprintln!("no {} files found in {}", FIXTURE_SUFFIX, path.display());
        return 1;
    }

    let run_categories = if path.is_file() {
        select_categories(&all_categories, &[])
    } else {
        select_categories(&all_categories, categories)
    };
    if run_categories.is_empty() {
        eprintln!("no matching categories found");
        return 1;
    }

    let mut passed = 0usize;
    let mut failures: Vec<TestResult> = Vec::new();

    for (cat, files) in &run_categories {
        if !path.is_file() {
            let header = if cat.is_empty() { "(root)" } else { *cat };
            eprintln!();
            eprintln!("{}", paint(header, "1", no_color));
        }

        for file in *files {
            let result = run_single_test(file);
            match &result.outcome {
                TestOutcome::Pass => {
                    passed += 1;
                    eprintln!("  {}  {}", paint("PASS", "32", no_color), label_for(&result));
                }
                TestOutcome::Fail(_) => {
                    eprintln!("  {}  {}", paint("FAIL", "31", no_color), label_for(&result));
                    failures.push(result);
                }
            }
        }
    }

    if !failures.is_empty() {
        eprintln!();
        eprintln!("failures:");
        for failure in &failures {
            eprintln!();
            eprintln!("  --- {} ---", failure.path.display());
            if let TestOutcome::Fail(reason) = &failure.outcome {
                for line in reason.lines() {
                    eprintln!("  {}", line);
                }
            }
        }
    }

    eprintln!();
    let failed = failures.len();
    if failed == 0 {
        eprintln!(
            "test result: {}. {} passed, 0 failed",
            paint("ok", "32", no_color),
            passed
        );
        0
    } else {
        eprintln!(
            "test result: {}. {} passed, {} failed (of {})",
            paint("FAILED", "31", no_color),
            passed,
            failed,
            passed + failed
        );
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REGISTRY: &str = r#"runtimes = [{ class = "PreviewRuntime", version = 1 }]
constructors = ["Problem"]"#;

    fn fixture(frontmatter: &str, body: &str) -> String {
        format!("---\n{}\n{}\n---\n{}", REGISTRY, frontmatter, body)
    }

    fn outcome(content: &str) -> Option<String> {
        let (config, source) = parse_test_file(content).unwrap();
        check_fixture(&config, source)
    }

    const PROBLEM: &str = r#"<div class="xblock" data-name="q" data-runtime-class="PreviewRuntime" data-runtime-version="1" data-init="Problem"></div>"#;

    #[test]
    fn frontmatter_splits_config_and_body() {
        let content = fixture("mode = \"blocks\"\ntoken = \"t1\"", "<p>body</p>\n");
        let (config, source) = parse_test_file(&content).unwrap();
        assert_eq!(config.mode, Mode::Blocks);
        assert_eq!(config.token.as_deref(), Some("t1"));
        assert_eq!(config.registry.constructors, vec!["Problem"]);
        assert_eq!(source, "<p>body</p>\n");
    }

    #[test]
    fn frontmatter_requires_delimiters() {
        assert!(parse_test_file("<p>no frontmatter</p>").is_err());
        assert!(parse_test_file("---\nmode = \"all\"\n<p>unterminated</p>").is_err());
    }

    #[test]
    fn matching_output_passes() {
        let content = fixture(
            "expect_output = 'block q PreviewRuntime.v1 {\"args\":[{}],\"constructor\":\"Problem\"}'",
            PROBLEM,
        );
        assert_eq!(outcome(&content), None);
    }

    #[test]
    fn mismatched_output_fails() {
        let content = fixture("expect_output = \"block other\"", PROBLEM);
        let reason = outcome(&content).unwrap();
        assert!(reason.starts_with("output mismatch"), "{}", reason);
    }

    #[test]
    fn expected_error_is_matched_by_substring() {
        let content = fixture(
            "expect_error = \"undefined constructor: Video\"",
            r#"<div class="xblock" data-runtime-class="PreviewRuntime" data-runtime-version="1" data-init="Video"></div>"#,
        );
        assert_eq!(outcome(&content), None);
    }

    #[test]
    fn warnings_are_checked_with_lines() {
        let content = fixture(
            "expect_warnings = [{ contains = \"can't be initialized\", line = 2 }]",
            "<main>\n  <div class=\"xblock\"></div>\n</main>\n",
        );
        assert_eq!(outcome(&content), None);

        let content = fixture(
            "expect_warnings = [{ contains = \"can't be initialized\", line = 1 }]",
            "<main>\n  <div class=\"xblock\"></div>\n</main>\n",
        );
        assert!(outcome(&content).unwrap().contains("expected on line 1"));

        let content = fixture("expect_warnings = []", "<div class=\"xblock\"></div>");
        assert!(outcome(&content).unwrap().starts_with("expected 0 warning(s), got 1"));
    }

    #[test]
    fn parse_error_expectation() {
        let content = fixture("expect_parse_error = true", "<p>text</p><!-- never closed");
        assert_eq!(outcome(&content), None);
        let content = fixture("expect_parse_error = true", "<p>fine</p>");
        assert!(outcome(&content).is_some());
    }

    #[test]
    fn runs_directory_by_category() {
        let dir = tempfile::tempdir().unwrap();
        let basics = dir.path().join("basics");
        std::fs::create_dir(&basics).unwrap();
        std::fs::write(
            basics.join("ok.test.html"),
            fixture("description = \"passes\"", "<p>nothing to do</p>"),
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let categories = discover_categorized(dir.path());
        assert_eq!(categories.keys().collect::<Vec<_>>(), vec!["basics"]);
        assert_eq!(run_tests(dir.path(), true, &[]), 0);
        assert_eq!(run_tests(dir.path(), true, &["missing".to_string()]), 1);

        std::fs::write(
            basics.join("bad.test.html"),
            fixture("expect_error = \"never raised\"", "<p></p>"),
        )
        .unwrap();
        assert_eq!(run_tests(dir.path(), true, &["basics".to_string()]), 1);
        assert_eq!(run_tests(&basics.join("ok.test.html"), true, &[]), 0);
    }

    #[test]
    fn workspace_fixtures_pass() {
        let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("../tests/fixtures");
        assert_eq!(run_tests(&fixtures, true, &[]), 0);
    }
}
