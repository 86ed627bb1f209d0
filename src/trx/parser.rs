//! TRX report parsing
//!
//! Reads the XML report artifact written by the external tool's TRX logger
//! and resolves result entries against test definitions.

use anyhow::{Context, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::warn;

use crate::models::{FailureDetail, Outcome, TestId, TestOutcome};

/// Which error-info leaf the current text nodes belong to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TextTarget {
    Message,
    StackTrace,
}

/// One result entry as it appears in the document, before it is joined
/// with its test definition.
#[derive(Debug, Default)]
struct RawResult {
    test_id: Option<String>,
    test_name: Option<String>,
    outcome: Option<String>,
    message: Option<String>,
    stack_trace: Option<String>,
}

/// Parse the report artifact for one run.
///
/// A report the harness cannot read counts as a run with no results, not a
/// fatal error: the failure is logged against the run number and an empty
/// mapping is returned.
pub fn parse_report(path: &Path, run: u64) -> BTreeMap<TestId, TestOutcome> {
    match read_report(path) {
        Ok(outcomes) => outcomes,
        Err(e) => {
            warn!("XML parse error on run {run}: {e:#}");
            BTreeMap::new()
        }
    }
}

fn read_report(path: &Path) -> Result<BTreeMap<TestId, TestOutcome>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read report {}", path.display()))?;
    parse_trx(content.trim_start_matches('\u{feff}'))
}

/// Parse TRX content into per-test outcomes.
///
/// Elements are matched by local name, so namespace prefixes and schema
/// version differences are irrelevant. Results and test definitions are
/// collected independently and joined afterwards; the TRX schema does not
/// promise an ordering between the two sections.
pub fn parse_trx(content: &str) -> Result<BTreeMap<TestId, TestOutcome>> {
    let mut reader = Reader::from_str(content);
    reader.trim_text(true);

    // testId -> container, from the TestDefinitions section
    let mut definitions: HashMap<String, String> = HashMap::new();
    let mut results: Vec<RawResult> = Vec::new();

    let mut current: Option<RawResult> = None;
    let mut result_depth = 0u32;
    let mut definition_id: Option<String> = None;
    let mut in_error_info = false;
    let mut text_target: Option<TextTarget> = None;

    loop {
        match reader.read_event().context("Malformed XML in report")? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"UnitTestResult" => {
                    // Data-driven tests nest inner result entries; only the
                    // outermost entry is counted.
                    if result_depth == 0 {
                        current = Some(raw_result_from(&e));
                    }
                    result_depth += 1;
                }
                b"UnitTest" => {
                    definition_id = attr_value(&e, b"id");
                }
                b"TestMethod" => {
                    record_definition(&mut definitions, definition_id.as_deref(), &e);
                }
                b"ErrorInfo" => {
                    in_error_info = true;
                }
                b"Message" if in_error_info => {
                    let unset = current
                        .as_ref()
                        .map(|c| c.message.is_none())
                        .unwrap_or(false);
                    text_target = if unset { Some(TextTarget::Message) } else { None };
                }
                b"StackTrace" if in_error_info => {
                    let unset = current
                        .as_ref()
                        .map(|c| c.stack_trace.is_none())
                        .unwrap_or(false);
                    text_target = if unset {
                        Some(TextTarget::StackTrace)
                    } else {
                        None
                    };
                }
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"UnitTestResult" => {
                    if result_depth == 0 {
                        results.push(raw_result_from(&e));
                    }
                }
                b"TestMethod" => {
                    record_definition(&mut definitions, definition_id.as_deref(), &e);
                }
                _ => {}
            },
            Event::End(e) => match e.local_name().as_ref() {
                b"UnitTestResult" => {
                    result_depth = result_depth.saturating_sub(1);
                    if result_depth == 0 {
                        if let Some(raw) = current.take() {
                            results.push(raw);
                        }
                    }
                }
                b"UnitTest" => {
                    definition_id = None;
                }
                b"ErrorInfo" => {
                    in_error_info = false;
                    text_target = None;
                }
                b"Message" | b"StackTrace" => {
                    text_target = None;
                }
                _ => {}
            },
            Event::Text(t) => {
                if let (Some(target), Some(current)) = (text_target, current.as_mut()) {
                    match t.unescape() {
                        Ok(text) => append_text(current, target, &text),
                        Err(_) => {
                            append_text(current, target, &String::from_utf8_lossy(t.as_ref()))
                        }
                    }
                }
            }
            Event::CData(t) => {
                if let (Some(target), Some(current)) = (text_target, current.as_mut()) {
                    append_text(current, target, &String::from_utf8_lossy(&t.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    let mut outcomes = BTreeMap::new();
    for raw in results {
        let name = match raw.test_name {
            Some(name) => name,
            None => continue,
        };
        let outcome = match raw.outcome.as_deref().and_then(Outcome::from_trx) {
            Some(outcome) => outcome,
            None => continue,
        };
        let container = raw
            .test_id
            .as_ref()
            .and_then(|id| definitions.get(id).cloned());
        let id = match container {
            Some(container) => TestId::new(container, name),
            None => TestId::unresolved(name),
        };
        let failure = match (raw.message, raw.stack_trace) {
            (None, None) => None,
            (message, stack_trace) => Some(FailureDetail {
                message: message.unwrap_or_default(),
                stack_trace: stack_trace.unwrap_or_default(),
            }),
        };
        outcomes.insert(id, TestOutcome { outcome, failure });
    }
    Ok(outcomes)
}

fn raw_result_from(e: &BytesStart<'_>) -> RawResult {
    RawResult {
        test_id: attr_value(e, b"testId"),
        test_name: attr_value(e, b"testName"),
        outcome: attr_value(e, b"outcome"),
        ..Default::default()
    }
}

fn record_definition(
    definitions: &mut HashMap<String, String>,
    definition_id: Option<&str>,
    e: &BytesStart<'_>,
) {
    if let (Some(id), Some(class_name)) = (definition_id, attr_value(e, b"className")) {
        definitions.insert(id.to_string(), container_from(&class_name));
    }
}

fn append_text(result: &mut RawResult, target: TextTarget, text: &str) {
    let field = match target {
        TextTarget::Message => &mut result.message,
        TextTarget::StackTrace => &mut result.stack_trace,
    };
    match field {
        Some(existing) => existing.push_str(text),
        None => *field = Some(text.to_string()),
    }
}

/// Read one attribute by local name; unreadable attributes are skipped.
fn attr_value(e: &BytesStart<'_>, name: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == name)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

/// The className attribute may carry assembly qualification after a comma;
/// only the type name identifies the container.
fn container_from(class_name: &str) -> String {
    class_name
        .split(',')
        .next()
        .unwrap_or(class_name)
        .trim()
        .to_string()
}
